mod engine;
mod parser;

// Language-specific parsers and reference tables
mod languages;

// Relationship and service analysis
mod relationships;
mod service_grouper;
mod service_context;
mod dependency_graph;
mod analyzer;

pub use parser::{
    ApiEndpoint, CodeParser, EndpointParam, EndpointResponse, FactProvider, FunctionDecl, Parameter,
    ParsedDirectory, SkippedFile, StructuralFact, TypeDecl,
};
pub use languages::Language;
pub use relationships::{Relationship, RelationshipExtractor, RelationshipKind};
pub use service_grouper::{FileCategory, ServiceGroup, ServiceGrouper, ROOT_SERVICE};
pub use service_context::{ContextAssembler, CrossReference, ServiceContext, GENERAL_SERVICE};
pub use dependency_graph::{DependencyGraph, GraphEdge};
pub use analyzer::{AnalysisReport, AnalysisRun, FactTable, ReportSummary, ServiceAnalyzer};

// Export the main engine
pub use engine::Engine;
