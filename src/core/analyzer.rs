use std::collections::HashMap;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{AnalysisConfig, Config};
use crate::error::{Result, ServicemapError};
use super::dependency_graph::DependencyGraph;
use super::parser::{CodeParser, FactProvider, SkippedFile, StructuralFact};
use super::relationships::{Relationship, RelationshipExtractor};
use super::service_context::{ContextAssembler, CrossReference, ServiceContext};
use super::service_grouper::ServiceGrouper;

/// Facts of one run keyed by path, with a first-declaration-wins symbol index
#[derive(Debug, Clone, Default)]
pub struct FactTable {
    facts: Vec<StructuralFact>,
    by_path: HashMap<PathBuf, usize>,
    symbols: HashMap<String, usize>,
}

impl FactTable {
    /// Later facts for an already known path are ignored
    pub fn new(facts: Vec<StructuralFact>) -> Self {
        let mut table = Self::default();
        for fact in facts {
            table.insert(fact);
        }
        table
    }

    fn insert(&mut self, fact: StructuralFact) {
        if self.by_path.contains_key(&fact.path) {
            debug!("Duplicate facts for {}, keeping the first", fact.path.display());
            return;
        }

        let index = self.facts.len();
        for declared in &fact.types {
            self.symbols.entry(declared.name.clone()).or_insert(index);
        }
        self.by_path.insert(fact.path.clone(), index);
        self.facts.push(fact);
    }

    pub fn get(&self, path: &Path) -> Option<&StructuralFact> {
        self.by_path.get(path).map(|&i| &self.facts[i])
    }

    /// Facts in insertion order
    pub fn facts(&self) -> &[StructuralFact] {
        &self.facts
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> + '_ {
        self.facts.iter().map(|fact| fact.path.as_path())
    }

    /// File declaring `name`; the earliest inserted file wins ties
    pub fn resolve_symbol(&self, name: &str) -> Option<&Path> {
        self.symbols
            .get(name)
            .map(|&i| self.facts[i].path.as_path())
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// All state produced by one analysis, owned by the caller
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub root: PathBuf,
    pub facts: FactTable,
    /// Every resolved edge, in file then pattern order
    pub relationships: Vec<Relationship>,
    /// Always empty; kept so consumers can rely on the field
    pub cross_references: Vec<CrossReference>,
    pub skipped: Vec<SkippedFile>,
    pub contexts: Vec<ServiceContext>,
}

impl AnalysisRun {
    pub fn context(&self, name: &str) -> Option<&ServiceContext> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// Files and edges touching `service`
    pub fn dependency_graph(&self, service: &str) -> Result<DependencyGraph> {
        let grouper = ServiceGrouper::new(Some(&self.root))?;
        Ok(DependencyGraph::for_service(service, &self.relationships, &grouper))
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            files: self.facts.len(),
            services: self.contexts.len(),
            relationships: self.relationships.len(),
            endpoints: self.contexts.iter().map(|c| c.api_endpoints.len()).sum(),
            skipped: self.skipped.len(),
        }
    }

    pub fn report(&self, project: &str) -> AnalysisReport<'_> {
        AnalysisReport {
            project: project.to_string(),
            root: &self.root,
            generated_at: Utc::now(),
            summary: self.summary(),
            contexts: &self.contexts,
            relationships: &self.relationships,
            cross_references: &self.cross_references,
            skipped: &self.skipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub files: usize,
    pub services: usize,
    pub relationships: usize,
    pub endpoints: usize,
    pub skipped: usize,
}

/// Serializable view of a run
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub project: String,
    pub root: &'a Path,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub contexts: &'a [ServiceContext],
    pub relationships: &'a [Relationship],
    pub cross_references: &'a [CrossReference],
    pub skipped: &'a [SkippedFile],
}

/// Runs facts, relationships, grouping and assembly in sequence
pub struct ServiceAnalyzer {
    provider: Box<dyn FactProvider>,
    analysis: AnalysisConfig,
}

impl ServiceAnalyzer {
    pub fn new(config: &Config) -> Result<Self> {
        let parser = CodeParser::new(&config.parsing)?;
        Ok(Self::with_provider(Box::new(parser), config.analysis.clone()))
    }

    pub fn with_provider(provider: Box<dyn FactProvider>, analysis: AnalysisConfig) -> Self {
        Self { provider, analysis }
    }

    /// Analyze every recognized file under `root`; an unusable root is fatal
    pub fn analyze_directory(&self, root: &Path) -> Result<AnalysisRun> {
        let root = canonical_root(root)?;
        info!("🔍 Analyzing services under {}", root.display());
        debug!("Recognized extensions: {:?}", self.provider.recognized_extensions());

        let parsed = self.provider.parse_directory(&root)?;
        self.analyze_facts(root, parsed.facts, parsed.skipped)
    }

    /// Analyze an explicit file list; files the provider cannot parse are skipped
    pub fn analyze_files(&self, root: &Path, files: &[PathBuf]) -> Result<AnalysisRun> {
        let root = canonical_root(root)?;
        let mut facts = Vec::new();
        let mut skipped = Vec::new();

        for file in files {
            let path = if file.is_absolute() { file.clone() } else { root.join(file) };
            match self.provider.parse(&path) {
                Some(fact) => facts.push(fact),
                None => skipped.push(SkippedFile {
                    path,
                    reason: "not parseable".to_string(),
                }),
            }
        }

        self.analyze_facts(root, facts, skipped)
    }

    fn analyze_facts(&self, root: PathBuf, facts: Vec<StructuralFact>, skipped: Vec<SkippedFile>) -> Result<AnalysisRun> {
        let facts = FactTable::new(facts);
        debug!("Fact table holds {} files", facts.len());

        let extractor = RelationshipExtractor::new(&root)?;
        let relationships = self.extract_relationships(&extractor, &facts);
        debug!("Resolved {} relationships", relationships.len());

        let grouper = ServiceGrouper::new(Some(&root))?;
        let groups = grouper.group(facts.paths());
        let contexts = ContextAssembler::new(&grouper).assemble(&groups, &facts, &relationships);

        info!(
            "✅ {} files grouped into {} services ({} relationships, {} skipped)",
            facts.len(),
            contexts.len(),
            relationships.len(),
            skipped.len()
        );

        Ok(AnalysisRun {
            root,
            facts,
            relationships,
            cross_references: Vec::new(),
            skipped,
            contexts,
        })
    }

    fn extract_relationships(&self, extractor: &RelationshipExtractor, facts: &FactTable) -> Vec<Relationship> {
        let scan = |fact: &StructuralFact| extractor.extract(&fact.path, &fact.source_content, fact.language, facts);

        if self.analysis.parallel_extraction {
            // Collecting per-file batches keeps the sequential edge order
            let batches: Vec<Vec<Relationship>> = facts.facts().par_iter().map(scan).collect();
            batches.into_iter().flatten().collect()
        } else {
            facts.facts().iter().flat_map(scan).collect()
        }
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize().map_err(|source| ServicemapError::RootUnavailable {
        path: root.to_path_buf(),
        source,
    })
}
