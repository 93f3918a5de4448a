use std::collections::BTreeSet;
use std::fmt::Write;
use std::path::Path;
use serde::{Deserialize, Serialize};

use super::relationships::{Relationship, RelationshipKind};
use super::service_grouper::ServiceGrouper;

/// An edge between two files, named by base name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
}

/// Files and edges touching one service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: BTreeSet<String>,
    pub edges: Vec<GraphEdge>,
}

impl DependencyGraph {
    /// Edges whose source or target file derives the service name `service`
    pub fn for_service(service: &str, relationships: &[Relationship], grouper: &ServiceGrouper) -> Self {
        let mut graph = Self::default();

        for relationship in relationships {
            let touches_service = grouper.extract_service_name(&relationship.source_file) == service
                || grouper.extract_service_name(&relationship.target_file) == service;
            if !touches_service {
                continue;
            }

            let from = base_name(&relationship.source_file);
            let to = base_name(&relationship.target_file);
            graph.nodes.insert(from.clone());
            graph.nodes.insert(to.clone());
            graph.edges.push(GraphEdge {
                from,
                to,
                kind: relationship.kind,
            });
        }

        graph
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Render as a Mermaid `graph LR` diagram
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph LR\n");

        for node in &self.nodes {
            let _ = writeln!(out, "    {}[\"{}\"]", node_id(node), node.replace('"', "'"));
        }
        for edge in &self.edges {
            let _ = writeln!(out, "    {} -->|{}| {}", node_id(&edge.from), edge.kind, node_id(&edge.to));
        }

        out
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Mermaid node ids may only hold word characters
fn node_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
