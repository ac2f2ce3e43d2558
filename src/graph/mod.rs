//! The output property graph: nodes, edges, labels, identity.

pub mod edges;
pub mod nodes;
pub mod writer;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Node labels in the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLabel {
    Project,
    Folder,
    File,
    Scope,
    Type,
    Operation,
    Variable,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Project => "Project",
            NodeLabel::Folder => "Folder",
            NodeLabel::File => "File",
            NodeLabel::Scope => "Scope",
            NodeLabel::Type => "Type",
            NodeLabel::Operation => "Operation",
            NodeLabel::Variable => "Variable",
        }
    }
}

/// Edge labels in the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeLabel {
    Contains,
    Declares,
    Encloses,
    Encapsulates,
    Parameterizes,
    Returns,
    Typed,
    Invokes,
    Uses,
    Requires,
    Includes,
}

impl EdgeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLabel::Contains => "contains",
            EdgeLabel::Declares => "declares",
            EdgeLabel::Encloses => "encloses",
            EdgeLabel::Encapsulates => "encapsulates",
            EdgeLabel::Parameterizes => "parameterizes",
            EdgeLabel::Returns => "returns",
            EdgeLabel::Typed => "typed",
            EdgeLabel::Invokes => "invokes",
            EdgeLabel::Uses => "uses",
            EdgeLabel::Requires => "requires",
            EdgeLabel::Includes => "includes",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Graph {
    pub elements: Elements,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Elements {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphNode {
    pub data: NodeData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphEdge {
    pub data: EdgeData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeData {
    pub id: String,
    pub label: String,
    pub source: String,
    pub target: String,
    pub properties: BTreeMap<String, String>,
}

/// Node identity: backslashes become dots, a trailing `.go` is stripped,
/// leading dots are trimmed. Applied to filesystem paths and position keys
/// alike; rerunning on unchanged input yields identical IDs.
pub fn to_node_id(path: &str) -> String {
    let replaced = path.replace('\\', ".");
    let stripped = replaced.strip_suffix(".go").unwrap_or(&replaced);
    stripped.trim_start_matches('.').to_string()
}

/// File node identity keeps the `.go` suffix.
pub fn file_node_id(path: &str) -> String {
    to_node_id(&format!("{}.go", path))
}

/// Scope node identity: directory plus package name.
pub fn scope_node_id(dir: &str, package: &str) -> String {
    format!("{}.package", to_node_id(&format!("{}/{}", dir, package)))
}

/// Labels for a symbol-table kind. Operations double as types.
pub fn kind_to_labels(kind: &str) -> Vec<String> {
    match kind {
        "field" | "var" | "param" => vec![NodeLabel::Variable.as_str().to_string()],
        "func" | "method" => vec![
            NodeLabel::Operation.as_str().to_string(),
            NodeLabel::Type.as_str().to_string(),
        ],
        "type" | "struct" | "interface" => vec![NodeLabel::Type.as_str().to_string()],
        other => {
            let mut chars = other.chars();
            let title = match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            };
            vec![title]
        }
    }
}

/// Accumulates nodes and edges, deduplicating by identity while preserving
/// first-emission order.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    node_ids: HashSet<String>,
    edge_ids: HashSet<String>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(
        &mut self,
        id: String,
        labels: Vec<String>,
        properties: BTreeMap<String, String>,
    ) {
        if !self.node_ids.insert(id.clone()) {
            return;
        }
        self.nodes.push(GraphNode {
            data: NodeData {
                id,
                labels,
                properties,
            },
        });
    }

    pub fn add_edge(
        &mut self,
        label: EdgeLabel,
        source: String,
        target: String,
        properties: BTreeMap<String, String>,
    ) {
        let id = format!("{}-{}-{}", source, label.as_str(), target);
        if !self.edge_ids.insert(id.clone()) {
            return;
        }
        self.edges.push(GraphEdge {
            data: EdgeData {
                id,
                label: label.as_str().to_string(),
                source,
                target,
                properties,
            },
        });
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.node_ids.contains(id)
    }

    pub fn into_graph(self) -> Graph {
        Graph {
            elements: Elements {
                nodes: self.nodes,
                edges: self.edges,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_node_id() {
        assert_eq!(to_node_id("src\\handlers\\calc.go"), "src.handlers.calc");
        assert_eq!(to_node_id("/proj/handlers"), "/proj/handlers");
        assert_eq!(to_node_id(".hidden"), "hidden");
    }

    #[test]
    fn test_file_node_id_keeps_extension() {
        assert_eq!(
            file_node_id("/proj/handlers/calc.go"),
            "/proj/handlers/calc.go"
        );
    }

    #[test]
    fn test_scope_node_id() {
        assert_eq!(
            scope_node_id("/proj/handlers", "handlers"),
            "/proj/handlers/handlers.package"
        );
    }

    #[test]
    fn test_kind_to_labels() {
        assert_eq!(kind_to_labels("param"), vec!["Variable"]);
        assert_eq!(kind_to_labels("method"), vec!["Operation", "Type"]);
        assert_eq!(kind_to_labels("interface"), vec!["Type"]);
        assert_eq!(kind_to_labels("widget"), vec!["Widget"]);
    }

    #[test]
    fn test_builder_dedup_preserves_order() {
        let mut builder = GraphBuilder::new();
        builder.add_node("b".to_string(), vec![], BTreeMap::new());
        builder.add_node("a".to_string(), vec![], BTreeMap::new());
        builder.add_node("b".to_string(), vec![], BTreeMap::new());

        builder.add_edge(
            EdgeLabel::Contains,
            "a".to_string(),
            "b".to_string(),
            BTreeMap::new(),
        );
        builder.add_edge(
            EdgeLabel::Contains,
            "a".to_string(),
            "b".to_string(),
            BTreeMap::new(),
        );
        builder.add_edge(
            EdgeLabel::Includes,
            "a".to_string(),
            "b".to_string(),
            BTreeMap::new(),
        );

        let graph = builder.into_graph();
        let ids: Vec<&str> = graph.elements.nodes.iter().map(|n| n.data.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(graph.elements.edges.len(), 2);
    }
}
