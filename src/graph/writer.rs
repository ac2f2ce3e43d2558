//! Writes the final graph document.

use std::path::Path;

use anyhow::{Context, Result};

use super::Graph;

/// Serialize the whole graph as pretty-printed JSON. Failing here is fatal
/// to the run.
pub fn write_graph(graph: &Graph, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, graph)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeLabel, GraphBuilder};
    use std::collections::BTreeMap;

    #[test]
    fn test_write_and_reread() {
        let mut builder = GraphBuilder::new();
        builder.add_node("a".to_string(), vec!["File".to_string()], BTreeMap::new());
        builder.add_node("b".to_string(), vec!["Type".to_string()], BTreeMap::new());
        builder.add_edge(
            EdgeLabel::Declares,
            "a".to_string(),
            "b".to_string(),
            BTreeMap::new(),
        );
        let graph = builder.into_graph();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/graph.json");
        write_graph(&graph, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let reread: Graph = serde_json::from_str(&content).unwrap();
        assert_eq!(reread.elements.nodes.len(), 2);
        assert_eq!(reread.elements.edges.len(), 1);
        assert_eq!(reread.elements.edges[0].data.label, "declares");
    }
}
