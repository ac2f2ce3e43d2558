//! Graph node emission: project, folders, files, declarations, scopes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::sast::{NodeKind, SastNode};
use crate::symbols::{is_primitive, SymbolTable};

use super::{
    file_node_id, kind_to_labels, scope_node_id, to_node_id, GraphBuilder, NodeLabel,
};

fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Emit all graph nodes: the project, its folders and source files, every
/// non-primitive declaration, and one scope per `(directory, package)`.
pub fn emit_nodes(
    builder: &mut GraphBuilder,
    root: &Path,
    sasts: &BTreeMap<PathBuf, SastNode>,
    table: &SymbolTable,
    skip_dir: &Path,
) -> Result<()> {
    let root_str = root.to_string_lossy().replace('\\', "/");
    let basename = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root_str.clone());

    builder.add_node(
        format!("project:{}", to_node_id(&root_str)),
        vec![NodeLabel::Project.as_str().to_string()],
        props(&[("simpleName", &basename), ("qualifiedName", &root_str)]),
    );

    for entry in walk_project(root, skip_dir)? {
        let path_str = entry.to_string_lossy().replace('\\', "/");
        let simple = entry
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if entry.is_dir() {
            builder.add_node(
                to_node_id(&path_str),
                vec![NodeLabel::Folder.as_str().to_string()],
                props(&[("simpleName", &simple), ("qualifiedName", &path_str)]),
            );
        } else {
            builder.add_node(
                file_node_id(&path_str),
                vec![NodeLabel::File.as_str().to_string()],
                props(&[("simpleName", &simple), ("qualifiedName", &path_str)]),
            );
        }
    }

    for (key, info) in table.iter() {
        if is_primitive(&info.name) {
            continue;
        }
        let qualified = if info.package_name.is_empty() {
            info.name.clone()
        } else {
            format!("{}.{}", info.package_name, info.name)
        };
        builder.add_node(
            to_node_id(key),
            kind_to_labels(&info.kind),
            props(&[
                ("simpleName", &info.name),
                ("qualifiedName", &qualified),
                ("kind", &info.kind),
            ]),
        );
    }

    for sast in sasts.values() {
        let Some(package) = sast.child_of_kind(NodeKind::Package) else {
            continue;
        };
        let Some(position) = &sast.position else {
            continue;
        };
        let dir = parent_dir(position.path());
        let qualified = format!("{}/{}", dir, package.name);
        builder.add_node(
            scope_node_id(&dir, &package.name),
            vec![NodeLabel::Scope.as_str().to_string()],
            props(&[
                ("simpleName", &package.name),
                ("qualifiedName", &qualified),
                ("kind", "package"),
            ]),
        );
    }

    Ok(())
}

/// Directories and Go source files under `root`, sorted, skipping the
/// intermediate-representation directory. The root itself is excluded.
pub fn walk_project(root: &Path, skip_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(skip_dir) || skip_dir.as_os_str().is_empty());
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let path = entry.path();
        if path == root {
            continue;
        }
        if path.is_dir() || path.extension().is_some_and(|e| e == "go") {
            entries.push(path.to_path_buf());
        }
    }
    Ok(entries)
}

/// Parent directory of a path string, with forward slashes.
pub fn parent_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::DefInfo;

    #[test]
    fn test_primitive_declarations_are_skipped() {
        let mut table = SymbolTable::new();
        table.insert(DefInfo {
            name: "int".to_string(),
            kind: "type".to_string(),
            uri: "file:///proj/a.go".to_string(),
            line: 1,
            character: 5,
            type_string: String::new(),
            receiver_type: String::new(),
            package_name: "a".to_string(),
        });
        table.insert(DefInfo {
            name: "Calculator".to_string(),
            kind: "struct".to_string(),
            uri: "file:///proj/a.go".to_string(),
            line: 3,
            character: 5,
            type_string: String::new(),
            receiver_type: String::new(),
            package_name: "a".to_string(),
        });

        let dir = tempfile::tempdir().unwrap();
        let mut builder = GraphBuilder::new();
        emit_nodes(
            &mut builder,
            dir.path(),
            &BTreeMap::new(),
            &table,
            Path::new(""),
        )
        .unwrap();

        let graph = builder.into_graph();
        let names: Vec<&str> = graph
            .elements
            .nodes
            .iter()
            .filter_map(|n| n.data.properties.get("simpleName"))
            .map(|s| s.as_str())
            .collect();
        assert!(names.contains(&"Calculator"));
        assert!(!names.contains(&"int"));
    }

    #[test]
    fn test_operation_nodes_carry_both_labels() {
        let mut table = SymbolTable::new();
        table.insert(DefInfo {
            name: "Sum".to_string(),
            kind: "method".to_string(),
            uri: "file:///proj/a.go".to_string(),
            line: 5,
            character: 20,
            type_string: String::new(),
            receiver_type: "Calculator".to_string(),
            package_name: "a".to_string(),
        });

        let dir = tempfile::tempdir().unwrap();
        let mut builder = GraphBuilder::new();
        emit_nodes(
            &mut builder,
            dir.path(),
            &BTreeMap::new(),
            &table,
            Path::new(""),
        )
        .unwrap();

        let graph = builder.into_graph();
        let sum = graph
            .elements
            .nodes
            .iter()
            .find(|n| n.data.properties.get("simpleName").map(|s| s.as_str()) == Some("Sum"))
            .unwrap();
        assert_eq!(sum.data.labels, vec!["Operation", "Type"]);
    }
}
