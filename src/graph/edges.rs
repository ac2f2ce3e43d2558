//! Graph edge emission.
//!
//! Each pass is independent: it reads the SASTs and/or the symbol table and
//! feeds edges to the builder, which deduplicates `(source, target, label)`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::sast::{NodeKind, SastNode};
use crate::symbols::{is_primitive, DefInfo, SymbolTable};

use super::nodes::{parent_dir, walk_project};
use super::{file_node_id, scope_node_id, to_node_id, EdgeLabel, GraphBuilder};

fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Run every edge pass.
pub fn emit_edges(
    builder: &mut GraphBuilder,
    root: &Path,
    sasts: &BTreeMap<PathBuf, SastNode>,
    table: &SymbolTable,
    skip_dir: &Path,
) -> Result<()> {
    folder_contains(builder, root, skip_dir)?;
    file_declares_scope(builder, sasts);
    file_declares(builder, table);
    invokes(builder, sasts, table);
    returns(builder, sasts, table);
    parameterizes(builder, sasts, table);
    type_encapsulates_variable(builder, sasts, table);
    type_encapsulates_operation(builder, table);
    typed(builder, table);
    scope_encloses_type(builder, table);
    requires(builder, sasts);
    project_includes(builder, root, skip_dir)?;
    operation_uses_variable(builder, sasts);
    Ok(())
}

/// `folder —contains→ entry` for every entry whose parent is not the root.
fn folder_contains(builder: &mut GraphBuilder, root: &Path, skip_dir: &Path) -> Result<()> {
    for entry in walk_project(root, skip_dir)? {
        let Some(parent) = entry.parent() else {
            continue;
        };
        if parent == root {
            continue;
        }
        let parent_id = to_node_id(&parent.to_string_lossy().replace('\\', "/"));
        let entry_str = entry.to_string_lossy().replace('\\', "/");
        let entry_id = if entry.is_dir() {
            to_node_id(&entry_str)
        } else {
            file_node_id(&entry_str)
        };
        builder.add_edge(EdgeLabel::Contains, parent_id, entry_id, BTreeMap::new());
    }
    Ok(())
}

/// `file —declares→ scope` for every package clause.
fn file_declares_scope(builder: &mut GraphBuilder, sasts: &BTreeMap<PathBuf, SastNode>) {
    for sast in sasts.values() {
        let (Some(position), Some(package)) =
            (&sast.position, sast.child_of_kind(NodeKind::Package))
        else {
            continue;
        };
        let file_id = file_node_id(position.path());
        let scope_id = scope_node_id(&parent_dir(position.path()), &package.name);
        builder.add_edge(
            EdgeLabel::Declares,
            file_id,
            scope_id,
            props(&[("name", &package.name), ("kind", "package")]),
        );
    }
}

/// `file —declares→ entity` for every top-level declaration entry.
fn file_declares(builder: &mut GraphBuilder, table: &SymbolTable) {
    const DECLARED: &[&str] = &["type", "struct", "interface", "func", "method", "var"];
    for (key, info) in table.iter() {
        if !DECLARED.contains(&info.kind.as_str()) {
            continue;
        }
        if info.kind == "var" && !info.receiver_type.is_empty() {
            continue;
        }
        if is_primitive(&info.name) {
            continue;
        }
        let file_id = file_node_id(uri_path(&info.uri));
        builder.add_edge(
            EdgeLabel::Declares,
            file_id,
            to_node_id(key),
            props(&[("name", &info.name), ("kind", &info.kind)]),
        );
    }
}

/// `operation —invokes→ operation` for every call inside a function body.
/// Resolution prefers the callee's `declaredAt`; the fallback is the first
/// same-named operation in the (sorted) symbol table.
fn invokes(builder: &mut GraphBuilder, sasts: &BTreeMap<PathBuf, SastNode>, table: &SymbolTable) {
    for sast in sasts.values() {
        walk_with_function(sast, None, &mut |node, current| {
            if node.kind != NodeKind::Call && node.kind != NodeKind::MethodCall {
                return;
            }
            let Some(caller) = current else {
                return;
            };
            let Some(callee) = resolve_callee(node, table) else {
                return;
            };
            builder.add_edge(
                EdgeLabel::Invokes,
                caller.to_string(),
                to_node_id(&callee.pos_key()),
                props(&[("name", &callee.name), ("kind", &callee.kind)]),
            );
        });
    }
}

fn resolve_callee<'a>(node: &SastNode, table: &'a SymbolTable) -> Option<&'a DefInfo> {
    if let Some(declared) = &node.declared_at {
        if let Some(info) = table.get(&declared.pos_key()) {
            if info.kind == "func" || info.kind == "method" {
                return Some(info);
            }
        }
    }
    table.find_named(&node.name, &["func", "method"])
}

/// `operation —returns→ type` for every non-primitive declared result type.
fn returns(builder: &mut GraphBuilder, sasts: &BTreeMap<PathBuf, SastNode>, table: &SymbolTable) {
    for sast in sasts.values() {
        sast.walk(&mut |node| {
            if node.kind != NodeKind::Function && node.kind != NodeKind::Method {
                return;
            }
            let (Some(position), Some(results)) =
                (&node.position, node.child_of_kind(NodeKind::Results))
            else {
                return;
            };
            let function_id = to_node_id(&position.pos_key());
            for field in &results.children {
                let Some(type_ident) = field.children.last() else {
                    continue;
                };
                let Some(declared) = &type_ident.declared_at else {
                    continue;
                };
                let Some(info) = table.get(&declared.pos_key()) else {
                    continue;
                };
                if !matches!(info.kind.as_str(), "type" | "struct" | "interface")
                    || is_primitive(&info.name)
                {
                    continue;
                }
                builder.add_edge(
                    EdgeLabel::Returns,
                    function_id.clone(),
                    to_node_id(&info.pos_key()),
                    props(&[("type", &info.name)]),
                );
            }
        });
    }
}

/// `param —parameterizes→ operation` for every identifier under
/// `Params → Field` recorded as a `param` entry.
fn parameterizes(
    builder: &mut GraphBuilder,
    sasts: &BTreeMap<PathBuf, SastNode>,
    table: &SymbolTable,
) {
    for sast in sasts.values() {
        sast.walk(&mut |node| {
            if node.kind != NodeKind::Function && node.kind != NodeKind::Method {
                return;
            }
            let (Some(position), Some(params)) =
                (&node.position, node.child_of_kind(NodeKind::Params))
            else {
                return;
            };
            let function_id = to_node_id(&position.pos_key());
            for field in &params.children {
                for ident in &field.children {
                    let Some(ident_pos) = &ident.position else {
                        continue;
                    };
                    let key = ident_pos.pos_key();
                    let Some(info) = table.get(&key) else {
                        continue;
                    };
                    if info.kind != "param" {
                        continue;
                    }
                    builder.add_edge(
                        EdgeLabel::Parameterizes,
                        to_node_id(&key),
                        function_id.clone(),
                        props(&[("name", &info.name)]),
                    );
                }
            }
        });
    }
}

/// `struct —encapsulates→ field` for every struct member. The struct entry
/// is looked up by the struct node's own position, falling back to a
/// same-line scan.
fn type_encapsulates_variable(
    builder: &mut GraphBuilder,
    sasts: &BTreeMap<PathBuf, SastNode>,
    table: &SymbolTable,
) {
    for sast in sasts.values() {
        sast.walk(&mut |node| {
            if node.kind != NodeKind::Struct {
                return;
            }
            let Some(position) = &node.position else {
                return;
            };
            let struct_info = table
                .get(&position.pos_key())
                .or_else(|| table.find_on_line(&position.uri, position.line));
            let Some(struct_info) = struct_info else {
                return;
            };
            let struct_id = to_node_id(&struct_info.pos_key());
            for field in node.children.iter().filter(|c| c.kind == NodeKind::Field) {
                let Some(ident) = field.children.first() else {
                    continue;
                };
                let Some(ident_pos) = &ident.position else {
                    continue;
                };
                builder.add_edge(
                    EdgeLabel::Encapsulates,
                    struct_id.clone(),
                    to_node_id(&ident_pos.pos_key()),
                    props(&[("name", &ident.name)]),
                );
            }
        });
    }
}

/// `type —encapsulates→ method` for every method whose receiver names a
/// known struct or interface.
fn type_encapsulates_operation(builder: &mut GraphBuilder, table: &SymbolTable) {
    for (key, info) in table.iter() {
        if info.kind != "method" || info.receiver_type.is_empty() {
            continue;
        }
        let Some(owner) = table.find_named(&info.receiver_type, &["struct", "interface"]) else {
            continue;
        };
        builder.add_edge(
            EdgeLabel::Encapsulates,
            to_node_id(&owner.pos_key()),
            to_node_id(key),
            props(&[("name", &info.name)]),
        );
    }
}

/// `symbol —typed→ type` for params, vars and fields whose type string names
/// a known qualified type.
fn typed(builder: &mut GraphBuilder, table: &SymbolTable) {
    let mut qualified: BTreeMap<String, String> = BTreeMap::new();
    for (key, info) in table.iter() {
        if matches!(info.kind.as_str(), "type" | "struct" | "interface")
            && !info.package_name.is_empty()
        {
            qualified
                .entry(format!("{}.{}", info.package_name, info.name))
                .or_insert_with(|| to_node_id(key));
        }
    }

    for (key, info) in table.iter() {
        if !matches!(info.kind.as_str(), "param" | "var" | "field") {
            continue;
        }
        let trimmed = trim_type_prefixes(&info.type_string);
        let Some(type_id) = qualified.get(trimmed) else {
            continue;
        };
        builder.add_edge(
            EdgeLabel::Typed,
            to_node_id(key),
            type_id.clone(),
            props(&[("type", trimmed)]),
        );
    }
}

fn trim_type_prefixes(type_string: &str) -> &str {
    let mut s = type_string;
    loop {
        if let Some(rest) = s.strip_prefix('*') {
            s = rest;
        } else if let Some(rest) = s.strip_prefix("[]") {
            s = rest;
        } else {
            return s;
        }
    }
}

/// `scope —encloses→ type` for every type declaration.
fn scope_encloses_type(builder: &mut GraphBuilder, table: &SymbolTable) {
    for (key, info) in table.iter() {
        if !matches!(info.kind.as_str(), "type" | "struct" | "interface")
            || is_primitive(&info.name)
        {
            continue;
        }
        let scope_id = scope_node_id(&parent_dir(uri_path(&info.uri)), &info.package_name);
        builder.add_edge(
            EdgeLabel::Encloses,
            scope_id,
            to_node_id(key),
            props(&[("name", &info.name)]),
        );
    }
}

/// `file —requires→ file` for every import of a package declared in the
/// analyzed tree, excluding self-imports.
fn requires(builder: &mut GraphBuilder, sasts: &BTreeMap<PathBuf, SastNode>) {
    let mut package_files: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for sast in sasts.values() {
        let (Some(position), Some(package)) =
            (&sast.position, sast.child_of_kind(NodeKind::Package))
        else {
            continue;
        };
        package_files
            .entry(package.name.clone())
            .or_default()
            .push(position.path().to_string());
    }

    for sast in sasts.values() {
        let Some(position) = &sast.position else {
            continue;
        };
        let source_path = position.path();
        for import in sast.children.iter().filter(|c| c.kind == NodeKind::Import) {
            let tail = import.name.rsplit('/').next().unwrap_or(&import.name);
            let Some(targets) = package_files.get(tail) else {
                continue;
            };
            for target in targets {
                if target == source_path {
                    continue;
                }
                builder.add_edge(
                    EdgeLabel::Requires,
                    file_node_id(source_path),
                    file_node_id(target),
                    props(&[("imported", &import.name)]),
                );
            }
        }
    }
}

/// `project —includes→ entity` for everything under the root.
fn project_includes(builder: &mut GraphBuilder, root: &Path, skip_dir: &Path) -> Result<()> {
    let root_str = root.to_string_lossy().replace('\\', "/");
    let project_id = format!("project:{}", to_node_id(&root_str));
    for entry in walk_project(root, skip_dir)? {
        let entry_str = entry.to_string_lossy().replace('\\', "/");
        let entry_id = if entry.is_dir() {
            to_node_id(&entry_str)
        } else {
            file_node_id(&entry_str)
        };
        builder.add_edge(
            EdgeLabel::Includes,
            project_id.clone(),
            entry_id,
            BTreeMap::new(),
        );
    }
    Ok(())
}

/// `operation —uses→ variable` for every resolved `VarUse` / `FieldUse`
/// inside a function body. Targets are derived from `declaredAt` directly;
/// uses of function-local variables reference positions that have no node.
fn operation_uses_variable(builder: &mut GraphBuilder, sasts: &BTreeMap<PathBuf, SastNode>) {
    for sast in sasts.values() {
        walk_with_function(sast, None, &mut |node, current| {
            if node.kind != NodeKind::VarUse && node.kind != NodeKind::FieldUse {
                return;
            }
            let Some(operation) = current else {
                return;
            };
            let Some(declared) = &node.declared_at else {
                return;
            };
            builder.add_edge(
                EdgeLabel::Uses,
                operation.to_string(),
                to_node_id(&declared.pos_key()),
                props(&[("name", &node.name), ("kind", &declared.kind)]),
            );
        });
    }
}

fn uri_path(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}

/// Depth-first walk threading the nearest enclosing operation's node ID.
fn walk_with_function(
    node: &SastNode,
    current: Option<&str>,
    f: &mut impl FnMut(&SastNode, Option<&str>),
) {
    f(node, current);
    let own_id;
    let next = if matches!(node.kind, NodeKind::Function | NodeKind::Method) {
        match &node.position {
            Some(position) => {
                own_id = to_node_id(&position.pos_key());
                Some(own_id.as_str())
            }
            None => current,
        }
    } else {
        current
    };
    for child in &node.children {
        walk_with_function(child, next, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sast::{DeclaredAt, Position};

    const URI: &str = "file:///proj/calc.go";

    fn entry(line: usize, character: usize, name: &str, kind: &str) -> DefInfo {
        DefInfo {
            name: name.to_string(),
            kind: kind.to_string(),
            uri: URI.to_string(),
            line,
            character,
            type_string: String::new(),
            receiver_type: String::new(),
            package_name: "calc".to_string(),
        }
    }

    fn edge_triples(builder: GraphBuilder) -> Vec<(String, String, String)> {
        builder
            .into_graph()
            .elements
            .edges
            .into_iter()
            .map(|e| (e.data.source, e.data.label, e.data.target))
            .collect()
    }

    #[test]
    fn test_type_encapsulates_operation() {
        let mut table = SymbolTable::new();
        table.insert(entry(2, 5, "Calculator", "struct"));
        let mut method = entry(5, 20, "CalculateSum", "method");
        method.receiver_type = "Calculator".to_string();
        table.insert(method);

        let mut builder = GraphBuilder::new();
        type_encapsulates_operation(&mut builder, &table);

        let triples = edge_triples(builder);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].0, format!("{}:2:5", URI));
        assert_eq!(triples[0].1, "encapsulates");
        assert_eq!(triples[0].2, format!("{}:5:20", URI));
    }

    #[test]
    fn test_typed_matches_qualified_names_only() {
        let mut table = SymbolTable::new();
        let mut req_type = entry(2, 5, "CalculationRequest", "struct");
        req_type.package_name = "models".to_string();
        table.insert(req_type);

        let mut param = entry(7, 9, "req", "param");
        param.type_string = "models.CalculationRequest".to_string();
        table.insert(param);

        let mut untyped = entry(8, 9, "n", "param");
        untyped.type_string = "int".to_string();
        table.insert(untyped);

        let mut builder = GraphBuilder::new();
        typed(&mut builder, &table);

        let triples = edge_triples(builder);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].0, format!("{}:7:9", URI));
        assert_eq!(triples[0].2, format!("{}:2:5", URI));
    }

    #[test]
    fn test_typed_trims_pointer_and_slice() {
        assert_eq!(trim_type_prefixes("*[]models.Item"), "models.Item");
        assert_eq!(trim_type_prefixes("models.Item"), "models.Item");
    }

    #[test]
    fn test_file_declares_skips_params() {
        let mut table = SymbolTable::new();
        table.insert(entry(2, 5, "Calculator", "struct"));
        table.insert(entry(7, 9, "req", "param"));

        let mut builder = GraphBuilder::new();
        file_declares(&mut builder, &table);

        let triples = edge_triples(builder);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].2, format!("{}:2:5", URI));
    }

    #[test]
    fn test_invokes_prefers_declared_at() {
        let mut table = SymbolTable::new();
        // Two same-named functions; declaredAt disambiguates.
        table.insert(entry(3, 5, "Run", "func"));
        let mut other = entry(9, 5, "Run", "func");
        other.uri = "file:///proj/other.go".to_string();
        table.insert(other);

        let mut call = SastNode::new(NodeKind::Call, "Run", Position::new(URI, 12, 1));
        call.declared_at = Some(DeclaredAt {
            name: "Run".to_string(),
            uri: "file:///proj/other.go".to_string(),
            line: 9,
            character: 5,
            kind: "func".to_string(),
            type_string: String::new(),
            receiver_type: String::new(),
            package_name: "calc".to_string(),
        });

        let resolved = resolve_callee(&call, &table).unwrap();
        assert_eq!(resolved.uri, "file:///proj/other.go");

        // Without declaredAt the sorted name scan still resolves.
        let bare = SastNode::new(NodeKind::Call, "Run", Position::new(URI, 12, 1));
        let resolved = resolve_callee(&bare, &table).unwrap();
        assert_eq!(resolved.uri, URI);
    }
}
