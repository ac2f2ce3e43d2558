//! Walks Simplified ASTs and catalogs every declaration.

use crate::sast::{NodeKind, SastNode};

use super::{is_primitive, DefInfo, SymbolTable};

/// Collect the symbol table of a single SAST.
pub fn collect(root: &SastNode) -> SymbolTable {
    let mut table = SymbolTable::new();
    let package = root
        .child_of_kind(NodeKind::Package)
        .map(|p| p.name.clone())
        .unwrap_or_default();

    walk(root, &package, &mut table);
    table
}

fn walk(node: &SastNode, package: &str, table: &mut SymbolTable) {
    match node.kind {
        NodeKind::Function => {
            if let Some(entry) = decl_entry(node, "func", package, "") {
                table.insert(entry);
            }
            collect_params(node, package, table);
        }
        NodeKind::Method => {
            let receiver = receiver_type(node).unwrap_or_default();
            if let Some(entry) = decl_entry(node, "method", package, &receiver) {
                table.insert(entry);
            }
            collect_params(node, package, table);
        }
        NodeKind::Struct => {
            if let Some(entry) = decl_entry(node, "struct", package, "") {
                table.insert(entry);
            }
            for field in node.children.iter().filter(|c| c.kind == NodeKind::Field) {
                collect_member(field, "field", package, "", table);
            }
        }
        NodeKind::Interface => {
            // Interface members are operations; they carry the interface
            // name as their receiver.
            if let Some(entry) = decl_entry(node, "interface", package, "") {
                table.insert(entry);
            }
            for field in node.children.iter().filter(|c| c.kind == NodeKind::Field) {
                collect_member(field, "method", package, &node.name, table);
            }
        }
        NodeKind::Type => {
            if let Some(entry) = decl_entry(node, "type", package, "") {
                table.insert(entry);
            }
        }
        NodeKind::GlobalVar => {
            for ident in node.children.iter().filter(|c| c.kind == NodeKind::Ident) {
                if let Some(position) = &ident.position {
                    table.insert(DefInfo {
                        name: ident.name.clone(),
                        kind: "var".to_string(),
                        uri: position.uri.clone(),
                        line: position.line,
                        character: position.character,
                        type_string: declared_type(ident),
                        receiver_type: String::new(),
                        package_name: package.to_string(),
                    });
                }
            }
        }
        _ => {}
    }

    for child in &node.children {
        walk(child, package, table);
    }
}

/// Entry for a declaration node positioned at its name identifier.
fn decl_entry(node: &SastNode, kind: &str, package: &str, receiver: &str) -> Option<DefInfo> {
    let position = node.position.as_ref()?;
    let type_string = match kind {
        // Structural kinds carry no type string.
        "struct" | "interface" | "type" => String::new(),
        _ => declared_type(node),
    };
    Some(DefInfo {
        name: node.name.clone(),
        kind: kind.to_string(),
        uri: position.uri.clone(),
        line: position.line,
        character: position.character,
        type_string,
        receiver_type: receiver.to_string(),
        package_name: package.to_string(),
    })
}

/// Parameters of a function or method: within each `Field` under `Params`,
/// the type identifier is singled out and every other identifier becomes a
/// `param` entry typed by it.
fn collect_params(func: &SastNode, package: &str, table: &mut SymbolTable) {
    let Some(params) = func.child_of_kind(NodeKind::Params) else {
        return;
    };
    for field in params.children.iter().filter(|c| c.kind == NodeKind::Field) {
        collect_member(field, "param", package, "", table);
    }
}

/// Shared discipline for params, struct fields, and interface members: find
/// the type identifier among the field's children, record the rest.
fn collect_member(
    field: &SastNode,
    kind: &str,
    package: &str,
    receiver: &str,
    table: &mut SymbolTable,
) {
    let idents: Vec<&SastNode> = field
        .children
        .iter()
        .filter(|c| c.kind == NodeKind::Ident)
        .collect();
    if idents.is_empty() {
        return;
    }

    let type_index = idents.iter().rposition(|ident| is_type_ident(ident));
    let type_name = type_index.map(|i| idents[i].name.clone()).unwrap_or_default();

    // A field holding nothing but its type is an unnamed parameter.
    if kind == "param" && idents.len() == 1 && type_index == Some(0) {
        return;
    }

    for (i, ident) in idents.iter().enumerate() {
        if Some(i) == type_index && idents.len() > 1 {
            continue;
        }
        let Some(position) = &ident.position else {
            continue;
        };
        let own_type = declared_type(ident);
        table.insert(DefInfo {
            name: ident.name.clone(),
            kind: kind.to_string(),
            uri: position.uri.clone(),
            line: position.line,
            character: position.character,
            type_string: if own_type.is_empty() {
                type_name.clone()
            } else {
                own_type
            },
            receiver_type: receiver.to_string(),
            package_name: package.to_string(),
        });
    }
}

/// Whether an identifier names a type: resolved as one, primitive, or
/// package-qualified.
fn is_type_ident(ident: &SastNode) -> bool {
    if let Some(declared) = &ident.declared_at {
        if declared.kind == "typeName" || declared.kind == "builtin" {
            return true;
        }
        if declared.kind == "var" || declared.kind == "param" || declared.kind == "field" {
            return false;
        }
    }
    is_primitive(&ident.name) || ident.name.contains('.')
}

/// The canonical type carried on an identifier's resolution, when present.
fn declared_type(node: &SastNode) -> String {
    node.declared_at
        .as_ref()
        .map(|d| d.type_string.clone())
        .unwrap_or_default()
}

/// Receiver type of a method: the last identifier of the
/// `Receiver → FieldList → Field` chain.
fn receiver_type(method: &SastNode) -> Option<String> {
    let receiver = method.child_of_kind(NodeKind::Receiver)?;
    let field_list = receiver.child_of_kind(NodeKind::FieldList)?;
    let field = field_list.child_of_kind(NodeKind::Field)?;
    field
        .children
        .iter()
        .filter(|c| c.kind == NodeKind::Ident)
        .last()
        .map(|ident| ident.name.clone())
}
