//! Phase one of resolution: a per-package catalog of top-level declarations.
//!
//! Built once over every parse tree in a package group, before any identifier
//! is resolved. All positions are those of the declaring name identifiers,
//! 0-based. Rendered type strings are canonically qualified: a bare name that
//! refers to a type declared in the same package is stored as `pkg.Name`.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use tree_sitter::Node;

use crate::sast::Position;
use crate::toolchain::ParseTree;

use super::parser::node_text;
use super::typestr::{base_type_name, receiver_base, render_type, split_qualified};

/// A named member of a type or a parameter of a signature.
#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub name: String,
    pub pos: Position,
    pub type_string: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeForm {
    Struct,
    Interface,
    Named,
}

/// A top-level type declaration.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub form: TypeForm,
    pub pos: Position,
    pub fields: Vec<MemberDecl>,
}

/// A function, method, or interface-member signature.
#[derive(Debug, Clone)]
pub struct FuncSig {
    pub name: String,
    pub pos: Position,
    pub package: String,
    /// Base receiver type name; empty for plain functions.
    pub receiver: String,
    pub params: Vec<MemberDecl>,
    pub results: Vec<String>,
}

impl FuncSig {
    /// Canonical signature string: `func(models.CalculationRequest) models.CalculationResult`.
    pub fn type_string(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| p.type_string.as_str()).collect();
        let mut sig = format!("func({})", params.join(", "));
        match self.results.len() {
            0 => {}
            1 => {
                sig.push(' ');
                sig.push_str(&self.results[0]);
            }
            _ => {
                sig.push_str(&format!(" ({})", self.results.join(", ")));
            }
        }
        sig
    }
}

/// A package-level var or const.
#[derive(Debug, Clone)]
pub struct GlobalDecl {
    pub name: String,
    pub pos: Position,
    pub type_string: String,
    pub is_const: bool,
}

/// Everything declared at the top level of one package.
#[derive(Debug)]
pub struct PackageIndex {
    pub name: String,
    pub dir: PathBuf,
    /// Position of the package clause identifier in the first file.
    pub clause_pos: Position,
    pub types: BTreeMap<String, TypeDecl>,
    pub funcs: BTreeMap<String, FuncSig>,
    /// Methods keyed by `(base receiver or interface name, method name)`.
    pub methods: BTreeMap<(String, String), FuncSig>,
    pub globals: BTreeMap<String, GlobalDecl>,
}

impl PackageIndex {
    pub fn lookup_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    pub fn lookup_field(&self, type_name: &str, field: &str) -> Option<&MemberDecl> {
        self.types
            .get(type_name)
            .and_then(|t| t.fields.iter().find(|f| f.name == field))
    }

    pub fn lookup_method(&self, type_name: &str, method: &str) -> Option<&FuncSig> {
        self.methods
            .get(&(type_name.to_string(), method.to_string()))
    }
}

/// The package clause name of a parsed file, if it has one.
pub fn package_clause(tree: &ParseTree) -> Option<(String, Position)> {
    let root = tree.tree.root_node();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "package_clause" {
            let mut inner = child.walk();
            for ident in child.named_children(&mut inner) {
                if ident.kind() == "package_identifier" {
                    let pos = Position::new(
                        tree.uri.clone(),
                        ident.start_position().row,
                        ident.start_position().column,
                    );
                    return Some((node_text(ident, &tree.source).to_string(), pos));
                }
            }
        }
    }
    None
}

/// Build the declaration index for one package group.
pub fn index_package(name: &str, dir: PathBuf, files: &[&ParseTree]) -> PackageIndex {
    // First sweep: the package's own type names, for qualification.
    let mut own_types = BTreeSet::new();
    for file in files {
        let root = file.tree.root_node();
        let mut cursor = root.walk();
        for decl in root.named_children(&mut cursor) {
            if decl.kind() == "type_declaration" {
                let mut inner = decl.walk();
                for spec in decl.named_children(&mut inner) {
                    if spec.kind() == "type_spec" {
                        if let Some(n) = spec.child_by_field_name("name") {
                            own_types.insert(node_text(n, &file.source).to_string());
                        }
                    }
                }
            }
        }
    }

    let clause_pos = files
        .first()
        .and_then(|f| package_clause(f))
        .map(|(_, pos)| pos)
        .unwrap_or_else(|| Position::new(String::new(), 0, 0));

    let mut index = PackageIndex {
        name: name.to_string(),
        dir,
        clause_pos,
        types: BTreeMap::new(),
        funcs: BTreeMap::new(),
        methods: BTreeMap::new(),
        globals: BTreeMap::new(),
    };

    for file in files {
        index_file(&mut index, file, &own_types);
    }

    index
}

fn index_file(index: &mut PackageIndex, file: &ParseTree, own_types: &BTreeSet<String>) {
    let root = file.tree.root_node();
    let mut cursor = root.walk();
    for decl in root.named_children(&mut cursor) {
        match decl.kind() {
            "function_declaration" => {
                if let Some(sig) = function_sig(index, decl, file, own_types, "") {
                    index.funcs.insert(sig.name.clone(), sig);
                }
            }
            "method_declaration" => {
                let receiver = decl
                    .child_by_field_name("receiver")
                    .and_then(|r| receiver_type_name(r, &file.source))
                    .unwrap_or_default();
                if let Some(sig) = function_sig(index, decl, file, own_types, &receiver) {
                    index
                        .methods
                        .insert((receiver.clone(), sig.name.clone()), sig);
                }
            }
            "type_declaration" => index_type_decl(index, decl, file, own_types),
            "var_declaration" => index_globals(index, decl, file, own_types, false),
            "const_declaration" => index_globals(index, decl, file, own_types, true),
            _ => {}
        }
    }
}

fn index_type_decl(
    index: &mut PackageIndex,
    decl: Node,
    file: &ParseTree,
    own_types: &BTreeSet<String>,
) {
    let mut cursor = decl.walk();
    for spec in decl.named_children(&mut cursor) {
        // Aliases never become declarations.
        if spec.kind() != "type_spec" {
            continue;
        }
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, &file.source).to_string();
        let pos = node_position(name_node, &file.uri);
        let Some(type_node) = spec.child_by_field_name("type") else {
            continue;
        };

        match type_node.kind() {
            "struct_type" => {
                let fields = struct_fields(index, type_node, file, own_types);
                index.types.insert(
                    name.clone(),
                    TypeDecl {
                        name,
                        form: TypeForm::Struct,
                        pos,
                        fields,
                    },
                );
            }
            "interface_type" => {
                let iface = name.clone();
                index.types.insert(
                    name.clone(),
                    TypeDecl {
                        name,
                        form: TypeForm::Interface,
                        pos,
                        fields: Vec::new(),
                    },
                );
                index_interface_members(index, type_node, file, own_types, &iface);
            }
            _ => {
                index.types.insert(
                    name.clone(),
                    TypeDecl {
                        name,
                        form: TypeForm::Named,
                        pos,
                        fields: Vec::new(),
                    },
                );
            }
        }
    }
}

fn struct_fields(
    index: &PackageIndex,
    struct_node: Node,
    file: &ParseTree,
    own_types: &BTreeSet<String>,
) -> Vec<MemberDecl> {
    let mut fields = Vec::new();
    let Some(list) = child_of_kind(struct_node, "field_declaration_list") else {
        return fields;
    };
    let mut cursor = list.walk();
    for field in list.named_children(&mut cursor) {
        if field.kind() != "field_declaration" {
            continue;
        }
        let type_string = field
            .child_by_field_name("type")
            .map(|t| qualified_render(t, &file.source, &index.name, own_types))
            .unwrap_or_default();
        let mut has_name = false;
        let mut name_cursor = field.walk();
        for name_node in field.children_by_field_name("name", &mut name_cursor) {
            has_name = true;
            fields.push(MemberDecl {
                name: node_text(name_node, &file.source).to_string(),
                pos: node_position(name_node, &file.uri),
                type_string: type_string.clone(),
            });
        }
        // Embedded field: the type itself is the member name.
        if !has_name {
            if let Some(t) = field.child_by_field_name("type") {
                let rendered = render_type(t, &file.source);
                let base = base_type_name(&rendered);
                let (_, simple) = split_qualified(base);
                fields.push(MemberDecl {
                    name: simple.to_string(),
                    pos: node_position(t, &file.uri),
                    type_string: type_string.clone(),
                });
            }
        }
    }
    fields
}

fn index_interface_members(
    index: &mut PackageIndex,
    iface_node: Node,
    file: &ParseTree,
    own_types: &BTreeSet<String>,
    iface: &str,
) {
    let mut cursor = iface_node.walk();
    for member in iface_node.named_children(&mut cursor) {
        if member.kind() != "method_elem" && member.kind() != "method_spec" {
            continue;
        }
        let Some(name_node) = member.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, &file.source).to_string();
        let sig = FuncSig {
            name: name.clone(),
            pos: node_position(name_node, &file.uri),
            package: index.name.clone(),
            receiver: iface.to_string(),
            params: signature_params(index, member, file, own_types),
            results: signature_results(index, member, file, own_types),
        };
        index.methods.insert((iface.to_string(), name), sig);
    }
}

fn index_globals(
    index: &mut PackageIndex,
    decl: Node,
    file: &ParseTree,
    own_types: &BTreeSet<String>,
    is_const: bool,
) {
    for spec in value_specs(decl) {
        let type_string = spec
            .child_by_field_name("type")
            .map(|t| qualified_render(t, &file.source, &index.name, own_types))
            .unwrap_or_default();
        let mut name_cursor = spec.walk();
        for name_node in spec.children_by_field_name("name", &mut name_cursor) {
            let name = node_text(name_node, &file.source).to_string();
            index.globals.insert(
                name.clone(),
                GlobalDecl {
                    name,
                    pos: node_position(name_node, &file.uri),
                    type_string: type_string.clone(),
                    is_const,
                },
            );
        }
    }
}

fn function_sig(
    index: &PackageIndex,
    decl: Node,
    file: &ParseTree,
    own_types: &BTreeSet<String>,
    receiver: &str,
) -> Option<FuncSig> {
    let name_node = decl.child_by_field_name("name")?;
    Some(FuncSig {
        name: node_text(name_node, &file.source).to_string(),
        pos: node_position(name_node, &file.uri),
        package: index.name.clone(),
        receiver: receiver.to_string(),
        params: signature_params(index, decl, file, own_types),
        results: signature_results(index, decl, file, own_types),
    })
}

fn signature_params(
    index: &PackageIndex,
    decl: Node,
    file: &ParseTree,
    own_types: &BTreeSet<String>,
) -> Vec<MemberDecl> {
    let mut params = Vec::new();
    let Some(list) = decl.child_by_field_name("parameters") else {
        return params;
    };
    let mut cursor = list.walk();
    for param in list.named_children(&mut cursor) {
        if param.kind() != "parameter_declaration" && param.kind() != "variadic_parameter_declaration"
        {
            continue;
        }
        let type_string = param
            .child_by_field_name("type")
            .map(|t| qualified_render(t, &file.source, &index.name, own_types))
            .unwrap_or_default();
        let mut has_name = false;
        let mut name_cursor = param.walk();
        for name_node in param.children_by_field_name("name", &mut name_cursor) {
            has_name = true;
            params.push(MemberDecl {
                name: node_text(name_node, &file.source).to_string(),
                pos: node_position(name_node, &file.uri),
                type_string: type_string.clone(),
            });
        }
        if !has_name {
            if let Some(t) = param.child_by_field_name("type") {
                params.push(MemberDecl {
                    name: String::new(),
                    pos: node_position(t, &file.uri),
                    type_string,
                });
            }
        }
    }
    params
}

fn signature_results(
    index: &PackageIndex,
    decl: Node,
    file: &ParseTree,
    own_types: &BTreeSet<String>,
) -> Vec<String> {
    let mut results = Vec::new();
    let Some(result) = decl.child_by_field_name("result") else {
        return results;
    };
    if result.kind() == "parameter_list" {
        let mut cursor = result.walk();
        for param in result.named_children(&mut cursor) {
            if param.kind() != "parameter_declaration" {
                continue;
            }
            if let Some(t) = param.child_by_field_name("type") {
                let rendered = qualified_render(t, &file.source, &index.name, own_types);
                let mut name_cursor = param.walk();
                let names = param.children_by_field_name("name", &mut name_cursor).count();
                for _ in 0..names.max(1) {
                    results.push(rendered.clone());
                }
            }
        }
    } else {
        results.push(qualified_render(result, &file.source, &index.name, own_types));
    }
    results
}

/// Render a type expression, qualifying bare names declared in this package.
fn qualified_render(
    node: Node,
    source: &str,
    pkg_name: &str,
    own_types: &BTreeSet<String>,
) -> String {
    let rendered = render_type(node, source);
    qualify(&rendered, pkg_name, own_types)
}

pub(super) fn qualify(rendered: &str, pkg_name: &str, own_types: &BTreeSet<String>) -> String {
    let base = base_type_name(rendered);
    if !base.contains('.') && own_types.contains(base) {
        let prefix_len = rendered.len() - base.len();
        format!("{}{}.{}", &rendered[..prefix_len], pkg_name, base)
    } else {
        rendered.to_string()
    }
}

/// The `var_spec` / `const_spec` children of a declaration, looking through
/// the grouping node of parenthesized forms.
pub fn value_specs(decl: Node) -> Vec<Node> {
    let mut specs = Vec::new();
    let mut stack = vec![decl];
    while let Some(n) = stack.pop() {
        let mut cursor = n.walk();
        for child in n.named_children(&mut cursor) {
            match child.kind() {
                "var_spec" | "const_spec" => specs.push(child),
                "var_spec_list" | "const_spec_list" => stack.push(child),
                _ => {}
            }
        }
    }
    specs
}

/// Base type name of a method receiver: `(c *Calculator)` → `Calculator`.
pub fn receiver_type_name(receiver_list: Node, source: &str) -> Option<String> {
    let mut cursor = receiver_list.walk();
    for param in receiver_list.named_children(&mut cursor) {
        if param.kind() == "parameter_declaration" {
            if let Some(t) = param.child_by_field_name("type") {
                return Some(receiver_base(&render_type(t, source)).to_string());
            }
        }
    }
    None
}

pub(super) fn node_position(node: Node, uri: &str) -> Position {
    Position::new(
        uri.to_string(),
        node.start_position().row,
        node.start_position().column,
    )
}

pub(super) fn child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}
