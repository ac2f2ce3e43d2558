//! Builds Simplified ASTs from Go parse trees.
//!
//! The projection keeps declarations and resolution-bearing expressions and
//! drops everything else. Group-declaration wrappers are flattened into the
//! file node, type aliases disappear, and function bodies are reduced to a
//! flat, source-ordered list of calls and uses.

use std::collections::HashSet;

use tree_sitter::Node;

use crate::toolchain::go::index::value_specs;
use crate::toolchain::go::parser::node_text;
use crate::toolchain::go::typestr::{receiver_base, render_type};
use crate::toolchain::{site_of, Object, ObjectKind, ParseTree, SelectionKind, Site, TypeInfo};

use super::{DeclaredAt, NodeKind, Position, SastNode};

/// Package-level variable and constant names across all parse trees. Feeds
/// the `VarUse` / `GlobalVarUse` split during body scanning.
pub fn collect_global_names(trees: &[&ParseTree]) -> HashSet<String> {
    let mut globals = HashSet::new();
    for tree in trees {
        let root = tree.tree.root_node();
        let mut cursor = root.walk();
        for decl in root.named_children(&mut cursor) {
            if decl.kind() != "var_declaration" && decl.kind() != "const_declaration" {
                continue;
            }
            for spec in value_specs(decl) {
                let mut name_cursor = spec.walk();
                for name in spec.children_by_field_name("name", &mut name_cursor) {
                    globals.insert(node_text(name, &tree.source).to_string());
                }
            }
        }
    }
    globals
}

pub struct SastBuilder<'a> {
    info: &'a TypeInfo,
    globals: &'a HashSet<String>,
}

impl<'a> SastBuilder<'a> {
    pub fn new(info: &'a TypeInfo, globals: &'a HashSet<String>) -> Self {
        Self { info, globals }
    }

    /// Project one parse tree into a SAST.
    pub fn build(&self, file: &ParseTree) -> SastNode {
        let root = file.tree.root_node();
        let basename = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut out = SastNode::new(
            NodeKind::File,
            basename,
            self.position(root, file),
        );

        let mut cursor = root.walk();
        for decl in root.named_children(&mut cursor) {
            match decl.kind() {
                "package_clause" => {
                    let mut inner = decl.walk();
                    for ident in decl.named_children(&mut inner) {
                        if ident.kind() == "package_identifier" {
                            let node = self.ident_node(NodeKind::Package, ident, file);
                            out.children.push(node);
                        }
                    }
                }
                "import_declaration" => self.imports(decl, file, &mut out.children),
                "function_declaration" => {
                    out.children.push(self.function(decl, file, false));
                }
                "method_declaration" => {
                    out.children.push(self.function(decl, file, true));
                }
                "type_declaration" => self.type_decl(decl, file, &mut out.children),
                "var_declaration" | "const_declaration" => {
                    self.global_var(decl, file, &mut out.children)
                }
                _ => {}
            }
        }

        out
    }

    fn imports(&self, decl: Node, file: &ParseTree, out: &mut Vec<SastNode>) {
        let mut stack = vec![decl];
        while let Some(n) = stack.pop() {
            let mut cursor = n.walk();
            for child in n.named_children(&mut cursor) {
                match child.kind() {
                    "import_spec" => {
                        let path = child
                            .child_by_field_name("path")
                            .map(|p| {
                                node_text(p, &file.source)
                                    .trim_matches(|c| c == '"' || c == '`')
                                    .to_string()
                            })
                            .unwrap_or_default();
                        out.push(SastNode::new(
                            NodeKind::Import,
                            path,
                            self.position(child, file),
                        ));
                    }
                    "import_spec_list" => stack.push(child),
                    _ => {}
                }
            }
        }
    }

    fn type_decl(&self, decl: Node, file: &ParseTree, out: &mut Vec<SastNode>) {
        let mut cursor = decl.walk();
        for spec in decl.named_children(&mut cursor) {
            // `type A = B` is an alias, dropped entirely.
            if spec.kind() != "type_spec" {
                continue;
            }
            let Some(name_node) = spec.child_by_field_name("name") else {
                continue;
            };
            let Some(type_node) = spec.child_by_field_name("type") else {
                continue;
            };
            match type_node.kind() {
                "struct_type" => {
                    let mut node = self.ident_node(NodeKind::Struct, name_node, file);
                    self.struct_fields(type_node, file, &mut node.children);
                    out.push(node);
                }
                "interface_type" => {
                    let mut node = self.ident_node(NodeKind::Interface, name_node, file);
                    self.interface_members(type_node, file, &mut node.children);
                    out.push(node);
                }
                _ => {
                    let mut node = self.ident_node(NodeKind::Type, name_node, file);
                    if let Some(ident) = self.type_ident(type_node, file) {
                        node.children.push(ident);
                    }
                    out.push(node);
                }
            }
        }
    }

    fn struct_fields(&self, struct_node: Node, file: &ParseTree, out: &mut Vec<SastNode>) {
        let mut stack = vec![struct_node];
        while let Some(n) = stack.pop() {
            let mut cursor = n.walk();
            for child in n.named_children(&mut cursor) {
                match child.kind() {
                    "field_declaration_list" => stack.push(child),
                    "field_declaration" => {
                        let mut field =
                            SastNode::new(NodeKind::Field, "", self.position(child, file));
                        let mut name_cursor = child.walk();
                        for name in child.children_by_field_name("name", &mut name_cursor) {
                            field.children.push(self.ident_node(NodeKind::Ident, name, file));
                        }
                        if let Some(t) = child.child_by_field_name("type") {
                            if let Some(ident) = self.type_ident(t, file) {
                                field.children.push(ident);
                            }
                        }
                        out.push(field);
                    }
                    _ => {}
                }
            }
        }
    }

    fn interface_members(&self, iface_node: Node, file: &ParseTree, out: &mut Vec<SastNode>) {
        let mut cursor = iface_node.walk();
        for member in iface_node.named_children(&mut cursor) {
            if member.kind() != "method_elem" && member.kind() != "method_spec" {
                continue;
            }
            let Some(name_node) = member.child_by_field_name("name") else {
                continue;
            };
            let mut field = SastNode::new(NodeKind::Field, "", self.position(member, file));
            field
                .children
                .push(self.ident_node(NodeKind::Ident, name_node, file));
            out.push(field);
        }
    }

    fn global_var(&self, decl: Node, file: &ParseTree, out: &mut Vec<SastNode>) {
        for spec in value_specs(decl) {
            let mut node = SastNode::new(NodeKind::GlobalVar, "", self.position(spec, file));
            let mut name_cursor = spec.walk();
            for name in spec.children_by_field_name("name", &mut name_cursor) {
                node.children.push(self.ident_node(NodeKind::Ident, name, file));
            }
            out.push(node);
        }
    }

    fn function(&self, decl: Node, file: &ParseTree, is_method: bool) -> SastNode {
        let kind = if is_method {
            NodeKind::Method
        } else {
            NodeKind::Function
        };
        let name_node = decl.child_by_field_name("name");
        let mut node = match name_node {
            Some(n) => self.ident_node(kind, n, file),
            None => SastNode::new(kind, "", self.position(decl, file)),
        };

        if is_method {
            if let Some(recv) = decl.child_by_field_name("receiver") {
                node.children.push(self.receiver(recv, file));
            }
        }

        let mut params = SastNode::new(NodeKind::Params, "", {
            decl.child_by_field_name("parameters")
                .map(|p| self.position(p, file))
                .unwrap_or_else(|| self.position(decl, file))
        });
        if let Some(list) = decl.child_by_field_name("parameters") {
            self.parameter_fields(list, file, &mut params.children);
        }
        node.children.push(params);

        if let Some(result) = decl.child_by_field_name("result") {
            let mut results = SastNode::new(NodeKind::Results, "", self.position(result, file));
            self.result_fields(result, file, &mut results.children);
            node.children.push(results);
        }

        if let Some(body) = decl.child_by_field_name("body") {
            self.scan_body(body, file, &mut node.children);
        }

        node
    }

    fn receiver(&self, recv_list: Node, file: &ParseTree) -> SastNode {
        let mut receiver = SastNode::new(NodeKind::Receiver, "", self.position(recv_list, file));
        let mut field_list =
            SastNode::new(NodeKind::FieldList, "", self.position(recv_list, file));
        let mut cursor = recv_list.walk();
        for param in recv_list.named_children(&mut cursor) {
            if param.kind() != "parameter_declaration" {
                continue;
            }
            let mut field = SastNode::new(NodeKind::Field, "", self.position(param, file));
            let mut name_cursor = param.walk();
            for name in param.children_by_field_name("name", &mut name_cursor) {
                field.children.push(self.ident_node(NodeKind::Ident, name, file));
            }
            if let Some(t) = param.child_by_field_name("type") {
                if let Some(ident) = self.receiver_type_ident(t, file) {
                    field.children.push(ident);
                }
            }
            field_list.children.push(field);
        }
        receiver.children.push(field_list);
        receiver
    }

    fn parameter_fields(&self, list: Node, file: &ParseTree, out: &mut Vec<SastNode>) {
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            if param.kind() != "parameter_declaration"
                && param.kind() != "variadic_parameter_declaration"
            {
                continue;
            }
            let mut field = SastNode::new(NodeKind::Field, "", self.position(param, file));
            let mut name_cursor = param.walk();
            for name in param.children_by_field_name("name", &mut name_cursor) {
                field.children.push(self.ident_node(NodeKind::Ident, name, file));
            }
            if let Some(t) = param.child_by_field_name("type") {
                if let Some(ident) = self.type_ident(t, file) {
                    field.children.push(ident);
                }
            }
            out.push(field);
        }
    }

    fn result_fields(&self, result: Node, file: &ParseTree, out: &mut Vec<SastNode>) {
        if result.kind() == "parameter_list" {
            self.parameter_fields(result, file, out);
        } else {
            let mut field = SastNode::new(NodeKind::Field, "", self.position(result, file));
            if let Some(ident) = self.type_ident(result, file) {
                field.children.push(ident);
            }
            out.push(field);
        }
    }

    // ---- body scanning --------------------------------------------------

    /// Flatten a function body to its resolution-bearing expressions, in
    /// source order.
    fn scan_body(&self, node: Node, file: &ParseTree, out: &mut Vec<SastNode>) {
        match node.kind() {
            "call_expression" => {
                if let Some(function) = node.child_by_field_name("function") {
                    match function.kind() {
                        "identifier" => {
                            let declared_at = self.declared_at_for_use(function, file);
                            let call = self
                                .ident_node_raw(NodeKind::Call, function, file)
                                .with_declared_at(declared_at);
                            out.push(call);
                        }
                        "selector_expression" => {
                            if let Some(field) = function.child_by_field_name("field") {
                                let declared_at = self.declared_at_for_use(field, file);
                                let call = self
                                    .ident_node_raw(NodeKind::MethodCall, field, file)
                                    .with_declared_at(declared_at);
                                out.push(call);
                            }
                            if let Some(operand) = function.child_by_field_name("operand") {
                                self.scan_body(operand, file, out);
                            }
                        }
                        _ => self.scan_body(function, file, out),
                    }
                }
                if let Some(args) = node.child_by_field_name("arguments") {
                    let mut cursor = args.walk();
                    for arg in args.named_children(&mut cursor) {
                        self.scan_body(arg, file, out);
                    }
                }
            }
            "selector_expression" => {
                if let Some(field) = node.child_by_field_name("field") {
                    if let Some(use_node) = self.classify_selector(field, file) {
                        out.push(use_node);
                    }
                }
                if let Some(operand) = node.child_by_field_name("operand") {
                    self.scan_body(operand, file, out);
                }
            }
            "composite_literal" => {
                if let Some(t) = node.child_by_field_name("type") {
                    if t.kind() == "type_identifier" || t.kind() == "qualified_type" {
                        if let Some(ident) = self.type_use(t, file) {
                            out.push(ident);
                        }
                    }
                }
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.named_children(&mut cursor) {
                        self.scan_body(child, file, out);
                    }
                }
            }
            "identifier" => {
                if let Some(use_node) = self.classify_ident(node, file) {
                    out.push(use_node);
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.scan_body(child, file, out);
                }
            }
        }
    }

    /// A bare identifier survives only when it resolves to a non-field
    /// variable.
    fn classify_ident(&self, node: Node, file: &ParseTree) -> Option<SastNode> {
        let site = self.site(node, file);
        // Use sites only: declaration identifiers never become uses.
        let object = self.info.uses.get(&site)?;
        match object.kind {
            ObjectKind::Var | ObjectKind::Const => {
                let name = node_text(node, &file.source);
                let kind = if self.globals.contains(name) {
                    NodeKind::GlobalVarUse
                } else {
                    NodeKind::VarUse
                };
                Some(
                    self.ident_node_raw(kind, node, file)
                        .with_declared_at(Some(declared_at(object))),
                )
            }
            _ => None,
        }
    }

    /// A selector field outside call position: a method selection becomes a
    /// `MethodCall`, everything else falls back on the object kind.
    fn classify_selector(&self, field: Node, file: &ParseTree) -> Option<SastNode> {
        let site = self.site(field, file);

        if let Some(selection) = self.info.selections.get(&site) {
            let kind = match selection.kind {
                SelectionKind::MethodVal | SelectionKind::MethodExpr => NodeKind::MethodCall,
                SelectionKind::Field => NodeKind::FieldUse,
            };
            return Some(
                self.ident_node_raw(kind, field, file)
                    .with_declared_at(Some(declared_at(&selection.object))),
            );
        }

        match self.info.object_at(&site) {
            Some(object) => {
                let name = node_text(field, &file.source);
                let kind = match object.kind {
                    ObjectKind::TypeName => NodeKind::TypeUse,
                    ObjectKind::Field => NodeKind::FieldUse,
                    ObjectKind::Func => NodeKind::MethodCall,
                    ObjectKind::Var | ObjectKind::Const if self.globals.contains(name) => {
                        NodeKind::GlobalVarUse
                    }
                    _ => NodeKind::VarUse,
                };
                Some(
                    self.ident_node_raw(kind, field, file)
                        .with_declared_at(Some(declared_at(object))),
                )
            }
            None => Some(self.ident_node_raw(NodeKind::FieldUse, field, file)),
        }
    }

    fn type_use(&self, type_node: Node, file: &ParseTree) -> Option<SastNode> {
        let ident = named_type_ident(type_node)?;
        let declared_at = self.declared_at_for_use(ident, file);
        let mut node = SastNode::new(
            NodeKind::TypeUse,
            render_type(type_node, &file.source),
            self.position(ident, file),
        );
        node.declared_at = declared_at;
        Some(node)
    }

    // ---- node construction ----------------------------------------------

    /// An identifier-bearing node whose `declaredAt` comes from the def map
    /// first (declaration sites are their own declarations).
    fn ident_node(&self, kind: NodeKind, ident: Node, file: &ParseTree) -> SastNode {
        let site = self.site(ident, file);
        let declared_at = self
            .info
            .defs
            .get(&site)
            .or_else(|| self.info.uses.get(&site))
            .map(declared_at);
        SastNode::new(
            kind,
            node_text(ident, &file.source),
            self.position(ident, file),
        )
        .with_declared_at(declared_at)
    }

    /// An identifier-bearing node without automatic resolution.
    fn ident_node_raw(&self, kind: NodeKind, ident: Node, file: &ParseTree) -> SastNode {
        SastNode::new(
            kind,
            node_text(ident, &file.source),
            self.position(ident, file),
        )
    }

    /// The type identifier of a type expression, rendered with the full
    /// as-written spelling but positioned at the underlying named type.
    fn type_ident(&self, type_node: Node, file: &ParseTree) -> Option<SastNode> {
        let ident = named_type_ident(type_node)?;
        let declared_at = self.declared_at_for_use(ident, file);
        let mut node = SastNode::new(
            NodeKind::Ident,
            render_type(type_node, &file.source),
            self.position(ident, file),
        );
        node.declared_at = declared_at;
        Some(node)
    }

    /// Receiver types reduce to their base name: `*Calculator` → `Calculator`.
    fn receiver_type_ident(&self, type_node: Node, file: &ParseTree) -> Option<SastNode> {
        let ident = named_type_ident(type_node)?;
        let declared_at = self.declared_at_for_use(ident, file);
        let mut node = SastNode::new(
            NodeKind::Ident,
            receiver_base(&render_type(type_node, &file.source)).to_string(),
            self.position(ident, file),
        );
        node.declared_at = declared_at;
        Some(node)
    }

    fn declared_at_for_use(&self, ident: Node, file: &ParseTree) -> Option<DeclaredAt> {
        let site = self.site(ident, file);
        self.info.object_at(&site).map(declared_at)
    }

    fn site(&self, node: Node, file: &ParseTree) -> Site {
        site_of(&self.position(node, file))
    }

    fn position(&self, node: Node, file: &ParseTree) -> Position {
        Position::new(
            file.uri.clone(),
            node.start_position().row,
            node.start_position().column,
        )
    }
}

fn declared_at(object: &Object) -> DeclaredAt {
    DeclaredAt {
        name: object.name.clone(),
        uri: object.decl.uri.clone(),
        line: object.decl.line,
        character: object.decl.character,
        kind: object.decl_kind().to_string(),
        type_string: object.type_string.clone(),
        receiver_type: object.receiver_type.clone(),
        package_name: object.package.clone(),
    }
}

/// Drill through pointer, slice, array and parenthesized wrappers to the
/// named type identifier, if the expression bottoms out in one.
fn named_type_ident(type_node: Node) -> Option<Node> {
    match type_node.kind() {
        "type_identifier" => Some(type_node),
        "qualified_type" => type_node.child_by_field_name("name"),
        "pointer_type" | "parenthesized_type" => {
            let mut cursor = type_node.walk();
            let inner = type_node.named_children(&mut cursor).next();
            inner.and_then(named_type_ident)
        }
        "slice_type" | "array_type" => type_node
            .child_by_field_name("element")
            .and_then(named_type_ident),
        "generic_type" => type_node.child_by_field_name("type").and_then(named_type_ident),
        _ => None,
    }
}
