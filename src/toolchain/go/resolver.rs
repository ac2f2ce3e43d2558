//! Phase two of resolution: lexically-scoped identifier resolution.
//!
//! Walks each file against the package indexes, binding receivers, parameters
//! and local variables as they are encountered, and recording every resolved
//! identifier into the [`TypeInfo`] bundle. Selector expressions resolve
//! through the inferred type of their operand and are classified as field,
//! method-value, or method-expression selections. Anything that cannot be
//! resolved is left unresolved; downstream stages degrade instead of failing.

use std::collections::{BTreeMap, HashMap};

use tree_sitter::Node;

use crate::sast::Position;
use crate::toolchain::{Object, ObjectKind, Selection, SelectionKind, Site, TypeInfo};

use super::index::{receiver_type_name, FuncSig, GlobalDecl, MemberDecl, PackageIndex, TypeDecl};
use super::parser::node_text;
use super::typestr::{base_type_name, render_type, split_qualified};

const PRIMITIVE_TYPES: &[&str] = &[
    "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr", "float32", "float64", "complex64", "complex128", "byte",
    "rune", "error", "any",
];

const BUILTIN_FUNCS: &[&str] = &[
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make", "max",
    "min", "new", "panic", "print", "println", "real", "recover",
];

const BUILTIN_CONSTS: &[&str] = &["true", "false", "iota", "nil"];

pub fn is_primitive_type(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name)
}

fn is_builtin(name: &str) -> bool {
    is_primitive_type(name) || BUILTIN_FUNCS.contains(&name) || BUILTIN_CONSTS.contains(&name)
}

fn builtin_object(name: &str) -> Object {
    Object {
        name: name.to_string(),
        kind: ObjectKind::Builtin,
        decl: Position::new("builtin://go", 0, 0),
        package: String::new(),
        type_string: String::new(),
        receiver_type: String::new(),
    }
}

/// What an expression evaluated to, as far as resolution is concerned.
enum ExprVal {
    None,
    /// A package qualifier (import name).
    Pkg(String),
    /// A type name used as a value, e.g. the operand of a method expression.
    Type(Object),
    /// An ordinary value with an inferred type string.
    Value(String),
}

impl ExprVal {
    fn of(object: &Object) -> ExprVal {
        match object.kind {
            ObjectKind::TypeName => ExprVal::Type(object.clone()),
            _ => ExprVal::Value(object.type_string.clone()),
        }
    }
}

/// Resolves the files of one package group against the global index map.
pub struct Resolver<'a> {
    indexes: &'a BTreeMap<String, PackageIndex>,
}

impl<'a> Resolver<'a> {
    pub fn new(indexes: &'a BTreeMap<String, PackageIndex>) -> Self {
        Self { indexes }
    }

    pub fn resolve_file(
        &self,
        file: &crate::toolchain::ParseTree,
        pkg_name: &str,
        info: &mut TypeInfo,
    ) {
        let Some(pkg) = self.indexes.get(pkg_name) else {
            return;
        };
        let mut resolver = FileResolver {
            source: &file.source,
            uri: &file.uri,
            pkg,
            indexes: self.indexes,
            imports: HashMap::new(),
            scopes: Vec::new(),
            info,
        };
        resolver.run(file.tree.root_node());
    }
}

struct FileResolver<'a> {
    source: &'a str,
    uri: &'a str,
    pkg: &'a PackageIndex,
    indexes: &'a BTreeMap<String, PackageIndex>,
    /// Local import name → in-tree package name.
    imports: HashMap<String, String>,
    scopes: Vec<HashMap<String, Object>>,
    info: &'a mut TypeInfo,
}

impl<'a> FileResolver<'a> {
    fn run(&mut self, root: Node) {
        let mut cursor = root.walk();
        let decls: Vec<Node> = root.named_children(&mut cursor).collect();
        for decl in &decls {
            if decl.kind() == "import_declaration" {
                self.collect_imports(*decl);
            }
        }
        for decl in decls {
            match decl.kind() {
                "package_clause" => self.package_clause(decl),
                "function_declaration" => self.function_decl(decl, false),
                "method_declaration" => self.function_decl(decl, true),
                "type_declaration" => self.type_decl(decl),
                "var_declaration" | "const_declaration" => self.global_decl(decl),
                _ => {}
            }
        }
    }

    // ---- declaration walking -------------------------------------------

    fn package_clause(&mut self, node: Node) {
        let mut cursor = node.walk();
        for ident in node.named_children(&mut cursor) {
            if ident.kind() == "package_identifier" {
                let object = Object {
                    name: self.text(ident).to_string(),
                    kind: ObjectKind::PkgName,
                    decl: self.pkg.clause_pos.clone(),
                    package: self.pkg.name.clone(),
                    type_string: String::new(),
                    receiver_type: String::new(),
                };
                self.record_def(ident, object);
            }
        }
    }

    fn collect_imports(&mut self, node: Node) {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            let mut cursor = n.walk();
            for child in n.named_children(&mut cursor) {
                match child.kind() {
                    "import_spec" => {
                        let Some(path_node) = child.child_by_field_name("path") else {
                            continue;
                        };
                        let path = self
                            .text(path_node)
                            .trim_matches(|c| c == '"' || c == '`')
                            .to_string();
                        let tail = path.rsplit('/').next().unwrap_or(&path).to_string();
                        let local = child
                            .child_by_field_name("name")
                            .map(|n| self.text(n).to_string())
                            .unwrap_or_else(|| tail.clone());
                        if local == "_" || local == "." {
                            continue;
                        }
                        if self.indexes.contains_key(&tail) {
                            self.imports.insert(local, tail);
                        }
                    }
                    "import_spec_list" => stack.push(child),
                    _ => {}
                }
            }
        }
    }

    fn function_decl(&mut self, node: Node, is_method: bool) {
        let receiver = if is_method {
            node.child_by_field_name("receiver")
                .and_then(|r| receiver_type_name(r, self.source))
                .unwrap_or_default()
        } else {
            String::new()
        };

        if let Some(name_node) = node.child_by_field_name("name") {
            let name = self.text(name_node).to_string();
            let sig = if is_method {
                self.pkg.lookup_method(&receiver, &name)
            } else {
                self.pkg.funcs.get(&name)
            };
            if let Some(sig) = sig {
                let object = self.func_object(sig);
                self.record_def(name_node, object);
            }
        }

        self.scopes.push(HashMap::new());
        if let Some(recv_list) = node.child_by_field_name("receiver") {
            self.bind_parameter_list(recv_list);
        }
        if let Some(params) = node.child_by_field_name("parameters") {
            self.bind_parameter_list(params);
        }
        if let Some(result) = node.child_by_field_name("result") {
            self.resolve_result(result);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.walk_block(body);
        }
        self.scopes.pop();
    }

    /// Bind the names of a parameter (or receiver) list, resolving type
    /// expressions along the way.
    fn bind_parameter_list(&mut self, list: Node) {
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            if param.kind() != "parameter_declaration"
                && param.kind() != "variadic_parameter_declaration"
            {
                continue;
            }
            let type_string = param
                .child_by_field_name("type")
                .map(|t| self.qualified(&render_type(t, self.source)))
                .unwrap_or_default();
            let mut name_cursor = param.walk();
            let names: Vec<Node> = param
                .children_by_field_name("name", &mut name_cursor)
                .collect();
            for name_node in names {
                let object = Object {
                    name: self.text(name_node).to_string(),
                    kind: ObjectKind::Var,
                    decl: self.position(name_node),
                    package: self.pkg.name.clone(),
                    type_string: type_string.clone(),
                    receiver_type: String::new(),
                };
                self.record_def(name_node, object.clone());
                self.bind(object);
            }
            if let Some(t) = param.child_by_field_name("type") {
                self.resolve_type_expr(t);
            }
        }
    }

    fn resolve_result(&mut self, result: Node) {
        if result.kind() == "parameter_list" {
            self.bind_parameter_list(result);
        } else {
            self.resolve_type_expr(result);
        }
    }

    fn type_decl(&mut self, node: Node) {
        let mut cursor = node.walk();
        let specs: Vec<Node> = node.named_children(&mut cursor).collect();
        for spec in specs {
            if spec.kind() != "type_spec" {
                continue;
            }
            if let Some(name_node) = spec.child_by_field_name("name") {
                let name = self.text(name_node).to_string();
                if let Some(decl) = self.pkg.lookup_type(&name) {
                    let object = self.type_object(self.pkg, decl);
                    self.record_def(name_node, object);
                }
            }
            let Some(type_node) = spec.child_by_field_name("type") else {
                continue;
            };
            match type_node.kind() {
                "struct_type" => self.struct_members(type_node),
                "interface_type" => self.interface_members(type_node, spec),
                _ => self.resolve_type_expr(type_node),
            }
        }
    }

    fn struct_members(&mut self, struct_node: Node) {
        let mut stack = vec![struct_node];
        while let Some(n) = stack.pop() {
            let mut cursor = n.walk();
            for child in n.named_children(&mut cursor) {
                match child.kind() {
                    "field_declaration_list" => stack.push(child),
                    "field_declaration" => {
                        let type_string = child
                            .child_by_field_name("type")
                            .map(|t| self.qualified(&render_type(t, self.source)))
                            .unwrap_or_default();
                        let mut name_cursor = child.walk();
                        let names: Vec<Node> = child
                            .children_by_field_name("name", &mut name_cursor)
                            .collect();
                        for name_node in names {
                            let object = Object {
                                name: self.text(name_node).to_string(),
                                kind: ObjectKind::Field,
                                decl: self.position(name_node),
                                package: self.pkg.name.clone(),
                                type_string: type_string.clone(),
                                receiver_type: String::new(),
                            };
                            self.record_def(name_node, object);
                        }
                        if let Some(t) = child.child_by_field_name("type") {
                            self.resolve_type_expr(t);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn interface_members(&mut self, iface_node: Node, spec: Node) {
        let iface = spec
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let mut cursor = iface_node.walk();
        let members: Vec<Node> = iface_node.named_children(&mut cursor).collect();
        for member in members {
            if member.kind() != "method_elem" && member.kind() != "method_spec" {
                continue;
            }
            if let Some(name_node) = member.child_by_field_name("name") {
                let name = self.text(name_node).to_string();
                if let Some(sig) = self.pkg.lookup_method(&iface, &name) {
                    let object = self.func_object(sig);
                    self.record_def(name_node, object);
                }
            }
            if let Some(params) = member.child_by_field_name("parameters") {
                self.bind_parameter_list(params);
            }
            if let Some(result) = member.child_by_field_name("result") {
                self.resolve_result(result);
            }
        }
    }

    fn global_decl(&mut self, node: Node) {
        for spec in super::index::value_specs(node) {
            if let Some(t) = spec.child_by_field_name("type") {
                self.resolve_type_expr(t);
            }
            if let Some(value) = spec.child_by_field_name("value") {
                self.resolve_expr(value);
            }
            let mut name_cursor = spec.walk();
            let names: Vec<Node> = spec.children_by_field_name("name", &mut name_cursor).collect();
            for name_node in names {
                let name = self.text(name_node).to_string();
                if let Some(global) = self.pkg.globals.get(&name) {
                    let object = self.global_object(self.pkg, global);
                    self.record_def(name_node, object);
                }
            }
        }
    }

    // ---- statement walking ---------------------------------------------

    fn walk_block(&mut self, block: Node) {
        self.scopes.push(HashMap::new());
        let mut cursor = block.walk();
        let stmts: Vec<Node> = block.named_children(&mut cursor).collect();
        for stmt in stmts {
            self.walk_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn walk_stmt(&mut self, node: Node) {
        match node.kind() {
            "short_var_declaration" => self.short_var_decl(node),
            "var_declaration" | "const_declaration" => self.local_var_decl(node),
            "block" => self.walk_block(node),
            "if_statement" => {
                self.scopes.push(HashMap::new());
                if let Some(init) = node.child_by_field_name("initializer") {
                    self.walk_stmt(init);
                }
                if let Some(cond) = node.child_by_field_name("condition") {
                    self.resolve_expr(cond);
                }
                if let Some(cons) = node.child_by_field_name("consequence") {
                    self.walk_block(cons);
                }
                if let Some(alt) = node.child_by_field_name("alternative") {
                    self.walk_stmt(alt);
                }
                self.scopes.pop();
            }
            "for_statement" => {
                self.scopes.push(HashMap::new());
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    match child.kind() {
                        "for_clause" => self.for_clause(child),
                        "range_clause" => self.range_clause(child),
                        "block" => self.walk_block(child),
                        _ => {
                            self.resolve_expr(child);
                        }
                    }
                }
                self.scopes.pop();
            }
            "expression_statement" | "return_statement" | "go_statement" | "defer_statement"
            | "send_statement" | "inc_statement" | "dec_statement" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.resolve_expr(child);
                }
            }
            "assignment_statement" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.resolve_expr(child);
                }
            }
            "labeled_statement" => {
                if let Some(child) = node.named_child(node.named_child_count().saturating_sub(1)) {
                    self.walk_stmt(child);
                }
            }
            "expression_switch_statement" | "type_switch_statement" | "select_statement" => {
                self.scopes.push(HashMap::new());
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    match child.kind() {
                        "expression_case" | "default_case" | "type_case"
                        | "communication_case" => {
                            self.scopes.push(HashMap::new());
                            let mut inner = child.walk();
                            let stmts: Vec<Node> = child.named_children(&mut inner).collect();
                            for stmt in stmts {
                                self.walk_any(stmt);
                            }
                            self.scopes.pop();
                        }
                        _ => self.walk_any(child),
                    }
                }
                self.scopes.pop();
            }
            _ => {
                self.walk_any(node);
            }
        }
    }

    /// Dispatch a node whose role (statement or expression) is not known.
    fn walk_any(&mut self, node: Node) {
        if node.kind().ends_with("_statement")
            || node.kind().ends_with("_declaration")
            || node.kind() == "block"
        {
            self.walk_stmt(node);
        } else {
            self.resolve_expr(node);
        }
    }

    fn short_var_decl(&mut self, node: Node) {
        let mut rhs_types = Vec::new();
        if let Some(right) = node.child_by_field_name("right") {
            let mut cursor = right.walk();
            let exprs: Vec<Node> = right.named_children(&mut cursor).collect();
            for expr in exprs {
                let val = self.resolve_expr(expr);
                rhs_types.push(match val {
                    ExprVal::Value(t) => t,
                    _ => String::new(),
                });
            }
        }
        if let Some(left) = node.child_by_field_name("left") {
            let mut cursor = left.walk();
            let idents: Vec<Node> = left.named_children(&mut cursor).collect();
            let single_rhs = rhs_types.len() == 1 && idents.len() > 1;
            for (i, ident) in idents.iter().enumerate() {
                if ident.kind() != "identifier" {
                    self.resolve_expr(*ident);
                    continue;
                }
                let name = self.text(*ident).to_string();
                if name == "_" {
                    continue;
                }
                let type_string = if single_rhs {
                    String::new()
                } else {
                    rhs_types.get(i).cloned().unwrap_or_default()
                };
                let object = Object {
                    name,
                    kind: ObjectKind::Var,
                    decl: self.position(*ident),
                    package: self.pkg.name.clone(),
                    type_string,
                    receiver_type: String::new(),
                };
                self.record_def(*ident, object.clone());
                self.bind(object);
            }
        }
    }

    fn local_var_decl(&mut self, node: Node) {
        let is_const = node.kind() == "const_declaration";
        for spec in super::index::value_specs(node) {
            let declared_type = spec
                .child_by_field_name("type")
                .map(|t| self.qualified(&render_type(t, self.source)));
            if let Some(t) = spec.child_by_field_name("type") {
                self.resolve_type_expr(t);
            }
            let mut inferred = None;
            if let Some(value) = spec.child_by_field_name("value") {
                let mut value_cursor = value.walk();
                let exprs: Vec<Node> = value.named_children(&mut value_cursor).collect();
                for expr in exprs {
                    if let ExprVal::Value(t) = self.resolve_expr(expr) {
                        inferred.get_or_insert(t);
                    }
                }
            }
            let type_string = declared_type.or(inferred).unwrap_or_default();
            let mut name_cursor = spec.walk();
            let names: Vec<Node> = spec.children_by_field_name("name", &mut name_cursor).collect();
            for name_node in names {
                let name = self.text(name_node).to_string();
                if name == "_" {
                    continue;
                }
                let object = Object {
                    name,
                    kind: if is_const { ObjectKind::Const } else { ObjectKind::Var },
                    decl: self.position(name_node),
                    package: self.pkg.name.clone(),
                    type_string: type_string.clone(),
                    receiver_type: String::new(),
                };
                self.record_def(name_node, object.clone());
                self.bind(object);
            }
        }
    }

    fn for_clause(&mut self, clause: Node) {
        if let Some(init) = clause.child_by_field_name("initializer") {
            self.walk_stmt(init);
        }
        if let Some(cond) = clause.child_by_field_name("condition") {
            self.resolve_expr(cond);
        }
        if let Some(update) = clause.child_by_field_name("update") {
            self.walk_stmt(update);
        }
    }

    fn range_clause(&mut self, clause: Node) {
        if let Some(right) = clause.child_by_field_name("right") {
            self.resolve_expr(right);
        }
        if let Some(left) = clause.child_by_field_name("left") {
            let mut cursor = left.walk();
            let idents: Vec<Node> = left.named_children(&mut cursor).collect();
            for ident in idents {
                if ident.kind() == "identifier" && self.text(ident) != "_" {
                    let object = Object {
                        name: self.text(ident).to_string(),
                        kind: ObjectKind::Var,
                        decl: self.position(ident),
                        package: self.pkg.name.clone(),
                        type_string: String::new(),
                        receiver_type: String::new(),
                    };
                    self.record_def(ident, object.clone());
                    self.bind(object);
                } else {
                    self.resolve_expr(ident);
                }
            }
        }
    }

    // ---- expression resolution -----------------------------------------

    fn resolve_expr(&mut self, node: Node) -> ExprVal {
        match node.kind() {
            "identifier" => self.resolve_ident(node),
            "selector_expression" => self.resolve_selector(node),
            "call_expression" => self.resolve_call(node),
            "composite_literal" => self.resolve_composite(node),
            "func_literal" => {
                self.scopes.push(HashMap::new());
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.bind_parameter_list(params);
                }
                if let Some(result) = node.child_by_field_name("result") {
                    self.resolve_result(result);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk_block(body);
                }
                self.scopes.pop();
                ExprVal::None
            }
            "unary_expression" => {
                let operand = node.child_by_field_name("operand");
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o).to_string())
                    .unwrap_or_default();
                let val = operand.map(|o| self.resolve_expr(o)).unwrap_or(ExprVal::None);
                match (op.as_str(), val) {
                    ("&", ExprVal::Value(t)) if !t.is_empty() => ExprVal::Value(format!("*{}", t)),
                    ("*", ExprVal::Value(t)) => {
                        ExprVal::Value(t.strip_prefix('*').unwrap_or(&t).to_string())
                    }
                    (_, v) => v,
                }
            }
            "parenthesized_expression" => {
                let mut cursor = node.walk();
                let child = node.named_children(&mut cursor).next();
                match child {
                    Some(c) => self.resolve_expr(c),
                    None => ExprVal::None,
                }
            }
            "binary_expression" => {
                let left = node.child_by_field_name("left").map(|n| self.resolve_expr(n));
                if let Some(right) = node.child_by_field_name("right") {
                    self.resolve_expr(right);
                }
                left.unwrap_or(ExprVal::None)
            }
            "index_expression" | "slice_expression" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.resolve_expr(child);
                }
                ExprVal::None
            }
            "type_assertion_expression" => {
                if let Some(operand) = node.child_by_field_name("operand") {
                    self.resolve_expr(operand);
                }
                if let Some(t) = node.child_by_field_name("type") {
                    self.resolve_type_expr(t);
                    return ExprVal::Value(self.qualified(&render_type(t, self.source)));
                }
                ExprVal::None
            }
            "type_conversion_expression" => {
                if let Some(operand) = node.child_by_field_name("operand") {
                    self.resolve_expr(operand);
                }
                if let Some(t) = node.child_by_field_name("type") {
                    self.resolve_type_expr(t);
                    return ExprVal::Value(self.qualified(&render_type(t, self.source)));
                }
                ExprVal::None
            }
            "int_literal" | "float_literal" | "imaginary_literal" | "rune_literal"
            | "interpreted_string_literal" | "raw_string_literal" => ExprVal::None,
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.resolve_expr(child);
                }
                ExprVal::None
            }
        }
    }

    fn resolve_ident(&mut self, node: Node) -> ExprVal {
        let name = self.text(node).to_string();
        if name == "_" {
            return ExprVal::None;
        }

        // Innermost scope first.
        let local = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).cloned());
        if let Some(object) = local {
            self.record_use(node, object.clone());
            return ExprVal::of(&object);
        }

        // Package scope, across files.
        if let Some(object) = self.package_lookup(self.pkg, &name) {
            self.record_use(node, object.clone());
            return ExprVal::of(&object);
        }

        // Import qualifier.
        if let Some(pkg_name) = self.imports.get(&name).cloned() {
            if let Some(target) = self.indexes.get(&pkg_name) {
                let object = Object {
                    name: name.clone(),
                    kind: ObjectKind::PkgName,
                    decl: target.clause_pos.clone(),
                    package: pkg_name.clone(),
                    type_string: String::new(),
                    receiver_type: String::new(),
                };
                self.record_use(node, object);
                return ExprVal::Pkg(pkg_name);
            }
        }

        // Universe scope.
        if is_builtin(&name) {
            self.record_use(node, builtin_object(&name));
        }
        ExprVal::None
    }

    fn resolve_selector(&mut self, node: Node) -> ExprVal {
        let operand = node.child_by_field_name("operand");
        let field = node.child_by_field_name("field");
        let (Some(operand), Some(field)) = (operand, field) else {
            return ExprVal::None;
        };

        let operand_val = self.resolve_expr(operand);
        let field_name = self.text(field).to_string();

        match operand_val {
            ExprVal::Pkg(pkg_name) => {
                let Some(target) = self.indexes.get(&pkg_name) else {
                    return ExprVal::None;
                };
                if let Some(object) = self.package_lookup(target, &field_name) {
                    self.record_use(field, object.clone());
                    return ExprVal::of(&object);
                }
                ExprVal::None
            }
            ExprVal::Type(type_object) => {
                // Method expression: T.Method.
                let (pkg_name, type_name) = self.type_home(&type_object);
                if let Some(target) = self.indexes.get(&pkg_name) {
                    if let Some(sig) = target.lookup_method(&type_name, &field_name) {
                        let object = self.func_object(sig);
                        self.record_use(field, object.clone());
                        self.record_selection(field, object.clone(), SelectionKind::MethodExpr);
                        return ExprVal::Value(object.type_string);
                    }
                }
                ExprVal::None
            }
            ExprVal::Value(type_string) if !type_string.is_empty() => {
                let base = base_type_name(&type_string).to_string();
                let (pkg_name, type_name) = match split_qualified(&base) {
                    (Some(pkg), name) => (pkg.to_string(), name.to_string()),
                    (None, name) => (self.pkg.name.clone(), name.to_string()),
                };
                let Some(target) = self.indexes.get(&pkg_name) else {
                    return ExprVal::None;
                };
                if let Some(member) = target.lookup_field(&type_name, &field_name) {
                    let object = self.field_object(target, member);
                    self.record_use(field, object.clone());
                    self.record_selection(field, object.clone(), SelectionKind::Field);
                    return ExprVal::Value(object.type_string);
                }
                if let Some(sig) = target.lookup_method(&type_name, &field_name) {
                    let object = self.func_object(sig);
                    self.record_use(field, object.clone());
                    self.record_selection(field, object.clone(), SelectionKind::MethodVal);
                    return ExprVal::Value(object.type_string);
                }
                ExprVal::None
            }
            _ => ExprVal::None,
        }
    }

    fn resolve_call(&mut self, node: Node) -> ExprVal {
        let mut result = ExprVal::None;
        if let Some(function) = node.child_by_field_name("function") {
            match function.kind() {
                "identifier" => {
                    if let ExprVal::Value(sig) = self.resolve_ident(function) {
                        result = self.call_result(&function, &sig);
                    }
                }
                "selector_expression" => {
                    if let ExprVal::Value(sig) = self.resolve_selector(function) {
                        result = self.call_result(&function, &sig);
                    }
                }
                _ => {
                    self.resolve_expr(function);
                }
            }
        }
        if let Some(args) = node.child_by_field_name("arguments") {
            let mut cursor = args.walk();
            let exprs: Vec<Node> = args.named_children(&mut cursor).collect();
            for expr in exprs {
                self.resolve_expr(expr);
            }
        }
        result
    }

    /// Result type of calling a value whose type is a `func(...)` signature.
    fn call_result(&mut self, function: &Node, _sig: &str) -> ExprVal {
        // The callee object was just recorded at its identifier site; read
        // the signature results back through the index for precision.
        let site = self.site(*function);
        let site = match function.kind() {
            "selector_expression" => function
                .child_by_field_name("field")
                .map(|f| self.site(f))
                .unwrap_or(site),
            _ => site,
        };
        let Some(object) = self.info.uses.get(&site).cloned() else {
            return ExprVal::None;
        };
        if object.kind != ObjectKind::Func {
            return ExprVal::None;
        }
        let Some(target) = self.indexes.get(&object.package) else {
            return ExprVal::None;
        };
        let sig = if object.receiver_type.is_empty() {
            target.funcs.get(&object.name)
        } else {
            target.lookup_method(&object.receiver_type, &object.name)
        };
        match sig.and_then(|s| s.results.first()) {
            Some(result) => ExprVal::Value(result.clone()),
            None => ExprVal::None,
        }
    }

    fn resolve_composite(&mut self, node: Node) -> ExprVal {
        let type_string = node.child_by_field_name("type").map(|t| {
            self.resolve_type_expr(t);
            self.qualified(&render_type(t, self.source))
        });

        if let Some(body) = node.child_by_field_name("body") {
            self.composite_body(body, type_string.as_deref());
        }
        match type_string {
            Some(t) => ExprVal::Value(t),
            None => ExprVal::None,
        }
    }

    fn composite_body(&mut self, body: Node, literal_type: Option<&str>) {
        let mut cursor = body.walk();
        let elements: Vec<Node> = body.named_children(&mut cursor).collect();
        for element in elements {
            match element.kind() {
                "keyed_element" => {
                    let mut inner = element.walk();
                    let parts: Vec<Node> = element.named_children(&mut inner).collect();
                    let mut parts_iter = parts.into_iter();
                    if let Some(key) = parts_iter.next() {
                        self.resolve_literal_key(key, literal_type);
                    }
                    for value in parts_iter {
                        self.resolve_expr(value);
                    }
                }
                "literal_element" => {
                    let mut inner = element.walk();
                    let parts: Vec<Node> = element.named_children(&mut inner).collect();
                    for part in parts {
                        self.resolve_expr(part);
                    }
                }
                _ => {
                    self.resolve_expr(element);
                }
            }
        }
    }

    /// A composite-literal key: a struct field when the literal type is a
    /// known struct, an ordinary expression otherwise.
    fn resolve_literal_key(&mut self, key: Node, literal_type: Option<&str>) {
        let ident = match key.kind() {
            "literal_element" => {
                let mut cursor = key.walk();
                let child = key.named_children(&mut cursor).next();
                child
            }
            _ => Some(key),
        };
        let Some(ident) = ident else { return };
        if ident.kind() != "identifier" && ident.kind() != "field_identifier" {
            self.resolve_expr(ident);
            return;
        }
        let Some(literal_type) = literal_type else {
            self.resolve_expr(ident);
            return;
        };
        let base = base_type_name(literal_type).to_string();
        let (pkg_name, type_name) = match split_qualified(&base) {
            (Some(pkg), name) => (pkg.to_string(), name.to_string()),
            (None, name) => (self.pkg.name.clone(), name.to_string()),
        };
        let field_name = self.text(ident).to_string();
        if let Some(target) = self.indexes.get(&pkg_name) {
            if let Some(member) = target.lookup_field(&type_name, &field_name) {
                let object = self.field_object(target, member);
                self.record_use(ident, object);
            }
        }
    }

    /// Resolve the named-type identifiers inside a type expression.
    fn resolve_type_expr(&mut self, node: Node) {
        match node.kind() {
            "type_identifier" => {
                let name = self.text(node).to_string();
                if let Some(decl) = self.pkg.lookup_type(&name) {
                    let object = self.type_object(self.pkg, decl);
                    self.record_use(node, object);
                } else if is_primitive_type(&name) {
                    self.record_use(node, builtin_object(&name));
                }
            }
            "qualified_type" => {
                let pkg_node = node.child_by_field_name("package");
                let name_node = node.child_by_field_name("name");
                let (Some(pkg_node), Some(name_node)) = (pkg_node, name_node) else {
                    return;
                };
                let local = self.text(pkg_node).to_string();
                let Some(pkg_name) = self.imports.get(&local).cloned() else {
                    return;
                };
                let Some(target) = self.indexes.get(&pkg_name) else {
                    return;
                };
                let object = Object {
                    name: local,
                    kind: ObjectKind::PkgName,
                    decl: target.clause_pos.clone(),
                    package: pkg_name.clone(),
                    type_string: String::new(),
                    receiver_type: String::new(),
                };
                self.record_use(pkg_node, object);
                let type_name = self.text(name_node).to_string();
                if let Some(decl) = target.lookup_type(&type_name) {
                    let object = self.type_object(target, decl);
                    self.record_use(name_node, object);
                }
            }
            "pointer_type" | "parenthesized_type" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.resolve_type_expr(child);
                }
            }
            "slice_type" | "array_type" => {
                if let Some(elem) = node.child_by_field_name("element") {
                    self.resolve_type_expr(elem);
                }
            }
            "map_type" => {
                if let Some(key) = node.child_by_field_name("key") {
                    self.resolve_type_expr(key);
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.resolve_type_expr(value);
                }
            }
            "channel_type" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.resolve_type_expr(value);
                }
            }
            "function_type" => {
                if let Some(params) = node.child_by_field_name("parameters") {
                    let mut cursor = params.walk();
                    let decls: Vec<Node> = params.named_children(&mut cursor).collect();
                    for param in decls {
                        if let Some(t) = param.child_by_field_name("type") {
                            self.resolve_type_expr(t);
                        }
                    }
                }
                if let Some(result) = node.child_by_field_name("result") {
                    self.resolve_result(result);
                }
            }
            _ => {}
        }
    }

    // ---- object construction and lookup --------------------------------

    /// Resolve a bare name at package scope: types, functions, globals.
    fn package_lookup(&self, pkg: &PackageIndex, name: &str) -> Option<Object> {
        if let Some(decl) = pkg.lookup_type(name) {
            return Some(self.type_object(pkg, decl));
        }
        if let Some(sig) = pkg.funcs.get(name) {
            return Some(self.func_object(sig));
        }
        if let Some(global) = pkg.globals.get(name) {
            return Some(self.global_object(pkg, global));
        }
        None
    }

    fn type_object(&self, pkg: &PackageIndex, decl: &TypeDecl) -> Object {
        Object {
            name: decl.name.clone(),
            kind: ObjectKind::TypeName,
            decl: decl.pos.clone(),
            package: pkg.name.clone(),
            type_string: format!("{}.{}", pkg.name, decl.name),
            receiver_type: String::new(),
        }
    }

    fn func_object(&self, sig: &FuncSig) -> Object {
        Object {
            name: sig.name.clone(),
            kind: ObjectKind::Func,
            decl: sig.pos.clone(),
            package: sig.package.clone(),
            type_string: sig.type_string(),
            receiver_type: sig.receiver.clone(),
        }
    }

    fn global_object(&self, pkg: &PackageIndex, global: &GlobalDecl) -> Object {
        Object {
            name: global.name.clone(),
            kind: if global.is_const { ObjectKind::Const } else { ObjectKind::Var },
            decl: global.pos.clone(),
            package: pkg.name.clone(),
            type_string: global.type_string.clone(),
            receiver_type: String::new(),
        }
    }

    fn field_object(&self, pkg: &PackageIndex, member: &MemberDecl) -> Object {
        Object {
            name: member.name.clone(),
            kind: ObjectKind::Field,
            decl: member.pos.clone(),
            package: pkg.name.clone(),
            type_string: member.type_string.clone(),
            receiver_type: String::new(),
        }
    }

    /// The declaring package and bare name of a type object.
    fn type_home(&self, object: &Object) -> (String, String) {
        match split_qualified(&object.type_string) {
            (Some(pkg), name) => (pkg.to_string(), name.to_string()),
            (None, name) => (object.package.clone(), name.to_string()),
        }
    }

    fn qualified(&self, rendered: &str) -> String {
        let base = base_type_name(rendered);
        if !base.contains('.') && self.pkg.types.contains_key(base) {
            let prefix_len = rendered.len() - base.len();
            format!("{}{}.{}", &rendered[..prefix_len], self.pkg.name, base)
        } else {
            rendered.to_string()
        }
    }

    // ---- recording ------------------------------------------------------

    fn bind(&mut self, object: Object) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(object.name.clone(), object);
        }
    }

    fn record_def(&mut self, node: Node, object: Object) {
        let site = self.site(node);
        self.info.defs.insert(site, object);
    }

    fn record_use(&mut self, node: Node, object: Object) {
        let site = self.site(node);
        self.info.uses.insert(site, object);
    }

    fn record_selection(&mut self, node: Node, object: Object, kind: SelectionKind) {
        let site = self.site(node);
        self.info.selections.insert(site, Selection { object, kind });
    }

    fn site(&self, node: Node) -> Site {
        (
            self.uri.to_string(),
            node.start_position().row,
            node.start_position().column,
        )
    }

    fn position(&self, node: Node) -> Position {
        Position::new(
            self.uri.to_string(),
            node.start_position().row,
            node.start_position().column,
        )
    }

    fn text(&self, node: Node) -> &'a str {
        node_text(node, self.source)
    }
}
