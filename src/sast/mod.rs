//! Simplified AST: the pipeline's intermediate representation.
//!
//! A SAST is a strictly downward tree. Identifier-bearing nodes carry the
//! position where they appear in source and, when resolution succeeded, a
//! `DeclaredAt` value describing the defining declaration. Holding the
//! declaration as a value rather than a reference keeps the tree acyclic.

pub mod builder;
pub mod persist;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Closed set of SAST node discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Package,
    Import,
    Function,
    Method,
    Receiver,
    Params,
    Results,
    Field,
    FieldList,
    Struct,
    Interface,
    Type,
    GlobalVar,
    Ident,
    Call,
    MethodCall,
    VarUse,
    GlobalVarUse,
    FieldUse,
    TypeUse,
    SelectorExpr,
    CompositeLit,
}

/// A point in source. Lines and characters are 0-based; `uri` is a
/// forward-slash `file://` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub uri: String,
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(uri: impl Into<String>, line: usize, character: usize) -> Self {
        Self {
            uri: uri.into(),
            line,
            character,
        }
    }

    /// Canonical symbol-table key for this position.
    pub fn pos_key(&self) -> String {
        format!("{}:{}:{}", self.uri, self.line, self.character)
    }

    /// The filesystem path underneath the `file://` scheme.
    pub fn path(&self) -> &str {
        self.uri.strip_prefix("file://").unwrap_or(&self.uri)
    }
}

/// Convert a filesystem path to a forward-slash `file://` URI.
pub fn path_to_uri(path: &Path) -> String {
    let slashed = path.to_string_lossy().replace('\\', "/");
    format!("file://{}", slashed)
}

/// Resolution info attached to a SAST node: where the used name is declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredAt {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub uri: String,
    pub line: usize,
    pub character: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "typeString")]
    pub type_string: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "receiverType")]
    pub receiver_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "packageName")]
    pub package_name: String,
}

impl DeclaredAt {
    pub fn pos_key(&self) -> String {
        format!("{}:{}:{}", self.uri, self.line, self.character)
    }
}

/// One node of a Simplified AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SastNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "declaredAt")]
    pub declared_at: Option<DeclaredAt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SastNode>,
}

impl SastNode {
    pub fn new(kind: NodeKind, name: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            name: name.into(),
            position: Some(position),
            declared_at: None,
            children: Vec::new(),
        }
    }

    pub fn with_declared_at(mut self, declared_at: Option<DeclaredAt>) -> Self {
        self.declared_at = declared_at;
        self
    }

    /// First child of the given kind, if any.
    pub fn child_of_kind(&self, kind: NodeKind) -> Option<&SastNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// Depth-first walk over this node and all descendants.
    pub fn walk(&self, f: &mut impl FnMut(&SastNode)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_key_format() {
        let pos = Position::new("file:///src/main.go", 4, 9);
        assert_eq!(pos.pos_key(), "file:///src/main.go:4:9");
    }

    #[test]
    fn test_path_to_uri_forward_slashes() {
        let uri = path_to_uri(Path::new("/work/app/main.go"));
        assert_eq!(uri, "file:///work/app/main.go");
    }

    #[test]
    fn test_child_of_kind() {
        let pos = Position::new("file:///a.go", 0, 0);
        let mut file = SastNode::new(NodeKind::File, "a.go", pos.clone());
        file.children
            .push(SastNode::new(NodeKind::Package, "main", pos.clone()));
        file.children
            .push(SastNode::new(NodeKind::Import, "fmt", pos));

        assert_eq!(file.child_of_kind(NodeKind::Package).unwrap().name, "main");
        assert!(file.child_of_kind(NodeKind::Struct).is_none());
    }

    #[test]
    fn test_walk_visits_all_nodes() {
        let pos = Position::new("file:///a.go", 0, 0);
        let mut file = SastNode::new(NodeKind::File, "a.go", pos.clone());
        let mut func = SastNode::new(NodeKind::Function, "main", pos.clone());
        func.children.push(SastNode::new(NodeKind::Call, "run", pos));
        file.children.push(func);

        let mut count = 0;
        file.walk(&mut |_| count += 1);
        assert_eq!(count, 3);
    }
}
