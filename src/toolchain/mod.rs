//! Language toolchain capability.
//!
//! The pipeline depends on exactly two operations: parse a source file with
//! positions, and type-check a set of parse trees into a bundle of resolved
//! objects (definitions, uses, selector selections). Everything Go-specific
//! lives behind this boundary in [`go`].

pub mod go;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tree_sitter::Tree;

use crate::sast::Position;

/// One parsed source file, with its source retained for text extraction.
pub struct ParseTree {
    pub path: PathBuf,
    pub uri: String,
    pub source: String,
    pub tree: Tree,
}

/// Kind of a resolved program entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Const,
    Var,
    Field,
    Func,
    TypeName,
    Label,
    PkgName,
    Builtin,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Const => "const",
            ObjectKind::Var => "var",
            ObjectKind::Field => "field",
            ObjectKind::Func => "func",
            ObjectKind::TypeName => "typeName",
            ObjectKind::Label => "label",
            ObjectKind::PkgName => "pkgName",
            ObjectKind::Builtin => "builtin",
        }
    }
}

/// A resolved program entity: what an identifier means.
#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    /// Position of the declaring name identifier, 0-based.
    pub decl: Position,
    pub package: String,
    pub type_string: String,
    /// Base receiver type name; empty unless this is a method.
    pub receiver_type: String,
}

impl Object {
    /// Kind string as it appears in `declaredAt`: methods are distinguished
    /// from plain functions by their receiver.
    pub fn decl_kind(&self) -> &'static str {
        if self.kind == ObjectKind::Func && !self.receiver_type.is_empty() {
            "method"
        } else {
            self.kind.as_str()
        }
    }
}

/// How a selector expression selects its field identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Field,
    MethodVal,
    MethodExpr,
}

/// A classified selector resolution.
#[derive(Debug, Clone)]
pub struct Selection {
    pub object: Object,
    pub kind: SelectionKind,
}

/// Identifier site: `(uri, line, character)`, 0-based.
pub type Site = (String, usize, usize);

pub fn site_of(position: &Position) -> Site {
    (position.uri.clone(), position.line, position.character)
}

/// Merged resolution results for a set of parse trees.
#[derive(Debug, Default)]
pub struct TypeInfo {
    /// Declaration-site identifiers.
    pub defs: HashMap<Site, Object>,
    /// Use-site identifiers.
    pub uses: HashMap<Site, Object>,
    /// Selector field identifiers, keyed by the field's site.
    pub selections: HashMap<Site, Selection>,
}

impl TypeInfo {
    /// Resolve the object for an identifier at `site`, use sites first.
    pub fn object_at(&self, site: &Site) -> Option<&Object> {
        self.uses.get(site).or_else(|| self.defs.get(site))
    }

    pub fn merge(&mut self, other: TypeInfo) {
        self.defs.extend(other.defs);
        self.uses.extend(other.uses);
        self.selections.extend(other.selections);
    }
}

/// The two operations the pipeline needs from a language toolchain.
pub trait Toolchain {
    /// Parse a single source file. Returning an error is the file-level
    /// failure channel; the caller logs and skips.
    fn parse(&mut self, path: &Path) -> Result<ParseTree>;

    /// Resolve identifiers across one package group of parse trees.
    fn type_check(&mut self, files: &[&ParseTree]) -> Result<TypeInfo>;
}
