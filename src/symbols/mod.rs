//! Position-keyed symbol table collected from Simplified ASTs.

pub mod collector;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// The closed set of primitive type names. Declarations carrying one of
/// these names are collected but never become graph nodes.
const PRIMITIVES: &[&str] = &[
    "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr", "float32", "float64", "complex64", "complex128", "byte",
    "rune", "error",
];

pub fn is_primitive(name: &str) -> bool {
    PRIMITIVES.contains(&name)
}

/// One declaration's metadata, keyed by its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefInfo {
    pub name: String,
    pub kind: String,
    pub uri: String,
    pub line: usize,
    pub character: usize,
    pub type_string: String,
    pub receiver_type: String,
    pub package_name: String,
}

impl DefInfo {
    pub fn pos_key(&self) -> String {
        format!("{}:{}:{}", self.uri, self.line, self.character)
    }
}

/// The catalog of every declaration seen across all SASTs. Keys are
/// `posKey` strings; later writes overwrite earlier ones, which is how the
/// collector back-fills types discovered after the name. Iteration is
/// sorted, so every downstream scan is deterministic.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: BTreeMap<String, DefInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: DefInfo) {
        self.entries.insert(info.pos_key(), info);
    }

    pub fn get(&self, pos_key: &str) -> Option<&DefInfo> {
        self.entries.get(pos_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DefInfo)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn merge(&mut self, other: SymbolTable) {
        self.entries.extend(other.entries);
    }

    /// First entry on the given line of the given file, in character order.
    pub fn find_on_line(&self, uri: &str, line: usize) -> Option<&DefInfo> {
        let prefix = format!("{}:{}:", uri, line);
        self.entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(_, info)| info)
            .next()
    }

    /// First entry (sorted by position key) with this name and one of the
    /// given kinds.
    pub fn find_named(&self, name: &str, kinds: &[&str]) -> Option<&DefInfo> {
        self.entries
            .values()
            .find(|info| info.name == name && kinds.contains(&info.kind.as_str()))
    }

    /// Write the textual symbol table kept in debug runs.
    pub fn write_text(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for (key, info) in &self.entries {
            writeln!(file, "Position: {}", key)?;
            writeln!(file, "Name: {}", info.name)?;
            writeln!(file, "Kind: {}", info.kind)?;
            if !info.type_string.is_empty() {
                writeln!(file, "Type: {}", info.type_string)?;
            }
            if !info.receiver_type.is_empty() {
                writeln!(file, "Receiver: {}", info.receiver_type)?;
            }
            if !info.package_name.is_empty() {
                writeln!(file, "Package: {}", info.package_name)?;
            }
            writeln!(file)?;
        }
        Ok(())
    }
}
