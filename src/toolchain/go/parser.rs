//! tree-sitter parsing for Go sources.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tree_sitter::{Language, Parser};

use crate::sast::path_to_uri;
use crate::toolchain::ParseTree;

/// Wrapper owning a configured tree-sitter parser for Go.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_go::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .context("Failed to load Go grammar")?;
        Ok(Self { parser })
    }

    /// Parse one file. A missing tree is a parse failure; a tree containing
    /// error nodes is kept so structural extraction can continue.
    pub fn parse_file(&mut self, path: &Path) -> Result<ParseTree> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        self.parse_source(source, path)
    }

    /// Parse in-memory source attributed to `path`.
    pub fn parse_source(&mut self, source: String, path: &Path) -> Result<ParseTree> {
        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| anyhow!("Failed to parse {}", path.display()))?;

        Ok(ParseTree {
            path: path.to_path_buf(),
            uri: path_to_uri(path),
            source,
            tree,
        })
    }
}

/// Extract the source text of a node.
pub fn node_text<'a>(node: tree_sitter::Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_go() {
        let mut parser = GoParser::new().unwrap();
        let parsed = parser
            .parse_source(
                "package main\n\nfunc main() {}\n".to_string(),
                Path::new("/tmp/main.go"),
            )
            .unwrap();
        assert_eq!(parsed.tree.root_node().kind(), "source_file");
        assert!(!parsed.tree.root_node().has_error());
        assert_eq!(parsed.uri, "file:///tmp/main.go");
    }

    #[test]
    fn test_parse_tolerates_syntax_errors() {
        let mut parser = GoParser::new().unwrap();
        let parsed = parser
            .parse_source(
                "package main\n\nfunc broken( {\n".to_string(),
                Path::new("/tmp/broken.go"),
            )
            .unwrap();
        assert!(parsed.tree.root_node().has_error());
    }
}
