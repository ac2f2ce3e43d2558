//! Source discovery: find the Go files to analyze.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Discover all Go source files under `root`, skipping anything beneath
/// `skip_dir` (the output directory, when it nests inside the tree).
/// Results are sorted for deterministic processing.
pub fn discover_files(root: &Path, skip_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build();

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let path = entry.path();

        if path.is_dir() {
            continue;
        }
        if !skip_dir.as_os_str().is_empty() && path.starts_with(skip_dir) {
            continue;
        }
        if is_go_source(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn is_go_source(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "go")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_go_source() {
        assert!(is_go_source(Path::new("main.go")));
        assert!(is_go_source(Path::new("handlers/calculator.go")));

        assert!(!is_go_source(Path::new("README.md")));
        assert!(!is_go_source(Path::new("go.mod")));
        assert!(!is_go_source(Path::new("no_extension")));
    }

    #[test]
    fn test_discover_skips_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("handlers")).unwrap();
        std::fs::create_dir_all(root.join("out")).unwrap();
        std::fs::write(root.join("main.go"), "package main\n").unwrap();
        std::fs::write(root.join("handlers/calc.go"), "package handlers\n").unwrap();
        std::fs::write(root.join("out/stale.go"), "package stale\n").unwrap();
        std::fs::write(root.join("notes.txt"), "not source").unwrap();

        let files = discover_files(root, &root.join("out")).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["handlers/calc.go", "main.go"]);
    }
}
