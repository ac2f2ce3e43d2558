//! SAST persistence: the `.simplified.json` intermediate representation.
//!
//! Saved trees mirror the source layout under the intermediate directory,
//! with the source extension replaced by `.simplified.json`. Loading accepts
//! only files with that suffix and round-trips structurally.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use walkdir::WalkDir;

use super::SastNode;

pub const SIMPLIFIED_SUFFIX: &str = ".simplified.json";

/// Save one SAST under `out_dir`, mirroring its path relative to
/// `project_root`. Returns the path written.
pub fn save_sast(root: &SastNode, project_root: &Path, out_dir: &Path) -> Result<PathBuf> {
    let position = root
        .position
        .as_ref()
        .ok_or_else(|| anyhow!("SAST root has no position"))?;
    let source_path = PathBuf::from(position.path());

    let rel = source_path
        .strip_prefix(project_root)
        .with_context(|| {
            format!(
                "{} is not under project root {}",
                source_path.display(),
                project_root.display()
            )
        })?;

    let mut out_path = out_dir.join(rel);
    let stem = out_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    out_path.set_file_name(format!("{}{}", stem, SIMPLIFIED_SUFFIX));

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file = std::fs::File::create(&out_path)
        .with_context(|| format!("Failed to create {}", out_path.display()))?;
    serde_json::to_writer_pretty(file, root)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;

    Ok(out_path)
}

/// Load every `*.simplified.json` under `dir`, keyed by its on-disk path.
/// Other files are ignored.
pub fn load_sasts(dir: &Path) -> Result<BTreeMap<PathBuf, SastNode>> {
    let mut sasts = BTreeMap::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let path = entry.path();
        if !path
            .to_string_lossy()
            .ends_with(SIMPLIFIED_SUFFIX)
        {
            continue;
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let root: SastNode = serde_json::from_str(&content)
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        sasts.insert(path.to_path_buf(), root);
    }
    Ok(sasts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sast::{DeclaredAt, NodeKind, Position, SastNode};

    fn sample() -> SastNode {
        let uri = "file:///proj/handlers/calc.go";
        let mut file = SastNode::new(NodeKind::File, "calc.go", Position::new(uri, 0, 0));
        file.children
            .push(SastNode::new(NodeKind::Package, "handlers", Position::new(uri, 0, 8)));
        let mut func = SastNode::new(NodeKind::Function, "Run", Position::new(uri, 4, 5));
        func.declared_at = Some(DeclaredAt {
            name: "Run".to_string(),
            uri: uri.to_string(),
            line: 4,
            character: 5,
            kind: "func".to_string(),
            type_string: "func()".to_string(),
            receiver_type: String::new(),
            package_name: "handlers".to_string(),
        });
        func.children
            .push(SastNode::new(NodeKind::Params, "", Position::new(uri, 4, 8)));
        file.children.push(func);
        file
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let sast = sample();

        let written = save_sast(&sast, Path::new("/proj"), dir.path()).unwrap();
        assert!(written.to_string_lossy().ends_with("handlers/calc.simplified.json"));

        let loaded = load_sasts(dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.values().next().unwrap(), &sast);
    }

    #[test]
    fn test_load_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "hi").unwrap();

        let loaded = load_sasts(dir.path()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let sast = sample();
        let json = serde_json::to_string(&sast).unwrap();
        // Structural nodes have no name, no declaredAt, no children keys.
        assert!(!json.contains("\"declaredAt\":null"));
        assert!(!json.contains("\"name\":\"\""));
        assert!(json.contains("\"type\":\"Params\""));
    }
}
