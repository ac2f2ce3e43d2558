//! The extract command: runs the whole pipeline over a source tree.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use gograph::graph::{edges, nodes, writer, GraphBuilder};
use gograph::pipeline::discover_files;
use gograph::sast::builder::{collect_global_names, SastBuilder};
use gograph::sast::persist;
use gograph::symbols::{collector, SymbolTable};
use gograph::toolchain::go::GoToolchain;
use gograph::toolchain::{ParseTree, Toolchain};

const INTERMEDIATE_DIR: &str = "intermediate_representation";
const PARSE_TREE_DIR: &str = "parse_trees";
const GRAPH_FILE: &str = "graph.json";
const SYMBOL_TABLE_FILE: &str = "symbol_table.txt";

pub fn execute(source_root: &Path, out_dir: &Path, debug: bool) -> Result<()> {
    let start = Instant::now();

    let root = source_root
        .canonicalize()
        .with_context(|| format!("Failed to resolve source root {}", source_root.display()))?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    let out_dir = out_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve output directory {}", out_dir.display()))?;
    let intermediate_dir = out_dir.join(INTERMEDIATE_DIR);

    // C1: discover and parse.
    let files = discover_files(&root, &out_dir)?;
    println!("Processing {} source files...", files.len());

    let mut toolchain = GoToolchain::new()?;
    let mut trees: Vec<ParseTree> = Vec::new();
    for file in &files {
        match toolchain.parse(file) {
            Ok(tree) => {
                if debug && tree.tree.root_node().has_error() {
                    eprintln!("Warning: {} contains syntax errors", file.display());
                }
                trees.push(tree);
            }
            Err(err) => eprintln!("Warning: skipping {}: {}", file.display(), err),
        }
    }

    if debug {
        dump_parse_trees(&trees, &root, &out_dir.join(PARSE_TREE_DIR));
    }

    // C1: type information, per package group.
    let tree_refs: Vec<&ParseTree> = trees.iter().collect();
    let info = toolchain.type_check(&tree_refs)?;

    // C2: Simplified ASTs.
    let globals = collect_global_names(&tree_refs);
    let builder = SastBuilder::new(&info, &globals);
    let mut saved = 0usize;
    for tree in &trees {
        let sast = builder.build(tree);
        match persist::save_sast(&sast, &root, &intermediate_dir) {
            Ok(_) => saved += 1,
            Err(err) => eprintln!("Warning: failed to save SAST for {}: {}", tree.path.display(), err),
        }
    }
    println!("Simplified ASTs written to: {}", intermediate_dir.display());

    // C3: read the intermediate representation back.
    let sasts = persist::load_sasts(&intermediate_dir)?;
    if sasts.len() != saved {
        eprintln!(
            "Warning: saved {} SASTs but loaded {}",
            saved,
            sasts.len()
        );
    }

    // C4: symbol table.
    let mut table = SymbolTable::new();
    for sast in sasts.values() {
        table.merge(collector::collect(sast));
    }
    if debug {
        let table_path = out_dir.join(SYMBOL_TABLE_FILE);
        table.write_text(&table_path)?;
        println!("Symbol table written to: {}", table_path.display());
    }

    // Re-save after collection; the trees are immutable from here on.
    for sast in sasts.values() {
        if let Err(err) = persist::save_sast(sast, &root, &intermediate_dir) {
            eprintln!("Warning: failed to re-save SAST: {}", err);
        }
    }

    // C5 + C6 + C7: the graph itself.
    let mut graph_builder = GraphBuilder::new();
    nodes::emit_nodes(&mut graph_builder, &root, &sasts, &table, &out_dir)?;
    edges::emit_edges(&mut graph_builder, &root, &sasts, &table, &out_dir)?;
    let graph = graph_builder.into_graph();

    let graph_path = out_dir.join(GRAPH_FILE);
    writer::write_graph(&graph, &graph_path)?;
    println!("Graph written to: {}", graph_path.display());

    if !debug {
        cleanup(&out_dir, &intermediate_dir);
    }

    println!(
        "{} {} nodes, {} edges in {:.2?}",
        "Extraction complete:".green(),
        graph.elements.nodes.len(),
        graph.elements.edges.len(),
        start.elapsed()
    );
    Ok(())
}

/// Debug artifact: raw tree-sitter parse trees, one s-expression per file.
fn dump_parse_trees(trees: &[ParseTree], root: &Path, dump_dir: &Path) {
    for tree in trees {
        let Ok(rel) = tree.path.strip_prefix(root) else {
            continue;
        };
        let mut out_path = dump_dir.join(rel);
        let stem = out_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        out_path.set_file_name(format!("{}.ast.txt", stem));
        if let Some(parent) = out_path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                continue;
            }
        }
        let rendered = tree.tree.root_node().to_sexp();
        if let Err(err) = std::fs::write(&out_path, rendered) {
            eprintln!("Warning: failed to dump parse tree: {}", err);
        }
    }
}

fn cleanup(out_dir: &Path, intermediate_dir: &Path) {
    if let Err(err) = std::fs::remove_dir_all(intermediate_dir) {
        if intermediate_dir.exists() {
            eprintln!("Warning: failed to remove intermediate directory: {}", err);
        }
    }
    let table_path = out_dir.join(SYMBOL_TABLE_FILE);
    if table_path.exists() {
        if let Err(err) = std::fs::remove_file(&table_path) {
            eprintln!("Warning: failed to remove symbol table: {}", err);
        }
    }
    let dump_dir = out_dir.join(PARSE_TREE_DIR);
    if dump_dir.exists() {
        if let Err(err) = std::fs::remove_dir_all(&dump_dir) {
            eprintln!("Warning: failed to remove parse tree dumps: {}", err);
        }
    }
}

/// Default output directory next to the working directory.
pub fn default_out_dir() -> PathBuf {
    PathBuf::from("out")
}
