use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "gograph",
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "Extract a code knowledge graph from a Go source tree",
    long_about = None
)]
struct Cli {
    /// Root directory of the Go source tree to analyze
    source_root: PathBuf,

    /// Output directory for graph.json and debug artifacts
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Keep intermediate files, parse tree dumps and the symbol table
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let out_dir = cli.out.unwrap_or_else(commands::extract::default_out_dir);
    commands::extract::execute(&cli.source_root, &out_dir, cli.debug)
}
