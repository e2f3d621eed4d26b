//! Command-line interface definition.
//!
//! - `stdmerge merge` - full pipeline
//! - `stdmerge analyze` - parse and match, nothing written
//! - `stdmerge rank` - ranking of one pattern
//! - `stdmerge extract` / `strip` / `report` - partial pipelines

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stdmerge_core::LibraryInput;

#[derive(Parser, Debug)]
#[command(
    name = "stdmerge",
    version,
    about = "Consolidate several standard libraries into one unified library"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every stage and write modules, stripped libraries and reports
    Merge(RunArgs),

    /// Parse and match only; prints the patterns found
    Analyze(AnalyzeArgs),

    /// Match and rank, then print the ranking of one pattern
    Rank(RankArgs),

    /// Write the unified modules only
    Extract(RunArgs),

    /// Write the stripped libraries only
    Strip(RunArgs),

    /// Write the Markdown reports only
    Report(RunArgs),
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// Library to analyze, as `<ecosystem>=<path>`. Repeat once per library.
    #[arg(long = "lib", value_name = "ECO=PATH", required = true, value_parser = parse_library)]
    pub libraries: Vec<LibraryInput>,

    /// JSON configuration document
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Output directory, created if missing
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Print the patterns as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RankArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Pattern name or id
    #[arg(short, long)]
    pub pattern: String,

    /// Print the ranking as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parse `<ecosystem>=<path>`.
pub fn parse_library(raw: &str) -> Result<LibraryInput, String> {
    let (ecosystem, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <ecosystem>=<path>, got '{raw}'"))?;
    let ecosystem = ecosystem.trim().to_lowercase();
    let path = path.trim();
    if ecosystem.is_empty() || path.is_empty() {
        return Err(format!("expected <ecosystem>=<path>, got '{raw}'"));
    }
    Ok((ecosystem, PathBuf::from(path)))
}
