//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::OutputFormat as ConfigFormat;

/// szz - Label buggy methods per release from issue tracker tickets and git history.
#[derive(Parser)]
#[command(name = "szz")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the git repository
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Output format (defaults to the configured format)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Link tickets to their fix commits
    Link(LinkArgs),

    /// Estimate the buggy releases of every ticket
    #[command(alias = "est")]
    Estimate(EstimateArgs),

    /// Label methods touched by fix commits as buggy
    Label(LabelArgs),

    /// Compute the cold-start Proportion from reference projects
    #[command(name = "cold-start", alias = "cs")]
    ColdStart(ColdStartArgs),
}

#[derive(Args, Clone, Debug)]
pub struct LinkArgs {
    /// Project metadata file (releases and tickets, JSON)
    #[arg(short, long)]
    pub metadata: PathBuf,

    /// Skip the same-author linkage heuristic
    #[arg(long)]
    pub no_heuristic: bool,
}

#[derive(Args, Clone, Debug, Default)]
pub struct ProportionArgs {
    /// Directory with reference project metadata (`<KEY>.json`)
    #[arg(long)]
    pub metadata_dir: Option<PathBuf>,

    /// Fixed cold-start Proportion; skips reference project sampling
    #[arg(long)]
    pub proportion: Option<f64>,
}

#[derive(Args, Clone, Debug)]
pub struct EstimateArgs {
    /// Project metadata file (releases and tickets, JSON)
    #[arg(short, long)]
    pub metadata: PathBuf,

    #[command(flatten)]
    pub proportion: ProportionArgs,
}

#[derive(Args, Clone, Debug)]
pub struct LabelArgs {
    #[command(flatten)]
    pub link: LinkArgs,

    #[command(flatten)]
    pub proportion: ProportionArgs,

    /// Method dataset (JSON array of method records)
    #[arg(long)]
    pub methods: PathBuf,

    /// Write the labeled dataset here
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// List every labeled method in the report
    #[arg(long)]
    pub events: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ColdStartArgs {
    /// Directory with reference project metadata (`<KEY>.json`)
    #[arg(long)]
    pub metadata_dir: Option<PathBuf>,

    /// Reference project keys (repeatable; defaults to the configured list)
    #[arg(long = "project")]
    pub projects: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Text,
}

impl From<OutputFormat> for ConfigFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ConfigFormat::Json,
            OutputFormat::Markdown => ConfigFormat::Markdown,
            OutputFormat::Text => ConfigFormat::Text,
        }
    }
}
