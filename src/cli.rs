use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(
    name = "coco-loader",
    version,
    about = "Load COCO annotation files into a duplicate-free document store"
)]
pub struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Defaults to a full ingest of every annotation file.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest annotation files, optionally filtered by category.
    Ingest(IngestArgs),
    /// Derive a category collection from previously ingested bulk collections.
    Project(ProjectArgs),
    /// Report the smallest and largest image of a collection.
    Extremes(ExtremesArgs),
    /// Show per-collection document counts.
    Status,
}

#[derive(Args, Debug, Clone, Default)]
#[command(group(ArgGroup::new("filter").args(["category", "all_categories"])))]
pub struct IngestArgs {
    /// Only ingest images annotated with this category name.
    #[arg(long)]
    pub category: Option<String>,

    /// Ingest every category into its own collection.
    #[arg(long, default_value_t = false)]
    pub all_categories: bool,

    /// Destination collection for category ingestion.
    #[arg(long, requires = "filter")]
    pub collection: Option<String>,

    /// Write a JSON run report to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Count what would be inserted without writing to the database.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long)]
    pub category: String,

    #[arg(long)]
    pub collection: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExtremesArgs {
    #[arg(long)]
    pub collection: String,
}
