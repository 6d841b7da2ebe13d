use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "wotrack",
    version,
    about = "Work-order paperwork ingestion and inventory availability reporting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    Report(ReportArgs),
    Query(QueryArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = ".cache/wotrack")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Directory scanned recursively for work-order PDFs; repeatable.
    #[arg(long = "pdf-dir")]
    pub pdf_dirs: Vec<PathBuf>,

    /// Directory scanned recursively for pick-list Word documents; repeatable.
    #[arg(long = "word-dir")]
    pub word_dirs: Vec<PathBuf>,

    /// External table-segmentation command for PDFs, must emit tabula-style JSON.
    #[arg(long, default_value = "tabula")]
    pub pdf_extractor_cmd: String,

    #[arg(long)]
    pub run_summary_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, default_value = ".cache/wotrack")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Open sales order CSV export (point-in-time snapshot).
    #[arg(long)]
    pub sales_orders: PathBuf,

    /// On-hand inventory CSV export (point-in-time snapshot).
    #[arg(long)]
    pub inventory: PathBuf,

    /// Restrict output to work orders whose number contains this text.
    #[arg(long)]
    pub filter: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, default_value = ".cache/wotrack")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Case-insensitive substring matched against stored file names and
    /// work-order numbers.
    #[arg(long, default_value = "")]
    pub filter: String,

    /// Sales-order snapshot; with --inventory, the reconciled availability
    /// tree is included in the response.
    #[arg(long)]
    pub sales_orders: Option<PathBuf>,

    #[arg(long)]
    pub inventory: Option<PathBuf>,

    /// Mark every product record returned by this query as Picked.
    #[arg(long, default_value_t = false)]
    pub mark_picked: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/wotrack")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
