use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "scamsense")]
#[command(about = "Scan webmail and chat pages for scam messages", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a full scan as if the popup button was pressed
    Scan(ScanArgs),
    /// Print what would be sent to the classifier, without sending it
    Extract(PageArgs),
    /// Check that the classification service is up
    Health,
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// Address of the page; its host selects the extraction strategy
    #[arg(long)]
    pub url: String,

    /// Saved HTML of the page, re-read at scan time
    #[arg(long, conflicts_with = "fetch", required_unless_present = "fetch")]
    pub file: Option<PathBuf>,

    /// Download the page from --url instead of reading a file
    #[arg(long)]
    pub fetch: bool,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Write the page with the risk overlay injected to this path
    #[arg(long)]
    pub overlay_out: Option<PathBuf>,

    /// Print the page's reply as JSON instead of the status line
    #[arg(long)]
    pub json: bool,
}
