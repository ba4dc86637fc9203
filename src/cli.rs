use clap::{Args, Parser, Subcommand};

use crate::app::config::{DEFAULT_IMAGE_BASE_URL, DEFAULT_RECENT_LIMIT, DEFAULT_REQUIRED_PREFIX};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Parse(ParseArgs),
    Render(RenderArgs),
    Convert(ConvertArgs),
    Records(RecordsArgs),
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Markdown file to parse (`-` reads stdin).
    #[arg(long)]
    pub file: String,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Markdown file to render (`-` reads stdin).
    #[arg(long)]
    pub file: String,

    /// Output path for the codelab HTML.
    #[arg(long)]
    pub out: String,

    /// Serve `img/` images from this base URL (empty disables rewriting).
    #[arg(long, default_value = DEFAULT_IMAGE_BASE_URL)]
    pub image_base_url: String,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Markdown source URL.
    #[arg(long)]
    pub url: String,

    /// SQLite cache database.
    #[arg(long, default_value = "db/codelabs.db")]
    pub db: String,

    /// Only URLs starting with this prefix are converted.
    #[arg(long, default_value = DEFAULT_REQUIRED_PREFIX)]
    pub required_prefix: String,

    /// Serve `img/` images from this base URL (empty disables rewriting).
    #[arg(long, default_value = DEFAULT_IMAGE_BASE_URL)]
    pub image_base_url: String,
}

#[derive(Debug, Args)]
pub struct RecordsArgs {
    /// SQLite cache database.
    #[arg(long, default_value = "db/codelabs.db")]
    pub db: String,

    /// Maximum records to print, newest first.
    #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
    pub limit: usize,
}
