//! CLI argument parsing with clap.

use std::path::PathBuf;

use clap::Parser;

/// HTTP relay for Gemini media summaries, grounded search, documents and images.
#[derive(Parser, Debug)]
#[command(name = "gemini-relay", version, about)]
pub struct Cli {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Address to listen on (overrides `server.bind`).
    #[arg(short, long, env = "RELAY_BIND")]
    pub bind: Option<String>,

    /// Directory for generated images (overrides `server.image_dir`).
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}
