//! austreamer CLI - host tool for austreamer pipelines.

mod commands;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "austreamer")]
#[command(author, version, about = "austreamer pipeline host tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a TOML pipeline and write its output to a WAV file
    Render(commands::render::RenderArgs),

    /// Inspect or create configuration blobs
    Config(commands::config::ConfigArgs),

    /// List the element types pipelines can use
    Elements(commands::elements::ElementsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Elements(args) => commands::elements::run(args),
    }
}
