//! tailmd CLI - incremental markdown to HTML rendering.
//!
//! Provides commands for:
//! - `render`: Render a markdown file (or stdin) to sanitized HTML
//! - `stream`: Push the input through a streaming session chunk by chunk

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{RenderArgs, StreamArgs};
use output::Output;

/// tailmd - incremental markdown to HTML rendering.
#[derive(Parser)]
#[command(name = "tailmd", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the whole input once.
    Render(RenderArgs),
    /// Render the input incrementally, as if it were being streamed.
    Stream(StreamArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Render(args) => args.common.verbose,
        Commands::Stream(args) => args.common.verbose,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Stream(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
