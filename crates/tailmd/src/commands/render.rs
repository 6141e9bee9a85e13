//! `tailmd render` command implementation.

use std::path::PathBuf;

use clap::Args;

use super::{CommonArgs, build_renderer};
use crate::error::CliError;
use crate::output::{Output, emit};

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RenderArgs {
    /// Render the whole input once.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or I/O fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let config = self.common.load_config(None)?;
        let renderer = build_renderer(&config, false);
        let input = self.common.read_input()?;

        let html = renderer.render(&input);
        tracing::info!(input_bytes = input.len(), html_bytes = html.len(), "rendered");

        match &self.output {
            Some(path) => {
                std::fs::write(path, format!("{html}\n"))?;
                if self.common.verbose {
                    Output::new().info(&format!("Wrote {}", path.display()));
                }
                Ok(())
            }
            None => Ok(emit(&html)?),
        }
    }
}
