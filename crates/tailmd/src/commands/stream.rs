//! `tailmd stream` command implementation.
//!
//! Feeds the input to a streaming session in fixed-size chunks, the way a
//! generative text source would, and prints the final HTML.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde_json::json;
use tailmd_stream::StreamSession;

use super::{CommonArgs, build_renderer};
use crate::error::CliError;
use crate::output::{Output, emit};

/// Arguments for the stream command.
#[derive(Args)]
pub(crate) struct StreamArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Characters per pushed chunk.
    #[arg(long, default_value_t = 16)]
    chunk_size: usize,

    /// Pause between chunks, in milliseconds.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Print every intermediate update as a JSON line.
    #[arg(long)]
    updates: bool,

    /// Cursor marker appended while streaming (overrides config).
    #[arg(long)]
    cursor: Option<String>,
}

impl StreamArgs {
    /// Stream the input through a session.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or I/O fails, or `--chunk-size` is 0.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        if self.chunk_size == 0 {
            return Err(CliError::Validation(
                "--chunk-size must be at least 1".to_owned(),
            ));
        }

        let config = self.common.load_config(self.cursor.clone())?;
        let renderer = Arc::new(build_renderer(&config, config.stream.enabled));
        let input = self.common.read_input()?;

        let mut session = StreamSession::new(renderer);
        if self.common.verbose {
            session.on_code_block(|block| {
                Output::new().highlight(&format!(
                    "code block closed: {} ({} lines)",
                    if block.lang.is_empty() { "plain" } else { block.lang.as_str() },
                    block.body.lines().count()
                ));
            });
        }

        let pieces = split_chunks(&input, self.chunk_size);
        let delay = Duration::from_millis(self.delay_ms);
        for (index, piece) in pieces.iter().enumerate() {
            let html = session.push(piece);
            if self.updates {
                let line = json!({
                    "chunk": index,
                    "committed": session.committed_count(),
                    "html": html,
                });
                emit(&serde_json::to_string(&line)?)?;
            }
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }

        tracing::info!(chunks = pieces.len(), bytes = input.len(), "stream complete");
        let html = session.finish();
        if self.updates {
            emit(&serde_json::to_string(&json!({ "final": true, "html": html }))?)?;
        } else {
            emit(&html)?;
        }
        Ok(())
    }
}

/// Split `text` into chunks of `size` characters.
fn split_chunks(text: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for (count, (offset, _)) in text.char_indices().enumerate() {
        if count > 0 && count % size == 0 {
            chunks.push(&text[start..offset]);
            start = offset;
        }
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}
