//! The checkpoint engine.

use std::fmt::Write;
use std::sync::Arc;

use tailmd_renderer::{Block, BlockToken, RenderOptions, Renderer, escape_html};

/// Handle returned by [`StreamSession::on_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A fenced code block that will not change any more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockEvent {
    /// Fence info string.
    pub lang: String,
    pub body: String,
}

type UpdateListener = Box<dyn FnMut(&str) + Send>;
type CodeBlockListener = Box<dyn FnMut(&CodeBlockEvent) + Send>;

/// Tokens that can no longer change and their cached fragments.
#[derive(Default)]
struct Checkpoint {
    tokens: Vec<BlockToken>,
    /// One fragment per token, rendered with the session's streaming flag.
    fragments: Vec<String>,
    /// Non-empty fragments joined by newlines.
    html: String,
}

/// Incremental renderer for one append-only buffer.
///
/// Mutating calls take `&mut self`; a session is driven by a single writer.
/// The [`Renderer`] can be shared between sessions.
pub struct StreamSession {
    renderer: Arc<Renderer>,
    buffer: String,
    checkpoint: Checkpoint,
    /// Code blocks already reported, counted in document order.
    reported_code_blocks: usize,
    next_subscription: u64,
    update_listeners: Vec<(SubscriptionId, UpdateListener)>,
    code_block_listeners: Vec<CodeBlockListener>,
}

impl StreamSession {
    pub fn new(renderer: Arc<Renderer>) -> Self {
        Self {
            renderer,
            buffer: String::new(),
            checkpoint: Checkpoint::default(),
            reported_code_blocks: 0,
            next_subscription: 0,
            update_listeners: Vec::new(),
            code_block_listeners: Vec::new(),
        }
    }

    /// Session over a renderer with default collaborators.
    pub fn with_options(options: RenderOptions) -> Self {
        Self::new(Arc::new(Renderer::new(options)))
    }

    /// Current buffer contents.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Number of tokens in the checkpoint.
    pub fn committed_count(&self) -> usize {
        self.checkpoint.tokens.len()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Register a listener for every HTML string produced by
    /// [`push`](Self::push), [`finish`](Self::finish) and [`reset`](Self::reset).
    pub fn on_update<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&str) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.update_listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove an update listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.update_listeners.len();
        self.update_listeners.retain(|(existing, _)| *existing != id);
        self.update_listeners.len() != before
    }

    /// Register a listener fired once per closed code block, in document order.
    pub fn on_code_block<F>(&mut self, listener: F)
    where
        F: FnMut(&CodeBlockEvent) + Send + 'static,
    {
        self.code_block_listeners.push(Box::new(listener));
    }

    /// Append `chunk` and return the HTML of the whole buffer.
    ///
    /// Only tokens past the unchanged committed prefix are rendered.
    pub fn push(&mut self, chunk: &str) -> String {
        self.buffer.push_str(chunk);
        let html = self.render_incremental();
        self.notify(&html);
        html
    }

    /// Render the whole buffer non-streaming and clear the checkpoint.
    ///
    /// The result equals `Renderer::render` over the buffer: deferred inline
    /// math is rendered and no cursor is appended.
    pub fn finish(&mut self) -> String {
        let tokens = self.renderer.tokenize(&self.buffer);
        self.report_code_blocks(&tokens);
        let html = self
            .renderer
            .finalize(self.renderer.render_all(&tokens, false));
        self.checkpoint = Checkpoint::default();
        tracing::debug!(tokens = tokens.len(), bytes = self.buffer.len(), "stream finished");
        self.notify(&html);
        html
    }

    /// Clear the buffer and all state. Listeners receive an empty string.
    pub fn reset(&mut self) {
        self.clear();
        self.notify("");
    }

    /// Replace the buffer with `text`.
    ///
    /// When `text` extends the current buffer only the suffix is pushed. Any
    /// other edit clears the session and renders `text` from scratch.
    pub fn set_buffer(&mut self, text: &str) -> String {
        match text.strip_prefix(self.buffer.as_str()) {
            Some(suffix) => {
                let suffix = suffix.to_owned();
                self.push(&suffix)
            }
            None => {
                tracing::debug!(
                    old_len = self.buffer.len(),
                    new_len = text.len(),
                    "non-append edit, resetting session"
                );
                self.clear();
                self.push(text)
            }
        }
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.checkpoint = Checkpoint::default();
        self.reported_code_blocks = 0;
    }

    fn render_incremental(&mut self) -> String {
        let tokens = self.renderer.tokenize(&self.buffer);
        let commit_len = commit_len(&tokens, &self.buffer);

        let reused = self
            .checkpoint
            .tokens
            .iter()
            .zip(&tokens[..commit_len])
            .take_while(|(old, new)| old.raw == new.raw)
            .count();

        let streaming = self.renderer.options().streaming;
        if reused != self.checkpoint.tokens.len() || commit_len != reused {
            let checkpoint = &mut self.checkpoint;
            checkpoint.tokens.truncate(reused);
            checkpoint.fragments.truncate(reused);
            for token in &tokens[reused..commit_len] {
                checkpoint
                    .fragments
                    .push(self.renderer.render_one(token, streaming));
                checkpoint.tokens.push(token.clone());
            }
            checkpoint.html = join_fragments(checkpoint.fragments.iter().map(String::as_str));
            tracing::debug!(
                reused,
                rendered = commit_len - reused,
                committed = commit_len,
                "checkpoint rebuilt"
            );
            let committed = std::mem::take(&mut checkpoint.tokens);
            self.report_code_blocks(&committed);
            self.checkpoint.tokens = committed;
        }

        let options = self.renderer.options();
        let pending = self.renderer.render_all(&tokens[commit_len..], streaming);
        let assembled = join_fragments([self.checkpoint.html.as_str(), pending.as_str()]);

        let mut html = self.renderer.finalize(assembled);
        if options.streaming && !options.cursor.is_empty() {
            write!(
                html,
                "<span class=\"{}cursor\">{}</span>",
                options.class_prefix,
                escape_html(&options.cursor)
            )
            .unwrap();
        }
        html
    }

    /// Fire code-block listeners for closed code blocks in `tokens` that have
    /// not been reported yet.
    fn report_code_blocks(&mut self, tokens: &[BlockToken]) {
        let closed = tokens.iter().filter_map(|token| match &token.block {
            Block::CodeBlock { lang, body } if token.complete => Some((lang, body)),
            _ => None,
        });
        for (lang, body) in closed.skip(self.reported_code_blocks) {
            let event = CodeBlockEvent {
                lang: lang.clone(),
                body: body.clone(),
            };
            for listener in &mut self.code_block_listeners {
                listener(&event);
            }
            self.reported_code_blocks += 1;
        }
    }

    fn notify(&mut self, html: &str) {
        for (_, listener) in &mut self.update_listeners {
            listener(html);
        }
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::with_options(RenderOptions::default().with_streaming(true))
    }
}

/// Number of leading tokens that can be committed.
///
/// The last token can always be extended. When the buffer ends in an
/// unterminated line that begins the last token, the token before it is held
/// as well: its end was decided by that line, which may still change.
fn commit_len(tokens: &[BlockToken], buffer: &str) -> usize {
    let Some(last) = tokens.last() else {
        return 0;
    };
    let mut candidates = tokens.len() - 1;
    if !buffer.ends_with('\n') && !last.raw.contains('\n') {
        candidates = candidates.saturating_sub(1);
    }
    tokens[..candidates]
        .iter()
        .take_while(|token| token.complete)
        .count()
}

fn join_fragments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    fragments
        .into_iter()
        .filter(|html| !html.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
