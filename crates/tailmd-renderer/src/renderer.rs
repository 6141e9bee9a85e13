//! The renderer: options, extensions and collaborators bundled together.

use crate::collaborator::{
    CodeHighlighter, DiagramRenderer, MathRenderer, SyntectHighlighter, TexPassthrough,
};
use crate::extension::{BlockRule, ExtensionRegistry, InlineRule, PostProcessor, RenderOverride};
use crate::options::RenderOptions;
use crate::sanitize::{AllowlistSanitizer, Sanitizer};
use crate::token::BlockToken;
use crate::tokenizer;

/// Markdown to sanitized HTML renderer.
///
/// Immutable once built and `Send + Sync`, so one renderer can serve many
/// sessions. Rendering never fails: collaborator errors become inline error
/// fragments.
///
/// Defaults: [`TexPassthrough`] for math, [`SyntectHighlighter`] for code,
/// no diagram renderer, [`AllowlistSanitizer`] for output.
///
/// # Example
///
/// ```
/// use tailmd_renderer::{RenderOptions, Renderer};
///
/// let renderer = Renderer::new(RenderOptions::default());
/// assert_eq!(
///     renderer.render("# Hi\n\nSome **bold** text."),
///     "<h1>Hi</h1>\n<p>Some <strong>bold</strong> text.</p>"
/// );
/// ```
pub struct Renderer {
    pub(crate) options: RenderOptions,
    pub(crate) extensions: ExtensionRegistry,
    pub(crate) math: Box<dyn MathRenderer>,
    pub(crate) highlighter: Box<dyn CodeHighlighter>,
    pub(crate) diagrams: Option<Box<dyn DiagramRenderer>>,
    sanitizer: Box<dyn Sanitizer>,
}

impl Renderer {
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            extensions: ExtensionRegistry::new(),
            math: Box::new(TexPassthrough),
            highlighter: Box::new(SyntectHighlighter),
            diagrams: None,
            sanitizer: Box::new(AllowlistSanitizer),
        }
    }

    /// Replace the extension registry.
    #[must_use]
    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    #[must_use]
    pub fn with_block_rule<R: BlockRule + 'static>(mut self, rule: R) -> Self {
        self.extensions = self.extensions.with_block_rule(rule);
        self
    }

    #[must_use]
    pub fn with_inline_rule<R: InlineRule + 'static>(mut self, rule: R) -> Self {
        self.extensions = self.extensions.with_inline_rule(rule);
        self
    }

    #[must_use]
    pub fn with_render_override<R: RenderOverride + 'static>(mut self, rule: R) -> Self {
        self.extensions = self.extensions.with_render_override(rule);
        self
    }

    #[must_use]
    pub fn with_post_processor<P: PostProcessor + 'static>(mut self, processor: P) -> Self {
        self.extensions = self.extensions.with_post_processor(processor);
        self
    }

    #[must_use]
    pub fn with_math<M: MathRenderer + 'static>(mut self, math: M) -> Self {
        self.math = Box::new(math);
        self
    }

    #[must_use]
    pub fn with_highlighter<H: CodeHighlighter + 'static>(mut self, highlighter: H) -> Self {
        self.highlighter = Box::new(highlighter);
        self
    }

    /// Set the diagram renderer used for supported fence languages.
    #[must_use]
    pub fn with_diagrams<D: DiagramRenderer + 'static>(mut self, diagrams: D) -> Self {
        self.diagrams = Some(Box::new(diagrams));
        self
    }

    #[must_use]
    pub fn with_sanitizer<S: Sanitizer + 'static>(mut self, sanitizer: S) -> Self {
        self.sanitizer = Box::new(sanitizer);
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Split `buffer` into block tokens.
    pub fn tokenize(&self, buffer: &str) -> Vec<BlockToken> {
        tokenizer::tokenize(buffer, &self.options, &self.extensions)
    }

    /// HTML fragment for one token. Render overrides are consulted first.
    ///
    /// `streaming` marks a pass over a buffer that is still growing: inline
    /// math is deferred and unterminated code blocks get the streaming class.
    pub fn render_one(&self, token: &BlockToken, streaming: bool) -> String {
        if let Some(html) = self.extensions.render_override(token, streaming) {
            return html;
        }
        self.build_fragment(token, streaming)
    }

    /// Fragments of all tokens, empty ones skipped, joined by newlines.
    pub fn render_all(&self, tokens: &[BlockToken], streaming: bool) -> String {
        tokens
            .iter()
            .map(|token| self.render_one(token, streaming))
            .filter(|html| !html.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run post-processors, then the sanitizer when enabled.
    pub fn finalize(&self, mut html: String) -> String {
        self.extensions.post_process(&mut html);
        if self.options.sanitize {
            self.sanitizer.sanitize(&html)
        } else {
            html
        }
    }

    /// Render a complete document from scratch.
    pub fn render(&self, buffer: &str) -> String {
        let tokens = self.tokenize(buffer);
        self.finalize(self.render_all(&tokens, false))
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}
