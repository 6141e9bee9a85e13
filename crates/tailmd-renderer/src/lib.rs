//! Incremental-friendly markdown to sanitized HTML rendering.
//!
//! The pipeline has four stages:
//!
//! 1. The block tokenizer splits the buffer into [`BlockToken`]s, marking a
//!    token incomplete when more input could still extend it (an open code
//!    fence or `$$` block).
//! 2. The token renderer turns each token into an HTML fragment, running the
//!    inline formatter over text and delegating math, diagrams and code
//!    coloring to collaborators.
//! 3. Registered post-processors rewrite the joined HTML.
//! 4. The sanitizer strips everything outside its allowlist.
//!
//! Tokenization is deterministic and every token carries its exact source
//! text, which lets a streaming session reuse the fragments of tokens that did
//! not change between appends.
//!
//! # Example
//!
//! ```
//! use tailmd_renderer::{RenderOptions, render};
//!
//! let html = render("- [x] done\n- [ ] todo", &RenderOptions::default());
//! assert!(html.contains(r#"<input type="checkbox" checked disabled> done"#));
//! ```

mod collaborator;
mod extension;
mod fence;
mod html;
mod inline;
mod options;
mod renderer;
mod sanitize;
mod token;
mod tokenizer;
mod util;

pub use collaborator::{
    CodeHighlighter, CollaboratorError, DiagramRenderer, MathRenderer, PlainHighlighter,
    SyntectHighlighter, TexPassthrough,
};
pub use extension::{
    BlockMatch, BlockRule, ExtensionRegistry, InlineRule, PostProcessor, RegexInlineRule,
    RenderOverride,
};
pub use inline::format_inline;
pub use options::RenderOptions;
pub use renderer::Renderer;
pub use sanitize::{AllowlistSanitizer, Sanitizer};
pub use token::{Align, Block, BlockToken, ListItem};
pub use util::{escape_html, is_dangerous_url};

/// Tokenize `buffer` with built-in rules only.
pub fn tokenize(buffer: &str, options: &RenderOptions) -> Vec<BlockToken> {
    tokenizer::tokenize(buffer, options, &ExtensionRegistry::new())
}

/// Render `buffer` from scratch with default collaborators.
pub fn render(buffer: &str, options: &RenderOptions) -> String {
    Renderer::new(options.clone()).render(buffer)
}
