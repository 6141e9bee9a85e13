//! Pluggable renderers for math, diagrams and code coloring.
//!
//! The token renderer never fails. Errors and panics from these collaborators
//! are caught per token and turned into inert error fragments.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::LazyLock;

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::util::escape_html;

/// Error returned by a collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// The source cannot be rendered.
    #[error("invalid source: {0}")]
    InvalidSource(String),
    /// The backend (a remote service, a typesetter) failed.
    #[error("{0}")]
    Backend(String),
}

/// Converts TeX source into display markup.
pub trait MathRenderer: Send + Sync {
    /// Render `source` as a display block (`display`) or inline span.
    fn to_markup(&self, source: &str, display: bool) -> Result<String, CollaboratorError>;
}

/// Converts diagram source into an inline SVG.
pub trait DiagramRenderer: Send + Sync {
    /// Whether a fence info string's language names a supported diagram type.
    fn supports(&self, lang: &str) -> bool;

    fn to_vector_image(&self, lang: &str, source: &str) -> Result<String, CollaboratorError>;
}

/// Colors code for display.
///
/// Output is HTML; implementations must escape the code themselves.
pub trait CodeHighlighter: Send + Sync {
    fn colorize(&self, code: &str, lang: &str) -> String;
}

/// Run one collaborator call, converting errors and panics into `None`.
///
/// `kind` names the collaborator in the warning.
pub(crate) fn guarded<F>(kind: &str, call: F) -> Option<String>
where
    F: FnOnce() -> Result<String, CollaboratorError>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(markup)) => Some(markup),
        Ok(Err(e)) => {
            tracing::warn!(kind, error = %e, "collaborator failed");
            None
        }
        Err(_) => {
            tracing::warn!(kind, "collaborator panicked");
            None
        }
    }
}

/// Emits escaped TeX wrapped in `\[…\]` or `\(…\)` delimiters for a
/// client-side typesetter.
///
/// Sources with unbalanced braces are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TexPassthrough;

impl MathRenderer for TexPassthrough {
    fn to_markup(&self, source: &str, display: bool) -> Result<String, CollaboratorError> {
        check_braces(source)?;
        let escaped = escape_html(source);
        Ok(if display {
            format!("\\[{escaped}\\]")
        } else {
            format!("\\({escaped}\\)")
        })
    }
}

fn check_braces(source: &str) -> Result<(), CollaboratorError> {
    let mut depth: usize = 0;
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CollaboratorError::InvalidSource("unexpected `}`".to_owned()))?;
            }
            _ => {}
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(CollaboratorError::InvalidSource(format!(
            "{depth} unclosed `{{`"
        )))
    }
}

/// Highlighter that only escapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHighlighter;

impl CodeHighlighter for PlainHighlighter {
    fn colorize(&self, code: &str, _lang: &str) -> String {
        escape_html(code)
    }
}

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Syntax highlighter emitting `<span class="hl-…">` tokens.
///
/// Languages are looked up by token (`rs`, `rust`, `py`…). Unknown languages
/// fall back to escaped plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntectHighlighter;

impl CodeHighlighter for SyntectHighlighter {
    fn colorize(&self, code: &str, lang: &str) -> String {
        let Some(syntax) = (!lang.is_empty())
            .then(|| SYNTAX_SET.find_syntax_by_token(lang))
            .flatten()
        else {
            return escape_html(code);
        };

        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &SYNTAX_SET,
            ClassStyle::SpacedPrefixed { prefix: "hl-" },
        );
        for line in LinesWithEndings::from(code) {
            if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
                tracing::debug!(lang, error = %e, "highlighting failed, using plain text");
                return escape_html(code);
            }
        }
        generator.finalize()
    }
}
