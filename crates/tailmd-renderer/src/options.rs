//! Feature flags threaded through tokenizing and rendering.

/// Immutable rendering configuration.
///
/// Passed explicitly to the tokenizer, inline formatter and token renderer so
/// that every stage sees the same flags and sessions stay independently
/// configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenderOptions {
    /// Recognize `$$` display blocks and `$…$` inline spans.
    pub math: bool,
    /// Colorize fenced code through the code highlighter.
    pub highlight: bool,
    /// Send diagram fences to the diagram renderer.
    pub diagrams: bool,
    /// Recognize pipe tables.
    pub tables: bool,
    /// Strikethrough and task list checkboxes.
    pub gfm: bool,
    /// `^sup^` spans.
    pub superscript: bool,
    /// `==mark==` spans.
    pub mark: bool,
    /// Session renders are streaming passes: inline math is deferred and the
    /// cursor marker is appended.
    pub streaming: bool,
    /// Run the sanitizer over assembled HTML.
    pub sanitize: bool,
    /// Marker appended to streaming output. Empty disables it.
    pub cursor: String,
    /// Prefix for every CSS hook class.
    pub class_prefix: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            math: true,
            highlight: true,
            diagrams: true,
            tables: true,
            gfm: true,
            superscript: false,
            mark: false,
            streaming: false,
            sanitize: true,
            cursor: "▋".to_owned(),
            class_prefix: "md-".to_owned(),
        }
    }
}

impl RenderOptions {
    /// Toggle streaming mode.
    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Prefixed CSS class name, e.g. `class("math")` → `md-math`.
    pub(crate) fn class(&self, name: &str) -> String {
        format!("{}{name}", self.class_prefix)
    }
}
