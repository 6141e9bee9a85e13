//! Extension registry for custom block rules, inline rules, render overrides
//! and post-processors.
//!
//! The four capability kinds are independent: a registrant implements only the
//! traits it needs and is added to the matching slot. Every slot is consulted
//! in registration order.
//!
//! | Slot | Consulted | Short-circuit |
//! |------|-----------|---------------|
//! | [`BlockRule`] | before built-in block recognition | first match wins |
//! | [`InlineRule`] | after built-in inline rules | no, all run |
//! | [`RenderOverride`] | before the built-in fragment builder | first `Some` wins |
//! | [`PostProcessor`] | over assembled HTML, before sanitizing | no, all run |
//!
//! To fill several slots with one object, wrap it in an [`Arc`] and register
//! clones; every trait is implemented for `Arc<T>`.
//!
//! # Example
//!
//! ```
//! use tailmd_renderer::{ExtensionRegistry, RegexInlineRule, RenderOptions, Renderer};
//!
//! let registry = ExtensionRegistry::new()
//!     .with_inline_rule(RegexInlineRule::new("mention", r"@(\w+)", r#"<a href="/u/$1">@$1</a>"#).unwrap());
//! let renderer = Renderer::new(RenderOptions::default()).with_extensions(registry);
//! assert!(renderer.render("hi @ada").contains(r#"<a href="/u/ada">@ada</a>"#));
//! ```

use std::sync::Arc;

use regex::Regex;

use crate::options::RenderOptions;
use crate::token::{Block, BlockToken};

/// Result of a successful [`BlockRule`] match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatch {
    /// Number of lines consumed, at least one.
    pub lines: usize,
    /// Token payload.
    pub block: Block,
    /// `false` when later input could extend the block. An incomplete match
    /// absorbs the rest of the buffer.
    pub complete: bool,
}

/// Custom block recognizer, tried before the built-in rules.
pub trait BlockRule: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Try to recognize a block starting at `lines[0]`.
    ///
    /// `lines` holds the remaining source lines with their terminators; the
    /// last one may be unterminated.
    fn try_match(&self, lines: &[&str], options: &RenderOptions) -> Option<BlockMatch>;
}

/// Custom inline substitution, applied after the built-in inline rules.
pub trait InlineRule: Send + Sync {
    fn name(&self) -> &str;

    /// Transform already formatted inline HTML.
    fn apply(&self, html: &str) -> String;
}

/// Replacement fragment builder for tokens.
pub trait RenderOverride: Send + Sync {
    fn name(&self) -> &str;

    /// Return `Some(html)` to replace the built-in fragment or `None` to defer.
    fn render(&self, token: &BlockToken, streaming: bool) -> Option<String>;
}

/// Hook over the fully assembled HTML.
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, html: &mut String);
}

impl<T: BlockRule + ?Sized> BlockRule for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn try_match(&self, lines: &[&str], options: &RenderOptions) -> Option<BlockMatch> {
        (**self).try_match(lines, options)
    }
}

impl<T: InlineRule + ?Sized> InlineRule for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply(&self, html: &str) -> String {
        (**self).apply(html)
    }
}

impl<T: RenderOverride + ?Sized> RenderOverride for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn render(&self, token: &BlockToken, streaming: bool) -> Option<String> {
        (**self).render(token, streaming)
    }
}

impl<T: PostProcessor + ?Sized> PostProcessor for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn process(&self, html: &mut String) {
        (**self).process(html);
    }
}

/// Inline rule backed by a regex substitution.
///
/// The replacement uses [`Regex::replace_all`] syntax (`$1`, `${name}`).
pub struct RegexInlineRule {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl RegexInlineRule {
    /// Build a rule from a pattern string.
    pub fn new(name: &str, pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(name, Regex::new(pattern)?, replacement))
    }

    #[must_use]
    pub fn from_regex(name: &str, pattern: Regex, replacement: &str) -> Self {
        Self {
            name: name.to_owned(),
            pattern,
            replacement: replacement.to_owned(),
        }
    }
}

impl InlineRule for RegexInlineRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, html: &str) -> String {
        self.pattern
            .replace_all(html, self.replacement.as_str())
            .into_owned()
    }
}

/// Ordered registry of extension capabilities.
///
/// Owned by one [`Renderer`](crate::Renderer) and immutable once the renderer
/// is built.
#[derive(Default)]
pub struct ExtensionRegistry {
    block_rules: Vec<Box<dyn BlockRule>>,
    inline_rules: Vec<Box<dyn InlineRule>>,
    overrides: Vec<Box<dyn RenderOverride>>,
    post_processors: Vec<Box<dyn PostProcessor>>,
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_block_rule<R: BlockRule + 'static>(mut self, rule: R) -> Self {
        self.block_rules.push(Box::new(rule));
        self
    }

    #[must_use]
    pub fn with_inline_rule<R: InlineRule + 'static>(mut self, rule: R) -> Self {
        self.inline_rules.push(Box::new(rule));
        self
    }

    #[must_use]
    pub fn with_render_override<R: RenderOverride + 'static>(mut self, rule: R) -> Self {
        self.overrides.push(Box::new(rule));
        self
    }

    #[must_use]
    pub fn with_post_processor<P: PostProcessor + 'static>(mut self, processor: P) -> Self {
        self.post_processors.push(Box::new(processor));
        self
    }

    /// Whether no capability has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block_rules.is_empty()
            && self.inline_rules.is_empty()
            && self.overrides.is_empty()
            && self.post_processors.is_empty()
    }

    pub(crate) fn has_block_rules(&self) -> bool {
        !self.block_rules.is_empty()
    }

    /// First block rule match, with the consumed line count clamped to the
    /// available lines.
    pub(crate) fn match_block(
        &self,
        lines: &[&str],
        options: &RenderOptions,
    ) -> Option<BlockMatch> {
        self.block_rules.iter().find_map(|rule| {
            let mut found = rule.try_match(lines, options)?;
            found.lines = found.lines.clamp(1, lines.len());
            tracing::trace!(rule = rule.name(), lines = found.lines, "block rule matched");
            Some(found)
        })
    }

    pub(crate) fn apply_inline(&self, html: String) -> String {
        self.inline_rules
            .iter()
            .fold(html, |acc, rule| rule.apply(&acc))
    }

    pub(crate) fn render_override(&self, token: &BlockToken, streaming: bool) -> Option<String> {
        self.overrides
            .iter()
            .find_map(|o| o.render(token, streaming))
    }

    pub(crate) fn post_process(&self, html: &mut String) {
        for processor in &self.post_processors {
            processor.process(html);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct Shout;

    impl InlineRule for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn apply(&self, html: &str) -> String {
            html.to_uppercase()
        }
    }

    impl PostProcessor for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn process(&self, html: &mut String) {
            html.push('!');
        }
    }

    struct Fixed(&'static str);

    impl RenderOverride for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn render(&self, token: &BlockToken, _streaming: bool) -> Option<String> {
            matches!(token.block, Block::Rule).then(|| self.0.to_owned())
        }
    }

    fn rule_token() -> BlockToken {
        BlockToken {
            block: Block::Rule,
            raw: "---\n".to_owned(),
            complete: true,
            start_line: 0,
            end_line: 1,
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = ExtensionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.apply_inline("a".to_owned()), "a");
        assert_eq!(registry.render_override(&rule_token(), false), None);
    }

    #[test]
    fn test_first_override_wins() {
        let registry = ExtensionRegistry::new()
            .with_render_override(Fixed("first"))
            .with_render_override(Fixed("second"));
        assert_eq!(
            registry.render_override(&rule_token(), false).as_deref(),
            Some("first")
        );
    }

    #[test]
    fn test_inline_rules_run_in_order() {
        let registry = ExtensionRegistry::new()
            .with_inline_rule(RegexInlineRule::new("ab", "a", "b").unwrap())
            .with_inline_rule(RegexInlineRule::new("bc", "b", "c").unwrap());
        assert_eq!(registry.apply_inline("a".to_owned()), "c");
    }

    #[test]
    fn test_shared_registrant_fills_several_slots() {
        let shout = Arc::new(Shout);
        let registry = ExtensionRegistry::new()
            .with_inline_rule(Arc::clone(&shout))
            .with_post_processor(shout);
        assert_eq!(registry.apply_inline("hi".to_owned()), "HI");

        let mut html = "x".to_owned();
        registry.post_process(&mut html);
        assert_eq!(html, "x!");
    }

    #[test]
    fn test_block_match_is_clamped() {
        struct Greedy;

        impl BlockRule for Greedy {
            fn name(&self) -> &str {
                "greedy"
            }

            fn try_match(&self, _lines: &[&str], _options: &RenderOptions) -> Option<BlockMatch> {
                Some(BlockMatch {
                    lines: 99,
                    block: Block::Rule,
                    complete: true,
                })
            }
        }

        let registry = ExtensionRegistry::new().with_block_rule(Greedy);
        let found = registry
            .match_block(&["a\n", "b"], &RenderOptions::default())
            .unwrap();
        assert_eq!(found.lines, 2);
    }
}
