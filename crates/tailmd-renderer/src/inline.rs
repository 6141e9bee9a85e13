//! Inline formatting.
//!
//! Text is HTML-escaped first, then a fixed chain of substitutions runs over
//! it. Spans whose content must not be reinterpreted (code, math, escapes,
//! link targets) are moved behind private-use placeholders and restored at the
//! end.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::collaborator::{MathRenderer, guarded};
use crate::extension::ExtensionRegistry;
use crate::options::RenderOptions;
use crate::util::{escape_html, is_dangerous_url, unescape_html};

const STASH_OPEN: char = '\u{E000}';
const STASH_CLOSE: char = '\u{E001}';

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}(\\d+)\u{E001}").unwrap());

static DOUBLE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"``(.+?)``").unwrap());
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

static ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(&(?:amp|lt|gt|quot|#x27);|[!-/:-@\[-`{-~])").unwrap()
});

static MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([^\s$](?:[^$\n]*?[^\s$])?)\$").unwrap());

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(([^)\s]*)(?:\s+&quot;(.*?)&quot;)?\)").unwrap()
});
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)\s]*)(?:\s+&quot;(.*?)&quot;)?\)").unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static AUTOLINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&lt;(https?://[^\s&]+)&gt;").unwrap());

static BOLD_ITALIC_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*\*([^*]+?)\*\*\*").unwrap());
static BOLD_STAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s](?:[^*]*?[^*\s])?)\*").unwrap());
static BOLD_ITALIC_UNDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"___([^_]+?)___").unwrap());
static BOLD_UNDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.+?)__").unwrap());
static ITALIC_UNDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([^_\s](?:[^_]*?[^_\s])?)_").unwrap());

static STRIKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~(.+?)~~").unwrap());
static SUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\^([^\s^]+)\^").unwrap());
static MARK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"==(.+?)==").unwrap());

static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?: {2,}|\\)\n").unwrap());

/// Format one block's inline text into HTML.
///
/// While `streaming`, inline math is left as text: an unfinished `$x` cannot
/// be told apart from a dollar amount until the block is done.
pub fn format_inline(
    text: &str,
    options: &RenderOptions,
    extensions: &ExtensionRegistry,
    math: &dyn MathRenderer,
    streaming: bool,
) -> String {
    let mut stash = Stash::default();

    let cleaned = text.replace([STASH_OPEN, STASH_CLOSE], "");
    let mut html = escape_html(&cleaned);

    html = replace(&DOUBLE_CODE_RE, &html, |caps| {
        stash.put(format!("<code>{}</code>", caps[1].trim()))
    });
    html = replace(&CODE_RE, &html, |caps| {
        stash.put(format!("<code>{}</code>", &caps[1]))
    });
    html = replace(&ESCAPE_RE, &html, |caps| stash.put(caps[1].to_owned()));

    if options.math && !streaming {
        html = replace(&MATH_RE, &html, |caps| {
            let source = unescape_html(&caps[1]);
            let fragment = match guarded("math", || math.to_markup(&source, false)) {
                Some(markup) => format!(
                    r#"<span class="{} {}">{markup}</span>"#,
                    options.class("math"),
                    options.class("math-inline")
                ),
                None => format!(
                    r#"<span class="{}" data-kind="math">{}</span>"#,
                    options.class("render-error"),
                    &caps[1]
                ),
            };
            stash.put(fragment)
        });
    }

    html = replace(&IMAGE_RE, &html, |caps| {
        let src = safe_target(&caps[2]);
        let title = caps
            .get(3)
            .map(|t| format!(r#" title="{}""#, t.as_str()))
            .unwrap_or_default();
        let alt = stash.restore_text(&caps[1]);
        stash.put(format!(r#"<img src="{src}" alt="{alt}"{title}>"#))
    });
    html = replace(&LINK_RE, &html, |caps| {
        let href = safe_target(&caps[2]);
        let title = caps
            .get(3)
            .map(|t| format!(r#" title="{}""#, t.as_str()))
            .unwrap_or_default();
        let open = stash.put(format!(r#"<a href="{href}"{title}>"#));
        let close = stash.put("</a>".to_owned());
        format!("{open}{}{close}", &caps[1])
    });
    html = replace(&AUTOLINK_RE, &html, |caps| {
        stash.put(format!(r#"<a href="{0}">{0}</a>"#, &caps[1]))
    });

    html = wrap(&BOLD_ITALIC_STAR_RE, &html, "<strong><em>", "</em></strong>");
    html = wrap(&BOLD_STAR_RE, &html, "<strong>", "</strong>");
    html = wrap(&ITALIC_STAR_RE, &html, "<em>", "</em>");
    html = wrap_word_bounded(&BOLD_ITALIC_UNDER_RE, &html, "<strong><em>", "</em></strong>");
    html = wrap_word_bounded(&BOLD_UNDER_RE, &html, "<strong>", "</strong>");
    html = wrap_word_bounded(&ITALIC_UNDER_RE, &html, "<em>", "</em>");

    if options.gfm {
        html = wrap(&STRIKE_RE, &html, "<del>", "</del>");
    }
    if options.superscript {
        html = wrap(&SUP_RE, &html, "<sup>", "</sup>");
    }
    if options.mark {
        html = wrap(&MARK_RE, &html, "<mark>", "</mark>");
    }

    html = extensions.apply_inline(html);
    html = BREAK_RE.replace_all(&html, "<br>\n").into_owned();

    stash.restore(html)
}

/// Escaped link target, or `#` when the protocol is rejected.
fn safe_target(escaped: &str) -> String {
    let target = unescape_html(escaped);
    if is_dangerous_url(&target) {
        tracing::debug!(target = %target, "rejected link target");
        "#".to_owned()
    } else {
        escape_html(&target)
    }
}

/// Spans moved out of the text while later rules run.
#[derive(Default)]
struct Stash {
    items: Vec<String>,
}

impl Stash {
    fn put(&mut self, html: String) -> String {
        let key = format!("{STASH_OPEN}{}{STASH_CLOSE}", self.items.len());
        self.items.push(html);
        key
    }

    /// Restore placeholders in `text` and drop the tags they bring back, for
    /// use inside an attribute value.
    fn restore_text(&self, text: &str) -> String {
        TAG_RE
            .replace_all(&self.restore(text.to_owned()), "")
            .into_owned()
    }

    fn restore(&self, mut html: String) -> String {
        // Stashed spans may contain earlier placeholders (an image alt holding
        // a code span); each pass resolves one level.
        for _ in 0..=self.items.len() {
            if !html.contains(STASH_OPEN) {
                break;
            }
            html = PLACEHOLDER_RE
                .replace_all(&html, |caps: &Captures<'_>| {
                    caps[1]
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| self.items.get(i))
                        .cloned()
                        .unwrap_or_default()
                })
                .into_owned();
        }
        html
    }
}

fn replace(re: &Regex, text: &str, f: impl FnMut(&Captures<'_>) -> String) -> String {
    re.replace_all(text, f).into_owned()
}

fn wrap(re: &Regex, text: &str, open: &str, close: &str) -> String {
    re.replace_all(text, |caps: &Captures<'_>| format!("{open}{}{close}", &caps[1]))
        .into_owned()
}

/// Like [`wrap`], but only where the delimiters are not inside a word, so
/// `snake_case_names` stay intact.
fn wrap_word_bounded(re: &Regex, text: &str, open: &str, close: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let before = text[..whole.start()].chars().next_back();
        let after = text[whole.end()..].chars().next();
        if before.is_some_and(is_word) || after.is_some_and(is_word) {
            continue;
        }
        out.push_str(&text[last..whole.start()]);
        out.push_str(open);
        out.push_str(inner.as_str());
        out.push_str(close);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}
