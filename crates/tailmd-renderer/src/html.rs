//! Built-in HTML fragment builders, one per block type.
//!
//! Every CSS hook class carries the configured prefix (`md-` by default).

use std::fmt::Write;

use crate::Renderer;
use crate::collaborator::guarded;
use crate::inline::format_inline;
use crate::token::{Align, Block, BlockToken, ListItem};
use crate::util::escape_html;

// Callout icon paths (GitHub Octicons-style, 16x16)
const ICON_INFO: &str = "M0 8a8 8 0 1 1 16 0A8 8 0 0 1 0 8Zm8-6.5a6.5 6.5 0 1 0 0 13 6.5 6.5 0 0 0 0-13ZM6.5 7.75A.75.75 0 0 1 7.25 7h1a.75.75 0 0 1 .75.75v2.75h.25a.75.75 0 0 1 0 1.5h-2a.75.75 0 0 1 0-1.5h.25v-2h-.25a.75.75 0 0 1-.75-.75ZM8 6a1 1 0 1 1 0-2 1 1 0 0 1 0 2Z";
const ICON_LIGHTBULB: &str = "M8 1.5c-2.363 0-4 1.69-4 3.75 0 .984.424 1.625.984 2.304l.214.253c.223.264.47.556.673.848.284.411.537.896.621 1.49a.75.75 0 0 1-1.484.211c-.04-.282-.163-.547-.37-.847a8.456 8.456 0 0 0-.542-.68c-.084-.1-.173-.205-.268-.32C3.201 7.75 2.5 6.766 2.5 5.25 2.5 2.31 4.863 0 8 0s5.5 2.31 5.5 5.25c0 1.516-.701 2.5-1.328 3.259-.095.115-.184.22-.268.319-.207.245-.383.453-.541.681-.208.3-.33.565-.37.847a.751.751 0 0 1-1.485-.212c.084-.593.337-1.078.621-1.489.203-.292.45-.584.673-.848.075-.088.147-.173.213-.253.561-.679.985-1.32.985-2.304 0-2.06-1.637-3.75-4-3.75ZM5.75 12h4.5a.75.75 0 0 1 0 1.5h-4.5a.75.75 0 0 1 0-1.5ZM6 15.25a.75.75 0 0 1 .75-.75h2.5a.75.75 0 0 1 0 1.5h-2.5a.75.75 0 0 1-.75-.75Z";
const ICON_REPORT: &str = "M0 1.75C0 .784.784 0 1.75 0h12.5C15.216 0 16 .784 16 1.75v9.5A1.75 1.75 0 0 1 14.25 13H8.06l-2.573 2.573A1.458 1.458 0 0 1 3 14.543V13H1.75A1.75 1.75 0 0 1 0 11.25Zm1.75-.25a.25.25 0 0 0-.25.25v9.5c0 .138.112.25.25.25h2a.75.75 0 0 1 .75.75v2.19l2.72-2.72a.749.749 0 0 1 .53-.22h6.5a.25.25 0 0 0 .25-.25v-9.5a.25.25 0 0 0-.25-.25Zm7 2.25v2.5a.75.75 0 0 1-1.5 0v-2.5a.75.75 0 0 1 1.5 0ZM9 9a1 1 0 1 1-2 0 1 1 0 0 1 2 0Z";
const ICON_ALERT: &str = "M6.457 1.047c.659-1.234 2.427-1.234 3.086 0l6.082 11.378A1.75 1.75 0 0 1 14.082 15H1.918a1.75 1.75 0 0 1-1.543-2.575Zm1.763.707a.25.25 0 0 0-.44 0L1.698 13.132a.25.25 0 0 0 .22.368h12.164a.25.25 0 0 0 .22-.368Zm.53 3.996v2.5a.75.75 0 0 1-1.5 0v-2.5a.75.75 0 0 1 1.5 0ZM9 11a1 1 0 1 1-2 0 1 1 0 0 1 2 0Z";
const ICON_STOP: &str = "M4.47.22A.749.749 0 0 1 5 0h6c.199 0 .389.079.53.22l4.25 4.25c.141.14.22.331.22.53v6a.749.749 0 0 1-.22.53l-4.25 4.25A.749.749 0 0 1 11 16H5a.749.749 0 0 1-.53-.22L.22 11.53A.749.749 0 0 1 0 11V5c0-.199.079-.389.22-.53Zm.84 1.28L1.5 5.31v5.38l3.81 3.81h5.38l3.81-3.81V5.31L10.69 1.5ZM8 4a.75.75 0 0 1 .75.75v3.5a.75.75 0 0 1-1.5 0v-3.5A.75.75 0 0 1 8 4Zm0 8a1 1 0 1 1 0-2 1 1 0 0 1 0 2Z";

/// Deepest blockquote or callout nesting rendered as containers. Anything
/// deeper is shown as escaped text.
const MAX_NESTING: usize = 32;

impl Renderer {
    /// Built-in fragment for `token`, ignoring render overrides.
    pub(crate) fn build_fragment(&self, token: &BlockToken, streaming: bool) -> String {
        self.fragment_at(token, streaming, 0)
    }

    /// Fragment of a token found `depth` containers deep.
    fn fragment_at(&self, token: &BlockToken, streaming: bool, depth: usize) -> String {
        match &token.block {
            Block::Heading { level, text } => {
                format!("<h{level}>{}</h{level}>", self.inline(text, streaming))
            }
            Block::Paragraph { text } => format!("<p>{}</p>", self.inline(text, streaming)),
            Block::CodeBlock { lang, body } => {
                self.code_block(lang, body, token.complete, streaming)
            }
            Block::MathBlock { body } => self.math_block(body, token.complete),
            Block::Table {
                header,
                align,
                rows,
            } => self.table(header, align, rows, streaming),
            Block::List { items, .. } => self.list(items, streaming),
            Block::Blockquote { body } => {
                let inner = self.nested(body, streaming, depth);
                format!("<blockquote>\n{inner}\n</blockquote>")
            }
            Block::Callout { kind, title, body } => {
                self.callout(kind, title, body, streaming, depth)
            }
            Block::Rule => "<hr>".to_owned(),
            Block::Newline => String::new(),
            Block::Extension { name, body } => format!(
                r#"<div class="{}" data-name="{}">{}</div>"#,
                self.options.class("extension"),
                escape_html(name),
                escape_html(body)
            ),
        }
    }

    fn inline(&self, text: &str, streaming: bool) -> String {
        format_inline(
            text,
            &self.options,
            &self.extensions,
            self.math.as_ref(),
            streaming,
        )
    }

    /// Render a container's inner markup as a document of its own.
    fn nested(&self, body: &str, streaming: bool, depth: usize) -> String {
        let depth = depth + 1;
        if depth >= MAX_NESTING {
            return format!("<p>{}</p>", escape_html(body.trim()));
        }
        self.tokenize(body)
            .iter()
            .map(|token| {
                self.extensions
                    .render_override(token, streaming)
                    .unwrap_or_else(|| self.fragment_at(token, streaming, depth))
            })
            .filter(|html| !html.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inert replacement for a block whose collaborator failed.
    fn error_fragment(&self, kind: &str, source: &str) -> String {
        format!(
            r#"<div class="{}" data-kind="{kind}"><pre>{}</pre></div>"#,
            self.options.class("render-error"),
            escape_html(source)
        )
    }

    fn code_block(&self, info: &str, body: &str, complete: bool, streaming: bool) -> String {
        let options = &self.options;
        let lang = info.split_whitespace().next().unwrap_or("");

        if options.diagrams
            && complete
            && let Some(diagrams) = &self.diagrams
            && diagrams.supports(lang)
        {
            return match guarded("diagram", || diagrams.to_vector_image(lang, body)) {
                Some(svg) => format!(
                    r#"<div class="{}" data-lang="{}">{svg}</div>"#,
                    options.class("diagram"),
                    escape_html(lang)
                ),
                None => self.error_fragment("diagram", body),
            };
        }

        let code = if options.highlight && !lang.is_empty() {
            match guarded("code", || Ok(self.highlighter.colorize(body, lang))) {
                Some(html) => html,
                None => return self.error_fragment("code", body),
            }
        } else {
            escape_html(body)
        };

        let mut classes = options.class("code-block");
        if streaming && !complete {
            classes.push(' ');
            classes.push_str(&options.class("code-streaming"));
        }
        let lang_attr = if lang.is_empty() {
            String::new()
        } else {
            format!(r#" class="language-{}""#, escape_html(lang))
        };

        format!(r#"<pre class="{classes}"><code{lang_attr}>{code}</code></pre>"#)
    }

    fn math_block(&self, body: &str, complete: bool) -> String {
        let options = &self.options;
        if !complete {
            return format!(
                r#"<div class="{} {}">{}</div>"#,
                options.class("math"),
                options.class("math-pending"),
                escape_html(body)
            );
        }

        match guarded("math", || self.math.to_markup(body, true)) {
            Some(markup) => format!(
                r#"<div class="{} {}">{markup}</div>"#,
                options.class("math"),
                options.class("math-display")
            ),
            None => self.error_fragment("math", body),
        }
    }

    fn table(
        &self,
        header: &[String],
        align: &[Align],
        rows: &[Vec<String>],
        streaming: bool,
    ) -> String {
        let mut html = format!(r#"<table class="{}">"#, self.options.class("table"));

        html.push_str("\n<thead>\n<tr>");
        for (i, cell) in header.iter().enumerate() {
            self.table_cell(&mut html, "th", align.get(i).copied(), cell, streaming);
        }
        html.push_str("</tr>\n</thead>");

        if !rows.is_empty() {
            html.push_str("\n<tbody>");
            for row in rows {
                html.push_str("\n<tr>");
                for (i, cell) in row.iter().enumerate() {
                    self.table_cell(&mut html, "td", align.get(i).copied(), cell, streaming);
                }
                html.push_str("</tr>");
            }
            html.push_str("\n</tbody>");
        }

        html.push_str("\n</table>");
        html
    }

    fn table_cell(
        &self,
        html: &mut String,
        tag: &str,
        align: Option<Align>,
        text: &str,
        streaming: bool,
    ) {
        let content = self.inline(text, streaming);
        match align.and_then(Align::as_css) {
            Some(css) => write!(html, r#"<{tag} style="text-align:{css}">{content}</{tag}>"#),
            None => write!(html, "<{tag}>{content}</{tag}>"),
        }
        .unwrap();
    }

    /// Nested `<ul>`/`<ol>` from item indentation.
    ///
    /// A deeper item opens a list inside the current item; a shallower one
    /// closes lists until a level at or above it. Switching between bullet and
    /// numbered items at the same depth closes the list and opens the other
    /// kind.
    fn list(&self, items: &[ListItem], streaming: bool) -> String {
        let mut html = String::new();
        let mut stack: Vec<(usize, bool)> = Vec::new();

        for item in items {
            while let Some(&(indent, ordered)) = stack.last() {
                if indent > item.indent || (indent == item.indent && ordered != item.ordered) {
                    html.push_str(close_list(ordered));
                    stack.pop();
                } else {
                    break;
                }
            }

            if stack.last().is_some_and(|(indent, _)| *indent == item.indent) {
                html.push_str("</li>\n");
            } else {
                if !stack.is_empty() {
                    html.push('\n');
                }
                match item.number {
                    Some(start) if item.ordered && start != 1 => {
                        writeln!(html, "<ol start=\"{start}\">").unwrap();
                    }
                    _ if item.ordered => html.push_str("<ol>\n"),
                    _ => html.push_str("<ul>\n"),
                }
                stack.push((item.indent, item.ordered));
            }

            let content = self.inline(&item.content, streaming);
            match item.checked {
                Some(checked) => write!(
                    html,
                    r#"<li class="{}"><input type="checkbox"{} disabled> {content}"#,
                    self.options.class("task-item"),
                    if checked { " checked" } else { "" }
                )
                .unwrap(),
                None => write!(html, "<li>{content}").unwrap(),
            }
        }

        while let Some((_, ordered)) = stack.pop() {
            html.push_str(close_list(ordered));
        }
        html
    }

    fn callout(
        &self,
        kind: &str,
        title: &str,
        body: &str,
        streaming: bool,
        depth: usize,
    ) -> String {
        let options = &self.options;
        let (icon, default_title) = match kind {
            "NOTE" => (ICON_INFO, "Note"),
            "TIP" => (ICON_LIGHTBULB, "Tip"),
            "IMPORTANT" => (ICON_REPORT, "Important"),
            "WARNING" => (ICON_ALERT, "Warning"),
            "CAUTION" => (ICON_STOP, "Caution"),
            _ => (ICON_INFO, ""),
        };

        let title = if !title.is_empty() {
            self.inline(title, streaming)
        } else if default_title.is_empty() {
            capitalize(kind)
        } else {
            default_title.to_owned()
        };

        format!(
            r#"<div class="{} {}-{}"><div class="{}"><svg class="{}" viewBox="0 0 16 16" width="16" height="16" aria-hidden="true"><path d="{icon}"></path></svg>{title}</div><div class="{}">
{}
</div></div>"#,
            options.class("callout"),
            options.class("callout"),
            kind.to_ascii_lowercase(),
            options.class("callout-title"),
            options.class("callout-icon"),
            options.class("callout-content"),
            self.nested(body, streaming, depth)
        )
    }
}

fn close_list(ordered: bool) -> &'static str {
    if ordered { "</li>\n</ol>" } else { "</li>\n</ul>" }
}

/// `WARNING` → `Warning`.
fn capitalize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut chars = lower.chars();
    chars
        .next()
        .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
        .unwrap_or_default()
}
