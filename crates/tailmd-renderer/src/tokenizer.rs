//! Line-oriented block tokenizer.
//!
//! A single pass over the buffer's lines. At each scan position, registered
//! block rules are tried first, then the built-in constructs in fixed priority:
//!
//! 1. blank line (separator)
//! 2. `$$` display math
//! 3. fenced code
//! 4. ATX heading
//! 5. thematic break
//! 6. blockquote / callout
//! 7. pipe table
//! 8. unordered list
//! 9. ordered list
//! 10. paragraph
//!
//! Only fenced code, display math and registered rules can produce an
//! incomplete token, and an incomplete token always absorbs the rest of the
//! buffer, so at most the last token is incomplete.
//!
//! Decisions that depend on the line *after* a construct's start (a table
//! interrupting a paragraph or quote) only look at terminated lines. A partly
//! written line therefore never splits a block that ends before it.

use std::sync::LazyLock;

use regex::Regex;

use crate::extension::ExtensionRegistry;
use crate::fence::Fence;
use crate::options::RenderOptions;
use crate::token::{Align, Block, BlockToken, ListItem};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(#{1,6})[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$").unwrap());

static RULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap()
});

static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {0,3}> ?(.*)$").unwrap());

static CALLOUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[!([A-Za-z][A-Za-z0-9_-]*)\][ \t]*(.*)$").unwrap());

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)[-*+][ \t]+(.*)$").unwrap());

static ORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)(\d{1,9})[.)][ \t]+(.*)$").unwrap());

static TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([ xX])\](?:[ \t]+(.*))?$").unwrap());

/// Tokenize `buffer` into block tokens.
pub(crate) fn tokenize(
    buffer: &str,
    options: &RenderOptions,
    extensions: &ExtensionRegistry,
) -> Vec<BlockToken> {
    let tokenizer = Tokenizer {
        lines: buffer.split_inclusive('\n').collect(),
        options,
        extensions,
    };
    tokenizer.run()
}

/// Outcome of recognizing one block.
struct Scan {
    lines: usize,
    block: Block,
    complete: bool,
}

impl Scan {
    fn complete(lines: usize, block: Block) -> Self {
        Self {
            lines,
            block,
            complete: true,
        }
    }

    /// Still open: absorbs every remaining line.
    fn open(block: Block) -> Self {
        Self {
            lines: usize::MAX,
            block,
            complete: false,
        }
    }
}

struct Tokenizer<'a> {
    /// Source lines with terminators; the last may be unterminated.
    lines: Vec<&'a str>,
    options: &'a RenderOptions,
    extensions: &'a ExtensionRegistry,
}

impl Tokenizer<'_> {
    fn run(&self) -> Vec<BlockToken> {
        let mut tokens = Vec::new();
        let mut pos = 0;

        while pos < self.lines.len() {
            let scan = self.scan(pos);
            let end = if scan.complete {
                (pos + scan.lines).min(self.lines.len())
            } else {
                self.lines.len()
            };
            tokens.push(BlockToken {
                block: scan.block,
                raw: self.lines[pos..end].concat(),
                complete: scan.complete,
                start_line: pos,
                end_line: end,
            });
            pos = end;
        }

        tokens
    }

    fn scan(&self, pos: usize) -> Scan {
        let text = line_text(self.lines[pos]);

        if is_blank(text) {
            return Scan::complete(1, Block::Newline);
        }
        if let Some(found) = self.match_extension(pos) {
            return found;
        }
        if self.options.math
            && let Some(found) = self.math_block(pos)
        {
            return found;
        }
        if let Some(found) = self.fenced_code(pos) {
            return found;
        }
        if let Some((level, text)) = parse_heading(text) {
            return Scan::complete(
                1,
                Block::Heading {
                    level,
                    text: text.to_owned(),
                },
            );
        }
        if RULE_RE.is_match(text) {
            return Scan::complete(1, Block::Rule);
        }
        if QUOTE_RE.is_match(text) {
            return self.quote(pos);
        }
        if self.table_start(pos, false) {
            return self.table(pos);
        }
        if parse_item(text, self.options.gfm).is_some() {
            return self.list(pos);
        }
        self.paragraph(pos)
    }

    /// Whether line `pos` starts any construct other than a paragraph.
    ///
    /// Used to end paragraphs and lazy quote continuations.
    fn starts_block(&self, pos: usize) -> bool {
        let text = line_text(self.lines[pos]);
        self.match_extension(pos).is_some()
            || (self.options.math && is_math_open(text))
            || Fence::detect(text).is_some()
            || parse_heading(text).is_some()
            || RULE_RE.is_match(text)
            || QUOTE_RE.is_match(text)
            || self.table_start(pos, true)
            || parse_item(text, self.options.gfm).is_some()
    }

    fn match_extension(&self, pos: usize) -> Option<Scan> {
        if !self.extensions.has_block_rules() {
            return None;
        }
        let found = self
            .extensions
            .match_block(&self.lines[pos..], self.options)?;
        Some(Scan {
            lines: found.lines,
            block: found.block,
            complete: found.complete,
        })
    }

    fn math_block(&self, pos: usize) -> Option<Scan> {
        let first = line_text(self.lines[pos]).trim();
        let opened = first.strip_prefix("$$")?;

        // `$$…$$` on one line
        if first.len() >= 5
            && let Some(inner) = opened.strip_suffix("$$")
        {
            return Some(Scan::complete(
                1,
                Block::MathBlock {
                    body: inner.trim().to_owned(),
                },
            ));
        }

        let mut body: Vec<&str> = Vec::new();
        if !opened.trim().is_empty() {
            body.push(opened.trim());
        }

        for (offset, line) in self.lines[pos + 1..].iter().enumerate() {
            let text = line_text(line);
            if text.trim() == "$$" {
                return Some(Scan::complete(
                    offset + 2,
                    Block::MathBlock {
                        body: body.join("\n"),
                    },
                ));
            }
            body.push(text);
        }

        Some(Scan::open(Block::MathBlock {
            body: body.join("\n"),
        }))
    }

    fn fenced_code(&self, pos: usize) -> Option<Scan> {
        let fence = Fence::detect(line_text(self.lines[pos]))?;
        let mut body = String::new();

        for (offset, line) in self.lines[pos + 1..].iter().enumerate() {
            if fence.is_closed_by(line_text(line)) {
                return Some(Scan::complete(
                    offset + 2,
                    Block::CodeBlock {
                        lang: fence.info.to_owned(),
                        body,
                    },
                ));
            }
            body.push_str(fence.strip_indent(line));
        }

        Some(Scan::open(Block::CodeBlock {
            lang: fence.info.to_owned(),
            body,
        }))
    }

    fn quote(&self, pos: usize) -> Scan {
        let mut inner = String::new();
        let mut consumed = 0;

        for (offset, line) in self.lines[pos..].iter().enumerate() {
            let text = line_text(line);
            if is_blank(text) {
                break;
            }
            if let Some(caps) = QUOTE_RE.captures(text) {
                inner.push_str(caps.get(1).map_or("", |m| m.as_str()));
            } else if !self.starts_block(pos + offset) {
                // lazy continuation
                inner.push_str(text.trim_start());
            } else {
                break;
            }
            if line.ends_with('\n') {
                inner.push('\n');
            }
            consumed += 1;
        }

        let (first, rest) = inner.split_once('\n').unwrap_or((inner.as_str(), ""));
        let block = match CALLOUT_RE.captures(first.trim()) {
            Some(caps) => Block::Callout {
                kind: caps[1].to_ascii_uppercase(),
                title: caps[2].trim().to_owned(),
                body: rest.to_owned(),
            },
            None => Block::Blockquote {
                body: inner.clone(),
            },
        };

        Scan::complete(consumed, block)
    }

    /// Whether line `pos` is a table header followed by an alignment row.
    ///
    /// With `require_terminated`, a partly written alignment row does not count.
    fn table_start(&self, pos: usize, require_terminated: bool) -> bool {
        if !self.options.tables || !line_text(self.lines[pos]).contains('|') {
            return false;
        }
        let Some(next) = self.lines.get(pos + 1) else {
            return false;
        };
        if require_terminated && !next.ends_with('\n') {
            return false;
        }
        parse_align_row(line_text(next)).is_some()
    }

    fn table(&self, pos: usize) -> Scan {
        let header = split_cells(line_text(self.lines[pos]));
        let width = header.len();

        let mut align = parse_align_row(line_text(self.lines[pos + 1])).unwrap_or_default();
        align.resize(width, Align::None);

        let mut rows = Vec::new();
        for line in &self.lines[pos + 2..] {
            let text = line_text(line);
            if is_blank(text) || !text.contains('|') {
                break;
            }
            let mut cells = split_cells(text);
            cells.resize(width, String::new());
            rows.push(cells);
        }

        Scan::complete(
            rows.len() + 2,
            Block::Table {
                header,
                align,
                rows,
            },
        )
    }

    fn list(&self, pos: usize) -> Scan {
        let mut items: Vec<ListItem> = Vec::new();
        let mut consumed = 0;

        for line in &self.lines[pos..] {
            let text = line_text(line);
            if is_blank(text) {
                consumed += 1;
                break;
            }
            if consumed > 0 && RULE_RE.is_match(text) {
                break;
            }
            if let Some(item) = parse_item(text, self.options.gfm) {
                items.push(item);
            } else if let Some(last) = items.last_mut()
                && text.starts_with([' ', '\t'])
            {
                last.content.push('\n');
                last.content.push_str(text.trim());
            } else {
                break;
            }
            consumed += 1;
        }

        let ordered = items.first().is_some_and(|item| item.ordered);
        Scan::complete(consumed, Block::List { ordered, items })
    }

    fn paragraph(&self, pos: usize) -> Scan {
        let mut end = pos + 1;
        while end < self.lines.len() {
            let text = line_text(self.lines[end]);
            if is_blank(text) || self.starts_block(end) {
                break;
            }
            end += 1;
        }

        let text = self.lines[pos..end]
            .iter()
            .map(|line| line_text(line).trim_start())
            .collect::<Vec<_>>()
            .join("\n");

        Scan::complete(
            end - pos,
            Block::Paragraph {
                text: text.trim_end().to_owned(),
            },
        )
    }
}

/// Line content without its terminator.
fn line_text(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

fn is_math_open(text: &str) -> bool {
    text.trim_start().starts_with("$$")
}

fn parse_heading(text: &str) -> Option<(u8, &str)> {
    let caps = HEADING_RE.captures(text)?;
    let level = u8::try_from(caps.get(1)?.as_str().len()).ok()?;
    let body = caps.get(2)?.as_str().trim();
    (!body.is_empty()).then_some((level, body))
}

/// Width of leading whitespace, counting tabs as four columns.
fn indent_width(text: &str) -> usize {
    text.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Parse a list item line of either kind.
///
/// Bullet items may carry a task checkbox when `gfm` is enabled.
fn parse_item(text: &str, gfm: bool) -> Option<ListItem> {
    if let Some(caps) = BULLET_RE.captures(text) {
        let content = caps.get(2).map_or("", |m| m.as_str());
        let (checked, content) = match TASK_RE.captures(content) {
            Some(task) if gfm => (
                Some(&task[1] != " "),
                task.get(2).map_or("", |m| m.as_str()),
            ),
            _ => (None, content),
        };
        return Some(ListItem {
            indent: indent_width(text),
            ordered: false,
            number: None,
            checked,
            content: content.trim_end().to_owned(),
        });
    }

    let caps = ORDERED_RE.captures(text)?;
    Some(ListItem {
        indent: indent_width(text),
        ordered: true,
        number: caps[2].parse().ok(),
        checked: None,
        content: caps.get(3).map_or("", |m| m.as_str()).trim_end().to_owned(),
    })
}

/// Split a table row into trimmed cells, honoring `\|` escapes.
fn split_cells(text: &str) -> Vec<String> {
    let mut row = text.trim();
    row = row.strip_prefix('|').unwrap_or(row);
    if row.ends_with('|') && !row.ends_with("\\|") {
        row = &row[..row.len() - 1];
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = row.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => {
                cells.push(current.trim().to_owned());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_owned());
    cells
}

/// Parse an alignment row such as `|:--|:-:|--:|`.
fn parse_align_row(text: &str) -> Option<Vec<Align>> {
    if !text.contains('|') {
        return None;
    }
    split_cells(text)
        .iter()
        .map(|cell| {
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
                return None;
            }
            Some(match (cell.starts_with(':'), cell.ends_with(':')) {
                (true, true) => Align::Center,
                (true, false) => Align::Left,
                (false, true) => Align::Right,
                (false, false) => Align::None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::extension::{BlockMatch, BlockRule};

    fn tok(buffer: &str) -> Vec<BlockToken> {
        tokenize(buffer, &RenderOptions::default(), &ExtensionRegistry::new())
    }

    fn blocks(buffer: &str) -> Vec<Block> {
        tok(buffer).into_iter().map(|t| t.block).collect()
    }

    fn para(text: &str) -> Block {
        Block::Paragraph {
            text: text.to_owned(),
        }
    }

    const SAMPLE: &str = "# Title\n\nSome **bold** text\nmore text.\n\n\
        - [x] done\n- [ ] todo\n  continued\n\n\
        | A | B |\n|:--|--:|\n| 1 | 2 |\n\n\
        > [!NOTE] Heads up\n> body\n\n\
        ```rust\nfn main() {}\n```\n\n\
        $$\nx^2\n$$\n\n\
        1. one\n2. two\n\n---\nTail $x^2$ paragraph.";

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(
            blocks("# Hi\n\nSome **bold** text."),
            vec![
                Block::Heading {
                    level: 1,
                    text: "Hi".to_owned()
                },
                Block::Newline,
                para("Some **bold** text."),
            ]
        );
    }

    #[test]
    fn test_heading_closing_sequence_stripped() {
        assert_eq!(
            blocks("### Title ##"),
            vec![Block::Heading {
                level: 3,
                text: "Title".to_owned()
            }]
        );
        assert_eq!(blocks("#hashtag"), vec![para("#hashtag")]);
        assert_eq!(blocks("####### seven"), vec![para("####### seven")]);
    }

    #[test]
    fn test_blank_lines_are_separators() {
        let tokens = tok("a\n\n  \nb");
        assert_eq!(tokens.len(), 4);
        assert!(tokens[1].is_separator());
        assert!(tokens[2].is_separator());
        assert_eq!(tokens[2].raw, "  \n");
    }

    #[test]
    fn test_unterminated_fence_is_incomplete() {
        let tokens = tok("text\n```py\nprint(1)\n");
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].complete);
        assert!(!tokens[1].complete);
        assert_eq!(
            tokens[1].block,
            Block::CodeBlock {
                lang: "py".to_owned(),
                body: "print(1)\n".to_owned()
            }
        );
    }

    #[test]
    fn test_closed_fence_keeps_info_verbatim() {
        let tokens = tok("~~~ rust title=\"a.rs\"\nlet x = 1;\n~~~\nafter");
        assert_eq!(
            tokens[0].block,
            Block::CodeBlock {
                lang: "rust title=\"a.rs\"".to_owned(),
                body: "let x = 1;\n".to_owned()
            }
        );
        assert!(tokens[0].complete);
        assert_eq!(tokens[0].end_line, 3);
        assert_eq!(tokens[1].block, para("after"));
    }

    #[test]
    fn test_fence_content_is_not_tokenized() {
        let tokens = tok("```\n# not a heading\n\n- nor a list\n```");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].complete);
    }

    #[test]
    fn test_math_blocks() {
        assert_eq!(
            blocks("$$x^2$$"),
            vec![Block::MathBlock {
                body: "x^2".to_owned()
            }]
        );

        let tokens = tok("$$\na + b\n= c\n$$\n");
        assert_eq!(
            tokens[0].block,
            Block::MathBlock {
                body: "a + b\n= c".to_owned()
            }
        );
        assert!(tokens[0].complete);

        let open = tok("$$\na + b");
        assert!(!open[0].complete);
        assert_eq!(
            open[0].block,
            Block::MathBlock {
                body: "a + b".to_owned()
            }
        );
    }

    #[test]
    fn test_math_disabled_falls_through() {
        let options = RenderOptions {
            math: false,
            ..RenderOptions::default()
        };
        let tokens = tokenize("$$x$$", &options, &ExtensionRegistry::new());
        assert_eq!(tokens[0].block, para("$$x$$"));
    }

    #[test]
    fn test_rules() {
        assert_eq!(blocks("---"), vec![Block::Rule]);
        assert_eq!(blocks("* * *"), vec![Block::Rule]);
        assert_eq!(blocks("___"), vec![Block::Rule]);
        assert_eq!(blocks("--"), vec![para("--")]);
    }

    #[test]
    fn test_table() {
        assert_eq!(
            blocks("| A | B |\n|:--|--:|\n| 1 | 2 |\n| 3 |\n| 4 | 5 | 6 |"),
            vec![Block::Table {
                header: vec!["A".to_owned(), "B".to_owned()],
                align: vec![Align::Left, Align::Right],
                rows: vec![
                    vec!["1".to_owned(), "2".to_owned()],
                    vec!["3".to_owned(), String::new()],
                    vec!["4".to_owned(), "5".to_owned()],
                ],
            }]
        );
    }

    #[test]
    fn test_table_escaped_pipe() {
        let tokens = tok("| a \\| b | c |\n|---|:-:|");
        let Block::Table { header, align, .. } = &tokens[0].block else {
            panic!("expected table");
        };
        assert_eq!(header, &vec!["a | b".to_owned(), "c".to_owned()]);
        assert_eq!(align, &vec![Align::None, Align::Center]);
    }

    #[test]
    fn test_tables_disabled_falls_through() {
        let options = RenderOptions {
            tables: false,
            ..RenderOptions::default()
        };
        let tokens = tokenize("| A |\n|---|", &options, &ExtensionRegistry::new());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].block, para("| A |\n|---|"));
    }

    #[test]
    fn test_table_interrupts_paragraph_only_when_alignment_terminated() {
        assert_eq!(tok("intro\n| A |\n|---|").len(), 1);

        let tokens = tok("intro\n| A |\n|---|\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].block, para("intro"));
        assert!(matches!(tokens[1].block, Block::Table { .. }));
    }

    #[test]
    fn test_task_list() {
        let tokens = tok("- [x] done\n- [ ] todo");
        let Block::List { ordered, items } = &tokens[0].block else {
            panic!("expected list");
        };
        assert!(!ordered);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].checked, Some(true));
        assert_eq!(items[0].content, "done");
        assert_eq!(items[1].checked, Some(false));
        assert_eq!(items[1].content, "todo");
    }

    #[test]
    fn test_checkbox_needs_gfm() {
        let options = RenderOptions {
            gfm: false,
            ..RenderOptions::default()
        };
        let tokens = tokenize("- [x] done", &options, &ExtensionRegistry::new());
        let Block::List { items, .. } = &tokens[0].block else {
            panic!("expected list");
        };
        assert_eq!(items[0].checked, None);
        assert_eq!(items[0].content, "[x] done");
    }

    #[test]
    fn test_ordered_list_and_nesting() {
        let tokens = tok("3. three\n4. four\n   - nested\n   continued\n\nafter");
        let Block::List { ordered, items } = &tokens[0].block else {
            panic!("expected list");
        };
        assert!(ordered);
        assert_eq!(items[0].number, Some(3));
        assert_eq!(items[2].indent, 3);
        assert!(!items[2].ordered);
        assert_eq!(items[2].content, "nested\ncontinued");
        // blank line belongs to the list
        assert_eq!(tokens[0].raw, "3. three\n4. four\n   - nested\n   continued\n\n");
        assert_eq!(tokens[1].block, para("after"));
    }

    #[test]
    fn test_rule_ends_list() {
        assert_eq!(
            blocks("- a\n- - -\n")
                .iter()
                .map(Block::name)
                .collect::<Vec<_>>(),
            vec!["list", "hr"]
        );
    }

    #[test]
    fn test_blockquote_with_lazy_continuation() {
        let tokens = tok("> first\nlazy\n> last\n\nnext");
        assert_eq!(
            tokens[0].block,
            Block::Blockquote {
                body: "first\nlazy\nlast\n".to_owned()
            }
        );
        assert_eq!(tokens[0].end_line, 3);
    }

    #[test]
    fn test_quote_stops_at_block_start() {
        let kinds: Vec<_> = blocks("> quote\n# heading")
            .iter()
            .map(Block::name)
            .collect();
        assert_eq!(kinds, vec!["blockquote", "heading"]);
    }

    #[test]
    fn test_callout() {
        assert_eq!(
            blocks("> [!warning] Careful now\n> body text"),
            vec![Block::Callout {
                kind: "WARNING".to_owned(),
                title: "Careful now".to_owned(),
                body: "body text".to_owned(),
            }]
        );
    }

    #[test]
    fn test_paragraph_breaks_eagerly() {
        let kinds: Vec<_> = blocks("text\n- item\ntext\n# head\ntext\n```\ncode")
            .iter()
            .map(Block::name)
            .collect();
        assert_eq!(
            kinds,
            vec!["paragraph", "list", "paragraph", "heading", "paragraph", "code_block"]
        );
    }

    #[test]
    fn test_paragraph_joins_lines() {
        assert_eq!(blocks("one\n  two  \nthree"), vec![para("one\ntwo  \nthree")]);
    }

    #[test]
    fn test_raw_spans_reconstruct_buffer() {
        let tokens = tok(SAMPLE);
        let joined: String = tokens.iter().map(|t| t.raw.as_str()).collect();
        assert_eq!(joined, SAMPLE);
    }

    #[test]
    fn test_line_ranges_are_contiguous() {
        let tokens = tok(SAMPLE);
        let mut expected_start = 0;
        for token in &tokens {
            assert_eq!(token.start_line, expected_start);
            assert!(token.end_line > token.start_line);
            expected_start = token.end_line;
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(tok(SAMPLE), tok(SAMPLE));
    }

    #[test]
    fn test_only_last_token_may_be_incomplete() {
        for end in (0..=SAMPLE.len()).filter(|i| SAMPLE.is_char_boundary(*i)) {
            let tokens = tok(&SAMPLE[..end]);
            if let Some((_, init)) = tokens.split_last() {
                assert!(
                    init.iter().all(|t| t.complete),
                    "incomplete inner token for prefix {end}"
                );
            }
        }
    }

    #[test]
    fn test_empty_buffer() {
        assert!(tok("").is_empty());
    }

    struct Admonition;

    impl BlockRule for Admonition {
        fn name(&self) -> &str {
            "admonition"
        }

        fn try_match(&self, lines: &[&str], _options: &RenderOptions) -> Option<BlockMatch> {
            if !lines[0].starts_with(":::") {
                return None;
            }
            let close = lines
                .iter()
                .skip(1)
                .position(|l| l.trim_end() == ":::");
            Some(BlockMatch {
                lines: close.map_or(lines.len(), |i| i + 2),
                block: Block::Extension {
                    name: "admonition".to_owned(),
                    body: lines[1..close.map_or(lines.len(), |i| i + 1)].concat(),
                },
                complete: close.is_some(),
            })
        }
    }

    #[test]
    fn test_block_rule_runs_before_builtins() {
        let registry = ExtensionRegistry::new().with_block_rule(Admonition);
        let tokens = tokenize(
            "intro\n:::\n# inside\n:::\nafter",
            &RenderOptions::default(),
            &registry,
        );
        let kinds: Vec<_> = tokens.iter().map(|t| t.block.name()).collect();
        assert_eq!(kinds, vec!["paragraph", "extension", "paragraph"]);
        assert_eq!(
            tokens[1].block,
            Block::Extension {
                name: "admonition".to_owned(),
                body: "# inside\n".to_owned()
            }
        );
    }

    #[test]
    fn test_incomplete_block_rule_absorbs_rest() {
        let registry = ExtensionRegistry::new().with_block_rule(Admonition);
        let tokens = tokenize(":::\nopen", &RenderOptions::default(), &registry);
        assert_eq!(tokens.len(), 1);
        assert!(!tokens[0].complete);
        assert_eq!(tokens[0].raw, ":::\nopen");
    }
}
