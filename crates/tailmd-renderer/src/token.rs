//! Block tokens produced by the tokenizer.

/// One structurally typed unit of parsed markup.
///
/// Tokens are created fresh on every tokenize pass; two tokens from different
/// passes describe the same block when their [`raw`](Self::raw) text is equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockToken {
    /// Type and payload.
    pub block: Block,
    /// Exact source text of the block, line terminators included.
    pub raw: String,
    /// Whether later input can no longer extend this block.
    pub complete: bool,
    /// First source line (zero-based).
    pub start_line: usize,
    /// One past the last source line.
    pub end_line: usize,
}

impl BlockToken {
    /// Whether this token only separates blocks.
    #[must_use]
    pub fn is_separator(&self) -> bool {
        matches!(self.block, Block::Newline)
    }
}

/// Closed set of block types with their payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        /// 1 to 6.
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    CodeBlock {
        /// Fence info string, trimmed but otherwise verbatim.
        lang: String,
        body: String,
    },
    MathBlock {
        body: String,
    },
    Table {
        header: Vec<String>,
        /// One entry per header cell.
        align: Vec<Align>,
        /// Each row has exactly as many cells as the header.
        rows: Vec<Vec<String>>,
    },
    List {
        /// Kind of the first item.
        ordered: bool,
        items: Vec<ListItem>,
    },
    Blockquote {
        /// Inner text with quote markers stripped.
        body: String,
    },
    Callout {
        /// Keyword from `[!KEYWORD]`, uppercased.
        kind: String,
        title: String,
        body: String,
    },
    Rule,
    Newline,
    /// Block recognized by a registered block rule.
    Extension {
        name: String,
        body: String,
    },
}

impl Block {
    /// Short lowercase name of the block type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Heading { .. } => "heading",
            Self::Paragraph { .. } => "paragraph",
            Self::CodeBlock { .. } => "code_block",
            Self::MathBlock { .. } => "math_block",
            Self::Table { .. } => "table",
            Self::List { .. } => "list",
            Self::Blockquote { .. } => "blockquote",
            Self::Callout { .. } => "callout",
            Self::Rule => "hr",
            Self::Newline => "newline",
            Self::Extension { .. } => "extension",
        }
    }
}

/// A single list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// Leading whitespace width (tabs count as four).
    pub indent: usize,
    pub ordered: bool,
    /// Number of an ordered item.
    pub number: Option<u64>,
    /// Task state, when the item starts with a checkbox.
    pub checked: Option<bool>,
    pub content: String,
}

/// Column alignment from a table's alignment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Align {
    /// CSS `text-align` value, if any.
    #[must_use]
    pub fn as_css(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Left => Some("left"),
            Self::Center => Some("center"),
            Self::Right => Some("right"),
        }
    }
}
