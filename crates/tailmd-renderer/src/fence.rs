//! Code fence detection.
//!
//! Fences can use backticks or tildes (three or more). The closing fence must
//! use the same character and be at least as long as the opening fence.

/// An opening code fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fence<'a> {
    /// Leading spaces before the fence (0-3), stripped from body lines.
    pub indent: usize,
    /// Character used for the fence (backtick or tilde).
    pub fence_char: char,
    /// Length of the opening fence (minimum length for closing).
    pub fence_len: usize,
    /// Trimmed info string after the fence.
    pub info: &'a str,
}

impl<'a> Fence<'a> {
    /// Detect an opening fence on a line without its terminator.
    pub(crate) fn detect(line: &'a str) -> Option<Self> {
        let indent = leading_spaces(line);
        if indent > 3 {
            return None;
        }

        let trimmed = &line[indent..];
        let (fence_char, fence_len) = detect_fence(trimmed)?;
        let info = trimmed[fence_len..].trim();

        // A backtick in the info string would make this an inline code span.
        if fence_char == '`' && info.contains('`') {
            return None;
        }

        Some(Self {
            indent,
            fence_char,
            fence_len,
            info,
        })
    }

    /// Whether `line` closes this fence.
    pub(crate) fn is_closed_by(&self, line: &str) -> bool {
        let indent = leading_spaces(line);
        indent <= 3 && is_fence_line(&line[indent..], self.fence_char, self.fence_len)
    }

    /// Remove up to the fence's own indentation from a body line.
    pub(crate) fn strip_indent<'l>(&self, line: &'l str) -> &'l str {
        let strip = leading_spaces(line).min(self.indent);
        &line[strip..]
    }
}

fn leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

/// Returns the fence character and length if `trimmed` starts with a fence.
fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    (count >= 3).then_some((first, count))
}

/// Check if a line is a valid closing fence.
///
/// The closing fence must:
/// - Use the same character as opening
/// - Be at least as long as opening
/// - Contain only fence characters (optionally followed by whitespace)
fn is_fence_line(trimmed: &str, expected_char: char, min_len: usize) -> bool {
    if !trimmed.starts_with(expected_char) {
        return false;
    }

    let count = trimmed.chars().take_while(|&c| c == expected_char).count();
    if count < min_len {
        return false;
    }

    trimmed[count..].chars().all(char::is_whitespace)
}
