//! Shared utility functions for rendering.

/// Escape special HTML characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Reverse [`escape_html`].
pub(crate) fn unescape_html(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// URI schemes that can execute script or smuggle content.
const DANGEROUS_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Whether a link target uses a rejected protocol.
///
/// Comparison is case-insensitive and ignores ASCII whitespace and control
/// characters anywhere in the target, which browsers also ignore when
/// resolving the scheme. Numeric character references are decoded first.
#[must_use]
pub fn is_dangerous_url(url: &str) -> bool {
    let decoded = decode_char_refs(url);
    let normalized: String = decoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect();
    DANGEROUS_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

/// Decode `&#NN;`, `&#xNN;` and the handful of named references that can
/// spell out a scheme.
fn decode_char_refs(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match decode_one(rest) {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode one reference at the start of `s`, returning the char and the
/// number of bytes consumed. The trailing `;` is optional, as in browsers.
fn decode_one(s: &str) -> Option<(char, usize)> {
    const NAMED: &[(&str, char)] = &[
        ("&amp", '&'),
        ("&colon", ':'),
        ("&tab", '\t'),
        ("&newline", '\n'),
        ("&lt", '<'),
        ("&gt", '>'),
        ("&quot", '"'),
        ("&apos", '\''),
    ];

    let consume_semicolon = |len: usize| {
        if s[len..].starts_with(';') {
            len + 1
        } else {
            len
        }
    };

    if let Some(digits) = s.strip_prefix("&#x").or_else(|| s.strip_prefix("&#X")) {
        let hex_len = digits.bytes().take_while(u8::is_ascii_hexdigit).count();
        let value = u32::from_str_radix(digits.get(..hex_len.min(6))?, 16).ok()?;
        return Some((char::from_u32(value)?, consume_semicolon(3 + hex_len)));
    }
    if let Some(digits) = s.strip_prefix("&#") {
        let dec_len = digits.bytes().take_while(u8::is_ascii_digit).count();
        let value: u32 = digits.get(..dec_len.min(7))?.parse().ok()?;
        return Some((char::from_u32(value)?, consume_semicolon(2 + dec_len)));
    }

    let lower = s.chars().take(10).collect::<String>().to_ascii_lowercase();
    NAMED
        .iter()
        .find(|(name, _)| lower.starts_with(name))
        .map(|(name, c)| (*c, consume_semicolon(name.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_unescape_roundtrip() {
        let s = r#"<b class="x">Tom & 'Jerry'</b>"#;
        assert_eq!(unescape_html(&escape_html(s)), s);
    }

    #[test]
    fn test_dangerous_url_plain() {
        assert!(is_dangerous_url("javascript:alert(1)"));
        assert!(is_dangerous_url("VBScript:msgbox"));
        assert!(is_dangerous_url("data:text/html;base64,xxx"));
    }

    #[test]
    fn test_dangerous_url_obfuscated() {
        assert!(is_dangerous_url(" java\tscript:alert(1)"));
        assert!(is_dangerous_url("jav&#x09;ascript:alert(1)"));
        assert!(is_dangerous_url("javascript&colon;alert(1)"));
        assert!(is_dangerous_url("&#106;avascript:alert(1)"));
        assert!(is_dangerous_url("\u{0}javascript:alert(1)"));
    }

    #[test]
    fn test_safe_urls() {
        assert!(!is_dangerous_url("https://example.com"));
        assert!(!is_dangerous_url("/docs/javascript:guide"));
        assert!(!is_dangerous_url("#data:"));
        assert!(!is_dangerous_url("mailto:a@b.c"));
    }
}
