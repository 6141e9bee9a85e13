//! Allowlist HTML sanitizer.
//!
//! A single forward scan over the markup. Allowlisted tags are re-emitted in
//! normalized form with only allowlisted attributes; anything else is dropped
//! while its text content is kept. `script`, `style` and similar elements are
//! dropped with their content. Comments, doctypes and processing instructions
//! are removed. Stray `<`, `>` and bare `&` in text are escaped.
//!
//! The output is a fixed point: sanitizing it again yields the same string.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

use crate::util::is_dangerous_url;

/// Turns assembled HTML into markup that is safe to inject.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> String;
}

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]{1,31}|#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6});").unwrap()
});

static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*text-align\s*:\s*(left|center|right)\s*;?\s*$").unwrap()
});

/// Elements removed together with everything inside them.
const DROP_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "template", "noscript", "textarea", "title",
    "xmp", "noembed", "noframes",
];

const HTML_TAGS: &[&str] = &[
    "a", "abbr", "b", "blockquote", "br", "caption", "code", "col", "colgroup", "dd", "del",
    "details", "div", "dl", "dt", "em", "figcaption", "figure", "h1", "h2", "h3", "h4", "h5",
    "h6", "hr", "i", "img", "input", "ins", "kbd", "li", "mark", "ol", "p", "pre", "q", "s",
    "samp", "small", "span", "strong", "sub", "summary", "sup", "table", "tbody", "td", "tfoot",
    "th", "thead", "tr", "u", "ul", "var",
];

const SVG_TAGS: &[&str] = &[
    "svg", "g", "path", "rect", "circle", "ellipse", "line", "polyline", "polygon", "text",
    "tspan", "textPath", "defs", "marker", "use", "symbol", "linearGradient", "radialGradient",
    "stop", "clipPath", "mask", "pattern", "foreignObject", "desc",
];

const MATH_TAGS: &[&str] = &[
    "math", "mi", "mn", "mo", "ms", "mtext", "mrow", "msup", "msub", "msubsup", "mfrac", "msqrt",
    "mroot", "mover", "munder", "munderover", "mtable", "mtr", "mtd", "mspace", "mstyle",
    "semantics", "annotation", "menclose", "mpadded", "mphantom",
];

const GLOBAL_ATTRS: &[&str] = &[
    "class", "title", "lang", "dir", "role", "aria-hidden", "aria-label", "data-kind",
    "data-lang", "data-name",
];

const HTML_ATTRS: &[(&str, &[&str])] = &[
    ("a", &["href"]),
    ("img", &["src", "alt", "width", "height"]),
    ("input", &["type", "checked", "disabled"]),
    ("ol", &["start"]),
    ("td", &["style", "colspan", "rowspan"]),
    ("th", &["style", "colspan", "rowspan"]),
    ("details", &["open"]),
];

const SVG_ATTRS: &[&str] = &[
    "id", "viewBox", "width", "height", "x", "y", "x1", "x2", "y1", "y2", "cx", "cy", "r",
    "rx", "ry", "d", "points", "dx", "dy", "fill", "fill-opacity", "fill-rule", "stroke",
    "stroke-width", "stroke-dasharray", "stroke-linecap", "stroke-linejoin", "stroke-opacity",
    "opacity", "transform", "font-family", "font-size", "font-weight", "font-style",
    "text-anchor", "dominant-baseline", "alignment-baseline", "xmlns", "xmlns:xlink", "version",
    "preserveAspectRatio", "markerWidth", "markerHeight", "refX", "refY", "orient",
    "markerUnits", "href", "xlink:href", "clip-path", "marker-start", "marker-end", "offset",
    "stop-color", "stop-opacity", "gradientUnits", "textLength", "lengthAdjust",
];

const MATH_ATTRS: &[&str] = &[
    "display", "xmlns", "mathvariant", "stretchy", "fence", "separator", "accent", "encoding",
    "columnalign", "rowspacing", "columnspacing", "lspace", "rspace", "width", "height", "depth",
];

/// Attributes that carry a URL.
const URL_ATTRS: &[&str] = &["href", "src", "xlink:href"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Html,
    Svg,
    Math,
}

#[derive(Debug, Clone, Copy)]
struct TagSpec {
    name: &'static str,
    ns: Namespace,
}

impl TagSpec {
    fn lookup(name: &str) -> Option<Self> {
        let find = |list: &[&'static str], ns: Namespace| {
            list.iter()
                .copied()
                .find(|t| t.eq_ignore_ascii_case(name))
                .map(|t| Self { name: t, ns })
        };
        find(HTML_TAGS, Namespace::Html)
            .or_else(|| find(SVG_TAGS, Namespace::Svg))
            .or_else(|| find(MATH_TAGS, Namespace::Math))
    }

    /// Canonical spelling of `attr` if it is allowed on this tag.
    fn allowed_attr(self, attr: &str) -> Option<&'static str> {
        if attr
            .get(..2)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
        {
            return None;
        }
        let find = |list: &[&'static str]| {
            list.iter()
                .copied()
                .find(|a| a.eq_ignore_ascii_case(attr))
        };
        find(GLOBAL_ATTRS).or_else(|| match self.ns {
            Namespace::Html => HTML_ATTRS
                .iter()
                .find(|(tag, _)| *tag == self.name)
                .and_then(|(_, attrs)| find(attrs)),
            Namespace::Svg => find(SVG_ATTRS),
            Namespace::Math => find(MATH_ATTRS),
        })
    }
}

/// Default sanitizer for rendered output.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowlistSanitizer;

impl Sanitizer for AllowlistSanitizer {
    fn sanitize(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut rest = html;

        while let Some(pos) = rest.find(['<', '>', '&']) {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];
            rest = match rest.as_bytes()[0] {
                b'<' => markup(rest, &mut out),
                b'>' => {
                    out.push_str("&gt;");
                    &rest[1..]
                }
                _ => ampersand(rest, &mut out),
            };
        }

        out.push_str(rest);
        out
    }
}

/// Handle markup starting at `<`, returning the input after it.
fn markup<'a>(rest: &'a str, out: &mut String) -> &'a str {
    if let Some(body) = rest.strip_prefix("<!--") {
        return body.find("-->").map_or("", |end| &body[end + 3..]);
    }
    if rest.starts_with("<!") || rest.starts_with("<?") {
        return rest.find('>').map_or("", |end| &rest[end + 1..]);
    }

    let Some(tag) = Tag::parse(rest) else {
        out.push_str("&lt;");
        return &rest[1..];
    };
    let after = &rest[tag.len..];

    if DROP_CONTENT.iter().any(|n| n.eq_ignore_ascii_case(tag.name)) {
        if tag.closing || tag.self_closing {
            return after;
        }
        tracing::trace!(tag = tag.name, "dropping element with content");
        return skip_element(after, tag.name);
    }

    match TagSpec::lookup(tag.name) {
        Some(spec) => tag.emit(spec, out),
        None => tracing::trace!(tag = tag.name, "dropping tag"),
    }
    after
}

fn ampersand<'a>(rest: &'a str, out: &mut String) -> &'a str {
    match ENTITY_RE.find(rest) {
        Some(entity) => {
            out.push_str(entity.as_str());
            &rest[entity.end()..]
        }
        None => {
            out.push_str("&amp;");
            &rest[1..]
        }
    }
}

/// Skip past the closing tag of `name`, or to the end of input.
fn skip_element<'a>(mut rest: &'a str, name: &str) -> &'a str {
    while let Some(pos) = rest.find("</") {
        let candidate = &rest[pos + 2..];
        let matches = candidate
            .get(..name.len())
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
            && !candidate[name.len()..]
                .bytes()
                .next()
                .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-');
        if matches {
            return candidate.find('>').map_or("", |end| &candidate[end + 1..]);
        }
        rest = candidate;
    }
    ""
}

/// A parsed start or end tag.
struct Tag<'a> {
    name: &'a str,
    closing: bool,
    attrs: Vec<(&'a str, Option<&'a str>)>,
    self_closing: bool,
    /// Bytes consumed, including `<` and `>`.
    len: usize,
}

impl<'a> Tag<'a> {
    /// Parse a tag at the start of `s`. `None` when `s` does not start a
    /// well-formed tag.
    fn parse(s: &'a str) -> Option<Self> {
        let bytes = s.as_bytes();
        let closing = bytes.get(1) == Some(&b'/');
        let mut i = if closing { 2 } else { 1 };

        if !bytes.get(i)?.is_ascii_alphabetic() {
            return None;
        }
        let start = i;
        while bytes
            .get(i)
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b':'))
        {
            i += 1;
        }
        let name = &s[start..i];

        let mut attrs = Vec::new();
        loop {
            while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
                i += 1;
            }
            match *bytes.get(i)? {
                b'>' => {
                    return Some(Self {
                        name,
                        closing,
                        attrs,
                        self_closing: false,
                        len: i + 1,
                    });
                }
                b'/' if bytes.get(i + 1) == Some(&b'>') => {
                    return Some(Self {
                        name,
                        closing,
                        attrs,
                        self_closing: true,
                        len: i + 2,
                    });
                }
                b'/' | b'=' => {
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let name_start = i;
            while bytes
                .get(i)
                .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
            {
                i += 1;
            }
            let attr = &s[name_start..i];

            let mut j = i;
            while bytes.get(j).is_some_and(u8::is_ascii_whitespace) {
                j += 1;
            }
            let value = if bytes.get(j) == Some(&b'=') {
                j += 1;
                while bytes.get(j).is_some_and(u8::is_ascii_whitespace) {
                    j += 1;
                }
                match *bytes.get(j)? {
                    quote @ (b'"' | b'\'') => {
                        let value_start = j + 1;
                        let end = value_start + s[value_start..].find(char::from(quote))?;
                        i = end + 1;
                        Some(&s[value_start..end])
                    }
                    _ => {
                        let value_start = j;
                        while bytes
                            .get(j)
                            .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'>')
                        {
                            j += 1;
                        }
                        i = j;
                        Some(&s[value_start..j])
                    }
                }
            } else {
                None
            };
            attrs.push((attr, value));
        }
    }

    fn emit(&self, spec: TagSpec, out: &mut String) {
        if self.closing {
            write!(out, "</{}>", spec.name).unwrap();
            return;
        }

        out.push('<');
        out.push_str(spec.name);
        let mut seen: Vec<&str> = Vec::new();
        for (attr, value) in &self.attrs {
            let Some(canonical) = spec.allowed_attr(attr) else {
                continue;
            };
            if seen.contains(&canonical) {
                continue;
            }
            seen.push(canonical);

            match value {
                Some(value) => {
                    if let Some(clean) = clean_value(spec, canonical, value) {
                        write!(out, r#" {canonical}="{clean}""#).unwrap();
                    }
                }
                None if URL_ATTRS.contains(&canonical) || canonical == "style" => {}
                None => {
                    out.push(' ');
                    out.push_str(canonical);
                }
            }
        }
        out.push_str(if self.self_closing { "/>" } else { ">" });
    }
}

/// Validated, re-escaped attribute value, or `None` to drop the attribute.
fn clean_value(spec: TagSpec, attr: &str, value: &str) -> Option<String> {
    if URL_ATTRS.contains(&attr) && is_dangerous_url(value) {
        tracing::debug!(tag = spec.name, attr, "dropping dangerous url");
        return None;
    }
    if attr == "style" {
        let caps = STYLE_RE.captures(value)?;
        return Some(format!("text-align:{}", caps[1].to_ascii_lowercase()));
    }
    if spec.name == "input" && attr == "type" && !value.eq_ignore_ascii_case("checkbox") {
        return None;
    }
    Some(escape_attr(value))
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        match c {
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if !ENTITY_RE.is_match(&value[i..]) => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}
