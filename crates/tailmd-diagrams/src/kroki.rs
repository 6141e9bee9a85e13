//! Kroki HTTP client.
//!
//! Diagrams are POSTed as plain text to `{server}/{endpoint}/svg` and the
//! returned SVG is cleaned up for inline embedding.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tailmd_renderer::CollaboratorError;
use ureq::Agent;

use crate::language::DiagramLanguage;

/// XML declaration (`<?xml ...?>`) at the start of an SVG response.
static XML_PROLOG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<\?xml[^>]*\?>\s*").unwrap());

static DOCTYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!DOCTYPE[^>\[]*(\[[^\]]*\])?\s*>\s*").unwrap());

/// Matches Google Fonts @import statements in SVG style blocks.
static GOOGLE_FONTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@import\s+url\([^)]*fonts\.googleapis\.com[^)]*\)\s*;?").unwrap()
});

/// Diagram rendering error.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("unsupported diagram language: {0}")]
    UnsupportedLanguage(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("invalid SVG data")]
    InvalidSvg,
}

impl From<DiagramError> for CollaboratorError {
    fn from(e: DiagramError) -> Self {
        match e {
            DiagramError::UnsupportedLanguage(_) => Self::InvalidSource(e.to_string()),
            _ => Self::Backend(e.to_string()),
        }
    }
}

/// Create HTTP agent with the specified timeout.
///
/// Status codes are not turned into errors so the error body can be read.
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Render one diagram to SVG via Kroki.
///
/// # Errors
///
/// Returns [`DiagramError::Http`] on transport failures and 4xx/5xx responses,
/// [`DiagramError::Io`] when the body cannot be read, and
/// [`DiagramError::InvalidSvg`] when the body is not an SVG document.
pub fn fetch_svg(
    agent: &Agent,
    server_url: &str,
    language: DiagramLanguage,
    source: &str,
) -> Result<String, DiagramError> {
    let endpoint = language.kroki_endpoint();
    let url = format!("{server_url}/{endpoint}/svg");

    let response = agent
        .post(&url)
        .header("Content-Type", "text/plain")
        .send(source.as_bytes())
        .map_err(|e| DiagramError::Http(e.to_string()))?;

    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let error_body = body
            .read_to_string()
            .unwrap_or_else(|_| String::from("(unable to read error body)"));
        return Err(DiagramError::Http(format!("HTTP {status}: {error_body}")));
    }

    let data = body
        .read_to_vec()
        .map_err(|e| DiagramError::Io(e.to_string()))?;
    let svg = String::from_utf8(data).map_err(|_| DiagramError::InvalidSvg)?;
    let svg = clean_svg(&svg);
    if !svg.starts_with("<svg") {
        return Err(DiagramError::InvalidSvg);
    }
    Ok(svg)
}

/// Prepare an SVG document for inline embedding.
///
/// Drops the XML declaration, any DOCTYPE and Google Fonts imports that
/// would trigger external requests from the page.
#[must_use]
pub fn clean_svg(svg: &str) -> String {
    let svg = XML_PROLOG_RE.replace(svg, "");
    let svg = DOCTYPE_RE.replace(&svg, "");
    let svg = GOOGLE_FONTS_RE.replace_all(&svg, "");
    svg.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_clean_svg_strips_prolog_and_doctype() {
        let svg = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                   <!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"x.dtd\">\n\
                   <svg><rect/></svg>\n";
        assert_eq!(clean_svg(svg), "<svg><rect/></svg>");
    }

    #[test]
    fn test_clean_svg_strips_google_fonts() {
        let svg = "<svg><style>@import url('https://fonts.googleapis.com/css?family=Roboto');\
                   text{fill:red}</style></svg>";
        assert_eq!(clean_svg(svg), "<svg><style>text{fill:red}</style></svg>");
    }

    #[test]
    fn test_clean_svg_leaves_plain_svg() {
        assert_eq!(clean_svg("<svg/>"), "<svg/>");
    }

    #[test]
    fn test_fetch_svg_connection_refused() {
        let agent = create_agent(Duration::from_millis(500));
        let result = fetch_svg(&agent, "http://127.0.0.1:1", DiagramLanguage::Mermaid, "a");
        assert!(matches!(result, Err(DiagramError::Http(_))));
    }

    #[test]
    fn test_error_conversion() {
        let e: CollaboratorError = DiagramError::InvalidSvg.into();
        assert!(matches!(e, CollaboratorError::Backend(_)));
        let e: CollaboratorError = DiagramError::UnsupportedLanguage("rust".to_owned()).into();
        assert!(matches!(e, CollaboratorError::InvalidSource(_)));
    }
}
