//! [`DiagramRenderer`] backed by a Kroki server.

use std::sync::OnceLock;
use std::time::Duration;

use tailmd_cache::{Cache, CacheBucket, MemoryCache, NullCacheBucket};
use tailmd_renderer::{CollaboratorError, DiagramRenderer};
use ureq::Agent;

use crate::cache::DiagramKey;
use crate::kroki::{self, DiagramError};
use crate::language::DiagramLanguage;

/// Default HTTP timeout for Kroki requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cache etag; bumping the crate version invalidates stored SVGs.
const CACHE_ETAG: &str = env!("CARGO_PKG_VERSION");

static SHARED_CACHE: OnceLock<MemoryCache> = OnceLock::new();

/// Process-wide diagram cache.
///
/// The first call fixes the capacity; later calls return the same cache.
pub fn shared_cache(capacity: usize) -> &'static MemoryCache {
    SHARED_CACHE.get_or_init(|| MemoryCache::new(capacity))
}

/// Renders diagram fences to inline SVG through Kroki.
///
/// Results are cached by a hash of endpoint and source, so re-rendering an
/// unchanged diagram does not hit the network.
pub struct KrokiRenderer {
    server_url: String,
    agent: Agent,
    bucket: Box<dyn CacheBucket>,
}

impl KrokiRenderer {
    /// Create a renderer for `server_url` (trailing slashes ignored).
    #[must_use]
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_owned();
        Self {
            server_url,
            agent: kroki::create_agent(timeout),
            bucket: Box::new(NullCacheBucket),
        }
    }

    /// Store rendered SVGs in the `diagrams` bucket of `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: &dyn Cache) -> Self {
        self.bucket = cache.bucket("diagrams");
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn render_svg(&self, language: DiagramLanguage, source: &str) -> Result<String, DiagramError> {
        let endpoint = language.kroki_endpoint();
        let hash = DiagramKey { source, endpoint }.compute_hash();

        if let Some(bytes) = self.bucket.get(&hash, CACHE_ETAG)
            && let Ok(svg) = String::from_utf8(bytes)
        {
            tracing::debug!(endpoint, hash = %&hash[..12], "diagram cache hit");
            return Ok(svg);
        }

        tracing::debug!(endpoint, server = %self.server_url, "rendering diagram");
        let svg = kroki::fetch_svg(&self.agent, &self.server_url, language, source)?;
        self.bucket.set(&hash, CACHE_ETAG, svg.as_bytes());
        Ok(svg)
    }
}

impl DiagramRenderer for KrokiRenderer {
    fn supports(&self, lang: &str) -> bool {
        DiagramLanguage::parse(lang).is_some()
    }

    fn to_vector_image(&self, lang: &str, source: &str) -> Result<String, CollaboratorError> {
        let language = DiagramLanguage::parse(lang)
            .ok_or_else(|| DiagramError::UnsupportedLanguage(lang.to_owned()))?;
        Ok(self.render_svg(language, source)?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tailmd_renderer::{RenderOptions, Renderer};

    use super::*;

    static_assertions::assert_impl_all!(KrokiRenderer: DiagramRenderer, Send, Sync);

    const UNREACHABLE: &str = "http://127.0.0.1:1";

    fn offline() -> KrokiRenderer {
        KrokiRenderer::new(UNREACHABLE, Duration::from_millis(500))
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let renderer = KrokiRenderer::new("https://kroki.io//", DEFAULT_TIMEOUT);
        assert_eq!(renderer.server_url(), "https://kroki.io");
    }

    #[test]
    fn test_supports() {
        let renderer = offline();
        assert!(renderer.supports("mermaid"));
        assert!(renderer.supports("kroki-plantuml"));
        assert!(!renderer.supports("rust"));
    }

    #[test]
    fn test_cache_hit_avoids_http() {
        let cache = MemoryCache::new(4);
        let source = "graph TD; A-->B";
        let hash = DiagramKey {
            source,
            endpoint: "mermaid",
        }
        .compute_hash();
        cache
            .bucket("diagrams")
            .set(&hash, CACHE_ETAG, b"<svg><g/></svg>");

        let renderer = offline().with_cache(&cache);
        assert_eq!(
            renderer.to_vector_image("mermaid", source).unwrap(),
            "<svg><g/></svg>"
        );
    }

    #[test]
    fn test_stale_etag_misses() {
        let cache = MemoryCache::new(4);
        let hash = DiagramKey {
            source: "a",
            endpoint: "mermaid",
        }
        .compute_hash();
        cache.bucket("diagrams").set(&hash, "0.0.0-old", b"<svg/>");

        let renderer = offline().with_cache(&cache);
        assert!(renderer.to_vector_image("mermaid", "a").is_err());
    }

    #[test]
    fn test_server_error_is_backend_error() {
        let result = offline().to_vector_image("graphviz", "digraph { a -> b }");
        assert!(matches!(result, Err(CollaboratorError::Backend(_))));
    }

    #[test]
    fn test_unsupported_language_is_invalid_source() {
        let result = offline().to_vector_image("rust", "fn main() {}");
        assert!(matches!(result, Err(CollaboratorError::InvalidSource(_))));
    }

    #[test]
    fn test_failed_diagram_renders_error_fragment() {
        let renderer = Renderer::new(RenderOptions::default()).with_diagrams(offline());
        let html = renderer.render("```mermaid\ngraph TD; A-->B\n```");
        assert!(html.contains(r#"data-kind="diagram""#));
        assert!(html.contains("graph TD; A--&gt;B"));
    }

    #[test]
    fn test_cached_diagram_renders_inline() {
        let cache = MemoryCache::new(4);
        let source = "graph TD; A-->B\n";
        let hash = DiagramKey {
            source,
            endpoint: "mermaid",
        }
        .compute_hash();
        cache
            .bucket("diagrams")
            .set(&hash, CACHE_ETAG, b"<svg><rect width=\"1\"/></svg>");

        let renderer =
            Renderer::new(RenderOptions::default()).with_diagrams(offline().with_cache(&cache));
        let html = renderer.render("```mermaid\ngraph TD; A-->B\n```");
        assert!(html.contains(r#"<div class="md-diagram" data-lang="mermaid">"#));
        assert!(html.contains("<rect width=\"1\"/>"));
    }

    #[test]
    fn test_shared_cache_is_singleton() {
        let a = shared_cache(8);
        let b = shared_cache(16);
        assert!(std::ptr::eq(a, b));
    }
}
