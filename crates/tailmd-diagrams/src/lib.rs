//! Diagram rendering for tailmd via [Kroki](https://kroki.io).
//!
//! [`KrokiRenderer`] implements [`tailmd_renderer::DiagramRenderer`]: fence
//! languages such as `mermaid`, `plantuml` or `kroki-graphviz` are sent to a
//! Kroki server and the returned SVG is embedded inline. Rendered SVGs are
//! cached by a SHA-256 of endpoint and source.
//!
//! # Example
//!
//! ```no_run
//! use tailmd_diagrams::{DEFAULT_TIMEOUT, KrokiRenderer, shared_cache};
//! use tailmd_renderer::{RenderOptions, Renderer};
//!
//! let diagrams = KrokiRenderer::new("https://kroki.io", DEFAULT_TIMEOUT)
//!     .with_cache(shared_cache(256));
//! let renderer = Renderer::new(RenderOptions::default()).with_diagrams(diagrams);
//! let html = renderer.render("```mermaid\ngraph TD; A-->B\n```");
//! ```

mod cache;
mod kroki;
mod language;
mod renderer;

pub use cache::DiagramKey;
pub use kroki::{DiagramError, clean_svg, create_agent, fetch_svg};
pub use language::DiagramLanguage;
pub use renderer::{DEFAULT_TIMEOUT, KrokiRenderer, shared_cache};
