//! Incremental rendering of an append-only markdown buffer.
//!
//! A [`StreamSession`] owns the buffer and a checkpoint: the tokens that can
//! no longer change together with their rendered fragments. Each
//! [`push`](StreamSession::push) re-tokenizes the buffer, reuses the fragments
//! of the unchanged committed prefix and renders only the tail.
//! [`finish`](StreamSession::finish) returns exactly what a from-scratch
//! [`Renderer::render`](tailmd_renderer::Renderer::render) of the final buffer
//! returns.
//!
//! # Example
//!
//! ```
//! use tailmd_renderer::RenderOptions;
//! use tailmd_stream::StreamSession;
//!
//! let mut session = StreamSession::with_options(RenderOptions::default());
//! session.push("# Hi\n\nSome **bo");
//! let html = session.push("ld** text.");
//! assert!(html.starts_with("<h1>Hi</h1>\n<p>Some <strong>bold</strong> text.</p>"));
//! assert_eq!(
//!     session.finish(),
//!     "<h1>Hi</h1>\n<p>Some <strong>bold</strong> text.</p>"
//! );
//! ```

mod session;

pub use session::{CodeBlockEvent, StreamSession, SubscriptionId};
