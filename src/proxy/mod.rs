//! Reverse proxy for arbitrary upstream URLs.
//!
//! # Data Flow
//! ```text
//! ANY /api/proxy/<percent-encoded absolute URL>
//!     → forward.rs: parse URL (500 on failure, no network call)
//!     → headers.rs: drop Host/Connection/Content-Length/User-Agent/
//!                   Origin/Referer/sec-*
//!     → secrets::Interpolator over header values and the URL
//!     → reqwest: original method, body streamed through
//!     → status + headers copied, body streamed back
//! ```
//!
//! # Design Decisions
//! - Neither body is buffered; backpressure flows through both streams
//! - Dropping the client response drops the upstream connection
//! - Upstream error text is logged, never returned to the caller
//! - Redirects are returned to the caller, not followed

pub mod forward;
pub mod headers;

use thiserror::Error;

pub use forward::ProxyRouter;

/// Errors raised while forwarding a request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to build response: {0}")]
    Response(#[from] axum::http::Error),
}
