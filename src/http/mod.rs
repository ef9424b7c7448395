//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → middleware/cors.rs (OPTIONS → 204, CORS headers on everything)
//!     → routing by path prefix:
//!         /api/store/...  → handlers::get_blob / handlers::put_blob
//!         /api/proxy/...  → handlers::proxy → proxy::ProxyRouter
//!         anything else   → static root (ServeDir) or 404
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod server;

pub use request::{
    mark_client_request_id, ClientRequestId, RequestIdExt, UuidRequestId, X_REQUEST_ID,
};
pub use server::{AppState, HttpServer};
