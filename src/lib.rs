//! Credential-injecting HTTP gateway with a content-addressable blob store.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod secrets;
pub mod store;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::{bootstrap, Gateway, Shutdown};
pub use secrets::{Interpolator, SecretSet};
pub use store::BlobStore;
