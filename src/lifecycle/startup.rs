//! Ordered startup.

use thiserror::Error;

use crate::config::GatewayConfig;
use crate::http::HttpServer;
use crate::proxy::{ProxyError, ProxyRouter};
use crate::secrets::{Interpolator, SecretSet};
use crate::store::{BlobStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load blob store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to initialize proxy: {0}")]
    Proxy(#[from] ProxyError),
}

/// Everything needed to serve, built in dependency order.
pub struct Gateway {
    pub server: HttpServer,
    pub store: BlobStore,
}

/// Load the store snapshot (blocking), then build the proxy and server.
///
/// Must be called inside a Tokio runtime; the snapshot writer is spawned
/// on it.
pub fn bootstrap(config: GatewayConfig, secrets: SecretSet) -> Result<Gateway, StartupError> {
    let store = BlobStore::open(&config.store)?;
    tracing::info!(
        path = %config.store.path,
        blobs = store.len(),
        max_body_bytes = store.max_body_bytes(),
        "Blob store ready"
    );

    tracing::info!(variables = secrets.variable_count(), "Secret environment captured");
    let proxy = ProxyRouter::new(&config.upstream, Interpolator::new(secrets))?;

    let server = HttpServer::new(config, store.clone(), proxy);
    Ok(Gateway { server, store })
}
