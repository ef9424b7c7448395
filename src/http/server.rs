//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (CORS, tracing, request ID)
//! - Dispatch by path prefix: store API, proxy API, static fallback
//! - Serve until the shutdown signal fires

use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{any, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::http::middleware::cors_middleware;
use crate::http::request::{mark_client_request_id, RequestIdExt, UuidRequestId};
use crate::proxy::ProxyRouter;
use crate::store::BlobStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: BlobStore,
    pub proxy: ProxyRouter,
    pub config: Arc<GatewayConfig>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl HttpServer {
    /// Create a new HTTP server around an already-loaded store.
    pub fn new(config: GatewayConfig, store: BlobStore, proxy: ProxyRouter) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            store,
            proxy,
            config: config.clone(),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/api/store", post(handlers::put_blob))
            .route("/api/store/", post(handlers::put_blob))
            .route("/api/store/{id}", get(handlers::get_blob))
            .route("/api/proxy", any(handlers::proxy))
            .route("/api/proxy/", any(handlers::proxy))
            .route("/api/proxy/{*target}", any(handlers::proxy));

        let api = match &config.static_files.root {
            Some(root) => api.fallback_service(ServeDir::new(root)),
            None => api.fallback(handlers::not_found),
        };

        api.with_state(state).layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(mark_client_request_id))
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request.request_id(),
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::from_fn(cors_middleware)),
        )
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            static_root = ?self.config.static_files.root,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
