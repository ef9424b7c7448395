//! Route handlers for the store and proxy APIs.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::error::GatewayError;
use crate::http::request::{ClientRequestId, RequestIdExt, X_REQUEST_ID};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::ProxyError;
use crate::store::StoreError;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// `GET /api/store/{id}`
pub async fn get_blob(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let start = Instant::now();

    let response = match state.store.get(&id) {
        Some(blob) => (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_PLAIN)], blob.body).into_response(),
        None => GatewayError::NotFound.into_response(),
    };

    metrics::record_request("store", "GET", response.status().as_u16(), start);
    response
}

/// `POST /api/store/`
pub async fn put_blob(State(state): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    let start = Instant::now();

    let response = match store_body(&state, &headers, body).await {
        Ok((id, true)) => (StatusCode::CREATED, [(header::CONTENT_TYPE, TEXT_PLAIN)], id).into_response(),
        Ok((id, false)) => (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_PLAIN)], id).into_response(),
        Err(e) => e.into_response(),
    };

    metrics::record_request("store", "POST", response.status().as_u16(), start);
    response
}

async fn store_body(
    state: &AppState,
    headers: &HeaderMap,
    body: Body,
) -> Result<(String, bool), GatewayError> {
    let bytes = read_limited(headers, body, state.store.max_body_bytes()).await?;
    let outcome = state.store.put(bytes)?;
    Ok((outcome.id, outcome.created))
}

/// Buffer a request body, giving up as soon as it exceeds `limit`.
async fn read_limited(headers: &HeaderMap, body: Body, limit: usize) -> Result<Vec<u8>, GatewayError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if let Some(size) = declared.filter(|size| *size > limit) {
        return Err(StoreError::PayloadTooLarge { size, limit }.into());
    }

    let mut buffer = Vec::with_capacity(declared.unwrap_or(0));
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| GatewayError::BodyRead(e.to_string()))?;
        let size = buffer.len() + chunk.len();
        if size > limit {
            return Err(StoreError::PayloadTooLarge { size, limit }.into());
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer)
}

/// `ANY /api/proxy/{*target}`
pub async fn proxy(
    State(state): State<AppState>,
    target: Result<Path<String>, PathRejection>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let request_id = request.request_id().to_owned();

    let result = match target {
        Ok(Path(target)) => {
            let target = match request.uri().query() {
                Some(query) if target.contains('?') => format!("{target}&{query}"),
                Some(query) => format!("{target}?{query}"),
                None => target,
            };
            let (mut parts, body) = request.into_parts();
            // Ids minted here stay inside the gateway.
            if parts.extensions.get::<ClientRequestId>().is_none() {
                parts.headers.remove(X_REQUEST_ID);
            }
            state
                .proxy
                .forward(parts.method, &target, &parts.headers, body)
                .await
        }
        Err(rejection) => Err(ProxyError::InvalidUrl(rejection.body_text())),
    };

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            if matches!(e, ProxyError::Upstream(_)) {
                metrics::record_upstream_error();
            }
            tracing::warn!(request_id = %request_id, error = %e, "Proxy request failed");
            GatewayError::from(e).into_response()
        }
    };

    metrics::record_request("proxy", method.as_str(), response.status().as_u16(), start);
    response
}

/// Fallback when no static root is configured.
pub async fn not_found() -> Response {
    GatewayError::NotFound.into_response()
}
