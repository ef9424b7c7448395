//! Request identification.
//!
//! Every request gets an `x-request-id` (UUID v4) unless the client already
//! sent one; the id is echoed on the response and recorded on the request
//! span. A client-supplied id is forwarded to proxied upstreams, a generated
//! one is not.

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request extension present when the client sent its own `x-request-id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRequestId;

/// Tag requests that arrive with an `x-request-id`.
///
/// Must run before `SetRequestIdLayer`, which fills in the header otherwise.
pub async fn mark_client_request_id(mut request: Request<Body>, next: Next) -> Response {
    if request.headers().contains_key(X_REQUEST_ID) {
        request.extensions_mut().insert(ClientRequestId);
    }
    next.run(request).await
}

/// Read the request id assigned to a request.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}
