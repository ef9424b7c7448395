//! Gateway error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::proxy::ProxyError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Not found")]
    NotFound,

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl GatewayError {
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BodyRead(_) => "body_read",
            Self::Store(StoreError::PayloadTooLarge { .. }) => "payload_too_large",
            Self::Store(_) => "store_error",
            Self::Proxy(ProxyError::InvalidUrl(_)) => "invalid_url",
            Self::Proxy(_) => "upstream_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BodyRead(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Store(_) | Self::Proxy(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text returned to the caller. Never includes upstream detail.
    fn public_message(&self) -> &'static str {
        match self {
            Self::NotFound => "404 Not Found",
            Self::BodyRead(_) => "Bad Request",
            Self::Store(StoreError::PayloadTooLarge { .. }) => "Payload Too Large",
            Self::Store(_) => "Internal Server Error",
            Self::Proxy(ProxyError::InvalidUrl(_)) => "Invalid proxy URL",
            Self::Proxy(_) => "Upstream request failed",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, error_type = self.error_type(), "Request failed");
        } else {
            tracing::debug!(error = %self, error_type = self.error_type(), "Request rejected");
        }
        (status, self.public_message()).into_response()
    }
}
