//! Streaming request forwarding.

use std::time::Duration;

use axum::body::{Body, HttpBody};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use reqwest::redirect::Policy;
use url::Url;

use crate::config::UpstreamConfig;
use crate::proxy::headers::{inbound_response_headers, outbound_headers};
use crate::proxy::ProxyError;
use crate::secrets::Interpolator;

/// A request ready to send: resolved URL and filtered headers.
#[derive(Debug)]
pub struct PreparedRequest {
    pub url: Url,
    pub headers: HeaderMap,
}

/// Forwards requests to the URL embedded in the request path.
#[derive(Debug, Clone)]
pub struct ProxyRouter {
    client: reqwest::Client,
    interpolator: Interpolator,
}

impl ProxyRouter {
    pub fn new(config: &UpstreamConfig, interpolator: Interpolator) -> Result<Self, ProxyError> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(ProxyError::Client)?;
        Ok(Self {
            client,
            interpolator,
        })
    }

    /// Parse and interpolate the target, and filter the inbound headers.
    ///
    /// No network I/O happens here.
    pub fn prepare(&self, target: &str, inbound: &HeaderMap) -> Result<PreparedRequest, ProxyError> {
        let parsed = parse_target(target)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ProxyError::InvalidUrl("missing host".into()))?
            .to_owned();

        let url = if target.contains("${") {
            let resolved = parse_target(&self.interpolator.interpolate(target, &host))?;
            // Secrets were released for `host`; they must not leave for another one.
            if resolved.host_str() != Some(host.as_str()) {
                return Err(ProxyError::InvalidUrl(
                    "interpolation changed the upstream host".into(),
                ));
            }
            resolved
        } else {
            parsed
        };

        let headers = outbound_headers(inbound, &host, &self.interpolator);
        Ok(PreparedRequest { url, headers })
    }

    /// Forward a request and stream the upstream response back.
    pub async fn forward(
        &self,
        method: Method,
        target: &str,
        inbound: &HeaderMap,
        body: Body,
    ) -> Result<Response, ProxyError> {
        let PreparedRequest { url, headers } = self.prepare(target, inbound)?;

        tracing::debug!(
            method = %method,
            host = url.host_str().unwrap_or_default(),
            "Forwarding request upstream"
        );

        let mut request = self.client.request(method, url).headers(headers);
        // An empty body must not become a chunked stream.
        if body.size_hint().exact() != Some(0) {
            request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = request.send().await?;

        let mut builder = Response::builder().status(upstream.status());
        if let Some(headers) = builder.headers_mut() {
            *headers = inbound_response_headers(upstream.headers());
        }
        let response = builder.body(Body::from_stream(upstream.bytes_stream()))?;
        Ok(response)
    }
}

/// Parse an absolute http(s) URL with a host.
pub fn parse_target(target: &str) -> Result<Url, ProxyError> {
    let url = Url::parse(target).map_err(|e| ProxyError::InvalidUrl(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ProxyError::InvalidUrl(format!("unsupported scheme '{other}'"))),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ProxyError::InvalidUrl("missing host".into()));
    }

    Ok(url)
}
