//! Header filtering for proxied requests and responses.

use axum::http::header::{
    CONNECTION, CONTENT_LENGTH, HOST, ORIGIN, REFERER, TRANSFER_ENCODING, USER_AGENT,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::secrets::Interpolator;

/// Inbound headers that are never forwarded upstream.
const STRIPPED_REQUEST_HEADERS: [HeaderName; 6] =
    [HOST, CONNECTION, CONTENT_LENGTH, USER_AGENT, ORIGIN, REFERER];

/// Upstream headers that describe the upstream connection, not the payload.
const STRIPPED_RESPONSE_HEADERS: [HeaderName; 2] = [CONNECTION, TRANSFER_ENCODING];

/// Whether an inbound header must be dropped before forwarding.
pub fn is_stripped(name: &HeaderName) -> bool {
    // HeaderName is always lowercase.
    STRIPPED_REQUEST_HEADERS.contains(name) || name.as_str().starts_with("sec-")
}

/// Build the upstream header set for `host`.
pub fn outbound_headers(inbound: &HeaderMap, host: &str, interpolator: &Interpolator) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len());

    for (name, value) in inbound {
        if is_stripped(name) {
            continue;
        }
        outbound.append(name.clone(), interpolate_value(name, value, host, interpolator));
    }

    outbound
}

fn interpolate_value(
    name: &HeaderName,
    value: &HeaderValue,
    host: &str,
    interpolator: &Interpolator,
) -> HeaderValue {
    let Ok(text) = value.to_str() else {
        return value.clone();
    };
    if !text.contains("${") {
        return value.clone();
    }

    let resolved = interpolator.interpolate(text, host);
    match HeaderValue::from_str(&resolved) {
        Ok(mut new_value) => {
            new_value.set_sensitive(true);
            new_value
        }
        Err(_) => {
            tracing::warn!(
                header = %name,
                host = host,
                "Interpolated header value is not a valid header; forwarding it unresolved"
            );
            value.clone()
        }
    }
}

/// Copy upstream response headers, minus connection-level ones.
pub fn inbound_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if !STRIPPED_RESPONSE_HEADERS.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretSet;

    fn interpolator() -> Interpolator {
        Interpolator::new(SecretSet::from_pairs([
            ("TOKEN", "abc123"),
            ("TOKEN_ACCESS", "api.example.com"),
            ("BAD", "line\nbreak"),
            ("BAD_ACCESS", "*"),
        ]))
    }

    fn inbound() -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            ("host", "gateway.local"),
            ("connection", "keep-alive"),
            ("content-length", "12"),
            ("user-agent", "Mozilla/5.0"),
            ("origin", "https://app.local"),
            ("referer", "https://app.local/page"),
            ("sec-fetch-mode", "cors"),
            ("sec-ch-ua", "\"Chromium\""),
            ("x-request-id", "req-1"),
            ("accept", "application/json"),
            ("authorization", "Bearer ${TOKEN}"),
            ("x-custom", "one"),
        ] {
            headers.append(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        headers.append("x-custom", HeaderValue::from_static("two"));
        headers
    }

    #[test]
    fn test_strips_forbidden_headers() {
        let out = outbound_headers(&inbound(), "api.example.com", &interpolator());

        for name in [
            "host",
            "connection",
            "content-length",
            "user-agent",
            "origin",
            "referer",
        ] {
            assert!(!out.contains_key(name), "{name} should be stripped");
        }
        assert!(out.keys().all(|k| !k.as_str().starts_with("sec-")));
        assert_eq!(out["accept"], "application/json");
        assert_eq!(out["x-request-id"], "req-1");
    }

    #[test]
    fn test_keeps_repeated_headers() {
        let out = outbound_headers(&inbound(), "api.example.com", &interpolator());
        let values: Vec<_> = out.get_all("x-custom").iter().collect();
        assert_eq!(values, ["one", "two"]);
    }

    #[test]
    fn test_interpolates_for_allowed_host_only() {
        let allowed = outbound_headers(&inbound(), "api.example.com", &interpolator());
        assert_eq!(allowed["authorization"], "Bearer abc123");
        assert!(allowed["authorization"].is_sensitive());

        let denied = outbound_headers(&inbound(), "other.com", &interpolator());
        assert_eq!(denied["authorization"], "Bearer ${TOKEN}");
    }

    #[test]
    fn test_invalid_resolved_value_is_forwarded_unresolved() {
        let mut headers = HeaderMap::new();
        headers.insert("x-secret", HeaderValue::from_static("${BAD}"));

        let out = outbound_headers(&headers, "h", &interpolator());
        assert_eq!(out["x-secret"], "${BAD}");
    }

    #[test]
    fn test_response_headers_drop_connection_fields() {
        let mut upstream = HeaderMap::new();
        upstream.insert(CONNECTION, HeaderValue::from_static("close"));
        upstream.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        upstream.insert("content-type", HeaderValue::from_static("text/plain"));

        let headers = inbound_response_headers(&upstream);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["content-type"], "text/plain");
    }
}
