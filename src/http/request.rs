//! Request identification.
//!
//! Every request gets an `x-request-id` (UUID v4) unless the client sent
//! one. The id is attached to the request's trace span and echoed on the
//! response.

use axum::body::Body;
use axum::http::{HeaderMap, Request};
use tracing::Span;

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The request id, or `"unknown"` when the header is absent or not ASCII.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span for one HTTP request.
pub fn make_request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id(request.headers()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_lookup() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");
        headers.insert(X_REQUEST_ID, "abc-123".parse().unwrap());
        assert_eq!(request_id(&headers), "abc-123");
    }
}
