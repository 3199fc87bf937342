//! Request logging
//!
//! `log_request` wraps the whole stack and emits one `info` event per request.
//! `log_request_body` runs after sanitization and emits the redacted JSON body
//! of non-GET requests at `debug`. Other bodies are logged by type and size
//! only.

use axum::{
    extract::Request,
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::api::sanitize::{redact_sensitive_fields, SanitizedBody};

/// Log method, path, status and duration of every request
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}

/// Log the redacted body of non-GET requests
pub async fn log_request_body(request: Request, next: Next) -> Response {
    if request.method() != Method::GET {
        if let Some(SanitizedBody(body)) = request.extensions().get::<SanitizedBody>() {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                body = %redact_sensitive_fields(body),
                "request body"
            );
        } else if let Some(bytes) = content_length(&request).filter(|n| *n > 0) {
            let content_type = request
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                content_type,
                bytes,
                "request body (not JSON, contents not logged)"
            );
        }
    }

    next.run(request).await
}

fn content_length(request: &Request) -> Option<u64> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
