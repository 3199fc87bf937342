//! Input sanitization
//!
//! Strips `<` and `>` from every string value and every object key in JSON
//! request bodies and in query parameters before any handler sees them.
//!
//! The middleware buffers JSON bodies, rewrites them, and stores the cleaned
//! value as a [`SanitizedBody`] extension so later layers (the body logger)
//! do not have to parse again. Bodies that are not JSON pass through untouched;
//! handlers only accept JSON.

use axum::{
    body::Body,
    extract::Request,
    http::{header, uri::PathAndQuery, HeaderMap, HeaderValue, Uri},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};

use crate::api::middleware::ApiError;

/// Largest JSON body the sanitizer will buffer
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Marker written in place of redacted values
pub const REDACTED: &str = "[REDACTED]";

/// Top-level fields hidden from request logs
pub const SENSITIVE_FIELDS: [&str; 4] = ["password", "currentPassword", "newPassword", "confirmPassword"];

/// The cleaned JSON body of the current request
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedBody(pub Value);

#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("sanitized URI is invalid: {0}")]
    InvalidUri(String),
}

/// Remove every `<` and `>` from a string
pub fn sanitize_string(input: &str) -> String {
    input.chars().filter(|c| !matches!(c, '<' | '>')).collect()
}

/// Sanitize a JSON value recursively.
///
/// Keys and string values are cleaned; numbers, booleans and null are kept.
/// When two keys clean to the same string, the one visited last wins.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(b),
        Value::Number(n) => Value::Number(n),
        Value::String(s) => Value::String(sanitize_string(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => {
            let mut clean = Map::with_capacity(map.len());
            for (key, value) in map {
                clean.insert(sanitize_string(&key), sanitize_value(value));
            }
            Value::Object(clean)
        }
    }
}

/// Decode a raw query string into ordered key/value pairs.
///
/// `+` means space. A pair without `=` has an empty value. Invalid UTF-8 is
/// replaced with U+FFFD, the same way axum's `Query` extractor decodes it.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Sanitize query pairs.
///
/// The result has one entry per clean key, in first-seen order. A key that
/// changes is renamed, and its value replaces the value of a clean key with
/// the same name no matter which comes first. Otherwise the last value wins.
pub fn sanitize_query(pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    // (key, value, came from a renamed key)
    let mut clean: Vec<(String, String, bool)> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        let key_clean = sanitize_string(&key);
        let value_clean = sanitize_string(&value);
        let renamed = key_clean != key;

        match clean.iter_mut().find(|(k, _, _)| *k == key_clean) {
            Some(existing) if renamed || !existing.2 => {
                existing.1 = value_clean;
                existing.2 |= renamed;
            }
            Some(_) => {}
            None => clean.push((key_clean, value_clean, renamed)),
        }
    }
    clean.into_iter().map(|(k, v, _)| (k, v)).collect()
}

/// Encode pairs back into a query string
pub fn encode_query(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// JavaScript-style truthiness, used to decide whether a field holds a secret
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Copy of `body` with the password fields replaced by [`REDACTED`].
///
/// Only top-level fields of an object are touched; falsy values are kept.
pub fn redact_sensitive_fields(body: &Value) -> Value {
    let mut copy = body.clone();
    if let Value::Object(map) = &mut copy {
        for field in SENSITIVE_FIELDS {
            if let Some(value) = map.get_mut(field) {
                if is_truthy(value) {
                    *value = Value::String(REDACTED.to_string());
                }
            }
        }
    }
    copy
}

fn is_json_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn replace_query(uri: &Uri, query: &str) -> Result<Uri, SanitizeError> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| SanitizeError::InvalidUri(e.to_string()))?,
    );
    Uri::from_parts(parts).map_err(|e| SanitizeError::InvalidUri(e.to_string()))
}

/// Clean the query string of `uri`, returning a new URI only if something changed
fn sanitize_uri(uri: &Uri) -> Result<Option<Uri>, SanitizeError> {
    let Some(query) = uri.query() else {
        return Ok(None);
    };

    let pairs = parse_query(query);
    let clean = sanitize_query(pairs.clone());
    if clean == pairs {
        return Ok(None);
    }

    replace_query(uri, &encode_query(&clean)).map(Some)
}

/// Sanitization middleware
pub async fn sanitize_input(request: Request, next: Next) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    if let Some(uri) = sanitize_uri(&parts.uri).map_err(reject)? {
        parts.uri = uri;
    }

    let body = if is_json_request(&parts.headers) {
        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| reject(SanitizeError::BodyRead(e.to_string())))?;

        if bytes.is_empty() {
            Body::empty()
        } else {
            let value: Value = serde_json::from_slice(&bytes)
                .map_err(|e| reject(SanitizeError::InvalidBody(e)))?;
            let clean = sanitize_value(value);
            let encoded = serde_json::to_vec(&clean)
                .map_err(|e| reject(SanitizeError::InvalidBody(e)))?;

            parts
                .headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(encoded.len()));
            parts.extensions.insert(SanitizedBody(clean));
            Body::from(encoded)
        }
    } else {
        body
    };

    Ok(next.run(Request::from_parts(parts, body)).await)
}

fn reject(err: SanitizeError) -> ApiError {
    tracing::error!("Input sanitization failed: {}", err);
    ApiError::validation_error("Invalid request data")
}
