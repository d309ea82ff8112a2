//! Response construction for relayed upstream replies.
//!
//! # Responsibilities
//! - Build license responses (opaque bytes, fixed content type)
//! - Copy the forwarded header subset from upstream responses
//! - Produce short log-safe previews of upstream error bodies
//!
//! # Design Decisions
//! - Only an explicit allow-list of upstream headers reaches the caller
//! - Hop-by-hop headers are never copied

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Headers relayed from a media origin besides `Content-Type`.
pub const FORWARDED_MEDIA_HEADERS: [HeaderName; 3] = [
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
];

/// A binary response carrying `status` and `body` untouched.
pub fn octet_stream(status: StatusCode, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(OCTET_STREAM),
    );
    response
}

/// Copy the media header subset from `upstream` into `target`.
///
/// `Content-Type` defaults to octet-stream when upstream omits it.
pub fn copy_media_headers(upstream: &HeaderMap, target: &mut HeaderMap) {
    let content_type = upstream
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(OCTET_STREAM));
    target.insert(header::CONTENT_TYPE, content_type);

    for name in FORWARDED_MEDIA_HEADERS {
        if let Some(value) = upstream.get(&name) {
            target.insert(name, value.clone());
        }
    }
}

/// First `limit` bytes of `body` as lossy UTF-8, for diagnostics.
pub fn preview(body: &[u8], limit: usize) -> String {
    let end = body.len().min(limit);
    String::from_utf8_lossy(&body[..end]).into_owned()
}
