//! Media segment forwarding.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use std::sync::Arc;
use std::time::Instant;

use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::pool::UpstreamKind;
use crate::proxy::stream::relay_body;
use crate::proxy::target::MediaOrigin;
use crate::resilience::timeouts::with_timeout;

const ROUTE: &str = "media";

/// `GET /stream/{*path}`, mounted only for a CDN media source.
pub async fn stream(
    State(state): State<AppState>,
    Extension(origin): Extension<Arc<MediaOrigin>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();

    let response = match forward(&state, &origin, &path, &headers).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                ProxyError::InvalidMediaPath(_) => {
                    tracing::warn!(path = %path, "Rejected media path")
                }
                other => tracing::error!(
                    path = %path,
                    origin = %origin.base(),
                    kind = other.kind(),
                    error = %other,
                    "CDN proxy connection failed"
                ),
            }
            metrics::record_upstream_error(ROUTE, err.kind());
            err.into_response()
        }
    };

    metrics::record_request(ROUTE, response.status().as_u16(), start);
    response
}

async fn forward(
    state: &AppState,
    origin: &MediaOrigin,
    path: &str,
    headers: &HeaderMap,
) -> Result<Response, ProxyError> {
    let url = origin.resolve(path)?;
    tracing::info!(url = %url, "Forwarding media request to CDN");

    let upstream = &state.upstream;
    let (permit, reply) = with_timeout(upstream.timeout(), async {
        let permit = upstream.acquire(UpstreamKind::Media).await?;
        let mut request = upstream.client().get(url.clone());
        if let Some(range) = headers.get(header::RANGE) {
            request = request.header(header::RANGE, range.clone());
        }
        let reply = request.send().await.map_err(ProxyError::from_send)?;
        Ok((permit, reply))
    })
    .await?;

    let status = reply.status();
    if status.as_u16() >= 400 {
        // The error body is dropped along with `reply`; it is not media.
        tracing::warn!(url = %url, status = status.as_u16(), "CDN returned an error");
        return Ok((status, format!("CDN Error: {}", status.as_u16())).into_response());
    }

    let mut forwarded = HeaderMap::new();
    response::copy_media_headers(reply.headers(), &mut forwarded);

    let body = relay_body(
        reply,
        permit,
        UpstreamKind::Media,
        upstream.timeout(),
        url.path().to_string(),
    );

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = forwarded;
    Ok(response)
}
