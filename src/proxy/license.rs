//! License request forwarding.
//!
//! The DRM challenge is posted to the license service exactly as received and
//! whatever the service answers is handed back unchanged. DRM-level failures
//! (a malformed challenge, an unknown key) are the player's business, so
//! upstream 4xx/5xx replies are relayed, not translated.

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::time::Instant;

use crate::config::schema::LicenseScheme;
use crate::http::response::{self, OCTET_STREAM};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::pool::UpstreamKind;
use crate::resilience::timeouts::with_timeout;

const ROUTE: &str = "license";

/// Bytes of a failed upstream reply echoed into the log.
const ERROR_PREVIEW_BYTES: usize = 200;

/// `POST /license-proxy`
pub async fn widevine(State(state): State<AppState>, body: Bytes) -> Response {
    relay(&state, LicenseScheme::Widevine, body).await
}

/// `POST /license-proxy/playready`
pub async fn playready(State(state): State<AppState>, body: Bytes) -> Response {
    relay(&state, LicenseScheme::PlayReady, body).await
}

async fn relay(state: &AppState, scheme: LicenseScheme, body: Bytes) -> Response {
    let start = Instant::now();

    let response = match forward(state, scheme, body).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                ProxyError::MissingCredential(_) => tracing::error!(
                    scheme = %scheme,
                    variable = scheme.token_env(),
                    "License token is not configured"
                ),
                other => tracing::error!(
                    scheme = %scheme,
                    endpoint = %state.license(scheme).base(),
                    kind = other.kind(),
                    error = %other,
                    "License proxy error"
                ),
            }
            metrics::record_upstream_error(ROUTE, err.kind());
            err.into_response()
        }
    };

    metrics::record_request(ROUTE, response.status().as_u16(), start);
    response
}

async fn forward(state: &AppState, scheme: LicenseScheme, body: Bytes) -> Result<Response, ProxyError> {
    let endpoint = state.license(scheme);
    let url = endpoint.url()?.clone();

    tracing::info!(
        scheme = %scheme,
        size = body.len(),
        endpoint = %endpoint.base(),
        "Receiving license request, forwarding upstream"
    );

    let upstream = &state.upstream;
    let (status, payload) = with_timeout(upstream.timeout(), async {
        let _permit = upstream.acquire(UpstreamKind::License).await?;
        let reply = upstream
            .client()
            .post(url)
            .header(header::CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM))
            .header(header::USER_AGENT, state.user_agent.clone())
            .body(body)
            .send()
            .await
            .map_err(ProxyError::from_send)?;

        let status = reply.status();
        let payload = reply.bytes().await.map_err(ProxyError::from_body)?;
        Ok((status, payload))
    })
    .await?;

    if status == StatusCode::OK {
        tracing::info!(scheme = %scheme, size = payload.len(), "License server responded");
    } else {
        tracing::warn!(
            scheme = %scheme,
            status = status.as_u16(),
            preview = %response::preview(&payload, ERROR_PREVIEW_BYTES),
            "License server returned an error"
        );
    }

    Ok(response::octet_stream(status, payload))
}
