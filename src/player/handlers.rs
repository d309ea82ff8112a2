//! Player page handlers.
//!
//! # Responsibilities
//! - Serve the HTML entry point from `player.index_path`, read per request
//! - Hand the PX tokens to the browser as JSON when exposure is enabled
//!
//! # Design Decisions
//! - A missing page is a 404 with a fixed text body, other read errors a 500
//! - Blank tokens are reported as `null`, never as empty strings

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::io::ErrorKind;

use crate::http::server::AppState;
use crate::proxy::LicenseEndpoint;

/// Token payload consumed by the browser player.
#[derive(Debug, Serialize)]
pub struct PlayerTokens {
    #[serde(rename = "EZDRM_WIDEVINE_PX")]
    pub widevine: Option<String>,
    #[serde(rename = "EZDRM_PLAYREADY_PX")]
    pub playready: Option<String>,
}

pub async fn index(State(state): State<AppState>) -> Response {
    let path = &state.player.index_path;
    match tokio::fs::read_to_string(path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path, "Player page not found");
            (StatusCode::NOT_FOUND, "Error: index.html not found").into_response()
        }
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Failed to read player page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error: index.html unreadable").into_response()
        }
    }
}

pub async fn config_json(State(state): State<AppState>) -> Json<PlayerTokens> {
    let token = |endpoint: &LicenseEndpoint| endpoint.token().map(|t| t.expose().to_string());
    Json(PlayerTokens {
        widevine: token(&*state.widevine),
        playready: token(&*state.playready),
    })
}
