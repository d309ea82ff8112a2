//! The dispatch table.
//!
//! # Responsibilities
//! - Map (method, path) pairs to exactly one handler
//! - Mount the media source selected in config
//! - Answer everything else with 404 without touching an upstream
//!
//! # Design Decisions
//! - Built once at startup, immutable at runtime
//! - A disabled license scheme has no route at all
//! - No business logic here

use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::config::schema::{LicenseScheme, MediaSource};
use crate::config::ProxyConfig;
use crate::http::server::AppState;
use crate::player;
use crate::proxy::{license, media, MediaOrigin, TargetError};

pub const WIDEVINE_LICENSE_PATH: &str = "/license-proxy";
pub const PLAYREADY_LICENSE_PATH: &str = "/license-proxy/playready";
pub const STREAM_PREFIX: &str = "/stream";

/// Build the route table for `config`.
///
/// Fails when the CDN base URL cannot be parsed.
pub fn build_routes(config: &ProxyConfig, state: AppState) -> Result<Router, TargetError> {
    let mut router = Router::new();

    if config.license.is_enabled(LicenseScheme::Widevine) {
        router = router.route(WIDEVINE_LICENSE_PATH, post(license::widevine));
    }
    if config.license.is_enabled(LicenseScheme::PlayReady) {
        router = router.route(PLAYREADY_LICENSE_PATH, post(license::playready));
    }

    router = match &config.media.source {
        MediaSource::Cdn { base_url } => {
            let origin = Arc::new(MediaOrigin::new(base_url)?);
            router.route(
                "/stream/{*path}",
                get(media::stream).layer(Extension(origin)),
            )
        }
        MediaSource::Directory { path } => {
            tracing::info!(directory = %path, "Serving /stream from local directory");
            router.nest_service(STREAM_PREFIX, ServeDir::new(path))
        }
    };

    Ok(router
        .merge(player::routes(&config.player))
        .fallback(not_found)
        .with_state(state))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    tracing::warn!(path = %uri.path(), "No route matched");
    (StatusCode::NOT_FOUND, "No matching route found")
}
