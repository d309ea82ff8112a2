//! Player-facing routes: the HTML entry point, its static assets and the
//! optional token endpoint.
//!
//! `/config.json` hands the PX tokens to the browser so the player can build
//! license requests itself. It only exists when `player.expose_tokens` is set.

pub mod handlers;

use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;

use self::handlers::*;
use crate::config::schema::PlayerConfig;
use crate::http::server::AppState;

pub fn routes(config: &PlayerConfig) -> Router<AppState> {
    let mut router = Router::new().route("/", get(index));

    if config.expose_tokens {
        tracing::warn!("PX tokens are exposed at /config.json");
        router = router.route("/config.json", get(config_json));
    }

    if let Some(dir) = &config.static_dir {
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    router
}
