//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build shared application state from the validated config
//! - Wire up middleware (tracing, limits, request ID, CORS)
//! - Serve plain HTTP or HTTPS with graceful shutdown

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::config::schema::{LicenseScheme, PlayerConfig};
use crate::config::ProxyConfig;
use crate::http::request::{propagate_request_id_layer, request_span, set_request_id_layer};
use crate::proxy::{LicenseEndpoint, TargetError, UpstreamPool};
use crate::routing;

/// How long in-flight HTTPS connections may drain after shutdown starts.
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("invalid license user agent `{0}`")]
    UserAgent(String),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamPool>,
    pub widevine: Arc<LicenseEndpoint>,
    pub playready: Arc<LicenseEndpoint>,
    pub user_agent: HeaderValue,
    pub player: Arc<PlayerConfig>,
}

impl AppState {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ServerError> {
        let license = |scheme: LicenseScheme| {
            LicenseEndpoint::new(
                scheme,
                config.license.endpoint(scheme),
                config.license.scheme(scheme).token.clone(),
            )
            .map(Arc::new)
        };

        let user_agent = HeaderValue::from_str(&config.license.user_agent)
            .map_err(|_| ServerError::UserAgent(config.license.user_agent.clone()))?;

        Ok(Self {
            upstream: Arc::new(UpstreamPool::new(&config.upstream)?),
            widevine: license(LicenseScheme::Widevine)?,
            playready: license(LicenseScheme::PlayReady)?,
            user_agent,
            player: Arc::new(config.player.clone()),
        })
    }

    pub fn license(&self, scheme: LicenseScheme) -> &LicenseEndpoint {
        match scheme {
            LicenseScheme::Widevine => &self.widevine,
            LicenseScheme::PlayReady => &self.playready,
        }
    }
}

/// HTTP server for the DRM proxy.
pub struct HttpServer {
    router: Router,
    upstream: Arc<UpstreamPool>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails when a configured base URL cannot be parsed. A missing PX token
    /// is not an error here; the affected route answers 500 instead.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(&config)?;
        let upstream = state.upstream.clone();
        let router = Self::build_router(&config, state)?;
        Ok(Self { router, upstream })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The outer deadline answers 504 so an expired upstream exchange never
    /// surfaces as a client error.
    fn build_router(config: &ProxyConfig, state: AppState) -> Result<Router, ServerError> {
        let router = routing::build_routes(config, state)?
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(set_request_id_layer());

        if config.cors.enabled {
            Ok(router.layer(CorsLayer::very_permissive()))
        } else {
            Ok(router)
        }
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let upstream = self.upstream;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                upstream.close();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let handle = axum_server::Handle::new();
        let signal_handle = handle.clone();
        let upstream = self.upstream;
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            upstream.close();
            signal_handle.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
