//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EZDRM Widevine license endpoint.
pub const WIDEVINE_ENDPOINT: &str = "https://widevine-dash.ezdrm.com/proxy";

/// EZDRM PlayReady license endpoint.
pub const PLAYREADY_ENDPOINT: &str = "https://playready.ezdrm.com/cency/preauth.aspx";

/// Root configuration for the DRM proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// License service endpoints and credentials.
    pub license: LicenseConfig,

    /// Where `/stream` content comes from.
    pub media: MediaConfig,

    /// Outbound client settings shared by both forwarding paths.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Player page and static assets.
    pub player: PlayerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Optional TLS configuration. When set, the proxy only serves HTTPS.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// DRM protection schemes the proxy can acquire licenses for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseScheme {
    Widevine,
    PlayReady,
}

impl LicenseScheme {
    pub const ALL: [LicenseScheme; 2] = [LicenseScheme::Widevine, LicenseScheme::PlayReady];

    pub fn as_str(self) -> &'static str {
        match self {
            LicenseScheme::Widevine => "widevine",
            LicenseScheme::PlayReady => "playready",
        }
    }

    /// Environment variable carrying this scheme's PX token.
    pub fn token_env(self) -> &'static str {
        match self {
            LicenseScheme::Widevine => "EZDRM_WIDEVINE_PX",
            LicenseScheme::PlayReady => "EZDRM_PLAYREADY_PX",
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            LicenseScheme::Widevine => WIDEVINE_ENDPOINT,
            LicenseScheme::PlayReady => PLAYREADY_ENDPOINT,
        }
    }
}

impl fmt::Display for LicenseScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credential that must never show up in logs or debug output.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// License service configuration, one section per scheme.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LicenseConfig {
    pub widevine: SchemeConfig,
    pub playready: SchemeConfig,

    /// User-Agent sent on every license request.
    pub user_agent: String,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            widevine: SchemeConfig::default(),
            playready: SchemeConfig::default(),
            user_agent: concat!("drm-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LicenseConfig {
    pub fn scheme(&self, scheme: LicenseScheme) -> &SchemeConfig {
        match scheme {
            LicenseScheme::Widevine => &self.widevine,
            LicenseScheme::PlayReady => &self.playready,
        }
    }

    pub fn scheme_mut(&mut self, scheme: LicenseScheme) -> &mut SchemeConfig {
        match scheme {
            LicenseScheme::Widevine => &mut self.widevine,
            LicenseScheme::PlayReady => &mut self.playready,
        }
    }

    /// Whether the license route for `scheme` is served.
    ///
    /// Widevine is on unless switched off. PlayReady comes up once a token
    /// is supplied, or when enabled explicitly.
    pub fn is_enabled(&self, scheme: LicenseScheme) -> bool {
        let section = self.scheme(scheme);
        section.enabled.unwrap_or(match scheme {
            LicenseScheme::Widevine => true,
            LicenseScheme::PlayReady => section.token.is_some(),
        })
    }

    /// Endpoint for `scheme`, falling back to the EZDRM default.
    pub fn endpoint(&self, scheme: LicenseScheme) -> &str {
        self.scheme(scheme)
            .endpoint
            .as_deref()
            .unwrap_or(scheme.default_endpoint())
    }
}

/// Per-scheme license settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemeConfig {
    /// Explicit on/off switch; see [`LicenseConfig::is_enabled`].
    pub enabled: Option<bool>,

    /// License endpoint override.
    pub endpoint: Option<String>,

    /// PX access token.
    pub token: Option<Secret>,
}

/// Media configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MediaConfig {
    pub source: MediaSource,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            source: MediaSource::Cdn {
                base_url: String::new(),
            },
        }
    }
}

/// Backing store for `/stream/*`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    /// Forward to a CDN origin. Relative paths are joined onto `base_url`.
    Cdn { base_url: String },
    /// Serve packaged output from a local directory.
    Directory { path: String },
}

/// Outbound connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Deadline for connecting, sending and receiving response headers.
    /// Also bounds the gap between two media body chunks.
    pub timeout_secs: u64,

    /// TCP/TLS connect timeout.
    pub connect_timeout_secs: u64,

    /// Concurrent in-flight license requests.
    pub license_max_concurrent: usize,

    /// Concurrent in-flight media requests (including open streams).
    pub media_max_concurrent: usize,

    /// Idle pooled connections kept per upstream host.
    pub pool_idle_per_host: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            license_max_concurrent: 64,
            media_max_concurrent: 256,
            pool_idle_per_host: 32,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to produce response headers, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Mirror the caller's origin and allow credentials.
    pub enabled: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Player-facing routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// HTML page served at `/`.
    pub index_path: String,

    /// Directory mounted at `/static`.
    pub static_dir: Option<String>,

    /// Serve the PX tokens at `/config.json`.
    pub expose_tokens: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            index_path: "index.html".to_string(),
            static_dir: None,
            expose_tokens: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [license.widevine]
            token = "ABC123"

            [media.source.cdn]
            base_url = "https://cdn.example.com/videos/"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");
        assert!(config.license.is_enabled(LicenseScheme::Widevine));
        assert!(!config.license.is_enabled(LicenseScheme::PlayReady));
        assert_eq!(
            config.license.endpoint(LicenseScheme::Widevine),
            WIDEVINE_ENDPOINT
        );
        assert!(matches!(
            config.media.source,
            MediaSource::Cdn { ref base_url } if base_url == "https://cdn.example.com/videos/"
        ));
        assert_eq!(config.upstream.timeout_secs, 30);
    }

    #[test]
    fn playready_follows_its_token() {
        let mut license = LicenseConfig::default();
        assert!(!license.is_enabled(LicenseScheme::PlayReady));

        license.playready.token = Some(Secret::new("PR"));
        assert!(license.is_enabled(LicenseScheme::PlayReady));

        license.playready.enabled = Some(false);
        assert!(!license.is_enabled(LicenseScheme::PlayReady));
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let secret = Secret::new("78C2E8");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.expose(), "78C2E8");
    }

    #[test]
    fn directory_media_source() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [media.source.directory]
            path = "data"
            "#,
        )
        .unwrap();
        assert!(matches!(config.media.source, MediaSource::Directory { ref path } if path == "data"));
    }
}
