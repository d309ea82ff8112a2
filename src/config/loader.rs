//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{LicenseScheme, MediaSource, ProxyConfig, Secret, TlsConfig};
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_CDN_BASE_URL: &str = "DRM_PROXY_CDN_BASE_URL";
pub const ENV_BIND: &str = "DRM_PROXY_BIND";
pub const ENV_TLS_CERT: &str = "DRM_PROXY_TLS_CERT";
pub const ENV_TLS_KEY: &str = "DRM_PROXY_TLS_KEY";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read the optional TOML file and overlay the process environment.
/// The result is not validated yet.
pub fn read_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Load configuration, apply a command-line bind override on top of the
/// environment, then validate.
pub fn load_config(path: Option<&Path>, bind: Option<&str>) -> Result<ProxyConfig, ConfigError> {
    let mut config = read_config(path)?;
    if let Some(bind) = bind {
        config.listener.bind_address = bind.to_string();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables onto `config`. Empty values are ignored.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    for scheme in LicenseScheme::ALL {
        if let Some(token) = var(scheme.token_env()) {
            config.license.scheme_mut(scheme).token = Some(Secret::new(token));
        }
    }

    if let Some(base_url) = var(ENV_CDN_BASE_URL) {
        config.media.source = MediaSource::Cdn { base_url };
    }

    if let Some(bind) = var(ENV_BIND) {
        config.listener.bind_address = bind;
    }

    match (var(ENV_TLS_CERT), var(ENV_TLS_KEY)) {
        (Some(cert_path), Some(key_path)) => {
            config.listener.tls = Some(TlsConfig {
                cert_path,
                key_path,
            });
        }
        (None, None) => {}
        _ => tracing::warn!(
            "Only one of {} / {} is set; ignoring both",
            ENV_TLS_CERT,
            ENV_TLS_KEY
        ),
    }
}
