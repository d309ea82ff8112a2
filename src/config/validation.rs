//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject enabled license schemes without a PX token
//! - Validate base URLs, value ranges and file references
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{LicenseScheme, MediaSource, ProxyConfig};
use crate::proxy::target::{LicenseEndpoint, MediaOrigin, TargetError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("{0} license is enabled but {env} is not set", env = .0.token_env())]
    MissingToken(LicenseScheme),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("TLS {kind} file not found: {path}")]
    MissingTlsFile { kind: &'static str, path: String },

    #[error("media directory not found: {0}")]
    MissingMediaDirectory(String),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error(
        "timeouts.request_secs ({request_secs}) must exceed upstream.timeout_secs ({upstream_secs})"
    )]
    RequestDeadline { request_secs: u64, upstream_secs: u64 },
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        for (kind, path) in [("certificate", &tls.cert_path), ("key", &tls.key_path)] {
            if !Path::new(path).is_file() {
                errors.push(ValidationError::MissingTlsFile {
                    kind,
                    path: path.clone(),
                });
            }
        }
    }

    for scheme in LicenseScheme::ALL {
        if !config.license.is_enabled(scheme) {
            continue;
        }
        let section = config.license.scheme(scheme);
        match LicenseEndpoint::new(scheme, config.license.endpoint(scheme), section.token.clone()) {
            Ok(endpoint) if endpoint.token().is_none() => {
                errors.push(ValidationError::MissingToken(scheme));
            }
            Ok(_) => {}
            Err(e) => errors.push(e.into()),
        }
    }

    match &config.media.source {
        MediaSource::Cdn { base_url } => {
            if let Err(e) = MediaOrigin::new(base_url) {
                errors.push(e.into());
            }
        }
        MediaSource::Directory { path } => {
            if !Path::new(path).is_dir() {
                errors.push(ValidationError::MissingMediaDirectory(path.clone()));
            }
        }
    }

    let limits = [
        ("upstream.timeout_secs", config.upstream.timeout_secs as usize),
        ("upstream.connect_timeout_secs", config.upstream.connect_timeout_secs as usize),
        ("upstream.license_max_concurrent", config.upstream.license_max_concurrent),
        ("upstream.media_max_concurrent", config.upstream.media_max_concurrent),
        ("timeouts.request_secs", config.timeouts.request_secs as usize),
        ("security.max_body_size", config.security.max_body_size),
    ];
    for (name, value) in limits {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    // The upstream deadline must expire before the outer request deadline.
    let (request_secs, upstream_secs) = (config.timeouts.request_secs, config.upstream.timeout_secs);
    if request_secs > 0 && upstream_secs > 0 && request_secs <= upstream_secs {
        errors.push(ValidationError::RequestDeadline {
            request_secs,
            upstream_secs,
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
