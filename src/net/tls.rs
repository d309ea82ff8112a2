//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::TlsConfig;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("{kind} file not found: {}", path.display())]
    Missing { kind: &'static str, path: PathBuf },

    #[error("failed to load TLS material: {0}")]
    Load(#[from] std::io::Error),
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);

    for (kind, path) in [("Certificate", cert_path), ("Private key", key_path)] {
        if !path.exists() {
            return Err(TlsError::Missing {
                kind,
                path: path.to_path_buf(),
            });
        }
    }

    let tls = RustlsConfig::from_pem_file(cert_path, key_path).await?;
    tracing::info!(cert = %cert_path.display(), "TLS certificates loaded");
    Ok(tls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_certificate_is_reported_first() {
        let config = TlsConfig {
            cert_path: "/nonexistent/cert.pem".into(),
            key_path: "/nonexistent/key.pem".into(),
        };
        let err = load_tls_config(&config).await.unwrap_err();
        assert!(matches!(err, TlsError::Missing { kind: "Certificate", .. }));
    }

    #[tokio::test]
    async fn garbage_pem_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "not a certificate").unwrap();
        std::fs::write(&key, "not a key").unwrap();

        let config = TlsConfig {
            cert_path: cert.to_string_lossy().into_owned(),
            key_path: key.to_string_lossy().into_owned(),
        };
        assert!(matches!(
            load_tls_config(&config).await,
            Err(TlsError::Load(_))
        ));
    }
}
