//! Upstream targets and URL construction.
//!
//! Every outbound URL is derived from a base parsed once at startup. The PX
//! token is attached as an escaped query pair and media paths are appended
//! segment by segment, so caller input can never rewrite the authority or
//! climb above the configured base.

use thiserror::Error;
use url::Url;

use crate::config::schema::{LicenseScheme, Secret};
use crate::proxy::error::ProxyError;

/// Query parameter carrying the PX token.
pub const TOKEN_PARAM: &str = "pX";

/// Why a configured base URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("{target} URL `{url}` is invalid: {source}")]
    Parse {
        target: &'static str,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{target} URL `{url}` must use http or https")]
    Scheme { target: &'static str, url: String },

    #[error("{target} URL `{url}` cannot carry a path")]
    NotABase { target: &'static str, url: String },
}

fn parse_base(target: &'static str, raw: &str) -> Result<Url, TargetError> {
    let url = Url::parse(raw).map_err(|source| TargetError::Parse {
        target,
        url: raw.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TargetError::Scheme {
            target,
            url: raw.to_string(),
        });
    }
    if url.cannot_be_a_base() {
        return Err(TargetError::NotABase {
            target,
            url: raw.to_string(),
        });
    }
    Ok(url)
}

/// A license service endpoint bound to one scheme's credential.
#[derive(Debug, Clone)]
pub struct LicenseEndpoint {
    scheme: LicenseScheme,
    base: Url,
    token: Option<Secret>,
    /// `base` with the token attached; `None` while the token is missing.
    resolved: Option<Url>,
}

impl LicenseEndpoint {
    pub fn new(
        scheme: LicenseScheme,
        endpoint: &str,
        token: Option<Secret>,
    ) -> Result<Self, TargetError> {
        let base = parse_base("license endpoint", endpoint)?;
        let token = token.filter(|t| !t.is_empty());
        let resolved = token.as_ref().map(|token| {
            let mut url = base.clone();
            url.query_pairs_mut()
                .append_pair(TOKEN_PARAM, token.expose());
            url
        });

        Ok(Self {
            scheme,
            base,
            token,
            resolved,
        })
    }

    pub fn scheme(&self) -> LicenseScheme {
        self.scheme
    }

    /// Endpoint without credentials, safe to log.
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn token(&self) -> Option<&Secret> {
        self.token.as_ref()
    }

    /// The full upstream URL, or a configuration error if no token is set.
    pub fn url(&self) -> Result<&Url, ProxyError> {
        self.resolved
            .as_ref()
            .ok_or(ProxyError::MissingCredential(self.scheme))
    }
}

/// CDN origin that media paths are resolved against.
#[derive(Debug, Clone)]
pub struct MediaOrigin {
    base: Url,
}

impl MediaOrigin {
    pub fn new(base_url: &str) -> Result<Self, TargetError> {
        Ok(Self {
            base: parse_base("CDN base", base_url)?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a caller-supplied relative path below the base.
    pub fn resolve(&self, path: &str) -> Result<Url, ProxyError> {
        let segments = media_segments(path)?;
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ProxyError::InvalidMediaPath(path.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Split a relative media path into segments, rejecting anything that could
/// escape the base directory.
pub fn media_segments(path: &str) -> Result<Vec<&str>, ProxyError> {
    let invalid = || ProxyError::InvalidMediaPath(path.to_string());

    if path.is_empty() || path.starts_with('/') {
        return Err(invalid());
    }

    path.split('/')
        .map(|segment| match segment {
            "" | "." | ".." => Err(invalid()),
            s if s.contains('\\') || s.chars().any(char::is_control) => Err(invalid()),
            s => Ok(s),
        })
        .collect()
}
