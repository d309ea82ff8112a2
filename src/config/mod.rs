//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overlay: PX tokens, CDN base, TLS)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → turned into AppState once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{LicenseScheme, ListenerConfig, MediaSource, ProxyConfig, Secret, TlsConfig};
pub use validation::{validate_config, ValidationError};
