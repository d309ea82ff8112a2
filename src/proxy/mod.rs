//! Forwarding proxy subsystem.
//!
//! # Data Flow
//! ```text
//! POST /license-proxy[/playready]
//!     → license.rs (token check, buffered challenge)
//!     → pool.rs (license budget, shared client)
//!     → license service → status + bytes relayed verbatim
//!
//! GET /stream/{*path}
//!     → target.rs (path validation, URL join below the CDN base)
//!     → pool.rs (media budget, shared client)
//!     → CDN → error short-circuit, or stream.rs (incremental relay)
//! ```
//!
//! # Design Decisions
//! - Stateless per request; the pool is the only shared resource
//! - Every upstream exchange runs under a deadline
//! - No retries on either path
//! - All failures become HTTP responses at this boundary

pub mod error;
pub mod license;
pub mod media;
pub mod pool;
pub mod stream;
pub mod target;

pub use error::ProxyError;
pub use pool::{UpstreamKind, UpstreamPool};
pub use target::{LicenseEndpoint, MediaOrigin, TargetError};
