//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and relays produce:
//!     → logging.rs (structured log events, request-id spans)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every span
//! - PX tokens are never logged; license URLs are logged without query

pub mod logging;
pub mod metrics;
