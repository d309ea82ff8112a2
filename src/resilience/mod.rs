//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (deadline around connect, send and response headers)
//!     → On expiry: ProxyError::Timeout → 504 to the caller
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: license challenges are single-shot and players retry
//!   segment fetches themselves

pub mod timeouts;
