//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, serve loop)
//!     → request.rs (request ID, request span)
//!     → [routing table picks the handler]
//!     → response.rs (relay helpers, forwarded header subset)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};
