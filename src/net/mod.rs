//! Network layer subsystem.
//!
//! Plain TCP listeners are bound in `main.rs` and handed to the HTTP server;
//! this module only covers the optional TLS layer.
//!
//! # Design Decisions
//! - TLS material is checked before binding, so a missing file is a startup
//!   failure rather than a handshake failure
//! - With TLS configured the proxy serves HTTPS only; browsers require a
//!   secure context for EME on anything but localhost

pub mod tls;
