//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, trace, timeout)
//!     → tracked router (discovered route modules)
//!     → stats endpoints (when enabled, untracked)
//! ```

pub mod server;

pub use server::HttpServer;
