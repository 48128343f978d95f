//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Ctrl+C / SIGTERM → latched watch flag → server drains → final report
//! ```

pub mod shutdown;

pub use shutdown::{wait_for_signal, Shutdown, ShutdownSignal};
