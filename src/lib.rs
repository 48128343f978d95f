//! Auto-discovering router with request metrics and log statistics.
//!
//! ```text
//!   modules/ ──▶ discovery ──▶ axum Router ──▶ tracking middleware ──▶ event log
//!                                                                        │
//!                     admin endpoints / autorouter-cli ◀── statistics ◀──┘
//! ```

pub mod admin;
pub mod app;
pub mod config;
pub mod discovery;
pub mod event;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod statistics;
pub mod tracking;

pub use app::{AutoRouter, InitError};
pub use config::AutoRouterConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownSignal};
