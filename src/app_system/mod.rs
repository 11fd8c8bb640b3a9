//! Web front: routing, views, startup and shutdown.

pub mod error;
pub mod server;
pub mod telemetry;
pub mod views;
pub mod web;

pub use server::serve;
pub use telemetry::setup_tracing;
pub use web::{router, AppState};
