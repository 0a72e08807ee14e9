//! The invocation shim runtime: configuration, HTTP server and entry points.

mod config;
mod entry;
mod server;
mod telemetry;

pub use config::{ShimConfig, DEFAULT_PORT};
pub use entry::{register_action, run_action, serve};
pub use server::{ActionServer, BoundServer, INIT_PATH, RUN_PATH};
pub use telemetry::init_tracing;
