//! Process entry points.

use crate::action::{action_fn, Action};
use crate::error::{ShimError, ShimResult};
use crate::runtime::telemetry::init_tracing;
use crate::runtime::{ActionServer, ShimConfig};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::process;
use tracing::error;

/// Serve `callback` as the process's action on `0.0.0.0:8080`.
///
/// Call once from `main`, outside any tokio runtime. This never returns:
/// the server runs for the lifetime of the process, and a failure to bind
/// the port exits the process with status 1.
///
/// ```rust,no_run
/// use serde_json::{json, Value};
///
/// fn hello(params: Value) -> Result<Value, String> {
///     let name = params["name"].as_str().unwrap_or("stranger");
///     Ok(json!({ "greeting": format!("Hello {}!", name) }))
/// }
///
/// fn main() {
///     action_shim::register_action(hello);
/// }
/// ```
pub fn register_action<F, T, E>(callback: F) -> !
where
    F: Fn(Value) -> Result<T, E> + Send + Sync + 'static,
    T: Serialize + 'static,
    E: Display + 'static,
{
    run_action(ShimConfig::default(), action_fn(callback))
}

/// Serve any [`Action`] with the given configuration. Never returns.
pub fn run_action(config: ShimConfig, action: impl Action) -> ! {
    init_tracing();

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(ShimError::Runtime)
        .and_then(|runtime| runtime.block_on(serve(config, action)));

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            error!("Action shim stopped: {}", e);
            process::exit(1);
        }
    }
}

/// Serve `action` on the configured address until a fatal error.
pub async fn serve(config: ShimConfig, action: impl Action) -> ShimResult<()> {
    ActionServer::with_action(config, action).run().await
}
