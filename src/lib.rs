//! # action-shim - serve a Rust function as a serverless action
//!
//! The host platform starts the action's process, polls `/init` until it
//! answers, then posts each invocation to `/run` as `{"value": ...}`. The
//! shim hands `value` to the registered function and writes back its
//! result, or `{"error": "..."}` when anything goes wrong.
//!
//! ```text
//!   host ──POST /run {"value": X}──▶ ┌──────────────────┐
//!                                    │   ActionServer   │── X ──▶ action(X)
//!   host ◀──200 application/json──── │  (hyper, tokio)  │◀─ Ok(Y) / Err(msg)
//!            Content-Length: |Y|     └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use serde_json::{json, Value};
//!
//! fn hello(params: Value) -> Result<Value, String> {
//!     match params["name"].as_str() {
//!         Some(name) => Ok(json!({ "greeting": format!("Hello {}!", name) })),
//!         None => Err("missing name".to_string()),
//!     }
//! }
//!
//! fn main() {
//!     action_shim::register_action(hello);
//! }
//! ```
//!
//! ## Wire contract
//!
//! | Path    | Success                          | Failure                     |
//! |---------|----------------------------------|-----------------------------|
//! | `/init` | 200 `{"ok":true}`                | n/a                         |
//! | `/run`  | 200, JSON-encoded action result  | 400 / 500 `{"error": "..."}`|
//!
//! Every response is `application/json` and carries an explicit
//! `Content-Length`. The host treats a chunked response as an action that
//! exited unexpectedly, so the shim never produces one.
//!
//! For embedding or testing, build an [`ActionServer`] directly, bind it on
//! an ephemeral port and stop it through a `tokio::sync::watch` channel.

pub mod action;
pub mod error;
pub mod http;
pub mod runtime;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::action::{action_fn, async_action_fn, Action, ActionError};
    pub use crate::error::{ShimError, ShimResult};
    pub use crate::http::{ErrorEnvelope, InvocationRequest, ShimResponse};
    pub use crate::runtime::{register_action, serve, ActionServer, BoundServer, ShimConfig};
    pub use async_trait::async_trait;
    pub use serde_json::Value;
}

pub use action::{action_fn, async_action_fn, Action, ActionError};
pub use error::{ShimError, ShimResult};
pub use http::{ErrorEnvelope, InvocationRequest, ShimResponse};
pub use runtime::{register_action, run_action, serve, ActionServer, BoundServer, ShimConfig};
