//! The user-supplied action and the adapters that wrap plain closures.

pub mod adapter;
mod finite;
pub mod handler;

pub use adapter::{action_fn, async_action_fn, AsyncFnAction, FnAction};
pub use handler::{Action, ActionError};
