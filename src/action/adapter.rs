//! Adapters turning plain closures into [`Action`]s.

use crate::action::finite;
use crate::action::handler::{Action, ActionError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A synchronous closure exposed as an action.
///
/// Each invocation runs on tokio's blocking pool so a slow callback does
/// not stall the connection tasks.
pub struct FnAction<F, T, E> {
    f: Arc<F>,
    _marker: PhantomData<fn() -> (T, E)>,
}

/// Wrap a synchronous closure as an action.
///
/// ```rust,no_run
/// use action_shim::action_fn;
/// use serde_json::{json, Value};
///
/// let action = action_fn(|value: Value| -> Result<Value, String> {
///     Ok(json!({ "echo": value }))
/// });
/// ```
pub fn action_fn<F, T, E>(f: F) -> FnAction<F, T, E>
where
    F: Fn(Value) -> Result<T, E> + Send + Sync + 'static,
    T: Serialize + 'static,
    E: Display + 'static,
{
    FnAction {
        f: Arc::new(f),
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, T, E> Action for FnAction<F, T, E>
where
    F: Fn(Value) -> Result<T, E> + Send + Sync + 'static,
    T: Serialize + 'static,
    E: Display + 'static,
{
    async fn invoke(&self, value: Value) -> Result<Value, ActionError> {
        let f = Arc::clone(&self.f);
        tokio::task::spawn_blocking(move || encode(f(value)))
            .await
            .unwrap_or_else(|err| Err(err.into()))
    }
}

/// An async closure exposed as an action.
pub struct AsyncFnAction<F, Fut, T, E> {
    f: F,
    _marker: PhantomData<fn() -> (Fut, T, E)>,
}

/// Wrap an async closure as an action.
pub fn async_action_fn<F, Fut, T, E>(f: F) -> AsyncFnAction<F, Fut, T, E>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Serialize + 'static,
    E: Display + 'static,
{
    AsyncFnAction {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, T, E> Action for AsyncFnAction<F, Fut, T, E>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Serialize + 'static,
    E: Display + 'static,
{
    async fn invoke(&self, value: Value) -> Result<Value, ActionError> {
        encode((self.f)(value).await)
    }
}

/// Convert a callback outcome into the shim's JSON document.
fn encode<T: Serialize, E: Display>(outcome: Result<T, E>) -> Result<Value, ActionError> {
    match outcome {
        Ok(result) => finite::to_value(&result).map_err(ActionError::Encode),
        Err(err) => Err(ActionError::Failed(err.to_string())),
    }
}
