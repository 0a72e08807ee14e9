//! Action trait and callback error type.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;

/// A serverless action invoked by the shim.
///
/// The shim hands the action the `value` of each invocation envelope
/// untouched and writes back whatever JSON document it returns. Actions
/// never see the HTTP request or response.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Run the action against one invocation's argument.
    async fn invoke(&self, value: Value) -> Result<Value, ActionError>;
}

#[async_trait]
impl<A: Action + ?Sized> Action for Arc<A> {
    async fn invoke(&self, value: Value) -> Result<Value, ActionError> {
        (**self).invoke(value).await
    }
}

#[async_trait]
impl<A: Action + ?Sized> Action for Box<A> {
    async fn invoke(&self, value: Value) -> Result<Value, ActionError> {
        (**self).invoke(value).await
    }
}

/// Ways an action invocation can fail.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action reported a failure. The message reaches the host verbatim.
    #[error("{0}")]
    Failed(String),

    /// The action's result could not be encoded as JSON.
    #[error("Error marshaling response: {0}")]
    Encode(#[source] serde_json::Error),

    /// The action panicked while running.
    #[error("action panicked: {0}")]
    Panicked(String),
}

impl ActionError {
    /// Create a failure carrying the given message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A task running an action ended without a result: it panicked or the
/// runtime cancelled it.
impl From<JoinError> for ActionError {
    fn from(err: JoinError) -> Self {
        if !err.is_panic() {
            return ActionError::failed("action was cancelled");
        }

        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        ActionError::Panicked(message)
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::Failed(message.to_string())
    }
}
