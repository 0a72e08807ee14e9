//! Invocation envelope sent by the host on `/run`.

use crate::error::{ShimError, ShimResult};
use serde::Deserialize;
use serde_json::Value;

/// `{"value": ...}` wrapper carrying the action's argument.
///
/// The shim never looks inside `value`. A missing key decodes as `null`
/// and sibling keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InvocationRequest {
    #[serde(default)]
    pub value: Value,
}

impl InvocationRequest {
    /// Create an envelope around the given argument.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Decode an envelope from a raw request body.
    pub fn from_slice(body: &[u8]) -> ShimResult<Self> {
        serde_json::from_slice(body).map_err(ShimError::Decode)
    }

    /// Take the argument out of the envelope.
    pub fn into_value(self) -> Value {
        self.value
    }
}
