//! Shim error types.

use crate::action::ActionError;
use hyper::StatusCode;
use std::io;
use thiserror::Error;

/// Errors raised while serving the action.
#[derive(Debug, Error)]
pub enum ShimError {
    #[error("Error reading request body: {0}")]
    ReadBody(String),

    #[error("Error unmarshaling request: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("no action registered: adapter misconfigured")]
    NotRegistered,

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),
}

impl ShimError {
    /// HTTP status reported to the host for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ShimError::ReadBody(_) | ShimError::Decode(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type ShimResult<T> = Result<T, ShimError>;
