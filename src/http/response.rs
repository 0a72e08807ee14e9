//! JSON responses written back to the host.

use crate::http::body::MeteredBody;
use bytes::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

pub const APPLICATION_JSON: &str = "application/json";

/// `{"error": ...}` body used for every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// A fully encoded JSON response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Encoded JSON body.
    pub body: Bytes,
}

impl ShimResponse {
    /// Create a response from an already encoded JSON body.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Encode a successful action result.
    pub fn json(value: &Value) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(StatusCode::OK, body))
    }

    /// Build an Error Envelope response.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        let envelope = ErrorEnvelope::new(message);
        warn!("action error: {}", envelope.error);

        match serde_json::to_vec(&envelope) {
            Ok(body) => Self::new(status, body),
            Err(e) => {
                error!("error marshalling error response: {}", e);
                Self::new(status, Bytes::from_static(br#"{"error":"internal error"}"#))
            }
        }
    }

    /// Exact byte length of the body.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// Convert into a hyper response with an explicit `Content-Length`.
    pub fn into_hyper(self) -> Response<MeteredBody> {
        let length = self.content_length();
        let mut response = Response::new(MeteredBody::new(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        response
    }
}
