//! Wire types for the host's invocation protocol.

mod body;
mod request;
mod response;

pub use body::MeteredBody;
pub use request::InvocationRequest;
pub use response::{ErrorEnvelope, ShimResponse, APPLICATION_JSON};
