//! Adapters between serverless invocations and plain async programs.
//!
//! A program is an async function of [`context::HandlerContext`]: the event,
//! the invocation metadata and the capability set built once per deployed
//! handler by [`lifecycle::Lifecycle`]. Trigger modules wrap such programs into
//! [`handler::LambdaHandler`]s producing the shapes the platform expects.

pub mod authorizer;
pub mod batch;
pub mod body;
pub mod context;
pub mod dynamodb;
pub mod handler;
pub mod headers;
pub mod http_api;
pub mod lifecycle;
pub mod request;
pub mod rest_api;
pub mod sns;
pub mod sqs;
mod serde_ext;

pub use batch::{BatchItemFailure, BatchResponse, Concurrency};
pub use context::{HandlerContext, InvocationContext};
pub use handler::{InvocationError, LambdaHandler};
pub use lifecycle::{Lifecycle, Resources};
pub use request::ParseError;
