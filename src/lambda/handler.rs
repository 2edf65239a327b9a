use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info_span, warn, Instrument};

use crate::lambda::authorizer::Unauthorized;
use crate::lambda::context::{HandlerContext, InvocationContext};
use crate::lambda::lifecycle::{Lifecycle, Resources};
use crate::observability::metrics::get_metrics;

/// What a handler reports back to the platform when an invocation fails.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// Custom authorizer denial, reported with the platform's own wording.
    #[error("Unauthorized")]
    Unauthorized,
    /// The program failed and did not handle the failure.
    #[error("invocation failed: {0:#}")]
    Failed(anyhow::Error),
    /// The program panicked.
    #[error("unhandled defect: {0}")]
    Defect(String),
    #[error("invalid invocation payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A program bound to its trigger and to the lifecycle of its capabilities.
///
/// Built once per deployed function and invoked for every event. Panics in the
/// program are logged and either replaced by the trigger's fallback output
/// (HTTP triggers answer 500) or reported as [`InvocationError::Defect`].
pub struct LambdaHandler<E, O, R, F> {
    trigger: &'static str,
    program: F,
    lifecycle: Lifecycle<R>,
    fallback: Option<fn() -> O>,
    _event: PhantomData<fn(E) -> O>,
}

impl<E, O, R, F, Fut> LambdaHandler<E, O, R, F>
where
    E: Send + 'static,
    O: Send + 'static,
    R: Resources,
    F: Fn(HandlerContext<E, R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<O>> + Send,
{
    /// Also registers the termination hook of `lifecycle`, once per lifecycle.
    pub fn new(trigger: &'static str, program: F, lifecycle: Lifecycle<R>) -> Self {
        if let Err(err) = lifecycle.install_shutdown_hook() {
            warn!("{} handler built without shutdown hook: {:#}", trigger, err);
        }
        Self {
            trigger,
            program,
            lifecycle,
            fallback: None,
            _event: PhantomData,
        }
    }

    /// Output returned instead of failing when the program panics.
    pub fn with_defect_fallback(mut self, fallback: fn() -> O) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn trigger(&self) -> &'static str {
        self.trigger
    }

    pub fn lifecycle(&self) -> &Lifecycle<R> {
        &self.lifecycle
    }

    pub async fn invoke(&self, event: E, invocation: InvocationContext) -> Result<O, InvocationError> {
        let span = info_span!("invocation", trigger = self.trigger, request_id = %invocation.aws_request_id);
        let ctx = HandlerContext::new(event, invocation, self.lifecycle.resources());
        let outcome = AssertUnwindSafe(async { (self.program)(ctx).await })
            .catch_unwind()
            .instrument(span.clone())
            .await;

        let metrics = get_metrics().await;
        let _entered = span.enter();
        match outcome {
            Ok(Ok(output)) => {
                metrics.invocations.with_label_values(&[self.trigger, "success"]).inc();
                Ok(output)
            }
            Ok(Err(failure)) if failure.is::<Unauthorized>() => {
                metrics.invocations.with_label_values(&[self.trigger, "unauthorized"]).inc();
                Err(InvocationError::Unauthorized)
            }
            Ok(Err(failure)) => {
                warn!("invocation failed: {:#}", failure);
                metrics.invocations.with_label_values(&[self.trigger, "failure"]).inc();
                Err(InvocationError::Failed(failure))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(defect = %message, "unhandled defect in program");
                metrics.invocations.with_label_values(&[self.trigger, "defect"]).inc();
                match self.fallback {
                    Some(fallback) => Ok(fallback()),
                    None => Err(InvocationError::Defect(message)),
                }
            }
        }
    }

    /// Invoke with the raw JSON payload of the platform, answering raw JSON.
    pub async fn invoke_json(&self, payload: Value, invocation: InvocationContext) -> Result<Value, InvocationError>
    where
        E: DeserializeOwned,
        O: Serialize,
    {
        let event: E = serde_json::from_value(payload)?;
        let output = self.invoke(event, invocation).await?;
        Ok(serde_json::to_value(output)?)
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_owned()
    }
}
