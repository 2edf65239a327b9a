use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Invocation metadata handed over by the function runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvocationContext {
    pub aws_request_id: String,
    pub function_name: String,
    pub function_version: String,
    pub invoked_function_arn: String,
    pub memory_limit_in_mb: Option<u32>,
    pub log_group_name: String,
    pub log_stream_name: String,
    /// unix milliseconds after which the platform kills the invocation
    pub deadline_ms: Option<i64>,
}

impl InvocationContext {
    pub fn new(aws_request_id: impl Into<String>) -> Self {
        Self {
            aws_request_id: aws_request_id.into(),
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline_ms = Some(deadline.timestamp_millis());
        self
    }

    /// Time left before the deadline, zero once passed.
    pub fn remaining_time(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.deadline_ms.map(|deadline| {
            let left = deadline.saturating_sub(now.timestamp_millis());
            Duration::from_millis(left.max(0) as u64)
        })
    }
}

/// Everything a program can reach: the event, the invocation metadata and
/// the capability set shared by all invocations of the handler.
#[derive(Debug)]
pub struct HandlerContext<E, R = ()> {
    event: E,
    invocation: InvocationContext,
    resources: Arc<R>,
}

impl<E, R> HandlerContext<E, R> {
    pub fn new(event: E, invocation: InvocationContext, resources: Arc<R>) -> Self {
        Self { event, invocation, resources }
    }

    pub fn event(&self) -> &E {
        &self.event
    }

    pub fn invocation(&self) -> &InvocationContext {
        &self.invocation
    }

    pub fn resources(&self) -> &R {
        &self.resources
    }

    pub fn shared_resources(&self) -> Arc<R> {
        self.resources.clone()
    }

    pub fn into_event(self) -> E {
        self.event
    }

    /// Same invocation and resources around another event, e.g. one batch record.
    pub fn with_event<T>(&self, event: T) -> HandlerContext<T, R> {
        HandlerContext {
            event,
            invocation: self.invocation.clone(),
            resources: self.resources.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn remaining_time_never_negative() {
        let now = Utc::now();
        let ctx = InvocationContext::new("req-1").with_deadline(now + TimeDelta::seconds(3));
        assert_eq!(ctx.remaining_time(now), Some(Duration::from_secs(3)));
        assert_eq!(ctx.remaining_time(now + TimeDelta::seconds(10)), Some(Duration::ZERO));
        assert_eq!(InvocationContext::new("req-2").remaining_time(now), None);
    }

    #[test]
    fn event_and_invocation_are_independent_inputs() {
        let ctx = HandlerContext::new(41u32, InvocationContext::new("req-1"), Arc::new("db"));
        let record_ctx = ctx.with_event("record");
        assert_eq!(*ctx.event(), 41);
        assert_eq!(*record_ctx.event(), "record");
        assert_eq!(record_ctx.invocation().aws_request_id, "req-1");
        assert_eq!(*record_ctx.resources(), "db");
    }
}
