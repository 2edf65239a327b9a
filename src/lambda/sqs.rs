//! SQS queue trigger.

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lambda::batch::{BatchEvent, BatchRecord};
use crate::lambda::context::HandlerContext;
use crate::lambda::handler::LambdaHandler;
use crate::lambda::lifecycle::{Lifecycle, Resources};
use crate::lambda::serde_ext::nullable;

pub const TRIGGER: &str = "sqs";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsMessage {
    pub message_id: String,
    #[serde(default)]
    pub receipt_handle: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, deserialize_with = "nullable")]
    pub attributes: HashMap<String, String>,
    #[serde(default, deserialize_with = "nullable")]
    pub message_attributes: HashMap<String, Value>,
    #[serde(default)]
    pub md5_of_body: String,
    #[serde(default)]
    pub event_source: String,
    #[serde(rename = "eventSourceARN", default)]
    pub event_source_arn: String,
    #[serde(default)]
    pub aws_region: String,
}

impl BatchRecord for SqsMessage {
    fn item_identifier(&self) -> &str {
        &self.message_id
    }
}

impl BatchEvent for SqsEvent {
    type Record = SqsMessage;
    const TRIGGER: &'static str = TRIGGER;

    fn records(&self) -> &[SqsMessage] {
        &self.records
    }
}

impl SqsEvent {
    pub fn message_bodies(&self) -> Vec<&str> {
        self.records.iter().map(|record| record.body.as_str()).collect()
    }
}

/// SQS handler; the program answers `()` or a partial batch response.
pub fn to_handler<O, R, F, Fut>(program: F, lifecycle: Lifecycle<R>) -> LambdaHandler<SqsEvent, O, R, F>
where
    O: Send + 'static,
    R: Resources,
    F: Fn(HandlerContext<SqsEvent, R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<O>> + Send,
{
    LambdaHandler::new(TRIGGER, program, lifecycle)
}
