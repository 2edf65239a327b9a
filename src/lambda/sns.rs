//! SNS notification trigger.

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lambda::batch::{BatchEvent, BatchRecord};
use crate::lambda::context::HandlerContext;
use crate::lambda::handler::LambdaHandler;
use crate::lambda::lifecycle::{Lifecycle, Resources};
use crate::lambda::serde_ext::nullable;

pub const TRIGGER: &str = "sns";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SnsRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnsRecord {
    #[serde(default)]
    pub event_source: String,
    #[serde(default)]
    pub event_version: String,
    #[serde(default)]
    pub event_subscription_arn: String,
    pub sns: SnsMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnsMessage {
    pub message_id: String,
    #[serde(rename = "Type", default)]
    pub sns_message_type: String,
    #[serde(default)]
    pub topic_arn: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, deserialize_with = "nullable")]
    pub message_attributes: HashMap<String, Value>,
}

impl BatchRecord for SnsRecord {
    fn item_identifier(&self) -> &str {
        &self.sns.message_id
    }
}

impl BatchEvent for SnsEvent {
    type Record = SnsRecord;
    const TRIGGER: &'static str = TRIGGER;

    fn records(&self) -> &[SnsRecord] {
        &self.records
    }
}

impl SnsEvent {
    pub fn messages(&self) -> Vec<&str> {
        self.records.iter().map(|record| record.sns.message.as_str()).collect()
    }
}

/// SNS handler. Notifications expect no answer, a failure fails the invocation.
pub fn to_handler<R, F, Fut>(program: F, lifecycle: Lifecycle<R>) -> LambdaHandler<SnsEvent, (), R, F>
where
    R: Resources,
    F: Fn(HandlerContext<SnsEvent, R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    LambdaHandler::new(TRIGGER, program, lifecycle)
}
