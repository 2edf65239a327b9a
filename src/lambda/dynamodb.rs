//! DynamoDB stream trigger.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lambda::batch::{BatchEvent, BatchRecord};
use crate::lambda::context::HandlerContext;
use crate::lambda::handler::LambdaHandler;
use crate::lambda::lifecycle::{Lifecycle, Resources};

pub const TRIGGER: &str = "dynamodb";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamoDbEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<DynamoDbRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamoDbRecord {
    #[serde(rename = "eventID", default)]
    pub event_id: String,
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub event_version: String,
    #[serde(default)]
    pub event_source: String,
    #[serde(default)]
    pub aws_region: String,
    #[serde(default)]
    pub dynamodb: StreamRecord,
    #[serde(rename = "eventSourceARN", default)]
    pub event_source_arn: String,
}

/// Attribute maps stay in their DynamoDB JSON form (`{"S": "..."}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamRecord {
    #[serde(default)]
    pub approximate_creation_date_time: Option<f64>,
    #[serde(default)]
    pub keys: Value,
    #[serde(default)]
    pub new_image: Option<Value>,
    #[serde(default)]
    pub old_image: Option<Value>,
    #[serde(default)]
    pub sequence_number: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub stream_view_type: String,
}

impl BatchRecord for DynamoDbRecord {
    /// Streams checkpoint on sequence numbers.
    fn item_identifier(&self) -> &str {
        &self.dynamodb.sequence_number
    }
}

impl BatchEvent for DynamoDbEvent {
    type Record = DynamoDbRecord;
    const TRIGGER: &'static str = TRIGGER;

    fn records(&self) -> &[DynamoDbRecord] {
        &self.records
    }
}

impl DynamoDbEvent {
    pub fn new_images(&self) -> Vec<Option<&Value>> {
        self.records
            .iter()
            .map(|record| record.dynamodb.new_image.as_ref())
            .collect()
    }
}

/// DynamoDB stream handler; the program answers `()` or a partial batch response.
pub fn to_handler<O, R, F, Fut>(program: F, lifecycle: Lifecycle<R>) -> LambdaHandler<DynamoDbEvent, O, R, F>
where
    O: Send + 'static,
    R: Resources,
    F: Fn(HandlerContext<DynamoDbEvent, R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<O>> + Send,
{
    LambdaHandler::new(TRIGGER, program, lifecycle)
}
