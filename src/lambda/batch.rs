use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::{stream, FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::lambda::context::HandlerContext;
use crate::lambda::handler::panic_message;
use crate::observability::metrics::get_metrics;

/// Partial batch response: only the listed records are delivered again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub item_identifier: String,
}

impl BatchResponse {
    pub fn from_failures(identifiers: impl IntoIterator<Item = String>) -> Self {
        Self {
            batch_item_failures: identifiers
                .into_iter()
                .map(|item_identifier| BatchItemFailure { item_identifier })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batch_item_failures.is_empty()
    }
}

/// Record of a batch event, identified the way the platform expects in
/// `batchItemFailures`.
pub trait BatchRecord {
    fn item_identifier(&self) -> &str;
}

/// Event carrying a batch of records.
pub trait BatchEvent {
    type Record: BatchRecord + Clone + Send + Sync + 'static;

    /// Trigger name used in logs and metrics.
    const TRIGGER: &'static str;

    fn records(&self) -> &[Self::Record];
}

/// How many records are processed at the same time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Concurrency {
    #[default]
    Unbounded,
    Bounded(NonZeroUsize),
}

impl Concurrency {
    /// At most `limit` records at once, at least one.
    pub fn limit(limit: usize) -> Self {
        Concurrency::Bounded(NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN))
    }

    pub fn sequential() -> Self {
        Concurrency::Bounded(NonZeroUsize::MIN)
    }
}

/// Run `program` once per record of the event and collect the identifiers of
/// the records that failed. Every record is attempted whatever happens to the
/// others; a panicking record counts as failed.
pub async fn process_batch<Ev, R, P, Fut>(
    ctx: &HandlerContext<Ev, R>,
    program: &P,
    concurrency: Concurrency,
) -> BatchResponse
where
    Ev: BatchEvent,
    P: Fn(HandlerContext<Ev::Record, R>) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let records = ctx.event().records();
    debug!("processing {} {} records, concurrency {:?}", records.len(), Ev::TRIGGER, concurrency);

    // per-record futures own their record, nothing borrowed from the event
    let attempts = records.to_vec().into_iter().map(|record| {
        let identifier = record.item_identifier().to_owned();
        let record_ctx = ctx.with_event(record);
        async move {
            let outcome = AssertUnwindSafe(async { program(record_ctx).await })
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => {
                    warn!("{} record '{}' failed: {:#}", Ev::TRIGGER, identifier, err);
                    Some(identifier)
                }
                Err(panic) => {
                    error!(
                        "{} record '{}' panicked: {}",
                        Ev::TRIGGER,
                        identifier,
                        panic_message(panic.as_ref())
                    );
                    Some(identifier)
                }
            }
        }
    });

    let outcomes: Vec<Option<String>> = match concurrency {
        Concurrency::Unbounded => join_all(attempts).await,
        Concurrency::Bounded(limit) => stream::iter(attempts).buffer_unordered(limit.get()).collect().await,
    };

    let response = BatchResponse::from_failures(outcomes.into_iter().flatten());
    if !response.is_empty() {
        get_metrics()
            .await
            .batch_item_failures
            .with_label_values(&[Ev::TRIGGER])
            .inc_by(response.batch_item_failures.len() as u64);
    }
    response
}

/// Turn a single-record program into a whole-batch program answering with
/// the failed record identifiers.
pub fn record_processor_adapter<Ev, R, P, Fut>(
    program: P,
    concurrency: Concurrency,
) -> impl Fn(HandlerContext<Ev, R>) -> BoxFuture<'static, anyhow::Result<BatchResponse>> + Send + Sync + 'static
where
    Ev: BatchEvent + Send + Sync + 'static,
    R: Send + Sync + 'static,
    P: Fn(HandlerContext<Ev::Record, R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let program = Arc::new(program);
    move |ctx: HandlerContext<Ev, R>| {
        let program = program.clone();
        async move { Ok(process_batch(&ctx, program.as_ref(), concurrency).await) }.boxed()
    }
}
