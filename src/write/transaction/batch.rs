use crate::{
    error::{Error, Result},
    write,
};

use aws_sdk_dynamodb::{Client, operation::transact_write_items, types};
use serde::de::DeserializeOwned;
use serde_dynamo::from_item;
use std::{collections, future::Future};

/// Maximum number of operations in a single transaction request.
pub const OPERATIONS_LIMIT: usize = 100;

/// Size estimate of one item collection touched by a transaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemCollectionSize {
    /// Partition key of the item collection.
    pub key: collections::HashMap<String, types::AttributeValue>,
    /// Lower and upper bound of the collection size, in gigabytes.
    pub size_estimate_range_gb: Vec<f64>,
}

impl ItemCollectionSize {
    /// Unmarshal the collection key into `T`.
    pub fn deserialize_key<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(from_item(self.key.clone())?)
    }
}

/// Item collection metrics of every batch, grouped by table name.
pub type TransactionOutput = collections::HashMap<String, Vec<ItemCollectionSize>>;

/// Sink of transaction requests.
///
/// Implemented for [`Client`]; any other implementation must apply each request atomically.
pub trait TransactWriter {
    /// Submit one request of at most [`OPERATIONS_LIMIT`] operations.
    fn submit(
        &self,
        input: transact_write_items::TransactWriteItemsInput,
    ) -> impl Future<Output = Result<transact_write_items::TransactWriteItemsOutput>> + Send;
}

impl TransactWriter for Client {
    fn submit(
        &self,
        input: transact_write_items::TransactWriteItemsInput,
    ) -> impl Future<Output = Result<transact_write_items::TransactWriteItemsOutput>> + Send {
        let request = self
            .transact_write_items()
            .set_transact_items(input.transact_items)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_client_request_token(input.client_request_token);
        async move { request.send().await.map_err(Error::from) }
    }
}

/// Check that the operations fit the request limit before anything is compiled.
pub(crate) fn validate(count: usize, conditions: usize, split: bool) -> Result<()> {
    let invalid = || Error::InvalidOperationCount {
        count,
        limit: OPERATIONS_LIMIT,
    };
    if count == 0 || (count > OPERATIONS_LIMIT && !split) {
        return Err(invalid());
    }
    // conditions are replicated into every batch and must leave room for the rest
    let others = count - conditions;
    if conditions > OPERATIONS_LIMIT || (others > 0 && conditions >= OPERATIONS_LIMIT) {
        return Err(invalid());
    }
    Ok(())
}

/// Split request elements into batches of at most `limit` elements.
///
/// Condition checks lead every batch; the other elements keep their order.
pub(crate) fn plan(
    items: Vec<types::TransactWriteItem>,
    limit: usize,
) -> Vec<Vec<types::TransactWriteItem>> {
    let (conditions, others): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| item.condition_check().is_some());
    if others.is_empty() {
        return vec![conditions];
    }
    let available = limit.saturating_sub(conditions.len()).max(1);
    others
        .chunks(available)
        .map(|chunk| conditions.iter().chain(chunk).cloned().collect())
        .collect()
}

/// Submit the batches one after another, stopping at the first failure.
pub(crate) async fn submit<W: TransactWriter>(
    writer: &W,
    batches: Vec<Vec<types::TransactWriteItem>>,
    args: &write::common::TransactWriteArgs,
) -> Result<TransactionOutput> {
    let total = batches.len();
    let mut output = TransactionOutput::new();
    for (index, batch) in batches.into_iter().enumerate() {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            batch = index + 1,
            batches = total,
            operations = batch.len(),
            "submitting transaction batch"
        );
        let input = transact_write_items::TransactWriteItemsInput::builder()
            .set_transact_items(Some(batch))
            .set_return_consumed_capacity(args.return_consumed_capacity.clone())
            .set_return_item_collection_metrics(args.return_item_collection_metrics.clone())
            .build()?;
        let response = match writer.submit(input).await {
            Ok(response) => response,
            Err(error) if index == 0 => return Err(error),
            Err(error) => {
                return Err(Error::PartialBatchFailure {
                    committed: index,
                    batches: total,
                    source: Box::new(error),
                });
            }
        };
        collect_metrics(&mut output, response);
    }
    Ok(output)
}

fn collect_metrics(
    output: &mut TransactionOutput,
    response: transact_write_items::TransactWriteItemsOutput,
) {
    let Some(metrics) = response.item_collection_metrics else {
        return;
    };
    for (table, metrics) in metrics {
        let sizes = output.entry(table).or_default();
        for metric in metrics {
            sizes.push(ItemCollectionSize {
                key: metric.item_collection_key.unwrap_or_default(),
                size_estimate_range_gb: metric.size_estimate_range_gb.unwrap_or_default(),
            });
        }
    }
}
