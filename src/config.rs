//! Configuration shared by all transactions.

use crate::{common::key, write};

use aws_sdk_dynamodb::types;
use std::{fmt, sync, time};

/// Attribute stamped with the transaction's timestamps.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TimestampField {
    /// Set on items created by a transaction, unless the item carries its own.
    CreatedAt,
    /// Set on every item updated by a transaction.
    UpdatedAt,
}

impl TimestampField {
    /// The attribute name of the field.
    pub fn attribute_name(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }
}

/// Provider of item modification timestamps.
pub type TimestampProvider =
    sync::Arc<dyn Fn(TimestampField) -> types::AttributeValue + Send + Sync>;

/// Current Unix time in milliseconds, as a number attribute.
pub fn unix_millis(_: TimestampField) -> types::AttributeValue {
    let millis = time::SystemTime::now()
        .duration_since(time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    types::AttributeValue::N(millis.to_string())
}

/// Configuration of the transaction engine.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_transact::{common::key, config};
/// use indexmap::IndexMap;
///
/// let schemas = key::KeySchemaCollection::new(IndexMap::from([(
///     "books".to_string(),
///     key::KeySchema::default(),
/// )]))
/// .unwrap();
/// let config = config::Config::new(schemas)
///     .with_split_transactions_if_above_limit(true)
///     .with_item_modification_timestamp(|_| AttributeValue::S("2024-01-01T00:00:00Z".to_string()));
/// ```
#[derive(Clone)]
pub struct Config {
    /// Key schemas of the known tables; the first one is the default table.
    ///
    /// Tables without a registered schema are keyed by `PK` and `SK`.
    pub schemas: key::KeySchemaCollection,
    /// Split transactions above the per-request operation limit into several requests.
    ///
    /// Each request is atomic on its own, the transaction as a whole is not.
    pub split_transactions_if_above_limit: bool,
    /// Provider of the `createdAt` and `updatedAt` values of new transactions.
    ///
    /// Called once per field when a transaction is constructed, so every item of the
    /// transaction carries the same timestamps. Defaults to [`unix_millis`].
    pub item_modification_timestamp: TimestampProvider,
    /// Default arguments of every transaction request.
    pub transact_write_args: write::common::TransactWriteArgs,
}

impl Config {
    /// Configuration with default settings for `schemas`.
    pub fn new(schemas: key::KeySchemaCollection) -> Self {
        Self {
            schemas,
            ..Default::default()
        }
    }

    /// Set whether oversized transactions are split into several requests.
    pub fn with_split_transactions_if_above_limit(mut self, split: bool) -> Self {
        self.split_transactions_if_above_limit = split;
        self
    }

    /// Set the provider of item modification timestamps.
    pub fn with_item_modification_timestamp(
        mut self,
        provider: impl Fn(TimestampField) -> types::AttributeValue + Send + Sync + 'static,
    ) -> Self {
        self.item_modification_timestamp = sync::Arc::new(provider);
        self
    }

    /// Set the default arguments of every transaction request.
    pub fn with_transact_write_args(mut self, args: write::common::TransactWriteArgs) -> Self {
        self.transact_write_args = args;
        self
    }

    pub(crate) fn timestamp(&self, field: TimestampField) -> types::AttributeValue {
        (self.item_modification_timestamp)(field)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schemas: key::KeySchemaCollection::default(),
            split_transactions_if_above_limit: false,
            item_modification_timestamp: sync::Arc::new(unix_millis),
            transact_write_args: write::common::TransactWriteArgs::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("schemas", &self.schemas)
            .field(
                "split_transactions_if_above_limit",
                &self.split_transactions_if_above_limit,
            )
            .field("transact_write_args", &self.transact_write_args)
            .finish_non_exhaustive()
    }
}
