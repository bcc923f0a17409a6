/// Submission of compiled operations in atomic batches.
pub mod batch;

mod compile;

/// Pending operations and the builders refining them.
pub mod operation;

/// Reference items linking an item to the items it points at.
pub mod references;

use crate::{
    common::{expression, key},
    config,
    error::Result,
    write::{self, transaction::operation::ItemOperation},
};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::to_item;
use std::collections;

/// Arguments of a new transaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactionArgs {
    /// Table of operations that do not name one, instead of the default table.
    pub table_name: Option<String>,
    /// Value of `createdAt` on created items, instead of the configured provider's.
    pub created_at: Option<types::AttributeValue>,
    /// Value of `updatedAt` on updated items, instead of the configured provider's.
    pub updated_at: Option<types::AttributeValue>,
}

/// A set of write operations submitted together.
///
/// Operations are keyed by the identity of the item they target: a later operation on
/// the same item replaces the earlier one, except that updates of the same item merge.
///
/// ```rust,no_run
/// use dynamodb_transact::{common::key, config, write::transaction};
/// use indexmap::IndexMap;
/// use serde_json::json;
///
/// # async fn example(client: aws_sdk_dynamodb::Client) -> dynamodb_transact::error::Result<()> {
/// let schemas = key::KeySchemaCollection::new(IndexMap::from([(
///     "books".to_string(),
///     key::KeySchema::default(),
/// )]))?;
/// let config = config::Config::new(schemas);
///
/// let mut transaction = transaction::Transaction::new(&config)?;
/// transaction.create(json!({"PK": "User/1", "SK": "Book/1", "title": "Rust"}))?;
/// transaction
///     .update(json!({"PK": "User/1", "SK": "Stats"}))?
///     .adjust_number([("books", 1)])?;
/// transaction.execute(&client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Transaction<'c> {
    config: &'c config::Config,
    table_name: String,
    created_at: types::AttributeValue,
    updated_at: types::AttributeValue,
    pub(crate) operations: IndexMap<key::ItemIdentity, ItemOperation>,
}

impl<'c> Transaction<'c> {
    /// Empty transaction on the default table, stamped by the configured provider.
    pub fn new(config: &'c config::Config) -> Result<Self> {
        Self::with_args(config, TransactionArgs::default())
    }

    /// Empty transaction with explicit arguments.
    pub fn with_args(config: &'c config::Config, args: TransactionArgs) -> Result<Self> {
        let table_name = match args.table_name {
            Some(table_name) => table_name,
            None => config.schemas.default_table()?.to_string(),
        };
        let transaction = Self {
            config,
            table_name,
            created_at: args
                .created_at
                .unwrap_or_else(|| config.timestamp(config::TimestampField::CreatedAt)),
            updated_at: args
                .updated_at
                .unwrap_or_else(|| config.timestamp(config::TimestampField::UpdatedAt)),
            operations: IndexMap::new(),
        };
        Ok(transaction)
    }

    /// The table of operations that do not name one.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Number of pending operations, one per targeted item.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operation is pending.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub(crate) fn schema(&self, table: &str) -> &'c key::KeySchema {
        self.config.schemas.get(table)
    }

    fn resolve_key<K: Serialize>(
        &self,
        key: K,
        table: &str,
    ) -> Result<(key::ItemIdentity, collections::HashMap<String, types::AttributeValue>)> {
        let item: collections::HashMap<String, types::AttributeValue> = to_item(key)?;
        let schema = self.schema(table);
        let identity = schema.identity(table, &item)?;
        let key = schema.strip_key(table, &item)?;
        Ok((identity, key))
    }

    /// Put `item`, replacing any pending operation on it.
    pub fn create<I: Serialize>(&mut self, item: I) -> Result<operation::CreateBuilder<'_, 'c>> {
        self.create_with(item, write::common::WriteArgs::<()>::default())
    }

    /// Put `item` with explicit arguments.
    pub fn create_with<I, T>(
        &mut self,
        item: I,
        args: write::common::WriteArgs<T>,
    ) -> Result<operation::CreateBuilder<'_, 'c>>
    where
        I: Serialize,
        T: Serialize,
    {
        let item = to_item(item)?;
        let args = write::common::WriteInput::new(args, &self.table_name)?;
        let index = self.insert_create(item, args)?;
        Ok(operation::CreateBuilder {
            transaction: self,
            index,
        })
    }

    pub(crate) fn insert_create(
        &mut self,
        item: collections::HashMap<String, types::AttributeValue>,
        args: write::common::WriteInput,
    ) -> Result<usize> {
        let identity = self
            .schema(&args.table_name)
            .identity(&args.table_name, &item)?;
        let operation = operation::CreateOperation { item, args };
        let (index, _) = self
            .operations
            .insert_full(identity, ItemOperation::Create(operation));
        Ok(index)
    }

    /// Update the item identified by `key`.
    ///
    /// Repeated calls for the same item return builders of one merged update. Any other
    /// pending operation on the item is replaced by a new update.
    pub fn update<K: Serialize>(&mut self, key: K) -> Result<operation::UpdateBuilder<'_, 'c>> {
        self.update_with(key, write::common::WriteArgs::<()>::default())
    }

    /// Update the item identified by `key` with explicit arguments.
    ///
    /// When merging into a pending update, a condition or return value setting given
    /// here replaces the pending one.
    pub fn update_with<K, T>(
        &mut self,
        key: K,
        args: write::common::WriteArgs<T>,
    ) -> Result<operation::UpdateBuilder<'_, 'c>>
    where
        K: Serialize,
        T: Serialize,
    {
        let args = write::common::WriteInput::new(args, &self.table_name)?;
        let (identity, key) = self.resolve_key(key, &args.table_name)?;
        let index = match self.operations.get_full_mut(&identity) {
            Some((index, _, ItemOperation::Update(pending))) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(table = %args.table_name, "merging update into pending update");
                if args.condition.is_some() {
                    pending.args.condition = args.condition;
                }
                if args.return_values_on_condition_check_failure.is_some() {
                    pending.args.return_values_on_condition_check_failure =
                        args.return_values_on_condition_check_failure;
                }
                index
            }
            _ => {
                let updated_at = (
                    expression::AttributePath::from(
                        config::TimestampField::UpdatedAt.attribute_name(),
                    ),
                    self.updated_at.clone(),
                );
                let operation = operation::UpdateOperation {
                    key,
                    actions: vec![operation::UpdateAction::Set(vec![updated_at])],
                    args,
                };
                let (index, _) = self
                    .operations
                    .insert_full(identity, ItemOperation::Update(operation));
                index
            }
        };
        Ok(operation::UpdateBuilder {
            transaction: self,
            index,
        })
    }

    /// Delete the item identified by `key`, replacing any pending operation on it.
    pub fn delete<K: Serialize>(&mut self, key: K) -> Result<()> {
        self.delete_with(key, write::common::WriteArgs::<()>::default())
    }

    /// Delete the item identified by `key` with explicit arguments.
    pub fn delete_with<K, T>(&mut self, key: K, args: write::common::WriteArgs<T>) -> Result<()>
    where
        K: Serialize,
        T: Serialize,
    {
        let args = write::common::WriteInput::new(args, &self.table_name)?;
        let (identity, key) = self.resolve_key(key, &args.table_name)?;
        let operation = operation::DeleteOperation { key, args };
        self.operations
            .insert(identity, ItemOperation::Delete(operation));
        Ok(())
    }

    /// Check a condition on the item identified by `key` without modifying it.
    ///
    /// Nothing is recorded until [`matches`](operation::ConditionBuilder::matches) is called.
    pub fn add_condition_for<K, T>(&mut self, key: K) -> Result<operation::ConditionBuilder<'_, 'c, T>>
    where
        K: Serialize,
    {
        self.add_condition_for_with(key, write::common::WriteArgs::default())
    }

    /// Check a condition on the item identified by `key` with explicit arguments.
    ///
    /// The condition passed to [`matches`](operation::ConditionBuilder::matches) replaces
    /// any condition in `args`.
    pub fn add_condition_for_with<K, T>(
        &mut self,
        key: K,
        args: write::common::WriteArgs<T>,
    ) -> Result<operation::ConditionBuilder<'_, 'c, T>>
    where
        K: Serialize,
    {
        let table = args.table_name.as_deref().unwrap_or(&self.table_name);
        let (_, key) = self.resolve_key(key, table)?;
        Ok(operation::ConditionBuilder {
            transaction: self,
            key,
            args,
        })
    }

    /// Submit the transaction with the configured request arguments.
    pub async fn execute<W: batch::TransactWriter>(self, writer: &W) -> Result<batch::TransactionOutput> {
        self.execute_with(writer, write::common::TransactWriteArgs::default())
            .await
    }

    /// Submit the transaction.
    ///
    /// Condition checks are replicated into every batch when the transaction is split;
    /// batches are submitted one after another and a failure stops the remaining ones.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "transaction.execute",
            skip_all,
            fields(table = %self.table_name, operations = self.operations.len()),
            err
        )
    )]
    pub async fn execute_with<W: batch::TransactWriter>(
        self,
        writer: &W,
        args: write::common::TransactWriteArgs,
    ) -> Result<batch::TransactionOutput> {
        let args = args.with_defaults(&self.config.transact_write_args);
        let conditions = self
            .operations
            .values()
            .filter(|operation| operation.is_condition())
            .count();
        batch::validate(
            self.operations.len(),
            conditions,
            self.config.split_transactions_if_above_limit,
        )?;
        let mut items = Vec::with_capacity(self.operations.len());
        for operation in self.operations.into_values() {
            items.push(operation.compile(&self.created_at)?);
        }
        let batches = batch::plan(items, batch::OPERATIONS_LIMIT);
        batch::submit(writer, batches, &args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{common::condition, error::Error, write::transaction::batch::tests::RecordingWriter};

    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    #[fixture]
    fn books_config() -> config::Config {
        let schemas = key::KeySchemaCollection::new(IndexMap::from([
            ("books".to_string(), key::KeySchema::default()),
            (
                "users".to_string(),
                key::KeySchema {
                    hash: "id".to_string(),
                    range: None,
                },
            ),
        ]))
        .unwrap();
        config::Config::new(schemas).with_item_modification_timestamp(|field| match field {
            config::TimestampField::CreatedAt => types::AttributeValue::N("1".to_string()),
            config::TimestampField::UpdatedAt => types::AttributeValue::N("2".to_string()),
        })
    }

    fn equals(name: &str, value: Value) -> condition::ConditionInput<Value> {
        condition::ConditionInput::Expression {
            expression: format!("#{name} = :{name}"),
            values: vec![(name.to_string(), value)],
        }
    }

    fn request_items(writer: &RecordingWriter) -> Vec<Vec<types::TransactWriteItem>> {
        writer
            .requests()
            .into_iter()
            .map(|request| request.transact_items.unwrap_or_default())
            .collect()
    }

    #[rstest]
    fn test_default_table(books_config: config::Config) {
        let transaction = Transaction::new(&books_config).unwrap();
        assert_eq!(transaction.table_name(), "books");
        let transaction = Transaction::with_args(
            &books_config,
            TransactionArgs {
                table_name: Some("users".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(transaction.table_name(), "users");
        assert!(Transaction::new(&config::Config::default()).is_err());
    }

    #[rstest]
    fn test_last_writer_wins(books_config: config::Config) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        transaction
            .create(json!({"PK": "U/1", "SK": "B/1", "title": "a"}))
            .unwrap();
        transaction.create(json!({"PK": "U/1", "SK": "B/2"})).unwrap();
        transaction.delete(json!({"PK": "U/1", "SK": "B/1", "title": "ignored"})).unwrap();
        assert_eq!(transaction.len(), 2);
        assert!(matches!(
            transaction.operations.get_index(0),
            Some((_, ItemOperation::Delete(operation::DeleteOperation { key, .. })))
                if key.len() == 2
        ));
    }

    #[rstest]
    fn test_same_key_in_other_table(books_config: config::Config) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        transaction.delete(json!({"PK": "U/1", "SK": "B/1"})).unwrap();
        transaction
            .delete_with(
                json!({"PK": "U/1", "SK": "B/1"}),
                write::common::WriteArgs::<Value> {
                    table_name: Some("archive".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(transaction.len(), 2);
    }

    #[rstest]
    fn test_missing_key_attribute(books_config: config::Config) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        assert!(matches!(
            transaction.create(json!({"PK": "U/1"})),
            Err(Error::MissingKeyAttribute { .. })
        ));
        assert!(matches!(
            transaction.update_with(
                json!({"PK": "U/1"}),
                write::common::WriteArgs::<Value> {
                    table_name: Some("users".to_string()),
                    ..Default::default()
                },
            ),
            Err(Error::MissingKeyAttribute { attribute, .. }) if attribute == "id"
        ));
        assert!(transaction.is_empty());
    }

    #[rstest]
    fn test_condition_without_values(books_config: config::Config) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        let actual = transaction
            .add_condition_for(json!({"PK": "U/1", "SK": "B/1"}))
            .unwrap()
            .matches(condition::ConditionInput::<Value>::Expression {
                expression: "attribute_exists(#PK)".to_string(),
                values: Vec::new(),
            });
        assert!(matches!(actual, Err(Error::EmptyConditionValues)));
        assert!(transaction.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_create_stamps_created_at(books_config: config::Config) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        transaction.create(json!({"PK": "U/1", "SK": "B/1"})).unwrap();
        transaction
            .create(json!({"PK": "U/1", "SK": "B/2", "createdAt": 5}))
            .unwrap();
        let writer = RecordingWriter::default();
        transaction.execute(&writer).await.unwrap();

        let batches = request_items(&writer);
        assert_eq!(batches.len(), 1);
        let created_at: Vec<_> = batches[0]
            .iter()
            .map(|item| item.put().unwrap().item().get("createdAt").cloned())
            .collect();
        assert_eq!(
            created_at,
            vec![
                Some(types::AttributeValue::N("1".to_string())),
                Some(types::AttributeValue::N("5".to_string())),
            ]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_updates_of_one_item_merge(books_config: config::Config) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        transaction
            .update(json!({"PK": "U/1", "SK": "B/1"}))
            .unwrap()
            .set([("title", "New")])
            .unwrap();
        transaction
            .update(json!({"PK": "U/1", "SK": "B/1"}))
            .unwrap()
            .adjust_number([("reads", 1)])
            .unwrap();
        assert_eq!(transaction.len(), 1);

        let writer = RecordingWriter::default();
        transaction.execute(&writer).await.unwrap();
        let batches = request_items(&writer);
        let update = batches[0][0].update().unwrap();
        assert_eq!(update.update_expression(), "SET #0 = :0, #1 = :1 ADD #2 :2");
        assert_eq!(
            update.expression_attribute_names(),
            Some(&collections::HashMap::from([
                ("#0".to_string(), "updatedAt".to_string()),
                ("#1".to_string(), "title".to_string()),
                ("#2".to_string(), "reads".to_string()),
            ]))
        );
        assert_eq!(
            update.expression_attribute_values(),
            Some(&collections::HashMap::from([
                (":0".to_string(), types::AttributeValue::N("2".to_string())),
                (":1".to_string(), types::AttributeValue::S("New".to_string())),
                (":2".to_string(), types::AttributeValue::N("1".to_string())),
            ]))
        );
        assert_eq!(
            update.key(),
            &collections::HashMap::from([
                ("PK".to_string(), types::AttributeValue::S("U/1".to_string())),
                ("SK".to_string(), types::AttributeValue::S("B/1".to_string())),
            ])
        );
    }

    type Refine = for<'t, 'c> fn(
        operation::UpdateBuilder<'t, 'c>,
    ) -> Result<operation::UpdateBuilder<'t, 'c>>;

    fn untouched<'t, 'c>(
        builder: operation::UpdateBuilder<'t, 'c>,
    ) -> Result<operation::UpdateBuilder<'t, 'c>> {
        Ok(builder)
    }

    fn set_nothing<'t, 'c>(
        builder: operation::UpdateBuilder<'t, 'c>,
    ) -> Result<operation::UpdateBuilder<'t, 'c>> {
        builder.set(Vec::<(&str, Value)>::new())
    }

    fn remove_nothing<'t, 'c>(
        builder: operation::UpdateBuilder<'t, 'c>,
    ) -> Result<operation::UpdateBuilder<'t, 'c>> {
        builder.remove_attributes(Vec::<&str>::new())
    }

    fn add_no_members<'t, 'c>(
        builder: operation::UpdateBuilder<'t, 'c>,
    ) -> Result<operation::UpdateBuilder<'t, 'c>> {
        builder
            .add_items_to_set(Vec::<(&str, Value)>::new())?
            .delete_items_from_set(Vec::<(&str, Value)>::new())?
            .adjust_number(Vec::<(&str, Value)>::new())
    }

    #[rstest]
    #[case::bare(untouched)]
    #[case::empty_set(set_nothing)]
    #[case::empty_remove(remove_nothing)]
    #[case::empty_set_members(add_no_members)]
    #[tokio::test]
    async fn test_update_touches_timestamp_only(
        books_config: config::Config,
        #[case] refine: Refine,
    ) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        let builder = transaction
            .update(json!({"PK": "U/1", "SK": "B/1"}))
            .unwrap();
        refine(builder).unwrap();
        let writer = RecordingWriter::default();
        transaction.execute(&writer).await.unwrap();

        let batches = request_items(&writer);
        let update = batches[0][0].update().unwrap();
        assert_eq!(update.update_expression(), "SET #0 = :0");
        assert_eq!(
            update.expression_attribute_names(),
            Some(&collections::HashMap::from([(
                "#0".to_string(),
                "updatedAt".to_string()
            )]))
        );
        assert_eq!(
            update.expression_attribute_values(),
            Some(&collections::HashMap::from([(
                ":0".to_string(),
                types::AttributeValue::N("2".to_string())
            )]))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_update_replaces_other_operation(books_config: config::Config) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        transaction.create(json!({"PK": "U/1", "SK": "B/1"})).unwrap();
        transaction
            .update(json!({"PK": "U/1", "SK": "B/1"}))
            .unwrap()
            .remove_attributes(["draft"])
            .unwrap();
        let writer = RecordingWriter::default();
        transaction.execute(&writer).await.unwrap();
        let batches = request_items(&writer);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(
            batches[0][0].update().unwrap().update_expression(),
            "SET #0 = :0 REMOVE #1"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_update_with_condition(books_config: config::Config) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        transaction
            .update(json!({"PK": "U/1", "SK": "B/1"}))
            .unwrap()
            .on_condition(equals("status", json!("draft")))
            .unwrap()
            .set([("status", "published")])
            .unwrap();
        let writer = RecordingWriter::default();
        transaction.execute(&writer).await.unwrap();
        let batches = request_items(&writer);
        let update = batches[0][0].update().unwrap();
        assert_eq!(update.condition_expression(), Some("#status = :status"));
        assert_eq!(update.update_expression(), "SET #0 = :0, #1 = :1");
        let names = update.expression_attribute_names().unwrap();
        assert_eq!(names.get("#status").map(String::as_str), Some("status"));
        assert_eq!(names.get("#1").map(String::as_str), Some("status"));
        let values = update.expression_attribute_values().unwrap();
        assert_eq!(
            values.get(":status"),
            Some(&types::AttributeValue::S("draft".to_string()))
        );
        assert_eq!(
            values.get(":1"),
            Some(&types::AttributeValue::S("published".to_string()))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_set_operations(books_config: config::Config) {
        let mut transaction = Transaction::with_args(
            &books_config,
            TransactionArgs {
                updated_at: Some(types::AttributeValue::S("now".to_string())),
                ..Default::default()
            },
        )
        .unwrap();
        transaction
            .update(json!({"PK": "U/1", "SK": "B/1"}))
            .unwrap()
            .add_items_to_set([("tags", json!(["a", "b"]))])
            .unwrap()
            .delete_items_from_set([("tags", json!(["c"]))])
            .unwrap();
        let writer = RecordingWriter::default();
        transaction.execute(&writer).await.unwrap();
        let batches = request_items(&writer);
        let update = batches[0][0].update().unwrap();
        assert_eq!(update.update_expression(), "SET #0 = :0 ADD #1 :1 DELETE #1 :2");
        let values = update.expression_attribute_values().unwrap();
        assert_eq!(
            values.get(":0"),
            Some(&types::AttributeValue::S("now".to_string()))
        );
        assert_eq!(
            values.get(":1"),
            Some(&types::AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(
            values.get(":2"),
            Some(&types::AttributeValue::Ss(vec!["c".to_string()]))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_condition_check_and_delete(books_config: config::Config) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        transaction
            .add_condition_for_with(
                json!({"id": "1", "name": "ignored"}),
                write::common::WriteArgs {
                    table_name: Some("users".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .matches(equals("role", json!("admin")))
            .unwrap();
        transaction
            .delete_with(
                json!({"PK": "U/1", "SK": "B/1"}),
                write::common::WriteArgs {
                    condition: Some(equals("status", json!("draft"))),
                    ..Default::default()
                },
            )
            .unwrap();
        let writer = RecordingWriter::default();
        transaction.execute(&writer).await.unwrap();

        let batches = request_items(&writer);
        assert_eq!(batches.len(), 1);
        let check = batches[0][0].condition_check().unwrap();
        assert_eq!(check.table_name(), "users");
        assert_eq!(check.condition_expression(), "#role = :role");
        assert_eq!(
            check.key(),
            &collections::HashMap::from([(
                "id".to_string(),
                types::AttributeValue::S("1".to_string())
            )])
        );
        let delete = batches[0][1].delete().unwrap();
        assert_eq!(delete.table_name(), "books");
        assert_eq!(delete.condition_expression(), Some("#status = :status"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_empty_transaction_is_rejected(books_config: config::Config) {
        let writer = RecordingWriter::default();
        let actual = Transaction::new(&books_config).unwrap().execute(&writer).await;
        assert!(matches!(
            actual,
            Err(Error::InvalidOperationCount { count: 0, .. })
        ));
        assert!(writer.requests().is_empty());
    }

    #[rstest]
    #[case::without_splitting(false, None)]
    #[case::with_splitting(true, Some(vec![100, 1]))]
    #[tokio::test]
    async fn test_limit(
        books_config: config::Config,
        #[case] split: bool,
        #[case] expected: Option<Vec<usize>>,
    ) {
        let books_config = books_config.with_split_transactions_if_above_limit(split);
        let mut transaction = Transaction::new(&books_config).unwrap();
        for index in 0..101 {
            transaction
                .create(json!({"PK": "U/1", "SK": format!("B/{index}")}))
                .unwrap();
        }
        let writer = RecordingWriter::default();
        let actual = transaction.execute(&writer).await;
        let sizes: Vec<_> = request_items(&writer).iter().map(Vec::len).collect();
        match expected {
            Some(expected) => {
                assert!(actual.is_ok());
                assert_eq!(sizes, expected);
            }
            None => {
                assert!(matches!(
                    actual,
                    Err(Error::InvalidOperationCount { count: 101, limit: 100 })
                ));
                assert!(sizes.is_empty());
            }
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_conditions_replicated_in_every_batch(books_config: config::Config) {
        let books_config = books_config.with_split_transactions_if_above_limit(true);
        let mut transaction = Transaction::new(&books_config).unwrap();
        transaction
            .add_condition_for(json!({"PK": "U/1", "SK": "Profile"}))
            .unwrap()
            .matches(equals("active", json!(true)))
            .unwrap();
        for index in 0..150 {
            transaction
                .delete(json!({"PK": "U/1", "SK": format!("B/{index}")}))
                .unwrap();
        }
        let writer = RecordingWriter::default();
        transaction.execute(&writer).await.unwrap();

        let batches = request_items(&writer);
        let sizes: Vec<_> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 52]);
        for batch in &batches {
            assert!(batch[0].condition_check().is_some());
            assert!(batch[1..].iter().all(|item| item.delete().is_some()));
        }
        let first_delete = batches[1][1].delete().unwrap();
        assert_eq!(
            first_delete.key().get("SK"),
            Some(&types::AttributeValue::S("B/99".to_string()))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_condition_failure_submits_one_request(books_config: config::Config) {
        let mut transaction = Transaction::new(&books_config).unwrap();
        transaction
            .add_condition_for(json!({"PK": "U/1", "SK": "Profile"}))
            .unwrap()
            .matches(equals("active", json!(true)))
            .unwrap();
        transaction.create(json!({"PK": "U/1", "SK": "B/1"})).unwrap();
        let writer = RecordingWriter::default().failing_at(0);
        let actual = transaction.execute(&writer).await;
        assert!(actual.unwrap_err().is_condition_failed());
        let batches = request_items(&writer);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn test_execute_with_request_args(books_config: config::Config) {
        let books_config = books_config.with_transact_write_args(write::common::TransactWriteArgs {
            return_consumed_capacity: Some(types::ReturnConsumedCapacity::Total),
            ..Default::default()
        });
        let mut transaction = Transaction::new(&books_config).unwrap();
        transaction.create(json!({"PK": "U/1", "SK": "B/1"})).unwrap();
        let writer = RecordingWriter::default();
        transaction
            .execute_with(
                &writer,
                write::common::TransactWriteArgs {
                    return_item_collection_metrics: Some(types::ReturnItemCollectionMetrics::Size),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let request = &writer.requests()[0];
        assert_eq!(
            request.return_consumed_capacity(),
            Some(&types::ReturnConsumedCapacity::Total)
        );
        assert_eq!(
            request.return_item_collection_metrics(),
            Some(&types::ReturnItemCollectionMetrics::Size)
        );
    }
}
