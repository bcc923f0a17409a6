use crate::{
    common::{self, condition},
    error::{Error, Result},
};

use aws_sdk_dynamodb::types;
use serde::Serialize;

/// Internal representation of per-operation arguments.
///
/// Holds the resolved table name and the compiled condition, ready to be applied
/// to a `Put`, `Delete` or `ConditionCheck` builder.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition: Option<common::ExpressionInput>,
    pub(crate) return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    pub(crate) table_name: String,
}

impl WriteInput {
    pub(crate) fn new<T: Serialize>(write_args: WriteArgs<T>, default_table: &str) -> Result<Self> {
        let condition = write_args
            .condition
            .map(common::ExpressionInput::try_from)
            .transpose()?;
        let operation = Self {
            condition,
            return_values_on_condition_check_failure: write_args
                .return_values_on_condition_check_failure,
            table_name: write_args
                .table_name
                .unwrap_or_else(|| default_table.to_string()),
        };
        Ok(operation)
    }
}

/// Arguments of a single operation within a transaction.
///
/// ```rust
/// use dynamodb_transact::{common::condition, write};
///
/// let args = write::common::WriteArgs {
///     condition: Some(condition::ConditionInput::Expression {
///         expression: "#status = :status".to_string(),
///         values: vec![("status".to_string(), "active".to_string())],
///     }),
///     table_name: Some("users".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct WriteArgs<T> {
    /// Condition that must hold for the operation to succeed.
    ///
    /// A false condition cancels the whole request, so none of the other operations
    /// submitted with it are applied either.
    pub condition: Option<condition::ConditionInput<T>>,
    /// Which item attributes to return if the condition check fails.
    ///
    /// The returned attributes are reported in the cancellation reasons of the error.
    pub return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    /// The table to write to, instead of the transaction's table.
    pub table_name: Option<String>,
}

impl<T> Default for WriteArgs<T> {
    fn default() -> Self {
        Self {
            condition: None,
            return_values_on_condition_check_failure: None,
            table_name: None,
        }
    }
}

impl<T> WriteArgs<T> {
    /// Fail unless the operation carries a condition with comparison data.
    pub(crate) fn require_condition(&self) -> Result<()> {
        match &self.condition {
            Some(condition) if !condition.is_empty() => Ok(()),
            _ => Err(Error::EmptyConditionValues),
        }
    }
}

/// Request-level arguments of a transaction submission.
///
/// Arguments passed to `execute` take precedence over the configured defaults, field by field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactWriteArgs {
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Whether to return item collection metrics.
    ///
    /// Set to `Size` to receive the per-table metrics aggregated by `execute`.
    pub return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
}

impl TransactWriteArgs {
    /// Fill unset fields from `defaults`.
    pub(crate) fn with_defaults(self, defaults: &Self) -> Self {
        Self {
            return_consumed_capacity: self
                .return_consumed_capacity
                .or_else(|| defaults.return_consumed_capacity.clone()),
            return_item_collection_metrics: self
                .return_item_collection_metrics
                .or_else(|| defaults.return_item_collection_metrics.clone()),
        }
    }
}

/// apply the resolved operation arguments to a `Put`, `Delete` or `ConditionCheck` builder
macro_rules! apply_write_input {
    ($builder:expr, $write_input:expr) => {{
        let write_input: $crate::write::common::WriteInput = $write_input;
        let (condition_expression, expression_attribute_names, expression_attribute_values) =
            match write_input.condition {
                Some(condition) => {
                    let (expression, names, values) = condition.into_parts();
                    (Some(expression), names, values)
                }
                None => (None, None, None),
            };
        $builder
            .set_condition_expression(condition_expression)
            .set_expression_attribute_names(expression_attribute_names)
            .set_expression_attribute_values(expression_attribute_values)
            .set_return_values_on_condition_check_failure(
                write_input.return_values_on_condition_check_failure,
            )
            .table_name(write_input.table_name)
    }};
}

pub(crate) use apply_write_input;
