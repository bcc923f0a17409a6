use aws_sdk_dynamodb::{error, operation, types};

/// Error returned by the transaction engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transaction holds no operations, or more operations than a single request
    /// accepts while splitting is disabled.
    #[error("invalid number of operations: {count} (limit {limit})")]
    InvalidOperationCount {
        /// Number of accumulated operations.
        count: usize,
        /// Maximum number of operations per request.
        limit: usize,
    },

    /// An operation is structurally invalid and cannot be compiled.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The key schema configuration is invalid.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// An item or key lacks an attribute declared by the table's key schema.
    #[error("missing key attribute `{attribute}` for table `{table}`")]
    MissingKeyAttribute {
        /// Table the key schema belongs to.
        table: String,
        /// Name of the missing key attribute.
        attribute: String,
    },

    /// A condition check was declared without any comparison data.
    #[error("no values provided for condition check")]
    EmptyConditionValues,

    /// A condition expression references a `:value` placeholder that was not supplied.
    #[error("no value provided for placeholder `:{0}`")]
    MissingConditionValue(String),

    /// An update operation compiled to an empty update expression.
    #[error("update expression is empty")]
    EmptyUpdateExpression,

    /// An attribute path was rendered before it was appended to the alias tables.
    #[error("no alias allocated for `{0}`")]
    MissingAlias(String),

    /// A value could not be marshalled to or from DynamoDB attribute values.
    #[error(transparent)]
    Serialization(#[from] serde_dynamo::Error),

    /// A DynamoDB request could not be built.
    #[error(transparent)]
    Build(#[from] error::BuildError),

    /// The store rejected the request because a condition evaluated to false.
    #[error("conditional check failed")]
    ConditionFailed {
        /// Per-operation cancellation reasons as reported by the store.
        reasons: Vec<types::CancellationReason>,
        /// The original store error, when available.
        #[source]
        source: Option<Box<error::SdkError<operation::transact_write_items::TransactWriteItemsError>>>,
    },

    /// Any other failure reported by the DynamoDB client.
    #[error(transparent)]
    TransactWrite(Box<error::SdkError<operation::transact_write_items::TransactWriteItemsError>>),

    /// A batch failed after earlier batches of the same transaction were committed.
    ///
    /// Committed batches are not rolled back.
    #[error("batch {} of {batches} failed after {committed} committed batch(es)", .committed + 1)]
    PartialBatchFailure {
        /// Number of batches committed before the failure.
        committed: usize,
        /// Total number of batches the transaction was split into.
        batches: usize,
        /// The failure of the batch that did not commit.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Whether the failure was caused by a condition evaluating to false, including
    /// failures of a later batch.
    pub fn is_condition_failed(&self) -> bool {
        match self {
            Self::ConditionFailed { .. } => true,
            Self::PartialBatchFailure { source, .. } => source.is_condition_failed(),
            _ => false,
        }
    }
}

impl From<error::SdkError<operation::transact_write_items::TransactWriteItemsError>> for Error {
    fn from(
        sdk_error: error::SdkError<operation::transact_write_items::TransactWriteItemsError>,
    ) -> Self {
        let reasons = match sdk_error.as_service_error() {
            Some(
                operation::transact_write_items::TransactWriteItemsError::TransactionCanceledException(
                    exception,
                ),
            ) => condition_failure_reasons(exception),
            _ => None,
        };
        match reasons {
            Some(reasons) => Self::ConditionFailed {
                reasons,
                source: Some(Box::new(sdk_error)),
            },
            None => Self::TransactWrite(Box::new(sdk_error)),
        }
    }
}

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";

/// Cancellation reasons of a canceled transaction, if any of them is a failed condition.
pub(crate) fn condition_failure_reasons(
    exception: &types::error::TransactionCanceledException,
) -> Option<Vec<types::CancellationReason>> {
    let reasons = exception.cancellation_reasons.clone().unwrap_or_default();
    let failed = reasons
        .iter()
        .any(|reason| reason.code() == Some(CONDITIONAL_CHECK_FAILED));
    failed.then_some(reasons)
}

/// Result type of the transaction engine.
pub type Result<T, E = Error> = std::result::Result<T, E>;
