//! Common utilities for DynamoDB write transactions.
//!
//! This module provides shared types used while compiling operations,
//! including key handling, expression aliasing, and condition expressions.

/// Condition expression building for conditional writes and condition checks.
pub mod condition;

/// Expression alias allocation for attribute names and values.
pub mod expression;

/// Key schemas and item identities.
pub mod key;

use aws_sdk_dynamodb::types;
use std::collections;

/// compiled expression with its alias tables
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExpressionInput {
    pub(crate) expression: String,
    pub(crate) expression_attribute_names: collections::HashMap<String, String>,
    pub(crate) expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
}

impl ExpressionInput {
    /// Alias tables as expected by the request builders, `None` when empty.
    #[allow(clippy::type_complexity)]
    pub(crate) fn into_parts(
        self,
    ) -> (
        String,
        Option<collections::HashMap<String, String>>,
        Option<collections::HashMap<String, types::AttributeValue>>,
    ) {
        let names = (!self.expression_attribute_names.is_empty())
            .then_some(self.expression_attribute_names);
        let values = (!self.expression_attribute_values.is_empty())
            .then_some(self.expression_attribute_values);
        (self.expression, names, values)
    }
}
