use crate::{
    common::{self, expression},
    error::{Error, Result},
};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::{collections, ops};

/// Logical operator for combining conditions.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - all conditions must be true.
    And,
    /// Logical OR - at least one condition must be true.
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Condition types for DynamoDB expressions.
///
/// ```rust
/// use dynamodb_transact::common::condition;
///
/// let eq = condition::Condition::Equals("value".to_string());
/// let gt = condition::Condition::GreaterThan(100);
/// let null: condition::Condition<String> = condition::Condition::Null;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition<T> {
    /// Checks if an attribute begins with a specified prefix (string types only).
    BeginsWith(String),
    /// Checks if an attribute value is between two values (inclusive).
    Between(T, T),
    /// Checks if an attribute contains a specified value.
    Contains(T),
    /// Checks if an attribute value equals a specified value.
    Equals(T),
    /// Checks if an attribute value is greater than a specified value.
    GreaterThan(T),
    /// Checks if an attribute value is greater than or equal to a specified value.
    GreaterThanOrEqual(T),
    /// Checks if an attribute value is in a list of specified values.
    In(Vec<T>),
    /// Checks if an attribute value is less than a specified value.
    LessThan(T),
    /// Checks if an attribute value is less than or equal to a specified value.
    LessThanOrEqual(T),
    /// Checks if an attribute does not contain a specified value.
    NotContains(T),
    /// Checks if an attribute value does not equal a specified value.
    NotEqual(T),
    /// Checks if an attribute exists (is not null).
    NotNull,
    /// Checks if an attribute does not exist (is null).
    Null,
}

impl<T: Serialize> Condition<T> {
    fn get_expression(
        self,
        name: &str,
        attributes: &mut expression::ExpressionAttributes,
    ) -> Result<String> {
        let expression = match self {
            Self::BeginsWith(prefix) => {
                let value = attributes.alias_value(types::AttributeValue::S(prefix));
                format!("begins_with({name}, {value})")
            }
            Self::Between(low, high) => {
                let low = alias(attributes, low)?;
                let high = alias(attributes, high)?;
                format!("{name} BETWEEN {low} AND {high}")
            }
            Self::Contains(value) => format!("contains({name}, {})", alias(attributes, value)?),
            Self::Equals(value) => format!("{name} = {}", alias(attributes, value)?),
            Self::GreaterThan(value) => format!("{name} > {}", alias(attributes, value)?),
            Self::GreaterThanOrEqual(value) => format!("{name} >= {}", alias(attributes, value)?),
            Self::In(values) => {
                if values.is_empty() {
                    let message = format!("`IN` on `{name}` needs at least one value");
                    return Err(Error::InvalidOperation(message));
                }
                let mut placeholders = Vec::with_capacity(values.len());
                for value in values {
                    placeholders.push(alias(attributes, value)?);
                }
                format!("{name} IN ({})", placeholders.join(", "))
            }
            Self::LessThan(value) => format!("{name} < {}", alias(attributes, value)?),
            Self::LessThanOrEqual(value) => format!("{name} <= {}", alias(attributes, value)?),
            Self::NotContains(value) => format!("NOT contains({name}, {})", alias(attributes, value)?),
            Self::NotEqual(value) => format!("{name} <> {}", alias(attributes, value)?),
            Self::NotNull => format!("attribute_exists({name})"),
            Self::Null => format!("attribute_not_exists({name})"),
        };
        Ok(expression)
    }
}

fn alias<T: Serialize>(
    attributes: &mut expression::ExpressionAttributes,
    value: T,
) -> Result<String> {
    let value: types::AttributeValue = to_attribute_value(value)?;
    Ok(attributes.alias_value(value))
}

/// Condition applied to an attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition<T> {
    /// The condition to apply to the attribute.
    pub condition: Condition<T>,
    /// The name of the attribute to apply the condition to, dotted for nested attributes.
    pub name: String,
}

/// Map of conditions with logical operators.
///
/// ```rust
/// use dynamodb_transact::common::condition;
///
/// let map = condition::ConditionMap::Leaves(
///     condition::LogicalOperator::And,
///     vec![
///         condition::KeyCondition {
///             name: "status".to_string(),
///             condition: condition::Condition::Equals("active".to_string()),
///         },
///     ],
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionMap<T> {
    /// Leaf conditions - flat list of conditions combined with the logical operator.
    Leaves(LogicalOperator, Vec<KeyCondition<T>>),
    /// Group conditions - nested condition maps combined with the logical operator.
    Group(LogicalOperator, Vec<ConditionMap<T>>),
}

impl<T> ConditionMap<T> {
    fn is_empty(&self) -> bool {
        match self {
            Self::Leaves(_, leaves) => leaves.is_empty(),
            Self::Group(_, maps) => maps.iter().all(Self::is_empty),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Leaves(_, leaves) => leaves.len(),
            Self::Group(_, maps) => maps.len(),
        }
    }
}

impl<T: Serialize> ConditionMap<T> {
    fn get_expression_recursive(
        self,
        attributes: &mut expression::ExpressionAttributes,
    ) -> Result<String> {
        let (operator, expressions) = match self {
            Self::Leaves(operator, key_conditions) => {
                let mut expressions = Vec::with_capacity(key_conditions.len());
                for key_condition in key_conditions {
                    let path = expression::AttributePath::from(key_condition.name.as_str());
                    attributes.append_names([&path]);
                    let name = attributes
                        .name(&path)
                        .ok_or_else(|| Error::MissingAlias(key_condition.name.clone()))?;
                    expressions.push(key_condition.condition.get_expression(&name, attributes)?);
                }
                (operator, expressions)
            }
            Self::Group(operator, maps) => {
                let mut expressions = Vec::with_capacity(maps.len());
                for map in maps {
                    if map.is_empty() {
                        continue;
                    }
                    let is_composite = map.len() > 1;
                    let expression = map.get_expression_recursive(attributes)?;
                    if is_composite {
                        expressions.push(format!("({expression})"));
                    } else {
                        expressions.push(expression);
                    }
                }
                (operator, expressions)
            }
        };
        Ok(expressions.join(&*operator))
    }
}

/// Condition attached to a write operation or a condition check.
///
/// ```rust
/// use dynamodb_transact::common::condition;
///
/// let raw = condition::ConditionInput::Expression {
///     expression: "#isRented = :isRented".to_string(),
///     values: vec![("isRented".to_string(), false)],
/// };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionInput<T> {
    /// Raw expression using `#name` and `:name` placeholders.
    ///
    /// Every `#name` resolves to the attribute `name`, every `:name` to the value
    /// registered under `name`.
    Expression {
        /// The condition expression.
        expression: String,
        /// The values referenced by `:name` placeholders.
        values: Vec<(String, T)>,
    },
    /// Structured condition.
    Map(ConditionMap<T>),
}

impl<T> ConditionInput<T> {
    /// Whether the condition carries no comparison data.
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Self::Expression { values, .. } => values.is_empty(),
            Self::Map(map) => map.is_empty(),
        }
    }
}

impl<T: Serialize> TryFrom<ConditionInput<T>> for common::ExpressionInput {
    type Error = Error;

    fn try_from(condition: ConditionInput<T>) -> Result<Self> {
        match condition {
            ConditionInput::Expression { expression, values } => {
                let mut values: collections::HashMap<_, _> = values.into_iter().collect();
                let mut expression_attribute_names = collections::HashMap::new();
                for name in placeholders(&expression, NAME_PREFIX) {
                    expression_attribute_names.insert(format!("{NAME_PREFIX}{name}"), name.to_string());
                }
                let mut expression_attribute_values = collections::HashMap::new();
                for name in placeholders(&expression, VALUE_PREFIX) {
                    let value = values
                        .remove(name)
                        .ok_or_else(|| Error::MissingConditionValue(name.to_string()))?;
                    let value: types::AttributeValue = to_attribute_value(value)?;
                    expression_attribute_values.insert(format!("{VALUE_PREFIX}{name}"), value);
                }
                let operation = Self {
                    expression,
                    expression_attribute_names,
                    expression_attribute_values,
                };
                Ok(operation)
            }
            ConditionInput::Map(map) => {
                let mut attributes = expression::ExpressionAttributes::default();
                let expression = map.get_expression_recursive(&mut attributes)?;
                let tables = attributes.into_tables();
                let operation = Self {
                    expression,
                    expression_attribute_names: tables.names,
                    expression_attribute_values: tables.values.unwrap_or_default(),
                };
                Ok(operation)
            }
        }
    }
}

const NAME_PREFIX: char = '#';

const VALUE_PREFIX: char = ':';

/// Distinct `prefix`ed placeholder words of an expression, in order of appearance.
fn placeholders(expression: &str, prefix: char) -> Vec<&str> {
    let mut words: Vec<&str> = Vec::new();
    let mut rest = expression;
    while let Some(start) = rest.find(prefix) {
        let tail = &rest[start + prefix.len_utf8()..];
        let end = tail
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(tail.len());
        let word = &tail[..end];
        if !word.is_empty() && !words.contains(&word) {
            words.push(word);
        }
        rest = &tail[end..];
    }
    words
}
