use crate::{
    common::{self, condition, expression},
    error::{Error, Result},
    write::{self, transaction},
};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::collections;

/// One accumulated change of an update operation.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum UpdateAction {
    /// `SET path = value`
    Set(Vec<(expression::AttributePath, types::AttributeValue)>),
    /// `REMOVE path`
    Remove(Vec<expression::AttributePath>),
    /// `ADD path value`, a numeric increment or a set union.
    Add(Vec<(expression::AttributePath, types::AttributeValue)>),
    /// `DELETE path value`, a set difference.
    Delete(Vec<(expression::AttributePath, types::AttributeValue)>),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CreateOperation {
    pub(crate) item: collections::HashMap<String, types::AttributeValue>,
    pub(crate) args: write::common::WriteInput,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct UpdateOperation {
    pub(crate) key: collections::HashMap<String, types::AttributeValue>,
    pub(crate) actions: Vec<UpdateAction>,
    pub(crate) args: write::common::WriteInput,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DeleteOperation {
    pub(crate) key: collections::HashMap<String, types::AttributeValue>,
    pub(crate) args: write::common::WriteInput,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ConditionOperation {
    pub(crate) key: collections::HashMap<String, types::AttributeValue>,
    pub(crate) args: write::common::WriteInput,
}

/// Pending operation on one item of a transaction.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ItemOperation {
    Create(CreateOperation),
    Update(UpdateOperation),
    Delete(DeleteOperation),
    Condition(ConditionOperation),
}

impl ItemOperation {
    pub(crate) fn is_condition(&self) -> bool {
        matches!(self, Self::Condition(_))
    }
}

pub(crate) fn marshal_values<P, T, I>(
    values: I,
) -> Result<Vec<(expression::AttributePath, types::AttributeValue)>>
where
    I: IntoIterator<Item = (P, T)>,
    P: Into<expression::AttributePath>,
    T: Serialize,
{
    let mut marshalled = Vec::new();
    for (path, value) in values {
        let value: types::AttributeValue = to_attribute_value(value)?;
        marshalled.push((path.into(), value));
    }
    Ok(marshalled)
}

fn push_unique<T: PartialEq>(members: &mut Vec<T>, member: T) {
    if !members.contains(&member) {
        members.push(member);
    }
}

/// Turn list values into the matching DynamoDB set type, dropping repeated members.
fn into_set(path: &expression::AttributePath, value: types::AttributeValue) -> Result<types::AttributeValue> {
    let types::AttributeValue::L(values) = value else {
        return Ok(value);
    };
    let invalid = |reason: &str| Error::InvalidOperation(format!("set `{path}` {reason}"));
    let Some(first) = values.first() else {
        return Err(invalid("must not be empty"));
    };
    let set = match first {
        types::AttributeValue::S(_) => {
            let mut strings = Vec::with_capacity(values.len());
            for value in values {
                let types::AttributeValue::S(value) = value else {
                    return Err(invalid("mixes member types"));
                };
                push_unique(&mut strings, value);
            }
            types::AttributeValue::Ss(strings)
        }
        types::AttributeValue::N(_) => {
            let mut numbers = Vec::with_capacity(values.len());
            for value in values {
                let types::AttributeValue::N(value) = value else {
                    return Err(invalid("mixes member types"));
                };
                push_unique(&mut numbers, value);
            }
            types::AttributeValue::Ns(numbers)
        }
        types::AttributeValue::B(_) => {
            let mut blobs = Vec::with_capacity(values.len());
            for value in values {
                let types::AttributeValue::B(value) = value else {
                    return Err(invalid("mixes member types"));
                };
                push_unique(&mut blobs, value);
            }
            types::AttributeValue::Bs(blobs)
        }
        _ => return Err(invalid("members must be strings, numbers or binaries")),
    };
    Ok(set)
}

/// Builder returned by [`Transaction::create`](transaction::Transaction::create).
#[derive(Debug)]
pub struct CreateBuilder<'t, 'c> {
    pub(crate) transaction: &'t mut transaction::Transaction<'c>,
    pub(crate) index: usize,
}

impl CreateBuilder<'_, '_> {
    pub(crate) fn operation(&mut self) -> Result<&mut CreateOperation> {
        match self.transaction.operations.get_index_mut(self.index) {
            Some((_, ItemOperation::Create(operation))) => Ok(operation),
            _ => Err(Error::InvalidOperation(
                "create operation was replaced".to_string(),
            )),
        }
    }
}

/// Builder returned by [`Transaction::update`](transaction::Transaction::update).
///
/// Every method appends to the update operation stored in the transaction, so builders
/// obtained for the same item contribute to one merged update.
#[derive(Debug)]
pub struct UpdateBuilder<'t, 'c> {
    pub(crate) transaction: &'t mut transaction::Transaction<'c>,
    pub(crate) index: usize,
}

impl UpdateBuilder<'_, '_> {
    pub(crate) fn operation(&mut self) -> Result<&mut UpdateOperation> {
        match self.transaction.operations.get_index_mut(self.index) {
            Some((_, ItemOperation::Update(operation))) => Ok(operation),
            _ => Err(Error::InvalidOperation(
                "update operation was replaced".to_string(),
            )),
        }
    }

    fn push(mut self, action: UpdateAction) -> Result<Self> {
        self.operation()?.actions.push(action);
        Ok(self)
    }

    /// Assign values to (possibly nested) attributes.
    pub fn set<P, T, I>(self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<expression::AttributePath>,
        T: Serialize,
    {
        let values = marshal_values(values)?;
        if values.is_empty() {
            return Ok(self);
        }
        self.push(UpdateAction::Set(values))
    }

    /// Increment (or, with negative deltas, decrement) numeric attributes.
    pub fn adjust_number<P, T, I>(self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<expression::AttributePath>,
        T: Serialize,
    {
        let values = marshal_values(values)?;
        if values.is_empty() {
            return Ok(self);
        }
        self.push(UpdateAction::Add(values))
    }

    /// Remove attributes from the item.
    pub fn remove_attributes<P>(self, names: impl IntoIterator<Item = P>) -> Result<Self>
    where
        P: Into<expression::AttributePath>,
    {
        let names: Vec<_> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Ok(self);
        }
        self.push(UpdateAction::Remove(names))
    }

    /// Add members to set attributes; lists are turned into sets.
    pub fn add_items_to_set<P, T, I>(self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<expression::AttributePath>,
        T: Serialize,
    {
        let values = marshal_sets(values)?;
        if values.is_empty() {
            return Ok(self);
        }
        self.push(UpdateAction::Add(values))
    }

    /// Delete members from set attributes; lists are turned into sets.
    pub fn delete_items_from_set<P, T, I>(self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<expression::AttributePath>,
        T: Serialize,
    {
        let values = marshal_sets(values)?;
        if values.is_empty() {
            return Ok(self);
        }
        self.push(UpdateAction::Delete(values))
    }

    /// Only apply the update, and with it the transaction, if `condition` holds.
    ///
    /// The condition keeps its own aliases; they are merged with the update's aliases
    /// when the operation is compiled.
    pub fn on_condition<T: Serialize>(mut self, condition: condition::ConditionInput<T>) -> Result<Self> {
        let condition = common::ExpressionInput::try_from(condition)?;
        self.operation()?.args.condition = Some(condition);
        Ok(self)
    }
}

fn marshal_sets<P, T, I>(values: I) -> Result<Vec<(expression::AttributePath, types::AttributeValue)>>
where
    I: IntoIterator<Item = (P, T)>,
    P: Into<expression::AttributePath>,
    T: Serialize,
{
    let mut sets = Vec::new();
    for (path, value) in marshal_values(values)? {
        let value = into_set(&path, value)?;
        sets.push((path, value));
    }
    Ok(sets)
}

/// Builder returned by [`Transaction::add_condition_for`](transaction::Transaction::add_condition_for).
#[derive(Debug)]
pub struct ConditionBuilder<'t, 'c, T> {
    pub(crate) transaction: &'t mut transaction::Transaction<'c>,
    pub(crate) key: collections::HashMap<String, types::AttributeValue>,
    pub(crate) args: write::common::WriteArgs<T>,
}

impl<T: Serialize> ConditionBuilder<'_, '_, T> {
    /// Require `condition` to hold on the item for the transaction to succeed.
    ///
    /// Fails if the condition carries no comparison values.
    pub fn matches(mut self, condition: condition::ConditionInput<T>) -> Result<()> {
        self.args.condition = Some(condition);
        self.args.require_condition()?;
        let args = write::common::WriteInput::new(self.args, self.transaction.table_name())?;
        let identity = self
            .transaction
            .schema(&args.table_name)
            .identity(&args.table_name, &self.key)?;
        let operation = ConditionOperation {
            key: self.key,
            args,
        };
        self.transaction
            .operations
            .insert(identity, ItemOperation::Condition(operation));
        Ok(())
    }
}
