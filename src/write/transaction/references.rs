//! Items pointing at other items are recorded twice: the pointing item stores a marker at
//! the referencing attribute, and a separate reference item in the transaction's table
//! records which item points at which, so the relation can be followed from both sides.

use crate::{
    common::expression,
    error::{Error, Result},
    write::{
        self,
        transaction::{
            Transaction,
            operation::{CreateBuilder, UpdateAction, UpdateBuilder},
        },
    },
};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::to_item;
use std::collections;

/// Partition key value of reference items, and type tag of reference markers.
pub const REFERENCE_TYPE: &str = "dynamodb:reference";

/// Target of a referencing attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Reference<K> {
    /// The attribute holds a single marker.
    One(K),
    /// The attribute holds a list of markers.
    Many(Vec<K>),
}

impl<'c> Transaction<'c> {
    /// Resolve `reference` into the marker value stored on the owner, creating the
    /// reference items on the way.
    fn reference_value<K: Serialize>(
        &mut self,
        owner: &collections::HashMap<String, types::AttributeValue>,
        path: &expression::AttributePath,
        reference: Reference<K>,
    ) -> Result<types::AttributeValue> {
        match reference {
            Reference::One(target) => self.create_reference(owner, path, target),
            Reference::Many(targets) => {
                let mut markers = Vec::with_capacity(targets.len());
                for target in targets {
                    markers.push(self.create_reference(owner, path, target)?);
                }
                Ok(types::AttributeValue::L(markers))
            }
        }
    }

    fn create_reference<K: Serialize>(
        &mut self,
        owner: &collections::HashMap<String, types::AttributeValue>,
        path: &expression::AttributePath,
        target: K,
    ) -> Result<types::AttributeValue> {
        let table = self.table_name().to_string();
        let schema = self.schema(&table);
        let Some(range) = &schema.range else {
            let message = format!("table `{table}` needs a sort key to store references");
            return Err(Error::InvalidOperation(message));
        };
        let target = schema.strip_key(&table, &to_item(target)?)?;
        let reference_id = uuid::Uuid::new_v4().to_string();

        #[cfg(feature = "tracing")]
        tracing::trace!(%table, %path, %reference_id, "creating reference item");

        let item = collections::HashMap::from([
            (
                schema.hash.clone(),
                types::AttributeValue::S(REFERENCE_TYPE.to_string()),
            ),
            (
                range.clone(),
                types::AttributeValue::S(reference_id.clone()),
            ),
            ("item".to_string(), types::AttributeValue::M(owner.clone())),
            (
                "references".to_string(),
                types::AttributeValue::M(target.clone()),
            ),
            (
                "onAttribute".to_string(),
                types::AttributeValue::S(path.to_string()),
            ),
        ]);
        let args = write::common::WriteInput {
            table_name: table,
            ..Default::default()
        };
        self.insert_create(item, args)?;

        let marker = collections::HashMap::from([
            (
                "_type".to_string(),
                types::AttributeValue::S(REFERENCE_TYPE.to_string()),
            ),
            ("_target".to_string(), types::AttributeValue::M(target)),
            ("_refId".to_string(), types::AttributeValue::S(reference_id)),
        ]);
        Ok(types::AttributeValue::M(marker))
    }
}

/// Store `value` at `segments`, creating intermediate maps where needed.
fn insert_at_path(
    item: &mut collections::HashMap<String, types::AttributeValue>,
    segments: &[String],
    value: types::AttributeValue,
) {
    match segments {
        [] => {}
        [last] => {
            item.insert(last.clone(), value);
        }
        [first, rest @ ..] => {
            let nested = item
                .entry(first.clone())
                .or_insert_with(|| types::AttributeValue::M(collections::HashMap::new()));
            if !nested.is_m() {
                *nested = types::AttributeValue::M(collections::HashMap::new());
            }
            if let types::AttributeValue::M(nested) = nested {
                insert_at_path(nested, rest, value);
            }
        }
    }
}

impl CreateBuilder<'_, '_> {
    /// Point attributes of the created item at other items.
    ///
    /// Each target gets a reference item in the transaction's table, and the attribute
    /// receives a marker (or a list of markers) naming the target.
    pub fn set_references<P, K, I>(mut self, references: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, Reference<K>)>,
        P: Into<expression::AttributePath>,
        K: Serialize,
    {
        for (path, reference) in references {
            let path = path.into();
            let owner = {
                let operation = self.operation()?;
                let table = operation.args.table_name.clone();
                let item = operation.item.clone();
                self.transaction.schema(&table).strip_key(&table, &item)?
            };
            let value = self.transaction.reference_value(&owner, &path, reference)?;
            insert_at_path(&mut self.operation()?.item, path.segments(), value);
        }
        Ok(self)
    }
}

impl UpdateBuilder<'_, '_> {
    /// Point attributes of the updated item at other items.
    ///
    /// Works like [`CreateBuilder::set_references`], with the markers assigned by the update.
    pub fn set_references<P, K, I>(mut self, references: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, Reference<K>)>,
        P: Into<expression::AttributePath>,
        K: Serialize,
    {
        let mut values = Vec::new();
        for (path, reference) in references {
            let path = path.into();
            let owner = self.operation()?.key.clone();
            let value = self.transaction.reference_value(&owner, &path, reference)?;
            values.push((path, value));
        }
        if !values.is_empty() {
            self.operation()?.actions.push(UpdateAction::Set(values));
        }
        Ok(self)
    }
}
