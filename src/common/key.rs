use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use std::collections;

/// Partition key name of tables without a registered key schema.
pub const DEFAULT_PARTITION_KEY: &str = "PK";

/// Sort key name of tables without a registered key schema.
pub const DEFAULT_SORT_KEY: &str = "SK";

/// Key schema of a table.
///
/// ```rust
/// use dynamodb_transact::common::key;
///
/// let schema = key::KeySchema {
///     hash: "id".to_string(),
///     range: None,
/// };
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct KeySchema {
    /// The name of the partition key attribute.
    pub hash: String,
    /// The name of the sort key attribute, only for tables with composite primary keys.
    pub range: Option<String>,
}

impl Default for KeySchema {
    fn default() -> Self {
        Self {
            hash: DEFAULT_PARTITION_KEY.to_string(),
            range: Some(DEFAULT_SORT_KEY.to_string()),
        }
    }
}

impl KeySchema {
    /// Strip an item down to the attributes of this key schema.
    pub(crate) fn strip_key(
        &self,
        table: &str,
        item: &collections::HashMap<String, types::AttributeValue>,
    ) -> Result<collections::HashMap<String, types::AttributeValue>> {
        let mut key = collections::HashMap::with_capacity(2);
        for name in self.attribute_names() {
            let value = item.get(name).ok_or_else(|| Error::MissingKeyAttribute {
                table: table.to_string(),
                attribute: name.to_string(),
            })?;
            key.insert(name.to_string(), value.clone());
        }
        Ok(key)
    }

    /// Identity of the item in `table`, shared by every operation targeting it.
    pub(crate) fn identity(
        &self,
        table: &str,
        item: &collections::HashMap<String, types::AttributeValue>,
    ) -> Result<ItemIdentity> {
        let mut parts = vec![table.to_string()];
        for name in self.attribute_names() {
            let value = item.get(name).ok_or_else(|| Error::MissingKeyAttribute {
                table: table.to_string(),
                attribute: name.to_string(),
            })?;
            parts.push(encode_key_value(name, value)?);
        }
        // length prefixes keep differently shaped keys apart
        let identity = parts
            .iter()
            .map(|part| format!("{}:{part};", part.len()))
            .collect();
        Ok(ItemIdentity(identity))
    }

    fn attribute_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.hash.as_str()).chain(self.range.as_deref())
    }
}

fn encode_key_value(name: &str, value: &types::AttributeValue) -> Result<String> {
    let encoded = match value {
        types::AttributeValue::S(value) => format!("S{value}"),
        types::AttributeValue::N(value) => format!("N{value}"),
        types::AttributeValue::B(value) => {
            let hex: String = value
                .as_ref()
                .iter()
                .map(|byte| format!("{byte:02x}"))
                .collect();
            format!("B{hex}")
        }
        _ => {
            let message = format!("key attribute `{name}` must be a string, number or binary");
            return Err(Error::InvalidOperation(message));
        }
    };
    Ok(encoded)
}

/// Canonical identity of an item: its table plus its primary key.
///
/// Two operations with the same identity target the same item.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ItemIdentity(String);

impl AsRef<str> for ItemIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key schemas of all known tables.
///
/// The first registered table is the default table of new transactions.
///
/// ```rust
/// use dynamodb_transact::common::key;
/// use indexmap::IndexMap;
///
/// let schemas = key::KeySchemaCollection::new(IndexMap::from([(
///     "books".to_string(),
///     key::KeySchema::default(),
/// )]))
/// .unwrap();
/// assert_eq!(schemas.default_table().unwrap(), "books");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeySchemaCollection {
    tables: IndexMap<String, KeySchema>,
    fallback: KeySchema,
}

impl KeySchemaCollection {
    /// Validate and register the key schemas of `tables`.
    pub fn new(tables: IndexMap<String, KeySchema>) -> Result<Self> {
        if tables.is_empty() {
            return Err(Error::InvalidSchema("no tables provided".to_string()));
        }
        for (table, schema) in &tables {
            if schema.hash.is_empty() {
                let message = format!("no hash key provided for table `{table}`");
                return Err(Error::InvalidSchema(message));
            }
            if schema.range.as_deref() == Some("") {
                let message = format!("invalid range key provided for table `{table}`");
                return Err(Error::InvalidSchema(message));
            }
        }
        let collection = Self {
            tables,
            ..Default::default()
        };
        Ok(collection)
    }

    /// The first registered table.
    pub fn default_table(&self) -> Result<&str> {
        self.tables
            .keys()
            .next()
            .map(String::as_str)
            .ok_or_else(|| Error::InvalidSchema("schema not initialized".to_string()))
    }

    /// The key schema of `table`, or the `PK`/`SK` schema for unknown tables.
    pub fn get(&self, table: &str) -> &KeySchema {
        self.tables.get(table).unwrap_or(&self.fallback)
    }
}
