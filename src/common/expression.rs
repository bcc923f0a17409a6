use aws_sdk_dynamodb::types;
use std::{collections, fmt};

/// Separator for attribute path components.
const PATH_SEPARATOR: &str = ".";

const NAME_ALIAS_PREFIX: &str = "#";

const VALUE_ALIAS_PREFIX: &str = ":";

/// Attribute path, addressing a top-level or nested attribute segment by segment.
///
/// ```rust
/// use dynamodb_transact::common::expression::AttributePath;
///
/// let path = AttributePath::from("nested.number");
/// assert_eq!(path.segments(), ["nested", "number"]);
/// assert_eq!(path.to_string(), "nested.number");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AttributePath(Vec<String>);

impl AttributePath {
    /// The segments of the path, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for AttributePath {
    fn from(path: &str) -> Self {
        Self(path.split(PATH_SEPARATOR).map(str::to_string).collect())
    }
}

impl From<String> for AttributePath {
    fn from(path: String) -> Self {
        Self::from(path.as_str())
    }
}

impl From<&String> for AttributePath {
    fn from(path: &String) -> Self {
        Self::from(path.as_str())
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(PATH_SEPARATOR))
    }
}

/// Rendered alias tables of an expression.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeTables {
    /// Name aliases (`#n`) mapped to attribute name segments.
    pub names: collections::HashMap<String, String>,
    /// Value aliases (`:n`) mapped to attribute values, omitted when no value was appended.
    pub values: Option<collections::HashMap<String, types::AttributeValue>>,
}

/// Allocator of collision-free expression aliases.
///
/// Every attribute name segment gets one `#n` alias, shared by all paths going through it.
/// Every appended value gets a fresh `:n` alias, even when the same logical key was
/// appended before.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_transact::common::expression::{AttributePath, ExpressionAttributes};
///
/// let mut attributes = ExpressionAttributes::default();
/// let path = AttributePath::from("stats.views");
/// attributes.append_both([(&path, &AttributeValue::N("1".to_string()))]);
/// assert_eq!(attributes.name(&path).as_deref(), Some("#0.#1"));
/// assert_eq!(attributes.value(&path), Some(":0"));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionAttributes {
    names: collections::HashMap<String, String>,
    values: collections::HashMap<String, types::AttributeValue>,
    name_mapping: collections::HashMap<String, String>,
    value_mapping: collections::HashMap<AttributePath, String>,
    name_counter: usize,
    value_counter: usize,
}

impl ExpressionAttributes {
    /// Allocator seeded with alias tables compiled elsewhere, e.g. for a condition.
    ///
    /// Seeded aliases are kept in the rendered tables and never allocated again.
    pub fn with_tables(
        names: Option<collections::HashMap<String, String>>,
        values: Option<collections::HashMap<String, types::AttributeValue>>,
    ) -> Self {
        Self {
            names: names.unwrap_or_default(),
            values: values.unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Allocate name aliases for every segment of `paths` not seen before.
    pub fn append_names<'a>(&mut self, paths: impl IntoIterator<Item = &'a AttributePath>) {
        for path in paths {
            for segment in path.segments() {
                if self.name_mapping.contains_key(segment) {
                    continue;
                }
                let alias = next_alias(NAME_ALIAS_PREFIX, &mut self.name_counter, &self.names);
                self.names.insert(alias.clone(), segment.clone());
                self.name_mapping.insert(segment.clone(), alias);
            }
        }
    }

    /// Allocate a fresh value alias for every value, keyed by its path.
    pub fn append_values<'a>(
        &mut self,
        values: impl IntoIterator<Item = (&'a AttributePath, &'a types::AttributeValue)>,
    ) {
        for (path, value) in values {
            let alias = self.alias_value(value.clone());
            self.value_mapping.insert(path.clone(), alias);
        }
    }

    /// Append the paths as names and their values as values.
    pub fn append_both<'a>(
        &mut self,
        values: impl IntoIterator<Item = (&'a AttributePath, &'a types::AttributeValue)> + Clone,
    ) {
        self.append_names(values.clone().into_iter().map(|(path, _)| path));
        self.append_values(values);
    }

    /// Allocate a fresh value alias not bound to any path.
    pub fn alias_value(&mut self, value: types::AttributeValue) -> String {
        let alias = next_alias(VALUE_ALIAS_PREFIX, &mut self.value_counter, &self.values);
        self.values.insert(alias.clone(), value);
        alias
    }

    /// Render the alias of a path as `#a.#b`, if all its segments were appended.
    pub fn name(&self, path: &AttributePath) -> Option<String> {
        let mut aliases = Vec::with_capacity(path.segments().len());
        for segment in path.segments() {
            aliases.push(self.name_mapping.get(segment)?.as_str());
        }
        Some(aliases.join(PATH_SEPARATOR))
    }

    /// The latest value alias allocated for a path.
    pub fn value(&self, path: &AttributePath) -> Option<&str> {
        self.value_mapping.get(path).map(String::as_str)
    }

    /// Render the alias tables, omitting an empty value table.
    pub fn into_tables(self) -> AttributeTables {
        let values = (!self.values.is_empty()).then_some(self.values);
        AttributeTables {
            names: self.names,
            values,
        }
    }
}

fn next_alias<T>(
    prefix: &str,
    counter: &mut usize,
    taken: &collections::HashMap<String, T>,
) -> String {
    loop {
        let alias = format!("{prefix}{counter}");
        *counter += 1;
        if !taken.contains_key(&alias) {
            return alias;
        }
    }
}
