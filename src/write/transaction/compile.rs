use crate::{
    common::expression,
    config,
    error::{Error, Result},
    write::{
        common::apply_write_input,
        transaction::operation::{self, ItemOperation, UpdateAction},
    },
};

use aws_sdk_dynamodb::types;

/// Clause keywords in the order they appear in an update expression.
const UPDATE_CLAUSES: [&str; 4] = ["SET", "REMOVE", "ADD", "DELETE"];

impl ItemOperation {
    /// Lower the operation into a request element.
    pub(crate) fn compile(self, created_at: &types::AttributeValue) -> Result<types::TransactWriteItem> {
        let item = match self {
            Self::Create(create) => {
                let put = compile_create(create, created_at)?;
                types::TransactWriteItem::builder().put(put).build()
            }
            Self::Update(update) => {
                let update = compile_update(update)?;
                types::TransactWriteItem::builder().update(update).build()
            }
            Self::Delete(delete) => {
                let builder = types::Delete::builder().set_key(Some(delete.key));
                let delete = apply_write_input!(builder, delete.args).build()?;
                types::TransactWriteItem::builder().delete(delete).build()
            }
            Self::Condition(condition) => {
                let builder = types::ConditionCheck::builder().set_key(Some(condition.key));
                let condition_check = apply_write_input!(builder, condition.args).build()?;
                types::TransactWriteItem::builder()
                    .condition_check(condition_check)
                    .build()
            }
        };
        Ok(item)
    }
}

fn compile_create(
    create: operation::CreateOperation,
    created_at: &types::AttributeValue,
) -> Result<types::Put> {
    let mut item = create.item;
    // the item's own value wins
    item.entry(config::TimestampField::CreatedAt.attribute_name().to_string())
        .or_insert_with(|| created_at.clone());
    let builder = types::Put::builder().set_item(Some(item));
    Ok(apply_write_input!(builder, create.args).build()?)
}

fn render_values(
    attributes: &expression::ExpressionAttributes,
    values: &[(expression::AttributePath, types::AttributeValue)],
    separator: &str,
) -> Result<String> {
    let mut rendered = Vec::with_capacity(values.len());
    for (path, _) in values {
        let missing = || Error::MissingAlias(path.to_string());
        let name = attributes.name(path).ok_or_else(missing)?;
        let value = attributes.value(path).ok_or_else(missing)?;
        rendered.push(format!("{name}{separator}{value}"));
    }
    Ok(rendered.join(", "))
}

fn render_names(
    attributes: &expression::ExpressionAttributes,
    paths: &[expression::AttributePath],
) -> Result<String> {
    let mut rendered = Vec::with_capacity(paths.len());
    for path in paths {
        let name = attributes
            .name(path)
            .ok_or_else(|| Error::MissingAlias(path.to_string()))?;
        rendered.push(name);
    }
    Ok(rendered.join(", "))
}

/// Build the update expression of all accumulated actions.
///
/// Aliases are allocated in action order, after the aliases of the update's condition.
fn compile_update(update: operation::UpdateOperation) -> Result<types::Update> {
    let (condition_expression, names, values) = match update.args.condition {
        Some(condition) => {
            let (expression, names, values) = condition.into_parts();
            (Some(expression), names, values)
        }
        None => (None, None, None),
    };
    let mut attributes = expression::ExpressionAttributes::with_tables(names, values);
    let mut clauses: [Vec<String>; 4] = Default::default();
    for action in &update.actions {
        match action {
            UpdateAction::Set(values) => {
                attributes.append_both(values.iter().map(|(path, value)| (path, value)));
                clauses[0].push(render_values(&attributes, values, " = ")?);
            }
            UpdateAction::Remove(paths) => {
                attributes.append_names(paths);
                clauses[1].push(render_names(&attributes, paths)?);
            }
            UpdateAction::Add(values) => {
                attributes.append_both(values.iter().map(|(path, value)| (path, value)));
                clauses[2].push(render_values(&attributes, values, " ")?);
            }
            UpdateAction::Delete(values) => {
                attributes.append_both(values.iter().map(|(path, value)| (path, value)));
                clauses[3].push(render_values(&attributes, values, " ")?);
            }
        }
    }
    let update_expression = UPDATE_CLAUSES
        .iter()
        .zip(clauses)
        .filter(|(_, pieces)| !pieces.is_empty())
        .map(|(keyword, pieces)| format!("{keyword} {}", pieces.join(", ")))
        .collect::<Vec<_>>()
        .join(" ");
    if update_expression.is_empty() {
        return Err(Error::EmptyUpdateExpression);
    }
    let tables = attributes.into_tables();
    let update = types::Update::builder()
        .set_key(Some(update.key))
        .update_expression(update_expression)
        .set_condition_expression(condition_expression)
        .set_expression_attribute_names((!tables.names.is_empty()).then_some(tables.names))
        .set_expression_attribute_values(tables.values)
        .set_return_values_on_condition_check_failure(
            update.args.return_values_on_condition_check_failure,
        )
        .table_name(update.args.table_name)
        .build()?;
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{common, write};

    use rstest::rstest;
    use std::collections;

    fn number(value: &str) -> types::AttributeValue {
        types::AttributeValue::N(value.to_string())
    }

    fn key() -> collections::HashMap<String, types::AttributeValue> {
        collections::HashMap::from([(
            "PK".to_string(),
            types::AttributeValue::S("U/1".to_string()),
        )])
    }

    fn update(actions: Vec<UpdateAction>) -> operation::UpdateOperation {
        operation::UpdateOperation {
            key: key(),
            actions,
            args: write::common::WriteInput {
                table_name: "books".to_string(),
                ..Default::default()
            },
        }
    }

    #[rstest]
    #[case::set(
        vec![
            UpdateAction::Set(
                vec![
                    ("a".into(), number("1")),
                    ("b.c".into(), number("2")),
                ]
            ),
        ],
        "SET #0 = :0, #1.#2 = :1"
    )]
    #[case::clause_order(
        vec![
            UpdateAction::Delete(
                vec![
                    ("tags".into(), types::AttributeValue::Ss(vec!["x".to_string()])),
                ]
            ),
            UpdateAction::Remove(
                vec![
                    "old".into(),
                ]
            ),
            UpdateAction::Set(
                vec![
                    ("a".into(), number("1")),
                ]
            ),
        ],
        "SET #2 = :1 REMOVE #1 DELETE #0 :0"
    )]
    #[case::shared_segments(
        vec![
            UpdateAction::Set(
                vec![
                    ("stats.reads".into(), number("0")),
                ]
            ),
            UpdateAction::Add(
                vec![
                    ("stats.likes".into(), number("1")),
                ]
            ),
        ],
        "SET #0.#1 = :0 ADD #0.#2 :1"
    )]
    fn test_update_expression(#[case] actions: Vec<UpdateAction>, #[case] expected: &str) {
        let actual = compile_update(update(actions)).unwrap();
        assert_eq!(actual.update_expression(), expected);
        assert_eq!(actual.table_name(), "books");
        assert_eq!(actual.key(), &key());
    }

    #[test]
    fn test_remove_only_has_no_values() {
        let actual = compile_update(update(vec![UpdateAction::Remove(vec!["a".into()])])).unwrap();
        assert_eq!(actual.update_expression(), "REMOVE #0");
        assert_eq!(actual.expression_attribute_values(), None);
    }

    #[test]
    fn test_empty_update() {
        let actual = compile_update(update(Vec::new()));
        assert!(matches!(actual, Err(Error::EmptyUpdateExpression)));
    }

    #[test]
    fn test_condition_aliases_are_not_reused() {
        let mut operation = update(vec![UpdateAction::Set(vec![("a".into(), number("1"))])]);
        operation.args.condition = Some(common::ExpressionInput {
            expression: "#0 = :0".to_string(),
            expression_attribute_names: collections::HashMap::from([(
                "#0".to_string(),
                "state".to_string(),
            )]),
            expression_attribute_values: collections::HashMap::from([(
                ":0".to_string(),
                number("9"),
            )]),
        });
        let actual = compile_update(operation).unwrap();
        assert_eq!(actual.condition_expression(), Some("#0 = :0"));
        assert_eq!(actual.update_expression(), "SET #1 = :1");
        assert_eq!(actual.expression_attribute_names().map(collections::HashMap::len), Some(2));
        assert_eq!(
            actual.expression_attribute_values().and_then(|values| values.get(":0")),
            Some(&number("9"))
        );
    }

    #[test]
    fn test_compile_create_keeps_own_created_at() {
        let mut item = key();
        item.insert("createdAt".to_string(), number("5"));
        let create = operation::CreateOperation {
            item,
            args: write::common::WriteInput {
                table_name: "books".to_string(),
                ..Default::default()
            },
        };
        let actual = ItemOperation::Create(create).compile(&number("1")).unwrap();
        let put = actual.put().unwrap();
        assert_eq!(put.item().get("createdAt"), Some(&number("5")));
        assert_eq!(put.condition_expression(), None);
    }

    #[test]
    fn test_compile_condition_check() {
        let condition = operation::ConditionOperation {
            key: key(),
            args: write::common::WriteInput {
                condition: Some(common::ExpressionInput {
                    expression: "#a = :a".to_string(),
                    ..Default::default()
                }),
                table_name: "books".to_string(),
                ..Default::default()
            },
        };
        let actual = ItemOperation::Condition(condition).compile(&number("1")).unwrap();
        let check = actual.condition_check().unwrap();
        assert_eq!(check.condition_expression(), "#a = :a");
        assert_eq!(check.expression_attribute_names(), None);
    }
}
