#![deny(missing_docs)]

//! # DynamoDB Transact
//!
//! Accumulate create, update, delete and condition-check operations on DynamoDB items and
//! submit them as all-or-nothing `TransactWriteItems` requests.
//!
//! ## Overview
//!
//! - Operations are keyed by the item they target: the last operation on an item wins,
//!   and repeated updates of an item merge into one update expression
//! - Attribute names and values are aliased (`#0`, `:0`) so reserved words and nested
//!   paths need no escaping
//! - Transactions above the request limit of 100 operations can be split into several
//!   requests, with every condition check replicated into each of them
//!
//! ## Quick Example
//!
//! ```no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_transact::{common::{condition, key}, config, write::transaction};
//! use indexmap::IndexMap;
//! use serde_json::json;
//!
//! # async fn example(client: Client) -> Result<(), Box<dyn std::error::Error>> {
//! let schemas = key::KeySchemaCollection::new(IndexMap::from([(
//!     "books".to_string(),
//!     key::KeySchema::default(),
//! )]))?;
//! let config = config::Config::new(schemas);
//!
//! let mut transaction = transaction::Transaction::new(&config)?;
//! transaction
//!     .add_condition_for(json!({"PK": "User/1", "SK": "Profile"}))?
//!     .matches(condition::ConditionInput::Expression {
//!         expression: "#active = :active".to_string(),
//!         values: vec![("active".to_string(), json!(true))],
//!     })?;
//! transaction.create(json!({"PK": "User/1", "SK": "Book/1", "title": "Rust"}))?;
//! transaction
//!     .update(json!({"PK": "User/1", "SK": "Stats"}))?
//!     .set([("lastBook", "Book/1")])?;
//! transaction
//!     .update(json!({"PK": "User/1", "SK": "Stats"}))?
//!     .adjust_number([("books", 1)])?;
//! // The stats update is sent as "SET #0 = :0, #1 = :1 ADD #2 :2"
//! transaction.execute(&client).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@common`] - Key schemas, expression aliasing and conditions
//! - [`mod@config`] - Engine configuration
//! - [`mod@error`] - Error type
//! - [`mod@write`] - Transactions and their submission

/// Key schemas, expression aliasing and condition expressions.
pub mod common;

/// Configuration shared by all transactions.
pub mod config;

/// Errors of the transaction engine.
pub mod error;

/// Write transactions.
///
/// This module provides:
/// - The transaction accumulator and its item builders
/// - Compilation of operations into request elements
/// - Submission of oversized transactions in several batches
pub mod write;
