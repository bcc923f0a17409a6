//! Write transactions against DynamoDB tables.
//!
//! Operations are accumulated on a [`transaction::Transaction`], one per targeted item,
//! and submitted as `TransactWriteItems` requests:
//! - Creating items, optionally pointing at other items through references
//! - Updating items, merging every update of the same item
//! - Deleting items by primary key
//! - Checking conditions on items that are not modified

/// Common arguments of operations and transaction requests.
pub mod common;

/// The transaction accumulator and its submission.
pub mod transaction;
