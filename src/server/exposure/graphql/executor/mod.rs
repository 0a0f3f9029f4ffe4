//! GraphQL executor module
//!
//! The executor parses a query with `graphql-parser` and resolves it against
//! the catalog schema. It is split into several sub-modules:
//! - `core`: request handling, operation and variable selection
//! - `fields`: flattening of a root field into dotted paths
//! - `selection`: fragment inlining, field merging and schema validation
//! - `query_executor`: root-field planning (cyclic-query check, prefetch) and resolution
//! - `field_resolver`: scalar and relation resolution
//! - `utils`: utility functions

mod core;
mod field_resolver;
mod fields;
mod query_executor;
mod selection;
mod utils;

pub use self::core::{GraphQLExecutor, GraphQLRequest};
pub use fields::{FragmentTable, get_fields};
