//! Typed, lazily evaluated relational datasets.
//!
//! Datasets are built incrementally from a [`DatasetSession`]. Every
//! transformation produces a new analyzed plan without executing anything.
//! Actions such as [`Dataset::collect`] and [`Dataset::count`] execute the
//! plan through the session's query engine, notifying registered
//! [`QueryExecutionListener`]s of the outcome.

pub mod arrays;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod engine;
pub mod errors;
pub mod explain;
pub mod expr;
pub mod functions;
pub mod listener;
pub mod logical;
pub mod parser;
pub mod session;

mod instrument;

pub use arrays::datatype::DataType;
pub use arrays::field::{Field, Schema};
pub use arrays::row::Row;
pub use arrays::scalar::ScalarValue;
pub use cache::StorageLevel;
pub use config::DatasetConfig;
pub use dataset::{DataFrame, Dataset, GroupedData};
pub use encoder::Encodable;
pub use errors::{DatasetError, Result};
pub use expr::column::Column;
pub use listener::{QueryExecutionInfo, QueryExecutionListener};
pub use logical::logical_join::JoinType;
pub use session::DatasetSession;
