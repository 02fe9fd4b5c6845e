//! Key-value workload adapter over SQL.
//!
//! Maps insert/read/update/delete/scan on a single table onto prepared SQL
//! statements. Mutation statements are cached per field set and their rows
//! are batched; any read, scan, delete or switch to another statement flushes
//! the pending batch first, so a connection always reads its own writes.
//! Run Criterion benchmarks with `cargo bench`.

pub mod batch;
pub mod cli;
pub mod client;
pub mod config;
pub mod connection;
pub mod errors;
pub mod executor;
pub mod provider;
pub mod schema;
pub mod sql;
pub mod statement_cache;
pub mod status;
pub mod workload;

pub use crate::batch::{AppendOutcome, BatchPolicies, BatchPolicy};
pub use crate::client::KvClient;
pub use crate::config::{ClientConfig, KEY_FIELD, Properties};
pub use crate::connection::{RowView, SqlConnection, SqliteConnection};
pub use crate::errors::SqlKvError;
pub use crate::executor::{BatchedExecutor, ExecutorStats, Record};
pub use crate::provider::ConnectionProvider;
pub use crate::statement_cache::{CachedStatement, FieldSetKey, StatementCache, StatementId, StatementKind};
pub use crate::status::Status;
