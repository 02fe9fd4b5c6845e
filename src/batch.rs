//! Batch accumulation for cached mutation statements.
//!
//! Rows bound for a statement either execute immediately or are appended to
//! the statement's pending batch, which is sent in one round trip once it
//! reaches the configured threshold.

use serde::Serialize;
use tracing::debug;

use crate::{
    config::ClientConfig,
    connection::SqlConnection,
    errors::SqlKvError,
    executor::Record,
    statement_cache::{CachedStatement, StatementKind},
};

/// Rows appended to a statement but not yet sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingBatch {
    rows: Vec<Vec<String>>,
}

impl PendingBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BatchPolicy {
    pub threshold: u32,
    pub enabled: bool,
}

impl BatchPolicy {
    pub fn new(threshold: u32, enabled: bool) -> Self {
        Self { threshold, enabled }
    }

    pub fn immediate() -> Self {
        Self::new(0, false)
    }

    pub fn batched(threshold: u32) -> Self {
        Self::new(threshold, true)
    }

    /// A zero threshold or a disabled toggle both mean one row per execution.
    pub fn is_batching(&self) -> bool {
        self.enabled && self.threshold > 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BatchPolicies {
    pub insert: BatchPolicy,
    pub update: BatchPolicy,
}

impl BatchPolicies {
    /// Inserts batch whenever a positive batch size is configured; updates
    /// additionally require `jdbc.batchupdateapi=true`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            insert: BatchPolicy::new(config.batch_size, true),
            update: BatchPolicy::new(config.batch_size, config.batch_updates),
        }
    }

    pub fn uniform(policy: BatchPolicy) -> Self {
        Self {
            insert: policy,
            update: policy,
        }
    }

    pub fn for_kind(&self, kind: StatementKind) -> BatchPolicy {
        match kind {
            StatementKind::Insert => self.insert,
            StatementKind::Update => self.update,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Executed on its own; carries rows affected.
    Executed(usize),
    /// Held in the pending batch, which now has this many rows.
    Accumulated(usize),
    /// Completed the batch, which was sent; carries rows affected per entry.
    Flushed(Vec<usize>),
}

/// Parameters for one mutation in `cs`'s column order: the key first for
/// insert, last for update.
pub fn bind_row<H>(cs: &CachedStatement<H>, key: &str, values: &Record) -> Result<Vec<String>, SqlKvError> {
    let mut row = Vec::with_capacity(cs.fields().len() + 1);
    if cs.kind() == StatementKind::Insert {
        row.push(key.to_string());
    }
    for field in cs.fields() {
        let value = values.get(field).ok_or_else(|| {
            SqlKvError::invalid_argument(format!("no value supplied for field {field}"))
        })?;
        row.push(value.clone());
    }
    if cs.kind() == StatementKind::Update {
        row.push(key.to_string());
    }
    Ok(row)
}

pub fn append<C: SqlConnection>(
    conn: &mut C,
    cs: &mut CachedStatement<C::Handle>,
    row: Vec<String>,
    policy: BatchPolicy,
) -> Result<AppendOutcome, SqlKvError> {
    if !policy.is_batching() {
        let affected = conn.execute_update(cs.handle(), &row)?;
        return Ok(AppendOutcome::Executed(affected));
    }
    cs.batch.rows.push(row);
    if cs.batch.len() < policy.threshold as usize {
        return Ok(AppendOutcome::Accumulated(cs.batch.len()));
    }
    flush(conn, cs).map(AppendOutcome::Flushed)
}

/// Sends whatever `cs` has pending. The batch is emptied even if execution
/// fails; the error then belongs to the operation that triggered the flush.
pub fn flush<C: SqlConnection>(
    conn: &mut C,
    cs: &mut CachedStatement<C::Handle>,
) -> Result<Vec<usize>, SqlKvError> {
    if cs.batch.is_empty() {
        return Ok(Vec::new());
    }
    let rows = std::mem::take(&mut cs.batch.rows);
    debug!(rows = rows.len(), kind = ?cs.kind(), "executing batch");
    conn.execute_batch(cs.handle(), &rows)
}
