//! Connection-scoped execution of the five key-value operations.
//!
//! Every operation passes through [`BatchedExecutor::before_operation`], the
//! single place where the accumulating statement changes. At most one cached
//! statement holds unsent rows at any time, and reads, scans and deletes
//! always see every write issued earlier on this connection.

use std::{collections::BTreeMap, ops::ControlFlow};

use serde::Serialize;
use tracing::debug;

use crate::{
    batch::{self, AppendOutcome, BatchPolicies},
    config::{ClientConfig, KEY_FIELD},
    connection::{RowView, SqlConnection},
    errors::SqlKvError,
    sql,
    statement_cache::{StatementCache, StatementId, StatementKind},
};

/// Field name to value.
pub type Record = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    pub statements_prepared: u64,
    pub batches_executed: u64,
    pub batched_rows: u64,
    pub single_executions: u64,
    pub forced_flushes: u64,
}

impl ExecutorStats {
    pub fn merge(&mut self, other: &ExecutorStats) {
        self.statements_prepared += other.statements_prepared;
        self.batches_executed += other.batches_executed;
        self.batched_rows += other.batched_rows;
        self.single_executions += other.single_executions;
        self.forced_flushes += other.forced_flushes;
    }
}

/// Statements whose shape never varies, prepared on first use.
struct KeyedStatements<H> {
    delete: Option<H>,
    read: Option<H>,
    scan: Option<H>,
}

impl<H> Default for KeyedStatements<H> {
    fn default() -> Self {
        Self {
            delete: None,
            read: None,
            scan: None,
        }
    }
}

pub struct BatchedExecutor<C: SqlConnection> {
    conn: C,
    table: String,
    key_field: String,
    policies: BatchPolicies,
    cache: StatementCache<C::Handle>,
    keyed: KeyedStatements<C::Handle>,
    active: Option<StatementId>,
    stats: ExecutorStats,
}

impl<C: SqlConnection> BatchedExecutor<C> {
    /// The table must already exist.
    pub fn new<T: Into<String>>(conn: C, table: T, policies: BatchPolicies) -> Self {
        let table = table.into();
        Self {
            conn,
            cache: StatementCache::new(table.clone(), KEY_FIELD),
            table,
            key_field: KEY_FIELD.to_string(),
            policies,
            keyed: KeyedStatements::default(),
            active: None,
            stats: ExecutorStats::default(),
        }
    }

    pub fn from_config(conn: C, config: &ClientConfig) -> Self {
        Self::new(conn, config.table.clone(), BatchPolicies::from_config(config))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn policies(&self) -> BatchPolicies {
        self.policies
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    pub fn cache(&self) -> &StatementCache<C::Handle> {
        &self.cache
    }

    /// The statement currently allowed to accumulate rows.
    pub fn active_statement(&self) -> Option<StatementId> {
        self.active
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats
    }

    /// Flush gate. If a statement other than `target` has pending rows they
    /// are sent now. A `Some` target becomes the active statement; `None`
    /// (read, scan, delete, cleanup) leaves the active slot unchanged.
    pub fn before_operation(&mut self, target: Option<StatementId>) -> Result<(), SqlKvError> {
        if let Some(active) = self.active {
            if target != Some(active) {
                let cs = self.cache.get_mut(active);
                if cs.pending_count() > 0 {
                    self.stats.forced_flushes += 1;
                    let affected = batch::flush(&mut self.conn, cs)?;
                    self.stats.batches_executed += 1;
                    self.stats.batched_rows += affected.len() as u64;
                }
            }
        }
        if target.is_some() {
            self.active = target;
        }
        Ok(())
    }

    pub fn insert(&mut self, key: &str, values: &Record) -> Result<(), SqlKvError> {
        self.mutate(StatementKind::Insert, key, values).map(|_| ())
    }

    /// Rows-affected is not checked: an update of a missing key is not an
    /// error, and batched updates only learn their counts at flush time.
    pub fn update(&mut self, key: &str, values: &Record) -> Result<(), SqlKvError> {
        if values.is_empty() {
            return Err(SqlKvError::invalid_argument("update requires at least one field"));
        }
        self.mutate(StatementKind::Update, key, values).map(|_| ())
    }

    pub fn delete(&mut self, key: &str) -> Result<(), SqlKvError> {
        if self.keyed.delete.is_none() {
            let text = sql::delete_sql(&self.table, &self.key_field);
            self.keyed.delete = Some(self.prepare_keyed(&text)?);
        }
        self.before_operation(None)?;
        let Some(handle) = self.keyed.delete.as_ref() else {
            return Err(SqlKvError::execution("delete statement missing"));
        };
        let affected = self.conn.execute_update(handle, &[key.to_string()])?;
        self.stats.single_executions += 1;
        if affected == 0 {
            return Err(SqlKvError::not_found(format!("key {key}")));
        }
        Ok(())
    }

    /// Reads one row. `fields = None` returns every non-key field.
    pub fn read(&mut self, key: &str, fields: Option<&[String]>) -> Result<Record, SqlKvError> {
        if self.keyed.read.is_none() {
            let text = sql::read_sql(&self.table, &self.key_field);
            self.keyed.read = Some(self.prepare_keyed(&text)?);
        }
        self.before_operation(None)?;
        let Some(handle) = self.keyed.read.as_ref() else {
            return Err(SqlKvError::execution("read statement missing"));
        };
        let key_field = self.key_field.as_str();
        let mut found: Option<Result<Record, SqlKvError>> = None;
        self.conn
            .execute_query(handle, &[key.to_string()], &mut |row| {
                found = Some(project(row, key_field, fields));
                ControlFlow::Break(())
            })?;
        match found {
            Some(record) => record,
            None => Err(SqlKvError::not_found(format!("key {key}"))),
        }
    }

    /// Returns up to `max_rows` records with key `>= start_key` in key order.
    pub fn scan(
        &mut self,
        start_key: &str,
        max_rows: usize,
        fields: Option<&[String]>,
    ) -> Result<Vec<Record>, SqlKvError> {
        let Some(fields) = fields else {
            return Err(SqlKvError::invalid_argument("scan requires a field set"));
        };
        if self.keyed.scan.is_none() {
            let text = sql::scan_sql(&self.table, &self.key_field);
            self.keyed.scan = Some(self.prepare_keyed(&text)?);
        }
        self.before_operation(None)?;
        let Some(handle) = self.keyed.scan.as_ref() else {
            return Err(SqlKvError::execution("scan statement missing"));
        };
        let key_field = self.key_field.as_str();
        let mut records = Vec::new();
        let mut failure = None;
        self.conn
            .execute_query(handle, &[start_key.to_string()], &mut |row| {
                if records.len() >= max_rows {
                    return ControlFlow::Break(());
                }
                match project(row, key_field, Some(fields)) {
                    Ok(record) => records.push(record),
                    Err(err) => {
                        failure = Some(err);
                        return ControlFlow::Break(());
                    }
                }
                if records.len() >= max_rows {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })?;
        match failure {
            Some(err) => Err(err),
            None => Ok(records),
        }
    }

    /// Sends any pending batch.
    pub fn flush(&mut self) -> Result<(), SqlKvError> {
        self.before_operation(None)
    }

    /// Flushes pending rows and commits when not in auto-commit mode.
    pub fn cleanup(&mut self) -> Result<(), SqlKvError> {
        self.flush()?;
        if !self.conn.is_auto_commit() {
            self.conn.commit()?;
        }
        Ok(())
    }

    pub fn close(mut self) -> Result<(), SqlKvError> {
        self.cleanup()?;
        self.conn.close()
    }

    fn mutate(
        &mut self,
        kind: StatementKind,
        key: &str,
        values: &Record,
    ) -> Result<AppendOutcome, SqlKvError> {
        let before = self.cache.len();
        let id = self
            .cache
            .get_or_create(&mut self.conn, kind, values.keys().map(String::as_str))?;
        if self.cache.len() > before {
            self.stats.statements_prepared += 1;
        }
        self.before_operation(Some(id))?;
        let cs = self.cache.get_mut(id);
        let row = batch::bind_row(cs, key, values)?;
        let outcome = batch::append(&mut self.conn, cs, row, self.policies.for_kind(kind))?;
        match &outcome {
            AppendOutcome::Executed(_) => self.stats.single_executions += 1,
            AppendOutcome::Accumulated(_) => {}
            AppendOutcome::Flushed(affected) => {
                self.stats.batches_executed += 1;
                self.stats.batched_rows += affected.len() as u64;
            }
        }
        Ok(outcome)
    }

    fn prepare_keyed(&mut self, text: &str) -> Result<C::Handle, SqlKvError> {
        let handle = self.conn.prepare(text)?;
        self.stats.statements_prepared += 1;
        debug!(sql = text, "prepared keyed statement");
        Ok(handle)
    }
}

fn project(
    row: RowView<'_>,
    key_field: &str,
    fields: Option<&[String]>,
) -> Result<Record, SqlKvError> {
    let mut record = Record::new();
    match fields {
        None => {
            for (column, value) in row.iter() {
                if column.eq_ignore_ascii_case(key_field) {
                    continue;
                }
                if let Some(value) = value {
                    record.insert(column.to_string(), value.to_string());
                }
            }
        }
        Some(fields) => {
            for field in fields {
                match row.get(field) {
                    None => {
                        return Err(SqlKvError::invalid_argument(format!(
                            "unknown field {field}"
                        )));
                    }
                    Some(Some(value)) => {
                        record.insert(field.clone(), value.to_string());
                    }
                    Some(None) => {}
                }
            }
        }
    }
    Ok(record)
}
