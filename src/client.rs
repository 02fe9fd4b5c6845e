//! Workload-facing binding. Each public operation takes the connection lock,
//! runs on the executor and converts the outcome to a [`Status`]; database
//! failures never escape as errors.

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    connection::{SqlConnection, SqliteConnection},
    errors::SqlKvError,
    executor::{BatchedExecutor, ExecutorStats, Record},
    status::Status,
};

pub struct KvClient<C: SqlConnection = SqliteConnection> {
    table: String,
    inner: Mutex<BatchedExecutor<C>>,
}

impl<C: SqlConnection> KvClient<C> {
    pub fn new(executor: BatchedExecutor<C>) -> Self {
        Self {
            table: executor.table().to_string(),
            inner: Mutex::new(executor),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn insert(&self, table: &str, key: &str, values: &Record) -> Status {
        let result = self
            .check_table(table)
            .and_then(|_| self.inner.lock().insert(key, values));
        finish("insert", key, result)
    }

    pub fn update(&self, table: &str, key: &str, values: &Record) -> Status {
        let result = self
            .check_table(table)
            .and_then(|_| self.inner.lock().update(key, values));
        finish("update", key, result)
    }

    pub fn delete(&self, table: &str, key: &str) -> Status {
        let result = self
            .check_table(table)
            .and_then(|_| self.inner.lock().delete(key));
        finish("delete", key, result)
    }

    /// Reads `key` into `result`. `fields = None` reads every field.
    pub fn read(
        &self,
        table: &str,
        key: &str,
        fields: Option<&[String]>,
        result: &mut Record,
    ) -> Status {
        let outcome = self
            .check_table(table)
            .and_then(|_| self.inner.lock().read(key, fields));
        finish("read", key, outcome.map(|record| result.extend(record)))
    }

    /// Appends up to `record_count` rows starting at `start_key` to `result`.
    /// A missing field set or result sink is a bad request.
    pub fn scan(
        &self,
        table: &str,
        start_key: &str,
        record_count: usize,
        fields: Option<&[String]>,
        result: Option<&mut Vec<Record>>,
    ) -> Status {
        let (Some(fields), Some(result)) = (fields, result) else {
            return Status::BadRequest;
        };
        let outcome = self
            .check_table(table)
            .and_then(|_| self.inner.lock().scan(start_key, record_count, Some(fields)));
        finish("scan", start_key, outcome.map(|records| result.extend(records)))
    }

    /// Flushes any pending batch and commits outside auto-commit mode.
    pub fn cleanup(&self) -> Result<(), SqlKvError> {
        self.inner.lock().cleanup()
    }

    pub fn stats(&self) -> ExecutorStats {
        self.inner.lock().stats()
    }

    pub fn with_executor<R>(&self, f: impl FnOnce(&BatchedExecutor<C>) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn close(self) -> Result<(), SqlKvError> {
        self.inner.into_inner().close()
    }

    fn check_table(&self, table: &str) -> Result<(), SqlKvError> {
        if table == self.table {
            Ok(())
        } else {
            Err(SqlKvError::invalid_argument(format!(
                "client is bound to table {}, not {table}",
                self.table
            )))
        }
    }
}

fn finish(op: &str, key: &str, result: Result<(), SqlKvError>) -> Status {
    let status = Status::from(&result);
    if let Err(err) = &result {
        match status {
            Status::Error => warn!(op, key, error = %err, "operation failed"),
            _ => debug!(op, key, status = status.name(), error = %err, "operation rejected"),
        }
    }
    status
}
