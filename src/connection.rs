//! Client-driver seam. The executor only talks to a [`SqlConnection`]; the
//! SQLite implementation backs it with rusqlite, whose per-connection
//! statement cache holds the parsed statements behind each handle.

use std::{ops::ControlFlow, time::Duration};

use rusqlite::{Connection, params_from_iter, types::ValueRef};
use tracing::debug;

use crate::errors::SqlKvError;

const STATEMENT_CACHE_CAPACITY: usize = 128;

/// One result row: column names shared by the cursor plus this row's values.
/// SQL `NULL` is `None`.
#[derive(Clone, Copy, Debug)]
pub struct RowView<'a> {
    pub columns: &'a [String],
    pub values: &'a [Option<String>],
}

impl<'a> RowView<'a> {
    /// `None` if the column does not exist, `Some(None)` if it is `NULL`.
    pub fn get(&self, column: &str) -> Option<Option<&'a str>> {
        self.columns
            .iter()
            .position(|name| name.eq_ignore_ascii_case(column))
            .map(|idx| self.values[idx].as_deref())
    }

    pub fn iter(self) -> impl Iterator<Item = (&'a str, Option<&'a str>)> + 'a {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }
}

pub trait SqlConnection {
    type Handle;

    fn prepare(&mut self, sql: &str) -> Result<Self::Handle, SqlKvError>;
    fn execute_update(
        &mut self,
        handle: &Self::Handle,
        params: &[String],
    ) -> Result<usize, SqlKvError>;
    /// Executes every row as one unit; returns rows affected per entry.
    fn execute_batch(
        &mut self,
        handle: &Self::Handle,
        rows: &[Vec<String>],
    ) -> Result<Vec<usize>, SqlKvError>;
    /// Streams rows to `visit` until the cursor is exhausted or `visit` breaks.
    fn execute_query(
        &mut self,
        handle: &Self::Handle,
        params: &[String],
        visit: &mut dyn FnMut(RowView<'_>) -> ControlFlow<()>,
    ) -> Result<(), SqlKvError>;
    fn commit(&mut self) -> Result<(), SqlKvError>;
    fn is_auto_commit(&self) -> bool;
    fn close(self) -> Result<(), SqlKvError>
    where
        Self: Sized;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqliteStatement {
    sql: String,
}

impl SqliteStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

pub struct SqliteConnection {
    conn: Connection,
    auto_commit: bool,
}

impl SqliteConnection {
    /// Opens `url`: `memory`/`:memory:` for a private in-memory database,
    /// a `file:` URI, or a filesystem path.
    pub fn open(url: &str, auto_commit: bool, busy_timeout: Duration) -> Result<Self, SqlKvError> {
        let conn = match url {
            "memory" | ":memory:" => Connection::open_in_memory(),
            other => Connection::open(other),
        }
        .map_err(|e| SqlKvError::connection(format!("{url}: {e}")))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| SqlKvError::connection(e.to_string()))?;
        Self::from_connection(conn, auto_commit)
    }

    pub fn from_connection(conn: Connection, auto_commit: bool) -> Result<Self, SqlKvError> {
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        if !auto_commit {
            conn.execute_batch("BEGIN")
                .map_err(|e| SqlKvError::connection(e.to_string()))?;
        }
        Ok(Self { conn, auto_commit })
    }
}

impl SqlConnection for SqliteConnection {
    type Handle = SqliteStatement;

    fn prepare(&mut self, sql: &str) -> Result<SqliteStatement, SqlKvError> {
        self.conn
            .prepare_cached(sql)
            .map_err(|e| SqlKvError::preparation(format!("{sql}: {e}")))?;
        debug!(sql, "prepared statement");
        Ok(SqliteStatement {
            sql: sql.to_string(),
        })
    }

    fn execute_update(
        &mut self,
        handle: &SqliteStatement,
        params: &[String],
    ) -> Result<usize, SqlKvError> {
        let mut stmt = self
            .conn
            .prepare_cached(&handle.sql)
            .map_err(|e| SqlKvError::preparation(e.to_string()))?;
        stmt.execute(params_from_iter(params.iter()))
            .map_err(|e| SqlKvError::execution(e.to_string()))
    }

    fn execute_batch(
        &mut self,
        handle: &SqliteStatement,
        rows: &[Vec<String>],
    ) -> Result<Vec<usize>, SqlKvError> {
        let sp = self
            .conn
            .savepoint()
            .map_err(|e| SqlKvError::execution(e.to_string()))?;
        let mut affected = Vec::with_capacity(rows.len());
        {
            let mut stmt = sp
                .prepare_cached(&handle.sql)
                .map_err(|e| SqlKvError::preparation(e.to_string()))?;
            for row in rows {
                let count = stmt
                    .execute(params_from_iter(row.iter()))
                    .map_err(|e| SqlKvError::execution(e.to_string()))?;
                affected.push(count);
            }
        }
        sp.commit()
            .map_err(|e| SqlKvError::execution(e.to_string()))?;
        Ok(affected)
    }

    fn execute_query(
        &mut self,
        handle: &SqliteStatement,
        params: &[String],
        visit: &mut dyn FnMut(RowView<'_>) -> ControlFlow<()>,
    ) -> Result<(), SqlKvError> {
        let mut stmt = self
            .conn
            .prepare_cached(&handle.sql)
            .map_err(|e| SqlKvError::preparation(e.to_string()))?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|e| SqlKvError::execution(e.to_string()))?;
        let mut values = Vec::with_capacity(columns.len());
        while let Some(row) = rows
            .next()
            .map_err(|e| SqlKvError::execution(e.to_string()))?
        {
            values.clear();
            for idx in 0..columns.len() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| SqlKvError::execution(e.to_string()))?;
                values.push(value_to_string(value));
            }
            let view = RowView {
                columns: &columns,
                values: &values,
            };
            if visit(view).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SqlKvError> {
        if self.auto_commit {
            return Ok(());
        }
        self.conn
            .execute_batch("COMMIT; BEGIN")
            .map_err(|e| SqlKvError::execution(e.to_string()))
    }

    fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn close(self) -> Result<(), SqlKvError> {
        self.conn
            .close()
            .map_err(|(_, e)| SqlKvError::connection(e.to_string()))
    }
}

fn value_to_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Real(v) => Some(v.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
