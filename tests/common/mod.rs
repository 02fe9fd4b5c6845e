#![allow(dead_code)]

use std::{ops::ControlFlow, time::Duration};

use sqlkv::{
    BatchPolicies, BatchedExecutor, ClientConfig, KEY_FIELD, Record, RowView, SqlConnection,
    SqlKvError, SqliteConnection,
    connection::SqliteStatement,
    schema::{TableSchema, ensure_table},
};

pub const TABLE: &str = "usertable";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Prepare(String),
    Update { sql: String, params: Vec<String> },
    Batch { sql: String, rows: Vec<Vec<String>> },
    Query { sql: String, params: Vec<String> },
    Commit,
}

/// Real SQLite connection that records every driver call.
pub struct RecordingConnection {
    inner: SqliteConnection,
    pub events: Vec<Event>,
    pub fail_batches: bool,
}

impl RecordingConnection {
    pub fn new(inner: SqliteConnection) -> Self {
        Self {
            inner,
            events: Vec::new(),
            fail_batches: false,
        }
    }

    pub fn batches(&self) -> Vec<&Vec<Vec<String>>> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Batch { rows, .. } => Some(rows),
                _ => None,
            })
            .collect()
    }

    pub fn prepares(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Prepare(sql) => Some(sql.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn single_updates(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, Event::Update { .. }))
            .count()
    }
}

impl SqlConnection for RecordingConnection {
    type Handle = SqliteStatement;

    fn prepare(&mut self, sql: &str) -> Result<SqliteStatement, SqlKvError> {
        self.events.push(Event::Prepare(sql.to_string()));
        self.inner.prepare(sql)
    }

    fn execute_update(
        &mut self,
        handle: &SqliteStatement,
        params: &[String],
    ) -> Result<usize, SqlKvError> {
        self.events.push(Event::Update {
            sql: handle.sql().to_string(),
            params: params.to_vec(),
        });
        self.inner.execute_update(handle, params)
    }

    fn execute_batch(
        &mut self,
        handle: &SqliteStatement,
        rows: &[Vec<String>],
    ) -> Result<Vec<usize>, SqlKvError> {
        self.events.push(Event::Batch {
            sql: handle.sql().to_string(),
            rows: rows.to_vec(),
        });
        if self.fail_batches {
            return Err(SqlKvError::execution("injected batch failure"));
        }
        self.inner.execute_batch(handle, rows)
    }

    fn execute_query(
        &mut self,
        handle: &SqliteStatement,
        params: &[String],
        visit: &mut dyn FnMut(RowView<'_>) -> ControlFlow<()>,
    ) -> Result<(), SqlKvError> {
        self.events.push(Event::Query {
            sql: handle.sql().to_string(),
            params: params.to_vec(),
        });
        self.inner.execute_query(handle, params, visit)
    }

    fn commit(&mut self) -> Result<(), SqlKvError> {
        self.events.push(Event::Commit);
        self.inner.commit()
    }

    fn is_auto_commit(&self) -> bool {
        self.inner.is_auto_commit()
    }

    fn close(self) -> Result<(), SqlKvError> {
        self.inner.close()
    }
}

pub fn schema() -> TableSchema {
    TableSchema::from_config(&ClientConfig::default(), KEY_FIELD)
}

pub fn memory_connection() -> SqliteConnection {
    let mut conn =
        SqliteConnection::open("memory", true, Duration::from_millis(1_000)).expect("open");
    ensure_table(&mut conn, &schema()).expect("schema");
    conn
}

pub fn recording_executor(policies: BatchPolicies) -> BatchedExecutor<RecordingConnection> {
    BatchedExecutor::new(RecordingConnection::new(memory_connection()), TABLE, policies)
}

pub fn sqlite_executor(policies: BatchPolicies) -> BatchedExecutor<SqliteConnection> {
    BatchedExecutor::new(memory_connection(), TABLE, policies)
}

pub fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

pub fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}
