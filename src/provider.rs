use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    client::KvClient,
    config::{ClientConfig, KEY_FIELD},
    connection::SqliteConnection,
    errors::SqlKvError,
    executor::BatchedExecutor,
    schema::{TableSchema, ensure_table},
};

/// Opens configured connections and creates the benchmark table before any
/// executor sees them. A private in-memory database is a fresh database per
/// connection, so its table is created every time; for anything else the
/// schema step runs once per provider.
pub struct ConnectionProvider {
    config: ClientConfig,
    schema: TableSchema,
    schema_ready: Mutex<bool>,
}

impl ConnectionProvider {
    pub fn new(config: ClientConfig) -> Self {
        let schema = TableSchema::from_config(&config, KEY_FIELD);
        Self {
            config,
            schema,
            schema_ready: Mutex::new(false),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn connect(&self) -> Result<SqliteConnection, SqlKvError> {
        let mut conn = SqliteConnection::open(
            &self.config.url,
            self.config.auto_commit,
            Duration::from_millis(self.config.busy_timeout_ms),
        )?;
        if self.config.is_in_memory() {
            ensure_table(&mut conn, &self.schema)?;
        } else {
            let mut ready = self.schema_ready.lock();
            if !*ready {
                ensure_table(&mut conn, &self.schema)?;
                debug!(table = %self.schema.table, "schema initialized");
                *ready = true;
            }
        }
        Ok(conn)
    }

    pub fn executor(&self) -> Result<BatchedExecutor<SqliteConnection>, SqlKvError> {
        Ok(BatchedExecutor::from_config(self.connect()?, &self.config))
    }

    pub fn client(&self) -> Result<KvClient, SqlKvError> {
        Ok(KvClient::new(self.executor()?))
    }
}
