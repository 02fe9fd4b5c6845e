//! Property-based configuration.
//!
//! Properties come from Java-style `key=value` files (as passed with `-P`) and
//! individual `-p key=value` overrides. [`ClientConfig::from_properties`]
//! resolves them into typed settings, falling back to the defaults below.

use std::{collections::BTreeMap, fs, path::Path, str::FromStr};

use serde::Serialize;

use crate::errors::SqlKvError;

pub const CONNECTION_URL: &str = "db.url";
pub const CONNECTION_USER: &str = "db.user";
pub const CONNECTION_PASSWD: &str = "db.passwd";
pub const AUTO_COMMIT: &str = "jdbc.autocommit";
pub const BATCH_SIZE: &str = "db.batchsize";
pub const BATCH_UPDATES: &str = "jdbc.batchupdateapi";
pub const BUSY_TIMEOUT_MS: &str = "db.busytimeout";
pub const TABLE_NAME: &str = "table";
pub const FIELD_COUNT: &str = "fieldcount";
pub const FIELD_NAME_PREFIX: &str = "fieldnameprefix";

pub const DEFAULT_URL: &str = "memory";
pub const DEFAULT_USER: &str = "sqlkv";
pub const DEFAULT_BATCH_SIZE: u32 = 10;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_TABLE: &str = "usertable";
pub const DEFAULT_FIELD_COUNT: usize = 10;
pub const DEFAULT_FIELD_PREFIX: &str = "field";

/// Primary key column of the benchmark table.
pub const KEY_FIELD: &str = "YCSB_KEY";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SqlKvError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SqlKvError::config(format!("{}: {e}", path.display())))?;
        Ok(Self::parse(&text))
    }

    /// Parses `key=value` and `key: value` lines; `#` and `!` start comments.
    pub fn parse(text: &str) -> Self {
        let mut props = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let split = line.find(['=', ':']);
            let (key, value) = match split {
                Some(idx) => (&line[..idx], &line[idx + 1..]),
                None => (line, ""),
            };
            props.set(key.trim(), value.trim());
        }
        props
    }

    pub fn merge(&mut self, other: Properties) {
        self.entries.extend(other.entries);
    }

    /// Applies a single `key=value` override.
    pub fn apply_override(&mut self, pair: &str) -> Result<(), SqlKvError> {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| SqlKvError::config(format!("expected key=value, got {pair}")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(SqlKvError::config(format!("empty key in {pair}")));
        }
        self.set(key, value.trim());
        Ok(())
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, SqlKvError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e| SqlKvError::config(format!("{key}={raw}: {e}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
    pub url: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub auto_commit: bool,
    pub batch_size: u32,
    pub batch_updates: bool,
    pub busy_timeout_ms: u64,
    pub table: String,
    pub field_count: usize,
    pub field_prefix: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            auto_commit: true,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_updates: false,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            table: DEFAULT_TABLE.to_string(),
            field_count: DEFAULT_FIELD_COUNT,
            field_prefix: DEFAULT_FIELD_PREFIX.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_properties(props: &Properties) -> Result<Self, SqlKvError> {
        let url = props.get_or(CONNECTION_URL, DEFAULT_URL);
        let url = url.strip_prefix("sqlite:").unwrap_or(url).to_string();
        if url.is_empty() {
            return Err(SqlKvError::config(format!("{CONNECTION_URL} must not be empty")));
        }
        let table = props.get_or(TABLE_NAME, DEFAULT_TABLE).to_string();
        if table.is_empty() {
            return Err(SqlKvError::config(format!("{TABLE_NAME} must not be empty")));
        }
        let field_count = props.parsed(FIELD_COUNT, DEFAULT_FIELD_COUNT)?;
        if field_count == 0 {
            return Err(SqlKvError::config(format!("{FIELD_COUNT} must be positive")));
        }
        Ok(Self {
            url,
            user: props.get_or(CONNECTION_USER, DEFAULT_USER).to_string(),
            password: props.get_or(CONNECTION_PASSWD, "").to_string(),
            auto_commit: props.parsed(AUTO_COMMIT, true)?,
            batch_size: props.parsed(BATCH_SIZE, DEFAULT_BATCH_SIZE)?,
            batch_updates: props.parsed(BATCH_UPDATES, false)?,
            busy_timeout_ms: props.parsed(BUSY_TIMEOUT_MS, DEFAULT_BUSY_TIMEOUT_MS)?,
            table,
            field_count,
            field_prefix: props
                .get_or(FIELD_NAME_PREFIX, DEFAULT_FIELD_PREFIX)
                .to_string(),
        })
    }

    /// Column names of the value fields, `<prefix>0 .. <prefix>N-1`.
    pub fn field_names(&self) -> Vec<String> {
        (0..self.field_count)
            .map(|idx| format!("{}{idx}", self.field_prefix))
            .collect()
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.url.as_str(), "memory" | ":memory:")
    }
}
