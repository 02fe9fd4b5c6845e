use crate::{config::ClientConfig, connection::SqlConnection, errors::SqlKvError, sql};

/// Shape of the single benchmark table: a text primary key plus text fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub key_field: String,
    pub fields: Vec<String>,
}

impl TableSchema {
    pub fn from_config(config: &ClientConfig, key_field: &str) -> Self {
        Self {
            table: config.table.clone(),
            key_field: key_field.to_string(),
            fields: config.field_names(),
        }
    }
}

/// Creates the table if it does not exist and commits the DDL.
pub fn ensure_table<C: SqlConnection>(conn: &mut C, schema: &TableSchema) -> Result<(), SqlKvError> {
    let ddl = sql::create_table_sql(&schema.table, &schema.key_field, &schema.fields);
    let handle = conn
        .prepare(&ddl)
        .map_err(|e| SqlKvError::schema(e.to_string()))?;
    conn.execute_update(&handle, &[])
        .map_err(|e| SqlKvError::schema(e.to_string()))?;
    conn.commit()
        .map_err(|e| SqlKvError::schema(e.to_string()))?;
    Ok(())
}
