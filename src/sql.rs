//! SQL text for every statement shape the adapter issues.
//!
//! Parameters are positional (`?`). For insert the key is the first
//! parameter, for update it is the last; delete, read and scan take only the
//! key.

/// Names are used as plain identifiers; the driver rejects anything malformed
/// when the statement is prepared.
pub fn to_identifier(name: &str) -> &str {
    name
}

pub fn insert_sql(table: &str, key_field: &str, fields: &[String]) -> String {
    let mut columns = String::from(to_identifier(key_field));
    let mut params = String::from("?");
    for field in fields {
        columns.push_str(", ");
        columns.push_str(to_identifier(field));
        params.push_str(", ?");
    }
    format!(
        "INSERT INTO {} ({columns}) VALUES ({params})",
        to_identifier(table)
    )
}

pub fn update_sql(table: &str, key_field: &str, fields: &[String]) -> String {
    let assignments = fields
        .iter()
        .map(|field| format!("{} = ?", to_identifier(field)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {assignments} WHERE {} = ?",
        to_identifier(table),
        to_identifier(key_field)
    )
}

pub fn delete_sql(table: &str, key_field: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {} = ?",
        to_identifier(table),
        to_identifier(key_field)
    )
}

pub fn read_sql(table: &str, key_field: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = ?",
        to_identifier(table),
        to_identifier(key_field)
    )
}

/// Inclusive, key-ordered and unbounded; callers stop consuming rows once
/// they have enough.
pub fn scan_sql(table: &str, key_field: &str) -> String {
    let key = to_identifier(key_field);
    format!(
        "SELECT * FROM {} WHERE {key} >= ? ORDER BY {key}",
        to_identifier(table)
    )
}

pub fn create_table_sql(table: &str, key_field: &str, fields: &[String]) -> String {
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({} TEXT PRIMARY KEY",
        to_identifier(table),
        to_identifier(key_field)
    );
    for field in fields {
        sql.push_str(", ");
        sql.push_str(to_identifier(field));
        sql.push_str(" TEXT");
    }
    sql.push(')');
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_insert_places_key_first() {
        assert_eq!(
            insert_sql("usertable", "YCSB_KEY", &fields(&["field0", "field1"])),
            "INSERT INTO usertable (YCSB_KEY, field0, field1) VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn test_update_places_key_last() {
        assert_eq!(
            update_sql("usertable", "YCSB_KEY", &fields(&["field0", "field1"])),
            "UPDATE usertable SET field0 = ?, field1 = ? WHERE YCSB_KEY = ?"
        );
    }

    #[test]
    fn test_key_only_statements() {
        assert_eq!(
            delete_sql("t", "k"),
            "DELETE FROM t WHERE k = ?"
        );
        assert_eq!(read_sql("t", "k"), "SELECT * FROM t WHERE k = ?");
        assert_eq!(
            scan_sql("t", "k"),
            "SELECT * FROM t WHERE k >= ? ORDER BY k"
        );
    }

    #[test]
    fn test_create_table_lists_all_fields() {
        assert_eq!(
            create_table_sql("t", "k", &fields(&["f0", "f1"])),
            "CREATE TABLE IF NOT EXISTS t (k TEXT PRIMARY KEY, f0 TEXT, f1 TEXT)"
        );
    }
}
