//! Database collaborator contract.
//!
//! The engine never talks SQL itself; it carries an optional [`Database`]
//! that presenters and callbacks reach through the application. The
//! contract is deliberately small: parameterized statements with `?`
//! placeholders, explicit transactions, and provided CRUD helpers that
//! generate their SQL through [`build_insert`], [`build_update`] and
//! [`build_delete`] so identifiers are always sanitized.
//!
//! Wrap any implementation in [`TracedDatabase`] to capture a per-call
//! log for debugging.

mod trace;

pub use trace::{DbCall, TracedDatabase};

use serde_json::Value;
use thiserror::Error as ThisError;

/// One result row, keyed by column name.
///
/// Backed by a sorted map, so iteration (and therefore generated column
/// order) is deterministic.
pub type Row = serde_json::Map<String, Value>;

/// Row selector for [`Database::update`] and [`Database::delete`].
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// Match on the `id` column.
    Id(i64),
    /// Match on `column = value` pairs, ANDed together.
    Where(Vec<(String, Value)>),
}

impl Key {
    /// WHERE clause and its bound params.
    fn to_clause(&self) -> Result<(String, Vec<Value>), DbError> {
        match self {
            Key::Id(id) => Ok(("id = ?".to_string(), vec![Value::from(*id)])),
            Key::Where(pairs) => {
                if pairs.is_empty() {
                    return Err(DbError::EmptyKey);
                }
                let mut clauses = Vec::with_capacity(pairs.len());
                let mut params = Vec::with_capacity(pairs.len());
                for (column, value) in pairs {
                    clauses.push(format!("{} = ?", sanitize_identifier(column)?));
                    params.push(value.clone());
                }
                Ok((clauses.join(" AND "), params))
            }
        }
    }
}

/// Data-access failures, surfaced to clients under the `database` category.
#[derive(Debug, ThisError)]
pub enum DbError {
    #[error("query failed: {message}")]
    Query { message: String },

    #[error("connection failed: {message}")]
    Connection { message: String },

    #[error("no transaction is active")]
    NoTransaction,

    #[error("a transaction is already active")]
    NestedTransaction,

    #[error("identifier `{identifier}` has no valid characters")]
    InvalidIdentifier { identifier: String },

    #[error("{operation} on `{table}` with no columns")]
    EmptyData {
        operation: &'static str,
        table: String,
    },

    #[error("refusing an unkeyed update or delete")]
    EmptyKey,
}

impl DbError {
    pub fn query(message: impl Into<String>) -> Self {
        DbError::Query {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        DbError::Connection {
            message: message.into(),
        }
    }
}

/// Strip everything outside `[A-Za-z0-9_-]` from an identifier.
///
/// Identifiers are interpolated into SQL text (placeholders only cover
/// values), so this runs on every table and column name the CRUD helpers
/// touch. An identifier with nothing left after stripping is an error.
pub fn sanitize_identifier(identifier: &str) -> Result<String, DbError> {
    let cleaned: String = identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return Err(DbError::InvalidIdentifier {
            identifier: identifier.to_string(),
        });
    }
    Ok(cleaned)
}

/// `INSERT` statement and bound params for `row`.
pub fn build_insert(table: &str, row: &Row) -> Result<(String, Vec<Value>), DbError> {
    let table = sanitize_identifier(table)?;
    if row.is_empty() {
        return Err(DbError::EmptyData {
            operation: "insert",
            table,
        });
    }
    let mut columns = Vec::with_capacity(row.len());
    let mut params = Vec::with_capacity(row.len());
    for (column, value) in row {
        columns.push(sanitize_identifier(column)?);
        params.push(value.clone());
    }
    let placeholders = vec!["?"; params.len()].join(", ");
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    );
    Ok((sql, params))
}

/// `UPDATE` statement and bound params for `data`, keyed by `key`.
pub fn build_update(table: &str, data: &Row, key: &Key) -> Result<(String, Vec<Value>), DbError> {
    let table = sanitize_identifier(table)?;
    if data.is_empty() {
        return Err(DbError::EmptyData {
            operation: "update",
            table,
        });
    }
    let mut assignments = Vec::with_capacity(data.len());
    let mut params = Vec::with_capacity(data.len() + 1);
    for (column, value) in data {
        assignments.push(format!("{} = ?", sanitize_identifier(column)?));
        params.push(value.clone());
    }
    let (clause, key_params) = key.to_clause()?;
    params.extend(key_params);
    let sql = format!("UPDATE {table} SET {} WHERE {clause}", assignments.join(", "));
    Ok((sql, params))
}

/// `DELETE` statement and bound params, keyed by `key`.
pub fn build_delete(table: &str, key: &Key) -> Result<(String, Vec<Value>), DbError> {
    let table = sanitize_identifier(table)?;
    let (clause, params) = key.to_clause()?;
    Ok((format!("DELETE FROM {table} WHERE {clause}"), params))
}

/// Storage contract the engine carries for its handlers.
///
/// Implementations supply the five primitives plus transaction control;
/// the CRUD helpers are provided on top and route through [`Database::exec`].
/// All statements are parameterized with `?` placeholders.
pub trait Database: Send + Sync {
    /// Run a statement, returning the number of affected rows.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, DbError>;

    /// Run a query, returning the first row if any.
    fn fetch(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, DbError>;

    /// Run a query, returning every row.
    fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError>;

    fn begin(&self) -> Result<(), DbError>;

    fn commit(&self) -> Result<(), DbError>;

    fn rollback(&self) -> Result<(), DbError>;

    fn in_transaction(&self) -> bool;

    fn insert(&self, table: &str, row: &Row) -> Result<u64, DbError> {
        let (sql, params) = build_insert(table, row)?;
        self.exec(&sql, &params)
    }

    fn update(&self, table: &str, data: &Row, key: &Key) -> Result<u64, DbError> {
        let (sql, params) = build_update(table, data, key)?;
        self.exec(&sql, &params)
    }

    fn delete(&self, table: &str, key: &Key) -> Result<u64, DbError> {
        let (sql, params) = build_delete(table, key)?;
        self.exec(&sql, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_sanitize_strips_disallowed_characters() {
        assert_eq!(
            sanitize_identifier("users; DROP TABLE t").unwrap(),
            "usersDROPTABLEt"
        );
        assert_eq!(sanitize_identifier("order-items_2").unwrap(), "order-items_2");
    }

    #[test]
    fn test_sanitize_rejects_fully_invalid_identifier() {
        assert!(matches!(
            sanitize_identifier("!!!"),
            Err(DbError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_insert_sql_orders_columns_deterministically() {
        let (sql, params) =
            build_insert("pets", &row(&[("name", json!("Rex")), ("age", json!(3))])).unwrap();
        assert_eq!(sql, "INSERT INTO pets (age, name) VALUES (?, ?)");
        assert_eq!(params, vec![json!(3), json!("Rex")]);
    }

    #[test]
    fn test_update_appends_key_params_after_data() {
        let (sql, params) = build_update(
            "pets",
            &row(&[("name", json!("Rex"))]),
            &Key::Id(7),
        )
        .unwrap();
        assert_eq!(sql, "UPDATE pets SET name = ? WHERE id = ?");
        assert_eq!(params, vec![json!("Rex"), json!(7)]);
    }

    #[test]
    fn test_delete_with_where_key_ands_pairs() {
        let key = Key::Where(vec![
            ("owner".to_string(), json!("ann")),
            ("sold".to_string(), json!(false)),
        ]);
        let (sql, params) = build_delete("pets", &key).unwrap();
        assert_eq!(sql, "DELETE FROM pets WHERE owner = ? AND sold = ?");
        assert_eq!(params, vec![json!("ann"), json!(false)]);
    }

    #[test]
    fn test_empty_key_and_empty_data_are_refused() {
        assert!(matches!(
            build_delete("pets", &Key::Where(Vec::new())),
            Err(DbError::EmptyKey)
        ));
        assert!(matches!(
            build_insert("pets", &Row::new()),
            Err(DbError::EmptyData { .. })
        ));
    }

    #[test]
    fn test_malicious_table_name_is_neutralized() {
        let (sql, _) = build_delete("pets; DROP TABLE pets", &Key::Id(1)).unwrap();
        assert_eq!(sql, "DELETE FROM petsDROPTABLEpets WHERE id = ?");
    }
}
