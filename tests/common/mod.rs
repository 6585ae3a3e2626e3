// Shared across suites; not every suite uses every helper.
#![allow(dead_code)]

pub mod fake_db {
    use dais::db::{Database, DbError, Row};
    use serde_json::Value;
    use std::sync::Mutex;

    /// In-memory [`Database`] for tests: records every executed statement,
    /// serves scripted rows, and tracks a single transaction flag.
    #[derive(Default)]
    pub struct RecordingDb {
        statements: Mutex<Vec<(String, Vec<Value>)>>,
        rows: Mutex<Vec<Row>>,
        tx_active: Mutex<bool>,
        queued_failure: Mutex<Option<String>>,
    }

    impl RecordingDb {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_rows(rows: Vec<Row>) -> Self {
            let db = Self::default();
            *db.rows.lock().unwrap() = rows;
            db
        }

        /// Statements executed so far, in order.
        pub fn recorded(&self) -> Vec<(String, Vec<Value>)> {
            self.statements.lock().unwrap().clone()
        }

        /// Make the next `exec` fail with a query error.
        pub fn fail_next(&self, message: &str) {
            *self.queued_failure.lock().unwrap() = Some(message.to_string());
        }
    }

    impl Database for RecordingDb {
        fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
            if let Some(message) = self.queued_failure.lock().unwrap().take() {
                return Err(DbError::query(message));
            }
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(1)
        }

        fn fetch(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, DbError> {
            self.exec(sql, params)?;
            Ok(self.rows.lock().unwrap().first().cloned())
        }

        fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
            self.exec(sql, params)?;
            Ok(self.rows.lock().unwrap().clone())
        }

        fn begin(&self) -> Result<(), DbError> {
            let mut tx = self.tx_active.lock().unwrap();
            if *tx {
                return Err(DbError::NestedTransaction);
            }
            *tx = true;
            Ok(())
        }

        fn commit(&self) -> Result<(), DbError> {
            let mut tx = self.tx_active.lock().unwrap();
            if !*tx {
                return Err(DbError::NoTransaction);
            }
            *tx = false;
            Ok(())
        }

        fn rollback(&self) -> Result<(), DbError> {
            let mut tx = self.tx_active.lock().unwrap();
            if !*tx {
                return Err(DbError::NoTransaction);
            }
            *tx = false;
            Ok(())
        }

        fn in_transaction(&self) -> bool {
            *self.tx_active.lock().unwrap()
        }
    }

    /// Build a [`Row`] from literal pairs.
    pub fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}
