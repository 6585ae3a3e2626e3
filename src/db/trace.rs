//! Debug wrapper recording every database call.

use super::{build_delete, build_insert, build_update, Database, DbError, Key, Row};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;

/// One recorded call: which method ran, the SQL it issued (transaction
/// control has none), its params, and when it started, finished, and how
/// long it took.
#[derive(Debug, Clone)]
pub struct DbCall {
    pub method: &'static str,
    pub sql: Option<String>,
    pub params: Vec<Value>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
    pub elapsed: Duration,
    pub ok: bool,
}

/// Wraps any [`Database`] and keeps an append-only log of calls.
///
/// The CRUD helpers are overridden so the log shows `insert`/`update`/
/// `delete` by name, with the generated SQL, as single entries rather than
/// anonymous `exec` calls. Each call is also emitted as a `debug` tracing
/// event with its latency.
pub struct TracedDatabase<D> {
    inner: D,
    calls: Mutex<Vec<DbCall>>,
}

impl<D: Database> TracedDatabase<D> {
    pub fn new(inner: D) -> Self {
        TracedDatabase {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Snapshot of the call log, oldest first.
    pub fn calls(&self) -> Vec<DbCall> {
        self.log().clone()
    }

    pub fn call_count(&self) -> usize {
        self.log().len()
    }

    fn log(&self) -> MutexGuard<'_, Vec<DbCall>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record<T>(
        &self,
        method: &'static str,
        sql: Option<&str>,
        params: &[Value],
        run: impl FnOnce(&D) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let started_at = SystemTime::now();
        let start = Instant::now();
        let result = run(&self.inner);
        let elapsed = start.elapsed();
        let finished_at = SystemTime::now();
        debug!(
            method,
            sql = sql.unwrap_or(""),
            elapsed_us = elapsed.as_micros() as u64,
            ok = result.is_ok(),
            "db call"
        );
        self.log().push(DbCall {
            method,
            sql: sql.map(String::from),
            params: params.to_vec(),
            started_at,
            finished_at,
            elapsed,
            ok: result.is_ok(),
        });
        result
    }
}

impl<D: Database> Database for TracedDatabase<D> {
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        self.record("exec", Some(sql), params, |db| db.exec(sql, params))
    }

    fn fetch(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, DbError> {
        self.record("fetch", Some(sql), params, |db| db.fetch(sql, params))
    }

    fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        self.record("fetch_all", Some(sql), params, |db| db.fetch_all(sql, params))
    }

    fn begin(&self) -> Result<(), DbError> {
        self.record("begin", None, &[], |db| db.begin())
    }

    fn commit(&self) -> Result<(), DbError> {
        self.record("commit", None, &[], |db| db.commit())
    }

    fn rollback(&self) -> Result<(), DbError> {
        self.record("rollback", None, &[], |db| db.rollback())
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    fn insert(&self, table: &str, row: &Row) -> Result<u64, DbError> {
        let (sql, params) = build_insert(table, row)?;
        self.record("insert", Some(&sql), &params, |db| db.exec(&sql, &params))
    }

    fn update(&self, table: &str, data: &Row, key: &Key) -> Result<u64, DbError> {
        let (sql, params) = build_update(table, data, key)?;
        self.record("update", Some(&sql), &params, |db| db.exec(&sql, &params))
    }

    fn delete(&self, table: &str, key: &Key) -> Result<u64, DbError> {
        let (sql, params) = build_delete(table, key)?;
        self.record("delete", Some(&sql), &params, |db| db.exec(&sql, &params))
    }
}
