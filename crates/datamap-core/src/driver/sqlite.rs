// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! SQLite driver over `rusqlite`.
//!
//! Placeholders are bound by name: the leading `@`, `:` or `$` is stripped
//! and the rest is looked up in the command parameters ignoring case.
//!
//! An in-memory database (`:memory:`) only lives while the connection is
//! open, so it is lost when the client closes the connection between
//! operations.

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{
    ToSql,
    types::{ToSqlOutput, Value as SqlValue, ValueRef}
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{AsyncConnection, Connection, ConnectionState, ResultSet, check_cancelled};
use crate::{command::Command, error::DriverError, value::Value};

/// SQLite connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
    /// Database file, or `:memory:`.
    pub path:         PathBuf,
    /// How long a locked database is retried.
    #[serde(with = "millis")]
    pub busy_timeout: Duration
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            path:         PathBuf::from(":memory:"),
            busy_timeout: Duration::from_secs(5)
        }
    }
}

impl SqliteOptions {
    /// Options for the database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the busy timeout.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

type Shared = Arc<Mutex<Option<rusqlite::Connection>>>;

/// SQLite connection implementing both driver traits.
///
/// Async calls run the blocking driver on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    options: SqliteOptions,
    inner:   Shared
}

impl SqliteConnection {
    /// Closed connection to the database described by `options`.
    pub fn new(options: SqliteOptions) -> Self {
        Self {
            options,
            inner: Arc::new(Mutex::new(None))
        }
    }

    /// Closed connection to the database file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(SqliteOptions::new(path))
    }

    /// Connection settings.
    pub const fn options(&self) -> &SqliteOptions {
        &self.options
    }

    /// Run `f` against the open connection.
    fn with_open<R>(
        inner: &Shared,
        f: impl FnOnce(&rusqlite::Connection) -> Result<R, DriverError>
    ) -> Result<R, DriverError> {
        let guard = inner.lock();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(DriverError::closed())
        }
    }

    async fn blocking<R, F>(&self, f: F) -> Result<R, DriverError>
    where
        R: Send + 'static,
        F: FnOnce(&Shared) -> Result<R, DriverError> + Send + 'static
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(DriverError::new)?
    }
}

fn open_shared(inner: &Shared, options: &SqliteOptions) -> Result<(), DriverError> {
    let mut guard = inner.lock();
    if guard.is_some() {
        return Ok(());
    }
    let conn = if options.path.as_os_str() == ":memory:" {
        rusqlite::Connection::open_in_memory()
    } else {
        rusqlite::Connection::open(&options.path)
    }
    .map_err(DriverError::new)?;
    conn.busy_timeout(options.busy_timeout).map_err(DriverError::new)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(DriverError::new)?;
    trace!(path = %options.path.display(), "sqlite connection opened");
    *guard = Some(conn);
    Ok(())
}

fn close_shared(inner: &Shared) -> Result<(), DriverError> {
    let taken = inner.lock().take();
    if let Some(conn) = taken {
        conn.close().map_err(|(_, err)| DriverError::new(err))?;
        trace!("sqlite connection closed");
    }
    Ok(())
}

fn state_of(inner: &Shared) -> ConnectionState {
    if inner.lock().is_some() { ConnectionState::Open } else { ConnectionState::Closed }
}

fn prepare<'c>(conn: &'c rusqlite::Connection, command: &Command) -> Result<rusqlite::Statement<'c>, DriverError> {
    let mut stmt = conn.prepare(&command.text).map_err(DriverError::new)?;
    for index in 1..=stmt.parameter_count() {
        let name = stmt
            .parameter_name(index)
            .map(|n| n.trim_start_matches(['@', ':', '$']).to_owned())
            .ok_or_else(|| DriverError::message(format!("positional parameter ?{index} is not supported")))?;
        let value = command
            .params
            .get(&name)
            .ok_or_else(|| DriverError::message(format!("no value bound for parameter `{name}`")))?;
        stmt.raw_bind_parameter(index, value).map_err(DriverError::new)?;
    }
    Ok(stmt)
}

fn execute_on(conn: &rusqlite::Connection, command: &Command) -> Result<u64, DriverError> {
    let mut stmt = prepare(conn, command)?;
    let affected = stmt.raw_execute().map_err(DriverError::new)?;
    Ok(u64::try_from(affected).unwrap_or(u64::MAX))
}

fn query_on(
    conn: &rusqlite::Connection,
    command: &Command,
    limit: Option<usize>,
    cancel: Option<&CancellationToken>
) -> Result<ResultSet, DriverError> {
    let mut stmt = prepare(conn, command)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.raw_query();
    loop {
        if limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }
        if let Some(cancel) = cancel {
            check_cancelled(cancel)?;
        }
        let Some(row) = cursor.next().map_err(DriverError::new)? else {
            break;
        };
        let mut cells = Vec::with_capacity(width);
        for index in 0..width {
            cells.push(read_cell(row.get_ref(index).map_err(DriverError::new)?));
        }
        rows.push(cells);
    }
    Ok(ResultSet::new(columns, rows))
}

fn read_cell(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec())
    }
}

fn first_cell(set: ResultSet) -> Value {
    set.into_rows()
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .unwrap_or(Value::Null)
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Self::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Self::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b))
        })
    }
}

impl Connection for SqliteConnection {
    fn open(&mut self) -> Result<(), DriverError> {
        open_shared(&self.inner, &self.options)
    }

    fn close(&mut self) -> Result<(), DriverError> {
        close_shared(&self.inner)
    }

    fn state(&self) -> ConnectionState {
        state_of(&self.inner)
    }

    fn execute(&mut self, command: &Command) -> Result<u64, DriverError> {
        Self::with_open(&self.inner, |conn| execute_on(conn, command))
    }

    fn scalar(&mut self, command: &Command) -> Result<Value, DriverError> {
        Self::with_open(&self.inner, |conn| query_on(conn, command, Some(1), None)).map(first_cell)
    }

    fn query(&mut self, command: &Command, limit: Option<usize>) -> Result<ResultSet, DriverError> {
        Self::with_open(&self.inner, |conn| query_on(conn, command, limit, None))
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        Self::with_open(&self.inner, |conn| conn.execute_batch("BEGIN").map_err(DriverError::new))
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        Self::with_open(&self.inner, |conn| conn.execute_batch("COMMIT").map_err(DriverError::new))
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        Self::with_open(&self.inner, |conn| conn.execute_batch("ROLLBACK").map_err(DriverError::new))
    }
}

#[async_trait]
impl AsyncConnection for SqliteConnection {
    async fn open_async(&mut self, cancel: &CancellationToken) -> Result<(), DriverError> {
        check_cancelled(cancel)?;
        let options = self.options.clone();
        self.blocking(move |inner| open_shared(inner, &options)).await
    }

    async fn close_async(&mut self) -> Result<(), DriverError> {
        self.blocking(close_shared).await
    }

    fn state_async(&self) -> ConnectionState {
        state_of(&self.inner)
    }

    async fn execute_async(&mut self, command: &Command, cancel: &CancellationToken) -> Result<u64, DriverError> {
        check_cancelled(cancel)?;
        let command = command.clone();
        self.blocking(move |inner| Self::with_open(inner, |conn| execute_on(conn, &command)))
            .await
    }

    async fn scalar_async(&mut self, command: &Command, cancel: &CancellationToken) -> Result<Value, DriverError> {
        self.query_async(command, Some(1), cancel).await.map(first_cell)
    }

    async fn query_async(
        &mut self,
        command: &Command,
        limit: Option<usize>,
        cancel: &CancellationToken
    ) -> Result<ResultSet, DriverError> {
        check_cancelled(cancel)?;
        let command = command.clone();
        let cancel = cancel.clone();
        self.blocking(move |inner| Self::with_open(inner, |conn| query_on(conn, &command, limit, Some(&cancel))))
            .await
    }

    async fn begin_async(&mut self, cancel: &CancellationToken) -> Result<(), DriverError> {
        check_cancelled(cancel)?;
        self.blocking(|inner| Self::with_open(inner, |conn| conn.execute_batch("BEGIN").map_err(DriverError::new)))
            .await
    }

    async fn commit_async(&mut self) -> Result<(), DriverError> {
        self.blocking(|inner| Self::with_open(inner, |conn| conn.execute_batch("COMMIT").map_err(DriverError::new)))
            .await
    }

    async fn rollback_async(&mut self) -> Result<(), DriverError> {
        self.blocking(|inner| Self::with_open(inner, |conn| conn.execute_batch("ROLLBACK").map_err(DriverError::new)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    fn open_temp() -> (tempfile::TempDir, SqliteConnection) {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = SqliteConnection::file(dir.path().join("test.db"));
        conn.open().unwrap();
        conn.execute(&Command::new("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL, data BLOB)"))
            .unwrap();
        (dir, conn)
    }

    #[test]
    fn binds_by_name_ignoring_case() {
        let (_dir, mut conn) = open_temp();
        let insert = Command::with_params(
            "INSERT INTO t (name, score, data) VALUES (@Name, :score, $Data)",
            params! { "name" => "Ann", "SCORE" => 1.5, "data" => vec![1_u8, 2] }
        );
        assert_eq!(conn.execute(&insert).unwrap(), 1);

        let set = conn.query(&Command::new("SELECT id, name, score, data FROM t"), None).unwrap();
        assert_eq!(set.columns(), ["id", "name", "score", "data"]);
        assert_eq!(set.rows()[0], vec![
            Value::Int(1),
            Value::from("Ann"),
            Value::Float(1.5),
            Value::Bytes(vec![1, 2])
        ]);
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let (_dir, mut conn) = open_temp();
        let err = conn.execute(&Command::new("INSERT INTO t (name) VALUES (@Name)")).unwrap_err();
        assert!(err.to_string().contains("Name"));
    }

    #[test]
    fn query_honors_limit() {
        let (_dir, mut conn) = open_temp();
        for name in ["a", "b", "c"] {
            conn.execute(&Command::with_params("INSERT INTO t (name) VALUES (@n)", params! { "n" => name }))
                .unwrap();
        }
        let set = conn.query(&Command::new("SELECT name FROM t ORDER BY id"), Some(2)).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(conn.scalar(&Command::new("SELECT COUNT(*) FROM t")).unwrap(), Value::Int(3));
    }

    #[test]
    fn closed_connection_rejects_commands() {
        let (_dir, mut conn) = open_temp();
        conn.close().unwrap();
        assert_eq!(Connection::state(&conn), ConnectionState::Closed);
        assert!(conn.execute(&Command::new("SELECT 1")).is_err());
        conn.close().unwrap();
    }

    #[test]
    fn rollback_discards_writes() {
        let (_dir, mut conn) = open_temp();
        conn.begin().unwrap();
        conn.execute(&Command::with_params("INSERT INTO t (name) VALUES (@n)", params! { "n" => "x" }))
            .unwrap();
        conn.rollback().unwrap();
        assert_eq!(conn.scalar(&Command::new("SELECT COUNT(*) FROM t")).unwrap(), Value::Int(0));
    }

    #[tokio::test]
    async fn async_query_matches_sync() {
        let (_dir, mut conn) = open_temp();
        let cancel = CancellationToken::new();
        conn.execute_async(&Command::with_params("INSERT INTO t (name) VALUES (@n)", params! { "n" => "Ann" }), &cancel)
            .await
            .unwrap();
        let set = conn.query_async(&Command::new("SELECT name FROM t"), None, &cancel).await.unwrap();
        assert_eq!(set.rows()[0][0], Value::from("Ann"));
    }

    #[tokio::test]
    async fn cancelled_token_stops_execution() {
        let (_dir, mut conn) = open_temp();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = conn.query_async(&Command::new("SELECT 1"), None, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: SqliteOptions = serde_json::from_str(r#"{"busy_timeout": 250}"#).unwrap();
        assert_eq!(options.busy_timeout, Duration::from_millis(250));
        assert_eq!(options.path, PathBuf::from(":memory:"));
    }
}
