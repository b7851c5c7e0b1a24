// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Database driver interface.
//!
//! The data client talks to the database through [`Connection`] (blocking)
//! or [`AsyncConnection`] (non-blocking). Both execute a built [`Command`]
//! and return raw [`Value`] cells; the client owns every higher-level
//! concern.
//!
//! # Implementations
//!
//! | Driver | Feature | Traits |
//! |--------|---------|--------|
//! | [`SqliteConnection`](sqlite::SqliteConnection) | `sqlite` (default) | both |
//!
//! Async methods carry an `_async` suffix so a driver can implement both
//! traits without ambiguous calls.

#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{command::Command, error::DriverError, value::Value};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Closed,

    /// Ready to execute commands.
    Open
}

impl ConnectionState {
    /// Check if the connection is open.
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Buffered query result: column names plus rows of cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    columns: Vec<String>,
    rows:    Vec<Vec<Value>>
}

impl ResultSet {
    /// Result set with the given columns and rows.
    pub const fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows
        }
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in result order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// No rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column named `name`, ignoring ASCII case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// First cell of the first row.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Take the rows.
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }
}

/// Blocking driver connection.
pub trait Connection: Send {
    /// Open the connection. Opening an open connection is a no-op.
    fn open(&mut self) -> Result<(), DriverError>;

    /// Close the connection. Closing a closed connection is a no-op.
    fn close(&mut self) -> Result<(), DriverError>;

    /// Current state.
    fn state(&self) -> ConnectionState;

    /// Execute a non-query command, returning the affected row count.
    fn execute(&mut self, command: &Command) -> Result<u64, DriverError>;

    /// First cell of the first row, `Value::Null` for an empty result.
    fn scalar(&mut self, command: &Command) -> Result<Value, DriverError>;

    /// Run a query, reading at most `limit` rows.
    fn query(&mut self, command: &Command, limit: Option<usize>) -> Result<ResultSet, DriverError>;

    /// Begin a transaction.
    fn begin(&mut self) -> Result<(), DriverError>;

    /// Commit the current transaction.
    fn commit(&mut self) -> Result<(), DriverError>;

    /// Roll back the current transaction.
    fn rollback(&mut self) -> Result<(), DriverError>;
}

/// Non-blocking driver connection.
///
/// Every operation checks `cancel` before touching the database; queries
/// check it again before each row read. A fired token yields
/// [`DriverError::cancelled`].
#[async_trait]
pub trait AsyncConnection: Send {
    /// Open the connection.
    async fn open_async(&mut self, cancel: &CancellationToken) -> Result<(), DriverError>;

    /// Close the connection.
    async fn close_async(&mut self) -> Result<(), DriverError>;

    /// Current state.
    fn state_async(&self) -> ConnectionState;

    /// Execute a non-query command, returning the affected row count.
    async fn execute_async(&mut self, command: &Command, cancel: &CancellationToken) -> Result<u64, DriverError>;

    /// First cell of the first row, `Value::Null` for an empty result.
    async fn scalar_async(&mut self, command: &Command, cancel: &CancellationToken) -> Result<Value, DriverError>;

    /// Run a query, reading at most `limit` rows.
    async fn query_async(
        &mut self,
        command: &Command,
        limit: Option<usize>,
        cancel: &CancellationToken
    ) -> Result<ResultSet, DriverError>;

    /// Begin a transaction.
    async fn begin_async(&mut self, cancel: &CancellationToken) -> Result<(), DriverError>;

    /// Commit the current transaction.
    async fn commit_async(&mut self) -> Result<(), DriverError>;

    /// Roll back the current transaction.
    async fn rollback_async(&mut self) -> Result<(), DriverError>;
}

/// Fail with [`DriverError::cancelled`] when `cancel` has fired.
pub fn check_cancelled(cancel: &CancellationToken) -> Result<(), DriverError> {
    if cancel.is_cancelled() {
        Err(DriverError::cancelled())
    } else {
        Ok(())
    }
}
