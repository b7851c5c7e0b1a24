// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Connection lifetime, command execution and transactions.
//!
//! At most one transaction is active per client. Range operations either
//! join the caller's transaction (passing its handle) or run in their own.
//!
//! | Range call | Another transaction active | On success | On failure |
//! |------------|----------------------------|------------|------------|
//! | `Some(handle)` | must be `handle` | stays active | rolled back, handle spent |
//! | `None` | [`AlreadyActive`](TransactionStateError::AlreadyActive) | committed | rolled back |

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{DataClient, TransactionHandle, TransactionOutcome, command_error, merge};
use crate::{
    command::Command,
    driver::{AsyncConnection, Connection, ResultSet},
    error::{ConnectionError, DriverError, Error, Result, TransactionStateError},
    value::Value
};

fn open_error(err: DriverError) -> Error {
    if err.is_cancelled() { Error::Cancelled } else { ConnectionError::open(err).into() }
}

impl TransactionOutcome {
    const fn verb(self) -> &'static str {
        match self {
            Self::Commit => "COMMIT",
            Self::Rollback => "ROLLBACK"
        }
    }
}

impl<C> DataClient<C> {
    fn check_handle(&self, handle: &TransactionHandle) -> Result<()> {
        match self.transaction {
            None => Err(TransactionStateError::NotActive.into()),
            Some(active) if active != handle.id => Err(TransactionStateError::HandleMismatch {
                active,
                found: handle.id
            }
            .into()),
            Some(_) => Ok(())
        }
    }

    fn check_idle(&self) -> Result<()> {
        match self.transaction {
            Some(_) => Err(TransactionStateError::AlreadyActive.into()),
            None => Ok(())
        }
    }

    fn next_handle(&mut self) -> TransactionHandle {
        let id = self.next_transaction;
        self.next_transaction += 1;
        self.transaction = Some(id);
        info!(transaction = id, "transaction started");
        TransactionHandle {
            id
        }
    }

    fn log_end(id: Option<u64>, outcome: TransactionOutcome) {
        match outcome {
            TransactionOutcome::Commit => info!(transaction = ?id, "transaction committed"),
            TransactionOutcome::Rollback => warn!(transaction = ?id, "transaction rolled back")
        }
    }
}

impl<C: Connection> DataClient<C> {
    pub(super) fn open_connection(&mut self) -> Result<()> {
        if !self.connection.state().is_open() {
            self.connection.open().map_err(open_error)?;
        }
        Ok(())
    }

    /// Close the connection unless a transaction holds it.
    pub(super) fn release(&mut self) -> Result<()> {
        if self.transaction.is_none() && self.connection.state().is_open() {
            self.connection.close().map_err(ConnectionError::close)?;
        }
        Ok(())
    }

    /// Close the connection after `result` was produced.
    pub(super) fn finish<R>(&mut self, result: Result<R>) -> Result<R> {
        let released = self.release();
        merge(result, released)
    }

    pub(super) fn run_execute(&mut self, command: &Command) -> Result<u64> {
        self.log(command);
        self.connection.execute(command).map_err(|err| command_error(err, command))
    }

    pub(super) fn run_scalar(&mut self, command: &Command) -> Result<Value> {
        self.log(command);
        self.connection.scalar(command).map_err(|err| command_error(err, command))
    }

    pub(super) fn run_query(&mut self, command: &Command, limit: Option<usize>) -> Result<ResultSet> {
        self.log(command);
        self.connection.query(command, limit).map_err(|err| command_error(err, command))
    }

    /// Start a transaction; the connection stays open until it ends.
    ///
    /// # Errors
    ///
    /// - [`TransactionStateError::AlreadyActive`] when one is active
    /// - [`Error::Connection`] or [`Error::Command`] from the driver
    pub fn begin_transaction(&mut self) -> Result<TransactionHandle> {
        self.check_idle()?;
        self.open_connection()?;
        let command = Command::new("BEGIN");
        self.log(&command);
        if let Err(err) = self.connection.begin() {
            return self.finish(Err(command_error(err, &command)));
        }
        Ok(self.next_handle())
    }

    /// End the transaction identified by `handle`.
    ///
    /// # Errors
    ///
    /// - [`TransactionStateError::NotActive`] without an active transaction
    /// - [`TransactionStateError::HandleMismatch`] for a stale handle
    /// - [`Error::Command`] when the driver fails to commit or roll back
    pub fn end_transaction(&mut self, handle: TransactionHandle, outcome: TransactionOutcome) -> Result<()> {
        self.check_handle(&handle)?;
        self.finish_transaction(outcome)
    }

    /// Commit the transaction identified by `handle`.
    ///
    /// # Errors
    ///
    /// See [`end_transaction`](Self::end_transaction).
    pub fn commit(&mut self, handle: TransactionHandle) -> Result<()> {
        self.end_transaction(handle, TransactionOutcome::Commit)
    }

    /// Roll back the transaction identified by `handle`.
    ///
    /// # Errors
    ///
    /// See [`end_transaction`](Self::end_transaction).
    pub fn rollback(&mut self, handle: TransactionHandle) -> Result<()> {
        self.end_transaction(handle, TransactionOutcome::Rollback)
    }

    fn finish_transaction(&mut self, outcome: TransactionOutcome) -> Result<()> {
        let command = Command::new(outcome.verb());
        self.log(&command);
        let ended = match outcome {
            TransactionOutcome::Commit => self.connection.commit(),
            TransactionOutcome::Rollback => self.connection.rollback()
        }
        .map_err(|err| command_error(err, &command));
        Self::log_end(self.transaction.take(), outcome);
        self.finish(ended)
    }

    /// Validate `transaction` or start one owned by the range operation.
    pub(super) fn enter_range(&mut self, transaction: Option<&TransactionHandle>) -> Result<Option<TransactionHandle>> {
        match transaction {
            Some(handle) => self.check_handle(handle).map(|()| None),
            None => self.begin_transaction().map(Some)
        }
    }

    /// Commit an owned transaction, or roll back on failure.
    pub(super) fn leave_range<R>(&mut self, owned: Option<TransactionHandle>, result: Result<R>) -> Result<R> {
        if result.is_err() {
            let ended = self.finish_transaction(TransactionOutcome::Rollback);
            return merge(result, ended);
        }
        match owned {
            Some(handle) => {
                let ended = self.end_transaction(handle, TransactionOutcome::Commit);
                merge(result, ended)
            }
            None => result
        }
    }
}

impl<C: AsyncConnection> DataClient<C> {
    pub(super) async fn open_connection_async(&mut self, cancel: &CancellationToken) -> Result<()> {
        if !self.connection.state_async().is_open() {
            self.connection.open_async(cancel).await.map_err(open_error)?;
        }
        Ok(())
    }

    pub(super) async fn release_async(&mut self) -> Result<()> {
        if self.transaction.is_none() && self.connection.state_async().is_open() {
            self.connection.close_async().await.map_err(ConnectionError::close)?;
        }
        Ok(())
    }

    pub(super) async fn finish_async<R>(&mut self, result: Result<R>) -> Result<R> {
        let released = self.release_async().await;
        merge(result, released)
    }

    pub(super) async fn run_execute_async(&mut self, command: &Command, cancel: &CancellationToken) -> Result<u64> {
        self.log(command);
        self.connection
            .execute_async(command, cancel)
            .await
            .map_err(|err| command_error(err, command))
    }

    pub(super) async fn run_scalar_async(&mut self, command: &Command, cancel: &CancellationToken) -> Result<Value> {
        self.log(command);
        self.connection
            .scalar_async(command, cancel)
            .await
            .map_err(|err| command_error(err, command))
    }

    pub(super) async fn run_query_async(
        &mut self,
        command: &Command,
        limit: Option<usize>,
        cancel: &CancellationToken
    ) -> Result<ResultSet> {
        self.log(command);
        self.connection
            .query_async(command, limit, cancel)
            .await
            .map_err(|err| command_error(err, command))
    }

    /// Non-blocking [`begin_transaction`](Self::begin_transaction).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`].
    pub async fn begin_transaction_async(&mut self, cancel: &CancellationToken) -> Result<TransactionHandle> {
        self.check_idle()?;
        self.open_connection_async(cancel).await?;
        let command = Command::new("BEGIN");
        self.log(&command);
        if let Err(err) = self.connection.begin_async(cancel).await {
            return self.finish_async(Err(command_error(err, &command))).await;
        }
        Ok(self.next_handle())
    }

    /// Non-blocking [`end_transaction`](Self::end_transaction).
    ///
    /// # Errors
    ///
    /// As the blocking form.
    pub async fn end_transaction_async(&mut self, handle: TransactionHandle, outcome: TransactionOutcome) -> Result<()> {
        self.check_handle(&handle)?;
        self.finish_transaction_async(outcome).await
    }

    /// Non-blocking [`commit`](Self::commit).
    ///
    /// # Errors
    ///
    /// As the blocking form.
    pub async fn commit_async(&mut self, handle: TransactionHandle) -> Result<()> {
        self.end_transaction_async(handle, TransactionOutcome::Commit).await
    }

    /// Non-blocking [`rollback`](Self::rollback).
    ///
    /// # Errors
    ///
    /// As the blocking form.
    pub async fn rollback_async(&mut self, handle: TransactionHandle) -> Result<()> {
        self.end_transaction_async(handle, TransactionOutcome::Rollback).await
    }

    async fn finish_transaction_async(&mut self, outcome: TransactionOutcome) -> Result<()> {
        let command = Command::new(outcome.verb());
        self.log(&command);
        let ended = match outcome {
            TransactionOutcome::Commit => self.connection.commit_async().await,
            TransactionOutcome::Rollback => self.connection.rollback_async().await
        }
        .map_err(|err| command_error(err, &command));
        Self::log_end(self.transaction.take(), outcome);
        self.finish_async(ended).await
    }

    pub(super) async fn enter_range_async(
        &mut self,
        transaction: Option<&TransactionHandle>,
        cancel: &CancellationToken
    ) -> Result<Option<TransactionHandle>> {
        match transaction {
            Some(handle) => self.check_handle(handle).map(|()| None),
            None => self.begin_transaction_async(cancel).await.map(Some)
        }
    }

    pub(super) async fn leave_range_async<R>(&mut self, owned: Option<TransactionHandle>, result: Result<R>) -> Result<R> {
        if result.is_err() {
            let ended = self.finish_transaction_async(TransactionOutcome::Rollback).await;
            return merge(result, ended);
        }
        match owned {
            Some(handle) => {
                let ended = self.end_transaction_async(handle, TransactionOutcome::Commit).await;
                merge(result, ended)
            }
            None => result
        }
    }
}
