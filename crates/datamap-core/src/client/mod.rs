// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! The data client: CRUD, queries, aggregates and transactions over one
//! connection.
//!
//! # Overview
//!
//! | Area | Blocking | Non-blocking |
//! |------|----------|--------------|
//! | Writes | [`insert`](DataClient::insert), [`update`](DataClient::update), [`delete`](DataClient::delete), ranges | `*_async` |
//! | Reads | [`to_list`](DataClient::to_list), [`query`](DataClient::query), [`first`](DataClient::first), ... | `*_async` |
//! | Aggregates | [`count`](DataClient::count), [`get_aggs`](DataClient::get_aggs), [`get_pages`](DataClient::get_pages), ... | `*_async` |
//! | Transactions | [`begin_transaction`](DataClient::begin_transaction), [`end_transaction`](DataClient::end_transaction) | `*_async` |
//!
//! Blocking methods need `C: Connection`, non-blocking ones
//! `C: AsyncConnection`; both forms plan their commands with the same
//! functions and behave identically. Non-blocking forms take a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) that is checked
//! before each command and each row read.
//!
//! # Connection lifetime
//!
//! Every operation opens the connection and closes it when done. While a
//! transaction is active the connection stays open until the transaction
//! ends.
//!
//! # Example
//!
//! ```rust,ignore
//! use datamap::prelude::*;
//!
//! let mut client = DataClient::new(SqliteConnection::file("app.db"));
//! let mut ann = Person { id: 0, name: "Ann".into(), age: 30 };
//! client.insert(&mut ann)?;
//! let found = client.first::<Person>(col("Id").eq(ann.id))?;
//! ```

mod aggregate;
mod crud;
mod plan;
mod query;
mod transaction;

use std::{fmt, sync::Arc};

use tracing::debug;

pub use self::aggregate::Aggregates;
use crate::{
    command::{Command, CommandBuilder},
    config::ClientOptions,
    descriptor::TypeDescriptor,
    error::{CommandExecutionError, DriverError, Error, Result},
    mapping::Mapped,
    materialize::{DefaultConverter, Materializer, ValueConverter},
    registry::{DescriptorRegistry, RegistryExt, TypeRegistry},
    sql::SqlCommandBuilder
};

/// Proof of an active transaction, returned by
/// [`begin_transaction`](DataClient::begin_transaction).
///
/// Pass it to range operations to run them inside the transaction, and back
/// to [`end_transaction`](DataClient::end_transaction) to finish it.
#[must_use = "an active transaction must be ended"]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TransactionHandle {
    id: u64
}

impl TransactionHandle {
    /// Transaction identifier, unique per client.
    pub const fn id(&self) -> u64 {
        self.id
    }
}

/// How a transaction ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Keep the changes.
    Commit,

    /// Discard the changes.
    Rollback
}

/// Metadata-driven data access over one connection.
pub struct DataClient<C> {
    connection:        C,
    builder:           Arc<dyn CommandBuilder>,
    registry:          Arc<dyn TypeRegistry>,
    options:           ClientOptions,
    converter:         Option<Arc<dyn ValueConverter>>,
    default_converter: DefaultConverter,
    transaction:       Option<u64>,
    next_transaction:  u64
}

impl<C> DataClient<C> {
    /// Client over `connection` with the SQLite command builder, the global
    /// registry and default options.
    pub fn new(connection: C) -> Self {
        let options = ClientOptions::default();
        Self {
            connection,
            builder: Arc::new(SqlCommandBuilder::default()),
            registry: DescriptorRegistry::global(),
            default_converter: DefaultConverter {
                trim_strings: options.trim_strings
            },
            options,
            converter: None,
            transaction: None,
            next_transaction: 1
        }
    }

    /// Use another command builder.
    #[must_use]
    pub fn with_builder(mut self, builder: Arc<dyn CommandBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Use another descriptor registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.default_converter = DefaultConverter {
            trim_strings: options.trim_strings
        };
        self.options = options;
        self
    }

    /// Use a custom value converter for materialization.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Underlying connection.
    pub const fn connection(&self) -> &C {
        &self.connection
    }

    /// Underlying connection, mutably.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Command builder in use.
    pub fn builder(&self) -> &dyn CommandBuilder {
        &*self.builder
    }

    /// Descriptor registry in use.
    pub fn registry(&self) -> &dyn TypeRegistry {
        &*self.registry
    }

    /// Options in use.
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// A transaction is active.
    pub const fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Take back the connection.
    pub fn into_inner(self) -> C {
        self.connection
    }

    /// Descriptor of `T`.
    ///
    /// # Errors
    ///
    /// [`Error::Mapping`] when `T` cannot be described.
    pub fn describe<T: Mapped>(&self) -> Result<Arc<TypeDescriptor>> {
        Ok(self.registry.describe::<T>()?)
    }

    fn converter(&self) -> &dyn ValueConverter {
        match &self.converter {
            Some(converter) => &**converter,
            None => &self.default_converter
        }
    }

    fn materializer<'a>(&'a self, descriptor: &'a TypeDescriptor) -> Materializer<'a> {
        Materializer::new(descriptor, self.converter(), &self.options.name_map)
    }

    fn row_limit(&self, limit: Option<u64>) -> Option<usize> {
        limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .or(self.options.default_row_limit)
    }

    fn log(&self, command: &Command) {
        if self.options.log_commands {
            debug!(command = %command.render(&*self.builder), "executing command");
        }
    }
}

impl<C> fmt::Debug for DataClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataClient")
            .field("options", &self.options)
            .field("transaction", &self.transaction)
            .field("registry_len", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// Wrap a driver failure raised while running `command`.
fn command_error(err: DriverError, command: &Command) -> Error {
    if err.is_cancelled() {
        Error::Cancelled
    } else {
        CommandExecutionError::new(err, command).into()
    }
}

/// Keep the first failure of an operation and its cleanup.
fn merge<R>(result: Result<R>, cleanup: Result<()>) -> Result<R> {
    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Err(err), _) | (Ok(_), Err(err)) => Err(err)
    }
}
