// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Core runtime for datamap.
//!
//! Two halves share this crate: a per-type descriptor cache and a data
//! client that turns descriptors into commands and result rows back into
//! objects.
//!
//! # Overview
//!
//! | Layer | Items |
//! |-------|-------|
//! | Type description | [`FieldType`], [`TypeShape`], [`Mapped`], [`EntityMapping`] |
//! | Descriptors | [`DescriptorRegistry`], [`TypeDescriptor`], [`MemberDescriptor`] |
//! | Commands | [`CommandBuilder`], [`SqlCommandBuilder`], [`Select`], [`filter`] |
//! | Binding and materialization | [`ParameterBinder`], [`Materializer`], [`ValueConverter`] |
//! | Execution | [`DataClient`], [`driver`] |
//!
//! # Usage
//!
//! Most users should depend on `datamap`, which adds `#[derive(Entity)]` and
//! re-exports this crate. Mappings can also be written by hand:
//!
//! ```rust,ignore
//! use datamap_core::prelude::*;
//!
//! let mut client = DataClient::new(SqliteConnection::file("app.db"));
//! let adults: Vec<Person> = client.to_list(Select::new().filter(col("Age").ge(18)))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod accessor;
pub mod binder;
pub mod client;
pub mod command;
pub mod config;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod materialize;
pub mod paging;
pub mod prelude;
pub mod registry;
pub mod resolver;
pub mod shape;
pub mod sql;
pub mod value;

/// Re-export async_trait for driver implementations.
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;

pub use crate::{
    accessor::AccessTier,
    binder::{BindSource, Pair, ParameterBinder, Params},
    client::{Aggregates, DataClient, TransactionHandle, TransactionOutcome},
    command::{Aggregate, AggregateFn, Command, CommandBuilder, Order, Projection, Select, SortDirection},
    config::ClientOptions,
    descriptor::{AnyObject, ConstructorDescriptor, MemberDescriptor, TypeDescriptor},
    driver::{AsyncConnection, Connection, ConnectionState, ResultSet},
    error::{
        AccessError, BindingError, CommandExecutionError, ConnectionError, ConversionError, DriverError, Error,
        MappingError, Result, TransactionStateError
    },
    filter::{CompareOp, Filter, col},
    mapping::{
        Annotation, AnnotationKind, Annotations, ConstructorDef, DynamicAccess, EntityMapping, Mapped, MemberDef,
        MemberKind, ParamDef, Visibility
    },
    materialize::{DefaultConverter, Materializer, ValueConverter},
    paging::Pagination,
    registry::{DescriptorRegistry, RegistryExt, TypeRegistry},
    shape::{Blob, FieldType, ShapeKind, TypeKey, TypeShape},
    sql::{Dialect, SqlCommandBuilder},
    value::{Value, ValueKind}
};
#[cfg(feature = "sqlite")]
pub use crate::driver::sqlite::{SqliteConnection, SqliteOptions};
