// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Convenient re-exports for common usage.
//!
//! # Usage
//!
//! ```rust,ignore
//! use datamap_core::prelude::*;
//! ```

#[cfg(feature = "sqlite")]
pub use crate::{SqliteConnection, SqliteOptions};
pub use crate::{
    AsyncConnection, CancellationToken, ClientOptions, Connection, ConversionError, DataClient, DescriptorRegistry,
    EntityMapping, Error, FieldType, Filter, Mapped, MemberDef, Order, Pagination, Params, RegistryExt, Select,
    TransactionHandle, TransactionOutcome, TypeShape, Value, async_trait, col
};
