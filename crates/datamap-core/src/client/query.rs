// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Reads: generated SELECTs and caller-supplied query text.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use tokio_util::sync::CancellationToken;

use super::DataClient;
use crate::{
    binder::{BindSource, ParameterBinder},
    command::{Command, Select},
    descriptor::TypeDescriptor,
    driver::{AsyncConnection, Connection, ResultSet},
    error::Result,
    filter::Filter,
    mapping::Mapped,
    registry::RegistryExt,
    shape::FieldType,
    value::Value
};

/// Index `rows` by `key`; a later row replaces an earlier one with the same
/// key.
fn keyed<T, K, F>(rows: Vec<T>, key: F) -> HashMap<K, T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K
{
    rows.into_iter().map(|row| (key(&row), row)).collect()
}

impl<C> DataClient<C> {
    fn describe_shape<T: FieldType>(&self) -> Result<Arc<TypeDescriptor>> {
        Ok(self.registry.describe_shape(T::shape())?)
    }

    pub(super) fn raw_command<P: BindSource + ?Sized>(&self, text: &str, params: &P) -> Result<Command> {
        let params = ParameterBinder::new(&*self.registry).bind(params)?;
        Ok(Command::with_params(text, params))
    }

    fn scalar_as<V: FieldType>(&self, raw: Value) -> Result<V> {
        let value = self.converter().convert(raw, &V::shape())?;
        Ok(V::from_value(value)?)
    }
}

impl<C: Connection> DataClient<C> {
    /// Rows of `T` selected by `select`.
    ///
    /// Without an explicit limit, [`ClientOptions::default_row_limit`]
    /// applies.
    ///
    /// # Errors
    ///
    /// - [`Error::Mapping`](crate::Error::Mapping) for unknown columns or
    ///   when no constructor fits the result
    /// - [`Error::Command`](crate::Error::Command) when the SELECT fails
    ///
    /// [`ClientOptions::default_row_limit`]: crate::ClientOptions::default_row_limit
    pub fn to_list<T: Mapped>(&mut self, select: Select) -> Result<Vec<T>> {
        self.open_connection()?;
        let result = self.select_rows(&select);
        self.finish(result)
    }

    fn select_rows<T: Mapped>(&mut self, select: &Select) -> Result<Vec<T>> {
        let descriptor = self.describe::<T>()?;
        let command = self.builder.build_select(&descriptor, select)?;
        let limit = self.row_limit(select.limit);
        let set = self.run_query(&command, limit)?;
        self.materializer(&descriptor).materialize(set)
    }

    /// First row of `T` matching `filter`.
    ///
    /// # Errors
    ///
    /// See [`to_list`](Self::to_list).
    pub fn first<T: Mapped>(&mut self, filter: Filter) -> Result<Option<T>> {
        let rows = self.to_list(Select::new().filter(filter).limit(1))?;
        Ok(rows.into_iter().next())
    }

    /// Rows of `T` keyed by `key`.
    ///
    /// # Errors
    ///
    /// See [`to_list`](Self::to_list).
    pub fn to_dictionary<T, K, F>(&mut self, select: Select, key: F) -> Result<HashMap<K, T>>
    where
        T: Mapped,
        K: Eq + Hash,
        F: Fn(&T) -> K
    {
        self.to_list(select).map(|rows| keyed(rows, key))
    }

    /// Raw result of `select` over the table of `T`.
    ///
    /// # Errors
    ///
    /// See [`to_list`](Self::to_list).
    pub fn to_data_table<T: Mapped>(&mut self, select: Select) -> Result<ResultSet> {
        self.open_connection()?;
        let limit = self.row_limit(select.limit);
        let result = self.describe::<T>().and_then(|descriptor| {
            let command = self.builder.build_select(&descriptor, &select)?;
            self.run_query(&command, limit)
        });
        self.finish(result)
    }

    /// Run `text` with parameters bound from `params` and materialize the
    /// rows as `T`.
    ///
    /// `T` may be a mapped type or a single-column scalar.
    ///
    /// # Errors
    ///
    /// See [`to_list`](Self::to_list).
    pub fn query<T: FieldType, P: BindSource + ?Sized>(&mut self, text: &str, params: &P) -> Result<Vec<T>> {
        let command = self.raw_command(text, params)?;
        self.open_connection()?;
        let limit = self.options.default_row_limit;
        let result = self.describe_shape::<T>().and_then(|descriptor| {
            let set = self.run_query(&command, limit)?;
            self.materializer(&descriptor).materialize(set)
        });
        self.finish(result)
    }

    /// First cell of the result of `text`, converted to `V`.
    ///
    /// An empty result converts like `NULL`.
    ///
    /// # Errors
    ///
    /// - [`Error::Binding`](crate::Error::Binding) when `params` is an object
    ///   that cannot be described or read
    /// - [`Error::Conversion`](crate::Error::Conversion) when the cell does
    ///   not convert to `V`
    /// - [`Error::Command`](crate::Error::Command) when the query fails
    pub fn query_scalar<V: FieldType, P: BindSource + ?Sized>(&mut self, text: &str, params: &P) -> Result<V> {
        let command = self.raw_command(text, params)?;
        self.open_connection()?;
        let result = self.run_scalar(&command).and_then(|raw| self.scalar_as(raw));
        self.finish(result)
    }
}

impl<C: AsyncConnection> DataClient<C> {
    /// Non-blocking [`to_list`](Self::to_list).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn to_list_async<T: Mapped>(&mut self, select: Select, cancel: &CancellationToken) -> Result<Vec<T>> {
        self.open_connection_async(cancel).await?;
        let result = self.select_rows_async(&select, cancel).await;
        self.finish_async(result).await
    }

    async fn select_rows_async<T: Mapped>(&mut self, select: &Select, cancel: &CancellationToken) -> Result<Vec<T>> {
        let descriptor = self.describe::<T>()?;
        let command = self.builder.build_select(&descriptor, select)?;
        let limit = self.row_limit(select.limit);
        let set = self.run_query_async(&command, limit, cancel).await?;
        self.materializer(&descriptor).materialize(set)
    }

    /// Non-blocking [`first`](Self::first).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn first_async<T: Mapped>(&mut self, filter: Filter, cancel: &CancellationToken) -> Result<Option<T>> {
        let rows = self.to_list_async(Select::new().filter(filter).limit(1), cancel).await?;
        Ok(rows.into_iter().next())
    }

    /// Non-blocking [`to_dictionary`](Self::to_dictionary).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn to_dictionary_async<T, K, F>(
        &mut self,
        select: Select,
        key: F,
        cancel: &CancellationToken
    ) -> Result<HashMap<K, T>>
    where
        T: Mapped,
        K: Eq + Hash,
        F: Fn(&T) -> K
    {
        self.to_list_async(select, cancel).await.map(|rows| keyed(rows, key))
    }

    /// Non-blocking [`to_data_table`](Self::to_data_table).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn to_data_table_async<T: Mapped>(
        &mut self,
        select: Select,
        cancel: &CancellationToken
    ) -> Result<ResultSet> {
        self.open_connection_async(cancel).await?;
        let planned = self
            .describe::<T>()
            .and_then(|descriptor| Ok(self.builder.build_select(&descriptor, &select)?));
        let result = match planned {
            Ok(command) => {
                let limit = self.row_limit(select.limit);
                self.run_query_async(&command, limit, cancel).await
            }
            Err(err) => Err(err)
        };
        self.finish_async(result).await
    }

    /// Non-blocking [`query`](Self::query).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn query_async<T: FieldType, P: BindSource + ?Sized>(
        &mut self,
        text: &str,
        params: &P,
        cancel: &CancellationToken
    ) -> Result<Vec<T>> {
        let command = self.raw_command(text, params)?;
        self.open_connection_async(cancel).await?;
        let result = match self.describe_shape::<T>() {
            Ok(descriptor) => {
                let limit = self.options.default_row_limit;
                match self.run_query_async(&command, limit, cancel).await {
                    Ok(set) => self.materializer(&descriptor).materialize(set),
                    Err(err) => Err(err)
                }
            }
            Err(err) => Err(err)
        };
        self.finish_async(result).await
    }

    /// Non-blocking [`query_scalar`](Self::query_scalar).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn query_scalar_async<V: FieldType, P: BindSource + ?Sized>(
        &mut self,
        text: &str,
        params: &P,
        cancel: &CancellationToken
    ) -> Result<V> {
        let command = self.raw_command(text, params)?;
        self.open_connection_async(cancel).await?;
        let result = match self.run_scalar_async(&command, cancel).await {
            Ok(raw) => self.scalar_as(raw),
            Err(err) => Err(err)
        };
        self.finish_async(result).await
    }
}
