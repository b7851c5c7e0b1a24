// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Inserts, updates and deletes, single and ranged.
//!
//! Column lists name members; an empty list means every column-mapped
//! member. Without an explicit predicate, updates and deletes match the
//! item's primary key.

use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{DataClient, TransactionHandle, plan};
use crate::{
    binder::BindSource,
    driver::{AsyncConnection, Connection},
    error::Result,
    filter::Filter,
    mapping::Mapped,
    value::Value
};

impl<C: Connection> DataClient<C> {
    /// Run `text` with parameters bound from `params`.
    ///
    /// Returns the affected row count.
    ///
    /// # Errors
    ///
    /// - [`Error::Binding`](crate::Error::Binding) when `params` is an object
    ///   that cannot be described or read
    /// - [`Error::Command`](crate::Error::Command) when the command fails
    pub fn execute<P: BindSource + ?Sized>(&mut self, text: &str, params: &P) -> Result<u64> {
        let command = self.raw_command(text, params)?;
        self.open_connection()?;
        let result = self.run_execute(&command);
        self.finish(result)
    }

    /// Insert `item` and assign the generated identity to its key.
    ///
    /// Returns the identity when one was read back.
    ///
    /// # Errors
    ///
    /// - [`Error::Mapping`](crate::Error::Mapping) when `T` cannot be
    ///   described
    /// - [`Error::Command`](crate::Error::Command) when the INSERT fails
    pub fn insert<T: Mapped>(&mut self, item: &mut T) -> Result<Option<Value>> {
        self.insert_columns(item, &[])
    }

    /// Insert only `columns` of `item`.
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert).
    pub fn insert_columns<T: Mapped>(&mut self, item: &mut T, columns: &[&str]) -> Result<Option<Value>> {
        self.open_connection()?;
        let result = self.insert_one(item, columns);
        self.finish(result)
    }

    fn insert_one<T: Mapped>(&mut self, item: &mut T, columns: &[&str]) -> Result<Option<Value>> {
        let descriptor = self.describe::<T>()?;
        let plan = plan::insert(&*self.builder, &descriptor, &*item, columns)?;
        self.run_execute(&plan.command)?;
        let Some(identity) = plan.identity else {
            return Ok(None);
        };
        let raw = self.run_scalar(&identity.command)?;
        let member = &descriptor.members()[identity.member];
        let value = self.converter().convert(raw, member.shape())?;
        member.set(&mut *item, value.clone())?;
        trace!(type_name = descriptor.name(), identity = %value, "identity assigned");
        Ok(Some(value))
    }

    /// Update every column-mapped member of `item`, matched by key.
    ///
    /// Returns the affected row count.
    ///
    /// # Errors
    ///
    /// - [`MappingError::MissingKey`](crate::MappingError::MissingKey) for
    ///   keyless types
    /// - [`Error::Command`](crate::Error::Command) when the UPDATE fails
    pub fn update<T: Mapped>(&mut self, item: &T) -> Result<u64> {
        self.update_where(item, None, &[])
    }

    /// Update `columns` of `item`, matched by key.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub fn update_columns<T: Mapped>(&mut self, item: &T, columns: &[&str]) -> Result<u64> {
        self.update_where(item, None, columns)
    }

    /// Update `columns` of every row matching `filter` with the values of
    /// `item`; the key is ignored when `filter` is given.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub fn update_where<T: Mapped>(&mut self, item: &T, filter: Option<Filter>, columns: &[&str]) -> Result<u64> {
        self.open_connection()?;
        let result = self.update_one(item, filter.as_ref(), columns);
        self.finish(result)
    }

    fn update_one<T: Mapped>(&mut self, item: &T, filter: Option<&Filter>, columns: &[&str]) -> Result<u64> {
        let descriptor = self.describe::<T>()?;
        let command = plan::update(&*self.builder, &descriptor, item, filter, columns)?;
        self.run_execute(&command)
    }

    /// Delete the row matching the key of `item`.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub fn delete<T: Mapped>(&mut self, item: &T) -> Result<u64> {
        self.open_connection()?;
        let result = self.delete_one(item);
        self.finish(result)
    }

    fn delete_one<T: Mapped>(&mut self, item: &T) -> Result<u64> {
        let descriptor = self.describe::<T>()?;
        let command = plan::delete(&*self.builder, &descriptor, item)?;
        self.run_execute(&command)
    }

    /// Delete every row of `T` matching `filter`.
    ///
    /// # Errors
    ///
    /// [`Error::Command`](crate::Error::Command) when the DELETE fails.
    pub fn delete_where<T: Mapped>(&mut self, filter: Filter) -> Result<u64> {
        self.open_connection()?;
        let result = self.describe::<T>().and_then(|descriptor| {
            let command = plan::delete_where(&*self.builder, &descriptor, &filter)?;
            self.run_execute(&command)
        });
        self.finish(result)
    }

    /// Insert `items` in order inside one transaction.
    ///
    /// Returns the number of inserted items. Any failure rolls the whole
    /// transaction back.
    ///
    /// # Errors
    ///
    /// - [`TransactionStateError`](crate::TransactionStateError) for an
    ///   inactive or stale `transaction`, or when `None` is passed while
    ///   another transaction is active
    /// - the first failing insert
    pub fn insert_range<T: Mapped>(&mut self, items: &mut [T], transaction: Option<&TransactionHandle>) -> Result<u64> {
        let owned = self.enter_range(transaction)?;
        let mut result = Ok(0);
        for item in items.iter_mut() {
            if let Err(err) = self.insert_one(item, &[]) {
                result = Err(err);
                break;
            }
            result = result.map(|n| n + 1);
        }
        self.leave_range(owned, result)
    }

    /// Update `items` by key inside one transaction.
    ///
    /// Returns the total affected row count.
    ///
    /// # Errors
    ///
    /// See [`insert_range`](Self::insert_range).
    pub fn update_range<T: Mapped>(&mut self, items: &[T], transaction: Option<&TransactionHandle>) -> Result<u64> {
        let owned = self.enter_range(transaction)?;
        let result = items
            .iter()
            .try_fold(0, |total, item| self.update_one(item, None, &[]).map(|n| total + n));
        self.leave_range(owned, result)
    }

    /// Delete `items` by key inside one transaction.
    ///
    /// # Errors
    ///
    /// See [`insert_range`](Self::insert_range).
    pub fn delete_range<T: Mapped>(&mut self, items: &[T], transaction: Option<&TransactionHandle>) -> Result<u64> {
        let owned = self.enter_range(transaction)?;
        let result = items
            .iter()
            .try_fold(0, |total, item| self.delete_one(item).map(|n| total + n));
        self.leave_range(owned, result)
    }
}

impl<C: AsyncConnection> DataClient<C> {
    /// Non-blocking [`execute`](Self::execute).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn execute_async<P: BindSource + ?Sized>(
        &mut self,
        text: &str,
        params: &P,
        cancel: &CancellationToken
    ) -> Result<u64> {
        let command = self.raw_command(text, params)?;
        self.open_connection_async(cancel).await?;
        let result = self.run_execute_async(&command, cancel).await;
        self.finish_async(result).await
    }

    /// Non-blocking [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn insert_async<T: Mapped>(&mut self, item: &mut T, cancel: &CancellationToken) -> Result<Option<Value>> {
        self.insert_columns_async(item, &[], cancel).await
    }

    /// Non-blocking [`insert_columns`](Self::insert_columns).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn insert_columns_async<T: Mapped>(
        &mut self,
        item: &mut T,
        columns: &[&str],
        cancel: &CancellationToken
    ) -> Result<Option<Value>> {
        self.open_connection_async(cancel).await?;
        let result = self.insert_one_async(item, columns, cancel).await;
        self.finish_async(result).await
    }

    async fn insert_one_async<T: Mapped>(
        &mut self,
        item: &mut T,
        columns: &[&str],
        cancel: &CancellationToken
    ) -> Result<Option<Value>> {
        let descriptor = self.describe::<T>()?;
        let plan = plan::insert(&*self.builder, &descriptor, &*item, columns)?;
        self.run_execute_async(&plan.command, cancel).await?;
        let Some(identity) = plan.identity else {
            return Ok(None);
        };
        let raw = self.run_scalar_async(&identity.command, cancel).await?;
        let member = &descriptor.members()[identity.member];
        let value = self.converter().convert(raw, member.shape())?;
        member.set(&mut *item, value.clone())?;
        trace!(type_name = descriptor.name(), identity = %value, "identity assigned");
        Ok(Some(value))
    }

    /// Non-blocking [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn update_async<T: Mapped>(&mut self, item: &T, cancel: &CancellationToken) -> Result<u64> {
        self.update_where_async(item, None, &[], cancel).await
    }

    /// Non-blocking [`update_columns`](Self::update_columns).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn update_columns_async<T: Mapped>(
        &mut self,
        item: &T,
        columns: &[&str],
        cancel: &CancellationToken
    ) -> Result<u64> {
        self.update_where_async(item, None, columns, cancel).await
    }

    /// Non-blocking [`update_where`](Self::update_where).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn update_where_async<T: Mapped>(
        &mut self,
        item: &T,
        filter: Option<Filter>,
        columns: &[&str],
        cancel: &CancellationToken
    ) -> Result<u64> {
        self.open_connection_async(cancel).await?;
        let result = self.update_one_async(item, filter.as_ref(), columns, cancel).await;
        self.finish_async(result).await
    }

    async fn update_one_async<T: Mapped>(
        &mut self,
        item: &T,
        filter: Option<&Filter>,
        columns: &[&str],
        cancel: &CancellationToken
    ) -> Result<u64> {
        let descriptor = self.describe::<T>()?;
        let command = plan::update(&*self.builder, &descriptor, item, filter, columns)?;
        self.run_execute_async(&command, cancel).await
    }

    /// Non-blocking [`delete`](Self::delete).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn delete_async<T: Mapped>(&mut self, item: &T, cancel: &CancellationToken) -> Result<u64> {
        self.open_connection_async(cancel).await?;
        let result = self.delete_one_async(item, cancel).await;
        self.finish_async(result).await
    }

    async fn delete_one_async<T: Mapped>(&mut self, item: &T, cancel: &CancellationToken) -> Result<u64> {
        let descriptor = self.describe::<T>()?;
        let command = plan::delete(&*self.builder, &descriptor, item)?;
        self.run_execute_async(&command, cancel).await
    }

    /// Non-blocking [`delete_where`](Self::delete_where).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn delete_where_async<T: Mapped>(&mut self, filter: Filter, cancel: &CancellationToken) -> Result<u64> {
        self.open_connection_async(cancel).await?;
        let result = match self.describe::<T>() {
            Ok(descriptor) => match plan::delete_where(&*self.builder, &descriptor, &filter) {
                Ok(command) => self.run_execute_async(&command, cancel).await,
                Err(err) => Err(err)
            },
            Err(err) => Err(err)
        };
        self.finish_async(result).await
    }

    /// Non-blocking [`insert_range`](Self::insert_range).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn insert_range_async<T: Mapped>(
        &mut self,
        items: &mut [T],
        transaction: Option<&TransactionHandle>,
        cancel: &CancellationToken
    ) -> Result<u64> {
        let owned = self.enter_range_async(transaction, cancel).await?;
        let mut result = Ok(0);
        for item in items.iter_mut() {
            if let Err(err) = self.insert_one_async(item, &[], cancel).await {
                result = Err(err);
                break;
            }
            result = result.map(|n| n + 1);
        }
        self.leave_range_async(owned, result).await
    }

    /// Non-blocking [`update_range`](Self::update_range).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn update_range_async<T: Mapped>(
        &mut self,
        items: &[T],
        transaction: Option<&TransactionHandle>,
        cancel: &CancellationToken
    ) -> Result<u64> {
        let owned = self.enter_range_async(transaction, cancel).await?;
        let mut result = Ok(0);
        for item in items {
            match self.update_one_async(item, None, &[], cancel).await {
                Ok(n) => result = result.map(|total| total + n),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        self.leave_range_async(owned, result).await
    }

    /// Non-blocking [`delete_range`](Self::delete_range).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn delete_range_async<T: Mapped>(
        &mut self,
        items: &[T],
        transaction: Option<&TransactionHandle>,
        cancel: &CancellationToken
    ) -> Result<u64> {
        let owned = self.enter_range_async(transaction, cancel).await?;
        let mut result = Ok(0);
        for item in items {
            match self.delete_one_async(item, cancel).await {
                Ok(n) => result = result.map(|total| total + n),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        self.leave_range_async(owned, result).await
    }
}
