// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Aggregates and paging.

use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;

use super::{DataClient, plan};
use crate::{
    command::{Aggregate, AggregateFn},
    driver::{AsyncConnection, Connection, ResultSet},
    error::Result,
    filter::Filter,
    mapping::Mapped,
    paging::{Pagination, page_count, pages},
    value::Value
};

/// The five aggregates of one column, as computed by
/// [`get_aggs`](DataClient::get_aggs).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    /// Non-null values.
    pub count: u64,
    /// Sum, `NULL` over no rows.
    pub sum:   Value,
    /// Smallest value.
    pub min:   Value,
    /// Largest value.
    pub max:   Value,
    /// Mean value.
    pub avg:   Value
}

fn to_count(value: &Value) -> u64 {
    value.as_i64().and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
}

/// Split the single row of an all-aggregates query per column.
fn collect_aggregates(columns: &[&str], set: &ResultSet) -> BTreeMap<String, Aggregates> {
    let row = set.rows().first();
    let cell = |function: AggregateFn, column: &str| -> Value {
        let alias = Aggregate::of(function, column).alias;
        set.column_index(&alias)
            .and_then(|index| row.and_then(|r| r.get(index)))
            .cloned()
            .unwrap_or_default()
    };
    columns
        .iter()
        .map(|column| {
            let aggregates = Aggregates {
                count: to_count(&cell(AggregateFn::Count, column)),
                sum:   cell(AggregateFn::Sum, column),
                min:   cell(AggregateFn::Min, column),
                max:   cell(AggregateFn::Max, column),
                avg:   cell(AggregateFn::Avg, column)
            };
            ((*column).to_owned(), aggregates)
        })
        .collect()
}

impl<C: Connection> DataClient<C> {
    fn run_aggregate<T: Mapped>(&mut self, aggregate: Aggregate, filter: Option<Filter>) -> Result<Value> {
        self.open_connection()?;
        let result = self.describe::<T>().and_then(|descriptor| {
            let command = plan::aggregate(&*self.builder, &descriptor, aggregate, filter)?;
            self.run_scalar(&command)
        });
        self.finish(result)
    }

    /// Rows of `T` matching `filter`; `0` for an empty table.
    ///
    /// # Errors
    ///
    /// [`Error::Command`](crate::Error::Command) when the query fails.
    pub fn count<T: Mapped>(&mut self, filter: Option<Filter>) -> Result<u64> {
        self.run_aggregate::<T>(Aggregate::count_all(), filter)
            .map(|value| to_count(&value))
    }

    /// `SUM(column)`; `NULL` when no row matches.
    ///
    /// # Errors
    ///
    /// - [`Error::Mapping`](crate::Error::Mapping) for an unknown column
    /// - [`Error::Command`](crate::Error::Command) when the query fails
    pub fn sum<T: Mapped>(&mut self, column: &str, filter: Option<Filter>) -> Result<Value> {
        self.run_aggregate::<T>(Aggregate::of(AggregateFn::Sum, column), filter)
    }

    /// `MIN(column)`.
    ///
    /// # Errors
    ///
    /// See [`sum`](Self::sum).
    pub fn min<T: Mapped>(&mut self, column: &str, filter: Option<Filter>) -> Result<Value> {
        self.run_aggregate::<T>(Aggregate::of(AggregateFn::Min, column), filter)
    }

    /// `MAX(column)`.
    ///
    /// # Errors
    ///
    /// See [`sum`](Self::sum).
    pub fn max<T: Mapped>(&mut self, column: &str, filter: Option<Filter>) -> Result<Value> {
        self.run_aggregate::<T>(Aggregate::of(AggregateFn::Max, column), filter)
    }

    /// `AVG(column)`.
    ///
    /// # Errors
    ///
    /// See [`sum`](Self::sum).
    pub fn avg<T: Mapped>(&mut self, column: &str, filter: Option<Filter>) -> Result<Value> {
        self.run_aggregate::<T>(Aggregate::of(AggregateFn::Avg, column), filter)
    }

    /// All five aggregates of each of `columns` in one query.
    ///
    /// # Errors
    ///
    /// See [`sum`](Self::sum).
    pub fn get_aggs<T: Mapped>(
        &mut self,
        columns: &[&str],
        filter: Option<Filter>
    ) -> Result<BTreeMap<String, Aggregates>> {
        self.open_connection()?;
        let result = self.describe::<T>().and_then(|descriptor| {
            let command = plan::all_aggregates(&*self.builder, &descriptor, columns, filter)?;
            self.run_query(&command, Some(1))
        });
        self.finish(result).map(|set| collect_aggregates(columns, &set))
    }

    /// Pages of `page_size` rows over the rows matching `filter`, keyed by
    /// 1-based page number.
    ///
    /// # Errors
    ///
    /// See [`count`](Self::count).
    pub fn get_pages<T: Mapped>(&mut self, page_size: u64, filter: Option<Filter>) -> Result<BTreeMap<u64, Pagination>> {
        self.count::<T>(filter).map(|total| pages(total, page_size))
    }

    /// Number of pages [`get_pages`](Self::get_pages) would return.
    ///
    /// # Errors
    ///
    /// See [`count`](Self::count).
    pub fn get_pages_count<T: Mapped>(&mut self, page_size: u64, filter: Option<Filter>) -> Result<u64> {
        self.count::<T>(filter).map(|total| page_count(total, page_size))
    }
}

impl<C: AsyncConnection> DataClient<C> {
    async fn run_aggregate_async<T: Mapped>(
        &mut self,
        aggregate: Aggregate,
        filter: Option<Filter>,
        cancel: &CancellationToken
    ) -> Result<Value> {
        self.open_connection_async(cancel).await?;
        let planned = self
            .describe::<T>()
            .and_then(|descriptor| plan::aggregate(&*self.builder, &descriptor, aggregate, filter));
        let result = match planned {
            Ok(command) => self.run_scalar_async(&command, cancel).await,
            Err(err) => Err(err)
        };
        self.finish_async(result).await
    }

    /// Non-blocking [`count`](Self::count).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn count_async<T: Mapped>(&mut self, filter: Option<Filter>, cancel: &CancellationToken) -> Result<u64> {
        self.run_aggregate_async::<T>(Aggregate::count_all(), filter, cancel)
            .await
            .map(|value| to_count(&value))
    }

    /// Non-blocking [`sum`](Self::sum).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn sum_async<T: Mapped>(
        &mut self,
        column: &str,
        filter: Option<Filter>,
        cancel: &CancellationToken
    ) -> Result<Value> {
        self.run_aggregate_async::<T>(Aggregate::of(AggregateFn::Sum, column), filter, cancel)
            .await
    }

    /// Non-blocking [`min`](Self::min).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn min_async<T: Mapped>(
        &mut self,
        column: &str,
        filter: Option<Filter>,
        cancel: &CancellationToken
    ) -> Result<Value> {
        self.run_aggregate_async::<T>(Aggregate::of(AggregateFn::Min, column), filter, cancel)
            .await
    }

    /// Non-blocking [`max`](Self::max).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn max_async<T: Mapped>(
        &mut self,
        column: &str,
        filter: Option<Filter>,
        cancel: &CancellationToken
    ) -> Result<Value> {
        self.run_aggregate_async::<T>(Aggregate::of(AggregateFn::Max, column), filter, cancel)
            .await
    }

    /// Non-blocking [`avg`](Self::avg).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn avg_async<T: Mapped>(
        &mut self,
        column: &str,
        filter: Option<Filter>,
        cancel: &CancellationToken
    ) -> Result<Value> {
        self.run_aggregate_async::<T>(Aggregate::of(AggregateFn::Avg, column), filter, cancel)
            .await
    }

    /// Non-blocking [`get_aggs`](Self::get_aggs).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn get_aggs_async<T: Mapped>(
        &mut self,
        columns: &[&str],
        filter: Option<Filter>,
        cancel: &CancellationToken
    ) -> Result<BTreeMap<String, Aggregates>> {
        self.open_connection_async(cancel).await?;
        let planned = self
            .describe::<T>()
            .and_then(|descriptor| plan::all_aggregates(&*self.builder, &descriptor, columns, filter));
        let result = match planned {
            Ok(command) => self.run_query_async(&command, Some(1), cancel).await,
            Err(err) => Err(err)
        };
        self.finish_async(result)
            .await
            .map(|set| collect_aggregates(columns, &set))
    }

    /// Non-blocking [`get_pages`](Self::get_pages).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn get_pages_async<T: Mapped>(
        &mut self,
        page_size: u64,
        filter: Option<Filter>,
        cancel: &CancellationToken
    ) -> Result<BTreeMap<u64, Pagination>> {
        self.count_async::<T>(filter, cancel)
            .await
            .map(|total| pages(total, page_size))
    }

    /// Non-blocking [`get_pages_count`](Self::get_pages_count).
    ///
    /// # Errors
    ///
    /// As the blocking form, plus [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn get_pages_count_async<T: Mapped>(
        &mut self,
        page_size: u64,
        filter: Option<Filter>,
        cancel: &CancellationToken
    ) -> Result<u64> {
        self.count_async::<T>(filter, cancel)
            .await
            .map(|total| page_count(total, page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_are_split_per_column() {
        let set = ResultSet::new(
            vec!["count_Age".into(), "sum_Age".into(), "min_Age".into(), "max_Age".into(), "avg_Age".into()],
            vec![vec![Value::Int(3), Value::Int(90), Value::Int(20), Value::Int(40), Value::Float(30.0)]]
        );
        let map = collect_aggregates(&["Age"], &set);
        let age = &map["Age"];
        assert_eq!(age.count, 3);
        assert_eq!(age.sum, Value::Int(90));
        assert_eq!(age.avg, Value::Float(30.0));
    }

    #[test]
    fn empty_result_yields_nulls() {
        let set = ResultSet::new(vec!["count_Age".into()], Vec::new());
        let map = collect_aggregates(&["Age"], &set);
        assert_eq!(map["Age"], Aggregates::default());
    }

    #[test]
    fn count_reads_integers_only() {
        assert_eq!(to_count(&Value::Int(4)), 4);
        assert_eq!(to_count(&Value::Null), 0);
        assert_eq!(to_count(&Value::Int(-1)), 0);
    }
}
