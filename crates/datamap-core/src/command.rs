// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Commands and the command builder interface.
//!
//! The data client never writes SQL itself. It hands a descriptor and the
//! query constraints ([`Select`]) or the member list of a write to a
//! [`CommandBuilder`] and executes the [`Command`] it gets back. The crate's
//! reference builder is [`SqlCommandBuilder`](crate::sql::SqlCommandBuilder).
//!
//! # Placeholder naming
//!
//! - INSERT / UPDATE SET values: the member name
//! - WHERE values from [`CommandBuilder::build_where`]: `p_0`, `p_1`, ...

use std::fmt;

use crate::{
    binder::Params,
    descriptor::{MemberDescriptor, TypeDescriptor},
    error::MappingError,
    filter::Filter,
    value::Value
};

/// Command text with its bound parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Command {
    /// Command text as sent to the driver.
    pub text:   String,
    /// Bound parameters.
    pub params: Params
}

impl Command {
    /// Command without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text:   text.into(),
            params: Params::new()
        }
    }

    /// Command with parameters.
    pub fn with_params(text: impl Into<String>, params: Params) -> Self {
        Self {
            text: text.into(),
            params
        }
    }

    /// Text with every placeholder replaced by its literal, for logs.
    pub fn render(&self, builder: &dyn CommandBuilder) -> String {
        let mut params: Vec<(&str, &Value)> = self.params.iter().collect();
        params.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));
        let mut text = self.text.clone();
        for (name, value) in params {
            text = text.replace(&builder.placeholder(name), &builder.to_literal(value));
        }
        text
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)?;
        if !self.params.is_empty() {
            write!(f, " [{}]", self.params)?;
        }
        Ok(())
    }
}

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,

    /// Descending order (Z-A, 9-0, newest first).
    Desc
}

impl SortDirection {
    /// Convert to SQL keyword.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC"
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Member or column name.
    pub column:    String,
    /// Direction.
    pub direction: SortDirection
}

impl Order {
    /// Ascending by `column`.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column:    column.into(),
            direction: SortDirection::Asc
        }
    }

    /// Descending by `column`.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column:    column.into(),
            direction: SortDirection::Desc
        }
    }
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFn {
    /// `COUNT`
    Count,
    /// `SUM`
    Sum,
    /// `MIN`
    Min,
    /// `MAX`
    Max,
    /// `AVG`
    Avg
}

impl AggregateFn {
    /// All functions in the order [`get_aggs`](crate::DataClient::get_aggs)
    /// computes them.
    pub const ALL: [Self; 5] = [Self::Count, Self::Sum, Self::Min, Self::Max, Self::Avg];

    /// Convert to SQL function name.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG"
        }
    }

    /// Lowercase name used in result aliases.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg"
        }
    }
}

/// One aggregate in a projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// Function.
    pub function: AggregateFn,
    /// Member or column name; `None` means `*`.
    pub column:   Option<String>,
    /// Result column alias.
    pub alias:    String
}

impl Aggregate {
    /// `function(column) AS alias` with the alias `{function}_{column}`.
    pub fn of(function: AggregateFn, column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            alias: format!("{}_{}", function.name(), column),
            function,
            column: Some(column)
        }
    }

    /// `COUNT(*) AS count`.
    pub fn count_all() -> Self {
        Self {
            function: AggregateFn::Count,
            column:   None,
            alias:    "count".into()
        }
    }
}

/// What a SELECT returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// Every mapped member.
    #[default]
    Members,
    /// The named members or columns.
    Columns(Vec<String>),
    /// Aggregates only.
    Aggregates(Vec<Aggregate>)
}

/// SELECT constraints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    /// Returned columns.
    pub projection: Projection,
    /// WHERE predicate.
    pub filter:     Option<Filter>,
    /// ORDER BY terms.
    pub order:      Vec<Order>,
    /// Maximum rows.
    pub limit:      Option<u64>,
    /// Rows to skip.
    pub offset:     Option<u64>
}

impl Select {
    /// Select every member of every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict rows.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter
        });
        self
    }

    /// Restrict rows when `filter` is present.
    #[must_use]
    pub fn filter_opt(self, filter: Option<Filter>) -> Self {
        match filter {
            Some(filter) => self.filter(filter),
            None => self
        }
    }

    /// Append an ORDER BY term.
    #[must_use]
    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    /// Cap the number of rows.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip rows.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Return only the named members or columns.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        self.projection = Projection::Columns(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Return aggregates instead of rows.
    #[must_use]
    pub fn aggregates(mut self, aggregates: Vec<Aggregate>) -> Self {
        self.projection = Projection::Aggregates(aggregates);
        self
    }
}

/// Generates command text for a descriptor.
///
/// Implementations decide quoting, placeholder syntax and paging clauses.
/// Column references in [`Select`] and [`Filter`] are member or column names
/// and must be mapped through the descriptor.
pub trait CommandBuilder: Send + Sync {
    /// Quote an identifier.
    fn quote(&self, identifier: &str) -> String;

    /// Placeholder for the parameter `name`.
    fn placeholder(&self, name: &str) -> String;

    /// Literal form of `value`, for diagnostic rendering.
    fn to_literal(&self, value: &Value) -> String;

    /// Query returning the identity generated by the last INSERT, if the
    /// database supports it.
    fn identity_query(&self) -> Option<String>;

    /// Qualified, quoted table name of `descriptor`.
    fn table_name(&self, descriptor: &TypeDescriptor) -> String {
        match descriptor.schema() {
            Some(schema) => format!("{}.{}", self.quote(schema), self.quote(descriptor.table())),
            None => self.quote(descriptor.table())
        }
    }

    /// Full SELECT with its WHERE parameters.
    ///
    /// # Errors
    ///
    /// [`MappingError::UnknownMember`] for unknown column references.
    fn build_select(&self, descriptor: &TypeDescriptor, select: &Select) -> Result<Command, MappingError>;

    /// INSERT of `columns`, values bound by member name.
    fn build_insert(&self, descriptor: &TypeDescriptor, columns: &[&MemberDescriptor]) -> String;

    /// UPDATE of `columns` without a WHERE clause, values bound by member
    /// name.
    fn build_update(&self, descriptor: &TypeDescriptor, columns: &[&MemberDescriptor]) -> String;

    /// DELETE without a WHERE clause.
    fn build_delete(&self, descriptor: &TypeDescriptor) -> String;

    /// Predicate text (without the `WHERE` keyword) and its parameters.
    ///
    /// # Errors
    ///
    /// [`MappingError::UnknownMember`] for unknown column references.
    fn build_where(&self, descriptor: &TypeDescriptor, filter: &Filter) -> Result<(String, Params), MappingError>;

    /// Append paging to a SELECT.
    fn add_limit_offset(&self, text: &str, limit: Option<u64>, offset: Option<u64>) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{filter::col, params, sql::SqlCommandBuilder};

    #[test]
    fn render_replaces_longest_names_first() {
        let command = Command::with_params(
            "SELECT * FROM t WHERE a = @p_1 AND b = @p_10",
            params! { "p_1" => 1, "p_10" => "x" }
        );
        assert_eq!(
            command.render(&SqlCommandBuilder::default()),
            "SELECT * FROM t WHERE a = 1 AND b = 'x'"
        );
    }

    #[test]
    fn display_includes_params() {
        let command = Command::with_params("DELETE FROM t WHERE id = @Id", params! { "Id" => 3 });
        assert_eq!(command.to_string(), "DELETE FROM t WHERE id = @Id [Id=3]");
        assert_eq!(Command::new("SELECT 1").to_string(), "SELECT 1");
    }

    #[test]
    fn select_filters_combine() {
        let select = Select::new().filter(col("a").eq(1)).filter(col("b").eq(2)).limit(5);
        assert!(matches!(select.filter, Some(Filter::And(ref parts)) if parts.len() == 2));
        assert_eq!(select.limit, Some(5));
    }

    #[test]
    fn aggregate_alias() {
        let agg = Aggregate::of(AggregateFn::Avg, "age");
        assert_eq!(agg.alias, "avg_age");
        assert_eq!(Aggregate::count_all().column, None);
    }

    #[test]
    fn sort_direction_sql() {
        assert_eq!(SortDirection::Asc.as_sql(), "ASC");
        assert_eq!(SortDirection::Desc.as_sql(), "DESC");
        assert_eq!(SortDirection::default(), SortDirection::Asc);
    }
}
