// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Typed predicates for WHERE clauses.
//!
//! Column references use member names (or column names); the command
//! builder maps them onto the descriptor when it renders the clause.
//!
//! ```rust
//! use datamap_core::filter::{Filter, col};
//!
//! let adults = col("age").ge(18).and(col("name").like("A%"));
//! assert!(matches!(adults, Filter::And(ref parts) if parts.len() == 2));
//! ```

use std::ops::Not;

use crate::{binder::Params, value::Value};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge
}

impl CompareOp {
    /// Convert to SQL operator.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">="
        }
    }
}

/// Predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column <op> value`
    Compare {
        /// Member or column name.
        column: String,
        /// Operator.
        op:     CompareOp,
        /// Right-hand side.
        value:  Value
    },

    /// `column LIKE pattern`
    Like {
        /// Member or column name.
        column:  String,
        /// SQL pattern.
        pattern: String
    },

    /// `column IN (values)`
    In {
        /// Member or column name.
        column: String,
        /// Candidate values.
        values: Vec<Value>
    },

    /// `column IS NULL`
    IsNull {
        /// Member or column name.
        column: String
    },

    /// `column IS NOT NULL`
    IsNotNull {
        /// Member or column name.
        column: String
    },

    /// Every part holds.
    And(Vec<Filter>),

    /// At least one part holds.
    Or(Vec<Filter>),

    /// Negation.
    Not(Box<Filter>),

    /// Literal SQL with its own parameters.
    Raw {
        /// Clause text, placeholders included.
        text:   String,
        /// Parameters referenced by `text`.
        params: Params
    }
}

impl Filter {
    /// Literal SQL clause.
    pub fn raw(text: impl Into<String>, params: Params) -> Self {
        Self::Raw {
            text: text.into(),
            params
        }
    }

    /// Conjunction, flattening nested `And`s.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), right) => {
                left.push(right);
                Self::And(left)
            }
            (left, right) => Self::And(vec![left, right])
        }
    }

    /// Disjunction, flattening nested `Or`s.
    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), right) => {
                left.push(right);
                Self::Or(left)
            }
            (left, right) => Self::Or(vec![left, right])
        }
    }

    /// Conjunction of all `filters`; `None` when empty.
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Option<Self> {
        filters.into_iter().reduce(Self::and)
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Self::Output {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other))
        }
    }
}

/// Column reference, the start of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef(String);

/// Reference a member or column by name.
pub fn col(name: impl Into<String>) -> ColumnRef {
    ColumnRef(name.into())
}

impl ColumnRef {
    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Filter {
        Filter::Compare {
            column: self.0,
            op,
            value: value.into()
        }
    }

    /// `= value`
    pub fn eq(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Eq, value)
    }

    /// `<> value`
    pub fn ne(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Ne, value)
    }

    /// `< value`
    pub fn lt(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Lt, value)
    }

    /// `<= value`
    pub fn le(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Le, value)
    }

    /// `> value`
    pub fn gt(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Gt, value)
    }

    /// `>= value`
    pub fn ge(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Ge, value)
    }

    /// `LIKE pattern`
    pub fn like(self, pattern: impl Into<String>) -> Filter {
        Filter::Like {
            column:  self.0,
            pattern: pattern.into()
        }
    }

    /// `IN (values)`
    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Filter {
        Filter::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect()
        }
    }

    /// `IS NULL`
    pub fn is_null(self) -> Filter {
        Filter::IsNull {
            column: self.0
        }
    }

    /// `IS NOT NULL`
    pub fn is_not_null(self) -> Filter {
        Filter::IsNotNull {
            column: self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_flattens() {
        let filter = col("a").eq(1).and(col("b").eq(2)).and(col("c").eq(3));
        assert!(matches!(filter, Filter::And(ref parts) if parts.len() == 3));
    }

    #[test]
    fn or_flattens() {
        let filter = col("a").eq(1).or(col("b").eq(2)).or(col("c").is_null());
        assert!(matches!(filter, Filter::Or(ref parts) if parts.len() == 3));
    }

    #[test]
    fn double_negation_cancels() {
        let filter = col("a").eq(1);
        assert_eq!(!!filter.clone(), filter);
    }

    #[test]
    fn all_of_none_is_none() {
        assert_eq!(Filter::all(Vec::new()), None);
        assert_eq!(Filter::all(vec![col("a").eq(1)]), Some(col("a").eq(1)));
    }

    #[test]
    fn in_collects_values() {
        let filter = col("id").is_in([1, 2, 3]);
        assert_eq!(filter, Filter::In {
            column: "id".into(),
            values: vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        });
    }
}
