// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Result materialization: rows into objects.
//!
//! A [`RowPlan`] is computed once per result set. It maps every result column
//! to a member (honoring the name overrides of
//! [`ClientOptions::name_map`](crate::ClientOptions::name_map)) and picks how
//! objects are constructed:
//!
//! 1. the constructor with the most parameters whose names all match a
//!    column
//! 2. the parameterless constructor
//! 3. a constructor taking exactly as many parameters as there are columns,
//!    fed positionally
//!
//! Columns not consumed by the constructor are then assigned to writable key,
//! column-mapped and foreign-key members. Non-composite targets skip all of
//! this and decode the first column.

use std::{collections::BTreeMap, fmt};

use crate::{
    descriptor::{AnyObject, TypeDescriptor},
    driver::ResultSet,
    error::{ConversionError, Error, MappingError},
    mapping::ParamDef,
    shape::{FieldType, ShapeKind, TypeShape},
    value::Value
};

/// Converts raw cells before they reach a constructor or setter.
pub trait ValueConverter: Send + Sync {
    /// Convert `value` for a member of shape `target`.
    ///
    /// # Errors
    ///
    /// When the cell cannot be represented as `target`.
    fn convert(&self, value: Value, target: &TypeShape) -> Result<Value, ConversionError>;
}

/// Null-folding, trimming converter.
///
/// Empty-equivalent cells become `NULL`. Integer cells headed for boolean or
/// float members are widened; everything else is left to the member type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultConverter {
    /// Trim surrounding whitespace from text cells.
    pub trim_strings: bool
}

impl Default for DefaultConverter {
    fn default() -> Self {
        Self {
            trim_strings: true
        }
    }
}

impl ValueConverter for DefaultConverter {
    #[allow(clippy::cast_precision_loss)]
    fn convert(&self, value: Value, target: &TypeShape) -> Result<Value, ConversionError> {
        if value.is_empty_equivalent() {
            return Ok(Value::Null);
        }
        Ok(match value {
            Value::Text(text) if self.trim_strings && text.trim().len() != text.len() => {
                Value::Text(text.trim().to_owned())
            }
            Value::Int(i) if target.kind == ShapeKind::Bool => Value::Bool(i != 0),
            Value::Int(i) if target.kind == ShapeKind::Float => Value::Float(i as f64),
            other => other
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Construction {
    Named {
        ctor:    usize,
        columns: Vec<usize>
    },
    Default,
    Positional {
        ctor: usize
    },
    Scalar
}

/// Per-result-set construction plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPlan {
    construction: Construction,
    assignments:  Vec<(usize, usize)>
}

impl RowPlan {
    /// `(column index, member index)` pairs assigned after construction.
    pub fn assignments(&self) -> &[(usize, usize)] {
        &self.assignments
    }
}

/// Builds objects of one descriptor from result rows.
pub struct Materializer<'a> {
    descriptor: &'a TypeDescriptor,
    converter:  &'a dyn ValueConverter,
    name_map:   &'a BTreeMap<String, String>
}

impl<'a> Materializer<'a> {
    /// Materializer for `descriptor`.
    pub const fn new(
        descriptor: &'a TypeDescriptor,
        converter: &'a dyn ValueConverter,
        name_map: &'a BTreeMap<String, String>
    ) -> Self {
        Self {
            descriptor,
            converter,
            name_map
        }
    }

    fn mapped_name<'c>(&'c self, column: &'c str) -> &'c str {
        self.name_map
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(column))
            .map_or(column, |(_, m)| m.as_str())
    }

    /// Plan construction for a result with `columns`.
    ///
    /// # Errors
    ///
    /// [`MappingError::NoUsableConstructor`] when no constructor fits.
    pub fn plan(&self, columns: &[String]) -> Result<RowPlan, MappingError> {
        if !self.descriptor.is_composite() {
            return Ok(RowPlan {
                construction: Construction::Scalar,
                assignments:  Vec::new()
            });
        }

        let targets: Vec<Option<usize>> = columns
            .iter()
            .map(|c| self.descriptor.member_index(self.mapped_name(c)))
            .collect();
        let column_for = |param: &str| -> Option<usize> {
            match self.descriptor.member_index(param) {
                Some(member) => targets.iter().position(|t| *t == Some(member)),
                None => columns.iter().position(|c| self.mapped_name(c).eq_ignore_ascii_case(param))
            }
        };

        let named = self
            .descriptor
            .constructors()
            .iter()
            .enumerate()
            .rev()
            .find_map(|(idx, ctor)| {
                ctor.params()
                    .iter()
                    .map(|p| column_for(&p.name))
                    .collect::<Option<Vec<_>>>()
                    .map(|columns| Construction::Named {
                        ctor: idx,
                        columns
                    })
            });
        let construction = named
            .or_else(|| self.descriptor.has_default_constructor().then_some(Construction::Default))
            .or_else(|| {
                self.descriptor
                    .constructors()
                    .iter()
                    .position(|ctor| ctor.arity() == columns.len())
                    .map(|ctor| Construction::Positional {
                        ctor
                    })
            })
            .ok_or_else(|| MappingError::NoUsableConstructor {
                type_name: self.descriptor.name().to_owned(),
                columns:   columns.join(", ")
            })?;

        let consumed = |column: usize| match &construction {
            Construction::Named {
                columns, ..
            } => columns.contains(&column),
            Construction::Positional {
                ..
            } => true,
            Construction::Default | Construction::Scalar => false
        };
        let members = self.descriptor.members();
        let assignments = targets
            .iter()
            .enumerate()
            .filter(|(column, _)| !consumed(*column))
            .filter_map(|(column, target)| target.map(|member| (column, member)))
            .filter(|(_, member)| {
                let m = &members[*member];
                m.can_write() && (m.is_key() || m.is_column_mapped() || m.is_foreign_key())
            })
            .collect();

        Ok(RowPlan {
            construction,
            assignments
        })
    }

    fn convert_args(&self, row: &[Value], columns: &[usize], params: &[ParamDef]) -> Result<Vec<Value>, ConversionError> {
        columns
            .iter()
            .zip(params)
            .map(|(&column, param)| self.converter.convert(row[column].clone(), &param.shape))
            .collect()
    }

    fn construct(&self, plan: &RowPlan, row: &[Value]) -> Result<AnyObject, Error> {
        let ctors = self.descriptor.constructors();
        match &plan.construction {
            Construction::Named {
                ctor,
                columns
            } => {
                let ctor = &ctors[*ctor];
                Ok(ctor.invoke(self.convert_args(row, columns, ctor.params())?)?)
            }
            Construction::Positional {
                ctor
            } => {
                let ctor = &ctors[*ctor];
                let columns: Vec<usize> = (0..ctor.arity()).collect();
                Ok(ctor.invoke(self.convert_args(row, &columns, ctor.params())?)?)
            }
            Construction::Default | Construction::Scalar => {
                self.descriptor
                    .create_default()
                    .ok_or_else(|| Error::from(MappingError::NoUsableConstructor {
                        type_name: self.descriptor.name().to_owned(),
                        columns:   String::new()
                    }))
            }
        }
    }

    /// Build one object from `row`.
    ///
    /// # Errors
    ///
    /// - [`Error::Conversion`] when a cell cannot be converted
    /// - [`Error::Access`] when a setter rejects a value
    /// - [`MappingError::TypeMismatch`] when the descriptor does not describe
    ///   `T`
    pub fn materialize_row<T: FieldType>(&self, plan: &RowPlan, row: Vec<Value>) -> Result<T, Error> {
        if plan.construction == Construction::Scalar {
            let cell = row.into_iter().next().unwrap_or_default();
            return Ok(T::from_value(self.converter.convert(cell, &T::shape())?)?);
        }

        let mut object = self.construct(plan, &row)?;
        let members = self.descriptor.members();
        for &(column, member) in &plan.assignments {
            let member = &members[member];
            let value = self.converter.convert(row[column].clone(), member.shape())?;
            member.set(object.as_mut(), value)?;
        }
        object.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            MappingError::TypeMismatch {
                type_name: self.descriptor.name().to_owned()
            }
            .into()
        })
    }

    /// Build every row of `set`.
    ///
    /// # Errors
    ///
    /// See [`plan`](Self::plan) and [`materialize_row`](Self::materialize_row).
    pub fn materialize<T: FieldType>(&self, set: ResultSet) -> Result<Vec<T>, Error> {
        let plan = self.plan(set.columns())?;
        set.into_rows()
            .into_iter()
            .map(|row| self.materialize_row(&plan, row))
            .collect()
    }
}

impl fmt::Debug for Materializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Materializer")
            .field("type", &self.descriptor.name())
            .field("name_map", &self.name_map)
            .finish_non_exhaustive()
    }
}
