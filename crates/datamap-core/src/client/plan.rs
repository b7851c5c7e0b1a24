// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command planning shared by the blocking and non-blocking client surfaces.
//!
//! Nothing here performs I/O.

use std::any::Any;

use crate::{
    binder::Params,
    command::{Aggregate, AggregateFn, Command, CommandBuilder, Select},
    descriptor::{MemberDescriptor, TypeDescriptor},
    error::{AccessError, Error, MappingError, Result},
    filter::{Filter, col}
};

/// INSERT plus the optional identity read-back.
#[derive(Debug, Clone)]
pub(super) struct InsertPlan {
    pub command:  Command,
    pub identity: Option<IdentityPlan>
}

/// Identity query and the key member receiving its result.
#[derive(Debug, Clone)]
pub(super) struct IdentityPlan {
    pub member:  usize,
    pub command: Command
}

/// Members named by `columns`, or the column-mapped members when empty.
fn members<'d>(descriptor: &'d TypeDescriptor, columns: &[&str]) -> Result<Vec<&'d MemberDescriptor>> {
    if columns.is_empty() {
        return Ok(descriptor.column_mapped().collect());
    }
    columns
        .iter()
        .map(|c| descriptor.require_member(c).map_err(Error::from))
        .collect()
}

fn values(members: &[&MemberDescriptor], item: &dyn Any) -> Result<Params> {
    let mut params = Params::new();
    for member in members {
        params.insert(member.name(), member.get(item)?);
    }
    Ok(params)
}

/// Predicate matching the primary key of `item`.
fn key_filter(descriptor: &TypeDescriptor, item: &dyn Any, operation: &'static str) -> Result<Filter> {
    let filters = descriptor
        .keys()
        .map(|key| Ok(col(key.name()).eq(key.get(item)?)))
        .collect::<std::result::Result<Vec<_>, AccessError>>()?;
    Filter::all(filters).ok_or_else(|| {
        MappingError::MissingKey {
            type_name: descriptor.name().to_owned(),
            operation
        }
        .into()
    })
}

/// Append ` WHERE ...` built from `filter` to `text`.
fn with_where(
    builder: &dyn CommandBuilder,
    descriptor: &TypeDescriptor,
    text: String,
    mut params: Params,
    filter: &Filter
) -> Result<Command> {
    let (clause, bound) = builder.build_where(descriptor, filter)?;
    if let Some(name) = params.shared_name(&bound) {
        return Err(MappingError::DuplicateParameter {
            name: name.to_owned()
        }
        .into());
    }
    params.extend(bound);
    Ok(Command::with_params(format!("{text} WHERE {clause}"), params))
}

/// INSERT of `columns` (column-mapped members when empty).
///
/// The identity is read back only when the builder supports it, the type has
/// exactly one writable key and that key is not among the inserted columns.
pub(super) fn insert(
    builder: &dyn CommandBuilder,
    descriptor: &TypeDescriptor,
    item: &dyn Any,
    columns: &[&str]
) -> Result<InsertPlan> {
    let members = members(descriptor, columns)?;
    let command = Command::with_params(builder.build_insert(descriptor, &members), values(&members, item)?);

    let keys: Vec<&MemberDescriptor> = descriptor.keys().collect();
    let identity = match (builder.identity_query(), keys.as_slice()) {
        (Some(text), [key]) if key.can_write() && !members.iter().any(|m| m.name() == key.name()) => {
            descriptor
                .members()
                .iter()
                .position(|m| m.name() == key.name())
                .map(|member| IdentityPlan {
                    member,
                    command: Command::new(text)
                })
        }
        _ => None
    };
    Ok(InsertPlan {
        command,
        identity
    })
}

/// UPDATE of `columns` (column-mapped members when empty), restricted by
/// `filter` or else by the key of `item`.
pub(super) fn update(
    builder: &dyn CommandBuilder,
    descriptor: &TypeDescriptor,
    item: &dyn Any,
    filter: Option<&Filter>,
    columns: &[&str]
) -> Result<Command> {
    let members = members(descriptor, columns)?;
    if members.is_empty() {
        return Err(MappingError::NoColumns {
            type_name: descriptor.name().to_owned(),
            operation: "update"
        }
        .into());
    }
    let text = builder.build_update(descriptor, &members);
    let params = values(&members, item)?;
    match filter {
        Some(filter) => with_where(builder, descriptor, text, params, filter),
        None => {
            let filter = key_filter(descriptor, item, "update")?;
            with_where(builder, descriptor, text, params, &filter)
        }
    }
}

/// DELETE of the row matching the key of `item`.
pub(super) fn delete(builder: &dyn CommandBuilder, descriptor: &TypeDescriptor, item: &dyn Any) -> Result<Command> {
    let filter = key_filter(descriptor, item, "delete")?;
    with_where(builder, descriptor, builder.build_delete(descriptor), Params::new(), &filter)
}

/// DELETE of every row matching `filter`.
pub(super) fn delete_where(builder: &dyn CommandBuilder, descriptor: &TypeDescriptor, filter: &Filter) -> Result<Command> {
    with_where(builder, descriptor, builder.build_delete(descriptor), Params::new(), filter)
}

/// Single-aggregate SELECT.
pub(super) fn aggregate(
    builder: &dyn CommandBuilder,
    descriptor: &TypeDescriptor,
    aggregate: Aggregate,
    filter: Option<Filter>
) -> Result<Command> {
    Ok(builder.build_select(descriptor, &Select::new().aggregates(vec![aggregate]).filter_opt(filter))?)
}

/// SELECT computing every aggregate function for each of `columns`.
pub(super) fn all_aggregates(
    builder: &dyn CommandBuilder,
    descriptor: &TypeDescriptor,
    columns: &[&str],
    filter: Option<Filter>
) -> Result<Command> {
    let aggregates = columns
        .iter()
        .flat_map(|column| AggregateFn::ALL.iter().map(move |f| Aggregate::of(*f, *column)))
        .collect();
    Ok(builder.build_select(descriptor, &Select::new().aggregates(aggregates).filter_opt(filter))?)
}
