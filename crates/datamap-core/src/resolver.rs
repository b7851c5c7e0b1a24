// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Mapping resolution: annotations plus naming heuristics.
//!
//! [`resolve`] turns a type name, its annotations and its raw members into
//! table/column names and the key, foreign-key and column-mapped member
//! subsets. Explicit annotations always win; heuristics only fill gaps.
//!
//! # Primary keys
//!
//! Checked in order, the first non-empty result wins:
//!
//! 1. members annotated `Key`
//! 2. a member named `id` (any case)
//! 3. a member named `{table}id` (any case, resolved table name)
//! 4. no key
//!
//! # Column-mapped members
//!
//! Members annotated `Column` or `ForeignKey` that are neither `NotMapped`
//! nor keys. When that set is empty: every public scalar member that is
//! neither `NotMapped` nor a key.

use std::collections::HashSet;

use crate::{
    error::MappingError,
    mapping::{Annotations, Visibility},
    shape::TypeShape
};

/// Member facts the resolver needs.
#[derive(Debug, Clone, Copy)]
pub struct RawMember<'a> {
    /// Member name.
    pub name:        &'a str,
    /// Member annotations.
    pub annotations: &'a Annotations,
    /// Declared type.
    pub shape:       &'a TypeShape,
    /// Declared visibility.
    pub visibility:  Visibility
}

/// Output of [`resolve`]. Subsets are indices into the member list, in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMapping {
    /// Table name.
    pub table:         String,
    /// Schema name.
    pub schema:        Option<String>,
    /// Column name per member.
    pub columns:       Vec<String>,
    /// Primary-key members.
    pub keys:          Vec<usize>,
    /// Foreign-key members.
    pub foreign_keys:  Vec<usize>,
    /// Members eligible for INSERT/UPDATE.
    pub column_mapped: Vec<usize>
}

/// Resolve the mapping of one type.
///
/// # Errors
///
/// - [`MappingError::MalformedAnnotation`] for empty table, schema or column
///   names
/// - [`MappingError::DuplicateMember`] when two members share a name, or two
///   mapped members share a column (case-insensitive)
pub fn resolve(
    type_name: &str,
    annotations: &Annotations,
    members: &[RawMember<'_>]
) -> Result<ResolvedMapping, MappingError> {
    let malformed = |member: Option<&str>, reason: &str| MappingError::MalformedAnnotation {
        type_name: type_name.to_owned(),
        member:    member.map(str::to_owned),
        reason:    reason.to_owned()
    };

    let table = match annotations.table_name() {
        Some(name) if name.trim().is_empty() => return Err(malformed(None, "empty table name")),
        Some(name) => name.to_owned(),
        None => type_name.to_owned()
    };
    let schema = match annotations.schema_name() {
        Some(name) if name.trim().is_empty() => return Err(malformed(None, "empty schema name")),
        other => other.map(str::to_owned)
    };

    let mut columns = Vec::with_capacity(members.len());
    let mut seen_members = HashSet::new();
    let mut seen_columns = HashSet::new();
    for member in members {
        if !seen_members.insert(member.name.to_ascii_lowercase()) {
            return Err(MappingError::DuplicateMember {
                type_name: type_name.to_owned(),
                member:    member.name.to_owned()
            });
        }
        let column = match member.annotations.column_name() {
            Some(name) if name.trim().is_empty() => {
                return Err(malformed(Some(member.name), "empty column name"));
            }
            Some(name) => name.to_owned(),
            None => member.name.to_owned()
        };
        if !member.annotations.is_not_mapped() && !seen_columns.insert(column.to_ascii_lowercase()) {
            return Err(MappingError::DuplicateMember {
                type_name: type_name.to_owned(),
                member:    column
            });
        }
        columns.push(column);
    }

    let mapped = |idx: &usize| !members[*idx].annotations.is_not_mapped();
    let all = || (0..members.len()).filter(mapped);

    let keys = primary_keys(&table, members, all);
    let foreign_keys: Vec<usize> = all().filter(|&i| members[i].annotations.is_foreign_key()).collect();

    let mut column_mapped: Vec<usize> = all()
        .filter(|i| !keys.contains(i))
        .filter(|&i| {
            let a = members[i].annotations;
            a.is_column() || a.is_foreign_key()
        })
        .collect();
    if column_mapped.is_empty() {
        column_mapped = all()
            .filter(|i| !keys.contains(i))
            .filter(|&i| members[i].shape.is_basic() && members[i].visibility == Visibility::Public)
            .collect();
    }

    Ok(ResolvedMapping {
        table,
        schema,
        columns,
        keys,
        foreign_keys,
        column_mapped
    })
}

fn primary_keys<I>(table: &str, members: &[RawMember<'_>], all: impl Fn() -> I) -> Vec<usize>
where
    I: Iterator<Item = usize>
{
    let explicit: Vec<usize> = all().filter(|&i| members[i].annotations.is_key()).collect();
    if !explicit.is_empty() {
        return explicit;
    }
    if let Some(idx) = all().find(|&i| members[i].name.eq_ignore_ascii_case("id")) {
        return vec![idx];
    }
    let table_id = format!("{table}id");
    all()
        .find(|&i| members[i].name.eq_ignore_ascii_case(&table_id))
        .into_iter()
        .collect()
}
