// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Attribute parsing for the Entity derive macro.
//!
//! Entity-level attributes (`#[entity(...)]`) are parsed with darling's
//! `FromDeriveInput`. Field-level attributes are marker-style (`#[key]`,
//! `#[not_mapped]`) or short argument lists (`#[column(name = "...")]`), so
//! they are walked by hand and only their argument lists go through darling.
//!
//! # Data Structures
//!
//! ```text
//! EntityDef
//! ├── ident: Ident              (struct name, e.g. "Person")
//! ├── table: Option<String>     (#[entity(table)], type name when absent)
//! ├── schema: Option<String>    (#[entity(schema)])
//! ├── default: bool             (#[entity(default)], uses Default::default)
//! └── fields: Vec<FieldDef>
//!     └── FieldDef
//!         ├── ident / ty / public
//!         ├── member: String    (member name after rename_all)
//!         ├── key: bool         (#[key] or #[id])
//!         ├── column: Option<ColumnArgs>
//!         ├── foreign_key: Option<ForeignKeyArgs>
//!         ├── not_mapped: bool
//!         └── display: Option<DisplayArgs>
//! ```

mod entity;
mod field;

pub use entity::{EntityDef, RenameRule};
pub use field::{ColumnArgs, DisplayArgs, FieldDef, ForeignKeyArgs};
