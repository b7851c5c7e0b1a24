// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! # datamap-derive
//!
//! `#[derive(Entity)]` turns struct decorations into a datamap mapping
//! configuration. Use it through the `datamap` crate, which re-exports it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datamap::Entity;
//!
//! #[derive(Entity)]
//! #[entity(table = "people", default)]
//! #[derive(Default)]
//! pub struct Person {
//!     #[key]
//!     pub id: i64,
//!
//!     #[column(name = "full_name")]
//!     pub name: String,
//!
//!     #[column]
//!     pub age: i32,
//!
//!     #[not_mapped]
//!     pub scratch: Vec<u8>,
//! }
//! ```
//!
//! Generates `impl FieldType`, `impl Mapped` and `impl BindSource` for `Person`.
//!
//! # Attribute Quick Reference
//!
//! ## Entity-Level `#[entity(...)]`
//!
//! | Attribute | Default | Effect |
//! |-----------|---------|--------|
//! | `table = "..."` | type name | Table name |
//! | `schema = "..."` | none | Table schema |
//! | `default` | off | `Default::default` becomes the parameterless constructor |
//! | `rename_all = "..."` | none | `PascalCase`, `camelCase`, `snake_case` or `kebab-case` member names |
//!
//! ## Field-Level
//!
//! | Attribute | Effect |
//! |-----------|--------|
//! | `#[key]`, `#[id]` | Primary key |
//! | `#[column]`, `#[column(name = "...")]` | Explicit column |
//! | `#[foreign_key(references = "...")]` | Foreign key |
//! | `#[not_mapped]` | Ignored; the field type needs only `Default` |
//! | `#[display(name = "...", description = "...", group = "...")]` | Presentation metadata |
//!
//! Without any `#[column]` or `#[foreign_key]`, every public scalar field
//! that is not a key is stored. Private fields are mapped but not stored
//! unless annotated.
//!
//! Generic structs, enums, tuple and unit structs are rejected.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

mod entity;

use proc_macro::TokenStream;

/// Derive `FieldType`, `Mapped` and `BindSource` for a struct with named fields.
///
/// See the [crate documentation](crate) for the supported attributes.
#[proc_macro_derive(Entity, attributes(entity, key, id, column, foreign_key, not_mapped, display))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive(input)
}
