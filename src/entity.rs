// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Entity derive macro implementation.
//!
//! # Architecture
//!
//! ```text
//! entity.rs (orchestrator)
//! │
//! ├── parse/          → Attribute parsing (EntityDef, FieldDef)
//! ├── field_type.rs   → impl FieldType (composite shape)
//! └── mapping.rs      → impl Mapped (members, constructor, annotations) and BindSource
//! ```

mod field_type;
mod mapping;
pub mod parse;

use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

use self::parse::EntityDef;

/// Main entry point for the Entity derive macro.
pub fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match EntityDef::from_derive_input(&input) {
        Ok(entity) => generate(&entity).into(),
        Err(err) => err.write_errors().into()
    }
}

fn generate(entity: &EntityDef) -> proc_macro2::TokenStream {
    let field_type = field_type::generate(entity);
    let mapping = mapping::generate(entity);

    quote! {
        #field_type
        #mapping
    }
}
