// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! `FieldType` implementation generation.
//!
//! Entities are composites: their shape points back at their mapping, and
//! they have no single-value form.

use proc_macro2::TokenStream;
use quote::quote;

use super::parse::EntityDef;

/// Generate the `FieldType` implementation.
pub fn generate(entity: &EntityDef) -> TokenStream {
    let ident = &entity.ident;

    quote! {
        #[automatically_derived]
        impl ::datamap::FieldType for #ident {
            fn shape() -> ::datamap::TypeShape {
                ::datamap::TypeShape::composite::<Self>()
            }

            fn to_value(&self) -> ::core::result::Result<::datamap::Value, ::datamap::ConversionError> {
                ::core::result::Result::Err(::datamap::ConversionError::not_scalar::<Self>())
            }

            fn from_value(_: ::datamap::Value) -> ::core::result::Result<Self, ::datamap::ConversionError> {
                ::core::result::Result::Err(::datamap::ConversionError::not_scalar::<Self>())
            }
        }
    }
}
