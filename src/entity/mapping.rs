// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! `Mapped` and `BindSource` implementation generation.
//!
//! # Generated Code
//!
//! ```rust,ignore
//! impl ::datamap::Mapped for Person {
//!     fn mapping() -> ::datamap::EntityMapping<Self> {
//!         ::datamap::EntityMapping::new("Person")
//!             .table("people")
//!             .member(::datamap::MemberDef::of::<i64>("id", get, set).key())
//!             .member(::datamap::MemberDef::of::<String>("name", get, set))
//!             .constructor(::datamap::ConstructorDef::new(params, build))
//!             .default_constructor(<Self as Default>::default)
//!     }
//! }
//!
//! impl ::datamap::BindSource for Person {
//!     fn bind_with(&self, binder: &::datamap::ParameterBinder<'_>) -> Result<Params, BindingError> {
//!         binder.bind_object(self)
//!     }
//! }
//! ```
//!
//! Mapped fields get typed accessors. `#[not_mapped]` fields are declared as
//! opaque members without accessors, so their types need no `FieldType`
//! implementation, only `Default` for the generated constructor.

use proc_macro2::TokenStream;
use quote::quote;

use super::parse::{EntityDef, FieldDef};

/// Generate the `Mapped` and `BindSource` implementations.
pub fn generate(entity: &EntityDef) -> TokenStream {
    let ident = &entity.ident;
    let name = entity.name();

    let table = entity.table.as_ref().map(|t| quote! { .table(#t) });
    let schema = entity.schema.as_ref().map(|s| quote! { .schema(#s) });
    let members = entity.fields.iter().map(member);
    let constructor = constructor(entity);
    let default = entity
        .default
        .then(|| quote! { .default_constructor(<Self as ::core::default::Default>::default) });

    quote! {
        #[automatically_derived]
        impl ::datamap::Mapped for #ident {
            fn mapping() -> ::datamap::EntityMapping<Self> {
                ::datamap::EntityMapping::new(#name)
                    #table
                    #schema
                    #(.member(#members))*
                    .constructor(#constructor)
                    #default
            }
        }

        #[automatically_derived]
        impl ::datamap::BindSource for #ident {
            fn bind_with(
                &self,
                binder: &::datamap::ParameterBinder<'_>
            ) -> ::core::result::Result<::datamap::Params, ::datamap::BindingError> {
                binder.bind_object(self)
            }
        }
    }
}

fn member(field: &FieldDef) -> TokenStream {
    let ident = &field.ident;
    let ty = &field.ty;
    let name = &field.member;

    let base = if field.not_mapped {
        quote! {
            ::datamap::MemberDef::<Self>::dynamic(#name, ::datamap::TypeShape::opaque::<#ty>()).not_mapped()
        }
    } else {
        quote! {
            ::datamap::MemberDef::<Self>::of::<#ty>(
                #name,
                |this: &Self| ::datamap::FieldType::to_value(&this.#ident),
                |this: &mut Self, value: ::datamap::Value| {
                    this.#ident = <#ty as ::datamap::FieldType>::from_value(value)?;
                    ::core::result::Result::Ok(())
                }
            )
        }
    };

    let key = field.key.then(|| quote! { .key() });
    let column = field.column.as_ref().map(|c| match &c.name {
        Some(n) => quote! { .column(::core::option::Option::Some(#n)) },
        None => quote! { .column(::core::option::Option::None) }
    });
    let foreign_key = field.foreign_key.as_ref().map(|fk| match &fk.references {
        Some(r) => quote! { .foreign_key(::core::option::Option::Some(#r)) },
        None => quote! { .foreign_key(::core::option::Option::None) }
    });
    let display = field.display.as_ref().map(|d| {
        let name = option_string(d.name.as_deref());
        let description = option_string(d.description.as_deref());
        let group = option_string(d.group.as_deref());
        quote! {
            .annotate(::datamap::Annotation::Display {
                name: #name,
                description: #description,
                group: #group
            })
        }
    });
    let private = (!field.public).then(|| quote! { .private() });

    quote! { #base #key #column #foreign_key #display #private }
}

fn option_string(value: Option<&str>) -> TokenStream {
    match value {
        Some(v) => quote! { ::core::option::Option::Some(::std::string::String::from(#v)) },
        None => quote! { ::core::option::Option::None }
    }
}

/// Constructor over every mapped field, in declaration order.
fn constructor(entity: &EntityDef) -> TokenStream {
    let params = entity.mapped_fields().map(|f| {
        let ty = &f.ty;
        let name = &f.member;
        quote! { ::datamap::ParamDef::of::<#ty>(#name) }
    });
    let inits = entity.fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        if f.not_mapped {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            quote! {
                #ident: <#ty as ::datamap::FieldType>::from_value(args.next().unwrap_or_default())?
            }
        }
    });

    quote! {
        ::datamap::ConstructorDef::new(
            ::std::vec![#(#params),*],
            |values: ::std::vec::Vec<::datamap::Value>| {
                #[allow(unused_mut, unused_variables)]
                let mut args = values.into_iter();
                ::core::result::Result::Ok(Self { #(#inits),* })
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(input: syn::DeriveInput) -> String {
        generate(&EntityDef::from_derive_input(&input).unwrap()).to_string()
    }

    #[test]
    fn members_in_declaration_order() {
        let code = expand(syn::parse_quote! {
            #[entity(table = "people")]
            pub struct Person {
                #[key]
                pub id: i64,
                pub name: String
            }
        });
        assert!(code.contains(". table (\"people\")"));
        let id = code.find("\"id\"").unwrap();
        let name = code.find("\"name\"").unwrap();
        assert!(id < name);
        assert!(code.contains(". key ()"));
        assert!(!code.contains("default_constructor"));
        assert!(code.contains("impl :: datamap :: BindSource for Person"));
    }

    #[test]
    fn private_and_not_mapped_fields() {
        let code = expand(syn::parse_quote! {
            #[entity(default)]
            pub struct Cache {
                pub id: i64,
                hits: u32,
                #[not_mapped]
                pub scratch: Vec<u8>
            }
        });
        assert!(code.contains(". private ()"));
        assert!(code.contains(". not_mapped ()"));
        assert!(code.contains("opaque :: < Vec < u8 > >"));
        assert!(code.contains("default_constructor"));
    }

    #[test]
    fn column_and_foreign_key_annotations() {
        let code = expand(syn::parse_quote! {
            pub struct Member {
                #[column(name = "full_name")]
                pub name: String,
                #[foreign_key(references = "teams")]
                pub team_id: i64
            }
        });
        assert!(code.contains("Some (\"full_name\")"));
        assert!(code.contains(". foreign_key"));
        assert!(code.contains("Some (\"teams\")"));
    }
}
