// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Entity-level attribute parsing.
//!
//! # Supported Attributes
//!
//! | Attribute | Required | Default | Description |
//! |-----------|----------|---------|-------------|
//! | `table` | No | type name | Table name |
//! | `schema` | No | none | Table schema |
//! | `default` | No | `false` | Register `Default::default` as parameterless constructor |
//! | `rename_all` | No | none | Case applied to member names |

use convert_case::{Case, Casing};
use darling::{FromDeriveInput, FromMeta};
use syn::{DeriveInput, Generics, Ident};

use super::field::FieldDef;

/// Case conversion applied to every member name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    /// `full_name` → `FullName`
    Pascal,
    /// `full_name` → `fullName`
    Camel,
    /// `FullName` → `full_name`
    Snake,
    /// `full_name` → `full-name`
    Kebab
}

impl RenameRule {
    /// Apply the rule to a field name.
    #[must_use]
    pub fn apply(self, name: &str) -> String {
        let case = match self {
            Self::Pascal => Case::Pascal,
            Self::Camel => Case::Camel,
            Self::Snake => Case::Snake,
            Self::Kebab => Case::Kebab
        };
        name.to_case(case)
    }
}

impl FromMeta for RenameRule {
    fn from_string(value: &str) -> darling::Result<Self> {
        match value {
            "PascalCase" => Ok(Self::Pascal),
            "camelCase" => Ok(Self::Camel),
            "snake_case" => Ok(Self::Snake),
            "kebab-case" => Ok(Self::Kebab),
            _ => Err(darling::Error::unknown_value(value))
        }
    }
}

/// Raw `#[entity(...)]` attributes.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(entity), supports(struct_named))]
struct EntityAttrs {
    ident: Ident,

    generics: Generics,

    #[darling(default)]
    table: Option<String>,

    #[darling(default)]
    schema: Option<String>,

    #[darling(default)]
    default: bool,

    #[darling(default)]
    rename_all: Option<RenameRule>
}

/// Complete parsed entity definition.
#[derive(Debug)]
pub struct EntityDef {
    /// Struct identifier.
    pub ident: Ident,

    /// Explicit table name.
    pub table: Option<String>,

    /// Explicit schema name.
    pub schema: Option<String>,

    /// `Default::default` is the parameterless constructor.
    pub default: bool,

    /// Fields in declaration order.
    pub fields: Vec<FieldDef>
}

impl EntityDef {
    /// Parse the entity definition of a derive input.
    ///
    /// # Errors
    ///
    /// - applied to an enum, a union, a tuple or a unit struct
    /// - applied to a generic struct
    /// - empty `table` or `schema`
    /// - invalid field attributes
    pub fn from_derive_input(input: &DeriveInput) -> darling::Result<Self> {
        let attrs = EntityAttrs::from_derive_input(input)?;
        let mut errors = darling::Error::accumulator();

        if !attrs.generics.params.is_empty() {
            errors.push(
                darling::Error::custom("Entity cannot be derived for generic types").with_span(&attrs.generics)
            );
        }
        for (name, value) in [("table", &attrs.table), ("schema", &attrs.schema)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                errors.push(darling::Error::custom(format!("`{name}` must not be empty")).with_span(&attrs.ident));
            }
        }

        let fields = match &input.data {
            syn::Data::Struct(syn::DataStruct {
                fields: syn::Fields::Named(named),
                ..
            }) => named
                .named
                .iter()
                .filter_map(|field| errors.handle(FieldDef::from_field(field, attrs.rename_all)))
                .collect(),
            _ => Vec::new()
        };

        errors.finish()?;
        Ok(Self {
            ident: attrs.ident,
            table: attrs.table,
            schema: attrs.schema,
            default: attrs.default,
            fields
        })
    }

    /// Type name as the mapping reports it.
    #[must_use]
    pub fn name(&self) -> String {
        self.ident.to_string()
    }

    /// Fields taking part in the mapping.
    pub fn mapped_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.not_mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: DeriveInput) -> darling::Result<EntityDef> {
        EntityDef::from_derive_input(&input)
    }

    #[test]
    fn table_and_schema() {
        let entity = parse(syn::parse_quote! {
            #[entity(table = "people", schema = "hr", default)]
            struct Person { id: i64 }
        })
        .unwrap();
        assert_eq!(entity.table.as_deref(), Some("people"));
        assert_eq!(entity.schema.as_deref(), Some("hr"));
        assert!(entity.default);
        assert_eq!(entity.name(), "Person");
    }

    #[test]
    fn table_is_optional() {
        let entity = parse(syn::parse_quote! {
            struct Person { id: i64 }
        })
        .unwrap();
        assert!(entity.table.is_none());
        assert!(!entity.default);
    }

    #[test]
    fn generics_rejected() {
        let err = parse(syn::parse_quote! {
            struct Wrapper<T> { value: T }
        })
        .unwrap_err();
        assert!(err.to_string().contains("generic"));
    }

    #[test]
    fn empty_table_rejected() {
        assert!(
            parse(syn::parse_quote! {
                #[entity(table = " ")]
                struct Person { id: i64 }
            })
            .is_err()
        );
    }

    #[test]
    fn tuple_struct_rejected() {
        assert!(parse(syn::parse_quote! { struct Pair(i64, i64); }).is_err());
    }

    #[test]
    fn rename_rules() {
        assert_eq!(RenameRule::Pascal.apply("full_name"), "FullName");
        assert_eq!(RenameRule::Camel.apply("full_name"), "fullName");
        assert_eq!(RenameRule::Kebab.apply("full_name"), "full-name");
        assert!(RenameRule::from_string("SHOUTING").is_err());
    }

    #[test]
    fn rename_all_applies_to_members() {
        let entity = parse(syn::parse_quote! {
            #[entity(rename_all = "PascalCase")]
            struct Person { id: i64, full_name: String }
        })
        .unwrap();
        let names: Vec<_> = entity.fields.iter().map(|f| f.member.as_str()).collect();
        assert_eq!(names, ["Id", "FullName"]);
    }
}
