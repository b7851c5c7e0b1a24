// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Field-level attribute parsing.
//!
//! | Attribute | Effect |
//! |-----------|--------|
//! | `#[key]`, `#[id]` | Primary key member |
//! | `#[column]`, `#[column(name = "...")]` | Explicit column, optionally renamed |
//! | `#[foreign_key]`, `#[foreign_key(references = "...")]` | References another table |
//! | `#[not_mapped]` | Ignored by the mapping; filled with `Default::default` on construction |
//! | `#[display(name, description, group)]` | Presentation metadata |

use darling::FromMeta;
use syn::{Attribute, Field, Ident, Meta, Type, Visibility};

use super::entity::RenameRule;

/// Arguments of `#[column(...)]`.
#[derive(Debug, Clone, Default, FromMeta)]
pub struct ColumnArgs {
    /// Column name override.
    #[darling(default)]
    pub name: Option<String>
}

/// Arguments of `#[foreign_key(...)]`.
#[derive(Debug, Clone, Default, FromMeta)]
pub struct ForeignKeyArgs {
    /// Referenced table or column.
    #[darling(default)]
    pub references: Option<String>
}

/// Arguments of `#[display(...)]`.
#[derive(Debug, Clone, Default, FromMeta)]
pub struct DisplayArgs {
    /// Display name.
    #[darling(default)]
    pub name: Option<String>,

    /// Longer description.
    #[darling(default)]
    pub description: Option<String>,

    /// Grouping label.
    #[darling(default)]
    pub group: Option<String>
}

/// Parse optional argument lists: a bare `#[attr]` yields the defaults.
fn args<T: FromMeta + Default>(attr: &Attribute) -> darling::Result<T> {
    match &attr.meta {
        Meta::Path(_) => Ok(T::default()),
        meta => T::from_meta(meta)
    }
}

/// Reject arguments on marker attributes.
fn marker(attr: &Attribute) -> darling::Result<()> {
    match &attr.meta {
        Meta::Path(_) => Ok(()),
        meta => Err(darling::Error::custom("attribute takes no arguments").with_span(meta))
    }
}

/// One struct field with its mapping attributes.
#[derive(Debug)]
pub struct FieldDef {
    /// Field identifier.
    pub ident: Ident,

    /// Field type.
    pub ty: Type,

    /// Declared `pub`.
    pub public: bool,

    /// Member name, after `rename_all`.
    pub member: String,

    /// `#[key]` or `#[id]`.
    pub key: bool,

    /// `#[column(...)]`.
    pub column: Option<ColumnArgs>,

    /// `#[foreign_key(...)]`.
    pub foreign_key: Option<ForeignKeyArgs>,

    /// `#[not_mapped]`.
    pub not_mapped: bool,

    /// `#[display(...)]`.
    pub display: Option<DisplayArgs>
}

impl FieldDef {
    /// Parse a named field.
    ///
    /// # Errors
    ///
    /// - unnamed field
    /// - arguments on a marker attribute or unknown arguments
    /// - `#[not_mapped]` combined with another mapping attribute
    pub fn from_field(field: &Field, rename: Option<RenameRule>) -> darling::Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| darling::Error::custom("Entity fields must be named").with_span(field))?;
        let raw = ident.to_string();
        let raw = raw.strip_prefix("r#").unwrap_or(&raw);
        let member = rename.map_or_else(|| raw.to_owned(), |rule| rule.apply(raw));

        let mut def = Self {
            ident,
            ty: field.ty.clone(),
            public: matches!(field.vis, Visibility::Public(_)),
            member,
            key: false,
            column: None,
            foreign_key: None,
            not_mapped: false,
            display: None
        };

        let mut errors = darling::Error::accumulator();
        for attr in &field.attrs {
            let path = attr.path();
            if path.is_ident("key") || path.is_ident("id") {
                def.key = errors.handle(marker(attr)).is_some() || def.key;
            } else if path.is_ident("column") {
                def.column = errors.handle(args(attr));
            } else if path.is_ident("foreign_key") {
                def.foreign_key = errors.handle(args(attr));
            } else if path.is_ident("not_mapped") {
                def.not_mapped = errors.handle(marker(attr)).is_some() || def.not_mapped;
            } else if path.is_ident("display") {
                def.display = errors.handle(args(attr));
            }
        }

        if def.not_mapped && (def.key || def.column.is_some() || def.foreign_key.is_some()) {
            errors.push(
                darling::Error::custom("`#[not_mapped]` cannot be combined with key, column or foreign key")
                    .with_span(&def.ident)
            );
        }
        if def.column.as_ref().and_then(|c| c.name.as_deref()).is_some_and(|n| n.trim().is_empty()) {
            errors.push(darling::Error::custom("column name must not be empty").with_span(&def.ident));
        }

        errors.finish_with(def)
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    fn field(field: Field) -> darling::Result<FieldDef> {
        FieldDef::from_field(&field, None)
    }

    fn named(tokens: syn::FieldsNamed) -> Field {
        tokens.named.into_iter().next().unwrap()
    }

    #[test]
    fn plain_field() {
        let def = field(named(parse_quote!({ pub name: String }))).unwrap();
        assert_eq!(def.member, "name");
        assert!(def.public);
        assert!(!def.key && !def.not_mapped);
        assert!(def.column.is_none());
    }

    #[test]
    fn key_aliases() {
        assert!(field(named(parse_quote!({ #[key] id: i64 }))).unwrap().key);
        assert!(field(named(parse_quote!({ #[id] id: i64 }))).unwrap().key);
    }

    #[test]
    fn column_with_and_without_name() {
        let bare = field(named(parse_quote!({ #[column] age: i32 }))).unwrap();
        assert!(bare.column.unwrap().name.is_none());
        let renamed = field(named(parse_quote!({ #[column(name = "full_name")] name: String }))).unwrap();
        assert_eq!(renamed.column.unwrap().name.as_deref(), Some("full_name"));
    }

    #[test]
    fn foreign_key_and_display() {
        let def = field(named(parse_quote!({
            #[foreign_key(references = "teams")]
            #[display(name = "Team", group = "Membership")]
            team_id: i64
        })))
        .unwrap();
        assert_eq!(def.foreign_key.unwrap().references.as_deref(), Some("teams"));
        let display = def.display.unwrap();
        assert_eq!(display.name.as_deref(), Some("Team"));
        assert!(display.description.is_none());
    }

    #[test]
    fn raw_identifiers_lose_prefix() {
        let def = field(named(parse_quote!({ r#type: String }))).unwrap();
        assert_eq!(def.member, "type");
    }

    #[test]
    fn not_mapped_conflicts() {
        assert!(field(named(parse_quote!({ #[not_mapped] #[key] id: i64 }))).is_err());
        assert!(field(named(parse_quote!({ #[not_mapped] cache: Vec<u8> }))).unwrap().not_mapped);
    }

    #[test]
    fn marker_arguments_rejected() {
        assert!(field(named(parse_quote!({ #[key(auto)] id: i64 }))).is_err());
        assert!(field(named(parse_quote!({ #[column(size = 3)] id: i64 }))).is_err());
    }
}
