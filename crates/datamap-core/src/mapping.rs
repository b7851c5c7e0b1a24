// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Mapping configuration: the declarative input of descriptor construction.
//!
//! An [`EntityMapping`] lists a type's members, the annotations attached to
//! the type and to each member, the available constructors and the accessor
//! functions. It is produced either by `#[derive(Entity)]` or by hand:
//!
//! ```rust
//! use datamap_core::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Tag {
//!     id:    i64,
//!     label: String
//! }
//!
//! impl FieldType for Tag {
//!     fn shape() -> TypeShape {
//!         TypeShape::composite::<Self>()
//!     }
//!
//!     fn to_value(&self) -> Result<Value, ConversionError> {
//!         Err(ConversionError::not_scalar::<Self>())
//!     }
//!
//!     fn from_value(_: Value) -> Result<Self, ConversionError> {
//!         Err(ConversionError::not_scalar::<Self>())
//!     }
//! }
//!
//! impl Mapped for Tag {
//!     fn mapping() -> EntityMapping<Self> {
//!         EntityMapping::new("Tag")
//!             .table("tags")
//!             .member(MemberDef::of::<i64>("id", |t: &Tag| t.id.to_value(), |t: &mut Tag, v| {
//!                 t.id = i64::from_value(v)?;
//!                 Ok(())
//!             }))
//!             .member(MemberDef::of::<String>("label", |t: &Tag| t.label.to_value(), |t: &mut Tag, v| {
//!                 t.label = String::from_value(v)?;
//!                 Ok(())
//!             }))
//!             .default_constructor(Tag::default)
//!     }
//! }
//!
//! let registry = DescriptorRegistry::new();
//! let tags = registry.describe::<Tag>().unwrap();
//! assert_eq!(tags.table(), "tags");
//! assert_eq!(tags.key_names(), vec!["id"]);
//! ```

use crate::{
    error::ConversionError,
    shape::{FieldType, TypeShape},
    value::Value
};

/// A declarative decoration on a type or a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Table name of the type.
    Table(String),

    /// Schema of the type's table.
    Schema(String),

    /// Member is a column, optionally under another name.
    Column(Option<String>),

    /// Member is part of the primary key.
    Key,

    /// Member references another table.
    ForeignKey {
        /// Referenced column, if stated.
        references: Option<String>
    },

    /// Member is ignored by the mapping.
    NotMapped,

    /// Presentation metadata.
    Display {
        /// Display name.
        name:        Option<String>,
        /// Longer description.
        description: Option<String>,
        /// Grouping label.
        group:       Option<String>
    }
}

/// Discriminant of an [`Annotation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    /// [`Annotation::Table`].
    Table,
    /// [`Annotation::Schema`].
    Schema,
    /// [`Annotation::Column`].
    Column,
    /// [`Annotation::Key`].
    Key,
    /// [`Annotation::ForeignKey`].
    ForeignKey,
    /// [`Annotation::NotMapped`].
    NotMapped,
    /// [`Annotation::Display`].
    Display
}

impl Annotation {
    /// Get the kind of this annotation.
    pub const fn kind(&self) -> AnnotationKind {
        match self {
            Self::Table(_) => AnnotationKind::Table,
            Self::Schema(_) => AnnotationKind::Schema,
            Self::Column(_) => AnnotationKind::Column,
            Self::Key => AnnotationKind::Key,
            Self::ForeignKey {
                ..
            } => AnnotationKind::ForeignKey,
            Self::NotMapped => AnnotationKind::NotMapped,
            Self::Display {
                ..
            } => AnnotationKind::Display
        }
    }

    /// String parameter carried by the annotation.
    ///
    /// `"name"` is understood by every annotation that carries a name
    /// (`Table`, `Schema`, `Column`, `Display`); `ForeignKey` answers
    /// `"references"`, `Display` also answers `"description"` and `"group"`.
    pub fn param(&self, name: &str) -> Option<&str> {
        match (self, name) {
            (Self::Table(v) | Self::Schema(v), "name") => Some(v.as_str()),
            (Self::Column(v), "name") => v.as_deref(),
            (
                Self::ForeignKey {
                    references
                },
                "references"
            ) => references.as_deref(),
            (
                Self::Display {
                    name, ..
                },
                "name"
            ) => name.as_deref(),
            (
                Self::Display {
                    description, ..
                },
                "description"
            ) => description.as_deref(),
            (
                Self::Display {
                    group, ..
                },
                "group"
            ) => group.as_deref(),
            _ => None
        }
    }
}

/// Ordered set of annotations attached to one type or member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations(Vec<Annotation>);

impl Annotations {
    /// Empty set.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an annotation.
    pub fn push(&mut self, annotation: Annotation) {
        self.0.push(annotation);
    }

    /// Does the set carry an annotation of this kind?
    pub fn has(&self, kind: AnnotationKind) -> bool {
        self.find(kind).is_some()
    }

    /// First annotation of this kind.
    pub fn find(&self, kind: AnnotationKind) -> Option<&Annotation> {
        self.0.iter().find(|a| a.kind() == kind)
    }

    /// String parameter of the first annotation of this kind.
    pub fn param(&self, kind: AnnotationKind, name: &str) -> Option<&str> {
        self.find(kind).and_then(|a| a.param(name))
    }

    /// Iterate in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.0.iter()
    }

    /// Explicit table name.
    pub fn table_name(&self) -> Option<&str> {
        self.param(AnnotationKind::Table, "name")
    }

    /// Explicit schema name.
    pub fn schema_name(&self) -> Option<&str> {
        self.param(AnnotationKind::Schema, "name")
    }

    /// Explicit column name.
    pub fn column_name(&self) -> Option<&str> {
        self.param(AnnotationKind::Column, "name")
    }

    /// Referenced column of a foreign key.
    pub fn references(&self) -> Option<&str> {
        self.param(AnnotationKind::ForeignKey, "references")
    }

    /// Marked as primary key.
    pub fn is_key(&self) -> bool {
        self.has(AnnotationKind::Key)
    }

    /// Marked as foreign key.
    pub fn is_foreign_key(&self) -> bool {
        self.has(AnnotationKind::ForeignKey)
    }

    /// Marked as not mapped.
    pub fn is_not_mapped(&self) -> bool {
        self.has(AnnotationKind::NotMapped)
    }

    /// Explicitly marked as a column.
    pub fn is_column(&self) -> bool {
        self.has(AnnotationKind::Column)
    }
}

impl FromIterator<Annotation> for Annotations {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Member visibility as declared in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Public member.
    #[default]
    Public,
    /// Non-public member.
    Private
}

/// Storage kind of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberKind {
    /// Plain field, always readable and writable.
    #[default]
    Field,
    /// Computed property, writable only when it has a setter.
    Property
}

/// Typed member getter.
pub type GetFn<T> = fn(&T) -> Result<Value, ConversionError>;

/// Typed member setter.
pub type SetFn<T> = fn(&mut T, Value) -> Result<(), ConversionError>;

/// One member of a mapped type.
pub struct MemberDef<T> {
    /// Member name.
    pub name:        String,
    /// Declared type.
    pub shape:       TypeShape,
    /// Member annotations.
    pub annotations: Annotations,
    /// Declared visibility.
    pub visibility:  Visibility,
    /// Field or property.
    pub kind:        MemberKind,
    /// Fast getter.
    pub get:         Option<GetFn<T>>,
    /// Fast setter.
    pub set:         Option<SetFn<T>>
}

impl<T> MemberDef<T> {
    /// Readable and writable field.
    pub fn field(name: impl Into<String>, shape: TypeShape, get: GetFn<T>, set: SetFn<T>) -> Self {
        Self {
            name: name.into(),
            shape,
            annotations: Annotations::new(),
            visibility: Visibility::Public,
            kind: MemberKind::Field,
            get: Some(get),
            set: Some(set)
        }
    }

    /// Field of type `F`.
    pub fn of<F: FieldType>(name: impl Into<String>, get: GetFn<T>, set: SetFn<T>) -> Self {
        Self::field(name, F::shape(), get, set)
    }

    /// Read-only computed property.
    pub fn property(name: impl Into<String>, shape: TypeShape, get: GetFn<T>) -> Self {
        Self {
            name: name.into(),
            shape,
            annotations: Annotations::new(),
            visibility: Visibility::Public,
            kind: MemberKind::Property,
            get: Some(get),
            set: None
        }
    }

    /// Field without typed accessors; reached through the type's
    /// [`DynamicAccess`].
    pub fn dynamic(name: impl Into<String>, shape: TypeShape) -> Self {
        Self {
            name: name.into(),
            shape,
            annotations: Annotations::new(),
            visibility: Visibility::Public,
            kind: MemberKind::Field,
            get: None,
            set: None
        }
    }

    /// Attach an annotation.
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Mark as primary key.
    pub fn key(self) -> Self {
        self.annotate(Annotation::Key)
    }

    /// Mark as column, optionally renamed.
    pub fn column(self, name: Option<&str>) -> Self {
        self.annotate(Annotation::Column(name.map(str::to_owned)))
    }

    /// Mark as foreign key.
    pub fn foreign_key(self, references: Option<&str>) -> Self {
        self.annotate(Annotation::ForeignKey {
            references: references.map(str::to_owned)
        })
    }

    /// Exclude from the mapping.
    pub fn not_mapped(self) -> Self {
        self.annotate(Annotation::NotMapped)
    }

    /// Declare as non-public.
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }
}

/// Named constructor parameter.
#[derive(Debug, Clone)]
pub struct ParamDef {
    /// Parameter name, matched against column names.
    pub name:  String,
    /// Parameter type.
    pub shape: TypeShape
}

impl ParamDef {
    /// Parameter of type `F`.
    pub fn of<F: FieldType>(name: impl Into<String>) -> Self {
        Self {
            name:  name.into(),
            shape: F::shape()
        }
    }
}

/// Builds an instance from parameter values in declaration order.
pub type BuildFn<T> = fn(Vec<Value>) -> Result<T, ConversionError>;

/// A constructor of a mapped type.
pub struct ConstructorDef<T> {
    /// Parameters in declaration order.
    pub params: Vec<ParamDef>,
    /// Construction function.
    pub build:  BuildFn<T>
}

impl<T> ConstructorDef<T> {
    /// Constructor over the given parameters.
    pub const fn new(params: Vec<ParamDef>, build: BuildFn<T>) -> Self {
        Self {
            params,
            build
        }
    }
}

/// Name-dispatched member access, the slow accessor tier.
///
/// Both functions return `None` for names they do not know.
pub struct DynamicAccess<T> {
    /// Read a member by name.
    pub get: fn(&T, &str) -> Option<Result<Value, ConversionError>>,
    /// Write a member by name.
    pub set: fn(&mut T, &str, Value) -> Option<Result<(), ConversionError>>
}

impl<T> Clone for DynamicAccess<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DynamicAccess<T> {}

/// Complete mapping configuration of one type.
pub struct EntityMapping<T> {
    /// Declared type name.
    pub name:         String,
    /// Type-level annotations.
    pub annotations:  Annotations,
    /// Members in declaration order.
    pub members:      Vec<MemberDef<T>>,
    /// Available constructors.
    pub constructors: Vec<ConstructorDef<T>>,
    /// Parameterless constructor.
    pub default:      Option<fn() -> T>,
    /// Slow accessor tier.
    pub dynamic:      Option<DynamicAccess<T>>
}

impl<T> EntityMapping<T> {
    /// Start a mapping for the type named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name:         name.into(),
            annotations:  Annotations::new(),
            members:      Vec::new(),
            constructors: Vec::new(),
            default:      None,
            dynamic:      None
        }
    }

    /// Attach a type-level annotation.
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Set the table name.
    pub fn table(self, name: impl Into<String>) -> Self {
        self.annotate(Annotation::Table(name.into()))
    }

    /// Set the schema name.
    pub fn schema(self, name: impl Into<String>) -> Self {
        self.annotate(Annotation::Schema(name.into()))
    }

    /// Append a member.
    pub fn member(mut self, member: MemberDef<T>) -> Self {
        self.members.push(member);
        self
    }

    /// Append a constructor.
    pub fn constructor(mut self, constructor: ConstructorDef<T>) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Set the parameterless constructor.
    pub fn default_constructor(mut self, build: fn() -> T) -> Self {
        self.default = Some(build);
        self
    }

    /// Set the name-dispatched accessor tier.
    pub fn dynamic(mut self, access: DynamicAccess<T>) -> Self {
        self.dynamic = Some(access);
        self
    }
}

/// A type with a mapping configuration.
///
/// Implemented by `#[derive(Entity)]`.
pub trait Mapped: FieldType + Send + Sync {
    /// Mapping configuration of the type.
    fn mapping() -> EntityMapping<Self>;
}
