// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Type identity, classification and scalar conversion.
//!
//! Every type that can appear as a member of a mapped entity implements
//! [`FieldType`]. The trait gives the registry a [`TypeShape`] to classify the
//! member with (scalar, collection, dictionary, tuple, composite) and gives
//! accessors a way to move the member in and out of a [`Value`].
//!
//! # Classification
//!
//! | Kind | Rust types | `is_basic` |
//! |------|------------|------------|
//! | `Bool` | `bool` | yes |
//! | `Integer` | `i8`..`i64`, `u8`..`u64`, `usize`, `isize` | yes |
//! | `Float` | `f32`, `f64` | yes |
//! | `Text` | `String`, `char`, `Uuid`, chrono dates | yes |
//! | `Bytes` | [`Blob`] | yes |
//! | `Enum` | user enums via [`TypeShape::enumeration`] | yes |
//! | `Collection` | `Vec<T>` | no |
//! | `Dictionary` | `HashMap<K, V>`, `BTreeMap<K, V>` | no |
//! | `Tuple` | `(A, B)`, `(A, B, C)` | no |
//! | `Composite` | `#[derive(Entity)]` types | no |
//!
//! `Option<T>` takes the shape of `T` with the nullable flag set.

use std::{
    any::{TypeId, type_name},
    collections::{BTreeMap, HashMap},
    fmt,
    hash::{Hash, Hasher},
    sync::Arc
};

use crate::{
    descriptor::TypeDescriptor,
    error::{ConversionError, MappingError},
    mapping::Mapped,
    registry::{RegistryExt, TypeRegistry},
    value::Value
};

/// Identity of a runtime type.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id:   TypeId,
    name: &'static str
}

impl TypeKey {
    /// Key of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id:   TypeId::of::<T>(),
            name: type_name::<T>()
        }
    }

    /// Key for a runtime [`TypeId`] whose name is unknown.
    pub const fn from_id(id: TypeId) -> Self {
        Self {
            id,
            name: "<unknown>"
        }
    }

    /// Underlying type id.
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Full Rust type name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Structural classification of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// `bool`.
    Bool,
    /// Any integer width.
    Integer,
    /// `f32` / `f64`.
    Float,
    /// Text-like scalars.
    Text,
    /// Raw bytes.
    Bytes,
    /// User enum stored as a scalar.
    Enum,
    /// Sequence of elements.
    Collection,
    /// Key/value map.
    Dictionary,
    /// Fixed-arity tuple.
    Tuple,
    /// Mapped entity with its own descriptor.
    Composite,
    /// Type the mapping layer does not look into.
    Opaque
}

/// Resolves the descriptor of a composite shape through a registry.
pub type DescribeFn = fn(&dyn TypeRegistry) -> Result<Arc<TypeDescriptor>, MappingError>;

/// Static description of a type, produced by [`FieldType::shape`].
#[derive(Debug, Clone, Copy)]
pub struct TypeShape {
    /// Declared name.
    pub name:     &'static str,
    /// Identity of the exact type.
    pub key:      TypeKey,
    /// Identity of the underlying type (`T` for `Option<T>`).
    pub base:     TypeKey,
    /// Classification.
    pub kind:     ShapeKind,
    /// Whether the member accepts `NULL`.
    pub nullable: bool,
    /// Element shape of collections, value shape of dictionaries.
    pub element:  Option<fn() -> TypeShape>,
    /// Key shape of dictionaries.
    pub key_of:   Option<fn() -> TypeShape>,
    /// Item shapes of tuples.
    pub items:    Option<fn() -> Vec<TypeShape>>,
    /// Descriptor resolution for composites.
    pub describe: Option<DescribeFn>
}

impl TypeShape {
    const fn bare(name: &'static str, key: TypeKey, kind: ShapeKind) -> Self {
        Self {
            name,
            key,
            base: key,
            kind,
            nullable: false,
            element: None,
            key_of: None,
            items: None,
            describe: None
        }
    }

    /// Scalar shape of `T`.
    pub fn scalar<T: 'static>(name: &'static str, kind: ShapeKind) -> Self {
        Self::bare(name, TypeKey::of::<T>(), kind)
    }

    /// Shape of a user enum stored as a single value.
    pub fn enumeration<T: 'static>() -> Self {
        Self::bare(short_name(type_name::<T>()), TypeKey::of::<T>(), ShapeKind::Enum)
    }

    /// Shape of a type the mapping layer treats as a black box.
    pub fn opaque<T: ?Sized + 'static>() -> Self {
        Self::bare(short_name(type_name::<T>()), TypeKey::of::<T>(), ShapeKind::Opaque)
    }

    /// Shape of a mapped entity.
    pub fn composite<T: Mapped>() -> Self {
        Self {
            describe: Some(describe_mapped::<T>),
            ..Self::bare(short_name(type_name::<T>()), TypeKey::of::<T>(), ShapeKind::Composite)
        }
    }

    /// Shape of a sequence `C` of `E`.
    pub fn collection<C: 'static, E: FieldType>() -> Self {
        Self {
            element: Some(E::shape),
            ..Self::bare(short_name(type_name::<C>()), TypeKey::of::<C>(), ShapeKind::Collection)
        }
    }

    /// Shape of a map `M` from `K` to `V`.
    pub fn dictionary<M: 'static, K: FieldType, V: FieldType>() -> Self {
        Self {
            element: Some(V::shape),
            key_of: Some(K::shape),
            ..Self::bare(short_name(type_name::<M>()), TypeKey::of::<M>(), ShapeKind::Dictionary)
        }
    }

    /// Shape of a tuple `T` with the given item shapes.
    pub fn tuple<T: 'static>(items: fn() -> Vec<TypeShape>) -> Self {
        Self {
            items: Some(items),
            ..Self::bare(short_name(type_name::<T>()), TypeKey::of::<T>(), ShapeKind::Tuple)
        }
    }

    /// Same shape with the nullable flag set.
    pub const fn into_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Scalar or enum.
    pub const fn is_basic(&self) -> bool {
        matches!(
            self.kind,
            ShapeKind::Bool
                | ShapeKind::Integer
                | ShapeKind::Float
                | ShapeKind::Text
                | ShapeKind::Bytes
                | ShapeKind::Enum
        )
    }

    /// Sequence type.
    pub const fn is_collection(&self) -> bool {
        matches!(self.kind, ShapeKind::Collection)
    }

    /// Map type.
    pub const fn is_dictionary(&self) -> bool {
        matches!(self.kind, ShapeKind::Dictionary)
    }

    /// Tuple type.
    pub const fn is_tuple(&self) -> bool {
        matches!(self.kind, ShapeKind::Tuple)
    }

    /// Accepts `NULL`.
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Integer or float.
    pub const fn is_numeric(&self) -> bool {
        matches!(self.kind, ShapeKind::Integer | ShapeKind::Float)
    }

    /// Boolean.
    pub const fn is_boolean(&self) -> bool {
        matches!(self.kind, ShapeKind::Bool)
    }

    /// Floating point.
    pub const fn is_float(&self) -> bool {
        matches!(self.kind, ShapeKind::Float)
    }

    /// User enum.
    pub const fn is_enum(&self) -> bool {
        matches!(self.kind, ShapeKind::Enum)
    }

    /// Mapped entity.
    pub const fn is_composite(&self) -> bool {
        matches!(self.kind, ShapeKind::Composite)
    }

    /// Shapes reachable one level down: collection elements, dictionary keys
    /// and values, tuple items.
    pub fn children(&self) -> Vec<TypeShape> {
        let mut out = Vec::new();
        if let Some(key) = self.key_of {
            out.push(key());
        }
        if let Some(element) = self.element {
            out.push(element());
        }
        if let Some(items) = self.items {
            out.extend(items());
        }
        out
    }
}

fn describe_mapped<T: Mapped>(registry: &dyn TypeRegistry) -> Result<Arc<TypeDescriptor>, MappingError> {
    registry.describe::<T>()
}

/// Last path segment of a type name, generics included.
pub(crate) fn short_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full
    }
}

/// A type that can be a member of a mapped entity.
///
/// Scalars convert to and from [`Value`]; structured types (collections,
/// dictionaries, tuples, composites) reject conversion with
/// [`ConversionError::NotScalar`], except that `NULL` decodes into an empty
/// collection or map.
///
/// `NULL` decodes into the zero value of non-nullable scalars.
///
/// # Example
///
/// ```rust
/// use datamap_core::{ConversionError, FieldType, TypeShape, Value};
///
/// #[derive(Debug, PartialEq)]
/// enum Status { Active, Banned }
///
/// impl FieldType for Status {
///     fn shape() -> TypeShape {
///         TypeShape::enumeration::<Self>()
///     }
///
///     fn to_value(&self) -> Result<Value, ConversionError> {
///         Ok(Value::from(match self {
///             Self::Active => "active",
///             Self::Banned => "banned"
///         }))
///     }
///
///     fn from_value(value: Value) -> Result<Self, ConversionError> {
///         match value.as_str() {
///             Some("active") => Ok(Self::Active),
///             Some("banned") => Ok(Self::Banned),
///             _ => Err(ConversionError::incompatible::<Self>(&value))
///         }
///     }
/// }
///
/// assert!(Status::shape().is_enum());
/// assert_eq!(Status::from_value(Value::from("banned")), Ok(Status::Banned));
/// ```
pub trait FieldType: Sized + 'static {
    /// Static shape of the type.
    fn shape() -> TypeShape;

    /// Convert into a cell value.
    fn to_value(&self) -> Result<Value, ConversionError>;

    /// Convert from a cell value.
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

macro_rules! integer_field {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            fn shape() -> TypeShape {
                TypeShape::scalar::<$ty>(stringify!($ty), ShapeKind::Integer)
            }

            fn to_value(&self) -> Result<Value, ConversionError> {
                i64::try_from(*self)
                    .map(Value::Int)
                    .map_err(|_| ConversionError::out_of_range::<$ty>(self))
            }

            fn from_value(value: Value) -> Result<Self, ConversionError> {
                match value {
                    Value::Null => Ok(0),
                    Value::Text(ref text) => text
                        .trim()
                        .parse::<$ty>()
                        .map_err(|_| ConversionError::parse::<$ty>(text.as_str())),
                    other => {
                        let wide = other
                            .as_i64()
                            .ok_or_else(|| ConversionError::incompatible::<$ty>(&other))?;
                        <$ty>::try_from(wide).map_err(|_| ConversionError::out_of_range::<$ty>(wide))
                    }
                }
            }
        }
    )*};
}

integer_field!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_field {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            fn shape() -> TypeShape {
                TypeShape::scalar::<$ty>(stringify!($ty), ShapeKind::Float)
            }

            fn to_value(&self) -> Result<Value, ConversionError> {
                Ok(Value::Float(f64::from(*self)))
            }

            #[allow(clippy::cast_possible_truncation)]
            fn from_value(value: Value) -> Result<Self, ConversionError> {
                match value {
                    Value::Null => Ok(0.0),
                    Value::Text(ref text) => text
                        .trim()
                        .parse::<$ty>()
                        .map_err(|_| ConversionError::parse::<$ty>(text.as_str())),
                    other => other
                        .as_f64()
                        .map(|f| f as $ty)
                        .ok_or_else(|| ConversionError::incompatible::<$ty>(&other))
                }
            }
        }
    )*};
}

float_field!(f32, f64);

impl FieldType for bool {
    fn shape() -> TypeShape {
        TypeShape::scalar::<bool>("bool", ShapeKind::Bool)
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(false),
            Value::Text(ref text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" | "" => Ok(false),
                _ => Err(ConversionError::parse::<bool>(text.as_str()))
            },
            other => other.as_bool().ok_or_else(|| ConversionError::incompatible::<bool>(&other))
        }
    }
}

impl FieldType for String {
    fn shape() -> TypeShape {
        TypeShape::scalar::<String>("String", ShapeKind::Text)
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(Value::Text(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(text) => Ok(text),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int(v) => Ok(v.to_string()),
            Value::Float(v) => Ok(v.to_string()),
            Value::Bytes(bytes) => {
                String::from_utf8(bytes).map_err(|_| ConversionError::Incompatible {
                    target: "String",
                    found:  "bytes"
                })
            }
        }
    }
}

impl FieldType for char {
    fn shape() -> TypeShape {
        TypeShape::scalar::<char>("char", ShapeKind::Text)
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(Value::Text(self.to_string()))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok('\0'),
            Value::Text(ref text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(ConversionError::parse::<char>(text.as_str()))
                }
            }
            other => Err(ConversionError::incompatible::<char>(&other))
        }
    }
}

/// Binary payload stored as a single `BLOB` cell.
///
/// `Vec<u8>` is a collection of integers; wrap it in `Blob` to store it as
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Blob(pub Vec<u8>);

impl From<Vec<u8>> for Blob {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl FieldType for Blob {
    fn shape() -> TypeShape {
        TypeShape::scalar::<Blob>("Blob", ShapeKind::Bytes)
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(Value::Bytes(self.0.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Bytes(bytes) => Ok(Self(bytes)),
            Value::Text(text) => Ok(Self(text.into_bytes())),
            other => Err(ConversionError::incompatible::<Blob>(&other))
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn shape() -> TypeShape {
        TypeShape {
            key: TypeKey::of::<Self>(),
            ..T::shape().into_nullable()
        }
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        match self {
            Some(inner) => inner.to_value(),
            None => Ok(Value::Null)
        }
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some)
        }
    }
}

impl<T: FieldType> FieldType for Box<T> {
    fn shape() -> TypeShape {
        TypeShape {
            key: TypeKey::of::<Self>(),
            ..T::shape()
        }
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        (**self).to_value()
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        T::from_value(value).map(Box::new)
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn shape() -> TypeShape {
        TypeShape::collection::<Self, T>()
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Err(ConversionError::not_scalar::<Self>())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(Vec::new()),
            _ => Err(ConversionError::not_scalar::<Self>())
        }
    }
}

impl<K, V> FieldType for HashMap<K, V>
where
    K: FieldType + Eq + Hash,
    V: FieldType
{
    fn shape() -> TypeShape {
        TypeShape::dictionary::<Self, K, V>()
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Err(ConversionError::not_scalar::<Self>())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(HashMap::new()),
            _ => Err(ConversionError::not_scalar::<Self>())
        }
    }
}

impl<K, V> FieldType for BTreeMap<K, V>
where
    K: FieldType + Ord,
    V: FieldType
{
    fn shape() -> TypeShape {
        TypeShape::dictionary::<Self, K, V>()
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Err(ConversionError::not_scalar::<Self>())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(BTreeMap::new()),
            _ => Err(ConversionError::not_scalar::<Self>())
        }
    }
}

macro_rules! tuple_field {
    ($($name:ident),+) => {
        impl<$($name: FieldType),+> FieldType for ($($name,)+) {
            fn shape() -> TypeShape {
                TypeShape::tuple::<Self>(|| vec![$($name::shape()),+])
            }

            fn to_value(&self) -> Result<Value, ConversionError> {
                Err(ConversionError::not_scalar::<Self>())
            }

            fn from_value(_: Value) -> Result<Self, ConversionError> {
                Err(ConversionError::not_scalar::<Self>())
            }
        }
    };
}

tuple_field!(A, B);
tuple_field!(A, B, C);

#[cfg(feature = "uuid")]
impl FieldType for uuid::Uuid {
    fn shape() -> TypeShape {
        TypeShape::scalar::<uuid::Uuid>("Uuid", ShapeKind::Text)
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(Value::Text(self.to_string()))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(uuid::Uuid::nil()),
            Value::Text(ref text) => {
                uuid::Uuid::parse_str(text.trim()).map_err(|_| ConversionError::parse::<Self>(text.as_str()))
            }
            Value::Bytes(ref bytes) => {
                uuid::Uuid::from_slice(bytes).map_err(|_| ConversionError::incompatible::<Self>(&value))
            }
            other => Err(ConversionError::incompatible::<Self>(&other))
        }
    }
}

#[cfg(feature = "chrono")]
mod chrono_impls {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

    use super::{FieldType, ShapeKind, TypeShape};
    use crate::{error::ConversionError, value::Value};

    const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

    impl FieldType for DateTime<Utc> {
        fn shape() -> TypeShape {
            TypeShape::scalar::<Self>("DateTime<Utc>", ShapeKind::Text)
        }

        fn to_value(&self) -> Result<Value, ConversionError> {
            Ok(Value::Text(self.to_rfc3339()))
        }

        fn from_value(value: Value) -> Result<Self, ConversionError> {
            match value {
                Value::Null => Ok(Self::default()),
                Value::Text(ref text) => {
                    let text = text.trim();
                    DateTime::parse_from_rfc3339(text)
                        .map(|dt| dt.with_timezone(&Utc))
                        .or_else(|_| NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT).map(|dt| dt.and_utc()))
                        .map_err(|_| ConversionError::parse::<Self>(text))
                }
                Value::Int(secs) => {
                    DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| ConversionError::out_of_range::<Self>(secs))
                }
                other => Err(ConversionError::incompatible::<Self>(&other))
            }
        }
    }

    impl FieldType for NaiveDateTime {
        fn shape() -> TypeShape {
            TypeShape::scalar::<Self>("NaiveDateTime", ShapeKind::Text)
        }

        fn to_value(&self) -> Result<Value, ConversionError> {
            Ok(Value::Text(self.format(DATE_TIME_FORMAT).to_string()))
        }

        fn from_value(value: Value) -> Result<Self, ConversionError> {
            match value {
                Value::Null => Ok(Self::default()),
                Value::Text(ref text) => NaiveDateTime::parse_from_str(text.trim(), DATE_TIME_FORMAT)
                    .or_else(|_| NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%dT%H:%M:%S%.f"))
                    .map_err(|_| ConversionError::parse::<Self>(text.as_str())),
                other => Err(ConversionError::incompatible::<Self>(&other))
            }
        }
    }

    impl FieldType for NaiveDate {
        fn shape() -> TypeShape {
            TypeShape::scalar::<Self>("NaiveDate", ShapeKind::Text)
        }

        fn to_value(&self) -> Result<Value, ConversionError> {
            Ok(Value::Text(self.format("%Y-%m-%d").to_string()))
        }

        fn from_value(value: Value) -> Result<Self, ConversionError> {
            match value {
                Value::Null => Ok(Self::default()),
                Value::Text(ref text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                    .map_err(|_| ConversionError::parse::<Self>(text.as_str())),
                other => Err(ConversionError::incompatible::<Self>(&other))
            }
        }
    }
}
