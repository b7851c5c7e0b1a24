// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Parameter binding: any supported source into an ordered name/value set.
//!
//! # Supported sources
//!
//! | Source | Names |
//! |--------|-------|
//! | [`Params`] | as given |
//! | [`Pair`], `(K, V)` with `K: Into<String>`, `V: Into<Value>` | the key |
//! | `Vec` or slice of any source | each key, last one wins |
//! | `HashMap<String, V>`, `BTreeMap<String, V>` | map keys |
//! | `()` | none |
//! | a mapped object | key and column-mapped member names |
//!
//! Typed call sites go through [`BindSource`], which describes a mapped
//! object on demand. [`ParameterBinder::get_params`] works on `&dyn Any`; it
//! recognizes tuples whose value is a common scalar, and objects whose type
//! is already published in the registry.

use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt
};

use tracing::warn;

use crate::{
    descriptor::TypeDescriptor,
    error::BindingError,
    mapping::Mapped,
    registry::{RegistryExt, TypeRegistry},
    shape::TypeKey,
    value::Value
};

/// Ordered name/value parameter set.
///
/// Names compare case-insensitively; inserting an existing name replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>
}

impl Params {
    /// Empty set.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new()
        }
    }

    /// Insert or replace a parameter, returning the replaced value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// First name of `other` that is already bound in `self`.
    pub fn shared_name<'o>(&self, other: &'o Params) -> Option<&'o str> {
        other.iter().map(|(name, _)| name).find(|name| self.get(name).is_some())
    }

    /// Merge `other` into `self`; `other` wins on name clashes.
    pub fn extend(&mut self, other: Params) {
        for (name, value) in other {
            self.insert(name, value);
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Renders `Name='Ann', Age=30`.
impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (name, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

/// Build [`Params`] from `name => value` pairs.
///
/// ```rust
/// use datamap_core::{Value, params};
///
/// let params = params! { "name" => "Ann", "age" => 30 };
/// assert_eq!(params.get("AGE"), Some(&Value::Int(30)));
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::Params::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::Params::new();
        $(params.insert($name, $value);)+
        params
    }};
}

/// A single named value.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    /// Parameter name.
    pub key:   String,
    /// Parameter value.
    pub value: Value
}

impl Pair {
    /// Create a pair.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key:   key.into(),
            value: value.into()
        }
    }
}

/// Converts parameter sources into [`Params`].
#[derive(Clone, Copy)]
pub struct ParameterBinder<'a> {
    registry: &'a dyn TypeRegistry
}

impl<'a> ParameterBinder<'a> {
    /// Binder resolving objects through `registry`.
    pub const fn new(registry: &'a dyn TypeRegistry) -> Self {
        Self {
            registry
        }
    }

    /// Bind `source`, degrading to an empty set for unsupported shapes.
    pub fn get_params(&self, source: &dyn Any) -> Params {
        match self.try_get_params(source) {
            Ok(params) => params,
            Err(err) => {
                warn!(error = %err, "parameter source not bound, continuing without parameters");
                Params::new()
            }
        }
    }

    /// Bind `source`.
    ///
    /// # Errors
    ///
    /// - [`BindingError::UnsupportedShape`] for unknown source types
    /// - [`BindingError::UnreadableMember`] when an object member getter fails
    pub fn try_get_params(&self, source: &dyn Any) -> Result<Params, BindingError> {
        if let Some(params) = source.downcast_ref::<Params>() {
            return Ok(params.clone());
        }
        if source.is::<()>() {
            return Ok(Params::new());
        }
        if let Some(pair) = source.downcast_ref::<Pair>() {
            return Ok(Params::new().with(pair.key.clone(), pair.value.clone()));
        }
        if let Some(pairs) = source.downcast_ref::<Vec<Pair>>() {
            return Ok(pairs.iter().map(|p| (p.key.clone(), p.value.clone())).collect());
        }
        if let Some(params) = scalar_pairs(source) {
            return Ok(params);
        }
        match self.registry.get(&TypeKey::from_id(source.type_id())) {
            Some(descriptor) if descriptor.is_composite() => object_params(&descriptor, source, true),
            _ => Err(BindingError::UnsupportedShape)
        }
    }

    /// Bind a statically typed source.
    ///
    /// # Errors
    ///
    /// See [`BindSource::bind_with`].
    pub fn bind<P: BindSource + ?Sized>(&self, source: &P) -> Result<Params, BindingError> {
        source.bind_with(self)
    }

    /// Bind the keys and column-mapped members of `object`, describing `T`
    /// first when it is not published yet.
    ///
    /// # Errors
    ///
    /// - [`BindingError::Mapping`] when `T` cannot be described
    /// - [`BindingError::UnreadableMember`] when a getter fails
    pub fn bind_object<T: Mapped>(&self, object: &T) -> Result<Params, BindingError> {
        let descriptor = self.registry.describe::<T>()?;
        object_params(&descriptor, object, true)
    }
}

/// Tuples, tuple vectors and maps whose values are one of the common scalar
/// types or [`Value`].
fn scalar_pairs(source: &dyn Any) -> Option<Params> {
    macro_rules! try_scalars {
        ($($ty:ty),*) => {$(
            if let Some((name, value)) = source.downcast_ref::<(String, $ty)>() {
                return Some(Params::new().with(name.clone(), value.clone()));
            }
            if let Some((name, value)) = source.downcast_ref::<(&'static str, $ty)>() {
                return Some(Params::new().with(*name, value.clone()));
            }
            if let Some(pairs) = source.downcast_ref::<Vec<(String, $ty)>>() {
                return Some(pairs.iter().cloned().collect());
            }
            if let Some(pairs) = source.downcast_ref::<Vec<(&'static str, $ty)>>() {
                return Some(pairs.iter().map(|(n, v)| (*n, v.clone())).collect());
            }
            if let Some(map) = source.downcast_ref::<HashMap<String, $ty>>() {
                return Some(map.iter().map(|(n, v)| (n.clone(), v.clone())).collect());
            }
            if let Some(map) = source.downcast_ref::<BTreeMap<String, $ty>>() {
                return Some(map.iter().map(|(n, v)| (n.clone(), v.clone())).collect());
            }
        )*};
    }

    try_scalars!(Value, i64, i32, f64, bool, String, &'static str);
    None
}

/// A parameter source known at compile time.
///
/// `#[derive(Entity)]` implements it for mapped types through
/// [`ParameterBinder::bind_object`].
pub trait BindSource {
    /// Convert `self` into [`Params`].
    ///
    /// # Errors
    ///
    /// [`BindingError`] when an object cannot be described or read.
    fn bind_with(&self, binder: &ParameterBinder<'_>) -> Result<Params, BindingError>;
}

impl BindSource for Params {
    fn bind_with(&self, _: &ParameterBinder<'_>) -> Result<Params, BindingError> {
        Ok(self.clone())
    }
}

impl BindSource for () {
    fn bind_with(&self, _: &ParameterBinder<'_>) -> Result<Params, BindingError> {
        Ok(Params::new())
    }
}

impl BindSource for Pair {
    fn bind_with(&self, _: &ParameterBinder<'_>) -> Result<Params, BindingError> {
        Ok(Params::new().with(self.key.clone(), self.value.clone()))
    }
}

impl<K, V> BindSource for (K, V)
where
    K: Clone + Into<String>,
    V: Clone + Into<Value>
{
    fn bind_with(&self, _: &ParameterBinder<'_>) -> Result<Params, BindingError> {
        Ok(Params::new().with(self.0.clone(), self.1.clone()))
    }
}

impl<S: BindSource> BindSource for [S] {
    fn bind_with(&self, binder: &ParameterBinder<'_>) -> Result<Params, BindingError> {
        let mut params = Params::new();
        for source in self {
            params.extend(source.bind_with(binder)?);
        }
        Ok(params)
    }
}

impl<S: BindSource> BindSource for Vec<S> {
    fn bind_with(&self, binder: &ParameterBinder<'_>) -> Result<Params, BindingError> {
        self.as_slice().bind_with(binder)
    }
}

impl<V: Clone + Into<Value>, H> BindSource for HashMap<String, V, H> {
    fn bind_with(&self, _: &ParameterBinder<'_>) -> Result<Params, BindingError> {
        Ok(self.iter().map(|(n, v)| (n.clone(), v.clone())).collect())
    }
}

impl<V: Clone + Into<Value>> BindSource for BTreeMap<String, V> {
    fn bind_with(&self, _: &ParameterBinder<'_>) -> Result<Params, BindingError> {
        Ok(self.iter().map(|(n, v)| (n.clone(), v.clone())).collect())
    }
}

impl<S: BindSource + ?Sized> BindSource for &S {
    fn bind_with(&self, binder: &ParameterBinder<'_>) -> Result<Params, BindingError> {
        (**self).bind_with(binder)
    }
}

impl fmt::Debug for ParameterBinder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBinder").field("registry_len", &self.registry.len()).finish()
    }
}

/// Read the column-mapped members of `object`, and its keys when
/// `include_keys` is set, into [`Params`] named after the members.
///
/// # Errors
///
/// [`BindingError::UnreadableMember`] when a getter fails.
pub fn object_params(
    descriptor: &TypeDescriptor,
    object: &dyn Any,
    include_keys: bool
) -> Result<Params, BindingError> {
    let mut params = Params::new();
    let keys = descriptor.keys().filter(|_| include_keys);
    for member in keys.chain(descriptor.column_mapped()) {
        let value = member.get(object).map_err(|err| BindingError::UnreadableMember {
            member: member.name().to_owned(),
            reason: err.to_string()
        })?;
        params.insert(member.name(), value);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ConversionError,
        mapping::{EntityMapping, Mapped, MemberDef},
        registry::{DescriptorRegistry, RegistryExt},
        shape::{FieldType, TypeShape}
    };

    struct Person {
        id:   i64,
        name: String
    }

    impl FieldType for Person {
        fn shape() -> TypeShape {
            TypeShape::composite::<Self>()
        }

        fn to_value(&self) -> Result<Value, ConversionError> {
            Err(ConversionError::not_scalar::<Self>())
        }

        fn from_value(_: Value) -> Result<Self, ConversionError> {
            Err(ConversionError::not_scalar::<Self>())
        }
    }

    impl Mapped for Person {
        fn mapping() -> EntityMapping<Self> {
            EntityMapping::new("Person")
                .member(MemberDef::of::<i64>("Id", |p: &Person| p.id.to_value(), |p: &mut Person, v| {
                    p.id = i64::from_value(v)?;
                    Ok(())
                }))
                .member(MemberDef::of::<String>("Name", |p: &Person| p.name.to_value(), |p: &mut Person, v| {
                    p.name = String::from_value(v)?;
                    Ok(())
                }))
        }
    }

    impl BindSource for Person {
        fn bind_with(&self, binder: &ParameterBinder<'_>) -> Result<Params, BindingError> {
            binder.bind_object(self)
        }
    }

    #[test]
    fn params_replace_in_place() {
        let mut params = params! { "a" => 1, "b" => 2 };
        assert_eq!(params.insert("A", 3), Some(Value::Int(1)));
        let names: Vec<&str> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(params.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn shared_names_ignore_case() {
        let left = params! { "Name" => "Ann", "p_0" => 1 };
        assert_eq!(left.shared_name(&params! { "age" => 2, "NAME" => "Bob" }), Some("NAME"));
        assert_eq!(left.shared_name(&params! { "p_1" => 2 }), None);
    }

    #[test]
    fn params_display() {
        let params = params! { "Name" => "Ann", "Age" => 30 };
        assert_eq!(params.to_string(), "Name='Ann', Age=30");
    }

    #[test]
    fn binds_pairs_and_maps() {
        let registry = DescriptorRegistry::new();
        let binder = ParameterBinder::new(&registry);

        let params = binder.get_params(&Pair::new("x", 1));
        assert_eq!(params.get("x"), Some(&Value::Int(1)));

        let params = binder.get_params(&("y", Value::from("z")));
        assert_eq!(params.get("y"), Some(&Value::from("z")));

        let map: HashMap<String, Value> = [("k".to_string(), Value::Bool(true))].into();
        assert_eq!(binder.get_params(&map).get("k"), Some(&Value::Bool(true)));

        let list = vec![("a", Value::Int(1)), ("b", Value::Int(2))];
        assert_eq!(binder.get_params(&list).len(), 2);

        assert!(binder.get_params(&()).is_empty());
    }

    #[test]
    fn unsupported_shape_degrades_to_empty() {
        let registry = DescriptorRegistry::new();
        let binder = ParameterBinder::new(&registry);
        assert!(binder.get_params(&42_u8).is_empty());
        assert_eq!(binder.try_get_params(&42_u8), Err(BindingError::UnsupportedShape));
    }

    #[test]
    fn binds_described_object() {
        let registry = DescriptorRegistry::new();
        registry.describe::<Person>().unwrap();
        let binder = ParameterBinder::new(&registry);

        let person = Person {
            id:   7,
            name: "Ann".into()
        };
        let params = binder.try_get_params(&person).unwrap();
        assert_eq!(params.to_string(), "Id=7, Name='Ann'");
    }

    #[test]
    fn binds_tuples_with_scalar_values() {
        let registry = DescriptorRegistry::new();
        let binder = ParameterBinder::new(&registry);

        assert_eq!(binder.try_get_params(&("age", 30_i64)).unwrap().get("age"), Some(&Value::Int(30)));
        assert_eq!(
            binder.try_get_params(&("name".to_owned(), "Ann")).unwrap().get("name"),
            Some(&Value::from("Ann"))
        );

        let list = vec![("age".to_owned(), 30_i64), ("min".to_owned(), 18_i64)];
        let params = binder.try_get_params(&list).unwrap();
        assert_eq!(params.to_string(), "age=30, min=18");

        let map: BTreeMap<String, f64> = [("ratio".to_owned(), 0.5)].into();
        assert_eq!(binder.try_get_params(&map).unwrap().get("ratio"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn typed_sources_bind_any_value_type() {
        let registry = DescriptorRegistry::new();
        let binder = ParameterBinder::new(&registry);

        assert_eq!(binder.bind(&("age", 30_u8)).unwrap().get("AGE"), Some(&Value::Int(30)));
        let list = vec![("a", true), ("b", false), ("a", false)];
        assert_eq!(binder.bind(&list).unwrap().to_string(), "a=false, b=false");
        assert!(binder.bind(&()).unwrap().is_empty());
    }

    #[test]
    fn typed_object_is_described_on_demand() {
        let registry = DescriptorRegistry::new();
        let binder = ParameterBinder::new(&registry);
        let person = Person {
            id:   3,
            name: "Bob".into()
        };

        assert!(registry.is_empty());
        let params = binder.bind(&person).unwrap();
        assert_eq!(params.to_string(), "Id=3, Name='Bob'");
        assert_eq!(registry.len(), 1);
        assert_eq!(binder.try_get_params(&person).unwrap(), params);
    }

    #[test]
    fn undescribed_object_is_unsupported() {
        let registry = DescriptorRegistry::new();
        let binder = ParameterBinder::new(&registry);
        let person = Person {
            id:   1,
            name: String::new()
        };
        assert_eq!(binder.try_get_params(&person), Err(BindingError::UnsupportedShape));
    }
}
