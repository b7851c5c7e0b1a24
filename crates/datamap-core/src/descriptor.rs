// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Immutable, fully-resolved type metadata.
//!
//! A [`TypeDescriptor`] is built once per type from its
//! [`EntityMapping`](crate::EntityMapping) and then only read. It owns its
//! [`MemberDescriptor`]s; each member points back at its owner through a
//! [`Weak`] reference and at nested composite types through their
//! [`TypeKey`], never by value. Nested descriptors are looked up in the
//! registry on demand.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{Arc, Weak}
};

use crate::{
    accessor::{self, AccessTier, Getter, Setter},
    error::{AccessError, ConversionError, MappingError},
    mapping::{Annotations, EntityMapping, Mapped, MemberKind, ParamDef, Visibility},
    registry::TypeRegistry,
    resolver::{self, RawMember},
    shape::{ShapeKind, TypeKey, TypeShape},
    value::Value
};

/// Type-erased object produced by a constructor.
pub type AnyObject = Box<dyn Any + Send>;

type DefaultCtor = Arc<dyn Fn() -> AnyObject + Send + Sync>;
type BuildCtor = Arc<dyn Fn(Vec<Value>) -> Result<AnyObject, ConversionError> + Send + Sync>;

/// A constructor of a described type.
#[derive(Clone)]
pub struct ConstructorDescriptor {
    params: Vec<ParamDef>,
    build:  BuildCtor
}

impl ConstructorDescriptor {
    /// Parameters in declaration order.
    pub fn params(&self) -> &[ParamDef] {
        &self.params
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Invoke with values in parameter order.
    ///
    /// # Errors
    ///
    /// Returns the constructor's conversion failure.
    pub fn invoke(&self, args: Vec<Value>) -> Result<AnyObject, ConversionError> {
        (self.build)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.params.iter().map(|p| p.name.as_str()).collect();
        f.debug_struct("ConstructorDescriptor").field("params", &names).finish()
    }
}

/// Metadata and accessors of one member.
pub struct MemberDescriptor {
    name:          String,
    column:        String,
    shape:         TypeShape,
    annotations:   Annotations,
    visibility:    Visibility,
    kind:          MemberKind,
    key:           bool,
    foreign_key:   bool,
    column_mapped: bool,
    getter:        Option<Getter>,
    setter:        Option<Setter>,
    tier:          AccessTier,
    owner:         Weak<TypeDescriptor>,
    nested:        Option<TypeShape>
}

impl MemberDescriptor {
    /// Member name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Declared type.
    pub const fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Member annotations.
    pub const fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Declared visibility.
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Field or property.
    pub const fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Part of the primary key.
    pub const fn is_key(&self) -> bool {
        self.key
    }

    /// Foreign key.
    pub const fn is_foreign_key(&self) -> bool {
        self.foreign_key
    }

    /// Eligible for INSERT/UPDATE.
    pub const fn is_column_mapped(&self) -> bool {
        self.column_mapped
    }

    /// Excluded from the mapping.
    pub fn is_not_mapped(&self) -> bool {
        self.annotations.is_not_mapped()
    }

    /// Has a getter.
    pub const fn can_read(&self) -> bool {
        self.getter.is_some()
    }

    /// Has a setter.
    pub const fn can_write(&self) -> bool {
        self.setter.is_some()
    }

    /// Accessor tier serving this member.
    pub const fn tier(&self) -> AccessTier {
        self.tier
    }

    /// Referenced column of a foreign key.
    pub fn references(&self) -> Option<&str> {
        self.annotations.references()
    }

    /// Display name, falling back to the member name.
    pub fn display_name(&self) -> &str {
        self.annotations
            .param(crate::mapping::AnnotationKind::Display, "name")
            .unwrap_or(&self.name)
    }

    /// Read the member from `object`.
    ///
    /// # Errors
    ///
    /// [`AccessError::NotReadable`] without a getter, otherwise the getter's
    /// failure.
    pub fn get(&self, object: &dyn Any) -> Result<Value, AccessError> {
        match &self.getter {
            Some(getter) => getter(object),
            None => Err(AccessError::NotReadable {
                member: self.name.clone()
            })
        }
    }

    /// Write the member on `object`.
    ///
    /// # Errors
    ///
    /// [`AccessError::ReadOnly`] without a setter, otherwise the setter's
    /// failure.
    pub fn set(&self, object: &mut dyn Any, value: Value) -> Result<(), AccessError> {
        match &self.setter {
            Some(setter) => setter(object, value),
            None => Err(AccessError::ReadOnly {
                member: self.name.clone()
            })
        }
    }

    /// Descriptor that owns this member, while the registry keeps it alive.
    pub fn owner(&self) -> Option<Arc<TypeDescriptor>> {
        self.owner.upgrade()
    }

    /// Key of the composite type reachable through this member, directly or
    /// as a collection element.
    pub fn nested_key(&self) -> Option<TypeKey> {
        self.nested.map(|shape| shape.base)
    }

    /// Descriptor of the composite type reachable through this member.
    ///
    /// # Errors
    ///
    /// Propagates descriptor construction failures of the nested type.
    pub fn nested(&self, registry: &dyn TypeRegistry) -> Result<Option<Arc<TypeDescriptor>>, MappingError> {
        match self.nested.and_then(|shape| shape.describe) {
            Some(describe) => describe(registry).map(Some),
            None => Ok(None)
        }
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("kind", &self.shape.kind)
            .field("key", &self.key)
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}

/// First composite shape reachable from `shape` without entering another
/// composite.
fn nested_composite(shape: &TypeShape) -> Option<TypeShape> {
    if shape.kind == ShapeKind::Composite {
        return Some(*shape);
    }
    shape.children().iter().find_map(nested_composite)
}

/// Immutable metadata of one type.
pub struct TypeDescriptor {
    key:           TypeKey,
    name:          String,
    shape:         TypeShape,
    table:         String,
    schema:        Option<String>,
    annotations:   Annotations,
    members:       Vec<MemberDescriptor>,
    keys:          Vec<usize>,
    foreign_keys:  Vec<usize>,
    column_mapped: Vec<usize>,
    by_name:       HashMap<String, usize>,
    default_ctor:  Option<DefaultCtor>,
    constructors:  Vec<ConstructorDescriptor>
}

impl TypeDescriptor {
    /// Build the descriptor of `T` from its mapping configuration.
    ///
    /// # Errors
    ///
    /// Returns the resolver's [`MappingError`] for malformed or duplicated
    /// annotations.
    pub fn from_mapping<T: Mapped>(mapping: EntityMapping<T>) -> Result<Arc<Self>, MappingError> {
        let raw: Vec<RawMember<'_>> = mapping
            .members
            .iter()
            .map(|m| RawMember {
                name:        &m.name,
                annotations: &m.annotations,
                shape:       &m.shape,
                visibility:  m.visibility
            })
            .collect();
        let resolved = resolver::resolve(&mapping.name, &mapping.annotations, &raw)?;

        let mut by_name = HashMap::new();
        for (idx, (member, column)) in mapping.members.iter().zip(&resolved.columns).enumerate() {
            by_name.entry(column.to_ascii_lowercase()).or_insert(idx);
            by_name.insert(member.name.to_ascii_lowercase(), idx);
        }

        let mut constructors: Vec<ConstructorDescriptor> = mapping
            .constructors
            .into_iter()
            .map(|ctor| {
                let build = ctor.build;
                ConstructorDescriptor {
                    params: ctor.params,
                    build:  Arc::new(move |args| build(args).map(|object| Box::new(object) as AnyObject))
                }
            })
            .collect();
        constructors.sort_by_key(ConstructorDescriptor::arity);

        let default_ctor = mapping.default.map(|build| {
            let ctor: DefaultCtor = Arc::new(move || Box::new(build()) as AnyObject);
            ctor
        });

        let dynamic = mapping.dynamic;
        let descriptor = Arc::new_cyclic(|owner: &Weak<Self>| {
            let members = mapping
                .members
                .iter()
                .enumerate()
                .map(|(idx, member)| {
                    let accessors = accessor::compile(member, dynamic);
                    MemberDescriptor {
                        name:          member.name.clone(),
                        column:        resolved.columns[idx].clone(),
                        shape:         member.shape,
                        annotations:   member.annotations.clone(),
                        visibility:    member.visibility,
                        kind:          member.kind,
                        key:           resolved.keys.contains(&idx),
                        foreign_key:   resolved.foreign_keys.contains(&idx),
                        column_mapped: resolved.column_mapped.contains(&idx),
                        getter:        accessors.getter,
                        setter:        accessors.setter,
                        tier:          accessors.tier,
                        owner:         owner.clone(),
                        nested:        nested_composite(&member.shape)
                    }
                })
                .collect();

            Self {
                key: TypeKey::of::<T>(),
                name: mapping.name.clone(),
                shape: T::shape(),
                table: resolved.table.clone(),
                schema: resolved.schema.clone(),
                annotations: mapping.annotations.clone(),
                members,
                keys: resolved.keys.clone(),
                foreign_keys: resolved.foreign_keys.clone(),
                column_mapped: resolved.column_mapped.clone(),
                by_name,
                default_ctor,
                constructors
            }
        });
        Ok(descriptor)
    }

    /// Descriptor of a non-composite type: classification only, no members.
    pub fn from_shape(shape: TypeShape) -> Arc<Self> {
        Arc::new(Self {
            key: shape.key,
            name: shape.name.to_owned(),
            shape,
            table: shape.name.to_owned(),
            schema: None,
            annotations: Annotations::new(),
            members: Vec::new(),
            keys: Vec::new(),
            foreign_keys: Vec::new(),
            column_mapped: Vec::new(),
            by_name: HashMap::new(),
            default_ctor: None,
            constructors: Vec::new()
        })
    }

    /// Type identity.
    pub const fn key(&self) -> TypeKey {
        self.key
    }

    /// Declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type shape, carrying the classification flags.
    pub const fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Schema name.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Type-level annotations.
    pub const fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Scalar or enum.
    pub const fn is_basic(&self) -> bool {
        self.shape.is_basic()
    }

    /// Collection type.
    pub const fn is_collection(&self) -> bool {
        self.shape.is_collection()
    }

    /// Dictionary type.
    pub const fn is_dictionary(&self) -> bool {
        self.shape.is_dictionary()
    }

    /// Tuple type.
    pub const fn is_tuple(&self) -> bool {
        self.shape.is_tuple()
    }

    /// Nullable type.
    pub const fn is_nullable(&self) -> bool {
        self.shape.is_nullable()
    }

    /// Numeric type.
    pub const fn is_numeric(&self) -> bool {
        self.shape.is_numeric()
    }

    /// Boolean type.
    pub const fn is_boolean(&self) -> bool {
        self.shape.is_boolean()
    }

    /// Floating-point type.
    pub const fn is_float(&self) -> bool {
        self.shape.is_float()
    }

    /// Enum type.
    pub const fn is_enum(&self) -> bool {
        self.shape.is_enum()
    }

    /// Mapped entity.
    pub const fn is_composite(&self) -> bool {
        self.shape.is_composite()
    }

    /// All members in declaration order.
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Member by name or column name, case-insensitive.
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.member_index(name).map(|idx| &self.members[idx])
    }

    pub(crate) fn member_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// Like [`member`](Self::member), failing with
    /// [`MappingError::UnknownMember`].
    ///
    /// # Errors
    ///
    /// When no member matches.
    pub fn require_member(&self, name: &str) -> Result<&MemberDescriptor, MappingError> {
        self.member(name).ok_or_else(|| MappingError::UnknownMember {
            type_name: self.name.clone(),
            member:    name.to_owned()
        })
    }

    /// Primary-key members.
    pub fn keys(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.keys.iter().map(|&idx| &self.members[idx])
    }

    /// Primary-key member names.
    pub fn key_names(&self) -> Vec<&str> {
        self.keys().map(MemberDescriptor::name).collect()
    }

    /// Foreign-key members.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.foreign_keys.iter().map(|&idx| &self.members[idx])
    }

    /// Members eligible for INSERT/UPDATE.
    pub fn column_mapped(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.column_mapped.iter().map(|&idx| &self.members[idx])
    }

    /// Has a parameterless constructor.
    pub const fn has_default_constructor(&self) -> bool {
        self.default_ctor.is_some()
    }

    /// Build an instance with the parameterless constructor.
    pub fn create_default(&self) -> Option<AnyObject> {
        self.default_ctor.as_ref().map(|ctor| ctor())
    }

    /// Constructors ordered by parameter count.
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("schema", &self.schema)
            .field("members", &self.members)
            .field("keys", &self.key_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mapping::{ConstructorDef, MemberDef},
        shape::FieldType
    };

    #[derive(Debug, Default, PartialEq)]
    struct Account {
        number:  String,
        balance: f64,
        owner:   Option<Box<Account>>
    }

    impl FieldType for Account {
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

    impl Mapped for Account {
        fn mapping() -> EntityMapping<Self> {
            EntityMapping::new("Account")
                .table("accounts")
                .member(
                    MemberDef::of::<String>("number", |a: &Account| a.number.to_value(), |a: &mut Account, v| {
                        a.number = String::from_value(v)?;
                        Ok(())
                    })
                    .key()
                    .column(Some("acct_no"))
                )
                .member(MemberDef::of::<f64>("balance", |a: &Account| a.balance.to_value(), |a: &mut Account, v| {
                    a.balance = f64::from_value(v)?;
                    Ok(())
                }))
                .member(MemberDef::dynamic("owner", TypeShape::composite::<Account>().into_nullable()))
                .member(MemberDef::property("in_debt", bool::shape(), |a: &Account| Ok(Value::Bool(a.balance < 0.0))))
                .constructor(ConstructorDef::new(vec![ParamDef::of::<String>("number")], |args| {
                    let mut args = args.into_iter();
                    Ok(Account {
                        number: String::from_value(args.next().unwrap_or_default())?,
                        ..Account::default()
                    })
                }))
                .default_constructor(Account::default)
        }
    }

    #[test]
    fn builds_members_and_subsets() {
        let descriptor = TypeDescriptor::from_mapping(Account::mapping()).unwrap();
        assert_eq!(descriptor.table(), "accounts");
        assert_eq!(descriptor.key_names(), vec!["number"]);
        assert_eq!(descriptor.members().len(), 4);
        let mapped: Vec<&str> = descriptor.column_mapped().map(MemberDescriptor::name).collect();
        assert_eq!(mapped, vec!["balance", "in_debt"]);
    }

    #[test]
    fn lookup_by_name_or_column() {
        let descriptor = TypeDescriptor::from_mapping(Account::mapping()).unwrap();
        assert_eq!(descriptor.member("ACCT_NO").unwrap().name(), "number");
        assert_eq!(descriptor.member("Number").unwrap().column(), "acct_no");
        assert!(descriptor.member("nope").is_none());
        assert!(matches!(descriptor.require_member("nope"), Err(MappingError::UnknownMember { .. })));
    }

    #[test]
    fn owner_back_reference() {
        let descriptor = TypeDescriptor::from_mapping(Account::mapping()).unwrap();
        let member = descriptor.member("balance").unwrap();
        assert!(Arc::ptr_eq(&member.owner().unwrap(), &descriptor));
    }

    #[test]
    fn nested_member_records_key_only() {
        let descriptor = TypeDescriptor::from_mapping(Account::mapping()).unwrap();
        let owner = descriptor.member("owner").unwrap();
        assert_eq!(owner.nested_key(), Some(TypeKey::of::<Account>()));
        assert!(descriptor.member("balance").unwrap().nested_key().is_none());
    }

    #[test]
    fn read_only_property_rejects_writes() {
        let descriptor = TypeDescriptor::from_mapping(Account::mapping()).unwrap();
        let property = descriptor.member("in_debt").unwrap();
        assert!(property.can_read());
        assert!(!property.can_write());

        let mut account = Account::default();
        let err = property.set(&mut account, Value::Bool(true)).unwrap_err();
        assert!(matches!(err, AccessError::ReadOnly { .. }));
        assert_eq!(property.get(&account), Ok(Value::Bool(false)));
    }

    #[test]
    fn member_without_any_tier() {
        let descriptor = TypeDescriptor::from_mapping(Account::mapping()).unwrap();
        let owner = descriptor.member("owner").unwrap();
        assert_eq!(owner.tier(), AccessTier::Unavailable);
        assert!(matches!(owner.get(&Account::default()), Err(AccessError::NotReadable { .. })));
    }

    #[test]
    fn constructors_and_default() {
        let descriptor = TypeDescriptor::from_mapping(Account::mapping()).unwrap();
        assert!(descriptor.has_default_constructor());
        let object = descriptor.create_default().unwrap();
        assert!(object.downcast_ref::<Account>().is_some());

        let ctor = &descriptor.constructors()[0];
        assert_eq!(ctor.arity(), 1);
        let object = ctor.invoke(vec![Value::from("A-1")]).unwrap();
        assert_eq!(object.downcast_ref::<Account>().unwrap().number, "A-1");
    }

    #[test]
    fn scalar_descriptor() {
        let descriptor = TypeDescriptor::from_shape(<Option<i32>>::shape());
        assert!(descriptor.is_basic());
        assert!(descriptor.is_numeric());
        assert!(descriptor.is_nullable());
        assert!(descriptor.members().is_empty());
    }
}
