// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Process-lifetime cache of type descriptors.
//!
//! [`TypeRegistry`] is the object-safe interface consumers depend on;
//! [`RegistryExt`] adds the generic entry points on top of it for every
//! registry, including `dyn TypeRegistry`. [`DescriptorRegistry`] is the
//! concrete append-only implementation; [`DescriptorRegistry::global`] is the
//! process-wide instance and [`DescriptorRegistry::new`] builds an isolated
//! one.
//!
//! # Guarantees
//!
//! - One descriptor per [`TypeKey`]: once published, every lookup returns the
//!   same `Arc`.
//! - Entries are never replaced or removed.
//! - Construction runs outside the lock. Two threads describing the same type
//!   for the first time may both build a descriptor; the first to publish
//!   wins and the other is dropped.
//! - Failed constructions are not cached. The error reaches the caller that
//!   triggered construction.
//! - A descriptor is handed out only once every composite reachable from its
//!   members is published. A parent whose nested type fails to build stays in
//!   the cache, but every lookup through [`RegistryExt`] retries the nested
//!   type and reports its failure again.
//!
//! # Cyclic types
//!
//! A descriptor records nested composite members by key only. The registry
//! publishes a descriptor first and describes the composites reachable from
//! its members afterwards, skipping the ones already published. A type that
//! contains itself, directly or through another type, is therefore described
//! exactly once.

use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc
};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::trace;

use crate::{
    descriptor::TypeDescriptor,
    error::MappingError,
    mapping::{EntityMapping, Mapped},
    shape::{TypeKey, TypeShape}
};

/// Deferred descriptor construction passed to
/// [`TypeRegistry::get_or_insert_with`].
pub type BuildDescriptor<'a> = Box<dyn FnOnce() -> Result<Arc<TypeDescriptor>, MappingError> + 'a>;

/// Thread-safe, append-only map from type identity to descriptor.
pub trait TypeRegistry: Send + Sync {
    /// Published descriptor for `key`.
    fn get(&self, key: &TypeKey) -> Option<Arc<TypeDescriptor>>;

    /// Return the published descriptor for `key`, or build and publish one.
    ///
    /// The flag is `true` when this call published the returned descriptor.
    ///
    /// # Errors
    ///
    /// Returns the failure of `build`; nothing is published in that case.
    fn get_or_insert_with(
        &self,
        key: TypeKey,
        build: BuildDescriptor<'_>
    ) -> Result<(Arc<TypeDescriptor>, bool), MappingError>;

    /// Number of published descriptors.
    fn len(&self) -> usize;

    /// Nothing published yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of all published descriptors.
    fn keys(&self) -> Vec<TypeKey>;

    /// Upcast for handing the registry to descriptor resolution functions.
    fn as_dyn(&self) -> &dyn TypeRegistry;
}

/// Generic entry points available on every [`TypeRegistry`].
pub trait RegistryExt: TypeRegistry {
    /// Descriptor of `T`, built from [`Mapped::mapping`] on first access.
    ///
    /// # Errors
    ///
    /// [`MappingError`] when `T` or a composite reachable from its members
    /// cannot be described.
    fn describe<T: Mapped>(&self) -> Result<Arc<TypeDescriptor>, MappingError> {
        match self.get(&TypeKey::of::<T>()) {
            Some(hit) => {
                describe_nested(self.as_dyn(), &hit)?;
                Ok(hit)
            }
            None => self.register(T::mapping())
        }
    }

    /// Publish a descriptor for `T` built from an explicit mapping.
    ///
    /// If `T` is already published the existing descriptor is returned and
    /// `mapping` is ignored.
    ///
    /// # Errors
    ///
    /// [`MappingError`] when the mapping, or a composite reachable from its
    /// members, cannot be described.
    fn register<T: Mapped>(&self, mapping: EntityMapping<T>) -> Result<Arc<TypeDescriptor>, MappingError> {
        let key = TypeKey::of::<T>();
        let (descriptor, published) =
            self.get_or_insert_with(key, Box::new(move || TypeDescriptor::from_mapping(mapping)))?;
        if published {
            trace!(
                type_name = descriptor.name(),
                table = descriptor.table(),
                members = descriptor.members().len(),
                "descriptor published"
            );
        }
        describe_nested(self.as_dyn(), &descriptor)?;
        Ok(descriptor)
    }

    /// Descriptor for any shape: composites go through their mapping,
    /// everything else gets a member-less classification descriptor.
    ///
    /// # Errors
    ///
    /// [`MappingError`] when a composite cannot be described.
    fn describe_shape(&self, shape: TypeShape) -> Result<Arc<TypeDescriptor>, MappingError> {
        if let Some(describe) = shape.describe {
            return describe(self.as_dyn());
        }
        let (descriptor, _) =
            self.get_or_insert_with(shape.key, Box::new(move || Ok(TypeDescriptor::from_shape(shape))))?;
        Ok(descriptor)
    }
}

impl<R: TypeRegistry + ?Sized> RegistryExt for R {}

/// Describe every composite reachable from the members of `descriptor` that
/// is not published yet.
fn describe_nested(registry: &dyn TypeRegistry, descriptor: &TypeDescriptor) -> Result<(), MappingError> {
    for member in descriptor.members() {
        let mut pending = vec![*member.shape()];
        while let Some(shape) = pending.pop() {
            match shape.describe {
                Some(describe) => {
                    if registry.get(&shape.base).is_none() {
                        trace!(
                            owner = descriptor.name(),
                            member = member.name(),
                            nested = shape.name,
                            "describing nested type"
                        );
                        describe(registry)?;
                    }
                }
                None => pending.extend(shape.children())
            }
        }
    }
    Ok(())
}

/// Append-only descriptor cache.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    entries: RwLock<HashMap<TypeKey, Arc<TypeDescriptor>>>
}

static GLOBAL: Lazy<Arc<DescriptorRegistry>> = Lazy::new(|| Arc::new(DescriptorRegistry::new()));

impl DescriptorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, created on first use.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }
}

impl TypeRegistry for DescriptorRegistry {
    fn get(&self, key: &TypeKey) -> Option<Arc<TypeDescriptor>> {
        self.entries.read().get(key).cloned()
    }

    fn get_or_insert_with(
        &self,
        key: TypeKey,
        build: BuildDescriptor<'_>
    ) -> Result<(Arc<TypeDescriptor>, bool), MappingError> {
        if let Some(hit) = self.get(&key) {
            return Ok((hit, false));
        }
        let built = build()?;
        let mut entries = self.entries.write();
        match entries.entry(key) {
            Entry::Occupied(existing) => {
                trace!(type_name = key.name(), "descriptor built concurrently, keeping the published one");
                Ok((Arc::clone(existing.get()), false))
            }
            Entry::Vacant(slot) => Ok((Arc::clone(slot.insert(built)), true))
        }
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn keys(&self) -> Vec<TypeKey> {
        self.entries.read().keys().copied().collect()
    }

    fn as_dyn(&self) -> &dyn TypeRegistry {
        self
    }
}
