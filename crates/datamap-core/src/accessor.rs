// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Two-tier member accessors.
//!
//! A member's typed getter/setter functions are erased into [`Getter`] and
//! [`Setter`] closures over `dyn Any`. When the mapping supplies no typed
//! function for a member, the closure dispatches by name through the type's
//! [`DynamicAccess`] instead. Both tiers honor the same contract; callers only
//! see the [`AccessTier`] for diagnostics.
//!
//! Read-only properties get no setter. Writing them through
//! [`MemberDescriptor::set`](crate::MemberDescriptor::set) fails with
//! [`AccessError::ReadOnly`].

use std::{any::Any, sync::Arc};

use crate::{
    error::AccessError,
    mapping::{DynamicAccess, MemberDef, MemberKind},
    value::Value
};

/// Type-erased member getter.
pub type Getter = Arc<dyn Fn(&dyn Any) -> Result<Value, AccessError> + Send + Sync>;

/// Type-erased member setter.
pub type Setter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), AccessError> + Send + Sync>;

/// Which path serves a member's accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTier {
    /// Typed function pointers.
    Compiled,
    /// Name-dispatched [`DynamicAccess`].
    Generic,
    /// Neither readable nor writable.
    Unavailable
}

/// Compiled accessors of one member.
#[derive(Clone)]
pub struct Accessors {
    /// Getter, absent for unreadable members.
    pub getter: Option<Getter>,
    /// Setter, absent for read-only members.
    pub setter: Option<Setter>,
    /// Tier serving the getter (or the setter when there is no getter).
    pub tier:   AccessTier
}

/// Build the accessors of `member`, falling back to `dynamic` for missing
/// typed functions.
pub fn compile<T: 'static>(member: &MemberDef<T>, dynamic: Option<DynamicAccess<T>>) -> Accessors {
    let name: Arc<str> = Arc::from(member.name.as_str());

    let (getter, get_tier) = match (member.get, dynamic) {
        (Some(get), _) => (Some(typed_getter::<T>(Arc::clone(&name), get)), AccessTier::Compiled),
        (None, Some(access)) => (Some(generic_getter::<T>(Arc::clone(&name), access)), AccessTier::Generic),
        (None, None) => (None, AccessTier::Unavailable)
    };

    let (setter, set_tier) = match (member.set, dynamic) {
        (Some(set), _) => (Some(typed_setter::<T>(Arc::clone(&name), set)), AccessTier::Compiled),
        (None, _) if member.kind == MemberKind::Property => (None, AccessTier::Unavailable),
        (None, Some(access)) => (Some(generic_setter::<T>(name, access)), AccessTier::Generic),
        (None, None) => (None, AccessTier::Unavailable)
    };

    let tier = if getter.is_some() { get_tier } else { set_tier };
    Accessors {
        getter,
        setter,
        tier
    }
}

fn mismatch<T>(member: &str) -> AccessError {
    AccessError::TypeMismatch {
        member:   member.to_owned(),
        expected: std::any::type_name::<T>()
    }
}

fn convert(member: &str) -> impl FnOnce(crate::error::ConversionError) -> AccessError + '_ {
    move |source| AccessError::Convert {
        member: member.to_owned(),
        source
    }
}

fn typed_getter<T: 'static>(name: Arc<str>, get: crate::mapping::GetFn<T>) -> Getter {
    Arc::new(move |object: &dyn Any| {
        let object = object.downcast_ref::<T>().ok_or_else(|| mismatch::<T>(&name))?;
        get(object).map_err(convert(&name))
    })
}

fn typed_setter<T: 'static>(name: Arc<str>, set: crate::mapping::SetFn<T>) -> Setter {
    Arc::new(move |object: &mut dyn Any, value| {
        let object = object.downcast_mut::<T>().ok_or_else(|| mismatch::<T>(&name))?;
        set(object, value).map_err(convert(&name))
    })
}

fn generic_getter<T: 'static>(name: Arc<str>, access: DynamicAccess<T>) -> Getter {
    Arc::new(move |object: &dyn Any| {
        let object = object.downcast_ref::<T>().ok_or_else(|| mismatch::<T>(&name))?;
        match (access.get)(object, &name) {
            Some(result) => result.map_err(convert(&name)),
            None => Err(AccessError::UnknownMember {
                member: name.to_string()
            })
        }
    })
}

fn generic_setter<T: 'static>(name: Arc<str>, access: DynamicAccess<T>) -> Setter {
    Arc::new(move |object: &mut dyn Any, value| {
        let object = object.downcast_mut::<T>().ok_or_else(|| mismatch::<T>(&name))?;
        match (access.set)(object, &name, value) {
            Some(result) => result.map_err(convert(&name)),
            None => Err(AccessError::UnknownMember {
                member: name.to_string()
            })
        }
    })
}
