// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-erased accessors over native values.
//!
//! Native code hands typed getter function pointers to the
//! [`Reflector`](super::Reflector); they are wrapped here so codecs can walk
//! any layout through `&dyn Any`.

use std::any::{Any, TypeId};
use std::marker::PhantomData;

/// Access to one member of an owner value.
pub trait MemberAccess: Send + Sync {
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any>;

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any>;

    /// Rust type of the member.
    fn value_type(&self) -> TypeId;
}

/// Plain struct member.
pub struct FieldAccessor<T, F> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
}

impl<T, F> FieldAccessor<T, F> {
    pub fn new(get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self {
        Self { get, get_mut }
    }
}

impl<T: Any, F: Any> MemberAccess for FieldAccessor<T, F> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        owner
            .downcast_ref::<T>()
            .map(|o| (self.get)(o) as &dyn Any)
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        owner
            .downcast_mut::<T>()
            .map(|o| (self.get_mut)(o) as &mut dyn Any)
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<F>()
    }
}

/// Union option: only reachable while the option is active.
pub struct OptionAccessor<T, F> {
    get: fn(&T) -> Option<&F>,
    get_mut: fn(&mut T) -> Option<&mut F>,
}

impl<T, F> OptionAccessor<T, F> {
    pub fn new(get: fn(&T) -> Option<&F>, get_mut: fn(&mut T) -> Option<&mut F>) -> Self {
        Self { get, get_mut }
    }
}

impl<T: Any, F: Any> MemberAccess for OptionAccessor<T, F> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        owner
            .downcast_ref::<T>()
            .and_then(|o| (self.get)(o))
            .map(|v| v as &dyn Any)
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        owner
            .downcast_mut::<T>()
            .and_then(|o| (self.get_mut)(o))
            .map(|v| v as &mut dyn Any)
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<F>()
    }
}

/// Active-option getter and discriminant setter of a native union.
pub trait UnionDiscriminant: Send + Sync {
    /// `None` when `owner` is not of the union's Rust type.
    fn active(&self, owner: &dyn Any) -> Option<Option<u8>>;

    /// Select option `tag` (or none), resetting the option value. Returns
    /// false when `owner` is not of the union's Rust type.
    fn set_active(&self, owner: &mut dyn Any, tag: Option<u8>) -> bool;
}

pub struct Discriminant<T> {
    active: fn(&T) -> Option<u8>,
    set_active: fn(&mut T, Option<u8>),
}

impl<T> Discriminant<T> {
    pub fn new(active: fn(&T) -> Option<u8>, set_active: fn(&mut T, Option<u8>)) -> Self {
        Self { active, set_active }
    }
}

impl<T: Any> UnionDiscriminant for Discriminant<T> {
    fn active(&self, owner: &dyn Any) -> Option<Option<u8>> {
        owner.downcast_ref::<T>().map(self.active)
    }

    fn set_active(&self, owner: &mut dyn Any, tag: Option<u8>) -> bool {
        match owner.downcast_mut::<T>() {
            Some(o) => {
                (self.set_active)(o, tag);
                true
            }
            None => false,
        }
    }
}

/// Growable sequence of elements.
pub trait ListAccess: Send + Sync {
    fn len(&self, list: &dyn Any) -> Option<usize>;

    /// Resize to `len` elements, filling with defaults. False on type mismatch.
    fn resize(&self, list: &mut dyn Any, len: usize) -> bool;

    fn element<'a>(&self, list: &'a dyn Any, index: usize) -> Option<&'a dyn Any>;

    fn element_mut<'a>(&self, list: &'a mut dyn Any, index: usize) -> Option<&'a mut dyn Any>;

    fn element_type(&self) -> TypeId;

    /// In-memory element stride.
    fn element_size(&self) -> usize;
}

/// [`ListAccess`] over `Vec<E>`.
pub struct VecAccess<E>(PhantomData<fn() -> E>);

impl<E> VecAccess<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for VecAccess<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Any + Default> ListAccess for VecAccess<E> {
    fn len(&self, list: &dyn Any) -> Option<usize> {
        list.downcast_ref::<Vec<E>>().map(Vec::len)
    }

    fn resize(&self, list: &mut dyn Any, len: usize) -> bool {
        match list.downcast_mut::<Vec<E>>() {
            Some(v) => {
                v.clear();
                v.resize_with(len, E::default);
                true
            }
            None => false,
        }
    }

    fn element<'a>(&self, list: &'a dyn Any, index: usize) -> Option<&'a dyn Any> {
        list.downcast_ref::<Vec<E>>()?
            .get(index)
            .map(|e| e as &dyn Any)
    }

    fn element_mut<'a>(&self, list: &'a mut dyn Any, index: usize) -> Option<&'a mut dyn Any> {
        list.downcast_mut::<Vec<E>>()?
            .get_mut(index)
            .map(|e| e as &mut dyn Any)
    }

    fn element_type(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn element_size(&self) -> usize {
        std::mem::size_of::<E>()
    }
}
