// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layout bridge: how native code describes its types to the serializer.
//!
//! Each native struct, union and list is declared once against its schema
//! path. Members are reached through typed getter function pointers; the
//! serializer checks the Rust types against the declared schema types when
//! it binds.
//!
//! # Example
//!
//! ```
//! use schemapack::codec::OptionFlags;
//! use schemapack::reflect::Reflector;
//!
//! #[derive(Debug, Default)]
//! struct Track {
//!     flags: OptionFlags,
//!     id: u32,
//!     speed: f32,
//! }
//! schemapack::impl_message!(Track);
//!
//! let mut reflector = Reflector::new();
//! reflector
//!     .begin_struct::<Track>("demo.Track")
//!     .required_member("uint32", "id", |t| &t.id, |t| &mut t.id)
//!     .optional_member("float32", "speed", 0, |t| &t.speed, |t| &mut t.speed)
//!     .optional_flags(|t| &t.flags, |t| &mut t.flags)
//!     .register_message()
//!     .end();
//! assert!(reflector.layout("demo.Track").is_some());
//! ```

pub mod access;
pub mod layout;

pub use access::{
    Discriminant, FieldAccessor, ListAccess, MemberAccess, OptionAccessor, UnionDiscriminant,
    VecAccess,
};
pub use layout::{
    LayoutKind, ListLayout, MemberLayout, NativeLayout, StructLayout, UnionLayout,
    UnionOptionLayout,
};

use crate::codec::OptionFlags;
use crate::error::BindError;
use crate::message::{Message, MessageFactory};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Registry of native layouts, consumed by
/// [`Serializer::initialize`](crate::Serializer::initialize).
#[derive(Default)]
pub struct Reflector {
    layouts: Vec<NativeLayout>,
    by_path: HashMap<String, usize>,
    errors: Vec<BindError>,
}

impl Reflector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start declaring the native struct `T` for schema type `type_path`.
    pub fn begin_struct<T: Any + Send + Sync>(&mut self, type_path: &str) -> StructBuilder<'_, T> {
        StructBuilder {
            reflector: self,
            type_path: type_path.to_string(),
            layout: StructLayout::default(),
            _marker: PhantomData,
        }
    }

    /// Start declaring the native union `T`.
    ///
    /// `active` reports the option index currently held; `set_active`
    /// switches `T` to a default value of that option (or to none).
    pub fn begin_union<T: Any + Send + Sync>(
        &mut self,
        type_path: &str,
        active: fn(&T) -> Option<u8>,
        set_active: fn(&mut T, Option<u8>),
    ) -> UnionBuilder<'_, T> {
        self.begin_union_with(type_path, Arc::new(Discriminant::new(active, set_active)))
    }

    /// [`Self::begin_union`] with a custom discriminant.
    pub fn begin_union_with<T: Any + Send + Sync>(
        &mut self,
        type_path: &str,
        discriminant: Arc<dyn UnionDiscriminant>,
    ) -> UnionBuilder<'_, T> {
        UnionBuilder {
            reflector: self,
            type_path: type_path.to_string(),
            options: Vec::new(),
            discriminant,
            _marker: PhantomData,
        }
    }

    /// Declare `Vec<E>` as the native form of list type `list_path`, with
    /// elements stored as schema type `element_type`.
    pub fn register_list<E: Any + Default + Send + Sync>(
        &mut self,
        list_path: &str,
        element_type: &str,
    ) -> &mut Self {
        self.register_list_with::<Vec<E>>(list_path, element_type, Arc::new(VecAccess::<E>::new()))
    }

    /// Declare list type `list_path` with native container `L` and a custom accessor.
    pub fn register_list_with<L: Any>(
        &mut self,
        list_path: &str,
        element_type: &str,
        access: Arc<dyn ListAccess>,
    ) -> &mut Self {
        self.push(NativeLayout {
            type_path: list_path.to_string(),
            type_id: TypeId::of::<L>(),
            rust_name: std::any::type_name::<L>(),
            kind: LayoutKind::List(ListLayout {
                element_type: element_type.to_string(),
                access,
            }),
        });
        self
    }

    /// Message factory for an already declared struct.
    pub fn register_message_factory(&mut self, type_path: &str, factory: MessageFactory) -> bool {
        let Some(&i) = self.by_path.get(type_path) else {
            return false;
        };
        match &mut self.layouts[i].kind {
            LayoutKind::Struct(st) => {
                st.factory = Some(factory);
                true
            }
            _ => false,
        }
    }

    pub fn layout(&self, type_path: &str) -> Option<&NativeLayout> {
        self.by_path.get(type_path).map(|&i| &self.layouts[i])
    }

    pub fn layouts(&self) -> impl Iterator<Item = &NativeLayout> {
        self.layouts.iter()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Registration problems, reported by the serializer on bind.
    pub fn errors(&self) -> &[BindError] {
        &self.errors
    }

    pub(crate) fn into_parts(self) -> (Vec<NativeLayout>, Vec<BindError>) {
        (self.layouts, self.errors)
    }

    fn push(&mut self, layout: NativeLayout) {
        if self.by_path.contains_key(&layout.type_path) {
            log::debug!("[reflect] duplicate layout for {}", layout.type_path);
            self.errors.push(BindError::DuplicateLayout {
                type_path: layout.type_path,
            });
            return;
        }
        self.by_path
            .insert(layout.type_path.clone(), self.layouts.len());
        self.layouts.push(layout);
    }
}

/// Builder for a native struct layout; finish with [`StructBuilder::end`].
#[must_use = "call end() to register the layout"]
pub struct StructBuilder<'r, T> {
    reflector: &'r mut Reflector,
    type_path: String,
    layout: StructLayout,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T: Any + Send + Sync> StructBuilder<'r, T> {
    /// Member always present on the wire.
    pub fn required_member<F: Any>(
        self,
        type_name: &str,
        field: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.member_with(type_name, field, None, Arc::new(FieldAccessor::new(get, get_mut)))
    }

    /// Member present when flag `option_index` is set.
    pub fn optional_member<F: Any>(
        self,
        type_name: &str,
        field: &str,
        option_index: u16,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.member_with(
            type_name,
            field,
            Some(option_index),
            Arc::new(FieldAccessor::new(get, get_mut)),
        )
    }

    /// Member with a custom accessor.
    pub fn member_with(
        mut self,
        type_name: &str,
        field: &str,
        option_index: Option<u16>,
        access: Arc<dyn MemberAccess>,
    ) -> Self {
        self.layout.members.push(MemberLayout {
            field: field.to_string(),
            type_name: type_name.to_string(),
            option_index,
            access,
        });
        self
    }

    /// Location of the struct's [`OptionFlags`].
    pub fn optional_flags(
        self,
        get: fn(&T) -> &OptionFlags,
        get_mut: fn(&mut T) -> &mut OptionFlags,
    ) -> Self {
        self.optional_flags_with(Arc::new(FieldAccessor::new(get, get_mut)))
    }

    pub fn optional_flags_with(mut self, access: Arc<dyn MemberAccess>) -> Self {
        self.layout.flags = Some(access);
        self
    }

    /// Make the struct decodable as a framed message.
    pub fn register_message(self) -> Self
    where
        T: Message + Default,
    {
        self.message_factory(Arc::new(|| Box::new(T::default()) as Box<dyn Message>))
    }

    pub fn message_factory(mut self, factory: MessageFactory) -> Self {
        self.layout.factory = Some(factory);
        self
    }

    pub fn end(self) {
        self.reflector.push(NativeLayout {
            type_path: self.type_path,
            type_id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            kind: LayoutKind::Struct(self.layout),
        });
    }
}

/// Builder for a native union layout; finish with [`UnionBuilder::end`].
#[must_use = "call end() to register the layout"]
pub struct UnionBuilder<'r, T> {
    reflector: &'r mut Reflector,
    type_path: String,
    options: Vec<UnionOptionLayout>,
    discriminant: Arc<dyn UnionDiscriminant>,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T: Any + Send + Sync> UnionBuilder<'r, T> {
    /// Option `index` stored as schema type `type_name`, reachable while active.
    pub fn option<F: Any>(
        self,
        type_name: &str,
        field: &str,
        index: u8,
        get: fn(&T) -> Option<&F>,
        get_mut: fn(&mut T) -> Option<&mut F>,
    ) -> Self {
        self.option_with(type_name, field, index, Arc::new(OptionAccessor::new(get, get_mut)))
    }

    pub fn option_with(
        mut self,
        type_name: &str,
        field: &str,
        index: u8,
        access: Arc<dyn MemberAccess>,
    ) -> Self {
        self.options.push(UnionOptionLayout {
            field: field.to_string(),
            type_name: type_name.to_string(),
            index,
            access,
        });
        self
    }

    pub fn end(self) {
        self.reflector.push(NativeLayout {
            type_path: self.type_path,
            type_id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            kind: LayoutKind::Union(UnionLayout {
                options: self.options,
                discriminant: self.discriminant,
            }),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Point {
        x: f64,
        y: f64,
    }

    #[derive(Debug, Default)]
    enum Shape {
        #[default]
        Empty,
        Radius(f64),
    }

    #[test]
    fn test_struct_layout_recorded() {
        let mut reflector = Reflector::new();
        reflector
            .begin_struct::<Point>("geo.Point")
            .required_member("double", "x", |p| &p.x, |p| &mut p.x)
            .required_member("double", "y", |p| &p.y, |p| &mut p.y)
            .end();
        let layout = reflector.layout("geo.Point").unwrap();
        assert_eq!(layout.type_id, TypeId::of::<Point>());
        let LayoutKind::Struct(st) = &layout.kind else {
            panic!("expected struct layout");
        };
        assert_eq!(st.members.len(), 2);
        assert!(st.member("y").is_some());
        assert!(st.flags.is_none());
    }

    #[test]
    fn test_union_and_list_layouts() {
        let mut reflector = Reflector::new();
        reflector
            .begin_union::<Shape>(
                "geo.Shape",
                |s| match s {
                    Shape::Empty => None,
                    Shape::Radius(_) => Some(0),
                },
                |s, tag| {
                    *s = match tag {
                        Some(0) => Shape::Radius(0.0),
                        _ => Shape::Empty,
                    }
                },
            )
            .option(
                "double",
                "radius",
                0,
                |s| match s {
                    Shape::Radius(r) => Some(r),
                    Shape::Empty => None,
                },
                |s| match s {
                    Shape::Radius(r) => Some(r),
                    Shape::Empty => None,
                },
            )
            .end();
        reflector.register_list::<Point>("geo.Points", "geo.Point");

        assert_eq!(reflector.len(), 2);
        let list = reflector.layout("geo.Points").unwrap();
        assert_eq!(list.type_id, TypeId::of::<Vec<Point>>());
        assert!(matches!(&list.kind, LayoutKind::List(l) if l.access.element_size() == 16));
    }

    #[test]
    fn test_duplicate_layout_is_reported() {
        let mut reflector = Reflector::new();
        reflector.register_list::<i32>("L", "int32");
        reflector.register_list::<i64>("L", "int64");
        assert_eq!(reflector.len(), 1);
        assert_eq!(
            reflector.errors(),
            &[BindError::DuplicateLayout {
                type_path: "L".into()
            }]
        );
    }
}
