// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native layouts declared through the [`Reflector`](super::Reflector).

use super::access::{ListAccess, MemberAccess, UnionDiscriminant};
use crate::message::MessageFactory;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// One native struct member.
#[derive(Clone)]
pub struct MemberLayout {
    pub field: String,
    /// Schema type name of the native storage (`int32`, `demo.Point`, ...).
    pub type_name: String,
    pub option_index: Option<u16>,
    pub access: Arc<dyn MemberAccess>,
}

#[derive(Clone, Default)]
pub struct StructLayout {
    pub members: Vec<MemberLayout>,
    /// Accessor to the [`OptionFlags`](crate::codec::OptionFlags) member.
    pub flags: Option<Arc<dyn MemberAccess>>,
    pub factory: Option<MessageFactory>,
}

impl StructLayout {
    pub fn member(&self, field: &str) -> Option<&MemberLayout> {
        self.members.iter().find(|m| m.field == field)
    }
}

#[derive(Clone)]
pub struct UnionOptionLayout {
    pub field: String,
    pub type_name: String,
    pub index: u8,
    pub access: Arc<dyn MemberAccess>,
}

#[derive(Clone)]
pub struct UnionLayout {
    pub options: Vec<UnionOptionLayout>,
    pub discriminant: Arc<dyn UnionDiscriminant>,
}

impl UnionLayout {
    pub fn option(&self, field: &str) -> Option<&UnionOptionLayout> {
        self.options.iter().find(|o| o.field == field)
    }
}

#[derive(Clone)]
pub struct ListLayout {
    pub element_type: String,
    pub access: Arc<dyn ListAccess>,
}

#[derive(Clone)]
pub enum LayoutKind {
    Struct(StructLayout),
    Union(UnionLayout),
    List(ListLayout),
}

impl LayoutKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Struct(_) => "struct",
            Self::Union(_) => "union",
            Self::List(_) => "list",
        }
    }
}

/// Layout of one native type, keyed by its schema path.
#[derive(Clone)]
pub struct NativeLayout {
    pub type_path: String,
    pub type_id: TypeId,
    /// `std::any::type_name` of the native type.
    pub rust_name: &'static str,
    pub kind: LayoutKind,
}

impl fmt::Debug for NativeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("NativeLayout");
        s.field("type_path", &self.type_path)
            .field("rust_name", &self.rust_name)
            .field("kind", &self.kind.name());
        match &self.kind {
            LayoutKind::Struct(st) => {
                let members: Vec<_> = st.members.iter().map(|m| m.field.as_str()).collect();
                s.field("members", &members)
                    .field("flags", &st.flags.is_some())
                    .field("message", &st.factory.is_some());
            }
            LayoutKind::Union(un) => {
                let options: Vec<_> = un.options.iter().map(|o| (o.index, o.field.as_str())).collect();
                s.field("options", &options);
            }
            LayoutKind::List(list) => {
                s.field("element_type", &list.element_type)
                    .field("element_size", &list.access.element_size());
            }
        }
        s.finish()
    }
}
