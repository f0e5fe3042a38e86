// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-shaped values built at runtime.

use crate::codec::OptionFlags;
use crate::message::Message;
use crate::schema::TypeIndex;
use crate::wire::Scalar;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// One field value of a dynamic record, union or list.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    Scalar(Scalar),
    String(String),
    Record(DynamicRecord),
    Union(DynamicUnion),
    List(DynamicList),
}

impl DynamicValue {
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&DynamicRecord> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut DynamicRecord> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&DynamicUnion> {
        match self {
            Self::Union(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_union_mut(&mut self) -> Option<&mut DynamicUnion> {
        match self {
            Self::Union(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&DynamicList> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut DynamicList> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Rust type the codecs see through [`Self::as_any`].
    pub(crate) fn native_type(&self) -> TypeId {
        match self {
            Self::Scalar(s) => s.kind().native_type_id(),
            Self::String(_) => TypeId::of::<String>(),
            Self::Record(_) => TypeId::of::<DynamicRecord>(),
            Self::Union(_) => TypeId::of::<DynamicUnion>(),
            Self::List(_) => TypeId::of::<DynamicList>(),
        }
    }

    /// The payload, as the plain Rust value a static layout would hold.
    pub(crate) fn as_any(&self) -> &dyn Any {
        match self {
            Self::Scalar(s) => match s {
                Scalar::I8(v) => v,
                Scalar::U8(v) => v,
                Scalar::I16(v) => v,
                Scalar::U16(v) => v,
                Scalar::I32(v) => v,
                Scalar::U32(v) => v,
                Scalar::I64(v) => v,
                Scalar::U64(v) => v,
                Scalar::F32(v) => v,
                Scalar::F64(v) => v,
            },
            Self::String(v) => v,
            Self::Record(v) => v,
            Self::Union(v) => v,
            Self::List(v) => v,
        }
    }

    pub(crate) fn as_any_mut(&mut self) -> &mut dyn Any {
        match self {
            Self::Scalar(s) => match s {
                Scalar::I8(v) => v,
                Scalar::U8(v) => v,
                Scalar::I16(v) => v,
                Scalar::U16(v) => v,
                Scalar::I32(v) => v,
                Scalar::U32(v) => v,
                Scalar::I64(v) => v,
                Scalar::U64(v) => v,
                Scalar::F32(v) => v,
                Scalar::F64(v) => v,
            },
            Self::String(v) => v,
            Self::Record(v) => v,
            Self::Union(v) => v,
            Self::List(v) => v,
        }
    }
}

macro_rules! impl_from_scalar {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$t> for DynamicValue {
                fn from(v: $t) -> Self {
                    Self::Scalar(Scalar::$variant(v))
                }
            }
        )+
    };
}

impl_from_scalar!(
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);

impl From<Scalar> for DynamicValue {
    fn from(v: Scalar) -> Self {
        Self::Scalar(v)
    }
}

impl From<String> for DynamicValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<DynamicRecord> for DynamicValue {
    fn from(v: DynamicRecord) -> Self {
        Self::Record(v)
    }
}

impl From<DynamicUnion> for DynamicValue {
    fn from(v: DynamicUnion) -> Self {
        Self::Union(v)
    }
}

impl From<DynamicList> for DynamicValue {
    fn from(v: DynamicList) -> Self {
        Self::List(v)
    }
}

/// Where a record field's presence lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Presence {
    Required,
    Optional(u16),
    /// Flag only, no value slot.
    Bit(u16),
}

#[derive(Debug)]
pub(crate) struct RecordField {
    pub name: String,
    pub ty: TypeIndex,
    pub presence: Presence,
    /// Index into `DynamicRecord::values`; `None` for bits and obsolete fields.
    pub slot: Option<usize>,
    /// Parsed schema default.
    pub default: Option<DynamicValue>,
}

#[derive(Debug)]
pub(crate) struct RecordShape {
    pub type_path: String,
    pub fields: Vec<RecordField>,
    pub default_flags: OptionFlags,
}

impl RecordShape {
    fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A struct value laid out from the schema at runtime.
#[derive(Clone)]
pub struct DynamicRecord {
    pub(crate) shape: Arc<RecordShape>,
    pub(crate) flags: OptionFlags,
    pub(crate) values: Vec<DynamicValue>,
}

impl DynamicRecord {
    pub fn type_path(&self) -> &str {
        &self.shape.type_path
    }

    pub fn flags(&self) -> &OptionFlags {
        &self.flags
    }

    /// Field names, base fields first.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.shape.fields.iter().map(|f| f.name.as_str())
    }

    /// Value of a non-bit field, present or not.
    pub fn get(&self, field: &str) -> Option<&DynamicValue> {
        let slot = self.shape.field(field)?.slot?;
        self.values.get(slot)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut DynamicValue> {
        let slot = self.shape.field(field)?.slot?;
        self.values.get_mut(slot)
    }

    /// Store `value` and mark an optional field present. False when the
    /// field is unknown or `value` has the wrong type.
    pub fn set(&mut self, field: &str, value: impl Into<DynamicValue>) -> bool {
        let value = value.into();
        let Some(entry) = self.shape.field(field) else {
            return false;
        };
        let Some(slot) = entry.slot else {
            return false;
        };
        let presence = entry.presence;
        match self.values.get_mut(slot) {
            Some(current) if current.native_type() == value.native_type() => *current = value,
            _ => return false,
        }
        if let Presence::Optional(i) = presence {
            self.flags.set(i, true);
        }
        true
    }

    /// Whether the field goes on the wire (required fields always do).
    pub fn is_present(&self, field: &str) -> bool {
        match self.shape.field(field).map(|f| f.presence) {
            Some(Presence::Required) => true,
            Some(Presence::Optional(i) | Presence::Bit(i)) => self.flags.get(i),
            None => false,
        }
    }

    /// Mark an optional field absent.
    pub fn clear(&mut self, field: &str) -> bool {
        match self.shape.field(field).map(|f| f.presence) {
            Some(Presence::Optional(i)) => {
                self.flags.set(i, false);
                true
            }
            _ => false,
        }
    }

    pub fn bit(&self, field: &str) -> Option<bool> {
        match self.shape.field(field)?.presence {
            Presence::Bit(i) => Some(self.flags.get(i)),
            _ => None,
        }
    }

    pub fn set_bit(&mut self, field: &str, value: bool) -> bool {
        match self.shape.field(field).map(|f| f.presence) {
            Some(Presence::Bit(i)) => {
                self.flags.set(i, value);
                true
            }
            _ => false,
        }
    }
}

impl PartialEq for DynamicRecord {
    fn eq(&self, other: &Self) -> bool {
        self.shape.type_path == other.shape.type_path
            && self.flags == other.flags
            && self.values == other.values
    }
}

impl fmt::Debug for DynamicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("DynamicRecord");
        out.field("type", &self.shape.type_path);
        for field in &self.shape.fields {
            match (field.presence, field.slot) {
                (Presence::Bit(i), _) => {
                    out.field(&field.name, &self.flags.get(i));
                }
                (Presence::Optional(i), Some(_)) if !self.flags.get(i) => {}
                (_, Some(slot)) => {
                    if let Some(value) = self.values.get(slot) {
                        out.field(&field.name, value);
                    }
                }
                (_, None) => {}
            }
        }
        out.finish()
    }
}

impl Message for DynamicRecord {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn schema_type(&self) -> Option<&str> {
        Some(&self.shape.type_path)
    }
}

#[derive(Debug)]
pub(crate) struct UnionShape {
    pub type_path: String,
    /// `(tag, name, type)` per option.
    pub options: Vec<(u8, String, TypeIndex)>,
}

/// A union value: at most one active option.
#[derive(Clone)]
pub struct DynamicUnion {
    pub(crate) shape: Arc<UnionShape>,
    pub(crate) active: Option<(u8, Box<DynamicValue>)>,
}

impl DynamicUnion {
    pub fn type_path(&self) -> &str {
        &self.shape.type_path
    }

    /// Name and value of the active option.
    pub fn active(&self) -> Option<(&str, &DynamicValue)> {
        let (tag, value) = self.active.as_ref()?;
        let name = self
            .shape
            .options
            .iter()
            .find(|(t, _, _)| t == tag)
            .map(|(_, name, _)| name.as_str())?;
        Some((name, value))
    }

    pub fn active_mut(&mut self) -> Option<&mut DynamicValue> {
        self.active.as_mut().map(|(_, v)| v.as_mut())
    }

    /// Select option `name` holding `value`. False when the option is
    /// unknown.
    pub fn set(&mut self, name: &str, value: impl Into<DynamicValue>) -> bool {
        let Some(tag) = self
            .shape
            .options
            .iter()
            .find(|(_, n, _)| n == name)
            .map(|(t, _, _)| *t)
        else {
            return false;
        };
        self.active = Some((tag, Box::new(value.into())));
        true
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}

impl PartialEq for DynamicUnion {
    fn eq(&self, other: &Self) -> bool {
        self.shape.type_path == other.shape.type_path && self.active == other.active
    }
}

impl fmt::Debug for DynamicUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.active() {
            Some((name, value)) => write!(f, "{}::{}({:?})", self.shape.type_path, name, value),
            None => write!(f, "{}::<none>", self.shape.type_path),
        }
    }
}

/// A list value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicList {
    pub(crate) items: Vec<DynamicValue>,
}

impl DynamicList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DynamicValue> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DynamicValue> {
        self.items.iter()
    }

    /// Append an element. Elements must share the list's element type for
    /// the list to encode.
    pub fn push(&mut self, value: impl Into<DynamicValue>) {
        self.items.push(value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_any_exposes_plain_payload() {
        let value = DynamicValue::from(7u16);
        assert_eq!(value.as_any().downcast_ref::<u16>(), Some(&7));
        assert_eq!(value.native_type(), TypeId::of::<u16>());

        let mut text = DynamicValue::from("abc");
        if let Some(s) = text.as_any_mut().downcast_mut::<String>() {
            s.push('d');
        }
        assert_eq!(text.as_str(), Some("abcd"));
    }

    #[test]
    fn test_list_push() {
        let mut list = DynamicList::default();
        list.push(1.5f64);
        list.push(2.5f64);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).and_then(DynamicValue::as_scalar), Some(Scalar::F64(2.5)));
    }
}
