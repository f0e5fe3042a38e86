// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Struct codec.

use super::{mismatch, Binding, CodecTable, OptionFlags};
use crate::error::CodecError;
use crate::reflect::MemberAccess;
use crate::schema::TypeIndex;
use crate::wire::{Cursor, PackBuffer};
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

/// Where a field's presence is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldSlot {
    Required,
    Optional(u16),
    /// Boolean stored in the flags, no payload.
    Bit(u16),
}

pub(crate) struct PlanField {
    pub name: String,
    pub ty: TypeIndex,
    pub slot: FieldSlot,
    pub obsolete: bool,
}

impl PlanField {
    /// Whether the field carries payload bytes under `flags`.
    fn has_payload(&self, flags: &OptionFlags) -> bool {
        match self.slot {
            FieldSlot::Required => true,
            FieldSlot::Optional(i) => flags.get(i),
            FieldSlot::Bit(_) => false,
        }
    }
}

/// Flattened wire form: base fields first.
pub(crate) struct StructPlan {
    pub flag_bytes: usize,
    pub fields: Vec<PlanField>,
}

pub(crate) struct StructCodec {
    /// Parallel to `StructPlan::fields`; `None` is skip-only.
    pub fields: Vec<Option<Binding>>,
    pub flags: Option<Arc<dyn MemberAccess>>,
    /// Flags the native side can honour: bits plus bound optionals.
    pub writable: OptionFlags,
}

pub(super) fn read(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &StructPlan,
    codec: &StructCodec,
    cur: &mut Cursor<'_>,
    native: &mut dyn Any,
    depth: usize,
) -> Result<(), CodecError> {
    table.check_native(ty, &*native)?;
    let flags = OptionFlags::read(cur, plan.flag_bytes)?;
    if let Some(access) = &codec.flags {
        let slot = access
            .get_mut(native)
            .and_then(|v| v.downcast_mut::<OptionFlags>())
            .ok_or_else(|| mismatch(table.path(ty)))?;
        *slot = flags;
    }
    for (field, binding) in plan.fields.iter().zip(&codec.fields) {
        if !field.has_payload(&flags) {
            continue;
        }
        match binding {
            Some(b) => {
                let member = b
                    .access
                    .get_mut(native)
                    .ok_or_else(|| mismatch(table.path(ty)))?;
                table.read_field(&b.codec, cur, member, depth + 1)?;
            }
            None => table.skip_at(field.ty, cur, depth + 1)?,
        }
    }
    Ok(())
}

fn native_flags(
    table: &CodecTable,
    ty: TypeIndex,
    codec: &StructCodec,
    native: &dyn Any,
) -> Result<OptionFlags, CodecError> {
    match &codec.flags {
        Some(access) => access
            .get(native)
            .and_then(|v| v.downcast_ref::<OptionFlags>())
            .copied()
            .ok_or_else(|| mismatch(table.path(ty))),
        None => Ok(OptionFlags::new()),
    }
}

pub(super) fn write(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &StructPlan,
    codec: &StructCodec,
    buf: &mut PackBuffer,
    native: &dyn Any,
) -> Result<(), CodecError> {
    table.check_native(ty, native)?;
    let flags = native_flags(table, ty, codec, native)?.intersect(&codec.writable);
    flags.write(buf, plan.flag_bytes);
    for (field, binding) in plan.fields.iter().zip(&codec.fields) {
        if !field.has_payload(&flags) {
            continue;
        }
        match binding {
            Some(b) => {
                let member = b.access.get(native).ok_or_else(|| mismatch(table.path(ty)))?;
                table.write_field(&b.codec, buf, member)?;
            }
            // Required on the wire but unknown locally.
            None => table.write_default(field.ty, buf),
        }
    }
    Ok(())
}

pub(super) fn skip(
    table: &CodecTable,
    plan: &StructPlan,
    cur: &mut Cursor<'_>,
    depth: usize,
) -> Result<(), CodecError> {
    let flags = OptionFlags::read(cur, plan.flag_bytes)?;
    for field in &plan.fields {
        if field.has_payload(&flags) {
            table.skip_at(field.ty, cur, depth + 1)?;
        }
    }
    Ok(())
}

pub(super) fn write_default(table: &CodecTable, plan: &StructPlan, buf: &mut PackBuffer) {
    buf.reserve_zeroed(plan.flag_bytes);
    for field in &plan.fields {
        if field.slot == FieldSlot::Required {
            table.write_default(field.ty, buf);
        }
    }
}

pub(super) fn print(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &StructPlan,
    codec: &StructCodec,
    native: &dyn Any,
) -> Result<Value, CodecError> {
    table.check_native(ty, native)?;
    let flags = native_flags(table, ty, codec, native)?;
    let mut out = Map::new();
    out.insert("type".into(), Value::String(table.path(ty).to_string()));
    for (field, binding) in plan.fields.iter().zip(&codec.fields) {
        match field.slot {
            FieldSlot::Bit(i) => {
                if codec.flags.is_some() {
                    out.insert(field.name.clone(), Value::Bool(flags.get(i)));
                }
                continue;
            }
            FieldSlot::Optional(i) if !flags.get(i) => continue,
            _ => {}
        }
        if let Some(b) = binding {
            let member = b.access.get(native).ok_or_else(|| mismatch(table.path(ty)))?;
            out.insert(field.name.clone(), table.print_field(field.ty, &b.codec, member)?);
        }
    }
    Ok(Value::Object(out))
}
