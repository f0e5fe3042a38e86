// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Union codec.

use super::{mismatch, Binding, CodecTable};
use crate::error::CodecError;
use crate::reflect::UnionDiscriminant;
use crate::schema::{TypeIndex, UNION_NONE_TAG};
use crate::wire::{Cursor, PackBuffer};
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

pub(crate) struct PlanOption {
    /// Wire tag.
    pub index: u8,
    pub name: String,
    pub ty: TypeIndex,
}

pub(crate) struct UnionPlan {
    pub options: Vec<PlanOption>,
}

impl UnionPlan {
    fn position(&self, tag: u8) -> Option<usize> {
        self.options.iter().position(|o| o.index == tag)
    }
}

/// Native option bound to a schema option.
pub(crate) struct OptionBinding {
    /// Index the native discriminant uses for this option.
    pub native_index: u8,
    pub binding: Binding,
}

pub(crate) struct UnionCodec {
    /// Parallel to `UnionPlan::options`; `None` is skip-only.
    pub options: Vec<Option<OptionBinding>>,
    pub discriminant: Arc<dyn UnionDiscriminant>,
}

fn invalid_tag(table: &CodecTable, ty: TypeIndex, tag: u8) -> CodecError {
    CodecError::InvalidUnionTag {
        type_path: table.path(ty).to_string(),
        tag,
    }
}

pub(super) fn read(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &UnionPlan,
    codec: &UnionCodec,
    cur: &mut Cursor<'_>,
    native: &mut dyn Any,
    depth: usize,
) -> Result<(), CodecError> {
    table.check_native(ty, &*native)?;
    let tag = cur.read_u8()?;
    if tag == UNION_NONE_TAG {
        codec.discriminant.set_active(native, None);
        return Ok(());
    }
    let pos = plan.position(tag).ok_or_else(|| invalid_tag(table, ty, tag))?;
    match &codec.options[pos] {
        Some(option) => {
            if !codec.discriminant.set_active(native, Some(option.native_index)) {
                return Err(mismatch(table.path(ty)));
            }
            let value = option
                .binding
                .access
                .get_mut(native)
                .ok_or_else(|| mismatch(table.path(ty)))?;
            table.read_field(&option.binding.codec, cur, value, depth + 1)
        }
        None => {
            // Known to the schema, absent locally.
            table.skip_at(plan.options[pos].ty, cur, depth + 1)?;
            codec.discriminant.set_active(native, None);
            Ok(())
        }
    }
}

/// Active option with its plan entry, `None` when unset.
fn active<'a>(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &'a UnionPlan,
    codec: &'a UnionCodec,
    native: &dyn Any,
) -> Result<Option<(&'a PlanOption, &'a OptionBinding)>, CodecError> {
    let Some(native_index) = codec
        .discriminant
        .active(native)
        .ok_or_else(|| mismatch(table.path(ty)))?
    else {
        return Ok(None);
    };
    plan.options
        .iter()
        .zip(&codec.options)
        .find_map(|(opt, b)| b.as_ref().filter(|b| b.native_index == native_index).map(|b| (opt, b)))
        .map(Some)
        .ok_or_else(|| CodecError::UnencodableOption {
            type_path: table.path(ty).to_string(),
            index: native_index,
        })
}

pub(super) fn write(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &UnionPlan,
    codec: &UnionCodec,
    buf: &mut PackBuffer,
    native: &dyn Any,
) -> Result<(), CodecError> {
    table.check_native(ty, native)?;
    let Some((option, bound)) = active(table, ty, plan, codec, native)? else {
        buf.write_u8(UNION_NONE_TAG);
        return Ok(());
    };
    let value = bound
        .binding
        .access
        .get(native)
        .ok_or_else(|| CodecError::UnencodableOption {
            type_path: table.path(ty).to_string(),
            index: bound.native_index,
        })?;
    buf.write_u8(option.index);
    table.write_field(&bound.binding.codec, buf, value)
}

pub(super) fn skip(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &UnionPlan,
    cur: &mut Cursor<'_>,
    depth: usize,
) -> Result<(), CodecError> {
    let tag = cur.read_u8()?;
    if tag == UNION_NONE_TAG {
        return Ok(());
    }
    let pos = plan.position(tag).ok_or_else(|| invalid_tag(table, ty, tag))?;
    table.skip_at(plan.options[pos].ty, cur, depth + 1)
}

pub(super) fn write_default(buf: &mut PackBuffer) {
    buf.write_u8(UNION_NONE_TAG);
}

/// `null` when unset, else `{ "<option>": value }`.
pub(super) fn print(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &UnionPlan,
    codec: &UnionCodec,
    native: &dyn Any,
) -> Result<Value, CodecError> {
    table.check_native(ty, native)?;
    let Some((option, bound)) = active(table, ty, plan, codec, native)? else {
        return Ok(Value::Null);
    };
    let value = bound
        .binding
        .access
        .get(native)
        .ok_or_else(|| mismatch(table.path(ty)))?;
    let mut out = Map::new();
    out.insert(
        option.name.clone(),
        table.print_field(option.ty, &bound.binding.codec, value)?,
    );
    Ok(Value::Object(out))
}
