// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! List codec.

use super::{mismatch, CodecTable, FieldCodec, WirePlan};
use crate::error::CodecError;
use crate::reflect::ListAccess;
use crate::schema::TypeIndex;
use crate::wire::{Cursor, PackBuffer};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

pub(crate) struct ListPlan {
    pub element: TypeIndex,
}

pub(crate) struct ListCodec {
    pub access: Arc<dyn ListAccess>,
    pub element: FieldCodec,
}

/// Fail early when `count` elements cannot fit in the remaining input.
///
/// Elements that may occupy no bytes at all are capped separately, since the
/// remaining input does not bound their count.
fn check_count(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &ListPlan,
    cur: &Cursor<'_>,
    count: usize,
) -> Result<(), CodecError> {
    let min = table.entry(plan.element).min_wire_size;
    if min == 0 && count > table.limits.max_zero_size_elements {
        log::debug!(
            "[codec] {} claims {} zero-size elements",
            table.path(ty),
            count
        );
        return Err(CodecError::ListTooLong {
            type_path: table.path(ty).to_string(),
            count,
            limit: table.limits.max_zero_size_elements,
        });
    }
    let need = count.saturating_mul(min);
    if need > cur.remaining() {
        return Err(CodecError::UnexpectedEof {
            offset: cur.offset(),
            need,
            have: cur.remaining(),
        });
    }
    Ok(())
}

pub(super) fn read(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &ListPlan,
    codec: &ListCodec,
    cur: &mut Cursor<'_>,
    native: &mut dyn Any,
    depth: usize,
) -> Result<(), CodecError> {
    table.check_native(ty, &*native)?;
    let count = cur.read_length()?;
    check_count(table, ty, plan, cur, count)?;
    if !codec.access.resize(native, count) {
        return Err(mismatch(table.path(ty)));
    }
    for i in 0..count {
        let element = codec
            .access
            .element_mut(native, i)
            .ok_or_else(|| mismatch(table.path(ty)))?;
        table.read_field(&codec.element, cur, element, depth + 1)?;
    }
    Ok(())
}

pub(super) fn write(
    table: &CodecTable,
    ty: TypeIndex,
    codec: &ListCodec,
    buf: &mut PackBuffer,
    native: &dyn Any,
) -> Result<(), CodecError> {
    table.check_native(ty, native)?;
    let len = codec
        .access
        .len(native)
        .ok_or_else(|| mismatch(table.path(ty)))?;
    buf.write_length(len)?;
    for i in 0..len {
        let element = codec
            .access
            .element(native, i)
            .ok_or_else(|| mismatch(table.path(ty)))?;
        table.write_field(&codec.element, buf, element)?;
    }
    Ok(())
}

pub(super) fn skip(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &ListPlan,
    cur: &mut Cursor<'_>,
    depth: usize,
) -> Result<(), CodecError> {
    let count = cur.read_length()?;
    check_count(table, ty, plan, cur, count)?;
    if let WirePlan::Basic(kind) = &table.entry(plan.element).plan {
        if let Some(size) = kind.wire_size() {
            return cur.skip(count * size);
        }
    }
    for _ in 0..count {
        table.skip_at(plan.element, cur, depth + 1)?;
    }
    Ok(())
}

pub(super) fn print(
    table: &CodecTable,
    ty: TypeIndex,
    plan: &ListPlan,
    codec: &ListCodec,
    native: &dyn Any,
) -> Result<Value, CodecError> {
    table.check_native(ty, native)?;
    let len = codec
        .access
        .len(native)
        .ok_or_else(|| mismatch(table.path(ty)))?;
    (0..len)
        .map(|i| {
            let element = codec
                .access
                .element(native, i)
                .ok_or_else(|| mismatch(table.path(ty)))?;
            table.print_field(plan.element, &codec.element, element)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}
