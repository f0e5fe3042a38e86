// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Composite codecs: struct, union and list.
//!
//! The codec table holds one entry per schema type. Each entry has a wire
//! plan derived from the schema alone (enough to skip, default-fill or
//! size a value) and, when native code laid the type out, a bound codec
//! mapping schema fields onto native members. Entries refer to each other
//! by [`TypeIndex`].
//!
//! Wire rules:
//!
//! ```text
//! struct: [flags: ceil(bits/8) bytes, omitted if 0][fields in schema order]
//!         optional field present iff its flag is set, bit fields carry no payload
//! union:  [tag: u8, 255 = none][value of option `tag`]
//! list:   [count: i32][count elements]
//! ```
//!
//! Recursive schemas are legal as long as a union or list breaks the cycle,
//! so decode and skip track nesting depth against a configured limit.

mod bind;
pub mod flags;
mod lists;
mod structs;
mod unions;

pub use flags::{flag_bytes, OptionFlags};

pub(crate) use bind::build_table;

use crate::error::CodecError;
use crate::reflect::MemberAccess;
use crate::schema::{Schema, TypeIndex};
use crate::wire::{BasicKind, Conversion, Cursor, PackBuffer, Scalar};
use lists::{ListCodec, ListPlan};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::sync::Arc;
use structs::{StructCodec, StructPlan};
use unions::{UnionCodec, UnionPlan};

/// How one bound member is encoded.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FieldCodec {
    /// Native and wire types are the same basic kind.
    Basic(BasicKind),
    /// Native basic kind differs from the wire kind.
    Convert(Conversion),
    /// Struct, union or list with its own codec entry.
    Composite(TypeIndex),
}

/// A schema field bound to a native member.
#[derive(Clone)]
pub(crate) struct Binding {
    pub access: Arc<dyn MemberAccess>,
    pub codec: FieldCodec,
}

/// Schema-only description of a type's wire form.
pub(crate) enum WirePlan {
    /// Namespaces: nothing on the wire.
    None,
    Basic(BasicKind),
    /// Booleans living in a struct's flags.
    Bit,
    Struct(StructPlan),
    Union(UnionPlan),
    List(ListPlan),
}

pub(crate) enum NativeCodec {
    /// No native layout: the type can only be skipped or default-filled.
    Unbound,
    Struct(StructCodec),
    Union(UnionCodec),
    List(ListCodec),
}

pub(crate) struct TypeCodec {
    pub plan: WirePlan,
    pub native: NativeCodec,
    /// Rust type that reads/writes go through, if any.
    pub native_type: Option<TypeId>,
    /// Smallest encoding of a value, used to reject absurd list counts.
    pub min_wire_size: usize,
}

/// Bounds on what untrusted input may make the decoder do.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DecodeLimits {
    pub max_depth: usize,
    pub max_zero_size_elements: usize,
}

/// Bound codecs for every schema type.
pub(crate) struct CodecTable {
    pub schema: Schema,
    pub types: Vec<TypeCodec>,
    pub limits: DecodeLimits,
}

fn mismatch(path: &str) -> CodecError {
    CodecError::NativeMismatch {
        type_path: path.to_string(),
    }
}

impl CodecTable {
    pub fn path(&self, ty: TypeIndex) -> &str {
        &self.schema.node(ty).path
    }

    pub fn entry(&self, ty: TypeIndex) -> &TypeCodec {
        &self.types[ty.0]
    }

    /// Decode a value of schema type `ty` into `native`.
    pub fn read(
        &self,
        ty: TypeIndex,
        cur: &mut Cursor<'_>,
        native: &mut dyn Any,
    ) -> Result<(), CodecError> {
        self.read_at(ty, cur, native, 0)
    }

    fn check_depth(&self, ty: TypeIndex, depth: usize) -> Result<(), CodecError> {
        if depth > self.limits.max_depth {
            return Err(CodecError::DepthExceeded {
                type_path: self.path(ty).to_string(),
                limit: self.limits.max_depth,
            });
        }
        Ok(())
    }

    pub(crate) fn read_at(
        &self,
        ty: TypeIndex,
        cur: &mut Cursor<'_>,
        native: &mut dyn Any,
        depth: usize,
    ) -> Result<(), CodecError> {
        let entry = self.entry(ty);
        match (&entry.plan, &entry.native) {
            (WirePlan::Basic(kind), _) => kind.read_native(cur, native),
            (WirePlan::Struct(plan), NativeCodec::Struct(codec)) => {
                self.check_depth(ty, depth)?;
                structs::read(self, ty, plan, codec, cur, native, depth)
            }
            (WirePlan::Union(plan), NativeCodec::Union(codec)) => {
                self.check_depth(ty, depth)?;
                unions::read(self, ty, plan, codec, cur, native, depth)
            }
            (WirePlan::List(plan), NativeCodec::List(codec)) => {
                self.check_depth(ty, depth)?;
                lists::read(self, ty, plan, codec, cur, native, depth)
            }
            _ => Err(CodecError::UnknownType(self.path(ty).to_string())),
        }
    }

    /// Encode `native` as schema type `ty`.
    pub fn write(&self, ty: TypeIndex, buf: &mut PackBuffer, native: &dyn Any) -> Result<(), CodecError> {
        let entry = self.entry(ty);
        match (&entry.plan, &entry.native) {
            (WirePlan::Basic(kind), _) => kind.write_native(buf, native),
            (WirePlan::Struct(plan), NativeCodec::Struct(codec)) => {
                structs::write(self, ty, plan, codec, buf, native)
            }
            (WirePlan::Union(plan), NativeCodec::Union(codec)) => {
                unions::write(self, ty, plan, codec, buf, native)
            }
            (WirePlan::List(_), NativeCodec::List(codec)) => lists::write(self, ty, codec, buf, native),
            _ => Err(CodecError::UnknownType(self.path(ty).to_string())),
        }
    }

    /// Step over a value of type `ty` without decoding it.
    pub fn skip(&self, ty: TypeIndex, cur: &mut Cursor<'_>) -> Result<(), CodecError> {
        self.skip_at(ty, cur, 0)
    }

    pub(crate) fn skip_at(
        &self,
        ty: TypeIndex,
        cur: &mut Cursor<'_>,
        depth: usize,
    ) -> Result<(), CodecError> {
        match &self.entry(ty).plan {
            WirePlan::None | WirePlan::Bit => Ok(()),
            WirePlan::Basic(kind) => kind.skip(cur),
            WirePlan::Struct(plan) => {
                self.check_depth(ty, depth)?;
                structs::skip(self, plan, cur, depth)
            }
            WirePlan::Union(plan) => {
                self.check_depth(ty, depth)?;
                unions::skip(self, ty, plan, cur, depth)
            }
            WirePlan::List(plan) => {
                self.check_depth(ty, depth)?;
                lists::skip(self, ty, plan, cur, depth)
            }
        }
    }

    /// Encode the default (zero / empty / unset) value of type `ty`.
    pub fn write_default(&self, ty: TypeIndex, buf: &mut PackBuffer) {
        match &self.entry(ty).plan {
            WirePlan::None | WirePlan::Bit => {}
            WirePlan::Basic(kind) => kind.write_default(buf),
            WirePlan::Struct(plan) => structs::write_default(self, plan, buf),
            WirePlan::Union(_) => unions::write_default(buf),
            WirePlan::List(_) => buf.write_i32_le(0),
        }
    }

    /// Human-readable form of `native` as type `ty`.
    pub fn print(&self, ty: TypeIndex, native: &dyn Any) -> Result<Value, CodecError> {
        let entry = self.entry(ty);
        match (&entry.plan, &entry.native) {
            (WirePlan::Basic(kind), _) => kind
                .print_native(native)
                .ok_or_else(|| mismatch(self.path(ty))),
            (WirePlan::Struct(plan), NativeCodec::Struct(codec)) => {
                structs::print(self, ty, plan, codec, native)
            }
            (WirePlan::Union(plan), NativeCodec::Union(codec)) => {
                unions::print(self, ty, plan, codec, native)
            }
            (WirePlan::List(plan), NativeCodec::List(codec)) => lists::print(self, ty, plan, codec, native),
            _ => Err(CodecError::UnknownType(self.path(ty).to_string())),
        }
    }

    pub(crate) fn read_field(
        &self,
        codec: &FieldCodec,
        cur: &mut Cursor<'_>,
        native: &mut dyn Any,
        depth: usize,
    ) -> Result<(), CodecError> {
        match codec {
            FieldCodec::Basic(kind) => kind.read_native(cur, native),
            FieldCodec::Convert(conversion) => conversion.read(cur, native),
            FieldCodec::Composite(ty) => self.read_at(*ty, cur, native, depth),
        }
    }

    pub(crate) fn write_field(
        &self,
        codec: &FieldCodec,
        buf: &mut PackBuffer,
        native: &dyn Any,
    ) -> Result<(), CodecError> {
        match codec {
            FieldCodec::Basic(kind) => kind.write_native(buf, native),
            FieldCodec::Convert(conversion) => conversion.write(buf, native),
            FieldCodec::Composite(ty) => self.write(*ty, buf, native),
        }
    }

    /// Print a bound member; enum values show their enumerant name.
    pub(crate) fn print_field(
        &self,
        wire_ty: TypeIndex,
        codec: &FieldCodec,
        native: &dyn Any,
    ) -> Result<Value, CodecError> {
        let value = match codec {
            FieldCodec::Basic(kind) => kind.print_native(native),
            FieldCodec::Convert(conversion) => {
                Scalar::load(conversion.native, native).map(Scalar::to_json)
            }
            FieldCodec::Composite(ty) => return self.print(*ty, native),
        }
        .ok_or_else(|| mismatch(self.path(wire_ty)))?;
        let name = self
            .schema
            .node(wire_ty)
            .as_enum()
            .zip(value.as_i64())
            .and_then(|(en, v)| en.name_of(v));
        Ok(name.map_or(value, |n| Value::String(n.to_string())))
    }

    /// Reject a native value whose Rust type is not the one bound to `ty`.
    pub(crate) fn check_native(&self, ty: TypeIndex, native: &dyn Any) -> Result<(), CodecError> {
        match self.entry(ty).native_type {
            Some(expected) if (*native).type_id() == expected => Ok(()),
            Some(_) => Err(mismatch(self.path(ty))),
            None => Err(CodecError::UnknownType(self.path(ty).to_string())),
        }
    }
}
