// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Basic-type codecs.
//!
//! Fixed-width numbers are raw little-endian bytes. Strings are a 4-byte
//! signed length followed by the raw UTF-8 bytes, without terminator.

use super::cursor::{Cursor, PackBuffer};
use crate::error::CodecError;
use std::any::{Any, TypeId};
use std::fmt;

/// Wire-level basic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
}

impl BasicKind {
    /// Every basic kind, numeric kinds first.
    pub const ALL: [BasicKind; 11] = [
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::String,
    ];

    /// Look up a kind by schema name, including the legacy C-style aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "int8" => Self::Int8,
            "uint8" => Self::UInt8,
            "int16" => Self::Int16,
            "uint16" => Self::UInt16,
            "int32" | "int" => Self::Int32,
            "uint32" | "uint" => Self::UInt32,
            "int64" => Self::Int64,
            "uint64" => Self::UInt64,
            "float32" | "float" => Self::Float32,
            "float64" | "double" => Self::Float64,
            "string" => Self::String,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical schema name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
        }
    }

    /// Bytes on the wire (None for length-prefixed strings).
    pub fn wire_size(self) -> Option<usize> {
        match self {
            Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
            Self::String => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self != Self::String
    }

    /// Rust type used as native storage for this kind.
    pub fn native_type_id(self) -> TypeId {
        match self {
            Self::Int8 => TypeId::of::<i8>(),
            Self::UInt8 => TypeId::of::<u8>(),
            Self::Int16 => TypeId::of::<i16>(),
            Self::UInt16 => TypeId::of::<u16>(),
            Self::Int32 => TypeId::of::<i32>(),
            Self::UInt32 => TypeId::of::<u32>(),
            Self::Int64 => TypeId::of::<i64>(),
            Self::UInt64 => TypeId::of::<u64>(),
            Self::Float32 => TypeId::of::<f32>(),
            Self::Float64 => TypeId::of::<f64>(),
            Self::String => TypeId::of::<String>(),
        }
    }

    /// In-memory size of the native storage, used as list element stride.
    pub fn native_size(self) -> usize {
        match self {
            Self::String => std::mem::size_of::<String>(),
            other => other.wire_size().unwrap_or(0),
        }
    }

    /// Decode one value into `native`, which must be the kind's Rust type.
    pub(crate) fn read_native(
        self,
        cur: &mut Cursor<'_>,
        native: &mut dyn Any,
    ) -> Result<(), CodecError> {
        if self == Self::String {
            let value = read_string(cur)?;
            let slot = native
                .downcast_mut::<String>()
                .ok_or_else(|| self.mismatch())?;
            *slot = value;
            return Ok(());
        }
        let value = Scalar::read(self, cur)?;
        if value.store(native) {
            Ok(())
        } else {
            Err(self.mismatch())
        }
    }

    /// Encode the native value, which must be the kind's Rust type.
    pub(crate) fn write_native(
        self,
        buf: &mut PackBuffer,
        native: &dyn Any,
    ) -> Result<(), CodecError> {
        if self == Self::String {
            let value = native.downcast_ref::<String>().ok_or_else(|| self.mismatch())?;
            return write_string(buf, value);
        }
        let value = Scalar::load(self, native).ok_or_else(|| self.mismatch())?;
        value.write(buf);
        Ok(())
    }

    pub(crate) fn skip(self, cur: &mut Cursor<'_>) -> Result<(), CodecError> {
        match self.wire_size() {
            Some(size) => cur.skip(size),
            None => {
                let len = cur.read_length()?;
                cur.skip(len)
            }
        }
    }

    /// Zero / empty value on the wire.
    pub(crate) fn write_default(self, buf: &mut PackBuffer) {
        match self.wire_size() {
            Some(size) => {
                buf.reserve_zeroed(size);
            }
            None => buf.write_i32_le(0),
        }
    }

    /// Human-readable form of a native value.
    pub(crate) fn print_native(self, native: &dyn Any) -> Option<serde_json::Value> {
        if self == Self::String {
            return native
                .downcast_ref::<String>()
                .map(|s| serde_json::Value::String(s.clone()));
        }
        Scalar::load(self, native).map(Scalar::to_json)
    }

    fn mismatch(self) -> CodecError {
        CodecError::NativeMismatch {
            type_path: self.name().to_string(),
        }
    }
}

impl fmt::Display for BasicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn read_string(cur: &mut Cursor<'_>) -> Result<String, CodecError> {
    let len = cur.read_length()?;
    let offset = cur.offset();
    let bytes = cur.read_bytes(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { offset })
}

pub(crate) fn write_string(buf: &mut PackBuffer, value: &str) -> Result<(), CodecError> {
    buf.write_length(value.len())?;
    buf.write_bytes(value.as_bytes());
    Ok(())
}

/// A numeric value tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

/// Apply `$body` to the payload of every variant.
macro_rules! with_scalar {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            Scalar::I8($v) => $body,
            Scalar::U8($v) => $body,
            Scalar::I16($v) => $body,
            Scalar::U16($v) => $body,
            Scalar::I32($v) => $body,
            Scalar::U32($v) => $body,
            Scalar::I64($v) => $body,
            Scalar::U64($v) => $body,
            Scalar::F32($v) => $body,
            Scalar::F64($v) => $body,
        }
    };
}

/// Decode a fixed-width kind: `$t` is bound to the Rust type of `$kind`.
macro_rules! with_numeric_type {
    ($kind:expr, $t:ident => $body:expr, string => $string:expr) => {
        match $kind {
            BasicKind::Int8 => {
                type $t = i8;
                $body
            }
            BasicKind::UInt8 => {
                type $t = u8;
                $body
            }
            BasicKind::Int16 => {
                type $t = i16;
                $body
            }
            BasicKind::UInt16 => {
                type $t = u16;
                $body
            }
            BasicKind::Int32 => {
                type $t = i32;
                $body
            }
            BasicKind::UInt32 => {
                type $t = u32;
                $body
            }
            BasicKind::Int64 => {
                type $t = i64;
                $body
            }
            BasicKind::UInt64 => {
                type $t = u64;
                $body
            }
            BasicKind::Float32 => {
                type $t = f32;
                $body
            }
            BasicKind::Float64 => {
                type $t = f64;
                $body
            }
            BasicKind::String => $string,
        }
    };
}

/// Rust numeric types that map to a [`Scalar`] variant.
pub(crate) trait WireScalar: Copy + Any {
    fn read_le(cur: &mut Cursor<'_>) -> Result<Self, CodecError>;
    fn into_scalar(self) -> Scalar;
}

macro_rules! impl_wire_scalar {
    ($t:ty, $variant:ident) => {
        impl WireScalar for $t {
            fn read_le(cur: &mut Cursor<'_>) -> Result<Self, CodecError> {
                let mut bytes = [0u8; std::mem::size_of::<$t>()];
                cur.read_into(&mut bytes)?;
                Ok(<$t>::from_le_bytes(bytes))
            }

            fn into_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }
        }
    };
}

impl_wire_scalar!(i8, I8);
impl_wire_scalar!(u8, U8);
impl_wire_scalar!(i16, I16);
impl_wire_scalar!(u16, U16);
impl_wire_scalar!(i32, I32);
impl_wire_scalar!(u32, U32);
impl_wire_scalar!(i64, I64);
impl_wire_scalar!(u64, U64);
impl_wire_scalar!(f32, F32);
impl_wire_scalar!(f64, F64);

/// `as` cast of a primitive into the variant for `$to`.
macro_rules! cast_into {
    ($v:expr, $to:expr) => {
        match $to {
            BasicKind::Int8 => Some(Scalar::I8($v as i8)),
            BasicKind::UInt8 => Some(Scalar::U8($v as u8)),
            BasicKind::Int16 => Some(Scalar::I16($v as i16)),
            BasicKind::UInt16 => Some(Scalar::U16($v as u16)),
            BasicKind::Int32 => Some(Scalar::I32($v as i32)),
            BasicKind::UInt32 => Some(Scalar::U32($v as u32)),
            BasicKind::Int64 => Some(Scalar::I64($v as i64)),
            BasicKind::UInt64 => Some(Scalar::U64($v as u64)),
            BasicKind::Float32 => Some(Scalar::F32($v as f32)),
            BasicKind::Float64 => Some(Scalar::F64($v as f64)),
            BasicKind::String => None,
        }
    };
}

impl Scalar {
    pub fn kind(self) -> BasicKind {
        match self {
            Self::I8(_) => BasicKind::Int8,
            Self::U8(_) => BasicKind::UInt8,
            Self::I16(_) => BasicKind::Int16,
            Self::U16(_) => BasicKind::UInt16,
            Self::I32(_) => BasicKind::Int32,
            Self::U32(_) => BasicKind::UInt32,
            Self::I64(_) => BasicKind::Int64,
            Self::U64(_) => BasicKind::UInt64,
            Self::F32(_) => BasicKind::Float32,
            Self::F64(_) => BasicKind::Float64,
        }
    }

    /// Read one fixed-width value of `kind`.
    pub(crate) fn read(kind: BasicKind, cur: &mut Cursor<'_>) -> Result<Self, CodecError> {
        with_numeric_type!(kind, T => Ok(T::read_le(cur)?.into_scalar()), string => Err(kind.mismatch()))
    }

    pub(crate) fn write(self, buf: &mut PackBuffer) {
        with_scalar!(self, v => buf.write_bytes(&v.to_le_bytes()))
    }

    /// Copy a native value of `kind` out of type-erased storage.
    pub(crate) fn load(kind: BasicKind, native: &dyn Any) -> Option<Self> {
        with_numeric_type!(kind, T => native.downcast_ref::<T>().map(|v| v.into_scalar()), string => None)
    }

    /// Store into type-erased storage of the same Rust type; false on mismatch.
    pub(crate) fn store(self, native: &mut dyn Any) -> bool {
        fn put<T: Any>(native: &mut dyn Any, value: T) -> bool {
            match native.downcast_mut::<T>() {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            }
        }
        with_scalar!(self, v => put(native, v))
    }

    /// Numeric cast with Rust `as` semantics: float to int truncates toward
    /// zero and saturates, int to int wraps, int to float rounds to nearest.
    pub fn cast(self, to: BasicKind) -> Option<Self> {
        with_scalar!(self, v => cast_into!(v, to))
    }

    /// Equality that treats NaN as equal to NaN.
    pub fn same_value(self, other: Self) -> bool {
        match (self, other) {
            (Self::F32(a), Self::F32(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::F64(a), Self::F64(b)) => a == b || (a.is_nan() && b.is_nan()),
            (a, b) => a == b,
        }
    }

    /// Parse text as a value of `kind`.
    pub fn parse(kind: BasicKind, text: &str) -> Result<Self, CodecError> {
        let text = text.trim();
        let err = || CodecError::Parse {
            text: text.to_string(),
            kind: kind.name(),
        };
        with_numeric_type!(
            kind,
            T => text.parse::<T>().map(|v| v.into_scalar()).map_err(|_| err()),
            string => Err(err())
        )
    }

    pub fn to_json(self) -> serde_json::Value {
        match self {
            Self::F32(v) => float_json(f64::from(v)),
            Self::F64(v) => float_json(v),
            Self::I64(v) => v.into(),
            Self::U64(v) => v.into(),
            Self::I8(v) => v.into(),
            Self::U8(v) => v.into(),
            Self::I16(v) => v.into(),
            Self::U16(v) => v.into(),
            Self::I32(v) => v.into(),
            Self::U32(v) => v.into(),
        }
    }
}

fn float_json(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(v.to_string()))
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_scalar!(*self, v => write!(f, "{}", v))
    }
}
