// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read cursor and growable write buffer for the little-endian wire format.
//!
//! Every read is bounds-checked; a short buffer yields
//! [`CodecError::UnexpectedEof`] with the offset of the failed read.

use crate::error::CodecError;

/// Generate read methods for primitive types.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type, CodecError> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.read_bytes($size)?);
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Generate write methods for primitive types.
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
    };
}

/// Immutable cursor for reading (bounds-checked, zero-copy).
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read_le!(read_u8, u8, 1);
    impl_read_le!(read_u32_le, u32, 4);
    impl_read_le!(read_i32_le, i32, 4);

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                offset: self.offset,
                need: len,
                have: self.remaining(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Fill `dst` completely from the input.
    pub fn read_into(&mut self, dst: &mut [u8]) -> Result<(), CodecError> {
        dst.copy_from_slice(self.read_bytes(dst.len())?);
        Ok(())
    }

    /// Consume `len` bytes without looking at them.
    pub fn skip(&mut self, len: usize) -> Result<(), CodecError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read a signed 32-bit length prefix, rejecting negative values.
    pub fn read_length(&mut self) -> Result<usize, CodecError> {
        let offset = self.offset;
        let length = self.read_i32_le()?;
        usize::try_from(length).map_err(|_| CodecError::NegativeLength { length, offset })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}

/// Growable output buffer with back-patching for length prefixes.
#[derive(Debug, Default, Clone)]
pub struct PackBuffer {
    bytes: Vec<u8>,
}

impl PackBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_u32_le, u32);
    impl_write_le!(write_i32_le, i32);

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Write a length prefix as signed 32-bit.
    pub fn write_length(&mut self, len: usize) -> Result<(), CodecError> {
        let len = i32::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
        self.write_i32_le(len);
        Ok(())
    }

    /// Append `count` zero bytes and return the position of the first one.
    pub fn reserve_zeroed(&mut self, count: usize) -> usize {
        let pos = self.bytes.len();
        self.bytes.resize(pos + count, 0);
        pos
    }

    /// Overwrite four previously written bytes at `pos`.
    ///
    /// # Panics
    /// Panics if `pos + 4` is beyond the written length.
    pub fn patch_i32_le(&mut self, pos: usize, value: i32) {
        self.bytes[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Drop everything written after `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}
