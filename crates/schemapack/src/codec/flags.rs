// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Optional-field and bit-field flag storage.

use crate::error::CodecError;
use crate::schema::MAX_OPTION_BITS;
use crate::wire::{Cursor, PackBuffer};

const WORDS: usize = MAX_OPTION_BITS as usize / 64;

/// Presence bits of a struct's optional fields plus its bit-encoded booleans.
///
/// Bit `i` is slot `i`. On the wire the bits are packed LSB-first into
/// `ceil(count / 8)` bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OptionFlags {
    words: [u64; WORDS],
}

impl OptionFlags {
    pub const CAPACITY: usize = MAX_OPTION_BITS as usize;

    pub fn new() -> Self {
        Self::default()
    }

    /// Slots beyond [`Self::CAPACITY`] read as unset.
    pub fn get(&self, index: u16) -> bool {
        let i = usize::from(index);
        i < Self::CAPACITY && self.words[i / 64] & (1u64 << (i % 64)) != 0
    }

    /// Slots beyond [`Self::CAPACITY`] are ignored.
    pub fn set(&mut self, index: u16, value: bool) {
        let i = usize::from(index);
        if i >= Self::CAPACITY {
            return;
        }
        let mask = 1u64 << (i % 64);
        if value {
            self.words[i / 64] |= mask;
        } else {
            self.words[i / 64] &= !mask;
        }
    }

    pub fn with(mut self, index: u16) -> Self {
        self.set(index, true);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn clear(&mut self) {
        self.words = [0; WORDS];
    }

    /// Set slots, ascending.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..MAX_OPTION_BITS).filter(move |i| self.get(*i))
    }

    /// Bits set in both.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut out = *self;
        for (w, o) in out.words.iter_mut().zip(other.words.iter()) {
            *w &= *o;
        }
        out
    }

    fn byte(&self, index: usize) -> u8 {
        (self.words[index / 8] >> ((index % 8) * 8)) as u8
    }

    fn set_byte(&mut self, index: usize, value: u8) {
        self.words[index / 8] |= u64::from(value) << ((index % 8) * 8);
    }

    /// Write the first `bytes` bytes of packed flags.
    pub(crate) fn write(&self, buf: &mut PackBuffer, bytes: usize) {
        for i in 0..bytes.min(WORDS * 8) {
            buf.write_u8(self.byte(i));
        }
    }

    /// Read `bytes` bytes of packed flags.
    pub(crate) fn read(cur: &mut Cursor<'_>, bytes: usize) -> Result<Self, CodecError> {
        let raw = cur.read_bytes(bytes)?;
        let mut flags = Self::new();
        for (i, b) in raw.iter().take(WORDS * 8).enumerate() {
            flags.set_byte(i, *b);
        }
        Ok(flags)
    }
}

/// Bytes needed for `count` flag bits.
pub fn flag_bytes(count: usize) -> usize {
    count.div_ceil(8)
}
