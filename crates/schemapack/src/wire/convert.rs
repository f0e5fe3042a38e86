// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Numeric conversions between native and wire basic types.
//!
//! A field whose local type differs from the wire type is read as the wire
//! type and cast into the local one (and the reverse on write). The
//! registry starts with every ordered pair of distinct numeric kinds.

use super::basic::{BasicKind, Scalar};
use super::cursor::{Cursor, PackBuffer};
use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeSet;

/// What to do when a conversion changes the value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPolicy {
    /// Plain numeric casts: truncation toward zero, wrapping, rounding.
    #[default]
    Lossy,
    /// Reject values that do not survive a cast back to the source kind.
    Strict,
}

/// A bound native/wire conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub native: BasicKind,
    pub wire: BasicKind,
    pub policy: ConversionPolicy,
}

impl Conversion {
    /// Read a wire value and store it, converted, into `native`.
    pub(crate) fn read(&self, cur: &mut Cursor<'_>, native: &mut dyn Any) -> Result<(), CodecError> {
        let wire = Scalar::read(self.wire, cur)?;
        let value = self.cast(wire, self.native)?;
        if value.store(native) {
            Ok(())
        } else {
            Err(CodecError::NativeMismatch {
                type_path: self.native.name().to_string(),
            })
        }
    }

    /// Convert the native value and write it as the wire type.
    pub(crate) fn write(&self, buf: &mut PackBuffer, native: &dyn Any) -> Result<(), CodecError> {
        let value = Scalar::load(self.native, native).ok_or_else(|| CodecError::NativeMismatch {
            type_path: self.native.name().to_string(),
        })?;
        self.cast(value, self.wire)?.write(buf);
        Ok(())
    }

    fn cast(&self, value: Scalar, to: BasicKind) -> Result<Scalar, CodecError> {
        let lossy = || CodecError::LossyConversion {
            value: value.to_string(),
            from: value.kind().name(),
            to: to.name(),
        };
        let out = value.cast(to).ok_or_else(lossy)?;
        if self.policy == ConversionPolicy::Strict {
            let back = out.cast(value.kind()).ok_or_else(lossy)?;
            if !back.same_value(value) {
                return Err(lossy());
            }
        }
        Ok(out)
    }
}

/// Table of allowed (native, wire) conversions.
#[derive(Debug, Clone)]
pub struct ConversionRegistry {
    pairs: BTreeSet<(BasicKind, BasicKind)>,
    policy: ConversionPolicy,
}

impl ConversionRegistry {
    /// Registry with every numeric pair.
    pub fn new(policy: ConversionPolicy) -> Self {
        let mut registry = Self::empty(policy);
        for native in BasicKind::ALL {
            for wire in BasicKind::ALL {
                registry.register(native, wire);
            }
        }
        registry
    }

    pub fn empty(policy: ConversionPolicy) -> Self {
        Self {
            pairs: BTreeSet::new(),
            policy,
        }
    }

    /// Allow converting `native` from/to `wire`. Returns false for pairs that
    /// cannot be converted (identical kinds, or strings).
    pub fn register(&mut self, native: BasicKind, wire: BasicKind) -> bool {
        if native == wire || !native.is_numeric() || !wire.is_numeric() {
            return false;
        }
        self.pairs.insert((native, wire));
        true
    }

    /// Conversion for a registered pair.
    pub fn find(&self, native: BasicKind, wire: BasicKind) -> Option<Conversion> {
        self.pairs.contains(&(native, wire)).then_some(Conversion {
            native,
            wire,
            policy: self.policy,
        })
    }

    pub fn policy(&self) -> ConversionPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for ConversionRegistry {
    fn default() -> Self {
        Self::new(ConversionPolicy::default())
    }
}
