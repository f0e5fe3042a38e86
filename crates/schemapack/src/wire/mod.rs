// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian wire primitives: cursor/buffer, basic-type codecs and
//! numeric conversions.

pub mod basic;
pub mod convert;
pub mod cursor;

pub use basic::{BasicKind, Scalar};
pub use convert::{Conversion, ConversionPolicy, ConversionRegistry};
pub use cursor::{Cursor, PackBuffer};
