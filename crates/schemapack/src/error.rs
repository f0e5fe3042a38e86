// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for every layer of the crate.
//!
//! ```text
//! Error (top-level wrapper)
//! ├── SchemaError   - schema construction / resolution (fatal, startup)
//! ├── BindError     - schema-to-native binding in Serializer::initialize (fatal, startup)
//! ├── CodecError    - per-value encode/decode failures
//! ├── FramingError  - stream framing (I/O, record lengths)
//! └── ConfigError   - config and schema file loading
//! ```
//!
//! Schema and bind errors are configuration failures: a serializer that
//! reported one must not be used for traffic.

use std::io;
use thiserror::Error;

/// Schema construction and resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A type reference could not be found from the declaring scope.
    #[error("{type_path}: unresolved type reference '{reference}'")]
    UnresolvedType { type_path: String, reference: String },

    /// Two types with the same name in one scope.
    #[error("duplicate type '{type_path}'")]
    DuplicateType { type_path: String },

    /// Two fields with the same name in one struct (including inherited fields) or union.
    #[error("{type_path}: duplicate field '{field}'")]
    DuplicateField { type_path: String, field: String },

    /// Two fields share an option or bit slot.
    #[error("{type_path}: flag index {index} used by both '{first}' and '{second}'")]
    DuplicateFlagIndex {
        type_path: String,
        index: u16,
        first: String,
        second: String,
    },

    /// An option or bit index beyond the flag storage.
    #[error("{type_path}: field '{field}' uses flag index {index}, limit is {limit}")]
    FlagIndexOutOfRange {
        type_path: String,
        field: String,
        index: u16,
        limit: u16,
    },

    /// Union members must all carry an option index.
    #[error("{type_path}: union field '{field}' is not optional")]
    UnionFieldNotOptional { type_path: String, field: String },

    /// A field of bit-encoded type without a bit index, or a bit index on a non-bit field.
    #[error("{type_path}: field '{field}': {reason}")]
    InvalidBitField {
        type_path: String,
        field: String,
        reason: &'static str,
    },

    /// Enum without values, duplicate enumerants, or a value that does not parse.
    #[error("{type_path}: malformed enum: {reason}")]
    MalformedEnum { type_path: String, reason: String },

    /// Base type is not a struct.
    #[error("{type_path}: base type '{base}' is not a struct")]
    InvalidBase { type_path: String, base: String },

    /// Struct inherits from itself through its base chain.
    #[error("{type_path}: inheritance cycle")]
    InheritanceCycle { type_path: String },

    /// Message ids below -2, or -2 on a type that is not a struct base.
    #[error("{type_path}: invalid message id {id}")]
    InvalidMessageId { type_path: String, id: i32 },

    /// Two concrete messages share an id.
    #[error("message id {id} used by both '{first}' and '{second}'")]
    DuplicateMessageId {
        id: i32,
        first: String,
        second: String,
    },

    /// List contained type cannot be carried in a list.
    #[error("{type_path}: cannot make a list of '{contained}'")]
    InvalidListElement { type_path: String, contained: String },

    /// Basic type declaration is inconsistent (e.g. fixed encoding of size 0).
    #[error("{type_path}: invalid basic type: {reason}")]
    InvalidBasicType { type_path: String, reason: String },
}

/// Failures binding a resolved schema to native layouts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// `Serializer::initialize` requires `Schema::resolve` to have succeeded.
    #[error("schema has not been resolved")]
    UnresolvedSchema,

    /// `Serializer::initialize` is run-once.
    #[error("serializer already initialized")]
    AlreadyInitialized,

    /// A native member refers to a composite type that was never laid out natively.
    #[error("{type_path}.{field}: type '{field_type}' has no native layout")]
    MissingLayout {
        type_path: String,
        field: String,
        field_type: String,
    },

    /// Wire and native basic types differ and no conversion is registered.
    #[error("{type_path}.{field}: no conversion between native '{native}' and wire '{wire}'")]
    NoConversion {
        type_path: String,
        field: String,
        native: String,
        wire: String,
    },

    /// Declared native type name is unknown.
    #[error("{type_path}.{field}: unknown native type '{native}'")]
    UnknownNativeType {
        type_path: String,
        field: String,
        native: String,
    },

    /// The Rust type behind an accessor does not match the declared type name.
    #[error("{type_path}.{field}: native storage does not match declared type '{declared}'")]
    NativeTypeMismatch {
        type_path: String,
        field: String,
        declared: String,
    },

    /// The same type path was laid out twice.
    #[error("duplicate native layout for '{type_path}'")]
    DuplicateLayout { type_path: String },

    /// A native layout was declared with the wrong kind (struct for a union, ...).
    #[error("'{type_path}': native layout kind does not match schema kind")]
    LayoutKindMismatch { type_path: String },

    /// A native union option index is reserved (255) or declared twice.
    #[error("{type_path}.{field}: native option index {index} is reserved or already used")]
    UnknownOption {
        type_path: String,
        field: String,
        index: u8,
    },

    /// Dynamic records cannot represent structs that contain themselves.
    #[error("'{type_path}' contains itself without list or union indirection")]
    RecursiveType { type_path: String },
}

/// Per-value encode/decode failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Input ended before the value did.
    #[error("unexpected end of input at offset {offset}: need {need} bytes, have {have}")]
    UnexpectedEof {
        offset: usize,
        need: usize,
        have: usize,
    },

    /// String payload is not UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// Union tag is neither 255 nor an option index of the schema union.
    #[error("{type_path}: invalid union tag {tag}")]
    InvalidUnionTag { type_path: String, tag: u8 },

    /// List or string length prefix is negative.
    #[error("negative length {length} at offset {offset}")]
    NegativeLength { length: i32, offset: usize },

    /// String or list too long for a 32-bit length prefix.
    #[error("length {0} does not fit a 32-bit length prefix")]
    LengthOverflow(usize),

    /// Nesting of composite values above the configured limit.
    #[error("{type_path}: nesting deeper than {limit}")]
    DepthExceeded { type_path: String, limit: usize },

    /// Count of zero-size list elements above the configured limit.
    #[error("{type_path}: {count} elements exceed the limit of {limit}")]
    ListTooLong {
        type_path: String,
        count: usize,
        limit: usize,
    },

    /// Strict conversion policy rejected a value that does not round-trip.
    #[error("value {value} does not convert losslessly from {from} to {to}")]
    LossyConversion {
        value: String,
        from: &'static str,
        to: &'static str,
    },

    /// A native value handed to a codec is not of the bound Rust type.
    #[error("native value for '{type_path}' has an unexpected Rust type")]
    NativeMismatch { type_path: String },

    /// Native union reports an active option the schema or layout cannot write.
    #[error("{type_path}: active option {index} cannot be encoded")]
    UnencodableOption { type_path: String, index: u8 },

    /// Codec used before `Serializer::initialize` succeeded.
    #[error("serializer not initialized")]
    NotInitialized,

    /// Type path not known to the serializer.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// Message id without codec.
    #[error("unknown message id {0}")]
    UnknownMessage(i32),

    /// Value text could not be parsed into a basic type.
    #[error("cannot parse '{text}' as {kind}")]
    Parse { text: String, kind: &'static str },
}

/// Stream framing failures.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Input ended inside a record.
    #[error("truncated record: need {need} more bytes")]
    Truncated { need: usize },

    /// Length field smaller than the id it must cover.
    #[error("invalid record length {0}")]
    InvalidLength(i32),

    /// Record payload above the configured limit.
    #[error("record payload of {size} bytes exceeds limit of {limit}")]
    MessageTooLarge { size: usize, limit: usize },
}

/// Config and schema file loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "yaml")]
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported file extension for '{0}' (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),
}

/// Aggregate error for callers that do not need per-layer handling.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_type_path() {
        let err = SchemaError::DuplicateField {
            type_path: "demo.Track".into(),
            field: "id".into(),
        };
        assert_eq!(err.to_string(), "demo.Track: duplicate field 'id'");
    }

    #[test]
    fn test_eof_display_reports_offset() {
        let err = CodecError::UnexpectedEof {
            offset: 12,
            need: 4,
            have: 1,
        };
        assert_eq!(
            err.to_string(),
            "unexpected end of input at offset 12: need 4 bytes, have 1"
        );
    }

    #[test]
    fn test_aggregate_from_layers() {
        let err: Error = CodecError::UnknownMessage(7).into();
        assert!(matches!(err, Error::Codec(CodecError::UnknownMessage(7))));
        let err: Error = FramingError::InvalidLength(2).into();
        assert!(matches!(err, Error::Framing(FramingError::InvalidLength(2))));
    }
}
