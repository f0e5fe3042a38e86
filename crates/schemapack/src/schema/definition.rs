// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Declarative schema source.
//!
//! A schema file lists types by `kind`. Namespaces nest; structs may carry
//! nested types of their own.
//!
//! # Example YAML
//!
//! ```yaml
//! namespace: demo
//! types:
//!   - kind: struct
//!     name: Point
//!     fields:
//!       - { name: x, type: double }
//!       - { name: y, type: double }
//!   - kind: struct
//!     name: Track
//!     message_id: 3
//!     fields:
//!       - { name: id, type: uint32 }
//!       - { name: speed, type: float32, option: 0 }
//!       - { name: lost, type: bool, bit: 1 }
//!       - { name: path, type: PointList }
//!   - kind: list
//!     name: PointList
//!     contained: Point
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root of a schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaDefinition {
    /// Dotted namespace the top-level `types` are declared in.
    pub namespace: Option<String>,

    /// Pre-declare the standard basic types at the root.
    pub builtins: bool,

    pub types: Vec<TypeDefinition>,
}

impl Default for SchemaDefinition {
    fn default() -> Self {
        Self {
            namespace: None,
            builtins: true,
            types: Vec::new(),
        }
    }
}

impl SchemaDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    /// Append a type declaration.
    pub fn with_type(mut self, ty: impl Into<TypeDefinition>) -> Self {
        self.types.push(ty.into());
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            #[cfg(feature = "yaml")]
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// One declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDefinition {
    Namespace(NamespaceDefinition),
    Basic(BasicDefinition),
    Struct(StructDefinition),
    Union(UnionDefinition),
    List(ListDefinition),
    Enum(EnumDefinition),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            Self::Namespace(d) => &d.name,
            Self::Basic(d) => &d.name,
            Self::Struct(d) => &d.name,
            Self::Union(d) => &d.name,
            Self::List(d) => &d.name,
            Self::Enum(d) => &d.name,
        }
    }
}

macro_rules! impl_into_type_definition {
    ($($def:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$def> for TypeDefinition {
                fn from(def: $def) -> Self {
                    Self::$variant(def)
                }
            }
        )*
    };
}

impl_into_type_definition!(
    NamespaceDefinition => Namespace,
    BasicDefinition => Basic,
    StructDefinition => Struct,
    UnionDefinition => Union,
    ListDefinition => List,
    EnumDefinition => Enum,
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDefinition {
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
}

impl NamespaceDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    pub fn with_type(mut self, ty: impl Into<TypeDefinition>) -> Self {
        self.types.push(ty.into());
        self
    }
}

/// How a basic type is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicEncoding {
    /// Raw little-endian bytes of `size` width.
    Fixed,
    /// 4-byte length then raw bytes.
    LengthPrefixed,
    /// Carried in the owning struct's flag bits.
    Bit,
}

/// User-declared basic type, an alias of a native basic type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicDefinition {
    pub name: String,
    /// Native basic type name (`int32`, `float64`, `string`, `bool`, ...).
    pub native: String,
    pub encoding: BasicEncoding,
    /// Byte width for fixed encoding.
    #[serde(default)]
    pub size: Option<usize>,
}

impl BasicDefinition {
    pub fn fixed(name: impl Into<String>, native: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            native: native.into(),
            encoding: BasicEncoding::Fixed,
            size: Some(size),
        }
    }

    pub fn length_prefixed(name: impl Into<String>, native: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native: native.into(),
            encoding: BasicEncoding::LengthPrefixed,
            size: None,
        }
    }

    pub fn bit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native: "bool".into(),
            encoding: BasicEncoding::Bit,
            size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Flag slot of an optional field (union option index).
    pub option: Option<u16>,
    /// Flag slot of a bit-encoded boolean.
    pub bit: Option<u16>,
    /// Default value as text.
    pub default: Option<String>,
    /// Kept on the wire, never bound to a native member.
    pub obsolete: bool,
}

impl FieldDefinition {
    pub fn required(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn optional(mut self, index: u16) -> Self {
        self.option = Some(index);
        self
    }

    pub fn bit(mut self, index: u16) -> Self {
        self.bit = Some(index);
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn obsolete(mut self) -> Self {
        self.obsolete = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StructDefinition {
    pub name: String,
    pub base: Option<String>,
    /// `>= 0` concrete message, `-2` abstract message base, `-1` or absent none.
    pub message_id: Option<i32>,
    pub fields: Vec<FieldDefinition>,
    /// Types nested in the struct's scope.
    pub types: Vec<TypeDefinition>,
}

impl StructDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn message(mut self, id: i32) -> Self {
        self.message_id = Some(id);
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn nested(mut self, ty: impl Into<TypeDefinition>) -> Self {
        self.types.push(ty.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnionDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

impl UnionDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add an option at wire tag `index`.
    pub fn option(mut self, name: impl Into<String>, type_name: impl Into<String>, index: u16) -> Self {
        self.fields
            .push(FieldDefinition::required(name, type_name).optional(index));
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListDefinition {
    pub name: String,
    pub contained: String,
}

impl ListDefinition {
    pub fn new(name: impl Into<String>, contained: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contained: contained.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValueDefinition {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumDefinition {
    pub name: String,
    pub values: Vec<EnumValueDefinition>,
}

impl EnumDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn value(mut self, name: impl Into<String>, value: i64) -> Self {
        self.values.push(EnumValueDefinition {
            name: name.into(),
            value,
        });
        self
    }
}
