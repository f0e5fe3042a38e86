// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema graph node types.

use crate::wire::BasicKind;
use std::fmt;

/// Index of a type in its [`Schema`](super::Schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIndex(pub(crate) usize);

impl TypeIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A type named by dotted path, resolved lazily against the declaring scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub(crate) resolved: Option<TypeIndex>,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved: None,
        }
    }

    /// Target type, once the schema has been resolved.
    pub fn target(&self) -> Option<TypeIndex> {
        self.resolved
    }
}

/// Member of a struct or union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub type_ref: TypeRef,
    pub option_index: Option<u16>,
    pub bit_index: Option<u16>,
    pub default: Option<String>,
    pub obsolete: bool,
}

impl Field {
    pub fn is_optional(&self) -> bool {
        self.option_index.is_some()
    }

    /// Flag slot used by this field, if any.
    pub fn flag_index(&self) -> Option<u16> {
        self.option_index.or(self.bit_index)
    }
}

/// Whether a struct is dispatchable by message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageRole {
    #[default]
    None,
    Concrete(i32),
    /// Abstract message base, never sent directly.
    Virtual,
}

impl MessageRole {
    /// Map the declarative id: `>= 0` concrete, `-2` virtual, `-1` none.
    pub fn from_id(id: Option<i32>) -> Option<Self> {
        match id {
            None | Some(-1) => Some(Self::None),
            Some(-2) => Some(Self::Virtual),
            Some(id) if id >= 0 => Some(Self::Concrete(id)),
            Some(_) => None,
        }
    }

    pub fn id(self) -> Option<i32> {
        match self {
            Self::Concrete(id) => Some(id),
            _ => None,
        }
    }
}

/// Native representation of a basic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicRepr {
    Value(BasicKind),
    /// Boolean carried in the owning struct's flags.
    Bit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    pub base: Option<TypeRef>,
    pub role: MessageRole,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionType {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListType {
    pub contained: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub values: Vec<(String, i64)>,
    /// Integer kind chosen during resolution.
    pub wire: Option<BasicKind>,
}

impl EnumType {
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }
}

/// Closed set of schema type variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Namespace,
    Basic(BasicRepr),
    Struct(StructType),
    Union(UnionType),
    List(ListType),
    Enum(EnumType),
}

/// Wire encoding class of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    None,
    Fixed(usize),
    LengthPrefixed,
    Bit,
    Struct,
    Union,
    List,
}

/// One node of the schema tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub name: String,
    /// Dotted path from the root (empty for the root itself).
    pub path: String,
    pub parent: Option<TypeIndex>,
    pub children: Vec<TypeIndex>,
    pub kind: TypeKind,
}

impl TypeNode {
    pub fn encoding(&self) -> Encoding {
        match &self.kind {
            TypeKind::Namespace => Encoding::None,
            TypeKind::Basic(BasicRepr::Bit) => Encoding::Bit,
            TypeKind::Basic(BasicRepr::Value(kind)) => match kind.wire_size() {
                Some(size) => Encoding::Fixed(size),
                None => Encoding::LengthPrefixed,
            },
            TypeKind::Enum(e) => e
                .wire
                .and_then(BasicKind::wire_size)
                .map_or(Encoding::None, Encoding::Fixed),
            TypeKind::Struct(_) => Encoding::Struct,
            TypeKind::Union(_) => Encoding::Union,
            TypeKind::List(_) => Encoding::List,
        }
    }

    /// Basic kind carried on the wire for basic and (resolved) enum types.
    pub fn basic_kind(&self) -> Option<BasicKind> {
        match &self.kind {
            TypeKind::Basic(BasicRepr::Value(kind)) => Some(*kind),
            TypeKind::Enum(e) => e.wire,
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Struct(_) | TypeKind::Union(_) | TypeKind::List(_)
        )
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match &self.kind {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionType> {
        match &self.kind {
            TypeKind::Union(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListType> {
        match &self.kind {
            TypeKind::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match &self.kind {
            TypeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TypeKind::Namespace => "namespace",
            TypeKind::Basic(_) => "basic",
            TypeKind::Struct(_) => "struct",
            TypeKind::Union(_) => "union",
            TypeKind::List(_) => "list",
            TypeKind::Enum(_) => "enum",
        }
    }
}

/// Smallest integer kind holding every value; signed wins ties, `int64`
/// when nothing narrower fits.
pub fn enum_wire_kind(values: impl IntoIterator<Item = i64>) -> BasicKind {
    let (min, max) = values
        .into_iter()
        .fold((0i64, 0i64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let candidates = [
        (BasicKind::Int8, i64::from(i8::MIN), i64::from(i8::MAX)),
        (BasicKind::UInt8, 0, i64::from(u8::MAX)),
        (BasicKind::Int16, i64::from(i16::MIN), i64::from(i16::MAX)),
        (BasicKind::UInt16, 0, i64::from(u16::MAX)),
        (BasicKind::Int32, i64::from(i32::MIN), i64::from(i32::MAX)),
        (BasicKind::UInt32, 0, i64::from(u32::MAX)),
    ];
    candidates
        .iter()
        .find(|(_, lo, hi)| min >= *lo && max <= *hi)
        .map_or(BasicKind::Int64, |(kind, _, _)| *kind)
}
