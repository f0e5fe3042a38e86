// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema type system.
//!
//! A [`Schema`] is an arena of [`TypeNode`]s forming a tree rooted at an
//! unnamed namespace. It is built once from a [`SchemaDefinition`], then
//! [`Schema::resolve`] turns every [`TypeRef`] into a [`TypeIndex`] and
//! validates field and flag uniqueness.
//!
//! # Example
//!
//! ```
//! use schemapack::schema::{FieldDefinition, Schema, SchemaDefinition, StructDefinition};
//!
//! let def = SchemaDefinition::new().with_namespace("demo").with_type(
//!     StructDefinition::new("Point")
//!         .field(FieldDefinition::required("x", "double"))
//!         .field(FieldDefinition::required("y", "double")),
//! );
//! let schema = Schema::load(&def).unwrap();
//! assert!(schema.get("demo.Point").is_some());
//! ```

pub mod definition;
mod resolve;
pub mod types;

#[cfg(test)]
mod tests;

pub use definition::{
    BasicDefinition, BasicEncoding, EnumDefinition, EnumValueDefinition, FieldDefinition,
    ListDefinition, NamespaceDefinition, SchemaDefinition, StructDefinition, TypeDefinition,
    UnionDefinition,
};
pub use types::{
    enum_wire_kind, BasicRepr, Encoding, EnumType, Field, ListType, MessageRole, StructType,
    TypeIndex, TypeKind, TypeNode, TypeRef, UnionType,
};

use crate::error::SchemaError;
use crate::wire::BasicKind;

/// Flag slots available per struct.
pub const MAX_OPTION_BITS: u16 = 256;

/// Union tag meaning "no option set".
pub const UNION_NONE_TAG: u8 = 255;

/// Legacy basic type names declared next to the canonical ones.
const BUILTIN_ALIASES: [(&str, BasicKind); 4] = [
    ("int", BasicKind::Int32),
    ("uint", BasicKind::UInt32),
    ("float", BasicKind::Float32),
    ("double", BasicKind::Float64),
];

/// Resolved-or-not schema graph.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<TypeNode>,
    messages: Vec<(i32, TypeIndex)>,
    resolved: bool,
}

impl Schema {
    /// The unnamed root namespace.
    pub const ROOT: TypeIndex = TypeIndex(0);

    /// Empty schema holding only the root namespace.
    pub fn empty() -> Self {
        Self {
            nodes: vec![TypeNode {
                name: String::new(),
                path: String::new(),
                parent: None,
                children: Vec::new(),
                kind: TypeKind::Namespace,
            }],
            messages: Vec::new(),
            resolved: false,
        }
    }

    /// Build the type tree. References stay unresolved.
    pub fn read(def: &SchemaDefinition) -> Result<Self, SchemaError> {
        let mut schema = Self::empty();
        if def.builtins {
            schema.add_builtins()?;
        }
        let mut scope = Self::ROOT;
        if let Some(namespace) = def.namespace.as_deref() {
            for part in namespace.split('.').filter(|p| !p.is_empty()) {
                scope = schema.open_namespace(scope, part)?;
            }
        }
        for ty in &def.types {
            schema.add_definition(scope, ty)?;
        }
        log::debug!("[schema] read {} types", schema.nodes.len() - 1);
        Ok(schema)
    }

    /// Read then resolve.
    pub fn load(def: &SchemaDefinition) -> Result<Self, SchemaError> {
        let mut schema = Self::read(def)?;
        schema.resolve()?;
        Ok(schema)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// # Panics
    /// Panics if `index` does not belong to this schema.
    pub fn node(&self, index: TypeIndex) -> &TypeNode {
        &self.nodes[index.0]
    }

    /// Every node with its index, root first.
    pub fn iter(&self) -> impl Iterator<Item = (TypeIndex, &TypeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (TypeIndex(i), node))
    }

    /// Dotted path of every declared type.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.nodes[1..].iter().map(|node| node.path.as_str())
    }

    /// Look up a type by absolute dotted path.
    pub fn get(&self, path: &str) -> Option<TypeIndex> {
        self.descend(Self::ROOT, path)
    }

    /// Relative lookup: try `dotted` below `scope`, then below each
    /// enclosing scope up to the root.
    pub fn find_type(&self, scope: TypeIndex, dotted: &str) -> Option<TypeIndex> {
        let mut current = Some(scope);
        while let Some(at) = current {
            if let Some(found) = self.descend(at, dotted) {
                return Some(found);
            }
            current = self.nodes[at.0].parent;
        }
        None
    }

    /// Direct child named `name`.
    pub fn child(&self, parent: TypeIndex, name: &str) -> Option<TypeIndex> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].name == name)
    }

    fn descend(&self, from: TypeIndex, dotted: &str) -> Option<TypeIndex> {
        if dotted.is_empty() {
            return None;
        }
        dotted
            .split('.')
            .try_fold(from, |at, part| self.child(at, part))
    }

    /// Concrete messages as `(id, type)`, sorted by id. Empty until resolved.
    pub fn messages(&self) -> &[(i32, TypeIndex)] {
        &self.messages
    }

    /// Struct followed by its ancestors' indices, root-most first.
    pub fn base_chain(&self, index: TypeIndex) -> Vec<TypeIndex> {
        let mut chain = vec![index];
        let mut current = index;
        while let Some(base) = self.nodes[current.0]
            .as_struct()
            .and_then(|s| s.base.as_ref())
            .and_then(TypeRef::target)
        {
            if chain.contains(&base) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain.reverse();
        chain
    }

    /// Struct fields including inherited ones, base-first in declaration order.
    pub fn flattened_fields(&self, index: TypeIndex) -> Vec<&Field> {
        self.base_chain(index)
            .into_iter()
            .filter_map(|i| self.nodes[i.0].as_struct())
            .flat_map(|s| s.fields.iter())
            .collect()
    }

    /// Number of flag bits a struct carries: highest slot + 1, 0 if none.
    pub fn flag_count(&self, index: TypeIndex) -> usize {
        self.flattened_fields(index)
            .iter()
            .filter_map(|f| f.flag_index())
            .map(|i| usize::from(i) + 1)
            .max()
            .unwrap_or(0)
    }

    fn add_builtins(&mut self) -> Result<(), SchemaError> {
        for kind in BasicKind::ALL {
            self.add_node(Self::ROOT, kind.name(), TypeKind::Basic(BasicRepr::Value(kind)))?;
        }
        for (name, kind) in BUILTIN_ALIASES {
            self.add_node(Self::ROOT, name, TypeKind::Basic(BasicRepr::Value(kind)))?;
        }
        self.add_node(Self::ROOT, "bool", TypeKind::Basic(BasicRepr::Bit))?;
        Ok(())
    }

    fn add_node(
        &mut self,
        parent: TypeIndex,
        name: &str,
        kind: TypeKind,
    ) -> Result<TypeIndex, SchemaError> {
        let parent_path = &self.nodes[parent.0].path;
        let path = if parent_path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", parent_path, name)
        };
        if self.child(parent, name).is_some() {
            return Err(SchemaError::DuplicateType { type_path: path });
        }
        let index = TypeIndex(self.nodes.len());
        self.nodes.push(TypeNode {
            name: name.to_string(),
            path,
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(index);
        Ok(index)
    }

    /// Reuse an existing namespace of that name, or create it.
    fn open_namespace(&mut self, parent: TypeIndex, name: &str) -> Result<TypeIndex, SchemaError> {
        match self.child(parent, name) {
            Some(existing) if self.nodes[existing.0].kind == TypeKind::Namespace => Ok(existing),
            _ => self.add_node(parent, name, TypeKind::Namespace),
        }
    }

    fn add_definition(&mut self, scope: TypeIndex, def: &TypeDefinition) -> Result<(), SchemaError> {
        match def {
            TypeDefinition::Namespace(ns) => {
                let index = self.open_namespace(scope, &ns.name)?;
                for ty in &ns.types {
                    self.add_definition(index, ty)?;
                }
            }
            TypeDefinition::Basic(basic) => {
                let repr = self.basic_repr(scope, basic)?;
                self.add_node(scope, &basic.name, TypeKind::Basic(repr))?;
            }
            TypeDefinition::Struct(st) => {
                let role = MessageRole::from_id(st.message_id).ok_or_else(|| {
                    SchemaError::InvalidMessageId {
                        type_path: self.path_in(scope, &st.name),
                        id: st.message_id.unwrap_or_default(),
                    }
                })?;
                let kind = TypeKind::Struct(StructType {
                    base: st.base.as_ref().map(TypeRef::new),
                    role,
                    fields: st.fields.iter().map(field_from_definition).collect(),
                });
                let index = self.add_node(scope, &st.name, kind)?;
                for ty in &st.types {
                    self.add_definition(index, ty)?;
                }
            }
            TypeDefinition::Union(un) => {
                let kind = TypeKind::Union(UnionType {
                    fields: un.fields.iter().map(field_from_definition).collect(),
                });
                self.add_node(scope, &un.name, kind)?;
            }
            TypeDefinition::List(list) => {
                let kind = TypeKind::List(ListType {
                    contained: TypeRef::new(&list.contained),
                });
                self.add_node(scope, &list.name, kind)?;
            }
            TypeDefinition::Enum(en) => {
                let kind = TypeKind::Enum(EnumType {
                    values: en
                        .values
                        .iter()
                        .map(|v| (v.name.clone(), v.value))
                        .collect(),
                    wire: None,
                });
                self.add_node(scope, &en.name, kind)?;
            }
        }
        Ok(())
    }

    fn basic_repr(&self, scope: TypeIndex, def: &BasicDefinition) -> Result<BasicRepr, SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidBasicType {
            type_path: self.path_in(scope, &def.name),
            reason,
        };
        if def.native == "bool" {
            return match def.encoding {
                BasicEncoding::Bit => Ok(BasicRepr::Bit),
                _ => Err(invalid("bool is only supported with bit encoding".into())),
            };
        }
        let kind = BasicKind::from_name(&def.native)
            .ok_or_else(|| invalid(format!("unknown native type '{}'", def.native)))?;
        match (def.encoding, kind.wire_size()) {
            (BasicEncoding::Fixed, Some(width)) => match def.size {
                Some(size) if size != width => Err(invalid(format!(
                    "{} is {} bytes wide, declared {}",
                    kind, width, size
                ))),
                _ => Ok(BasicRepr::Value(kind)),
            },
            (BasicEncoding::LengthPrefixed, None) => Ok(BasicRepr::Value(kind)),
            (encoding, _) => Err(invalid(format!(
                "{:?} encoding does not fit native type {}",
                encoding, kind
            ))),
        }
    }

    fn path_in(&self, scope: TypeIndex, name: &str) -> String {
        let parent = &self.nodes[scope.0].path;
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", parent, name)
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::empty()
    }
}

fn field_from_definition(def: &FieldDefinition) -> Field {
    Field {
        name: def.name.clone(),
        type_ref: TypeRef::new(&def.type_name),
        option_index: def.option,
        bit_index: def.bit,
        default: def.default.clone(),
        obsolete: def.obsolete,
    }
}
