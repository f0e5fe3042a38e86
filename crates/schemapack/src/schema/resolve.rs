// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference resolution and structural validation.

use super::types::{enum_wire_kind, BasicRepr, Field, TypeIndex, TypeKind};
use super::{Schema, MAX_OPTION_BITS, UNION_NONE_TAG};
use crate::error::SchemaError;
use std::collections::{BTreeMap, HashMap, HashSet};

impl Schema {
    /// Resolve every type reference and validate the graph.
    ///
    /// Bases are resolved first so that inherited fields can be checked
    /// together with a struct's own fields.
    pub fn resolve(&mut self) -> Result<(), SchemaError> {
        self.resolve_bases()?;
        self.check_cycles()?;
        self.resolve_references()?;
        self.resolve_enums()?;
        for i in 0..self.nodes.len() {
            self.validate(TypeIndex(i))?;
        }
        self.collect_messages()?;
        self.resolved = true;
        log::debug!(
            "[schema] resolved {} types, {} messages",
            self.nodes.len() - 1,
            self.messages.len()
        );
        Ok(())
    }

    fn resolve_bases(&mut self) -> Result<(), SchemaError> {
        for i in 0..self.nodes.len() {
            let node = &self.nodes[i];
            let Some(base) = node.as_struct().and_then(|s| s.base.as_ref()) else {
                continue;
            };
            let scope = node.parent.unwrap_or(Self::ROOT);
            let target = self.find_type(scope, &base.name);
            match target {
                Some(t) if self.nodes[t.0].as_struct().is_some() => {
                    if let TypeKind::Struct(s) = &mut self.nodes[i].kind {
                        if let Some(base) = s.base.as_mut() {
                            base.resolved = Some(t);
                        }
                    }
                }
                Some(_) => {
                    return Err(SchemaError::InvalidBase {
                        type_path: node.path.clone(),
                        base: base.name.clone(),
                    })
                }
                None => {
                    return Err(SchemaError::UnresolvedType {
                        type_path: node.path.clone(),
                        reference: base.name.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    fn check_cycles(&self) -> Result<(), SchemaError> {
        for (index, node) in self.iter() {
            let mut current = index;
            for _ in 0..self.nodes.len() {
                let next = self.nodes[current.0]
                    .as_struct()
                    .and_then(|s| s.base.as_ref())
                    .and_then(|b| b.resolved);
                match next {
                    Some(next) if next == index => {
                        return Err(SchemaError::InheritanceCycle {
                            type_path: node.path.clone(),
                        })
                    }
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
        Ok(())
    }

    /// Look up a field or element type; namespaces are not types.
    fn lookup_value_type(&self, scope: TypeIndex, name: &str) -> Option<TypeIndex> {
        self.find_type(scope, name)
            .filter(|t| self.nodes[t.0].kind != TypeKind::Namespace)
    }

    fn resolve_references(&mut self) -> Result<(), SchemaError> {
        for i in 0..self.nodes.len() {
            let scope = TypeIndex(i);
            let node = &self.nodes[i];
            let names: Vec<&str> = match &node.kind {
                TypeKind::Struct(s) => s.fields.iter().map(|f| f.type_ref.name.as_str()).collect(),
                TypeKind::Union(u) => u.fields.iter().map(|f| f.type_ref.name.as_str()).collect(),
                TypeKind::List(l) => vec![l.contained.name.as_str()],
                _ => continue,
            };
            let mut targets = Vec::with_capacity(names.len());
            for name in names {
                let target = self.lookup_value_type(scope, name).ok_or_else(|| {
                    SchemaError::UnresolvedType {
                        type_path: node.path.clone(),
                        reference: name.to_string(),
                    }
                })?;
                targets.push(target);
            }
            match &mut self.nodes[i].kind {
                TypeKind::Struct(s) => assign(&mut s.fields, &targets),
                TypeKind::Union(u) => assign(&mut u.fields, &targets),
                TypeKind::List(l) => l.contained.resolved = targets.first().copied(),
                _ => {}
            }
        }
        Ok(())
    }

    fn resolve_enums(&mut self) -> Result<(), SchemaError> {
        for node in &mut self.nodes {
            let path = node.path.clone();
            let TypeKind::Enum(en) = &mut node.kind else {
                continue;
            };
            let malformed = |reason: String| SchemaError::MalformedEnum {
                type_path: path.clone(),
                reason,
            };
            if en.values.is_empty() {
                return Err(malformed("no values".into()));
            }
            let mut names = HashSet::new();
            let mut values = HashSet::new();
            for (name, value) in &en.values {
                if !names.insert(name.as_str()) {
                    return Err(malformed(format!("duplicate enumerant '{}'", name)));
                }
                if !values.insert(*value) {
                    return Err(malformed(format!("duplicate value {}", value)));
                }
            }
            en.wire = Some(enum_wire_kind(en.values.iter().map(|(_, v)| *v)));
        }
        Ok(())
    }

    fn validate(&self, index: TypeIndex) -> Result<(), SchemaError> {
        let node = &self.nodes[index.0];
        match &node.kind {
            TypeKind::Struct(_) => self.validate_struct(index),
            TypeKind::Union(u) => self.validate_union(&node.path, &u.fields),
            TypeKind::List(l) => {
                let element = l.contained.resolved.map(|t| &self.nodes[t.0]);
                match element {
                    Some(e) if e.kind != TypeKind::Basic(BasicRepr::Bit) => Ok(()),
                    _ => Err(SchemaError::InvalidListElement {
                        type_path: node.path.clone(),
                        contained: l.contained.name.clone(),
                    }),
                }
            }
            _ => Ok(()),
        }
    }

    fn is_bit_field(&self, field: &Field) -> bool {
        field
            .type_ref
            .resolved
            .is_some_and(|t| self.nodes[t.0].kind == TypeKind::Basic(BasicRepr::Bit))
    }

    fn validate_struct(&self, index: TypeIndex) -> Result<(), SchemaError> {
        let type_path = &self.nodes[index.0].path;
        let mut names = HashSet::new();
        let mut slots: HashMap<u16, &str> = HashMap::new();
        for field in self.flattened_fields(index) {
            let bit_error = |reason: &'static str| SchemaError::InvalidBitField {
                type_path: type_path.clone(),
                field: field.name.clone(),
                reason,
            };
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    type_path: type_path.clone(),
                    field: field.name.clone(),
                });
            }
            if self.is_bit_field(field) {
                if field.bit_index.is_none() {
                    return Err(bit_error("bit-encoded field needs a bit index"));
                }
                if field.option_index.is_some() {
                    return Err(bit_error("bit-encoded field cannot be optional"));
                }
            } else if field.bit_index.is_some() {
                return Err(bit_error("only bit-encoded fields take a bit index"));
            }
            if let Some(slot) = field.flag_index() {
                if slot >= MAX_OPTION_BITS {
                    return Err(SchemaError::FlagIndexOutOfRange {
                        type_path: type_path.clone(),
                        field: field.name.clone(),
                        index: slot,
                        limit: MAX_OPTION_BITS,
                    });
                }
                if let Some(first) = slots.insert(slot, field.name.as_str()) {
                    return Err(SchemaError::DuplicateFlagIndex {
                        type_path: type_path.clone(),
                        index: slot,
                        first: first.to_string(),
                        second: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_union(&self, type_path: &str, fields: &[Field]) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        let mut tags: HashMap<u16, &str> = HashMap::new();
        for field in fields {
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    type_path: type_path.to_string(),
                    field: field.name.clone(),
                });
            }
            if self.is_bit_field(field) || field.bit_index.is_some() {
                return Err(SchemaError::InvalidBitField {
                    type_path: type_path.to_string(),
                    field: field.name.clone(),
                    reason: "union options cannot be bit-encoded",
                });
            }
            let Some(tag) = field.option_index else {
                return Err(SchemaError::UnionFieldNotOptional {
                    type_path: type_path.to_string(),
                    field: field.name.clone(),
                });
            };
            if tag >= u16::from(UNION_NONE_TAG) {
                return Err(SchemaError::FlagIndexOutOfRange {
                    type_path: type_path.to_string(),
                    field: field.name.clone(),
                    index: tag,
                    limit: u16::from(UNION_NONE_TAG),
                });
            }
            if let Some(first) = tags.insert(tag, field.name.as_str()) {
                return Err(SchemaError::DuplicateFlagIndex {
                    type_path: type_path.to_string(),
                    index: tag,
                    first: first.to_string(),
                    second: field.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn collect_messages(&mut self) -> Result<(), SchemaError> {
        let mut by_id: BTreeMap<i32, TypeIndex> = BTreeMap::new();
        for (index, node) in self.iter() {
            let Some(id) = node.as_struct().and_then(|s| s.role.id()) else {
                continue;
            };
            if let Some(first) = by_id.insert(id, index) {
                return Err(SchemaError::DuplicateMessageId {
                    id,
                    first: self.nodes[first.0].path.clone(),
                    second: node.path.clone(),
                });
            }
        }
        self.messages = by_id.into_iter().collect();
        Ok(())
    }
}

fn assign(fields: &mut [Field], targets: &[TypeIndex]) {
    for (field, target) in fields.iter_mut().zip(targets) {
        field.type_ref.resolved = Some(*target);
    }
}
