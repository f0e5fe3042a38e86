// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shapes of every schema type and the accessors that expose dynamic values
//! to the codecs.

use super::value::{
    DynamicList, DynamicRecord, DynamicUnion, DynamicValue, Presence, RecordField, RecordShape,
    UnionShape,
};
use crate::codec::OptionFlags;
use crate::error::BindError;
use crate::message::Message;
use crate::reflect::{ListAccess, MemberAccess, Reflector, UnionDiscriminant};
use crate::schema::{Schema, TypeIndex, TypeKind};
use crate::wire::{BasicKind, Scalar};
use std::any::{Any, TypeId};
use std::sync::Arc;

enum Shape {
    /// Basic, enum, bit or namespace.
    Plain,
    Record(Arc<RecordShape>),
    Union(Arc<UnionShape>),
    List(TypeIndex),
}

/// Runtime layouts for every type of one schema.
pub struct DynamicCatalog {
    schema: Schema,
    shapes: Vec<Shape>,
}

impl std::fmt::Debug for DynamicCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicCatalog")
            .field("types", &self.schema.len())
            .finish()
    }
}

fn zero(kind: BasicKind) -> DynamicValue {
    match Scalar::I64(0).cast(kind) {
        Some(s) => DynamicValue::Scalar(s),
        None => DynamicValue::String(String::new()),
    }
}

fn unresolved(schema: &Schema, ty: TypeIndex) -> BindError {
    log::debug!("[dynamic] unresolved reference in {}", schema.node(ty).path);
    BindError::UnresolvedSchema
}

impl DynamicCatalog {
    /// Derive shapes from a resolved schema.
    pub fn new(schema: &Schema) -> Result<Arc<Self>, BindError> {
        if !schema.is_resolved() {
            return Err(BindError::UnresolvedSchema);
        }
        check_recursion(schema)?;
        let mut shapes = Vec::with_capacity(schema.len());
        for (ty, node) in schema.iter() {
            let shape = match &node.kind {
                TypeKind::Struct(_) => Shape::Record(Arc::new(record_shape(schema, ty)?)),
                TypeKind::Union(un) => {
                    let mut options = Vec::with_capacity(un.fields.len());
                    for field in &un.fields {
                        let tag = field
                            .option_index
                            .and_then(|i| u8::try_from(i).ok())
                            .ok_or_else(|| unresolved(schema, ty))?;
                        let target = field.type_ref.target().ok_or_else(|| unresolved(schema, ty))?;
                        options.push((tag, field.name.clone(), target));
                    }
                    Shape::Union(Arc::new(UnionShape {
                        type_path: node.path.clone(),
                        options,
                    }))
                }
                TypeKind::List(list) => {
                    Shape::List(list.contained.target().ok_or_else(|| unresolved(schema, ty))?)
                }
                _ => Shape::Plain,
            };
            shapes.push(shape);
        }
        Ok(Arc::new(Self {
            schema: schema.clone(),
            shapes,
        }))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Fresh record of struct `type_path` holding schema defaults.
    pub fn new_record(&self, type_path: &str) -> Option<DynamicRecord> {
        match &self.shapes[self.schema.get(type_path)?.0] {
            Shape::Record(shape) => Some(self.instantiate(shape)),
            _ => None,
        }
    }

    /// Default value of any non-bit type.
    pub fn default_value(&self, type_path: &str) -> Option<DynamicValue> {
        let ty = self.schema.get(type_path)?;
        self.value_for(ty)
    }

    fn instantiate(&self, shape: &Arc<RecordShape>) -> DynamicRecord {
        let values = shape
            .fields
            .iter()
            .filter(|f| f.slot.is_some())
            .map(|f| {
                f.default
                    .clone()
                    .or_else(|| self.value_for(f.ty))
                    .unwrap_or_else(|| DynamicValue::String(String::new()))
            })
            .collect();
        DynamicRecord {
            shape: Arc::clone(shape),
            flags: shape.default_flags,
            values,
        }
    }

    fn value_for(&self, ty: TypeIndex) -> Option<DynamicValue> {
        match &self.shapes[ty.0] {
            Shape::Record(shape) => Some(DynamicValue::Record(self.instantiate(shape))),
            Shape::Union(shape) => Some(DynamicValue::Union(DynamicUnion {
                shape: Arc::clone(shape),
                active: None,
            })),
            Shape::List(_) => Some(DynamicValue::List(DynamicList::default())),
            Shape::Plain => self.schema.node(ty).basic_kind().map(zero),
        }
    }

    /// Rust type a codec sees for a value of `ty`.
    fn native_type(&self, ty: TypeIndex) -> TypeId {
        match &self.shapes[ty.0] {
            Shape::Record(_) => TypeId::of::<DynamicRecord>(),
            Shape::Union(_) => TypeId::of::<DynamicUnion>(),
            Shape::List(_) => TypeId::of::<DynamicList>(),
            Shape::Plain => self
                .schema
                .node(ty)
                .basic_kind()
                .map_or(TypeId::of::<()>(), BasicKind::native_type_id),
        }
    }

    /// Type name to declare a member of `ty` with: the wire kind for basics
    /// and enums, the type path for composites.
    fn member_type_name(&self, ty: TypeIndex) -> String {
        let node = self.schema.node(ty);
        match node.basic_kind() {
            Some(kind) => kind.name().to_string(),
            None => node.path.clone(),
        }
    }

    /// Declare a layout for every struct, union and list of the schema.
    pub fn register(self: &Arc<Self>, reflector: &mut Reflector) {
        for (ty, node) in self.schema.iter() {
            match &self.shapes[ty.0] {
                Shape::Plain => {}
                Shape::Record(shape) => {
                    let mut builder = reflector.begin_struct::<DynamicRecord>(&node.path);
                    for field in &shape.fields {
                        let Some(slot) = field.slot else { continue };
                        let option = match field.presence {
                            Presence::Optional(i) => Some(i),
                            _ => None,
                        };
                        builder = builder.member_with(
                            &self.member_type_name(field.ty),
                            &field.name,
                            option,
                            Arc::new(RecordMember {
                                slot,
                                native: self.native_type(field.ty),
                            }),
                        );
                    }
                    builder = builder.optional_flags_with(Arc::new(RecordFlags));
                    if node.as_struct().and_then(|s| s.role.id()).is_some() {
                        let catalog = Arc::clone(self);
                        let shape = Arc::clone(shape);
                        builder = builder.message_factory(Arc::new(move || {
                            Box::new(catalog.instantiate(&shape)) as Box<dyn Message>
                        }));
                    }
                    builder.end();
                }
                Shape::Union(shape) => {
                    let mut builder = reflector.begin_union_with::<DynamicUnion>(
                        &node.path,
                        Arc::new(UnionSwitch {
                            catalog: Arc::clone(self),
                            shape: Arc::clone(shape),
                        }),
                    );
                    for (tag, name, option_ty) in &shape.options {
                        builder = builder.option_with(
                            &self.member_type_name(*option_ty),
                            name,
                            *tag,
                            Arc::new(UnionMember {
                                tag: *tag,
                                native: self.native_type(*option_ty),
                            }),
                        );
                    }
                    builder.end();
                }
                Shape::List(element) => {
                    reflector.register_list_with::<DynamicList>(
                        &node.path,
                        &self.member_type_name(*element),
                        Arc::new(ListItems {
                            catalog: Arc::clone(self),
                            element: *element,
                            native: self.native_type(*element),
                        }),
                    );
                }
            }
        }
    }
}

fn record_shape(schema: &Schema, ty: TypeIndex) -> Result<RecordShape, BindError> {
    let path = &schema.node(ty).path;
    let mut fields = Vec::new();
    let mut default_flags = OptionFlags::new();
    let mut next_slot = 0;
    for field in schema.flattened_fields(ty) {
        let target = field.type_ref.target().ok_or_else(|| unresolved(schema, ty))?;
        let presence = match (field.bit_index, field.option_index) {
            (Some(bit), _) => Presence::Bit(bit),
            (None, Some(option)) => Presence::Optional(option),
            (None, None) => Presence::Required,
        };
        let default = field.default.as_deref();
        if let Presence::Bit(bit) = presence {
            if default.is_some_and(|d| matches!(d.trim(), "true" | "1")) {
                default_flags.set(bit, true);
            }
        }
        let slot = match presence {
            Presence::Bit(_) => None,
            _ if field.obsolete => None,
            _ => {
                next_slot += 1;
                Some(next_slot - 1)
            }
        };
        let default = match (slot, default) {
            (Some(_), Some(text)) => parse_default(schema, target, text).or_else(|| {
                log::warn!(
                    "[dynamic] {}.{}: ignoring default '{}' for {}",
                    path,
                    field.name,
                    text,
                    schema.node(target).path
                );
                None
            }),
            _ => None,
        };
        fields.push(RecordField {
            name: field.name.clone(),
            ty: target,
            presence,
            slot,
            default,
        });
    }
    Ok(RecordShape {
        type_path: path.clone(),
        fields,
        default_flags,
    })
}

/// Parse a schema default: numbers, strings, or enumerant names.
fn parse_default(schema: &Schema, ty: TypeIndex, text: &str) -> Option<DynamicValue> {
    let node = schema.node(ty);
    let kind = node.basic_kind()?;
    if let Some(en) = node.as_enum() {
        let value = en
            .value_of(text.trim())
            .or_else(|| text.trim().parse::<i64>().ok())?;
        return Scalar::I64(value).cast(kind).map(DynamicValue::Scalar);
    }
    if kind == BasicKind::String {
        return Some(DynamicValue::String(text.to_string()));
    }
    Scalar::parse(kind, text).ok().map(DynamicValue::Scalar)
}

/// Reject structs that contain themselves by value.
fn check_recursion(schema: &Schema) -> Result<(), BindError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(schema: &Schema, ty: TypeIndex, marks: &mut [Mark]) -> Result<(), BindError> {
        match marks[ty.0] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                return Err(BindError::RecursiveType {
                    type_path: schema.node(ty).path.clone(),
                })
            }
            Mark::New => marks[ty.0] = Mark::Active,
        }
        for field in schema.flattened_fields(ty) {
            if field.bit_index.is_some() || field.obsolete {
                continue;
            }
            if let Some(target) = field.type_ref.target() {
                if schema.node(target).as_struct().is_some() {
                    visit(schema, target, marks)?;
                }
            }
        }
        marks[ty.0] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::New; schema.len()];
    for (ty, node) in schema.iter() {
        if node.as_struct().is_some() {
            visit(schema, ty, &mut marks)?;
        }
    }
    Ok(())
}

struct RecordMember {
    slot: usize,
    native: TypeId,
}

impl MemberAccess for RecordMember {
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        owner
            .downcast_ref::<DynamicRecord>()?
            .values
            .get(self.slot)
            .map(DynamicValue::as_any)
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        owner
            .downcast_mut::<DynamicRecord>()?
            .values
            .get_mut(self.slot)
            .map(DynamicValue::as_any_mut)
    }

    fn value_type(&self) -> TypeId {
        self.native
    }
}

struct RecordFlags;

impl MemberAccess for RecordFlags {
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        owner
            .downcast_ref::<DynamicRecord>()
            .map(|r| &r.flags as &dyn Any)
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        owner
            .downcast_mut::<DynamicRecord>()
            .map(|r| &mut r.flags as &mut dyn Any)
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<OptionFlags>()
    }
}

struct UnionSwitch {
    catalog: Arc<DynamicCatalog>,
    shape: Arc<UnionShape>,
}

impl UnionDiscriminant for UnionSwitch {
    fn active(&self, owner: &dyn Any) -> Option<Option<u8>> {
        owner
            .downcast_ref::<DynamicUnion>()
            .map(|u| u.active.as_ref().map(|(tag, _)| *tag))
    }

    fn set_active(&self, owner: &mut dyn Any, tag: Option<u8>) -> bool {
        let Some(union) = owner.downcast_mut::<DynamicUnion>() else {
            return false;
        };
        union.active = tag.and_then(|tag| {
            let (_, _, ty) = self.shape.options.iter().find(|(t, _, _)| *t == tag)?;
            let value = self.catalog.value_for(*ty)?;
            Some((tag, Box::new(value)))
        });
        true
    }
}

struct UnionMember {
    tag: u8,
    native: TypeId,
}

impl MemberAccess for UnionMember {
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        match &owner.downcast_ref::<DynamicUnion>()?.active {
            Some((tag, value)) if *tag == self.tag => Some(value.as_any()),
            _ => None,
        }
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        match &mut owner.downcast_mut::<DynamicUnion>()?.active {
            Some((tag, value)) if *tag == self.tag => Some(value.as_any_mut()),
            _ => None,
        }
    }

    fn value_type(&self) -> TypeId {
        self.native
    }
}

struct ListItems {
    catalog: Arc<DynamicCatalog>,
    element: TypeIndex,
    native: TypeId,
}

impl ListAccess for ListItems {
    fn len(&self, list: &dyn Any) -> Option<usize> {
        list.downcast_ref::<DynamicList>().map(DynamicList::len)
    }

    fn resize(&self, list: &mut dyn Any, len: usize) -> bool {
        let Some(list) = list.downcast_mut::<DynamicList>() else {
            return false;
        };
        list.items.clear();
        let Some(prototype) = self.catalog.value_for(self.element) else {
            return len == 0;
        };
        list.items.resize(len, prototype);
        true
    }

    fn element<'a>(&self, list: &'a dyn Any, index: usize) -> Option<&'a dyn Any> {
        list.downcast_ref::<DynamicList>()?
            .items
            .get(index)
            .map(DynamicValue::as_any)
    }

    fn element_mut<'a>(&self, list: &'a mut dyn Any, index: usize) -> Option<&'a mut dyn Any> {
        list.downcast_mut::<DynamicList>()?
            .items
            .get_mut(index)
            .map(DynamicValue::as_any_mut)
    }

    fn element_type(&self) -> TypeId {
        self.native
    }

    fn element_size(&self) -> usize {
        std::mem::size_of::<DynamicValue>()
    }
}
