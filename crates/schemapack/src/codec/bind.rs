// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Foreign-to-local binding: schema fields onto native members.
//!
//! Runs once per serializer. Every schema type gets a wire plan; types
//! with a native layout also get a bound codec whose fields are direct,
//! converted, or skip-only.

use super::lists::{ListCodec, ListPlan};
use super::structs::{FieldSlot, PlanField, StructCodec, StructPlan};
use super::unions::{OptionBinding, PlanOption, UnionCodec, UnionPlan};
use super::{
    flag_bytes, Binding, CodecTable, DecodeLimits, FieldCodec, NativeCodec, OptionFlags, TypeCodec,
    WirePlan,
};
use crate::error::BindError;
use crate::reflect::{LayoutKind, ListLayout, NativeLayout, StructLayout, UnionLayout};
use crate::schema::{BasicRepr, Schema, TypeIndex, TypeKind, UNION_NONE_TAG};
use crate::wire::{BasicKind, ConversionRegistry};
use std::any::TypeId;
use std::collections::HashSet;

/// Bind `layouts` against a resolved `schema`.
pub(crate) fn build_table(
    schema: Schema,
    layouts: &[NativeLayout],
    conversions: &ConversionRegistry,
    limits: DecodeLimits,
) -> Result<CodecTable, BindError> {
    if !schema.is_resolved() {
        return Err(BindError::UnresolvedSchema);
    }
    let plans = (0..schema.len())
        .map(|i| plan_for(&schema, TypeIndex(i)))
        .collect::<Result<Vec<_>, _>>()?;
    let min_sizes = min_wire_sizes(&plans);

    let mut by_type: Vec<Option<&NativeLayout>> = vec![None; schema.len()];
    for layout in layouts {
        let Some(ty) = schema.get(&layout.type_path) else {
            log::debug!("[bind] native layout {} has no schema type", layout.type_path);
            continue;
        };
        let fits = matches!(
            (&schema.node(ty).kind, &layout.kind),
            (TypeKind::Struct(_), LayoutKind::Struct(_))
                | (TypeKind::Union(_), LayoutKind::Union(_))
                | (TypeKind::List(_), LayoutKind::List(_))
        );
        if !fits {
            return Err(BindError::LayoutKindMismatch {
                type_path: layout.type_path.clone(),
            });
        }
        by_type[ty.0] = Some(layout);
    }

    let native_types: Vec<Option<TypeId>> = schema
        .iter()
        .map(|(i, node)| match node.basic_kind() {
            Some(kind) => Some(kind.native_type_id()),
            None => by_type[i.0].map(|l| l.type_id),
        })
        .collect();

    let binder = Binder {
        schema: &schema,
        native_types: &native_types,
        conversions,
    };
    let mut natives = Vec::with_capacity(schema.len());
    for (i, plan) in plans.iter().enumerate() {
        let ty = TypeIndex(i);
        let native = match (plan, by_type[i].map(|l| &l.kind)) {
            (WirePlan::Struct(p), Some(LayoutKind::Struct(l))) => {
                NativeCodec::Struct(binder.struct_codec(ty, p, l)?)
            }
            (WirePlan::Union(p), Some(LayoutKind::Union(l))) => {
                NativeCodec::Union(binder.union_codec(ty, p, l)?)
            }
            (WirePlan::List(p), Some(LayoutKind::List(l))) => {
                NativeCodec::List(binder.list_codec(ty, p, l)?)
            }
            _ => NativeCodec::Unbound,
        };
        natives.push(native);
    }

    let bound = natives
        .iter()
        .filter(|n| !matches!(n, NativeCodec::Unbound))
        .count();
    log::debug!(
        "[bind] {} schema types, {} bound to native layouts",
        schema.len() - 1,
        bound
    );

    let types = plans
        .into_iter()
        .zip(natives)
        .zip(native_types)
        .zip(min_sizes)
        .map(|(((plan, native), native_type), min_wire_size)| TypeCodec {
            plan,
            native,
            native_type,
            min_wire_size,
        })
        .collect();
    Ok(CodecTable {
        schema,
        types,
        limits,
    })
}

fn target(schema: &Schema, owner: TypeIndex, reference: Option<TypeIndex>) -> Result<TypeIndex, BindError> {
    reference.ok_or_else(|| {
        log::debug!("[bind] unresolved reference in {}", schema.node(owner).path);
        BindError::UnresolvedSchema
    })
}

fn plan_for(schema: &Schema, ty: TypeIndex) -> Result<WirePlan, BindError> {
    let plan = match &schema.node(ty).kind {
        TypeKind::Namespace => WirePlan::None,
        TypeKind::Basic(BasicRepr::Bit) => WirePlan::Bit,
        TypeKind::Basic(BasicRepr::Value(kind)) => WirePlan::Basic(*kind),
        TypeKind::Enum(en) => WirePlan::Basic(en.wire.ok_or(BindError::UnresolvedSchema)?),
        TypeKind::Struct(_) => {
            let mut fields = Vec::new();
            for field in schema.flattened_fields(ty) {
                let slot = match (field.bit_index, field.option_index) {
                    (Some(bit), _) => FieldSlot::Bit(bit),
                    (None, Some(option)) => FieldSlot::Optional(option),
                    (None, None) => FieldSlot::Required,
                };
                fields.push(PlanField {
                    name: field.name.clone(),
                    ty: target(schema, ty, field.type_ref.target())?,
                    slot,
                    obsolete: field.obsolete,
                });
            }
            WirePlan::Struct(StructPlan {
                flag_bytes: flag_bytes(schema.flag_count(ty)),
                fields,
            })
        }
        TypeKind::Union(un) => {
            let mut options = Vec::with_capacity(un.fields.len());
            for field in &un.fields {
                let index = field
                    .option_index
                    .and_then(|i| u8::try_from(i).ok())
                    .ok_or(BindError::UnresolvedSchema)?;
                options.push(PlanOption {
                    index,
                    name: field.name.clone(),
                    ty: target(schema, ty, field.type_ref.target())?,
                });
            }
            WirePlan::Union(UnionPlan { options })
        }
        TypeKind::List(list) => WirePlan::List(ListPlan {
            element: target(schema, ty, list.contained.target())?,
        }),
    };
    Ok(plan)
}

#[derive(Clone, Copy)]
enum Visit {
    New,
    Active,
    Done(usize),
}

/// Smallest encoded size of every type. Self-reference counts as 0.
fn min_wire_sizes(plans: &[WirePlan]) -> Vec<usize> {
    fn visit(i: usize, plans: &[WirePlan], state: &mut [Visit]) -> usize {
        match state[i] {
            Visit::Done(size) => return size,
            Visit::Active => return 0,
            Visit::New => state[i] = Visit::Active,
        }
        let size = match &plans[i] {
            WirePlan::None | WirePlan::Bit => 0,
            WirePlan::Basic(kind) => kind.wire_size().unwrap_or(4),
            WirePlan::Struct(plan) => plan
                .fields
                .iter()
                .filter(|f| f.slot == FieldSlot::Required)
                .fold(plan.flag_bytes, |acc, f| {
                    acc.saturating_add(visit(f.ty.0, plans, state))
                }),
            WirePlan::Union(_) => 1,
            WirePlan::List(_) => 4,
        };
        state[i] = Visit::Done(size);
        size
    }

    let mut state = vec![Visit::New; plans.len()];
    (0..plans.len())
        .map(|i| visit(i, plans, &mut state))
        .collect()
}

struct Binder<'a> {
    schema: &'a Schema,
    native_types: &'a [Option<TypeId>],
    conversions: &'a ConversionRegistry,
}

impl Binder<'_> {
    fn path(&self, ty: TypeIndex) -> &str {
        &self.schema.node(ty).path
    }

    /// Codec between a native member declared as `native_name` (Rust type
    /// `native_id`) and wire type `wire`.
    fn field_codec(
        &self,
        owner: TypeIndex,
        field: &str,
        wire: TypeIndex,
        native_name: &str,
        native_id: TypeId,
    ) -> Result<FieldCodec, BindError> {
        let owner_path = self.path(owner);
        let native_ty = self
            .schema
            .find_type(owner, native_name)
            .filter(|t| self.schema.node(*t).kind != TypeKind::Namespace);
        let no_conversion = |wire_name: &str| BindError::NoConversion {
            type_path: owner_path.to_string(),
            field: field.to_string(),
            native: native_name.to_string(),
            wire: wire_name.to_string(),
        };
        let type_mismatch = || BindError::NativeTypeMismatch {
            type_path: owner_path.to_string(),
            field: field.to_string(),
            declared: native_name.to_string(),
        };

        let wire_node = self.schema.node(wire);
        if let Some(wire_kind) = wire_node.basic_kind() {
            let native_kind = match native_ty {
                Some(t) => self
                    .schema
                    .node(t)
                    .basic_kind()
                    .ok_or_else(|| no_conversion(wire_kind.name()))?,
                None => BasicKind::from_name(native_name).ok_or_else(|| BindError::UnknownNativeType {
                    type_path: owner_path.to_string(),
                    field: field.to_string(),
                    native: native_name.to_string(),
                })?,
            };
            if native_id != native_kind.native_type_id() {
                return Err(type_mismatch());
            }
            if native_kind == wire_kind {
                return Ok(FieldCodec::Basic(wire_kind));
            }
            return self
                .conversions
                .find(native_kind, wire_kind)
                .map(FieldCodec::Convert)
                .ok_or_else(|| BindError::NoConversion {
                    type_path: owner_path.to_string(),
                    field: field.to_string(),
                    native: native_kind.name().to_string(),
                    wire: wire_kind.name().to_string(),
                });
        }
        if !wire_node.is_composite() {
            return Err(no_conversion(&wire_node.path));
        }

        let native_ty = native_ty.ok_or_else(|| BindError::UnknownNativeType {
            type_path: owner_path.to_string(),
            field: field.to_string(),
            native: native_name.to_string(),
        })?;
        if native_ty != wire {
            return Err(no_conversion(&wire_node.path));
        }
        let bound_id = self.native_types[wire.0].ok_or_else(|| BindError::MissingLayout {
            type_path: owner_path.to_string(),
            field: field.to_string(),
            field_type: wire_node.path.clone(),
        })?;
        if bound_id != native_id {
            return Err(type_mismatch());
        }
        Ok(FieldCodec::Composite(wire))
    }

    fn struct_codec(
        &self,
        ty: TypeIndex,
        plan: &StructPlan,
        layout: &StructLayout,
    ) -> Result<StructCodec, BindError> {
        let path = self.path(ty);
        let mut writable = OptionFlags::new();
        let mut fields = Vec::with_capacity(plan.fields.len());
        for field in &plan.fields {
            if let FieldSlot::Bit(bit) = field.slot {
                writable.set(bit, true);
                fields.push(None);
                continue;
            }
            let member = if field.obsolete {
                None
            } else {
                layout.member(&field.name)
            };
            let Some(member) = member else {
                log::debug!("[bind] {}.{} is skip-only", path, field.name);
                fields.push(None);
                continue;
            };
            let option = match field.slot {
                FieldSlot::Optional(i) => Some(i),
                _ => None,
            };
            if member.option_index != option {
                log::warn!(
                    "[bind] {}.{}: native option index {:?} differs from schema {:?}",
                    path,
                    field.name,
                    member.option_index,
                    option
                );
            }
            let codec = self.field_codec(
                ty,
                &field.name,
                field.ty,
                &member.type_name,
                member.access.value_type(),
            )?;
            if let Some(i) = option {
                writable.set(i, true);
            }
            fields.push(Some(Binding {
                access: member.access.clone(),
                codec,
            }));
        }

        for member in &layout.members {
            if !plan.fields.iter().any(|f| f.name == member.field) {
                log::debug!("[bind] {}.{} exists only natively", path, member.field);
            }
        }

        if let Some(flags) = &layout.flags {
            if flags.value_type() != TypeId::of::<OptionFlags>() {
                return Err(BindError::NativeTypeMismatch {
                    type_path: path.to_string(),
                    field: "flags".into(),
                    declared: "OptionFlags".into(),
                });
            }
        } else if plan.flag_bytes > 0 {
            log::debug!("[bind] {} has no native flags; optionals are never written", path);
        }

        Ok(StructCodec {
            fields,
            flags: layout.flags.clone(),
            writable,
        })
    }

    fn union_codec(
        &self,
        ty: TypeIndex,
        plan: &UnionPlan,
        layout: &UnionLayout,
    ) -> Result<UnionCodec, BindError> {
        let path = self.path(ty);
        let mut seen = HashSet::new();
        for option in &layout.options {
            if option.index == UNION_NONE_TAG || !seen.insert(option.index) {
                return Err(BindError::UnknownOption {
                    type_path: path.to_string(),
                    field: option.field.clone(),
                    index: option.index,
                });
            }
        }

        let mut options = Vec::with_capacity(plan.options.len());
        for option in &plan.options {
            let Some(native) = layout.option(&option.name) else {
                log::debug!("[bind] {}.{} is skip-only", path, option.name);
                options.push(None);
                continue;
            };
            let codec = self.field_codec(
                ty,
                &option.name,
                option.ty,
                &native.type_name,
                native.access.value_type(),
            )?;
            options.push(Some(OptionBinding {
                native_index: native.index,
                binding: Binding {
                    access: native.access.clone(),
                    codec,
                },
            }));
        }
        Ok(UnionCodec {
            options,
            discriminant: layout.discriminant.clone(),
        })
    }

    fn list_codec(&self, ty: TypeIndex, plan: &ListPlan, layout: &ListLayout) -> Result<ListCodec, BindError> {
        let element = self.field_codec(
            ty,
            "element",
            plan.element,
            &layout.element_type,
            layout.access.element_type(),
        )?;
        Ok(ListCodec {
            access: layout.access.clone(),
            element,
        })
    }
}
