// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic records: native layouts derived from the schema itself.
//!
//! With no generated code, every struct decodes into a [`DynamicRecord`],
//! every union into a [`DynamicUnion`] and every list into a
//! [`DynamicList`]. Field values are stored as the same Rust types a static
//! layout would use, so the regular codecs run unchanged.
//!
//! ```
//! use schemapack::dynamic::register_dynamic_layouts;
//! use schemapack::reflect::Reflector;
//! use schemapack::schema::{FieldDefinition, Schema, SchemaDefinition, StructDefinition};
//! use schemapack::Serializer;
//!
//! let def = SchemaDefinition::new().with_type(
//!     StructDefinition::new("Ping")
//!         .message(1)
//!         .field(FieldDefinition::required("seq", "uint32")),
//! );
//! let schema = Schema::load(&def).unwrap();
//! let mut reflector = Reflector::new();
//! let catalog = register_dynamic_layouts(&schema, &mut reflector).unwrap();
//! let mut serializer = Serializer::default();
//! serializer.initialize(schema, reflector).unwrap();
//!
//! let mut ping = catalog.new_record("Ping").unwrap();
//! assert!(ping.set("seq", 42u32));
//! let mut buf = schemapack::wire::PackBuffer::new();
//! assert_eq!(serializer.encode_message(&ping, &mut buf).unwrap(), 1);
//! ```

mod catalog;
mod value;

pub use catalog::DynamicCatalog;
pub use value::{DynamicList, DynamicRecord, DynamicUnion, DynamicValue};

use crate::error::BindError;
use crate::reflect::Reflector;
use crate::schema::Schema;
use std::sync::Arc;

/// Declare dynamic layouts for every struct, union and list of `schema`.
///
/// Fails with [`BindError::RecursiveType`] when a struct contains itself
/// other than through a union or a list.
pub fn register_dynamic_layouts(
    schema: &Schema,
    reflector: &mut Reflector,
) -> Result<Arc<DynamicCatalog>, BindError> {
    let catalog = DynamicCatalog::new(schema)?;
    catalog.register(reflector);
    log::debug!("[dynamic] {} layouts registered", reflector.len());
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        EnumDefinition, FieldDefinition, ListDefinition, SchemaDefinition, StructDefinition,
        UnionDefinition,
    };
    use crate::wire::Scalar;

    fn schema() -> Schema {
        let def = SchemaDefinition::new().with_namespace("demo").with_type(
            StructDefinition::new("Track")
                .message(3)
                .nested(EnumDefinition::new("Kind").value("air", 1).value("sea", 2))
                .nested(ListDefinition::new("Points", "double"))
                .nested(
                    UnionDefinition::new("Tag")
                        .option("label", "string", 0)
                        .option("code", "int32", 1),
                )
                .field(FieldDefinition::required("id", "uint32").with_default("7"))
                .field(FieldDefinition::required("kind", "Kind").with_default("sea"))
                .field(FieldDefinition::required("armed", "bool").bit(0).with_default("true"))
                .field(FieldDefinition::required("points", "Points"))
                .field(FieldDefinition::required("tag", "Tag"))
                .field(FieldDefinition::required("name", "string").optional(1)),
        );
        Schema::load(&def).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let catalog = DynamicCatalog::new(&schema()).unwrap();
        let track = catalog.new_record("demo.Track").unwrap();
        assert_eq!(track.get("id").and_then(DynamicValue::as_scalar), Some(Scalar::U32(7)));
        assert_eq!(track.get("kind").and_then(DynamicValue::as_scalar), Some(Scalar::I8(2)));
        assert_eq!(track.bit("armed"), Some(true));
        assert!(!track.is_present("name"));
        assert!(track.get("tag").and_then(DynamicValue::as_union).is_some());
    }

    #[test]
    fn test_set_checks_type_and_marks_optional() {
        let catalog = DynamicCatalog::new(&schema()).unwrap();
        let mut track = catalog.new_record("demo.Track").unwrap();
        assert!(!track.set("id", "wrong"));
        assert!(track.set("name", "alpha"));
        assert!(track.is_present("name"));
        assert!(track.clear("name"));
        assert!(!track.is_present("name"));
        assert!(!track.set("missing", 1u8));
    }

    #[test]
    fn test_register_declares_every_composite() {
        let schema = schema();
        let mut reflector = Reflector::new();
        register_dynamic_layouts(&schema, &mut reflector).unwrap();
        for path in ["demo.Track", "demo.Track.Points", "demo.Track.Tag"] {
            assert!(reflector.layout(path).is_some(), "{path}");
        }
        assert!(reflector.errors().is_empty());
    }

    #[test]
    fn test_recursion_without_indirection_rejected() {
        let def = SchemaDefinition::new().with_type(
            StructDefinition::new("Node").field(FieldDefinition::required("next", "Node")),
        );
        let schema = Schema::load(&def).unwrap();
        let err = DynamicCatalog::new(&schema).unwrap_err();
        assert_eq!(
            err,
            BindError::RecursiveType {
                type_path: "Node".into()
            }
        );
        assert!(err.to_string().ends_with("without list or union indirection"));
    }

    #[test]
    fn test_recursion_through_list_allowed() {
        let def = SchemaDefinition::new()
            .with_type(ListDefinition::new("Children", "Node"))
            .with_type(
                StructDefinition::new("Node").field(FieldDefinition::required("children", "Children")),
            );
        let schema = Schema::load(&def).unwrap();
        assert!(DynamicCatalog::new(&schema).is_ok());
    }
}
