// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::error::SchemaError;

fn track_schema() -> SchemaDefinition {
    SchemaDefinition::new()
        .with_namespace("demo")
        .with_type(
            StructDefinition::new("Base")
                .message(-2)
                .field(FieldDefinition::required("id", "uint32")),
        )
        .with_type(
            StructDefinition::new("Track")
                .base("Base")
                .message(7)
                .field(FieldDefinition::required("speed", "float").optional(0))
                .field(FieldDefinition::required("lost", "bool").bit(3))
                .nested(EnumDefinition::new("Mode").value("Idle", 0).value("Run", 1)),
        )
        .with_type(ListDefinition::new("Tracks", "Track"))
}

#[test]
fn test_builtins_declared_at_root() {
    let schema = Schema::load(&SchemaDefinition::new()).unwrap();
    for name in ["int8", "uint64", "float64", "string", "double", "int", "bool"] {
        assert!(schema.get(name).is_some(), "missing builtin {}", name);
    }
    let double = schema.node(schema.get("double").unwrap());
    assert_eq!(double.encoding(), Encoding::Fixed(8));
    let bool_node = schema.node(schema.get("bool").unwrap());
    assert_eq!(bool_node.encoding(), Encoding::Bit);
}

#[test]
fn test_paths_and_nesting() {
    let schema = Schema::load(&track_schema()).unwrap();
    let track = schema.get("demo.Track").unwrap();
    assert_eq!(schema.node(track).path, "demo.Track");
    let mode = schema.get("demo.Track.Mode").unwrap();
    assert_eq!(schema.node(mode).parent, Some(track));
    assert!(schema.type_names().any(|n| n == "demo.Tracks"));
}

#[test]
fn test_relative_lookup_walks_up_then_down() {
    let schema = Schema::load(&track_schema()).unwrap();
    let track = schema.get("demo.Track").unwrap();
    let tracks = schema.get("demo.Tracks").unwrap();
    // Sibling, nested and root-level names from inside demo.Track.
    assert_eq!(schema.find_type(track, "Tracks"), Some(tracks));
    assert_eq!(schema.find_type(track, "Mode"), schema.get("demo.Track.Mode"));
    assert_eq!(schema.find_type(tracks, "Track.Mode"), schema.get("demo.Track.Mode"));
    assert_eq!(schema.find_type(track, "int32"), schema.get("int32"));
    assert_eq!(schema.find_type(track, "Missing"), None);
}

#[test]
fn test_flattened_fields_base_first() {
    let schema = Schema::load(&track_schema()).unwrap();
    let track = schema.get("demo.Track").unwrap();
    let names: Vec<_> = schema
        .flattened_fields(track)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, ["id", "speed", "lost"]);
    assert_eq!(schema.flag_count(track), 4);
    assert_eq!(schema.flag_count(schema.get("demo.Base").unwrap()), 0);
}

#[test]
fn test_messages_exclude_virtual() {
    let schema = Schema::load(&track_schema()).unwrap();
    assert_eq!(schema.messages(), &[(7, schema.get("demo.Track").unwrap())]);
    let base = schema.node(schema.get("demo.Base").unwrap());
    assert_eq!(base.as_struct().unwrap().role, MessageRole::Virtual);
}

#[test]
fn test_enum_resolves_wire_width() {
    let def = SchemaDefinition::new()
        .with_type(EnumDefinition::new("Small").value("A", -1).value("B", 100))
        .with_type(EnumDefinition::new("Wide").value("A", 0).value("B", 60_000));
    let schema = Schema::load(&def).unwrap();
    let small = schema.node(schema.get("Small").unwrap());
    assert_eq!(small.basic_kind(), Some(BasicKind::Int8));
    let wide = schema.node(schema.get("Wide").unwrap());
    assert_eq!(wide.basic_kind(), Some(BasicKind::UInt16));
    assert_eq!(wide.encoding(), Encoding::Fixed(2));
}

#[test]
fn test_unresolved_reference_names_type() {
    let def = SchemaDefinition::new()
        .with_type(StructDefinition::new("S").field(FieldDefinition::required("a", "Nope")));
    let err = Schema::load(&def).unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnresolvedType {
            type_path: "S".into(),
            reference: "Nope".into()
        }
    );
}

#[test]
fn test_duplicate_option_index_across_base() {
    let def = SchemaDefinition::new()
        .with_type(StructDefinition::new("A").field(FieldDefinition::required("a", "int32").optional(1)))
        .with_type(
            StructDefinition::new("B")
                .base("A")
                .field(FieldDefinition::required("b", "int32").optional(1)),
        );
    let err = Schema::load(&def).unwrap_err();
    assert!(matches!(
        err,
        SchemaError::DuplicateFlagIndex { ref type_path, index: 1, .. } if type_path == "B"
    ));
}

#[test]
fn test_duplicate_field_across_base() {
    let def = SchemaDefinition::new()
        .with_type(StructDefinition::new("A").field(FieldDefinition::required("x", "int32")))
        .with_type(StructDefinition::new("B").base("A").field(FieldDefinition::required("x", "int8")));
    assert!(matches!(
        Schema::load(&def).unwrap_err(),
        SchemaError::DuplicateField { .. }
    ));
}

#[test]
fn test_union_fields_must_be_optional() {
    let def = SchemaDefinition::new().with_type(
        UnionDefinition::new("U").field(FieldDefinition::required("a", "int32")),
    );
    assert_eq!(
        Schema::load(&def).unwrap_err(),
        SchemaError::UnionFieldNotOptional {
            type_path: "U".into(),
            field: "a".into()
        }
    );
}

#[test]
fn test_union_tag_255_reserved() {
    let def = SchemaDefinition::new().with_type(UnionDefinition::new("U").option("a", "int32", 255));
    assert!(matches!(
        Schema::load(&def).unwrap_err(),
        SchemaError::FlagIndexOutOfRange { limit: 255, .. }
    ));
}

#[test]
fn test_bit_field_rules() {
    let missing = SchemaDefinition::new()
        .with_type(StructDefinition::new("S").field(FieldDefinition::required("b", "bool")));
    assert!(matches!(
        Schema::load(&missing).unwrap_err(),
        SchemaError::InvalidBitField { .. }
    ));

    let misplaced = SchemaDefinition::new()
        .with_type(StructDefinition::new("S").field(FieldDefinition::required("b", "int8").bit(0)));
    assert!(matches!(
        Schema::load(&misplaced).unwrap_err(),
        SchemaError::InvalidBitField { .. }
    ));
}

#[test]
fn test_flag_index_limit() {
    let def = SchemaDefinition::new().with_type(
        StructDefinition::new("S").field(FieldDefinition::required("a", "int8").optional(256)),
    );
    assert!(matches!(
        Schema::load(&def).unwrap_err(),
        SchemaError::FlagIndexOutOfRange { index: 256, limit: 256, .. }
    ));
}

#[test]
fn test_inheritance_cycle() {
    let def = SchemaDefinition::new()
        .with_type(StructDefinition::new("A").base("B"))
        .with_type(StructDefinition::new("B").base("A"));
    assert!(matches!(
        Schema::load(&def).unwrap_err(),
        SchemaError::InheritanceCycle { .. }
    ));
}

#[test]
fn test_base_must_be_struct() {
    let def = SchemaDefinition::new().with_type(StructDefinition::new("A").base("int32"));
    assert_eq!(
        Schema::load(&def).unwrap_err(),
        SchemaError::InvalidBase {
            type_path: "A".into(),
            base: "int32".into()
        }
    );
}

#[test]
fn test_message_id_rules() {
    let bad = SchemaDefinition::new().with_type(StructDefinition::new("A").message(-5));
    assert!(matches!(
        Schema::read(&bad).unwrap_err(),
        SchemaError::InvalidMessageId { id: -5, .. }
    ));

    let dup = SchemaDefinition::new()
        .with_type(StructDefinition::new("A").message(1))
        .with_type(StructDefinition::new("B").message(1));
    assert!(matches!(
        Schema::load(&dup).unwrap_err(),
        SchemaError::DuplicateMessageId { id: 1, .. }
    ));
}

#[test]
fn test_duplicate_type_in_scope() {
    let def = SchemaDefinition::new()
        .with_type(StructDefinition::new("A"))
        .with_type(ListDefinition::new("A", "int32"));
    assert_eq!(
        Schema::read(&def).unwrap_err(),
        SchemaError::DuplicateType { type_path: "A".into() }
    );
}

#[test]
fn test_namespaces_reopen() {
    let def = SchemaDefinition::new()
        .with_type(NamespaceDefinition::new("geo").with_type(StructDefinition::new("A")))
        .with_type(NamespaceDefinition::new("geo").with_type(StructDefinition::new("B")));
    let schema = Schema::load(&def).unwrap();
    assert!(schema.get("geo.A").is_some());
    assert!(schema.get("geo.B").is_some());
}

#[test]
fn test_malformed_enums() {
    let empty = SchemaDefinition::new().with_type(EnumDefinition::new("E"));
    assert!(matches!(
        Schema::load(&empty).unwrap_err(),
        SchemaError::MalformedEnum { .. }
    ));
    let dup = SchemaDefinition::new().with_type(EnumDefinition::new("E").value("A", 1).value("B", 1));
    assert!(matches!(
        Schema::load(&dup).unwrap_err(),
        SchemaError::MalformedEnum { .. }
    ));
}

#[test]
fn test_list_of_bits_rejected() {
    let def = SchemaDefinition::new().with_type(ListDefinition::new("Flags", "bool"));
    assert!(matches!(
        Schema::load(&def).unwrap_err(),
        SchemaError::InvalidListElement { .. }
    ));
}

#[test]
fn test_custom_basic_types() {
    let def = SchemaDefinition::new()
        .without_builtins()
        .with_type(BasicDefinition::fixed("i32", "int32", 4))
        .with_type(BasicDefinition::length_prefixed("text", "string"))
        .with_type(BasicDefinition::bit("flag"));
    let schema = Schema::load(&def).unwrap();
    assert!(schema.get("int32").is_none());
    assert_eq!(schema.node(schema.get("i32").unwrap()).basic_kind(), Some(BasicKind::Int32));

    let wrong = SchemaDefinition::new()
        .without_builtins()
        .with_type(BasicDefinition::fixed("i32", "int32", 2));
    assert!(matches!(
        Schema::read(&wrong).unwrap_err(),
        SchemaError::InvalidBasicType { .. }
    ));
}
