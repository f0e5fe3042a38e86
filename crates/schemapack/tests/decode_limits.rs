// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Untrusted input against recursive schemas and zero-size list elements.

use schemapack::framing::{decode_record, RecordHeader};
use schemapack::schema::{
    FieldDefinition, ListDefinition, Schema, SchemaDefinition, StructDefinition, UnionDefinition,
};
use schemapack::wire::Cursor;
use schemapack::{
    register_dynamic_layouts, CodecError, FramingConfig, FramingError, MessageReader,
    Reflector, Serializer, SerializerConfig,
};

/// `Node` holds a `Link`, which may hold another `Node`; `Batch` holds a
/// list of structs with no fields.
fn schema() -> Schema {
    let def = SchemaDefinition::new()
        .with_type(UnionDefinition::new("Link").option("node", "Node", 0))
        .with_type(
            StructDefinition::new("Node")
                .message(1)
                .field(FieldDefinition::required("child", "Link")),
        )
        .with_type(StructDefinition::new("Blank"))
        .with_type(ListDefinition::new("Blanks", "Blank"))
        .with_type(
            StructDefinition::new("Batch")
                .message(2)
                .field(FieldDefinition::required("items", "Blanks")),
        );
    Schema::load(&def).unwrap()
}

fn serializer(config: SerializerConfig) -> Serializer {
    let schema = schema();
    let mut reflector = Reflector::new();
    register_dynamic_layouts(&schema, &mut reflector).unwrap();
    let mut serializer = Serializer::new(config);
    serializer.initialize(schema, reflector).unwrap();
    serializer
}

/// Chain of `links` set unions ended by an unset one.
fn chain(links: usize) -> Vec<u8> {
    let mut payload = vec![0x00; links];
    payload.push(0xFF);
    payload
}

fn record(id: i32, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    RecordHeader::for_payload(id, payload.len())
        .unwrap()
        .write_to(&mut bytes)
        .unwrap();
    bytes.extend_from_slice(payload);
    bytes
}

#[test]
fn test_nesting_limit_boundary() {
    let serializer = serializer(SerializerConfig {
        max_depth: 4,
        ..SerializerConfig::default()
    });

    // Node(0) Link(1) Node(2) Link(3)
    let shallow = chain(1);
    assert!(serializer.decode_message(1, &shallow).unwrap().is_some());
    let mut cur = Cursor::new(&shallow);
    serializer.skip("Node", &mut cur).unwrap();
    assert!(cur.is_eof());

    let deep = chain(2);
    let expected = CodecError::DepthExceeded {
        type_path: "Link".into(),
        limit: 4,
    };
    assert_eq!(serializer.decode_message(1, &deep).unwrap_err(), expected);
    assert_eq!(
        serializer.skip("Node", &mut Cursor::new(&deep)).unwrap_err(),
        expected
    );
}

#[test]
fn test_deep_recursion_fails_cleanly() {
    let serializer = serializer(SerializerConfig::default());
    let hostile = chain(100_000);

    assert!(matches!(
        serializer.decode_message(1, &hostile),
        Err(CodecError::DepthExceeded { limit: 64, .. })
    ));
    assert!(matches!(
        serializer.skip("Node", &mut Cursor::new(&hostile)),
        Err(CodecError::DepthExceeded { .. })
    ));

    let bytes = record(1, &hostile);
    let mut reader = MessageReader::new(bytes.as_slice(), FramingConfig::default());
    assert!(matches!(
        reader.read(&serializer),
        Err(FramingError::Codec(CodecError::DepthExceeded { .. }))
    ));
    assert!(matches!(
        decode_record(&serializer, &FramingConfig::default(), &bytes),
        Err(FramingError::Codec(CodecError::DepthExceeded { .. }))
    ));
}

#[test]
fn test_zero_size_elements_are_capped() {
    let serializer = serializer(SerializerConfig::default());

    // Four bytes claiming i32::MAX fieldless elements.
    let payload = i32::MAX.to_le_bytes();
    let expected = CodecError::ListTooLong {
        type_path: "Blanks".into(),
        count: i32::MAX as usize,
        limit: 65_536,
    };
    assert_eq!(serializer.decode_message(2, &payload).unwrap_err(), expected);
    assert_eq!(
        serializer.skip("Batch", &mut Cursor::new(&payload)).unwrap_err(),
        expected
    );

    let bytes = record(2, &payload);
    let mut reader = MessageReader::new(bytes.as_slice(), FramingConfig::default());
    assert!(matches!(
        reader.read(&serializer),
        Err(FramingError::Codec(CodecError::ListTooLong { .. }))
    ));
}

#[test]
fn test_zero_size_elements_within_limit() {
    let serializer = serializer(SerializerConfig {
        max_zero_size_elements: 3,
        ..SerializerConfig::default()
    });

    let three = 3i32.to_le_bytes();
    let record = serializer.decode_message(2, &three).unwrap().unwrap();
    let printed = serializer.print(record.as_ref()).unwrap();
    assert_eq!(printed["items"].as_array().map(Vec::len), Some(3));

    let four = 4i32.to_le_bytes();
    assert!(matches!(
        serializer.decode_message(2, &four),
        Err(CodecError::ListTooLong { count: 4, limit: 3, .. })
    ));
}
