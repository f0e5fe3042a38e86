// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Records encoded from static layouts decoded through schema-derived ones.

#![allow(clippy::float_cmp)]

use schemapack::dynamic::{DynamicList, DynamicValue};
use schemapack::framing::encode_record;
use schemapack::schema::{
    EnumDefinition, FieldDefinition, ListDefinition, Schema, SchemaDefinition, StructDefinition,
    UnionDefinition,
};
use schemapack::wire::{Cursor, PackBuffer, Scalar};
use schemapack::{
    register_dynamic_layouts, DynamicRecord, FramingConfig, MessageReader, OptionFlags,
    ReadOutcome, Reflector, Serializer,
};
use serde_json::json;

#[derive(Debug, Default, PartialEq)]
struct Fix {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Default, PartialEq)]
enum Source {
    #[default]
    Unknown,
    Radar(u16),
    Operator(String),
}

#[derive(Debug, Default, PartialEq)]
struct Track {
    flags: OptionFlags,
    id: u32,
    kind: i8,
    origin: Fix,
    history: Vec<Fix>,
    source: Source,
    label: String,
}

schemapack::impl_message!(Track);

fn schema() -> Schema {
    let def = SchemaDefinition::new().with_namespace("nav").with_type(
        StructDefinition::new("Track")
            .message(21)
            .nested(EnumDefinition::new("Kind").value("air", 0).value("surface", 1))
            .nested(
                StructDefinition::new("Fix")
                    .field(FieldDefinition::required("lat", "double"))
                    .field(FieldDefinition::required("lon", "double")),
            )
            .nested(ListDefinition::new("History", "Fix"))
            .nested(
                UnionDefinition::new("Source")
                    .option("radar", "uint16", 0)
                    .option("operator", "string", 1),
            )
            .field(FieldDefinition::required("id", "uint32"))
            .field(FieldDefinition::required("kind", "Kind"))
            .field(FieldDefinition::required("hostile", "bool").bit(0))
            .field(FieldDefinition::required("origin", "Fix"))
            .field(FieldDefinition::required("history", "History"))
            .field(FieldDefinition::required("source", "Source"))
            .field(FieldDefinition::required("label", "string").optional(1)),
    );
    Schema::load(&def).unwrap()
}

fn static_serializer() -> Serializer {
    let mut reflector = Reflector::new();
    reflector
        .begin_struct::<Fix>("nav.Track.Fix")
        .required_member("double", "lat", |f| &f.lat, |f| &mut f.lat)
        .required_member("double", "lon", |f| &f.lon, |f| &mut f.lon)
        .end();
    reflector.register_list::<Fix>("nav.Track.History", "Fix");
    reflector
        .begin_union::<Source>(
            "nav.Track.Source",
            |s| match s {
                Source::Unknown => None,
                Source::Radar(_) => Some(0),
                Source::Operator(_) => Some(1),
            },
            |s, tag| {
                *s = match tag {
                    Some(0) => Source::Radar(0),
                    Some(1) => Source::Operator(String::new()),
                    _ => Source::Unknown,
                }
            },
        )
        .option(
            "uint16",
            "radar",
            0,
            |s| match s {
                Source::Radar(v) => Some(v),
                _ => None,
            },
            |s| match s {
                Source::Radar(v) => Some(v),
                _ => None,
            },
        )
        .option(
            "string",
            "operator",
            1,
            |s| match s {
                Source::Operator(v) => Some(v),
                _ => None,
            },
            |s| match s {
                Source::Operator(v) => Some(v),
                _ => None,
            },
        )
        .end();
    reflector
        .begin_struct::<Track>("nav.Track")
        .required_member("uint32", "id", |t| &t.id, |t| &mut t.id)
        .required_member("Kind", "kind", |t| &t.kind, |t| &mut t.kind)
        .required_member("Fix", "origin", |t| &t.origin, |t| &mut t.origin)
        .required_member("History", "history", |t| &t.history, |t| &mut t.history)
        .required_member("Source", "source", |t| &t.source, |t| &mut t.source)
        .optional_member("string", "label", 1, |t| &t.label, |t| &mut t.label)
        .optional_flags(|t| &t.flags, |t| &mut t.flags)
        .register_message()
        .end();
    let mut serializer = Serializer::default();
    serializer.initialize(schema(), reflector).unwrap();
    serializer
}

fn dynamic_serializer() -> (Serializer, std::sync::Arc<schemapack::DynamicCatalog>) {
    let schema = schema();
    let mut reflector = Reflector::new();
    let catalog = register_dynamic_layouts(&schema, &mut reflector).unwrap();
    let mut serializer = Serializer::default();
    serializer.initialize(schema, reflector).unwrap();
    (serializer, catalog)
}

fn sample_track() -> Track {
    Track {
        flags: OptionFlags::new().with(0).with(1),
        id: 4012,
        kind: 1,
        origin: Fix { lat: 48.5, lon: -4.25 },
        history: vec![Fix { lat: 48.0, lon: -4.0 }, Fix { lat: 48.25, lon: -4.125 }],
        source: Source::Operator("watch".into()),
        label: "V-12".into(),
    }
}

#[test]
fn test_dynamic_decode_of_static_record() {
    let writer = static_serializer();
    let (reader, _) = dynamic_serializer();

    let mut out = PackBuffer::new();
    encode_record(&writer, &FramingConfig::default(), &sample_track(), &mut out).unwrap();

    let mut stream = MessageReader::new(out.as_slice(), FramingConfig::default());
    let ReadOutcome::Message { id, message } = stream.read(&reader).unwrap() else {
        panic!("expected a message");
    };
    assert_eq!(id, 21);
    let record = message.downcast_ref::<DynamicRecord>().unwrap();
    assert_eq!(record.type_path(), "nav.Track");
    assert_eq!(record.get("id").and_then(DynamicValue::as_scalar), Some(Scalar::U32(4012)));
    assert_eq!(record.bit("hostile"), Some(true));
    assert!(record.is_present("label"));
    assert_eq!(record.get("label").and_then(DynamicValue::as_str), Some("V-12"));

    let history = record.get("history").and_then(DynamicValue::as_list).unwrap();
    assert_eq!(history.len(), 2);
    let second = history.get(1).and_then(DynamicValue::as_record).unwrap();
    assert_eq!(second.get("lon").and_then(DynamicValue::as_scalar), Some(Scalar::F64(-4.125)));

    let source = record.get("source").and_then(DynamicValue::as_union).unwrap();
    let (option, value) = source.active().unwrap();
    assert_eq!(option, "operator");
    assert_eq!(value.as_str(), Some("watch"));

    // Re-encoding the dynamic form reproduces the static bytes.
    let mut again = PackBuffer::new();
    encode_record(&reader, &FramingConfig::default(), record, &mut again).unwrap();
    assert_eq!(again.as_slice(), out.as_slice());
}

#[test]
fn test_print_matches_between_static_and_dynamic() {
    let writer = static_serializer();
    let (reader, _) = dynamic_serializer();
    let track = sample_track();

    let mut buf = PackBuffer::new();
    writer.write("nav.Track", &mut buf, &track).unwrap();
    let mut record = reader.new_message(21).unwrap();
    let dynamic = record.downcast_mut::<DynamicRecord>().unwrap();
    reader
        .read("nav.Track", &mut Cursor::new(buf.as_slice()), dynamic)
        .unwrap();

    let expected = json!({
        "type": "nav.Track",
        "id": 4012,
        "kind": "surface",
        "hostile": true,
        "origin": {"type": "nav.Track.Fix", "lat": 48.5, "lon": -4.25},
        "history": [
            {"type": "nav.Track.Fix", "lat": 48.0, "lon": -4.0},
            {"type": "nav.Track.Fix", "lat": 48.25, "lon": -4.125}
        ],
        "source": {"operator": "watch"},
        "label": "V-12"
    });
    assert_eq!(writer.print(&track).unwrap(), expected);
    assert_eq!(reader.print(record.as_ref()).unwrap(), expected);
}

#[test]
fn test_dynamic_encode_decoded_statically() {
    let writer = static_serializer();
    let (dynamic, catalog) = dynamic_serializer();

    let mut record = catalog.new_record("nav.Track").unwrap();
    assert!(record.set("id", 9u32));
    assert!(record.set_bit("hostile", false));
    let mut history = DynamicList::default();
    let mut fix = catalog.new_record("nav.Track.Fix").unwrap();
    fix.set("lat", 1.0f64);
    fix.set("lon", 2.0f64);
    history.push(fix);
    assert!(record.set("history", history));
    assert!(record
        .get_mut("source")
        .and_then(DynamicValue::as_union_mut)
        .is_some_and(|u| u.set("radar", 3u16)));

    let mut buf = PackBuffer::new();
    dynamic.write("nav.Track", &mut buf, &record).unwrap();
    let mut track = Track::default();
    writer
        .read("nav.Track", &mut Cursor::new(buf.as_slice()), &mut track)
        .unwrap();
    assert_eq!(track.id, 9);
    assert_eq!(track.history, vec![Fix { lat: 1.0, lon: 2.0 }]);
    assert_eq!(track.source, Source::Radar(3));
    assert!(!track.flags.get(1));
}

#[test]
fn test_nine_optionals_use_two_flag_bytes() {
    for reversed in [false, true] {
        let mut def = StructDefinition::new("Wide");
        let mut slots: Vec<u16> = (0..9).collect();
        if reversed {
            slots.reverse();
        }
        for slot in slots {
            def = def.field(FieldDefinition::required(format!("f{slot}"), "int8").optional(slot));
        }
        let schema = Schema::load(&SchemaDefinition::new().with_type(def)).unwrap();
        let mut reflector = Reflector::new();
        let catalog = register_dynamic_layouts(&schema, &mut reflector).unwrap();
        let mut serializer = Serializer::default();
        serializer.initialize(schema, reflector).unwrap();

        let mut wide = catalog.new_record("Wide").unwrap();
        let mut buf = PackBuffer::new();
        serializer.write("Wide", &mut buf, &wide).unwrap();
        assert_eq!(buf.as_slice(), [0, 0]);

        wide.set("f8", -1i8);
        buf.clear();
        serializer.write("Wide", &mut buf, &wide).unwrap();
        assert_eq!(buf.as_slice(), [0x00, 0x01, 0xFF]);
    }
}
