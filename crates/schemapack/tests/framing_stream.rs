// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Framed message streams: dispatch by id, skipping, limits, incremental decode.

use schemapack::framing::{decode_record, encode_record, RecordHeader, HEADER_SIZE};
use schemapack::schema::{FieldDefinition, Schema, SchemaDefinition, StructDefinition};
use schemapack::wire::PackBuffer;
use schemapack::{
    FramingConfig, FramingError, MessageReader, MessageWriter, OptionFlags, ReadOutcome,
    Reflector, Serializer, SerializerConfig,
};

#[derive(Debug, Default, PartialEq)]
struct Heartbeat {
    seq: u64,
}

#[derive(Debug, Default, PartialEq)]
struct Status {
    flags: OptionFlags,
    code: i16,
    text: String,
}

schemapack::impl_message!(Heartbeat, Status);

fn schema() -> Schema {
    let def = SchemaDefinition::new()
        .with_type(
            StructDefinition::new("Heartbeat")
                .message(1)
                .field(FieldDefinition::required("seq", "uint64")),
        )
        .with_type(
            StructDefinition::new("Status")
                .message(2)
                .field(FieldDefinition::required("code", "int16"))
                .field(FieldDefinition::required("text", "string").optional(0)),
        );
    Schema::load(&def).unwrap()
}

fn declare_heartbeat(reflector: &mut Reflector) {
    reflector
        .begin_struct::<Heartbeat>("Heartbeat")
        .required_member("uint64", "seq", |h| &h.seq, |h| &mut h.seq)
        .register_message()
        .end();
}

fn declare_status(reflector: &mut Reflector) {
    reflector
        .begin_struct::<Status>("Status")
        .required_member("int16", "code", |s| &s.code, |s| &mut s.code)
        .optional_member("string", "text", 0, |s| &s.text, |s| &mut s.text)
        .optional_flags(|s| &s.flags, |s| &mut s.flags)
        .register_message()
        .end();
}

fn full_serializer() -> Serializer {
    let mut reflector = Reflector::new();
    declare_heartbeat(&mut reflector);
    declare_status(&mut reflector);
    let mut serializer = Serializer::default();
    serializer.initialize(schema(), reflector).unwrap();
    serializer
}

fn status(code: i16, text: &str) -> Status {
    Status {
        flags: OptionFlags::new().with(0),
        code,
        text: text.into(),
    }
}

#[test]
fn test_stream_roundtrip() {
    let serializer = full_serializer();
    let mut writer = MessageWriter::new(Vec::new(), FramingConfig::default());
    writer.write(&serializer, &Heartbeat { seq: 1 }).unwrap();
    writer.write(&serializer, &status(404, "lost")).unwrap();
    writer.write(&serializer, &Heartbeat { seq: 2 }).unwrap();
    let written = writer.stats();
    assert_eq!(written.messages_written, 3);

    let bytes = writer.into_inner();
    assert_eq!(written.bytes_written, bytes.len() as u64);
    // Heartbeat record: length covers the id and an 8-byte payload.
    assert_eq!(&bytes[..8], &[12, 0, 0, 0, 1, 0, 0, 0]);

    let mut reader = MessageReader::new(bytes.as_slice(), FramingConfig::default());
    let mut seen = Vec::new();
    loop {
        match reader.read(&serializer).unwrap() {
            ReadOutcome::Message { id, message } => seen.push((id, message)),
            ReadOutcome::Skipped { id, .. } => panic!("unexpected skip of {id}"),
            ReadOutcome::EndOfStream => break,
        }
    }
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].1.downcast_ref::<Heartbeat>(), Some(&Heartbeat { seq: 1 }));
    assert_eq!(seen[1].0, 2);
    assert_eq!(seen[1].1.downcast_ref::<Status>(), Some(&status(404, "lost")));
    assert_eq!(seen[2].1.downcast_ref::<Heartbeat>(), Some(&Heartbeat { seq: 2 }));

    let stats = reader.stats();
    assert_eq!(stats.messages_read, 3);
    assert_eq!(stats.bytes_read, bytes.len() as u64);
}

#[test]
fn test_reader_skips_records_it_cannot_decode() {
    let writer_side = full_serializer();
    let mut writer = MessageWriter::new(Vec::new(), FramingConfig::default());
    writer.write(&writer_side, &status(1, "first")).unwrap();
    writer.write(&writer_side, &Heartbeat { seq: 77 }).unwrap();
    let mut bytes = writer.into_inner();

    // A record from another schema entirely.
    let mut foreign = Vec::new();
    RecordHeader { length: 7, id: 900 }
        .write_to(&mut foreign)
        .unwrap();
    foreign.extend_from_slice(&[1, 2, 3]);
    bytes.extend_from_slice(&foreign);

    // The reader knows the Status type but has no native layout for it.
    let mut reflector = Reflector::new();
    declare_heartbeat(&mut reflector);
    let mut reader_side = Serializer::default();
    reader_side.initialize(schema(), reflector).unwrap();
    assert!(!reader_side.message_info(2).unwrap().is_decodable());

    let mut reader = MessageReader::new(bytes.as_slice(), FramingConfig::default());
    assert!(matches!(
        reader.read(&reader_side).unwrap(),
        ReadOutcome::Skipped { id: 2, .. }
    ));
    match reader.read(&reader_side).unwrap() {
        ReadOutcome::Message { id: 1, message } => {
            assert_eq!(message.downcast_ref::<Heartbeat>(), Some(&Heartbeat { seq: 77 }));
        }
        other => panic!("expected heartbeat, got {other:?}"),
    }
    assert!(matches!(
        reader.read(&reader_side).unwrap(),
        ReadOutcome::Skipped { id: 900, length: 3 }
    ));
    assert!(matches!(
        reader.read(&reader_side).unwrap(),
        ReadOutcome::EndOfStream
    ));
    let stats = reader.stats();
    assert_eq!((stats.messages_read, stats.messages_skipped), (1, 2));
}

#[test]
fn test_truncated_payload() {
    let serializer = full_serializer();
    let mut out = PackBuffer::new();
    encode_record(&serializer, &FramingConfig::default(), &Heartbeat { seq: 5 }, &mut out).unwrap();
    let bytes = &out.as_slice()[..out.len() - 3];
    let mut reader = MessageReader::new(bytes, FramingConfig::default());
    assert!(matches!(
        reader.read(&serializer),
        Err(FramingError::Truncated { need: 3 })
    ));
}

#[test]
fn test_limits_and_bad_lengths() {
    let serializer = full_serializer();
    let tight = FramingConfig {
        max_message_bytes: 4,
    };

    let mut writer = MessageWriter::new(Vec::new(), tight.clone());
    assert!(matches!(
        writer.write(&serializer, &Heartbeat { seq: 1 }),
        Err(FramingError::MessageTooLarge { size: 8, limit: 4 })
    ));
    assert!(writer.get_ref().is_empty());

    let mut out = PackBuffer::new();
    assert!(encode_record(&serializer, &tight, &Heartbeat { seq: 1 }, &mut out).is_err());
    assert!(out.is_empty());

    let mut bad = Vec::new();
    RecordHeader { length: 2, id: 1 }.write_to(&mut bad).unwrap();
    let mut reader = MessageReader::new(bad.as_slice(), FramingConfig::default());
    assert!(matches!(
        reader.read(&serializer),
        Err(FramingError::InvalidLength(2))
    ));
}

#[test]
fn test_oversized_records_keep_stream_in_sync() {
    let serializer = full_serializer();
    let tight = FramingConfig {
        max_message_bytes: 16,
    };

    // Foreign record larger than the limit, then a decodable one over it,
    // then one that fits.
    let mut bytes = Vec::new();
    RecordHeader { length: 36, id: 999 }
        .write_to(&mut bytes)
        .unwrap();
    bytes.extend_from_slice(&[0x5A; 32]);
    let mut writer = MessageWriter::new(bytes, FramingConfig::default());
    writer.write(&serializer, &status(3, "this text is long")).unwrap();
    writer.write(&serializer, &Heartbeat { seq: 4 }).unwrap();
    let bytes = writer.into_inner();

    let mut reader = MessageReader::new(bytes.as_slice(), tight.clone());
    assert!(matches!(
        reader.read(&serializer).unwrap(),
        ReadOutcome::Skipped { id: 999, length: 32 }
    ));
    assert!(matches!(
        reader.read(&serializer),
        Err(FramingError::MessageTooLarge { size: 24, limit: 16 })
    ));
    match reader.read(&serializer).unwrap() {
        ReadOutcome::Message { id: 1, message } => {
            assert_eq!(message.downcast_ref::<Heartbeat>(), Some(&Heartbeat { seq: 4 }));
        }
        other => panic!("expected heartbeat, got {other:?}"),
    }
    assert!(matches!(reader.read(&serializer).unwrap(), ReadOutcome::EndOfStream));
    assert_eq!(reader.stats().bytes_read, bytes.len() as u64);

    // Same stream through the buffer decoder.
    let (outcome, used) = decode_record(&serializer, &tight, &bytes).unwrap().unwrap();
    assert!(matches!(outcome, ReadOutcome::Skipped { id: 999, length: 32 }));
    assert_eq!(used, HEADER_SIZE + 32);
    let rest = &bytes[used..];
    let size = match decode_record(&serializer, &tight, &rest[..HEADER_SIZE]) {
        Err(FramingError::MessageTooLarge { size, limit: 16 }) => size,
        other => panic!("expected oversize error, got {other:?}"),
    };
    let rest = &rest[HEADER_SIZE + size..];
    let (outcome, used) = decode_record(&serializer, &tight, rest).unwrap().unwrap();
    assert!(matches!(outcome, ReadOutcome::Message { id: 1, .. }));
    assert_eq!(used, rest.len());
}

#[test]
fn test_unregistered_message_cannot_be_written() {
    #[derive(Debug, Default)]
    struct Stranger;
    schemapack::impl_message!(Stranger);

    let serializer = full_serializer();
    let mut writer = MessageWriter::new(Vec::new(), FramingConfig::default());
    assert!(matches!(
        writer.write(&serializer, &Stranger),
        Err(FramingError::Codec(_))
    ));
}

#[test]
fn test_decode_record_incremental() {
    let serializer = full_serializer();
    let config = FramingConfig::default();
    let mut stream = PackBuffer::new();
    encode_record(&serializer, &config, &status(7, "ok"), &mut stream).unwrap();
    encode_record(&serializer, &config, &Heartbeat { seq: 9 }, &mut stream).unwrap();
    let stream = stream.into_vec();

    // Feed one byte at a time, as a socket accumulation buffer would.
    let mut pending = Vec::new();
    let mut decoded = Vec::new();
    for byte in &stream {
        pending.push(*byte);
        while let Some((outcome, used)) = decode_record(&serializer, &config, &pending).unwrap() {
            assert!(used >= HEADER_SIZE);
            pending.drain(..used);
            decoded.push(outcome);
        }
    }
    assert!(pending.is_empty());
    assert_eq!(decoded.len(), 2);
    match &decoded[1] {
        ReadOutcome::Message { id, message } => {
            assert_eq!(*id, 1);
            assert_eq!(message.downcast_ref::<Heartbeat>(), Some(&Heartbeat { seq: 9 }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_message_id_mask_applies_on_the_wire() {
    let mut reflector = Reflector::new();
    declare_heartbeat(&mut reflector);
    let mut serializer = Serializer::new(SerializerConfig {
        message_id_mask: 0x0100_0000,
        ..SerializerConfig::default()
    });
    serializer.initialize(schema(), reflector).unwrap();

    let mut out = PackBuffer::new();
    let id = encode_record(&serializer, &FramingConfig::default(), &Heartbeat { seq: 3 }, &mut out).unwrap();
    assert_eq!(id, 0x0100_0001);
    assert_eq!(&out.as_slice()[4..8], &0x0100_0001i32.to_le_bytes());
    assert_eq!(serializer.message_ids().collect::<Vec<_>>(), [0x0100_0001, 0x0100_0002]);
}
