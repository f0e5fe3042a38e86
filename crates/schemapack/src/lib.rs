// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! schemapack: schema-driven binary serialization
//!
//! Native structures declared through a [`Reflector`] are bound once to a
//! foreign [`Schema`] and then exchanged as compact little-endian records:
//! - optional fields cost one flag bit when absent
//! - fields unknown to either side are skipped or default-filled
//! - numeric fields may change type between versions
//!
//! # Quick Start
//!
//! ```
//! use schemapack::codec::OptionFlags;
//! use schemapack::framing::{MessageReader, MessageWriter, ReadOutcome};
//! use schemapack::schema::{FieldDefinition, Schema, SchemaDefinition, StructDefinition};
//! use schemapack::{Config, Reflector, Serializer};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Position {
//!     flags: OptionFlags,
//!     id: u32,
//!     altitude: f64,
//! }
//! schemapack::impl_message!(Position);
//!
//! let def = SchemaDefinition::new().with_type(
//!     StructDefinition::new("Position")
//!         .message(10)
//!         .field(FieldDefinition::required("id", "uint32"))
//!         .field(FieldDefinition::required("altitude", "double").optional(0)),
//! );
//! let mut reflector = Reflector::new();
//! reflector
//!     .begin_struct::<Position>("Position")
//!     .required_member("uint32", "id", |p| &p.id, |p| &mut p.id)
//!     .optional_member("double", "altitude", 0, |p| &p.altitude, |p| &mut p.altitude)
//!     .optional_flags(|p| &p.flags, |p| &mut p.flags)
//!     .register_message()
//!     .end();
//!
//! let config = Config::default();
//! let mut serializer = Serializer::new(config.serializer.clone());
//! serializer.initialize(Schema::load(&def)?, reflector)?;
//!
//! let mut writer = MessageWriter::new(Vec::new(), config.framing.clone());
//! writer.write(&serializer, &Position { id: 4, ..Position::default() })?;
//!
//! let bytes = writer.into_inner();
//! let mut reader = MessageReader::new(bytes.as_slice(), config.framing);
//! match reader.read(&serializer)? {
//!     ReadOutcome::Message { id, message } => {
//!         assert_eq!(id, 10);
//!         assert_eq!(message.downcast_ref::<Position>().map(|p| p.id), Some(4));
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! # Ok::<(), schemapack::Error>(())
//! ```

pub mod codec;
pub mod config;
pub mod dynamic;
pub mod error;
pub mod framing;
pub mod message;
pub mod reflect;
pub mod schema;
pub mod serializer;
pub mod wire;

pub use codec::OptionFlags;
pub use config::{Config, FramingConfig, SerializerConfig};
pub use dynamic::{register_dynamic_layouts, DynamicCatalog, DynamicRecord, DynamicValue};
pub use error::{BindError, CodecError, ConfigError, Error, FramingError, Result, SchemaError};
pub use framing::{MessageReader, MessageWriter, ReadOutcome};
pub use message::{Message, MessageFactory};
pub use reflect::Reflector;
pub use schema::{Schema, SchemaDefinition};
pub use serializer::{MessageInfo, Serializer};
