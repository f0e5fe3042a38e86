// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serializer: binds a resolved schema to native layouts once, then encodes
//! and decodes values and messages.
//!
//! ```text
//! Schema (foreign) ──┐
//!                    ├─ initialize() ─> codec table + message table
//! Reflector (local) ─┘
//! ```
//!
//! After [`Serializer::initialize`] every method takes `&self`; a
//! serializer can be shared across threads behind an `Arc`.

use crate::codec::{build_table, CodecTable, DecodeLimits};
use crate::config::SerializerConfig;
use crate::error::{BindError, CodecError};
use crate::message::{Message, MessageFactory};
use crate::reflect::{LayoutKind, Reflector};
use crate::schema::{Schema, TypeIndex};
use crate::wire::{BasicKind, ConversionRegistry, Cursor, PackBuffer};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// A dispatchable message type.
#[derive(Clone)]
pub struct MessageInfo {
    /// Wire id, mask applied.
    pub id: i32,
    pub type_path: String,
    pub(crate) ty: TypeIndex,
    pub(crate) factory: Option<MessageFactory>,
}

impl MessageInfo {
    /// Whether a native factory exists, i.e. inbound records can be decoded.
    pub fn is_decodable(&self) -> bool {
        self.factory.is_some()
    }
}

impl fmt::Debug for MessageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageInfo")
            .field("id", &self.id)
            .field("type_path", &self.type_path)
            .field("decodable", &self.is_decodable())
            .finish()
    }
}

struct Bound {
    table: CodecTable,
    messages: BTreeMap<i32, MessageInfo>,
    ids_by_type: HashMap<TypeIndex, i32>,
    /// Rust types laid out for exactly one schema struct.
    types_by_rust: HashMap<TypeId, TypeIndex>,
}

/// Schema-driven encoder/decoder.
pub struct Serializer {
    config: SerializerConfig,
    conversions: ConversionRegistry,
    state: Option<Bound>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(SerializerConfig::default())
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("messages", &self.state.as_ref().map_or(0, |s| s.messages.len()))
            .finish()
    }
}

impl Serializer {
    pub fn new(config: SerializerConfig) -> Self {
        Self {
            conversions: ConversionRegistry::new(config.conversion),
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    pub fn conversions(&self) -> &ConversionRegistry {
        &self.conversions
    }

    /// Allow an extra native/wire conversion. Only effective before
    /// [`Self::initialize`].
    pub fn register_conversion(&mut self, native: BasicKind, wire: BasicKind) -> bool {
        if self.state.is_some() {
            log::warn!("[serializer] conversion {} -> {} registered after initialize", native, wire);
            return false;
        }
        self.conversions.register(native, wire)
    }

    /// Bind `schema` to the layouts declared in `reflector`. Run once.
    pub fn initialize(&mut self, schema: Schema, reflector: Reflector) -> Result<(), BindError> {
        if self.state.is_some() {
            return Err(BindError::AlreadyInitialized);
        }
        if !schema.is_resolved() {
            return Err(BindError::UnresolvedSchema);
        }
        let (layouts, errors) = reflector.into_parts();
        if let Some(err) = errors.into_iter().next() {
            return Err(err);
        }
        let limits = DecodeLimits {
            max_depth: self.config.max_depth,
            max_zero_size_elements: self.config.max_zero_size_elements,
        };
        let table = build_table(schema, &layouts, &self.conversions, limits)?;

        let mut types_by_rust = HashMap::new();
        let mut shared = HashSet::new();
        for layout in &layouts {
            let (LayoutKind::Struct(_), Some(ty)) = (&layout.kind, table.schema.get(&layout.type_path))
            else {
                continue;
            };
            if types_by_rust.insert(layout.type_id, ty).is_some() {
                shared.insert(layout.type_id);
            }
        }
        for id in shared {
            types_by_rust.remove(&id);
        }

        let mut messages: BTreeMap<i32, MessageInfo> = BTreeMap::new();
        let mut ids_by_type = HashMap::new();
        for &(schema_id, ty) in table.schema.messages() {
            let id = schema_id | self.config.message_id_mask;
            let type_path = table.path(ty).to_string();
            let factory = layouts
                .iter()
                .find(|l| l.type_path == type_path)
                .and_then(|l| match &l.kind {
                    LayoutKind::Struct(st) => st.factory.clone(),
                    _ => None,
                });
            if let Some(existing) = messages.get(&id) {
                log::warn!(
                    "[serializer] message id {} of {} collides with {} after masking",
                    id,
                    type_path,
                    existing.type_path
                );
                continue;
            }
            ids_by_type.insert(ty, id);
            messages.insert(
                id,
                MessageInfo {
                    id,
                    type_path,
                    ty,
                    factory,
                },
            );
        }
        log::debug!(
            "[serializer] initialized: {} messages ({} decodable)",
            messages.len(),
            messages.values().filter(|m| m.is_decodable()).count()
        );
        self.state = Some(Bound {
            table,
            messages,
            ids_by_type,
            types_by_rust,
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.state.as_ref().map(|s| &s.table.schema)
    }

    fn bound(&self) -> Result<&Bound, CodecError> {
        self.state.as_ref().ok_or(CodecError::NotInitialized)
    }

    fn type_index(&self, type_path: &str) -> Result<(&Bound, TypeIndex), CodecError> {
        let bound = self.bound()?;
        let ty = bound
            .table
            .schema
            .get(type_path)
            .ok_or_else(|| CodecError::UnknownType(type_path.to_string()))?;
        Ok((bound, ty))
    }

    /// Decode one value of schema type `type_path` into `value`.
    pub fn read<T: Any>(&self, type_path: &str, cur: &mut Cursor<'_>, value: &mut T) -> Result<(), CodecError> {
        let (bound, ty) = self.type_index(type_path)?;
        bound.table.read(ty, cur, value)
    }

    /// Encode `value` as schema type `type_path`.
    pub fn write<T: Any>(&self, type_path: &str, buf: &mut PackBuffer, value: &T) -> Result<(), CodecError> {
        let (bound, ty) = self.type_index(type_path)?;
        bound.table.write(ty, buf, value)
    }

    /// Step over one value of `type_path`; needs no native layout.
    pub fn skip(&self, type_path: &str, cur: &mut Cursor<'_>) -> Result<(), CodecError> {
        let (bound, ty) = self.type_index(type_path)?;
        bound.table.skip(ty, cur)
    }

    /// Encode the default value of `type_path`; needs no native layout.
    pub fn write_default(&self, type_path: &str, buf: &mut PackBuffer) -> Result<(), CodecError> {
        let (bound, ty) = self.type_index(type_path)?;
        bound.table.write_default(ty, buf);
        Ok(())
    }

    /// Human-readable form of `value` as schema type `type_path`.
    pub fn print_value<T: Any>(&self, type_path: &str, value: &T) -> Result<Value, CodecError> {
        let (bound, ty) = self.type_index(type_path)?;
        bound.table.print(ty, value)
    }

    /// Human-readable form of a message.
    pub fn print(&self, message: &dyn Message) -> Result<Value, CodecError> {
        let bound = self.bound()?;
        let ty = self.message_type(bound, message)?;
        bound.table.print(ty, message.as_any())
    }

    fn message_type(&self, bound: &Bound, message: &dyn Message) -> Result<TypeIndex, CodecError> {
        match message.schema_type() {
            Some(path) => bound
                .table
                .schema
                .get(path)
                .ok_or_else(|| CodecError::UnknownType(path.to_string())),
            None => {
                let rust = message.as_any().type_id();
                bound
                    .types_by_rust
                    .get(&rust)
                    .copied()
                    .ok_or_else(|| CodecError::UnknownType(format!("{:?}", message)))
            }
        }
    }

    pub fn message_info(&self, id: i32) -> Option<&MessageInfo> {
        self.state.as_ref()?.messages.get(&id)
    }

    /// Wire ids of all schema messages, ascending.
    pub fn message_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.state
            .iter()
            .flat_map(|s| s.messages.keys().copied())
    }

    /// Wire id of `message`'s type, if it is a concrete message.
    pub fn message_id(&self, message: &dyn Message) -> Option<i32> {
        let bound = self.state.as_ref()?;
        let ty = self.message_type(bound, message).ok()?;
        bound.ids_by_type.get(&ty).copied()
    }

    /// Empty native message for wire id `id`.
    pub fn new_message(&self, id: i32) -> Result<Box<dyn Message>, CodecError> {
        let info = self
            .bound()?
            .messages
            .get(&id)
            .ok_or(CodecError::UnknownMessage(id))?;
        let factory = info.factory.as_ref().ok_or(CodecError::UnknownMessage(id))?;
        Ok(factory())
    }

    /// Append the payload of `message` and return its wire id.
    pub fn encode_message(&self, message: &dyn Message, buf: &mut PackBuffer) -> Result<i32, CodecError> {
        let bound = self.bound()?;
        let ty = self.message_type(bound, message)?;
        let id = bound
            .ids_by_type
            .get(&ty)
            .copied()
            .ok_or_else(|| CodecError::UnknownType(bound.table.path(ty).to_string()))?;
        bound.table.write(ty, buf, message.as_any())?;
        Ok(id)
    }

    /// Decode a payload. `Ok(None)` when `id` has no decodable message.
    pub fn decode_message(&self, id: i32, payload: &[u8]) -> Result<Option<Box<dyn Message>>, CodecError> {
        let bound = self.bound()?;
        let Some(info) = bound.messages.get(&id) else {
            return Ok(None);
        };
        let Some(factory) = info.factory.as_ref() else {
            return Ok(None);
        };
        let mut message = factory();
        let mut cur = Cursor::new(payload);
        bound.table.read(info.ty, &mut cur, message.as_any_mut())?;
        if !cur.is_eof() {
            log::debug!(
                "[serializer] message {} ({}) left {} trailing bytes",
                id,
                info.type_path,
                cur.remaining()
            );
        }
        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::OptionFlags;
    use crate::schema::{FieldDefinition, SchemaDefinition, StructDefinition};

    #[derive(Debug, Default, PartialEq)]
    struct Ping {
        flags: OptionFlags,
        seq: u32,
        note: String,
    }
    crate::impl_message!(Ping);

    fn schema() -> Schema {
        let def = SchemaDefinition::new().with_type(
            StructDefinition::new("Ping")
                .message(5)
                .field(FieldDefinition::required("seq", "uint32"))
                .field(FieldDefinition::required("note", "string").optional(0)),
        );
        Schema::load(&def).unwrap()
    }

    fn reflector() -> Reflector {
        let mut reflector = Reflector::new();
        reflector
            .begin_struct::<Ping>("Ping")
            .required_member("uint32", "seq", |p| &p.seq, |p| &mut p.seq)
            .optional_member("string", "note", 0, |p| &p.note, |p| &mut p.note)
            .optional_flags(|p| &p.flags, |p| &mut p.flags)
            .register_message()
            .end();
        reflector
    }

    #[test]
    fn test_serializer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Serializer>();
    }

    #[test]
    fn test_not_initialized() {
        let serializer = Serializer::default();
        let mut buf = PackBuffer::new();
        assert_eq!(
            serializer.write("Ping", &mut buf, &Ping::default()),
            Err(CodecError::NotInitialized)
        );
        assert!(serializer.message_ids().next().is_none());
    }

    #[test]
    fn test_initialize_is_run_once() {
        let mut serializer = Serializer::default();
        serializer.initialize(schema(), reflector()).unwrap();
        assert_eq!(
            serializer.initialize(schema(), Reflector::new()),
            Err(BindError::AlreadyInitialized)
        );
    }

    #[test]
    fn test_unresolved_schema_rejected() {
        let def = SchemaDefinition::new().with_type(StructDefinition::new("Ping"));
        let mut serializer = Serializer::default();
        assert_eq!(
            serializer.initialize(Schema::read(&def).unwrap(), Reflector::new()),
            Err(BindError::UnresolvedSchema)
        );
    }

    #[test]
    fn test_message_roundtrip_and_mask() {
        let mut serializer = Serializer::new(SerializerConfig {
            message_id_mask: 0x100,
            ..SerializerConfig::default()
        });
        serializer.initialize(schema(), reflector()).unwrap();
        assert_eq!(serializer.message_ids().collect::<Vec<_>>(), [0x105]);

        let mut ping = Ping {
            seq: 9,
            ..Ping::default()
        };
        ping.flags.set(0, true);
        ping.note = "hi".into();

        let mut buf = PackBuffer::new();
        let id = serializer.encode_message(&ping, &mut buf).unwrap();
        assert_eq!(id, 0x105);
        assert_eq!(serializer.message_id(&ping), Some(0x105));

        let decoded = serializer.decode_message(id, buf.as_slice()).unwrap().unwrap();
        assert_eq!(decoded.downcast_ref::<Ping>(), Some(&ping));
        assert!(serializer.decode_message(77, buf.as_slice()).unwrap().is_none());
    }

    #[test]
    fn test_print_message() {
        let mut serializer = Serializer::default();
        serializer.initialize(schema(), reflector()).unwrap();
        let ping = Ping {
            seq: 3,
            ..Ping::default()
        };
        let printed = serializer.print(&ping).unwrap();
        assert_eq!(printed, serde_json::json!({"type": "Ping", "seq": 3}));
    }

    #[test]
    fn test_new_message_unknown_id() {
        let mut serializer = Serializer::default();
        serializer.initialize(schema(), reflector()).unwrap();
        assert!(serializer.new_message(5).unwrap().is::<Ping>());
        assert!(matches!(
            serializer.new_message(6),
            Err(CodecError::UnknownMessage(6))
        ));
    }
}
