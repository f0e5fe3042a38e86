// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefixed message framing.
//!
//! # Record Format
//!
//! ```text
//! +-------------+-------------+-------------------------+
//! | length (4)  | id (4)      | payload (length - 4)    |
//! +-------------+-------------+-------------------------+
//! ```
//!
//! Both header fields are signed 32-bit little-endian. `length` covers the
//! id and the payload. Records with an id the serializer cannot decode are
//! skipped whole whatever their size; `max_message_bytes` bounds only the
//! records that get decoded.

use crate::config::FramingConfig;
use crate::error::{CodecError, FramingError};
use crate::message::Message;
use crate::serializer::Serializer;
use crate::wire::PackBuffer;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Read, Write};

/// Length plus id.
pub const HEADER_SIZE: usize = 8;

/// Bytes of the id counted by the length field.
const ID_SIZE: usize = 4;

/// Record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Id plus payload size.
    pub length: i32,
    pub id: i32,
}

impl RecordHeader {
    pub fn for_payload(id: i32, payload_len: usize) -> Result<Self, FramingError> {
        let length = payload_len
            .checked_add(ID_SIZE)
            .and_then(|l| i32::try_from(l).ok())
            .ok_or(FramingError::MessageTooLarge {
                size: payload_len,
                limit: i32::MAX as usize - ID_SIZE,
            })?;
        Ok(Self { length, id })
    }

    /// Parse the first [`HEADER_SIZE`] bytes of `bytes`.
    pub fn parse(mut bytes: &[u8]) -> io::Result<Self> {
        Ok(Self {
            length: bytes.read_i32::<LittleEndian>()?,
            id: bytes.read_i32::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i32::<LittleEndian>(self.length)?;
        w.write_i32::<LittleEndian>(self.id)?;
        Ok(())
    }

    /// Payload size, rejecting lengths too short to hold the id.
    pub fn payload_size(&self) -> Result<usize, FramingError> {
        usize::try_from(self.length)
            .ok()
            .and_then(|l| l.checked_sub(ID_SIZE))
            .ok_or(FramingError::InvalidLength(self.length))
    }

    /// Payload size, checked against `limit`.
    pub fn payload_len(&self, limit: usize) -> Result<usize, FramingError> {
        let size = self.payload_size()?;
        if size > limit {
            return Err(FramingError::MessageTooLarge { size, limit });
        }
        Ok(size)
    }
}

/// Result of reading one record.
pub enum ReadOutcome {
    /// Decoded message.
    Message { id: i32, message: Box<dyn Message> },
    /// Record with an id that has no decodable message; payload consumed.
    Skipped { id: i32, length: usize },
    /// Input ended cleanly on a record boundary.
    EndOfStream,
}

impl fmt::Debug for ReadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message { id, message } => f
                .debug_struct("Message")
                .field("id", id)
                .field("message", message)
                .finish(),
            Self::Skipped { id, length } => f
                .debug_struct("Skipped")
                .field("id", id)
                .field("length", length)
                .finish(),
            Self::EndOfStream => f.write_str("EndOfStream"),
        }
    }
}

/// Framing counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramingStats {
    pub messages_read: u64,
    pub messages_skipped: u64,
    pub messages_written: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Append one record for `message` to `out` and return its id.
///
/// On error `out` is left as it was.
pub fn encode_record(
    serializer: &Serializer,
    config: &FramingConfig,
    message: &dyn Message,
    out: &mut PackBuffer,
) -> Result<i32, FramingError> {
    let start = out.reserve_zeroed(HEADER_SIZE);
    let result = serializer
        .encode_message(message, out)
        .map_err(FramingError::from)
        .and_then(|id| {
            let payload = out.len() - start - HEADER_SIZE;
            if payload > config.max_message_bytes {
                return Err(FramingError::MessageTooLarge {
                    size: payload,
                    limit: config.max_message_bytes,
                });
            }
            let header = RecordHeader::for_payload(id, payload)?;
            out.patch_i32_le(start, header.length);
            out.patch_i32_le(start + 4, header.id);
            Ok(id)
        });
    if result.is_err() {
        out.truncate(start);
    }
    result
}

fn is_decodable(serializer: &Serializer, id: i32) -> bool {
    serializer
        .message_info(id)
        .is_some_and(|info| info.is_decodable())
}

/// Decode the first record of `bytes`.
///
/// Returns `Ok(None)` when `bytes` does not hold a whole record yet,
/// otherwise the outcome and the number of bytes consumed. Undecodable
/// records are not held to `max_message_bytes` and come back as
/// [`ReadOutcome::Skipped`] once buffered whole. A decodable record over the
/// limit fails with [`FramingError::MessageTooLarge`] before its payload is
/// needed; its `size` plus [`HEADER_SIZE`] is the span to drop.
pub fn decode_record(
    serializer: &Serializer,
    config: &FramingConfig,
    bytes: &[u8],
) -> Result<Option<(ReadOutcome, usize)>, FramingError> {
    if bytes.len() < HEADER_SIZE {
        return Ok(None);
    }
    let header = RecordHeader::parse(bytes)?;
    let payload_len = if is_decodable(serializer, header.id) {
        header.payload_len(config.max_message_bytes)?
    } else {
        header.payload_size()?
    };
    let total = HEADER_SIZE + payload_len;
    let Some(payload) = bytes.get(HEADER_SIZE..total) else {
        return Ok(None);
    };
    let outcome = decode_payload(serializer, header.id, payload)?;
    Ok(Some((outcome, total)))
}

fn decode_payload(serializer: &Serializer, id: i32, payload: &[u8]) -> Result<ReadOutcome, CodecError> {
    match serializer.decode_message(id, payload)? {
        Some(message) => Ok(ReadOutcome::Message { id, message }),
        None => {
            log::debug!("[framing] skipping record id={} ({} bytes)", id, payload.len());
            Ok(ReadOutcome::Skipped {
                id,
                length: payload.len(),
            })
        }
    }
}

/// Writes framed messages to a byte stream.
pub struct MessageWriter<W> {
    inner: W,
    buffer: PackBuffer,
    config: FramingConfig,
    stats: FramingStats,
}

impl<W: Write> MessageWriter<W> {
    pub fn new(inner: W, config: FramingConfig) -> Self {
        Self {
            inner,
            buffer: PackBuffer::new(),
            config,
            stats: FramingStats::default(),
        }
    }

    /// Encode and write one record; returns the message id.
    pub fn write(&mut self, serializer: &Serializer, message: &dyn Message) -> Result<i32, FramingError> {
        self.buffer.clear();
        let id = serializer.encode_message(message, &mut self.buffer)?;
        let payload = self.buffer.len();
        if payload > self.config.max_message_bytes {
            return Err(FramingError::MessageTooLarge {
                size: payload,
                limit: self.config.max_message_bytes,
            });
        }
        RecordHeader::for_payload(id, payload)?.write_to(&mut self.inner)?;
        self.inner.write_all(self.buffer.as_slice())?;
        self.stats.messages_written += 1;
        self.stats.bytes_written += (HEADER_SIZE + payload) as u64;
        Ok(id)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn stats(&self) -> FramingStats {
        self.stats
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads framed messages from a byte stream.
pub struct MessageReader<R> {
    inner: R,
    payload: Vec<u8>,
    config: FramingConfig,
    stats: FramingStats,
}

/// Fill `buf` as far as the input allows; returns the bytes read.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl<R: Read> MessageReader<R> {
    pub fn new(inner: R, config: FramingConfig) -> Self {
        Self {
            inner,
            payload: Vec::new(),
            config,
            stats: FramingStats::default(),
        }
    }

    /// Read the next record.
    pub fn read(&mut self, serializer: &Serializer) -> Result<ReadOutcome, FramingError> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.inner, &mut header)? {
            0 => return Ok(ReadOutcome::EndOfStream),
            HEADER_SIZE => {}
            n => {
                return Err(FramingError::Truncated {
                    need: HEADER_SIZE - n,
                })
            }
        }
        let header = RecordHeader::parse(&header)?;
        let length = header.payload_size()?;

        if !is_decodable(serializer, header.id) {
            self.discard(length)?;
            log::debug!("[framing] skipping record id={} ({} bytes)", header.id, length);
            self.stats.messages_skipped += 1;
            self.stats.bytes_read += (HEADER_SIZE + length) as u64;
            return Ok(ReadOutcome::Skipped {
                id: header.id,
                length,
            });
        }
        if length > self.config.max_message_bytes {
            self.discard(length)?;
            log::debug!(
                "[framing] dropped oversized record id={} ({} bytes)",
                header.id,
                length
            );
            self.stats.bytes_read += (HEADER_SIZE + length) as u64;
            return Err(FramingError::MessageTooLarge {
                size: length,
                limit: self.config.max_message_bytes,
            });
        }

        self.payload.resize(length, 0);
        let filled = read_full(&mut self.inner, &mut self.payload)?;
        if filled < length {
            return Err(FramingError::Truncated {
                need: length - filled,
            });
        }
        self.stats.bytes_read += (HEADER_SIZE + length) as u64;
        let outcome = decode_payload(serializer, header.id, &self.payload)?;
        match outcome {
            ReadOutcome::Message { .. } => self.stats.messages_read += 1,
            ReadOutcome::Skipped { .. } => self.stats.messages_skipped += 1,
            ReadOutcome::EndOfStream => {}
        }
        Ok(outcome)
    }

    /// Consume `length` payload bytes without buffering them.
    fn discard(&mut self, length: usize) -> Result<(), FramingError> {
        let copied = io::copy(&mut (&mut self.inner).take(length as u64), &mut io::sink())?;
        let copied = usize::try_from(copied).unwrap_or(length);
        if copied < length {
            return Err(FramingError::Truncated {
                need: length - copied,
            });
        }
        Ok(())
    }

    pub fn stats(&self) -> FramingStats {
        self.stats
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = RecordHeader::for_payload(9, 12).unwrap();
        assert_eq!(header.length, 16);
        let mut bytes = Vec::new();
        header.write_to(&mut bytes).unwrap();
        assert_eq!(bytes, [16, 0, 0, 0, 9, 0, 0, 0]);
        assert_eq!(RecordHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_length_below_id_size_rejected() {
        let header = RecordHeader { length: 3, id: 1 };
        assert!(matches!(
            header.payload_len(1024),
            Err(FramingError::InvalidLength(3))
        ));
        let negative = RecordHeader { length: -8, id: 1 };
        assert!(negative.payload_len(1024).is_err());
        assert_eq!(RecordHeader { length: 4, id: 1 }.payload_size().unwrap(), 0);
    }

    #[test]
    fn test_payload_limit() {
        let header = RecordHeader { length: 104, id: 1 };
        assert_eq!(header.payload_len(100).unwrap(), 100);
        assert!(matches!(
            header.payload_len(99),
            Err(FramingError::MessageTooLarge { size: 100, limit: 99 })
        ));
    }

    #[test]
    fn test_reader_distinguishes_clean_end_from_truncation() {
        let serializer = Serializer::default();
        let mut empty = MessageReader::new(&[][..], FramingConfig::default());
        assert!(matches!(empty.read(&serializer), Ok(ReadOutcome::EndOfStream)));

        let mut partial = MessageReader::new(&[8u8, 0, 0][..], FramingConfig::default());
        assert!(matches!(
            partial.read(&serializer),
            Err(FramingError::Truncated { need: 5 })
        ));
    }

    #[test]
    fn test_decode_record_needs_whole_record() {
        let serializer = Serializer::default();
        let config = FramingConfig::default();
        let record = [6u8, 0, 0, 0, 42, 0, 0, 0, 0xAA, 0xBB];
        assert!(decode_record(&serializer, &config, &record[..5]).unwrap().is_none());
        assert!(decode_record(&serializer, &config, &record[..9]).unwrap().is_none());
        assert!(matches!(
            decode_record(&serializer, &config, &record),
            Err(FramingError::Codec(CodecError::NotInitialized))
        ));
    }
}
