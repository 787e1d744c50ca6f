//! Binary decoder for BTHome v2 service-data payloads.
//!
//! The decoder is a pure, stateless, single-pass transform: it consumes the
//! byte buffer once, left to right, and produces the ordered measurement
//! sequence. It performs no aggregation, no deduplication and no unit
//! resolution — those belong to the pipeline stages downstream.
//!
//! Payload layout:
//!
//! ```text
//! byte 0:            device-info (bit0 = encrypted, bits5-7 = version)
//! repeated:
//!   byte:            object id
//!   fixed width:     n bytes, little-endian, signed/scaled per catalog
//!   length-prefixed: 1 length byte L, then L raw bytes
//! ```
//!
//! Unknown object ids are fatal for the whole buffer: the format gives no
//! width for them, so skipping is impossible without corrupting the scan.

use bytes::Buf;

use bthome_types::catalog::{self, Kind, Payload};
use bthome_types::{DecodeError, DecodeResult, DecodedPacket, Measurement, PacketHeader, Value};

use crate::SUPPORTED_VERSION;

/// Decode one service-data payload into its measurement sequence.
///
/// An empty buffer is a normal condition (BLE scans frequently arrive
/// without service data) and yields an empty packet, not an error. Any
/// malformed non-empty buffer fails as a whole: no partial measurement list
/// is ever returned.
pub fn decode(data: &[u8]) -> DecodeResult<DecodedPacket> {
    if data.is_empty() {
        return Ok(DecodedPacket::empty());
    }

    let mut buf = data;

    let header = PacketHeader::from_device_info(buf.get_u8());
    if header.encrypted {
        return Err(DecodeError::EncryptedPayloadUnsupported);
    }
    if header.version != SUPPORTED_VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }

    let mut measurements = Vec::new();
    while buf.has_remaining() {
        let object_id = buf.get_u8();
        let entry = catalog::lookup(object_id).ok_or(DecodeError::UnknownObjectId(object_id))?;

        let measurement = match entry.payload {
            Payload::Fixed {
                len,
                signed,
                exponent,
            } => decode_fixed(&mut buf, entry, len, signed, exponent, measurements.len())?,
            Payload::LengthPrefixed => decode_length_prefixed(&mut buf, entry, measurements.len())?,
        };
        measurements.push(measurement);
    }

    Ok(DecodedPacket {
        header: Some(header),
        measurements,
    })
}

fn decode_fixed(
    buf: &mut &[u8],
    entry: &'static catalog::CatalogEntry,
    len: u8,
    signed: bool,
    exponent: i8,
    ordinal: usize,
) -> DecodeResult<Measurement> {
    let len = usize::from(len);
    if buf.remaining() < len {
        return Err(DecodeError::TruncatedPayload {
            object_id: entry.object_id,
            needed: len,
            remaining: buf.remaining(),
        });
    }

    let unsigned = buf.get_uint_le(len);
    let raw = if signed {
        sign_extend(unsigned, len)
    } else {
        unsigned as i64
    };

    let value = match entry.kind {
        Kind::Numeric | Kind::Property(_) => Value::Numeric(scale(raw, exponent)),
        Kind::Binary { .. } => Value::Boolean(raw != 0),
        Kind::Timestamp => Value::Timestamp(raw),
        Kind::Event { has_steps, .. } => {
            // Tag byte is the single fixed byte; the step count, where the
            // kind declares one, follows immediately.
            let tag = entry
                .event_tag(unsigned as u8)
                .unwrap_or("unknown");
            let steps = if has_steps {
                if !buf.has_remaining() {
                    return Err(DecodeError::TruncatedPayload {
                        object_id: entry.object_id,
                        needed: 1,
                        remaining: 0,
                    });
                }
                Some(buf.get_u8())
            } else {
                None
            };
            Value::Event { tag, steps }
        }
        // Text and raw kinds always declare a length-prefixed layout (the
        // catalog test pins this); a fixed-width declaration for them has
        // no valid interpretation, so treat the id as undecodable.
        Kind::Text | Kind::Raw => return Err(DecodeError::UnknownObjectId(entry.object_id)),
    };

    Ok(Measurement {
        object_id: entry.object_id,
        ordinal,
        raw,
        value,
    })
}

fn decode_length_prefixed(
    buf: &mut &[u8],
    entry: &'static catalog::CatalogEntry,
    ordinal: usize,
) -> DecodeResult<Measurement> {
    if !buf.has_remaining() {
        return Err(DecodeError::TruncatedPayload {
            object_id: entry.object_id,
            needed: 1,
            remaining: 0,
        });
    }
    let len = usize::from(buf.get_u8());
    if buf.remaining() < len {
        return Err(DecodeError::TruncatedPayload {
            object_id: entry.object_id,
            needed: len,
            remaining: buf.remaining(),
        });
    }

    let payload = buf[..len].to_vec();
    buf.advance(len);

    let value = match entry.kind {
        Kind::Text => Value::Text(String::from_utf8_lossy(&payload).into_owned()),
        _ => Value::Raw(payload),
    };

    Ok(Measurement {
        object_id: entry.object_id,
        ordinal,
        raw: 0,
        value,
    })
}

/// Sign-extend a little-endian integer of `len` bytes.
fn sign_extend(unsigned: u64, len: usize) -> i64 {
    let shift = 64 - 8 * len as u32;
    ((unsigned << shift) as i64) >> shift
}

/// Apply the catalog's power-of-ten scale to a raw integer.
fn scale(raw: i64, exponent: i8) -> f64 {
    raw as f64 * 10f64.powi(i32::from(exponent))
}
