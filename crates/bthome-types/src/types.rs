//! Core data model for decoded BTHome payloads.

use core::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::catalog::{self, CatalogEntry};

/// The BTHome format version this crate decodes.
pub const SUPPORTED_VERSION: u8 = 2;

/// The leading device-info byte of a non-empty payload.
///
/// Bit 0 carries the encryption flag, bit 2 marks trigger-based devices and
/// bits 5-7 carry the format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PacketHeader {
    /// Payload is encrypted (and therefore rejected by the decoder).
    pub encrypted: bool,
    /// Device only transmits on events rather than on a fixed interval.
    pub trigger_based: bool,
    /// Format version from bits 5-7.
    pub version: u8,
}

impl PacketHeader {
    /// Extract the header fields from the raw device-info byte.
    ///
    /// This is pure bit extraction; version and encryption enforcement
    /// happen in the decoder.
    #[must_use]
    pub fn from_device_info(byte: u8) -> Self {
        Self {
            encrypted: byte & 0x01 != 0,
            trigger_based: byte & 0x04 != 0,
            version: byte >> 5,
        }
    }
}

/// A decoded measurement value.
///
/// Closed sum over everything the format can carry; the catalog's semantic
/// kind determines which variant the decoder produces for a given object id.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Value {
    /// Scaled scalar sensor value.
    Numeric(f64),
    /// Bool8 binary sensor state.
    Boolean(bool),
    /// Fired event with its tag and optional step count (dimmer rotation).
    Event {
        /// Tag name from the catalog's closed event set.
        tag: &'static str,
        /// Auxiliary step count, present for kinds that declare one.
        steps: Option<u8>,
    },
    /// Unix epoch seconds.
    Timestamp(i64),
    /// Length-prefixed text payload.
    Text(String),
    /// Length-prefixed opaque bytes.
    Raw(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Event {
                tag,
                steps: Some(steps),
            } => write!(f, "{tag}_{steps}"),
            Value::Event { tag, steps: None } => write!(f, "{tag}"),
            Value::Timestamp(epoch) => write!(f, "{epoch}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Raw(bytes) => write!(f, "{} byte(s)", bytes.len()),
        }
    }
}

/// One typed measurement record from a decoded payload.
///
/// Produced fresh per decode call, in payload order; never persisted by the
/// core.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Measurement {
    /// The object id this field was decoded from.
    pub object_id: u8,
    /// Position within the packet (0-based, payload order).
    pub ordinal: usize,
    /// Sign-extended raw integer before scaling. Zero for text/raw kinds.
    pub raw: i64,
    /// The decoded value.
    pub value: Value,
}

impl Measurement {
    /// The catalog entry for this measurement's object id.
    ///
    /// Always `Some` for measurements produced by the decoder, which rejects
    /// unknown ids up front.
    #[must_use]
    pub fn entry(&self) -> Option<&'static CatalogEntry> {
        catalog::lookup(self.object_id)
    }

    /// The output-channel name declared for this object id, if any.
    #[must_use]
    pub fn channel(&self) -> Option<&'static str> {
        self.entry().and_then(|e| e.channel)
    }

    /// Whether this measurement is a device-identity property.
    #[must_use]
    pub fn is_device_property(&self) -> bool {
        self.object_id >= catalog::DEVICE_PROPERTY_THRESHOLD
    }
}

/// A fully decoded service-data payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DecodedPacket {
    /// Device-info header, `None` only for an empty payload.
    pub header: Option<PacketHeader>,
    /// Ordered measurement sequence.
    pub measurements: Vec<Measurement>,
}

impl DecodedPacket {
    /// A packet decoded from an empty buffer: no header, no measurements.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            header: None,
            measurements: Vec::new(),
        }
    }

    /// The decoded packet-counter value, if the payload carried one.
    #[must_use]
    pub fn packet_id(&self) -> Option<u8> {
        self.measurements
            .iter()
            .find(|m| m.object_id == catalog::OBJECT_ID_PACKET_ID)
            .map(|m| m.raw as u8)
    }
}
