//! Core decoding and aggregation library for BTHome v2 sensors.
//!
//! This crate turns raw BTHome v2 BLE service-data payloads into typed
//! measurements and drives a per-device processing pipeline that maintains a
//! growing channel schema, deduplicates retransmissions and projects values
//! into host-facing state and events.
//!
//! # Features
//!
//! - **Single-pass decoding**: One left-to-right scan of the payload into an
//!   ordered measurement sequence
//! - **Object catalog**: Data-driven table of every supported object id with
//!   width, signedness, scaling, unit and semantic kind
//! - **Retransmission dedup**: Rolling packet-counter comparison drops
//!   identical advertisements
//! - **Lazy channel schema**: Channels appear as kinds are first observed,
//!   with `_N` suffixes when a kind repeats within one packet
//! - **Value projection**: Unit-attached quantities, on/off and open/closed
//!   states, trigger events, timestamps, text and base64 raw bytes
//! - **Device properties**: Type code and firmware version routed to entity
//!   metadata instead of channels
//!
//! The crate is synchronous and performs no I/O: the host supplies payload
//! bytes (from whatever BLE transport it uses) and receives results through
//! the [`pipeline::PacketSink`] trait.
//!
//! # Quick Start
//!
//! ```
//! use bthome_core::channels::ChannelSet;
//! use bthome_core::mock::RecordingSink;
//! use bthome_core::pipeline::{process_packet, DeviceContext};
//! use bthome_core::project::StandardUnits;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ctx = DeviceContext::new();
//! let mut channels = ChannelSet::new();
//! let mut sink = RecordingSink::new();
//!
//! // Device info byte, then battery = 100 %.
//! let payload = [0x40, 0x01, 0x64];
//! process_packet(&mut ctx, &mut channels, &payload, &StandardUnits, &mut sink)?;
//!
//! assert_eq!(channels.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod decode;
pub mod dedup;
pub mod error;
pub mod mock;
pub mod pipeline;
pub mod project;
pub mod properties;

// Re-export the shared wire-format types.
pub use bthome_types::catalog;
pub use bthome_types::uuid;
pub use bthome_types::{
    DecodeError, DecodeResult, DecodedPacket, Measurement, PacketHeader, Value, SUPPORTED_VERSION,
};

// Core exports
pub use channels::{ChannelKey, ChannelKind, ChannelSet, ChannelSpec, ChannelValueType};
pub use decode::decode;
pub use dedup::{DedupState, DedupVerdict};
pub use error::{Error, Result};
pub use mock::RecordingSink;
pub use pipeline::{process_packet, refresh, Availability, DeviceContext, PacketOutcome, PacketSink};
pub use project::{project, OutputValue, Projection, StandardUnits, UnitResolver};
pub use properties::{
    split, SplitMeasurements, PROPERTY_DEVICE_TYPE, PROPERTY_FIRMWARE_VERSION,
};
