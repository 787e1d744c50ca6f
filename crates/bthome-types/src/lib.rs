//! Platform-agnostic types for the BTHome v2 sensor broadcast format.
//!
//! This crate provides the shared data model used by the decoder and
//! aggregation pipeline in `bthome-core`:
//!
//! - The static object-id catalog (widths, signedness, decimal scaling,
//!   semantic kinds, units) for every BTHome v2 object id
//! - Measurement and value types produced by the decoder
//! - The decode error taxonomy
//! - The BLE service-data UUID constants
//!
//! # Example
//!
//! ```
//! use bthome_types::catalog;
//!
//! let entry = catalog::lookup(0x02).unwrap();
//! assert_eq!(entry.channel, Some("temperature"));
//! assert_eq!(entry.unit, Some("°C"));
//! ```

pub mod catalog;
pub mod error;
pub mod types;
pub mod uuid;

pub use catalog::{CatalogEntry, Kind, Payload, PropertyKind};
pub use error::{DecodeError, DecodeResult};
pub use types::{DecodedPacket, Measurement, PacketHeader, SUPPORTED_VERSION, Value};
pub use uuid as uuids;
