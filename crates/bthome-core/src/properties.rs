//! Splitting device-identity properties from live sensor measurements.
//!
//! Object ids at or above 0xF0 describe the device itself (type code,
//! firmware version). They are projected into a flat string-keyed property
//! map for the host's entity metadata and never materialize channels or
//! events.

use std::collections::BTreeMap;

use bthome_types::catalog::{Kind, PropertyKind};
use bthome_types::Measurement;

/// Property map key for the 16-bit device type code.
pub const PROPERTY_DEVICE_TYPE: &str = "deviceType";

/// Property map key for the firmware version (24- or 32-bit form).
pub const PROPERTY_FIRMWARE_VERSION: &str = "firmwareVersion";

/// Measurement sequence partitioned by destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitMeasurements<'a> {
    /// Live sensor measurements, in payload order.
    pub sensors: Vec<&'a Measurement>,
    /// Device-identity properties rendered as strings.
    pub properties: BTreeMap<String, String>,
}

/// Partition a decoded measurement sequence into sensor measurements and a
/// device property map.
#[must_use]
pub fn split(measurements: &[Measurement]) -> SplitMeasurements<'_> {
    let mut out = SplitMeasurements::default();

    for measurement in measurements {
        if !measurement.is_device_property() {
            out.sensors.push(measurement);
            continue;
        }
        let Some(entry) = measurement.entry() else {
            continue;
        };
        if let Kind::Property(property) = entry.kind {
            let (key, rendered) = render_property(property, measurement.raw as u64);
            out.properties.insert(key.to_owned(), rendered);
        }
    }

    out
}

/// Render one device property as its string form: device type codes as
/// decimal, firmware versions dot-joined with the most significant
/// component first.
fn render_property(property: PropertyKind, raw: u64) -> (&'static str, String) {
    match property {
        PropertyKind::DeviceType => (PROPERTY_DEVICE_TYPE, raw.to_string()),
        PropertyKind::FirmwareVersion4 => (
            PROPERTY_FIRMWARE_VERSION,
            format!(
                "{}.{}.{}.{}",
                (raw >> 24) & 0xFF,
                (raw >> 16) & 0xFF,
                (raw >> 8) & 0xFF,
                raw & 0xFF
            ),
        ),
        PropertyKind::FirmwareVersion3 => (
            PROPERTY_FIRMWARE_VERSION,
            format!(
                "{}.{}.{}",
                (raw >> 16) & 0xFF,
                (raw >> 8) & 0xFF,
                raw & 0xFF
            ),
        ),
    }
}
