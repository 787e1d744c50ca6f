//! Static object-id catalog for the BTHome v2 format.
//!
//! Every object id that can appear in a service-data payload resolves to
//! exactly one [`CatalogEntry`] describing how its field is laid out on the
//! wire (width, signedness, decimal scaling) and what the decoded value
//! means (numeric sensor, binary sensor, event, device property).
//!
//! The catalog is the single source of truth for the decoder, the channel
//! reconciler, and the value projector; none of them carry per-kind logic of
//! their own. Ids are stable and additive — entries are never renumbered.
//!
//! The table follows the published BTHome v2 format
//! (<https://bthome.io/format/>).

/// Object ids at or above this value describe the device itself (type code,
/// firmware version) rather than a live sensor reading.
pub const DEVICE_PROPERTY_THRESHOLD: u8 = 0xF0;

/// Object id of the rolling packet counter used for retransmission
/// deduplication.
pub const OBJECT_ID_PACKET_ID: u8 = 0x00;

/// Wire layout of one measurement field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// A fixed-width little-endian integer.
    Fixed {
        /// Field width in bytes (1-4).
        len: u8,
        /// Sign-extend after reconstruction.
        signed: bool,
        /// Decimal scale: decoded value = raw × 10^exponent.
        exponent: i8,
    },
    /// One length byte `L`, then `L` payload bytes.
    LengthPrefixed,
}

/// What a decoded field means, and therefore how it is projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A scalar sensor value, optionally unit-annotated.
    Numeric,
    /// A one-byte boolean sensor (0 = false, anything else = true).
    Binary {
        /// Contact-style kinds (door, window, opening, garage door) project
        /// to an open/closed vocabulary instead of on/off.
        contact: bool,
    },
    /// A fire-and-forget event with a closed tag set.
    Event {
        /// Event-byte to tag-name table.
        tags: &'static [(u8, &'static str)],
        /// The event byte is followed by one auxiliary step-count byte.
        has_steps: bool,
    },
    /// Unix epoch seconds.
    Timestamp,
    /// Length-prefixed UTF-8 text.
    Text,
    /// Length-prefixed opaque bytes.
    Raw,
    /// Device-identity field routed to entity metadata, never to a channel.
    Property(PropertyKind),
}

/// The device-identity fields (object ids ≥ [`DEVICE_PROPERTY_THRESHOLD`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// 16-bit device type code.
    DeviceType,
    /// Firmware version packed in four bytes (major in the most significant
    /// byte).
    FirmwareVersion4,
    /// Firmware version packed in three bytes.
    FirmwareVersion3,
}

/// Immutable decode descriptor for one object id.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    /// The 1-byte object identifier.
    pub object_id: u8,
    /// Stable output-channel name, or `None` for kinds that never
    /// materialize a channel (device properties).
    pub channel: Option<&'static str>,
    /// Wire layout.
    pub payload: Payload,
    /// Semantic kind driving reconciliation and projection.
    pub kind: Kind,
    /// Physical unit symbol, where one applies.
    pub unit: Option<&'static str>,
}

impl CatalogEntry {
    /// Whether this entry describes a device property rather than a sensor.
    #[must_use]
    pub fn is_device_property(&self) -> bool {
        self.object_id >= DEVICE_PROPERTY_THRESHOLD
    }

    /// Tag name for an event byte, falling back to `"unknown"` for values
    /// outside the closed set. Returns `None` for non-event kinds.
    #[must_use]
    pub fn event_tag(&self, byte: u8) -> Option<&'static str> {
        match self.kind {
            Kind::Event { tags, .. } => Some(
                tags.iter()
                    .find(|(b, _)| *b == byte)
                    .map(|(_, tag)| *tag)
                    .unwrap_or("unknown"),
            ),
            _ => None,
        }
    }
}

const fn numeric(
    object_id: u8,
    channel: &'static str,
    len: u8,
    signed: bool,
    exponent: i8,
    unit: Option<&'static str>,
) -> CatalogEntry {
    CatalogEntry {
        object_id,
        channel: Some(channel),
        payload: Payload::Fixed {
            len,
            signed,
            exponent,
        },
        kind: Kind::Numeric,
        unit,
    }
}

const fn binary(object_id: u8, channel: &'static str, contact: bool) -> CatalogEntry {
    CatalogEntry {
        object_id,
        channel: Some(channel),
        payload: Payload::Fixed {
            len: 1,
            signed: false,
            exponent: 0,
        },
        kind: Kind::Binary { contact },
        unit: None,
    }
}

const BUTTON_EVENTS: &[(u8, &str)] = &[
    (0x00, "none"),
    (0x01, "press"),
    (0x02, "double_press"),
    (0x03, "triple_press"),
    (0x04, "long_press"),
    (0x05, "long_double_press"),
    (0x06, "long_triple_press"),
    (0x80, "hold_press"),
];

const DIMMER_EVENTS: &[(u8, &str)] = &[
    (0x00, "none"),
    (0x01, "rotate_left"),
    (0x02, "rotate_right"),
];

/// The full BTHome v2 object table, sorted by object id.
static CATALOG: &[CatalogEntry] = &[
    numeric(0x00, "packet-id", 1, false, 0, None),
    numeric(0x01, "battery", 1, false, 0, Some("%")),
    numeric(0x02, "temperature", 2, true, -2, Some("°C")),
    numeric(0x03, "humidity", 2, false, -2, Some("%")),
    numeric(0x04, "pressure", 3, false, -2, Some("hPa")),
    numeric(0x05, "illuminance", 3, false, -2, Some("lx")),
    numeric(0x06, "mass", 2, false, -2, Some("kg")),
    numeric(0x07, "mass-lb", 2, false, -2, Some("lb")),
    numeric(0x08, "dewpoint", 2, true, -2, Some("°C")),
    numeric(0x09, "count", 1, false, 0, None),
    numeric(0x0A, "energy", 3, false, -3, Some("kWh")),
    numeric(0x0B, "power", 3, false, -2, Some("W")),
    numeric(0x0C, "voltage", 2, false, -3, Some("V")),
    numeric(0x0D, "pm25", 2, false, 0, Some("µg/m³")),
    numeric(0x0E, "pm10", 2, false, 0, Some("µg/m³")),
    binary(0x0F, "generic-boolean", false),
    binary(0x10, "power-on", false),
    binary(0x11, "opening", true),
    numeric(0x12, "co2", 2, false, 0, Some("ppm")),
    numeric(0x13, "tvoc", 2, false, 0, Some("µg/m³")),
    numeric(0x14, "moisture", 2, false, -2, Some("%")),
    binary(0x15, "battery-low", false),
    binary(0x16, "battery-charging", false),
    binary(0x17, "carbon-monoxide", false),
    binary(0x18, "cold", false),
    binary(0x19, "connectivity", false),
    binary(0x1A, "door", true),
    binary(0x1B, "garage-door", true),
    binary(0x1C, "gas-detected", false),
    binary(0x1D, "heat", false),
    binary(0x1E, "light", false),
    binary(0x1F, "lock", false),
    binary(0x20, "moisture-detected", false),
    binary(0x21, "motion", false),
    binary(0x22, "moving", false),
    binary(0x23, "occupancy", false),
    binary(0x24, "plug", false),
    binary(0x25, "presence", false),
    binary(0x26, "problem", false),
    binary(0x27, "running", false),
    binary(0x28, "safety", false),
    binary(0x29, "smoke", false),
    binary(0x2A, "sound", false),
    binary(0x2B, "tamper", false),
    binary(0x2C, "vibration", false),
    binary(0x2D, "window", true),
    numeric(0x2E, "humidity", 1, false, 0, Some("%")),
    numeric(0x2F, "moisture", 1, false, 0, Some("%")),
    CatalogEntry {
        object_id: 0x3A,
        channel: Some("button"),
        payload: Payload::Fixed {
            len: 1,
            signed: false,
            exponent: 0,
        },
        kind: Kind::Event {
            tags: BUTTON_EVENTS,
            has_steps: false,
        },
        unit: None,
    },
    CatalogEntry {
        object_id: 0x3C,
        channel: Some("dimmer"),
        payload: Payload::Fixed {
            len: 1,
            signed: false,
            exponent: 0,
        },
        kind: Kind::Event {
            tags: DIMMER_EVENTS,
            has_steps: true,
        },
        unit: None,
    },
    numeric(0x3D, "count", 2, false, 0, None),
    numeric(0x3E, "count", 4, false, 0, None),
    numeric(0x3F, "rotation", 2, true, -1, Some("°")),
    numeric(0x40, "distance", 2, false, 0, Some("mm")),
    numeric(0x41, "distance", 2, false, -1, Some("m")),
    numeric(0x42, "duration", 3, false, -3, Some("s")),
    numeric(0x43, "current", 2, false, -3, Some("A")),
    numeric(0x44, "speed", 2, false, -2, Some("m/s")),
    numeric(0x45, "temperature", 2, true, -1, Some("°C")),
    numeric(0x46, "uv-index", 1, false, -1, None),
    numeric(0x47, "volume", 2, false, -1, Some("L")),
    numeric(0x48, "volume", 2, false, 0, Some("mL")),
    numeric(0x49, "volume-flow-rate", 2, false, -3, Some("m³/h")),
    numeric(0x4A, "voltage", 2, false, -1, Some("V")),
    numeric(0x4B, "gas", 3, false, -3, Some("m³")),
    numeric(0x4C, "gas", 4, false, -3, Some("m³")),
    numeric(0x4D, "energy", 4, false, -3, Some("kWh")),
    numeric(0x4E, "volume", 4, false, -3, Some("L")),
    numeric(0x4F, "water", 4, false, -3, Some("L")),
    CatalogEntry {
        object_id: 0x50,
        channel: Some("timestamp"),
        payload: Payload::Fixed {
            len: 4,
            signed: false,
            exponent: 0,
        },
        kind: Kind::Timestamp,
        unit: None,
    },
    numeric(0x51, "acceleration", 2, false, -3, Some("m/s²")),
    numeric(0x52, "gyroscope", 2, false, -3, Some("°/s")),
    CatalogEntry {
        object_id: 0x53,
        channel: Some("text"),
        payload: Payload::LengthPrefixed,
        kind: Kind::Text,
        unit: None,
    },
    CatalogEntry {
        object_id: 0x54,
        channel: Some("raw"),
        payload: Payload::LengthPrefixed,
        kind: Kind::Raw,
        unit: None,
    },
    numeric(0x55, "volume-storage", 4, false, -3, Some("L")),
    CatalogEntry {
        object_id: 0xF0,
        channel: None,
        payload: Payload::Fixed {
            len: 2,
            signed: false,
            exponent: 0,
        },
        kind: Kind::Property(PropertyKind::DeviceType),
        unit: None,
    },
    CatalogEntry {
        object_id: 0xF1,
        channel: None,
        payload: Payload::Fixed {
            len: 4,
            signed: false,
            exponent: 0,
        },
        kind: Kind::Property(PropertyKind::FirmwareVersion4),
        unit: None,
    },
    CatalogEntry {
        object_id: 0xF2,
        channel: None,
        payload: Payload::Fixed {
            len: 3,
            signed: false,
            exponent: 0,
        },
        kind: Kind::Property(PropertyKind::FirmwareVersion3),
        unit: None,
    },
];

/// Resolve an object id to its catalog entry.
#[must_use]
pub fn lookup(object_id: u8) -> Option<&'static CatalogEntry> {
    CATALOG
        .binary_search_by_key(&object_id, |e| e.object_id)
        .ok()
        .map(|i| &CATALOG[i])
}

/// All catalog entries, sorted by object id.
#[must_use]
pub fn entries() -> &'static [CatalogEntry] {
    CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sorted_and_unique() {
        for pair in CATALOG.windows(2) {
            assert!(
                pair[0].object_id < pair[1].object_id,
                "catalog out of order at 0x{:02X}",
                pair[1].object_id
            );
        }
    }

    #[test]
    fn test_lookup_known_ids() {
        let battery = lookup(0x01).unwrap();
        assert_eq!(battery.channel, Some("battery"));
        assert_eq!(battery.unit, Some("%"));

        let temperature = lookup(0x02).unwrap();
        assert_eq!(
            temperature.payload,
            Payload::Fixed {
                len: 2,
                signed: true,
                exponent: -2
            }
        );

        assert!(lookup(0x3B).is_none());
        assert!(lookup(0xFF).is_none());
    }

    #[test]
    fn test_fixed_widths_are_sane() {
        for entry in CATALOG {
            if let Payload::Fixed { len, .. } = entry.payload {
                assert!((1..=4).contains(&len), "bad width for 0x{:02X}", entry.object_id);
            }
        }
    }

    #[test]
    fn test_layout_and_kind_agree() {
        // Text and raw kinds are the length-prefixed kinds, and the only
        // ones; every other kind has a fixed-width layout.
        for entry in CATALOG {
            match entry.kind {
                Kind::Text | Kind::Raw => assert_eq!(
                    entry.payload,
                    Payload::LengthPrefixed,
                    "0x{:02X} should be length-prefixed",
                    entry.object_id
                ),
                _ => assert!(
                    matches!(entry.payload, Payload::Fixed { .. }),
                    "0x{:02X} should have a fixed width",
                    entry.object_id
                ),
            }
        }
    }

    #[test]
    fn test_device_properties_have_no_channel() {
        for entry in CATALOG {
            if entry.is_device_property() {
                assert!(entry.channel.is_none());
                assert!(matches!(entry.kind, Kind::Property(_)));
            } else {
                assert!(entry.channel.is_some());
            }
        }
    }

    #[test]
    fn test_contact_kinds() {
        for id in [0x11, 0x1A, 0x1B, 0x2D] {
            assert_eq!(
                lookup(id).unwrap().kind,
                Kind::Binary { contact: true },
                "0x{id:02X} should use open/closed vocabulary"
            );
        }
        assert_eq!(lookup(0x21).unwrap().kind, Kind::Binary { contact: false });
    }

    #[test]
    fn test_event_tags() {
        let button = lookup(0x3A).unwrap();
        assert_eq!(button.event_tag(0x01), Some("press"));
        assert_eq!(button.event_tag(0x80), Some("hold_press"));
        assert_eq!(button.event_tag(0x7F), Some("unknown"));

        let dimmer = lookup(0x3C).unwrap();
        assert_eq!(dimmer.event_tag(0x02), Some("rotate_right"));
        assert!(matches!(
            dimmer.kind,
            Kind::Event {
                has_steps: true,
                ..
            }
        ));

        assert_eq!(lookup(0x01).unwrap().event_tag(0x01), None);
    }
}
