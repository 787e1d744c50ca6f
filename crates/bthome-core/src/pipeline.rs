//! Per-packet processing pipeline.
//!
//! One packet runs `decode → dedup → split → reconcile → project` to
//! completion before the next is accepted for the same device. The core
//! suspends on nothing and performs no I/O; the host supplies the bytes and
//! receives results through [`PacketSink`].
//!
//! Shared state and serialization: [`DeviceContext`] and the known
//! [`ChannelSet`] are read-modify-write per packet. A host delivering
//! packets concurrently for the same device must serialize calls per device
//! entity, or the at-most-once dedup guarantee and channel creation both
//! race.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use bthome_types::catalog;
use bthome_types::Measurement;

use crate::channels::{self, ChannelKey, ChannelSet, ChannelSpec};
use crate::decode::decode;
use crate::dedup::{DedupState, DedupVerdict};
use crate::error::{Error, Result};
use crate::project::{self, Projection, UnitResolver};
use crate::properties;

/// Device availability as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// A packet was processed successfully.
    Online,
    /// Packet processing failed; the detail is the human-readable message.
    Offline {
        /// Failure description for the host's status display.
        detail: String,
    },
}

/// Receives everything one processed packet produces.
///
/// Implementations belong to the host: channel lifecycle, value sinks and
/// entity metadata all live outside the core. `create_channels` must be
/// idempotent when called with already-existing keys and must merge the new
/// keys into the known set before the following state updates arrive.
pub trait PacketSink {
    /// Materialize newly required channels.
    fn create_channels(&mut self, new_channels: &[ChannelSpec]);
    /// Persist a state update for a channel.
    fn update_state(&mut self, key: &ChannelKey, value: project::OutputValue);
    /// Fire an event on a trigger channel.
    fn trigger_channel(&mut self, key: &ChannelKey, event: &str);
    /// Replace device-identity metadata.
    fn update_properties(&mut self, properties: &BTreeMap<String, String>);
    /// Mark a channel's value as undefined (stale after a failure).
    fn invalidate_channel(&mut self, key: &ChannelKey);
    /// Report an availability transition.
    fn update_availability(&mut self, availability: Availability);
}

/// Per-device mutable state carried across packets.
///
/// Callers own one context per device entity and must serialize access to
/// it (see the module notes).
#[derive(Debug, Clone, Default)]
pub struct DeviceContext {
    dedup: DedupState,
    cached_payload: Vec<u8>,
}

impl DeviceContext {
    /// Create a context with no packet seen yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently received non-empty payload.
    #[must_use]
    pub fn cached_payload(&self) -> &[u8] {
        &self.cached_payload
    }

    /// The last accepted packet id, if any.
    #[must_use]
    pub fn last_packet_id(&self) -> Option<u8> {
        self.dedup.last_packet_id()
    }
}

/// What processing one packet amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Empty payload; nothing to do. A frequent, normal condition.
    Empty,
    /// Identical retransmission; dropped without updates.
    Duplicate,
    /// Packet processed and projected.
    Processed {
        /// Sensor measurements projected.
        measurements: usize,
        /// Channels newly created for this packet.
        new_channels: usize,
    },
}

/// Process one service-data payload for a device.
///
/// On success the sink sees, in order: availability `Online`, any new
/// channels, device properties (when present), then the state updates and
/// triggers. On a decode failure every known channel is invalidated, the
/// sink goes `Offline` with the failure message, and the error is returned;
/// dedup state and the channel set are left untouched so the next valid
/// packet recovers cleanly.
pub fn process_packet(
    ctx: &mut DeviceContext,
    known_channels: &mut ChannelSet,
    payload: &[u8],
    units: &dyn UnitResolver,
    sink: &mut dyn PacketSink,
) -> Result<PacketOutcome> {
    if payload.is_empty() {
        // BLE scans without service data happen all the time; ignore.
        return Ok(PacketOutcome::Empty);
    }

    ctx.cached_payload = payload.to_vec();

    let packet = match decode(payload) {
        Ok(packet) => packet,
        Err(decode_error) => {
            let error = Error::from(decode_error);
            for key in known_channels.iter() {
                sink.invalidate_channel(key);
            }
            sink.update_availability(Availability::Offline {
                detail: error.status_detail(),
            });
            return Err(error);
        }
    };

    if ctx.dedup.check(&packet) == DedupVerdict::Duplicate {
        debug!(packet_id = ?packet.packet_id(), "duplicate packet, skipping");
        return Ok(PacketOutcome::Duplicate);
    }

    sink.update_availability(Availability::Online);

    let split = properties::split(&packet.measurements);
    if !split.properties.is_empty() {
        sink.update_properties(&split.properties);
    }

    let new_channels = channels::reconcile(known_channels, &split.sensors);
    if !new_channels.is_empty() {
        sink.create_channels(&new_channels);
        known_channels.extend(new_channels.iter().map(|c| c.key.clone()));
    }

    let mut projected = 0usize;
    for (object_id, group) in channels::group_by_object_id(&split.sensors) {
        let Some(name) = catalog::lookup(object_id).and_then(|e| e.channel) else {
            // Already warned during reconciliation.
            continue;
        };
        for (index, measurement) in group.iter().enumerate() {
            let key = channels::key_for(name, group.len(), index + 1);
            if !known_channels.contains(&key) {
                warn!(channel = %key, "no channel found for measurement");
                continue;
            }
            if apply(measurement, &key, units, sink) {
                projected += 1;
            }
        }
    }

    Ok(PacketOutcome::Processed {
        measurements: projected,
        new_channels: new_channels.len(),
    })
}

/// Reprocess the cached payload, as for a host-initiated refresh.
///
/// The dedup short-circuit applies: a cached payload carrying a packet
/// counter comes back as [`PacketOutcome::Duplicate`].
pub fn refresh(
    ctx: &mut DeviceContext,
    known_channels: &mut ChannelSet,
    units: &dyn UnitResolver,
    sink: &mut dyn PacketSink,
) -> Result<PacketOutcome> {
    let payload = ctx.cached_payload.clone();
    process_packet(ctx, known_channels, &payload, units, sink)
}

fn apply(
    measurement: &Measurement,
    key: &ChannelKey,
    units: &dyn UnitResolver,
    sink: &mut dyn PacketSink,
) -> bool {
    match project::project(measurement, units) {
        Some(Projection::State(value)) => {
            sink.update_state(key, value);
            true
        }
        Some(Projection::Trigger(event)) => {
            sink.trigger_channel(key, &event);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingSink;
    use crate::project::{OutputValue, StandardUnits};

    /// b-parasite advertisement plus a second battery field.
    const TWO_BATTERIES: &[u8] = &[
        0x40, 0x02, 0xCA, 0x09, 0x2E, 0x28, 0x05, 0x00, 0x00, 0x00, 0x0C, 0xF6, 0x0C, 0x2F, 0x00,
        0x01, 0x64, 0x01, 0x64,
    ];

    /// b-parasite advertisement plus motion, window, rotation and a device
    /// type property.
    const MIXED_KINDS: &[u8] = &[
        0x40, 0x02, 0xCA, 0x09, 0x2E, 0x28, 0x05, 0x00, 0x00, 0x00, 0x0C, 0xF6, 0x0C, 0x2F, 0x00,
        0x01, 0x64, 0x21, 0x01, 0x2D, 0x00, 0x3F, 0x02, 0x0C, 0xF0, 0x02, 0x00,
    ];

    fn run(
        ctx: &mut DeviceContext,
        known: &mut ChannelSet,
        sink: &mut RecordingSink,
        payload: &[u8],
    ) -> PacketOutcome {
        process_packet(ctx, known, payload, &StandardUnits, sink).unwrap()
    }

    fn channel_names(known: &ChannelSet) -> Vec<String> {
        known.iter().map(ChannelKey::to_string).collect()
    }

    #[test]
    fn test_repeated_kind_creates_numbered_channels() {
        let mut ctx = DeviceContext::new();
        let mut known = ChannelSet::new();
        let mut sink = RecordingSink::new();

        run(&mut ctx, &mut known, &mut sink, TWO_BATTERIES);

        let names = channel_names(&known);
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"battery_1".to_owned()));
        assert!(names.contains(&"battery_2".to_owned()));
        assert!(!names.contains(&"battery".to_owned()));
    }

    #[test]
    fn test_mixed_kinds_states_and_properties() {
        let mut ctx = DeviceContext::new();
        let mut known = ChannelSet::new();
        let mut sink = RecordingSink::new();

        let outcome = run(&mut ctx, &mut known, &mut sink, MIXED_KINDS);
        assert_eq!(
            outcome,
            PacketOutcome::Processed {
                measurements: 9,
                new_channels: 9
            }
        );

        for name in [
            "temperature",
            "humidity",
            "illuminance",
            "voltage",
            "moisture",
            "battery",
            "motion",
            "window",
            "rotation",
        ] {
            assert!(
                known.contains(&ChannelKey::new(name, None)),
                "missing channel {name}"
            );
        }

        assert_eq!(
            sink.state(&ChannelKey::new("battery", None)),
            Some(&OutputValue::Quantity {
                value: 100.0,
                unit: "%".to_owned()
            })
        );
        assert_eq!(
            sink.state(&ChannelKey::new("motion", None)),
            Some(&OutputValue::OnOff(true))
        );
        assert_eq!(
            sink.state(&ChannelKey::new("window", None)),
            Some(&OutputValue::OpenClosed(false))
        );
        match sink.state(&ChannelKey::new("voltage", None)) {
            Some(OutputValue::Quantity { value, unit }) => {
                assert!((value - 3.318).abs() < 1e-9);
                assert_eq!(unit, "V");
            }
            other => panic!("expected voltage quantity, got {other:?}"),
        }
        match sink.state(&ChannelKey::new("rotation", None)) {
            Some(OutputValue::Quantity { value, unit }) => {
                assert!((value - 307.4).abs() < 1e-9);
                assert_eq!(unit, "°");
            }
            other => panic!("expected rotation quantity, got {other:?}"),
        }

        assert_eq!(
            sink.properties.last().and_then(|p| p.get("deviceType")).map(String::as_str),
            Some("2")
        );
        assert_eq!(sink.availability.last(), Some(&Availability::Online));
    }

    #[test]
    fn test_channels_accumulate_across_packets() {
        let mut ctx = DeviceContext::new();
        let mut known = ChannelSet::new();
        let mut sink = RecordingSink::new();

        // Packet id, battery, temperature, humidity.
        run(
            &mut ctx,
            &mut known,
            &mut sink,
            &[0x40, 0x00, 0x46, 0x01, 0x64, 0x02, 0x4C, 0x08, 0x03, 0x81, 0x14],
        );
        // Voltage, power, opening.
        run(
            &mut ctx,
            &mut known,
            &mut sink,
            &[0x40, 0x0C, 0xD1, 0x0B, 0x10, 0x00, 0x11, 0x01],
        );

        let names = channel_names(&known);
        assert_eq!(names.len(), 7);
        for name in [
            "packet-id",
            "battery",
            "temperature",
            "humidity",
            "voltage",
            "power-on",
            "opening",
        ] {
            assert!(names.contains(&name.to_owned()), "missing channel {name}");
        }
    }

    #[test]
    fn test_identical_packet_is_a_no_op() {
        let payload: &[u8] = &[0x40, 0x00, 0x09, 0x01, 0x64];
        let mut ctx = DeviceContext::new();
        let mut known = ChannelSet::new();
        let mut sink = RecordingSink::new();

        run(&mut ctx, &mut known, &mut sink, payload);
        let updates_after_first = sink.states.len();
        let channels_after_first = known.len();

        let outcome = run(&mut ctx, &mut known, &mut sink, payload);
        assert_eq!(outcome, PacketOutcome::Duplicate);
        assert_eq!(sink.states.len(), updates_after_first);
        assert_eq!(known.len(), channels_after_first);
        assert_eq!(ctx.last_packet_id(), Some(9));
    }

    #[test]
    fn test_empty_payload_is_silently_ignored() {
        let mut ctx = DeviceContext::new();
        let mut known = ChannelSet::new();
        let mut sink = RecordingSink::new();

        let outcome = run(&mut ctx, &mut known, &mut sink, &[]);
        assert_eq!(outcome, PacketOutcome::Empty);
        assert!(sink.availability.is_empty());
        assert!(known.is_empty());
    }

    #[test]
    fn test_decode_failure_invalidates_and_goes_offline() {
        let mut ctx = DeviceContext::new();
        let mut known = ChannelSet::new();
        let mut sink = RecordingSink::new();

        run(&mut ctx, &mut known, &mut sink, &[0x40, 0x01, 0x64]);
        let channels_before = known.clone();
        let packet_id_before = ctx.last_packet_id();

        let result = process_packet(
            &mut ctx,
            &mut known,
            &[0x41, 0x01, 0x64],
            &StandardUnits,
            &mut sink,
        );
        assert!(result.is_err());

        assert_eq!(sink.invalidated, vec![ChannelKey::new("battery", None)]);
        match sink.availability.last() {
            Some(Availability::Offline { detail }) => {
                assert!(detail.contains("encrypted"), "unexpected detail: {detail}");
            }
            other => panic!("expected offline, got {other:?}"),
        }

        // Failure leaves dedup state and schema untouched...
        assert_eq!(known, channels_before);
        assert_eq!(ctx.last_packet_id(), packet_id_before);

        // ...so the next valid packet recovers cleanly.
        let outcome = run(&mut ctx, &mut known, &mut sink, &[0x40, 0x01, 0x63]);
        assert!(matches!(outcome, PacketOutcome::Processed { .. }));
        assert_eq!(sink.availability.last(), Some(&Availability::Online));
    }

    #[test]
    fn test_unknown_object_id_fails_whole_packet() {
        let mut ctx = DeviceContext::new();
        let mut known = ChannelSet::new();
        let mut sink = RecordingSink::new();

        let result = process_packet(
            &mut ctx,
            &mut known,
            &[0x40, 0x01, 0x64, 0x99, 0x00],
            &StandardUnits,
            &mut sink,
        );
        assert!(result.is_err());
        // The decodable battery field before the bad id produced nothing.
        assert!(sink.states.is_empty());
        assert!(known.is_empty());
    }

    #[test]
    fn test_refresh_reprocesses_cached_payload() {
        let mut ctx = DeviceContext::new();
        let mut known = ChannelSet::new();
        let mut sink = RecordingSink::new();

        // No packet counter in this payload, so refresh re-projects it.
        run(&mut ctx, &mut known, &mut sink, &[0x40, 0x01, 0x64]);
        let outcome = refresh(&mut ctx, &mut known, &StandardUnits, &mut sink).unwrap();
        assert_eq!(
            outcome,
            PacketOutcome::Processed {
                measurements: 1,
                new_channels: 0
            }
        );

        // With a counter, refresh hits the dedup short-circuit.
        run(&mut ctx, &mut known, &mut sink, &[0x40, 0x00, 0x05, 0x01, 0x64]);
        let outcome = refresh(&mut ctx, &mut known, &StandardUnits, &mut sink).unwrap();
        assert_eq!(outcome, PacketOutcome::Duplicate);
    }

    #[test]
    fn test_event_triggers_do_not_update_state() {
        let mut ctx = DeviceContext::new();
        let mut known = ChannelSet::new();
        let mut sink = RecordingSink::new();

        run(&mut ctx, &mut known, &mut sink, &[0x40, 0x3A, 0x01]);
        assert!(sink.states.is_empty());
        assert_eq!(
            sink.triggers,
            vec![(ChannelKey::new("button", None), "press".to_owned())]
        );
    }
}
