//! Channel identity and schema reconciliation.
//!
//! Channels are created lazily as new measurement kinds are observed, and
//! the set only ever grows — once materialized, a channel is never removed
//! or renamed except on full device teardown. Reconciliation compares the
//! kinds in one packet against the known channel set and returns the delta
//! to create; merging that delta into the snapshot is the channel-lifecycle
//! collaborator's job.
//!
//! Channel identity is the channel *name* from the catalog, not the object
//! id: temperature at 0.01° resolution (0x02) and at 0.1° (0x45) both feed
//! the one `temperature` channel.

use std::collections::BTreeSet;
use std::fmt;

use tracing::warn;

use bthome_types::catalog::Kind;
use bthome_types::Measurement;

/// Stable identity of one output channel.
///
/// `instance` is present only when the same kind occurs more than once
/// within a single packet; `battery` with multiplicity two yields
/// `battery_1` and `battery_2`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelKey {
    /// Catalog-declared channel name.
    pub name: String,
    /// 1-based instance number for kinds repeated within one packet.
    pub instance: Option<u32>,
}

impl ChannelKey {
    /// Build a key from a channel name and optional instance number.
    #[must_use]
    pub fn new(name: impl Into<String>, instance: Option<u32>) -> Self {
        Self {
            name: name.into(),
            instance,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(instance) => write!(f, "{}_{}", self.name, instance),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The set of currently-known channel keys for one device.
///
/// Owned by the channel-lifecycle collaborator; the reconciler only reads
/// it.
pub type ChannelSet = BTreeSet<ChannelKey>;

/// Value vocabulary of a state channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelValueType {
    /// Scalar, optionally unit-annotated.
    Number {
        /// Unit symbol declared by the catalog, if any.
        unit: Option<&'static str>,
    },
    /// On/off switch state.
    Switch,
    /// Open/closed contact state.
    Contact,
    /// Calendar/time value.
    DateTime,
    /// Free-form text (also used for the base64 rendering of raw bytes).
    Text,
}

/// Whether a channel holds persisted state or fires events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Persisted state channel.
    State(ChannelValueType),
    /// Fire-and-forget trigger channel.
    Trigger,
}

/// Everything the channel-lifecycle collaborator needs to materialize one
/// new channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// The channel's stable key.
    pub key: ChannelKey,
    /// Object id that first required this channel.
    pub object_id: u8,
    /// State vocabulary or trigger.
    pub kind: ChannelKind,
}

impl ChannelSpec {
    /// Whether this channel fires events instead of holding state.
    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(self.kind, ChannelKind::Trigger)
    }
}

/// Group sensor measurements by object id, preserving first-seen order of
/// the ids and payload order within each group.
#[must_use]
pub fn group_by_object_id<'a>(sensors: &[&'a Measurement]) -> Vec<(u8, Vec<&'a Measurement>)> {
    let mut groups: Vec<(u8, Vec<&'a Measurement>)> = Vec::new();
    for &measurement in sensors {
        match groups.iter_mut().find(|(id, _)| *id == measurement.object_id) {
            Some((_, group)) => group.push(measurement),
            None => groups.push((measurement.object_id, vec![measurement])),
        }
    }
    groups
}

/// The channel key for the `index`-th (1-based) occurrence of a kind that
/// appears `multiplicity` times in one packet.
#[must_use]
pub fn key_for(name: &str, multiplicity: usize, index: usize) -> ChannelKey {
    if multiplicity > 1 {
        ChannelKey::new(name, Some(index as u32))
    } else {
        ChannelKey::new(name, None)
    }
}

/// Compute the channels a packet requires but the known set lacks.
///
/// Pure with respect to core state: the returned delta is handed to the
/// channel-lifecycle collaborator, which merges it into `existing` before
/// values are projected.
///
/// Kinds without an output-channel mapping are skipped with a warning,
/// never an error. A kind previously represented by a single unnumbered
/// channel that now appears with multiplicity gets numbered channels
/// alongside the stale unnumbered one — the append-only model never renames.
#[must_use]
pub fn reconcile(existing: &ChannelSet, sensors: &[&Measurement]) -> Vec<ChannelSpec> {
    let mut new_channels: Vec<ChannelSpec> = Vec::new();

    for (object_id, group) in group_by_object_id(sensors) {
        let Some(entry) = bthome_types::catalog::lookup(object_id) else {
            continue;
        };
        let Some(name) = entry.channel else {
            warn!(
                object_id = format_args!("0x{object_id:02X}"),
                "no channel mapping for object id, ignoring"
            );
            continue;
        };

        let kind = match entry.kind {
            Kind::Numeric => ChannelKind::State(ChannelValueType::Number { unit: entry.unit }),
            Kind::Binary { contact: false } => ChannelKind::State(ChannelValueType::Switch),
            Kind::Binary { contact: true } => ChannelKind::State(ChannelValueType::Contact),
            Kind::Event { .. } => ChannelKind::Trigger,
            Kind::Timestamp => ChannelKind::State(ChannelValueType::DateTime),
            Kind::Text | Kind::Raw => ChannelKind::State(ChannelValueType::Text),
            // Device properties never reach the reconciler.
            Kind::Property(_) => continue,
        };

        for index in 1..=group.len() {
            let key = key_for(name, group.len(), index);
            if existing.contains(&key) || new_channels.iter().any(|c| c.key == key) {
                continue;
            }
            new_channels.push(ChannelSpec {
                key,
                object_id,
                kind,
            });
        }
    }

    new_channels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::properties::split;

    fn reconcile_payload(existing: &ChannelSet, data: &[u8]) -> Vec<ChannelSpec> {
        let packet = decode(data).unwrap();
        let split = split(&packet.measurements);
        reconcile(existing, &split.sensors)
    }

    fn names(specs: &[ChannelSpec]) -> Vec<String> {
        specs.iter().map(|c| c.key.to_string()).collect()
    }

    #[test]
    fn test_single_occurrence_yields_unnumbered_channel() {
        let specs = reconcile_payload(&ChannelSet::new(), &[0x40, 0x01, 0x64]);
        assert_eq!(names(&specs), vec!["battery"]);
        assert_eq!(
            specs[0].kind,
            ChannelKind::State(ChannelValueType::Number { unit: Some("%") })
        );
    }

    #[test]
    fn test_repeated_kind_yields_numbered_channels_only() {
        // Battery twice: exactly battery_1 and battery_2, no bare battery.
        let specs = reconcile_payload(&ChannelSet::new(), &[0x40, 0x01, 0x64, 0x01, 0x63]);
        assert_eq!(names(&specs), vec!["battery_1", "battery_2"]);
    }

    #[test]
    fn test_existing_channels_are_not_recreated() {
        let mut existing = ChannelSet::new();
        existing.insert(ChannelKey::new("battery", None));
        let specs = reconcile_payload(&existing, &[0x40, 0x01, 0x64, 0x02, 0xCA, 0x09]);
        assert_eq!(names(&specs), vec!["temperature"]);
    }

    #[test]
    fn test_stale_unnumbered_channel_is_left_in_place() {
        // battery existed unnumbered; multiplicity two adds numbered
        // channels alongside it without touching the stale key.
        let mut existing = ChannelSet::new();
        existing.insert(ChannelKey::new("battery", None));
        let specs = reconcile_payload(&existing, &[0x40, 0x01, 0x64, 0x01, 0x63]);
        assert_eq!(names(&specs), vec!["battery_1", "battery_2"]);
    }

    #[test]
    fn test_same_channel_name_from_two_object_ids_merges() {
        // 0x02 and 0x45 are both `temperature`; one channel, created once.
        let specs =
            reconcile_payload(&ChannelSet::new(), &[0x40, 0x02, 0xCA, 0x09, 0x45, 0xD1, 0x00]);
        assert_eq!(names(&specs), vec!["temperature"]);
    }

    #[test]
    fn test_event_kinds_become_trigger_channels() {
        let specs = reconcile_payload(&ChannelSet::new(), &[0x40, 0x3A, 0x01]);
        assert_eq!(names(&specs), vec!["button"]);
        assert!(specs[0].is_event());
    }

    #[test]
    fn test_contact_kinds_use_contact_vocabulary() {
        let specs = reconcile_payload(&ChannelSet::new(), &[0x40, 0x2D, 0x00, 0x21, 0x01]);
        let window = specs.iter().find(|c| c.key.name == "window").unwrap();
        assert_eq!(window.kind, ChannelKind::State(ChannelValueType::Contact));
        let motion = specs.iter().find(|c| c.key.name == "motion").unwrap();
        assert_eq!(motion.kind, ChannelKind::State(ChannelValueType::Switch));
    }

    #[test]
    fn test_group_order_is_first_seen() {
        let packet = decode(&[0x40, 0x01, 0x64, 0x02, 0xCA, 0x09, 0x01, 0x63]).unwrap();
        let split = split(&packet.measurements);
        let groups = group_by_object_id(&split.sensors);
        assert_eq!(
            groups.iter().map(|(id, g)| (*id, g.len())).collect::<Vec<_>>(),
            vec![(0x01, 2), (0x02, 1)]
        );
    }

    #[test]
    fn test_channel_key_display() {
        assert_eq!(ChannelKey::new("battery", None).to_string(), "battery");
        assert_eq!(ChannelKey::new("battery", Some(2)).to_string(), "battery_2");
    }
}
