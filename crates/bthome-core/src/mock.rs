//! Recording sink for tests and host-integration harnesses.

use std::collections::BTreeMap;

use crate::channels::{ChannelKey, ChannelSpec};
use crate::pipeline::{Availability, PacketSink};
use crate::project::OutputValue;

/// A [`PacketSink`] that records every call for later assertions.
///
/// Useful in tests and as a template for real host integrations: the
/// recorded sequences mirror exactly what a live sink would have been asked
/// to do, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Channel specs passed to `create_channels`, flattened in call order.
    pub created: Vec<ChannelSpec>,
    /// Every state update, in call order.
    pub states: Vec<(ChannelKey, OutputValue)>,
    /// Every fired trigger, in call order.
    pub triggers: Vec<(ChannelKey, String)>,
    /// Every property map delivered.
    pub properties: Vec<BTreeMap<String, String>>,
    /// Channels invalidated after failures.
    pub invalidated: Vec<ChannelKey>,
    /// Availability transitions, in call order.
    pub availability: Vec<Availability>,
}

impl RecordingSink {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent state recorded for a channel, if any.
    #[must_use]
    pub fn state(&self, key: &ChannelKey) -> Option<&OutputValue> {
        self.states
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl PacketSink for RecordingSink {
    fn create_channels(&mut self, new_channels: &[ChannelSpec]) {
        self.created.extend_from_slice(new_channels);
    }

    fn update_state(&mut self, key: &ChannelKey, value: OutputValue) {
        self.states.push((key.clone(), value));
    }

    fn trigger_channel(&mut self, key: &ChannelKey, event: &str) {
        self.triggers.push((key.clone(), event.to_owned()));
    }

    fn update_properties(&mut self, properties: &BTreeMap<String, String>) {
        self.properties.push(properties.clone());
    }

    fn invalidate_channel(&mut self, key: &ChannelKey) {
        self.invalidated.push(key.clone());
    }

    fn update_availability(&mut self, availability: Availability) {
        self.availability.push(availability);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_returns_latest_value() {
        let mut sink = RecordingSink::new();
        let key = ChannelKey::new("battery", None);
        sink.update_state(&key, OutputValue::Decimal(50.0));
        sink.update_state(&key, OutputValue::Decimal(49.0));
        assert_eq!(sink.state(&key), Some(&OutputValue::Decimal(49.0)));
    }

    #[test]
    fn test_clear_resets_all_recordings() {
        let mut sink = RecordingSink::new();
        sink.update_availability(Availability::Online);
        sink.trigger_channel(&ChannelKey::new("button", None), "press");
        sink.clear();
        assert!(sink.availability.is_empty());
        assert!(sink.triggers.is_empty());
    }
}
