//! Retransmission deduplication via the rolling packet counter.
//!
//! BTHome transmitters repeat each advertisement several times; the packet
//! counter (object id 0x00) lets the receiver drop identical retransmissions
//! without reprocessing them. This is an at-most-once guarantee for
//! identical packet ids only — out-of-order but distinct ids are all
//! processed, and wraps simply look like new ids.

use bthome_types::DecodedPacket;

/// The only mutable state the core carries across packets for one device.
///
/// Exclusively owned and mutated here; callers must serialize access per
/// device entity (see the crate-level concurrency notes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupState {
    last_packet_id: Option<u8>,
}

/// Outcome of the duplicate check for one decoded packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupVerdict {
    /// First sighting of this packet id (or no packet id at all).
    Proceed,
    /// Identical retransmission; stop without touching any state.
    Duplicate,
}

impl DedupState {
    /// Create a fresh state with no packet id seen yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently accepted packet id, if any.
    #[must_use]
    pub fn last_packet_id(&self) -> Option<u8> {
        self.last_packet_id
    }

    /// Check a decoded packet against the last accepted packet id and
    /// record the new id when it differs.
    ///
    /// Packets without a counter always proceed — not every transmitter
    /// includes one.
    pub fn check(&mut self, packet: &DecodedPacket) -> DedupVerdict {
        match packet.packet_id() {
            Some(id) if self.last_packet_id == Some(id) => DedupVerdict::Duplicate,
            Some(id) => {
                self.last_packet_id = Some(id);
                DedupVerdict::Proceed
            }
            None => DedupVerdict::Proceed,
        }
    }
}
