//! Error types for bthome-core.
//!
//! Decode failures originate in [`bthome_types::DecodeError`] and are
//! wrapped here. All of them abort processing of the offending packet only:
//! no measurements are emitted, no channel schema change occurs, and the
//! per-device state is left exactly as it was, so the next valid packet
//! recovers cleanly.

use thiserror::Error;

use bthome_types::DecodeError;

/// Errors that can occur when processing a BTHome packet.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error
/// variants in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The payload could not be decoded.
    #[error("error processing BTHome data, only latest version (v2) is supported: {0}")]
    Decode(#[from] DecodeError),
}

impl Error {
    /// Human-readable message for the host's availability transition.
    #[must_use]
    pub fn status_detail(&self) -> String {
        self.to_string()
    }
}

/// Result type alias using bthome-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
