//! Error types for BTHome payload decoding.

use thiserror::Error;

/// Errors that can occur when decoding a BTHome v2 service-data payload.
///
/// Every variant aborts decoding of the whole payload: the format carries no
/// self-describing widths, so there is no safe way to resynchronize after a
/// bad byte. The caller gets either the full measurement sequence or one of
/// these.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The device-info byte has the encryption flag set.
    ///
    /// Encrypted payloads are rejected, not decoded.
    #[error("encrypted BTHome payloads are not supported")]
    EncryptedPayloadUnsupported,

    /// The device-info byte declares a format version other than v2.
    #[error("unsupported BTHome version {0} (only v2 is supported)")]
    UnsupportedVersion(u8),

    /// An object id with no catalog entry was encountered.
    ///
    /// Unknown ids have no statically known width, so the rest of the
    /// payload cannot be decoded.
    #[error("unknown BTHome object id 0x{0:02X}")]
    UnknownObjectId(u8),

    /// The payload ended in the middle of a declared field.
    #[error(
        "truncated payload: object 0x{object_id:02X} needs {needed} byte(s), only {remaining} remain"
    )]
    TruncatedPayload {
        /// The object id whose field ran off the end of the buffer.
        object_id: u8,
        /// Bytes the field required.
        needed: usize,
        /// Bytes actually remaining in the buffer.
        remaining: usize,
    },
}

/// Result type alias using bthome-types' DecodeError type.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
