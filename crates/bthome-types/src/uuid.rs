//! Bluetooth UUIDs for BTHome service data.
//!
//! BTHome transmitters broadcast their payload as BLE service data under a
//! registered 16-bit UUID. The host BLE stack hands the payload bytes for
//! this UUID to the decoder; the transport itself is out of scope here.

use uuid::{Uuid, uuid};

/// Service-data UUID carrying unencrypted and encrypted BTHome v2 payloads.
pub const SERVICE_DATA: Uuid = uuid!("0000fcd2-0000-1000-8000-00805f9b34fb");

/// The 16-bit alias of [`SERVICE_DATA`].
pub const SERVICE_DATA_UUID16: u16 = 0xFCD2;
