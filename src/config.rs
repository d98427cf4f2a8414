//! Application-wide constants and compile-time configuration.
//!
//! Target identity, radio timing, and protocol bounds live here so they
//! can be tuned in one place.

// Target identity
//
// The peripheral is located purely by the service UUID it advertises;
// no address allow-listing, no bonding.

/// Service UUID advertised by the peripheral, in BLE wire order
/// (little-endian).  Reads as 57300001-0023-4bd4-bbd5-a6920e4c5653.
pub const VIBE_SERVICE_UUID: [u8; 16] = [
    0x53, 0x56, 0x4c, 0x0e, 0x92, 0xa6, 0xd5, 0xbb, 0xd4, 0x4b, 0x23, 0x00, 0x01, 0x00, 0x30, 0x57,
];

/// Command characteristic inside that service, write-without-response.
/// Reads as 57300002-0023-4bd4-bbd5-a6920e4c5653.
pub const VIBE_COMMAND_CHAR_UUID: [u8; 16] = [
    0x53, 0x56, 0x4c, 0x0e, 0x92, 0xa6, 0xd5, 0xbb, 0xd4, 0x4b, 0x23, 0x00, 0x02, 0x00, 0x30, 0x57,
];

// Wire protocol

/// Highest intensity the text protocol accepts (`Vibrate:0;` .. `Vibrate:20;`).
pub const INTENSITY_MAX: u8 = 20;

/// Command buffer capacity. `Vibrate:NN;` is 11 bytes; leave headroom.
pub const COMMAND_MAX: usize = 20;

/// Advertised peer names are truncated to this many bytes.
pub const PEER_NAME_MAX: usize = 32;

// Scanning

/// Scan interval (0.625 ms units). 128 = 80 ms.
pub const SCAN_INTERVAL: u32 = 128;

/// Scan window (0.625 ms units). 48 = 30 ms.
pub const SCAN_WINDOW: u32 = 48;

// Connection

/// Connect attempt timeout (10 ms units). 100 = 1 s.
pub const CONNECT_TIMEOUT: u16 = 100;

/// Connection interval bounds (1.25 ms units). 6 = 7.5 ms.
pub const CONN_INTERVAL_MIN: u16 = 6;
pub const CONN_INTERVAL_MAX: u16 = 6;

/// Peripheral latency (connection events the peripheral may skip).
pub const SLAVE_LATENCY: u16 = 0;

/// Supervision timeout (10 ms units). 500 = 5 s.
pub const SUPERVISION_TIMEOUT: u16 = 500;

/// Pause between link-up and the first GATT request (ms).  Some
/// peripheral stacks reject discovery issued immediately after connect.
pub const SETTLE_DELAY_MS: u64 = 1000;

// Control loop

/// Period of the intensity-forwarding tick (ms).
pub const CONTROL_TICK_MS: u64 = 10;
