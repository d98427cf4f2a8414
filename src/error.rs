//! Error taxonomy for the BLE link.
//!
//! Nothing here is fatal: scan and connect failures send the supervisor
//! back to scanning, discovery failures leave the current connection
//! non-writable until it drops, and write failures are logged and retried
//! by the next control tick.  All variants carry no data and implement
//! `defmt::Format` for on-target logging.

use defmt::Format;

/// Failures surfaced by the link adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum LinkError {
    /// Scanning could not be started or ended abnormally.
    ScanFailed,
    /// The connect request failed to initiate, failed, or timed out.
    ConnectFailed,
    /// Service or characteristic discovery failed on this connection.
    DiscoveryFailed,
    /// A write-without-response was not accepted by the transport.
    WriteFailed,
}
