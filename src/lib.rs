//! Test-only library interface for vibelink.
//!
//! Re-exports the pure logic modules - advertisement parsing, the wire
//! protocol, and the connection lifecycle state machine - so they can be
//! tested on the host (no embedded hardware required).
//!
//! Usage: `cargo test --lib`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main].
//! This lib.rs provides a separate entry point for host-based testing.

#![cfg_attr(not(test), no_std)]

pub mod config;

// Internal module paths for the actual implementations
#[path = "ble/adv_parser.rs"]
mod ble_adv_parser_impl;
#[path = "ble/link.rs"]
mod ble_link_impl;
#[path = "ble/protocol.rs"]
mod ble_protocol_impl;

pub mod ble {
    pub mod adv_parser {
        pub use crate::ble_adv_parser_impl::{contains_service_uuid, extract_device_name};
    }
    pub mod link {
        pub use crate::ble_link_impl::{
            LinkEvent, LinkState, LinkSupervisor, StackOp, WriteReject,
        };
    }
    pub mod protocol {
        pub use crate::ble_protocol_impl::vibrate_command;
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - full lifecycle scenarios against a scripted stack
// ═══════════════════════════════════════════════════════════════════════════
