//! Bluetooth Low Energy subsystem.
//!
//! Drives the Nordic SoftDevice S140 in **Central** role against a single
//! peripheral, identified purely by the service UUID it advertises:
//!
//! 1. **Scanner** - continuous scan, each advertisement filtered by the
//!    target service UUID.
//! 2. **Link supervisor** (`link`) - the lifecycle state machine:
//!    scan -> connect -> discover -> ready, restarted from scratch on any
//!    disconnect.  Pure logic, host-testable.
//! 3. **GATT client** (`vibe_client`) - two-phase service/characteristic
//!    discovery producing the command channel's value handle.
//! 4. **Command writer** (`vibe_link`) - bounds-checked, debounced
//!    write-without-response of `Vibrate:<N>;` commands, shared between
//!    the SoftDevice task and the control loop.

pub mod adv_parser;
pub mod link;
pub mod link_task;
pub mod protocol;
pub mod scanner;
pub mod vibe_client;
pub mod vibe_link;
