//! Shared link context and command writer.
//!
//! One global [`VibeLink`] wraps the pure [`LinkSupervisor`] together with
//! the live SoftDevice `Connection`.  The SoftDevice task and the control
//! loop both go through its critical-section mutex, so the readiness check
//! and the handle snapshot for a write always observe a consistent view of
//! the connection state.

use core::cell::RefCell;

use defmt::warn;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::String;
use nrf_softdevice::ble::{gatt_client, Connection};

use crate::ble::link::{LinkEvent, LinkSupervisor, StackOp};
use crate::ble::protocol;
use crate::config::PEER_NAME_MAX;
use crate::error::LinkError;

struct LinkInner {
    ctl: LinkSupervisor,
    conn: Option<Connection>,
}

/// Connection state shared between the BLE task and the control loop.
pub struct VibeLink {
    inner: Mutex<CriticalSectionRawMutex, RefCell<LinkInner>>,
}

/// The single link this firmware maintains.
pub static VIBE_LINK: VibeLink = VibeLink::new();

impl VibeLink {
    const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(LinkInner {
                ctl: LinkSupervisor::new(),
                conn: None,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut LinkInner) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Feed a stack event to the supervisor.
    pub fn handle(&self, event: LinkEvent<'_>) -> StackOp {
        self.with(|inner| inner.ctl.handle(event))
    }

    /// Record the new connection and deliver the connect event.
    pub fn attach_connection(&self, conn: Connection) -> StackOp {
        self.with(|inner| {
            inner.conn = Some(conn);
            inner.ctl.handle(LinkEvent::Connected)
        })
    }

    /// Drop the connection and reset all connection-scoped state.  Safe to
    /// call on any failure path; scanning resumes either way.
    pub fn link_lost(&self) -> StackOp {
        self.with(|inner| {
            inner.conn = None;
            inner.ctl.handle(LinkEvent::Disconnected)
        })
    }

    /// Whether the command channel is discovered on a live connection.
    pub fn is_ready(&self) -> bool {
        self.with(|inner| inner.ctl.is_ready())
    }

    /// Name from the most recent matching advertisement ("Unknown" before
    /// the first match).
    pub fn peer_name(&self) -> String<PEER_NAME_MAX> {
        self.with(|inner| {
            let mut name = String::new();
            let _ = name.push_str(inner.ctl.peer_name());
            name
        })
    }

    /// Forward an intensity to the peripheral.
    ///
    /// Out-of-range, duplicate, and not-ready requests are quiet no-ops;
    /// the control loop retries on its next tick anyway.  The write itself
    /// is fire-and-forget: a link that drops between the snapshot and the
    /// transmission simply fails the write, and the level stays eligible
    /// for retry because it is only recorded after transport success.
    pub async fn set_level(&self, level: u8) -> Result<(), LinkError> {
        let planned = self.with(|inner| match inner.ctl.plan_write(level) {
            Ok(handle) => inner.conn.clone().map(|conn| (conn, handle)),
            Err(_) => None,
        });
        let Some((conn, handle)) = planned else {
            return Ok(());
        };

        let cmd = protocol::vibrate_command(level);
        match gatt_client::write_without_response(&conn, handle, cmd.as_bytes()).await {
            Ok(()) => {
                self.with(|inner| inner.ctl.commit_write(level));
                Ok(())
            }
            Err(_) => {
                warn!("command write failed (level {})", level);
                Err(LinkError::WriteFailed)
            }
        }
    }
}
