//! Periodic control loop.
//!
//! The application side of the system: on a fixed tick, sample the latest
//! requested intensity and forward it to the command writer.  The control
//! algorithm that decides the intensity lives elsewhere and publishes its
//! targets through [`INTENSITY_TARGET`]; this loop only paces the writes.
//!
//! Duplicate and not-ready requests are absorbed by the writer's gating,
//! so repeating the current level every tick is cheap and keeps a level
//! that failed in transit eligible for retry.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};

use crate::ble::vibe_link::VIBE_LINK;
use crate::config::CONTROL_TICK_MS;

/// Latest target intensity from the control algorithm.  Values above the
/// protocol maximum are rejected by the command writer, not here.
pub static INTENSITY_TARGET: Signal<CriticalSectionRawMutex, u8> = Signal::new();

pub async fn control_loop() -> ! {
    let mut level: u8 = 0;
    let mut tick = Ticker::every(Duration::from_millis(CONTROL_TICK_MS));

    loop {
        tick.next().await;
        if let Some(next) = INTENSITY_TARGET.try_take() {
            level = next;
        }
        // Transport failures are already logged by the writer; the next
        // tick retries the same level automatically.
        let _ = VIBE_LINK.set_level(level).await;
    }
}
