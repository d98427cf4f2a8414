//! BLE GAP scanner - locates the target peripheral.
//!
//! Uses the SoftDevice Central-role scanning API.  Every advertisement is
//! run through the link supervisor's filter; the scan stops as soon as one
//! carries the target service UUID.  Returning a value from the scan
//! closure cancels scanning inside the SoftDevice, so no separate cancel
//! call is needed.

use defmt::{info, warn};
use nrf_softdevice::ble::{central, Address};
use nrf_softdevice::Softdevice;

use crate::ble::link::{LinkEvent, StackOp};
use crate::ble::vibe_link::VIBE_LINK;
use crate::config::{SCAN_INTERVAL, SCAN_WINDOW};
use crate::error::LinkError;

/// Scan until an advertisement matches the target service UUID.
///
/// Runs with no time limit; the supervisor restarts it after every
/// disconnect.  Returns the matched advertiser's address so the caller can
/// issue the connect request.
pub async fn scan_for_target(sd: &Softdevice) -> Result<Address, LinkError> {
    info!("scanning for vibe service");

    let config = central::ScanConfig {
        // Active scan so scan responses (device names) are reported too.
        active: true,
        interval: SCAN_INTERVAL,
        window: SCAN_WINDOW,
        ..Default::default()
    };

    let res = central::scan(sd, &config, |params| {
        let data =
            unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };

        match VIBE_LINK.handle(LinkEvent::Advertisement(data)) {
            // Match: stop scanning and hand the address back.
            StackOp::CancelScanAndConnect => Some(Address::from_raw(params.peer_addr)),
            _ => None,
        }
    })
    .await;

    match res {
        Ok(addr) => {
            info!("found {}", VIBE_LINK.peer_name().as_str());
            Ok(addr)
        }
        Err(_) => {
            warn!("scan ended with error");
            Err(LinkError::ScanFailed)
        }
    }
}
