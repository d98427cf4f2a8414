//! Link supervisor task.
//!
//! The host-stack side of the system: one endless cycle of
//! scan -> connect -> settle -> discover -> hold, restarted from scratch
//! whenever the link drops or an attempt fails.  All state transitions go
//! through the shared [`VIBE_LINK`] supervisor; this task sequences the
//! SoftDevice calls around it.

use defmt::{info, warn};
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::central;
use nrf_softdevice::ble::gatt_client::Client;
use nrf_softdevice::{raw, Softdevice};

use crate::ble::link::{LinkEvent, StackOp};
use crate::ble::scanner;
use crate::ble::vibe_client::{self, VibeServiceClient};
use crate::ble::vibe_link::VIBE_LINK;
use crate::config;
use crate::error::LinkError;

/// Drive the connection lifecycle forever.  Never returns; every failure
/// path funnels back into scanning.
pub async fn link_task(sd: &'static Softdevice) -> ! {
    // The SoftDevice is up once this task runs: enter the cycle.
    VIBE_LINK.handle(LinkEvent::StackReady);

    loop {
        match run_cycle(sd).await {
            Ok(()) => info!("link closed by peer"),
            Err(e) => warn!("link cycle aborted: {}", e),
        }
        // Unconditional recovery: clear connection-scoped state and let the
        // next loop iteration rescan.  No backoff, no retry limit.
        VIBE_LINK.link_lost();
    }
}

async fn run_cycle(sd: &'static Softdevice) -> Result<(), LinkError> {
    let peer = scanner::scan_for_target(sd).await?;
    VIBE_LINK.handle(LinkEvent::ConnectRequested);

    let whitelist = [&peer];
    let conn_cfg = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            timeout: config::CONNECT_TIMEOUT,
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: config::CONN_INTERVAL_MIN,
            max_conn_interval: config::CONN_INTERVAL_MAX,
            slave_latency: config::SLAVE_LATENCY,
            conn_sup_timeout: config::SUPERVISION_TIMEOUT,
        },
        ..Default::default()
    };

    let conn = match central::connect(sd, &conn_cfg).await {
        Ok(conn) => conn,
        Err(_) => {
            VIBE_LINK.handle(LinkEvent::ConnectFailed);
            return Err(LinkError::ConnectFailed);
        }
    };
    VIBE_LINK.attach_connection(conn.clone());
    info!("connected to {}", VIBE_LINK.peer_name().as_str());

    // Some peripherals reject GATT requests issued straight after the
    // link-layer connect; give them a moment before discovery.
    Timer::after(Duration::from_millis(config::SETTLE_DELAY_MS)).await;

    let client = match VIBE_LINK.handle(LinkEvent::SettleElapsed) {
        StackOp::DiscoverService => match vibe_client::discover_command_channel(&conn).await {
            Ok(client) => {
                VIBE_LINK.handle(LinkEvent::DiscoveryEnded);
                info!("command channel ready");
                client
            }
            Err(_) => {
                VIBE_LINK.handle(LinkEvent::DiscoveryEnded);
                // The connection stays up but unwritable until it drops.
                warn!("holding link without a command channel");
                VibeServiceClient::new_undiscovered(conn.clone())
            }
        },
        _ => {
            // Guard already active for this connection.
            warn!("discovery already in flight, skipping");
            VibeServiceClient::new_undiscovered(conn.clone())
        }
    };

    // Nothing left to do on this task: writes are issued by the control
    // loop through VIBE_LINK.  Wait here until the link drops.
    vibe_client::run_until_disconnect(&conn, &client).await;
    Ok(())
}
