//! GATT client for the vibe command service.
//!
//! Two-phase discovery against a connected peripheral: the target service
//! is located by its 128-bit UUID, then its characteristics are enumerated
//! within the service's handle range.  The first characteristic matching
//! the command UUID wins; its value handle becomes the write channel.
//!
//! The `gatt_client::Client` implementation is written out by hand rather
//! than generated, because the command channel is write-only and variable
//! length: writes go through `gatt_client::write_without_response` with
//! the discovered value handle.

use defmt::{info, warn};
use nrf_softdevice::ble::gatt_client::{self, Characteristic, Descriptor, DiscoverError};
use nrf_softdevice::ble::{Connection, Uuid};

use crate::ble::link::LinkEvent;
use crate::ble::vibe_link::VIBE_LINK;
use crate::config::{VIBE_COMMAND_CHAR_UUID, VIBE_SERVICE_UUID};
use crate::error::LinkError;

pub struct VibeServiceClient {
    command_value_handle: u16,
}

/// The command channel is write-only; no notifications ever arrive.
pub enum VibeServiceClientEvent {}

impl VibeServiceClient {
    pub fn command_value_handle(&self) -> Option<u16> {
        (self.command_value_handle != 0).then_some(self.command_value_handle)
    }
}

impl gatt_client::Client for VibeServiceClient {
    type Event = VibeServiceClientEvent;

    fn event(&self, _handle: u16, _data: &[u8]) -> Option<Self::Event> {
        None
    }

    fn uuid() -> Uuid {
        Uuid::new_128(&VIBE_SERVICE_UUID)
    }

    fn new_undiscovered(_conn: Connection) -> Self {
        Self {
            command_value_handle: 0,
        }
    }

    fn discovered_characteristic(
        &mut self,
        characteristic: &Characteristic,
        _descriptors: &[Descriptor],
    ) {
        // First match wins; later matches are ignored.
        if self.command_value_handle != 0 {
            return;
        }
        if characteristic.uuid == Some(Uuid::new_128(&VIBE_COMMAND_CHAR_UUID)) {
            self.command_value_handle = characteristic.handle_value;
        }
    }

    fn discovery_complete(&mut self) -> Result<(), DiscoverError> {
        if self.command_value_handle == 0 {
            return Err(DiscoverError::ServiceIncomplete);
        }
        Ok(())
    }
}

/// Run service + characteristic discovery and report the outcome to the
/// link supervisor.
///
/// Errors (service absent, command characteristic absent, GATT errors,
/// disconnect mid-discovery) are logged and fail discovery for this
/// connection only; the supervisor will not retry until the next connect.
pub async fn discover_command_channel(conn: &Connection) -> Result<VibeServiceClient, LinkError> {
    info!("discovering vibe service");

    let client: VibeServiceClient = match gatt_client::discover(conn).await {
        Ok(client) => client,
        Err(DiscoverError::ServiceIncomplete) => {
            warn!("vibe service has no command characteristic");
            return Err(LinkError::DiscoveryFailed);
        }
        Err(_) => {
            warn!("vibe service discovery failed");
            return Err(LinkError::DiscoveryFailed);
        }
    };

    if let Some(handle) = client.command_value_handle() {
        VIBE_LINK.handle(LinkEvent::CharacteristicFound {
            value_handle: handle,
        });
    }
    Ok(client)
}

/// Park on the connection until the peer disconnects.
///
/// The command channel never notifies, so the event closure is
/// unreachable; this exists purely to observe link loss.
pub async fn run_until_disconnect(conn: &Connection, client: &VibeServiceClient) {
    let _ = gatt_client::run(conn, client, |event| match event {}).await;
}
