//! Connection lifecycle state machine.
//!
//! Pure logic, free of SoftDevice types, so the whole
//! scan -> connect -> discover -> ready cycle can be driven on the host by
//! a scripted stack.  The embedded adapters (`scanner`, `vibe_client`,
//! `link_task`) translate native callbacks into [`LinkEvent`]s and execute
//! the [`StackOp`] requests this machine hands back.
//!
//! The machine is cyclic by design: any disconnect resets all
//! connection-scoped state and requests a fresh scan.  There is no backoff
//! and no retry limit; the peripheral is assumed to vanish and reappear at
//! any time.

use heapless::String;

use crate::ble::adv_parser::{contains_service_uuid, extract_device_name};
use crate::config::{INTENSITY_MAX, PEER_NAME_MAX, VIBE_SERVICE_UUID};

/// Lifecycle phase of the single BLE link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// Host stack not ready yet.
    Idle,
    /// Looking for an advertisement carrying the target service UUID.
    Scanning,
    /// Connect request in flight.
    Connecting,
    /// Link up; command characteristic not (or never) located.
    Discovering,
    /// Command characteristic located; writes permitted.
    Ready,
}

/// Events delivered by the stack adapter, one per native callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent<'a> {
    /// The host stack finished bring-up and can scan.
    StackReady,
    /// A raw advertisement payload was observed while scanning.
    Advertisement(&'a [u8]),
    /// A connect request was accepted by the stack.
    ConnectRequested,
    /// The connect request failed to initiate, failed, or timed out.
    ConnectFailed,
    /// The link came up.
    Connected,
    /// The post-connect settle delay elapsed; discovery may start.
    SettleElapsed,
    /// Service discovery matched the target service.
    ServiceFound { start_handle: u16, end_handle: u16 },
    /// Characteristic enumeration matched the target characteristic.
    CharacteristicFound { value_handle: u16 },
    /// Discovery ran to completion, successfully or not.
    DiscoveryEnded,
    /// The link dropped, for any reason.
    Disconnected,
}

/// What the stack adapter must do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackOp {
    /// Nothing; keep delivering events.
    None,
    /// Begin (or resume) continuous scanning.
    StartScan,
    /// Stop scanning and issue a connect request to the matched advertiser.
    CancelScanAndConnect,
    /// Start service discovery for the target service UUID.
    DiscoverService,
    /// Enumerate characteristics within the matched service's handle range.
    DiscoverCharacteristics { start_handle: u16, end_handle: u16 },
}

/// Why a write request was not issued.  All of these are quiet no-ops for
/// the caller; the control loop simply tries again next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteReject {
    /// Level exceeds the protocol maximum.
    OutOfRange,
    /// Level equals the last successfully written value.
    Duplicate,
    /// No command channel on the current connection (or no connection).
    NotReady,
}

/// The connection supervisor.
///
/// Owns every piece of connection-scoped state: lifecycle phase, the
/// discovered write handle, the discovery guard, the advertised peer name,
/// and the last intensity that actually reached the peripheral.  Adapters
/// never touch these fields directly.
pub struct LinkSupervisor {
    state: LinkState,
    write_handle: Option<u16>,
    discovery_in_flight: bool,
    service_range: Option<(u16, u16)>,
    peer_name: String<PEER_NAME_MAX>,
    last_sent: Option<u8>,
}

impl LinkSupervisor {
    pub const fn new() -> Self {
        Self {
            state: LinkState::Idle,
            write_handle: None,
            discovery_in_flight: false,
            service_range: None,
            peer_name: String::new(),
            last_sent: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Writes are permitted exactly when the command channel is discovered
    /// on a live connection.
    pub fn is_ready(&self) -> bool {
        self.state == LinkState::Ready && self.write_handle.is_some()
    }

    /// Name from the most recent matching advertisement.  Kept across
    /// disconnects for diagnostics.
    pub fn peer_name(&self) -> &str {
        if self.peer_name.is_empty() {
            "Unknown"
        } else {
            self.peer_name.as_str()
        }
    }

    /// Single transition function for all stack events.
    pub fn handle(&mut self, event: LinkEvent<'_>) -> StackOp {
        match event {
            LinkEvent::StackReady => self.on_stack_ready(),
            LinkEvent::Advertisement(data) => self.on_advertisement(data),
            LinkEvent::ConnectRequested => self.on_connect_requested(),
            LinkEvent::ConnectFailed => self.on_connect_failed(),
            LinkEvent::Connected => self.on_connected(),
            LinkEvent::SettleElapsed => self.on_settle_elapsed(),
            LinkEvent::ServiceFound {
                start_handle,
                end_handle,
            } => self.on_service_found(start_handle, end_handle),
            LinkEvent::CharacteristicFound { value_handle } => {
                self.on_characteristic_found(value_handle)
            }
            LinkEvent::DiscoveryEnded => self.on_discovery_ended(),
            LinkEvent::Disconnected => self.on_disconnected(),
        }
    }

    fn on_stack_ready(&mut self) -> StackOp {
        if self.state != LinkState::Idle {
            return StackOp::None;
        }
        self.state = LinkState::Scanning;
        StackOp::StartScan
    }

    fn on_advertisement(&mut self, data: &[u8]) -> StackOp {
        if self.state != LinkState::Scanning {
            return StackOp::None;
        }
        if !contains_service_uuid(data, &VIBE_SERVICE_UUID) {
            return StackOp::None;
        }
        // Name is best-effort; "Unknown" when the advertiser omits it.
        self.peer_name = extract_device_name(data);
        StackOp::CancelScanAndConnect
    }

    fn on_connect_requested(&mut self) -> StackOp {
        if self.state == LinkState::Scanning {
            self.state = LinkState::Connecting;
        }
        StackOp::None
    }

    fn on_connect_failed(&mut self) -> StackOp {
        if self.state != LinkState::Connecting {
            return StackOp::None;
        }
        self.state = LinkState::Scanning;
        StackOp::StartScan
    }

    fn on_connected(&mut self) -> StackOp {
        // Only the first connect event moves the machine; late duplicates
        // must not clear the discovery guard.
        if self.state == LinkState::Connecting {
            self.state = LinkState::Discovering;
            self.discovery_in_flight = false;
        }
        StackOp::None
    }

    fn on_settle_elapsed(&mut self) -> StackOp {
        if self.state != LinkState::Discovering {
            return StackOp::None;
        }
        if self.discovery_in_flight {
            // A discovery sequence is already running for this connection.
            return StackOp::None;
        }
        self.discovery_in_flight = true;
        StackOp::DiscoverService
    }

    fn on_service_found(&mut self, start_handle: u16, end_handle: u16) -> StackOp {
        if self.state != LinkState::Discovering || !self.discovery_in_flight {
            return StackOp::None;
        }
        // First matching service wins; further matches are ignored.
        if self.service_range.is_some() {
            return StackOp::None;
        }
        self.service_range = Some((start_handle, end_handle));
        StackOp::DiscoverCharacteristics {
            start_handle,
            end_handle,
        }
    }

    fn on_characteristic_found(&mut self, value_handle: u16) -> StackOp {
        if self.state != LinkState::Discovering || !self.discovery_in_flight {
            return StackOp::None;
        }
        // First matching characteristic wins.
        if self.write_handle.is_none() {
            self.write_handle = Some(value_handle);
        }
        StackOp::None
    }

    fn on_discovery_ended(&mut self) -> StackOp {
        self.discovery_in_flight = false;
        self.service_range = None;
        if self.state == LinkState::Discovering && self.write_handle.is_some() {
            self.state = LinkState::Ready;
        }
        // On failure the connection stays non-ready for its lifetime;
        // only a disconnect/reconnect cycle retries discovery.
        StackOp::None
    }

    fn on_disconnected(&mut self) -> StackOp {
        if self.state == LinkState::Idle {
            return StackOp::None;
        }
        self.write_handle = None;
        self.discovery_in_flight = false;
        self.service_range = None;
        self.state = LinkState::Scanning;
        StackOp::StartScan
    }

    /// Gate a write request: bounds, debounce, readiness, in that order.
    /// Returns the characteristic value handle to write to.
    pub fn plan_write(&self, level: u8) -> Result<u16, WriteReject> {
        if level > INTENSITY_MAX {
            return Err(WriteReject::OutOfRange);
        }
        if self.last_sent == Some(level) {
            return Err(WriteReject::Duplicate);
        }
        match self.write_handle {
            Some(handle) if self.state == LinkState::Ready => Ok(handle),
            _ => Err(WriteReject::NotReady),
        }
    }

    /// Record a transmission that reached the transport.  Must only be
    /// called after a successful write, so a failed write stays eligible
    /// for retry with the same level.
    pub fn commit_write(&mut self, level: u8) {
        self.last_sent = Some(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matching_adv() -> [u8; 27] {
        let mut data = [0u8; 27];
        data[0] = 17;
        data[1] = 0x07;
        data[2..18].copy_from_slice(&VIBE_SERVICE_UUID);
        data[18] = 0x08;
        data[19] = 0x09;
        data[20..27].copy_from_slice(b"Device1");
        data
    }

    fn other_adv() -> [u8; 18] {
        let mut uuid = VIBE_SERVICE_UUID;
        uuid[4] ^= 0xA5;
        let mut data = [0u8; 18];
        data[0] = 17;
        data[1] = 0x07;
        data[2..18].copy_from_slice(&uuid);
        data
    }

    /// Drive a fresh supervisor up to the `Ready` state.
    fn ready_link() -> LinkSupervisor {
        let mut link = LinkSupervisor::new();
        assert_eq!(link.handle(LinkEvent::StackReady), StackOp::StartScan);
        assert_eq!(
            link.handle(LinkEvent::Advertisement(&matching_adv())),
            StackOp::CancelScanAndConnect
        );
        link.handle(LinkEvent::ConnectRequested);
        link.handle(LinkEvent::Connected);
        assert_eq!(link.handle(LinkEvent::SettleElapsed), StackOp::DiscoverService);
        assert_eq!(
            link.handle(LinkEvent::ServiceFound {
                start_handle: 0x0010,
                end_handle: 0x001f,
            }),
            StackOp::DiscoverCharacteristics {
                start_handle: 0x0010,
                end_handle: 0x001f,
            }
        );
        link.handle(LinkEvent::CharacteristicFound { value_handle: 0x0012 });
        link.handle(LinkEvent::DiscoveryEnded);
        assert_eq!(link.state(), LinkState::Ready);
        link
    }

    #[test]
    fn starts_idle_and_scans_once_stack_is_ready() {
        let mut link = LinkSupervisor::new();
        assert_eq!(link.state(), LinkState::Idle);
        assert_eq!(link.handle(LinkEvent::StackReady), StackOp::StartScan);
        assert_eq!(link.state(), LinkState::Scanning);
    }

    #[test]
    fn non_matching_advertisements_produce_no_connect_request() {
        let mut link = LinkSupervisor::new();
        link.handle(LinkEvent::StackReady);
        assert_eq!(link.handle(LinkEvent::Advertisement(&other_adv())), StackOp::None);
        assert_eq!(link.handle(LinkEvent::Advertisement(&[0x02, 0x01, 0x06])), StackOp::None);
        assert_eq!(link.state(), LinkState::Scanning);
    }

    #[test]
    fn matching_advertisement_connects_and_records_name() {
        let mut link = LinkSupervisor::new();
        link.handle(LinkEvent::StackReady);
        assert_eq!(
            link.handle(LinkEvent::Advertisement(&matching_adv())),
            StackOp::CancelScanAndConnect
        );
        assert_eq!(link.peer_name(), "Device1");
    }

    #[test]
    fn at_most_one_connect_request_per_match() {
        let mut link = LinkSupervisor::new();
        link.handle(LinkEvent::StackReady);
        link.handle(LinkEvent::Advertisement(&matching_adv()));
        link.handle(LinkEvent::ConnectRequested);
        // Late advertisements after the request is accepted are ignored.
        assert_eq!(link.handle(LinkEvent::Advertisement(&matching_adv())), StackOp::None);
        assert_eq!(link.state(), LinkState::Connecting);
    }

    #[test]
    fn failed_connect_resumes_scanning() {
        let mut link = LinkSupervisor::new();
        link.handle(LinkEvent::StackReady);
        link.handle(LinkEvent::Advertisement(&matching_adv()));
        link.handle(LinkEvent::ConnectRequested);
        assert_eq!(link.handle(LinkEvent::ConnectFailed), StackOp::StartScan);
        assert_eq!(link.state(), LinkState::Scanning);
    }

    #[test]
    fn discovery_starts_at_most_once_per_connection() {
        let mut link = LinkSupervisor::new();
        link.handle(LinkEvent::StackReady);
        link.handle(LinkEvent::Advertisement(&matching_adv()));
        link.handle(LinkEvent::ConnectRequested);
        link.handle(LinkEvent::Connected);
        assert_eq!(link.handle(LinkEvent::SettleElapsed), StackOp::DiscoverService);
        // A duplicate connect event must not reset the guard, and a second
        // settle expiry must not start a second sequence.
        link.handle(LinkEvent::Connected);
        assert_eq!(link.handle(LinkEvent::SettleElapsed), StackOp::None);
    }

    #[test]
    fn discovery_guard_clears_on_completion() {
        let mut link = ready_link();
        // The cycle is over; a stray settle event cannot restart discovery
        // because the machine already left `Discovering`.
        assert_eq!(link.handle(LinkEvent::SettleElapsed), StackOp::None);
    }

    #[test]
    fn first_matching_service_wins() {
        let mut link = LinkSupervisor::new();
        link.handle(LinkEvent::StackReady);
        link.handle(LinkEvent::Advertisement(&matching_adv()));
        link.handle(LinkEvent::ConnectRequested);
        link.handle(LinkEvent::Connected);
        link.handle(LinkEvent::SettleElapsed);
        assert_ne!(
            link.handle(LinkEvent::ServiceFound { start_handle: 1, end_handle: 9 }),
            StackOp::None
        );
        assert_eq!(
            link.handle(LinkEvent::ServiceFound { start_handle: 10, end_handle: 19 }),
            StackOp::None
        );
    }

    #[test]
    fn first_matching_characteristic_wins() {
        let mut link = LinkSupervisor::new();
        link.handle(LinkEvent::StackReady);
        link.handle(LinkEvent::Advertisement(&matching_adv()));
        link.handle(LinkEvent::ConnectRequested);
        link.handle(LinkEvent::Connected);
        link.handle(LinkEvent::SettleElapsed);
        link.handle(LinkEvent::ServiceFound { start_handle: 1, end_handle: 9 });
        link.handle(LinkEvent::CharacteristicFound { value_handle: 3 });
        link.handle(LinkEvent::CharacteristicFound { value_handle: 7 });
        link.handle(LinkEvent::DiscoveryEnded);
        assert_eq!(link.plan_write(5), Ok(3));
    }

    #[test]
    fn discovery_without_match_leaves_link_unwritable() {
        let mut link = LinkSupervisor::new();
        link.handle(LinkEvent::StackReady);
        link.handle(LinkEvent::Advertisement(&matching_adv()));
        link.handle(LinkEvent::ConnectRequested);
        link.handle(LinkEvent::Connected);
        link.handle(LinkEvent::SettleElapsed);
        // Service phase found nothing matching; discovery ends empty and no
        // retry is scheduled for this connection.
        assert_eq!(link.handle(LinkEvent::DiscoveryEnded), StackOp::None);
        assert_eq!(link.state(), LinkState::Discovering);
        assert!(!link.is_ready());
        assert_eq!(link.plan_write(5), Err(WriteReject::NotReady));
    }

    #[test]
    fn disconnect_resets_connection_state_and_rescans() {
        let mut link = ready_link();
        assert_eq!(link.handle(LinkEvent::Disconnected), StackOp::StartScan);
        assert_eq!(link.state(), LinkState::Scanning);
        assert!(!link.is_ready());
        assert_eq!(link.plan_write(10), Err(WriteReject::NotReady));
        // Peer name survives for diagnostics.
        assert_eq!(link.peer_name(), "Device1");
    }

    #[test]
    fn disconnect_mid_discovery_clears_the_guard() {
        let mut link = LinkSupervisor::new();
        link.handle(LinkEvent::StackReady);
        link.handle(LinkEvent::Advertisement(&matching_adv()));
        link.handle(LinkEvent::ConnectRequested);
        link.handle(LinkEvent::Connected);
        link.handle(LinkEvent::SettleElapsed);
        assert_eq!(link.handle(LinkEvent::Disconnected), StackOp::StartScan);
        // Next connection discovers again from scratch.
        link.handle(LinkEvent::Advertisement(&matching_adv()));
        link.handle(LinkEvent::ConnectRequested);
        link.handle(LinkEvent::Connected);
        assert_eq!(link.handle(LinkEvent::SettleElapsed), StackOp::DiscoverService);
    }

    #[test]
    fn out_of_range_levels_never_write() {
        let mut link = LinkSupervisor::new();
        assert_eq!(link.plan_write(21), Err(WriteReject::OutOfRange));
        link = ready_link();
        assert_eq!(link.plan_write(21), Err(WriteReject::OutOfRange));
        assert_eq!(link.plan_write(255), Err(WriteReject::OutOfRange));
    }

    #[test]
    fn duplicate_levels_write_once() {
        let mut link = ready_link();
        let handle = link.plan_write(10).unwrap();
        assert_eq!(handle, 0x0012);
        link.commit_write(10);
        assert_eq!(link.plan_write(10), Err(WriteReject::Duplicate));
        // A different level is fine.
        assert!(link.plan_write(11).is_ok());
    }

    #[test]
    fn failed_write_remains_retryable() {
        let mut link = ready_link();
        assert!(link.plan_write(10).is_ok());
        // Transport failed: no commit, same level must still be sendable.
        assert!(link.plan_write(10).is_ok());
        link.commit_write(10);
        assert_eq!(link.plan_write(10), Err(WriteReject::Duplicate));
    }

    #[test]
    fn last_sent_survives_reconnect() {
        let mut link = ready_link();
        link.commit_write(10);
        link.handle(LinkEvent::Disconnected);
        // Debounce state is deliberately not reset across connections; only
        // an external change request triggers a write, and the debounce
        // check runs before the readiness gate.
        assert_eq!(link.plan_write(10), Err(WriteReject::Duplicate));
        assert_eq!(link.plan_write(11), Err(WriteReject::NotReady));
    }
}
