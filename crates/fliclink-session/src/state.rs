//! Identifier bookkeeping for one daemon connection.
//!
//! The daemon never assigns ids; the client picks them and the daemon echoes
//! them back in events. [`SessionState`] remembers what each id was created
//! for so that an incoming event can be attributed to a button address or a
//! pairing session, and so that an id still in use is not handed out twice.
//!
//! Nothing here does I/O. Each connection owns its own `SessionState`.

use std::collections::HashMap;

use fliclink_protocol::{
    BdAddr, Command, ConnectionId, CreateConnectionChannelError, Event, IdClass, Identifier,
    ListenerId, ScanId, WizardId,
};
use serde::Serialize;
use tracing::debug;

use crate::error::StateError;

/// One identifier namespace mapping ids to their targets.
#[derive(Debug, Clone)]
pub struct IdTable<K, T> {
    entries: HashMap<K, T>,
}

impl<K: Identifier, T> IdTable<K, T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Start tracking `id`. Fails if it is already tracked.
    pub fn allocate(&mut self, id: K, target: T) -> Result<(), StateError> {
        if self.entries.contains_key(&id) {
            return Err(StateError::DuplicateId {
                class: K::CLASS,
                id: id.raw(),
            });
        }
        self.entries.insert(id, target);
        debug!(class = %K::CLASS, %id, "identifier allocated");
        Ok(())
    }

    /// Stop tracking `id` and hand back its target.
    pub fn release(&mut self, id: K) -> Result<T, StateError> {
        let target = self.entries.remove(&id).ok_or(StateError::UnknownId {
            class: K::CLASS,
            id: id.raw(),
        })?;
        debug!(class = %K::CLASS, %id, "identifier released");
        Ok(target)
    }

    pub fn resolve(&self, id: K) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn resolve_mut(&mut self, id: K) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: K) -> bool {
        self.entries.contains_key(&id)
    }

    /// Fail with `UnknownId` unless `id` is tracked.
    pub fn require(&self, id: K) -> Result<(), StateError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(StateError::UnknownId {
                class: K::CLASS,
                id: id.raw(),
            })
        }
    }

    /// Fail with `DuplicateId` if `id` is tracked.
    pub fn require_free(&self, id: K) -> Result<(), StateError> {
        if self.contains(id) {
            Err(StateError::DuplicateId {
                class: K::CLASS,
                id: id.raw(),
            })
        } else {
            Ok(())
        }
    }

    /// Lowest id not currently tracked.
    pub fn next_free(&self) -> K {
        let mut raw = 0u32;
        while self.entries.contains_key(&K::from_raw(raw)) {
            raw = raw.wrapping_add(1);
        }
        K::from_raw(raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.entries.iter().map(|(id, target)| (*id, target))
    }
}

impl<K: Identifier, T> Default for IdTable<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a scan wizard has got to, as last reported by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum WizardProgress {
    Started,
    FoundPrivateButton,
    FoundPublicButton { bd_addr: BdAddr, name: String },
    ButtonConnected,
}

/// What an incoming event refers to, resolved against tracked ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventContext {
    /// The event carries no client-chosen identifier.
    Unscoped,
    Connection {
        conn_id: ConnectionId,
        bd_addr: BdAddr,
    },
    Scanner {
        scan_id: ScanId,
    },
    Listener {
        listener_id: ListenerId,
        bd_addr: BdAddr,
    },
    Wizard {
        scan_wizard_id: WizardId,
        progress: WizardProgress,
    },
    /// The event names an id this session is not tracking.
    UnknownId { class: IdClass, id: u32 },
}

impl EventContext {
    /// Button address the event concerns, if known.
    pub fn bd_addr(&self) -> Option<BdAddr> {
        match self {
            EventContext::Connection { bd_addr, .. } | EventContext::Listener { bd_addr, .. } => {
                Some(*bd_addr)
            }
            EventContext::Wizard {
                progress: WizardProgress::FoundPublicButton { bd_addr, .. },
                ..
            } => Some(*bd_addr),
            _ => None,
        }
    }
}

/// All identifier tables for one connection.
///
/// The tables change only through [`SessionState::record_command`] and
/// [`SessionState::observe`]; holders get read-only views.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    connections: IdTable<ConnectionId, BdAddr>,
    scanners: IdTable<ScanId, ()>,
    listeners: IdTable<ListenerId, BdAddr>,
    wizards: IdTable<WizardId, WizardProgress>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open connection channels and their button addresses.
    pub fn connections(&self) -> &IdTable<ConnectionId, BdAddr> {
        &self.connections
    }

    pub fn scanners(&self) -> &IdTable<ScanId, ()> {
        &self.scanners
    }

    /// Battery listeners and the buttons they watch.
    pub fn listeners(&self) -> &IdTable<ListenerId, BdAddr> {
        &self.listeners
    }

    pub fn wizards(&self) -> &IdTable<WizardId, WizardProgress> {
        &self.wizards
    }

    pub fn next_free_conn_id(&self) -> ConnectionId {
        self.connections.next_free()
    }

    pub fn next_free_scan_id(&self) -> ScanId {
        self.scanners.next_free()
    }

    pub fn next_free_listener_id(&self) -> ListenerId {
        self.listeners.next_free()
    }

    pub fn next_free_wizard_id(&self) -> WizardId {
        self.wizards.next_free()
    }

    /// Connection channel id currently bound to `bd_addr`, if any.
    pub fn connection_for(&self, bd_addr: BdAddr) -> Option<ConnectionId> {
        self.connections
            .iter()
            .find(|(_, addr)| **addr == bd_addr)
            .map(|(id, _)| id)
    }

    /// Check a command against tracked ids before it is sent.
    pub fn check_command(&self, command: &Command) -> Result<(), StateError> {
        match command {
            Command::CreateConnectionChannel { conn_id, .. } => {
                self.connections.require_free(*conn_id)
            }
            Command::RemoveConnectionChannel { conn_id }
            | Command::ChangeModeParameters { conn_id, .. } => self.connections.require(*conn_id),
            Command::CreateScanner { scan_id } => self.scanners.require_free(*scan_id),
            Command::RemoveScanner { scan_id } => self.scanners.require(*scan_id),
            Command::CreateScanWizard { scan_wizard_id } => {
                self.wizards.require_free(*scan_wizard_id)
            }
            Command::CancelScanWizard { scan_wizard_id } => self.wizards.require(*scan_wizard_id),
            Command::CreateBatteryStatusListener { listener_id, .. } => {
                self.listeners.require_free(*listener_id)
            }
            Command::RemoveBatteryStatusListener { listener_id } => {
                self.listeners.require(*listener_id)
            }
            Command::GetInfo
            | Command::ForceDisconnect { .. }
            | Command::Ping { .. }
            | Command::GetButtonInfo { .. }
            | Command::DeleteButton { .. } => Ok(()),
        }
    }

    /// Apply the bookkeeping for a command that has been written to the
    /// daemon.
    ///
    /// Connection channels and wizards stay tracked after a remove or cancel
    /// until the daemon confirms with an event. Scanners and battery
    /// listeners have no confirming event and are released here.
    pub fn record_command(&mut self, command: &Command) -> Result<(), StateError> {
        match command {
            Command::CreateConnectionChannel {
                conn_id, bd_addr, ..
            } => self.connections.allocate(*conn_id, *bd_addr),
            Command::CreateScanner { scan_id } => self.scanners.allocate(*scan_id, ()),
            Command::RemoveScanner { scan_id } => self.scanners.release(*scan_id),
            Command::CreateScanWizard { scan_wizard_id } => self
                .wizards
                .allocate(*scan_wizard_id, WizardProgress::Started),
            Command::CreateBatteryStatusListener {
                listener_id,
                bd_addr,
            } => self.listeners.allocate(*listener_id, *bd_addr),
            Command::RemoveBatteryStatusListener { listener_id } => {
                self.listeners.release(*listener_id).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    /// Attribute an event to a tracked id without changing anything.
    pub fn resolve_event(&self, event: &Event) -> EventContext {
        match event {
            Event::CreateConnectionChannelResponse { conn_id, .. }
            | Event::ConnectionStatusChanged { conn_id, .. }
            | Event::ConnectionChannelRemoved { conn_id, .. } => self.connection_context(*conn_id),
            Event::ButtonUpOrDown(b)
            | Event::ButtonClickOrHold(b)
            | Event::ButtonSingleOrDoubleClick(b)
            | Event::ButtonSingleOrDoubleClickOrHold(b) => self.connection_context(b.conn_id),
            Event::AdvertisementPacket(adv) => {
                if self.scanners.contains(adv.scan_id) {
                    EventContext::Scanner {
                        scan_id: adv.scan_id,
                    }
                } else {
                    unknown(adv.scan_id)
                }
            }
            Event::ScanWizardFoundPrivateButton { scan_wizard_id }
            | Event::ScanWizardFoundPublicButton { scan_wizard_id, .. }
            | Event::ScanWizardButtonConnected { scan_wizard_id }
            | Event::ScanWizardCompleted { scan_wizard_id, .. } => {
                match self.wizards.resolve(*scan_wizard_id) {
                    Some(progress) => EventContext::Wizard {
                        scan_wizard_id: *scan_wizard_id,
                        progress: progress.clone(),
                    },
                    None => unknown(*scan_wizard_id),
                }
            }
            Event::BatteryStatus(status) => match self.listeners.resolve(status.listener_id) {
                Some(bd_addr) => EventContext::Listener {
                    listener_id: status.listener_id,
                    bd_addr: *bd_addr,
                },
                None => unknown(status.listener_id),
            },
            Event::NewVerifiedButton { .. }
            | Event::GetInfoResponse(_)
            | Event::NoSpaceForNewConnection { .. }
            | Event::GotSpaceForNewConnection { .. }
            | Event::BluetoothControllerStateChange { .. }
            | Event::PingResponse { .. }
            | Event::GetButtonInfoResponse(_)
            | Event::ButtonDeleted { .. }
            | Event::Unrecognized { .. } => EventContext::Unscoped,
        }
    }

    /// Resolve an incoming event and apply its lifecycle effects.
    ///
    /// Wizard progress is updated before the context is taken; releases
    /// happen after, so the returned context still names the target of a
    /// removed channel or completed wizard.
    pub fn observe(&mut self, event: &Event) -> EventContext {
        match event {
            Event::ScanWizardFoundPrivateButton { scan_wizard_id } => {
                self.advance_wizard(*scan_wizard_id, WizardProgress::FoundPrivateButton);
            }
            Event::ScanWizardFoundPublicButton {
                scan_wizard_id,
                bd_addr,
                name,
            } => self.advance_wizard(
                *scan_wizard_id,
                WizardProgress::FoundPublicButton {
                    bd_addr: *bd_addr,
                    name: name.clone(),
                },
            ),
            Event::ScanWizardButtonConnected { scan_wizard_id } => {
                self.advance_wizard(*scan_wizard_id, WizardProgress::ButtonConnected);
            }
            _ => {}
        }

        let context = self.resolve_event(event);

        match event {
            Event::CreateConnectionChannelResponse { conn_id, error, .. }
                if *error != CreateConnectionChannelError::NoError =>
            {
                self.retire(&context, *conn_id);
            }
            Event::ConnectionChannelRemoved { conn_id, .. } => self.retire(&context, *conn_id),
            Event::ScanWizardCompleted { scan_wizard_id, .. } => {
                if !matches!(context, EventContext::UnknownId { .. }) {
                    let _ = self.wizards.release(*scan_wizard_id);
                }
            }
            _ => {}
        }

        context
    }

    fn connection_context(&self, conn_id: ConnectionId) -> EventContext {
        match self.connections.resolve(conn_id) {
            Some(bd_addr) => EventContext::Connection {
                conn_id,
                bd_addr: *bd_addr,
            },
            None => unknown(conn_id),
        }
    }

    fn advance_wizard(&mut self, id: WizardId, progress: WizardProgress) {
        if let Some(slot) = self.wizards.resolve_mut(id) {
            *slot = progress;
        }
    }

    fn retire(&mut self, context: &EventContext, conn_id: ConnectionId) {
        if matches!(context, EventContext::Connection { .. }) {
            let _ = self.connections.release(conn_id);
        } else {
            debug!(%conn_id, "channel event for untracked id");
        }
    }
}

fn unknown<K: Identifier>(id: K) -> EventContext {
    EventContext::UnknownId {
        class: K::CLASS,
        id: id.raw(),
    }
}

#[cfg(test)]
mod tests {
    use fliclink_protocol::{
        AdvertisementPacket, BatteryStatusEvent, ButtonEvent, ClickType, ConnectionStatus,
        LatencyMode, RemovedReason, ScanWizardResult,
    };

    use super::*;

    fn addr(last: u8) -> BdAddr {
        BdAddr::from_wire([last, 0, 0, 0, 0xe4, 0x80])
    }

    fn advertisement(scan_id: u32) -> Event {
        Event::AdvertisementPacket(AdvertisementPacket {
            scan_id: ScanId(scan_id),
            bd_addr: addr(20),
            name: "F023".into(),
            rssi: -61,
            is_private: false,
            already_verified: true,
            already_connected_to_this_device: false,
            already_connected_to_other_device: false,
        })
    }

    fn battery(listener_id: u32) -> Event {
        Event::BatteryStatus(BatteryStatusEvent {
            listener_id: ListenerId(listener_id),
            battery_percentage: 87,
            timestamp: 1_700_000_000,
        })
    }

    fn open(conn_id: u32, bd_addr: BdAddr) -> Command {
        Command::CreateConnectionChannel {
            conn_id: ConnectionId(conn_id),
            bd_addr,
            latency_mode: LatencyMode::Normal,
            auto_disconnect_time: 0x1ff,
        }
    }

    #[test]
    fn allocate_release_scenario() {
        let mut table: IdTable<ConnectionId, BdAddr> = IdTable::new();
        let x = addr(1);
        let y = addr(2);

        table.allocate(ConnectionId(7), x).unwrap();
        assert_eq!(
            table.allocate(ConnectionId(7), y),
            Err(StateError::DuplicateId {
                class: IdClass::Connection,
                id: 7
            })
        );
        assert_eq!(table.release(ConnectionId(7)), Ok(x));
        assert_eq!(
            table.release(ConnectionId(7)),
            Err(StateError::UnknownId {
                class: IdClass::Connection,
                id: 7
            })
        );
    }

    #[test]
    fn next_free_fills_gaps() {
        let mut table: IdTable<ScanId, ()> = IdTable::new();
        assert_eq!(table.next_free(), ScanId(0));
        table.allocate(ScanId(0), ()).unwrap();
        table.allocate(ScanId(1), ()).unwrap();
        table.allocate(ScanId(3), ()).unwrap();
        assert_eq!(table.next_free(), ScanId(2));
    }

    #[test]
    fn sessions_do_not_share_state() {
        let mut a = SessionState::new();
        let b = SessionState::new();
        a.record_command(&open(1, addr(1))).unwrap();
        assert!(a.connections().contains(ConnectionId(1)));
        assert!(b.connections().is_empty());
    }

    #[test]
    fn check_command_rejects_collisions_and_unknown_ids() {
        let mut state = SessionState::new();
        state.record_command(&open(4, addr(4))).unwrap();

        assert!(matches!(
            state.check_command(&open(4, addr(5))),
            Err(StateError::DuplicateId { .. })
        ));
        assert!(matches!(
            state.check_command(&Command::RemoveScanner { scan_id: ScanId(1) }),
            Err(StateError::UnknownId {
                class: IdClass::Scanner,
                id: 1
            })
        ));
        assert!(state
            .check_command(&Command::RemoveConnectionChannel {
                conn_id: ConnectionId(4)
            })
            .is_ok());
        assert!(state.check_command(&Command::Ping { ping_id: 9 }).is_ok());
    }

    #[test]
    fn button_event_resolves_to_address() {
        let mut state = SessionState::new();
        state.record_command(&open(2, addr(9))).unwrap();

        let press = Event::ButtonUpOrDown(ButtonEvent {
            conn_id: ConnectionId(2),
            click_type: ClickType::ButtonDown,
            was_queued: false,
            time_diff: 0,
        });
        assert_eq!(
            state.resolve_event(&press),
            EventContext::Connection {
                conn_id: ConnectionId(2),
                bd_addr: addr(9)
            }
        );
    }

    #[test]
    fn untracked_id_is_reported_not_guessed() {
        let state = SessionState::new();
        let event = Event::ConnectionChannelRemoved {
            conn_id: ConnectionId(42),
            removed_reason: RemovedReason::RemovedByThisClient,
        };
        assert_eq!(
            state.resolve_event(&event),
            EventContext::UnknownId {
                class: IdClass::Connection,
                id: 42
            }
        );
    }

    #[test]
    fn advertisement_resolves_to_tracked_scanner() {
        let mut state = SessionState::new();
        state
            .record_command(&Command::CreateScanner { scan_id: ScanId(4) })
            .unwrap();

        let ctx = state.observe(&advertisement(4));
        assert_eq!(ctx, EventContext::Scanner { scan_id: ScanId(4) });
        assert_eq!(ctx.bd_addr(), None);
        assert!(state.scanners().contains(ScanId(4)));

        assert_eq!(
            state.resolve_event(&advertisement(5)),
            EventContext::UnknownId {
                class: IdClass::Scanner,
                id: 5
            }
        );
    }

    #[test]
    fn battery_status_resolves_to_listener_address() {
        let mut state = SessionState::new();
        state
            .record_command(&Command::CreateBatteryStatusListener {
                listener_id: ListenerId(2),
                bd_addr: addr(6),
            })
            .unwrap();

        let ctx = state.observe(&battery(2));
        assert_eq!(
            ctx,
            EventContext::Listener {
                listener_id: ListenerId(2),
                bd_addr: addr(6)
            }
        );
        assert_eq!(ctx.bd_addr(), Some(addr(6)));
        assert!(state.listeners().contains(ListenerId(2)));

        let ctx = state.resolve_event(&battery(3));
        assert_eq!(
            ctx,
            EventContext::UnknownId {
                class: IdClass::Listener,
                id: 3
            }
        );
        assert_eq!(ctx.bd_addr(), None);
    }

    #[test]
    fn removed_scanner_no_longer_resolves() {
        let mut state = SessionState::new();
        state
            .record_command(&Command::CreateScanner { scan_id: ScanId(1) })
            .unwrap();
        state
            .record_command(&Command::RemoveScanner { scan_id: ScanId(1) })
            .unwrap();
        assert!(matches!(
            state.resolve_event(&advertisement(1)),
            EventContext::UnknownId {
                class: IdClass::Scanner,
                ..
            }
        ));
    }

    #[test]
    fn remove_waits_for_channel_removed_event() {
        let mut state = SessionState::new();
        state.record_command(&open(3, addr(3))).unwrap();
        state
            .record_command(&Command::RemoveConnectionChannel {
                conn_id: ConnectionId(3),
            })
            .unwrap();
        assert!(state.connections().contains(ConnectionId(3)));

        let ctx = state.observe(&Event::ConnectionChannelRemoved {
            conn_id: ConnectionId(3),
            removed_reason: RemovedReason::RemovedByThisClient,
        });
        assert_eq!(ctx.bd_addr(), Some(addr(3)));
        assert!(!state.connections().contains(ConnectionId(3)));
    }

    #[test]
    fn failed_channel_creation_releases_id() {
        let mut state = SessionState::new();
        state.record_command(&open(5, addr(5))).unwrap();

        state.observe(&Event::CreateConnectionChannelResponse {
            conn_id: ConnectionId(5),
            error: CreateConnectionChannelError::NoError,
            connection_status: ConnectionStatus::Disconnected,
        });
        assert!(state.connections().contains(ConnectionId(5)));

        state.observe(&Event::CreateConnectionChannelResponse {
            conn_id: ConnectionId(5),
            error: CreateConnectionChannelError::MaxPendingConnectionsReached,
            connection_status: ConnectionStatus::Disconnected,
        });
        assert!(!state.connections().contains(ConnectionId(5)));
    }

    #[test]
    fn scanner_and_listener_release_on_removal_command() {
        let mut state = SessionState::new();
        state
            .record_command(&Command::CreateScanner { scan_id: ScanId(1) })
            .unwrap();
        state
            .record_command(&Command::CreateBatteryStatusListener {
                listener_id: ListenerId(1),
                bd_addr: addr(1),
            })
            .unwrap();

        state
            .record_command(&Command::RemoveScanner { scan_id: ScanId(1) })
            .unwrap();
        state
            .record_command(&Command::RemoveBatteryStatusListener {
                listener_id: ListenerId(1),
            })
            .unwrap();
        assert!(state.scanners().is_empty());
        assert!(state.listeners().is_empty());
    }

    #[test]
    fn wizard_progress_then_completion() {
        let mut state = SessionState::new();
        let id = WizardId(0);
        state
            .record_command(&Command::CreateScanWizard { scan_wizard_id: id })
            .unwrap();
        assert_eq!(state.wizards().resolve(id), Some(&WizardProgress::Started));

        let ctx = state.observe(&Event::ScanWizardFoundPublicButton {
            scan_wizard_id: id,
            bd_addr: addr(8),
            name: "F023".into(),
        });
        assert_eq!(ctx.bd_addr(), Some(addr(8)));

        state
            .record_command(&Command::CancelScanWizard { scan_wizard_id: id })
            .unwrap();
        assert!(state.wizards().contains(id));

        let ctx = state.observe(&Event::ScanWizardCompleted {
            scan_wizard_id: id,
            result: ScanWizardResult::CancelledByUser,
        });
        assert!(matches!(ctx, EventContext::Wizard { .. }));
        assert!(!state.wizards().contains(id));
        assert_eq!(state.next_free_wizard_id(), id);
    }

    #[test]
    fn connection_for_finds_bound_address() {
        let mut state = SessionState::new();
        state.record_command(&open(11, addr(11))).unwrap();
        assert_eq!(state.connection_for(addr(11)), Some(ConnectionId(11)));
        assert_eq!(state.connection_for(addr(12)), None);
    }
}
