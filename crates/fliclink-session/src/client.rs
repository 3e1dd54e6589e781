use std::io::{Read, Write};

use fliclink_frame::{FrameReader, FrameWriter};
use fliclink_protocol::{
    BdAddr, Command, ConnectionId, Event, LatencyMode, ListenerId, ScanId, WizardId,
};
use fliclink_transport::FlicStream;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Result, SessionError};
use crate::state::{EventContext, SessionState};

/// A decoded event together with what it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEvent {
    #[serde(flatten)]
    pub event: Event,
    pub context: EventContext,
}

/// A blocking client for one daemon connection.
///
/// Commands are checked against tracked identifiers before they are written
/// and recorded after the write succeeds. Events are read one frame at a
/// time; a record that fails to decode is reported as a non-fatal error and
/// the next call carries on with the following frame.
pub struct FlicClient<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    state: SessionState,
    config: ClientConfig,
}

impl<R: Read, W: Write> FlicClient<R, W> {
    /// Build a client over arbitrary read and write halves.
    pub fn new(reader: R, writer: W, config: ClientConfig) -> Self {
        let reader = FrameReader::with_config(reader, config.frame.clone());
        let writer = FrameWriter::with_config(writer, config.frame.clone());
        Self::from_parts(reader, writer, config)
    }

    /// Build a client from already-configured frame halves.
    pub fn from_parts(reader: FrameReader<R>, writer: FrameWriter<W>, config: ClientConfig) -> Self {
        Self {
            reader,
            writer,
            state: SessionState::new(),
            config,
        }
    }

    /// Validate, encode and send one command.
    pub fn send_command(&mut self, command: Command) -> Result<()> {
        self.state.check_command(&command)?;
        self.writer.send(&command.to_bytes())?;
        debug!(command = %command.opcode(), "command sent");
        self.state.record_command(&command)?;
        Ok(())
    }

    /// Block until the next event arrives.
    ///
    /// With a read timeout configured, an idle connection yields
    /// [`SessionError::ReadTimeout`] and the client stays usable.
    pub fn next_event(&mut self) -> Result<SessionEvent> {
        let frame = self
            .reader
            .read_frame()
            .map_err(SessionError::from_read)?;
        let event = Event::decode(&frame.record).inspect_err(|err| {
            warn!(opcode = ?frame.opcode(), error = %err, "dropping undecodable record");
        })?;
        let context = self.state.observe(&event);
        Ok(SessionEvent { event, context })
    }

    pub fn get_info(&mut self) -> Result<()> {
        self.send_command(Command::GetInfo)
    }

    pub fn create_scanner(&mut self, scan_id: ScanId) -> Result<()> {
        self.send_command(Command::CreateScanner { scan_id })
    }

    pub fn remove_scanner(&mut self, scan_id: ScanId) -> Result<()> {
        self.send_command(Command::RemoveScanner { scan_id })
    }

    /// Open a connection channel using the configured latency mode and
    /// auto-disconnect time.
    pub fn create_connection_channel(&mut self, conn_id: ConnectionId, bd_addr: BdAddr) -> Result<()> {
        let latency_mode = self.config.latency_mode;
        let auto_disconnect_time = self.config.auto_disconnect_time;
        self.create_connection_channel_with(conn_id, bd_addr, latency_mode, auto_disconnect_time)
    }

    pub fn create_connection_channel_with(
        &mut self,
        conn_id: ConnectionId,
        bd_addr: BdAddr,
        latency_mode: LatencyMode,
        auto_disconnect_time: i16,
    ) -> Result<()> {
        self.send_command(Command::CreateConnectionChannel {
            conn_id,
            bd_addr,
            latency_mode,
            auto_disconnect_time,
        })
    }

    pub fn remove_connection_channel(&mut self, conn_id: ConnectionId) -> Result<()> {
        self.send_command(Command::RemoveConnectionChannel { conn_id })
    }

    pub fn force_disconnect(&mut self, bd_addr: BdAddr) -> Result<()> {
        self.send_command(Command::ForceDisconnect { bd_addr })
    }

    pub fn change_mode_parameters(
        &mut self,
        conn_id: ConnectionId,
        latency_mode: LatencyMode,
        auto_disconnect_time: i16,
    ) -> Result<()> {
        self.send_command(Command::ChangeModeParameters {
            conn_id,
            latency_mode,
            auto_disconnect_time,
        })
    }

    pub fn ping(&mut self, ping_id: u32) -> Result<()> {
        self.send_command(Command::Ping { ping_id })
    }

    pub fn get_button_info(&mut self, bd_addr: BdAddr) -> Result<()> {
        self.send_command(Command::GetButtonInfo { bd_addr })
    }

    pub fn create_scan_wizard(&mut self, scan_wizard_id: WizardId) -> Result<()> {
        self.send_command(Command::CreateScanWizard { scan_wizard_id })
    }

    pub fn cancel_scan_wizard(&mut self, scan_wizard_id: WizardId) -> Result<()> {
        self.send_command(Command::CancelScanWizard { scan_wizard_id })
    }

    pub fn delete_button(&mut self, bd_addr: BdAddr) -> Result<()> {
        self.send_command(Command::DeleteButton { bd_addr })
    }

    pub fn create_battery_status_listener(
        &mut self,
        listener_id: ListenerId,
        bd_addr: BdAddr,
    ) -> Result<()> {
        self.send_command(Command::CreateBatteryStatusListener {
            listener_id,
            bd_addr,
        })
    }

    pub fn remove_battery_status_listener(&mut self, listener_id: ListenerId) -> Result<()> {
        self.send_command(Command::RemoveBatteryStatusListener { listener_id })
    }

    /// Identifier bookkeeping for this connection.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Tear the client apart, keeping its frame halves and state.
    pub fn into_parts(self) -> (FrameReader<R>, FrameWriter<W>, SessionState) {
        (self.reader, self.writer, self.state)
    }
}

impl FlicClient<FlicStream, FlicStream> {
    /// Shut down both directions of the underlying socket.
    ///
    /// A thread blocked in [`FlicClient::next_event`] on a clone of the same
    /// socket wakes with `ConnectionClosed`.
    pub fn shutdown(&self) -> Result<()> {
        self.writer.get_ref().shutdown()?;
        Ok(())
    }

    /// A handle that can shut this connection down from another thread.
    pub fn shutdown_handle(&self) -> Result<FlicStream> {
        Ok(self.writer.get_ref().try_clone()?)
    }
}
