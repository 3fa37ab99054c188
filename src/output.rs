//! Send-only MIDI port.

use crate::backend::{self, OpenTarget, OutputConnection, OutputDriver};
use crate::config::MidiSettings;
use crate::error::{Error, Result};
use crate::port::{sealed::Sealed, MidiPort};
use crate::Api;
use std::fmt;
use tracing::{debug, warn};

/// A send-only MIDI port.
///
/// Construct against a backend, open exactly one endpoint (numbered or
/// virtual), then push complete raw messages with [`send`]. The handle is
/// `Send` but not `Sync`.
///
/// [`send`]: MidiOutput::send
pub struct MidiOutput {
    api: Api,
    client_name: String,
    driver: Box<dyn OutputDriver>,
    state: OutputState,
}

enum OutputState {
    Unopened,
    Open {
        conn: Box<dyn OutputConnection>,
        port_name: String,
    },
    Closed,
}

impl MidiOutput {
    /// An unopened output on the default backend.
    pub fn new(client_name: &str) -> Result<Self> {
        Self::with_api(Api::default_api(), client_name)
    }

    /// An unopened output on a specific backend.
    pub fn with_api(api: Api, client_name: &str) -> Result<Self> {
        let driver = backend::output_driver(api, client_name)?;
        Ok(Self::from_parts(api, client_name, driver))
    }

    /// Build an output from persisted [`MidiSettings`]. The queue and
    /// ignore fields do not apply to outputs.
    pub fn from_settings(settings: &MidiSettings) -> Result<Self> {
        let api = settings.api.unwrap_or_else(Api::default_api);
        Self::with_api(api, &settings.client_name)
    }

    pub(crate) fn from_parts(api: Api, client_name: &str, driver: Box<dyn OutputDriver>) -> Self {
        Self {
            api,
            client_name: client_name.to_owned(),
            driver,
            state: OutputState::Unopened,
        }
    }

    /// Send one complete raw MIDI message. All-or-nothing: either the whole
    /// message is handed to the backend or an error is returned.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let conn = match &mut self.state {
            OutputState::Open { conn, .. } => conn,
            OutputState::Unopened => return Err(Error::InvalidState("port is not open")),
            OutputState::Closed => return Err(Error::InvalidState("port is closed")),
        };
        if bytes.is_empty() {
            return Err(Error::Rejected("empty MIDI message".into()));
        }
        conn.send(bytes)
    }

    /// The name of the endpoint this port is connected to, if open.
    pub fn connected_port_name(&self) -> Option<&str> {
        match &self.state {
            OutputState::Open { port_name, .. } => Some(port_name),
            _ => None,
        }
    }

    fn open_with(&mut self, target: OpenTarget<'_>) -> Result<()> {
        self.ensure_unopened()?;
        let port_name = target.port_name().to_owned();
        let conn = match target {
            OpenTarget::Numbered(index, name) => self.driver.connect(index, name)?,
            OpenTarget::Virtual(name) => self.driver.connect_virtual(name)?,
        };
        debug!(api = %self.api, port = %port_name, "opened MIDI output");
        self.state = OutputState::Open { conn, port_name };
        Ok(())
    }

    fn ensure_unopened(&self) -> Result<()> {
        match self.state {
            OutputState::Unopened => Ok(()),
            OutputState::Open { .. } => Err(Error::InvalidState("port is already open")),
            OutputState::Closed => Err(Error::InvalidState("closed ports cannot be reopened")),
        }
    }

    fn close_inner(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, OutputState::Closed) {
            OutputState::Open { conn, .. } => {
                debug!(api = %self.api, "closing MIDI output");
                conn.close()
            }
            OutputState::Unopened => Ok(()),
            OutputState::Closed => Err(Error::InvalidState("port is already closed")),
        }
    }
}

impl Sealed for MidiOutput {}

impl MidiPort for MidiOutput {
    fn api(&self) -> Api {
        self.api
    }

    fn client_name(&self) -> &str {
        &self.client_name
    }

    fn is_open(&self) -> bool {
        matches!(self.state, OutputState::Open { .. })
    }

    fn port_count(&self) -> Result<usize> {
        self.driver.port_count()
    }

    fn port_name(&self, index: usize) -> Result<String> {
        let name = self.driver.port_name(index)?;
        if name.is_empty() {
            return Err(Error::Rejected(format!(
                "backend returned an empty name for port {index}"
            )));
        }
        Ok(name)
    }

    fn open_port(&mut self, index: usize, port_name: &str) -> Result<()> {
        self.open_with(OpenTarget::Numbered(index, port_name))
    }

    fn open_virtual(&mut self, port_name: &str) -> Result<()> {
        self.open_with(OpenTarget::Virtual(port_name))
    }

    fn close(&mut self) -> Result<()> {
        self.close_inner()
    }
}

impl Drop for MidiOutput {
    fn drop(&mut self) {
        if matches!(self.state, OutputState::Open { .. }) {
            if let Err(err) = self.close_inner() {
                warn!(%err, "failed to close MIDI output during drop");
            }
        }
    }
}

impl fmt::Debug for MidiOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiOutput")
            .field("api", &self.api)
            .field("client_name", &self.client_name)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackHub;

    #[test]
    fn send_requires_an_open_port() {
        let hub = LoopbackHub::new();
        let mut output = hub.output("unopened");
        assert!(matches!(
            output.send(&[0x90, 0x30, 0x60]),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn empty_messages_are_rejected() {
        let hub = LoopbackHub::new();
        let mut output = hub.output("empty");
        output.open_virtual("Empty Sender").unwrap();
        assert!(matches!(output.send(&[]), Err(Error::Rejected(_))));
        output.close().unwrap();
    }

    #[test]
    fn close_is_terminal_and_repeat_close_reports() {
        let hub = LoopbackHub::new();
        let mut output = hub.output("closer");
        output.open_virtual("Close Me").unwrap();

        output.close().expect("first close succeeds");
        assert!(matches!(output.close(), Err(Error::InvalidState(_))));
        assert!(matches!(
            output.send(&[0x90, 0x30, 0x60]),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            output.open_virtual("Again"),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn connected_port_name_tracks_state() {
        let hub = LoopbackHub::new();
        let mut output = hub.output("namer");
        assert!(output.connected_port_name().is_none());
        output.open_virtual("Synth Feed").unwrap();
        assert_eq!(output.connected_port_name(), Some("Synth Feed"));
        output.close().unwrap();
        assert!(output.connected_port_name().is_none());
    }
}
