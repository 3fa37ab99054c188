//! Receive-only MIDI port with polled and callback delivery.

use crate::backend::{self, InputConnection, InputDriver, OpenTarget};
use crate::config::MidiSettings;
use crate::dispatch::Dispatch;
use crate::error::{Error, Result};
use crate::message::{IgnoreSet, TimedMessage};
use crate::port::{sealed::Sealed, MidiPort, PortRef};
use crate::Api;
use ringbuf::{
    traits::{Consumer, Split},
    HeapCons, HeapRb,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Queue-size hint used by [`MidiInput::new`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A receive-only MIDI port.
///
/// Construct against a backend, open exactly one endpoint (numbered or
/// virtual), then consume messages either by polling [`message`] or by
/// arming a callback with [`set_callback`] -- one delivery mode at a time.
/// Incoming system-exclusive, timing, and active-sensing messages are
/// suppressed until [`ignore_types`] says otherwise.
///
/// The handle is `Send` but not `Sync`; wrap it in a mutex to share it.
///
/// [`message`]: MidiInput::message
/// [`set_callback`]: MidiInput::set_callback
/// [`ignore_types`]: MidiInput::ignore_types
pub struct MidiInput {
    api: Api,
    client_name: String,
    queue_capacity: usize,
    ignore: IgnoreSet,
    driver: Box<dyn InputDriver>,
    state: InputState,
}

enum InputState {
    Unopened,
    Open {
        conn: Box<dyn InputConnection>,
        dispatch: Arc<Dispatch>,
        /// `Some` while polling; `None` while a callback is armed.
        queue: Option<HeapCons<TimedMessage>>,
    },
    Closed,
}

impl MidiInput {
    /// An unopened input on the default backend with the default queue
    /// capacity.
    pub fn new(client_name: &str) -> Result<Self> {
        Self::with_api(Api::default_api(), client_name, DEFAULT_QUEUE_CAPACITY)
    }

    /// An unopened input on a specific backend. `queue_capacity` bounds the
    /// polling queue; once full, further messages are dropped until the
    /// queue is drained.
    pub fn with_api(api: Api, client_name: &str, queue_capacity: usize) -> Result<Self> {
        let driver = backend::input_driver(api, client_name)?;
        Ok(Self::from_parts(api, client_name, queue_capacity, driver))
    }

    /// Build an input from persisted [`MidiSettings`].
    pub fn from_settings(settings: &MidiSettings) -> Result<Self> {
        let api = settings.api.unwrap_or_else(Api::default_api);
        let mut input = Self::with_api(api, &settings.client_name, settings.queue_capacity)?;
        input.ignore = settings.ignore;
        Ok(input)
    }

    pub(crate) fn from_parts(
        api: Api,
        client_name: &str,
        queue_capacity: usize,
        driver: Box<dyn InputDriver>,
    ) -> Self {
        Self {
            api,
            client_name: client_name.to_owned(),
            queue_capacity: queue_capacity.max(1),
            ignore: IgnoreSet::default(),
            driver,
            state: InputState::Unopened,
        }
    }

    /// Retrieve the next buffered message, or `Ok(None)` when nothing has
    /// arrived yet. Non-blocking and safe to call in a tight loop. Fails if
    /// the port is not open or a callback is armed.
    pub fn message(&mut self) -> Result<Option<TimedMessage>> {
        match &mut self.state {
            InputState::Open {
                queue: Some(queue), ..
            } => Ok(queue.try_pop()),
            InputState::Open { queue: None, .. } => {
                Err(Error::InvalidState("a callback is armed; polling is disabled"))
            }
            InputState::Unopened => Err(Error::InvalidState("port is not open")),
            InputState::Closed => Err(Error::InvalidState("port is closed")),
        }
    }

    /// Arm `handler` to run once per arriving message, on the backend's
    /// delivery context. Any polled backlog is discarded. Fails if the port
    /// is not open or a handler is already armed.
    pub fn set_callback<F>(&mut self, handler: F) -> Result<()>
    where
        F: FnMut(&PortRef, &[u8], f64) + Send + 'static,
    {
        match &mut self.state {
            InputState::Open { dispatch, queue, .. } => {
                if !dispatch.arm(Box::new(handler)) {
                    return Err(Error::InvalidState("a callback is already armed"));
                }
                *queue = None;
                debug!(api = %self.api, "armed input callback");
                Ok(())
            }
            InputState::Unopened => Err(Error::InvalidState("port is not open")),
            InputState::Closed => Err(Error::InvalidState("port is closed")),
        }
    }

    /// Disarm the callback and resume polling on a fresh queue. Once this
    /// returns, the handler is guaranteed not to be invoked again. Fails
    /// gracefully if no handler is armed.
    pub fn cancel_callback(&mut self) -> Result<()> {
        let capacity = self.queue_capacity;
        match &mut self.state {
            InputState::Open { dispatch, queue, .. } => {
                let (prod, cons) = HeapRb::new(capacity).split();
                if !dispatch.disarm(prod) {
                    return Err(Error::InvalidState("no callback is armed"));
                }
                *queue = Some(cons);
                debug!(api = %self.api, "cancelled input callback");
                Ok(())
            }
            InputState::Unopened => Err(Error::InvalidState("port is not open")),
            InputState::Closed => Err(Error::InvalidState("port is closed")),
        }
    }

    /// Replace the suppression flags for system-exclusive, timing, and
    /// active-sensing messages. Takes effect for subsequently delivered
    /// messages in both delivery modes.
    pub fn ignore_types(&mut self, sysex: bool, time: bool, active_sense: bool) -> Result<()> {
        match &self.state {
            InputState::Open { dispatch, .. } => {
                let set = IgnoreSet {
                    sysex,
                    time,
                    active_sense,
                };
                dispatch.set_ignore(set);
                self.ignore = set;
                Ok(())
            }
            InputState::Unopened => Err(Error::InvalidState("port is not open")),
            InputState::Closed => Err(Error::InvalidState("port is closed")),
        }
    }

    /// The suppression flags currently in effect (or pending, if not open).
    pub fn ignored(&self) -> IgnoreSet {
        self.ignore
    }

    fn open_with(&mut self, target: OpenTarget<'_>) -> Result<()> {
        self.ensure_unopened()?;
        let port_name = target.port_name();
        let (prod, cons) = HeapRb::new(self.queue_capacity).split();
        let dispatch = Arc::new(Dispatch::new(
            PortRef::new(self.api, port_name),
            self.ignore,
            prod,
        ));
        let conn = match target {
            OpenTarget::Numbered(index, name) => self.driver.connect(index, name, dispatch.clone())?,
            OpenTarget::Virtual(name) => self.driver.connect_virtual(name, dispatch.clone())?,
        };
        debug!(api = %self.api, port = port_name, "opened MIDI input");
        self.state = InputState::Open {
            conn,
            dispatch,
            queue: Some(cons),
        };
        Ok(())
    }

    fn ensure_unopened(&self) -> Result<()> {
        match self.state {
            InputState::Unopened => Ok(()),
            InputState::Open { .. } => Err(Error::InvalidState("port is already open")),
            InputState::Closed => Err(Error::InvalidState("closed ports cannot be reopened")),
        }
    }

    fn close_inner(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, InputState::Closed) {
            InputState::Open { conn, .. } => {
                debug!(api = %self.api, "closing MIDI input");
                conn.close()
            }
            InputState::Unopened => Ok(()),
            InputState::Closed => Err(Error::InvalidState("port is already closed")),
        }
    }
}

impl Sealed for MidiInput {}

impl MidiPort for MidiInput {
    fn api(&self) -> Api {
        self.api
    }

    fn client_name(&self) -> &str {
        &self.client_name
    }

    fn is_open(&self) -> bool {
        matches!(self.state, InputState::Open { .. })
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

impl Drop for MidiInput {
    fn drop(&mut self) {
        if matches!(self.state, InputState::Open { .. }) {
            if let Err(err) = self.close_inner() {
                warn!(%err, "failed to close MIDI input during drop");
            }
        }
    }
}

impl fmt::Debug for MidiInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiInput")
            .field("api", &self.api)
            .field("client_name", &self.client_name)
            .field("open", &self.is_open())
            .finish()
    }
}
