//! In-process loopback backend.
//!
//! A [`LoopbackHub`] is a registry of software-only endpoints: virtual
//! inputs register as destinations (openable by outputs), virtual outputs
//! as sources (openable by inputs). Each open input connection runs its own
//! delivery thread fed by a channel, so delivery is asynchronous relative to
//! the sender exactly like a hardware backend, and closing an input joins
//! that thread.
//!
//! [`Api::Loopback`](crate::Api) ports bind the process-global hub; tests
//! and embedded routing can build isolated hubs with [`LoopbackHub::new`].

use crate::backend::{InputConnection, InputDriver, OutputConnection, OutputDriver};
use crate::dispatch::Dispatch;
use crate::error::{Error, Result};
use crate::input::MidiInput;
use crate::output::MidiOutput;
use crate::Api;
use crossbeam_channel::{unbounded, Receiver, Sender};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::debug;

static GLOBAL: Lazy<Arc<LoopbackHub>> = Lazy::new(LoopbackHub::new);

enum Wire {
    Data(Vec<u8>, u64),
    Shutdown,
}

pub struct LoopbackHub {
    epoch: Instant,
    inner: Mutex<HubState>,
}

#[derive(Default)]
struct HubState {
    /// Virtual inputs: endpoints an output can open by index.
    destinations: Vec<Destination>,
    /// Virtual outputs: endpoints an input can open by index.
    sources: Vec<Source>,
    next_token: u64,
}

struct Destination {
    token: u64,
    name: String,
    wire: Sender<Wire>,
}

struct Source {
    token: u64,
    name: String,
    taps: Vec<Tap>,
}

struct Tap {
    token: u64,
    wire: Sender<Wire>,
}

impl HubState {
    fn alloc_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

impl LoopbackHub {
    /// A fresh, isolated hub.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            epoch: Instant::now(),
            inner: Mutex::new(HubState::default()),
        })
    }

    /// The process-global hub that `Api::Loopback` ports bind to.
    pub fn global() -> Arc<Self> {
        GLOBAL.clone()
    }

    /// An unopened input port bound to this hub.
    pub fn input(self: &Arc<Self>, client_name: &str, queue_capacity: usize) -> MidiInput {
        MidiInput::from_parts(
            Api::Loopback,
            client_name,
            queue_capacity,
            Box::new(LoopbackInputDriver::new(self.clone())),
        )
    }

    /// An unopened output port bound to this hub.
    pub fn output(self: &Arc<Self>, client_name: &str) -> MidiOutput {
        MidiOutput::from_parts(
            Api::Loopback,
            client_name,
            Box::new(LoopbackOutputDriver::new(self.clone())),
        )
    }

    fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

fn spawn_delivery(rx: Receiver<Wire>, dispatch: Arc<Dispatch>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("coda-midi-loopback".to_string())
        .spawn(move || {
            for wire in rx.iter() {
                match wire {
                    Wire::Data(bytes, stamp_us) => dispatch.deliver(&bytes, stamp_us),
                    Wire::Shutdown => break,
                }
            }
        })
        .map_err(|e| {
            Error::BackendUnavailable(format!("failed to spawn loopback delivery thread: {e}"))
        })
}

pub(crate) struct LoopbackInputDriver {
    hub: Arc<LoopbackHub>,
}

impl LoopbackInputDriver {
    pub(crate) fn new(hub: Arc<LoopbackHub>) -> Self {
        Self { hub }
    }
}

impl InputDriver for LoopbackInputDriver {
    fn port_count(&self) -> Result<usize> {
        Ok(self.hub.inner.lock().sources.len())
    }

    fn port_name(&self, index: usize) -> Result<String> {
        let state = self.hub.inner.lock();
        state
            .sources
            .get(index)
            .map(|s| s.name.clone())
            .ok_or(Error::NotFound {
                index,
                count: state.sources.len(),
            })
    }

    fn connect(
        &mut self,
        index: usize,
        _port_name: &str,
        dispatch: Arc<Dispatch>,
    ) -> Result<Box<dyn InputConnection>> {
        let (tx, rx) = unbounded();
        let (source_token, tap_token) = {
            let mut state = self.hub.inner.lock();
            let count = state.sources.len();
            let tap_token = state.alloc_token();
            let source = state
                .sources
                .get_mut(index)
                .ok_or(Error::NotFound { index, count })?;
            source.taps.push(Tap {
                token: tap_token,
                wire: tx.clone(),
            });
            (source.token, tap_token)
        };
        let thread = spawn_delivery(rx, dispatch)?;
        Ok(Box::new(LoopbackInputConn {
            hub: self.hub.clone(),
            detach: Detach::Tap {
                source: source_token,
                tap: tap_token,
            },
            wire: Some(tx),
            thread: Some(thread),
        }))
    }

    fn connect_virtual(
        &mut self,
        port_name: &str,
        dispatch: Arc<Dispatch>,
    ) -> Result<Box<dyn InputConnection>> {
        let (tx, rx) = unbounded();
        let token = {
            let mut state = self.hub.inner.lock();
            if state.destinations.iter().any(|d| d.name == port_name) {
                return Err(Error::Rejected(format!(
                    "a virtual input named '{port_name}' already exists"
                )));
            }
            let token = state.alloc_token();
            state.destinations.push(Destination {
                token,
                name: port_name.to_owned(),
                wire: tx.clone(),
            });
            token
        };
        debug!(port = port_name, "registered loopback virtual input");
        let thread = spawn_delivery(rx, dispatch)?;
        Ok(Box::new(LoopbackInputConn {
            hub: self.hub.clone(),
            detach: Detach::Destination(token),
            wire: Some(tx),
            thread: Some(thread),
        }))
    }
}

enum Detach {
    Destination(u64),
    Tap { source: u64, tap: u64 },
}

struct LoopbackInputConn {
    hub: Arc<LoopbackHub>,
    detach: Detach,
    wire: Option<Sender<Wire>>,
    thread: Option<JoinHandle<()>>,
}

impl LoopbackInputConn {
    fn teardown(&mut self) -> Result<()> {
        {
            let mut state = self.hub.inner.lock();
            match self.detach {
                Detach::Destination(token) => {
                    state.destinations.retain(|d| d.token != token);
                }
                Detach::Tap { source, tap } => {
                    if let Some(src) = state.sources.iter_mut().find(|s| s.token == source) {
                        src.taps.retain(|t| t.token != tap);
                    }
                }
            }
        }
        if let Some(tx) = self.wire.take() {
            let _ = tx.send(Wire::Shutdown);
        }
        if let Some(handle) = self.thread.take() {
            handle
                .join()
                .map_err(|_| Error::Rejected("loopback delivery thread panicked".into()))?;
        }
        Ok(())
    }
}

impl InputConnection for LoopbackInputConn {
    fn close(mut self: Box<Self>) -> Result<()> {
        self.teardown()
    }
}

impl Drop for LoopbackInputConn {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}

pub(crate) struct LoopbackOutputDriver {
    hub: Arc<LoopbackHub>,
}

impl LoopbackOutputDriver {
    pub(crate) fn new(hub: Arc<LoopbackHub>) -> Self {
        Self { hub }
    }
}

impl OutputDriver for LoopbackOutputDriver {
    fn port_count(&self) -> Result<usize> {
        Ok(self.hub.inner.lock().destinations.len())
    }

    fn port_name(&self, index: usize) -> Result<String> {
        let state = self.hub.inner.lock();
        state
            .destinations
            .get(index)
            .map(|d| d.name.clone())
            .ok_or(Error::NotFound {
                index,
                count: state.destinations.len(),
            })
    }

    fn connect(&mut self, index: usize, _port_name: &str) -> Result<Box<dyn OutputConnection>> {
        let state = self.hub.inner.lock();
        let dest = state.destinations.get(index).ok_or(Error::NotFound {
            index,
            count: state.destinations.len(),
        })?;
        Ok(Box::new(LoopbackOutputConn {
            hub: self.hub.clone(),
            target: Target::Direct(dest.wire.clone()),
        }))
    }

    fn connect_virtual(&mut self, port_name: &str) -> Result<Box<dyn OutputConnection>> {
        let mut state = self.hub.inner.lock();
        if state.sources.iter().any(|s| s.name == port_name) {
            return Err(Error::Rejected(format!(
                "a virtual output named '{port_name}' already exists"
            )));
        }
        let token = state.alloc_token();
        state.sources.push(Source {
            token,
            name: port_name.to_owned(),
            taps: Vec::new(),
        });
        debug!(port = port_name, "registered loopback virtual output");
        Ok(Box::new(LoopbackOutputConn {
            hub: self.hub.clone(),
            target: Target::Source(token),
        }))
    }
}

enum Target {
    /// Connected to one destination's wire.
    Direct(Sender<Wire>),
    /// A registered source fanning out to its taps.
    Source(u64),
}

struct LoopbackOutputConn {
    hub: Arc<LoopbackHub>,
    target: Target,
}

impl OutputConnection for LoopbackOutputConn {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let stamp_us = self.hub.now_us();
        match &self.target {
            Target::Direct(wire) => wire
                .send(Wire::Data(bytes.to_vec(), stamp_us))
                .map_err(|_| Error::Rejected("counterpart input port is closed".into())),
            Target::Source(token) => {
                let mut state = self.hub.inner.lock();
                let src = state
                    .sources
                    .iter_mut()
                    .find(|s| s.token == *token)
                    .ok_or_else(|| {
                        Error::Rejected("virtual output is no longer registered".into())
                    })?;
                // Prune taps whose input side has gone away.
                src.taps
                    .retain(|tap| tap.wire.send(Wire::Data(bytes.to_vec(), stamp_us)).is_ok());
                Ok(())
            }
        }
    }

    fn close(self: Box<Self>) -> Result<()> {
        if let Target::Source(token) = self.target {
            self.hub.inner.lock().sources.retain(|s| s.token != token);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::IgnoreSet;
    use crate::port::PortRef;
    use ringbuf::{traits::Split, HeapRb};

    fn test_dispatch() -> (Arc<Dispatch>, ringbuf::HeapCons<crate::TimedMessage>) {
        let (prod, cons) = HeapRb::new(16).split();
        let dispatch = Arc::new(Dispatch::new(
            PortRef::new(Api::Loopback, "hub-test"),
            IgnoreSet::none(),
            prod,
        ));
        (dispatch, cons)
    }

    #[test]
    fn virtual_input_registers_and_unregisters() {
        let hub = LoopbackHub::new();
        let mut driver = LoopbackInputDriver::new(hub.clone());
        let out_driver = LoopbackOutputDriver::new(hub.clone());

        assert_eq!(out_driver.port_count().unwrap(), 0);

        let (dispatch, _cons) = test_dispatch();
        let conn = driver.connect_virtual("Widget", dispatch).unwrap();
        assert_eq!(out_driver.port_count().unwrap(), 1);
        assert_eq!(out_driver.port_name(0).unwrap(), "Widget");

        conn.close().unwrap();
        assert_eq!(out_driver.port_count().unwrap(), 0);
    }

    #[test]
    fn duplicate_virtual_names_are_rejected() {
        let hub = LoopbackHub::new();
        let mut driver = LoopbackInputDriver::new(hub.clone());

        let (dispatch, _cons) = test_dispatch();
        let _conn = driver.connect_virtual("Dup", dispatch).unwrap();

        let (dispatch2, _cons2) = test_dispatch();
        match driver.connect_virtual("Dup", dispatch2) {
            Err(Error::Rejected(_)) => {}
            Err(other) => panic!("expected Rejected, got {other:?}"),
            Ok(_) => panic!("duplicate name should be refused"),
        }
    }

    #[test]
    fn connect_out_of_range_is_not_found() {
        let hub = LoopbackHub::new();
        let mut driver = LoopbackInputDriver::new(hub);
        let (dispatch, _cons) = test_dispatch();
        match driver.connect(3, "nope", dispatch) {
            Err(Error::NotFound { index: 3, count: 0 }) => {}
            Err(other) => panic!("expected NotFound, got {other:?}"),
            Ok(_) => panic!("out-of-range connect should fail"),
        }
    }

    #[test]
    fn source_send_with_no_taps_succeeds() {
        let hub = LoopbackHub::new();
        let mut out_driver = LoopbackOutputDriver::new(hub);
        let mut conn = out_driver.connect_virtual("Lonely").unwrap();
        conn.send(&[0x90, 0x30, 0x60]).unwrap();
    }

    #[test]
    fn direct_send_after_input_close_is_rejected() {
        let hub = LoopbackHub::new();
        let mut in_driver = LoopbackInputDriver::new(hub.clone());
        let mut out_driver = LoopbackOutputDriver::new(hub);

        let (dispatch, _cons) = test_dispatch();
        let in_conn = in_driver.connect_virtual("Target", dispatch).unwrap();
        let mut out_conn = out_driver.connect(0, "writer").unwrap();

        in_conn.close().unwrap();
        let err = out_conn.send(&[0x90, 0x30, 0x60]).unwrap_err();
        assert!(matches!(err, Error::Rejected(_)));
    }
}
