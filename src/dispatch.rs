//! Shared delivery state between a port and its backend delivery context.
//!
//! One `Dispatch` lives behind an `Arc` for the lifetime of an open input
//! connection: the backend side calls [`Dispatch::deliver`] once per arriving
//! message, the port side switches delivery modes and filter flags. Handler
//! invocation happens while holding the mode lock, so `disarm` (and close,
//! which drops the backend side) returning guarantees no further handler
//! call is in flight.

use crate::message::{IgnoreSet, TimedMessage};
use crate::port::PortRef;
use parking_lot::Mutex;
use ringbuf::{traits::Producer, HeapProd};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub(crate) type Handler = Box<dyn FnMut(&PortRef, &[u8], f64) + Send + 'static>;

pub(crate) struct Dispatch {
    port: PortRef,
    ignore: IgnoreFlags,
    state: Mutex<DeliveryState>,
}

struct DeliveryState {
    last_stamp_us: Option<u64>,
    mode: DeliveryMode,
}

enum DeliveryMode {
    /// Polling: messages buffer into the SPSC queue the port owner drains.
    Queue(HeapProd<TimedMessage>),
    /// Callback: messages invoke the armed handler on the delivery context.
    Handler(Handler),
}

struct IgnoreFlags {
    sysex: AtomicBool,
    time: AtomicBool,
    active_sense: AtomicBool,
}

impl IgnoreFlags {
    fn new(set: IgnoreSet) -> Self {
        Self {
            sysex: AtomicBool::new(set.sysex),
            time: AtomicBool::new(set.time),
            active_sense: AtomicBool::new(set.active_sense),
        }
    }

    fn store(&self, set: IgnoreSet) {
        self.sysex.store(set.sysex, Ordering::Release);
        self.time.store(set.time, Ordering::Release);
        self.active_sense.store(set.active_sense, Ordering::Release);
    }

    fn load(&self) -> IgnoreSet {
        IgnoreSet {
            sysex: self.sysex.load(Ordering::Acquire),
            time: self.time.load(Ordering::Acquire),
            active_sense: self.active_sense.load(Ordering::Acquire),
        }
    }
}

impl Dispatch {
    pub(crate) fn new(port: PortRef, ignore: IgnoreSet, queue: HeapProd<TimedMessage>) -> Self {
        Self {
            port,
            ignore: IgnoreFlags::new(ignore),
            state: Mutex::new(DeliveryState {
                last_stamp_us: None,
                mode: DeliveryMode::Queue(queue),
            }),
        }
    }

    pub(crate) fn set_ignore(&self, set: IgnoreSet) {
        self.ignore.store(set);
    }

    /// Switch to callback mode. Returns false if a handler is already armed.
    pub(crate) fn arm(&self, handler: Handler) -> bool {
        let mut state = self.state.lock();
        if matches!(state.mode, DeliveryMode::Handler(_)) {
            return false;
        }
        state.mode = DeliveryMode::Handler(handler);
        true
    }

    /// Switch back to polling onto `fresh_queue`. Returns false if no
    /// handler is armed. Once this returns, the previous handler can no
    /// longer be invoked.
    pub(crate) fn disarm(&self, fresh_queue: HeapProd<TimedMessage>) -> bool {
        let mut state = self.state.lock();
        if matches!(state.mode, DeliveryMode::Queue(_)) {
            return false;
        }
        state.mode = DeliveryMode::Queue(fresh_queue);
        true
    }

    /// Deliver one message from the backend. `stamp_us` is the backend's
    /// absolute timestamp in microseconds; the delta clock lives here so
    /// both delivery modes see one continuous stream.
    pub(crate) fn deliver(&self, bytes: &[u8], stamp_us: u64) {
        let Some(&status) = bytes.first() else {
            return;
        };
        if self.ignore.load().suppresses(status) {
            return;
        }
        let mut state = self.state.lock();
        let delta = state.advance(stamp_us);
        match &mut state.mode {
            DeliveryMode::Queue(queue) => {
                if queue.try_push(TimedMessage::new(bytes, delta)).is_err() {
                    debug!(port = %self.port, "input queue full; dropping message");
                }
            }
            DeliveryMode::Handler(handler) => handler(&self.port, bytes, delta),
        }
    }
}

impl DeliveryState {
    fn advance(&mut self, stamp_us: u64) -> f64 {
        let delta = match self.last_stamp_us {
            None => 0.0,
            Some(prev) => stamp_us.saturating_sub(prev) as f64 / 1_000_000.0,
        };
        self.last_stamp_us = Some(stamp_us);
        delta
    }
}
