//! Driver seam between the typed port layer and concrete MIDI backends.
//!
//! Drivers answer enumeration queries and produce connections; connections
//! own exactly one backend resource and release it on close. The midir
//! driver covers the platform API (feature `midi-io`), the loopback driver
//! the in-process router.

use crate::dispatch::Dispatch;
use crate::error::{Error, Result};
use crate::loopback::{LoopbackHub, LoopbackInputDriver, LoopbackOutputDriver};
use crate::Api;
use std::sync::Arc;

/// How a port is being opened. Exactly one target is valid per port
/// instance before use.
pub(crate) enum OpenTarget<'a> {
    Numbered(usize, &'a str),
    Virtual(&'a str),
}

impl<'a> OpenTarget<'a> {
    pub(crate) fn port_name(&self) -> &'a str {
        match *self {
            OpenTarget::Numbered(_, name) | OpenTarget::Virtual(name) => name,
        }
    }
}

pub(crate) trait InputDriver: Send {
    fn port_count(&self) -> Result<usize>;
    fn port_name(&self, index: usize) -> Result<String>;
    fn connect(
        &mut self,
        index: usize,
        port_name: &str,
        dispatch: Arc<Dispatch>,
    ) -> Result<Box<dyn InputConnection>>;
    fn connect_virtual(
        &mut self,
        port_name: &str,
        dispatch: Arc<Dispatch>,
    ) -> Result<Box<dyn InputConnection>>;
}

pub(crate) trait OutputDriver: Send {
    fn port_count(&self) -> Result<usize>;
    fn port_name(&self, index: usize) -> Result<String>;
    fn connect(&mut self, index: usize, port_name: &str) -> Result<Box<dyn OutputConnection>>;
    fn connect_virtual(&mut self, port_name: &str) -> Result<Box<dyn OutputConnection>>;
}

/// An open receive connection. Closing joins the delivery context, so no
/// delivery happens after `close` returns.
pub(crate) trait InputConnection: Send {
    fn close(self: Box<Self>) -> Result<()>;
}

/// An open send connection. `send` is all-or-nothing per call.
pub(crate) trait OutputConnection: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
    fn close(self: Box<Self>) -> Result<()>;
}

#[cfg_attr(not(feature = "midi-io"), allow(unused_variables))]
pub(crate) fn input_driver(api: Api, client_name: &str) -> Result<Box<dyn InputDriver>> {
    match api {
        Api::Loopback => Ok(Box::new(LoopbackInputDriver::new(LoopbackHub::global()))),
        #[cfg(feature = "midi-io")]
        other if Some(other) == Api::midir_api() => Ok(Box::new(
            crate::backend_midir::MidirInputDriver::new(other, client_name)?,
        )),
        other => Err(Error::BackendUnavailable(format!(
            "{other} support is not compiled into this build"
        ))),
    }
}

#[cfg_attr(not(feature = "midi-io"), allow(unused_variables))]
pub(crate) fn output_driver(api: Api, client_name: &str) -> Result<Box<dyn OutputDriver>> {
    match api {
        Api::Loopback => Ok(Box::new(LoopbackOutputDriver::new(LoopbackHub::global()))),
        #[cfg(feature = "midi-io")]
        other if Some(other) == Api::midir_api() => Ok(Box::new(
            crate::backend_midir::MidirOutputDriver::new(other, client_name)?,
        )),
        other => Err(Error::BackendUnavailable(format!(
            "{other} support is not compiled into this build"
        ))),
    }
}
