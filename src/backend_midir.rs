//! Drivers backed by the `midir` crate (feature `midi-io`).
//!
//! midir consumes its client handle when connecting, so the drivers keep only
//! the client name and build a fresh handle per operation; enumeration stays
//! available while a connection is open. Incoming messages are forwarded to
//! the shared [`Dispatch`] with midir's microsecond timestamps; midir's own
//! category filter is disabled so the layer's mutable ignore flags are the
//! single source of truth.

use crate::backend::{InputConnection, InputDriver, OutputConnection, OutputDriver};
use crate::dispatch::Dispatch;
use crate::error::{Error, Result};
use crate::Api;
use midir::{Ignore, MidiInputConnection, MidiOutputConnection};
use std::sync::Arc;

pub(crate) struct MidirInputDriver {
    client_name: String,
}

impl MidirInputDriver {
    pub(crate) fn new(api: Api, client_name: &str) -> Result<Self> {
        if Some(api) != Api::midir_api() {
            return Err(Error::BackendUnavailable(format!(
                "{api} is not the midir backend on this platform"
            )));
        }
        let driver = Self {
            client_name: client_name.to_owned(),
        };
        // Surface init failures (no sequencer device, daemon down) at
        // construction instead of on first use.
        driver.probe()?;
        Ok(driver)
    }

    fn probe(&self) -> Result<midir::MidiInput> {
        let mut input = midir::MidiInput::new(&self.client_name)?;
        input.ignore(Ignore::None);
        Ok(input)
    }
}

impl InputDriver for MidirInputDriver {
    fn port_count(&self) -> Result<usize> {
        Ok(self.probe()?.port_count())
    }

    fn port_name(&self, index: usize) -> Result<String> {
        let probe = self.probe()?;
        let ports = probe.ports();
        let port = ports.get(index).ok_or(Error::NotFound {
            index,
            count: ports.len(),
        })?;
        Ok(probe.port_name(port)?)
    }

    fn connect(
        &mut self,
        index: usize,
        port_name: &str,
        dispatch: Arc<Dispatch>,
    ) -> Result<Box<dyn InputConnection>> {
        let probe = self.probe()?;
        let ports = probe.ports();
        let port = ports
            .get(index)
            .ok_or(Error::NotFound {
                index,
                count: ports.len(),
            })?
            .clone();
        let conn = probe.connect(
            &port,
            port_name,
            move |stamp_us, bytes, _| dispatch.deliver(bytes, stamp_us),
            (),
        )?;
        Ok(Box::new(MidirInputConn { conn: Some(conn) }))
    }

    #[cfg_attr(not(unix), allow(unused_variables))]
    fn connect_virtual(
        &mut self,
        port_name: &str,
        dispatch: Arc<Dispatch>,
    ) -> Result<Box<dyn InputConnection>> {
        #[cfg(unix)]
        {
            use midir::os::unix::VirtualInput;
            let probe = self.probe()?;
            let conn = probe.create_virtual(
                port_name,
                move |stamp_us, bytes, _| dispatch.deliver(bytes, stamp_us),
                (),
            )?;
            Ok(Box::new(MidirInputConn { conn: Some(conn) }))
        }
        #[cfg(not(unix))]
        Err(Error::Rejected(
            "virtual ports are not supported by this backend".into(),
        ))
    }
}

struct MidirInputConn {
    conn: Option<MidiInputConnection<()>>,
}

impl InputConnection for MidirInputConn {
    fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            // Joins midir's delivery thread before returning.
            conn.close();
        }
        Ok(())
    }
}

pub(crate) struct MidirOutputDriver {
    client_name: String,
}

impl MidirOutputDriver {
    pub(crate) fn new(api: Api, client_name: &str) -> Result<Self> {
        if Some(api) != Api::midir_api() {
            return Err(Error::BackendUnavailable(format!(
                "{api} is not the midir backend on this platform"
            )));
        }
        let driver = Self {
            client_name: client_name.to_owned(),
        };
        driver.probe()?;
        Ok(driver)
    }

    fn probe(&self) -> Result<midir::MidiOutput> {
        Ok(midir::MidiOutput::new(&self.client_name)?)
    }
}

impl OutputDriver for MidirOutputDriver {
    fn port_count(&self) -> Result<usize> {
        Ok(self.probe()?.port_count())
    }

    fn port_name(&self, index: usize) -> Result<String> {
        let probe = self.probe()?;
        let ports = probe.ports();
        let port = ports.get(index).ok_or(Error::NotFound {
            index,
            count: ports.len(),
        })?;
        Ok(probe.port_name(port)?)
    }

    fn connect(&mut self, index: usize, port_name: &str) -> Result<Box<dyn OutputConnection>> {
        let probe = self.probe()?;
        let ports = probe.ports();
        let port = ports
            .get(index)
            .ok_or(Error::NotFound {
                index,
                count: ports.len(),
            })?
            .clone();
        let conn = probe.connect(&port, port_name)?;
        Ok(Box::new(MidirOutputConn { conn: Some(conn) }))
    }

    #[cfg_attr(not(unix), allow(unused_variables))]
    fn connect_virtual(&mut self, port_name: &str) -> Result<Box<dyn OutputConnection>> {
        #[cfg(unix)]
        {
            use midir::os::unix::VirtualOutput;
            let probe = self.probe()?;
            let conn = probe.create_virtual(port_name)?;
            Ok(Box::new(MidirOutputConn { conn: Some(conn) }))
        }
        #[cfg(not(unix))]
        Err(Error::Rejected(
            "virtual ports are not supported by this backend".into(),
        ))
    }
}

struct MidirOutputConn {
    conn: Option<MidiOutputConnection>,
}

impl OutputConnection for MidirOutputConn {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        match self.conn.as_mut() {
            Some(conn) => Ok(conn.send(bytes)?),
            None => Err(Error::InvalidState("connection is closed")),
        }
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close();
        }
        Ok(())
    }
}
