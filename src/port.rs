//! The lifecycle surface shared by input and output ports.

use crate::error::Result;
use crate::Api;
use std::fmt;
use std::sync::Arc;

/// Cheap cloneable identity of an open port, handed to input callbacks.
#[derive(Clone, Debug)]
pub struct PortRef {
    api: Api,
    name: Arc<str>,
}

impl PortRef {
    pub(crate) fn new(api: Api, name: &str) -> Self {
        Self {
            api,
            name: Arc::from(name),
        }
    }

    pub fn api(&self) -> Api {
        self.api
    }

    /// The client-visible name the port was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api, self.name)
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Lifecycle operations common to [`MidiInput`](crate::MidiInput) and
/// [`MidiOutput`](crate::MidiOutput).
///
/// The trait is sealed: the two port types carry disjoint capability sets
/// (receive-only vs send-only) and only share this surface. A port moves
/// through `Unopened -> Open -> Closed`; `Closed` is terminal and re-opening
/// is not supported. Every operation outside `Open` (except [`close`], which
/// is safe from any state) fails with [`Error::InvalidState`](crate::Error).
///
/// [`close`]: MidiPort::close
pub trait MidiPort: sealed::Sealed {
    /// The backend API this port is bound to.
    fn api(&self) -> Api;

    /// The client name passed at construction.
    fn client_name(&self) -> &str;

    fn is_open(&self) -> bool;

    /// Number of counterpart endpoints currently visible to this port.
    fn port_count(&self) -> Result<usize>;

    /// Name of the `index`-th counterpart endpoint (0-indexed). A backend
    /// reporting an empty name is treated as an error, not a success.
    fn port_name(&self, index: usize) -> Result<String>;

    /// Open the `index`-th counterpart endpoint under a client-visible name.
    fn open_port(&mut self, index: usize, port_name: &str) -> Result<()>;

    /// Create a software-only endpoint visible to other clients of the
    /// backend, with no numbered device backing it.
    fn open_virtual(&mut self, port_name: &str) -> Result<()>;

    /// Release the backend resource. Safe from any state; closing an
    /// already-closed port reports an error without crashing, and the port
    /// stays closed. For inputs this joins the delivery context, so no
    /// callback fires after `close` returns.
    fn close(&mut self) -> Result<()>;
}
