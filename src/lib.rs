//! MIDI port I/O layer.
//!
//! A typed façade over native MIDI backends: enumerate the APIs compiled
//! into the binary, open real or virtual input/output ports, send raw byte
//! messages, and receive messages by polling or asynchronous callback, with
//! per-port filtering of sysex/timing/active-sensing traffic.
//!
//! Hardware I/O goes through `midir` (feature `midi-io`, default on; add
//! `jack` for the JACK backend). An in-process loopback backend is always
//! compiled, so routing and tests work without devices.
//!
//! ## Quick Start
//!
//! ```no_run
//! use coda_midi_io::{MidiInput, MidiOutput, MidiPort};
//!
//! # fn main() -> coda_midi_io::Result<()> {
//! // Send a note-on to the first available output port.
//! let mut out = MidiOutput::new("my-app")?;
//! let name = out.port_name(0)?;
//! out.open_port(0, &name)?;
//! out.send(&[0x90, 0x30, 0x60])?;
//!
//! // Receive on a virtual input port via callback.
//! let mut input = MidiInput::new("my-app")?;
//! input.open_virtual("my-app in")?;
//! input.set_callback(|port, bytes, delta| {
//!     println!("[{port}] +{delta:.6}s {bytes:02X?}");
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

mod api;
pub use api::{compiled_apis, Api};

mod message;
pub use message::{IgnoreSet, TimedMessage};

mod port;
pub use port::{MidiPort, PortRef};

mod dispatch;

mod backend;
#[cfg(feature = "midi-io")]
mod backend_midir;

mod loopback;
pub use loopback::LoopbackHub;

mod input;
pub use input::{MidiInput, DEFAULT_QUEUE_CAPACITY};

mod output;
pub use output::MidiOutput;

pub mod config;
pub use config::MidiSettings;
