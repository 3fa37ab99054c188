//! Error types for the MIDI port layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The requested backend is not compiled in, or the driver failed to
    /// initialize (no sequencer device, daemon not running, ...).
    #[error("MIDI backend unavailable: {0}")]
    BackendUnavailable(String),

    /// An operation was attempted outside the port state that permits it.
    #[error("invalid port state: {0}")]
    InvalidState(&'static str),

    /// The backend refused the operation (malformed message, name in use,
    /// counterpart endpoint gone, ...).
    #[error("backend rejected the operation: {0}")]
    Rejected(String),

    /// A port index was out of range for the bound backend.
    #[error("port index {index} out of range ({count} ports available)")]
    NotFound { index: usize, count: usize },
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::BackendUnavailable(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::PortInfoError> for Error {
    fn from(e: midir::PortInfoError) -> Self {
        Error::Rejected(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::SendError> for Error {
    fn from(e: midir::SendError) -> Self {
        Error::Rejected(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::Rejected(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::Rejected(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
