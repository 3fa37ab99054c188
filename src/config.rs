//! Persisted port settings.
//!
//! JSON settings in the platform config directory, loaded with graceful
//! fallback to defaults. [`MidiInput::from_settings`](crate::MidiInput) and
//! [`MidiOutput::from_settings`](crate::MidiOutput) turn a loaded value back
//! into ports.

use crate::input::DEFAULT_QUEUE_CAPACITY;
use crate::message::IgnoreSet;
use crate::Api;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Client name used when none is configured.
pub const DEFAULT_CLIENT_NAME: &str = "coda-midi";

/// Persisted MIDI port settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiSettings {
    /// Backend to bind; `None` picks the build's default API.
    pub api: Option<Api>,
    /// Client name reported to the backend.
    pub client_name: String,
    /// Queue-size hint for input ports.
    pub queue_capacity: usize,
    /// Suppression flags applied to input ports.
    pub ignore: IgnoreSet,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            api: None,
            client_name: DEFAULT_CLIENT_NAME.to_owned(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            ignore: IgnoreSet::default(),
        }
    }
}

fn settings_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir()?;
    base.push("coda-midi");
    if !base.exists() {
        let _ = fs::create_dir_all(&base);
    }
    base.push("midi.json");
    Some(base)
}

/// Load settings from disk. Returns defaults if loading fails.
pub fn load() -> MidiSettings {
    let Some(path) = settings_path() else {
        return MidiSettings::default();
    };
    match fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
        Err(_) => MidiSettings::default(),
    }
}

/// Save settings to disk.
pub fn save(settings: &MidiSettings) {
    let Some(path) = settings_path() else {
        return;
    };
    if let Ok(json) = serde_json::to_string_pretty(settings) {
        if let Err(err) = fs::write(&path, json) {
            tracing::warn!(?err, "failed to write midi settings");
        }
    }
}
