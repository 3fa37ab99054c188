//! Identifiers for the MIDI backends compiled into this build.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A MIDI backend API compiled into the binary.
///
/// Which variants are actually usable depends on the target platform and the
/// enabled cargo features; [`compiled_apis`] reports the usable set.
/// `Loopback` is the in-process router and is always available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Api {
    /// Linux ALSA sequencer.
    Alsa,
    /// JACK audio connection kit (unix, `jack` feature).
    Jack,
    /// macOS CoreMIDI.
    CoreMidi,
    /// Windows MultiMedia API.
    WinMm,
    /// In-process loopback router, always compiled.
    Loopback,
    /// Sentinel for values this build does not recognize. Never returned by
    /// [`compiled_apis`]; renders as `"?"`.
    Unknown,
}

impl Api {
    /// Human-readable backend name.
    pub fn name(&self) -> &'static str {
        match self {
            Api::Alsa => "ALSA",
            Api::Jack => "JACK",
            Api::CoreMidi => "CoreMIDI",
            Api::WinMm => "Windows MultiMedia",
            Api::Loopback => "Loopback",
            Api::Unknown => "?",
        }
    }

    /// The backend used when a port is constructed without an explicit API:
    /// the first entry of [`compiled_apis`].
    pub fn default_api() -> Api {
        compiled_apis().first().copied().unwrap_or(Api::Loopback)
    }

    /// The API served by the midir driver on this platform, if any.
    pub(crate) fn midir_api() -> Option<Api> {
        compiled_apis().into_iter().find(|api| *api != Api::Loopback)
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All backend APIs compiled into this binary, in preference order.
///
/// The platform driver (when the `midi-io` feature is enabled) comes first,
/// the loopback router last. The list is never empty.
pub fn compiled_apis() -> Vec<Api> {
    let mut apis = Vec::new();
    #[cfg(all(feature = "midi-io", unix, feature = "jack"))]
    apis.push(Api::Jack);
    #[cfg(all(feature = "midi-io", target_os = "linux", not(feature = "jack")))]
    apis.push(Api::Alsa);
    #[cfg(all(feature = "midi-io", target_os = "macos", not(feature = "jack")))]
    apis.push(Api::CoreMidi);
    #[cfg(all(feature = "midi-io", target_os = "windows"))]
    apis.push(Api::WinMm);
    apis.push(Api::Loopback);
    apis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_apis_is_never_empty() {
        assert!(!compiled_apis().is_empty());
    }

    #[test]
    fn compiled_apis_are_all_named() {
        for api in compiled_apis() {
            assert_ne!(api.name(), "?", "compiled API {api:?} is unnamed");
            assert!(!api.name().is_empty());
        }
    }

    #[test]
    fn loopback_is_always_compiled() {
        assert!(compiled_apis().contains(&Api::Loopback));
    }

    #[test]
    fn default_api_is_first_compiled() {
        assert_eq!(Api::default_api(), compiled_apis()[0]);
    }

    #[test]
    fn display_matches_name() {
        assert_eq!(Api::Loopback.to_string(), "Loopback");
        assert_eq!(Api::Unknown.to_string(), "?");
    }

    #[test]
    fn api_serde_round_trip() {
        for api in compiled_apis() {
            let json = serde_json::to_string(&api).unwrap();
            let back: Api = serde_json::from_str(&json).unwrap();
            assert_eq!(api, back);
        }
    }
}
