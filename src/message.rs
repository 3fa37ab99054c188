//! Raw message and ignore-filter types.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// Status bytes this layer classifies for ignore filtering. Everything else
// passes through uninterpreted.
const SYSEX_START: u8 = 0xF0;
const MTC_QUARTER_FRAME: u8 = 0xF1;
const TIMING_CLOCK: u8 = 0xF8;
const ACTIVE_SENSING: u8 = 0xFE;

/// A complete raw MIDI message paired with its arrival timing.
///
/// `bytes` holds the wire bytes unmodified; three-byte channel voice messages
/// stay inline, longer messages (sysex) spill to the heap. `delta` is the
/// time in seconds since the previous message delivered on the same port,
/// `0.0` for the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedMessage {
    pub bytes: SmallVec<[u8; 3]>,
    pub delta: f64,
}

impl TimedMessage {
    pub(crate) fn new(bytes: &[u8], delta: f64) -> Self {
        Self {
            bytes: SmallVec::from_slice(bytes),
            delta,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Which incoming message categories an input port suppresses.
///
/// All three categories are suppressed by default; call
/// [`MidiInput::ignore_types`](crate::MidiInput::ignore_types) on an open
/// port to change the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreSet {
    /// System-exclusive messages (status `0xF0`).
    pub sysex: bool,
    /// Timing messages: clock ticks (`0xF8`) and MTC quarter-frames (`0xF1`).
    pub time: bool,
    /// Active-sensing keep-alives (`0xFE`).
    pub active_sense: bool,
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self {
            sysex: true,
            time: true,
            active_sense: true,
        }
    }
}

impl IgnoreSet {
    /// Suppress nothing: every category is delivered.
    pub const fn none() -> Self {
        Self {
            sysex: false,
            time: false,
            active_sense: false,
        }
    }

    /// Whether a message starting with `status` is suppressed under this set.
    pub fn suppresses(&self, status: u8) -> bool {
        match status {
            SYSEX_START => self.sysex,
            TIMING_CLOCK | MTC_QUARTER_FRAME => self.time,
            ACTIVE_SENSING => self.active_sense,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_stays_inline() {
        let msg = TimedMessage::new(&[0x90, 0x30, 0x60], 0.0);
        assert_eq!(msg.len(), 3);
        assert!(!msg.bytes.spilled());
    }

    #[test]
    fn sysex_spills_to_heap() {
        let sysex = [0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7];
        let msg = TimedMessage::new(&sysex, 0.5);
        assert_eq!(&msg.bytes[..], &sysex[..]);
        assert!(msg.bytes.spilled());
    }

    #[test]
    fn default_suppresses_all_three_categories() {
        let set = IgnoreSet::default();
        assert!(set.suppresses(0xF0));
        assert!(set.suppresses(0xF8));
        assert!(set.suppresses(0xF1));
        assert!(set.suppresses(0xFE));
    }

    #[test]
    fn channel_voice_messages_are_never_suppressed() {
        let set = IgnoreSet::default();
        for status in [0x80u8, 0x90, 0xB0, 0xC0, 0xE0] {
            assert!(!set.suppresses(status), "status {status:#04X}");
        }
    }

    #[test]
    fn each_flag_is_independent() {
        for mask in 0..8u8 {
            let set = IgnoreSet {
                sysex: mask & 1 != 0,
                time: mask & 2 != 0,
                active_sense: mask & 4 != 0,
            };
            assert_eq!(set.suppresses(0xF0), set.sysex);
            assert_eq!(set.suppresses(0xF8), set.time);
            assert_eq!(set.suppresses(0xF1), set.time);
            assert_eq!(set.suppresses(0xFE), set.active_sense);
        }
    }

    #[test]
    fn none_delivers_everything() {
        let set = IgnoreSet::none();
        for status in [0xF0u8, 0xF1, 0xF8, 0xFE, 0x90] {
            assert!(!set.suppresses(status));
        }
    }
}
