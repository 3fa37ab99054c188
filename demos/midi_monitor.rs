//! Print every message arriving on the first hardware MIDI input.

use coda_midi_io::{MidiInput, MidiPort};
use std::thread;
use std::time::Duration;

fn main() -> coda_midi_io::Result<()> {
    tracing_subscriber::fmt().init();

    let mut input = MidiInput::new("midi-monitor")?;
    if input.port_count()? == 0 {
        eprintln!("no MIDI input ports available");
        return Ok(());
    }

    let name = input.port_name(0)?;
    input.open_port(0, "midi-monitor")?;
    input.ignore_types(false, false, false)?;
    input.set_callback(|port, bytes, delta| {
        println!("[{port}] +{delta:.6}s {bytes:02X?}");
    })?;

    println!("monitoring '{name}' - press Ctrl-C to quit");
    loop {
        thread::sleep(Duration::from_secs(1));
    }
}
