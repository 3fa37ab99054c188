//! Hardware integration tests against real MIDI devices.
//!
//! All tests are `#[ignore]` so CI doesn't fail without hardware. They need
//! at least one MIDI device (or a software loopback like the macOS IAC
//! Driver / ALSA `snd-virmidi`) visible to the platform backend.
//!
//! Run with:
//!   cargo test --test hardware -- --ignored --test-threads=1

#![cfg(feature = "midi-io")]

use coda_midi_io::{compiled_apis, Api, MidiInput, MidiOutput, MidiPort};
use std::thread;
use std::time::Duration;

fn platform_apis() -> impl Iterator<Item = Api> {
    compiled_apis().into_iter().filter(|api| *api != Api::Loopback)
}

#[test]
#[ignore]
fn enumerate_hardware_ports() {
    for api in platform_apis() {
        let output = MidiOutput::with_api(api, "coda-midi-test")
            .unwrap_or_else(|e| panic!("{api} output init failed: {e}"));
        let count = output.port_count().expect("port count");
        println!("{api}: {count} output port(s)");
        for index in 0..count {
            let name = output.port_name(index).expect("port name");
            assert!(!name.is_empty(), "{api} port {index} has an empty name");
            println!("  [{index}] {name}");
        }

        let input = MidiInput::with_api(api, "coda-midi-test", 64)
            .unwrap_or_else(|e| panic!("{api} input init failed: {e}"));
        let count = input.port_count().expect("port count");
        println!("{api}: {count} input port(s)");
    }
}

#[test]
#[ignore]
fn open_first_output_and_send_notes() {
    let mut output = MidiOutput::new("coda-midi-test").expect("default output");
    let count = output.port_count().expect("port count");
    assert!(count > 0, "there were zero available ports");

    let name = output.port_name(0).expect("port name");
    output.open_port(0, &name).expect("open port 0");

    output.send(&[0x90, 0x30, 0x60]).expect("note-on");
    thread::sleep(Duration::from_millis(100));
    output.send(&[0x80, 0x30, 0x00]).expect("note-off");

    output.close().expect("close");
}

#[test]
#[ignore]
fn open_first_input_and_set_ignore_combinations() {
    let mut input = MidiInput::new("coda-midi-test").expect("default input");
    let count = input.port_count().expect("port count");
    assert!(count > 0, "there were zero available ports");

    let name = input.port_name(0).expect("port name");
    input.open_port(0, &name).expect("open port 0");

    for mask in 0..8u8 {
        input
            .ignore_types(mask & 1 != 0, mask & 2 != 0, mask & 4 != 0)
            .unwrap_or_else(|e| panic!("ignore combination {mask:#05b} failed: {e}"));
    }

    input.close().expect("close");
}

#[test]
#[ignore]
fn callback_arm_and_cancel_on_hardware() {
    let mut input = MidiInput::new("coda-midi-test").expect("default input");
    assert!(input.port_count().expect("port count") > 0);

    let name = input.port_name(0).expect("port name");
    input.open_port(0, &name).expect("open port 0");

    input.set_callback(|port, bytes, delta| {
        println!("[{port}] +{delta:.6}s {bytes:02X?}");
    })
    .expect("arm callback");
    input.cancel_callback().expect("cancel callback");

    // Polling works again after cancellation.
    let _ = input.message().expect("polling after cancel");
    input.close().expect("close");
}

#[cfg(unix)]
#[test]
#[ignore]
fn virtual_ports_round_trip_on_hardware_backend() {
    let mut input = MidiInput::new("coda-midi-test").expect("default input");
    input.open_virtual("coda-midi-virtual").expect("virtual input");

    // The virtual input must now be visible as an output destination.
    let output = MidiOutput::new("coda-midi-test").expect("default output");
    let count = output.port_count().expect("port count");
    let index = (0..count).find(|&i| {
        output
            .port_name(i)
            .map(|n| n.contains("coda-midi-virtual"))
            .unwrap_or(false)
    });
    assert!(index.is_some(), "virtual port not visible to outputs");

    let mut output = MidiOutput::new("coda-midi-test").expect("second output");
    output
        .open_port(index.unwrap(), "coda-midi-test")
        .expect("open virtual counterpart");
    output.send(&[0x90, 0x30, 0x60]).expect("send to virtual port");

    thread::sleep(Duration::from_millis(200));
    input.ignore_types(false, false, false).expect("ignore types");

    output.close().expect("close output");
    input.close().expect("close input");
}
