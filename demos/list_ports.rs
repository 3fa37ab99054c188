use coda_midi_io::{compiled_apis, MidiInput, MidiOutput, MidiPort, DEFAULT_QUEUE_CAPACITY};

fn main() {
    for api in compiled_apis() {
        println!("=== {api} ===");

        match MidiInput::with_api(api, "list-ports", DEFAULT_QUEUE_CAPACITY) {
            Ok(input) => list(&input, "input"),
            Err(err) => println!("  input unavailable: {err}"),
        }
        match MidiOutput::with_api(api, "list-ports") {
            Ok(output) => list(&output, "output"),
            Err(err) => println!("  output unavailable: {err}"),
        }
    }
}

fn list(port: &dyn MidiPort, kind: &str) {
    match port.port_count() {
        Ok(0) => println!("  ({kind}: none found)"),
        Ok(count) => {
            for index in 0..count {
                let name = port
                    .port_name(index)
                    .unwrap_or_else(|_| "?".into());
                println!("  {kind} [{index}] {name}");
            }
        }
        Err(err) => println!("  {kind} enumeration failed: {err}"),
    }
}
