use std::env;
use std::fs;
use std::process;
use std::str::FromStr;

use utau_core::DEFAULT_TIME_OFFSET_US;
use utau_domain_score::{decode_lyric_timeline, mute_channel, normalize_timeline, Gakufu};
use utau_infra_audio_cpal::CpalToneOutput;
use utau_ports::audio::ToneOutputPort;

fn usage() {
    eprintln!("Usage: utau notes <input.mid> [track] [channel] [intro_us] [pitch_offset]");
    eprintln!("       utau mute <input.mid> <output.mid> [track] [channel]");
    eprintln!("       utau devices");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "notes" => notes(&args[2..]),
        "mute" => mute(&args[2..]),
        "devices" => devices(),
        other => {
            eprintln!("Unknown command '{}'", other);
            usage();
            process::exit(1);
        }
    }
}

fn parse_or<T: FromStr>(value: Option<&String>, default: T, what: &str) -> T {
    match value {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                eprintln!("Invalid {} '{}'", what, raw);
                process::exit(1);
            }
        },
    }
}

fn read_midi(path: &str) -> Vec<u8> {
    match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn notes(args: &[String]) {
    let Some(input_path) = args.first() else {
        usage();
        process::exit(1);
    };
    let track = parse_or(args.get(1), 0usize, "track");
    let channel = parse_or(args.get(2), 0u8, "channel");
    let intro_time = parse_or(args.get(3), 0i64, "intro time");
    let pitch_offset = parse_or(args.get(4), 0i32, "pitch offset");

    let data = read_midi(input_path);
    let timeline = match decode_lyric_timeline(&data, track, channel) {
        Ok(timeline) => timeline,
        Err(e) => {
            eprintln!("Decode error: {}", e);
            process::exit(1);
        }
    };

    // Rebase the decoded epoch onto the backing media's intro and apply
    // any transposition before serializing.
    let timeline = normalize_timeline(&timeline, intro_time, pitch_offset);
    let gakufu = Gakufu::from_notes(&timeline, None, DEFAULT_TIME_OFFSET_US);
    match serde_json::to_string(&gakufu) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Serialization error: {}", e);
            process::exit(1);
        }
    }
}

fn mute(args: &[String]) {
    let (Some(input_path), Some(output_path)) = (args.first(), args.get(1)) else {
        usage();
        process::exit(1);
    };
    let track = parse_or(args.get(2), 0usize, "track");
    let channel = parse_or(args.get(3), 0u8, "channel");

    let data = read_midi(input_path);
    let muted = match mute_channel(&data, track, channel) {
        Ok(muted) => muted,
        Err(e) => {
            eprintln!("Mute error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = fs::write(output_path, &muted) {
        eprintln!("Error writing to '{}': {}", output_path, e);
        process::exit(1);
    }
    eprintln!("Wrote muted MIDI to {}", output_path);
}

fn devices() {
    let port = CpalToneOutput::new();
    let outputs = match port.list_outputs() {
        Ok(outputs) => outputs,
        Err(e) => {
            eprintln!("Error listing output devices: {}", e);
            process::exit(1);
        }
    };

    if outputs.is_empty() {
        eprintln!("No output devices found");
        return;
    }
    for device in outputs {
        println!("{}\t{}", device.id, device.name);
    }
}
