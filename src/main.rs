use std::env;

use cofdmtv::decoder::{Channel, Decoder, Status};
use cofdmtv::visual::VisualBuffers;
use tracing::{info, warn};

/// Feed a WAV recording through the decoder, reporting every burst
/// and hex-dumping fetched payloads.
fn main() {
    cofdmtv::tracing_init::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <recording.wav> [channel]", args[0]);
        eprintln!("  channel: mono (default), left, right, sum, iq");
        std::process::exit(1);
    }

    let mut reader = match hound::WavReader::open(&args[1]) {
        Ok(reader) => reader,
        Err(err) => {
            eprintln!("cannot open {}: {err}", args[1]);
            std::process::exit(1);
        }
    };
    let spec = reader.spec();
    info!(
        rate = spec.sample_rate,
        channels = spec.channels,
        "reading {}",
        args[1]
    );

    let channel = match args.get(2).map(String::as_str) {
        None | Some("mono") => Channel::Mono,
        Some("left") => Channel::Left,
        Some("right") => Channel::Right,
        Some("sum") => Channel::Sum,
        Some("iq") => Channel::Iq,
        Some(other) => {
            eprintln!("unknown channel selection: {other}");
            std::process::exit(1);
        }
    };

    let mut decoder = match Decoder::new(spec.sample_rate) {
        Ok(decoder) => decoder,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .unwrap_or_else(|err| {
            eprintln!("cannot read samples: {err}");
            std::process::exit(1);
        });

    let extended = (1280 * spec.sample_rate as usize) / 8000 * 9 / 8;
    let block = match channel {
        Channel::Mono => extended,
        _ => 2 * extended,
    };

    let mut view = VisualBuffers::new();
    let mut payload = vec![0u8; 5380];
    let mut bursts = 0usize;

    for chunk in samples.chunks_exact(block) {
        match decoder.process(&mut view, chunk, channel) {
            Status::Okay => {}
            Status::Sync => {
                let meta = decoder.cached();
                info!(
                    mode = meta.mode,
                    cfo_hz = meta.cfo_hz,
                    call = %String::from_utf8_lossy(&meta.call).trim_start(),
                    "burst locked"
                );
            }
            Status::Done => {
                bursts += 1;
                if decoder.fetch(&mut payload) {
                    info!("payload recovered ({} bytes)", payload.len());
                    for line in payload.chunks(32).take(8) {
                        let hex: String = line.iter().map(|b| format!("{b:02x}")).collect();
                        println!("{hex}");
                    }
                } else {
                    warn!("payload unrecoverable, no list survivor passed the checksum");
                }
            }
            Status::Fail => warn!("preamble decode failed"),
            Status::Nope => warn!("preamble rejected (mode or call sign out of range)"),
            Status::Heap => unreachable!("decoder constructed"),
        }
    }

    info!(bursts, "done");
}
