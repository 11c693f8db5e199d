// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Copyright (c) 2025 Code Construct
 */

//! Decode USB-MIDI event packets
//!
//! Packets are given as hex words in wire byte order, for example
//! ```text
//! decode 09903c40 0f-f8-00-00
//! ```
//! or read from a raw capture of bulk transfer data with `--file`.

#[allow(unused)]
use log::{debug, error, info, trace, warn};

use anyhow::{bail, Context, Result};
use log::LevelFilter;

use usbmidi_estack::usb::{UsbMidiHandler, UsbMidiXfer, USB_MIDI_MAX_PACKET};
use usbmidi_estack::{Event, Packet, UsbMidi};

/** USB-MIDI packet decoder
 */
#[derive(argh::FromArgs)]
struct Args {
    #[argh(switch, short = 'v')]
    /// verbose
    verbose: bool,

    #[argh(switch)]
    /// trace, extra verbose
    trace: bool,

    #[argh(switch)]
    /// report Note On with velocity 0 as Note Off
    note_off: bool,

    #[argh(option, short = 'f')]
    /// raw capture file
    file: Option<String>,

    #[argh(positional)]
    /// packets as 8 hex digits
    packets: Vec<String>,
}

/// Decoding only, nothing is sent.
struct NoSend;

impl UsbMidiXfer for NoSend {
    fn send_xfer(&mut self, _buf: &[u8]) -> usbmidi_estack::Result<()> {
        Ok(())
    }
}

fn parse_packet(s: &str) -> Result<Packet> {
    let hex: String = s.chars().filter(|c| !matches!(c, '-' | ':' | ' ')).collect();
    if hex.len() != 8 {
        bail!("Packet '{s}' must be 4 bytes");
    }
    let mut b = [0u8; 4];
    for (i, v) in b.iter_mut().enumerate() {
        *v = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .with_context(|| format!("Bad hex '{s}'"))?;
    }
    Ok(Packet::from_bytes(b))
}

fn print_event(ev: &Event, sysex: &[u8]) {
    match ev {
        Event::SystemExclusive { len } => {
            println!("SysEx len {len}: {sysex:02x?}")
        }
        Event::RealTime(b) => println!("Real time {b:02x}"),
        Event::SystemCommon {
            status,
            data1,
            data2,
        } => println!("System common {status:02x} {data1:02x} {data2:02x}"),
        ev => {
            // channel voice
            let ch = ev.channel().map(|c| c.number()).unwrap_or(0);
            println!(
                "{:?} channel {ch} data {:02x} {:02x}",
                ev.kind(),
                ev.data1(),
                ev.data2()
            )
        }
    }
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let level = if args.trace {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let conf = simplelog::ConfigBuilder::new().build();
    simplelog::SimpleLogger::init(level, conf)?;

    let config = usbmidi_estack::Config {
        note_on_zero_as_note_off: args.note_off,
    };
    let mut midi = UsbMidi::with_config(UsbMidiHandler::<_>::new(NoSend), config);

    let mut n = 0;
    if let Some(f) = &args.file {
        let d = std::fs::read(f).with_context(|| format!("Reading {f}"))?;
        info!("{} bytes from {}", d.len(), f);
        for xfer in d.chunks(USB_MIDI_MAX_PACKET) {
            if let Err(e) = midi.transport_mut().receive_xfer(xfer) {
                warn!("Transfer: {e}");
            }
            while midi.transport().rx_pending() > 0 {
                n += 1;
                if midi.read(0) {
                    if let Some(ev) = midi.event() {
                        print_event(&ev, midi.sysex_array());
                    }
                }
            }
        }
    }

    for p in &args.packets {
        let packet = parse_packet(p)?;
        debug!("{packet:?}");
        n += 1;
        if let Some(ev) = midi.receive(packet) {
            print_event(&ev, midi.sysex_array());
        }
        // Consume, the event has been printed
        midi.read(0);
    }

    let stats = midi.stats();
    info!("{n} packets, {stats:?}");

    if n == 0 {
        bail!("No packets, pass hex words or --file");
    }
    Ok(())
}
