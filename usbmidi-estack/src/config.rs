// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Copyright (c) 2025 Code Construct
 */

//! Configuration.
//!
//! Buffer sizes are fixed at build time. They may be overridden by setting
//! environment variables when building, for example
//! `USBMIDI_SYSEX_MAX=256 cargo build`.

/// Takes a `usize` from a build-time environment variable.
///
/// If unset, the default is used. Can be used in a const context.
macro_rules! get_build_var {
    ($name:literal, $default:expr) => {{
        match option_env!($name) {
            Some(v) => {
                let Ok(v) = usize::from_str_radix(v, 10) else {
                    // concat! because const format_args isn't stable
                    panic!(concat!(
                        "Bad value for environment variable ",
                        $name
                    ));
                };
                v
            }
            None => $default,
        }
    }};
}

/// Maximum received SysEx payload length, excluding 0xF0/0xF7 framing.
///
/// Longer messages are truncated to this length.
/// Customise with `USBMIDI_SYSEX_MAX` environment variable.
pub const SYSEX_MAX: usize = get_build_var!("USBMIDI_SYSEX_MAX", 60);

/// Number of received packets queued by [`UsbMidiHandler`](crate::usb::UsbMidiHandler)
/// by default.
///
/// Customise with `USBMIDI_RX_QUEUE` environment variable.
pub const RX_QUEUE: usize = get_build_var!("USBMIDI_RX_QUEUE", 16);

const _: () = assert!(SYSEX_MAX > 0, "USBMIDI_SYSEX_MAX must be non-zero");
const _: () = assert!(RX_QUEUE > 0, "USBMIDI_RX_QUEUE must be non-zero");

/// Runtime receive options for [`UsbMidi`](crate::UsbMidi).
#[derive(Debug, Default, Clone, Copy)]
pub struct Config {
    /// Report a Note On with zero velocity as Note Off.
    ///
    /// The MIDI 1.0 running status convention sends Note Off as a Note On
    /// with velocity 0. When unset the event is reported as it was
    /// received on the wire.
    pub note_on_zero_as_note_off: bool,
}
