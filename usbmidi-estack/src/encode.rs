// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Copyright (c) 2025 Code Construct
 */

//! USB-MIDI event packet encoding
//!
//! Channel arguments are MIDI channel numbers 1 to 16. Out of range
//! channels and data bytes are masked, encoding never fails.

#[allow(unused)]
use crate::fmt::{debug, error, info, trace, warn};

use usbmidi::{Channel, Cin, Packet, DATA_MASK, SYSEX_END, SYSEX_START};

/// A channel voice packet. `cin` also gives the status high nibble.
fn channel_voice(cin: Cin, channel: u8, d1: u8, d2: u8) -> Packet {
    let status = ((cin as u8) << 4) | Channel::from_number(channel).index();
    Packet::new(cin, status, d1 & DATA_MASK, d2 & DATA_MASK)
}

/// Note Off
pub fn note_off(note: u8, velocity: u8, channel: u8) -> Packet {
    channel_voice(Cin::NoteOff, channel, note, velocity)
}

/// Note On
pub fn note_on(note: u8, velocity: u8, channel: u8) -> Packet {
    channel_voice(Cin::NoteOn, channel, note, velocity)
}

/// Polyphonic key pressure
pub fn poly_pressure(note: u8, pressure: u8, channel: u8) -> Packet {
    channel_voice(Cin::PolyKeyPress, channel, note, pressure)
}

pub fn control_change(control: u8, value: u8, channel: u8) -> Packet {
    channel_voice(Cin::ControlChange, channel, control, value)
}

pub fn program_change(program: u8, channel: u8) -> Packet {
    channel_voice(Cin::ProgramChange, channel, program, 0)
}

/// Channel pressure
pub fn after_touch(pressure: u8, channel: u8) -> Packet {
    channel_voice(Cin::ChannelPressure, channel, pressure, 0)
}

/// Pitch bend, a 14-bit `value` with 0x2000 centered.
///
/// Bits above the low 14 are ignored.
pub fn pitch_bend(value: u16, channel: u8) -> Packet {
    channel_voice(Cin::PitchBend, channel, value as u8, (value >> 7) as u8)
}

/// A single System Real Time byte, such as Timing Clock (0xF8).
///
/// Sent as an unparsed single byte, the byte is not checked.
pub fn real_time(byte: u8) -> Packet {
    Packet::new(Cin::SingleByte, byte, 0, 0)
}

/// MIDI Time Code quarter frame
pub fn time_code_quarter_frame(value: u8) -> Packet {
    Packet::new(
        Cin::SystemCommon2,
        usbmidi::TIME_CODE_QUARTER_FRAME,
        value & DATA_MASK,
        0,
    )
}

/// Song Position Pointer, in MIDI beats (16th notes). 14 bits.
pub fn song_position(beats: u16) -> Packet {
    Packet::new(
        Cin::SystemCommon3,
        usbmidi::SONG_POSITION,
        beats as u8 & DATA_MASK,
        (beats >> 7) as u8 & DATA_MASK,
    )
}

pub fn song_select(song: u8) -> Packet {
    Packet::new(Cin::SystemCommon2, usbmidi::SONG_SELECT, song & DATA_MASK, 0)
}

pub fn tune_request() -> Packet {
    Packet::new(Cin::SysExEnd1, usbmidi::TUNE_REQUEST, 0, 0)
}

/// Splits a System Exclusive message into packets.
///
/// Each call to [`segment`](Self::segment) returns the next packet,
/// carrying up to 3 bytes. The same `data` must be passed to each call.
#[derive(Debug)]
pub struct SysExSegmenter {
    // Whether `data` includes 0xF0 and 0xF7 already
    has_term: bool,
    // Bytes of the framed message already sent
    used: usize,
    done: bool,
}

impl SysExSegmenter {
    /// Create a segmenter.
    ///
    /// With `has_term` set the data is sent as provided and must begin
    /// with 0xF0 and end with 0xF7. Otherwise `data` is the payload and
    /// framing is added.
    pub fn new(has_term: bool) -> Self {
        Self {
            has_term,
            used: 0,
            done: false,
        }
    }

    fn framed_len(&self, data: &[u8]) -> usize {
        if self.has_term {
            data.len()
        } else {
            data.len() + 2
        }
    }

    fn framed_byte(&self, data: &[u8], i: usize) -> u8 {
        if self.has_term {
            return data[i];
        }
        if i == 0 {
            SYSEX_START
        } else if i == data.len() + 1 {
            SYSEX_END
        } else {
            data[i - 1]
        }
    }

    /// Returns the next packet of the message, or `None` once complete.
    pub fn segment(&mut self, data: &[u8]) -> Option<Packet> {
        if self.done {
            return None;
        }

        let total = self.framed_len(data);
        if total < self.used {
            // Caller is passing varying data buffers
            debug!("sysex data changed while segmenting");
            self.done = true;
            return None;
        }

        let remaining = total - self.used;
        let (cin, n) = match remaining {
            0 => {
                self.done = true;
                return None;
            }
            1 => (Cin::SysExEnd1, 1),
            2 => (Cin::SysExEnd2, 2),
            3 => (Cin::SysExEnd3, 3),
            _ => (Cin::SysExStart, 3),
        };

        let mut b = [0u8; 3];
        for (i, v) in b.iter_mut().take(n).enumerate() {
            *v = self.framed_byte(data, self.used + i);
        }
        self.used += n;
        if self.used == total {
            self.done = true;
        }

        Some(Packet::new(cin, b[0], b[1], b[2]))
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}
