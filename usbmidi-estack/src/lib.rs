// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Copyright (c) 2024-2025 Code Construct
 */

//! USB-MIDI Stack
//!
//! This crate provides a USB-MIDI event packet stack that can be embedded in
//! devices acting as a USB MIDI peripheral. A [`UsbMidi`] encodes outgoing
//! MIDI messages to USB-MIDI packets, and decodes incoming packets,
//! reassembling System Exclusive messages. It is independent of any
//! particular USB device stack, packets move through a [`Transport`].
//!
//! Received events are available either by polling with
//! [`read()`](UsbMidi::read), or through callbacks registered with the
//! `set_handle_...()` functions. Both observe the same decoded event.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![forbid(unsafe_code)]

// Defined first so that the macros are available to other modules
pub(crate) mod fmt;

#[allow(unused)]
use crate::fmt::{debug, error, info, trace, warn};

/// Re-exported so that callers can use the same `heapless` version.
pub use heapless::Vec;

pub use usbmidi::{Channel, Cin, Error, Event, EventKind, Packet, Result, Transport};

pub mod config;
pub mod encode;
pub mod handlers;
mod reassemble;
pub mod usb;

pub use config::{Config, SYSEX_MAX};
pub use encode::SysExSegmenter;
pub use handlers::Handlers;

use handlers::*;
use reassemble::Reassembler;
use usbmidi::{DATA_MASK, REAL_TIME_MIN, SYSEX_END, SYSEX_START};

/// Counters for received packets that were discarded or truncated.
///
/// Malformed input isn't reported to callers of [`UsbMidi::read`],
/// these allow it to be observed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Packets dropped with a reserved CIN, a mismatched status byte,
    /// or SysEx data outside of a message.
    pub invalid_packets: u32,
    /// SysEx messages that exceeded [`SYSEX_MAX`]
    pub sysex_truncated: u32,
    /// Total SysEx payload bytes dropped
    pub sysex_overflow: u32,
}

/// A USB-MIDI device endpoint.
///
/// Holds the single pending received event, the SysEx reassembly buffer,
/// and the registered callbacks. Received events are held in a depth-1
/// mailbox: an event that hasn't been [`read`](Self::read) is
/// overwritten by the next one.
pub struct UsbMidi<'h, T: Transport> {
    transport: T,
    config: Config,

    // Most recently decoded event
    last: Option<Event>,
    // Set when `last` hasn't been consumed by read()
    pending: bool,

    sysex: Reassembler,
    // Kept outside of the Reassembler so it can be borrowed alongside
    // the handlers.
    sysex_buf: Vec<u8, SYSEX_MAX>,

    handlers: Handlers<'h>,
    stats: Stats,
}

impl<'h, T: Transport> UsbMidi<'h, T> {
    /// Create a new `UsbMidi` with default [`Config`].
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, Config::default())
    }

    pub fn with_config(transport: T, config: Config) -> Self {
        Self {
            transport,
            config,
            last: None,
            pending: false,
            sysex: Reassembler::new(),
            sysex_buf: Vec::new(),
            handlers: Handlers::default(),
            stats: Stats::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Returns the transport, consuming the `UsbMidi`.
    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Send a Note Off. `channel` is 1 to 16.
    pub fn send_note_off(&mut self, note: u8, velocity: u8, channel: u8) -> Result<()> {
        self.transport.write_packed(encode::note_off(note, velocity, channel))
    }

    /// Send a Note On. `channel` is 1 to 16.
    pub fn send_note_on(&mut self, note: u8, velocity: u8, channel: u8) -> Result<()> {
        self.transport.write_packed(encode::note_on(note, velocity, channel))
    }

    /// Send a polyphonic key pressure. `channel` is 1 to 16.
    pub fn send_poly_pressure(&mut self, note: u8, pressure: u8, channel: u8) -> Result<()> {
        self.transport.write_packed(encode::poly_pressure(note, pressure, channel))
    }

    /// Send a Control Change. `channel` is 1 to 16.
    pub fn send_control_change(&mut self, control: u8, value: u8, channel: u8) -> Result<()> {
        self.transport.write_packed(encode::control_change(control, value, channel))
    }

    /// Send a Program Change. `channel` is 1 to 16.
    pub fn send_program_change(&mut self, program: u8, channel: u8) -> Result<()> {
        self.transport.write_packed(encode::program_change(program, channel))
    }

    /// Send a channel pressure. `channel` is 1 to 16.
    pub fn send_after_touch(&mut self, pressure: u8, channel: u8) -> Result<()> {
        self.transport.write_packed(encode::after_touch(pressure, channel))
    }

    /// Send a Pitch Bend with a 14-bit `value`. `channel` is 1 to 16.
    pub fn send_pitch_bend(&mut self, value: u16, channel: u8) -> Result<()> {
        self.transport.write_packed(encode::pitch_bend(value, channel))
    }

    /// Send a System Exclusive message.
    ///
    /// If `has_term` is set, `data` must already begin with 0xF0 and end
    /// with 0xF7. Otherwise the framing bytes are added.
    ///
    /// Each packet is passed to the transport as it is produced. An error
    /// part way through leaves a partial message sent.
    pub fn send_sysex(&mut self, data: &[u8], has_term: bool) -> Result<()> {
        let mut segmenter = SysExSegmenter::new(has_term);
        while let Some(p) = segmenter.segment(data) {
            self.transport.write_packed(p)?;
        }
        Ok(())
    }

    /// Send a System Real Time byte (0xF8 to 0xFF).
    pub fn send_real_time(&mut self, byte: u8) -> Result<()> {
        self.transport.write_packed(encode::real_time(byte))
    }

    pub fn send_time_code_quarter_frame(&mut self, value: u8) -> Result<()> {
        self.transport.write_packed(encode::time_code_quarter_frame(value))
    }

    pub fn send_song_position(&mut self, beats: u16) -> Result<()> {
        self.transport.write_packed(encode::song_position(beats))
    }

    pub fn send_song_select(&mut self, song: u8) -> Result<()> {
        self.transport.write_packed(encode::song_select(song))
    }

    pub fn send_tune_request(&mut self) -> Result<()> {
        self.transport.write_packed(encode::tune_request())
    }

    /// Send any packets buffered by the transport immediately.
    pub fn send_now(&mut self) -> Result<()> {
        self.transport.flush()
    }

    /// Read a received event.
    ///
    /// If no decoded event is pending, a single packet is taken from the
    /// transport and decoded. Returns `true` when an event is available,
    /// its contents can then be retrieved with [`kind()`](Self::kind),
    /// [`channel()`](Self::channel) etc.
    ///
    /// `channel` filters channel voice events by MIDI channel number (1-16),
    /// or `0` accepts any channel. An event for another channel is
    /// consumed and lost. System events are not filtered.
    ///
    /// Returns `false` when nothing is available, including part way
    /// through a SysEx message.
    ///
    /// A pending [`Event::SystemExclusive`] shares the reassembly buffer
    /// with the next message. If a new 0xF0 start arrives before the event
    /// is read, [`sysex_array()`](Self::sysex_array) is empty while the
    /// event still reports the previous length. Register a
    /// [`set_handle_sysex`](Self::set_handle_sysex) handler to see every
    /// payload.
    pub fn read(&mut self, channel: u8) -> bool {
        if !self.pending {
            let Some(packet) = self.transport.read_packed() else {
                return false;
            };
            self.receive(packet);
        }
        self.take_pending(channel)
    }

    fn take_pending(&mut self, channel: u8) -> bool {
        if !core::mem::take(&mut self.pending) {
            return false;
        }
        let Some(event) = self.last else {
            return false;
        };

        match event.channel() {
            Some(ch) if channel != 0 && ch.number() != channel => {
                trace!("discarding event for channel {}", ch.number());
                false
            }
            _ => true,
        }
    }

    /// Receive a packet.
    ///
    /// The decoded event replaces the pending event and is passed to any
    /// registered handler before returning. This may be called directly
    /// by a transport that delivers packets itself, for example from a
    /// USB interrupt, rather than being polled by [`read`](Self::read).
    ///
    /// Returns the decoded event, or `None` if the packet didn't complete
    /// an event. Malformed packets are dropped and counted in [`stats`](Self::stats).
    pub fn receive(&mut self, packet: Packet) -> Option<Event> {
        let event = match self.decode(packet) {
            Ok(Some(e)) => e,
            Ok(None) => return None,
            Err(e) => {
                self.stats.invalid_packets = self.stats.invalid_packets.wrapping_add(1);
                debug!("Dropped {:?}: {:?}", packet, e);
                return None;
            }
        };

        if self.pending {
            trace!("Unread event overwritten");
        }
        self.last = Some(event);
        self.pending = true;

        let sysex = self.sysex.message(&self.sysex_buf);
        self.handlers.dispatch(&event, sysex);
        Some(event)
    }

    fn decode(&mut self, packet: Packet) -> Result<Option<Event>> {
        let cin = packet.cin();
        let status = packet.status();

        match cin {
            Cin::Misc | Cin::CableEvent => Err(Error::Unsupported),

            Cin::NoteOff
            | Cin::NoteOn
            | Cin::PolyKeyPress
            | Cin::ControlChange
            | Cin::ProgramChange
            | Cin::ChannelPressure
            | Cin::PitchBend => self.channel_voice(cin, packet).map(Some),

            Cin::SysExStart => {
                let [_, b1, b2, b3] = packet.to_bytes();
                self.sysex_bytes(&[b1, b2, b3], false)
            }

            // Single byte System Common (Tune Request) shares CIN 0x5
            Cin::SysExEnd1
                if !self.sysex.is_active()
                    && status != SYSEX_START
                    && status != SYSEX_END =>
            {
                Self::system_common(status, 0, 0)
            }

            Cin::SysExEnd1 | Cin::SysExEnd2 | Cin::SysExEnd3 => {
                let b = packet.to_bytes();
                self.sysex_bytes(&b[1..=cin.midi_len()], true)
            }

            Cin::SingleByte => {
                if status >= REAL_TIME_MIN || !self.sysex.is_active() {
                    // Real time bytes may be interleaved with SysEx packets,
                    // they leave reassembly untouched.
                    Ok(Some(Event::RealTime(status)))
                } else {
                    // Some hosts send SysEx as single bytes
                    self.sysex_bytes(&[status], false)
                }
            }

            Cin::SystemCommon2 => Self::system_common(status, packet.data1(), 0),
            Cin::SystemCommon3 => Self::system_common(status, packet.data1(), packet.data2()),
        }
    }

    fn channel_voice(&self, cin: Cin, packet: Packet) -> Result<Event> {
        let status = packet.status();
        if status >> 4 != cin as u8 {
            trace!("CIN {:?} with status {:02x}", cin, status);
            return Err(Error::InvalidInput);
        }

        let channel = Channel::from_index(status);
        let d1 = packet.data1() & DATA_MASK;
        let d2 = packet.data2() & DATA_MASK;

        let event = match cin {
            Cin::NoteOff => Event::NoteOff {
                channel,
                note: d1,
                velocity: d2,
            },
            Cin::NoteOn if d2 == 0 && self.config.note_on_zero_as_note_off => Event::NoteOff {
                channel,
                note: d1,
                velocity: 0,
            },
            Cin::NoteOn => Event::NoteOn {
                channel,
                note: d1,
                velocity: d2,
            },
            Cin::PolyKeyPress => Event::PolyPressure {
                channel,
                note: d1,
                pressure: d2,
            },
            Cin::ControlChange => Event::ControlChange {
                channel,
                control: d1,
                value: d2,
            },
            Cin::ProgramChange => Event::ProgramChange {
                channel,
                program: d1,
            },
            Cin::ChannelPressure => Event::ChannelPressure {
                channel,
                pressure: d1,
            },
            Cin::PitchBend => Event::PitchBend {
                channel,
                value: d1 as u16 | (d2 as u16) << 7,
            },
            _ => return Err(Error::InvalidInput),
        };
        Ok(event)
    }

    fn system_common(status: u8, data1: u8, data2: u8) -> Result<Option<Event>> {
        // 0xF0 and 0xF7 are SysEx framing, handled elsewhere
        if status & 0xf0 != 0xf0 || status == SYSEX_START || status == SYSEX_END {
            return Err(Error::InvalidInput);
        }
        Ok(Some(Event::SystemCommon {
            status,
            data1: data1 & DATA_MASK,
            data2: data2 & DATA_MASK,
        }))
    }

    fn sysex_bytes(&mut self, bytes: &[u8], end: bool) -> Result<Option<Event>> {
        let Some(len) = self.sysex.receive(bytes, end, &mut self.sysex_buf)? else {
            return Ok(None);
        };

        let overflow = self.sysex.overflow();
        if overflow > 0 {
            self.stats.sysex_truncated = self.stats.sysex_truncated.wrapping_add(1);
            let overflow = u32::try_from(overflow).unwrap_or(u32::MAX);
            self.stats.sysex_overflow = self.stats.sysex_overflow.saturating_add(overflow);
        }
        Ok(Some(Event::SystemExclusive { len }))
    }

    /// Returns the most recently decoded event.
    pub fn event(&self) -> Option<Event> {
        self.last
    }

    /// Returns the kind of the most recently decoded event.
    pub fn kind(&self) -> Option<EventKind> {
        self.last.map(|e| e.kind())
    }

    /// Returns the channel of the most recently decoded event.
    ///
    /// `None` for system events.
    pub fn channel(&self) -> Option<Channel> {
        self.last.and_then(|e| e.channel())
    }

    /// See [`Event::data1`]
    pub fn data1(&self) -> u8 {
        self.last.map(|e| e.data1()).unwrap_or(0)
    }

    /// See [`Event::data2`]
    pub fn data2(&self) -> u8 {
        self.last.map(|e| e.data2()).unwrap_or(0)
    }

    /// Returns the payload of the last complete SysEx message.
    ///
    /// Empty while a new message is being received, even if the previous
    /// message's event hasn't been read yet.
    pub fn sysex_array(&self) -> &[u8] {
        self.sysex.message(&self.sysex_buf)
    }

    /// Set or clear the Note Off handler
    pub fn set_handle_note_off(&mut self, handler: Option<NoteHandler<'h>>) {
        self.handlers.note_off = handler;
    }

    /// Set or clear the Note On handler
    pub fn set_handle_note_on(&mut self, handler: Option<NoteHandler<'h>>) {
        self.handlers.note_on = handler;
    }

    /// Set or clear the polyphonic key pressure handler
    pub fn set_handle_velocity_change(&mut self, handler: Option<NoteHandler<'h>>) {
        self.handlers.velocity_change = handler;
    }

    pub fn set_handle_control_change(&mut self, handler: Option<ControlChangeHandler<'h>>) {
        self.handlers.control_change = handler;
    }

    pub fn set_handle_program_change(&mut self, handler: Option<ProgramChangeHandler<'h>>) {
        self.handlers.program_change = handler;
    }

    /// Set or clear the channel pressure handler
    pub fn set_handle_after_touch(&mut self, handler: Option<AfterTouchHandler<'h>>) {
        self.handlers.after_touch = handler;
    }

    /// Set or clear the pitch bend handler
    pub fn set_handle_pitch_change(&mut self, handler: Option<PitchChangeHandler<'h>>) {
        self.handlers.pitch_change = handler;
    }

    /// Set or clear the handler for real time bytes.
    ///
    /// Also receives unparsed single bytes outside of a SysEx message.
    pub fn set_handle_real_time_system(&mut self, handler: Option<RealTimeSystemHandler<'h>>) {
        self.handlers.real_time_system = handler;
    }

    /// Set or clear the handler for complete SysEx messages.
    pub fn set_handle_sysex(&mut self, handler: Option<SysExHandler<'h>>) {
        self.handlers.sysex = handler;
    }

    pub fn set_handle_system_common(&mut self, handler: Option<SystemCommonHandler<'h>>) {
        self.handlers.system_common = handler;
    }

    pub fn handlers(&self) -> &Handlers<'h> {
        &self.handlers
    }
}

impl<T: Transport + core::fmt::Debug> core::fmt::Debug for UsbMidi<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UsbMidi")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .field("last", &self.last)
            .field("pending", &self.pending)
            .field("sysex", &self.sysex)
            .field("sysex length", &self.sysex_buf.len())
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Inbound packets only, writes are discarded
    #[derive(Debug, Default)]
    struct Inbound(VecDeque<Packet>);

    impl Transport for Inbound {
        fn write_packed(&mut self, _packet: Packet) -> Result<()> {
            Ok(())
        }

        fn read_packed(&mut self) -> Option<Packet> {
            self.0.pop_front()
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn start_log() {
        let _ = env_logger::Builder::new()
            .filter(None, log::LevelFilter::Trace)
            .is_test(true)
            .try_init();
    }

    fn midi<'h>(packets: &[[u8; 4]]) -> UsbMidi<'h, Inbound> {
        start_log();
        let q = packets.iter().map(|b| Packet::from_bytes(*b)).collect();
        UsbMidi::new(Inbound(q))
    }

    #[test]
    fn reserved_cin_dropped() {
        let mut m = midi(&[[0x00, 0x90, 1, 2], [0x01, 0x90, 1, 2], [0x09, 0x90, 1, 2]]);
        assert!(!m.read(0));
        assert!(!m.read(0));
        assert!(m.read(0));
        assert_eq!(m.kind(), Some(EventKind::NoteOn));
        assert_eq!(m.stats().invalid_packets, 2);
    }

    #[test]
    fn status_mismatch_dropped() {
        // CIN says Note On, status is Control Change
        let mut m = midi(&[[0x09, 0xb0, 1, 2]]);
        assert!(!m.read(0));
        assert_eq!(m.event(), None);
        assert_eq!(m.stats().invalid_packets, 1);
    }

    #[test]
    fn cable_number_ignored() {
        let mut m = midi(&[[0x3b, 0xb5, 7, 99]]);
        assert!(m.read(0));
        assert_eq!(
            m.event(),
            Some(Event::ControlChange {
                channel: Channel::from_number(6),
                control: 7,
                value: 99,
            })
        );
    }

    #[test]
    fn note_on_zero_velocity() {
        let mut m = midi(&[[0x09, 0x90, 60, 0], [0x09, 0x90, 60, 0]]);
        assert!(m.read(0));
        assert_eq!(m.kind(), Some(EventKind::NoteOn));

        m.set_config(Config {
            note_on_zero_as_note_off: true,
        });
        assert!(m.read(0));
        assert_eq!(m.kind(), Some(EventKind::NoteOff));
        assert_eq!(m.data1(), 60);
    }

    #[test]
    fn channel_filter() {
        let mut m = midi(&[
            [0x09, 0x93, 1, 1],
            [0x09, 0x94, 2, 2],
            [0x0f, 0xf8, 0, 0],
        ]);
        // Channel 4 event is consumed by a read for channel 5
        assert!(!m.read(5));
        assert!(m.read(5));
        assert_eq!(m.channel(), Some(Channel::from_number(5)));
        assert_eq!(m.data1(), 2);
        // Real time isn't filtered
        assert!(m.read(5));
        assert_eq!(m.kind(), Some(EventKind::RealTimeSystem));
        assert_eq!(m.channel(), None);
        assert!(!m.read(0));
    }

    #[test]
    fn system_common() {
        let mut m = midi(&[
            [0x02, 0xf1, 0x23, 0],
            [0x03, 0xf2, 0x10, 0x20],
            [0x02, 0xf3, 5, 0],
            [0x05, 0xf6, 0, 0],
            // Not a system status
            [0x02, 0x91, 5, 0],
        ]);
        assert!(m.read(0));
        assert_eq!(
            m.event(),
            Some(Event::SystemCommon {
                status: 0xf1,
                data1: 0x23,
                data2: 0
            })
        );
        assert!(m.read(0));
        assert_eq!((m.data1(), m.data2()), (0x10, 0x20));
        assert!(m.read(0));
        assert_eq!(m.data1(), 5);
        assert!(m.read(0));
        assert_eq!(
            m.event(),
            Some(Event::SystemCommon {
                status: 0xf6,
                data1: 0,
                data2: 0
            })
        );
        assert!(!m.read(0));
        assert_eq!(m.stats().invalid_packets, 1);
    }

    #[test]
    fn sysex_single_bytes() {
        // macOS may send SysEx bytes as unparsed single bytes
        let mut m = midi(&[
            [0x0f, 0xf0, 0, 0],
            [0x0f, 0x41, 0, 0],
            [0x0f, 0x10, 0, 0],
            [0x0f, 0xf7, 0, 0],
        ]);
        assert!(m.read(0));
        assert_eq!(m.kind(), Some(EventKind::RealTimeSystem));
        assert_eq!(m.data1(), 0xf0);
        // The 0xf0 above was reported as real time, not a start.
        assert!(m.read(0));
        assert!(m.read(0));
        assert!(m.read(0));
        assert!(m.sysex_array().is_empty());

        // Started with a SysEx start packet, single bytes continue it
        let mut m = midi(&[
            [0x04, 0xf0, 0x41, 0x10],
            [0x0f, 0x42, 0, 0],
            [0x0f, 0xf7, 0, 0],
        ]);
        assert!(!m.read(0));
        assert!(!m.read(0));
        assert!(m.read(0));
        assert_eq!(m.kind(), Some(EventKind::SystemExclusive));
        assert_eq!(m.sysex_array(), &[0x41, 0x10, 0x42]);
    }

    #[test]
    fn sysex_restart() {
        let mut m = midi(&[
            [0x04, 0xf0, 1, 2],
            [0x04, 0xf0, 7, 8],
            [0x06, 9, 0xf7, 0],
        ]);
        assert!(!m.read(0));
        assert!(!m.read(0));
        assert!(m.read(0));
        assert_eq!(m.sysex_array(), &[7, 8, 9]);
        assert_eq!(m.data1(), 3);
    }

    #[test]
    fn sysex_continuation_without_start() {
        let mut m = midi(&[[0x04, 1, 2, 3], [0x06, 4, 0xf7, 0]]);
        assert!(!m.read(0));
        assert!(!m.read(0));
        assert_eq!(m.event(), None);
        assert_eq!(m.stats().invalid_packets, 2);
    }

    #[test]
    fn sysex_truncation_stats() {
        let mut packets = vec![[0x04, 0xf0, 0x01, 0x02]];
        // 3 bytes per packet beyond the capacity
        for _ in 0..(SYSEX_MAX / 3 + 2) {
            packets.push([0x04, 0x11, 0x22, 0x33]);
        }
        packets.push([0x05, 0xf7, 0, 0]);
        let n = packets.len();
        let mut m = midi(&packets);
        for _ in 0..n - 1 {
            assert!(!m.read(0));
        }
        assert!(m.read(0));
        assert_eq!(m.sysex_array().len(), SYSEX_MAX);
        let total = 2 + 3 * (SYSEX_MAX / 3 + 2);
        assert_eq!(
            m.stats(),
            Stats {
                invalid_packets: 0,
                sysex_truncated: 1,
                sysex_overflow: (total - SYSEX_MAX) as u32,
            }
        );
    }

    #[test]
    fn handlers_replaced_and_cleared() {
        use core::cell::Cell;

        let first = Cell::new(0);
        let second = Cell::new(0);
        let f1 = |_: Channel, _: u8| first.set(first.get() + 1);
        let f2 = |_: Channel, _: u8| second.set(second.get() + 1);

        let mut m = midi(&[
            [0x0c, 0xc0, 1, 0],
            [0x0c, 0xc0, 2, 0],
            [0x0c, 0xc0, 3, 0],
        ]);
        m.set_handle_program_change(Some(&f1));
        assert!(m.read(0));
        m.set_handle_program_change(Some(&f2));
        assert!(m.read(0));
        m.set_handle_program_change(None);
        assert!(m.read(0));
        assert_eq!(m.data1(), 3);

        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn pressure_packets() {
        let mut m = midi(&[[0x0a, 0xa2, 60, 33], [0x0d, 0xd3, 77, 0]]);
        assert!(m.read(0));
        assert_eq!(
            m.event(),
            Some(Event::PolyPressure {
                channel: Channel::from_number(3),
                note: 60,
                pressure: 33,
            })
        );
        assert_eq!(m.kind(), Some(EventKind::PolyPressure));
        assert!(m.read(4));
        assert_eq!(
            m.event(),
            Some(Event::ChannelPressure {
                channel: Channel::from_number(4),
                pressure: 77,
            })
        );
        assert_eq!((m.data1(), m.data2()), (77, 0));
    }

    #[test]
    fn unread_sysex_superseded() {
        use core::cell::RefCell;

        let seen = RefCell::new(std::vec::Vec::new());
        let sysex = |d: &[u8]| seen.borrow_mut().push(d.to_vec());

        let mut m = midi(&[]);
        m.set_handle_sysex(Some(&sysex));
        m.receive(Packet::from_bytes([0x07, 0xf0, 0x11, 0xf7]));
        m.receive(Packet::from_bytes([0x04, 0xf0, 0x22, 0x33]));

        // The event is still pending, its payload buffer is being reused
        assert!(m.read(0));
        assert_eq!(m.event(), Some(Event::SystemExclusive { len: 1 }));
        assert_eq!(m.data1(), 1);
        assert!(m.sysex_array().is_empty());

        m.receive(Packet::from_bytes([0x06, 0x44, 0xf7, 0]));
        assert!(m.read(0));
        assert_eq!(m.sysex_array(), &[0x22, 0x33, 0x44]);

        // The handler saw both payloads
        assert_eq!(*seen.borrow(), [vec![0x11u8], vec![0x22, 0x33, 0x44]]);
    }

    #[test]
    fn empty_transport() {
        let mut m = midi(&[]);
        assert!(!m.read(0));
        assert_eq!(m.kind(), None);
        assert_eq!(m.channel(), None);
        assert_eq!((m.data1(), m.data2()), (0, 0));
        assert!(m.sysex_array().is_empty());
    }
}
