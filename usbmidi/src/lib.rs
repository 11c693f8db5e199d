// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * USB-MIDI common types and traits.
 *
 * Copyright (c) 2025 Code Construct
 */

// Tests may use std
#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # USB-MIDI event packets
//!
//! This crate provides common types and traits for the USB Device Class
//! Definition for MIDI Devices 1.0, "USB-MIDI Event Packets".
//! Transport implementations can implement [`Transport`] to carry packets
//! to and from a USB endpoint.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// System Exclusive start status byte
pub const SYSEX_START: u8 = 0xf0;
/// System Exclusive end (EOX) status byte
pub const SYSEX_END: u8 = 0xf7;
/// MIDI Time Code quarter frame status byte
pub const TIME_CODE_QUARTER_FRAME: u8 = 0xf1;
/// Song Position Pointer status byte
pub const SONG_POSITION: u8 = 0xf2;
/// Song Select status byte
pub const SONG_SELECT: u8 = 0xf3;
/// Tune Request status byte
pub const TUNE_REQUEST: u8 = 0xf6;
/// Lowest System Real Time status byte (Timing Clock)
pub const REAL_TIME_MIN: u8 = 0xf8;

/// Mask for a MIDI data byte
pub const DATA_MASK: u8 = 0x7f;
/// Maximum 14-bit value, for pitch bend and song position
pub const VALUE14_MAX: u16 = 0x3fff;

/// Code Index Number, the low nibble of packet byte 0.
///
/// Indicates how many of the three MIDI bytes are valid, and
/// how to interpret them.
#[derive(FromPrimitive, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Cin {
    /// Miscellaneous function codes, reserved
    Misc = 0x0,
    /// Cable events, reserved
    CableEvent = 0x1,
    /// Two-byte System Common message
    SystemCommon2 = 0x2,
    /// Three-byte System Common message
    SystemCommon3 = 0x3,
    /// SysEx starts or continues
    SysExStart = 0x4,
    /// Single-byte System Common, or SysEx ends with one byte
    SysExEnd1 = 0x5,
    /// SysEx ends with two bytes
    SysExEnd2 = 0x6,
    /// SysEx ends with three bytes
    SysExEnd3 = 0x7,
    /// Note off
    NoteOff = 0x8,
    /// Note on
    NoteOn = 0x9,
    /// Polyphonic key pressure
    PolyKeyPress = 0xa,
    /// Control change
    ControlChange = 0xb,
    /// Program change
    ProgramChange = 0xc,
    /// Channel pressure
    ChannelPressure = 0xd,
    /// Pitch bend
    PitchBend = 0xe,
    /// Single byte, unparsed
    SingleByte = 0xf,
}

impl Cin {
    /// Returns the number of valid MIDI bytes in a packet with this CIN.
    ///
    /// Reserved codes return 0.
    pub fn midi_len(&self) -> usize {
        match self {
            Self::Misc | Self::CableEvent => 0,
            Self::SysExEnd1 | Self::SingleByte => 1,
            Self::SystemCommon2
            | Self::SysExEnd2
            | Self::ProgramChange
            | Self::ChannelPressure => 2,
            Self::SystemCommon3
            | Self::SysExStart
            | Self::SysExEnd3
            | Self::NoteOff
            | Self::NoteOn
            | Self::PolyKeyPress
            | Self::ControlChange
            | Self::PitchBend => 3,
        }
    }

    /// Returns `true` for the channel voice message codes, 0x8 to 0xe.
    pub fn is_channel_voice(&self) -> bool {
        (*self as u8) >= Self::NoteOff as u8 && (*self as u8) <= Self::PitchBend as u8
    }
}

/// A USB-MIDI event packet.
///
/// Held in register order: byte 0 of the wire packet is the least
/// significant byte. Byte 0 is the cable number (high nibble) and
/// [`Cin`] (low nibble), bytes 1-3 are MIDI bytes.
#[derive(Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet(pub u32);

impl Packet {
    /// Construct a packet for cable 0.
    pub const fn new(cin: Cin, b1: u8, b2: u8, b3: u8) -> Self {
        Self::from_bytes([cin as u8, b1, b2, b3])
    }

    /// Construct from the 4-byte wire form.
    pub const fn from_bytes(b: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(b))
    }

    /// Returns the 4-byte wire form.
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Returns the Code Index Number
    pub fn cin(self) -> Cin {
        // All 16 values are defined
        Cin::from_u8(self.0 as u8 & 0x0f).unwrap_or(Cin::Misc)
    }

    /// Returns the virtual cable number
    pub const fn cable(self) -> u8 {
        (self.0 as u8) >> 4
    }

    /// MIDI byte 1, normally the status byte
    pub const fn status(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// MIDI byte 2
    pub const fn data1(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// MIDI byte 3
    pub const fn data2(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the valid MIDI bytes of the packet, according to the CIN.
    pub fn midi(self) -> impl Iterator<Item = u8> {
        let b = self.to_bytes();
        let len = self.cin().midi_len();
        (1..=len).map(move |i| b[i])
    }
}

impl core::fmt::Debug for Packet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Packet({:08x})", self.0)
    }
}

impl From<u32> for Packet {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<Packet> for u32 {
    fn from(p: Packet) -> u32 {
        p.0
    }
}

/// A MIDI channel.
///
/// Stored zero-based. MIDI channel numbers 1 to 16 are used at API
/// boundaries that take a plain integer, out of range values are masked.
#[derive(Default, Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel(u8);

impl Channel {
    /// Construct from a MIDI channel number, 1 to 16.
    ///
    /// 0 and values above 16 wrap, the same as `(n - 1) & 0xf`.
    pub const fn from_number(n: u8) -> Self {
        Self(n.wrapping_sub(1) & 0x0f)
    }

    /// Construct from a zero-based channel index, masked to 4 bits.
    pub const fn from_index(i: u8) -> Self {
        Self(i & 0x0f)
    }

    /// Returns the zero-based channel index, 0 to 15
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Returns the MIDI channel number, 1 to 16
    pub const fn number(self) -> u8 {
        self.0 + 1
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "{}", self.number())
    }
}

/// The kind of a decoded event.
///
/// Numeric values are stable and can be used as a compact type code.
#[derive(FromPrimitive, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum EventKind {
    NoteOff = 0,
    NoteOn = 1,
    PolyPressure = 2,
    ControlChange = 3,
    ProgramChange = 4,
    ChannelPressure = 5,
    PitchBend = 6,
    SystemExclusive = 7,
    RealTimeSystem = 8,
    SystemCommon = 9,
}

impl EventKind {
    /// Look up a kind from its numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::from_u8(code)
    }

    /// Returns `true` for kinds that carry a channel
    pub fn has_channel(&self) -> bool {
        (*self as u8) <= Self::PitchBend as u8
    }
}

/// A decoded inbound MIDI event.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum Event {
    NoteOff { channel: Channel, note: u8, velocity: u8 },
    NoteOn { channel: Channel, note: u8, velocity: u8 },
    PolyPressure { channel: Channel, note: u8, pressure: u8 },
    ControlChange { channel: Channel, control: u8, value: u8 },
    ProgramChange { channel: Channel, program: u8 },
    ChannelPressure { channel: Channel, pressure: u8 },
    /// 14-bit value, 0x2000 is centered
    PitchBend { channel: Channel, value: u16 },
    /// A complete System Exclusive message.
    ///
    /// `len` is the payload length excluding framing. The payload itself is
    /// held by the receiver.
    SystemExclusive { len: usize },
    /// A single System Real Time (or unparsed single) byte
    RealTime(u8),
    /// A System Common message, with unused data bytes set to 0.
    SystemCommon { status: u8, data1: u8, data2: u8 },
}

impl Event {
    /// Returns the kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NoteOff { .. } => EventKind::NoteOff,
            Self::NoteOn { .. } => EventKind::NoteOn,
            Self::PolyPressure { .. } => EventKind::PolyPressure,
            Self::ControlChange { .. } => EventKind::ControlChange,
            Self::ProgramChange { .. } => EventKind::ProgramChange,
            Self::ChannelPressure { .. } => EventKind::ChannelPressure,
            Self::PitchBend { .. } => EventKind::PitchBend,
            Self::SystemExclusive { .. } => EventKind::SystemExclusive,
            Self::RealTime(_) => EventKind::RealTimeSystem,
            Self::SystemCommon { .. } => EventKind::SystemCommon,
        }
    }

    /// Returns the channel, for channel voice events
    pub fn channel(&self) -> Option<Channel> {
        match *self {
            Self::NoteOff { channel, .. }
            | Self::NoteOn { channel, .. }
            | Self::PolyPressure { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::ChannelPressure { channel, .. }
            | Self::PitchBend { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// First data byte.
    ///
    /// For pitch bend this is the low 7 bits, for SysEx the payload
    /// length (saturating at 255), for real time the status byte.
    pub fn data1(&self) -> u8 {
        match *self {
            Self::NoteOff { note, .. }
            | Self::NoteOn { note, .. }
            | Self::PolyPressure { note, .. } => note,
            Self::ControlChange { control, .. } => control,
            Self::ProgramChange { program, .. } => program,
            Self::ChannelPressure { pressure, .. } => pressure,
            Self::PitchBend { value, .. } => value as u8 & DATA_MASK,
            Self::SystemExclusive { len } => u8::try_from(len).unwrap_or(u8::MAX),
            Self::RealTime(b) => b,
            Self::SystemCommon { data1, .. } => data1,
        }
    }

    /// Second data byte.
    ///
    /// For pitch bend this is the high 7 bits. 0 where unused.
    pub fn data2(&self) -> u8 {
        match *self {
            Self::NoteOff { velocity, .. } | Self::NoteOn { velocity, .. } => velocity,
            Self::PolyPressure { pressure, .. } => pressure,
            Self::ControlChange { value, .. } => value,
            Self::PitchBend { value, .. } => (value >> 7) as u8 & DATA_MASK,
            Self::SystemCommon { data2, .. } => data2,
            Self::ProgramChange { .. }
            | Self::ChannelPressure { .. }
            | Self::SystemExclusive { .. }
            | Self::RealTime(_) => 0,
        }
    }
}

/// An error type for USB-MIDI
///
/// Malformed input is normally absorbed by the receive path rather than
/// reported; these errors are for transport failures and for the
/// lower level decode functions.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Failure in transmit path, typically transport-specific
    TxFailure,
    /// Failure in receive path, typically transport-specific
    RxFailure,
    /// Invalid input
    InvalidInput,
    /// Provided buffer or queue is full
    NoSpace,
    /// Operation or packet type is unsupported
    Unsupported,
    /// Other error type
    Other,
    /// IO error from transport binding
    #[cfg(feature = "std")]
    Io(std::io::Error),
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            #[cfg(feature = "std")]
            Self::Io(i) => write!(fmt, "USB-MIDI IO Error: {}", i),
            _ => write!(fmt, "USB-MIDI Error: {:?}", self),
        }
    }
}

#[cfg(feature = "std")]
impl From<Error> for std::io::Error {
    fn from(e: Error) -> std::io::Error {
        std::io::Error::other(e)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

/// USB-MIDI result type
pub type Result<T> = core::result::Result<T, Error>;

/// A packet transport, typically a USB endpoint pair.
///
/// Implementations may buffer internally in either direction.
pub trait Transport {
    /// Enqueue a single packet for transmission.
    ///
    /// The packet may be held until a buffer fills or
    /// [`flush`](Self::flush) is called.
    fn write_packed(&mut self, packet: Packet) -> Result<()>;

    /// Dequeue a single received packet.
    ///
    /// Returns `None` when nothing is available. Does not block.
    fn read_packed(&mut self) -> Option<Packet>;

    /// Send any buffered outbound packets immediately.
    fn flush(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_packed(&mut self, packet: Packet) -> Result<()> {
        (**self).write_packed(packet)
    }

    fn read_packed(&mut self) -> Option<Packet> {
        (**self).read_packed()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_fields() {
        let p = Packet::from_bytes([0x19, 0x93, 0x3c, 0x64]);
        assert_eq!(p.0, 0x643c_9319);
        assert_eq!(p.cin(), Cin::NoteOn);
        assert_eq!(p.cable(), 1);
        assert_eq!(p.status(), 0x93);
        assert_eq!(p.data1(), 0x3c);
        assert_eq!(p.data2(), 0x64);
        assert_eq!(p.to_bytes(), [0x19, 0x93, 0x3c, 0x64]);
    }

    #[test]
    fn packet_midi_bytes() {
        let p = Packet::new(Cin::ProgramChange, 0xc2, 0x05, 0x7f);
        assert!(p.midi().eq([0xc2, 0x05]));

        let p = Packet::new(Cin::SysExEnd1, SYSEX_END, 0x11, 0x22);
        assert!(p.midi().eq([SYSEX_END]));

        let p = Packet::new(Cin::Misc, 1, 2, 3);
        assert_eq!(p.midi().count(), 0);
    }

    #[test]
    fn channel_numbering() {
        for n in 1..=16u8 {
            let c = Channel::from_number(n);
            assert_eq!(c.index(), n - 1);
            assert_eq!(c.number(), n);
        }
        // Out of range numbers are masked rather than rejected
        assert_eq!(Channel::from_number(0).index(), 15);
        assert_eq!(Channel::from_number(17).index(), 0);
        assert_eq!(Channel::from_index(0x13).index(), 3);
    }

    #[test]
    fn cin_classes() {
        assert!(Cin::NoteOff.is_channel_voice());
        assert!(Cin::PitchBend.is_channel_voice());
        assert!(!Cin::SysExEnd3.is_channel_voice());
        assert!(!Cin::SingleByte.is_channel_voice());
        for c in 0..16u8 {
            assert_eq!(Packet(c as u32).cin() as u8, c);
        }
    }

    #[test]
    fn event_data_bytes() {
        let e = Event::PitchBend {
            channel: Channel::from_number(1),
            value: 0x2001,
        };
        assert_eq!(e.data1(), 0x01);
        assert_eq!(e.data2(), 0x40);
        assert_eq!(e.kind(), EventKind::PitchBend);

        let e = Event::SystemExclusive { len: 300 };
        assert_eq!(e.data1(), 255);
        assert_eq!(e.channel(), None);

        assert_eq!(EventKind::from_code(7), Some(EventKind::SystemExclusive));
        assert_eq!(EventKind::from_code(10), None);
        assert!(EventKind::PitchBend.has_channel());
        assert!(!EventKind::RealTimeSystem.has_channel());
    }
}
