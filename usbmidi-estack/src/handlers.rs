// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Copyright (c) 2025 Code Construct
 */

//! Per-kind receive callbacks

use usbmidi::{Channel, Event};

/// Note Off, Note On and velocity change: `(channel, note, velocity)`
pub type NoteHandler<'h> = &'h dyn Fn(Channel, u8, u8);
/// `(channel, control, value)`
pub type ControlChangeHandler<'h> = &'h dyn Fn(Channel, u8, u8);
/// `(channel, program)`
pub type ProgramChangeHandler<'h> = &'h dyn Fn(Channel, u8);
/// Channel pressure: `(channel, pressure)`
pub type AfterTouchHandler<'h> = &'h dyn Fn(Channel, u8);
/// `(channel, value)`, value is 14 bits with 0x2000 centered.
pub type PitchChangeHandler<'h> = &'h dyn Fn(Channel, u16);
/// A single real time byte
pub type RealTimeSystemHandler<'h> = &'h dyn Fn(u8);
/// A complete SysEx payload, without 0xF0/0xF7 framing
pub type SysExHandler<'h> = &'h dyn Fn(&[u8]);
/// `(status, data1, data2)`
pub type SystemCommonHandler<'h> = &'h dyn Fn(u8, u8, u8);

/// Callback slots, one per event category.
///
/// Empty slots are skipped, the event is then only available through
/// [`UsbMidi::read`](crate::UsbMidi::read).
#[derive(Default, Clone, Copy)]
pub struct Handlers<'h> {
    pub(crate) note_off: Option<NoteHandler<'h>>,
    pub(crate) note_on: Option<NoteHandler<'h>>,
    pub(crate) velocity_change: Option<NoteHandler<'h>>,
    pub(crate) control_change: Option<ControlChangeHandler<'h>>,
    pub(crate) program_change: Option<ProgramChangeHandler<'h>>,
    pub(crate) after_touch: Option<AfterTouchHandler<'h>>,
    pub(crate) pitch_change: Option<PitchChangeHandler<'h>>,
    pub(crate) real_time_system: Option<RealTimeSystemHandler<'h>>,
    pub(crate) sysex: Option<SysExHandler<'h>>,
    pub(crate) system_common: Option<SystemCommonHandler<'h>>,
}

impl<'h> Handlers<'h> {
    /// Calls the handler registered for `event`, if any.
    ///
    /// `sysex` is the reassembled payload for [`Event::SystemExclusive`].
    pub(crate) fn dispatch(&self, event: &Event, sysex: &[u8]) {
        match *event {
            Event::NoteOff {
                channel,
                note,
                velocity,
            } => {
                if let Some(f) = self.note_off {
                    f(channel, note, velocity)
                }
            }
            Event::NoteOn {
                channel,
                note,
                velocity,
            } => {
                if let Some(f) = self.note_on {
                    f(channel, note, velocity)
                }
            }
            Event::PolyPressure {
                channel,
                note,
                pressure,
            } => {
                if let Some(f) = self.velocity_change {
                    f(channel, note, pressure)
                }
            }
            Event::ControlChange {
                channel,
                control,
                value,
            } => {
                if let Some(f) = self.control_change {
                    f(channel, control, value)
                }
            }
            Event::ProgramChange { channel, program } => {
                if let Some(f) = self.program_change {
                    f(channel, program)
                }
            }
            Event::ChannelPressure { channel, pressure } => {
                if let Some(f) = self.after_touch {
                    f(channel, pressure)
                }
            }
            Event::PitchBend { channel, value } => {
                if let Some(f) = self.pitch_change {
                    f(channel, value)
                }
            }
            Event::SystemExclusive { .. } => {
                if let Some(f) = self.sysex {
                    f(sysex)
                }
            }
            Event::RealTime(b) => {
                if let Some(f) = self.real_time_system {
                    f(b)
                }
            }
            Event::SystemCommon {
                status,
                data1,
                data2,
            } => {
                if let Some(f) = self.system_common {
                    f(status, data1, data2)
                }
            }
        }
    }
}

impl core::fmt::Debug for Handlers<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Closures aren't Debug, show which slots are set.
        f.debug_struct("Handlers")
            .field("note_off", &self.note_off.is_some())
            .field("note_on", &self.note_on.is_some())
            .field("velocity_change", &self.velocity_change.is_some())
            .field("control_change", &self.control_change.is_some())
            .field("program_change", &self.program_change.is_some())
            .field("after_touch", &self.after_touch.is_some())
            .field("pitch_change", &self.pitch_change.is_some())
            .field("real_time_system", &self.real_time_system.is_some())
            .field("sysex", &self.sysex.is_some())
            .field("system_common", &self.system_common.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[test]
    fn dispatch_to_matching_slot() {
        let notes = Cell::new(0);
        let bends = Cell::new(None);
        let note_on = |_c: Channel, _n: u8, _v: u8| notes.set(notes.get() + 1);
        let pitch = |c: Channel, v: u16| bends.set(Some((c.index(), v)));

        let mut h = Handlers::default();
        h.note_on = Some(&note_on);
        h.pitch_change = Some(&pitch);

        let ch = Channel::from_number(3);
        h.dispatch(
            &Event::NoteOn {
                channel: ch,
                note: 1,
                velocity: 2,
            },
            &[],
        );
        // No note_off handler, nothing happens
        h.dispatch(
            &Event::NoteOff {
                channel: ch,
                note: 1,
                velocity: 2,
            },
            &[],
        );
        h.dispatch(
            &Event::PitchBend {
                channel: ch,
                value: 0x1234,
            },
            &[],
        );

        assert_eq!(notes.get(), 1);
        assert_eq!(bends.get(), Some((2, 0x1234)));
    }

    #[test]
    fn sysex_slot_gets_payload() {
        let got = Cell::new(0usize);
        let sysex = |d: &[u8]| {
            assert_eq!(d, &[1, 2, 3]);
            got.set(d.len());
        };
        let h = Handlers {
            sysex: Some(&sysex),
            ..Default::default()
        };
        h.dispatch(&Event::SystemExclusive { len: 3 }, &[1, 2, 3]);
        assert_eq!(got.get(), 3);
    }
}
