// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Copyright (c) 2025 Code Construct
 */

//! System Exclusive reassembly
#[allow(unused)]
use crate::fmt::{debug, error, info, trace, warn};

use heapless::Vec;
use usbmidi::{Error, Result, SYSEX_END, SYSEX_START};

#[derive(Debug, PartialEq)]
enum State {
    /// No message started, or the last one was abandoned.
    Idle,
    /// Between 0xF0 and 0xF7
    Active,
    /// Message complete, the buffer holds its payload.
    Done,
}

/// Accumulates SysEx payload bytes across packets.
///
/// The 0xF0 and 0xF7 framing bytes are not stored. Bytes beyond the
/// buffer capacity are counted and dropped, so a long message is
/// truncated rather than rejected.
#[derive(Debug)]
pub(crate) struct Reassembler {
    state: State,
    // Payload bytes dropped from the current message
    overflow: usize,
}

impl Reassembler {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            overflow: 0,
        }
    }

    /// Receive SysEx bytes from a packet.
    ///
    /// `end` is set for the final packet of a message (CIN 0x5 to 0x7).
    /// A 0xF0 byte restarts reassembly, discarding any partial message.
    ///
    /// Returns `Ok(Some(len))` when a message is complete, `Ok(None)`
    /// when more packets are expected.
    /// Returns [`Error::InvalidInput`] for data without a preceding 0xF0.
    pub fn receive<const N: usize>(
        &mut self,
        bytes: &[u8],
        end: bool,
        message: &mut Vec<u8, N>,
    ) -> Result<Option<usize>> {
        for &b in bytes {
            if b == SYSEX_START {
                if self.state == State::Active {
                    debug!("SysEx restarted after {} bytes", message.len());
                }
                message.clear();
                self.overflow = 0;
                self.state = State::Active;
                continue;
            }

            if self.state != State::Active {
                trace!("SysEx data without start");
                return Err(Error::InvalidInput);
            }

            if b == SYSEX_END {
                return Ok(Some(self.complete(message)));
            }

            if b & 0x80 != 0 {
                // Kept in the payload
                debug!("SysEx status byte {:02x} at {}", b, message.len());
            }

            if message.push(b).is_err() {
                self.overflow += 1;
            }
        }

        if end && self.state == State::Active {
            // Final packet without a 0xF7, the CIN still ends the message
            debug!("SysEx ended without terminator");
            return Ok(Some(self.complete(message)));
        }

        Ok(None)
    }

    fn complete<const N: usize>(&mut self, message: &Vec<u8, N>) -> usize {
        self.state = State::Done;
        if self.overflow > 0 {
            debug!(
                "SysEx truncated to {}, {} bytes dropped",
                message.len(),
                self.overflow
            );
        }
        trace!("SysEx reassembly complete, len {}", message.len());
        message.len()
    }

    /// Returns `true` while a message is partially received.
    pub fn is_active(&self) -> bool {
        self.state == State::Active
    }

    /// Payload bytes dropped from the current or last message.
    pub fn overflow(&self) -> usize {
        self.overflow
    }

    /// Returns the completed message, or an empty slice if none is complete.
    pub fn message<'f, const N: usize>(&self, message: &'f Vec<u8, N>) -> &'f [u8] {
        if self.state == State::Done {
            message.as_slice()
        } else {
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassemble_across_packets() {
        let mut r = Reassembler::new();
        let mut buf = Vec::<u8, 8>::new();

        assert_eq!(r.receive(&[0xf0, 1, 2], false, &mut buf).unwrap(), None);
        assert!(r.is_active());
        assert!(r.message(&buf).is_empty());
        assert_eq!(r.receive(&[3, 4, 5], false, &mut buf).unwrap(), None);
        assert_eq!(r.receive(&[6, 0xf7], true, &mut buf).unwrap(), Some(6));
        assert!(!r.is_active());
        assert_eq!(r.message(&buf), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn overflow_truncates() {
        let mut r = Reassembler::new();
        let mut buf = Vec::<u8, 4>::new();

        assert_eq!(r.receive(&[0xf0, 1, 2], false, &mut buf).unwrap(), None);
        assert_eq!(r.receive(&[3, 4, 5], false, &mut buf).unwrap(), None);
        assert_eq!(r.receive(&[6, 7, 0xf7], true, &mut buf).unwrap(), Some(4));
        assert_eq!(r.message(&buf), &[1, 2, 3, 4]);
        assert_eq!(r.overflow(), 3);
    }

    #[test]
    fn restart_discards_partial() {
        let mut r = Reassembler::new();
        let mut buf = Vec::<u8, 8>::new();

        r.receive(&[0xf0, 1, 2], false, &mut buf).unwrap();
        r.receive(&[0xf0, 9, 0xf7], true, &mut buf).unwrap();
        assert_eq!(r.message(&buf), &[9]);
    }

    #[test]
    fn data_without_start() {
        let mut r = Reassembler::new();
        let mut buf = Vec::<u8, 8>::new();

        assert!(r.receive(&[1, 2, 3], false, &mut buf).is_err());
        assert!(r.receive(&[1, 0xf7], true, &mut buf).is_err());

        // A completed message doesn't accept continuation data
        r.receive(&[0xf0, 1, 0xf7], true, &mut buf).unwrap();
        assert!(r.receive(&[2, 3, 4], false, &mut buf).is_err());
        assert_eq!(r.message(&buf), &[1]);
    }

    #[test]
    fn status_byte_in_payload() {
        let mut r = Reassembler::new();
        let mut buf = Vec::<u8, 8>::new();

        r.receive(&[0xf0, 1, 2], false, &mut buf).unwrap();
        assert_eq!(r.receive(&[0xf6], false, &mut buf).unwrap(), None);
        assert!(r.is_active());
        assert_eq!(r.receive(&[3, 0xf7], true, &mut buf).unwrap(), Some(4));
        assert_eq!(r.message(&buf), &[1, 2, 0xf6, 3]);
    }

    #[test]
    fn end_without_terminator() {
        let mut r = Reassembler::new();
        let mut buf = Vec::<u8, 8>::new();

        r.receive(&[0xf0, 1, 2], false, &mut buf).unwrap();
        assert_eq!(r.receive(&[3, 4, 5], true, &mut buf).unwrap(), Some(5));
        assert_eq!(r.message(&buf), &[1, 2, 3, 4, 5]);
    }
}
