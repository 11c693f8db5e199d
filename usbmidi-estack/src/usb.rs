// SPDX-License-Identifier: MIT OR Apache-2.0
/*
 * Copyright (c) 2024-2025 Code Construct
 */

//! USB bulk endpoint binding.
//!
//! USB-MIDI event packets are carried back to back in bulk transfers.
//! [`UsbMidiHandler`] batches outbound packets into transfers and queues
//! inbound packets from received transfers, providing a [`Transport`].

#[allow(unused)]
use crate::fmt::{debug, error, info, trace, warn};

use heapless::{Deque, Vec};
use usbmidi::{Error, Packet, Result, Transport};

use crate::config::RX_QUEUE;

/// Maximum full-speed bulk packet
pub const USB_MIDI_MAX_PACKET: usize = 64;

/// Sends a bulk IN transfer.
///
/// Implemented by the USB device stack glue.
pub trait UsbMidiXfer {
    fn send_xfer(&mut self, buf: &[u8]) -> Result<()>;
}

/// Adapts a bulk endpoint pair to a packet [`Transport`].
///
/// Outbound packets are held until a full transfer is accumulated, or
/// [`flush`](Transport::flush) is called. Inbound transfers are passed to
/// [`receive_xfer`](Self::receive_xfer), their packets are then returned by
/// [`read_packed`](Transport::read_packed).
pub struct UsbMidiHandler<X: UsbMidiXfer, const N: usize = RX_QUEUE> {
    xfer: X,
    tx: Vec<u8, USB_MIDI_MAX_PACKET>,
    rx: Deque<Packet, N>,
}

impl<X: UsbMidiXfer, const N: usize> UsbMidiHandler<X, N> {
    pub fn new(xfer: X) -> Self {
        Self {
            xfer,
            tx: Vec::new(),
            rx: Deque::new(),
        }
    }

    /// Queue the packets of a received bulk OUT transfer.
    ///
    /// All-zero padding packets are skipped. Returns [`Error::NoSpace`]
    /// if the receive queue fills, remaining packets are dropped.
    /// A transfer that isn't a multiple of 4 bytes has its complete
    /// packets queued and returns [`Error::InvalidInput`].
    pub fn receive_xfer(&mut self, xfer: &[u8]) -> Result<()> {
        trace!("rx xfer len {}", xfer.len());
        let chunks = xfer.chunks_exact(4);
        let rem = chunks.remainder().len();

        for c in chunks {
            let b = [c[0], c[1], c[2], c[3]];
            if b == [0; 4] {
                continue;
            }
            if self.rx.push_back(Packet::from_bytes(b)).is_err() {
                debug!("rx queue full");
                return Err(Error::NoSpace);
            }
        }

        if rem != 0 {
            debug!("Trailing {} bytes in transfer", rem);
            return Err(Error::InvalidInput);
        }
        Ok(())
    }

    /// Number of received packets not yet read
    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    fn send_tx(&mut self) -> Result<()> {
        let r = self.xfer.send_xfer(&self.tx);
        self.tx.clear();
        r.inspect_err(|e| trace!("USB transfer error {:?}", e))
    }

    pub fn xfer(&self) -> &X {
        &self.xfer
    }

    pub fn xfer_mut(&mut self) -> &mut X {
        &mut self.xfer
    }
}

impl<X: UsbMidiXfer, const N: usize> Transport for UsbMidiHandler<X, N> {
    fn write_packed(&mut self, packet: Packet) -> Result<()> {
        self.tx
            .extend_from_slice(&packet.to_bytes())
            .map_err(|_| Error::NoSpace)?;
        if self.tx.is_full() {
            self.send_tx()?;
        }
        Ok(())
    }

    fn read_packed(&mut self) -> Option<Packet> {
        self.rx.pop_front()
    }

    fn flush(&mut self) -> Result<()> {
        if self.tx.is_empty() {
            return Ok(());
        }
        self.send_tx()
    }
}

impl<X: UsbMidiXfer + core::fmt::Debug, const N: usize> core::fmt::Debug for UsbMidiHandler<X, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UsbMidiHandler")
            .field("xfer", &self.xfer)
            .field("tx len", &self.tx.len())
            .field("rx len", &self.rx.len())
            .finish()
    }
}
