//! USB device subsystem.
//!
//! [`descriptors`] declares the composite device's identity and
//! capability graph; [`composite`] maps that declaration onto the
//! `usb-device` stack on real hardware.
//!
//! The protocol core talks to the bus through [`UsbPort`], which captures
//! the external transport contract: packet reads and writes that never
//! block the polling context. A refused write surfaces as
//! [`Error::EndpointBusy`] and the caller decides whether to retry or
//! drop. The transport is responsible for serializing concurrent access
//! to an endpoint; this crate assumes, but does not implement, that
//! guarantee.

pub mod composite;
pub mod descriptors;

use crate::error::Error;

/// Non-blocking packet transport over the device's endpoints.
pub trait UsbPort {
    /// Read a pending packet from an OUT endpoint into `buf`.
    ///
    /// Returns `Ok(0)` when no packet is pending.
    fn read_packet(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize, Error>;

    /// Queue a packet on an IN endpoint.
    ///
    /// Fails with [`Error::EndpointBusy`] while the endpoint FIFO still
    /// holds the previous packet.
    fn write_packet(&mut self, endpoint: u8, data: &[u8]) -> Result<(), Error>;
}

/// Write `data`, spinning on a busy endpoint until the transport takes it.
///
/// Only suitable for short, guaranteed-eventually-drained replies: the
/// endpoint FIFO empties in hardware once the host polls, so the spin is
/// bounded in practice even though it has no tick limit.
pub fn write_retry(port: &mut impl UsbPort, endpoint: u8, data: &[u8]) -> Result<(), Error> {
    loop {
        match port.write_packet(endpoint, data) {
            Ok(()) => return Ok(()),
            Err(Error::EndpointBusy) => continue,
            Err(e) => return Err(e),
        }
    }
}
