//! Per-endpoint receive paths.
//!
//! Invoked from the poll context whenever the transport reports a packet
//! pending. Neither path may block: short MIDI replies spin on a busy
//! endpoint (the FIFO drains in hardware), the CDC echo is dropped
//! instead.

use crate::config;
use crate::diag::DiagnosticSink;
use crate::error::Error;
use crate::midi;
use crate::usb::{write_retry, UsbPort};

/// Service the MIDI OUT endpoint.
///
/// A short SysEx from the host is answered with the fixed identity reply
/// on the MIDI IN endpoint. Every other packet is mirrored to the
/// diagnostic sinks and otherwise ignored: the adapter implements the
/// identity handshake, not general MIDI routing.
///
/// Returns the number of bytes read (0 = nothing pending).
pub fn on_midi_rx(
    port: &mut impl UsbPort,
    diag: &mut impl DiagnosticSink,
) -> Result<usize, Error> {
    let mut buf = [0u8; config::MAX_PACKET_SIZE];
    let len = port.read_packet(config::EP_MIDI_OUT, &mut buf)?;
    if len == 0 {
        return Ok(0);
    }

    if midi::is_identity_request(&buf[..len]) {
        diag.debug(b'm');
        diag.debug(b's');
        write_retry(port, config::EP_MIDI_IN, &midi::SYSEX_IDENTITY_REPLY)?;
    } else {
        diag.debug(b'M');
        diag.debug_hex(buf[0]);
        diag.debug(b' ');
        for &byte in &buf[1..len] {
            diag.debug_hex(byte);
            diag.aux(byte);
        }
        diag.debug(b'_');
    }
    Ok(len)
}

/// Service the CDC data OUT endpoint: loop received bytes back to the
/// host and mirror them to the debug sink.
///
/// Returns the number of bytes read (0 = nothing pending, no echo).
pub fn on_cdc_rx(
    port: &mut impl UsbPort,
    diag: &mut impl DiagnosticSink,
) -> Result<usize, Error> {
    let mut buf = [0u8; config::MAX_PACKET_SIZE];
    let len = port.read_packet(config::EP_CDC_DATA_OUT, &mut buf)?;
    if len == 0 {
        return Ok(0);
    }
    match port.write_packet(config::EP_CDC_DATA_IN, &buf[..len]) {
        // A busy data-in FIFO drops the echo; stalling the poll context
        // on a host-paced endpoint is never acceptable.
        Ok(()) | Err(Error::EndpointBusy) => {}
        Err(e) => return Err(e),
    }
    diag.debug(b'S');
    for &byte in &buf[..len] {
        diag.debug_hex(byte);
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::NullSink;

    #[derive(Default)]
    struct FakePort {
        pending: Vec<(u8, Vec<u8>)>,
        written: Vec<(u8, Vec<u8>)>,
        busy_writes: usize,
    }

    impl FakePort {
        fn with_packet(endpoint: u8, data: &[u8]) -> Self {
            Self {
                pending: vec![(endpoint, data.to_vec())],
                ..Self::default()
            }
        }
    }

    impl UsbPort for FakePort {
        fn read_packet(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize, Error> {
            match self.pending.iter().position(|(ep, _)| *ep == endpoint) {
                Some(i) => {
                    let (_, data) = self.pending.remove(i);
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                None => Ok(0),
            }
        }

        fn write_packet(&mut self, endpoint: u8, data: &[u8]) -> Result<(), Error> {
            if self.busy_writes > 0 {
                self.busy_writes -= 1;
                return Err(Error::EndpointBusy);
            }
            self.written.push((endpoint, data.to_vec()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct CaptureSink {
        debug: Vec<u8>,
        aux: Vec<u8>,
    }

    impl DiagnosticSink for CaptureSink {
        fn debug(&mut self, byte: u8) {
            self.debug.push(byte);
        }

        fn aux(&mut self, byte: u8) {
            self.aux.push(byte);
        }
    }

    #[test]
    fn sysex_request_gets_identity_reply() {
        for header in [0x06u8, 0x07] {
            let mut port = FakePort::with_packet(
                config::EP_MIDI_OUT,
                &[header, 0xF0, 0x7E, 0x00, 0x00, 0x00, 0x00, 0x00],
            );
            let len = on_midi_rx(&mut port, &mut NullSink).unwrap();
            assert_eq!(len, 8);
            assert_eq!(port.written.len(), 1);
            let (ep, data) = &port.written[0];
            assert_eq!(*ep, config::EP_MIDI_IN);
            assert_eq!(data.as_slice(), &midi::SYSEX_IDENTITY_REPLY);
        }
    }

    #[test]
    fn identity_reply_retries_past_busy_endpoint() {
        let mut port = FakePort::with_packet(config::EP_MIDI_OUT, &[0x07, 0xF0, 0x7E, 0x00]);
        port.busy_writes = 3;
        on_midi_rx(&mut port, &mut NullSink).unwrap();
        assert_eq!(port.written.len(), 1);
        assert_eq!(port.written[0].1.as_slice(), &midi::SYSEX_IDENTITY_REPLY);
    }

    #[test]
    fn ordinary_note_on_is_mirrored_not_answered() {
        let mut port = FakePort::with_packet(config::EP_MIDI_OUT, &[0x09, 0x90, 60, 127]);
        let mut sink = CaptureSink::default();
        let len = on_midi_rx(&mut port, &mut sink).unwrap();
        assert_eq!(len, 4);
        assert!(port.written.is_empty());
        // 'M', hex of the header byte, space, hex of the payload, '_'.
        assert_eq!(sink.debug.as_slice(), b"M09 903C7F_");
        // Raw payload bytes (without the framing byte) on the aux channel.
        assert_eq!(sink.aux.as_slice(), &[0x90, 60, 127]);
    }

    #[test]
    fn midi_idle_endpoint_is_a_noop() {
        let mut port = FakePort::default();
        let mut sink = CaptureSink::default();
        assert_eq!(on_midi_rx(&mut port, &mut sink).unwrap(), 0);
        assert!(port.written.is_empty());
        assert!(sink.debug.is_empty());
    }

    #[test]
    fn cdc_bytes_loop_back() {
        let payload: Vec<u8> = (0..64).collect();
        for n in [1usize, 5, 63, 64] {
            let mut port = FakePort::with_packet(config::EP_CDC_DATA_OUT, &payload[..n]);
            let len = on_cdc_rx(&mut port, &mut NullSink).unwrap();
            assert_eq!(len, n);
            assert_eq!(port.written.len(), 1);
            let (ep, data) = &port.written[0];
            assert_eq!(*ep, config::EP_CDC_DATA_IN);
            assert_eq!(data.as_slice(), &payload[..n]);
        }
    }

    #[test]
    fn cdc_zero_length_read_writes_nothing() {
        let mut port = FakePort::with_packet(config::EP_CDC_DATA_OUT, &[]);
        assert_eq!(on_cdc_rx(&mut port, &mut NullSink).unwrap(), 0);
        assert!(port.written.is_empty());
    }

    #[test]
    fn cdc_echo_is_dropped_when_endpoint_busy() {
        let mut port = FakePort::with_packet(config::EP_CDC_DATA_OUT, b"hello");
        port.busy_writes = 1;
        assert_eq!(on_cdc_rx(&mut port, &mut NullSink).unwrap(), 5);
        assert!(port.written.is_empty());
    }
}
