//! Diagnostic sink seam.
//!
//! The data-path dispatcher mirrors traffic into a [`DiagnosticSink`]
//! instead of talking to UARTs directly, so the protocol logic can be
//! tested (or built) without any debug transport attached. On hardware
//! the sink is backed by two UART transmitters; see `main.rs`.
//!
//! Mirroring is a debugging aid only - it is outside the correctness
//! contract and never reports errors.

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Destination for diagnostic byte mirroring.
pub trait DiagnosticSink {
    /// One byte on the debug channel (human-facing hex dumps and markers).
    fn debug(&mut self, byte: u8);

    /// One byte on the auxiliary channel (raw pass-through of MIDI payload).
    fn aux(&mut self, byte: u8);

    /// Two uppercase hex digits of `byte` on the debug channel.
    fn debug_hex(&mut self, byte: u8) {
        self.debug(HEX[usize::from(byte >> 4)]);
        self.debug(HEX[usize::from(byte & 0x0F)]);
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn debug(&mut self, _byte: u8) {}

    fn aux(&mut self, _byte: u8) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Capture {
        debug: Vec<u8>,
        aux: Vec<u8>,
    }

    impl DiagnosticSink for Capture {
        fn debug(&mut self, byte: u8) {
            self.debug.push(byte);
        }

        fn aux(&mut self, byte: u8) {
            self.aux.push(byte);
        }
    }

    #[test]
    fn hex_digits_are_uppercase_and_zero_padded() {
        let mut sink = Capture::default();
        sink.debug_hex(0xA5);
        sink.debug_hex(0x0F);
        sink.debug_hex(0x00);
        assert_eq!(sink.debug, b"A50F00");
        assert!(sink.aux.is_empty());
    }
}
