//! Unified error type for midilink.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Descriptors
    /// Serialization target buffer too small for the descriptor tree.
    BufferOverflow,

    // Transport
    /// The IN endpoint FIFO still holds the previous packet.
    EndpointBusy,

    /// An endpoint address the transport does not own.
    InvalidEndpoint,

    /// A string descriptor index outside the string table.
    InvalidStringIndex,

    /// The bus driver reported a transfer-level failure.
    Usb,
}
