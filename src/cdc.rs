//! CDC-ACM class-specific control requests (CDC 1.1 §6.2).
//!
//! The handler is a pure per-request decision function: it keeps no state
//! between invocations. The transport invokes it only for class requests
//! addressed to the CDC control interface; everything it does not accept
//! falls through to the transport's default (stall) handling.

use crate::error::Error;

// Class-specific request codes

pub const REQ_SET_LINE_CODING: u8 = 0x20;
pub const REQ_GET_LINE_CODING: u8 = 0x21;
pub const REQ_SET_CONTROL_LINE_STATE: u8 = 0x22;

/// SERIAL_STATE notification code.
pub const NOTIFY_SERIAL_STATE: u8 = 0x20;

/// Wire size of a line-coding record.
pub const LINE_CODING_SIZE: usize = 7;

/// Wire size of a SERIAL_STATE notification (8-byte header + 2 data bytes).
pub const SERIAL_STATE_NOTIFICATION_SIZE: usize = 10;

/// Decision returned to the transport for a class request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestOutcome {
    /// Complete the control transfer normally.
    Accepted,
    /// Stall the control transfer.
    Rejected,
}

/// Decide a class request addressed to the CDC control interface.
///
/// `transfer_len` is the declared length of the request's data stage.
///
/// SET_CONTROL_LINE_STATE is accepted unconditionally: the Linux cdc_acm
/// driver requires it even though the ACM functional descriptor does not
/// advertise the capability. SET_LINE_CODING is accepted only when the
/// host actually sent a full line-coding record.
pub fn handle_request(request: u8, transfer_len: usize) -> RequestOutcome {
    match request {
        REQ_SET_CONTROL_LINE_STATE => RequestOutcome::Accepted,
        REQ_SET_LINE_CODING if transfer_len >= LINE_CODING_SIZE => RequestOutcome::Accepted,
        _ => RequestOutcome::Rejected,
    }
}

/// Build the SERIAL_STATE notification echoing the host's DTR/RTS bits.
///
/// The notification is a courtesy for host drivers that expect the echo;
/// transmitting it on the notification endpoint is optional.
pub fn serial_state_notification(line_state: u16) -> [u8; SERIAL_STATE_NOTIFICATION_SIZE] {
    [
        0xA1, // bmRequestType: device-to-host, class, interface
        NOTIFY_SERIAL_STATE,
        0x00, // wValue
        0x00,
        0x00, // wIndex
        0x00,
        0x02, // wLength: two data bytes
        0x00,
        (line_state & 0x03) as u8,
        0x00,
    ]
}

/// Line-coding record sent with SET_LINE_CODING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineCoding {
    /// Data terminal rate in bits per second.
    pub data_rate: u32,
    /// Stop bits: 0 = 1 stop bit, 1 = 1.5, 2 = 2.
    pub stop_bits: u8,
    /// Parity: 0 = none, 1 = odd, 2 = even, 3 = mark, 4 = space.
    pub parity: u8,
    /// Data bits: 5, 6, 7, 8 or 16.
    pub data_bits: u8,
}

impl LineCoding {
    /// Parse the little-endian wire form of a line-coding record.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < LINE_CODING_SIZE {
            return Err(Error::BufferOverflow);
        }
        Ok(Self {
            data_rate: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            stop_bits: data[4],
            parity: data[5],
            data_bits: data[6],
        })
    }
}
