//! USB-MIDI event packet framing.
//!
//! All traffic on the MIDI bulk endpoints is framed as 4-byte event
//! packets: byte 0 carries the virtual cable number in the upper nibble
//! and a Code Index Number in the lower nibble, bytes 1-3 carry the MIDI
//! payload, zero-padded.

use crate::config;

// Code Index Numbers (lower nibble of the packet header byte)

/// SysEx continues, or starts, in this packet (3 payload bytes).
pub const CIN_SYSEX_START: u8 = 0x04;
/// Single-byte SysEx end.
pub const CIN_SYSEX_END_1: u8 = 0x05;
/// Two-byte SysEx, or SysEx ending with two bytes.
pub const CIN_SYSEX_END_2: u8 = 0x06;
/// Three-byte SysEx, or SysEx ending with three bytes.
pub const CIN_SYSEX_END_3: u8 = 0x07;
/// Note-Off message.
pub const CIN_NOTE_OFF: u8 = 0x08;
/// Note-On message.
pub const CIN_NOTE_ON: u8 = 0x09;

/// MIDI SysEx start status byte.
pub const SYSEX_START: u8 = 0xF0;

/// Virtual cable number of an event packet header byte.
pub fn cable_number(header: u8) -> u8 {
    header >> 4
}

/// Code Index Number of an event packet header byte.
pub fn code_index(header: u8) -> u8 {
    header & 0x0F
}

/// Frame a Note-On event packet.
pub fn note_on(cable: u8, channel: u8, note: u8, velocity: u8) -> [u8; 4] {
    [
        (cable << 4) | CIN_NOTE_ON,
        0x90 | (channel & 0x0F),
        note,
        velocity,
    ]
}

/// Frame a Note-Off event packet.
pub fn note_off(cable: u8, channel: u8, note: u8, velocity: u8) -> [u8; 4] {
    [
        (cable << 4) | CIN_NOTE_OFF,
        0x80 | (channel & 0x0F),
        note,
        velocity,
    ]
}

/// Does this cable-0 event packet open a SysEx transfer?
///
/// The adapter treats any short SysEx from the host as an identity
/// request, which holds as long as the host packs the request into a
/// single event packet. Only the first packet of a read is inspected.
pub fn is_identity_request(packet: &[u8]) -> bool {
    if packet.len() < 4 {
        return false;
    }
    cable_number(packet[0]) == config::MIDI_CABLE
        && matches!(code_index(packet[0]), CIN_SYSEX_END_2 | CIN_SYSEX_END_3)
        && packet[1] == SYSEX_START
}

/// Non-Realtime Universal SysEx Identity Reply, preformatted with USB
/// event packet framing: five packets, ready to queue as one bulk write.
pub const SYSEX_IDENTITY_REPLY: [u8; 20] = [
    (config::MIDI_CABLE << 4) | CIN_SYSEX_START,
    0xF0, // SysEx start
    0x7E, // non-realtime
    0x00, // channel 0
    (config::MIDI_CABLE << 4) | CIN_SYSEX_START,
    0x7D, // educational/prototype manufacturer ID
    0x66, // family code LSB
    0x66, // family code MSB
    (config::MIDI_CABLE << 4) | CIN_SYSEX_START,
    0x51, // model number LSB
    0x19, // model number MSB
    0x00, // version byte 1
    (config::MIDI_CABLE << 4) | CIN_SYSEX_START,
    0x00, // version byte 2
    0x01, // version byte 3
    0x00, // version byte 4
    (config::MIDI_CABLE << 4) | CIN_SYSEX_END_1,
    0xF7, // SysEx end
    0x00, // padding
    0x00, // padding
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_events_carry_cable_and_channel() {
        assert_eq!(note_on(0, 0, 60, 127), [0x09, 0x90, 60, 127]);
        assert_eq!(note_off(0, 0, 60, 127), [0x08, 0x80, 60, 127]);
        assert_eq!(note_on(1, 2, 64, 100), [0x19, 0x92, 64, 100]);
    }

    #[test]
    fn identity_request_matches_short_sysex_only() {
        assert!(is_identity_request(&[0x06, 0xF0, 0x7E, 0x00]));
        assert!(is_identity_request(&[0x07, 0xF0, 0x7E, 0x7F]));
        // Ordinary note-on is not an identity request.
        assert!(!is_identity_request(&[0x09, 0x90, 60, 127]));
        // SysEx framing without a SysEx start byte.
        assert!(!is_identity_request(&[0x06, 0x7E, 0x00, 0x00]));
        // Same CIN on a different virtual cable.
        assert!(!is_identity_request(&[0x16, 0xF0, 0x7E, 0x00]));
        // Truncated packet.
        assert!(!is_identity_request(&[0x06, 0xF0]));
    }

    #[test]
    fn identity_reply_is_framed_in_event_packets() {
        assert_eq!(SYSEX_IDENTITY_REPLY.len() % 4, 0);
        // Every packet header is cable 0 with a SysEx CIN.
        for packet in SYSEX_IDENTITY_REPLY.chunks(4) {
            assert_eq!(cable_number(packet[0]), 0);
            assert!(matches!(
                code_index(packet[0]),
                CIN_SYSEX_START | CIN_SYSEX_END_1
            ));
        }
        // Payload starts a SysEx and terminates it.
        assert_eq!(SYSEX_IDENTITY_REPLY[1], 0xF0);
        assert_eq!(SYSEX_IDENTITY_REPLY[17], 0xF7);
    }
}
