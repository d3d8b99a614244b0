//! Application-wide constants and compile-time configuration.
//!
//! All USB identity values, endpoint addresses, timing parameters, and
//! protocol constants live here so they can be tuned in one place.

// USB identity

/// USB VID/PID - prototype vendor ID, randomly drawn product ID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x3137;
pub const USB_PID: u16 = 0xC0DE;

/// bcdDevice - firmware release, BCD-encoded.
pub const USB_DEVICE_RELEASE: u16 = 0x0100;

/// USB device strings. The serial number is rendered at runtime from the
/// MCU's 96-bit unique device ID; see [`crate::usb::descriptors::render_serial`].
pub const USB_MANUFACTURER: &str = "midilink";
pub const USB_PRODUCT: &str = "MIDI interface";

/// 1-based string descriptor indices referenced by the device descriptor.
pub const STRING_MANUFACTURER: u8 = 1;
pub const STRING_PRODUCT: u8 = 2;
pub const STRING_SERIAL: u8 = 3;

/// Control endpoint (EP0) max packet size.
pub const CONTROL_MAX_PACKET_SIZE: u8 = 64;

/// Bus-powered, 100 mA.
pub const USB_MAX_POWER_MA: u8 = 100;

// Interface numbers
//
// Stable: the audio-control header, the CDC union and the CDC call
// management descriptors all cross-reference these by value.

pub const AUDIO_CONTROL_INTERFACE: u8 = 0;
pub const MIDI_STREAMING_INTERFACE: u8 = 1;
pub const CDC_COMM_INTERFACE: u8 = 2;
pub const CDC_DATA_INTERFACE: u8 = 3;

// Endpoint addresses (bit 7 = direction, IN is device-to-host)

pub const EP_MIDI_OUT: u8 = 0x01;
pub const EP_MIDI_IN: u8 = 0x81;
pub const EP_CDC_DATA_OUT: u8 = 0x02;
pub const EP_CDC_DATA_IN: u8 = 0x82;
pub const EP_CDC_NOTIF: u8 = 0x83;

/// Bulk endpoint max packet size; also the per-callback stack buffer size.
pub const MAX_PACKET_SIZE: usize = 64;

/// CDC notification endpoint: max packet size and polling interval (ms).
pub const CDC_NOTIF_PACKET_SIZE: u16 = 16;
pub const CDC_NOTIF_INTERVAL_MS: u8 = 255;

/// CDC bulk data endpoints advertise a 1 ms interval.
pub const CDC_DATA_INTERVAL_MS: u8 = 1;

// MIDI event encoding

/// Virtual cable number used for every event packet we originate.
pub const MIDI_CABLE: u8 = 0;

/// MIDI channel (0 = channel 1) for button note events.
pub const MIDI_CHANNEL: u8 = 0;

/// Note number sent on a button edge (middle C).
pub const TAP_NOTE: u8 = 60;

/// Velocity for both the Note-On and the Note-Off of a tap.
pub const TAP_VELOCITY: u8 = 127;

// Button debounce

/// Width of the debounce shift register in poll ticks. The logical state
/// only releases after this many consecutive low samples.
pub const DEBOUNCE_WINDOW_SAMPLES: u32 = 32;

// Hardware unique ID

/// The STM32F1 96-bit unique device ID, as bytes.
pub const UNIQUE_ID_LEN: usize = 12;

/// Serial string length: the unique ID rendered as uppercase hex.
pub const SERIAL_HEX_LEN: usize = 2 * UNIQUE_ID_LEN;
