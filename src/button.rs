//! Debounced button-to-MIDI event encoder.
//!
//! A shift register of the most recent raw samples is updated once per
//! poll tick; the logical state is the OR-reduction of the register, so a
//! press asserts immediately and only releases after the whole window has
//! drained to zero (sticky-release debounce, not a majority filter).
//!
//! Either logical edge emits a Note-On immediately followed by a
//! Note-Off, so the host observes a single "tap" per edge rather than
//! held-note semantics. That is deliberate and load-bearing for the
//! host-side mapping.

use crate::config;
use crate::error::Error;
use crate::midi;
use crate::usb::{write_retry, UsbPort};

/// A logical state transition of the debounced input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Press,
    Release,
}

/// Shift-register debouncer over one digital input.
///
/// The register is as wide as [`config::DEBOUNCE_WINDOW_SAMPLES`] poll
/// ticks, wide enough that it can be fed from a tight loop without a
/// dedicated debounce timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Debouncer {
    history: u32,
}

// The register width is what the window constant promises.
const _: () = assert!(config::DEBOUNCE_WINDOW_SAMPLES == u32::BITS);

impl Debouncer {
    pub const fn new() -> Self {
        Self { history: 0 }
    }

    /// Shift in one raw sample and report the logical edge, if any.
    pub fn update(&mut self, pressed: bool) -> Option<Edge> {
        let was_pressed = self.history != 0;
        self.history = (self.history << 1) | u32::from(pressed);
        let is_pressed = self.history != 0;
        match (was_pressed, is_pressed) {
            (false, true) => Some(Edge::Press),
            (true, false) => Some(Edge::Release),
            _ => None,
        }
    }

    /// Current debounced state.
    pub fn is_pressed(&self) -> bool {
        self.history != 0
    }
}

/// Emit one note tap: Note-On at fixed note and velocity, immediately
/// followed by Note-Off, both busy-retried onto the MIDI IN endpoint.
pub fn send_note_tap(port: &mut impl UsbPort) -> Result<(), Error> {
    write_retry(
        port,
        config::EP_MIDI_IN,
        &midi::note_on(
            config::MIDI_CABLE,
            config::MIDI_CHANNEL,
            config::TAP_NOTE,
            config::TAP_VELOCITY,
        ),
    )?;
    write_retry(
        port,
        config::EP_MIDI_IN,
        &midi::note_off(
            config::MIDI_CABLE,
            config::MIDI_CHANNEL,
            config::TAP_NOTE,
            config::TAP_VELOCITY,
        ),
    )
}

/// Debounced button bound to the note-tap encoder.
#[derive(Debug, Default)]
pub struct NoteButton {
    debouncer: Debouncer,
}

impl NoteButton {
    pub const fn new() -> Self {
        Self {
            debouncer: Debouncer::new(),
        }
    }

    /// One poll tick: sample, debounce, and tap on a logical edge.
    pub fn tick(&mut self, pressed: bool, port: &mut impl UsbPort) -> Result<Option<Edge>, Error> {
        let edge = self.debouncer.update(pressed);
        if edge.is_some() {
            send_note_tap(port)?;
        }
        Ok(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_asserts_immediately() {
        let mut deb = Debouncer::new();
        assert_eq!(deb.update(true), Some(Edge::Press));
        assert!(deb.is_pressed());
    }

    #[test]
    fn single_sample_releases_only_after_full_drain() {
        let mut deb = Debouncer::new();
        assert_eq!(deb.update(true), Some(Edge::Press));

        // The isolated sample keeps the state asserted while it shifts
        // through the window.
        for _ in 0..31 {
            assert_eq!(deb.update(false), None);
            assert!(deb.is_pressed());
        }

        // One more low sample drains the register.
        assert_eq!(deb.update(false), Some(Edge::Release));
        assert!(!deb.is_pressed());
    }

    #[test]
    fn bounce_during_press_does_not_retrigger() {
        let mut deb = Debouncer::new();
        assert_eq!(deb.update(true), Some(Edge::Press));
        for pattern in [false, true, false, true, true, false] {
            assert_eq!(deb.update(pattern), None);
        }
        assert!(deb.is_pressed());
    }

    #[test]
    fn held_input_stays_asserted() {
        let mut deb = Debouncer::new();
        assert_eq!(deb.update(true), Some(Edge::Press));
        for _ in 0..100 {
            assert_eq!(deb.update(true), None);
        }
        assert!(deb.is_pressed());
    }
}
