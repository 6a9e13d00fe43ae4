//! Discrete events delivered to units outside of the port graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// MIDI note number of concert A (440 Hz)
const A4_NOTE: i32 = 69;
const A4_FREQUENCY: f32 = 440.0;
const MAX_VELOCITY: f32 = 127.0;

fn note_frequency(number: i32) -> f32 {
    A4_FREQUENCY * 2.0_f32.powf((number - A4_NOTE) as f32 / 12.0)
}

fn normalize_velocity(velocity: i32) -> f32 {
    (velocity as f32 / MAX_VELOCITY).clamp(0.0, 1.0)
}

/// Key pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteOn {
    pub number: i32,
    pub velocity: i32,
}

impl NoteOn {
    pub const fn new(number: i32, velocity: i32) -> Self {
        Self { number, velocity }
    }

    /// Equal-temperament frequency of the note in Hz
    pub fn frequency(&self) -> f32 {
        note_frequency(self.number)
    }

    /// Velocity scaled to `0.0..=1.0`
    pub fn normalized_velocity(&self) -> f32 {
        normalize_velocity(self.velocity)
    }
}

/// Key released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteOff {
    pub number: i32,
    pub velocity: i32,
}

impl NoteOff {
    pub const fn new(number: i32, velocity: i32) -> Self {
        Self { number, velocity }
    }

    pub fn frequency(&self) -> f32 {
        note_frequency(self.number)
    }

    pub fn normalized_velocity(&self) -> f32 {
        normalize_velocity(self.velocity)
    }
}

/// Pitch wheel position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchBend {
    pub value: i32,
}

/// Continuous controller change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    pub number: i32,
    pub value: i32,
}

/// Events routed to units, independent of port connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Event {
    NoteOn(NoteOn),
    NoteOff(NoteOff),
    PitchBend(PitchBend),
    Controller(Controller),
}

impl Event {
    pub const fn note_on(number: i32, velocity: i32) -> Self {
        Self::NoteOn(NoteOn::new(number, velocity))
    }

    pub const fn note_off(number: i32, velocity: i32) -> Self {
        Self::NoteOff(NoteOff::new(number, velocity))
    }

    pub const fn pitch_bend(value: i32) -> Self {
        Self::PitchBend(PitchBend { value })
    }

    pub const fn controller(number: i32, value: i32) -> Self {
        Self::Controller(Controller { number, value })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoteOn(e) => write!(f, "NoteOn(number={}, velocity={})", e.number, e.velocity),
            Self::NoteOff(e) => {
                write!(f, "NoteOff(number={}, velocity={})", e.number, e.velocity)
            }
            Self::PitchBend(e) => write!(f, "PitchBend(value={})", e.value),
            Self::Controller(e) => {
                write!(f, "Controller(number={}, value={})", e.number, e.value)
            }
        }
    }
}
