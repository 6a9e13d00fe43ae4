//! Core types, traits, and constants shared across the sigchain ecosystem.
//!
//! This crate provides the value model that flows through ports, the
//! identifiers used to address units and ports, and the common error type.

pub mod value;

pub use value::{PropertyMap, Value, ValueType};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sample rate in Hz
pub type SampleRate = u32;

/// Number of audio frames (samples per channel)
pub type Frames = usize;

/// Common sample rates
pub mod sample_rates {
    use super::SampleRate;

    /// 44.1 kHz sample rate (CD quality)
    pub const SR_44100: SampleRate = 44100;
    /// 48 kHz sample rate (professional audio standard)
    pub const SR_48000: SampleRate = 48000;
    /// 96 kHz sample rate (high resolution audio)
    pub const SR_96000: SampleRate = 96000;
}

/// Processing configuration handed to every unit when it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: SampleRate,
    pub block_size: Frames,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: sample_rates::SR_48000,
            block_size: 256,
        }
    }
}

/// Identifier of an audio unit within its signal chain.
///
/// Identifiers are handed out in increasing order and never reused by the
/// chain that issued them, so iterating units by id follows insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub usize);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Port data flow direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Position of a port: owning unit, direction, and index in that unit's list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortAddress {
    pub unit: UnitId,
    pub direction: Direction,
    pub index: usize,
}

impl PortAddress {
    pub const fn input(unit: UnitId, index: usize) -> Self {
        Self {
            unit,
            direction: Direction::Input,
            index,
        }
    }

    pub const fn output(unit: UnitId, index: usize) -> Self {
        Self {
            unit,
            direction: Direction::Output,
            index,
        }
    }
}

impl fmt::Display for PortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}[{}]", self.unit, self.direction, self.index)
    }
}

/// Common error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A value or connection did not match the port's declared type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValueType, found: ValueType },

    /// The unit is not part of this signal chain
    #[error("Unknown audio unit {0}")]
    UnknownUnit(UnitId),

    /// Port index outside of the unit's port list
    #[error("Unit {unit} has no {direction} port at index {index}")]
    PortOutOfRange {
        unit: UnitId,
        direction: Direction,
        index: usize,
    },

    /// An input was given where an output was expected, or vice versa
    #[error("Port {0} has the wrong direction for this operation")]
    WrongDirection(PortAddress),

    /// Other unclassified error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;
