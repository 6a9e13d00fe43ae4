//! Signal chain engine.
//!
//! This crate provides the audio unit node (ports plus lifecycle), the
//! signal chain that owns units and drives the pull scheduler, the
//! built-in units, and session persistence.

pub mod builtin;
pub mod chain;
pub mod factory;
pub mod session;
pub mod unit;

pub use builtin::BuiltinFactory;
pub use chain::{SignalChain, StartError};
pub use factory::UnitFactory;
pub use session::{Session, SessionError};
pub use unit::AudioUnit;

pub use sigchain_core::{AudioConfig, Direction, PortAddress, UnitId, Value, ValueType};
pub use sigchain_unit::{
    AudioProcessor, Event, PortLayout, PortSpec, ProcessContext, UnitError, UnitInfo,
};
