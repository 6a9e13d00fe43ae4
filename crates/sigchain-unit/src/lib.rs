//! Audio unit abstraction layer.
//!
//! This crate defines the `AudioProcessor` trait that every unit
//! implementation (built-in or supplied by a plugin layer) must implement.
//! The signal chain drives units only through this contract, so it never
//! needs to know what a concrete unit does.

pub mod event;
pub mod port;

pub use event::{Controller, Event, NoteOff, NoteOn, PitchBend};
pub use port::{InputPort, OutputPort};

use sigchain_core::{AudioConfig, PropertyMap, Value, ValueType};

/// Declaration of a single port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub name: String,
    pub value_type: ValueType,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }

    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Double)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Int)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Bool)
    }
}

/// Ordered input and output ports of a unit.
///
/// Positions in these lists become the port indices used to address ports
/// from outside the unit, so a processor must always report the same layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortLayout {
    pub inputs: Vec<PortSpec>,
    pub outputs: Vec<PortSpec>,
}

impl PortLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, spec: PortSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    pub fn output(mut self, spec: PortSpec) -> Self {
        self.outputs.push(spec);
        self
    }
}

/// Unit metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitInfo {
    /// Factory identifier, used to re-create the unit when a session loads
    pub uid: String,
    pub name: String,
}

impl UnitInfo {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
        }
    }
}

/// Port values visible to a unit while it processes one cycle
pub struct ProcessContext<'a> {
    inputs: &'a [Value],
    outputs: &'a mut [OutputPort],
    config: &'a AudioConfig,
}

impl<'a> ProcessContext<'a> {
    /// Build a context over resolved input values and the unit's outputs
    pub fn new(
        inputs: &'a [Value],
        outputs: &'a mut [OutputPort],
        config: &'a AudioConfig,
    ) -> Self {
        Self {
            inputs,
            outputs,
            config,
        }
    }

    pub fn config(&self) -> &AudioConfig {
        self.config
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn input(&self, index: usize) -> Option<&Value> {
        self.inputs.get(index)
    }

    /// Input read as a double; missing ports read as `0.0`
    pub fn input_f64(&self, index: usize) -> f64 {
        self.inputs.get(index).map_or(0.0, Value::as_f64)
    }

    pub fn input_bool(&self, index: usize) -> bool {
        self.inputs.get(index).is_some_and(Value::as_bool)
    }

    /// Value currently held by an output (the previous cycle's value until set)
    pub fn output(&self, index: usize) -> Option<&Value> {
        self.outputs.get(index).map(OutputPort::value)
    }

    /// Write an output value.
    ///
    /// The value must have the output port's type; otherwise the port keeps
    /// its current value and `TypeMismatch` is returned.
    pub fn set_output(&mut self, index: usize, value: impl Into<Value>) -> Result<(), UnitError> {
        self.outputs
            .get_mut(index)
            .ok_or(UnitError::NoSuchOutput(index))?
            .set_value(value.into())?;
        Ok(())
    }
}

/// Main trait that all audio units implement.
///
/// The lifecycle hooks (`process_start`, `process_stop`, `process`, `reset`)
/// are mandatory. Event hooks and persistence hooks default to no-ops so a
/// unit only overrides what it cares about.
pub trait AudioProcessor: Send {
    /// Get unit information
    fn info(&self) -> &UnitInfo;

    /// Declare the unit's ports. Called once when the unit is constructed.
    fn ports(&self) -> PortLayout;

    /// Acquire resources before processing starts
    fn process_start(&mut self, config: &AudioConfig) -> Result<(), UnitError>;

    /// Release whatever `process_start` acquired
    fn process_stop(&mut self);

    /// Compute outputs from the current input values and internal state
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), UnitError>;

    /// Clear internal state (filter history, phases) without stopping
    fn reset(&mut self);

    fn on_note_on(&mut self, _event: &NoteOn) {}

    fn on_note_off(&mut self, _event: &NoteOff) {}

    fn on_pitch_bend(&mut self, _event: &PitchBend) {}

    fn on_controller(&mut self, _event: &Controller) {}

    /// Store unit-specific settings
    fn serialize(&self, _data: &mut PropertyMap) {}

    /// Restore settings written by `serialize`
    fn deserialize(&mut self, _data: &PropertyMap) -> Result<(), UnitError> {
        Ok(())
    }
}

/// Unit-related errors
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("Unit start failed: {0}")]
    StartFailed(String),

    #[error("Unit processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    #[error("No output port at index {0}")]
    NoSuchOutput(usize),

    #[error(transparent)]
    Port(#[from] sigchain_core::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_layout_builder() {
        let layout = PortLayout::new()
            .input(PortSpec::double("in"))
            .input(PortSpec::bool("gate"))
            .output(PortSpec::double("out"));

        assert_eq!(layout.inputs.len(), 2);
        assert_eq!(layout.inputs[1].value_type, ValueType::Bool);
        assert_eq!(layout.outputs[0].name, "out");
    }

    #[test]
    fn test_context_reads_missing_inputs_as_default() {
        let config = AudioConfig::default();
        let inputs = [Value::Double(1.5)];
        let mut outputs: [OutputPort; 0] = [];
        let ctx = ProcessContext::new(&inputs, &mut outputs, &config);

        assert_eq!(ctx.input_f64(0), 1.5);
        assert_eq!(ctx.input_f64(5), 0.0);
        assert!(!ctx.input_bool(5));
    }

    #[test]
    fn test_set_output_enforces_type() {
        let config = AudioConfig::default();
        let inputs: [Value; 0] = [];
        let mut outputs = [OutputPort::new("out", ValueType::Double, 0)];
        let mut ctx = ProcessContext::new(&inputs, &mut outputs, &config);

        ctx.set_output(0, 4.0).unwrap();
        assert_eq!(ctx.output(0), Some(&Value::Double(4.0)));

        let result = ctx.set_output(0, true);
        assert!(matches!(
            result,
            Err(UnitError::Port(sigchain_core::Error::TypeMismatch { .. }))
        ));
        assert_eq!(ctx.output(0), Some(&Value::Double(4.0)));

        assert!(matches!(
            ctx.set_output(3, 1.0),
            Err(UnitError::NoSuchOutput(3))
        ));
    }
}
