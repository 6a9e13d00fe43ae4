//! Constant source - outputs a fixed, persisted value.

use sigchain_core::{AudioConfig, PropertyMap, Value};
use sigchain_unit::{AudioProcessor, PortLayout, PortSpec, ProcessContext, UnitError, UnitInfo};

/// Property key holding the output value
pub const VALUE_PROPERTY: &str = "value";

/// Source unit with a single Double output that always carries `value`
pub struct ConstantProcessor {
    value: f64,
    info: UnitInfo,
}

impl Default for ConstantProcessor {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ConstantProcessor {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            info: UnitInfo::new("sigchain.builtin.constant", "Constant"),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }
}

impl AudioProcessor for ConstantProcessor {
    fn info(&self) -> &UnitInfo {
        &self.info
    }

    fn ports(&self) -> PortLayout {
        PortLayout::new().output(PortSpec::double("out"))
    }

    fn process_start(&mut self, _config: &AudioConfig) -> Result<(), UnitError> {
        Ok(())
    }

    fn process_stop(&mut self) {}

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), UnitError> {
        ctx.set_output(0, self.value)
    }

    fn reset(&mut self) {}

    fn serialize(&self, data: &mut PropertyMap) {
        data.insert(VALUE_PROPERTY.to_string(), Value::Double(self.value));
    }

    fn deserialize(&mut self, data: &PropertyMap) -> Result<(), UnitError> {
        match data.get(VALUE_PROPERTY) {
            Some(Value::Double(v)) => self.value = *v,
            Some(Value::Int(v)) => self.value = *v as f64,
            Some(other) => {
                return Err(UnitError::InvalidProperty(format!(
                    "{VALUE_PROPERTY} must be numeric, got {other}"
                )));
            }
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigchain_unit::OutputPort;

    #[test]
    fn test_constant_output() {
        let mut processor = ConstantProcessor::new(2.0);
        let config = AudioConfig::default();
        let mut outputs = [OutputPort::new("out", sigchain_core::ValueType::Double, 0)];

        let mut ctx = ProcessContext::new(&[], &mut outputs, &config);
        processor.process(&mut ctx).unwrap();

        assert_eq!(outputs[0].value(), &Value::Double(2.0));
    }

    #[test]
    fn test_value_property_round_trip() {
        let mut data = PropertyMap::new();
        ConstantProcessor::new(-0.5).serialize(&mut data);

        let mut restored = ConstantProcessor::default();
        restored.deserialize(&data).unwrap();
        assert_eq!(restored.value(), -0.5);
    }

    #[test]
    fn test_invalid_value_property() {
        let mut data = PropertyMap::new();
        data.insert(VALUE_PROPERTY.to_string(), Value::Bool(true));

        let mut processor = ConstantProcessor::new(1.0);
        assert!(matches!(
            processor.deserialize(&data),
            Err(UnitError::InvalidProperty(_))
        ));
        assert_eq!(processor.value(), 1.0);
    }
}
