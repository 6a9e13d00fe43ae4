//! Mixer - combines two signals.

use sigchain_core::{AudioConfig, PropertyMap, Value};
use sigchain_unit::{AudioProcessor, PortLayout, PortSpec, ProcessContext, UnitError, UnitInfo};

const MAX_GAIN: f64 = 2.0;

/// Simple 2-input mixer
///
/// ## Signal Flow
///
/// ```text
/// in1 --[gain1]--\
///                 >--[master]--> out
/// in2 --[gain2]--/
/// ```
///
/// ## Properties
///
/// `gain1`, `gain2`, `master`: linear, 0.0 to 2.0, default 1.0.
pub struct MixerProcessor {
    gain1: f64,
    gain2: f64,
    master: f64,
    info: UnitInfo,
}

impl Default for MixerProcessor {
    fn default() -> Self {
        Self {
            gain1: 1.0,
            gain2: 1.0,
            master: 1.0,
            info: UnitInfo::new("sigchain.builtin.mixer", "Mixer"),
        }
    }
}

impl MixerProcessor {
    pub fn set_gains(&mut self, gain1: f64, gain2: f64, master: f64) {
        self.gain1 = gain1.clamp(0.0, MAX_GAIN);
        self.gain2 = gain2.clamp(0.0, MAX_GAIN);
        self.master = master.clamp(0.0, MAX_GAIN);
    }

    pub fn gains(&self) -> (f64, f64, f64) {
        (self.gain1, self.gain2, self.master)
    }
}

fn read_gain(data: &PropertyMap, key: &str, current: f64) -> Result<f64, UnitError> {
    match data.get(key) {
        None => Ok(current),
        Some(Value::Double(v)) => Ok(*v),
        Some(Value::Int(v)) => Ok(*v as f64),
        Some(other) => Err(UnitError::InvalidProperty(format!(
            "{key} must be numeric, got {other}"
        ))),
    }
}

impl AudioProcessor for MixerProcessor {
    fn info(&self) -> &UnitInfo {
        &self.info
    }

    fn ports(&self) -> PortLayout {
        PortLayout::new()
            .input(PortSpec::double("in1"))
            .input(PortSpec::double("in2"))
            .output(PortSpec::double("out"))
    }

    fn process_start(&mut self, _config: &AudioConfig) -> Result<(), UnitError> {
        Ok(())
    }

    fn process_stop(&mut self) {}

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), UnitError> {
        let mixed = ctx.input_f64(0) * self.gain1 + ctx.input_f64(1) * self.gain2;
        ctx.set_output(0, mixed * self.master)
    }

    fn reset(&mut self) {}

    fn serialize(&self, data: &mut PropertyMap) {
        data.insert("gain1".to_string(), Value::Double(self.gain1));
        data.insert("gain2".to_string(), Value::Double(self.gain2));
        data.insert("master".to_string(), Value::Double(self.master));
    }

    fn deserialize(&mut self, data: &PropertyMap) -> Result<(), UnitError> {
        let gain1 = read_gain(data, "gain1", self.gain1)?;
        let gain2 = read_gain(data, "gain2", self.gain2)?;
        let master = read_gain(data, "master", self.master)?;
        self.set_gains(gain1, gain2, master);
        Ok(())
    }
}
