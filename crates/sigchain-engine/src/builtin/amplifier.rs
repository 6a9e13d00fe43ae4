//! Amplifier - multiplies a signal by a gain signal.

use sigchain_core::AudioConfig;
use sigchain_unit::{AudioProcessor, PortLayout, PortSpec, ProcessContext, UnitError, UnitInfo};

/// `out = in * gain`
///
/// Both factors are ports, so an unconnected gain input reads `0.0` and
/// silences the output.
pub struct AmplifierProcessor {
    info: UnitInfo,
}

impl Default for AmplifierProcessor {
    fn default() -> Self {
        Self {
            info: UnitInfo::new("sigchain.builtin.amplifier", "Amplifier"),
        }
    }
}

impl AudioProcessor for AmplifierProcessor {
    fn info(&self) -> &UnitInfo {
        &self.info
    }

    fn ports(&self) -> PortLayout {
        PortLayout::new()
            .input(PortSpec::double("in"))
            .input(PortSpec::double("gain"))
            .output(PortSpec::double("out"))
    }

    fn process_start(&mut self, _config: &AudioConfig) -> Result<(), UnitError> {
        Ok(())
    }

    fn process_stop(&mut self) {}

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), UnitError> {
        let v = ctx.input_f64(0);
        let gain = ctx.input_f64(1);
        ctx.set_output(0, v * gain)
    }

    fn reset(&mut self) {}
}
