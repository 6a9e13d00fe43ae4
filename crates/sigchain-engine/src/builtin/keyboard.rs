//! Keyboard - turns note and pitch-bend events into control signals.

use sigchain_core::{AudioConfig, PropertyMap, Value};
use sigchain_unit::{
    AudioProcessor, NoteOff, NoteOn, PitchBend, PortLayout, PortSpec, ProcessContext, UnitError,
    UnitInfo,
};

/// Pitch bend value that corresponds to a full bend range
const BEND_SCALE: f64 = 8192.0;
const DEFAULT_BEND_RANGE: f64 = 2.0;

/// Monophonic keyboard with last-note priority
///
/// Outputs:
/// - `frequency` (Hz, including pitch bend)
/// - `velocity` (0.0 to 1.0)
/// - `gate` (true while a note is held)
///
/// The `bend_range` property sets how many semitones a full pitch bend
/// (±8192) spans.
pub struct KeyboardProcessor {
    note: Option<NoteOn>,
    bend: i32,
    bend_range: f64,
    info: UnitInfo,
}

impl Default for KeyboardProcessor {
    fn default() -> Self {
        Self {
            note: None,
            bend: 0,
            bend_range: DEFAULT_BEND_RANGE,
            info: UnitInfo::new("sigchain.builtin.keyboard", "Keyboard"),
        }
    }
}

impl KeyboardProcessor {
    fn bent_frequency(&self, note: &NoteOn) -> f64 {
        let semitones = f64::from(self.bend) / BEND_SCALE * self.bend_range;
        f64::from(note.frequency()) * (semitones / 12.0).exp2()
    }
}

impl AudioProcessor for KeyboardProcessor {
    fn info(&self) -> &UnitInfo {
        &self.info
    }

    fn ports(&self) -> PortLayout {
        PortLayout::new()
            .output(PortSpec::double("frequency"))
            .output(PortSpec::double("velocity"))
            .output(PortSpec::bool("gate"))
    }

    fn process_start(&mut self, _config: &AudioConfig) -> Result<(), UnitError> {
        Ok(())
    }

    fn process_stop(&mut self) {
        // Release the held note so a restart begins silent
        self.note = None;
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), UnitError> {
        match self.note {
            Some(note) => {
                ctx.set_output(0, self.bent_frequency(&note))?;
                ctx.set_output(1, f64::from(note.normalized_velocity()))?;
                ctx.set_output(2, true)
            }
            // Frequency holds so a release envelope keeps its pitch
            None => ctx.set_output(2, false),
        }
    }

    fn reset(&mut self) {
        self.note = None;
        self.bend = 0;
    }

    fn on_note_on(&mut self, event: &NoteOn) {
        self.note = Some(*event);
    }

    fn on_note_off(&mut self, event: &NoteOff) {
        if self.note.is_some_and(|held| held.number == event.number) {
            self.note = None;
        }
    }

    fn on_pitch_bend(&mut self, event: &PitchBend) {
        self.bend = event.value;
    }

    fn serialize(&self, data: &mut PropertyMap) {
        data.insert("bend_range".to_string(), Value::Double(self.bend_range));
    }

    fn deserialize(&mut self, data: &PropertyMap) -> Result<(), UnitError> {
        match data.get("bend_range") {
            None => {}
            Some(Value::Double(v)) => self.bend_range = *v,
            Some(Value::Int(v)) => self.bend_range = *v as f64,
            Some(other) => {
                return Err(UnitError::InvalidProperty(format!(
                    "bend_range must be numeric, got {other}"
                )));
            }
        }
        Ok(())
    }
}
