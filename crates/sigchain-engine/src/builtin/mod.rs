//! Built-in audio processors.
//!
//! These are simple, essential units implemented directly in Rust. They
//! implement the `AudioProcessor` trait just like units supplied by any
//! other factory, so the chain treats them no differently.

pub mod amplifier;
pub mod constant;
pub mod keyboard;
pub mod mixer;

use crate::factory::UnitFactory;
use crate::unit::AudioUnit;
use sigchain_unit::AudioProcessor;

/// Uid prefix shared by every built-in unit
pub const UID_PREFIX: &str = "sigchain.builtin.";

const NAMES: [&str; 4] = ["constant", "amplifier", "mixer", "keyboard"];

/// Create a built-in processor by name
///
/// Accepts either the short name (`"mixer"`) or the full uid
/// (`"sigchain.builtin.mixer"`). Returns `None` if the name doesn't match
/// any known built-in processor.
///
/// # Examples
///
/// ```
/// use sigchain_engine::builtin;
///
/// let mixer = builtin::create_builtin("mixer").expect("mixer processor exists");
/// assert_eq!(mixer.info().uid, "sigchain.builtin.mixer");
/// ```
pub fn create_builtin(name: &str) -> Option<Box<dyn AudioProcessor>> {
    let name = name.strip_prefix(UID_PREFIX).unwrap_or(name);
    match name {
        "constant" => Some(Box::new(constant::ConstantProcessor::default())),
        "amplifier" => Some(Box::new(amplifier::AmplifierProcessor::default())),
        "mixer" => Some(Box::new(mixer::MixerProcessor::default())),
        "keyboard" => Some(Box::new(keyboard::KeyboardProcessor::default())),
        _ => None,
    }
}

/// Factory over the built-in units
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFactory;

impl UnitFactory for BuiltinFactory {
    fn uids(&self) -> Vec<&str> {
        vec![
            "sigchain.builtin.constant",
            "sigchain.builtin.amplifier",
            "sigchain.builtin.mixer",
            "sigchain.builtin.keyboard",
        ]
    }

    fn create(&self, uid: &str) -> Option<AudioUnit> {
        // Only full uids are accepted here; sessions always store them
        let name = uid.strip_prefix(UID_PREFIX)?;
        create_builtin(name).map(AudioUnit::new)
    }
}

/// Short names of every built-in unit
pub fn names() -> &'static [&'static str] {
    &NAMES
}
