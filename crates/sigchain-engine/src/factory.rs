//! Unit factory contract used by the plugin layer and by session loading.

use crate::unit::AudioUnit;

/// Creates audio units from their uid.
///
/// Implemented by whatever layer discovers unit implementations. The chain
/// only needs the produced unit to honor the `AudioProcessor` contract.
pub trait UnitFactory {
    /// Every uid this factory can create
    fn uids(&self) -> Vec<&str>;

    /// Create a fresh, stopped, detached unit; `None` for unknown uids
    fn create(&self, uid: &str) -> Option<AudioUnit>;
}
