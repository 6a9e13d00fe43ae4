//! Signal chain: unit ownership, connections, and the pull scheduler.

use std::collections::{BTreeMap, VecDeque};

use sigchain_core::{AudioConfig, Direction, Error, PortAddress, Result, UnitId, Value};
use sigchain_unit::{Event, InputPort, UnitError};

use crate::unit::AudioUnit;

/// A unit failed to start while the chain was starting
#[derive(Debug, thiserror::Error)]
#[error("Unit {unit} failed to start: {source}")]
pub struct StartError {
    pub unit: UnitId,
    #[source]
    pub source: UnitError,
}

/// Owning collection of audio units plus global start/stop/enable state.
///
/// # Scheduling
///
/// Units are evaluated by pulling: updating a unit first updates every unit
/// that feeds one of its inputs, then runs its processor. Each unit carries
/// an `updated` flag that is cleared by [`prepare_update`](Self::prepare_update)
/// at the start of a cycle and set before its inputs are pulled, so a unit
/// runs at most once per cycle.
///
/// Feedback loops are allowed. When a pull reaches a unit that is already
/// being updated, it stops there and the downstream reader sees that unit's
/// output as it stood when the cycle began: a one-cycle delay.
///
/// # Threading
///
/// The chain is driven from a single thread. Graph edits (add, remove,
/// connect) must happen between cycles.
pub struct SignalChain {
    units: BTreeMap<UnitId, AudioUnit>,
    next_id: usize,
    enabled: bool,
    running: bool,
    config: AudioConfig,

    // Insertion-ordered ids, maintained on add/remove so that
    // `run_cycle_all` does not allocate
    order: Vec<UnitId>,
}

impl SignalChain {
    /// Create a new empty chain with the default configuration
    pub fn new() -> Self {
        Self::with_config(AudioConfig::default())
    }

    pub fn with_config(config: AudioConfig) -> Self {
        Self {
            units: BTreeMap::new(),
            next_id: 0,
            enabled: true,
            running: false,
            config,
            order: Vec::new(),
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable processing.
    ///
    /// While disabled every update is a no-op, so outputs hold their last
    /// values while unit state stays intact.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        tracing::debug!("Signal chain {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units in insertion order
    pub fn units(&self) -> impl Iterator<Item = &AudioUnit> {
        self.units.values()
    }

    pub fn unit_ids(&self) -> &[UnitId] {
        &self.order
    }

    pub fn unit(&self, id: UnitId) -> Option<&AudioUnit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut AudioUnit> {
        self.units.get_mut(&id)
    }

    /// Take ownership of a unit and return its id in this chain.
    ///
    /// A unit that is still running (for example after being removed from a
    /// running chain) keeps its started state.
    pub fn add_audio_unit(&mut self, mut unit: AudioUnit) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;

        unit.attach(id);
        tracing::debug!(
            "Added unit {} ({}, {} inputs, {} outputs)",
            id,
            unit.uid(),
            unit.inputs().len(),
            unit.outputs().len()
        );

        self.units.insert(id, unit);
        self.order.push(id);
        id
    }

    /// Detach a unit and hand it back to the caller.
    ///
    /// Every input elsewhere that reads one of its outputs is disconnected
    /// first, and the unit's own inputs are cleared, so no binding can refer
    /// to a unit that is no longer in the chain.
    pub fn remove_audio_unit(&mut self, id: UnitId) -> Option<AudioUnit> {
        let mut unit = self.units.remove(&id)?;
        self.order.retain(|&other| other != id);

        for other in self.units.values_mut() {
            other.disconnect_inputs_from(id);
        }

        unit.detach();
        tracing::debug!("Removed unit {}", id);
        Some(unit)
    }

    /// Bind the input at `to` to the output at `from`.
    ///
    /// Replaces any existing binding of that input. On error (unknown unit,
    /// index out of range, wrong direction, type mismatch) nothing changes.
    pub fn connect(&mut self, from: PortAddress, to: PortAddress) -> Result<()> {
        if from.direction != Direction::Output {
            return Err(Error::WrongDirection(from));
        }
        if to.direction != Direction::Input {
            return Err(Error::WrongDirection(to));
        }

        let output = self
            .units
            .get(&from.unit)
            .ok_or(Error::UnknownUnit(from.unit))?
            .output(from.index)
            .ok_or(Error::PortOutOfRange {
                unit: from.unit,
                direction: Direction::Output,
                index: from.index,
            })?
            .clone();

        self.input_port_mut(to)?.connect(&output)?;
        tracing::debug!("Connected {} -> {}", from, to);
        Ok(())
    }

    /// Clear the binding of the input at `to`. Disconnecting twice is fine.
    pub fn disconnect(&mut self, to: PortAddress) -> Result<()> {
        if to.direction != Direction::Input {
            return Err(Error::WrongDirection(to));
        }

        let input = self.input_port_mut(to)?;
        if input.is_connected() {
            input.disconnect();
            tracing::debug!("Disconnected {}", to);
        }
        Ok(())
    }

    /// All bindings as `(output, input)` pairs, in unit then port order
    pub fn connections(&self) -> Vec<(PortAddress, PortAddress)> {
        self.units
            .values()
            .flat_map(|unit| unit.inputs().iter())
            .filter_map(|input| Some((input.connected_output()?, input.address()?)))
            .collect()
    }

    fn input_port_mut(&mut self, to: PortAddress) -> Result<&mut InputPort> {
        self.units
            .get_mut(&to.unit)
            .ok_or(Error::UnknownUnit(to.unit))?
            .input_mut(to.index)
            .ok_or(Error::PortOutOfRange {
                unit: to.unit,
                direction: Direction::Input,
                index: to.index,
            })
    }

    /// Start every unit.
    ///
    /// A unit that fails to start is logged and skipped; units already
    /// started stay started. The first failure is returned after all units
    /// have been tried.
    pub fn start(&mut self) -> std::result::Result<(), StartError> {
        let mut first_error = None;

        for (&id, unit) in &mut self.units {
            if let Err(source) = unit.start(&self.config) {
                tracing::error!("Failed to start unit {} ({}): {}", id, unit.uid(), source);
                if first_error.is_none() {
                    first_error = Some(StartError { unit: id, source });
                }
            }
        }

        self.running = true;
        tracing::info!("Signal chain started ({} units)", self.units.len());

        first_error.map_or(Ok(()), Err)
    }

    /// Stop every unit
    pub fn stop(&mut self) {
        for unit in self.units.values_mut() {
            unit.stop();
        }

        self.running = false;
        tracing::info!("Signal chain stopped");
    }

    /// Reset the internal state of every unit
    pub fn reset(&mut self) {
        for unit in self.units.values_mut() {
            unit.reset();
        }
    }

    /// Clear every unit's updated flag. Call once before each cycle.
    pub fn prepare_update(&mut self) {
        for unit in self.units.values_mut() {
            unit.prepare_update();
        }
    }

    /// Pull-update a unit: update its upstream units, then process it.
    ///
    /// No-op if the unit is stopped, already updated this cycle, or the
    /// chain is disabled (checked in that order).
    pub fn update_unit(&mut self, id: UnitId) {
        self.pull(id, true);
    }

    /// Update a unit without pulling its inputs first.
    ///
    /// Inputs read whatever the connected outputs currently hold. Meant for
    /// units with no input that needs a fresh value this cycle.
    pub fn fast_update_unit(&mut self, id: UnitId) {
        self.pull(id, false);
    }

    /// Run one cycle pulling the given units, typically the sinks
    pub fn run_cycle(&mut self, pulled: &[UnitId]) {
        self.prepare_update();
        for &id in pulled {
            self.update_unit(id);
        }
    }

    /// Run one cycle pulling every unit in insertion order
    pub fn run_cycle_all(&mut self) {
        self.prepare_update();
        for i in 0..self.order.len() {
            let id = self.order[i];
            self.update_unit(id);
        }
    }

    fn pull(&mut self, id: UnitId, with_inputs: bool) {
        let enabled = self.enabled;
        let Some(unit) = self.units.get_mut(&id) else {
            return;
        };
        if !unit.begin_update(enabled) {
            return;
        }

        let input_count = unit.inputs().len();

        if with_inputs {
            // Depth-first, in port order
            for index in 0..input_count {
                let upstream = self
                    .units
                    .get(&id)
                    .and_then(|unit| unit.input(index))
                    .and_then(|input| input.connected_output());
                if let Some(address) = upstream {
                    self.pull(address.unit, true);
                }
            }
        }

        for index in 0..input_count {
            let value = self.read_input(id, index);
            if let Some(unit) = self.units.get_mut(&id) {
                unit.set_input_value(index, value);
            }
        }

        let config = self.config;
        if let Some(unit) = self.units.get_mut(&id) {
            if let Err(e) = unit.run_process(&config) {
                tracing::warn!("Unit {} ({}) failed to process: {}", id, unit.uid(), e);
            }
        }
    }

    /// Current value seen by an input, without updating anything
    fn read_input(&self, id: UnitId, index: usize) -> Value {
        let Some(input) = self.units.get(&id).and_then(|unit| unit.input(index)) else {
            return Value::default();
        };

        input
            .connected_output()
            .and_then(|address| self.units.get(&address.unit)?.output_value(address.index))
            .cloned()
            .unwrap_or_else(|| input.default_value())
    }

    /// Read an input port, first updating the unit that feeds it.
    ///
    /// Unconnected inputs read as their type's default value.
    pub fn input_value(&mut self, id: UnitId, index: usize) -> Result<Value> {
        let input = self
            .units
            .get(&id)
            .ok_or(Error::UnknownUnit(id))?
            .input(index)
            .ok_or(Error::PortOutOfRange {
                unit: id,
                direction: Direction::Input,
                index,
            })?;

        if let Some(address) = input.connected_output() {
            self.update_unit(address.unit);
        }

        Ok(self.read_input(id, index))
    }

    /// Current value of an output port (no side effects)
    pub fn output_value(&self, id: UnitId, index: usize) -> Result<Value> {
        self.units
            .get(&id)
            .ok_or(Error::UnknownUnit(id))?
            .output_value(index)
            .cloned()
            .ok_or(Error::PortOutOfRange {
                unit: id,
                direction: Direction::Output,
                index,
            })
    }

    /// Extend a traversal with `id` and everything upstream of it.
    ///
    /// The unit prepends itself unless `chain` already contains it, then
    /// recurses into the owners of the outputs its inputs read from. Each
    /// unit appears once. Because every unit prepends itself, a producer ends
    /// up ahead of the consumer that reached it. Order between independent
    /// branches follows port order and is not otherwise guaranteed.
    pub fn update_chain(&self, id: UnitId, mut chain: VecDeque<UnitId>) -> VecDeque<UnitId> {
        if chain.contains(&id) {
            return chain;
        }
        let Some(unit) = self.units.get(&id) else {
            return chain;
        };

        chain.push_front(id);

        for input in unit.inputs() {
            if let Some(address) = input.connected_output() {
                chain = self.update_chain(address.unit, chain);
            }
        }

        chain
    }

    /// Dependency order computed from `id` with an empty traversal
    pub fn dependency_order(&self, id: UnitId) -> Vec<UnitId> {
        self.update_chain(id, VecDeque::new()).into()
    }

    /// Deliver an event synchronously to one unit
    pub fn handle_event(&mut self, id: UnitId, event: &Event) -> Result<()> {
        self.units
            .get_mut(&id)
            .ok_or(Error::UnknownUnit(id))?
            .handle_event(event);
        Ok(())
    }

    /// Deliver an event synchronously to every unit
    pub fn broadcast_event(&mut self, event: &Event) {
        for unit in self.units.values_mut() {
            unit.handle_event(event);
        }
    }
}

impl Default for SignalChain {
    fn default() -> Self {
        Self::new()
    }
}
