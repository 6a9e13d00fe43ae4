//! Audio unit node: a processor together with the ports it owns.

use sigchain_core::{AudioConfig, PropertyMap, UnitId, Value};
use sigchain_unit::{
    AudioProcessor, Event, InputPort, OutputPort, ProcessContext, UnitError, UnitInfo,
};

/// A node in the signal chain (wraps an `AudioProcessor`)
pub struct AudioUnit {
    id: Option<UnitId>,
    processor: Box<dyn AudioProcessor>,
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,
    /// Input values resolved for the current cycle, one per input port
    input_values: Vec<Value>,
    started: bool,
    updated: bool,
}

impl AudioUnit {
    /// Wrap a processor, creating the ports it declares.
    ///
    /// The port layout is read once here; port indices never change afterwards.
    pub fn new(processor: Box<dyn AudioProcessor>) -> Self {
        let layout = processor.ports();

        let inputs: Vec<InputPort> = layout
            .inputs
            .iter()
            .enumerate()
            .map(|(index, spec)| InputPort::from_spec(spec, index))
            .collect();
        let outputs = layout
            .outputs
            .iter()
            .enumerate()
            .map(|(index, spec)| OutputPort::from_spec(spec, index))
            .collect();
        let input_values = inputs.iter().map(InputPort::default_value).collect();

        Self {
            id: None,
            processor,
            inputs,
            outputs,
            input_values,
            started: false,
            updated: false,
        }
    }

    /// Id within the owning chain, `None` while detached
    pub fn id(&self) -> Option<UnitId> {
        self.id
    }

    pub fn info(&self) -> &UnitInfo {
        self.processor.info()
    }

    pub fn uid(&self) -> &str {
        &self.processor.info().uid
    }

    pub fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    pub fn input(&self, index: usize) -> Option<&InputPort> {
        self.inputs.get(index)
    }

    pub fn output(&self, index: usize) -> Option<&OutputPort> {
        self.outputs.get(index)
    }

    pub(crate) fn input_mut(&mut self, index: usize) -> Option<&mut InputPort> {
        self.inputs.get_mut(index)
    }

    /// Current value of an output (no side effects)
    pub fn output_value(&self, index: usize) -> Option<&Value> {
        self.outputs.get(index).map(OutputPort::value)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether this unit already ran in the current cycle
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Start processing. Calls `process_start` once per stopped-to-started transition.
    pub fn start(&mut self, config: &AudioConfig) -> Result<(), UnitError> {
        if self.started {
            return Ok(());
        }

        self.processor.process_start(config)?;
        self.started = true;
        Ok(())
    }

    /// Stop processing. Calls `process_stop` once per started-to-stopped transition.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }

        self.processor.process_stop();
        self.started = false;
    }

    /// Clear internal processor state; start/stop state is untouched
    pub fn reset(&mut self) {
        self.processor.reset();
    }

    /// Clear the per-cycle updated flag
    pub fn prepare_update(&mut self) {
        self.updated = false;
    }

    /// Dispatch an event to the matching processor hook
    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::NoteOn(e) => self.processor.on_note_on(e),
            Event::NoteOff(e) => self.processor.on_note_off(e),
            Event::PitchBend(e) => self.processor.on_pitch_bend(e),
            Event::Controller(e) => self.processor.on_controller(e),
            _ => {}
        }
    }

    pub fn serialize(&self, data: &mut PropertyMap) {
        self.processor.serialize(data);
    }

    pub fn deserialize(&mut self, data: &PropertyMap) -> Result<(), UnitError> {
        self.processor.deserialize(data)
    }

    /// Scheduler gate: returns `true` and marks the unit updated if it may run now
    pub(crate) fn begin_update(&mut self, chain_enabled: bool) -> bool {
        if !self.started || self.updated || !chain_enabled {
            return false;
        }

        // Set before pulling inputs so a feedback path back to this unit stops here
        self.updated = true;
        true
    }

    pub(crate) fn set_input_value(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.input_values.get_mut(index) {
            *slot = value;
        }
    }

    /// Run the processor over the resolved input values
    pub(crate) fn run_process(&mut self, config: &AudioConfig) -> Result<(), UnitError> {
        let mut ctx = ProcessContext::new(&self.input_values, &mut self.outputs, config);
        self.processor.process(&mut ctx)
    }

    /// Drop every input binding that reads from `unit`
    pub(crate) fn disconnect_inputs_from(&mut self, unit: UnitId) {
        for input in &mut self.inputs {
            if input
                .connected_output()
                .is_some_and(|address| address.unit == unit)
            {
                input.disconnect();
            }
        }
    }

    pub(crate) fn attach(&mut self, id: UnitId) {
        self.id = Some(id);
        for input in &mut self.inputs {
            input.set_owner(Some(id));
        }
        for output in &mut self.outputs {
            output.set_owner(Some(id));
        }
    }

    /// Forget the chain: owner ids and every input binding are cleared
    pub(crate) fn detach(&mut self) {
        self.id = None;
        self.updated = false;
        for input in &mut self.inputs {
            input.disconnect();
            input.set_owner(None);
        }
        for output in &mut self.outputs {
            output.set_owner(None);
        }
    }
}

impl std::fmt::Debug for AudioUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioUnit")
            .field("id", &self.id)
            .field("uid", &self.uid())
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigchain_unit::{NoteOn, PitchBend, PortLayout, PortSpec};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        starts: AtomicUsize,
        stops: AtomicUsize,
        note_ons: AtomicUsize,
        bends: AtomicUsize,
    }

    /// Test processor that counts lifecycle calls and events
    struct CountingUnit {
        info: UnitInfo,
        counters: Arc<Counters>,
    }

    impl CountingUnit {
        fn new(counters: Arc<Counters>) -> Self {
            Self {
                info: UnitInfo::new("test.counting", "Counting"),
                counters,
            }
        }
    }

    impl AudioProcessor for CountingUnit {
        fn info(&self) -> &UnitInfo {
            &self.info
        }

        fn ports(&self) -> PortLayout {
            PortLayout::new()
                .input(PortSpec::double("a"))
                .input(PortSpec::bool("b"))
                .output(PortSpec::double("out"))
        }

        fn process_start(&mut self, _config: &AudioConfig) -> Result<(), UnitError> {
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn process_stop(&mut self) {
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), UnitError> {
            ctx.set_output(0, ctx.input_f64(0) + 1.0)
        }

        fn reset(&mut self) {}

        fn on_note_on(&mut self, _event: &NoteOn) {
            self.counters.note_ons.fetch_add(1, Ordering::SeqCst);
        }

        fn on_pitch_bend(&mut self, _event: &PitchBend) {
            self.counters.bends.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_ports_follow_declared_layout() {
        let unit = AudioUnit::new(Box::new(CountingUnit::new(Arc::default())));

        assert_eq!(unit.inputs().len(), 2);
        assert_eq!(unit.outputs().len(), 1);
        assert_eq!(unit.input(1).map(InputPort::index), Some(1));
        assert_eq!(unit.input(1).map(InputPort::name), Some("b"));
        assert_eq!(unit.output_value(0), Some(&Value::Double(0.0)));
        assert_eq!(unit.id(), None);
    }

    #[test]
    fn test_start_stop_are_idempotent() {
        let counters = Arc::new(Counters::default());
        let mut unit = AudioUnit::new(Box::new(CountingUnit::new(counters.clone())));
        let config = AudioConfig::default();

        unit.start(&config).unwrap();
        unit.start(&config).unwrap();
        assert!(unit.is_started());
        unit.stop();
        unit.stop();
        assert!(!unit.is_started());

        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);

        unit.start(&config).unwrap();
        unit.stop();
        assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_event_dispatch_reaches_hooks() {
        let counters = Arc::new(Counters::default());
        let mut unit = AudioUnit::new(Box::new(CountingUnit::new(counters.clone())));

        unit.handle_event(&Event::note_on(60, 100));
        unit.handle_event(&Event::pitch_bend(512));
        unit.handle_event(&Event::note_off(60, 0));
        unit.handle_event(&Event::controller(1, 64));

        assert_eq!(counters.note_ons.load(Ordering::SeqCst), 1);
        assert_eq!(counters.bends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_update_gate_order() {
        let mut unit = AudioUnit::new(Box::new(CountingUnit::new(Arc::default())));

        // Not started
        assert!(!unit.begin_update(true));

        unit.start(&AudioConfig::default()).unwrap();
        // Chain disabled
        assert!(!unit.begin_update(false));
        assert!(!unit.is_updated());

        assert!(unit.begin_update(true));
        assert!(unit.is_updated());
        // Already updated this cycle
        assert!(!unit.begin_update(true));

        unit.prepare_update();
        assert!(unit.begin_update(true));
    }

    #[test]
    fn test_attach_and_detach() {
        let mut unit = AudioUnit::new(Box::new(CountingUnit::new(Arc::default())));
        unit.attach(UnitId(4));

        assert_eq!(unit.id(), Some(UnitId(4)));
        assert_eq!(
            unit.output(0).and_then(OutputPort::address),
            Some(sigchain_core::PortAddress::output(UnitId(4), 0))
        );

        unit.detach();
        assert_eq!(unit.id(), None);
        assert_eq!(unit.output(0).and_then(OutputPort::owner), None);
    }
}
