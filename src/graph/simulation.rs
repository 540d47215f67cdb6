use super::error::{EvaluationError, ScheduleError};
use super::evaluator::*;
use super::graph_builder::CircuitGraph;
#[cfg(feature = "debug_nodes")]
use super::handles::Probe;
use super::handles::*;
use super::schedule::{build_schedule, Schedule};
use super::types::*;
use std::sync::Arc;

/// Clock driver on top of [evaluate_cycle].
///
/// Owns the state of one run and a persistent [Stimulus]: inputs keep the value they were last
/// set to and sram ports keep their address until changed, like levers on a breadboard.
/// Every [tick](Simulation::tick) evaluates one cycle and only commits it if it succeeded.
///
/// # Example
/// ```
/// # use rtlsim::{CircuitGraph, Simulation, Value::*};
/// let mut g = CircuitGraph::new();
/// let bits: Vec<_> = (0..4).map(|i| g.input(format!("b{}", i), Zero).unwrap()).collect();
/// let enable = g.input("enable", One).unwrap();
/// let outs: Vec<_> = bits
///     .iter()
///     .enumerate()
///     .map(|(i, b)| g.and2(b.bit(), enable.bit(), format!("o{}", i)).unwrap())
///     .collect();
///
/// let mut sim = Simulation::from_graph(&g).unwrap();
/// sim.set_word(&bits, 0b1011);
/// sim.tick().unwrap();
/// assert_eq!(sim.word(&outs), Some(0b1011));
///
/// sim.set_input(enable, Unknown);
/// sim.tick().unwrap();
/// assert_eq!(sim.word(&outs), None);
/// assert_eq!(sim.cycle(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Simulation {
    schedule: Arc<Schedule>,
    state: SimState,
    stimulus: Stimulus,
    snapshot: Option<CycleSnapshot>,
    #[cfg(feature = "debug_nodes")]
    probes: Vec<Probe>,
}

impl Simulation {
    /// Returns a new [Simulation] of `schedule` in its initial state, driven by the values
    /// configured in the graph.
    pub fn new(schedule: Arc<Schedule>) -> Self {
        Self {
            state: schedule.initial_state(),
            stimulus: schedule.default_stimulus(),
            schedule,
            snapshot: None,
            #[cfg(feature = "debug_nodes")]
            probes: Vec::new(),
        }
    }

    /// Schedules `graph` and returns a new [Simulation] of it.
    pub fn from_graph(graph: &CircuitGraph) -> Result<Self, ScheduleError> {
        Ok(Self::new(Arc::new(build_schedule(graph)?)))
    }

    /// Returns the schedule being simulated.
    pub fn schedule(&self) -> &Arc<Schedule> {
        &self.schedule
    }

    /// Drives `input` with `value` from the next cycle on.
    pub fn set_input(&mut self, input: InputHandle, value: Value) {
        self.stimulus.set_input(input.bit(), value);
    }

    /// Drives several inputs at once.
    pub fn set_inputs<I: IntoIterator<Item = (InputHandle, Value)>>(&mut self, inputs: I) {
        for (input, value) in inputs {
            self.set_input(input, value);
        }
    }

    /// Drives `inputs` with the bits of `word`, least significant bit first.
    ///
    /// Inputs past the 128th are driven with [Value::Zero].
    pub fn set_word(&mut self, inputs: &[InputHandle], word: u128) {
        for (i, input) in inputs.iter().enumerate() {
            let bit = i < 128 && (word >> i) & 1 == 1;
            self.set_input(*input, bit.into());
        }
    }

    /// Sets the address read by `sram` from the next cycle on, None to stop reading.
    pub fn set_read_addr(&mut self, sram: SramHandle, addr: Option<usize>) {
        self.stimulus.set_read_addr(sram.bit(), addr);
    }

    /// Sets the address written by `sram` from the next cycle on, None to stop writing.
    pub fn set_write_addr(&mut self, sram: SramHandle, addr: Option<usize>) {
        self.stimulus.set_write_addr(sram.bit(), addr);
    }

    /// Evaluates one cycle and returns its snapshot.
    ///
    /// On error the simulation is left exactly as it was before the call.
    pub fn tick(&mut self) -> Result<&CycleSnapshot, EvaluationError> {
        let (snapshot, next) = evaluate_cycle(&self.schedule, &self.state, &self.stimulus)?;
        #[cfg(feature = "debug_nodes")]
        for line in self.probe_lines(&snapshot) {
            log::info!("{}", line);
        }
        self.state = next;
        Ok(self.snapshot.insert(snapshot))
    }

    /// Calls [Simulation::tick] `cycles` times, stopping at the first error.
    pub fn run(&mut self, cycles: usize) -> Result<(), EvaluationError> {
        for _ in 0..cycles {
            self.tick()?;
        }
        log::debug!("Ran {} cycles, now at cycle {}", cycles, self.cycle());
        Ok(())
    }

    /// Returns the number of cycles evaluated so far.
    pub fn cycle(&self) -> u64 {
        self.state.cycle()
    }

    /// Returns the value of `node` during the last cycle, [Value::Unknown] before the first one.
    pub fn value<N: Into<NodeIndex>>(&self, node: N) -> Value {
        let node = node.into();
        self.snapshot
            .as_ref()
            .map(|s| s.get(node))
            .unwrap_or_default()
    }

    /// Returns the value of `output` during the last cycle.
    pub fn output(&self, output: OutputHandle) -> Value {
        self.value(output)
    }

    /// Collects the values of `bits` during the last cycle into an integer, least significant
    /// bit first.
    ///
    /// Returns None if any of the bits was not known. Bits past the 128th are ignored.
    pub fn word<N: Copy + Into<NodeIndex>>(&self, bits: &[N]) -> Option<u128> {
        let mut word = 0;
        for (i, bit) in bits.iter().take(128).enumerate() {
            if self.value(*bit).to_bool()? {
                word |= 1 << i;
            }
        }
        Some(word)
    }

    /// Returns the output of `reg` for the next cycle, what it captured at the last boundary.
    pub fn register(&self, reg: RegHandle) -> Value {
        self.state.register(reg.bit()).unwrap_or_default()
    }

    /// Returns the current contents of `sram`.
    ///
    /// # Panics
    ///
    /// Will panic if `sram` doesn't belong to the simulated graph.
    pub fn memory(&self, sram: SramHandle) -> &[Value] {
        unwrap::unwrap!(
            self.state.sram(sram.bit()),
            "{} is not an sram of this simulation",
            sram.bit()
        )
        .memory()
    }

    /// Returns the snapshot of the last cycle, None before the first one.
    pub fn snapshot(&self) -> Option<&CycleSnapshot> {
        self.snapshot.as_ref()
    }

    /// Returns the sequential state the next cycle starts from.
    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Watches `bits` under `name`: whenever any of them changes value between cycles,
    /// all of them are logged at info level, most significant bit first.
    #[cfg(feature = "debug_nodes")]
    pub fn probe<S: Into<String>, N: Copy + Into<NodeIndex>>(&mut self, name: S, bits: &[N]) {
        self.probes.push(Probe {
            name: name.into(),
            bits: bits.iter().map(|b| (*b).into()).collect(),
        });
    }

    /// Returns the line to log for every probe that changed between the last snapshot and
    /// `snapshot`. Every probe changes on the first cycle.
    #[cfg(feature = "debug_nodes")]
    fn probe_lines(&self, snapshot: &CycleSnapshot) -> Vec<String> {
        self.probes
            .iter()
            .filter(|probe| match &self.snapshot {
                Some(last) => probe.bits.iter().any(|b| last.get(*b) != snapshot.get(*b)),
                None => true,
            })
            .map(|probe| {
                let value: String = probe
                    .bits
                    .iter()
                    .rev()
                    .map(|b| snapshot.get(*b).to_string())
                    .collect();
                format!("cycle {} {}:{}", snapshot.cycle(), probe.name, value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SramConfig;
    use Value::*;

    fn toggle() -> (CircuitGraph, RegHandle, NodeIndex) {
        let mut g = CircuitGraph::new();
        let r = g.reg("r", Zero).unwrap();
        let n = g.not1(r.bit(), "n").unwrap();
        g.connect(n, r.bit()).unwrap();
        (g, r, n)
    }

    #[test]
    fn test_tick() {
        let (g, r, n) = toggle();
        let mut sim = Simulation::from_graph(&g).unwrap();
        assert_eq!(sim.value(r), Unknown);
        assert!(sim.snapshot().is_none());

        for i in 0..10 {
            let snapshot = sim.tick().unwrap();
            assert_eq!(snapshot.cycle(), i);
            let expected = Value::from(i % 2 == 1);
            assert_eq!(snapshot.get(r.bit()), expected);
            assert_eq!(sim.value(n), expected.not());
            assert_eq!(sim.register(r), expected.not());
        }
        assert_eq!(sim.cycle(), 10);
    }

    #[test]
    fn test_shared_schedule() {
        let (g, r, _) = toggle();
        let schedule = Arc::new(build_schedule(&g).unwrap());
        let mut a = Simulation::new(schedule.clone());
        let mut b = Simulation::new(schedule);

        a.run(3).unwrap();
        b.run(4).unwrap();
        assert_eq!(a.value(r), Zero);
        assert_eq!(b.value(r), One);

        let mut fork = a.clone();
        fork.tick().unwrap();
        assert_eq!(fork.value(r), One);
        assert_eq!(a.cycle(), 3);
    }

    #[test]
    fn test_inputs_persist() {
        let mut g = CircuitGraph::new();
        let a = g.input("a", Zero).unwrap();
        let b = g.input("b", Zero).unwrap();
        let o = g.or2(a.bit(), b.bit(), "or").unwrap();
        let out = g.output1(o, "out").unwrap();
        let mut sim = Simulation::from_graph(&g).unwrap();

        sim.run(2).unwrap();
        assert_eq!(sim.output(out), Zero);

        sim.set_inputs(vec![(a, One), (b, Unknown)]);
        sim.run(3).unwrap();
        assert_eq!(sim.output(out), One);

        sim.set_input(a, Unknown);
        sim.tick().unwrap();
        assert_eq!(sim.output(out), Unknown);
    }

    #[test]
    fn test_words() {
        let mut g = CircuitGraph::new();
        let ins: Vec<_> = (0..8)
            .map(|i| g.input(format!("in{}", i), Zero).unwrap())
            .collect();
        let nots: Vec<_> = ins
            .iter()
            .enumerate()
            .map(|(i, b)| g.not1(b.bit(), format!("not{}", i)).unwrap())
            .collect();
        let mut sim = Simulation::from_graph(&g).unwrap();
        assert_eq!(sim.word(&nots), None);

        for word in &[0u128, 1, 0x5a, 0xff] {
            sim.set_word(&ins, *word);
            sim.tick().unwrap();
            assert_eq!(sim.word(&ins), Some(*word));
            assert_eq!(sim.word(&nots), Some(!*word & 0xff));
        }
    }

    #[test]
    fn test_sram_ports() {
        let mut g = CircuitGraph::new();
        let data = g.input("data", One).unwrap();
        let m = g.sram("m", SramConfig::new(vec![Zero; 4], 1)).unwrap();
        g.connect(data.bit(), m.bit()).unwrap();
        let out = g.output1(m.bit(), "out").unwrap();
        let mut sim = Simulation::from_graph(&g).unwrap();

        sim.set_write_addr(m, Some(3));
        sim.tick().unwrap();
        assert_eq!(sim.memory(m), &[Zero, Zero, Zero, One]);

        sim.set_write_addr(m, None);
        sim.set_read_addr(m, Some(3));
        sim.tick().unwrap();
        assert_eq!(sim.output(out), Unknown);
        sim.set_read_addr(m, None);
        sim.tick().unwrap();
        assert_eq!(sim.output(out), One);
        sim.tick().unwrap();
        assert_eq!(sim.output(out), Unknown);
    }

    #[test]
    fn test_failed_tick_changes_nothing() {
        let mut g = CircuitGraph::new();
        let r = g.reg("r", Zero).unwrap();
        let n = g.not1(r.bit(), "n").unwrap();
        g.connect(n, r.bit()).unwrap();
        let m = g.sram("m", SramConfig::unknown(2, 0)).unwrap();
        let mut sim = Simulation::from_graph(&g).unwrap();
        sim.tick().unwrap();

        let state = sim.state().clone();
        let snapshot = sim.snapshot().cloned();
        sim.set_read_addr(m, Some(2));
        assert!(matches!(
            sim.tick(),
            Err(EvaluationError::AddressOutOfRange { .. })
        ));
        assert!(sim.run(5).is_err());
        assert_eq!(sim.state(), &state);
        assert_eq!(sim.snapshot().cloned(), snapshot);
        assert_eq!(sim.cycle(), 1);

        sim.set_read_addr(m, Some(1));
        sim.tick().unwrap();
        assert_eq!(sim.cycle(), 2);
    }

    #[test]
    #[cfg(feature = "debug_nodes")]
    fn test_probes_log_on_change() {
        let (mut g, r, n) = toggle();
        let c = g.reg("c", One).unwrap();
        let mut sim = Simulation::from_graph(&g).unwrap();
        sim.probe("toggle", &[r.bit(), n]);
        sim.probe("const", &[c]);

        let mut lines = Vec::new();
        for _ in 0..4 {
            let (snapshot, _) = evaluate_cycle(&sim.schedule, &sim.state, &sim.stimulus).unwrap();
            lines.push(sim.probe_lines(&snapshot));
            sim.tick().unwrap();
        }

        assert_eq!(
            lines,
            vec![
                vec!["cycle 0 toggle:10", "cycle 0 const:1"],
                vec!["cycle 1 toggle:01"],
                vec!["cycle 2 toggle:10"],
                vec!["cycle 3 toggle:01"],
            ]
        );
    }
}
