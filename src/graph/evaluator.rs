use super::error::EvaluationError;
use super::node::*;
use super::schedule::Schedule;
use super::types::*;
use crate::data_structures::ValueStore;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::collections::VecDeque;

use NodeKind::*;

/// State of a single port memory between cycles.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SramState {
    memory: Vec<Value>,
    // Oldest address at the front, always `read_latency` long.
    read_pipeline: VecDeque<Option<usize>>,
}

impl SramState {
    /// Returns the state of a freshly powered sram: its configured contents and no reads in flight.
    pub fn new(config: &SramConfig) -> Self {
        Self {
            memory: config.memory.clone(),
            read_pipeline: std::iter::repeat(None).take(config.read_latency).collect(),
        }
    }

    /// Returns the contents of the memory.
    pub fn memory(&self) -> &[Value] {
        &self.memory
    }

    /// Returns the addresses in flight, oldest first. Empty slots are cycles with no read issued.
    pub fn read_pipeline(&self) -> &VecDeque<Option<usize>> {
        &self.read_pipeline
    }

    /// Returns the read data for this cycle and issues `addr`.
    ///
    /// With a latency of 0 the read is combinational and returns `memory[addr]` right away.
    fn read(&mut self, addr: Option<usize>, latency: usize) -> Value {
        debug_assert_eq!(
            self.read_pipeline.len(),
            latency,
            "Read pipeline doesn't match the sram latency"
        );
        let ready = if self.read_pipeline.is_empty() {
            addr
        } else {
            let oldest = self.read_pipeline.pop_front().flatten();
            self.read_pipeline.push_back(addr);
            oldest
        };
        ready
            .and_then(|a| self.memory.get(a).copied())
            .unwrap_or(Value::Unknown)
    }
}

/// Sequential state carried from one cycle to the next: the output of every register and
/// the contents and read pipeline of every sram.
///
/// Obtained from [Schedule::initial_state] and returned by [evaluate_cycle]. It belongs to a
/// single simulation run, clone it to fork a run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SimState {
    cycle: u64,
    registers: IndexMap<NodeIndex, Value>,
    srams: IndexMap<NodeIndex, SramState>,
}

impl SimState {
    pub(super) fn new(
        registers: IndexMap<NodeIndex, Value>,
        srams: IndexMap<NodeIndex, SramState>,
    ) -> Self {
        Self {
            cycle: 0,
            registers,
            srams,
        }
    }

    /// Returns the number of cycles evaluated to reach this state.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns the current output of register `node`, the value its consumers see next cycle.
    pub fn register(&self, node: NodeIndex) -> Option<Value> {
        self.registers.get(&node).copied()
    }

    /// Returns the state of sram `node`.
    pub fn sram(&self, node: NodeIndex) -> Option<&SramState> {
        self.srams.get(&node)
    }

    /// Iterates over every register and its current output.
    pub fn registers(&self) -> impl Iterator<Item = (NodeIndex, Value)> + '_ {
        self.registers.iter().map(|(idx, value)| (*idx, *value))
    }

    /// Iterates over every sram and its state.
    pub fn srams(&self) -> impl Iterator<Item = (NodeIndex, &SramState)> + '_ {
        self.srams.iter().map(|(idx, state)| (*idx, state))
    }
}

/// Values supplied from outside the circuit for a cycle: what every input drives and which
/// addresses the sram ports use.
///
/// Obtained from [Schedule::default_stimulus], which uses the values configured in the graph.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Stimulus {
    pub(super) inputs: IndexMap<NodeIndex, Value>,
    pub(super) read_addrs: IndexMap<NodeIndex, Option<usize>>,
    pub(super) write_addrs: IndexMap<NodeIndex, Option<usize>>,
}

impl Stimulus {
    /// Sets the value driven by input `node`.
    pub fn set_input(&mut self, node: NodeIndex, value: Value) -> &mut Self {
        self.inputs.insert(node, value);
        self
    }

    /// Sets the address issued to the read port of sram `node`, None for no read.
    pub fn set_read_addr(&mut self, node: NodeIndex, addr: Option<usize>) -> &mut Self {
        self.read_addrs.insert(node, addr);
        self
    }

    /// Sets the address written by sram `node`, None for no write.
    pub fn set_write_addr(&mut self, node: NodeIndex, addr: Option<usize>) -> &mut Self {
        self.write_addrs.insert(node, addr);
        self
    }

    /// Returns the value driven by input `node`.
    pub fn input(&self, node: NodeIndex) -> Option<Value> {
        self.inputs.get(&node).copied()
    }

    /// Returns the address issued to the read port of sram `node`.
    pub fn read_addr(&self, node: NodeIndex) -> Option<usize> {
        self.read_addrs.get(&node).copied().flatten()
    }

    /// Returns the address written by sram `node`.
    pub fn write_addr(&self, node: NodeIndex) -> Option<usize> {
        self.write_addrs.get(&node).copied().flatten()
    }
}

/// Value of every node during one cycle.
///
/// Registers show the output they had during the cycle, not what they captured at its end,
/// see [SimState::register] for that.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CycleSnapshot {
    cycle: u64,
    values: ValueStore,
}

// A snapshot always has one value per scheduled node, which may be none.
#[allow(clippy::len_without_is_empty)]
impl CycleSnapshot {
    /// Returns the cycle the snapshot was taken in, starting at 0.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns the value of `node` during the cycle.
    ///
    /// # Panics
    ///
    /// Will panic if `node` doesn't belong to the scheduled graph.
    pub fn get(&self, node: NodeIndex) -> Value {
        self.values.get(node.idx)
    }

    /// Returns the number of nodes in the snapshot.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterates over every node and its value in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, Value)> + '_ {
        self.values.iter().enumerate().map(|(i, v)| (ni!(i), v))
    }
}

/// Evaluates one clock cycle of `schedule` starting from `prev` and driven by `stimulus`.
///
/// Returns the value of every node during the cycle and the state to hand to the next cycle.
/// `prev` is never modified, so on error nothing has changed.
///
/// # Errors
///
/// [EvaluationError::AddressOutOfRange] if a port address doesn't fit its sram.
///
/// [EvaluationError::StateMismatch] if `prev` or `stimulus` were not made for `schedule`.
///
/// # Example
/// ```
/// # use rtlsim::{build_schedule, evaluate_cycle, CircuitGraph, Value::*};
/// let mut g = CircuitGraph::new();
/// let r = g.reg("r", Zero).unwrap();
/// let n = g.not1(r.bit(), "n").unwrap();
/// g.connect(n, r.bit()).unwrap();
///
/// let schedule = build_schedule(&g).unwrap();
/// let stimulus = schedule.default_stimulus();
/// let mut state = schedule.initial_state();
///
/// let mut seen = Vec::new();
/// for _ in 0..4 {
///     let (snapshot, next) = evaluate_cycle(&schedule, &state, &stimulus).unwrap();
///     seen.push(snapshot.get(r.bit()));
///     state = next;
/// }
/// assert_eq!(seen, vec![Zero, One, Zero, One]);
/// ```
pub fn evaluate_cycle(
    schedule: &Schedule,
    prev: &SimState,
    stimulus: &Stimulus,
) -> Result<(CycleSnapshot, SimState), EvaluationError> {
    evaluate_cycle_with(schedule, prev, stimulus, |_, _| {})
}

/// Same as [evaluate_cycle] but calls `observe` with every node and its value as soon as the node
/// is resolved, in resolution order.
///
/// Nodes are resolved level by level, a node is never observed before every node of the previous
/// levels.
pub fn evaluate_cycle_with<F: FnMut(NodeIndex, Value)>(
    schedule: &Schedule,
    prev: &SimState,
    stimulus: &Stimulus,
    mut observe: F,
) -> Result<(CycleSnapshot, SimState), EvaluationError> {
    check_state(schedule, prev)?;
    check_addresses(schedule, stimulus)?;

    // Every update is staged in `next`, `prev` stays untouched.
    let mut next = prev.clone();
    let mut values = ValueStore::new(schedule.len());

    for level in schedule.levels() {
        for &idx in level {
            let node = &schedule.nodes[idx.idx];
            let value = match &node.kind {
                Input { .. } => stimulus.input(idx).ok_or_else(|| mismatch("input", schedule, idx))?,
                Reg { .. } => prev
                    .register(idx)
                    .ok_or_else(|| mismatch("register", schedule, idx))?,
                Sram(config) => {
                    let addr = stimulus.read_addr(idx);
                    next.srams
                        .get_mut(&idx)
                        .ok_or_else(|| mismatch("sram", schedule, idx))?
                        .read(addr, config.read_latency)
                }
                Output => operand(&values, node.fan_in[0]),
                Comb { op } => {
                    let operands: SmallVec<[Value; 2]> = node
                        .fan_in
                        .iter()
                        .take(op.arity())
                        .map(|p| operand(&values, *p))
                        .collect();
                    op.apply(&operands)
                }
            };
            values.set(idx.idx, value);
            observe(idx, value);
        }
    }

    for &idx in schedule.registers.iter() {
        let node = &schedule.nodes[idx.idx];
        let captured = match (&node.kind, node.fan_in.first()) {
            (_, Some(producer)) => operand(&values, *producer),
            (Reg { init }, None) => *init,
            _ => unreachable!("Only registers are listed as registers"),
        };
        next.registers.insert(idx, captured);
    }

    for &idx in schedule.srams.iter() {
        let node = &schedule.nodes[idx.idx];
        if let (Some(addr), Some(producer)) = (stimulus.write_addr(idx), node.fan_in.first()) {
            let data = operand(&values, *producer);
            // Addresses and sizes were checked by check_addresses and check_state.
            if let Some(slot) = next
                .srams
                .get_mut(&idx)
                .and_then(|sram| sram.memory.get_mut(addr))
            {
                *slot = data;
            }
        }
    }

    log::trace!("Evaluated cycle {}", prev.cycle);
    next.cycle = prev.cycle + 1;
    Ok((
        CycleSnapshot {
            cycle: prev.cycle,
            values,
        },
        next,
    ))
}

/// Reads the value of an operand, which must have been resolved in an earlier level.
#[inline(always)]
fn operand(values: &ValueStore, producer: NodeIndex) -> Value {
    debug_assert!(
        values.is_resolved(producer.idx),
        "Node {} was read before being resolved",
        producer
    );
    values.get(producer.idx)
}

fn mismatch(what: &str, schedule: &Schedule, idx: NodeIndex) -> EvaluationError {
    EvaluationError::StateMismatch {
        reason: format!("no {} named `{}`", what, schedule.name(idx)),
    }
}

/// Checks that `state` holds exactly the sequential nodes of `schedule`, with srams of the
/// configured size and latency.
fn check_state(schedule: &Schedule, state: &SimState) -> Result<(), EvaluationError> {
    if state.registers.len() != schedule.registers.len() || state.srams.len() != schedule.srams.len()
    {
        return Err(EvaluationError::StateMismatch {
            reason: format!(
                "expected {} registers and {} srams, found {} and {}",
                schedule.registers.len(),
                schedule.srams.len(),
                state.registers.len(),
                state.srams.len()
            ),
        });
    }
    for &idx in schedule.registers.iter() {
        if !state.registers.contains_key(&idx) {
            return Err(mismatch("register", schedule, idx));
        }
    }
    for &idx in schedule.srams.iter() {
        let config = match &schedule.nodes[idx.idx].kind {
            Sram(config) => config,
            _ => unreachable!("Only srams are listed as srams"),
        };
        let sram = state
            .srams
            .get(&idx)
            .ok_or_else(|| mismatch("sram", schedule, idx))?;
        if sram.memory.len() != config.memory.len()
            || sram.read_pipeline.len() != config.read_latency
        {
            return Err(EvaluationError::StateMismatch {
                reason: format!(
                    "sram `{}` expects size {} and latency {}, found {} and {}",
                    schedule.name(idx),
                    config.memory.len(),
                    config.read_latency,
                    sram.memory.len(),
                    sram.read_pipeline.len()
                ),
            });
        }
    }
    Ok(())
}

/// Checks every port address against the size of its sram, before anything is evaluated.
fn check_addresses(schedule: &Schedule, stimulus: &Stimulus) -> Result<(), EvaluationError> {
    for &idx in schedule.srams.iter() {
        let size = match &schedule.nodes[idx.idx].kind {
            Sram(config) => config.memory.len(),
            _ => unreachable!("Only srams are listed as srams"),
        };
        let ports = [
            ("read", stimulus.read_addr(idx)),
            ("write", stimulus.write_addr(idx)),
        ];
        for &(port, addr) in &ports {
            if let Some(address) = addr {
                if address >= size {
                    return Err(EvaluationError::AddressOutOfRange {
                        name: schedule.name(idx).to_string(),
                        port,
                        address,
                        size,
                    });
                }
            }
        }
    }
    Ok(())
}
