use super::error::ScheduleError;
use super::evaluator::{SimState, SramState, Stimulus};
use super::graph_builder::CircuitGraph;
use super::node::*;
use super::types::*;
use crate::data_structures::{Frontier, Immutable};
use indexmap::IndexMap;
use std::collections::HashMap;

use NodeKind::*;

/// Evaluation plan of a [CircuitGraph]: every node placed in a level such that its
/// combinational dependencies live in strictly earlier levels.
///
/// Inputs, registers and srams are level 0 sources, their output this cycle only depends on the
/// outside world or on the state captured at the end of the previous cycle.
/// That is what breaks the feedback loops of a sequential circuit.
///
/// A [Schedule] is purely structural and never changes after [build_schedule], it can be shared
/// between any number of simulation runs.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub(super) nodes: Immutable<Vec<ScheduledNode>>,
    names: Immutable<Vec<String>>,
    levels: Immutable<Vec<Vec<NodeIndex>>>,
    level_of: Immutable<Vec<usize>>,
    pub(super) inputs: Immutable<Vec<NodeIndex>>,
    pub(super) registers: Immutable<Vec<NodeIndex>>,
    pub(super) srams: Immutable<Vec<NodeIndex>>,
}

/// Returns the [Schedule] of `graph`.
///
/// Levels are assigned with Kahn's algorithm: every input, register and sram is seeded at
/// level 0, and a node is placed at level L+1 once the last of its producers has been placed at
/// level L. Registers and srams are never placed again, even once their fan-in resolves.
/// Nodes inside a level are ordered by declaration.
///
/// # Errors
///
/// [ScheduleError::InvalidArity] if a node has fewer fan-ins than its kind consumes.
/// Extra fan-ins are accepted but ignored by the evaluation.
///
/// [ScheduleError::UnresolvableCycle] if some nodes never get a level, which happens when a
/// loop doesn't go through any register or sram.
///
/// # Example
/// ```
/// # use rtlsim::{build_schedule, CircuitGraph, ScheduleError, Value::*};
/// let mut g = CircuitGraph::new();
/// let input = g.input("in", One).unwrap();
/// let a = g.and("a").unwrap();
/// let b = g.not1(a, "b").unwrap();
/// g.connect(input.bit(), a).unwrap();
/// g.connect(b, a).unwrap();
///
/// assert!(matches!(
///     build_schedule(&g),
///     Err(ScheduleError::UnresolvableCycle { .. })
/// ));
/// ```
pub fn build_schedule(graph: &CircuitGraph) -> Result<Schedule, ScheduleError> {
    check_arity(graph)?;

    let nodes: Vec<ScheduledNode> = graph.nodes.iter().map(Into::into).collect();
    let mut pending: Vec<usize> = nodes.iter().map(|n| n.fan_in.len()).collect();
    let mut level_of: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut levels: Vec<Vec<NodeIndex>> = Vec::new();

    let mut frontier: Frontier<NodeIndex> = (0..nodes.len())
        .map(|i| ni!(i))
        .filter(|idx| nodes[idx.idx].kind.is_source())
        .collect();

    while !frontier.is_empty() {
        frontier.advance();
        let depth = levels.len();
        let mut level = Vec::new();
        while let Some(idx) = frontier.pop() {
            level_of[idx.idx] = Some(depth);
            level.push(idx);
            for &consumer in &nodes[idx.idx].fan_out {
                let node = &nodes[consumer.idx];
                // Duplicate edges show up once in the fan-out but count once per edge in `pending`.
                let edges = node.fan_in.iter().filter(|p| **p == idx).count();
                pending[consumer.idx] -= edges;
                if pending[consumer.idx] == 0 && !node.kind.is_source() {
                    frontier.push(consumer);
                }
            }
        }
        level.sort();
        levels.push(level);
    }

    let stuck: Vec<NodeIndex> = level_of
        .iter()
        .enumerate()
        .filter(|(_, level)| level.is_none())
        .map(|(i, _)| ni!(i))
        .collect();
    if !stuck.is_empty() {
        return Err(unresolvable_cycle(graph, &stuck));
    }

    let of_kind = |pred: fn(&NodeKind) -> bool| -> Vec<NodeIndex> {
        (0..nodes.len())
            .map(|i| ni!(i))
            .filter(|idx| pred(&nodes[idx.idx].kind))
            .collect()
    };
    let inputs = of_kind(|k| matches!(k, Input { .. }));
    let registers = of_kind(|k| matches!(k, Reg { .. }));
    let srams = of_kind(|k| matches!(k, Sram(_)));

    log::info!(
        "Scheduled {} nodes into {} levels, {} inputs, {} registers, {} srams",
        nodes.len(),
        levels.len(),
        inputs.len(),
        registers.len(),
        srams.len()
    );

    Ok(Schedule {
        nodes: nodes.into(),
        names: graph.names.keys().cloned().collect::<Vec<_>>().into(),
        levels: levels.into(),
        level_of: level_of.into_iter().flatten().collect::<Vec<_>>().into(),
        inputs: inputs.into(),
        registers: registers.into(),
        srams: srams.into(),
    })
}

/// Rejects nodes with fewer fan-ins than their kind consumes and warns about the ones with more.
fn check_arity(graph: &CircuitGraph) -> Result<(), ScheduleError> {
    for (i, node) in graph.nodes.iter().enumerate() {
        let (min, max) = node.kind.fan_in_range();
        let found = node.fan_in.len();
        if found < min {
            return Err(ScheduleError::InvalidArity {
                name: graph.name(ni!(i)).to_string(),
                kind: node.kind.name(),
                expected: min,
                found,
            });
        }
        if found > max {
            log::warn!(
                "{} has {} fan-ins, only the first {} will be used",
                graph.full_name(ni!(i)),
                found,
                max
            );
        }
    }
    Ok(())
}

/// Builds the error for the nodes that never got a level, naming the combinational
/// loops responsible for it.
fn unresolvable_cycle(graph: &CircuitGraph, stuck: &[NodeIndex]) -> ScheduleError {
    let mut subgraph = petgraph::Graph::<NodeIndex, ()>::new();
    let mut index = HashMap::new();
    for idx in stuck {
        index.insert(*idx, subgraph.add_node(*idx));
    }
    for idx in stuck {
        for producer in graph.fan_in(*idx) {
            if let Some(source) = index.get(producer) {
                subgraph.add_edge(*source, index[idx], ());
            }
        }
    }

    let mut loops: Vec<Vec<NodeIndex>> = petgraph::algo::tarjan_scc(&subgraph)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || subgraph.contains_edge(component[0], component[0])
        })
        .map(|component| {
            let mut members: Vec<NodeIndex> = component.iter().map(|n| subgraph[*n]).collect();
            members.sort();
            members
        })
        .collect();
    loops.sort();

    let names = |nodes: &[NodeIndex]| -> Vec<String> {
        nodes.iter().map(|n| graph.name(*n).to_string()).collect()
    };
    let error = ScheduleError::UnresolvableCycle {
        stuck: names(stuck),
        loops: loops.iter().map(|l| names(l.as_slice())).collect(),
    };
    log::debug!("{}", error);
    error
}

// A schedule always contains what the graph contained, which may be nothing.
#[allow(clippy::len_without_is_empty)]
impl Schedule {
    /// Returns the number of nodes in the schedule.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of levels, sources included.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Returns the levels in evaluation order.
    pub fn levels(&self) -> &[Vec<NodeIndex>] {
        &self.levels
    }

    /// Returns the level of `node`.
    ///
    /// # Panics
    ///
    /// Will panic if `node` doesn't belong to the scheduled graph.
    pub fn level_of(&self, node: NodeIndex) -> usize {
        self.level_of[node.idx]
    }

    /// Returns the name of `node`.
    ///
    /// # Panics
    ///
    /// Will panic if `node` doesn't belong to the scheduled graph.
    pub fn name(&self, node: NodeIndex) -> &str {
        &self.names[node.idx]
    }

    /// Returns the kind of `node`.
    ///
    /// # Panics
    ///
    /// Will panic if `node` doesn't belong to the scheduled graph.
    pub fn kind(&self, node: NodeIndex) -> &NodeKind {
        &self.nodes[node.idx].kind
    }

    /// Returns the inputs, in declaration order.
    pub fn inputs(&self) -> &[NodeIndex] {
        &self.inputs
    }

    /// Returns the registers, in declaration order.
    pub fn registers(&self) -> &[NodeIndex] {
        &self.registers
    }

    /// Returns the srams, in declaration order.
    pub fn srams(&self) -> &[NodeIndex] {
        &self.srams
    }

    /// Returns the state before the first cycle: every register holds its initial value
    /// and every sram its initial contents with no reads in flight.
    pub fn initial_state(&self) -> SimState {
        let registers = self
            .registers
            .iter()
            .map(|idx| match &self.nodes[idx.idx].kind {
                Reg { init } => (*idx, *init),
                _ => unreachable!("Only registers are listed as registers"),
            })
            .collect();
        let srams = self
            .srams
            .iter()
            .map(|idx| match &self.nodes[idx.idx].kind {
                Sram(config) => (*idx, SramState::new(config)),
                _ => unreachable!("Only srams are listed as srams"),
            })
            .collect();
        SimState::new(registers, srams)
    }

    /// Returns the stimulus configured in the graph: what every input drives and what every
    /// sram port is addressed with.
    pub fn default_stimulus(&self) -> Stimulus {
        let mut inputs = IndexMap::new();
        for idx in self.inputs.iter() {
            if let Input { value } = &self.nodes[idx.idx].kind {
                inputs.insert(*idx, *value);
            }
        }
        let mut read_addrs = IndexMap::new();
        let mut write_addrs = IndexMap::new();
        for idx in self.srams.iter() {
            if let Sram(config) = &self.nodes[idx.idx].kind {
                read_addrs.insert(*idx, config.read_addr);
                write_addrs.insert(*idx, config.write_addr);
            }
        }
        Stimulus {
            inputs,
            read_addrs,
            write_addrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Value::*;

    fn names(s: &Schedule, level: usize) -> Vec<&str> {
        s.levels()[level].iter().map(|n| s.name(*n)).collect()
    }

    /// Feedback example with three registers, two of them in loops.
    fn feedback_circuit() -> CircuitGraph {
        let mut g = CircuitGraph::new();
        g.reg("R1", One).unwrap();
        g.reg("R2", One).unwrap();
        g.reg("R3", One).unwrap();
        g.input("in", One).unwrap();
        g.output("out").unwrap();
        g.and("A").unwrap();
        g.or("B").unwrap();
        g.and("C").unwrap();
        g.not("D").unwrap();
        g.not("E").unwrap();
        for (p, c) in &[
            ("R1", "A"),
            ("in", "A"),
            ("R2", "B"),
            ("A", "B"),
            ("B", "C"),
            ("R3", "C"),
            ("C", "R3"),
            ("R3", "D"),
            ("R3", "E"),
            ("D", "out"),
            ("E", "R2"),
        ] {
            g.add_edge(p, c).unwrap();
        }
        g
    }

    #[test]
    fn test_feedback_levels() {
        let s = build_schedule(&feedback_circuit()).unwrap();

        assert_eq!(s.depth(), 4);
        assert_eq!(names(&s, 0), vec!["R1", "R2", "R3", "in"]);
        assert_eq!(names(&s, 1), vec!["A", "D", "E"]);
        assert_eq!(names(&s, 2), vec!["out", "B"]);
        assert_eq!(names(&s, 3), vec!["C"]);
        assert_eq!(s.registers().len(), 3);
        assert_eq!(s.inputs().len(), 1);
    }

    #[test]
    fn test_dependencies_are_in_earlier_levels() {
        let g = feedback_circuit();
        let s = build_schedule(&g).unwrap();

        for (idx, _, kind) in g.nodes() {
            if kind.is_source() {
                assert_eq!(s.level_of(idx), 0);
                continue;
            }
            for producer in g.fan_in(idx) {
                assert!(s.level_of(*producer) < s.level_of(idx));
            }
        }
    }

    #[test]
    fn test_level_is_longest_path() {
        let mut g = CircuitGraph::new();
        let i = g.input("i", One).unwrap();
        let n1 = g.not1(i.bit(), "n1").unwrap();
        let n2 = g.not1(n1, "n2").unwrap();
        let a = g.and2(i.bit(), n2, "a").unwrap();
        let s = build_schedule(&g).unwrap();

        assert_eq!(s.level_of(a), 3);
    }

    #[test]
    fn test_duplicate_edges() {
        let mut g = CircuitGraph::new();
        let i = g.input("i", One).unwrap();
        let a = g.and2(i.bit(), i.bit(), "a").unwrap();
        let s = build_schedule(&g).unwrap();

        assert_eq!(g.fan_in(a), &[i.bit(), i.bit()]);
        assert_eq!(s.level_of(a), 1);
    }

    #[test]
    fn test_combinational_loop() {
        let mut g = CircuitGraph::new();
        let i = g.input("i", One).unwrap();
        let a = g.and("a").unwrap();
        let b = g.not1(a, "b").unwrap();
        g.connect(i.bit(), a).unwrap();
        g.connect(b, a).unwrap();
        g.output1(b, "out").unwrap();

        assert_eq!(
            build_schedule(&g).unwrap_err(),
            ScheduleError::UnresolvableCycle {
                stuck: vec!["a".into(), "b".into(), "out".into()],
                loops: vec![vec!["a".into(), "b".into()]],
            }
        );
    }

    #[test]
    fn test_self_loop() {
        let mut g = CircuitGraph::new();
        let i = g.input("i", One).unwrap();
        let o = g.or("o").unwrap();
        g.connect(i.bit(), o).unwrap();
        g.connect(o, o).unwrap();

        assert_eq!(
            build_schedule(&g).unwrap_err(),
            ScheduleError::UnresolvableCycle {
                stuck: vec!["o".into()],
                loops: vec![vec!["o".into()]],
            }
        );
    }

    #[test]
    fn test_loops_through_sequential_nodes() {
        let mut g = CircuitGraph::new();
        let r = g.reg("r", Zero).unwrap();
        let n = g.not1(r.bit(), "n").unwrap();
        g.connect(n, r.bit()).unwrap();

        let m = g.sram("m", SramConfig::unknown(2, 1).read_addr(0)).unwrap();
        let n2 = g.not1(m.bit(), "n2").unwrap();
        g.connect(n2, m.bit()).unwrap();

        let s = build_schedule(&g).unwrap();
        assert_eq!(s.level_of(r.bit()), 0);
        assert_eq!(s.level_of(m.bit()), 0);
        assert_eq!(s.level_of(n), 1);
        assert_eq!(s.level_of(n2), 1);
    }

    #[test]
    fn test_invalid_arity() {
        let mut g = CircuitGraph::new();
        let i = g.input("i", One).unwrap();
        g.and("a").unwrap();
        g.connect(i.bit(), ni!(1)).unwrap();

        assert_eq!(
            build_schedule(&g).unwrap_err(),
            ScheduleError::InvalidArity {
                name: "a".into(),
                kind: "And",
                expected: 2,
                found: 1
            }
        );

        let mut g = CircuitGraph::new();
        g.output("dangling").unwrap();
        assert!(matches!(
            build_schedule(&g),
            Err(ScheduleError::InvalidArity { expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn test_extra_fan_ins_are_levelized() {
        let mut g = CircuitGraph::new();
        let i = g.input("i", One).unwrap();
        let extra = g.not1(i.bit(), "extra").unwrap();
        let n = g.not1(i.bit(), "n").unwrap();
        let late = g.not1(n, "late").unwrap();
        let o = g.output1(extra, "o").unwrap();
        g.connect(late, o.bit()).unwrap();

        let s = build_schedule(&g).unwrap();
        assert_eq!(g.fan_in(o.bit()), &[extra, late]);
        // `late` is ignored by the evaluation but still orders `o` after it.
        assert_eq!(s.level_of(o.bit()), 3);
    }

    #[test]
    fn test_initial_state_and_stimulus() {
        let mut g = CircuitGraph::new();
        let i = g.input("i", Zero).unwrap();
        let r = g.reg("r", One).unwrap();
        let m = g
            .sram("m", SramConfig::new(vec![One, Zero], 3).write_addr(1))
            .unwrap();
        let s = build_schedule(&g).unwrap();

        let state = s.initial_state();
        assert_eq!(state.register(r.bit()), Some(One));
        assert_eq!(state.sram(m.bit()).unwrap().memory(), &[One, Zero]);
        assert_eq!(
            state.sram(m.bit()).unwrap().read_pipeline().len(),
            3
        );

        let stimulus = s.default_stimulus();
        assert_eq!(stimulus.input(i.bit()), Some(Zero));
        assert_eq!(stimulus.read_addr(m.bit()), None);
        assert_eq!(stimulus.write_addr(m.bit()), Some(1));
    }
}
