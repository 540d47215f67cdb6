use super::types::*;
use indexmap::IndexSet;
use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};

/// Configuration of a single port memory.
///
/// `read_addr` and `write_addr` are the port addresses used when no per-cycle override is
/// provided, see [Stimulus](super::Stimulus).
///
/// # Example
/// ```
/// # use rtlsim::{SramConfig, Value::*};
/// let config = SramConfig::new(vec![Zero, One, Unknown, One], 2).read_addr(1);
/// assert_eq!(config.read_latency, 2);
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SramConfig {
    pub memory: Vec<Value>,
    pub read_latency: usize,
    pub read_addr: Option<usize>,
    pub write_addr: Option<usize>,
}

impl SramConfig {
    /// Returns a new [SramConfig] with the provided contents and latency and no reads or writes issued.
    pub fn new(memory: Vec<Value>, read_latency: usize) -> Self {
        Self {
            memory,
            read_latency,
            read_addr: None,
            write_addr: None,
        }
    }

    /// Returns a new [SramConfig] with `size` words, all of them [Value::Unknown].
    pub fn unknown(size: usize, read_latency: usize) -> Self {
        Self::new(vec![Value::Unknown; size], read_latency)
    }

    /// Sets the address issued to the read port every cycle.
    pub fn read_addr(mut self, addr: usize) -> Self {
        self.read_addr = Some(addr);
        self
    }

    /// Sets the address written every cycle.
    pub fn write_addr(mut self, addr: usize) -> Self {
        self.write_addr = Some(addr);
        self
    }
}

/// Closed set of node kinds with their kind specific attributes.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum NodeKind {
    /// Primary input, `value` is what it drives until the driver says otherwise.
    Input { value: Value },
    /// Primary output, mirrors its only fan-in.
    Output,
    /// Stateless gate.
    Comb { op: OpType },
    /// Clocked register. Without a fan-in it keeps producing `init`.
    Reg { init: Value },
    /// Single port memory with a pipelined read port.
    Sram(SramConfig),
}
use NodeKind::*;

impl NodeKind {
    /// Returns true for the kinds whose output this cycle only depends on the state
    /// captured at the end of the previous cycle (or on the outside world).
    ///
    /// These are the level 0 sources of a [Schedule](super::Schedule).
    pub fn is_source(&self) -> bool {
        matches!(self, Input { .. } | Reg { .. } | Sram(_))
    }

    /// Returns the inclusive range of fan-ins a node of this kind consumes.
    ///
    /// Fan-ins past the upper bound are structurally allowed but ignored.
    pub fn fan_in_range(&self) -> (usize, usize) {
        match self {
            Input { .. } => (0, 0),
            Output => (1, 1),
            Comb { op } => (op.arity(), op.arity()),
            Reg { .. } | Sram(_) => (0, 1),
        }
    }

    /// Short name of the kind, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Input { .. } => "Input",
            Output => "Output",
            Comb { op: OpType::Not } => "Not",
            Comb { op: OpType::And } => "And",
            Comb { op: OpType::Or } => "Or",
            Reg { .. } => "Reg",
            Sram(_) => "Sram",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Input { value } => write!(f, "Input, value={}", value),
            Output => write!(f, "Output"),
            Comb { op } => write!(f, "Comb, op={}", op),
            Reg { init } => write!(f, "Reg, init={}", init),
            Sram(config) => write!(
                f,
                "Sram, size={}, latency={}",
                config.memory.len(),
                config.read_latency
            ),
        }
    }
}

/// Amount of fan-ins kept in the stack for a node.
/// If a node has more than FAN_IN_TINYVEC_SIZE, they will spill into the heap.
pub(super) const FAN_IN_TINYVEC_SIZE: usize = 2;

pub(super) type FanIn = SmallVec<[NodeIndex; FAN_IN_TINYVEC_SIZE]>;

/// Data structure which represents a circuit node with edges to its producers (fan-in) and consumers (fan-out).
/// [Node] is generic over the type of fan-out container to provide more optimized containers for
/// build time vs runtime.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(super) struct Node<T> {
    pub kind: NodeKind,
    /// Producers sorted by declaration order, duplicates are kept.
    pub fan_in: FanIn,
    pub fan_out: T,
}

impl<T: Default> Node<T> {
    /// Returns a new [Node] of kind `kind` without edges.
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            fan_in: FanIn::new(),
            fan_out: Default::default(),
        }
    }
}

/// Node type used while building, the fan-out is kept in an ordered set which has good
/// search and iteration characteristics at the expense of size.
pub(super) type BuildNode = Node<IndexSet<NodeIndex>>;

/// Node type used by a [Schedule](super::Schedule), the fan-out is kept in a [SmallVec] because
/// it is only iterated after building.
pub(super) type ScheduledNode = Node<SmallVec<[NodeIndex; 2]>>;

impl From<&BuildNode> for ScheduledNode {
    fn from(n: &BuildNode) -> Self {
        Self {
            kind: n.kind.clone(),
            fan_in: n.fan_in.clone(),
            fan_out: n.fan_out.iter().copied().collect(),
        }
    }
}

impl BuildNode {
    /// Inserts `producer` into the fan-in, keeping it sorted by declaration order.
    ///
    /// A repeated producer is placed after its existing occurrences.
    pub(super) fn insert_fan_in(&mut self, producer: NodeIndex) {
        let position = self
            .fan_in
            .iter()
            .position(|p| *p > producer)
            .unwrap_or_else(|| self.fan_in.len());
        self.fan_in.insert(position, producer);
    }
}
