use super::error::GraphError;
use super::handles::*;
use super::node::*;
use super::types::*;
use casey::pascal;
use concat_idents::concat_idents;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

use NodeKind::*;
use OpType::*;

/// Creates `opname` and `opnameN` constructors for every combinational operator.
/// `opname` creates the node without fan-ins, `opnameN` creates it and connects its N operands.
macro_rules! comb_constructors {
    ($($name:ident: $arity:tt ($($dep:ident),+)),* $(,)?) => {
        $(
            /// Returns the [NodeIndex] of a new combinational node without fan-ins.
            /// Fan-ins can be added with [CircuitGraph::connect] or [CircuitGraph::add_edge].
            pub fn $name<S: Into<String>>(&mut self, name: S) -> Result<NodeIndex, GraphError> {
                self.add_node(name, Comb { op: pascal!($name) })
            }

            concat_idents!(fn_name = $name, $arity {
                /// Returns the [NodeIndex] of a new combinational node connected to its operands.
                ///
                /// Keep in mind operands are ordered by declaration, not by argument position.
                pub fn fn_name<S: Into<String>>(
                    &mut self,
                    $($dep: NodeIndex,)+
                    name: S,
                ) -> Result<NodeIndex, GraphError> {
                    let idx = self.$name(name)?;
                    $(self.connect($dep, idx)?;)+
                    Ok(idx)
                }
            });
        )*
    };
}

/// Data structure that represents a circuit as a graph of typed nodes, it can be
/// [scheduled](super::build_schedule) to simulate the circuit cycle by cycle.
///
/// Nodes are stored in an arena and identified by a [NodeIndex] which is also their position
/// in declaration order. Edges go from a producer to a consumer and the fan-in of every node
/// is kept sorted by producer declaration order, that order defines the operand order.
///
/// Arity is not checked while building, [build_schedule](super::build_schedule) does that.
///
/// # Example
/// ```
/// # use rtlsim::{CircuitGraph, Simulation, Value::*};
/// let mut g = CircuitGraph::new();
///
/// let input = g.input("in", One).unwrap();
/// let r1 = g.reg("R1", One).unwrap();
/// let a = g.and2(input.bit(), r1.bit(), "A").unwrap();
/// let r2 = g.reg1(a, "R2", Zero).unwrap();
///
/// let mut sim = Simulation::from_graph(&g).unwrap();
/// let snapshot = sim.tick().unwrap();
///
/// assert_eq!(snapshot.get(a), One);
/// // Consumers of R2 in the first cycle saw its initial value.
/// assert_eq!(snapshot.get(r2.bit()), Zero);
/// // The captured value becomes visible at the cycle boundary.
/// assert_eq!(sim.register(r2), One);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CircuitGraph {
    pub(super) nodes: Vec<BuildNode>,
    // Insertion order matches `nodes`, so the name of node i is at position i.
    pub(super) names: IndexMap<String, NodeIndex>,
}

impl CircuitGraph {
    /// Returns an empty [CircuitGraph].
    pub fn new() -> CircuitGraph {
        Default::default()
    }

    /// Registers a new node of kind `kind` named `name` and returns its [NodeIndex].
    ///
    /// # Errors
    ///
    /// [GraphError::DuplicateNode] if a node named `name` already exists.
    ///
    /// [GraphError::InvalidAttributes] if `name` is empty or the kind attributes don't make sense,
    /// like an sram without memory or with a port address outside of it.
    pub fn add_node<S: Into<String>>(
        &mut self,
        name: S,
        kind: NodeKind,
    ) -> Result<NodeIndex, GraphError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(GraphError::DuplicateNode { name });
        }
        if let Err(reason) = validate_attributes(&name, &kind) {
            return Err(GraphError::InvalidAttributes { name, reason });
        }

        let idx = ni!(self.nodes.len());
        log::trace!("node {} `{}`: {}", idx, name, kind);
        self.nodes.push(BuildNode::new(kind));
        self.names.insert(name, idx);
        Ok(idx)
    }

    /// Appends an edge from the node named `producer` to the node named `consumer`.
    ///
    /// # Errors
    ///
    /// [GraphError::UnknownNode] if either node doesn't exist.
    pub fn add_edge(&mut self, producer: &str, consumer: &str) -> Result<(), GraphError> {
        let producer = self.lookup(producer)?;
        let consumer = self.lookup(consumer)?;
        self.connect(producer, consumer)
    }

    /// Appends an edge from `producer` to `consumer`.
    ///
    /// The producer is placed in the fan-in of `consumer` according to its declaration order,
    /// so the position it ends up in doesn't depend on when the edge was added.
    ///
    /// # Errors
    ///
    /// [GraphError::UnknownNode] if either index doesn't belong to this graph.
    pub fn connect(&mut self, producer: NodeIndex, consumer: NodeIndex) -> Result<(), GraphError> {
        for idx in &[producer, consumer] {
            if idx.idx >= self.nodes.len() {
                return Err(GraphError::UnknownNode {
                    name: format!("#{}", idx),
                });
            }
        }
        self.nodes[consumer.idx].insert_fan_in(producer);
        self.nodes[producer.idx].fan_out.insert(consumer);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.node_index(name).ok_or_else(|| GraphError::UnknownNode {
            name: name.to_string(),
        })
    }

    /// Returns the [InputHandle] of a new primary input that drives `value` until told otherwise.
    pub fn input<S: Into<String>>(
        &mut self,
        name: S,
        value: Value,
    ) -> Result<InputHandle, GraphError> {
        self.add_node(name, Input { value }).map(InputHandle)
    }

    /// Returns the [OutputHandle] of a new primary output without fan-in.
    pub fn output<S: Into<String>>(&mut self, name: S) -> Result<OutputHandle, GraphError> {
        self.add_node(name, Output).map(OutputHandle)
    }

    /// Returns the [OutputHandle] of a new primary output observing `dep`.
    pub fn output1<S: Into<String>>(
        &mut self,
        dep: NodeIndex,
        name: S,
    ) -> Result<OutputHandle, GraphError> {
        let handle = self.output(name)?;
        self.connect(dep, handle.0)?;
        Ok(handle)
    }

    /// Returns the [RegHandle] of a new register without fan-in, it will produce `init` every cycle.
    pub fn reg<S: Into<String>>(&mut self, name: S, init: Value) -> Result<RegHandle, GraphError> {
        self.add_node(name, Reg { init }).map(RegHandle)
    }

    /// Returns the [RegHandle] of a new register that captures `dep` every cycle, starting at `init`.
    pub fn reg1<S: Into<String>>(
        &mut self,
        dep: NodeIndex,
        name: S,
        init: Value,
    ) -> Result<RegHandle, GraphError> {
        let handle = self.reg(name, init)?;
        self.connect(dep, handle.0)?;
        Ok(handle)
    }

    /// Returns the [SramHandle] of a new single port memory.
    ///
    /// The write data port is its first fan-in, the read data port feeds its consumers.
    pub fn sram<S: Into<String>>(
        &mut self,
        name: S,
        config: SramConfig,
    ) -> Result<SramHandle, GraphError> {
        self.add_node(name, Sram(config)).map(SramHandle)
    }

    // Create constructors for all the combinational operators.
    comb_constructors!(not: 1 (dep), and: 2 (dep1, dep2), or: 2 (dep1, dep2));

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the [NodeIndex] of the node named `name`.
    pub fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.names.get(name).copied()
    }

    /// Returns the name of `node`.
    ///
    /// # Panics
    ///
    /// Will panic if `node` doesn't belong to this graph.
    pub fn name(&self, node: NodeIndex) -> &str {
        self.names
            .get_index(node.idx)
            .map(|(name, _)| name.as_str())
            .unwrap_or_else(|| panic!("Node {} doesn't belong to this graph", node))
    }

    /// Returns the kind of `node`.
    ///
    /// # Panics
    ///
    /// Will panic if `node` doesn't belong to this graph.
    pub fn kind(&self, node: NodeIndex) -> &NodeKind {
        &self.nodes[node.idx].kind
    }

    /// Returns the producers of `node` in operand order.
    ///
    /// # Panics
    ///
    /// Will panic if `node` doesn't belong to this graph.
    pub fn fan_in(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.nodes[node.idx].fan_in
    }

    /// Returns the consumers of `node` in the order they were connected.
    ///
    /// # Panics
    ///
    /// Will panic if `node` doesn't belong to this graph.
    pub fn fan_out(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes[node.idx].fan_out.iter().copied()
    }

    /// Iterates over every node in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &str, &NodeKind)> + '_ {
        self.names
            .iter()
            .zip(&self.nodes)
            .map(|((name, idx), node)| (*idx, name.as_str(), &node.kind))
    }

    /// Returns the "full name" of `node` in format "KIND:NAME".
    pub(super) fn full_name(&self, node: NodeIndex) -> String {
        format!("{}:{}", self.kind(node).name(), self.name(node))
    }

    /// Dumps the graph in [dot](https://en.wikipedia.org/wiki/DOT_(graph_description_language)) format
    /// to `path`, to be visualized by many supported tools.
    pub fn dump_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        use petgraph::dot::{Config, Dot};
        use std::io::Write;
        let mut f = std::fs::File::create(path)?;
        let mut graph = petgraph::Graph::<_, ()>::new();
        let mut index = HashMap::new();
        for i in 0..self.len() {
            index.insert(i, graph.add_node(self.full_name(ni!(i))));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            graph.extend_with_edges(
                node.fan_in
                    .iter()
                    .map(|producer| (index[&producer.idx], index[&i])),
            );
        }
        write!(f, "{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}

/// Checks the attributes that can be checked without looking at the edges.
fn validate_attributes(name: &str, kind: &NodeKind) -> Result<(), String> {
    if name.is_empty() {
        return Err("node names can't be empty".into());
    }
    if let Sram(config) = kind {
        let size = config.memory.len();
        if size == 0 {
            return Err("sram memory can't be empty".into());
        }
        for (port, addr) in &[("read", config.read_addr), ("write", config.write_addr)] {
            if let Some(addr) = addr {
                if *addr >= size {
                    return Err(format!(
                        "{} address {} is out of range for size {}",
                        port, addr, size
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Adjacency listing, one node per line: `NAME (KIND): -> [CONSUMERS]`.
impl Display for CircuitGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (idx, name, kind) in self.nodes() {
            let consumers: Vec<&str> = self.fan_out(idx).map(|c| self.name(c)).collect();
            writeln!(f, "{} ({}): -> {:?}", name, kind, consumers)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Value::*;

    #[test]
    fn test_duplicate_node() {
        let mut g = CircuitGraph::new();
        g.input("a", One).unwrap();

        assert_eq!(
            g.reg("a", Zero),
            Err(GraphError::DuplicateNode { name: "a".into() })
        );
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_unknown_node() {
        let mut g = CircuitGraph::new();
        g.input("a", One).unwrap();
        g.not("n").unwrap();

        assert_eq!(
            g.add_edge("a", "missing"),
            Err(GraphError::UnknownNode {
                name: "missing".into()
            })
        );
        assert_eq!(
            g.add_edge("missing", "n"),
            Err(GraphError::UnknownNode {
                name: "missing".into()
            })
        );
        assert!(g.connect(ni!(0), ni!(10)).is_err());
        assert!(g.add_edge("a", "n").is_ok());
    }

    #[test]
    fn test_invalid_attributes() {
        let mut g = CircuitGraph::new();

        assert!(matches!(
            g.sram("empty", SramConfig::new(vec![], 1)),
            Err(GraphError::InvalidAttributes { .. })
        ));
        assert!(matches!(
            g.sram("read", SramConfig::unknown(4, 1).read_addr(4)),
            Err(GraphError::InvalidAttributes { .. })
        ));
        assert!(matches!(
            g.sram("write", SramConfig::unknown(4, 1).write_addr(9)),
            Err(GraphError::InvalidAttributes { .. })
        ));
        assert!(matches!(
            g.output(""),
            Err(GraphError::InvalidAttributes { .. })
        ));
        assert!(g.is_empty());

        assert!(g
            .sram("ok", SramConfig::unknown(4, 0).read_addr(3).write_addr(0))
            .is_ok());
    }

    #[test]
    fn test_operand_order_is_declaration_order() {
        let mut g = CircuitGraph::new();
        let first = g.input("first", One).unwrap();
        let second = g.reg("second", Zero).unwrap();
        let third = g.input("third", Unknown).unwrap();
        let and = g.and("and").unwrap();

        // Edges added in reverse declaration order.
        g.add_edge("third", "and").unwrap();
        g.add_edge("first", "and").unwrap();
        g.add_edge("second", "and").unwrap();

        assert_eq!(g.fan_in(and), &[first.bit(), second.bit(), third.bit()]);

        let or = g.or2(third.bit(), first.bit(), "or").unwrap();
        assert_eq!(g.fan_in(or), &[first.bit(), third.bit()]);
    }

    #[test]
    fn test_fan_out_and_names() {
        let mut g = CircuitGraph::new();
        let a = g.input("a", Zero).unwrap();
        let n = g.not1(a.bit(), "n").unwrap();
        let out = g.output1(n, "out").unwrap();

        assert_eq!(g.fan_out(a.bit()).collect::<Vec<_>>(), vec![n]);
        assert_eq!(g.node_index("out"), Some(out.bit()));
        assert_eq!(g.name(n), "n");
        assert_eq!(g.kind(n), &Comb { op: Not });
        assert_eq!(g.full_name(n), "Not:n");

        let names: Vec<_> = g.nodes().map(|(_, name, _)| name).collect();
        assert_eq!(names, vec!["a", "n", "out"]);
    }

    #[test]
    fn test_display() {
        let mut g = CircuitGraph::new();
        let r = g.reg("R3", One).unwrap();
        let d = g.not1(r.bit(), "D").unwrap();
        g.output1(d, "out").unwrap();

        assert_eq!(
            g.to_string(),
            "R3 (Reg, init=1): -> [\"D\"]\nD (Comb, op=Not): -> [\"out\"]\nout (Output): -> []\n"
        );
    }
}
