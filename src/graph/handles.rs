use super::evaluator::CycleSnapshot;
use super::types::{NodeIndex, Value};
#[cfg(feature = "debug_nodes")]
use smallvec::SmallVec;

/// Data structure that represents a probe into a simulation, whenever any of the nodes in the probe changes its value
/// between cycles, the new values of all of the nodes will be logged along with the name.
#[derive(Debug, Clone)]
#[cfg(feature = "debug_nodes")]
pub(super) struct Probe {
    pub name: String,
    pub bits: SmallVec<[NodeIndex; 1]>,
}

/// Handle to a primary input, see [Simulation::set_input](super::Simulation::set_input).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct InputHandle(pub(super) NodeIndex);

/// Handle to a register.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RegHandle(pub(super) NodeIndex);

/// Handle to a single port memory, see [Simulation::set_read_addr](super::Simulation::set_read_addr).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SramHandle(pub(super) NodeIndex);

/// Handle to a primary output.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OutputHandle(pub(super) NodeIndex);

macro_rules! handle_bits {
    ($($handle:ident),*) => {
        $(
            impl $handle {
                /// Returns the [NodeIndex] of the node behind the handle, to wire it into other nodes.
                pub fn bit(&self) -> NodeIndex {
                    self.0
                }
            }
            impl From<$handle> for NodeIndex {
                fn from(h: $handle) -> Self {
                    h.0
                }
            }
        )*
    };
}
handle_bits!(InputHandle, RegHandle, SramHandle, OutputHandle);

impl OutputHandle {
    /// Returns the value observed at the output during the cycle captured by `snapshot`.
    pub fn value(self, snapshot: &CycleSnapshot) -> Value {
        snapshot.get(self.0)
    }

    /// Returns Some(bool) if the output was known during the cycle captured by `snapshot`.
    pub fn b0(self, snapshot: &CycleSnapshot) -> Option<bool> {
        self.value(snapshot).to_bool()
    }
}
