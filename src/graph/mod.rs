#[macro_use]
mod types;
mod error;
mod evaluator;
mod graph_builder;
mod handles;
mod node;
mod schedule;
mod simulation;
pub use error::*;
pub use evaluator::*;
pub use graph_builder::*;
pub use handles::*;
pub use node::{NodeKind, SramConfig};
pub use schedule::*;
pub use simulation::*;
pub use types::*;
