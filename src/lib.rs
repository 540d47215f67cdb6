#[macro_use]
pub mod graph;
pub mod data_structures;
extern crate concat_idents;
pub use graph::*;
