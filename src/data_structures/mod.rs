mod frontier;
mod immutable;
mod value_store;
pub use frontier::*;
pub use immutable::*;
pub use value_store::*;
