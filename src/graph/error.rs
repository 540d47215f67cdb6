use thiserror::Error;

/// Errors returned while building a [CircuitGraph](super::CircuitGraph).
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum GraphError {
    #[error("node `{name}` already exists")]
    DuplicateNode { name: String },
    #[error("node `{name}` does not exist")]
    UnknownNode { name: String },
    #[error("invalid attributes for node `{name}`: {reason}")]
    InvalidAttributes { name: String, reason: String },
}

/// Errors returned by [build_schedule](super::build_schedule).
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ScheduleError {
    #[error("{kind} node `{name}` needs at least {expected} fan-in(s), found {found}")]
    InvalidArity {
        name: String,
        kind: &'static str,
        expected: usize,
        found: usize,
    },
    /// `stuck` holds every node that could not be levelized,
    /// `loops` the combinational loops among them.
    #[error("combinational loop(s) {loops:?} leave nodes {stuck:?} without a level")]
    UnresolvableCycle {
        stuck: Vec<String>,
        loops: Vec<Vec<String>>,
    },
}

/// Errors returned by [evaluate_cycle](super::evaluate_cycle).
///
/// When one of these is returned no state has been modified.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum EvaluationError {
    #[error("{port} address {address} is out of range for sram `{name}` of size {size}")]
    AddressOutOfRange {
        name: String,
        port: &'static str,
        address: usize,
        size: usize,
    },
    #[error("state or stimulus does not belong to this schedule: {reason}")]
    StateMismatch { reason: String },
}

/// Any error the crate can return, convenient for drivers that build, schedule and run.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}
