//! Error taxonomy for the simulation core.
//!
//! Every variant here is fatal: the run aborts and no partial statistics are
//! returned. A bounded-retry selection that stops short of its weight target
//! is not an error; see [`crate::subset::SubsetSelection::is_complete`].

use thiserror::Error;

/// Errors raised by the sampler, the selectors and the rotation engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Malformed run parameters or sampler arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Fewer eligible members than the round needs to admit.
    #[error(
        "insufficient pool in round {round}: requested {requested} members but only {available} are eligible"
    )]
    InsufficientPool {
        round: usize,
        requested: usize,
        available: usize,
    },

    /// Every eligible member has zero weight, so no weighted draw is possible.
    #[error("degenerate population in round {round}: eligible weight sums to zero")]
    DegeneratePopulation { round: usize },
}

impl SimError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SimError::InvalidArgument(msg.into())
    }
}

pub type SimResult<T> = Result<T, SimError>;
