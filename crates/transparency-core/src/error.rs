use crate::score::Score;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CoreError {
    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid entity kind: {0}")]
    InvalidEntityKind(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// A broken link in an organization's score history chain.
#[derive(Error, Debug, PartialEq)]
pub enum LedgerError {
    #[error("Ledger is empty")]
    Empty,

    #[error("Entry {index} must be INITIALIZED at the baseline, found {reason} with new score {new_score}")]
    BadGenesis {
        index: usize,
        reason: String,
        new_score: Score,
    },

    #[error("Entry {index} starts at {previous_score} but the previous entry ended at {expected}")]
    BrokenChain {
        index: usize,
        previous_score: Score,
        expected: Score,
    },

    #[error("Entry {index} records {new_score} but clamping {previous_score} + {requested_change} gives {expected}")]
    BadClamp {
        index: usize,
        previous_score: Score,
        requested_change: Score,
        new_score: Score,
        expected: Score,
    },

    #[error("Entry {index} change amount {change_amount} does not reconcile {previous_score} -> {new_score}")]
    BadChangeAmount {
        index: usize,
        previous_score: Score,
        new_score: Score,
        change_amount: Score,
    },

    #[error("Entry {index} belongs to a different organization")]
    MixedOrganizations { index: usize },
}
