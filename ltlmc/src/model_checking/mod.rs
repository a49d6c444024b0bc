use std::collections::BTreeSet;

use thiserror::Error;

use crate::parse::ParseError;

pub mod ltl_ast;
pub mod ltl;
pub mod closure;
pub mod gnba;
pub mod simplification;
pub mod nba;
pub mod transition_system;
pub mod product;
pub mod nested_dfs;
pub mod ltl_verification;

#[derive(Debug, Error)]
pub enum ModelCheckError {
    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("state {state} is out of range, the transition system has {num_states} states")]
    StateOutOfRange { state: usize, num_states: usize },
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("verification task failed: {0}")]
    TaskFailed(String),
}

/// Atomic proposition ids that hold in a state, or that an automaton transition reads.
pub type Label = BTreeSet<usize>;
