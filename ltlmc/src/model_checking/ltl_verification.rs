use std::sync::Arc;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::debug;

use crate::parse::parse_ltl;

use super::{
    closure::Closure,
    gnba::GNBA,
    ltl::Formula,
    ltl_ast::ParseTree,
    nba::NBA,
    nested_dfs::{nested_dfs, LTLVerificationResult},
    product::{ProductState, ProductTransitionSystem},
    simplification::SimplifiableAutomaton,
    transition_system::TransitionSystem,
    ModelCheckError,
};

/// Builds the Büchi automaton of the negated property, takes its product with `ts` and searches it
/// for an accepting cycle. `ap_names` names the proposition ids used in the labels of `ts`.
pub fn check_ltl(
    tree: &ParseTree,
    ts: &TransitionSystem,
    ap_names: &IndexSet<String>,
) -> Result<LTLVerificationResult<ProductState>, ModelCheckError> {
    let negated = Formula::build(tree)?.negate();
    debug_assert!(negated.validate());

    let closure = Closure::new(&negated);
    let elementary_sets = closure.elementary_sets();
    let gnba = GNBA::from_closure(&closure, elementary_sets);
    let nba = NBA::from_gnba(&gnba).simplify();

    let ts = ts.restricted(ap_names, closure.atomic_propositions());
    let product = ProductTransitionSystem::from_nba(&nba, &ts);

    let result = nested_dfs(&product);
    debug!(holds = result.holds(), "checked {}", closure.root());
    Ok(result)
}

pub fn verify(formula: &str, ts: &TransitionSystem, ap_names: &IndexSet<String>) -> Result<bool, ModelCheckError> {
    let tree = parse_ltl(formula)?;
    Ok(check_ltl(&tree, ts, ap_names)?.holds())
}

/// Like [`verify`], with `state` as the only initial state.
pub fn verify_from_state(
    formula: &str,
    ts: &TransitionSystem,
    ap_names: &IndexSet<String>,
    state: usize,
) -> Result<bool, ModelCheckError> {
    verify(formula, &ts.with_initial_states([state])?, ap_names)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Query {
    /// Checked from every initial state.
    System { formula: String },
    /// Checked from a single state.
    State { state: usize, formula: String },
}

impl Query {
    pub fn formula(&self) -> &str {
        match self {
            Query::System { formula } | Query::State { formula, .. } => formula,
        }
    }

    pub fn run(&self, ts: &TransitionSystem, ap_names: &IndexSet<String>) -> Result<bool, ModelCheckError> {
        match self {
            Query::System { formula } => verify(formula, ts, ap_names),
            Query::State { state, formula } => verify_from_state(formula, ts, ap_names, *state),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub query: Query,
    pub holds: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    pub fn new(query: Query, result: &Result<bool, ModelCheckError>) -> Verdict {
        match result {
            Ok(holds) => Verdict { query, holds: Some(*holds), error: None },
            Err(e) => Verdict { query, holds: None, error: Some(e.to_string()) },
        }
    }
}

/// Runs every query on its own blocking task. Results come back in query order, and a failing
/// query only affects its own result.
pub async fn verify_batch(
    queries: &[Query],
    ts: Arc<TransitionSystem>,
    ap_names: Arc<IndexSet<String>>,
) -> Vec<Result<bool, ModelCheckError>> {
    let tasks = queries
        .iter()
        .cloned()
        .map(|query| {
            let ts = Arc::clone(&ts);
            let ap_names = Arc::clone(&ap_names);
            tokio::task::spawn_blocking(move || query.run(&ts, &ap_names))
        })
        .collect::<Vec<_>>();

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(match task.await {
            Ok(result) => result,
            Err(join_error) => Err(ModelCheckError::TaskFailed(join_error.to_string())),
        });
    }
    results
}
