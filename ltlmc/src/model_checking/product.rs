use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::debug;

use super::nba::{NBAState, NBA};
use super::nested_dfs::BuchiGraph;
use super::transition_system::TransitionSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ProductState {
    pub ts_state: usize,
    pub nba_state: NBAState,
}

impl ProductState {
    pub fn new(ts_state: usize, nba_state: NBAState) -> ProductState {
        ProductState { ts_state, nba_state }
    }
}

impl Display for ProductState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}, {}>", self.ts_state, self.nba_state)
    }
}

/// Synchronous product of a transition system with an NBA, over the system's actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTransitionSystem {
    num_actions: usize,
    initial_states: IndexSet<ProductState>,
    successors: BTreeMap<(ProductState, usize), Vec<ProductState>>,
    accepting: BTreeSet<NBAState>,
}

impl ProductTransitionSystem {
    pub fn new(num_actions: usize, accepting: BTreeSet<NBAState>) -> ProductTransitionSystem {
        ProductTransitionSystem {
            num_actions,
            initial_states: IndexSet::new(),
            successors: BTreeMap::new(),
            accepting,
        }
    }

    /// The automaton reads the label of the state a transition enters; the label of an initial
    /// state is read by the step into the initial product states.
    pub fn from_nba(nba: &NBA, ts: &TransitionSystem) -> ProductTransitionSystem {
        let mut product = ProductTransitionSystem::new(ts.actions().len(), nba.accepting_states.clone());

        for &(s, action, t) in ts.transitions() {
            let label = ts.label(t);
            for q in &nba.states {
                for &q_next in nba.get(q, label) {
                    product.add_transition(ProductState::new(s, *q), action, ProductState::new(t, q_next));
                }
            }
        }

        for s0 in ts.initial_states() {
            let label = ts.label(s0);
            for q0 in &nba.initial_states {
                for &q in nba.get(q0, label) {
                    product.add_initial_state(ProductState::new(s0, q));
                }
            }
        }

        debug!(
            initial = product.initial_states.len(),
            transitions = product.num_transitions(),
            "built product"
        );

        product
    }

    pub fn add_transition(&mut self, source: ProductState, action: usize, target: ProductState) {
        let targets = self.successors.entry((source, action)).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    pub fn add_initial_state(&mut self, state: ProductState) {
        self.initial_states.insert(state);
    }

    pub fn initial_states(&self) -> &IndexSet<ProductState> {
        &self.initial_states
    }

    pub fn successors_under(&self, state: &ProductState, action: usize) -> &[ProductState] {
        self.successors.get(&(*state, action)).map_or(&[], Vec::as_slice)
    }

    /// Successors under every action, by action id then insertion order, without repeats.
    pub fn post(&self, state: &ProductState) -> IndexSet<ProductState> {
        (0..self.num_actions).flat_map(|a| self.successors_under(state, a).iter().copied()).collect()
    }

    pub fn num_transitions(&self) -> usize {
        self.successors.values().map(Vec::len).sum()
    }
}

impl BuchiGraph for ProductTransitionSystem {
    type Node = ProductState;

    fn initial_nodes(&self) -> Vec<ProductState> {
        self.initial_states.iter().copied().collect()
    }

    fn successors(&self, node: &ProductState) -> Vec<ProductState> {
        self.post(node).into_iter().collect()
    }

    fn is_accepting(&self, node: &ProductState) -> bool {
        self.accepting.contains(&node.nba_state)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::model_checking::{nested_dfs::nested_dfs, Label};

    use super::*;

    fn q(i: usize) -> NBAState {
        NBAState(i, 0)
    }

    fn p(s: usize, i: usize) -> ProductState {
        ProductState::new(s, q(i))
    }

    fn four_state_cycle() -> TransitionSystem {
        let mut ts = TransitionSystem::new(4);
        let a = ts.add_action("0");
        ts.add_initial_state(0).unwrap();
        ts.set_label(1, Label::from([1])).unwrap();
        ts.set_label(2, Label::from([0])).unwrap();
        ts.set_label(3, Label::from([0, 1])).unwrap();
        for (s, t) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            ts.add_transition(s, a, t).unwrap();
        }
        ts
    }

    fn three_state_nba() -> NBA {
        let mut nba = NBA {
            states: BTreeSet::from([q(0), q(1), q(2)]),
            initial_states: BTreeSet::from([q(0)]),
            accepting_states: BTreeSet::from([q(2)]),
            delta: BTreeMap::new(),
            counters: 1,
        };
        nba.add_transition(q(0), Label::new(), q(0));
        nba.add_transition(q(0), Label::from([0]), q(2));
        nba.add_transition(q(0), Label::from([1]), q(1));
        nba.add_transition(q(1), Label::from([1]), q(1));
        nba.add_transition(q(1), Label::from([0]), q(0));
        nba
    }

    #[test]
    fn product_reads_target_labels() {
        let product = ProductTransitionSystem::from_nba(&three_state_nba(), &four_state_cycle());

        assert_eq!(product.initial_states().iter().copied().collect::<Vec<_>>(), vec![p(0, 0)]);
        assert_eq!(product.post(&p(0, 0)).into_iter().collect::<Vec<_>>(), vec![p(1, 1)]);
        assert_eq!(product.post(&p(0, 1)).into_iter().collect::<Vec<_>>(), vec![p(1, 1)]);
        assert_eq!(product.post(&p(1, 0)).into_iter().collect::<Vec<_>>(), vec![p(2, 2)]);
        assert_eq!(product.post(&p(1, 1)).into_iter().collect::<Vec<_>>(), vec![p(2, 0)]);
        assert_eq!(product.post(&p(3, 0)).into_iter().collect::<Vec<_>>(), vec![p(0, 0)]);
        // no automaton transition reads {0, 1}
        assert!(product.post(&p(2, 0)).is_empty());
        assert_eq!(product.num_transitions(), 5);
    }

    #[test]
    fn unreachable_accepting_state_is_not_a_violation() {
        let product = ProductTransitionSystem::from_nba(&three_state_nba(), &four_state_cycle());
        assert!(product.is_accepting(&p(2, 2)));
        assert!(nested_dfs(&product).holds());
    }

    #[test]
    fn post_merges_actions() {
        let mut product = ProductTransitionSystem::new(2, BTreeSet::new());
        product.add_transition(p(0, 0), 1, p(1, 0));
        product.add_transition(p(0, 0), 0, p(2, 0));
        product.add_transition(p(0, 0), 0, p(1, 0));
        product.add_transition(p(0, 0), 1, p(1, 0));
        assert_eq!(product.post(&p(0, 0)).into_iter().collect::<Vec<_>>(), vec![p(2, 0), p(1, 0)]);
    }
}
