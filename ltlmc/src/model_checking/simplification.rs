use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use tracing::debug;

use crate::util::traits::AddMany;

use super::nba::{NBAState, NBA};

pub trait SimplifiableAutomaton: Sized {
    type State: Ord + Eq + Clone + Debug;

    fn simplify(self) -> Self {
        self.remove_unentered_states()
    }

    fn get_states(&self) -> BTreeSet<Self::State>;
    fn get_initial_states(&self) -> BTreeSet<Self::State>;
    /// Successors of `state`, repeated once per transition
    fn get_next_states(&self, state: &Self::State) -> Vec<Self::State>;
    fn with_only_states(self, states: BTreeSet<Self::State>) -> Self;

    /// Single pass over in-degrees: states no transition enters are dropped unless they are initial.
    /// States that only become unentered through this removal are kept.
    fn remove_unentered_states(self) -> Self {
        let states = self.get_states();
        let entered = self.get_initial_states().add_many(states.iter().flat_map(|state| self.get_next_states(state)));

        let kept = states.intersection(&entered).cloned().collect::<BTreeSet<_>>();
        debug!(before = states.len(), after = kept.len(), "removed unentered states");

        self.with_only_states(kept)
    }
}

impl SimplifiableAutomaton for NBA {
    type State = NBAState;

    fn get_states(&self) -> BTreeSet<Self::State> {
        self.states.clone()
    }

    fn get_initial_states(&self) -> BTreeSet<Self::State> {
        self.initial_states.clone()
    }

    fn get_next_states(&self, state: &Self::State) -> Vec<Self::State> {
        match self.delta.get(state) {
            Some(results) => results.values().flatten().copied().collect(),
            None => Vec::new(),
        }
    }

    fn with_only_states(self, states: BTreeSet<Self::State>) -> Self {
        let NBA { states: _, initial_states, accepting_states, delta, counters } = self;

        let delta = delta
            .into_iter()
            .filter(|(source, _targets)| states.contains(source))
            .map(|(source, targets)| {
                let targets = targets
                    .into_iter()
                    .map(|(label, targets)| (label, targets.into_iter().filter(|t| states.contains(t)).collect::<Vec<_>>()))
                    .filter(|(_label, targets)| !targets.is_empty())
                    .collect::<BTreeMap<_, _>>();
                (source, targets)
            })
            .collect();
        let initial_states = initial_states.intersection(&states).copied().collect();
        let accepting_states = accepting_states.intersection(&states).copied().collect();

        NBA { states, initial_states, accepting_states, delta, counters }
    }
}
