use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use serde::Serialize;
use tracing::debug;

use crate::util::dot::{digraph, edge, initial_state_arrow_num, node};

use super::gnba::GNBA;
use super::Label;

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize)]
// gnba state, counter
pub struct NBAState(pub usize, pub usize);

impl Display for NBAState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NBA {
    pub states: BTreeSet<NBAState>,
    pub initial_states: BTreeSet<NBAState>,
    pub accepting_states: BTreeSet<NBAState>,
    pub delta: BTreeMap<NBAState, BTreeMap<Label, Vec<NBAState>>>,
    /// Number of counter values, `max(1, k)` for `k` acceptance sets
    pub counters: usize,
}

impl NBA {
    /// Counting construction: the counter of `(q, j)` moves on to `j + 1 (mod k)` exactly when `q` is in
    /// the `j`th acceptance set, so accepting `(f, 0)` recurs iff every acceptance set does.
    ///
    /// Without acceptance sets every state is accepting and the counter stays at 0.
    pub fn from_gnba<S>(gnba: &GNBA<S>) -> NBA {
        let k = gnba.accepting_sets.len();
        let counters = k.max(1);

        let states = (0..gnba.len())
            .flat_map(|q| (0..counters).map(move |j| NBAState(q, j)))
            .collect::<BTreeSet<_>>();
        let initial_states = gnba.initial_states.iter().map(|&q| NBAState(q, 0)).collect();
        let accepting_states = match gnba.accepting_sets.first() {
            Some(first) => first.iter().map(|&f| NBAState(f, 0)).collect(),
            None => states.clone(),
        };

        let mut nba = NBA { states, initial_states, accepting_states, delta: BTreeMap::new(), counters };
        for (q, label, q_next) in gnba.transitions() {
            for j in 0..counters {
                let j_next = match gnba.accepting_sets.get(j) {
                    Some(f) if f.contains(&q) => (j + 1) % counters,
                    _ => j,
                };
                nba.add_transition(NBAState(q, j), label.clone(), NBAState(q_next, j_next));
            }
        }

        debug!(
            states = nba.states.len(),
            accepting = nba.accepting_states.len(),
            transitions = nba.num_transitions(),
            "degeneralized GNBA with {k} acceptance sets"
        );

        nba
    }

    pub fn add_transition(&mut self, source: NBAState, label: Label, target: NBAState) {
        self.delta.entry(source).or_default().entry(label).or_default().push(target);
    }

    pub fn get(&self, state: &NBAState, label: &Label) -> &[NBAState] {
        self.delta.get(state).and_then(|by_label| by_label.get(label)).map_or(&[], Vec::as_slice)
    }

    pub fn is_accepting(&self, state: &NBAState) -> bool {
        self.accepting_states.contains(state)
    }

    /// Index of the GNBA state this state was built from.
    pub fn origin(&self, state: &NBAState) -> usize {
        state.0
    }

    pub fn transitions(&self) -> impl Iterator<Item = (&NBAState, &Label, &NBAState)> + '_ {
        self.delta.iter().flat_map(|(source, by_label)| {
            by_label.iter().flat_map(move |(label, targets)| targets.iter().map(move |target| (source, label, target)))
        })
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions().count()
    }

    /// Number of transitions entering each state, counted with multiplicity.
    pub fn in_degrees(&self) -> BTreeMap<NBAState, usize> {
        let mut in_degrees = self.states.iter().map(|&q| (q, 0)).collect::<BTreeMap<_, _>>();
        for (_, _, target) in self.transitions() {
            *in_degrees.entry(*target).or_default() += 1;
        }
        in_degrees
    }

    pub fn to_dot(&self) -> String {
        let initial = self.initial_states.iter().enumerate().map(|(num, q)| initial_state_arrow_num(q, num));
        let nodes = self.states.iter().map(|q| node(q, self.is_accepting(q)));
        let edges = self.transitions().map(|(source, label, target)| edge(source, label, target));

        digraph("nba", initial.chain(nodes).chain(edges).collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::model_checking::simplification::SimplifiableAutomaton;

    use super::*;

    fn two_acceptance_sets() -> GNBA<usize> {
        let mut gnba = GNBA::new(vec![0, 1, 2], BTreeSet::from([0]), vec![BTreeSet::from([1]), BTreeSet::from([2])]);
        gnba.add_transition(0, Label::from([0]), 1);
        gnba.add_transition(1, Label::from([1]), 1);
        gnba.add_transition(1, Label::from([1]), 0);
        gnba.add_transition(1, Label::from([1]), 2);
        gnba.add_transition(2, Label::from([1]), 0);
        gnba
    }

    #[test]
    fn counter_advances_on_targeted_acceptance_set() {
        let nba = NBA::from_gnba(&two_acceptance_sets());

        assert_eq!(nba.states.len(), 6);
        assert_eq!(nba.initial_states, BTreeSet::from([NBAState(0, 0)]));
        assert_eq!(nba.accepting_states, BTreeSet::from([NBAState(1, 0)]));

        let a0 = Label::from([0]);
        let a1 = Label::from([1]);
        assert_eq!(nba.get(&NBAState(0, 0), &a0), &[NBAState(1, 0)]);
        assert_eq!(nba.get(&NBAState(0, 1), &a0), &[NBAState(1, 1)]);
        assert_eq!(nba.get(&NBAState(1, 0), &a1), &[NBAState(1, 1), NBAState(0, 1), NBAState(2, 1)]);
        assert_eq!(nba.get(&NBAState(1, 1), &a1), &[NBAState(1, 1), NBAState(0, 1), NBAState(2, 1)]);
        assert_eq!(nba.get(&NBAState(2, 0), &a1), &[NBAState(0, 0)]);
        assert_eq!(nba.get(&NBAState(2, 1), &a1), &[NBAState(0, 0)]);
        assert!(nba.get(&NBAState(0, 0), &a1).is_empty());
    }

    #[test]
    fn prune_removes_unentered_states_once() {
        let nba = NBA::from_gnba(&two_acceptance_sets());
        assert_eq!(nba.in_degrees()[&NBAState(2, 0)], 0);

        let nba = nba.simplify();
        assert_eq!(
            nba.states,
            BTreeSet::from([NBAState(0, 0), NBAState(0, 1), NBAState(1, 0), NBAState(1, 1), NBAState(2, 1)])
        );
        assert!(!nba.delta.contains_key(&NBAState(2, 0)));
        assert_eq!(nba.num_transitions(), 9);
    }

    #[test]
    fn no_acceptance_sets_accepts_everything() {
        let mut gnba = GNBA::new(vec!["p", "q"], BTreeSet::from([0]), vec![]);
        gnba.add_transition(0, Label::new(), 1);
        gnba.add_transition(1, Label::from([0]), 1);

        let nba = NBA::from_gnba(&gnba);
        assert_eq!(nba.counters, 1);
        assert_eq!(nba.states, BTreeSet::from([NBAState(0, 0), NBAState(1, 0)]));
        assert_eq!(nba.accepting_states, nba.states);
        assert_eq!(nba.get(&NBAState(1, 0), &Label::from([0])), &[NBAState(1, 0)]);

        // initial states survive the prune even without incoming transitions
        let nba = nba.simplify();
        assert_eq!(nba.states.len(), 2);
        assert_eq!(nba.initial_states, BTreeSet::from([NBAState(0, 0)]));
    }

    #[test]
    fn origin_is_gnba_state() {
        let nba = NBA::from_gnba(&two_acceptance_sets());
        for q in &nba.states {
            assert_eq!(nba.origin(q), q.0);
        }
    }

    #[test]
    fn dot_marks_accepting_states() {
        let dot = NBA::from_gnba(&two_acceptance_sets()).to_dot();
        assert!(dot.contains("\"(1, 0)\" [shape = doublecircle]"));
        assert!(dot.contains("\"(2, 1)\" [shape = circle]"));
        assert!(dot.contains("invis0 -> \"(0, 0)\""));
    }
}
