use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use tracing::debug;

use crate::util::dot::{digraph, edge, initial_state_arrow_num, node};

use super::closure::{Closure, ElementarySet};
use super::Label;

/// Generalized Büchi automaton over state indices, with the states themselves kept alongside.
///
/// A run is accepting when it visits every set in `accepting_sets` infinitely often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GNBA<S = ElementarySet> {
    pub states: Vec<S>,
    pub initial_states: BTreeSet<usize>,
    pub accepting_sets: Vec<BTreeSet<usize>>,
    pub delta: BTreeMap<usize, BTreeMap<Label, Vec<usize>>>,
}

impl<S> GNBA<S> {
    pub fn new(states: Vec<S>, initial_states: BTreeSet<usize>, accepting_sets: Vec<BTreeSet<usize>>) -> GNBA<S> {
        GNBA { states, initial_states, accepting_sets, delta: BTreeMap::new() }
    }

    pub fn add_transition(&mut self, source: usize, label: Label, target: usize) {
        let targets = self.delta.entry(source).or_default().entry(label).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, state: usize, label: &Label) -> &[usize] {
        self.delta.get(&state).and_then(|by_label| by_label.get(label)).map_or(&[], Vec::as_slice)
    }

    /// Every transition as `(source, label, target)`, ordered by source then label.
    pub fn transitions(&self) -> impl Iterator<Item = (usize, &Label, usize)> + '_ {
        self.delta.iter().flat_map(|(&source, by_label)| {
            by_label.iter().flat_map(move |(label, targets)| targets.iter().map(move |&target| (source, label, target)))
        })
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions().count()
    }

    pub fn to_dot<D: Display>(&self, state_name: impl Fn(usize, &S) -> D) -> String {
        let names = self.states.iter().enumerate().map(|(i, s)| state_name(i, s).to_string()).collect::<Vec<_>>();

        let initial = self.initial_states.iter().enumerate().map(|(num, &q)| initial_state_arrow_num(&names[q], num));
        let nodes = names
            .iter()
            .enumerate()
            .map(|(q, name)| node(name, !self.accepting_sets.is_empty() && self.accepting_sets.iter().all(|f| f.contains(&q))));
        let edges = self.transitions().map(|(source, label, target)| edge(&names[source], label, &names[target]));

        digraph("gnba", initial.chain(nodes).chain(edges).collect::<Vec<_>>())
    }
}

impl GNBA<ElementarySet> {
    /// Tableau automaton of the closure's root formula, over the given elementary sets.
    pub fn from_closure(closure: &Closure, elementary_sets: Vec<ElementarySet>) -> GNBA {
        let root = closure.root();

        let initial_states = elementary_sets
            .iter()
            .enumerate()
            .filter_map(|(i, b)| closure.set_contains(b, root).then_some(i))
            .collect();

        let accepting_sets = closure
            .until_formulas()
            .into_iter()
            .map(|until| {
                elementary_sets
                    .iter()
                    .enumerate()
                    .filter_map(|(i, b)| closure.is_discharged(b, until).then_some(i))
                    .collect()
            })
            .collect();

        let labels = elementary_sets.iter().map(|b| closure.label(b)).collect::<Vec<_>>();

        let mut gnba = GNBA::new(elementary_sets, initial_states, accepting_sets);
        for (i, b) in gnba.states.iter().enumerate() {
            for (j, b_next) in gnba.states.iter().enumerate() {
                if closure.check_next(b, b_next) && closure.check_until(b, b_next) {
                    gnba.delta.entry(i).or_default().entry(labels[i].clone()).or_default().push(j);
                }
            }
        }

        let untils = closure.until_formulas().into_iter().map(|until| closure.formula_at(until).to_string()).collect::<Vec<_>>();
        debug!(
            states = gnba.len(),
            initial = gnba.initial_states.len(),
            acceptance_sets = ?untils,
            transitions = gnba.num_transitions(),
            "built GNBA for {root}"
        );

        gnba
    }
}
