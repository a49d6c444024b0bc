use std::collections::BTreeMap;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::{Label, ModelCheckError};

/// Finite transition system with states `0..num_states`, named actions and per-state labels of
/// atomic proposition ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionSystem {
    num_states: usize,
    actions: IndexSet<String>,
    initial_states: IndexSet<usize>,
    transitions: Vec<(usize, usize, usize)>,
    successors: BTreeMap<(usize, usize), Vec<usize>>,
    labels: Vec<Label>,
}

impl TransitionSystem {
    pub fn new(num_states: usize) -> TransitionSystem {
        TransitionSystem {
            num_states,
            actions: IndexSet::new(),
            initial_states: IndexSet::new(),
            transitions: Vec::new(),
            successors: BTreeMap::new(),
            labels: vec![Label::new(); num_states],
        }
    }

    fn check_state(&self, state: usize) -> Result<usize, ModelCheckError> {
        if state < self.num_states {
            Ok(state)
        } else {
            Err(ModelCheckError::StateOutOfRange { state, num_states: self.num_states })
        }
    }

    /// Registers an action name and returns its id; registering a name twice returns the first id.
    pub fn add_action(&mut self, name: &str) -> usize {
        self.actions.insert_full(name.to_string()).0
    }

    pub fn action_id(&self, name: &str) -> Result<usize, ModelCheckError> {
        self.actions.get_index_of(name).ok_or_else(|| ModelCheckError::UnknownAction(name.to_string()))
    }

    pub fn add_initial_state(&mut self, state: usize) -> Result<(), ModelCheckError> {
        let state = self.check_state(state)?;
        self.initial_states.insert(state);
        Ok(())
    }

    pub fn add_transition(&mut self, source: usize, action: usize, target: usize) -> Result<(), ModelCheckError> {
        let source = self.check_state(source)?;
        let target = self.check_state(target)?;
        if action >= self.actions.len() {
            return Err(ModelCheckError::UnknownAction(action.to_string()));
        }

        self.transitions.push((source, action, target));
        self.successors.entry((source, action)).or_default().push(target);
        Ok(())
    }

    pub fn add_named_transition(&mut self, source: usize, action: &str, target: usize) -> Result<(), ModelCheckError> {
        let action = self.action_id(action)?;
        self.add_transition(source, action, target)
    }

    pub fn set_label(&mut self, state: usize, label: Label) -> Result<(), ModelCheckError> {
        let state = self.check_state(state)?;
        self.labels[state] = label;
        Ok(())
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn actions(&self) -> &IndexSet<String> {
        &self.actions
    }

    pub fn initial_states(&self) -> impl Iterator<Item = usize> + '_ {
        self.initial_states.iter().copied()
    }

    /// Transitions as `(source, action, target)` in insertion order.
    pub fn transitions(&self) -> &[(usize, usize, usize)] {
        &self.transitions
    }

    pub fn successors(&self, state: usize, action: usize) -> &[usize] {
        self.successors.get(&(state, action)).map_or(&[], Vec::as_slice)
    }

    pub fn label(&self, state: usize) -> &Label {
        &self.labels[state]
    }

    /// Translates every label from `global_aps` ids into `formula_aps` ids by proposition name.
    /// Propositions the formula does not mention, and ids `global_aps` does not name, are dropped.
    pub fn restricted(&self, global_aps: &IndexSet<String>, formula_aps: &IndexSet<String>) -> TransitionSystem {
        let translation = global_aps
            .iter()
            .enumerate()
            .filter_map(|(id, name)| formula_aps.get_index_of(name).map(|local| (id, local)))
            .collect::<IndexMap<_, _>>();

        let labels = self
            .labels
            .iter()
            .map(|label| label.iter().filter_map(|id| translation.get(id).copied()).collect())
            .collect();

        debug!(kept = translation.len(), of = global_aps.len(), "restricted transition system to formula propositions");

        TransitionSystem { labels, ..self.clone() }
    }

    /// The same system started from exactly `states`.
    pub fn with_initial_states(&self, states: impl IntoIterator<Item = usize>) -> Result<TransitionSystem, ModelCheckError> {
        let initial_states = states.into_iter().map(|s| self.check_state(s)).collect::<Result<_, _>>()?;
        Ok(TransitionSystem { initial_states, ..self.clone() })
    }
}
