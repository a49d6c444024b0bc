use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use serde::Serialize;
use tracing::trace;

use crate::util::traits::Add;

/// Finite graph with initial and accepting nodes, searched for reachable accepting cycles.
pub trait BuchiGraph {
    type Node: Clone + Eq + Hash + Debug;

    fn initial_nodes(&self) -> Vec<Self::Node>;
    /// Successors in a fixed order derived from the graph's construction.
    fn successors(&self, node: &Self::Node) -> Vec<Self::Node>;
    fn is_accepting(&self, node: &Self::Node) -> bool;
}

/// Counterexample shape: `prefix` runs from an initial node to an accepting node (inclusive),
/// `cycle` runs from that accepting node back to itself with both ends included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lasso<N> {
    pub prefix: Vec<N>,
    pub cycle: Vec<N>,
}

impl<N> Lasso<N> {
    pub fn map<M>(self, f: impl Fn(N) -> M) -> Lasso<M> {
        Lasso {
            prefix: self.prefix.into_iter().map(&f).collect(),
            cycle: self.cycle.into_iter().map(&f).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LTLVerificationResult<N> {
    CycleFound(Lasso<N>),
    CycleNotFound,
}

impl<N> LTLVerificationResult<N> {
    /// The checked graph encodes the negated property, so no accepting cycle means the property holds.
    pub fn holds(&self) -> bool {
        matches!(self, LTLVerificationResult::CycleNotFound)
    }
}

struct Frame<N> {
    node: N,
    successors: Vec<N>,
    next: usize,
}

impl<N: Clone + Eq + Hash> Frame<N> {
    fn new<G: BuchiGraph<Node = N>>(graph: &G, node: N) -> Frame<N> {
        let successors = graph.successors(&node);
        Frame { node, successors, next: 0 }
    }

    fn next_unvisited(&mut self, visited: &HashSet<N>) -> Option<N> {
        while let Some(candidate) = self.successors.get(self.next) {
            self.next += 1;
            if !visited.contains(candidate) {
                return Some(candidate.clone());
            }
        }
        None
    }
}

pub fn nested_dfs<G: BuchiGraph>(graph: &G) -> LTLVerificationResult<G::Node> {
    let mut outer_visited = HashSet::new();

    for s in graph.initial_nodes() {
        if outer_visited.contains(&s) {
            continue;
        }
        if let Some(lasso) = reachable_cycle(graph, s, &mut outer_visited) {
            trace!(prefix = lasso.prefix.len(), cycle = lasso.cycle.len(), "accepting cycle found");
            return LTLVerificationResult::CycleFound(lasso);
        }
    }

    trace!(visited = outer_visited.len(), "no accepting cycle");
    LTLVerificationResult::CycleNotFound
}

// Outer search; accepting nodes are cycle-checked in post-order
fn reachable_cycle<G: BuchiGraph>(
    graph: &G,
    s: G::Node,
    outer_visited: &mut HashSet<G::Node>,
) -> Option<Lasso<G::Node>> {
    outer_visited.insert(s.clone());
    let mut stack = vec![Frame::new(graph, s)];

    while let Some(top) = stack.last_mut() {
        match top.next_unvisited(outer_visited) {
            Some(next) => {
                outer_visited.insert(next.clone());
                stack.push(Frame::new(graph, next));
            }
            None => {
                let Frame { node, .. } = stack.pop()?;
                if !graph.is_accepting(&node) {
                    continue;
                }

                trace!(?node, "inner search");
                if let Some(cycle) = cycle_check(graph, &node) {
                    let prefix = stack.into_iter().map(|frame| frame.node).collect::<Vec<_>>().add(node);
                    return Some(Lasso { prefix, cycle });
                }
            }
        }
    }

    None
}

// Inner search with its own visited set, looking for an edge back into `v`
fn cycle_check<G: BuchiGraph>(graph: &G, v: &G::Node) -> Option<Vec<G::Node>> {
    let mut visited = HashSet::from([v.clone()]);
    let mut stack = vec![Frame::new(graph, v.clone())];

    while let Some(top) = stack.last_mut() {
        if top.successors.contains(v) {
            return Some(stack.into_iter().map(|frame| frame.node).collect::<Vec<_>>().add(v.clone()));
        }

        match top.next_unvisited(&visited) {
            Some(next) => {
                visited.insert(next.clone());
                stack.push(Frame::new(graph, next));
            }
            None => {
                stack.pop();
            }
        }
    }

    None
}
