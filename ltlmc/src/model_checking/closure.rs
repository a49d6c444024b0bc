use std::collections::BTreeSet;

use indexmap::IndexSet;
use tracing::debug;

use super::ltl::{BinaryOp, Formula, UnaryOp};
use super::Label;

// Closure members by index, children given as closure indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    True,
    False,
    Atomic(usize),
    Not(usize),
    Next(usize),
    And(usize, usize),
    Until(usize, usize),
}

/// Subformulas of a root formula together with their negations.
///
/// The closure is split into complementary pairs `(φ, ¬φ)` where `φ` is the member that comes first
/// in subformula order. Elementary sets are represented by which side of every pair they contain.
#[derive(Debug, Clone)]
pub struct Closure {
    root: Formula,
    formulas: IndexSet<Formula>,
    shapes: Vec<Shape>,
    pairs: Vec<(usize, usize)>,
    // pair index and whether the formula is the first member of that pair
    pair_of: Vec<(usize, bool)>,
    atomic_propositions: IndexSet<String>,
}

/// Maximal consistent subset of a closure, one choice per complementary pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementarySet {
    choice: Vec<bool>,
}

impl Closure {
    pub fn new(root: &Formula) -> Closure {
        let subformulas = root.subformulas();
        let mut formulas = subformulas.clone();
        for sub in &subformulas {
            formulas.insert(sub.negate());
        }

        let mut pairs = Vec::new();
        let mut pair_of: Vec<Option<(usize, bool)>> = vec![None; formulas.len()];
        for (i, formula) in formulas.iter().enumerate() {
            if pair_of[i].is_some() {
                continue;
            }
            let j = match formulas.get_index_of(&formula.negate()) {
                Some(j) => j,
                None => panic!("inconsistent closure: negation of {formula} is missing"),
            };
            assert!(i != j && pair_of[j].is_none(), "inconsistent closure: {formula} cannot be paired");

            pair_of[i] = Some((pairs.len(), true));
            pair_of[j] = Some((pairs.len(), false));
            pairs.push((i, j));
        }
        let pair_of = pair_of.into_iter().flatten().collect::<Vec<_>>();
        assert_eq!(pair_of.len(), formulas.len(), "inconsistent closure: unpaired members");

        let atomic_propositions = root.atomic_propositions();
        let index = |f: &Formula| match formulas.get_index_of(f) {
            Some(i) => i,
            None => panic!("inconsistent closure: {f} is missing"),
        };
        let shapes = formulas
            .iter()
            .map(|formula| match formula {
                Formula::Literal(true) => Shape::True,
                Formula::Literal(false) => Shape::False,
                Formula::Atomic(name) => match atomic_propositions.get_index_of(&**name) {
                    Some(id) => Shape::Atomic(id),
                    None => panic!("inconsistent closure: unknown proposition {name}"),
                },
                Formula::Unary(UnaryOp::Not, f) => Shape::Not(index(f)),
                Formula::Unary(UnaryOp::Next, f) => Shape::Next(index(f)),
                Formula::Binary(BinaryOp::And, f1, f2) => Shape::And(index(f1), index(f2)),
                Formula::Binary(BinaryOp::Until, f1, f2) => Shape::Until(index(f1), index(f2)),
            })
            .collect();

        debug!(subformulas = subformulas.len(), closure = formulas.len(), "built closure of {root}");

        Closure {
            root: root.clone(),
            formulas,
            shapes,
            pairs,
            pair_of,
            atomic_propositions,
        }
    }

    pub fn root(&self) -> &Formula {
        &self.root
    }

    pub fn formulas(&self) -> &IndexSet<Formula> {
        &self.formulas
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn contains(&self, formula: &Formula) -> bool {
        self.formulas.contains(formula)
    }

    pub fn atomic_propositions(&self) -> &IndexSet<String> {
        &self.atomic_propositions
    }

    #[cfg(test)]
    pub fn pairs(&self) -> impl Iterator<Item = (&Formula, &Formula)> + '_ {
        self.pairs.iter().map(|&(i, j)| (&self.formulas[i], &self.formulas[j]))
    }

    fn member(&self, set: &ElementarySet, i: usize) -> bool {
        let (pair, first) = self.pair_of[i];
        set.choice[pair] == first
    }

    /// Whether `formula` is in `set`; formulas outside the closure are never members.
    pub fn set_contains(&self, set: &ElementarySet, formula: &Formula) -> bool {
        self.formulas.get_index_of(formula).map_or(false, |i| self.member(set, i))
    }

    pub fn members<'a>(&'a self, set: &'a ElementarySet) -> impl Iterator<Item = &'a Formula> + 'a {
        self.formulas.iter().enumerate().filter(move |(i, _)| self.member(set, *i)).map(|(_, f)| f)
    }

    /// Ids of the atomic propositions contained in `set`.
    pub fn label(&self, set: &ElementarySet) -> Label {
        self.shapes
            .iter()
            .enumerate()
            .filter_map(|(i, shape)| match shape {
                Shape::Atomic(id) if self.member(set, i) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Interprets an arbitrary subset of the closure as an elementary set, if it is one.
    pub fn elementary_set(&self, candidate: &BTreeSet<Formula>) -> Option<ElementarySet> {
        if !candidate.iter().all(|f| self.formulas.contains(f)) {
            return None;
        }

        let mut choice = Vec::with_capacity(self.pairs.len());
        for &(i, j) in &self.pairs {
            match (candidate.contains(&self.formulas[i]), candidate.contains(&self.formulas[j])) {
                (true, false) => choice.push(true),
                (false, true) => choice.push(false),
                _ => return None,
            }
        }

        let set = ElementarySet { choice };
        self.is_consistent(&set).then_some(set)
    }

    pub fn is_elementary(&self, candidate: &BTreeSet<Formula>) -> bool {
        self.elementary_set(candidate).is_some()
    }

    // Totality holds by construction of the choice vector, so only the remaining conditions are checked
    fn is_consistent(&self, set: &ElementarySet) -> bool {
        debug_assert_eq!(set.choice.len(), self.pairs.len());

        self.shapes.iter().enumerate().all(|(i, shape)| match *shape {
            Shape::True => self.member(set, i),
            Shape::And(l, r) => self.member(set, i) == (self.member(set, l) && self.member(set, r)),
            Shape::Until(l, r) => {
                let until = self.member(set, i);
                let right = self.member(set, r);
                (!right || until) && (!until || right || self.member(set, l))
            }
            Shape::False | Shape::Atomic(_) | Shape::Not(_) | Shape::Next(_) => true,
        })
    }

    /// All elementary sets, in the order of the binary count over the pair choices.
    pub fn elementary_sets(&self) -> Vec<ElementarySet> {
        let mut sets = Vec::new();
        let mut choice = vec![false; self.pairs.len()];

        loop {
            let candidate = ElementarySet { choice: choice.clone() };
            if self.is_consistent(&candidate) {
                sets.push(candidate);
            }

            match choice.iter().position(|c| !c) {
                Some(j) => {
                    choice[..j].iter_mut().for_each(|c| *c = false);
                    choice[j] = true;
                }
                None => break,
            }
        }

        debug!(pairs = self.pairs.len(), elementary_sets = sets.len(), "enumerated elementary sets");
        sets
    }

    /// For every `X φ` in the closure: `X φ ∈ b ⟺ φ ∈ b_next`.
    pub fn check_next(&self, b: &ElementarySet, b_next: &ElementarySet) -> bool {
        self.shapes.iter().enumerate().all(|(i, shape)| match *shape {
            Shape::Next(f) => self.member(b, i) == self.member(b_next, f),
            _ => true,
        })
    }

    /// For every `φ1 U φ2` in the closure: `φ1 U φ2 ∈ b ⟺ φ2 ∈ b ∨ (φ1 ∈ b ∧ φ1 U φ2 ∈ b_next)`.
    pub fn check_until(&self, b: &ElementarySet, b_next: &ElementarySet) -> bool {
        self.shapes.iter().enumerate().all(|(i, shape)| match *shape {
            Shape::Until(l, r) => {
                self.member(b, i) == (self.member(b, r) || (self.member(b, l) && self.member(b_next, i)))
            }
            _ => true,
        })
    }

    /// Closure indices of the UNTIL formulas, in closure order.
    pub fn until_formulas(&self) -> Vec<usize> {
        self.shapes
            .iter()
            .enumerate()
            .filter_map(|(i, shape)| matches!(shape, Shape::Until(..)).then_some(i))
            .collect()
    }

    pub fn formula_at(&self, i: usize) -> &Formula {
        &self.formulas[i]
    }

    /// Whether the obligation of the UNTIL formula at closure index `until` is absent from `set`
    /// or already discharged there.
    pub fn is_discharged(&self, set: &ElementarySet, until: usize) -> bool {
        match self.shapes[until] {
            Shape::Until(_, r) => !(self.member(set, until) && !self.member(set, r)),
            _ => true,
        }
    }

    pub fn describe(&self, set: &ElementarySet) -> String {
        let members = self.members(set).map(ToString::to_string).collect::<Vec<_>>();
        format!("{{{}}}", members.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::{rngs::SmallRng, SeedableRng};

    use crate::{model_checking::ltl::tests::random_tree, parse::parse_ltl};

    use super::*;

    fn closure(src: &str) -> Closure {
        Closure::new(&Formula::build(&parse_ltl(src).unwrap()).unwrap())
    }

    fn set(closure: &Closure, members: &[Formula]) -> ElementarySet {
        closure.elementary_set(&members.iter().cloned().collect()).unwrap()
    }

    #[test]
    fn closure_of_until() {
        let closure = closure("a U b");
        let a = Formula::atomic("a");
        let b = Formula::atomic("b");
        let until = Formula::until(a.clone(), b.clone());
        let expected = [a.clone(), b.clone(), until.clone(), a.negate(), b.negate(), until.negate()];
        assert_eq!(closure.formulas().iter().cloned().collect::<Vec<_>>(), expected);
        assert_eq!(closure.pairs().count(), 3);
    }

    #[test]
    fn closure_bound_and_negation_closed() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            let f = Formula::build(&random_tree(&mut rng, 4)).unwrap();
            let closure = Closure::new(&f);
            assert!(closure.len() <= 2 * f.subformulas().len());
            assert_eq!(closure.len() % 2, 0);
            for member in closure.formulas() {
                assert!(closure.contains(&member.negate()), "{member} has no negation in the closure of {f}");
            }
        }
    }

    #[test]
    fn until_has_five_elementary_sets() {
        let closure = closure("a U b");
        assert_eq!(closure.elementary_sets().len(), 5);
    }

    #[test]
    fn true_is_in_every_elementary_set() {
        let closure = closure("F a");
        let sets = closure.elementary_sets();
        assert_eq!(sets.len(), 3);
        assert!(sets.iter().all(|s| closure.set_contains(s, &Formula::TRUE)));
    }

    #[test]
    fn and_consistency() {
        let closure = closure("a /\\ b");
        let a = Formula::atomic("a");
        let b = Formula::atomic("b");
        let ab = Formula::and(a.clone(), b.clone());
        let sets = closure.elementary_sets();
        assert_eq!(sets.len(), 4);
        for s in &sets {
            assert_eq!(closure.set_contains(s, &ab), closure.set_contains(s, &a) && closure.set_contains(s, &b));
        }
        assert!(!closure.is_elementary(&[a.clone(), b.clone(), ab.negate()].into_iter().collect()));
        assert!(!closure.is_elementary(&[a.clone(), b.negate(), ab.clone()].into_iter().collect()));
    }

    #[test]
    fn elementary_sets_are_total() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..30 {
            let f = Formula::build(&random_tree(&mut rng, 3)).unwrap();
            let closure = Closure::new(&f);
            for s in closure.elementary_sets() {
                for member in closure.formulas() {
                    assert!(closure.set_contains(&s, member) != closure.set_contains(&s, &member.negate()));
                }
            }
        }
    }

    #[test]
    fn rejects_non_total_candidates() {
        let closure = closure("a U b");
        let a = Formula::atomic("a");
        let b = Formula::atomic("b");
        let until = Formula::until(a.clone(), b.clone());
        assert!(!closure.is_elementary(&[b.clone(), until.clone()].into_iter().collect()));
        assert!(!closure.is_elementary(&[a.clone(), a.negate(), b.clone(), until.clone()].into_iter().collect()));
        assert!(closure.is_elementary(&[a.negate(), b.clone(), until.clone()].into_iter().collect()));
        assert!(!closure.is_elementary(&[a.negate(), b.negate(), until.clone()].into_iter().collect()));
        assert!(!closure.is_elementary(&[a.negate(), b, until, Formula::atomic("c")].into_iter().collect()));
    }

    #[test]
    fn enumeration_is_deterministic() {
        assert_eq!(closure("G (a -> X b)").elementary_sets(), closure("G (a -> X b)").elementary_sets());
    }

    #[test]
    fn next_step() {
        let closure = closure("X a");
        let a = Formula::atomic("a");
        let next = Formula::next(a.clone());
        let now = set(&closure, &[a.negate(), next.clone()]);
        assert!(closure.check_next(&now, &set(&closure, &[a.clone(), next.negate()])));
        assert!(!closure.check_next(&now, &set(&closure, &[a.negate(), next.negate()])));
        let later = set(&closure, &[a.clone(), next.clone()]);
        assert!(!closure.check_next(&set(&closure, &[a.negate(), next.negate()]), &later));
    }

    #[test]
    fn until_step() {
        let closure = closure("a U b");
        let a = Formula::atomic("a");
        let b = Formula::atomic("b");
        let until = Formula::until(a.clone(), b.clone());
        let waiting = set(&closure, &[a.clone(), b.negate(), until.clone()]);
        let done = set(&closure, &[a.negate(), b.negate(), until.negate()]);
        assert!(!closure.check_until(&waiting, &done));
        assert!(closure.check_until(&waiting, &waiting));
        assert!(closure.check_until(&done, &waiting));
        assert!(!closure.is_discharged(&waiting, closure.until_formulas()[0]));
        assert!(closure.is_discharged(&done, closure.until_formulas()[0]));
    }

    #[test]
    fn label_collects_propositions() {
        let closure = closure("a U b");
        let a = Formula::atomic("a");
        let b = Formula::atomic("b");
        let s = set(&closure, &[a, b.negate(), Formula::until(Formula::atomic("a"), b)]);
        assert_eq!(closure.label(&s), Label::from([0]));
    }
}
