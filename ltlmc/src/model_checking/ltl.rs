use std::{fmt::Display, rc::Rc};

use indexmap::IndexSet;

use super::ltl_ast::{Operator, ParseTree};
use super::ModelCheckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryOp {
    Not,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOp {
    And,
    Until,
}

/// LTL formula over {NOT, NEXT, AND, UNTIL}.
///
/// Formulas are immutable values and compare structurally, so they can be used directly as set and
/// map keys. The smart constructors keep every formula canonical: operands of AND are ordered, and
/// negation never stacks (`negate` of `!x` is `x`, `negate` of a literal flips it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Formula {
    Literal(bool),
    Atomic(Rc<str>),
    Unary(UnaryOp, Rc<Formula>),
    Binary(BinaryOp, Rc<Formula>, Rc<Formula>),
}

impl Formula {
    pub const TRUE: Formula = Formula::Literal(true);
    pub const FALSE: Formula = Formula::Literal(false);

    pub fn atomic(name: &str) -> Formula {
        Formula::Atomic(name.into())
    }

    pub fn next(f: Formula) -> Formula {
        Formula::Unary(UnaryOp::Next, Rc::new(f))
    }

    pub fn and(f1: Formula, f2: Formula) -> Formula {
        if f1 <= f2 {
            Formula::Binary(BinaryOp::And, Rc::new(f1), Rc::new(f2))
        } else {
            Formula::Binary(BinaryOp::And, Rc::new(f2), Rc::new(f1))
        }
    }

    pub fn until(f1: Formula, f2: Formula) -> Formula {
        Formula::Binary(BinaryOp::Until, Rc::new(f1), Rc::new(f2))
    }

    pub fn negate(&self) -> Formula {
        match self {
            Formula::Literal(b) => Formula::Literal(!b),
            Formula::Unary(UnaryOp::Not, f) => (**f).clone(),
            _ => Formula::Unary(UnaryOp::Not, Rc::new(self.clone())),
        }
    }

    /// Rewrites a parse tree into a canonical formula, eliminating OR, IMPLIES, ALWAYS and
    /// EVENTUALLY.
    pub fn build(tree: &ParseTree) -> Result<Formula, ModelCheckError> {
        match tree {
            ParseTree::Literal(b) => Ok(Formula::Literal(*b)),
            ParseTree::Atomic(name) => Ok(Formula::atomic(name)),
            ParseTree::Unary(op, f) => {
                let f = Formula::build(f)?;
                match op {
                    Operator::Not => Ok(f.negate()),
                    Operator::Next => Ok(Formula::next(f)),
                    // G a === !(true U !a)
                    Operator::Always => Ok(Formula::until(Formula::TRUE, f.negate()).negate()),
                    // F a === true U a
                    Operator::Eventually => Ok(Formula::until(Formula::TRUE, f)),
                    _ => Err(ModelCheckError::UnsupportedOperator(op.token().to_string())),
                }
            }
            ParseTree::Binary(f1, op, f2) => {
                let f1 = Formula::build(f1)?;
                let f2 = Formula::build(f2)?;
                match op {
                    Operator::And => Ok(Formula::and(f1, f2)),
                    Operator::Until => Ok(Formula::until(f1, f2)),
                    // a \/ b === !(!a /\ !b)
                    Operator::Or => Ok(Formula::and(f1.negate(), f2.negate()).negate()),
                    // a -> b === !(a /\ !b)
                    Operator::Implies => Ok(Formula::and(f1, f2.negate()).negate()),
                    _ => Err(ModelCheckError::UnsupportedOperator(op.token().to_string())),
                }
            }
        }
    }

    pub fn children(&self) -> Vec<&Formula> {
        match self {
            Formula::Literal(_) | Formula::Atomic(_) => vec![],
            Formula::Unary(_, f) => vec![&**f],
            Formula::Binary(_, f1, f2) => vec![&**f1, &**f2],
        }
    }

    /// Every sub-node including the formula itself, deduplicated, children before parents.
    pub fn subformulas(&self) -> IndexSet<Formula> {
        let mut subformulas = IndexSet::new();
        let mut stack = vec![(self, false)];

        while let Some((formula, expanded)) = stack.pop() {
            if expanded {
                subformulas.insert(formula.clone());
                continue;
            }
            if subformulas.contains(formula) {
                continue;
            }

            stack.push((formula, true));
            stack.extend(formula.children().into_iter().rev().map(|child| (child, false)));
        }

        subformulas
    }

    /// Atomic proposition names in order of first occurrence; the position is the proposition id.
    pub fn atomic_propositions(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        let mut stack = vec![self];

        while let Some(formula) = stack.pop() {
            if let Formula::Atomic(name) = formula {
                names.insert(name.to_string());
            }
            stack.extend(formula.children().into_iter().rev());
        }

        names
    }

    /// Consistency check of the canonical form: no stacked negation, no negated literal and AND
    /// operands in order.
    pub fn validate(&self) -> bool {
        self.subformulas().iter().all(|f| match f {
            Formula::Unary(UnaryOp::Not, inner) => {
                !matches!(&**inner, Formula::Unary(UnaryOp::Not, _) | Formula::Literal(_))
            }
            Formula::Binary(BinaryOp::And, f1, f2) => f1 <= f2,
            _ => true,
        })
    }

    pub fn to_parse_tree(&self) -> ParseTree {
        match self {
            Formula::Literal(b) => ParseTree::Literal(*b),
            Formula::Atomic(name) => ParseTree::Atomic(name.to_string()),
            Formula::Unary(op, f) => ParseTree::unary(op.operator(), f.to_parse_tree()),
            Formula::Binary(op, f1, f2) => ParseTree::binary(f1.to_parse_tree(), op.operator(), f2.to_parse_tree()),
        }
    }

    pub fn prefix_notation(&self) -> Vec<String> {
        match self {
            Formula::Literal(b) => vec![b.to_string()],
            Formula::Atomic(name) => vec![name.to_string()],
            Formula::Unary(op, f) => {
                let mut tokens = vec![op.operator().token().to_string()];
                tokens.extend(f.prefix_notation());
                tokens
            }
            Formula::Binary(op, f1, f2) => {
                let mut tokens = vec![op.operator().token().to_string()];
                tokens.extend(f1.prefix_notation());
                tokens.extend(f2.prefix_notation());
                tokens
            }
        }
    }

    pub fn infix_notation(&self) -> Vec<String> {
        match self {
            Formula::Literal(b) => vec![b.to_string()],
            Formula::Atomic(name) => vec![name.to_string()],
            Formula::Unary(op, f) => {
                let mut tokens = vec![op.operator().token().to_string()];
                tokens.extend(f.infix_notation());
                tokens
            }
            Formula::Binary(op, f1, f2) => {
                let mut tokens = f1.infix_notation();
                tokens.push(op.operator().token().to_string());
                tokens.extend(f2.infix_notation());
                tokens
            }
        }
    }
}

impl UnaryOp {
    pub fn operator(&self) -> Operator {
        match self {
            UnaryOp::Not => Operator::Not,
            UnaryOp::Next => Operator::Next,
        }
    }
}

impl BinaryOp {
    pub fn operator(&self) -> Operator {
        match self {
            BinaryOp::And => Operator::And,
            BinaryOp::Until => Operator::Until,
        }
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Formula::Literal(b) => write!(f, "{b}"),
            Formula::Atomic(name) => write!(f, "{name}"),
            Formula::Unary(UnaryOp::Not, f1) => write!(f, "!{f1}"),
            Formula::Unary(UnaryOp::Next, f1) => write!(f, "X {f1}"),
            Formula::Binary(op, f1, f2) => write!(f, "({f1} {} {f2})", op.operator()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use crate::parse::parse_ltl;

    use super::*;

    fn formula(src: &str) -> Formula {
        Formula::build(&parse_ltl(src).unwrap()).unwrap()
    }

    pub(crate) fn random_tree<R: Rng>(rng: &mut R, depth: usize) -> ParseTree {
        if depth == 0 || rng.gen_ratio(1, 4) {
            return match rng.gen_range(0..5) {
                0 => ParseTree::Literal(rng.gen()),
                n => ParseTree::atomic(["a", "b", "c", "d"][n - 1]),
            };
        }
        match rng.gen_range(0..8) {
            0 => ParseTree::unary(Operator::Not, random_tree(rng, depth - 1)),
            1 => ParseTree::unary(Operator::Next, random_tree(rng, depth - 1)),
            2 => ParseTree::unary(Operator::Always, random_tree(rng, depth - 1)),
            3 => ParseTree::unary(Operator::Eventually, random_tree(rng, depth - 1)),
            4 => ParseTree::binary(random_tree(rng, depth - 1), Operator::And, random_tree(rng, depth - 1)),
            5 => ParseTree::binary(random_tree(rng, depth - 1), Operator::Or, random_tree(rng, depth - 1)),
            6 => ParseTree::binary(random_tree(rng, depth - 1), Operator::Implies, random_tree(rng, depth - 1)),
            _ => ParseTree::binary(random_tree(rng, depth - 1), Operator::Until, random_tree(rng, depth - 1)),
        }
    }

    #[test]
    fn eventually_reduced() {
        assert_eq!(formula("F a"), Formula::until(Formula::TRUE, Formula::atomic("a")));
    }

    #[test]
    fn always_reduced() {
        let a = Formula::atomic("a");
        assert_eq!(formula("G a"), Formula::until(Formula::TRUE, a.negate()).negate());
    }

    #[test]
    fn or_and_implies_reduced() {
        let a = Formula::atomic("a");
        let b = Formula::atomic("b");
        assert_eq!(formula("a \\/ b"), Formula::and(a.negate(), b.negate()).negate());
        assert_eq!(formula("a -> b"), Formula::and(a, b.negate()).negate());
    }

    #[test]
    fn and_is_commutative() {
        assert_eq!(formula("a /\\ X b"), formula("X b /\\ a"));
        assert_eq!(formula("(a U b) /\\ c"), formula("c /\\ (a U b)"));
    }

    #[test]
    fn until_is_not_commutative() {
        assert!(formula("a U b") != formula("b U a"));
    }

    #[test]
    fn double_negation_eliminated() {
        assert_eq!(formula("!!a"), Formula::atomic("a"));
        assert_eq!(formula("!!!a"), Formula::atomic("a").negate());
        assert_eq!(formula("!true"), Formula::FALSE);
    }

    #[test]
    fn unary_operator_in_binary_position_is_unsupported() {
        let tree = ParseTree::binary(ParseTree::atomic("a"), Operator::Next, ParseTree::atomic("b"));
        match Formula::build(&tree) {
            Err(ModelCheckError::UnsupportedOperator(tok)) => assert_eq!(tok, "X"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn subformulas_post_order() {
        let a = Formula::atomic("a");
        let b = Formula::atomic("b");
        let ab = Formula::and(a.clone(), b.clone());
        let root = Formula::until(a.clone(), ab.clone());
        let subs = root.subformulas().into_iter().collect::<Vec<_>>();
        assert_eq!(subs, vec![a, b, ab, root]);
    }

    #[test]
    fn atomic_propositions_in_order_of_appearance() {
        let aps = formula("b U (a /\\ X c) U b").atomic_propositions();
        assert_eq!(aps.into_iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn notations_define_equality() {
        let f = formula("a U (X b /\\ !c)");
        let g = formula("a U (!c /\\ X b)");
        assert_eq!(f.prefix_notation(), g.prefix_notation());
        assert_eq!(f.infix_notation(), g.infix_notation());
        assert_eq!(f.prefix_notation().first().map(String::as_str), Some("U"));
    }

    #[test]
    fn display_reparses_to_same_formula() {
        for src in ["G (a -> F b)", "X X !a U (b \\/ true)", "!(a U !b) /\\ X false"] {
            let f = formula(src);
            assert_eq!(formula(&f.to_string()), f);
        }
    }

    #[test]
    fn random_formulas_are_canonical() {
        let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
        for _ in 0..200 {
            let f = Formula::build(&random_tree(&mut rng, 5)).unwrap();
            assert!(f.validate(), "{f} is not canonical");
            assert_eq!(f.negate().negate(), f);
            assert_eq!(Formula::build(&f.to_parse_tree()).unwrap(), f);
        }
    }
}
