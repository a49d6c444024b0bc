use std::{fmt::Display, str::FromStr};

use super::ModelCheckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    Not,
    Next,
    Always,
    Eventually,
    And,
    Or,
    Implies,
    Until,
}

impl Operator {
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Not => "!",
            Operator::Next => "X",
            Operator::Always => "G",
            Operator::Eventually => "F",
            Operator::And => "/\\",
            Operator::Or => "\\/",
            Operator::Implies => "->",
            Operator::Until => "U",
        }
    }
}

impl FromStr for Operator {
    type Err = ModelCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "!" => Ok(Operator::Not),
            "X" => Ok(Operator::Next),
            "G" => Ok(Operator::Always),
            "F" => Ok(Operator::Eventually),
            "/\\" => Ok(Operator::And),
            "\\/" => Ok(Operator::Or),
            "->" => Ok(Operator::Implies),
            "U" => Ok(Operator::Until),
            _ => Err(ModelCheckError::UnsupportedOperator(s.to_string())),
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Formula as handed over by the parser, before any rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParseTree {
    Literal(bool),
    Atomic(String),
    Unary(Operator, Box<ParseTree>),
    Binary(Box<ParseTree>, Operator, Box<ParseTree>),
}

impl ParseTree {
    pub fn unary(op: Operator, operand: ParseTree) -> ParseTree {
        ParseTree::Unary(op, Box::new(operand))
    }

    pub fn binary(left: ParseTree, op: Operator, right: ParseTree) -> ParseTree {
        ParseTree::Binary(Box::new(left), op, Box::new(right))
    }

    pub fn atomic(name: impl Into<String>) -> ParseTree {
        ParseTree::Atomic(name.into())
    }
}

impl Display for ParseTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseTree::Literal(b) => write!(f, "{b}"),
            ParseTree::Atomic(name) => write!(f, "{name}"),
            ParseTree::Unary(op, f1) => write!(f, "{op}({f1})"),
            ParseTree::Binary(f1, op, f2) => write!(f, "({f1} {op} {f2})"),
        }
    }
}
