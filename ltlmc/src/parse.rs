use itertools::Itertools;
use miette::{Diagnostic, SourceSpan};
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::{ltl, model_checking::ltl_ast::ParseTree};

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[error("{message}{expected}")]
#[diagnostic(code(ltlmc::parse))]
pub struct ParseError {
    #[source_code]
    src: String,
    #[label("here")]
    span: SourceSpan,
    message: String,
    expected: String,
}

impl ParseError {
    pub fn new(src: &str, e: lalrpop_util::ParseError<usize, lalrpop_util::lexer::Token<'_>, &'static str>) -> Self {
        use lalrpop_util::ParseError as E;

        let (span, message, expected): ((usize, usize), String, String) = match e {
            E::InvalidToken { location } => ((location, 1), "invalid token".to_string(), String::new()),
            E::UnrecognizedEOF { location, expected } => {
                ((location, 0), "unexpected end of formula".to_string(), expected_suffix(&expected))
            }
            E::UnrecognizedToken { token: (l, tok, r), expected } => {
                ((l, r - l), format!("unexpected token `{}`", tok.1), expected_suffix(&expected))
            }
            E::ExtraToken { token: (l, tok, r) } => ((l, r - l), format!("extra token `{}`", tok.1), String::new()),
            E::User { error } => ((0, src.len()), error.to_string(), String::new()),
        };

        ParseError {
            src: src.to_string(),
            span: span.into(),
            message,
            expected,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}

fn expected_suffix(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(", expected one of {}", expected.iter().join(" "))
    }
}

pub fn parse_ltl(src: &str) -> Result<ParseTree, ParseError> {
    static PARSER: Lazy<ltl::FormulaParser> = Lazy::new(ltl::FormulaParser::new);

    PARSER.parse(src).map_err(|e| ParseError::new(src, e))
}
