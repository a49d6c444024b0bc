//! Readers for the transition-system and benchmark files, and the answer writer.

use std::str::FromStr;

use indexmap::IndexSet;
use itertools::Itertools;
use thiserror::Error;

use crate::model_checking::{
    ltl_verification::Query, transition_system::TransitionSystem, Label, ModelCheckError,
};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("line {line}: unexpected end of input, expected {expected}")]
    UnexpectedEnd { line: usize, expected: &'static str },
    #[error("line {line}: {source}")]
    Invalid {
        line: usize,
        #[source]
        source: ModelCheckError,
    },
}

struct Lines<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    line: usize,
}

impl<'a> Lines<'a> {
    fn new(src: &'a str) -> Lines<'a> {
        Lines { lines: src.lines().enumerate(), line: 0 }
    }

    fn next(&mut self, expected: &'static str) -> Result<&'a str, InputError> {
        match self.lines.next() {
            Some((i, line)) => {
                self.line = i + 1;
                Ok(line.trim())
            }
            None => Err(InputError::UnexpectedEnd { line: self.line + 1, expected }),
        }
    }

    fn malformed(&self, message: impl Into<String>) -> InputError {
        InputError::Malformed { line: self.line, message: message.into() }
    }

    fn invalid(&self, source: ModelCheckError) -> InputError {
        InputError::Invalid { line: self.line, source }
    }

    fn number<T: FromStr>(&self, word: &str) -> Result<T, InputError> {
        word.parse().map_err(|_| self.malformed(format!("`{word}` is not a valid number")))
    }

    fn numbers<T: FromStr>(&self, line: &str) -> Result<Vec<T>, InputError> {
        line.split_whitespace().map(|word| self.number(word)).collect()
    }

    fn pair(&mut self, expected: &'static str) -> Result<(usize, usize), InputError> {
        let line = self.next(expected)?;
        match self.numbers::<usize>(line)?[..] {
            [a, b] => Ok((a, b)),
            _ => Err(self.malformed(format!("expected {expected}"))),
        }
    }
}

/// Reads a transition system; the returned set names the proposition ids used in its labels.
pub fn parse_transition_system(src: &str) -> Result<(TransitionSystem, IndexSet<String>), InputError> {
    let mut lines = Lines::new(src);

    let (num_states, num_transitions) = lines.pair("state and transition counts")?;
    let mut ts = TransitionSystem::new(num_states);

    let line = lines.next("initial states")?;
    for s in lines.numbers(line)? {
        ts.add_initial_state(s).map_err(|e| lines.invalid(e))?;
    }
    for action in lines.next("action names")?.split_whitespace() {
        ts.add_action(action);
    }
    let ap_names = lines.next("proposition names")?.split_whitespace().map(str::to_string).collect::<IndexSet<_>>();

    for _ in 0..num_transitions {
        let line = lines.next("a transition")?;
        let (source, action, target) = line
            .split_whitespace()
            .collect_tuple()
            .ok_or_else(|| lines.malformed("expected `source action target`"))?;
        let source = lines.number(source)?;
        let target = lines.number(target)?;
        ts.add_named_transition(source, action, target).map_err(|e| lines.invalid(e))?;
    }

    for s in 0..num_states {
        let line = lines.next("a state label")?;
        let ids = lines.numbers::<i64>(line)?;
        let label = match ids[..] {
            [] => return Err(lines.malformed("empty label, use -1 for none")),
            [-1] => Label::new(),
            _ => ids
                .iter()
                .map(|&id| usize::try_from(id).map_err(|_| lines.malformed(format!("invalid proposition id {id}"))))
                .collect::<Result<_, _>>()?,
        };
        ts.set_label(s, label).map_err(|e| lines.invalid(e))?;
    }

    Ok((ts, ap_names))
}

/// Reads the queries of a benchmark file, whole-system formulas first.
pub fn parse_benchmark(src: &str) -> Result<Vec<Query>, InputError> {
    let mut lines = Lines::new(src);

    let (num_system, num_state) = lines.pair("query counts")?;
    let mut queries = Vec::with_capacity(num_system + num_state);

    for _ in 0..num_system {
        let formula = lines.next("a formula")?;
        queries.push(Query::System { formula: formula.to_string() });
    }
    for _ in 0..num_state {
        let line = lines.next("a state and a formula")?;
        let (state, formula) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| lines.malformed("expected `state formula`"))?;
        let state = lines.number(state)?;
        queries.push(Query::State { state, formula: formula.trim().to_string() });
    }

    Ok(queries)
}

/// One line per result: `1` when the property holds, `0` when it is violated, `-1` when the query failed.
pub fn format_answers<'a>(results: impl IntoIterator<Item = &'a Result<bool, ModelCheckError>>) -> String {
    results
        .into_iter()
        .map(|result| match result {
            Ok(true) => "1\n",
            Ok(false) => "0\n",
            Err(_) => "-1\n",
        })
        .collect()
}
