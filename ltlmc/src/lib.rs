use lalrpop_util::lalrpop_mod;

pub mod benchmark;
pub mod model_checking;
pub mod parse;
pub mod util;

lalrpop_mod!(#[allow(clippy::all)] pub ltl);
