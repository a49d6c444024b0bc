use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::{presets::ASCII_MARKDOWN, Table};
use indexmap::IndexSet;
use itertools::Itertools;
use ltlmc::{
    benchmark::{format_answers, parse_benchmark, parse_transition_system},
    model_checking::{
        closure::Closure,
        gnba::GNBA,
        ltl::Formula,
        ltl_ast::ParseTree,
        ltl_verification::{check_ltl, verify_batch, Verdict},
        nba::NBA,
        nested_dfs::{Lasso, LTLVerificationResult},
        product::ProductState,
        simplification::SimplifiableAutomaton,
        transition_system::TransitionSystem,
    },
    parse::parse_ltl,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Automata-based LTL model checking of finite transition systems")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check every query of a benchmark file and write one answer per line
    Batch {
        #[arg(long, default_value = "TS.txt")]
        ts: PathBuf,
        #[arg(long, default_value = "benchmark.txt")]
        benchmark: PathBuf,
        #[arg(long, default_value = "answer.txt")]
        output: PathBuf,
        /// Also print every verdict to stdout as JSON
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Check a single formula, printing a counterexample if it does not hold
    Check {
        #[arg(long, default_value = "TS.txt")]
        ts: PathBuf,
        /// Check from this state instead of the initial states
        #[arg(long)]
        state: Option<usize>,
        formula: String,
    },
    /// Write the automata built for the negation of a formula as Graphviz files
    Automaton {
        formula: String,
        #[arg(long, default_value = "graphviz_output")]
        out_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Batch { ts, benchmark, output, format } => batch(&ts, &benchmark, &output, format).await,
        Command::Check { ts, state, formula } => check(&ts, state, &formula),
        Command::Automaton { formula, out_dir } => automaton(&formula, &out_dir),
    }
}

fn read_transition_system(path: &Path) -> Result<(TransitionSystem, IndexSet<String>)> {
    let src = fs::read_to_string(path).wrap_err_with(|| format!("could not read {}", path.display()))?;
    let ts = parse_transition_system(&src).wrap_err_with(|| format!("invalid transition system in {}", path.display()))?;
    Ok(ts)
}

fn parse_formula(src: &str) -> Result<ParseTree> {
    parse_ltl(src).map_err(|e| eyre!("invalid formula\n{:?}", miette::Report::new(e)))
}

async fn batch(ts_path: &Path, benchmark_path: &Path, output: &Path, format: Format) -> Result<()> {
    let (ts, ap_names) = read_transition_system(ts_path)?;
    let src = fs::read_to_string(benchmark_path)
        .wrap_err_with(|| format!("could not read {}", benchmark_path.display()))?;
    let queries = parse_benchmark(&src).wrap_err_with(|| format!("invalid benchmark in {}", benchmark_path.display()))?;

    info!(queries = queries.len(), states = ts.num_states(), "running benchmark");
    let results = verify_batch(&queries, Arc::new(ts), Arc::new(ap_names)).await;

    for (query, result) in queries.iter().zip(&results) {
        match result {
            Ok(holds) => info!(formula = query.formula(), holds, "checked"),
            Err(e) => error!(formula = query.formula(), "{e}"),
        }
    }

    fs::write(output, format_answers(&results)).wrap_err_with(|| format!("could not write {}", output.display()))?;
    info!("wrote answers to {}", output.display());

    if format == Format::Json {
        let verdicts = queries.into_iter().zip(&results).map(|(query, result)| Verdict::new(query, result)).collect_vec();
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
    }

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        return Err(eyre!("{failed} of {} queries failed", results.len()));
    }
    Ok(())
}

fn check(ts_path: &Path, state: Option<usize>, formula: &str) -> Result<()> {
    let (ts, ap_names) = read_transition_system(ts_path)?;
    let ts = match state {
        Some(state) => ts.with_initial_states([state])?,
        None => ts,
    };
    let tree = parse_formula(formula)?;

    match check_ltl(&tree, &ts, &ap_names)? {
        LTLVerificationResult::CycleNotFound => println!("The formula holds"),
        LTLVerificationResult::CycleFound(lasso) => {
            println!("The formula does not hold\n\nViolating trace:\n{}", lasso_table(&lasso))
        }
    }
    Ok(())
}

fn lasso_table(lasso: &Lasso<ProductState>) -> Table {
    let loop_start = lasso.prefix.len().saturating_sub(1);

    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN).set_header(["Step", "State", "Automaton state", "Loop"]);
    for (step, state) in lasso.prefix.iter().chain(lasso.cycle.iter().skip(1)).enumerate() {
        table.add_row([
            step.to_string(),
            state.ts_state.to_string(),
            state.nba_state.to_string(),
            if step >= loop_start { "*" } else { "" }.to_string(),
        ]);
    }
    table
}

fn automaton(formula: &str, out_dir: &Path) -> Result<()> {
    let negated = Formula::build(&parse_formula(formula)?)?.negate();
    let closure = Closure::new(&negated);
    let gnba = GNBA::from_closure(&closure, closure.elementary_sets());
    let nba = NBA::from_gnba(&gnba);
    let unentered = nba.in_degrees().into_iter().filter(|&(q, degree)| degree == 0 && !nba.initial_states.contains(&q)).count();
    info!(states = nba.states.len(), unentered, "degeneralized GNBA");
    let nba = nba.simplify();

    fs::create_dir_all(out_dir).wrap_err_with(|| format!("could not create {}", out_dir.display()))?;

    let gnba_path = out_dir.join("gnba.dot");
    fs::write(&gnba_path, gnba.to_dot(|i, set| format!("{i}: {}", closure.describe(set))))
        .wrap_err_with(|| format!("could not write {}", gnba_path.display()))?;
    info!(states = gnba.len(), "wrote GNBA to {}", gnba_path.display());

    let nba_path = out_dir.join("nba.dot");
    fs::write(&nba_path, nba.to_dot()).wrap_err_with(|| format!("could not write {}", nba_path.display()))?;
    info!(states = nba.states.len(), "wrote NBA to {}", nba_path.display());

    Ok(())
}
