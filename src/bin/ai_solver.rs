use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tube_sort_solver::engine::Tube;
use tube_sort_solver::generator::generate_progressive_level_with_seed;
use tube_sort_solver::solver::{serialize, solve_with_stats, SolverLimits, DEFAULT_MAX_DEPTH};
use tube_sort_solver::utils::{parse_level_text, tubes_to_string};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Find the minimum number of pours for a level", long_about = None)]
struct Args {
    /// Path to a level file (one tube per line, bottom first, '-' for empty)
    level_file: Option<PathBuf>,

    /// Solve a generated progressive level instead of a file
    #[clap(short, long, conflicts_with = "level_file")]
    level: Option<u32>,

    /// Seed for the generated level
    #[clap(short, long, default_value_t = 0)]
    seed: u64,

    /// Depth limit for the search
    #[clap(short, long, default_value_t = DEFAULT_MAX_DEPTH)]
    depth: usize,

    /// Wall-clock budget in milliseconds
    #[clap(short, long)]
    timeout_ms: Option<u64>,

    /// Give up after visiting this many distinct states
    #[clap(long)]
    max_states: Option<usize>,

    /// Print the result as a JSON object
    #[clap(long)]
    json: bool,
}

fn load_tubes(args: &Args) -> Result<Vec<Tube>> {
    if let Some(path) = &args.level_file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read level file {}", path.display()))?;
        return parse_level_text(&content)
            .with_context(|| format!("invalid level file {}", path.display()));
    }
    match args.level {
        Some(level_id) => {
            Ok(generate_progressive_level_with_seed(level_id, args.seed).initial_tubes)
        }
        None => bail!("pass a level file or --level"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let tubes = load_tubes(&args)?;

    let mut limits = SolverLimits::default().with_max_depth(args.depth);
    if let Some(ms) = args.timeout_ms {
        limits = limits.with_timeout(Duration::from_millis(ms));
    }
    if let Some(max_states) = args.max_states {
        limits = limits.with_max_states(max_states);
    }

    let outcome = solve_with_stats(&tubes, &limits, None);

    if args.json {
        let report = serde_json::json!({
            "state": serialize(&tubes),
            "optimal_moves": outcome.optimal_moves,
            "states_explored": outcome.states_explored,
            "elapsed_ms": outcome.elapsed.as_millis() as u64,
            "stop_reason": format!("{:?}", outcome.stop_reason),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Initial layout:\n{}\n", tubes_to_string(&tubes, None));
    println!("Searching with depth limit {}...\n", args.depth);
    match outcome.optimal_moves {
        Some(moves) => println!("Optimal solution: {} moves", moves),
        None => println!("No solution found ({:?}).", outcome.stop_reason),
    }
    println!(
        "States explored: {}, elapsed: {:.3}s",
        outcome.states_explored,
        outcome.elapsed.as_secs_f64()
    );
    Ok(())
}
