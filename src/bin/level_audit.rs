use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tube_sort_solver::generator::{colors_for_level, generate_progressive_level_with_seed};
use tube_sort_solver::solver::{solve_with_stats, SolverLimits, StopReason};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Report how many generated levels are provably solvable", long_about = None)]
struct Args {
    /// First progressive level id to audit
    #[clap(long, default_value_t = 1)]
    from: u32,

    /// Last progressive level id to audit (inclusive)
    #[clap(long, default_value_t = 10)]
    to: u32,

    /// Seeds per level
    #[clap(short, long, default_value_t = 20)]
    seeds: u64,

    /// Per-level wall-clock budget in milliseconds
    #[clap(short, long, default_value_t = 1000)]
    timeout_ms: u64,
}

#[derive(Default)]
struct Tally {
    solved: usize,
    unsolvable: usize,
    undecided: usize,
    total_moves: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let limits = SolverLimits::default().with_timeout(Duration::from_millis(args.timeout_ms));

    println!(
        "Auditing levels {}..={} with {} seeds each...",
        args.from, args.to, args.seeds
    );

    let mut overall = Tally::default();
    for level_id in args.from.max(1)..=args.to {
        let mut tally = Tally::default();
        for seed in 0..args.seeds {
            let level = generate_progressive_level_with_seed(level_id, seed);
            let outcome = solve_with_stats(&level.initial_tubes, &limits, None);
            match (outcome.optimal_moves, outcome.stop_reason) {
                (Some(moves), _) => {
                    tally.solved += 1;
                    tally.total_moves += moves;
                }
                (None, StopReason::Exhausted) => tally.unsolvable += 1,
                (None, reason) => {
                    tracing::debug!(level_id, seed, ?reason, "search undecided");
                    tally.undecided += 1;
                }
            }
        }

        let avg = if tally.solved == 0 {
            0.0
        } else {
            tally.total_moves as f64 / tally.solved as f64
        };
        println!(
            "Level {:<4} colors {:<3} solved {:<4} unsolvable {:<4} undecided {:<4} avg moves {:.1}",
            level_id,
            colors_for_level(level_id),
            tally.solved,
            tally.unsolvable,
            tally.undecided,
            avg
        );

        overall.solved += tally.solved;
        overall.unsolvable += tally.unsolvable;
        overall.undecided += tally.undecided;
    }

    println!("\n--- Audit Complete ---");
    println!(
        "Solved: {}, unsolvable: {}, undecided: {}",
        overall.solved, overall.unsolvable, overall.undecided
    );
    Ok(())
}
