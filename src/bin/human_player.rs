use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tube_sort_solver::game::{Game, TapOutcome};
use tube_sort_solver::generator::generate_progressive_level;
use tube_sort_solver::rating::star_rating_message;
use tube_sort_solver::scores::{BestScores, FileStore};
use tube_sort_solver::solver::{spawn_solver, SolverHandle, SolverLimits};
use tube_sort_solver::utils::{tubes_to_ansi_string, tubes_to_string};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Play the tube sorting puzzle in the terminal", long_about = None)]
struct Args {
    /// Progressive level to start from
    #[clap(short, long, default_value_t = 1)]
    level: u32,

    /// Seed for level generation (random if omitted)
    #[clap(short, long)]
    seed: Option<u64>,

    /// Directory where best scores are kept
    #[clap(long, default_value = ".tube_sort")]
    scores_dir: PathBuf,

    /// Draw tubes with terminal colors
    #[clap(long)]
    color: bool,
}

enum Command {
    Tap(usize),
    Pour(usize, usize),
    Undo,
    Restart,
    Next,
    Quit,
}

fn parse_command(input: &str) -> Option<Command> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    match parts.as_slice() {
        ["q"] => Some(Command::Quit),
        ["u"] => Some(Command::Undo),
        ["r"] => Some(Command::Restart),
        ["n"] => Some(Command::Next),
        [tube] => tube.parse().ok().map(Command::Tap),
        [from, to] => match (from.parse(), to.parse()) {
            (Ok(from), Ok(to)) => Some(Command::Pour(from, to)),
            _ => None,
        },
        _ => None,
    }
}

fn start_solver(game: &Game) -> SolverHandle {
    spawn_solver(game.tubes().to_vec(), SolverLimits::bounded())
}

fn report(outcome: TapOutcome) {
    match outcome {
        TapOutcome::Selected(id) => println!("Tube {} selected.", id),
        TapOutcome::Deselected => println!("Selection cleared."),
        TapOutcome::Poured(mv) => println!(
            "Poured {} segment(s) from tube {} into tube {}.",
            mv.segments_moved, mv.source_tube_id, mv.destination_tube_id
        ),
        TapOutcome::Rejected(reason) => println!("Invalid move: {}.", reason),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };

    let store = FileStore::new(&args.scores_dir);
    let mut best = BestScores::load_from(&store);
    let mut game = Game::new(generate_progressive_level(args.level.max(1), &mut rng));
    let mut solver = Some(start_solver(&game));
    let mut recorded = false;

    println!("Welcome to Tube Sort!");

    loop {
        if let Some(outcome) = solver.as_mut().and_then(|handle| handle.try_result()) {
            game.set_optimal_moves(outcome.optimal_moves);
            solver = None;
        }

        println!("---------------------");
        println!(
            "Level {}  Moves: {}  Optimal: {}  Best: {}",
            game.level_id(),
            game.move_count(),
            game.optimal_moves()
                .map_or_else(|| "?".to_string(), |n| n.to_string()),
            best.best_moves(game.level_id())
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
        );
        if let Some(remaining) = game.undos_remaining() {
            println!("Undos left: {}", remaining);
        }
        if args.color {
            println!("{}", tubes_to_ansi_string(game.tubes(), game.selected_tube_id()));
        } else {
            println!("{}", tubes_to_string(game.tubes(), game.selected_tube_id()));
        }

        if game.is_completed() && !recorded {
            // The rating needs the optimum, so wait for the (bounded) search.
            if let Some(handle) = solver.take() {
                if let Some(outcome) = handle.wait() {
                    game.set_optimal_moves(outcome.optimal_moves);
                }
            }
            let stars = game.stars().unwrap_or(1);
            println!();
            println!("{} {}", "*".repeat(stars as usize), star_rating_message(stars));
            if best.record_completion(game.level_id(), game.move_count(), stars) {
                println!("New best for level {}!", game.level_id());
                if !best.save_to(&store) {
                    println!("(Could not save best scores to {})", store.dir().display());
                }
            }
            recorded = true;
            println!("Enter 'n' for the next level, 'r' to replay, or 'q' to quit.");
        }

        print!("Enter a tube, a pour (from to), 'u' to undo, 'r' to restart, 'n' for next, 'q' to quit: ");
        io::stdout().flush().context("failed to flush stdout")?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let Some(command) = parse_command(input.trim()) else {
            println!("Invalid input. Use a tube number, 'from to', 'u', 'r', 'n', or 'q'.");
            continue;
        };

        match command {
            Command::Quit => {
                println!("Thanks for playing!");
                break;
            }
            Command::Undo => {
                if game.undo() {
                    println!("Move undone.");
                } else {
                    println!("Cannot undo (no moves made or no undos left).");
                }
            }
            Command::Restart => {
                game.restart();
                recorded = false;
                println!("Level restarted.");
            }
            Command::Next => {
                game.next_level(&mut rng);
                solver = Some(start_solver(&game));
                recorded = false;
            }
            Command::Tap(tube) if !game.is_completed() => match game.tap(tube) {
                Ok(outcome) => report(outcome),
                Err(e) => println!("{}", e),
            },
            Command::Pour(from, to) if !game.is_completed() => match game.pour(from, to) {
                Ok(outcome) => report(outcome),
                Err(e) => println!("{}", e),
            },
            Command::Tap(_) | Command::Pour(..) => {
                println!("Level already complete.");
            }
        }
    }

    Ok(())
}
