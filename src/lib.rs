//! # Tube Sort Solver Library
//!
//! This library provides the core game logic for a tube-sorting puzzle
//! (colored segments poured between tubes until every tube holds one color)
//! and a breadth-first solver that finds the minimum number of pours.
//!
//! It is used by three binaries:
//! - `human_player`: Allows interactive gameplay via the command line.
//! - `ai_solver`: Takes a level (from a file or the generator) and reports
//!   the optimal move count.
//! - `level_audit`: Generates many seeded levels and reports how many the
//!   solver can prove solvable.
//!
//! ## Modules
//! - `engine`: Colors, segments, tubes, moves, and the pure pour mechanics.
//! - `win`: Completion checks and progress statistics.
//! - `history`: Move records and undo.
//! - `game`: The `Game` session tying selection, pours, undo, and restart together.
//! - `generator`: Random and progressive level generation.
//! - `solver`: Breadth-first search for the optimal move count, with limits.
//! - `rating`: Star rating from actual and optimal move counts.
//! - `scores`: Persisted best results per level.
//! - `utils`: Parsing and rendering tube layouts as text.
//! - `error`: The crate error type.

pub mod engine;
pub mod error;
pub mod game;
pub mod generator;
pub mod history;
pub mod rating;
pub mod scores;
pub mod solver;
pub mod utils;
pub mod win;

pub use error::{Error, Result};
