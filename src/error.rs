//! Error type shared by the fallible parts of the crate.
//!
//! Illegal moves are not errors: they are reported through
//! [`ValidationResult`](crate::engine::ValidationResult) and never leave the
//! engine as an `Err`. This enum covers parsing, persistence and generation.

use thiserror::Error;

/// Errors produced by parsing, persistence and verified level generation.
#[derive(Debug, Error)]
pub enum Error {
    /// The backing key-value store could not be read or written.
    #[error("score store unavailable: {0}")]
    Store(String),

    /// Filesystem failure underneath a file-backed store or level file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted blob or level file did not decode.
    #[error("corrupt data: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// A textual tube layout could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// No candidate layout was proven solvable within the attempt budget.
    #[error("no solvable layout found after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    /// A tube was built with more segments than it can hold.
    #[error("tube {id} holds {len} segments but its capacity is {capacity}")]
    Overfilled { id: usize, len: usize, capacity: usize },

    /// A tube id referenced by a caller does not exist in the collection.
    #[error("unknown tube id {0}")]
    UnknownTube(usize),

    /// Two tubes in one layout share an id.
    #[error("duplicate tube id {0}")]
    DuplicateTube(usize),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
