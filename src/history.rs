//! Move history and undo.
//!
//! The history is an append-only log of [`Move`]s. Undoing pours the last
//! recorded block back from its destination to its source, moving exactly the
//! recorded number of segments.
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::{transfer_exact, Move, Tube};

/// Result of `undo_last_move`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoResult {
    pub tubes: Vec<Tube>,
    pub new_history: Vec<Move>,
    pub success: bool,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Returns a copy of `history` with a new move appended.
///
/// The input history is left untouched. A pour of zero segments cannot be
/// undone, so it is not recorded and the copy equals `history`.
pub fn record_move(
    history: &[Move],
    source_id: usize,
    dest_id: usize,
    segments_moved: usize,
) -> Vec<Move> {
    if segments_moved == 0 {
        tracing::warn!(source_id, dest_id, "not recording an empty pour");
        return history.to_vec();
    }
    let mut new_history = Vec::with_capacity(history.len() + 1);
    new_history.extend_from_slice(history);
    new_history.push(Move {
        source_tube_id: source_id,
        destination_tube_id: dest_id,
        segments_moved,
        timestamp: now_millis(),
    });
    new_history
}

/// Reverses the last recorded move.
///
/// The recorded destination becomes the source of the reversal. Exactly
/// `segments_moved` segments travel back, even when the destination's top run
/// extends below the block that was poured. An empty history, or a reversal
/// that the engine refuses, yields `success = false` with everything unchanged.
pub fn undo_last_move(tubes: &[Tube], history: &[Move]) -> UndoResult {
    let unchanged = || UndoResult {
        tubes: tubes.to_vec(),
        new_history: history.to_vec(),
        success: false,
    };

    let Some(last) = history.last() else {
        return unchanged();
    };

    let reversal = transfer_exact(
        tubes,
        last.destination_tube_id,
        last.source_tube_id,
        last.segments_moved,
    );
    if !reversal.success {
        tracing::warn!(
            source = last.destination_tube_id,
            dest = last.source_tube_id,
            count = last.segments_moved,
            "undo reversal rejected; history does not match tubes"
        );
        return unchanged();
    }

    UndoResult {
        tubes: reversal.tubes,
        new_history: history[..history.len() - 1].to_vec(),
        success: true,
    }
}

/// Returns whether an undo may be performed.
///
/// `undos_remaining` is the caller's remaining allowance: `None` means
/// unlimited, `Some(0)` forbids further undos. An empty history can never be
/// undone.
pub fn can_undo(history: &[Move], undos_remaining: Option<u32>) -> bool {
    !history.is_empty() && undos_remaining != Some(0)
}

/// Remaining undos under a cap: `None` when uncapped, otherwise
/// `max(0, max_undos - history.len())`.
pub fn get_remaining_undos(history: &[Move], max_undos: Option<u32>) -> Option<u32> {
    max_undos.map(|max| (max as usize).saturating_sub(history.len()) as u32)
}
