//! Breadth-first search for the minimum number of pours that solves a level.
//!
//! Each distinct tube layout is a node and each legal pour an edge. The search
//! explores layouts in order of move count, so the first solved layout it
//! reaches is optimal. It can be bounded by depth, wall-clock time, number of
//! visited states and an external cancel flag; every bound yields "unknown"
//! (`None`) rather than an error.
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::{apply_move_to_tubes, validate_move, Tube};
use crate::win::is_level_complete;

/// Depth bound used when the caller does not pick one.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Wall-clock budget of the bounded-time variant.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline and cancel flag are polled once per this many expanded states.
const POLL_INTERVAL: usize = 256;

/// Separator byte between tubes in a `StateKey`; never a palette index.
const TUBE_SEPARATOR: u8 = u8::MAX;

/// Bounds applied to one search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverLimits {
    /// States at this move count are not expanded further.
    pub max_depth: usize,
    /// Give up once this much wall-clock time has passed.
    pub timeout: Option<Duration>,
    /// Give up once this many distinct states have been visited.
    pub max_states: Option<usize>,
}

impl Default for SolverLimits {
    fn default() -> Self {
        SolverLimits {
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: None,
            max_states: None,
        }
    }
}

impl SolverLimits {
    /// Default depth with the default wall-clock budget.
    pub fn bounded() -> Self {
        SolverLimits {
            timeout: Some(DEFAULT_TIMEOUT),
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = Some(max_states);
        self
    }
}

/// Why a search stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// A solved layout was reached.
    Solved,
    /// Every reachable layout was visited without finding a solution.
    Exhausted,
    /// The frontier ran dry, but some layouts were left unexpanded at the depth bound.
    DepthLimit,
    Timeout,
    Cancelled,
    StateLimit,
}

/// Result of a search together with its statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolveOutcome {
    /// Minimum move count, or `None` when it could not be determined.
    pub optimal_moves: Option<usize>,
    pub states_explored: usize,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
}

/// Structural key of a layout: color indices per tube, separated by `u8::MAX`.
pub type StateKey = Vec<u8>;

fn in_id_order(tubes: &[Tube]) -> Vec<&Tube> {
    let mut ordered: Vec<&Tube> = tubes.iter().collect();
    ordered.sort_by_key(|t| t.id());
    ordered
}

/// Returns the hashable key of a layout.
///
/// Only colors are encoded: ids, capacities and segment identifiers do not
/// change during a search.
pub fn state_key(tubes: &[Tube]) -> StateKey {
    let mut key = Vec::with_capacity(tubes.iter().map(|t| t.len() + 1).sum());
    for tube in in_id_order(tubes) {
        key.extend(tube.segments().iter().map(|s| s.color.index() as u8));
        key.push(TUBE_SEPARATOR);
    }
    key
}

/// Human-readable form of a layout, e.g. `[#FF6B6B,#45B7D1]|[]`.
///
/// Distinct layouts always serialize differently; this is the debugging
/// counterpart of `state_key`.
pub fn serialize(tubes: &[Tube]) -> String {
    in_id_order(tubes)
        .iter()
        .map(|tube| {
            let colors: Vec<&str> = tube.segments().iter().map(|s| s.color.hex()).collect();
            format!("[{}]", colors.join(","))
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// Computes the minimum number of moves needed to solve `initial_tubes`.
///
/// Returns `Some(0)` for an already solved layout, and `None` when no
/// solution lies within `max_depth` moves (which does not prove the layout
/// unsolvable).
///
/// # Examples
/// ```
/// use tube_sort_solver::solver::calculate_optimal_moves;
/// use tube_sort_solver::utils::tubes_from_str_array;
///
/// let tubes = tubes_from_str_array(2, &["RB", "BR", "-"]).unwrap();
/// assert_eq!(calculate_optimal_moves(&tubes, 100), Some(3));
/// ```
pub fn calculate_optimal_moves(initial_tubes: &[Tube], max_depth: usize) -> Option<usize> {
    let limits = SolverLimits::default().with_max_depth(max_depth);
    solve_with_stats(initial_tubes, &limits, None).optimal_moves
}

/// Like `calculate_optimal_moves` with the default depth, but gives up after `timeout`.
pub fn calculate_optimal_moves_with_timeout(
    initial_tubes: &[Tube],
    timeout: Duration,
) -> Option<usize> {
    let limits = SolverLimits::default().with_timeout(timeout);
    solve_with_stats(initial_tubes, &limits, None).optimal_moves
}

/// Runs the search under `limits`, polling `cancel` if given.
pub fn solve_with_stats(
    initial_tubes: &[Tube],
    limits: &SolverLimits,
    cancel: Option<&AtomicBool>,
) -> SolveOutcome {
    let started = Instant::now();
    let finish = |optimal_moves: Option<usize>, states_explored: usize, stop_reason: StopReason| {
        let outcome = SolveOutcome {
            optimal_moves,
            states_explored,
            elapsed: started.elapsed(),
            stop_reason,
        };
        tracing::debug!(
            optimal = ?outcome.optimal_moves,
            states = outcome.states_explored,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            reason = ?outcome.stop_reason,
            "search finished"
        );
        outcome
    };

    if is_level_complete(initial_tubes) {
        return finish(Some(0), 0, StopReason::Solved);
    }

    let deadline = limits.timeout.map(|t| started + t);
    let mut frontier: VecDeque<(Vec<Tube>, usize)> = VecDeque::new();
    let mut visited: HashSet<StateKey> = HashSet::new();
    frontier.push_back((initial_tubes.to_vec(), 0));
    visited.insert(state_key(initial_tubes));

    let mut expanded = 0usize;
    let mut hit_depth_limit = false;

    while let Some((tubes, moves)) = frontier.pop_front() {
        if moves >= limits.max_depth {
            hit_depth_limit = true;
            continue;
        }

        expanded += 1;
        if expanded % POLL_INTERVAL == 0 {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return finish(None, visited.len(), StopReason::Cancelled);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return finish(None, visited.len(), StopReason::Timeout);
            }
        }

        for source in &tubes {
            if source.is_empty() {
                continue;
            }
            for dest in &tubes {
                if source.id() == dest.id() || !validate_move(source, dest).is_valid {
                    continue;
                }
                // Moving a single-color tube into an empty one only relabels tubes.
                if dest.is_empty() && source.is_uniform() {
                    continue;
                }

                let update = apply_move_to_tubes(&tubes, source.id(), dest.id());
                if !update.success {
                    continue;
                }
                let key = state_key(&update.tubes);
                if visited.contains(&key) {
                    continue;
                }
                if is_level_complete(&update.tubes) {
                    return finish(Some(moves + 1), visited.len(), StopReason::Solved);
                }

                visited.insert(key);
                if limits.max_states.is_some_and(|max| visited.len() >= max) {
                    return finish(None, visited.len(), StopReason::StateLimit);
                }
                frontier.push_back((update.tubes, moves + 1));
            }
        }
    }

    let reason = if hit_depth_limit {
        StopReason::DepthLimit
    } else {
        StopReason::Exhausted
    };
    finish(None, visited.len(), reason)
}

/// A search running on a background thread.
///
/// Dropping the handle cancels the search.
pub struct SolverHandle {
    receiver: Receiver<SolveOutcome>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Starts a search on its own thread so an interactive caller is never blocked.
pub fn spawn_solver(tubes: Vec<Tube>, limits: SolverLimits) -> SolverHandle {
    let (sender, receiver) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let thread = thread::spawn(move || {
        let outcome = solve_with_stats(&tubes, &limits, Some(&flag));
        // The receiver may already be gone; nobody is waiting then.
        let _ = sender.send(outcome);
    });

    SolverHandle {
        receiver,
        cancel,
        thread: Some(thread),
    }
}

impl SolverHandle {
    /// Returns the outcome if the search has finished, without blocking.
    pub fn try_result(&mut self) -> Option<SolveOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => {
                self.join();
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                None
            }
        }
    }

    /// Blocks until the search finishes. `None` if the worker died.
    pub fn wait(mut self) -> Option<SolveOutcome> {
        let outcome = self.receiver.recv().ok();
        self.join();
        outcome
    }

    /// Asks the search to stop at its next poll; it then reports `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("solver thread panicked");
            }
        }
    }
}

impl Drop for SolverHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
