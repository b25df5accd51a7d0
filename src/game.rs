//! A single play session over one level.
//!
//! `Game` owns the mutable game state (current tubes, selection, move
//! history, counters) and drives the pure engine functions. Every change
//! replaces the tube collection wholesale; nothing is mutated in place.
use rand::Rng;

use crate::engine::{
    apply_move_to_tubes, duplicate_tube_id, find_tube, validate_move, InvalidMove, LevelConfig,
    Move, Tube,
};
use crate::error::{Error, Result};
use crate::generator::generate_progressive_level;
use crate::history::{can_undo, record_move, undo_last_move};
use crate::rating::{calculate_star_rating, Stars};
use crate::win::{game_stats, is_level_complete, GameStats};

/// What a tap on a tube did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapOutcome {
    /// Nothing was selected; the tapped tube is now selected.
    Selected(usize),
    /// The selected tube was tapped again and released.
    Deselected,
    /// The selected tube was poured into the tapped tube.
    Poured(Move),
    /// The pour was illegal; the selection was released.
    Rejected(InvalidMove),
}

/// Manages the state and progression of one level.
///
/// # Examples
/// ```
/// use tube_sort_solver::game::{Game, TapOutcome};
/// use tube_sort_solver::generator::simple_test_level;
///
/// let mut game = Game::new(simple_test_level());
/// assert_eq!(game.tap(0).unwrap(), TapOutcome::Selected(0));
/// assert!(matches!(game.tap(2).unwrap(), TapOutcome::Poured(_)));
/// assert_eq!(game.move_count(), 1);
/// assert!(game.undo());
/// ```
#[derive(Clone, Debug)]
pub struct Game {
    level: LevelConfig,
    tubes: Vec<Tube>,
    selected_tube_id: Option<usize>,
    move_history: Vec<Move>,
    is_completed: bool,
    move_count: usize,
    optimal_moves: Option<usize>,
    undos_remaining: Option<u32>,
}

impl Game {
    /// Starts `level` from its initial layout.
    pub fn new(level: LevelConfig) -> Self {
        let tubes = level.initial_tubes.clone();
        Game {
            is_completed: is_level_complete(&tubes),
            undos_remaining: level.max_undos,
            tubes,
            level,
            selected_tube_id: None,
            move_history: Vec::new(),
            move_count: 0,
            optimal_moves: None,
        }
    }

    /// Starts an ad-hoc level (id 0, unlimited undos) from `tubes`.
    ///
    /// # Errors
    /// Returns `Error::DuplicateTube` if two tubes share an id.
    pub fn from_tubes(tubes: Vec<Tube>) -> Result<Self> {
        if let Some(id) = duplicate_tube_id(&tubes) {
            return Err(Error::DuplicateTube(id));
        }
        let mut colors: Vec<_> = tubes
            .iter()
            .flat_map(|t| t.segments().iter().map(|s| s.color))
            .collect();
        colors.sort_unstable();
        colors.dedup();
        Ok(Game::new(LevelConfig {
            level_id: 0,
            colors,
            initial_tubes: tubes,
            max_undos: None,
        }))
    }

    /// The level being played, including its restart layout.
    pub fn level(&self) -> &LevelConfig {
        &self.level
    }

    pub fn level_id(&self) -> u32 {
        self.level.level_id
    }

    /// Current tube layout.
    pub fn tubes(&self) -> &[Tube] {
        &self.tubes
    }

    /// Pours made so far, oldest first. Undone pours are removed.
    pub fn move_history(&self) -> &[Move] {
        &self.move_history
    }

    pub fn selected_tube_id(&self) -> Option<usize> {
        self.selected_tube_id
    }

    /// The selected tube, if any.
    pub fn selected_tube(&self) -> Option<&Tube> {
        self.selected_tube_id
            .and_then(|id| find_tube(&self.tubes, id))
    }

    /// True once every tube is empty or full of one color.
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Number of pours made since the level (re)started. Undo does not lower it.
    pub fn move_count(&self) -> usize {
        self.move_count
    }

    /// Solver optimum for this level, if known.
    pub fn optimal_moves(&self) -> Option<usize> {
        self.optimal_moves
    }

    /// Stores the solver's result for this level.
    pub fn set_optimal_moves(&mut self, optimal_moves: Option<usize>) {
        self.optimal_moves = optimal_moves;
    }

    /// Remaining undo allowance; `None` means unlimited.
    pub fn undos_remaining(&self) -> Option<u32> {
        self.undos_remaining
    }

    /// Progress snapshot of the current layout.
    pub fn stats(&self) -> GameStats {
        game_stats(&self.tubes)
    }

    /// Selects a tube (or clears the selection with `None`).
    ///
    /// # Errors
    /// Returns `Error::UnknownTube` if no tube has the given id.
    pub fn select_tube(&mut self, tube_id: Option<usize>) -> Result<()> {
        if let Some(id) = tube_id {
            self.require_tube(id)?;
        }
        self.selected_tube_id = tube_id;
        Ok(())
    }

    /// Handles a tap on `tube_id` using the select-then-pour flow.
    ///
    /// With nothing selected the tube becomes selected. Tapping the selected
    /// tube again deselects it. Otherwise the selected tube is poured into
    /// the tapped one; the selection is released either way.
    ///
    /// # Errors
    /// Returns `Error::UnknownTube` if no tube has the given id.
    pub fn tap(&mut self, tube_id: usize) -> Result<TapOutcome> {
        self.require_tube(tube_id)?;
        match self.selected_tube_id {
            None => {
                self.selected_tube_id = Some(tube_id);
                Ok(TapOutcome::Selected(tube_id))
            }
            Some(selected) if selected == tube_id => {
                self.selected_tube_id = None;
                Ok(TapOutcome::Deselected)
            }
            Some(selected) => {
                self.selected_tube_id = None;
                self.pour(selected, tube_id)
            }
        }
    }

    /// Pours `source_id` into `dest_id` directly, ignoring the selection.
    ///
    /// # Errors
    /// Returns `Error::UnknownTube` if either id is unknown.
    pub fn pour(&mut self, source_id: usize, dest_id: usize) -> Result<TapOutcome> {
        let source = self.require_tube(source_id)?;
        let dest = self.require_tube(dest_id)?;
        if let Some(reason) = validate_move(source, dest).reason {
            tracing::debug!(source_id, dest_id, %reason, "pour rejected");
            return Ok(TapOutcome::Rejected(reason));
        }

        let update = apply_move_to_tubes(&self.tubes, source_id, dest_id);
        self.move_history = record_move(
            &self.move_history,
            source_id,
            dest_id,
            update.segments_moved,
        );
        self.tubes = update.tubes;
        self.move_count += 1;
        self.is_completed = is_level_complete(&self.tubes);
        if self.is_completed {
            tracing::info!(
                level_id = self.level.level_id,
                moves = self.move_count,
                "level completed"
            );
        }

        // The history is never empty right after a record.
        let recorded = self.move_history[self.move_history.len() - 1];
        Ok(TapOutcome::Poured(recorded))
    }

    /// Whether `undo` would currently succeed.
    pub fn can_undo(&self) -> bool {
        can_undo(&self.move_history, self.undos_remaining)
    }

    /// Reverts the last pour. Returns `false` if there is nothing to undo or
    /// the undo allowance is used up.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        let result = undo_last_move(&self.tubes, &self.move_history);
        if !result.success {
            return false;
        }

        self.tubes = result.tubes;
        self.move_history = result.new_history;
        self.selected_tube_id = None;
        self.is_completed = is_level_complete(&self.tubes);
        if let Some(remaining) = self.undos_remaining.as_mut() {
            *remaining -= 1;
        }
        true
    }

    /// Resets the level to its initial layout, keeping the known optimum.
    pub fn restart(&mut self) {
        self.tubes = self.level.initial_tubes.clone();
        self.move_history.clear();
        self.move_count = 0;
        self.selected_tube_id = None;
        self.is_completed = is_level_complete(&self.tubes);
        self.undos_remaining = self.level.max_undos;
    }

    /// Replaces the current level.
    pub fn load_level(&mut self, level: LevelConfig) {
        *self = Game::new(level);
    }

    /// Loads the next progressive level.
    pub fn next_level<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let next_id = self.level.level_id + 1;
        self.load_level(generate_progressive_level(next_id, rng));
    }

    /// Star rating of a completed level, or `None` while still in progress.
    pub fn stars(&self) -> Option<Stars> {
        self.is_completed
            .then(|| calculate_star_rating(self.move_count, self.optimal_moves))
    }

    fn require_tube(&self, tube_id: usize) -> Result<&Tube> {
        find_tube(&self.tubes, tube_id).ok_or(Error::UnknownTube(tube_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::color_counts;
    use crate::generator::{generate_progressive_level_with_seed, simple_test_level};
    use crate::utils::tubes_from_str_array;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_tap_flow() {
        let mut game = Game::new(simple_test_level());
        assert_eq!(game.tap(0).unwrap(), TapOutcome::Selected(0));
        assert_eq!(game.selected_tube().unwrap().id(), 0);
        assert_eq!(game.tap(0).unwrap(), TapOutcome::Deselected);
        assert_eq!(game.selected_tube_id(), None);

        game.tap(0).unwrap();
        match game.tap(2).unwrap() {
            TapOutcome::Poured(mv) => {
                assert_eq!(mv.source_tube_id, 0);
                assert_eq!(mv.destination_tube_id, 2);
                assert_eq!(mv.segments_moved, 1);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(game.move_count(), 1);
        assert_eq!(game.move_history().len(), 1);
        assert_eq!(game.selected_tube_id(), None);
    }

    #[test]
    fn test_rejected_pour_deselects() {
        let mut game = Game::new(simple_test_level());
        game.tap(0).unwrap();
        assert_eq!(
            game.tap(1).unwrap(),
            TapOutcome::Rejected(InvalidMove::DestinationFull)
        );
        assert_eq!(game.selected_tube_id(), None);
        assert_eq!(game.move_count(), 0);

        game.tap(2).unwrap();
        assert_eq!(
            game.tap(0).unwrap(),
            TapOutcome::Rejected(InvalidMove::EmptySource)
        );
    }

    #[test]
    fn test_unknown_tube() {
        let mut game = Game::new(simple_test_level());
        assert!(matches!(game.tap(9), Err(Error::UnknownTube(9))));
        assert!(game.select_tube(Some(9)).is_err());
        assert!(game.select_tube(None).is_ok());
    }

    #[test]
    fn test_completion_and_stars() {
        let tubes = tubes_from_str_array(2, &["RB", "BR", "-"]).unwrap();
        let mut game = Game::from_tubes(tubes).unwrap();
        game.set_optimal_moves(Some(3));
        assert_eq!(game.stars(), None);

        game.pour(0, 2).unwrap();
        game.pour(1, 0).unwrap();
        assert!(!game.is_completed());
        game.pour(2, 1).unwrap();
        assert!(game.is_completed());
        assert_eq!(game.stars(), Some(3));
        assert_eq!(game.stats().progress_percentage, 100);
    }

    #[test]
    fn test_from_tubes_rejects_duplicate_ids() {
        let mut tubes = tubes_from_str_array(2, &["RB", "BR", "-"]).unwrap();
        tubes.push(Tube::new(1, 2));
        assert!(matches!(Game::from_tubes(tubes), Err(Error::DuplicateTube(1))));
    }

    #[test]
    fn test_undo_restores_layout_but_not_move_count() {
        let mut game = Game::new(simple_test_level());
        let initial = game.tubes().to_vec();
        game.pour(0, 2).unwrap();
        game.pour(1, 0).unwrap();
        assert!(game.undo());
        assert!(game.undo());
        assert!(!game.undo());
        assert_eq!(game.tubes(), initial.as_slice());
        assert_eq!(game.move_count(), 2);
    }

    #[test]
    fn test_undo_allowance() {
        let mut level = simple_test_level();
        level.max_undos = Some(1);
        let mut game = Game::new(level);
        game.pour(0, 2).unwrap();
        game.pour(1, 0).unwrap();
        assert_eq!(game.undos_remaining(), Some(1));
        assert!(game.undo());
        assert_eq!(game.undos_remaining(), Some(0));
        assert!(!game.can_undo());
        assert!(!game.undo());

        game.restart();
        assert_eq!(game.undos_remaining(), Some(1));
        assert_eq!(game.move_count(), 0);
        assert!(game.move_history().is_empty());
    }

    #[test]
    fn test_restart_and_next_level() {
        let mut game = Game::new(generate_progressive_level_with_seed(3, 8));
        let before = color_counts(game.tubes());
        let source = game.tubes().iter().find(|t| !t.is_empty()).unwrap().id();
        let dest = game.tubes().iter().find(|t| t.is_empty()).unwrap().id();
        assert!(matches!(game.pour(source, dest).unwrap(), TapOutcome::Poured(_)));
        assert_eq!(color_counts(game.tubes()), before);

        game.restart();
        assert_eq!(game.tubes(), game.level().initial_tubes.as_slice());

        let mut rng = SmallRng::seed_from_u64(1);
        game.next_level(&mut rng);
        assert_eq!(game.level_id(), 4);
        assert_eq!(game.tubes().len(), 6);
        assert_eq!(game.move_count(), 0);
        assert_eq!(game.optimal_moves(), None);
    }
}
