//! Win condition evaluation.
//!
//! A tube is complete when it is empty, or full with a single color. A level
//! is complete when every tube is.
use serde::{Deserialize, Serialize};

use crate::engine::Tube;

/// Returns `true` if `tube` is empty, or full and single-colored.
pub fn is_tube_complete(tube: &Tube) -> bool {
    tube.is_empty() || (tube.is_full() && tube.is_uniform())
}

/// Returns `true` once every tube in the collection is complete.
///
/// # Examples
/// ```
/// use tube_sort_solver::utils::tubes_from_str_array;
/// use tube_sort_solver::win::is_level_complete;
///
/// let solved = tubes_from_str_array(4, &["RRRR", "BBBB", "-"]).unwrap();
/// assert!(is_level_complete(&solved));
/// let unsolved = tubes_from_str_array(4, &["RRRR", "BR", "-"]).unwrap();
/// assert!(!is_level_complete(&unsolved));
/// ```
pub fn is_level_complete(tubes: &[Tube]) -> bool {
    tubes.iter().all(is_tube_complete)
}

/// Read-only progress snapshot of a tube collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub total_tubes: usize,
    pub complete_tubes: usize,
    pub empty_tubes: usize,
    pub full_tubes: usize,
    /// `round(100 * complete / total)`; 0 for an empty collection.
    pub progress_percentage: u32,
}

pub fn game_stats(tubes: &[Tube]) -> GameStats {
    let total_tubes = tubes.len();
    let complete_tubes = tubes.iter().filter(|t| is_tube_complete(t)).count();
    let empty_tubes = tubes.iter().filter(|t| t.is_empty()).count();
    let full_tubes = tubes.iter().filter(|t| t.is_full()).count();
    let progress_percentage = if total_tubes == 0 {
        0
    } else {
        (100.0 * complete_tubes as f64 / total_tubes as f64).round() as u32
    };

    GameStats {
        total_tubes,
        complete_tubes,
        empty_tubes,
        full_tubes,
        progress_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{tube_from_str, tubes_from_str_array};

    #[test]
    fn test_tube_completion() {
        assert!(is_tube_complete(&Tube::new(0, 4)));
        assert!(is_tube_complete(&tube_from_str(0, 4, "RRRR").unwrap()));
        assert!(!is_tube_complete(&tube_from_str(0, 4, "RRR").unwrap()));
        assert!(!is_tube_complete(&tube_from_str(0, 4, "RRRB").unwrap()));
    }

    #[test]
    fn test_level_completion() {
        let solved = tubes_from_str_array(4, &["RRRR", "BBBB", "-"]).unwrap();
        assert!(is_level_complete(&solved));

        let unsolved = tubes_from_str_array(4, &["RRRR", "BR", "-"]).unwrap();
        assert!(!is_level_complete(&unsolved));

        assert!(is_level_complete(&[]));
    }

    #[test]
    fn test_game_stats() {
        let tubes = tubes_from_str_array(4, &["RRRR", "BRBR", "-"]).unwrap();
        let stats = game_stats(&tubes);
        assert_eq!(
            stats,
            GameStats {
                total_tubes: 3,
                complete_tubes: 2,
                empty_tubes: 1,
                full_tubes: 2,
                progress_percentage: 67,
            }
        );
        assert_eq!(game_stats(&[]).progress_percentage, 0);
    }
}
