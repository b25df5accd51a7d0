//! Star rating of a finished level.

/// A 1–3 star rating.
pub type Stars = u8;

pub const MAX_STARS: Stars = 3;

/// Rates a finished level by comparing `actual_moves` to the solver's optimum.
///
/// - unknown optimum (`None`): 3 stars;
/// - at or under the optimum: 3 stars;
/// - at most 50% over the optimum: 2 stars;
/// - otherwise: 1 star.
///
/// # Examples
/// ```
/// use tube_sort_solver::rating::calculate_star_rating;
/// assert_eq!(calculate_star_rating(5, Some(5)), 3);
/// assert_eq!(calculate_star_rating(7, Some(5)), 2);
/// assert_eq!(calculate_star_rating(9, Some(5)), 1);
/// assert_eq!(calculate_star_rating(5, None), 3);
/// ```
pub fn calculate_star_rating(actual_moves: usize, optimal_moves: Option<usize>) -> Stars {
    let Some(optimal) = optimal_moves else {
        return MAX_STARS;
    };
    if actual_moves <= optimal {
        return MAX_STARS;
    }
    // 100 * over / optimal <= 50, kept in integers.
    let over = actual_moves - optimal;
    if 2 * over <= optimal {
        2
    } else {
        1
    }
}

/// Message shown alongside a rating.
pub fn star_rating_message(stars: Stars) -> &'static str {
    match stars {
        3 => "Perfect! Optimal solution!",
        2 => "Great job!",
        _ => "Level Complete!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_rating_thresholds() {
        assert_eq!(calculate_star_rating(5, Some(5)), 3);
        assert_eq!(calculate_star_rating(4, Some(5)), 3);
        assert_eq!(calculate_star_rating(7, Some(5)), 2);
        assert_eq!(calculate_star_rating(9, Some(5)), 1);
        assert_eq!(calculate_star_rating(15, Some(10)), 2);
        assert_eq!(calculate_star_rating(16, Some(10)), 1);
        assert_eq!(calculate_star_rating(5, None), 3);
        assert_eq!(calculate_star_rating(1, Some(0)), 1);
    }

    #[test]
    fn test_star_rating_message() {
        assert_eq!(star_rating_message(3), "Perfect! Optimal solution!");
        assert_eq!(star_rating_message(2), "Great job!");
        assert_eq!(star_rating_message(1), "Level Complete!");
    }
}
