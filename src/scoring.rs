//! Time-weighted scoring
//!
//! Scoring is a pure function of the time left in the answer window, so it is
//! tested on its own and called by the round state machine while resolving.

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::constants::scoring::{DEFAULT_MAX_POINTS, DEFAULT_MIN_POINTS, MAX_POINTS_LIMIT};

/// Signed point delta for a single round
pub type Points = i64;

/// How correct answers are valued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Curve {
    /// Points scale with the fraction of the window left, rounded up
    #[default]
    TimeWeighted,
    /// Every correct answer is worth `max_points`
    Flat,
}

/// Scoring configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Shape of the reward curve
    #[garde(skip)]
    pub curve: Curve,
    /// Points for an instant correct answer
    #[garde(range(min = 1, max = MAX_POINTS_LIMIT))]
    pub max_points: u64,
    /// Points for a correct answer given with no time left; a correct answer
    /// never scores zero
    #[garde(range(min = 1, max = MAX_POINTS_LIMIT))]
    pub min_points: u64,
    /// Points taken away for a wrong or unanswered round
    #[garde(range(max = MAX_POINTS_LIMIT))]
    pub wrong_penalty: u64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            curve: Curve::TimeWeighted,
            max_points: DEFAULT_MAX_POINTS,
            min_points: DEFAULT_MIN_POINTS,
            wrong_penalty: 0,
        }
    }
}

/// Calculates the points for a resolved round
///
/// A correct answer earns `ceil(remaining / window_total * max_points)`,
/// clamped to `[min_points, max_points]`, so any correct answer earns at least
/// `min_points`. A wrong answer earns the negated penalty.
///
/// # Arguments
///
/// * `remaining` - Seconds left on the countdown when the answer arrived
/// * `window_total` - Seconds the round's window started with
/// * `correct` - Whether the answer matched the expected token
/// * `policy` - Scoring configuration
///
/// # Examples
///
/// ```rust
/// use scanquiz::scoring::{ScoringPolicy, score};
///
/// let policy = ScoringPolicy::default();
/// assert_eq!(score(30, 30, true, &policy), 10);
/// assert_eq!(score(4, 30, true, &policy), 2);
/// assert_eq!(score(4, 30, false, &policy), 0);
/// ```
pub fn score(remaining: u64, window_total: u64, correct: bool, policy: &ScoringPolicy) -> Points {
    if !correct {
        return -(policy.wrong_penalty as Points);
    }

    let earned = match policy.curve {
        Curve::Flat => policy.max_points,
        Curve::TimeWeighted if window_total == 0 => policy.max_points,
        Curve::TimeWeighted => {
            (remaining.min(window_total) * policy.max_points).div_ceil(window_total)
        }
    };

    earned.max(policy.min_points).min(policy.max_points) as Points
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_immediate_answer_earns_max() {
        assert_eq!(score(30, 30, true, &ScoringPolicy::default()), 10);
    }

    #[test]
    fn test_late_answer_rounds_up() {
        assert_eq!(score(4, 30, true, &ScoringPolicy::default()), 2);
        assert_eq!(score(1, 30, true, &ScoringPolicy::default()), 1);
        assert_eq!(score(15, 30, true, &ScoringPolicy::default()), 5);
    }

    #[test]
    fn test_no_time_left_earns_min() {
        assert_eq!(score(0, 30, true, &ScoringPolicy::default()), 1);
    }

    #[test]
    fn test_bonus_time_is_capped() {
        assert_eq!(score(45, 30, true, &ScoringPolicy::default()), 10);
    }

    #[test]
    fn test_zero_window() {
        assert_eq!(score(0, 0, true, &ScoringPolicy::default()), 10);
    }

    #[test]
    fn test_wrong_answer() {
        let mut policy = ScoringPolicy::default();
        assert_eq!(score(30, 30, false, &policy), 0);

        policy.wrong_penalty = 3;
        assert_eq!(score(30, 30, false, &policy), -3);
    }

    #[test]
    fn test_flat_curve() {
        let policy = ScoringPolicy {
            curve: Curve::Flat,
            max_points: 1,
            min_points: 1,
            wrong_penalty: 0,
        };
        assert_eq!(score(1, 20, true, &policy), 1);
        assert_eq!(score(20, 20, true, &policy), 1);
    }

    #[test]
    fn test_inverted_bounds_do_not_panic() {
        let policy = ScoringPolicy {
            curve: Curve::TimeWeighted,
            max_points: 5,
            min_points: 8,
            wrong_penalty: 0,
        };
        assert_eq!(score(0, 10, true, &policy), 5);
    }

    #[test]
    fn test_policy_validation() {
        assert!(ScoringPolicy::default().validate().is_ok());
        let policy = ScoringPolicy {
            max_points: 0,
            ..ScoringPolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = ScoringPolicy {
            min_points: 0,
            ..ScoringPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    proptest! {
        #[test]
        fn correct_points_stay_in_bounds(
            window in 1u64..600,
            remaining in 0u64..600,
            max in 1u64..1000,
            min_fraction in 0u64..=100,
        ) {
            let policy = ScoringPolicy {
                curve: Curve::TimeWeighted,
                max_points: max,
                min_points: max * min_fraction / 100,
                wrong_penalty: 0,
            };
            let points = score(remaining, window, true, &policy);
            prop_assert!(points >= policy.min_points as Points);
            prop_assert!(points <= policy.max_points as Points);
            prop_assert!(points >= 1 || policy.min_points == 0);
        }
    }
}
