//! Time-based scoring
//!
//! A level starts worth 10000 points and loses 10 for every simulated tick.

/// Score for finishing instantly
pub const BASE_SCORE: u64 = 10_000;
/// Points lost per simulated tick
pub const PENALTY_PER_TICK: u64 = 10;

/// Score for a completion after `elapsed_ticks`, floored at 0
pub fn score(elapsed_ticks: u64) -> u64 {
    BASE_SCORE.saturating_sub(elapsed_ticks.saturating_mul(PENALTY_PER_TICK))
}

/// Best of an existing record (if any) and a new score
pub fn best_score(existing: Option<u64>, new_score: u64) -> u64 {
    existing.unwrap_or(0).max(new_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_score_formula() {
        assert_eq!(score(0), 10_000);
        assert_eq!(score(1), 9_990);
        assert_eq!(score(80), 9_200);
        assert_eq!(score(1_000), 0);
        assert_eq!(score(1_001), 0);
        assert_eq!(score(u64::MAX), 0);
    }

    #[test]
    fn test_best_score() {
        assert_eq!(best_score(None, 9_200), 9_200);
        assert_eq!(best_score(Some(9_850), 9_000), 9_850);
        assert_eq!(best_score(Some(9_000), 9_850), 9_850);

        let best = [9_200, 9_850, 9_000]
            .into_iter()
            .fold(None, |best, s| Some(best_score(best, s)));
        assert_eq!(best, Some(9_850));
    }

    proptest! {
        /// Property: score never exceeds the base and never goes negative
        #[test]
        fn prop_score_bounded(ticks in any::<u64>()) {
            let s = score(ticks);
            prop_assert!(s <= BASE_SCORE);
        }

        /// Property: longer attempts never score higher
        #[test]
        fn prop_score_monotonic(a in 0u64..5_000, b in 0u64..5_000) {
            let (short, long) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(score(short) >= score(long));
        }
    }
}
