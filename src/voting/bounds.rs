use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// The inclusive range a submitted score must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBounds {
    min: f64,
    max: f64,
}

impl ScoreBounds {
    /// Scores run from 0 to 10 unless configured otherwise.
    pub const DEFAULT: ScoreBounds = ScoreBounds {
        min: 0.0,
        max: 10.0,
    };

    /// Create bounds, or `None` if they are not finite or `min > max`.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        (min.is_finite() && max.is_finite() && min <= max).then_some(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Is `score` a finite number within the bounds?
    pub fn contains(&self, score: f64) -> bool {
        score.is_finite() && self.min <= score && score <= self.max
    }
}

impl Default for ScoreBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Display for ScoreBounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero_to_ten_inclusive() {
        let bounds = ScoreBounds::default();
        assert!(bounds.contains(0.0));
        assert!(bounds.contains(10.0));
        assert!(bounds.contains(7.25));
        assert!(!bounds.contains(-0.01));
        assert!(!bounds.contains(10.01));
    }

    #[test]
    fn non_finite_scores_are_never_contained() {
        let bounds = ScoreBounds::new(f64::MIN, f64::MAX).unwrap();
        assert!(!bounds.contains(f64::NAN));
        assert!(!bounds.contains(f64::INFINITY));
        assert!(!bounds.contains(f64::NEG_INFINITY));
    }

    #[test]
    fn rejects_inverted_or_non_finite_bounds() {
        assert!(ScoreBounds::new(10.0, 0.0).is_none());
        assert!(ScoreBounds::new(f64::NAN, 10.0).is_none());
        assert!(ScoreBounds::new(0.0, f64::INFINITY).is_none());
        assert_eq!(ScoreBounds::new(5.0, 5.0).map(|b| b.to_string()), Some("[5, 5]".to_string()));
    }
}
