use crate::types::{BoxplotStats, Dimension, ScoreVector};
use serde::Serialize;

/// Five-number summary using lower nearest-rank quartiles.
///
/// Scores are sorted ascending and Q1, median and Q3 are read at
/// `floor(n * 0.25)`, `floor(n * 0.5)` and `floor(n * 0.75)`. No
/// interpolation. An out-of-range index falls back to the minimum (Q1,
/// median) or the maximum (Q3). An empty slice has no summary.
pub fn compute_boxplot_stats(scores: &[f64]) -> Option<BoxplotStats> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let min = *sorted.first()?;
    let max = *sorted.last()?;
    let n = sorted.len() as f64;
    let at = |p: f64| sorted.get((n * p).floor() as usize).copied();

    Some(BoxplotStats {
        min,
        q1: at(0.25).unwrap_or(min),
        median: at(0.5).unwrap_or(min),
        q3: at(0.75).unwrap_or(max),
        max,
    })
}

/// Per-dimension arithmetic mean. An empty slice yields the zero vector.
pub fn compute_mean_vector(vectors: &[ScoreVector]) -> ScoreVector {
    let mut mean = ScoreVector::zero();
    if vectors.is_empty() {
        return mean;
    }
    let count = vectors.len() as f64;
    for dimension in Dimension::ALL {
        let sum: f64 = vectors.iter().map(|v| v.get(dimension)).sum();
        mean.set(dimension, sum / count);
    }
    mean
}

/// Mean of the strictly positive values only; 0 when there are none.
pub fn mean_of_positive(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite() && *v > 0.0)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Colour band every chart uses for a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::Fair => "fair",
            ScoreBand::Poor => "poor",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "rgba(138, 43, 226, 0.9)",
            ScoreBand::Good => "rgba(65, 105, 225, 0.9)",
            ScoreBand::Fair => "rgba(233, 201, 44, 0.9)",
            ScoreBand::Poor => "rgba(220, 20, 60, 0.9)",
        }
    }
}

pub fn score_color_band(score: f64) -> ScoreBand {
    if score >= 9.0 {
        ScoreBand::Excellent
    } else if score >= 7.0 {
        ScoreBand::Good
    } else if score >= 6.0 {
        ScoreBand::Fair
    } else {
        ScoreBand::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxplot_uses_lower_nearest_rank() {
        let stats = compute_boxplot_stats(&[9.0, 5.0, 8.0, 6.0, 7.0]).expect("non-empty");
        assert_eq!(stats.min, 5.0);
        assert_eq!(stats.q1, 6.0);
        assert_eq!(stats.median, 7.0);
        assert_eq!(stats.q3, 8.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn boxplot_single_value_collapses() {
        let stats = compute_boxplot_stats(&[7.5]).expect("non-empty");
        assert_eq!(
            stats,
            BoxplotStats {
                min: 7.5,
                q1: 7.5,
                median: 7.5,
                q3: 7.5,
                max: 7.5
            }
        );
    }

    #[test]
    fn boxplot_even_count_takes_upper_middle() {
        // floor(4 * 0.5) = 2, so the median is the third value, not an average.
        let stats = compute_boxplot_stats(&[1.0, 2.0, 3.0, 4.0]).expect("non-empty");
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q3, 4.0);
    }

    #[test]
    fn boxplot_of_nothing_is_none() {
        assert!(compute_boxplot_stats(&[]).is_none());
    }

    #[test]
    fn mean_vector_averages_each_dimension() {
        let a = ScoreVector::from_values([2.0, 1.0, 0.0, 10.0, 4.0, 6.0]);
        let b = ScoreVector::from_values([4.0, 3.0, 0.0, 0.0, 4.0, 8.0]);
        let mean = compute_mean_vector(&[a, b]);
        assert_eq!(mean.values(), [3.0, 2.0, 0.0, 5.0, 4.0, 7.0]);
    }

    #[test]
    fn mean_vector_of_nothing_is_zero() {
        assert_eq!(compute_mean_vector(&[]), ScoreVector::zero());
    }

    #[test]
    fn positive_mean_skips_zero_and_negative() {
        assert_eq!(mean_of_positive([0.0, -1.0, 4.0, 6.0]), 5.0);
        assert_eq!(mean_of_positive([0.0]), 0.0);
    }

    #[test]
    fn bands_follow_fixed_thresholds() {
        assert_eq!(score_color_band(9.0), ScoreBand::Excellent);
        assert_eq!(score_color_band(8.99), ScoreBand::Good);
        assert_eq!(score_color_band(7.0), ScoreBand::Good);
        assert_eq!(score_color_band(6.0), ScoreBand::Fair);
        assert_eq!(score_color_band(5.99), ScoreBand::Poor);
    }
}
