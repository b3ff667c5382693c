//! Confidence statistics over text blocks.

use crate::models::{ConfidenceStats, TextBlock};

/// Blocks strictly below this confidence count as low confidence.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.8;

/// Mean, min, max and low-confidence count of per-block confidence.
///
/// Returns all-zero stats for an empty slice. Non-finite confidences are
/// not scores and are left out, so they count toward nothing.
pub fn confidence_stats(blocks: &[TextBlock]) -> ConfidenceStats {
    stats_from_values(blocks.iter().map(|b| b.confidence))
}

pub(crate) fn stats_from_values(values: impl IntoIterator<Item = f32>) -> ConfidenceStats {
    let mut total = 0usize;
    let mut sum = 0f64;
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut low = 0usize;

    for c in values.into_iter().filter(|c| c.is_finite()) {
        total += 1;
        sum += f64::from(c);
        min = min.min(c);
        max = max.max(c);
        if c < LOW_CONFIDENCE_THRESHOLD {
            low += 1;
        }
    }

    if total == 0 {
        return ConfidenceStats::default();
    }

    // f64 -> f32 rounding can land just outside [min, max].
    let average = ((sum / total as f64) as f32).clamp(min, max);

    ConfidenceStats {
        average,
        min,
        max,
        low_confidence_count: low,
        total_blocks: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(confidences: &[f32]) -> Vec<TextBlock> {
        confidences
            .iter()
            .map(|c| TextBlock::new("x", *c))
            .collect()
    }

    #[test]
    fn test_empty_is_all_zero() {
        let stats = confidence_stats(&[]);
        assert_eq!(stats, ConfidenceStats::default());
        assert_eq!(stats.total_blocks, 0);
        assert_eq!(stats.average, 0.0);
    }

    #[test]
    fn test_basic_stats() {
        let stats = confidence_stats(&blocks(&[0.9, 0.5, 0.8, 0.7]));
        assert_eq!(stats.total_blocks, 4);
        assert_eq!(stats.min, 0.5);
        assert_eq!(stats.max, 0.9);
        assert!((stats.average - 0.725).abs() < 1e-6);
        // 0.8 itself is not low.
        assert_eq!(stats.low_confidence_count, 2);
    }

    #[test]
    fn test_average_within_bounds() {
        let cases: [&[f32]; 5] = [
            &[0.1],
            &[1.0, 1.0, 1.0],
            &[0.33, 0.33, 0.33, 0.33, 0.33, 0.33, 0.33],
            &[0.0, 1.0],
            &[0.79999, 0.8, 0.80001, 0.2, 0.95],
        ];
        for values in cases {
            let stats = confidence_stats(&blocks(values));
            assert!(stats.min <= stats.average && stats.average <= stats.max);
            let expected_low = values.iter().filter(|c| **c < 0.8).count();
            assert_eq!(stats.low_confidence_count, expected_low);
        }
    }

    #[test]
    fn test_non_finite_skipped() {
        let stats = confidence_stats(&blocks(&[f32::NAN, f32::INFINITY]));
        assert_eq!(stats, ConfidenceStats::default());

        let stats = confidence_stats(&blocks(&[0.9, f32::NAN, 0.5]));
        assert_eq!(stats.total_blocks, 2);
        assert_eq!(stats.low_confidence_count, 1);
        assert_eq!(stats.min, 0.5);
        assert_eq!(stats.max, 0.9);
        assert!((stats.average - 0.7).abs() < 1e-6);
    }
}
