//! Quadratic scan over every start index.

use crate::Subarray;

/// Maximum-sum contiguous subarray by trying every `(start, end)` pair.
///
/// O(n²) time, O(1) space. Ties resolve to the earliest start, then the
/// shortest range. Returns `None` for an empty slice.
///
/// Sums are exact only while they fit in an `i64`; beyond that they saturate.
/// [`crate::ValueRange::sums_fit`] checks this for generated input.
#[must_use]
pub fn max_subarray_greedy(values: &[i64]) -> Option<Subarray> {
    let mut best: Option<Subarray> = None;

    for start in 0..values.len() {
        let mut sum = 0_i64;
        for (end, &value) in values.iter().enumerate().skip(start) {
            sum = sum.saturating_add(value);
            if best.is_none_or(|b| sum > b.sum) {
                best = Some(Subarray { sum, start, end });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(max_subarray_greedy(&[]), None);
    }

    #[test]
    fn test_classic_example() {
        let values = [13, -3, -25, 20, -3, -16, -23, 18, 20, -7, 12, -5, -22, 15, -4, 7];
        assert_eq!(
            max_subarray_greedy(&values),
            Some(Subarray {
                sum: 43,
                start: 7,
                end: 10
            })
        );
    }

    #[test]
    fn test_all_negative_picks_largest_element() {
        assert_eq!(
            max_subarray_greedy(&[-8, -3, -6, -3]),
            Some(Subarray {
                sum: -3,
                start: 1,
                end: 1
            })
        );
    }

    #[test]
    fn test_tie_prefers_earliest_shortest() {
        assert_eq!(
            max_subarray_greedy(&[5, 0, -10, 5]),
            Some(Subarray {
                sum: 5,
                start: 0,
                end: 0
            })
        );
    }
}
