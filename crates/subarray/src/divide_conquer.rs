//! Recursive split into left, right and crossing halves.

use crate::Subarray;

/// Maximum-sum contiguous subarray by divide and conquer.
///
/// O(n log n) time, O(log n) stack. On equal sums the left half wins, then
/// the range crossing the midpoint, then the right half. Returns `None` for an
/// empty slice.
///
/// Sums are exact only while they fit in an `i64`; beyond that they saturate.
/// [`crate::ValueRange::sums_fit`] checks this for generated input.
#[must_use]
pub fn max_subarray_divide_conquer(values: &[i64]) -> Option<Subarray> {
    let last = values.len().checked_sub(1)?;
    Some(solve(values, 0, last))
}

/// `lo..=hi` is non-empty.
fn solve(values: &[i64], lo: usize, hi: usize) -> Subarray {
    if lo == hi {
        return Subarray {
            sum: values[lo],
            start: lo,
            end: lo,
        };
    }

    let mid = lo + (hi - lo) / 2;
    let left = solve(values, lo, mid);
    let right = solve(values, mid + 1, hi);
    let cross = crossing(values, lo, mid, hi);

    if left.sum >= cross.sum && left.sum >= right.sum {
        left
    } else if cross.sum >= right.sum {
        cross
    } else {
        right
    }
}

/// Best range that contains both `mid` and `mid + 1`.
fn crossing(values: &[i64], lo: usize, mid: usize, hi: usize) -> Subarray {
    let mut left_best = i64::MIN;
    let mut start = mid;
    let mut sum = 0_i64;
    for index in (lo..=mid).rev() {
        sum = sum.saturating_add(values[index]);
        if sum > left_best {
            left_best = sum;
            start = index;
        }
    }

    let mut right_best = i64::MIN;
    let mut end = mid + 1;
    sum = 0;
    for (index, &value) in values.iter().enumerate().take(hi + 1).skip(mid + 1) {
        sum = sum.saturating_add(value);
        if sum > right_best {
            right_best = sum;
            end = index;
        }
    }

    Subarray {
        sum: left_best.saturating_add(right_best),
        start,
        end,
    }
}
