//! Row-wise softmax with a max shift and a floored denominator.
//!
//! Entries of `-∞` are allowed and receive zero weight, which is how
//! self-affinities are excluded in kernel-regression losses.
use ndarray::{Array2, ArrayView2, Axis};

/// Smallest denominator used when normalizing a row of weights.
pub const SOFTMAX_FLOOR: f64 = f64::EPSILON;

/// Softmax of each row of `logits`.
///
/// Each row is shifted by its maximum before exponentiation. Row sums below
/// `floor` are replaced by `floor`, so a row whose weights all underflow
/// comes back as zeros instead of `NaN`. Rows that are entirely `-∞` also
/// come back as zeros.
pub fn softmax_rows(logits: ArrayView2<'_, f64>, floor: f64) -> Array2<f64> {
    let mut out = logits.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            row.fill(0.0);
            continue;
        }
        row.mapv_inplace(|v| (v - max).exp());
        let denom = row.sum().max(floor);
        row.mapv_inplace(|v| v / denom);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Normalization and agreement with the naïve formula.
    // - Zero weight for `-∞` entries.
    // - Stability for large logits and all-`-∞` rows.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Rows sum to one and match exp(x)/Σexp(x) on small inputs.
    //
    // Given
    // -----
    // - Logits [[0, ln 3], [1, 1]].
    //
    // Expect
    // ------
    // - [[0.25, 0.75], [0.5, 0.5]].
    fn rows_match_naive_softmax() {
        // Arrange
        let logits = array![[0.0, 3.0_f64.ln()], [1.0, 1.0]];

        // Act
        let p = softmax_rows(logits.view(), SOFTMAX_FLOOR);

        // Assert
        assert_abs_diff_eq!(p, array![[0.25, 0.75], [0.5, 0.5]], epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A `-∞` diagonal gets exactly zero weight and large logits do not
    // overflow.
    //
    // Given
    // -----
    // - [[-∞, 1000, 1000], [-1e4, -∞, -1e4], [0, 0, -∞]].
    //
    // Expect
    // ------
    // - Zero diagonal, uniform off-diagonal halves.
    fn masked_entries_are_zero_and_large_logits_are_stable() {
        // Arrange
        let inf = f64::INFINITY;
        let logits = array![[-inf, 1000.0, 1000.0], [-1e4, -inf, -1e4], [0.0, 0.0, -inf]];

        // Act
        let p = softmax_rows(logits.view(), SOFTMAX_FLOOR);

        // Assert
        for i in 0..3 {
            assert_eq!(p[[i, i]], 0.0);
            assert_abs_diff_eq!(p.row(i).sum(), 1.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(p[[1, 0]], 0.5, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A fully masked row yields zeros, never NaN.
    //
    // Given
    // -----
    // - A single row [-∞, -∞].
    //
    // Expect
    // ------
    // - [0, 0].
    fn fully_masked_row_is_zero() {
        // Arrange
        let logits = array![[f64::NEG_INFINITY, f64::NEG_INFINITY]];

        // Act
        let p = softmax_rows(logits.view(), SOFTMAX_FLOOR);

        // Assert
        assert_eq!(p, array![[0.0, 0.0]]);
    }
}
