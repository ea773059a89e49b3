//! Property tests for learned Mahalanobis metrics.
//!
//! Purpose
//! -------
//! - Check the metric axioms for arbitrary transforms `L`: symmetry,
//!   non-negativity, identity of indiscernibles (as `d(x, x) = 0`), and the
//!   triangle inequality.
//! - Check that the embedding is linear, and that it agrees with the
//!   pairwise distances and the standalone metric closure.
//! - Check that factoring `M = LᵀL + I` recovers a transform with the same
//!   Mahalanobis matrix.
//!
//! Exclusions
//! ----------
//! - Degenerate or indefinite matrices; the fixed fixtures in
//!   `mahalanobis::psd` cover those paths.
use ndarray::{Array1, Array2, Array3, Axis, stack};
use proptest::prelude::*;
use rust_metric_learn::{
    input::InputArray,
    mahalanobis::{MahalanobisMetric, transformer_from_metric},
};

const N_FEATURES: usize = 3;

fn transform_strategy(n_rows: usize) -> impl Strategy<Value = Array2<f64>> {
    prop::collection::vec(-3.0f64..3.0, n_rows * N_FEATURES).prop_map(move |v| {
        Array2::from_shape_vec((n_rows, N_FEATURES), v).expect("shape matches length")
    })
}

fn point_strategy() -> impl Strategy<Value = Array1<f64>> {
    prop::collection::vec(-10.0f64..10.0, N_FEATURES).prop_map(Array1::from)
}

fn fitted(l: Array2<f64>) -> MahalanobisMetric {
    let mut metric = MahalanobisMetric::new("Property", None);
    metric.set_transformer(l);
    metric
}

/// Distance between `u` and `v` through `pair_distance`.
fn distance(metric: &MahalanobisMetric, u: &Array1<f64>, v: &Array1<f64>) -> f64 {
    let pair: Array3<f64> =
        stack(Axis(0), &[u.view(), v.view()]).expect("same length").insert_axis(Axis(0));
    metric.pair_distance(&InputArray::from(pair)).expect("valid pair")[0]
}

proptest! {
    #[test]
    // Purpose
    // -------
    // Any `L` (including rank-deficient ones) induces a pseudo-metric.
    //
    // Given
    // -----
    // - A random 2×3 transform and three random points.
    //
    // Expect
    // ------
    // - d(a, b) = d(b, a) ≥ 0, d(a, a) = 0, d(a, c) ≤ d(a, b) + d(b, c).
    fn metric_axioms_hold(
        l in transform_strategy(2),
        a in point_strategy(),
        b in point_strategy(),
        c in point_strategy(),
    ) {
        let metric = fitted(l);

        let ab = distance(&metric, &a, &b);
        let ba = distance(&metric, &b, &a);
        let bc = distance(&metric, &b, &c);
        let ac = distance(&metric, &a, &c);
        let aa = distance(&metric, &a, &a);

        prop_assert!(ab >= 0.0);
        prop_assert!((ab - ba).abs() <= 1e-9 * (1.0 + ab));
        prop_assert!(aa.abs() <= 1e-12);
        prop_assert!(ac <= ab + bc + 1e-9 * (1.0 + ab + bc));
    }

    #[test]
    // Purpose
    // -------
    // Pair distances equal Euclidean distances between embedded points and
    // the values returned by the metric closure.
    //
    // Given
    // -----
    // - A random 3×3 transform and two random points.
    //
    // Expect
    // ------
    // - All three computations agree to 1e-9 relative.
    fn embedding_and_closure_agree(
        l in transform_strategy(3),
        a in point_strategy(),
        b in point_strategy(),
    ) {
        let metric = fitted(l);
        let points = stack(Axis(0), &[a.view(), b.view()]).expect("same length");

        let embedded = metric.transform(&InputArray::from(points)).expect("fitted");
        let diff = &embedded.row(1) - &embedded.row(0);
        let via_embedding = diff.dot(&diff).sqrt();
        let via_pairs = distance(&metric, &a, &b);
        let closure = metric.get_metric().expect("fitted");
        let via_closure = closure(a.view(), b.view()).expect("same length");

        let scale = 1.0 + via_pairs;
        prop_assert!((via_embedding - via_pairs).abs() <= 1e-9 * scale);
        prop_assert!((via_closure - via_pairs).abs() <= 1e-9 * scale);
    }

    #[test]
    // Purpose
    // -------
    // The embedding is linear in its input.
    //
    // Given
    // -----
    // - A random 2×3 transform, two points, and scalars α, β.
    //
    // Expect
    // ------
    // - transform(αa + βb) = α·transform(a) + β·transform(b).
    fn transform_is_linear(
        l in transform_strategy(2),
        a in point_strategy(),
        b in point_strategy(),
        alpha in -4.0f64..4.0,
        beta in -4.0f64..4.0,
    ) {
        let metric = fitted(l);
        let combined = (&a * alpha + &b * beta).insert_axis(Axis(0));
        let points = stack(Axis(0), &[a.view(), b.view()]).expect("same length");

        let lhs = metric.transform(&InputArray::from(combined)).expect("fitted");
        let parts = metric.transform(&InputArray::from(points)).expect("fitted");
        let rhs = &parts.row(0) * alpha + &parts.row(1) * beta;

        for (x, y) in lhs.row(0).iter().zip(rhs.iter()) {
            prop_assert!((x - y).abs() <= 1e-9 * (1.0 + y.abs()));
        }
    }

    #[test]
    // Purpose
    // -------
    // Factoring a well-conditioned PSD matrix gives back a transform whose
    // Mahalanobis matrix is the input.
    //
    // Given
    // -----
    // - M = LᵀL + I for a random 3×3 `L`.
    //
    // Expect
    // ------
    // - transformer_from_metric(M) = T with TᵀT ≈ M entrywise.
    fn factorization_recovers_metric(l in transform_strategy(3)) {
        let m = l.t().dot(&l) + Array2::<f64>::eye(N_FEATURES);

        let t = transformer_from_metric(&m, None).expect("positive definite");
        let back = t.t().dot(&t);

        let scale = 1.0 + m.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        for (x, y) in back.iter().zip(m.iter()) {
            prop_assert!((x - y).abs() <= 1e-9 * scale);
        }
    }
}
