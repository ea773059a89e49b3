//! mahalanobis — learned Mahalanobis metrics and what can be done with them.
//!
//! Purpose
//! -------
//! Own the fitted state shared by every learner (the transform `L`), the
//! linear algebra that turns a metric matrix into `L`, and the tuple
//! classifiers built on top of a metric.
//!
//! Key behaviors
//! -------------
//! - [`MahalanobisMetric`]: distances, embeddings, metric closures, `LᵀL`,
//!   and snapshots.
//! - [`psd`]: PSD checks with a spectrum-scaled default tolerance and the
//!   diagonal / Cholesky / eigen factorization paths.
//! - [`classifiers`]: pair, triplet, and quadruplet strategies over any
//!   [`MetricScorer`].
//! - [`MetricError`]: the aggregate error type learners return.
//!
//! Downstream usage
//! ----------------
//! - `learners` install transforms with
//!   [`MahalanobisMetric::set_transformer`] after a successful fit.

pub mod classifiers;
pub mod errors;
pub mod metric;
pub mod psd;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::classifiers::{
    MetricScorer, PairsClassifier, QuadrupletsClassifier, TripletsClassifier,
};
pub use self::errors::{MetricError, MetricResult};
pub use self::metric::{MahalanobisMetric, MetricFn, TransformerSnapshot};
pub use self::psd::{
    check_sdp_from_eigen, default_psd_tolerance, pseudo_inverse_from_eig, transformer_from_metric,
};

pub mod prelude {
    pub use super::classifiers::{MetricScorer, PairsClassifier};
    pub use super::errors::{MetricError, MetricResult};
    pub use super::metric::MahalanobisMetric;
    pub use super::psd::transformer_from_metric;
}
