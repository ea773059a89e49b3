//! learners — estimators that produce a Mahalanobis transform.
//!
//! - [`mlkr::MLKR`]: supervised regression metric learning via L-BFGS.
//! - [`covariance::Covariance`]: inverse-covariance baseline.
//! - [`init`]: starting transforms for iterative learners.
//!
//! Every learner owns a [`MahalanobisMetric`](crate::mahalanobis::MahalanobisMetric),
//! installs a new transform only after a fully successful fit, and
//! implements [`MetricScorer`](crate::mahalanobis::MetricScorer) so it can
//! back the tuple classifiers directly.

pub mod covariance;
pub mod init;
pub mod mlkr;

pub use self::covariance::Covariance;
pub use self::init::{InitStrategy, auto_select_init, initialize_transformer};
pub use self::mlkr::{FitSummary, MLKR, MLKROptions, MlkrData, MlkrLoss, mlkr_loss};
