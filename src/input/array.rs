//! input::array — raw, not-yet-validated input arrays of any rank and dtype.
//!
//! Callers hand the validator whatever they have: formed points, formed
//! tuples, or indicators (integer ids, string keys) that a preprocessor
//! resolves into points. [`InputArray`] keeps the original element type so
//! the permissive first pass can route on rank before any numeric coercion.

use nalgebra::Complex;
use ndarray::{Array, ArrayD, Axis, Dimension};

use crate::input::errors::{InputError, InputResult};

/// Dynamically ranked input with its original element type.
#[derive(Debug, Clone, PartialEq)]
pub enum InputArray {
    Float(ArrayD<f64>),
    Int(ArrayD<i64>),
    Text(ArrayD<String>),
    Complex(ArrayD<Complex<f64>>),
}

impl InputArray {
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            InputArray::Float(a) => a.shape(),
            InputArray::Int(a) => a.shape(),
            InputArray::Text(a) => a.shape(),
            InputArray::Complex(a) => a.shape(),
        }
    }

    /// Length of the first axis (samples, tuples or indicators).
    pub fn n_samples(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    pub fn dtype_name(&self) -> &'static str {
        match self {
            InputArray::Float(_) => "float64",
            InputArray::Int(_) => "int64",
            InputArray::Text(_) => "str",
            InputArray::Complex(_) => "complex128",
        }
    }

    /// Owned sub-array at `index` along `axis`, keeping the element type.
    ///
    /// Used to split a rank-2 indicator array into per-position columns.
    /// The caller guarantees `axis < ndim` and `index < shape[axis]`.
    pub fn index_axis(&self, axis: usize, index: usize) -> InputArray {
        match self {
            InputArray::Float(a) => InputArray::Float(a.index_axis(Axis(axis), index).to_owned()),
            InputArray::Int(a) => InputArray::Int(a.index_axis(Axis(axis), index).to_owned()),
            InputArray::Text(a) => InputArray::Text(a.index_axis(Axis(axis), index).to_owned()),
            InputArray::Complex(a) => {
                InputArray::Complex(a.index_axis(Axis(axis), index).to_owned())
            }
        }
    }

    /// Coerce to `f64`, rejecting complex and text data.
    ///
    /// Errors
    /// ------
    /// - `InputError::ComplexData` for complex input.
    /// - `InputError::InvalidDtype` for text input.
    pub fn to_f64(&self) -> InputResult<ArrayD<f64>> {
        match self {
            InputArray::Float(a) => Ok(a.clone()),
            InputArray::Int(a) => Ok(a.mapv(|v| v as f64)),
            InputArray::Text(_) => Err(InputError::InvalidDtype { dtype: self.dtype_name() }),
            InputArray::Complex(_) => Err(InputError::ComplexData { data: self.to_string() }),
        }
    }
}

impl std::fmt::Display for InputArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputArray::Float(a) => write!(f, "{a}"),
            InputArray::Int(a) => write!(f, "{a}"),
            InputArray::Text(a) => write!(f, "{a}"),
            InputArray::Complex(a) => write!(f, "{a}"),
        }
    }
}

impl<D: Dimension> From<Array<f64, D>> for InputArray {
    fn from(a: Array<f64, D>) -> Self {
        InputArray::Float(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<i64, D>> for InputArray {
    fn from(a: Array<i64, D>) -> Self {
        InputArray::Int(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<String, D>> for InputArray {
    fn from(a: Array<String, D>) -> Self {
        InputArray::Text(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<Complex<f64>, D>> for InputArray {
    fn from(a: Array<Complex<f64>, D>) -> Self {
        InputArray::Complex(a.into_dyn())
    }
}
