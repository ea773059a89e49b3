//! input::preprocessor — resolve indicators into formed points.
//!
//! A preprocessor turns a rank-1 array of indicators (row ids, string keys,
//! file names, ...) into the rank-2 array of points they stand for. Two
//! flavours exist: a lookup table indexed by integer ids, and an arbitrary
//! resolver closure. Both are immutable and shareable across threads.

use std::{fmt, sync::Arc};

use anyhow::{anyhow, bail};
use ndarray::{Array2, Axis, Ix1};

use crate::input::{
    array::InputArray,
    errors::{InputError, InputResult},
};

/// Signature of a user-supplied resolver.
pub type ResolverFn = dyn Fn(&InputArray) -> anyhow::Result<InputArray> + Send + Sync;

/// Maps indicators to points.
#[derive(Clone)]
pub enum Preprocessor {
    /// Row `i` of the table is the point for indicator `i`.
    LookupTable(Arc<Array2<f64>>),
    /// Arbitrary mapping; may return any rank or dtype, which is re-validated.
    Resolver(Arc<ResolverFn>),
}

impl Preprocessor {
    pub fn lookup(table: Array2<f64>) -> Self {
        Preprocessor::LookupTable(Arc::new(table))
    }

    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&InputArray) -> anyhow::Result<InputArray> + Send + Sync + 'static,
    {
        Preprocessor::Resolver(Arc::new(f))
    }

    /// Resolve a batch of indicators.
    ///
    /// Errors
    /// ------
    /// - `InputError::Preprocessor` wrapping whatever went wrong: an
    ///   out-of-range or non-integral id for a lookup table, or any error
    ///   returned by a resolver.
    pub fn resolve(&self, indicators: &InputArray) -> InputResult<InputArray> {
        let resolved = match self {
            Preprocessor::LookupTable(table) => lookup_rows(table, indicators),
            Preprocessor::Resolver(f) => f(indicators),
        };
        resolved.map_err(InputError::preprocessor)
    }
}

impl fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preprocessor::LookupTable(table) => {
                f.debug_tuple("LookupTable").field(&table.shape()).finish()
            }
            Preprocessor::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

fn lookup_rows(table: &Array2<f64>, indicators: &InputArray) -> anyhow::Result<InputArray> {
    let ids = integer_ids(indicators)?;
    let n_rows = table.nrows();
    for &id in &ids {
        if id < 0 || id as usize >= n_rows {
            bail!("index {id} is out of bounds for axis 0 with size {n_rows}");
        }
    }
    let rows: Vec<usize> = ids.iter().map(|&id| id as usize).collect();
    Ok(InputArray::from(table.select(Axis(0), &rows)))
}

fn integer_ids(indicators: &InputArray) -> anyhow::Result<Vec<i64>> {
    match indicators {
        InputArray::Int(a) => {
            let a = a.view().into_dimensionality::<Ix1>().map_err(|_| {
                anyhow!("lookup indicators must be 1D, got {}D", indicators.ndim())
            })?;
            Ok(a.to_vec())
        }
        InputArray::Float(a) => {
            let a = a.view().into_dimensionality::<Ix1>().map_err(|_| {
                anyhow!("lookup indicators must be 1D, got {}D", indicators.ndim())
            })?;
            a.iter()
                .map(|&v| {
                    if v.is_finite() && v.fract() == 0.0 {
                        Ok(v as i64)
                    } else {
                        Err(anyhow!("arrays used as indices must be of integer type, got {v}"))
                    }
                })
                .collect()
        }
        other => bail!(
            "arrays used as indices must be of integer type, got dtype '{}'",
            other.dtype_name()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::error::Error;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Row lookup by integer and integral-float ids.
    // - Out-of-range ids and resolver failures surfacing as
    //   `InputError::Preprocessor` with the cause preserved.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A lookup table returns the selected rows in indicator order.
    //
    // Given
    // -----
    // - A 3×2 table and ids `[2, 0]`.
    //
    // Expect
    // ------
    // - `[[5, 6], [1, 2]]`.
    fn lookup_table_selects_rows_in_order() {
        // Arrange
        let pre = Preprocessor::lookup(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let ids = InputArray::from(array![2_i64, 0]);

        // Act
        let out = pre.resolve(&ids).expect("ids are in range");

        // Assert
        assert_eq!(out, InputArray::from(array![[5.0, 6.0], [1.0, 2.0]]));
    }

    #[test]
    // Purpose
    // -------
    // Out-of-range ids are reported through the preprocessor error.
    //
    // Given
    // -----
    // - A 2-row table and id 7.
    //
    // Expect
    // ------
    // - `InputError::Preprocessor` whose source mentions the bad index.
    fn lookup_table_out_of_range_is_wrapped() {
        // Arrange
        let pre = Preprocessor::lookup(array![[1.0], [2.0]]);
        let ids = InputArray::from(array![7_i64]);

        // Act
        let err = pre.resolve(&ids).expect_err("id 7 is out of range");

        // Assert
        assert!(matches!(err, InputError::Preprocessor { .. }));
        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("index 7 is out of bounds"), "got: {source}");
    }

    #[test]
    // Purpose
    // -------
    // Resolver closures see the raw indicators, including strings.
    //
    // Given
    // -----
    // - A resolver mapping string keys to their length.
    //
    // Expect
    // ------
    // - Keys `["ab", "abcd"]` resolve to `[[2.0], [4.0]]`.
    fn resolver_receives_raw_indicators() {
        // Arrange
        let pre = Preprocessor::resolver(|ids: &InputArray| match ids {
            InputArray::Text(keys) => {
                let lens: Vec<f64> = keys.iter().map(|k| k.len() as f64).collect();
                Ok(InputArray::from(Array2::from_shape_vec((lens.len(), 1), lens)?))
            }
            _ => bail!("expected string keys"),
        });
        let keys = InputArray::from(array!["ab".to_string(), "abcd".to_string()]);

        // Act
        let out = pre.resolve(&keys).expect("resolver should succeed");

        // Assert
        assert_eq!(out, InputArray::from(array![[2.0], [4.0]]));
    }
}
