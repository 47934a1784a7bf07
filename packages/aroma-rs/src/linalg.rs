//! Least-squares helpers shared by the temporal feature and the denoiser.

use crate::error::{AromaError, Result};
use nalgebra::{DMatrix, DVector};

/// A demeaned series whose residual energy is below this fraction of its raw
/// energy is treated as constant.
pub(crate) const FLAT_TOLERANCE: f64 = 1e-20;

/// Subtract each column's mean. Columns that are constant up to rounding
/// become exactly zero.
pub(crate) fn demean_columns(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let mut centered = matrix.clone();
    let n = matrix.nrows() as f64;
    if n == 0.0 {
        return centered;
    }
    for mut column in centered.column_iter_mut() {
        let raw_energy = column.norm_squared();
        let mean = column.sum() / n;
        column.add_scalar_mut(-mean);
        if is_flat(column.norm_squared(), raw_energy) {
            column.fill(0.0);
        }
    }
    centered
}

/// Demean a vector in place and return the removed mean
pub(crate) fn demean_in_place(values: &mut DVector<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.sum() / values.len() as f64;
    values.add_scalar_mut(-mean);
    mean
}

/// True when a demeaned series carries no variance relative to its raw energy
pub(crate) fn is_flat(demeaned_energy: f64, raw_energy: f64) -> bool {
    demeaned_energy <= raw_energy * FLAT_TOLERANCE
}

/// Pseudo-inverse based least-squares solver for a fixed design matrix.
///
/// Singular values below `max(rows, cols) * eps * sigma_max` are discarded, so
/// rank-deficient designs are solved in the minimum-norm sense.
#[derive(Debug, Clone)]
pub(crate) struct LeastSquares {
    pinv: DMatrix<f64>,
    rank: usize,
}

impl LeastSquares {
    pub(crate) fn new(design: &DMatrix<f64>) -> Result<Self> {
        let (rows, cols) = design.shape();
        if rows == 0 || cols == 0 {
            return Ok(Self {
                pinv: DMatrix::zeros(cols, rows),
                rank: 0,
            });
        }

        let svd = design.clone().svd(true, true);
        let sigma_max = svd.singular_values.max();
        if !sigma_max.is_finite() {
            return Err(AromaError::Numerical(
                "design matrix has non-finite singular values".to_string(),
            ));
        }
        if sigma_max <= 0.0 {
            return Ok(Self {
                pinv: DMatrix::zeros(cols, rows),
                rank: 0,
            });
        }

        let tolerance = rows.max(cols) as f64 * f64::EPSILON * sigma_max;
        let rank = svd.rank(tolerance);
        let pinv = svd
            .pseudo_inverse(tolerance)
            .map_err(|e| AromaError::Numerical(format!("pseudo-inverse failed: {}", e)))?;

        Ok(Self { pinv, rank })
    }

    pub(crate) fn rank(&self) -> usize {
        self.rank
    }

    /// Moore-Penrose pseudo-inverse (cols × rows of the design)
    pub(crate) fn pinv(&self) -> &DMatrix<f64> {
        &self.pinv
    }

    pub(crate) fn coefficients(&self, target: &DVector<f64>) -> DVector<f64> {
        &self.pinv * target
    }
}

/// Coefficient of determination of a least-squares fit of `target` on
/// `design`. Both are expected to be demeaned.
pub(crate) fn r_squared(design: &DMatrix<f64>, solver: &LeastSquares, target: &DVector<f64>) -> f64 {
    let total = target.norm_squared();
    if total <= 0.0 {
        return 0.0;
    }
    let fitted = design * solver.coefficients(target);
    let residual = (target - fitted).norm_squared();
    (1.0 - residual / total).clamp(0.0, 1.0)
}
