//! Maximum motion-parameter correlation of a component time course.
//!
//! The 12-column motion model (six realignment parameters and their first
//! derivative) is regressed against the component at several acquisition
//! offsets; the feature is the largest multiple correlation found.

use crate::error::{AromaError, Result};
use crate::linalg::{demean_columns, demean_in_place, is_flat, r_squared, LeastSquares};
use crate::types::MotionParameters;
use nalgebra::{DMatrix, DVector};

/// Motion model regressors: parameters followed by their derivatives (T × 12)
pub fn motion_design(motion: &MotionParameters) -> DMatrix<f64> {
    motion.expanded()
}

/// Multiple correlation between the component and the motion model with the
/// model shifted by `lag` acquisitions.
///
/// A positive lag pairs the component at `t` with motion at `t - lag`, so
/// motion leads the signal. Rows without a partner are dropped, never wrapped.
/// Returns 0 when the aligned design has zero effective rank or the aligned
/// component carries no variance.
pub fn lagged_correlation(time_course: &[f64], design: &DMatrix<f64>, lag: i32) -> Result<f64> {
    let n_timepoints = time_course.len();
    if design.nrows() != n_timepoints {
        return Err(AromaError::TimepointMismatch {
            mixing: n_timepoints,
            motion: design.nrows(),
        });
    }

    let shift = lag.unsigned_abs() as usize;
    if shift + 2 > n_timepoints {
        return Err(AromaError::InvalidParameter(format!(
            "lag {} leaves fewer than 2 of {} timepoints",
            lag, n_timepoints
        )));
    }
    let n_rows = n_timepoints - shift;
    let (signal_start, design_start) = if lag >= 0 { (shift, 0) } else { (0, shift) };

    let aligned = &time_course[signal_start..signal_start + n_rows];
    let raw_energy: f64 = aligned.iter().map(|v| v * v).sum();
    let mut target = DVector::from_column_slice(aligned);
    demean_in_place(&mut target);
    if is_flat(target.norm_squared(), raw_energy) {
        log::debug!("Component time course is constant at lag {}; correlation set to 0", lag);
        return Ok(0.0);
    }

    let regressors = demean_columns(&design.rows(design_start, n_rows).into_owned());
    let solver = LeastSquares::new(&regressors)?;
    if solver.rank() == 0 {
        log::warn!("Motion design has zero effective rank at lag {}; correlation set to 0", lag);
        return Ok(0.0);
    }
    if solver.rank() < regressors.ncols() {
        log::warn!(
            "Motion design is rank deficient at lag {} (rank {} of {}); using the pseudo-inverse",
            lag,
            solver.rank(),
            regressors.ncols()
        );
    }

    Ok(r_squared(&regressors, &solver, &target).sqrt().clamp(0.0, 1.0))
}

/// `maxRPcorr`: the largest lagged correlation over `lags`
pub fn max_rp_correlation(
    time_course: &[f64],
    motion: &MotionParameters,
    lags: &[i32],
) -> Result<f64> {
    if lags.is_empty() {
        return Err(AromaError::InvalidParameter(
            "at least one lag is required".to_string(),
        ));
    }
    let design = motion_design(motion);
    let mut best = 0.0_f64;
    for &lag in lags {
        best = best.max(lagged_correlation(time_course, &design, lag)?);
    }
    Ok(best)
}
