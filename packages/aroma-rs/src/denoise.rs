//! Regression of noise components out of the 4-D series.
//!
//! Aggressive denoising fits only the noise time courses and subtracts the
//! full fit. Non-aggressive denoising fits all components jointly and
//! subtracts only the part attributed to noise, so variance that signal
//! components explain is kept even where it overlaps with noise.

use crate::error::{AromaError, Result};
use crate::linalg::{demean_columns, is_flat, LeastSquares};
use crate::types::DenoisingMode;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array4, Axis, Zip};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Aggressive,
    NonAggressive,
}

/// Cleaned series produced for the requested mode. Each present volume is an
/// independent owned copy.
#[derive(Debug, Clone, Default)]
pub struct CleanedVolumes {
    pub aggressive: Option<Array4<f64>>,
    pub non_aggressive: Option<Array4<f64>>,
}

impl CleanedVolumes {
    pub fn is_empty(&self) -> bool {
        self.aggressive.is_none() && self.non_aggressive.is_none()
    }
}

/// Per-run regression operator shared read-only by every voxel.
///
/// `noise_design` (T × m) holds the demeaned noise regressors and
/// `noise_pinv` (m × T) maps a demeaned voxel time course to their
/// coefficients.
struct NoiseProjector {
    noise_design: DMatrix<f64>,
    noise_pinv: DMatrix<f64>,
}

impl NoiseProjector {
    fn new(mixing: &DMatrix<f64>, noise: &[usize], strategy: Strategy) -> Result<Self> {
        let noise_design = demean_columns(&mixing.select_columns(noise));
        let noise_pinv = match strategy {
            Strategy::Aggressive => LeastSquares::new(&noise_design)?.pinv().clone(),
            Strategy::NonAggressive => {
                let full = LeastSquares::new(&demean_columns(mixing))?;
                full.pinv().select_rows(noise)
            }
        };
        Ok(Self {
            noise_design,
            noise_pinv,
        })
    }

    /// Noise contribution to a demeaned time course
    fn noise_fit(&self, demeaned: &DVector<f64>) -> DVector<f64> {
        &self.noise_design * (&self.noise_pinv * demeaned)
    }
}

fn validate_inputs(series: &Array4<f64>, mixing: &DMatrix<f64>, noise: &[usize]) -> Result<()> {
    let n_timepoints = series.len_of(Axis(3));
    if n_timepoints != mixing.nrows() {
        return Err(AromaError::ShapeMismatch(format!(
            "series has {} timepoints but the mixing matrix has {}",
            n_timepoints,
            mixing.nrows()
        )));
    }
    if let Some(&bad) = noise.iter().find(|&&k| k >= mixing.ncols()) {
        return Err(AromaError::InvalidParameter(format!(
            "noise component {} out of range for {} components",
            bad,
            mixing.ncols()
        )));
    }
    Ok(())
}

/// Remove the noise components from every voxel with the given strategy.
///
/// Voxels without temporal variance are copied unchanged. Each voxel is fitted
/// independently and in parallel; the mean of every time course is preserved.
pub fn regress_out(
    series: &Array4<f64>,
    mixing: &DMatrix<f64>,
    noise: &[usize],
    strategy: Strategy,
) -> Result<Array4<f64>> {
    validate_inputs(series, mixing, noise)?;

    let mut noise: Vec<usize> = noise.to_vec();
    noise.sort_unstable();
    noise.dedup();

    let mut cleaned = series.to_owned();
    if noise.is_empty() {
        log::info!("[AROMA] No noise components; {:?} output equals input", strategy);
        return Ok(cleaned);
    }

    log::info!(
        "[AROMA] {:?} denoising: regressing {} of {} components",
        strategy,
        noise.len(),
        mixing.ncols()
    );
    let projector = NoiseProjector::new(mixing, &noise, strategy)?;
    let n_timepoints = mixing.nrows();

    Zip::from(cleaned.lanes_mut(Axis(3))).par_for_each(|mut lane| {
        let raw_energy: f64 = lane.iter().map(|v| v * v).sum();
        let mean = lane.sum() / n_timepoints as f64;
        let demeaned = DVector::from_iterator(n_timepoints, lane.iter().map(|&v| v - mean));
        if is_flat(demeaned.norm_squared(), raw_energy) {
            return;
        }
        let fit = projector.noise_fit(&demeaned);
        for (value, removed) in lane.iter_mut().zip(fit.iter()) {
            *value -= removed;
        }
    });

    Ok(cleaned)
}

/// Run the strategies selected by `mode`.
///
/// `DenoisingMode::None` produces no volumes; the input series is the result.
pub fn denoise(
    series: &Array4<f64>,
    mixing: &DMatrix<f64>,
    noise: &[usize],
    mode: DenoisingMode,
) -> Result<CleanedVolumes> {
    validate_inputs(series, mixing, noise)?;

    let mut volumes = CleanedVolumes::default();
    if mode.runs_non_aggressive() {
        volumes.non_aggressive = Some(regress_out(series, mixing, noise, Strategy::NonAggressive)?);
    }
    if mode.runs_aggressive() {
        volumes.aggressive = Some(regress_out(series, mixing, noise, Strategy::Aggressive)?);
    }
    if mode.is_none() {
        log::info!("[AROMA] Denoising disabled");
    }
    Ok(volumes)
}
