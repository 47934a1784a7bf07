use crate::error::{AromaError, Result};
use nalgebra::DMatrix;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of rigid-body motion parameters per timepoint (3 translations, 3 rotations)
pub const N_MOTION_PARAMS: usize = 6;

/// Minimum number of acquisitions needed for lagged regression
pub const MIN_TIMEPOINTS: usize = 3;

/// Repetition time of the acquisition in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RepetitionTime(f64);

impl RepetitionTime {
    /// Validate a repetition time.
    ///
    /// A TR of exactly zero is fatal. A TR of exactly one second is accepted but
    /// logged, since it is the usual placeholder written by tools that lost the
    /// real value.
    pub fn new(seconds: f64) -> Result<Self> {
        if seconds == 0.0 {
            return Err(AromaError::ZeroRepetitionTime);
        }
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(AromaError::InvalidRepetitionTime(seconds));
        }
        if seconds == 1.0 {
            log::warn!("Please check whether the determined TR (of 1s) is correct!");
        }
        Ok(Self(seconds))
    }

    pub fn seconds(&self) -> f64 {
        self.0
    }

    /// Nyquist frequency in Hz
    pub fn nyquist(&self) -> f64 {
        0.5 / self.0
    }
}

impl TryFrom<f64> for RepetitionTime {
    type Error = AromaError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RepetitionTime> for f64 {
    fn from(tr: RepetitionTime) -> f64 {
        tr.0
    }
}

/// Head-motion estimates, one row per acquisition and six columns
#[derive(Debug, Clone)]
pub struct MotionParameters {
    table: DMatrix<f64>,
}

impl MotionParameters {
    pub fn new(table: DMatrix<f64>) -> Result<Self> {
        if table.nrows() == 0 {
            return Err(AromaError::EmptyDecomposition(
                "motion parameter table has no rows".to_string(),
            ));
        }
        if table.ncols() != N_MOTION_PARAMS {
            return Err(AromaError::ShapeMismatch(format!(
                "motion parameter table has {} columns, expected {}",
                table.ncols(),
                N_MOTION_PARAMS
            )));
        }
        if table.iter().any(|v| !v.is_finite()) {
            return Err(AromaError::InvalidParameter(
                "motion parameter table contains non-finite values".to_string(),
            ));
        }
        Ok(Self { table })
    }

    /// Build from row-major rows of six values each
    pub fn from_rows(rows: &[[f64; N_MOTION_PARAMS]]) -> Result<Self> {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(DMatrix::from_row_slice(rows.len(), N_MOTION_PARAMS, &flat))
    }

    pub fn n_timepoints(&self) -> usize {
        self.table.nrows()
    }

    pub fn table(&self) -> &DMatrix<f64> {
        &self.table
    }

    /// First-order backward difference; the first row is zero.
    pub fn derivative(&self) -> DMatrix<f64> {
        let n = self.table.nrows();
        DMatrix::from_fn(n, N_MOTION_PARAMS, |t, j| {
            if t == 0 {
                0.0
            } else {
                self.table[(t, j)] - self.table[(t - 1, j)]
            }
        })
    }

    /// Parameters followed by their derivatives (T × 12)
    pub fn expanded(&self) -> DMatrix<f64> {
        let n = self.table.nrows();
        let derivative = self.derivative();
        DMatrix::from_fn(n, 2 * N_MOTION_PARAMS, |t, j| {
            if j < N_MOTION_PARAMS {
                self.table[(t, j)]
            } else {
                derivative[(t, j - N_MOTION_PARAMS)]
            }
        })
    }
}

/// Output of the blind-source separation, in a single shared component order.
///
/// Spatial maps must already be thresholded and resampled into the same
/// standard space as the reference masks. The mixing matrix is T × K and the
/// frequency mixing matrix is N × K, one column per component.
#[derive(Debug, Clone)]
pub struct Decomposition {
    spatial_maps: Vec<Array3<f64>>,
    mixing: DMatrix<f64>,
    ft_mixing: DMatrix<f64>,
}

impl Decomposition {
    pub fn new(
        spatial_maps: Vec<Array3<f64>>,
        mixing: DMatrix<f64>,
        ft_mixing: DMatrix<f64>,
    ) -> Result<Self> {
        if mixing.ncols() == 0 || mixing.nrows() == 0 {
            return Err(AromaError::EmptyDecomposition(
                "mixing matrix is empty".to_string(),
            ));
        }
        if spatial_maps.is_empty() {
            return Err(AromaError::EmptyDecomposition(
                "no component spatial maps".to_string(),
            ));
        }
        if ft_mixing.ncols() == 0 || ft_mixing.nrows() == 0 {
            return Err(AromaError::EmptyDecomposition(
                "frequency mixing matrix is empty".to_string(),
            ));
        }

        let n_components = mixing.ncols();
        if spatial_maps.len() != n_components {
            return Err(AromaError::ShapeMismatch(format!(
                "{} spatial maps for {} mixing matrix columns",
                spatial_maps.len(),
                n_components
            )));
        }
        if ft_mixing.ncols() != n_components {
            return Err(AromaError::ShapeMismatch(format!(
                "frequency mixing matrix has {} columns, mixing matrix has {}",
                ft_mixing.ncols(),
                n_components
            )));
        }
        if mixing.nrows() < MIN_TIMEPOINTS {
            return Err(AromaError::InvalidParameter(format!(
                "mixing matrix has {} timepoints, at least {} are required",
                mixing.nrows(),
                MIN_TIMEPOINTS
            )));
        }
        if mixing.iter().chain(ft_mixing.iter()).any(|v| !v.is_finite()) {
            return Err(AromaError::InvalidParameter(
                "mixing matrices contain non-finite values".to_string(),
            ));
        }

        let shape = spatial_maps[0].dim();
        if let Some((k, map)) = spatial_maps
            .iter()
            .enumerate()
            .find(|(_, m)| m.dim() != shape)
        {
            return Err(AromaError::ShapeMismatch(format!(
                "spatial map {} has shape {:?}, map 0 has {:?}",
                k,
                map.dim(),
                shape
            )));
        }

        Ok(Self {
            spatial_maps,
            mixing,
            ft_mixing,
        })
    }

    /// Build a decomposition whose frequency mixing matrix is derived from the
    /// component time courses.
    ///
    /// The derived matrix has ⌊T/2⌋ rows. For odd T the last row lies half a
    /// bin below Nyquist; see `features::frequency::amplitude_spectrum`.
    pub fn with_derived_spectra(
        spatial_maps: Vec<Array3<f64>>,
        mixing: DMatrix<f64>,
    ) -> Result<Self> {
        if mixing.ncols() == 0 || mixing.nrows() < 2 {
            return Err(AromaError::EmptyDecomposition(
                "mixing matrix is empty".to_string(),
            ));
        }
        let ft_mixing = crate::features::frequency::amplitude_spectra(&mixing);
        Self::new(spatial_maps, mixing, ft_mixing)
    }

    pub fn n_components(&self) -> usize {
        self.mixing.ncols()
    }

    pub fn n_timepoints(&self) -> usize {
        self.mixing.nrows()
    }

    pub fn map_shape(&self) -> (usize, usize, usize) {
        self.spatial_maps[0].dim()
    }

    pub fn mixing(&self) -> &DMatrix<f64> {
        &self.mixing
    }

    pub fn ft_mixing(&self) -> &DMatrix<f64> {
        &self.ft_mixing
    }

    pub fn spatial_map(&self, component: usize) -> &Array3<f64> {
        &self.spatial_maps[component]
    }

    pub fn time_course(&self, component: usize) -> Vec<f64> {
        self.mixing.column(component).iter().copied().collect()
    }

    pub fn spectrum(&self, component: usize) -> Vec<f64> {
        self.ft_mixing.column(component).iter().copied().collect()
    }
}

/// Which regression strategy (or strategies) the denoiser runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DenoisingMode {
    #[serde(rename = "aggr")]
    Aggressive,
    #[default]
    #[serde(rename = "nonaggr")]
    NonAggressive,
    #[serde(rename = "both")]
    Both,
    #[serde(rename = "no")]
    None,
}

impl DenoisingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggressive => "aggr",
            Self::NonAggressive => "nonaggr",
            Self::Both => "both",
            Self::None => "no",
        }
    }

    pub fn runs_aggressive(&self) -> bool {
        matches!(self, Self::Aggressive | Self::Both)
    }

    pub fn runs_non_aggressive(&self) -> bool {
        matches!(self, Self::NonAggressive | Self::Both)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl FromStr for DenoisingMode {
    type Err = AromaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aggr" | "aggressive" => Ok(Self::Aggressive),
            "nonaggr" | "non-aggressive" => Ok(Self::NonAggressive),
            "both" => Ok(Self::Both),
            "no" | "none" => Ok(Self::None),
            other => Err(AromaError::InvalidParameter(format!(
                "unknown denoising type '{}'; expected nonaggr, aggr, both or no",
                other
            ))),
        }
    }
}

impl fmt::Display for DenoisingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_tr_is_fatal() {
        assert!(matches!(
            RepetitionTime::new(0.0),
            Err(AromaError::ZeroRepetitionTime)
        ));
        assert!(RepetitionTime::new(-2.0).is_err());
        assert!(RepetitionTime::new(f64::NAN).is_err());
    }

    #[test]
    fn test_tr_of_one_is_accepted() {
        let tr = RepetitionTime::new(1.0).unwrap();
        assert_eq!(tr.seconds(), 1.0);
        assert_eq!(RepetitionTime::new(2.0).unwrap().nyquist(), 0.25);
    }

    #[test]
    fn test_motion_derivative_first_row_zero() {
        let motion = MotionParameters::from_rows(&[
            [0.0, 1.0, 2.0, 0.0, 0.0, 0.0],
            [1.0, 1.0, 4.0, 0.0, 0.0, 0.5],
            [3.0, 0.0, 4.0, 0.0, 0.0, 0.5],
        ])
        .unwrap();

        let d = motion.derivative();
        assert!(d.row(0).iter().all(|&v| v == 0.0));
        assert_eq!(d[(1, 0)], 1.0);
        assert_eq!(d[(2, 0)], 2.0);
        assert_eq!(d[(2, 1)], -1.0);

        let expanded = motion.expanded();
        assert_eq!(expanded.ncols(), 12);
        assert_eq!(expanded[(1, 2)], 4.0);
        assert_eq!(expanded[(1, 8)], 2.0);
        // the source table is untouched
        assert_eq!(motion.table()[(1, 0)], 1.0);
    }

    #[test]
    fn test_motion_requires_six_columns() {
        let table = DMatrix::<f64>::zeros(10, 5);
        assert!(matches!(
            MotionParameters::new(table),
            Err(AromaError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_decomposition_shape_checks() {
        let maps = vec![Array3::<f64>::zeros((2, 2, 2)); 2];
        let mixing = DMatrix::<f64>::from_element(10, 2, 1.0);

        let ft_wrong = DMatrix::<f64>::from_element(5, 3, 1.0);
        assert!(Decomposition::new(maps.clone(), mixing.clone(), ft_wrong).is_err());

        let empty = DMatrix::<f64>::zeros(0, 0);
        assert!(matches!(
            Decomposition::new(maps.clone(), empty.clone(), empty),
            Err(AromaError::EmptyDecomposition(_))
        ));

        let ft = DMatrix::<f64>::from_element(5, 2, 1.0);
        let decomposition = Decomposition::new(maps, mixing, ft).unwrap();
        assert_eq!(decomposition.n_components(), 2);
        assert_eq!(decomposition.n_timepoints(), 10);
        assert_eq!(decomposition.time_course(1).len(), 10);
    }

    #[test]
    fn test_denoising_mode_parsing() {
        assert_eq!("aggr".parse::<DenoisingMode>().unwrap(), DenoisingMode::Aggressive);
        assert_eq!("nonaggr".parse::<DenoisingMode>().unwrap(), DenoisingMode::NonAggressive);
        assert_eq!("both".parse::<DenoisingMode>().unwrap(), DenoisingMode::Both);
        assert_eq!("no".parse::<DenoisingMode>().unwrap(), DenoisingMode::None);
        assert!("sometimes".parse::<DenoisingMode>().is_err());

        assert!(DenoisingMode::Both.runs_aggressive());
        assert!(DenoisingMode::Both.runs_non_aggressive());
        assert!(!DenoisingMode::None.runs_aggressive());
        assert_eq!(DenoisingMode::default(), DenoisingMode::NonAggressive);
    }
}
