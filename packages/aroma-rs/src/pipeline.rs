//! Feature extraction, classification and denoising run end to end.
//!
//! Every fatal precondition is checked up front, so a failing run never
//! reaches the stages. The stages are also exposed individually and take the
//! same inputs, so any of them can be rerun on its own.

use crate::calibration::Calibration;
use crate::classifier::{self, ClassificationResult};
use crate::denoise::{self, CleanedVolumes};
use crate::error::{AromaError, Result};
use crate::features::{self, FeatureSet, StandardMasks};
use crate::profile_scope;
use crate::types::{Decomposition, DenoisingMode, MotionParameters, RepetitionTime};
use ndarray::{Array4, Axis};

/// Borrowed inputs of one run
#[derive(Debug, Clone, Copy)]
pub struct PipelineInputs<'a> {
    pub decomposition: &'a Decomposition,
    pub motion: &'a MotionParameters,
    pub masks: &'a StandardMasks,
    /// Repetition time in seconds, validated before anything else
    pub tr: f64,
    /// Original 4-D series; required unless the mode is `DenoisingMode::None`
    pub series: Option<&'a Array4<f64>>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub classification: ClassificationResult,
    pub cleaned: CleanedVolumes,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    calibration: Calibration,
    mode: DenoisingMode,
}

impl Pipeline {
    pub fn new(calibration: Calibration) -> Result<Self> {
        calibration.validate()?;
        Ok(Self {
            calibration,
            mode: DenoisingMode::default(),
        })
    }

    pub fn with_mode(mut self, mode: DenoisingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn mode(&self) -> DenoisingMode {
        self.mode
    }

    /// Check every fatal precondition and return the validated TR
    pub fn validate(&self, inputs: &PipelineInputs<'_>) -> Result<RepetitionTime> {
        let tr = RepetitionTime::new(inputs.tr)?;

        let decomposition = inputs.decomposition;
        if decomposition.n_timepoints() != inputs.motion.n_timepoints() {
            return Err(AromaError::TimepointMismatch {
                mixing: decomposition.n_timepoints(),
                motion: inputs.motion.n_timepoints(),
            });
        }

        if decomposition.map_shape() != inputs.masks.shape() {
            return Err(AromaError::ShapeMismatch(format!(
                "spatial maps have shape {:?} but the masks have {:?}",
                decomposition.map_shape(),
                inputs.masks.shape()
            )));
        }

        if !self.mode.is_none() {
            let series = inputs.series.ok_or_else(|| {
                AromaError::InvalidParameter(format!(
                    "denoising type '{}' requires the original series",
                    self.mode
                ))
            })?;
            let series_t = series.len_of(Axis(3));
            if series_t != decomposition.n_timepoints() {
                return Err(AromaError::ShapeMismatch(format!(
                    "series has {} timepoints but the mixing matrix has {}",
                    series_t,
                    decomposition.n_timepoints()
                )));
            }
        }

        Ok(tr)
    }

    pub fn extract_features(
        &self,
        inputs: &PipelineInputs<'_>,
        tr: RepetitionTime,
    ) -> Result<Vec<FeatureSet>> {
        profile_scope!("extract_features");
        features::extract_features(
            inputs.decomposition,
            inputs.motion,
            inputs.masks,
            tr,
            &self.calibration,
        )
    }

    pub fn classify(&self, features: &[FeatureSet]) -> ClassificationResult {
        profile_scope!("classify");
        classifier::classify(features, &self.calibration)
    }

    pub fn denoise(
        &self,
        inputs: &PipelineInputs<'_>,
        classification: &ClassificationResult,
    ) -> Result<CleanedVolumes> {
        profile_scope!("denoise");
        let Some(series) = inputs.series else {
            return if self.mode.is_none() {
                Ok(CleanedVolumes::default())
            } else {
                Err(AromaError::InvalidParameter(
                    "denoising requires the original series".to_string(),
                ))
            };
        };
        denoise::denoise(
            series,
            inputs.decomposition.mixing(),
            &classification.motion_indices(),
            self.mode,
        )
    }

    pub fn run(&self, inputs: &PipelineInputs<'_>) -> Result<PipelineOutput> {
        profile_scope!("pipeline");
        log::info!(
            "[AROMA] Starting run: {} components, {} timepoints, calibration {}, denoising {}",
            inputs.decomposition.n_components(),
            inputs.decomposition.n_timepoints(),
            self.calibration.label(),
            self.mode
        );

        let tr = self.validate(inputs)?;
        let features = self.extract_features(inputs, tr)?;
        let classification = self.classify(&features);
        let cleaned = self.denoise(inputs, &classification)?;

        Ok(PipelineOutput {
            classification,
            cleaned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use ndarray::Array3;

    const T: usize = 12;

    fn decomposition() -> Decomposition {
        let maps = vec![Array3::from_elem((2, 2, 2), 1.0); 2];
        let mixing = DMatrix::from_fn(T, 2, |t, k| ((t * (k + 2)) as f64 * 0.4).sin());
        Decomposition::with_derived_spectra(maps, mixing).unwrap()
    }

    fn motion(rows: usize) -> MotionParameters {
        let table = DMatrix::from_fn(rows, 6, |t, j| (t as f64 * 0.1 * (j + 1) as f64).cos());
        MotionParameters::new(table).unwrap()
    }

    fn masks() -> StandardMasks {
        let brain = Array3::from_elem((2, 2, 2), true);
        let mut edge = Array3::from_elem((2, 2, 2), false);
        edge[[0, 0, 0]] = true;
        let csf = Array3::from_elem((2, 2, 2), false);
        StandardMasks::new(brain, edge, csf).unwrap()
    }

    #[test]
    fn test_zero_tr_reported_before_other_checks() {
        let decomposition = decomposition();
        let motion = motion(T + 4);
        let masks = masks();
        let inputs = PipelineInputs {
            decomposition: &decomposition,
            motion: &motion,
            masks: &masks,
            tr: 0.0,
            series: None,
        };
        let pipeline = Pipeline::new(Calibration::default()).unwrap();
        assert!(matches!(
            pipeline.run(&inputs),
            Err(AromaError::ZeroRepetitionTime)
        ));
    }

    #[test]
    fn test_timepoint_mismatch_is_fatal() {
        let decomposition = decomposition();
        let motion = motion(T - 1);
        let masks = masks();
        let inputs = PipelineInputs {
            decomposition: &decomposition,
            motion: &motion,
            masks: &masks,
            tr: 2.0,
            series: None,
        };
        let pipeline = Pipeline::new(Calibration::default())
            .unwrap()
            .with_mode(DenoisingMode::None);
        assert!(matches!(
            pipeline.validate(&inputs),
            Err(AromaError::TimepointMismatch { mixing: T, motion: 11 })
        ));
    }

    #[test]
    fn test_series_required_when_denoising() {
        let decomposition = decomposition();
        let motion = motion(T);
        let masks = masks();
        let inputs = PipelineInputs {
            decomposition: &decomposition,
            motion: &motion,
            masks: &masks,
            tr: 2.0,
            series: None,
        };
        let pipeline = Pipeline::new(Calibration::default()).unwrap();
        assert!(matches!(
            pipeline.validate(&inputs),
            Err(AromaError::InvalidParameter(_))
        ));

        let classify_only = pipeline.with_mode(DenoisingMode::None);
        let output = classify_only.run(&inputs).unwrap();
        assert_eq!(output.classification.n_components(), 2);
        assert!(output.cleaned.is_empty());
    }

    #[test]
    fn test_series_length_checked() {
        let decomposition = decomposition();
        let motion = motion(T);
        let masks = masks();
        let series = Array4::<f64>::zeros((1, 1, 1, T + 1));
        let inputs = PipelineInputs {
            decomposition: &decomposition,
            motion: &motion,
            masks: &masks,
            tr: 2.0,
            series: Some(&series),
        };
        let pipeline = Pipeline::new(Calibration::default()).unwrap();
        assert!(matches!(
            pipeline.validate(&inputs),
            Err(AromaError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_map_mask_shape_mismatch() {
        let decomposition = decomposition();
        let motion = motion(T);
        let big = Array3::from_elem((3, 3, 3), true);
        let masks = StandardMasks::new(big.clone(), big.clone(), big).unwrap();
        let inputs = PipelineInputs {
            decomposition: &decomposition,
            motion: &motion,
            masks: &masks,
            tr: 2.0,
            series: None,
        };
        let pipeline = Pipeline::new(Calibration::default())
            .unwrap()
            .with_mode(DenoisingMode::None);
        assert!(matches!(
            pipeline.run(&inputs),
            Err(AromaError::ShapeMismatch(_))
        ));
    }
}
