pub mod frequency;
pub mod spatial;
pub mod temporal;

pub use frequency::high_frequency_content;
pub use spatial::{spatial_fractions, SpatialFractions, StandardMasks};
pub use temporal::max_rp_correlation;

use crate::calibration::Calibration;
use crate::error::Result;
use crate::types::{Decomposition, MotionParameters, RepetitionTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// The four classification features of one component, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub edge_fract: f64,
    pub csf_fract: f64,
    pub max_rp_corr: f64,
    pub hfc: f64,
}

/// Compute all features for a single component
pub fn component_features(
    decomposition: &Decomposition,
    component: usize,
    motion: &MotionParameters,
    masks: &StandardMasks,
    tr: RepetitionTime,
    calibration: &Calibration,
) -> Result<FeatureSet> {
    let spatial = spatial_fractions(decomposition.spatial_map(component), masks)?;
    let max_rp_corr = max_rp_correlation(
        &decomposition.time_course(component),
        motion,
        &calibration.lags,
    )?;
    let hfc = high_frequency_content(
        &decomposition.spectrum(component),
        tr.seconds(),
        calibration.hfc_cutoff_hz,
    );

    Ok(FeatureSet {
        edge_fract: spatial.edge_fract,
        csf_fract: spatial.csf_fract,
        max_rp_corr,
        hfc,
    })
}

/// Compute features for every component, in component order.
///
/// Components are processed in parallel; each reads only its own slice of the
/// decomposition, so the result does not depend on scheduling.
pub fn extract_features(
    decomposition: &Decomposition,
    motion: &MotionParameters,
    masks: &StandardMasks,
    tr: RepetitionTime,
    calibration: &Calibration,
) -> Result<Vec<FeatureSet>> {
    log::info!(
        "[AROMA] Extracting features for {} components (parallel)...",
        decomposition.n_components()
    );
    let start = std::time::Instant::now();

    let features = (0..decomposition.n_components())
        .into_par_iter()
        .map(|k| component_features(decomposition, k, motion, masks, tr, calibration))
        .collect::<Result<Vec<_>>>()?;

    log::info!(
        "[AROMA] Features extracted in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    Ok(features)
}
