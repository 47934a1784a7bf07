//! Motion / signal decision for each component.

use crate::calibration::Calibration;
use crate::features::FeatureSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Motion,
    Signal,
}

impl Label {
    pub fn is_motion(&self) -> bool {
        matches!(self, Self::Motion)
    }
}

/// Criterion that labeled a component as motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionRule {
    RpCorrelation,
    Discriminant,
    CsfFraction,
    HighFrequency,
}

/// Audit record for one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// 0-based position in the decomposition
    pub index: usize,
    pub features: FeatureSet,
    pub score: f64,
    pub label: Label,
    pub rules: Vec<MotionRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// `name@version` of the calibration that produced the labels
    pub calibration: String,
    pub components: Vec<ComponentRecord>,
}

impl ClassificationResult {
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Sorted 0-based indices labeled motion
    pub fn motion_indices(&self) -> Vec<usize> {
        self.indices_with(Label::Motion)
    }

    /// Sorted 0-based indices labeled signal
    pub fn signal_indices(&self) -> Vec<usize> {
        self.indices_with(Label::Signal)
    }

    pub fn is_motion(&self, index: usize) -> bool {
        self.components
            .get(index)
            .map(|c| c.label.is_motion())
            .unwrap_or(false)
    }

    fn indices_with(&self, label: Label) -> Vec<usize> {
        self.components
            .iter()
            .filter(|c| c.label == label)
            .map(|c| c.index)
            .collect()
    }
}

/// Projection onto the calibrated hyperplane; positive means motion
pub fn discriminant_score(features: &FeatureSet, calibration: &Calibration) -> f64 {
    calibration
        .discriminant
        .score(features.max_rp_corr, features.edge_fract)
}

/// Label one component. Depends on nothing but its own features and the
/// calibration.
pub fn classify_component(
    index: usize,
    features: &FeatureSet,
    calibration: &Calibration,
) -> ComponentRecord {
    let score = discriminant_score(features, calibration);

    let mut rules = Vec::new();
    if features.max_rp_corr.abs() > calibration.rp_corr_threshold {
        rules.push(MotionRule::RpCorrelation);
    }
    if score > 0.0 {
        rules.push(MotionRule::Discriminant);
    }
    if matches!(calibration.csf_threshold, Some(thr) if features.csf_fract > thr) {
        rules.push(MotionRule::CsfFraction);
    }
    if matches!(calibration.hfc_threshold, Some(thr) if features.hfc > thr) {
        rules.push(MotionRule::HighFrequency);
    }

    let label = if rules.is_empty() {
        Label::Signal
    } else {
        Label::Motion
    };

    ComponentRecord {
        index,
        features: *features,
        score,
        label,
        rules,
    }
}

/// Label every component; `features[k]` belongs to component `k`.
pub fn classify(features: &[FeatureSet], calibration: &Calibration) -> ClassificationResult {
    let components: Vec<ComponentRecord> = features
        .iter()
        .enumerate()
        .map(|(k, f)| classify_component(k, f, calibration))
        .collect();

    let n_motion = components.iter().filter(|c| c.label.is_motion()).count();
    log::info!(
        "[AROMA] Classified {} of {} components as motion ({})",
        n_motion,
        components.len(),
        calibration.label()
    );

    ClassificationResult {
        calibration: calibration.label(),
        components,
    }
}
