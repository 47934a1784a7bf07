//! Versioned classification calibrations.
//!
//! A calibration bundles every empirically fitted constant used by the feature
//! extractors and the classifier. Built-ins are looked up by name; alternative
//! calibrations can be loaded from JSON without touching extractor code.

use crate::error::{AromaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the calibration used when none is requested
pub const DEFAULT_CALIBRATION: &str = "aroma-v1";

/// Linear discriminant over `(maxRPcorr, edgeFract)`; positive scores are motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discriminant {
    pub intercept: f64,
    pub rp_corr_weight: f64,
    pub edge_weight: f64,
}

impl Discriminant {
    pub fn score(&self, max_rp_corr: f64, edge_fract: f64) -> f64 {
        self.intercept + self.rp_corr_weight * max_rp_corr + self.edge_weight * edge_fract
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub name: String,
    pub version: String,
    /// Alignments (in acquisitions) between motion history and component
    /// time course evaluated for the motion correlation feature
    #[serde(default = "default_lags")]
    pub lags: Vec<i32>,
    /// Absolute frequency above which power counts as high-frequency content
    pub hfc_cutoff_hz: f64,
    pub discriminant: Discriminant,
    /// `maxRPcorr` above this labels a component as motion on its own
    pub rp_corr_threshold: f64,
    /// `csfFract` above this labels motion; `None` disables the rule
    #[serde(default)]
    pub csf_threshold: Option<f64>,
    /// `HFC` above this labels motion; `None` disables the rule
    #[serde(default)]
    pub hfc_threshold: Option<f64>,
    #[serde(default)]
    pub documentation: String,
}

fn default_lags() -> Vec<i32> {
    vec![-1, 0, 1]
}

/// Hyperplane fitted in the original ICA-AROMA training set
const PUBLISHED_DISCRIMINANT: Discriminant = Discriminant {
    intercept: -19.9751070082159,
    rp_corr_weight: 9.95127547670627,
    edge_weight: 24.8333160239175,
};

impl Calibration {
    /// Full published rule set: motion correlation, discriminant, CSF and
    /// high-frequency criteria.
    pub fn aroma_v1() -> Self {
        Self {
            name: "aroma-v1".to_string(),
            version: "1.0.0".to_string(),
            lags: default_lags(),
            hfc_cutoff_hz: 0.1,
            discriminant: PUBLISHED_DISCRIMINANT,
            rp_corr_threshold: 0.9,
            csf_threshold: Some(0.10),
            hfc_threshold: Some(0.5),
            documentation: "Published hyperplane with CSF (>10%) and high-frequency \
                            (>50% of power above 0.1 Hz) criteria."
                .to_string(),
        }
    }

    /// Motion correlation and discriminant only; CSF and HFC are reported but
    /// never decide a label.
    pub fn aroma_v1_discriminant() -> Self {
        Self {
            name: "aroma-v1-discriminant".to_string(),
            csf_threshold: None,
            hfc_threshold: None,
            documentation: "Published hyperplane plus the motion-correlation override; \
                            CSF and HFC are audit-only."
                .to_string(),
            ..Self::aroma_v1()
        }
    }

    pub fn builtins() -> Vec<Calibration> {
        vec![Self::aroma_v1(), Self::aroma_v1_discriminant()]
    }

    /// Look up a built-in calibration by name
    pub fn builtin(name: &str) -> Option<Calibration> {
        Self::builtins().into_iter().find(|c| c.name == name)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let calibration: Calibration = serde_json::from_str(json)
            .map_err(|e| AromaError::ParseError(format!("invalid calibration JSON: {}", e)))?;
        calibration.validate()?;
        Ok(calibration)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// `name@version`, used to tag classification results
    pub fn label(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lags.is_empty() {
            return Err(AromaError::InvalidParameter(
                "calibration must list at least one lag".to_string(),
            ));
        }
        if !self.hfc_cutoff_hz.is_finite() || self.hfc_cutoff_hz <= 0.0 {
            return Err(AromaError::InvalidParameter(format!(
                "hfc_cutoff_hz must be positive, got {}",
                self.hfc_cutoff_hz
            )));
        }
        let d = &self.discriminant;
        let thresholds = [
            Some(self.rp_corr_threshold),
            self.csf_threshold,
            self.hfc_threshold,
        ];
        if ![d.intercept, d.rp_corr_weight, d.edge_weight]
            .iter()
            .all(|v| v.is_finite())
            || thresholds.iter().flatten().any(|v| !v.is_finite())
        {
            return Err(AromaError::InvalidParameter(format!(
                "calibration '{}' contains non-finite constants",
                self.name
            )));
        }
        Ok(())
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::aroma_v1()
    }
}
