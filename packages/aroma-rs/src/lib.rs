//! Classification of motion-related components in a blind-source-separation
//! decomposition of fMRI data, and regression of those components out of the
//! original series.

pub mod calibration;
pub mod classifier;
pub mod denoise;
pub mod error;
pub mod features;
mod linalg;
pub mod mmap_utils;
pub mod nifti_io;
pub mod parser;
pub mod pipeline;
pub mod profiling;
pub mod types;

pub use calibration::{Calibration, Discriminant, DEFAULT_CALIBRATION};
pub use classifier::{ClassificationResult, ComponentRecord, Label, MotionRule};
pub use denoise::{CleanedVolumes, Strategy};
pub use error::{AromaError, Result};
pub use features::{FeatureSet, StandardMasks};
pub use pipeline::{Pipeline, PipelineInputs, PipelineOutput};
pub use types::*;
