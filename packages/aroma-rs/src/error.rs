use thiserror::Error;

#[derive(Error, Debug)]
pub enum AromaError {
    #[error("TR is zero. A valid repetition time is required; check the image header or pass it explicitly")]
    ZeroRepetitionTime,

    #[error("Invalid repetition time: {0}")]
    InvalidRepetitionTime(f64),

    #[error("Missing decomposition output: {0}")]
    EmptyDecomposition(String),

    #[error("Mixing matrix has {mixing} timepoints but the motion parameters have {motion} rows")]
    TimepointMismatch { mixing: usize, motion: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown calibration: {0}")]
    UnknownCalibration(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("NIfTI error: {0}")]
    Nifti(String),

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AromaError>;
