use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "aroma",
    version,
    about = "Automatic removal of motion artifacts from fMRI data via ICA",
    long_about = "Classify the components of an ICA decomposition of fMRI data as motion or\n\
                  signal, and regress motion components out of the original series.\n\
                  Spatial maps and masks must be in the same standard space."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Worker threads for feature extraction and denoising (default: all cores)
    #[arg(long, env = "AROMA_THREADS", global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Classify components and denoise a series
    Run(RunArgs),
    /// List built-in calibrations
    Calibration(CalibrationArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Mixing matrix, one row per timepoint and one column per component (melodic_mix)
    #[arg(long)]
    pub mix: PathBuf,

    /// Realignment parameters, one row per timepoint and six columns (e.g. MCFLIRT .par)
    #[arg(long)]
    pub motion: PathBuf,

    /// Thresholded component maps in standard space, one volume per component
    #[arg(long)]
    pub ic_maps: PathBuf,

    /// Brain mask in standard space
    #[arg(long)]
    pub brain_mask: PathBuf,

    /// Edge mask in standard space
    #[arg(long)]
    pub edge_mask: PathBuf,

    /// CSF mask in standard space
    #[arg(long)]
    pub csf_mask: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub out_dir: PathBuf,

    /// Original 4-D series to denoise; required unless --den-type no
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Frequency mixing matrix (melodic_FTmix); derived from --mix when omitted
    #[arg(long)]
    pub ftmix: Option<PathBuf>,

    /// Repetition time in seconds (default: read from the --data header)
    #[arg(long)]
    pub tr: Option<f64>,

    /// Denoising type: nonaggr, aggr, both or no
    #[arg(long, default_value = "nonaggr")]
    pub den_type: String,

    /// Built-in calibration name or path to a calibration JSON file
    #[arg(long, default_value = aroma_rs::DEFAULT_CALIBRATION)]
    pub calibration: String,

    /// Replace an existing output directory
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Compact JSON report (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct CalibrationArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
