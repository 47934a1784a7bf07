use aroma_rs::{ClassificationResult, DenoisingMode};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const OVERVIEW_FILE: &str = "classification_overview.txt";
pub const MOTION_ICS_FILE: &str = "classified_motion_ICs.txt";
pub const FEATURE_SCORES_FILE: &str = "feature_scores.txt";
pub const REPORT_FILE: &str = "report.json";
pub const NON_AGGRESSIVE_FILE: &str = "denoised_func_data_nonaggr.nii.gz";
pub const AGGRESSIVE_FILE: &str = "denoised_func_data_aggr.nii.gz";

/// Every file a run can write
pub const OUTPUT_FILES: [&str; 6] = [
    OVERVIEW_FILE,
    MOTION_ICS_FILE,
    FEATURE_SCORES_FILE,
    NON_AGGRESSIVE_FILE,
    AGGRESSIVE_FILE,
    REPORT_FILE,
];

/// Delete outputs left by an earlier run and return the names removed.
/// Files that are not ours are left alone.
pub fn clear_previous_outputs(out_dir: &Path) -> Result<Vec<String>, String> {
    let mut removed = Vec::new();
    for name in OUTPUT_FILES {
        let path = out_dir.join(name);
        if !path.is_file() {
            continue;
        }
        std::fs::remove_file(&path)
            .map_err(|e| format!("Failed to remove previous output '{}': {}", path.display(), e))?;
        removed.push(name.to_string());
    }
    if !removed.is_empty() {
        log::info!("Removed {} previous outputs from {:?}", removed.len(), out_dir);
    }
    Ok(removed)
}

/// Serialize a value to JSON (pretty or compact).
pub fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String, String> {
    if compact {
        serde_json::to_string(value).map_err(|e| format!("JSON serialization failed: {}", e))
    } else {
        serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {}", e))
    }
}

/// Write text to a file inside the output directory and return its path.
pub fn write_text(out_dir: &Path, name: &str, content: &str) -> Result<PathBuf, String> {
    let path = out_dir.join(name);
    std::fs::write(&path, content)
        .map_err(|e| format!("Failed to write output file '{}': {}", path.display(), e))?;
    Ok(path)
}

/// Tab-separated table, one row per component with 1-based indices
pub fn overview_table(result: &ClassificationResult) -> String {
    let mut table = String::from(
        "IC\tMotion/noise\tmaximum RP correlation\tEdge-fraction\t\
         High-frequency content\tCSF-fraction\tDiscriminant score\n",
    );
    for record in &result.components {
        let f = &record.features;
        let _ = writeln!(
            table,
            "{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}",
            record.index + 1,
            if record.label.is_motion() { "True" } else { "False" },
            f.max_rp_corr,
            f.edge_fract,
            f.hfc,
            f.csf_fract,
            record.score
        );
    }
    table
}

/// Comma-separated 1-based motion component indices
pub fn motion_ics(result: &ClassificationResult) -> String {
    let indices: Vec<String> = result
        .motion_indices()
        .iter()
        .map(|k| (k + 1).to_string())
        .collect();
    indices.join(",")
}

/// One row per component: maxRPcorr, edgeFract, HFC, csfFract
pub fn feature_scores(result: &ClassificationResult) -> String {
    let mut scores = String::new();
    for record in &result.components {
        let f = &record.features;
        let _ = writeln!(
            scores,
            "{:.10e}\t{:.10e}\t{:.10e}\t{:.10e}",
            f.max_rp_corr, f.edge_fract, f.hfc, f.csf_fract
        );
    }
    scores
}

#[derive(Serialize)]
pub struct RunReport<'a> {
    pub run_id: String,
    pub created_at: String,
    pub tr: f64,
    pub denoising: DenoisingMode,
    pub motion_components: Vec<usize>,
    pub outputs: Vec<String>,
    pub classification: &'a ClassificationResult,
}

impl<'a> RunReport<'a> {
    pub fn new(
        classification: &'a ClassificationResult,
        tr: f64,
        denoising: DenoisingMode,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            tr,
            denoising,
            motion_components: classification
                .motion_indices()
                .iter()
                .map(|k| k + 1)
                .collect(),
            outputs,
            classification,
        }
    }
}
