use crate::cli::RunArgs;
use aroma_rs::nifti_io::{self, NiftiHeader};
use aroma_rs::parser::read_matrix_file;
use aroma_rs::{Calibration, Decomposition, DenoisingMode, MotionParameters, StandardMasks};
use ndarray::Array4;
use std::path::Path;

/// Everything `aroma run` loads from disk
pub struct LoadedInputs {
    pub decomposition: Decomposition,
    pub motion: MotionParameters,
    pub masks: StandardMasks,
    pub series: Option<(Array4<f64>, NiftiHeader)>,
}

/// Check that a path exists and is a regular file.
pub fn validate_file(label: &str, path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("{} not found: {}", label, path.display()));
    }
    if !path.is_file() {
        return Err(format!("{} is not a file: {}", label, path.display()));
    }
    Ok(())
}

/// Validate every input path named by the arguments.
pub fn validate_paths(args: &RunArgs) -> Result<(), String> {
    validate_file("Mixing matrix", &args.mix)?;
    validate_file("Motion parameters", &args.motion)?;
    validate_file("Component maps", &args.ic_maps)?;
    validate_file("Brain mask", &args.brain_mask)?;
    validate_file("Edge mask", &args.edge_mask)?;
    validate_file("CSF mask", &args.csf_mask)?;
    if let Some(ref ftmix) = args.ftmix {
        validate_file("Frequency mixing matrix", ftmix)?;
    }
    if let Some(ref data) = args.data {
        validate_file("Data", data)?;
    }
    Ok(())
}

/// Parse the denoising type. Unknown values fall back to non-aggressive.
pub fn resolve_den_type(value: &str) -> DenoisingMode {
    match value.parse::<DenoisingMode>() {
        Ok(mode) => mode,
        Err(_) => {
            log::warn!(
                "unknown denoising type '{}'; running '{}' denoising",
                value,
                DenoisingMode::NonAggressive
            );
            DenoisingMode::NonAggressive
        }
    }
}

/// A built-in calibration name, or a path to a calibration JSON file.
pub fn resolve_calibration(value: &str) -> Result<Calibration, String> {
    if let Some(calibration) = Calibration::builtin(value) {
        return Ok(calibration);
    }
    let path = Path::new(value);
    if path.is_file() {
        return Calibration::from_json_file(path)
            .map_err(|e| format!("Failed to load calibration '{}': {}", value, e));
    }
    let known: Vec<String> = Calibration::builtins().into_iter().map(|c| c.name).collect();
    Err(format!(
        "Unknown calibration '{}'. Built-ins: {}; or pass a JSON file",
        value,
        known.join(", ")
    ))
}

/// Refuse an existing output directory unless overwriting was requested.
pub fn check_out_dir(out_dir: &Path, overwrite: bool) -> Result<(), String> {
    if out_dir.exists() && !overwrite {
        return Err(format!(
            "Output directory {} already exists. Rerun with --overwrite to replace it",
            out_dir.display()
        ));
    }
    Ok(())
}

/// TR from the command line, else from the data header.
pub fn resolve_tr(explicit: Option<f64>, header: Option<&NiftiHeader>) -> Result<f64, String> {
    if let Some(tr) = explicit {
        return Ok(tr);
    }
    match header {
        Some(header) => Ok(nifti_io::repetition_time(header).unwrap_or(0.0)),
        None => Err("No TR available: pass --tr or --data with a valid header".to_string()),
    }
}

pub fn load_inputs(args: &RunArgs, mode: DenoisingMode) -> Result<LoadedInputs, String> {
    let mixing = read_matrix_file(&args.mix).map_err(|e| e.to_string())?;
    let maps = nifti_io::read_component_maps(&args.ic_maps).map_err(|e| e.to_string())?;
    let decomposition = match args.ftmix {
        Some(ref ftmix) => {
            let ft_mixing = read_matrix_file(ftmix).map_err(|e| e.to_string())?;
            Decomposition::new(maps, mixing, ft_mixing)
        }
        None => Decomposition::with_derived_spectra(maps, mixing),
    }
    .map_err(|e| e.to_string())?;

    let motion = read_matrix_file(&args.motion)
        .and_then(MotionParameters::new)
        .map_err(|e| format!("Motion parameters: {}", e))?;

    let brain = nifti_io::read_volume_3d(&args.brain_mask).map_err(|e| e.to_string())?;
    let edge = nifti_io::read_volume_3d(&args.edge_mask).map_err(|e| e.to_string())?;
    let csf = nifti_io::read_volume_3d(&args.csf_mask).map_err(|e| e.to_string())?;
    let masks = StandardMasks::from_images(&brain, &edge, &csf).map_err(|e| e.to_string())?;

    let series = match (&args.data, mode.is_none()) {
        (Some(data), _) => Some(nifti_io::read_volume_4d(data).map_err(|e| e.to_string())?),
        (None, true) => None,
        (None, false) => {
            return Err(format!(
                "--data is required for denoising type '{}'",
                mode
            ))
        }
    };

    Ok(LoadedInputs {
        decomposition,
        motion,
        masks,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_den_type_fallback() {
        assert_eq!(resolve_den_type("both"), DenoisingMode::Both);
        assert_eq!(resolve_den_type("no"), DenoisingMode::None);
        assert_eq!(resolve_den_type("lots"), DenoisingMode::NonAggressive);
    }

    #[test]
    fn test_resolve_builtin_calibration() {
        let calibration = resolve_calibration("aroma-v1-discriminant").unwrap();
        assert!(calibration.hfc_threshold.is_none());
        let err = resolve_calibration("no-such-calibration").unwrap_err();
        assert!(err.contains("aroma-v1"));
    }

    #[test]
    fn test_resolve_calibration_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let json = serde_json::to_string(&Calibration::aroma_v1_discriminant()).unwrap();
        std::io::Write::write_all(&mut file, json.as_bytes()).unwrap();
        let calibration = resolve_calibration(file.path().to_str().unwrap()).unwrap();
        assert_eq!(calibration.name, "aroma-v1-discriminant");
    }

    #[test]
    fn test_out_dir_policy() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_out_dir(dir.path(), false).is_err());
        assert!(check_out_dir(dir.path(), true).is_ok());
        assert!(check_out_dir(&dir.path().join("fresh"), false).is_ok());
    }

    #[test]
    fn test_explicit_tr_wins() {
        assert_eq!(resolve_tr(Some(2.0), None).unwrap(), 2.0);
        assert!(resolve_tr(None, None).is_err());
    }
}
