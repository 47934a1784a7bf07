use crate::cli::RunArgs;
use crate::exit_codes;
use crate::inputs;
use crate::output;
use aroma_rs::nifti_io;
use aroma_rs::{Pipeline, PipelineInputs};

pub fn execute(args: RunArgs) -> i32 {
    // Validate inputs
    if let Err(msg) = inputs::validate_paths(&args) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let mode = inputs::resolve_den_type(&args.den_type);

    let calibration = match inputs::resolve_calibration(&args.calibration) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Err(msg) = inputs::check_out_dir(&args.out_dir, args.overwrite) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    if args.overwrite && args.out_dir.exists() {
        log::info!("Previous outputs in {:?} will be replaced", args.out_dir);
        if !args.quiet {
            eprintln!(
                "Warning: output directory {} exists and will be overwritten",
                args.out_dir.display()
            );
        }
    }

    let pipeline = match Pipeline::new(calibration) {
        Ok(p) => p.with_mode(mode),
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!("Loading inputs...");
    }
    let loaded = match inputs::load_inputs(&args, mode) {
        Ok(l) => l,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let header = loaded.series.as_ref().map(|(_, h)| h);
    let tr = match inputs::resolve_tr(args.tr, header) {
        Ok(tr) => tr,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let pipeline_inputs = PipelineInputs {
        decomposition: &loaded.decomposition,
        motion: &loaded.motion,
        masks: &loaded.masks,
        tr,
        series: loaded.series.as_ref().map(|(data, _)| data),
    };

    // Fatal preconditions stop the run before anything is written
    if let Err(e) = pipeline.validate(&pipeline_inputs) {
        eprintln!("Error: {}", e);
        return exit_codes::INPUT_ERROR;
    }

    if !args.quiet {
        eprintln!(
            "Classifying {} components ({} timepoints, TR={}s, calibration {})...",
            loaded.decomposition.n_components(),
            loaded.decomposition.n_timepoints(),
            tr,
            pipeline.calibration().label()
        );
        if !mode.is_none() {
            eprintln!("  Denoising: {}", mode);
        }
    }

    let result = match pipeline.run(&pipeline_inputs) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("AROMA execution failed: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    // Stale volumes from an earlier run must not sit next to the new report
    if args.overwrite && args.out_dir.exists() {
        if let Err(msg) = output::clear_previous_outputs(&args.out_dir) {
            eprintln!("Error: {}", msg);
            return exit_codes::EXECUTION_ERROR;
        }
    }
    if let Err(e) = std::fs::create_dir_all(&args.out_dir) {
        eprintln!(
            "Error: failed to create output directory {}: {}",
            args.out_dir.display(),
            e
        );
        return exit_codes::EXECUTION_ERROR;
    }

    let classification = &result.classification;
    let mut written = Vec::new();
    let tables = [
        (output::OVERVIEW_FILE, output::overview_table(classification)),
        (output::MOTION_ICS_FILE, output::motion_ics(classification)),
        (output::FEATURE_SCORES_FILE, output::feature_scores(classification)),
    ];
    for (name, content) in &tables {
        if let Err(e) = output::write_text(&args.out_dir, name, content) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
        written.push(name.to_string());
    }

    let reference = loaded.series.as_ref().map(|(_, h)| h);
    let volumes = [
        (output::NON_AGGRESSIVE_FILE, result.cleaned.non_aggressive.as_ref()),
        (output::AGGRESSIVE_FILE, result.cleaned.aggressive.as_ref()),
    ];
    for (name, volume) in volumes {
        let Some(volume) = volume else {
            continue;
        };
        let path = args.out_dir.join(name);
        if let Err(e) = nifti_io::write_volume(&path, volume, reference) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
        written.push(name.to_string());
    }

    written.push(output::REPORT_FILE.to_string());
    let report = output::RunReport::new(classification, tr, mode, written);
    let json = match output::to_json(&report, args.compact) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing report: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };
    if let Err(e) = output::write_text(&args.out_dir, output::REPORT_FILE, &json) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if !args.quiet {
        let motion = output::motion_ics(classification);
        eprintln!(
            "{} of {} components classified as motion: {}",
            classification.motion_indices().len(),
            classification.n_components(),
            if motion.is_empty() { "none" } else { motion.as_str() }
        );
        eprintln!("Results written to {}", args.out_dir.display());
    }

    exit_codes::SUCCESS
}
