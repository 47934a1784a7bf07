use crate::cli::CalibrationArgs;
use crate::exit_codes;
use crate::output;
use aroma_rs::{Calibration, DEFAULT_CALIBRATION};

pub fn execute(args: CalibrationArgs) -> i32 {
    let calibrations = Calibration::builtins();

    if args.json {
        match output::to_json(&calibrations, false) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return exit_codes::EXECUTION_ERROR;
            }
        }
        return exit_codes::SUCCESS;
    }

    println!("Built-in calibrations:\n");
    println!(
        "  {:<24} {:<8} {:<10} {:<8} {:<8} {:<8}",
        "Name", "Version", "Score > 0", "RP >", "CSF >", "HFC >"
    );
    println!("  {}", "-".repeat(70));
    let optional = |v: Option<f64>| v.map(|t| format!("{:.2}", t)).unwrap_or_else(|| "-".to_string());
    for c in &calibrations {
        let marker = if c.name == DEFAULT_CALIBRATION { " (default)" } else { "" };
        println!(
            "  {:<24} {:<8} {:<10} {:<8} {:<8} {:<8}{}",
            c.name,
            c.version,
            "motion",
            format!("{:.2}", c.rp_corr_threshold),
            optional(c.csf_threshold),
            optional(c.hfc_threshold),
            marker
        );
    }
    println!();
    for c in &calibrations {
        let d = &c.discriminant;
        println!(
            "  {}: score = {:.4} + {:.4}*maxRPcorr + {:.4}*edgeFract; HFC cutoff {} Hz; lags {:?}",
            c.name, d.intercept, d.rp_corr_weight, d.edge_weight, c.hfc_cutoff_hz, c.lags
        );
        if !c.documentation.is_empty() {
            println!("    {}", c.documentation);
        }
    }

    exit_codes::SUCCESS
}
