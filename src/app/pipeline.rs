//! Shared calibration pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load table -> select region -> fit -> apply -> residuals
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::Path;

use crate::cli::FitArgs;
use crate::data::default_table;
use crate::domain::{GrowthParams, ParameterRecord, ParameterTable};
use crate::error::AppError;
use crate::fit::{FitOptions, apply, fit};
use crate::io::load_parameter_table;
use crate::math::LmOptions;
use crate::report::ObservationResidual;

/// All computed outputs of a single `gc fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub region: String,
    /// Coefficients as loaded, before calibration.
    pub before: GrowthParams,
    pub fitted: GrowthParams,
    pub residuals: Vec<ObservationResidual>,
    /// The table with the fitted row written back.
    pub table: ParameterTable,
}

/// Load the parameter table from `path`, or fall back to the built-in default.
pub fn load_table(path: Option<&Path>) -> Result<ParameterTable, AppError> {
    match path {
        Some(path) => load_parameter_table(path),
        None => Ok(default_table()),
    }
}

/// Resolve the record to operate on: an explicit `--region`, else the first row.
pub fn select_record<'a>(
    table: &'a ParameterTable,
    region: Option<&str>,
) -> Result<&'a ParameterRecord, AppError> {
    match region {
        Some(id) => table
            .get(id)
            .ok_or_else(|| AppError::input(format!("No parameter record with ID '{id}'."))),
        None => table
            .records()
            .first()
            .ok_or_else(|| AppError::data("Parameter table is empty.")),
    }
}

/// Execute the full calibration pipeline for `gc fit`.
///
/// The fit result is applied to the selected row only on success; a failed
/// fit propagates as an error and the table is dropped untouched.
pub fn run_calibration(args: &FitArgs) -> Result<RunOutput, AppError> {
    let mut table = load_table(args.table.params.as_deref())?;
    let record = select_record(&table, args.table.region.as_deref())?;
    let region = record.id.clone();
    let before = record.params;

    let options = FitOptions {
        seed: GrowthParams::new(args.seed_b0, args.seed_b1, args.seed_b2),
        solver: LmOptions {
            max_iter: args.max_iter,
            ..LmOptions::default()
        },
    };

    let fitted = fit(&args.observations, &options)?;
    apply(&mut table, &region, fitted)?;

    let residuals = crate::report::compute_residuals(&args.observations, &fitted)?;

    Ok(RunOutput {
        region,
        before,
        fitted,
        residuals,
        table,
    })
}
