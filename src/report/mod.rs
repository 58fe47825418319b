//! Reporting utilities: residual recomputation and formatted terminal output.
//!
//! The fit result carries only the coefficient triple, so any diagnostics
//! shown to the user are recomputed here from the model and the original
//! observations. Formatting stays in one place so output changes are
//! localized.

use crate::domain::{GrowthParams, Observation, ParameterTable};
use crate::error::AppError;
use crate::models::predict;

/// One observation with its fitted value and residual.
#[derive(Debug, Clone)]
pub struct ObservationResidual {
    pub observation: Observation,
    pub weight_fit: f64,
    pub residual: f64,
}

/// Compute fitted weights and residuals for each observation.
pub fn compute_residuals(
    observations: &[Observation],
    params: &GrowthParams,
) -> Result<Vec<ObservationResidual>, AppError> {
    let mut out = Vec::with_capacity(observations.len());
    for obs in observations {
        let weight_fit = predict(obs.age_days, params);
        if !weight_fit.is_finite() {
            return Err(AppError::numeric(
                "Non-finite model prediction during residual computation.",
            ));
        }
        out.push(ObservationResidual {
            observation: *obs,
            weight_fit,
            residual: obs.weight_kg - weight_fit,
        });
    }
    Ok(out)
}

/// Root-mean-square residual (kg). Zero for an empty set.
pub fn rmse(residuals: &[ObservationResidual]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    let sse: f64 = residuals.iter().map(|r| r.residual * r.residual).sum();
    (sse / residuals.len() as f64).sqrt()
}

/// Format a calibration summary: old vs. new coefficients plus a residual table.
pub fn format_fit_summary(
    id: &str,
    before: &GrowthParams,
    fitted: &GrowthParams,
    residuals: &[ObservationResidual],
) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== gc - Gompertz calibration: {id} ===\n"));
    out.push_str(&format!(
        "Loaded: b0={:.4} b1={:.4} b2={:.6}\n",
        before.b0, before.b1, before.b2
    ));
    out.push_str(&format!(
        "Fitted: b0={:.4} b1={:.4} b2={:.6}\n",
        fitted.b0, fitted.b1, fitted.b2
    ));

    out.push_str(&format!(
        "\nObservations (n={}, rmse={:.3} kg):\n",
        residuals.len(),
        rmse(residuals)
    ));
    out.push_str("  age (d)   observed   fitted     residual\n");
    for r in residuals {
        out.push_str(&format!(
            "  {:<9.1} {:<10.2} {:<10.2} {:+.2}\n",
            r.observation.age_days, r.observation.weight_kg, r.weight_fit, r.residual
        ));
    }

    out
}

/// Format the curve summary printed by `gc show`.
pub fn format_curve_summary(id: &str, params: &GrowthParams) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== gc - Growth curve: {id} ===\n"));
    out.push_str(&format!(
        "b0={:.4} kg | b1={:.4} | b2={:.6} /day\n",
        params.b0, params.b1, params.b2
    ));
    if params.b1 > 0.0 && params.b2 > 0.0 {
        // Inflection of the Gompertz curve sits at t = ln(b1)/b2.
        out.push_str(&format!(
            "Inflection: {:.0} days | weight there: {:.1} kg\n",
            params.b1.ln() / params.b2,
            params.b0 / std::f64::consts::E
        ));
    }
    out
}

/// One line per table row, for region listings.
pub fn format_table_overview(table: &ParameterTable) -> String {
    let mut out = String::new();
    out.push_str(&format!("Parameter table ({} rows):\n", table.len()));
    for rec in table.records() {
        out.push_str(&format!(
            "  {:<16} b0={:<10.3} b1={:<8.4} b2={:.6}\n",
            rec.id, rec.params.b0, rec.params.b1, rec.params.b2
        ));
    }
    out
}
