//! Gompertz curve evaluation and sampling.
//!
//! The rest of the crate relies on two primitive operations:
//! - predict the weight at a given age (for residuals and reports)
//! - sample the curve over a display range (for plots and exports)
//!
//! Both are total over real inputs: no validation happens here. Callers are
//! responsible for supplying physically meaningful coefficients.

use crate::domain::{CurveRange, GrowthParams};

/// Predicted weight (kg) at `age_days` under the Gompertz curve
/// `b0 * exp(-b1 * exp(-b2 * age))`.
///
/// For `b0, b1, b2 > 0` the curve is strictly increasing in age and
/// approaches `b0` from below as `age → ∞`.
pub fn predict(age_days: f64, params: &GrowthParams) -> f64 {
    params.b0 * (-params.b1 * (-params.b2 * age_days).exp()).exp()
}

/// Evenly spaced `(age, weight)` samples over `range`.
///
/// The iterator is lazy and restartable: each call recomputes from the
/// coefficients alone, so the rendering layer can re-sample freely. A
/// `count` of 1 yields the single point at `range.start`.
pub fn sample_curve(
    params: &GrowthParams,
    range: CurveRange,
) -> impl Iterator<Item = (f64, f64)> + use<> {
    let params = *params;
    let count = range.count;
    let step = if count > 1 {
        (range.stop - range.start) / (count as f64 - 1.0)
    } else {
        0.0
    };
    (0..count).map(move |i| {
        let age = range.start + step * i as f64;
        (age, predict(age, &params))
    })
}
