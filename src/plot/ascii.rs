//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - fitted curve: `-` line
//! - observed weighings: `o`

use crate::domain::{CurveRange, GrowthParams, Observation};
use crate::models::sample_curve;

/// Render the growth curve for `params` over `range`, overlaying any
/// observations that fall inside the display window.
pub fn render_ascii_plot(
    params: &GrowthParams,
    observations: &[Observation],
    range: CurveRange,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let curve: Vec<(f64, f64)> = sample_curve(
        params,
        CurveRange {
            count: width.max(2),
            ..range
        },
    )
    .collect();

    let (t_min, t_max) = (range.start, range.stop.max(range.start + 1e-9));
    let (y_min, y_max) = y_range(&curve, observations).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first, so observation markers overlay it.
    for &(t, y) in &curve {
        if !(t.is_finite() && y.is_finite()) {
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][x] = '-';
    }

    for obs in observations {
        if obs.age_days < t_min || obs.age_days > t_max {
            continue;
        }
        let x = map_x(obs.age_days, t_min, t_max, width);
        let row = map_y(obs.weight_kg.clamp(y_min, y_max), y_min, y_max, height);
        grid[row][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: age=[{t_min:.0}, {t_max:.0}] days | weight=[{y_min:.1}, {y_max:.1}] kg\n"
    ));
    for row in &grid {
        out.push_str(&row.iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn y_range(curve: &[(f64, f64)], observations: &[Observation]) -> Option<(f64, f64)> {
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for &(_, y) in curve {
        if y.is_finite() {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }
    for obs in observations {
        if obs.weight_kg.is_finite() {
            y_min = y_min.min(obs.weight_kg);
            y_max = y_max.max(obs.weight_kg);
        }
    }

    if y_min.is_finite() && y_max.is_finite() && y_max > y_min {
        Some((y_min, y_max))
    } else if y_min.is_finite() {
        Some((y_min - 0.5, y_min + 0.5))
    } else {
        None
    }
}

fn pad_range(y_min: f64, y_max: f64, frac: f64) -> (f64, f64) {
    let pad = ((y_max - y_min).abs() * frac).max(1e-12);
    (y_min - pad, y_max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    ((width - 1) as f64 * u).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top of the plot.
    (height - 1) - ((height - 1) as f64 * u).round() as usize
}
