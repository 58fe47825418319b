//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - loaded from JSON parameter files
//! - handed to the rendering layers (CLI report, ASCII plot, TUI chart)

use serde::{Deserialize, Serialize};

/// The three Gompertz coefficients for one animal group.
///
/// `weight(t) = b0 * exp(-b1 * exp(-b2 * t))` with `t` in days:
///
/// - `b0` — asymptotic mature weight (kg)
/// - `b1` — shape / integration constant
/// - `b2` — growth-rate constant (1/days)
///
/// The triple is plain data; nothing here validates positivity. Loaders and
/// the fitter decide what to accept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthParams {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
}

impl GrowthParams {
    pub const fn new(b0: f64, b1: f64, b2: f64) -> Self {
        Self { b0, b1, b2 }
    }

    /// The default optimizer seed: a ~400 kg mature-weight heuristic.
    ///
    /// This is a starting point for calibration, not a hidden constant; the
    /// CLI and TUI both expose it for overriding.
    pub const fn default_seed() -> Self {
        Self::new(400.0, 3.0, 0.01)
    }

    pub fn is_finite(&self) -> bool {
        self.b0.is_finite() && self.b1.is_finite() && self.b2.is_finite()
    }
}

/// One row of the parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    /// Unique key (`ID` column): region, herd, or breed label.
    pub id: String,
    #[serde(flatten)]
    pub params: GrowthParams,
}

/// Ordered mapping from identifier to [`ParameterRecord`].
///
/// Identifiers are unique within a table; uniqueness is enforced at
/// construction so lookups are unambiguous. Row order is preserved (it is
/// meaningful to users scrolling a selector).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterTable {
    records: Vec<ParameterRecord>,
}

impl ParameterTable {
    /// Build a table from records, rejecting duplicate identifiers.
    ///
    /// Returns the offending identifier on conflict.
    pub fn from_records(records: Vec<ParameterRecord>) -> Result<Self, String> {
        for (i, rec) in records.iter().enumerate() {
            if records[..i].iter().any(|r| r.id == rec.id) {
                return Err(rec.id.clone());
            }
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ParameterRecord] {
        &self.records
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&ParameterRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut ParameterRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }
}

/// A single observed weight measurement.
///
/// Observation sets are ordered, may contain duplicates and out-of-order
/// ages, and are never deduplicated; they live for one fit request only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Age in days (non-negative).
    pub age_days: f64,
    /// Measured weight in kilograms (non-negative).
    pub weight_kg: f64,
}

impl Observation {
    pub const fn new(age_days: f64, weight_kg: f64) -> Self {
        Self { age_days, weight_kg }
    }
}

/// Display range for curve sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveRange {
    /// First sampled age (days).
    pub start: f64,
    /// Last sampled age (days).
    pub stop: f64,
    /// Number of samples over `[start, stop]`.
    pub count: usize,
}

impl Default for CurveRange {
    /// The dashboard's display window: 0–800 days, 200 points.
    fn default() -> Self {
        Self {
            start: 0.0,
            stop: 800.0,
            count: 200,
        }
    }
}
