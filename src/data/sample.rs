//! Default parameters and synthetic weight observations.
//!
//! The default table stands in for the reference dashboard's bundled
//! parameter spreadsheet, so `gc` works out of the box without a file.
//! The synthetic generator produces seeded, noisy weighings along a known
//! curve for demos and the TUI's "generate" key.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{GrowthParams, Observation, ParameterRecord, ParameterTable};
use crate::error::AppError;
use crate::models::predict;

/// Built-in parameter table used when no file is supplied.
///
/// Coefficients are plausible beef-cattle values: mature weight 420–780 kg,
/// growth-rate constants in the 0.004–0.008/day range.
pub fn default_table() -> ParameterTable {
    let records = vec![
        record("Angus", 620.0, 3.2, 0.0065),
        record("Hereford", 580.0, 3.0, 0.0060),
        record("Charolais", 780.0, 3.4, 0.0055),
        record("Nelore", 520.0, 3.1, 0.0048),
        record("Jersey", 420.0, 2.8, 0.0072),
    ];
    // The literal list above has unique ids.
    ParameterTable::from_records(records).unwrap_or_default()
}

fn record(id: &str, b0: f64, b1: f64, b2: f64) -> ParameterRecord {
    ParameterRecord {
        id: id.to_string(),
        params: GrowthParams::new(b0, b1, b2),
    }
}

/// Controls for synthetic observation generation.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    /// Number of observations (the entry form carries at most 5 rows).
    pub count: usize,
    /// Age window (days) to draw weighing dates from.
    pub age_min: f64,
    pub age_max: f64,
    /// Standard deviation of the weight noise (kg).
    pub noise_kg: f64,
    /// RNG seed, so demo runs are reproducible.
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            count: 5,
            age_min: 50.0,
            age_max: 750.0,
            noise_kg: 8.0,
            seed: 42,
        }
    }
}

/// Generate noisy weighings along the curve defined by `params`.
///
/// Ages are sorted ascending so the output reads like a weighing log;
/// weights are clamped at zero (a scale never reads negative).
pub fn generate_observations(
    params: &GrowthParams,
    config: &SampleConfig,
) -> Result<Vec<Observation>, AppError> {
    if config.count == 0 {
        return Err(AppError::input("Sample count must be > 0."));
    }
    if !(config.age_min.is_finite()
        && config.age_max.is_finite()
        && config.age_max > config.age_min
        && config.age_min >= 0.0)
    {
        return Err(AppError::input("Invalid age range for sample generation."));
    }
    if !(config.noise_kg.is_finite() && config.noise_kg >= 0.0) {
        return Err(AppError::input("Invalid noise setting."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.noise_kg.max(1e-9))
        .map_err(|e| AppError::numeric(format!("Noise distribution error: {e}")))?;

    let mut ages: Vec<f64> = (0..config.count)
        .map(|_| rng.gen_range(config.age_min..=config.age_max))
        .collect();
    ages.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let observations = ages
        .into_iter()
        .map(|age| {
            let noise = if config.noise_kg > 0.0 {
                normal.sample(&mut rng)
            } else {
                0.0
            };
            Observation::new(age, (predict(age, params) + noise).max(0.0))
        })
        .collect();

    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_unique_ids() {
        let table = default_table();
        assert!(table.len() >= 3);
        let ids: Vec<&str> = table.ids().collect();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn generated_observations_are_seeded_and_sorted() {
        let params = GrowthParams::new(400.0, 3.0, 0.01);
        let config = SampleConfig::default();

        let a = generate_observations(&params, &config).unwrap();
        let b = generate_observations(&params, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);

        for w in a.windows(2) {
            assert!(w[0].age_days <= w[1].age_days);
        }
        for obs in &a {
            assert!(obs.age_days >= 50.0 && obs.age_days <= 750.0);
            assert!(obs.weight_kg >= 0.0);
        }
    }

    #[test]
    fn zero_noise_lands_on_the_curve() {
        let params = GrowthParams::new(400.0, 3.0, 0.01);
        let config = SampleConfig {
            noise_kg: 0.0,
            ..SampleConfig::default()
        };
        let obs = generate_observations(&params, &config).unwrap();
        for o in &obs {
            assert!((o.weight_kg - predict(o.age_days, &params)).abs() < 1e-9);
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let params = GrowthParams::new(400.0, 3.0, 0.01);
        let bad_count = SampleConfig {
            count: 0,
            ..SampleConfig::default()
        };
        assert!(generate_observations(&params, &bad_count).is_err());

        let bad_range = SampleConfig {
            age_min: 500.0,
            age_max: 100.0,
            ..SampleConfig::default()
        };
        assert!(generate_observations(&params, &bad_range).is_err());
    }
}
