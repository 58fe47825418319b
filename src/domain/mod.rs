//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the Gompertz coefficient triple (`GrowthParams`)
//! - the parameter table loaded per session (`ParameterRecord`, `ParameterTable`)
//! - observed weight measurements (`Observation`)
//! - display-range configuration (`CurveRange`)

pub mod types;

pub use types::*;
