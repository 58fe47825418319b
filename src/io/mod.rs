//! Input helpers.
//!
//! Parameter-table loading (CSV/JSON) with strict schema validation lives
//! here; the core never reads files itself.

pub mod params;

pub use params::*;
