//! Gompertz growth model.
//!
//! The model is implemented as small, pure functions so that fitting and
//! rendering code can stay decoupled from each other.

pub mod gompertz;

pub use gompertz::*;
