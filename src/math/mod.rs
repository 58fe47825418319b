//! Numerical utilities: the Levenberg–Marquardt least-squares solver.

pub mod lm;

pub use lm::*;
