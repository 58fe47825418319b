//! Parameter estimation.
//!
//! Responsibilities:
//!
//! - validate observation sets before any numerics run
//! - calibrate the Gompertz triple against observed weights (Levenberg–Marquardt)
//! - write a successful fit back into the parameter table

pub mod estimator;

pub use estimator::*;
