//! Built-in data: the default parameter table and synthetic observations.

pub mod sample;

pub use sample::*;
