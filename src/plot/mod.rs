//! Terminal plotting for `gc fit`/`gc show` output.

pub mod ascii;

pub use ascii::*;
