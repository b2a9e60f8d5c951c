//! Analysis modules.
//!
//! Pure computations over reviews that are already in memory.

pub mod aggregator;

pub use aggregator::*;
