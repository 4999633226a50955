//! Improvement heuristics for the TSP.
//!
//! This module exports the simulated annealing optimizer and its
//! independent-restart wrapper.

pub mod annealing;
pub mod multistart;

pub use annealing::*;
pub use multistart::*;

use crate::error::Result;
use crate::instance::CityMap;
use crate::solution::Solution;

/// Trait for methods that improve an existing tour in place
pub trait TourImprover {
    /// Replace `solution` with the improved tour. Returns whether it got shorter.
    fn improve(&self, map: &CityMap, solution: &mut Solution) -> Result<bool>;
    fn name(&self) -> &str;
}
