//! Solution representation for the TSP.
//!
//! A [`Solution`] is the read-only result handed to callers, serializers and
//! the visualization layer.

use crate::instance::CityMap;
use serde::{Deserialize, Serialize};

/// A closed tour with its length and run metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a sequence of city indices (implicitly closed)
    pub tour: Vec<usize>,
    /// Total tour length, wrap edge included
    pub length: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    /// Number of accepted moves (if applicable)
    pub accepted_moves: Option<usize>,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            tour: Vec::new(),
            length: f64::INFINITY,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
            accepted_moves: None,
        }
    }

    /// Create a solution from a tour
    pub fn from_tour(map: &CityMap, tour: Vec<usize>, algorithm: &str) -> Self {
        let length = map.tour_length(&tour);

        Solution {
            tour,
            length,
            algorithm: algorithm.to_string(),
            ..Self::new()
        }
    }

    /// Recompute the length from the tour
    pub fn validate(&mut self, map: &CityMap) {
        self.length = map.tour_length(&self.tour);
    }

    /// Check if all cities are visited exactly once
    pub fn is_complete(&self, map: &CityMap) -> bool {
        if self.tour.len() != map.len() {
            return false;
        }

        let mut seen = vec![false; map.len()];
        for &city in &self.tour {
            if city >= seen.len() || seen[city] {
                return false;
            }
            seen[city] = true;
        }
        true
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Distance: {:.4}", self.length)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        if let Some(accepted) = self.accepted_moves {
            writeln!(f, "  Accepted moves: {}", accepted)?;
        }
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;

    #[test]
    fn test_solution_creation() {
        let sol = Solution::new();
        assert!(sol.tour.is_empty());
        assert_eq!(sol.length, f64::INFINITY);
    }

    #[test]
    fn test_from_tour_and_completeness() {
        let map = CityMap::from_cities(
            "line",
            vec![City::new(0.0, 0.0), City::new(1.0, 0.0), City::new(2.0, 0.0)],
        )
        .unwrap();

        let sol = Solution::from_tour(&map, vec![0, 1, 2], "test");
        assert!((sol.length - 4.0).abs() < 1e-12);
        assert!(sol.is_complete(&map));

        let partial = Solution::from_tour(&map, vec![0, 1, 1], "test");
        assert!(!partial.is_complete(&map));
    }
}
