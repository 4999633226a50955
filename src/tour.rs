//! Tour state for the swap neighbourhood.
//!
//! A [`TourState`] owns a permutation of the city indices of a [`CityMap`]
//! together with its cached closed-tour length. Swaps are scored in O(1) by
//! looking only at the edges touching the two swapped positions.

use crate::error::{Result, SolverError};
use crate::instance::CityMap;
use rand::Rng;

/// A closed tour over a borrowed city map, with its cached length
#[derive(Debug, Clone)]
pub struct TourState<'a> {
    map: &'a CityMap,
    tour: Vec<usize>,
    length: f64,
}

impl<'a> TourState<'a> {
    /// Wrap an existing visiting order. Fails if `tour` is not a permutation
    /// of `0..map.len()`.
    pub fn new(map: &'a CityMap, tour: Vec<usize>) -> Result<Self> {
        if tour.len() != map.len() {
            return Err(SolverError::InvalidInitialTour {
                reason: format!("expected {} cities, got {}", map.len(), tour.len()),
            });
        }
        if let Some(reason) = permutation_error(&tour) {
            return Err(SolverError::InvalidInitialTour { reason });
        }

        let length = map.tour_length(&tour);
        Ok(TourState { map, tour, length })
    }

    /// Visit the cities in index order
    pub fn identity(map: &'a CityMap) -> Self {
        let tour: Vec<usize> = (0..map.len()).collect();
        let length = map.tour_length(&tour);
        TourState { map, tour, length }
    }

    /// Uniformly random visiting order
    pub fn shuffled<R: Rng>(map: &'a CityMap, rng: &mut R) -> Self {
        use rand::seq::SliceRandom;

        let mut tour: Vec<usize> = (0..map.len()).collect();
        tour.shuffle(rng);
        let length = map.tour_length(&tour);
        TourState { map, tour, length }
    }

    pub fn map(&self) -> &'a CityMap {
        self.map
    }

    pub fn tour(&self) -> &[usize] {
        &self.tour
    }

    pub fn len(&self) -> usize {
        self.tour.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tour.is_empty()
    }

    /// Cached tour length, kept in sync by [`TourState::apply_swap`]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Tour length computed from scratch in O(N)
    pub fn full_length(&self) -> f64 {
        self.map.tour_length(&self.tour)
    }

    /// Replace the cached length with a from-scratch recomputation
    pub fn recompute_length(&mut self) {
        self.length = self.full_length();
    }

    pub fn is_permutation(&self) -> bool {
        self.tour.len() == self.map.len() && permutation_error(&self.tour).is_none()
    }

    pub fn into_tour(self) -> Vec<usize> {
        self.tour
    }

    /// Pick two distinct positions uniformly at random.
    ///
    /// Requires at least two cities.
    pub fn propose_swap<R: Rng>(&self, rng: &mut R) -> (usize, usize) {
        let n = self.tour.len();
        debug_assert!(n >= 2, "swap proposals need at least 2 cities");

        let i = rng.gen_range(0..n);
        let mut j = rng.gen_range(0..n - 1);
        if j >= i {
            j += 1;
        }
        (i, j)
    }

    /// Signed change in tour length if positions `i` and `j` were swapped.
    ///
    /// Only the edges leaving positions `i - 1`, `i`, `j - 1` and `j` can
    /// change. When the positions are adjacent (including the wrap pair
    /// `(0, N-1)`) two of those indices coincide and the shared edge is
    /// counted once.
    pub fn delta_for_swap(&self, i: usize, j: usize) -> f64 {
        let n = self.tour.len();
        if i == j || n < 2 {
            return 0.0;
        }

        let mut edges = [(i + n - 1) % n, i, (j + n - 1) % n, j];
        edges.sort_unstable();
        let mut unique = 0;
        for k in 0..edges.len() {
            if k == 0 || edges[k] != edges[k - 1] {
                edges[unique] = edges[k];
                unique += 1;
            }
        }

        let swapped = |p: usize| {
            if p == i {
                self.tour[j]
            } else if p == j {
                self.tour[i]
            } else {
                self.tour[p]
            }
        };

        let mut before = 0.0;
        let mut after = 0.0;
        for &e in &edges[..unique] {
            let next = (e + 1) % n;
            before += self.map.distance(self.tour[e], self.tour[next]);
            after += self.map.distance(swapped(e), swapped(next));
        }

        after - before
    }

    /// Swap the cities at positions `i` and `j`, adding `delta` (as returned
    /// by [`TourState::delta_for_swap`]) to the cached length
    pub fn apply_swap(&mut self, i: usize, j: usize, delta: f64) {
        self.tour.swap(i, j);
        self.length += delta;
    }
}

/// Describe why `tour` is not a permutation of `0..tour.len()`
fn permutation_error(tour: &[usize]) -> Option<String> {
    let mut seen = vec![false; tour.len()];
    for &city in tour {
        if city >= tour.len() {
            return Some(format!("city index {} out of range", city));
        }
        if seen[city] {
            return Some(format!("city {} appears more than once", city));
        }
        seen[city] = true;
    }
    None
}
