//! City maps for the Euclidean TSP.
//!
//! This module holds the immutable city coordinates, the seeded random
//! generator for unit-square maps, and a loader for TSPLIB coordinate files.

use crate::error::{Result, SolverError};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A city on the plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl City {
    pub fn new(x: f64, y: f64) -> Self {
        City { x, y }
    }

    /// Euclidean distance to another city
    #[inline]
    pub fn distance_to(&self, other: &City) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A fixed set of cities, indexed 0..N-1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityMap {
    /// Name of the map
    pub name: String,
    /// Seed the map was generated from, if any
    pub seed: Option<u64>,
    cities: Vec<City>,
}

impl CityMap {
    /// Build a map from explicit coordinates
    pub fn from_cities(name: &str, cities: Vec<City>) -> Result<Self> {
        if let Some(idx) = cities
            .iter()
            .position(|c| !c.x.is_finite() || !c.y.is_finite())
        {
            return Err(SolverError::Parse(format!(
                "City {} has non-finite coordinates ({}, {})",
                idx, cities[idx].x, cities[idx].y
            )));
        }

        Ok(CityMap {
            name: name.to_string(),
            seed: None,
            cities,
        })
    }

    /// Generate `n` cities uniformly in the unit square.
    /// Deterministic via seed.
    pub fn random(n: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let cities = (0..n)
            .map(|_| City::new(rng.gen::<f64>(), rng.gen::<f64>()))
            .collect();

        CityMap {
            name: format!("random-{}-seed{}", n, seed),
            seed: Some(seed),
            cities,
        }
    }

    /// Parse the `NODE_COORD_SECTION` of a TSPLIB file (EUC_2D)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let reader = BufReader::new(file);

        let mut name = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut dimension: Option<usize> = None;
        let mut coords: Vec<(usize, f64, f64)> = Vec::new();
        let mut in_coords = false;

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line == "EOF" {
                continue;
            }

            if let Some(rest) = line.strip_prefix("NAME") {
                name = rest.trim_start_matches([' ', ':']).trim().to_string();
                continue;
            }
            if let Some(rest) = line.strip_prefix("DIMENSION") {
                let value = rest.trim_start_matches([' ', ':']).trim();
                dimension = Some(value.parse().map_err(|_| {
                    SolverError::Parse(format!("Invalid dimension '{}'", value))
                })?);
                continue;
            }
            if line.starts_with("NODE_COORD_SECTION") {
                in_coords = true;
                continue;
            }
            if line.ends_with("_SECTION") {
                in_coords = false;
                continue;
            }

            if in_coords {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 3 {
                    let id: usize = parts[0]
                        .parse()
                        .map_err(|_| SolverError::Parse(format!("Invalid node id '{}'", parts[0])))?;
                    let x: f64 = parts[1]
                        .parse()
                        .map_err(|_| SolverError::Parse(format!("Invalid x coordinate '{}'", parts[1])))?;
                    let y: f64 = parts[2]
                        .parse()
                        .map_err(|_| SolverError::Parse(format!("Invalid y coordinate '{}'", parts[2])))?;
                    coords.push((id, x, y));
                }
            }
        }

        if let Some(dim) = dimension {
            if dim != coords.len() {
                return Err(SolverError::Parse(format!(
                    "DIMENSION is {} but {} coordinates were read",
                    dim,
                    coords.len()
                )));
            }
        }

        // TSPLIB ids are 1-based and not guaranteed to be sorted
        coords.sort_by_key(|&(id, _, _)| id);
        for (k, &(id, _, _)) in coords.iter().enumerate() {
            if id != k + 1 {
                return Err(SolverError::Parse(format!(
                    "Node ids must be 1..={} without gaps or repeats, found {} at position {}",
                    coords.len(),
                    id,
                    k + 1
                )));
            }
        }
        let cities = coords.into_iter().map(|(_, x, y)| City::new(x, y)).collect();

        Self::from_cities(&name, cities)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    #[inline]
    pub fn city(&self, idx: usize) -> &City {
        &self.cities[idx]
    }

    /// Distance between two cities by index
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.cities[i].distance_to(&self.cities[j])
    }

    /// Closed tour length, wrap edge included
    pub fn tour_length(&self, tour: &[usize]) -> f64 {
        if tour.len() < 2 {
            return 0.0;
        }

        let mut length = 0.0;
        for i in 0..tour.len() - 1 {
            length += self.distance(tour[i], tour[i + 1]);
        }

        length += self.distance(tour[tour.len() - 1], tour[0]);

        length
    }

    /// Coordinate bounds as (min_x, max_x, min_y, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for city in &self.cities {
            min_x = min_x.min(city.x);
            max_x = max_x.max(city.x);
            min_y = min_y.min(city.y);
            max_y = max_y.max(city.y);
        }

        (min_x, max_x, min_y, max_y)
    }

    /// Get statistics about the map
    pub fn statistics(&self) -> MapStatistics {
        let n = self.len();
        let mut total = 0.0;
        let mut pairs = 0usize;
        let mut max_distance: f64 = 0.0;
        for i in 0..n {
            for j in i + 1..n {
                let d = self.distance(i, j);
                total += d;
                max_distance = max_distance.max(d);
                pairs += 1;
            }
        }
        let avg_distance = if pairs > 0 { total / pairs as f64 } else { 0.0 };
        let identity: Vec<usize> = (0..n).collect();
        let (min_x, max_x, min_y, max_y) = self.bounds();

        MapStatistics {
            name: self.name.clone(),
            num_cities: n,
            seed: self.seed,
            min_x,
            max_x,
            min_y,
            max_y,
            avg_distance,
            max_distance,
            identity_tour_length: self.tour_length(&identity),
        }
    }
}

/// Statistics about a city map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapStatistics {
    pub name: String,
    pub num_cities: usize,
    pub seed: Option<u64>,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub avg_distance: f64,
    pub max_distance: f64,
    pub identity_tour_length: f64,
}

impl std::fmt::Display for MapStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Map: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.num_cities)?;
        if let Some(seed) = self.seed {
            writeln!(f, "  Seed: {}", seed)?;
        }
        writeln!(
            f,
            "  Bounds: x in [{:.4}, {:.4}], y in [{:.4}, {:.4}]",
            self.min_x, self.max_x, self.min_y, self.max_y
        )?;
        writeln!(f, "  Avg distance: {:.4}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.4}", self.max_distance)?;
        writeln!(f, "  Identity tour length: {:.4}", self.identity_tour_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_distance_calculation() {
        let a = City::new(0.0, 0.0);
        let b = City::new(3.0, 4.0);

        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
        assert!((b.distance_to(&a) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_random_map_is_deterministic() {
        let a = CityMap::random(50, 3141);
        let b = CityMap::random(50, 3141);
        let c = CityMap::random(50, 2718);

        assert_eq!(a.cities(), b.cities());
        assert_ne!(a.cities(), c.cities());
        for city in a.cities() {
            assert!((0.0..1.0).contains(&city.x));
            assert!((0.0..1.0).contains(&city.y));
        }
    }

    #[test]
    fn test_unit_square_length() {
        let map = CityMap::from_cities(
            "square",
            vec![
                City::new(0.0, 0.0),
                City::new(1.0, 0.0),
                City::new(1.0, 1.0),
                City::new(0.0, 1.0),
            ],
        )
        .unwrap();

        assert!((map.tour_length(&[0, 1, 2, 3]) - 4.0).abs() < 1e-12);
        let crossed = 2.0 + 2.0 * 2f64.sqrt();
        assert!((map.tour_length(&[0, 2, 1, 3]) - crossed).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_finite_coordinates() {
        let res = CityMap::from_cities("bad", vec![City::new(0.0, f64::NAN)]);
        assert!(res.is_err());
    }

    #[test]
    fn test_from_file_tsplib() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("sa_tsp_solver_test_{}.tsp", std::process::id()));
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, "NAME : tiny").unwrap();
            writeln!(f, "TYPE : TSP").unwrap();
            writeln!(f, "DIMENSION : 3").unwrap();
            writeln!(f, "EDGE_WEIGHT_TYPE : EUC_2D").unwrap();
            writeln!(f, "NODE_COORD_SECTION").unwrap();
            writeln!(f, "2 3.0 4.0").unwrap();
            writeln!(f, "1 0.0 0.0").unwrap();
            writeln!(f, "3 0.0 4.0").unwrap();
            writeln!(f, "EOF").unwrap();
        }

        let map = CityMap::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(map.name, "tiny");
        assert_eq!(map.len(), 3);
        assert_eq!(*map.city(0), City::new(0.0, 0.0));
        assert!((map.distance(0, 1) - 5.0).abs() < 1e-10);
    }

    fn write_tsplib(tag: &str, ids: &[usize]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sa_tsp_solver_{}_{}.tsp",
            tag,
            std::process::id()
        ));
        let mut f = File::create(&path).unwrap();
        writeln!(f, "NAME : {}", tag).unwrap();
        writeln!(f, "DIMENSION : {}", ids.len()).unwrap();
        writeln!(f, "NODE_COORD_SECTION").unwrap();
        for (k, id) in ids.iter().enumerate() {
            writeln!(f, "{} {}.0 0.0", id, k).unwrap();
        }
        writeln!(f, "EOF").unwrap();
        path
    }

    #[test]
    fn test_from_file_rejects_bad_node_ids() {
        for (tag, ids) in [("dup", vec![1, 2, 2]), ("gap", vec![1, 2, 4]), ("zero", vec![0, 1, 2])] {
            let path = write_tsplib(tag, &ids);
            let res = CityMap::from_file(&path);
            std::fs::remove_file(&path).ok();

            match res {
                Err(SolverError::Parse(msg)) => assert!(msg.contains("Node ids"), "{}", msg),
                other => panic!("{}: expected a parse error, got {:?}", tag, other),
            }
        }

        let path = write_tsplib("ok", &[3, 1, 2]);
        let map = CityMap::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(map.len(), 3);
        assert_eq!(*map.city(0), City::new(1.0, 0.0));
    }

    #[test]
    fn test_statistics() {
        let map = CityMap::random(10, 1);
        let stats = map.statistics();
        assert_eq!(stats.num_cities, 10);
        assert!(stats.max_distance >= stats.avg_distance);
        assert!(stats.max_distance <= 2f64.sqrt());
    }
}
