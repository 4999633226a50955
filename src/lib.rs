//! SA-TSP Solver Library
//!
//! Approximate solutions to the Euclidean Travelling Salesman Problem by
//! simulated annealing over the two-city swap neighbourhood.
//!
//! # Features
//!
//! - Seeded unit-square city generation and TSPLIB coordinate loading
//! - O(1) incremental scoring of swap moves
//! - Exponential cooling schedule with the Metropolis acceptance rule
//! - Reproducible runs: one explicitly seeded RNG per run
//! - Independent parallel restarts
//! - Progress reporting, benchmarking and SVG visualization
//!
//! # Example
//!
//! ```no_run
//! use sa_tsp_solver::config::AnnealingConfig;
//! use sa_tsp_solver::heuristics::{SimulatedAnnealing, TourChoice};
//! use sa_tsp_solver::instance::CityMap;
//!
//! let map = CityMap::random(10, 3141);
//! let config = AnnealingConfig::default().with_tau(1e4).with_seed(5926);
//!
//! let outcome = SimulatedAnnealing::new(config).run(&map).unwrap();
//! let (tour, length) = outcome.tour(TourChoice::Best);
//!
//! println!("Distance {:.4}: {:?}", length, tour);
//! ```

pub mod benchmark;
pub mod config;
pub mod error;
pub mod heuristics;
pub mod instance;
pub mod progress;
pub mod solution;
pub mod tour;
pub mod visualization;

pub use config::AnnealingConfig;
pub use error::SolverError;
pub use instance::{City, CityMap};
pub use solution::Solution;
pub use tour::TourState;
