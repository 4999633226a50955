//! Run configuration.
//!
//! [`AnnealingConfig`] carries the cooling schedule parameters and seeds of
//! one annealing run. Defaults reproduce the reference 10-city demo.

use crate::error::{Result, SolverError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default seed for city generation
pub const DEFAULT_MAP_SEED: u64 = 3141;
/// Default seed for the optimization run
pub const DEFAULT_OPTIMIZATION_SEED: u64 = 5926;
/// Default number of cities
pub const DEFAULT_NUM_CITIES: usize = 10;

/// How the annealer builds its starting tour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitialTour {
    /// Visit cities in index order
    #[default]
    Identity,
    /// Shuffle with the optimization RNG
    Random,
    /// Caller-supplied permutation
    Given(Vec<usize>),
}

/// Configuration for one simulated annealing run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    /// Initial temperature
    pub t_max: f64,
    /// The run stops once the temperature drops to this value
    pub t_min: f64,
    /// Time constant of the exponential schedule `T(t) = t_max * exp(-t / tau)`
    pub tau: f64,
    /// Iterations between progress records
    pub report_interval: usize,
    /// Optional hard cap on iterations
    pub max_iterations: Option<usize>,
    /// Seed of the optimization RNG
    pub seed: u64,
    /// Starting tour
    pub initial_tour: InitialTour,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            t_max: 10.0,
            t_min: 1e-3,
            tau: 1e4,
            report_interval: 1000,
            max_iterations: None,
            seed: DEFAULT_OPTIMIZATION_SEED,
            initial_tour: InitialTour::Identity,
        }
    }
}

impl AnnealingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperatures(mut self, t_max: f64, t_min: f64) -> Self {
        self.t_max = t_max;
        self.t_min = t_min;
        self
    }

    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    pub fn with_report_interval(mut self, interval: usize) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn with_max_iterations(mut self, cap: usize) -> Self {
        self.max_iterations = Some(cap);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_initial_tour(mut self, initial: InitialTour) -> Self {
        self.initial_tour = initial;
        self
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AnnealingConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Check the schedule parameters
    pub fn validate(&self) -> Result<()> {
        if !self.t_max.is_finite() || self.t_max <= 0.0 {
            return Err(SolverError::config(
                "t_max",
                format!("must be a positive finite number, got {}", self.t_max),
            ));
        }
        if !self.t_min.is_finite() || self.t_min <= 0.0 {
            return Err(SolverError::config(
                "t_min",
                format!("must be a positive finite number, got {}", self.t_min),
            ));
        }
        if self.t_min >= self.t_max {
            return Err(SolverError::config(
                "t_min",
                format!("must be less than t_max ({}), got {}", self.t_max, self.t_min),
            ));
        }
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err(SolverError::config(
                "tau",
                format!("must be a positive finite number, got {}", self.tau),
            ));
        }
        if self.report_interval == 0 {
            return Err(SolverError::config("report_interval", "must be at least 1"));
        }
        Ok(())
    }

    /// Number of iterations the schedule runs before reaching `t_min`,
    /// ignoring `max_iterations`
    pub fn scheduled_iterations(&self) -> usize {
        (self.tau * (self.t_max / self.t_min).ln()).ceil().max(0.0) as usize
    }
}
