//! Benchmarking and experimentation module.
//!
//! Sweeps the schedule time constant `tau` over several optimization seeds
//! on one map, collects per-run results and summarizes them per `tau`.

use crate::config::{AnnealingConfig, InitialTour};
use crate::error::Result;
use crate::heuristics::annealing::{AnnealingOutcome, SimulatedAnnealing};
use crate::instance::CityMap;
use crate::progress::NullReporter;

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fs::File;
use std::path::Path;

/// Result of a single annealing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Map name
    pub map: String,
    /// Number of cities
    pub num_cities: usize,
    /// Schedule time constant
    pub tau: f64,
    /// Optimization seed
    pub seed: u64,
    /// Length of the starting tour
    pub initial_length: f64,
    /// Length when the schedule ended
    pub final_length: f64,
    /// Shortest length observed
    pub best_length: f64,
    /// Iterations run
    pub iterations: usize,
    /// Fraction of proposals accepted
    pub acceptance_rate: f64,
    /// Computation time in seconds
    pub time: f64,
}

impl RunResult {
    fn from_outcome(map: &CityMap, tau: f64, seed: u64, outcome: &AnnealingOutcome) -> Self {
        RunResult {
            map: map.name.clone(),
            num_cities: map.len(),
            tau,
            seed,
            initial_length: outcome.initial_length,
            final_length: outcome.final_length,
            best_length: outcome.best_length,
            iterations: outcome.iterations,
            acceptance_rate: outcome.acceptance_rate(),
            time: outcome.elapsed_seconds,
        }
    }
}

/// Aggregated statistics for one value of `tau`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TauStatistics {
    pub tau: f64,
    pub num_runs: usize,
    pub avg_final: f64,
    pub std_final: f64,
    pub best_final: f64,
    pub worst_final: f64,
    pub avg_best: f64,
    pub avg_iterations: f64,
    pub avg_time: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Schedule time constants to compare
    pub taus: Vec<f64>,
    /// Number of runs (seeds) per tau
    pub num_runs: usize,
    /// Seed of the first run; run `k` uses `base_seed + k`
    pub base_seed: u64,
    /// Schedule shared by all runs except for tau and seed
    pub annealing: AnnealingConfig,
    /// Run in parallel
    pub parallel: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            taus: vec![1e3, 1e4, 1e5],
            num_runs: 5,
            base_seed: 0,
            annealing: AnnealingConfig::default(),
            parallel: true,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<RunResult>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
        }
    }

    fn run_one(&self, map: &CityMap, tau: f64, seed: u64) -> Result<RunResult> {
        let config = self.config.annealing.clone().with_tau(tau).with_seed(seed);
        let outcome = SimulatedAnnealing::new(config).run_with_reporter(map, &mut NullReporter)?;
        Ok(RunResult::from_outcome(map, tau, seed, &outcome))
    }

    /// Run every (tau, seed) pair on `map`
    pub fn run_on_map(&mut self, map: &CityMap) -> Result<()> {
        log::info!(
            "Running benchmark on map {} ({} taus x {} runs)",
            map.name,
            self.config.taus.len(),
            self.config.num_runs
        );

        // Supplied tours belong to one map; the sweep always starts from identity
        // unless a random start was requested.
        if let InitialTour::Given(_) = self.config.annealing.initial_tour {
            self.config.annealing.initial_tour = InitialTour::Identity;
        }

        let jobs: Vec<(f64, u64)> = self
            .config
            .taus
            .iter()
            .flat_map(|&tau| {
                (0..self.config.num_runs)
                    .map(move |k| (tau, k as u64))
            })
            .map(|(tau, k)| (tau, self.config.base_seed.wrapping_add(k)))
            .collect();

        let mut results: Vec<RunResult> = if self.config.parallel {
            jobs.par_iter()
                .map(|&(tau, seed)| self.run_one(map, tau, seed))
                .collect::<Result<Vec<_>>>()?
        } else {
            jobs.iter()
                .map(|&(tau, seed)| self.run_one(map, tau, seed))
                .collect::<Result<Vec<_>>>()?
        };

        self.results.append(&mut results);
        Ok(())
    }

    /// Compute statistics for each tau
    pub fn compute_statistics(&self) -> Vec<TauStatistics> {
        let mut taus: Vec<f64> = self.results.iter().map(|r| r.tau).collect();
        taus.sort_by_key(|&t| OrderedFloat(t));
        taus.dedup();

        taus.into_iter()
            .map(|tau| {
                let runs: Vec<&RunResult> = self.results.iter().filter(|r| r.tau == tau).collect();
                let finals: Vec<f64> = runs.iter().map(|r| r.final_length).collect();
                let bests: Vec<f64> = runs.iter().map(|r| r.best_length).collect();
                let iterations: Vec<f64> = runs.iter().map(|r| r.iterations as f64).collect();
                let times: Vec<f64> = runs.iter().map(|r| r.time).collect();

                let std_final = if finals.len() > 1 {
                    finals.iter().std_dev()
                } else {
                    0.0
                };

                TauStatistics {
                    tau,
                    num_runs: runs.len(),
                    avg_final: finals.iter().mean(),
                    std_final,
                    best_final: finals.iter().cloned().fold(f64::INFINITY, f64::min),
                    worst_final: finals.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                    avg_best: bests.iter().mean(),
                    avg_iterations: iterations.iter().mean(),
                    avg_time: times.iter().mean(),
                }
            })
            .collect()
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("     Simulated Annealing TSP Benchmark\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        report.push_str("Schedule Comparison:\n");
        report.push_str("-".repeat(88).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<12} {:>6} {:>12} {:>10} {:>12} {:>12} {:>10} {:>10}\n",
            "Tau", "Runs", "Avg Final", "Std", "Best Final", "Avg Best", "Avg Iter", "Avg Time"
        ));
        report.push_str("-".repeat(88).as_str());
        report.push('\n');

        for stat in self.compute_statistics() {
            report.push_str(&format!(
                "{:<12.3e} {:>6} {:>12.4} {:>10.4} {:>12.4} {:>12.4} {:>10.0} {:>10.4}\n",
                stat.tau,
                stat.num_runs,
                stat.avg_final,
                stat.std_final,
                stat.best_final,
                stat.avg_best,
                stat.avg_iterations,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(88).as_str());
        report.push('\n');

        if let Some(best) = self
            .results
            .iter()
            .min_by_key(|r| (OrderedFloat(r.best_length), OrderedFloat(r.tau), r.seed))
        {
            report.push_str(&format!(
                "\nBest run: {:.4} (tau {:.3e}, seed {})\n",
                best.best_length, best.tau, best.seed
            ));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }
}
