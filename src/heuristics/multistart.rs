//! Independent annealing restarts.
//!
//! Runs several isolated annealers on a rayon pool. Restart `k` uses seed
//! `config.seed + k`; the runs share nothing but the immutable city map, so
//! the selected result does not depend on thread scheduling.

use crate::config::{AnnealingConfig, InitialTour};
use crate::error::{Result, SolverError};
use crate::heuristics::annealing::{AnnealingOutcome, SimulatedAnnealing, TourChoice};
use crate::heuristics::TourImprover;
use crate::instance::CityMap;
use crate::progress::NullReporter;
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use rayon::prelude::*;

/// Outcomes of all restarts and the index of the selected one
#[derive(Debug, Clone)]
pub struct MultiStartOutcome {
    pub runs: Vec<AnnealingOutcome>,
    pub best_run: usize,
}

impl MultiStartOutcome {
    pub fn best(&self) -> &AnnealingOutcome {
        &self.runs[self.best_run]
    }
}

/// Multi-start simulated annealing
#[derive(Debug, Clone)]
pub struct MultiStartAnnealing {
    pub config: AnnealingConfig,
    pub restarts: usize,
    pub choice: TourChoice,
}

impl MultiStartAnnealing {
    pub fn new(config: AnnealingConfig, restarts: usize) -> Self {
        MultiStartAnnealing {
            config,
            restarts,
            choice: TourChoice::Best,
        }
    }

    pub fn with_choice(mut self, choice: TourChoice) -> Self {
        self.choice = choice;
        self
    }

    /// Seed used by restart `k`
    pub fn restart_seed(&self, k: usize) -> u64 {
        self.config.seed.wrapping_add(k as u64)
    }

    pub fn run(&self, map: &CityMap) -> Result<MultiStartOutcome> {
        if self.restarts == 0 {
            return Err(SolverError::config("restarts", "must be at least 1"));
        }
        self.config.validate()?;

        log::info!(
            "Running {} independent restarts from seed {}",
            self.restarts,
            self.config.seed
        );

        let runs: Vec<AnnealingOutcome> = (0..self.restarts)
            .into_par_iter()
            .map(|k| {
                let config = self.config.clone().with_seed(self.restart_seed(k));
                SimulatedAnnealing::new(config).run_with_reporter(map, &mut NullReporter)
            })
            .collect::<Result<Vec<_>>>()?;

        let best_run = runs
            .iter()
            .enumerate()
            .min_by_key(|(k, outcome)| (OrderedFloat(outcome.tour(self.choice).1), *k))
            .map(|(k, _)| k)
            .unwrap_or(0);

        for (k, outcome) in runs.iter().enumerate() {
            log::debug!(
                "Restart {} (seed {}): final {:.4}, best {:.4}",
                k,
                self.restart_seed(k),
                outcome.final_length,
                outcome.best_length
            );
        }
        log::info!(
            "Selected restart {} with distance {:.4}",
            best_run,
            runs[best_run].tour(self.choice).1
        );

        Ok(MultiStartOutcome { runs, best_run })
    }
}

impl TourImprover for MultiStartAnnealing {
    fn improve(&self, map: &CityMap, solution: &mut Solution) -> Result<bool> {
        let mut runner = self.clone();
        let start_length = if solution.is_complete(map) {
            runner.config.initial_tour = InitialTour::Given(solution.tour.clone());
            map.tour_length(&solution.tour)
        } else {
            f64::INFINITY
        };

        let outcome = runner.run(map)?;
        let best = outcome.best();
        let improved = best.tour(self.choice).1 < start_length - 1e-9;

        *solution = best.to_solution(self.choice, self.name());
        Ok(improved)
    }

    fn name(&self) -> &str {
        "MultiStartAnnealing"
    }
}
