//! Simulated annealing over the swap neighbourhood.
//!
//! Each iteration proposes swapping the cities at two random positions,
//! scores the swap incrementally and accepts it with the Metropolis
//! criterion. The temperature follows `T(t) = t_max * exp(-t / tau)` and the
//! run stops at the first iteration where `T <= t_min`.

use crate::config::{AnnealingConfig, InitialTour};
use crate::error::{Result, SolverError};
use crate::heuristics::TourImprover;
use crate::instance::CityMap;
use crate::progress::{LogReporter, ProgressRecord, ProgressReporter};
use crate::solution::Solution;
use crate::tour::TourState;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Exponential cooling schedule
#[derive(Debug, Clone, Copy)]
pub struct ExponentialSchedule {
    pub t_max: f64,
    pub tau: f64,
}

impl ExponentialSchedule {
    pub fn new(t_max: f64, tau: f64) -> Self {
        ExponentialSchedule { t_max, tau }
    }

    /// Temperature after `t` iterations
    #[inline]
    pub fn temperature(&self, t: usize) -> f64 {
        self.t_max * (-(t as f64) / self.tau).exp()
    }

    /// Constant per-step factor, `T(t + 1) = T(t) * decay_factor()`
    pub fn decay_factor(&self) -> f64 {
        (-1.0 / self.tau).exp()
    }
}

/// Metropolis acceptance test.
///
/// Non-worsening moves are accepted without drawing from `rng`; worsening
/// moves are accepted with probability `exp(-delta / temperature)`.
#[inline]
pub fn metropolis_accept<R: Rng>(delta: f64, temperature: f64, rng: &mut R) -> bool {
    if delta <= 0.0 {
        return true;
    }
    rng.gen::<f64>() < (-delta / temperature).exp()
}

/// Which tour of a run to hand back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TourChoice {
    /// Shortest tour observed at any point of the run
    #[default]
    Best,
    /// Tour held when the schedule ended
    Final,
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnealingOutcome {
    /// Tour the run started from
    pub initial_tour: Vec<usize>,
    pub initial_length: f64,
    pub final_tour: Vec<usize>,
    pub final_length: f64,
    pub best_tour: Vec<usize>,
    pub best_length: f64,
    /// Iteration at which the best tour was first reached
    pub best_iteration: usize,
    pub iterations: usize,
    pub accepted_moves: usize,
    pub improving_moves: usize,
    pub final_temperature: f64,
    /// The iteration cap ended the run before `t_min` was reached
    pub stopped_by_cap: bool,
    pub history: Vec<ProgressRecord>,
    pub elapsed_seconds: f64,
}

impl AnnealingOutcome {
    pub fn tour(&self, choice: TourChoice) -> (&[usize], f64) {
        match choice {
            TourChoice::Best => (&self.best_tour, self.best_length),
            TourChoice::Final => (&self.final_tour, self.final_length),
        }
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.accepted_moves as f64 / self.iterations as f64
        }
    }

    /// Feed the recorded history to `reporter` as a live run would have
    pub fn replay(&self, reporter: &mut dyn ProgressReporter) {
        if let Some((last, earlier)) = self.history.split_last() {
            for record in earlier {
                reporter.report(record);
            }
            reporter.finish(last);
        }
    }

    /// Package the chosen tour as a [`Solution`]
    pub fn to_solution(&self, choice: TourChoice, algorithm: &str) -> Solution {
        let (tour, length) = self.tour(choice);
        Solution {
            tour: tour.to_vec(),
            length,
            algorithm: algorithm.to_string(),
            computation_time: self.elapsed_seconds,
            iterations: Some(self.iterations),
            accepted_moves: Some(self.accepted_moves),
        }
    }
}

/// Simulated Annealing
///
/// Single-threaded; every random draw of a run comes from one `ChaCha8Rng`
/// seeded with `config.seed`, so equal inputs replay the same trajectory.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAnnealing {
    pub config: AnnealingConfig,
    /// Tour returned by [`TourImprover::improve`]
    pub choice: TourChoice,
}

impl SimulatedAnnealing {
    pub fn new(config: AnnealingConfig) -> Self {
        SimulatedAnnealing {
            config,
            choice: TourChoice::Best,
        }
    }

    pub fn with_choice(mut self, choice: TourChoice) -> Self {
        self.choice = choice;
        self
    }

    /// Starting tour of a run with this configuration, after validation
    pub fn initial_tour(&self, map: &CityMap) -> Result<Vec<usize>> {
        if map.len() < 2 {
            return Err(SolverError::TooFewCities { count: map.len() });
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        Ok(self.start_state(map, &mut rng)?.into_tour())
    }

    fn start_state<'a>(&self, map: &'a CityMap, rng: &mut ChaCha8Rng) -> Result<TourState<'a>> {
        match &self.config.initial_tour {
            InitialTour::Identity => Ok(TourState::identity(map)),
            InitialTour::Random => Ok(TourState::shuffled(map, rng)),
            InitialTour::Given(tour) => TourState::new(map, tour.clone()),
        }
    }

    /// Run and send progress to the `log` facade
    pub fn run(&self, map: &CityMap) -> Result<AnnealingOutcome> {
        self.run_with_reporter(map, &mut LogReporter)
    }

    pub fn run_with_reporter(
        &self,
        map: &CityMap,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<AnnealingOutcome> {
        let config = &self.config;
        config.validate()?;
        if map.len() < 2 {
            return Err(SolverError::TooFewCities { count: map.len() });
        }

        let start = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut state = self.start_state(map, &mut rng)?;
        let initial_tour = state.tour().to_vec();

        let initial_length = state.length();
        ensure_finite(0, "length", initial_length)?;

        log::info!("Simulating with {} cities", map.len());
        log::info!("Initial total distance is {:.4}", initial_length);

        let schedule = ExponentialSchedule::new(config.t_max, config.tau);
        let mut temperature = config.t_max;
        let mut iteration = 0usize;
        let mut accepted_moves = 0usize;
        let mut improving_moves = 0usize;
        let mut stopped_by_cap = false;

        let mut best_tour = state.tour().to_vec();
        let mut best_length = initial_length;
        let mut best_iteration = 0usize;

        let mut history = Vec::new();

        while temperature > config.t_min {
            if let Some(cap) = config.max_iterations {
                if iteration >= cap {
                    log::warn!(
                        "Iteration cap {} reached at T = {:.6} (T_min = {})",
                        cap,
                        temperature,
                        config.t_min
                    );
                    stopped_by_cap = true;
                    break;
                }
            }

            let (i, j) = state.propose_swap(&mut rng);
            let delta = state.delta_for_swap(i, j);
            ensure_finite(iteration, "delta", delta)?;

            if metropolis_accept(delta, temperature, &mut rng) {
                state.apply_swap(i, j, delta);
                debug_assert!(state.is_permutation());
                accepted_moves += 1;
                if delta < 0.0 {
                    improving_moves += 1;
                }

                if state.length() < best_length {
                    best_length = state.length();
                    best_tour.copy_from_slice(state.tour());
                    best_iteration = iteration + 1;
                }
            }

            iteration += 1;

            if iteration % config.report_interval == 0 {
                let record = ProgressRecord {
                    iteration,
                    length: state.length(),
                    temperature,
                    t_min: config.t_min,
                };
                history.push(record);
                reporter.report(&record);
            }

            temperature = schedule.temperature(iteration);
            ensure_finite(iteration, "temperature", temperature)?;
        }

        let drift = (state.length() - state.full_length()).abs();
        log::debug!("Incremental length drift after {} iterations: {:e}", iteration, drift);
        state.recompute_length();
        ensure_finite(iteration, "length", state.length())?;

        let final_record = ProgressRecord {
            iteration,
            length: state.length(),
            temperature,
            t_min: config.t_min,
        };
        if history.last().map(|r| r.iteration) != Some(iteration) {
            history.push(final_record);
        }
        reporter.finish(&final_record);

        let final_length = state.length();
        let best_length = map.tour_length(&best_tour);

        log::debug!(
            "Accepted {} of {} proposals ({} improving)",
            accepted_moves,
            iteration,
            improving_moves
        );
        log::info!(
            "Final distance {:.4}, best distance {:.4} (iteration {})",
            final_length,
            best_length,
            best_iteration
        );

        Ok(AnnealingOutcome {
            initial_tour,
            initial_length,
            final_tour: state.into_tour(),
            final_length,
            best_tour,
            best_length,
            best_iteration,
            iterations: iteration,
            accepted_moves,
            improving_moves,
            final_temperature: temperature,
            stopped_by_cap,
            history,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        })
    }
}

impl TourImprover for SimulatedAnnealing {
    fn improve(&self, map: &CityMap, solution: &mut Solution) -> Result<bool> {
        let mut runner = self.clone();
        let start_length = if solution.is_complete(map) {
            runner.config.initial_tour = InitialTour::Given(solution.tour.clone());
            map.tour_length(&solution.tour)
        } else {
            f64::INFINITY
        };

        let outcome = runner.run(map)?;
        let (_, length) = outcome.tour(self.choice);
        let improved = length < start_length - 1e-9;

        *solution = outcome.to_solution(self.choice, self.name());
        Ok(improved)
    }

    fn name(&self) -> &str {
        "SimulatedAnnealing"
    }
}

fn ensure_finite(iteration: usize, quantity: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SolverError::NumericAnomaly {
            iteration,
            quantity,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;
    use crate::progress::{CollectingReporter, NullReporter};

    fn unit_square() -> CityMap {
        CityMap::from_cities(
            "square",
            vec![
                City::new(0.0, 0.0),
                City::new(1.0, 0.0),
                City::new(1.0, 1.0),
                City::new(0.0, 1.0),
            ],
        )
        .unwrap()
    }

    /// Replays no randomness: panics if the acceptance test draws a number
    struct ExhaustedRng;

    impl RngCore for ExhaustedRng {
        fn next_u32(&mut self) -> u32 {
            panic!("random number drawn")
        }
        fn next_u64(&mut self) -> u64 {
            panic!("random number drawn")
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("random number drawn")
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            panic!("random number drawn")
        }
    }

    #[test]
    fn test_unit_square_converges() {
        let map = unit_square();
        let config = AnnealingConfig::default()
            .with_temperatures(10.0, 1e-3)
            .with_tau(1e3)
            .with_initial_tour(InitialTour::Given(vec![0, 2, 1, 3]))
            .with_seed(5926);

        let outcome = SimulatedAnnealing::new(config)
            .run_with_reporter(&map, &mut NullReporter)
            .unwrap();

        let crossed = 2.0 + 2.0 * 2f64.sqrt();
        assert!((outcome.initial_length - crossed).abs() < 1e-12);
        assert!((outcome.final_length - 4.0).abs() < 1e-9, "final {}", outcome.final_length);
        assert!((outcome.best_length - 4.0).abs() < 1e-9);
        assert!(!outcome.stopped_by_cap);
    }

    #[test]
    fn test_terminates_at_scheduled_iteration() {
        let map = CityMap::random(20, 1);
        let config = AnnealingConfig::default()
            .with_temperatures(5.0, 0.01)
            .with_tau(500.0)
            .with_seed(2);
        let expected = config.scheduled_iterations();

        let outcome = SimulatedAnnealing::new(config.clone())
            .run_with_reporter(&map, &mut NullReporter)
            .unwrap();

        assert!(outcome.iterations.abs_diff(expected) <= 1);
        assert!(outcome.final_temperature <= config.t_min);
        let schedule = ExponentialSchedule::new(config.t_max, config.tau);
        assert!(schedule.temperature(outcome.iterations - 1) > config.t_min);
    }

    #[test]
    fn test_temperature_non_increasing() {
        let schedule = ExponentialSchedule::new(10.0, 250.0);
        let mut previous = schedule.temperature(0);
        assert_eq!(previous, 10.0);
        let mut stepped = previous;
        for t in 1..5000 {
            let current = schedule.temperature(t);
            assert!(current <= previous);
            stepped *= schedule.decay_factor();
            assert!((stepped - current).abs() <= 1e-9 * current.max(1e-300));
            previous = current;
        }
    }

    #[test]
    fn test_determinism() {
        let map = CityMap::random(30, 3141);
        let config = AnnealingConfig::default()
            .with_tau(2e3)
            .with_report_interval(500)
            .with_initial_tour(InitialTour::Random)
            .with_seed(5926);

        let mut first = CollectingReporter::default();
        let mut second = CollectingReporter::default();
        let a = SimulatedAnnealing::new(config.clone())
            .run_with_reporter(&map, &mut first)
            .unwrap();
        let b = SimulatedAnnealing::new(config.clone())
            .run_with_reporter(&map, &mut second)
            .unwrap();

        assert_eq!(first.lines, second.lines);
        assert_eq!(a.final_tour, b.final_tour);
        assert_eq!(a.best_tour, b.best_tour);
        assert_eq!(a.final_length.to_bits(), b.final_length.to_bits());

        let c = SimulatedAnnealing::new(config.with_seed(1))
            .run_with_reporter(&map, &mut NullReporter)
            .unwrap();
        assert_ne!(a.final_tour, c.final_tour);
    }

    #[test]
    fn test_reporter_does_not_change_outcome() {
        let map = CityMap::random(15, 8);
        let config = AnnealingConfig::default().with_tau(1e3).with_report_interval(7);
        let quiet = SimulatedAnnealing::new(config.clone())
            .run_with_reporter(&map, &mut NullReporter)
            .unwrap();
        let mut lines = CollectingReporter::default();
        let loud = SimulatedAnnealing::new(config)
            .run_with_reporter(&map, &mut lines)
            .unwrap();

        assert_eq!(quiet.final_tour, loud.final_tour);
        assert_eq!(lines.lines.len(), quiet.history.len());
        assert!(lines.lines[0].starts_with("Iteration: 7 Distance: "));
    }

    #[test]
    fn test_outcome_tours_are_permutations() {
        let map = CityMap::random(25, 4);
        let outcome = SimulatedAnnealing::new(AnnealingConfig::default().with_tau(1e3))
            .run_with_reporter(&map, &mut NullReporter)
            .unwrap();

        for tour in [&outcome.final_tour, &outcome.best_tour] {
            let mut sorted = tour.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..25).collect::<Vec<_>>());
        }
        assert!((map.tour_length(&outcome.final_tour) - outcome.final_length).abs() < 1e-9);
        assert!(outcome.best_length <= outcome.final_length + 1e-9);
        assert!(outcome.best_length <= outcome.initial_length + 1e-9);
    }

    #[test]
    fn test_history_interval_and_final_record() {
        let map = CityMap::random(10, 3141);
        let config = AnnealingConfig::default().with_tau(1e3).with_report_interval(1000);
        let outcome = SimulatedAnnealing::new(config.clone())
            .run_with_reporter(&map, &mut NullReporter)
            .unwrap();

        let (last, periodic) = outcome.history.split_last().unwrap();
        for (k, record) in periodic.iter().enumerate() {
            assert_eq!(record.iteration, (k + 1) * 1000);
        }
        for pair in outcome.history.windows(2) {
            assert!(pair[1].temperature <= pair[0].temperature);
        }
        assert_eq!(last.iteration, outcome.iterations);
        assert!((last.length - outcome.final_length).abs() < 1e-12);
    }

    #[test]
    fn test_iteration_cap() {
        let map = CityMap::random(10, 1);
        let config = AnnealingConfig::default().with_max_iterations(250);
        let outcome = SimulatedAnnealing::new(config)
            .run_with_reporter(&map, &mut NullReporter)
            .unwrap();

        assert_eq!(outcome.iterations, 250);
        assert!(outcome.stopped_by_cap);
    }

    #[test]
    fn test_configuration_errors_before_running() {
        let map = CityMap::random(10, 1);
        let bad = [
            AnnealingConfig::default().with_temperatures(1.0, 2.0),
            AnnealingConfig::default().with_temperatures(-1.0, 1e-3),
            AnnealingConfig::default().with_tau(0.0),
            AnnealingConfig::default().with_initial_tour(InitialTour::Given(vec![0, 0])),
        ];
        for config in bad {
            let mut reporter = CollectingReporter::default();
            let err = SimulatedAnnealing::new(config)
                .run_with_reporter(&map, &mut reporter)
                .unwrap_err();
            assert!(err.is_configuration_error(), "{}", err);
            assert!(reporter.lines.is_empty());
        }

        for n in [0, 1] {
            let tiny = CityMap::random(n, 1);
            let err = SimulatedAnnealing::default()
                .run_with_reporter(&tiny, &mut NullReporter)
                .unwrap_err();
            assert!(matches!(err, SolverError::TooFewCities { count } if count == n));
        }
    }

    #[test]
    fn test_numeric_anomaly_detected() {
        let map = CityMap::from_cities(
            "overflow",
            vec![
                City::new(0.0, 0.0),
                City::new(1e308, 1e308),
                City::new(-1e308, 1e308),
            ],
        )
        .unwrap();

        let err = SimulatedAnnealing::default()
            .run_with_reporter(&map, &mut NullReporter)
            .unwrap_err();
        assert!(matches!(err, SolverError::NumericAnomaly { .. }), "{}", err);
    }

    #[test]
    fn test_non_worsening_moves_skip_rng() {
        let mut rng = ExhaustedRng;
        assert!(metropolis_accept(-1.0, 1.0, &mut rng));
        assert!(metropolis_accept(0.0, 1e-12, &mut rng));
    }

    #[test]
    fn test_acceptance_frequency() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let trials = 100_000;
        for (delta, temperature) in [(0.5_f64, 1.0_f64), (1.0, 0.5), (0.1, 2.0)] {
            let expected = (-delta / temperature).exp();
            let accepted = (0..trials)
                .filter(|_| metropolis_accept(delta, temperature, &mut rng))
                .count();
            let observed = accepted as f64 / trials as f64;
            // about 6 standard deviations at this sample size
            assert!(
                (observed - expected).abs() < 0.01,
                "delta {} T {}: observed {}, expected {}",
                delta,
                temperature,
                observed,
                expected
            );
        }
    }

    #[test]
    fn test_improve_from_solution() {
        let map = unit_square();
        let mut solution = Solution::from_tour(&map, vec![0, 2, 1, 3], "start");
        let sa = SimulatedAnnealing::new(AnnealingConfig::default().with_tau(1e3));

        let improved = sa.improve(&map, &mut solution).unwrap();

        assert!(improved);
        assert!((solution.length - 4.0).abs() < 1e-9);
        assert_eq!(solution.algorithm, "SimulatedAnnealing");
        assert!(solution.is_complete(&map));
    }

    #[test]
    fn test_given_tour_out_of_range_rejected() {
        let map = CityMap::random(5, 3141);
        let config = AnnealingConfig::default()
            .with_initial_tour(InitialTour::Given(vec![0, 1, 2, 3, 99]));
        let sa = SimulatedAnnealing::new(config);

        let err = sa.initial_tour(&map).unwrap_err();
        assert!(matches!(err, SolverError::InvalidInitialTour { .. }));
        assert!(err.to_string().contains("99"));

        let err = sa.run_with_reporter(&map, &mut NullReporter).unwrap_err();
        assert!(matches!(err, SolverError::InvalidInitialTour { .. }));
    }

    #[test]
    fn test_initial_tour_matches_run() {
        let map = CityMap::random(8, 3141);
        for initial in [
            InitialTour::Identity,
            InitialTour::Random,
            InitialTour::Given(vec![7, 6, 5, 4, 3, 2, 1, 0]),
        ] {
            let config = AnnealingConfig::default()
                .with_tau(200.0)
                .with_initial_tour(initial.clone());
            let sa = SimulatedAnnealing::new(config);

            let expected = sa.initial_tour(&map).unwrap();
            let outcome = sa.run_with_reporter(&map, &mut NullReporter).unwrap();

            assert_eq!(outcome.initial_tour, expected, "{:?}", initial);
            assert!((outcome.initial_length - map.tour_length(&expected)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_replay_matches_live_reporting() {
        let map = CityMap::random(10, 5);
        let config = AnnealingConfig::default()
            .with_tau(500.0)
            .with_report_interval(250);
        let sa = SimulatedAnnealing::new(config);

        let mut live = CollectingReporter::default();
        let outcome = sa.run_with_reporter(&map, &mut live).unwrap();

        let mut replayed = CollectingReporter::default();
        outcome.replay(&mut replayed);

        assert!(!live.lines.is_empty());
        assert_eq!(live.lines, replayed.lines);
    }
}
