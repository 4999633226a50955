//! SA-TSP Solver - Command Line Interface
//!
//! Simulated annealing for the Euclidean Travelling Salesman Problem.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sa_tsp_solver::benchmark::{Benchmark, BenchmarkConfig};
use sa_tsp_solver::config::{AnnealingConfig, InitialTour, DEFAULT_MAP_SEED, DEFAULT_NUM_CITIES};
use sa_tsp_solver::heuristics::{
    AnnealingOutcome, MultiStartAnnealing, SimulatedAnnealing, TourChoice,
};
use sa_tsp_solver::instance::CityMap;
use sa_tsp_solver::progress::{
    LineReporter, LogReporter, NullReporter, ProgressBarReporter, ProgressReporter,
};
use sa_tsp_solver::solution::Solution;
use sa_tsp_solver::visualization::Visualizer;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sa-tsp-solver")]
#[command(version = "1.0")]
#[command(about = "Simulated annealing for the Euclidean TSP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Anneal one map
    Solve {
        #[command(flatten)]
        map: MapArgs,

        #[command(flatten)]
        schedule: ScheduleArgs,

        /// Random seed of the optimization run
        #[arg(short, long)]
        seed: Option<u64>,

        /// Starting tour
        #[arg(long, value_enum)]
        initial: Option<InitialArg>,

        /// Number of independent restarts (seeds seed, seed+1, ...)
        #[arg(long, default_value = "1")]
        restarts: usize,

        /// Which tour to report
        #[arg(long, value_enum, default_value = "best")]
        report: ReportArg,

        /// How to show progress records
        #[arg(long, value_enum, default_value = "lines")]
        progress: ProgressArg,

        /// Output solution to file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write SVG plots into this directory
        #[arg(long)]
        visualize: Option<PathBuf>,

        /// Also convert the plots to PNG
        #[arg(long)]
        png: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compare schedule time constants over several seeds
    Benchmark {
        #[command(flatten)]
        map: MapArgs,

        #[command(flatten)]
        schedule: ScheduleArgs,

        /// Time constants to compare
        #[arg(long, value_delimiter = ',', default_value = "1000,10000,100000")]
        taus: Vec<f64>,

        /// Number of runs per tau
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Seed of the first run
        #[arg(long, default_value = "0")]
        base_seed: u64,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Run sequentially
        #[arg(long)]
        sequential: bool,
    },

    /// Print statistics about a map
    Analyze {
        #[command(flatten)]
        map: MapArgs,
    },
}

#[derive(Args)]
struct MapArgs {
    /// Number of random cities
    #[arg(short = 'n', long, default_value_t = DEFAULT_NUM_CITIES)]
    cities: usize,

    /// Random seed of the city layout
    #[arg(long, default_value_t = DEFAULT_MAP_SEED)]
    map_seed: u64,

    /// Load cities from a TSPLIB file instead
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct ScheduleArgs {
    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial temperature
    #[arg(long)]
    t_max: Option<f64>,

    /// Final temperature
    #[arg(long)]
    t_min: Option<f64>,

    /// Schedule time constant
    #[arg(long)]
    tau: Option<f64>,

    /// Iterations between progress records
    #[arg(long)]
    report_interval: Option<usize>,

    /// Hard cap on iterations
    #[arg(long)]
    max_iterations: Option<usize>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum InitialArg {
    /// Cities in index order
    Identity,
    /// Random permutation
    Random,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum ReportArg {
    /// Shortest tour seen during the run
    Best,
    /// Tour at the end of the schedule
    Final,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum ProgressArg {
    /// One line per record on stdout
    Lines,
    /// Progress bar
    Bar,
    /// Through the logger (RUST_LOG=info)
    Log,
    /// Nothing
    Quiet,
}

impl MapArgs {
    fn load(&self) -> Result<CityMap> {
        match &self.file {
            Some(path) => CityMap::from_file(path)
                .with_context(|| format!("Error loading cities from {:?}", path)),
            None => Ok(CityMap::random(self.cities, self.map_seed)),
        }
    }
}

impl ScheduleArgs {
    fn build(&self) -> Result<AnnealingConfig> {
        let mut config = match &self.config {
            Some(path) => AnnealingConfig::from_json_file(path)
                .with_context(|| format!("Error reading configuration {:?}", path))?,
            None => AnnealingConfig::default(),
        };

        if let Some(t_max) = self.t_max {
            config.t_max = t_max;
        }
        if let Some(t_min) = self.t_min {
            config.t_min = t_min;
        }
        if let Some(tau) = self.tau {
            config.tau = tau;
        }
        if let Some(interval) = self.report_interval {
            config.report_interval = interval;
        }
        if self.max_iterations.is_some() {
            config.max_iterations = self.max_iterations;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            map,
            schedule,
            seed,
            initial,
            restarts,
            report,
            progress,
            output,
            visualize,
            png,
            verbose,
        } => {
            let mut config = schedule.build()?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            match initial {
                Some(InitialArg::Identity) => config.initial_tour = InitialTour::Identity,
                Some(InitialArg::Random) => config.initial_tour = InitialTour::Random,
                None => {}
            }
            let choice = match report {
                ReportArg::Best => TourChoice::Best,
                ReportArg::Final => TourChoice::Final,
            };
            let city_map = map.load()?;

            solve(
                &city_map,
                config,
                restarts,
                choice,
                progress,
                output,
                visualize,
                png,
                verbose,
            )
        }

        Commands::Benchmark {
            map,
            schedule,
            taus,
            runs,
            base_seed,
            output,
            sequential,
        } => {
            let city_map = map.load()?;
            let config = BenchmarkConfig {
                taus,
                num_runs: runs,
                base_seed,
                annealing: schedule.build()?,
                parallel: !sequential,
            };
            run_benchmark(&city_map, config, &output)
        }

        Commands::Analyze { map } => {
            let city_map = map.load()?;
            println!("========== Map Analysis ==========\n");
            println!("{}", city_map.statistics());
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn solve(
    map: &CityMap,
    config: AnnealingConfig,
    restarts: usize,
    choice: TourChoice,
    progress: ProgressArg,
    output: Option<PathBuf>,
    visualize: Option<PathBuf>,
    png: bool,
    verbose: bool,
) -> Result<()> {
    config.validate()?;

    if verbose {
        println!("{}", map.statistics());
        println!("Configuration: {:?}", config);
    }

    println!("Simulating with {} Cities.", map.len());
    let mut reporter = progress_reporter(progress, &config);

    let (outcome, algorithm) = if restarts > 1 {
        let multi = MultiStartAnnealing::new(config.clone(), restarts).with_choice(choice);
        let result = multi.run(map)?;
        for (k, run) in result.runs.iter().enumerate() {
            println!(
                "Restart {} (seed {}): final {:.4}, best {:.4}",
                k,
                multi.restart_seed(k),
                run.final_length,
                run.best_length
            );
        }

        // restarts run silently in parallel; show the selected one afterwards
        let best = result.best().clone();
        println!(
            "\nSelected restart {} (seed {})",
            result.best_run,
            multi.restart_seed(result.best_run)
        );
        println!("Initial Total Distance is {:.4}", best.initial_length);
        best.replay(reporter.as_mut());
        (best, "MultiStartAnnealing")
    } else {
        let sa = SimulatedAnnealing::new(config.clone()).with_choice(choice);
        let initial = sa.initial_tour(map)?;
        println!("Initial Total Distance is {:.4}", map.tour_length(&initial));
        (sa.run_with_reporter(map, reporter.as_mut())?, "SimulatedAnnealing")
    };

    let solution = outcome.to_solution(choice, algorithm);
    print_results(&outcome, &solution, choice, verbose);

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&solution)?;
        std::fs::write(&out_path, json)
            .with_context(|| format!("Failed to write solution to {:?}", out_path))?;
        println!("\nSolution saved to {:?}", out_path);
    }

    if let Some(dir) = visualize {
        write_plots(map, &solution, &outcome, &config, &dir, png)?;
    }

    Ok(())
}

fn progress_reporter(progress: ProgressArg, config: &AnnealingConfig) -> Box<dyn ProgressReporter> {
    match progress {
        ProgressArg::Lines => Box::new(LineReporter::stdout()),
        ProgressArg::Bar => Box::new(ProgressBarReporter::new(config.scheduled_iterations())),
        ProgressArg::Log => Box::new(LogReporter),
        ProgressArg::Quiet => Box::new(NullReporter),
    }
}

fn print_results(outcome: &AnnealingOutcome, solution: &Solution, choice: TourChoice, verbose: bool) {
    println!("\n========== Results ==========");
    println!("Algorithm: {}", solution.algorithm);
    println!("Reported tour: {:?}", choice);
    println!("Initial distance: {:.4}", outcome.initial_length);
    println!("Final distance: {:.4}", outcome.final_length);
    println!(
        "Best distance: {:.4} (iteration {})",
        outcome.best_length, outcome.best_iteration
    );
    println!("Iterations: {}", outcome.iterations);
    println!(
        "Accepted moves: {} ({:.2}%), improving: {}",
        outcome.accepted_moves,
        outcome.acceptance_rate() * 100.0,
        outcome.improving_moves
    );
    println!("Final temperature: {:.6}", outcome.final_temperature);
    if outcome.stopped_by_cap {
        println!("Stopped by iteration cap");
    }
    println!("Time: {:.4}s", solution.computation_time);
    println!("\nTour: {:?}", solution.tour);

    if verbose {
        println!("\n{}", solution);
    }
}

fn write_plots(
    map: &CityMap,
    solution: &Solution,
    outcome: &AnnealingOutcome,
    config: &AnnealingConfig,
    dir: &Path,
    png: bool,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create plot directory {:?}", dir))?;

    let viz = Visualizer::new();
    let initial = Solution::from_tour(map, outcome.initial_tour.clone(), "Initial");
    let optimized_title = format!(
        "Optimized path (map seed {}, optimization seed {}, tau={:.2e})",
        map.seed.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
        config.seed,
        config.tau
    );
    let plots = [
        ("cities", viz.generate_layout_svg(map)),
        ("initial_path", viz.generate_tour_svg(map, &initial, "Initial path")),
        ("optimized_path", viz.generate_tour_svg(map, solution, &optimized_title)),
        ("cost_curve", viz.generate_cost_curve_svg(&outcome.history)),
    ];

    for (name, svg) in plots.iter() {
        let svg_path = dir.join(format!("{}.svg", name));
        if png {
            let png_path = dir.join(format!("{}.png", name));
            match viz.save_png(svg, &png_path) {
                Ok(()) => {
                    println!("Visualization saved to {:?}", png_path);
                    continue;
                }
                Err(e) => println!("PNG conversion failed ({}). Saving SVG instead.", e),
            }
        }
        viz.save_svg(svg, &svg_path)
            .with_context(|| format!("Failed to save {:?}", svg_path))?;
        println!("Visualization saved to {:?}", svg_path);
    }

    let data_path = dir.join("plot_data.csv");
    std::fs::write(&data_path, viz.export_plot_data(map, solution))
        .with_context(|| format!("Failed to save {:?}", data_path))?;

    Ok(())
}

fn run_benchmark(map: &CityMap, config: BenchmarkConfig, output: &Path) -> Result<()> {
    println!("Benchmarking on {} ({} cities)...", map.name, map.len());

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {:?}", output))?;

    let mut benchmark = Benchmark::new(config);
    benchmark.run_on_map(map)?;

    let results_path = output.join("results.csv");
    benchmark
        .export_to_csv(&results_path)
        .context("Failed to export results")?;
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    benchmark
        .export_statistics_csv(&stats_path)
        .context("Failed to export statistics")?;
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report).context("Failed to save report")?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}
