//! Monte Carlo default simulation under a constant annual hazard rate
//!
//! A loan defaults within `T` years when a uniform draw falls below
//! `1 - exp(-hazard * T)`. Used to sanity-check hazard assumptions against
//! realised default counts on large synthetic books.

use crate::config::EngineConfig;
use crate::error::EngineResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Probability of default within `horizon_years` at a constant annual hazard
pub fn hazard_default_probability(hazard_rate: f64, horizon_years: f64) -> f64 {
    1.0 - (-hazard_rate * horizon_years).exp()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub n_loans: u64,
    pub hazard_rate: f64,
    pub horizon_years: f64,
    /// Chunks for the parallel run
    pub n_jobs: usize,
    pub seed: Option<u64>,
}

impl SimulationConfig {
    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self {
            n_loans: config.n_loans,
            hazard_rate: config.hazard_rate,
            horizon_years: 1.0,
            n_jobs: config.n_jobs,
            seed: config.simulation_seed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationMethod {
    Sequential,
    Parallel { chunks: usize },
    Distributed { jobs: usize },
}

impl fmt::Display for SimulationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationMethod::Sequential => write!(f, "Sequential loop"),
            SimulationMethod::Parallel { chunks } => write!(f, "Parallel (rayon, {chunks} chunks)"),
            SimulationMethod::Distributed { jobs } => write!(f, "Distributed (redis, {jobs} jobs)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub defaults: u64,
    pub total_loans: u64,
    pub default_rate: f64,
    pub time_taken_seconds: f64,
    pub method: SimulationMethod,
}

impl SimulationResult {
    pub(crate) fn new(defaults: u64, total_loans: u64, start: Instant, method: SimulationMethod) -> Self {
        let default_rate = if total_loans > 0 {
            defaults as f64 / total_loans as f64
        } else {
            0.0
        };
        Self {
            defaults,
            total_loans,
            default_rate,
            time_taken_seconds: start.elapsed().as_secs_f64(),
            method,
        }
    }

    pub fn report(&self) -> String {
        format!(
            "Simulation Results\n{}\nTotal Loans: {}\nDefaults: {}\nDefault Rate: {:.6} ({:.4}%)\nTime Taken: {:.4} seconds\nMethod: {}\n",
            "=".repeat(50),
            self.total_loans,
            self.defaults,
            self.default_rate,
            self.default_rate * 100.0,
            self.time_taken_seconds,
            self.method,
        )
    }

    pub fn write_report<P: AsRef<Path>>(&self, path: P) -> EngineResult<()> {
        let mut file = File::create(path)?;
        file.write_all(self.report().as_bytes())?;
        Ok(())
    }
}

fn count_defaults(n: u64, pd: f64, rng: &mut StdRng) -> u64 {
    (0..n).filter(|_| rng.gen::<f64>() < pd).count() as u64
}

/// Defaults among `n` loans drawn from an RNG seeded with `seed`
pub fn simulate_chunk(n: u64, pd: f64, seed: u64) -> u64 {
    let mut rng = StdRng::seed_from_u64(seed);
    count_defaults(n, pd, &mut rng)
}

/// Seed for chunk `index` of a run started from `seed`
pub fn chunk_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(index as u64)
}

pub(crate) fn base_seed(config: &SimulationConfig) -> u64 {
    config.seed.unwrap_or_else(rand::random)
}

/// One draw per loan on a single thread
pub fn run_sequential(config: &SimulationConfig) -> SimulationResult {
    let start = Instant::now();
    let pd = hazard_default_probability(config.hazard_rate, config.horizon_years);
    let mut rng = StdRng::seed_from_u64(base_seed(config));

    let defaults = count_defaults(config.n_loans, pd, &mut rng);
    SimulationResult::new(defaults, config.n_loans, start, SimulationMethod::Sequential)
}

/// Split the book into `n_jobs` chunks, each drawing from its own seeded RNG
pub fn run_parallel(config: &SimulationConfig) -> SimulationResult {
    let start = Instant::now();
    let pd = hazard_default_probability(config.hazard_rate, config.horizon_years);
    let seed = base_seed(config);
    let chunks = chunk_sizes(config.n_loans, config.n_jobs);

    let defaults: u64 = chunks
        .par_iter()
        .enumerate()
        .map(|(i, &n)| simulate_chunk(n, pd, chunk_seed(seed, i)))
        .sum();

    log::debug!("simulated {} loans across {} chunks", config.n_loans, chunks.len());
    SimulationResult::new(
        defaults,
        config.n_loans,
        start,
        SimulationMethod::Parallel {
            chunks: chunks.len(),
        },
    )
}

/// Equal chunk sizes with the remainder added to the last chunk
pub fn chunk_sizes(n_loans: u64, n_jobs: usize) -> Vec<u64> {
    let jobs = n_jobs.max(1) as u64;
    let base = n_loans / jobs;
    let mut sizes = vec![base; jobs as usize];
    if let Some(last) = sizes.last_mut() {
        *last += n_loans % jobs;
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config(n_loans: u64, hazard_rate: f64) -> SimulationConfig {
        SimulationConfig {
            n_loans,
            hazard_rate,
            horizon_years: 1.0,
            n_jobs: 8,
            seed: Some(7),
        }
    }

    #[test]
    fn test_hazard_probability() {
        assert_abs_diff_eq!(hazard_default_probability(0.05, 1.0), 0.048771, epsilon = 1e-6);
        assert_eq!(hazard_default_probability(0.0, 5.0), 0.0);
    }

    #[test]
    fn test_chunk_sizes_cover_all_loans() {
        assert_eq!(chunk_sizes(100, 10), vec![10; 10]);
        assert_eq!(chunk_sizes(103, 4), vec![25, 25, 25, 28]);
        assert_eq!(chunk_sizes(3, 5), vec![0, 0, 0, 0, 3]);
        assert_eq!(chunk_sizes(10, 0), vec![10]);
    }

    #[test]
    fn test_default_rate_tracks_hazard() {
        let cfg = config(200_000, 0.05);
        let expected = hazard_default_probability(0.05, 1.0);

        let seq = run_sequential(&cfg);
        let par = run_parallel(&cfg);
        assert_eq!(seq.total_loans, 200_000);
        assert_eq!(par.method, SimulationMethod::Parallel { chunks: 8 });
        assert!((seq.default_rate - expected).abs() < 0.003, "sequential {}", seq.default_rate);
        assert!((par.default_rate - expected).abs() < 0.003, "parallel {}", par.default_rate);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let cfg = config(50_000, 0.1);
        assert_eq!(run_parallel(&cfg).defaults, run_parallel(&cfg).defaults);
        assert_eq!(run_sequential(&cfg).defaults, run_sequential(&cfg).defaults);
    }

    #[test]
    fn test_degenerate_hazards() {
        assert_eq!(run_parallel(&config(1_000, 0.0)).defaults, 0);
        assert_eq!(run_sequential(&config(1_000, 1_000.0)).defaults, 1_000);
        assert_eq!(run_sequential(&config(0, 0.05)).default_rate, 0.0);
    }

    #[test]
    fn test_write_report() {
        let result = run_sequential(&config(1_000, 0.05));
        let path = std::env::temp_dir().join(format!("ecl_sim_report_{}.txt", std::process::id()));
        result.write_report(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Simulation Results"));
        assert!(text.contains("Total Loans: 1000"));
        assert!(text.contains("Method: Sequential loop"));
        std::fs::remove_file(&path).ok();
    }
}
