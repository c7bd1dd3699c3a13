//! Runtime configuration loaded from the environment (and `.env` if present)

use crate::error::{EngineError, EngineResult};
use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "ecl.db";
pub const DEFAULT_LOANS_CSV: &str = "loans.csv";
pub const DEFAULT_N_LOANS: u64 = 100_000_000;
pub const DEFAULT_N_JOBS: usize = 10;
pub const DEFAULT_HAZARD_RATE: f64 = 0.05;
pub const DEFAULT_REDIS_HOST: &str = "localhost";
pub const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Loan tape used by the batch runner and `import`
    pub loans_csv: PathBuf,

    /// Number of simulated loans in the default simulation
    pub n_loans: u64,

    /// Number of chunks the parallel simulation is split into
    pub n_jobs: usize,

    /// Annual hazard rate used by the default simulation
    pub hazard_rate: f64,

    /// Fixed seed for reproducible simulations
    pub simulation_seed: Option<u64>,

    /// Redis server holding the distributed simulation queues
    pub redis_host: String,
    pub redis_port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            loans_csv: PathBuf::from(DEFAULT_LOANS_CSV),
            n_loans: DEFAULT_N_LOANS,
            n_jobs: DEFAULT_N_JOBS,
            hazard_rate: DEFAULT_HAZARD_RATE,
            simulation_seed: None,
            redis_host: DEFAULT_REDIS_HOST.to_string(),
            redis_port: DEFAULT_REDIS_PORT,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let n_loans = parse_or(&lookup, "N_LOANS", defaults.n_loans)?;
        let n_jobs = parse_or(&lookup, "N_JOBS", defaults.n_jobs)?;
        if n_jobs == 0 {
            return Err(EngineError::Config("N_JOBS: must be at least 1".into()));
        }
        let hazard_rate = parse_or(&lookup, "HAZARD_RATE", defaults.hazard_rate)?;
        let redis_port = parse_or(&lookup, "REDIS_PORT", defaults.redis_port)?;

        let simulation_seed = match lookup("SIMULATION_SEED") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| EngineError::Config(format!("SIMULATION_SEED: {e}")))?,
            ),
            None => None,
        };

        Ok(Self {
            database_path: lookup("ECL_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            loans_csv: lookup("ECL_LOANS_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.loans_csv),
            n_loans,
            n_jobs,
            hazard_rate,
            simulation_seed,
            redis_host: lookup("REDIS_HOST").unwrap_or(defaults.redis_host),
            redis_port,
        })
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_host, self.redis_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> EngineResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| EngineError::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.n_loans, DEFAULT_N_LOANS);
        assert_eq!(config.n_jobs, DEFAULT_N_JOBS);
        assert_eq!(config.database_path, PathBuf::from("ecl.db"));
        assert!(config.simulation_seed.is_none());
        assert_eq!(config.redis_url(), "redis://localhost:6379/");
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("N_LOANS", "5000"),
            ("N_JOBS", "4"),
            ("HAZARD_RATE", "0.02"),
            ("SIMULATION_SEED", "42"),
            ("ECL_DATABASE_PATH", "/tmp/test.db"),
            ("REDIS_HOST", "queue.internal"),
            ("REDIS_PORT", "6380"),
        ]))
        .unwrap();

        assert_eq!(config.n_loans, 5000);
        assert_eq!(config.n_jobs, 4);
        assert!((config.hazard_rate - 0.02).abs() < 1e-12);
        assert_eq!(config.simulation_seed, Some(42));
        assert_eq!(config.database_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.redis_url(), "redis://queue.internal:6380/");
    }

    #[test]
    fn test_bad_value_names_variable() {
        let err = EngineConfig::from_lookup(lookup_from(&[("N_LOANS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("N_LOANS"));

        let err = EngineConfig::from_lookup(lookup_from(&[("REDIS_PORT", "70000")])).unwrap_err();
        assert!(err.to_string().contains("REDIS_PORT"));

        let err = EngineConfig::from_lookup(lookup_from(&[("N_JOBS", "0")])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
