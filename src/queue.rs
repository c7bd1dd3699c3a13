//! Redis job queue for running the default simulation across processes
//!
//! A producer splits the book into [`Job`]s and pushes them onto [`JOBS_QUEUE`].
//! Workers pop a job, simulate its chunk and push a [`JobResult`] onto
//! [`RESULTS_QUEUE`]. Payloads are JSON, so bare `{"id", "load"}` jobs from other
//! producers are accepted.

use crate::error::{EngineError, EngineResult};
use crate::simulation::{
    base_seed, chunk_seed, chunk_sizes, hazard_default_probability, simulate_chunk,
    SimulationConfig, SimulationMethod, SimulationResult,
};
use redis::Commands;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

pub const JOBS_QUEUE: &str = "simulation_jobs";
pub const RESULTS_QUEUE: &str = "simulation_results";

/// Seconds a worker blocks on an empty queue before polling again
pub const WORKER_POLL_SECS: f64 = 1.0;

/// One chunk of the simulated book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// 1-based job number
    pub id: u32,
    /// Number of loans to simulate
    pub load: u64,
    /// Default probability over the horizon; workers use their own when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub id: u32,
    pub defaults: u64,
}

/// Split a simulation into jobs numbered from 1
///
/// Seeds follow [`crate::simulation::run_parallel`], so a seeded run gives the
/// same default count whether it is run in-process or through the queue.
pub fn plan_jobs(config: &SimulationConfig) -> Vec<Job> {
    let pd = hazard_default_probability(config.hazard_rate, config.horizon_years);
    let seed = base_seed(config);
    chunk_sizes(config.n_loans, config.n_jobs)
        .into_iter()
        .enumerate()
        .map(|(i, load)| Job {
            id: i as u32 + 1,
            load,
            pd: Some(pd),
            seed: Some(chunk_seed(seed, i)),
        })
        .collect()
}

/// Simulate one job; `default_pd` covers jobs that carry no PD
pub fn process_job(job: &Job, default_pd: f64) -> JobResult {
    let pd = job.pd.unwrap_or(default_pd);
    let seed = job.seed.unwrap_or_else(rand::random);
    JobResult {
        id: job.id,
        defaults: simulate_chunk(job.load, pd, seed),
    }
}

/// Combine worker results into a simulation result
///
/// Every job must have exactly one result; results for unknown jobs are rejected.
pub fn combine_results(
    jobs: &[Job],
    results: &[JobResult],
    start: Instant,
) -> EngineResult<SimulationResult> {
    let mut by_id: BTreeMap<u32, u64> = BTreeMap::new();
    for result in results {
        if !jobs.iter().any(|job| job.id == result.id) {
            return Err(EngineError::Queue(format!("result for unknown job {}", result.id)));
        }
        if by_id.insert(result.id, result.defaults).is_some() {
            return Err(EngineError::Queue(format!("duplicate result for job {}", result.id)));
        }
    }
    if let Some(missing) = jobs.iter().find(|job| !by_id.contains_key(&job.id)) {
        return Err(EngineError::Queue(format!("no result for job {}", missing.id)));
    }

    let total_loans = jobs.iter().map(|job| job.load).sum();
    let defaults = by_id.values().sum();
    Ok(SimulationResult::new(
        defaults,
        total_loans,
        start,
        SimulationMethod::Distributed { jobs: jobs.len() },
    ))
}

fn encode<T: Serialize>(value: &T) -> EngineResult<String> {
    serde_json::to_string(value).map_err(|e| EngineError::Queue(format!("encoding payload: {e}")))
}

fn decode<T: for<'de> Deserialize<'de>>(payload: &str) -> EngineResult<T> {
    serde_json::from_str(payload)
        .map_err(|e| EngineError::Queue(format!("malformed payload {payload:?}: {e}")))
}

/// Connection to the Redis server holding both queues
pub struct JobQueue {
    conn: redis::Connection,
}

impl JobQueue {
    pub fn connect(url: &str) -> EngineResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection()?;
        log::info!("connected to {url}");
        Ok(Self { conn })
    }

    /// Drop leftover results from an earlier run
    pub fn clear_results(&mut self) -> EngineResult<()> {
        let _: () = self.conn.del(RESULTS_QUEUE)?;
        Ok(())
    }

    pub fn push_jobs(&mut self, jobs: &[Job]) -> EngineResult<()> {
        for job in jobs {
            let _: () = self.conn.rpush(JOBS_QUEUE, encode(job)?)?;
            log::debug!("pushed job {}: load={}", job.id, job.load);
        }
        Ok(())
    }

    pub fn push_result(&mut self, result: &JobResult) -> EngineResult<()> {
        let _: () = self.conn.rpush(RESULTS_QUEUE, encode(result)?)?;
        Ok(())
    }

    /// Block up to `timeout_secs` for the next job (0 waits forever)
    pub fn pop_job(&mut self, timeout_secs: f64) -> EngineResult<Option<Job>> {
        self.blocking_pop(JOBS_QUEUE, timeout_secs)
    }

    /// Block up to `timeout_secs` for the next result (0 waits forever)
    pub fn pop_result(&mut self, timeout_secs: f64) -> EngineResult<Option<JobResult>> {
        self.blocking_pop(RESULTS_QUEUE, timeout_secs)
    }

    fn blocking_pop<T: for<'de> Deserialize<'de>>(
        &mut self,
        queue: &str,
        timeout_secs: f64,
    ) -> EngineResult<Option<T>> {
        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(queue)
            .arg(timeout_secs)
            .query(&mut self.conn)?;
        popped.map(|(_, payload)| decode(&payload)).transpose()
    }

    /// Wait for one result per job; each wait is bounded by `timeout_secs`
    pub fn wait_for_results(&mut self, jobs: &[Job], timeout_secs: f64) -> EngineResult<Vec<JobResult>> {
        let mut results = Vec::with_capacity(jobs.len());
        while results.len() < jobs.len() {
            match self.pop_result(timeout_secs)? {
                Some(result) => {
                    log::info!("job {} finished: {} defaults", result.id, result.defaults);
                    results.push(result);
                }
                None => {
                    return Err(EngineError::Queue(format!(
                        "timed out after {}/{} results",
                        results.len(),
                        jobs.len()
                    )))
                }
            }
        }
        Ok(results)
    }

    /// Push `jobs` and block until every result is back
    pub fn run_distributed(
        &mut self,
        jobs: &[Job],
        timeout_secs: f64,
    ) -> EngineResult<SimulationResult> {
        let start = Instant::now();
        self.clear_results()?;
        self.push_jobs(jobs)?;
        log::info!("pushed {} jobs to {JOBS_QUEUE}", jobs.len());
        let results = self.wait_for_results(jobs, timeout_secs)?;
        combine_results(jobs, &results, start)
    }

    /// Process jobs until `max_jobs` are done, or forever when `None`
    pub fn run_worker(&mut self, default_pd: f64, max_jobs: Option<usize>) -> EngineResult<usize> {
        let mut done = 0;
        while max_jobs.map_or(true, |max| done < max) {
            let Some(job) = self.pop_job(WORKER_POLL_SECS)? else {
                continue;
            };
            let start = Instant::now();
            let result = process_job(&job, default_pd);
            self.push_result(&result)?;
            done += 1;
            log::info!(
                "job {}: {} defaults in {} loans ({:?})",
                job.id,
                result.defaults,
                job.load,
                start.elapsed()
            );
        }
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::run_parallel;

    fn config(n_loans: u64, n_jobs: usize) -> SimulationConfig {
        SimulationConfig {
            n_loans,
            hazard_rate: 0.05,
            horizon_years: 1.0,
            n_jobs,
            seed: Some(11),
        }
    }

    #[test]
    fn test_jobs_cover_book_with_one_based_ids() {
        let jobs = plan_jobs(&config(1_003, 4));
        let ids: Vec<u32> = jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(jobs.iter().map(|j| j.load).sum::<u64>(), 1_003);
        assert_eq!(jobs[3].load, 253);

        let pd = hazard_default_probability(0.05, 1.0);
        assert!(jobs.iter().all(|j| j.pd == Some(pd)));
        assert_eq!(jobs[0].seed, Some(11));
        assert_eq!(jobs[3].seed, Some(14));
    }

    #[test]
    fn test_job_payloads() {
        let job: Job = serde_json::from_str(r#"{"id": 3, "load": 10000000}"#).unwrap();
        assert_eq!(job, Job { id: 3, load: 10_000_000, pd: None, seed: None });
        assert_eq!(serde_json::to_string(&job).unwrap(), r#"{"id":3,"load":10000000}"#);

        let result: JobResult = serde_json::from_str(r#"{"id": 3, "defaults": 487}"#).unwrap();
        assert_eq!(result, JobResult { id: 3, defaults: 487 });
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"{"id":3,"defaults":487}"#);

        let seeded = Job { id: 1, load: 5, pd: Some(0.5), seed: Some(9) };
        let back: Job = decode(&encode(&seeded).unwrap()).unwrap();
        assert_eq!(back, seeded);

        let err = decode::<Job>(r#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, EngineError::Queue(_)));
    }

    #[test]
    fn test_local_processing_matches_parallel_run() {
        let cfg = config(40_000, 5);
        let jobs = plan_jobs(&cfg);
        let results: Vec<JobResult> = jobs.iter().map(|j| process_job(j, 0.0)).collect();

        let combined = combine_results(&jobs, &results, Instant::now()).unwrap();
        assert_eq!(combined.total_loans, 40_000);
        assert_eq!(combined.defaults, run_parallel(&cfg).defaults);
        assert_eq!(combined.method, SimulationMethod::Distributed { jobs: 5 });
    }

    #[test]
    fn test_bare_job_uses_worker_pd() {
        let job = Job { id: 1, load: 1_000, pd: None, seed: Some(3) };
        assert_eq!(process_job(&job, 1.5).defaults, 1_000);
        assert_eq!(process_job(&job, 0.0).defaults, 0);
    }

    #[test]
    fn test_combine_rejects_incomplete_or_foreign_results() {
        let jobs = plan_jobs(&config(100, 2));
        let one = JobResult { id: 1, defaults: 4 };
        let two = JobResult { id: 2, defaults: 6 };

        assert!(combine_results(&jobs, &[one], Instant::now()).is_err());
        assert!(combine_results(&jobs, &[one, one, two], Instant::now()).is_err());
        assert!(combine_results(&jobs, &[one, two, JobResult { id: 9, defaults: 1 }], Instant::now()).is_err());

        let ok = combine_results(&jobs, &[two, one], Instant::now()).unwrap();
        assert_eq!(ok.defaults, 10);
        assert_eq!(ok.total_loans, 100);
    }
}
