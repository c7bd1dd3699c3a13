//! Command-line interface for ECL calculations and the result store
//!
//! Defaults come from the environment (`.env` supported); flags override them.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ecl_engine::ecl::calculate_staged_ecl;
use ecl_engine::loan::load_loans;
use ecl_engine::queue::{plan_jobs, JobQueue};
use ecl_engine::simulation::{
    hazard_default_probability, run_parallel, run_sequential, SimulationConfig,
};
use ecl_engine::{calculate_ecl, EclService, EclStore, EngineConfig, Loan};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ecl_cli", version, about = "Expected Credit Loss calculations")]
struct Cli {
    /// SQLite database (defaults to ECL_DATABASE_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute ECL for a loan given on the command line
    Compute {
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        rate: f64,
        #[arg(long)]
        pd: f64,
        #[arg(long)]
        lgd: f64,
        #[arg(long)]
        eir: f64,
        #[arg(long)]
        months: u32,
        /// IFRS 9 stage (1 = 12-month ECL, 2 or 3 = lifetime)
        #[arg(long)]
        stage: Option<u8>,
    },
    /// Import a CSV loan tape into the store
    Import {
        /// Loan tape (defaults to ECL_LOANS_CSV)
        path: Option<PathBuf>,
    },
    /// Compute and store ECL for a stored loan
    Store { loan_id: i64 },
    /// Show the latest stored ECL result for a loan
    Show { loan_id: i64 },
    /// Portfolio management
    Portfolio {
        #[command(subcommand)]
        action: PortfolioAction,
    },
    /// Monte Carlo default simulation
    Simulate {
        #[arg(long)]
        loans: Option<u64>,
        #[arg(long)]
        jobs: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Also run the single-threaded loop for comparison
        #[arg(long)]
        compare: bool,
        /// Write a plain-text report here
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Push simulation jobs to Redis and wait for the workers' results
    SimulateProduce {
        #[arg(long)]
        loans: Option<u64>,
        #[arg(long)]
        jobs: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Seconds to wait for each result (0 waits forever)
        #[arg(long, default_value_t = 0.0)]
        timeout: f64,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Pop simulation jobs from Redis and push back default counts
    SimulateWorker {
        /// Exit after this many jobs instead of running until killed
        #[arg(long)]
        max_jobs: Option<usize>,
    },
}

#[derive(Subcommand)]
enum PortfolioAction {
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    /// Compute and store ECL for every loan in a portfolio
    Run { portfolio_id: i64 },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn simulation_config(
    config: &EngineConfig,
    loans: Option<u64>,
    jobs: Option<usize>,
    seed: Option<u64>,
) -> SimulationConfig {
    let mut sim = SimulationConfig::from_engine_config(config);
    if let Some(n) = loans {
        sim.n_loans = n;
    }
    if let Some(j) = jobs {
        sim.n_jobs = j;
    }
    if seed.is_some() {
        sim.seed = seed;
    }
    sim
}

fn open_service(config: &EngineConfig) -> anyhow::Result<EclService> {
    let store = EclStore::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    Ok(EclService::new(store))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = EngineConfig::from_env()?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    match cli.command {
        Commands::Compute { amount, rate, pd, lgd, eir, months, stage } => {
            let mut loan = Loan::new(amount, rate, pd, lgd, eir, months);
            if let Some(n) = stage {
                let Some(stage) = ecl_engine::Stage::from_number(n) else {
                    bail!("unknown stage {n}");
                };
                loan = loan.with_stage(stage);
                let (horizon, result) = calculate_staged_ecl(&loan)?;
                log::info!("stage {n} horizon: {} months", horizon.months());
                print_json(&result)?;
            } else {
                print_json(&calculate_ecl(&loan)?)?;
            }
        }
        Commands::Import { path } => {
            let path = path.unwrap_or_else(|| config.loans_csv.clone());
            let loans = load_loans(&path).with_context(|| format!("loading {}", path.display()))?;
            let service = open_service(&config)?;
            let mut ids = Vec::with_capacity(loans.len());
            for loan in &loans {
                ids.push(service.add_loan(loan).with_context(|| format!("loan {}", loan.loan_id))?);
            }
            println!("Imported {} loans (ids {:?})", ids.len(), ids);
        }
        Commands::Store { loan_id } => {
            let mut service = open_service(&config)?;
            match service.calculate_and_store_ecl(loan_id)? {
                Some(stored) => print_json(&stored)?,
                None => bail!("loan {loan_id} not found"),
            }
        }
        Commands::Show { loan_id } => {
            let service = open_service(&config)?;
            match service.get_ecl_result(loan_id)? {
                Some(stored) => print_json(&stored)?,
                None => bail!("no ECL result for loan {loan_id}"),
            }
        }
        Commands::Portfolio { action } => {
            let mut service = open_service(&config)?;
            match action {
                PortfolioAction::Create { name, description } => {
                    print_json(&service.create_portfolio(&name, description.as_deref())?)?;
                }
                PortfolioAction::List => print_json(&service.list_portfolios()?)?,
                PortfolioAction::Run { portfolio_id } => {
                    match service.calculate_portfolio(portfolio_id)? {
                        Some(run) => {
                            println!(
                                "Portfolio {}: {} loans, total ECL {:.2}, failed {:?}",
                                run.portfolio.name,
                                run.results.len(),
                                run.total_ecl(),
                                run.failed_loan_ids
                            );
                        }
                        None => bail!("portfolio {portfolio_id} not found"),
                    }
                }
            }
        }
        Commands::Simulate { loans, jobs, seed, compare, report } => {
            let sim = simulation_config(&config, loans, jobs, seed);

            println!("Starting simulation for {} loans ...", sim.n_loans);
            let parallel = run_parallel(&sim);
            print!("{}", parallel.report());

            if compare {
                let sequential = run_sequential(&sim);
                println!();
                print!("{}", sequential.report());
            }

            if let Some(path) = report {
                parallel
                    .write_report(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("\nResults saved to {}", path.display());
            }
        }
        Commands::SimulateProduce { loans, jobs, seed, timeout, report } => {
            let sim = simulation_config(&config, loans, jobs, seed);
            let jobs = plan_jobs(&sim);
            let mut queue = JobQueue::connect(&config.redis_url())?;

            println!("Pushing {} jobs for {} loans ...", jobs.len(), sim.n_loans);
            let result = queue.run_distributed(&jobs, timeout)?;
            print!("{}", result.report());

            if let Some(path) = report {
                result
                    .write_report(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("\nResults saved to {}", path.display());
            }
        }
        Commands::SimulateWorker { max_jobs } => {
            let sim = SimulationConfig::from_engine_config(&config);
            let default_pd = hazard_default_probability(sim.hazard_rate, sim.horizon_years);
            let mut queue = JobQueue::connect(&config.redis_url())?;
            println!("Waiting for jobs ...");
            let done = queue.run_worker(default_pd, max_jobs)?;
            println!("Processed {done} jobs");
        }
    }

    Ok(())
}
