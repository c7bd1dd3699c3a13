//! ECL Engine - Expected Credit Loss calculations for loan books
//!
//! This library provides:
//! - Amortization (EAD), constant-hazard PD decay and EIR discounting engines
//! - Per-month and total ECL composition, with IFRS 9 stage horizons
//! - Transactional persistence of results in SQLite
//! - Parallel portfolio runs and a Monte Carlo default simulation, in-process
//!   or spread over worker processes through a Redis job queue

pub mod batch;
pub mod config;
pub mod ecl;
pub mod error;
pub mod loan;
pub mod queue;
pub mod service;
pub mod simulation;
pub mod store;

// Re-export commonly used types
pub use batch::{EclRunner, PortfolioSummary};
pub use config::EngineConfig;
pub use ecl::{calculate_ecl, total_ecl, EclResult, MonthlyProjection};
pub use error::{EngineError, EngineResult};
pub use loan::{Loan, Portfolio, Stage};
pub use service::EclService;
pub use store::{EclStore, StoredEclResult};
