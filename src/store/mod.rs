//! Relational persistence for loans, portfolios and ECL results
//!
//! Results are written as one summary row in `ecl_results` plus one row per month in
//! `ecl_monthly_projections`, inside a single transaction.

mod sqlite;
mod types;

pub use sqlite::EclStore;
pub use types::{ProjectionRow, StoredEclResult};
