//! Row types returned by the store

use crate::ecl::MonthlyProjection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of `ecl_monthly_projections`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub month: u32,
    pub ead: f64,
    pub marginal_pd: f64,
    pub discount_factor: f64,
    pub ecl: f64,
}

impl From<MonthlyProjection> for ProjectionRow {
    fn from(p: MonthlyProjection) -> Self {
        Self {
            month: p.month,
            ead: p.ead,
            marginal_pd: p.marginal_pd,
            discount_factor: p.discount_factor,
            ecl: p.ecl,
        }
    }
}

/// A persisted ECL calculation with its monthly projections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEclResult {
    pub id: i64,
    pub loan_id: i64,
    pub total_ecl: f64,
    pub calculated_at: DateTime<Utc>,
    pub pd_benchmark_version: Option<i64>,
    pub notes: Option<String>,
    pub monthly_projections: Vec<ProjectionRow>,
}

impl StoredEclResult {
    /// Monthly ECL values in month order
    pub fn monthly_breakdown(&self) -> Vec<f64> {
        self.monthly_projections.iter().map(|p| p.ecl).collect()
    }
}
