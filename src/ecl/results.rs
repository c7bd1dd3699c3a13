//! ECL output structures

use serde::{Deserialize, Serialize};

/// Total ECL with its monthly breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalEcl {
    pub total: f64,
    pub monthly: Vec<f64>,
}

/// One month of an ECL projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProjection {
    /// Month number (1-indexed)
    pub month: u32,
    /// Exposure at default
    pub ead: f64,
    pub marginal_pd: f64,
    pub lgd: f64,
    pub discount_factor: f64,
    pub ecl: f64,
}

/// Complete ECL calculation for one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EclResult {
    pub loan_id: i64,
    pub lgd: f64,
    pub total_ecl: f64,
    pub monthly_breakdown: Vec<f64>,
    pub ead: Vec<f64>,
    pub marginal_pd: Vec<f64>,
    pub discount_factors: Vec<f64>,
}

impl EclResult {
    pub fn months(&self) -> u32 {
        self.monthly_breakdown.len() as u32
    }

    /// Row-per-month view of the parallel series
    pub fn projections(&self) -> Vec<MonthlyProjection> {
        self.ead
            .iter()
            .zip(&self.marginal_pd)
            .zip(&self.discount_factors)
            .zip(&self.monthly_breakdown)
            .enumerate()
            .map(|(i, (((&ead, &pd), &df), &ecl))| MonthlyProjection {
                month: i as u32 + 1,
                ead,
                marginal_pd: pd,
                lgd: self.lgd,
                discount_factor: df,
                ecl,
            })
            .collect()
    }

    pub fn summary(&self) -> EclSummary {
        let (peak_month, peak_monthly_ecl) = self
            .monthly_breakdown
            .iter()
            .enumerate()
            .fold((0u32, 0.0_f64), |(best_m, best), (i, &ecl)| {
                if best_m == 0 || ecl > best {
                    (i as u32 + 1, ecl)
                } else {
                    (best_m, best)
                }
            });

        let cumulative_pd: f64 = self.marginal_pd.iter().sum();
        let discounted_expected_exposure: f64 = self
            .ead
            .iter()
            .zip(&self.marginal_pd)
            .zip(&self.discount_factors)
            .map(|((ead, pd), df)| ead * pd * df)
            .sum();

        EclSummary {
            loan_id: self.loan_id,
            months: self.months(),
            total_ecl: self.total_ecl,
            peak_month,
            peak_monthly_ecl,
            cumulative_pd,
            discounted_expected_exposure,
        }
    }
}

/// Summary statistics for an ECL calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EclSummary {
    pub loan_id: i64,
    pub months: u32,
    pub total_ecl: f64,
    /// Month with the largest ECL contribution (0 when there are no months)
    pub peak_month: u32,
    pub peak_monthly_ecl: f64,
    /// Probability of default at any point over the horizon
    pub cumulative_pd: f64,
    /// Sum of EAD × PD × DF, i.e. total ECL before LGD
    pub discounted_expected_exposure: f64,
}
