//! Batch ECL runs over a loan book
//!
//! Each loan is independent, so the batch fans out with rayon and aggregates
//! per month afterwards.

use crate::ecl::{calculate_ecl, calculate_staged_ecl, EclResult};
use crate::error::EngineResult;
use crate::loan::Loan;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Aggregated monthly figures across a portfolio
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMonthRow {
    pub month: u32,
    pub total_ead: f64,
    pub total_ecl: f64,
    /// Number of loans still within their horizon in this month
    pub active_loans: u32,
}

/// Headline figures for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub loan_count: usize,
    pub total_principal: f64,
    pub total_ecl: f64,
    /// Total ECL as a fraction of total principal
    pub coverage_ratio: f64,
    pub failed_loan_ids: Vec<i64>,
}

/// Whether a batch measures lifetime ECL or follows each loan's IFRS 9 stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizonMode {
    #[default]
    Lifetime,
    Staged,
}

#[derive(Debug, Clone, Default)]
pub struct EclRunner {
    mode: HorizonMode,
}

impl EclRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn staged() -> Self {
        Self {
            mode: HorizonMode::Staged,
        }
    }

    pub fn run(&self, loan: &Loan) -> EngineResult<EclResult> {
        match self.mode {
            HorizonMode::Lifetime => calculate_ecl(loan),
            HorizonMode::Staged => calculate_staged_ecl(loan).map(|(_, result)| result),
        }
    }

    /// Run every loan in parallel; output order matches input order
    pub fn run_batch(&self, loans: &[Loan]) -> Vec<EngineResult<EclResult>> {
        let start = Instant::now();
        let results: Vec<_> = loans.par_iter().map(|loan| self.run(loan)).collect();
        log::debug!("computed {} loans in {:?}", loans.len(), start.elapsed());
        results
    }

    /// Run the batch and split it into successes and a summary
    pub fn run_portfolio(&self, loans: &[Loan]) -> (Vec<EclResult>, PortfolioSummary) {
        let mut ok = Vec::with_capacity(loans.len());
        let mut failed_loan_ids = Vec::new();
        let mut total_principal = 0.0;

        for (loan, result) in loans.iter().zip(self.run_batch(loans)) {
            match result {
                Ok(r) => {
                    total_principal += loan.loan_amount;
                    ok.push(r);
                }
                Err(e) => {
                    log::warn!("loan {} skipped: {e}", loan.loan_id);
                    failed_loan_ids.push(loan.loan_id);
                }
            }
        }

        let total_ecl: f64 = ok.iter().map(|r| r.total_ecl).sum();
        let coverage_ratio = if total_principal > 0.0 {
            total_ecl / total_principal
        } else {
            0.0
        };

        let summary = PortfolioSummary {
            loan_count: ok.len(),
            total_principal,
            total_ecl,
            coverage_ratio,
            failed_loan_ids,
        };
        (ok, summary)
    }
}

/// Sum EAD and ECL by month across results of possibly different lengths
pub fn aggregate_by_month(results: &[EclResult]) -> Vec<PortfolioMonthRow> {
    let max_months = results.iter().map(|r| r.months()).max().unwrap_or(0);
    let mut aggregated: Vec<PortfolioMonthRow> = (1..=max_months)
        .map(|m| PortfolioMonthRow {
            month: m,
            ..Default::default()
        })
        .collect();

    for result in results {
        for (idx, (ead, ecl)) in result.ead.iter().zip(&result.monthly_breakdown).enumerate() {
            let agg = &mut aggregated[idx];
            agg.total_ead += ead;
            agg.total_ecl += ecl;
            agg.active_loans += 1;
        }
    }

    aggregated
}
