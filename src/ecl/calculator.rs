//! ECL composition: EAD × PD × LGD × DF per month, summed over the horizon

use super::amortization::amortization_schedule;
use super::discount::discount_factor_series;
use super::results::{EclResult, TotalEcl};
use super::risk_decay::marginal_pd_series;
use crate::error::EngineResult;
use crate::loan::{Loan, Stage};

/// Discounted expected loss for a single month
pub fn monthly_ecl(ead: f64, marginal_pd: f64, lgd: f64, discount_factor: f64) -> f64 {
    ead * marginal_pd * lgd * discount_factor
}

/// Total ECL over `months` with its monthly breakdown
///
/// No validation is performed here: out-of-range PD or LGD flows through as a
/// well-defined but out-of-range number. Use [`calculate_ecl`] for checked input.
pub fn total_ecl(
    loan_amount: f64,
    annual_interest_rate: f64,
    annual_pd: f64,
    lgd: f64,
    eir: f64,
    months: u32,
) -> TotalEcl {
    let ead = amortization_schedule(loan_amount, annual_interest_rate, months);
    let pd = marginal_pd_series(annual_pd, months);
    let df = discount_factor_series(eir, months);

    let monthly = compose(&ead, &pd, lgd, &df);
    let total = monthly.iter().sum();
    TotalEcl { total, monthly }
}

fn compose(ead: &[f64], pd: &[f64], lgd: f64, df: &[f64]) -> Vec<f64> {
    debug_assert!(ead.len() == pd.len() && pd.len() == df.len());
    ead.iter()
        .zip(pd)
        .zip(df)
        .map(|((&e, &p), &d)| monthly_ecl(e, p, lgd, d))
        .collect()
}

/// Validate a loan and compute its lifetime ECL with all intermediate series
pub fn calculate_ecl(loan: &Loan) -> EngineResult<EclResult> {
    loan.validate()?;
    Ok(calculate_over(loan, loan.term_months))
}

/// Horizon over which ECL is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EclHorizon {
    /// Next twelve months, capped at the remaining term
    TwelveMonth(u32),
    /// Full remaining term
    Lifetime(u32),
}

impl EclHorizon {
    /// Stage 1 loans measure 12-month ECL; stages 2 and 3 (and unstaged loans) are lifetime
    pub fn for_stage(stage: Option<Stage>, term_months: u32) -> Self {
        match stage {
            Some(Stage::Stage1) => EclHorizon::TwelveMonth(term_months.min(12)),
            _ => EclHorizon::Lifetime(term_months),
        }
    }

    pub fn months(&self) -> u32 {
        match *self {
            EclHorizon::TwelveMonth(m) | EclHorizon::Lifetime(m) => m,
        }
    }
}

/// ECL over the horizon implied by the loan's IFRS 9 stage
///
/// The amortization schedule is always built over the full term, then truncated,
/// so a stage 1 loan keeps the balances of its real payment plan.
pub fn calculate_staged_ecl(loan: &Loan) -> EngineResult<(EclHorizon, EclResult)> {
    loan.validate()?;
    let horizon = EclHorizon::for_stage(loan.stage, loan.term_months);
    Ok((horizon, calculate_over(loan, horizon.months())))
}

fn calculate_over(loan: &Loan, horizon_months: u32) -> EclResult {
    let mut ead = amortization_schedule(loan.loan_amount, loan.annual_interest_rate, loan.term_months);
    ead.truncate(horizon_months as usize);
    let marginal_pd = marginal_pd_series(loan.annual_pd, horizon_months);
    let discount_factors = discount_factor_series(loan.eir, horizon_months);

    let monthly_breakdown = compose(&ead, &marginal_pd, loan.lgd, &discount_factors);
    let total_ecl = monthly_breakdown.iter().sum();

    EclResult {
        loan_id: loan.loan_id,
        lgd: loan.lgd,
        total_ecl,
        monthly_breakdown,
        ead,
        marginal_pd,
        discount_factors,
    }
}
