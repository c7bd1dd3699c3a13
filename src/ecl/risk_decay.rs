//! Risk decay engine: constant-hazard split of an annual PD into monthly marginal PDs

/// Monthly hazard implied by an annual PD: `1 - (1 - PD)^(1/12)`
pub fn monthly_marginal_pd(annual_pd: f64) -> f64 {
    1.0 - (1.0 - annual_pd).powf(1.0 / 12.0)
}

/// Probability of surviving to the start of `month`
///
/// Months are 1-based: month 1 has survival 1. Month 0 is outside the domain.
pub fn survival_probability(annual_pd: f64, month: u32) -> f64 {
    debug_assert!(month >= 1, "months are 1-based, got {month}");
    let hazard = monthly_marginal_pd(annual_pd);
    (1.0 - hazard).powi(month.saturating_sub(1) as i32)
}

/// Probability of defaulting in 1-based `month`: survive to its start, then fail within it
pub fn default_probability(annual_pd: f64, month: u32) -> f64 {
    survival_probability(annual_pd, month) * monthly_marginal_pd(annual_pd)
}

/// Marginal default probabilities for months `1..=months`
pub fn marginal_pd_series(annual_pd: f64, months: u32) -> Vec<f64> {
    (1..=months)
        .map(|month| default_probability(annual_pd, month))
        .collect()
}
