//! Expected Credit Loss engines
//!
//! Three closed-form engines produce parallel monthly series which the calculator
//! multiplies element-wise with a constant LGD:
//! - **Amortization**: remaining balance after each payment (EAD)
//! - **Risk decay**: constant-hazard marginal PD per month
//! - **Discounting**: `1 / (1 + EIR/12)^t` per month
//!
//! # Example
//!
//! ```rust
//! use ecl_engine::ecl::total_ecl;
//!
//! let result = total_ecl(10_000.0, 0.06, 0.05, 0.45, 0.06, 12);
//! assert_eq!(result.monthly.len(), 12);
//! assert!(result.total > 0.0);
//! ```

mod amortization;
mod calculator;
mod discount;
mod results;
mod risk_decay;

pub use amortization::{amortization_schedule, monthly_payment};
pub use calculator::{
    calculate_ecl, calculate_staged_ecl, monthly_ecl, total_ecl, EclHorizon,
};
pub use discount::{
    discount_cash_flows, discount_factor, discount_factor_series, present_value, DiscountCurve,
};
pub use results::{EclResult, EclSummary, MonthlyProjection, TotalEcl};
pub use risk_decay::{
    default_probability, marginal_pd_series, monthly_marginal_pd, survival_probability,
};
