//! Discounting engine: present value at the loan's effective interest rate
//!
//! The EIR is quoted annually and applied as a nominal monthly rate `EIR / 12`.
//! Month `t` (1-indexed) is discounted by `1 / (1 + EIR/12)^t`.

use serde::{Deserialize, Serialize};

/// Flat discount curve at a single effective interest rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountCurve {
    /// Annual effective interest rate
    pub eir: f64,
}

impl DiscountCurve {
    pub fn new(eir: f64) -> Self {
        Self { eir }
    }

    /// One-month discount factor `1 / (1 + EIR/12)`
    pub fn monthly_factor(&self) -> f64 {
        1.0 / (1.0 + self.eir / 12.0)
    }

    /// Discount factor to the end of `month`
    pub fn discount_factor(&self, month: u32) -> f64 {
        1.0 / (1.0 + self.eir / 12.0).powi(month as i32)
    }

    /// Discount factors for months `1..=months`
    pub fn factors(&self, months: u32) -> Vec<f64> {
        (1..=months).map(|m| self.discount_factor(m)).collect()
    }

    pub fn present_value(&self, future_amount: f64, month: u32) -> f64 {
        future_amount * self.discount_factor(month)
    }

    /// Discount each cash flow by its 1-based position in the slice
    pub fn discount_cash_flows(&self, cash_flows: &[f64]) -> Vec<f64> {
        cash_flows
            .iter()
            .zip(self.factors(cash_flows.len() as u32))
            .map(|(cf, df)| cf * df)
            .collect()
    }

    /// Net present value of a monthly cash flow stream
    pub fn npv(&self, cash_flows: &[f64]) -> f64 {
        self.discount_cash_flows(cash_flows).iter().sum()
    }
}

pub fn discount_factor(eir: f64, month: u32) -> f64 {
    DiscountCurve::new(eir).discount_factor(month)
}

pub fn discount_factor_series(eir: f64, months: u32) -> Vec<f64> {
    DiscountCurve::new(eir).factors(months)
}

pub fn present_value(future_amount: f64, eir: f64, month: u32) -> f64 {
    DiscountCurve::new(eir).present_value(future_amount, month)
}

pub fn discount_cash_flows(cash_flows: &[f64], eir: f64) -> Vec<f64> {
    DiscountCurve::new(eir).discount_cash_flows(cash_flows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_discount_factors() {
        let curve = DiscountCurve::new(0.06);

        let monthly_v = curve.monthly_factor();
        assert_relative_eq!(monthly_v, 1.0 / 1.005, epsilon = 1e-12);

        let v_12 = curve.discount_factor(12);
        let expected_12: f64 = (1.0_f64 / 1.005).powi(12);
        assert_relative_eq!(v_12, expected_12, epsilon = 1e-12);
    }

    #[test]
    fn test_factors_decrease_with_positive_rate() {
        let factors = discount_factor_series(0.08, 60);
        assert_eq!(factors.len(), 60);
        assert!(factors.windows(2).all(|w| w[1] < w[0]));
        assert!(factors.iter().all(|&df| df > 0.0 && df <= 1.0));
    }

    #[test]
    fn test_zero_rate_is_no_discounting() {
        for month in [1, 12, 120, 360] {
            assert_eq!(discount_factor(0.0, month), 1.0);
        }
        assert_eq!(present_value(250.0, 0.0, 36), 250.0);
    }

    #[test]
    fn test_cash_flows_match_mapped_present_value() {
        let flows = [100.0, -50.0, 0.0, 1_000.0, 12.5];
        let discounted = discount_cash_flows(&flows, 0.05);
        assert_eq!(discounted.len(), flows.len());

        for (i, (&cf, &pv)) in flows.iter().zip(discounted.iter()).enumerate() {
            assert_relative_eq!(pv, present_value(cf, 0.05, i as u32 + 1), epsilon = 1e-12);
        }
        assert!(discount_cash_flows(&[], 0.05).is_empty());
    }

    #[test]
    fn test_npv_of_level_stream() {
        // $100/month for 12 months at 6%: 100 * (1 - 1.005^-12) / 0.005 ≈ 1161.89
        let npv = DiscountCurve::new(0.06).npv(&[100.0; 12]);
        assert!((npv - 1161.89).abs() < 0.01);
    }
}
