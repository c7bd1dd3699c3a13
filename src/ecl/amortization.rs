//! Amortization engine: remaining balance (EAD) for a fixed-payment loan

/// Fixed monthly payment for a level-payment annuity
///
/// Falls back to equal principal division (`P / n`) when the monthly rate is zero,
/// where the annuity formula is 0/0. Callers reject `months == 0` beforehand.
pub fn monthly_payment(principal: f64, annual_rate: f64, months: u32) -> f64 {
    let monthly_rate = annual_rate / 12.0;
    if monthly_rate.abs() < 1e-12 {
        return principal / months as f64;
    }

    let growth = (1.0 + monthly_rate).powi(months as i32);
    principal * monthly_rate * growth / (growth - 1.0)
}

/// Month-by-month outstanding balance after each payment, rounded to cents
///
/// Only the recorded values are rounded; the running balance keeps full precision,
/// so the final month lands within a cent of zero rather than exactly on it.
pub fn amortization_schedule(principal: f64, annual_rate: f64, months: u32) -> Vec<f64> {
    let monthly_rate = annual_rate / 12.0;
    let payment = monthly_payment(principal, annual_rate, months);

    let mut balance = principal;
    let mut ead = Vec::with_capacity(months as usize);

    for _month in 1..=months {
        let interest = balance * monthly_rate;
        let principal_paid = payment - interest;
        balance -= principal_paid;
        ead.push(round_cents(balance));
    }

    ead
}

fn round_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid recording -0.00 on the final month
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_reference_loan_schedule() {
        let ead = amortization_schedule(10_000.0, 0.06, 12);
        assert_eq!(ead.len(), 12);

        assert_abs_diff_eq!(ead[0], 9189.34, epsilon = 1e-9);
        assert_abs_diff_eq!(ead[1], 8374.62, epsilon = 1e-9);
        assert_abs_diff_eq!(ead[10], 856.38, epsilon = 1e-9);
        assert_abs_diff_eq!(ead[11], 0.0, epsilon = 0.01);
    }

    #[test]
    fn test_payment_matches_annuity_formula() {
        // 10000 at 6% over 12 months: standard payment of 860.66
        let pmt = monthly_payment(10_000.0, 0.06, 12);
        assert!((pmt - 860.66).abs() < 0.005);
    }

    #[test]
    fn test_strictly_decreasing_and_ends_near_zero() {
        for &(principal, rate, months) in &[
            (10_000.0, 0.06, 12u32),
            (250_000.0, 0.045, 360),
            (5_000.0, 0.19, 36),
            (1_000.0, 0.0001, 1),
        ] {
            let ead = amortization_schedule(principal, rate, months);
            assert_eq!(ead.len(), months as usize);
            for pair in ead.windows(2) {
                assert!(pair[1] < pair[0], "schedule not decreasing: {:?}", pair);
            }
            let last = *ead.last().unwrap();
            assert!(last.abs() <= 0.01, "final balance {} for term {}", last, months);
        }
    }

    #[test]
    fn test_zero_rate_falls_back_to_equal_principal() {
        let pmt = monthly_payment(1_200.0, 0.0, 12);
        assert_abs_diff_eq!(pmt, 100.0, epsilon = 1e-12);

        let ead = amortization_schedule(1_200.0, 0.0, 12);
        assert_abs_diff_eq!(ead[0], 1_100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ead[5], 600.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ead[11], 0.0, epsilon = 1e-9);
        assert!(ead.iter().all(|v| v.is_finite()));
    }
}
