//! ECL Engine walkthrough
//!
//! Runs each engine on the reference loan and writes the monthly projection to CSV

use anyhow::Context;
use ecl_engine::ecl::{
    amortization_schedule, calculate_ecl, discount_factor, marginal_pd_series,
    monthly_marginal_pd, monthly_payment,
};
use ecl_engine::Loan;
use std::fs::File;
use std::io::Write;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("ECL Engine v{}", env!("CARGO_PKG_VERSION"));
    println!("=================\n");

    // 10,000 over 12 months at 6%, 5% annual PD, 45% LGD, 6% EIR
    let loan = Loan::new(10_000.0, 0.06, 0.05, 0.45, 0.06, 12);

    println!("=== Amortization Engine ===");
    println!("Monthly payment: ${:.2}", monthly_payment(loan.loan_amount, loan.annual_interest_rate, loan.term_months));
    let ead = amortization_schedule(loan.loan_amount, loan.annual_interest_rate, loan.term_months);
    for (i, balance) in ead.iter().enumerate() {
        println!("  Month {:>3}: ${:.2}", i + 1, balance);
    }
    println!();

    println!("=== Risk Decay Engine ===");
    println!("Monthly marginal PD: {:.6}", monthly_marginal_pd(loan.annual_pd));
    let pd = marginal_pd_series(loan.annual_pd, loan.term_months);
    for (i, p) in pd.iter().enumerate() {
        println!("  Month {:>3}: {:.6}", i + 1, p);
    }
    println!("  Sum over term: {:.6}", pd.iter().sum::<f64>());
    println!();

    println!("=== Discounting Engine ===");
    println!("Discount factor (month 12): {:.6}", discount_factor(loan.eir, 12));
    println!();

    println!("=== Full ECL Calculation ===");
    let result = calculate_ecl(&loan).context("reference loan rejected")?;
    println!("{:>5} {:>12} {:>10} {:>10} {:>10}", "Month", "EAD", "PD", "DF", "ECL");
    println!("{}", "-".repeat(51));
    for row in result.projections() {
        println!(
            "{:>5} {:>12.2} {:>10.6} {:>10.6} {:>10.4}",
            row.month, row.ead, row.marginal_pd, row.discount_factor, row.ecl
        );
    }
    println!("\nTotal ECL: ${:.2}", result.total_ecl);

    let csv_path = "ecl_output.csv";
    let mut file = File::create(csv_path).with_context(|| format!("creating {csv_path}"))?;
    writeln!(file, "Month,EAD,MarginalPD,LGD,DiscountFactor,ECL")?;
    for row in result.projections() {
        writeln!(
            file,
            "{},{:.2},{:.10},{:.4},{:.10},{:.8}",
            row.month, row.ead, row.marginal_pd, row.lgd, row.discount_factor, row.ecl
        )?;
    }
    println!("Monthly projection written to: {}", csv_path);

    let summary = result.summary();
    println!("\nSummary:");
    println!("  Months: {}", summary.months);
    println!("  Peak month: {} (${:.4})", summary.peak_month, summary.peak_monthly_ecl);
    println!("  Cumulative PD: {:.6}", summary.cumulative_pd);

    Ok(())
}
