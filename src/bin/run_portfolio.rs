//! Run ECL for an entire loan tape
//!
//! Outputs monthly aggregated EAD and ECL. Set STAGED=1 to measure stage 1 loans
//! over 12 months instead of their full term.

use anyhow::Context;
use ecl_engine::batch::{aggregate_by_month, EclRunner};
use ecl_engine::loan::load_loans;
use ecl_engine::EngineConfig;
use std::fs::File;
use std::io::Write;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = EngineConfig::from_env()?;
    let start = Instant::now();
    println!("Loading loans from {}...", config.loans_csv.display());

    let loans = load_loans(&config.loans_csv)
        .with_context(|| format!("loading {}", config.loans_csv.display()))?;
    println!("Loaded {} loans in {:?}", loans.len(), start.elapsed());

    let runner = match std::env::var("STAGED").as_deref() {
        Ok("1") => EclRunner::staged(),
        _ => EclRunner::new(),
    };

    println!("Running ECL...");
    let calc_start = Instant::now();
    let (results, summary) = runner.run_portfolio(&loans);
    println!("ECL complete in {:?}", calc_start.elapsed());

    let aggregated = aggregate_by_month(&results);

    let output_path = "portfolio_ecl_output.csv";
    let mut file = File::create(output_path).with_context(|| format!("creating {output_path}"))?;
    writeln!(file, "Month,ActiveLoans,TotalEAD,TotalECL")?;
    for row in &aggregated {
        writeln!(
            file,
            "{},{},{:.2},{:.6}",
            row.month, row.active_loans, row.total_ead, row.total_ecl
        )?;
    }
    println!("Output written to {}", output_path);

    println!("\nPortfolio Summary:");
    println!("  Loans:           {}", summary.loan_count);
    println!("  Total principal: ${:.2}", summary.total_principal);
    println!("  Total ECL:       ${:.2}", summary.total_ecl);
    println!("  Coverage ratio:  {:.4}%", summary.coverage_ratio * 100.0);
    if !summary.failed_loan_ids.is_empty() {
        println!("  Skipped loans:   {:?}", summary.failed_loan_ids);
    }

    println!("\nTotal time: {:?}", start.elapsed());
    Ok(())
}
