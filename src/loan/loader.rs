//! Load loans from a CSV loan tape

use super::{Loan, Stage};
use crate::error::{EngineError, EngineResult};
use csv::Reader;
use std::path::Path;

/// Raw CSV row matching the loan tape columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "LoanID")]
    loan_id: i64,
    #[serde(rename = "LoanAmount")]
    loan_amount: f64,
    #[serde(rename = "AnnualInterestRate")]
    annual_interest_rate: f64,
    #[serde(rename = "AnnualPD")]
    annual_pd: f64,
    #[serde(rename = "LGD")]
    lgd: f64,
    #[serde(rename = "EIR")]
    eir: f64,
    #[serde(rename = "TermMonths")]
    term_months: u32,
    #[serde(rename = "FICO", default)]
    fico: Option<u16>,
    #[serde(rename = "CollateralID", default)]
    collateral_id: Option<i64>,
    #[serde(rename = "Stage", default)]
    stage: Option<u8>,
    #[serde(rename = "PortfolioID", default)]
    portfolio_id: Option<i64>,
}

impl CsvRow {
    fn into_loan(self) -> EngineResult<Loan> {
        let stage = match self.stage {
            Some(n) => Some(Stage::from_number(n).ok_or_else(|| {
                EngineError::invalid("stage", format!("unknown stage {} for loan {}", n, self.loan_id))
            })?),
            None => None,
        };

        Ok(Loan {
            loan_id: self.loan_id,
            loan_amount: self.loan_amount,
            annual_interest_rate: self.annual_interest_rate,
            annual_pd: self.annual_pd,
            lgd: self.lgd,
            eir: self.eir,
            term_months: self.term_months,
            fico: self.fico,
            collateral_id: self.collateral_id,
            stage,
            portfolio_id: self.portfolio_id,
        })
    }
}

/// Load all loans from a CSV file
pub fn load_loans<P: AsRef<Path>>(path: P) -> EngineResult<Vec<Loan>> {
    let reader = Reader::from_path(path)?;
    collect_loans(reader)
}

/// Load loans from any reader (e.g., string buffer, request body)
pub fn load_loans_from_reader<R: std::io::Read>(reader: R) -> EngineResult<Vec<Loan>> {
    collect_loans(Reader::from_reader(reader))
}

fn collect_loans<R: std::io::Read>(mut reader: Reader<R>) -> EngineResult<Vec<Loan>> {
    let mut loans = Vec::new();
    for result in reader.deserialize() {
        let row: CsvRow = result?;
        loans.push(row.into_loan()?);
    }
    Ok(loans)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAPE: &str = "\
LoanID,LoanAmount,AnnualInterestRate,AnnualPD,LGD,EIR,TermMonths,FICO,CollateralID,Stage,PortfolioID
1,10000,0.06,0.05,0.45,0.06,12,720,3,1,1
2,250000,0.045,0.01,0.25,0.047,360,,,2,
3,5000,0.19,0.12,0.65,0.2,36,,,,
";

    #[test]
    fn test_load_loans_from_reader() {
        let loans = load_loans_from_reader(TAPE.as_bytes()).unwrap();
        assert_eq!(loans.len(), 3);

        let first = &loans[0];
        assert_eq!(first.loan_id, 1);
        assert_eq!(first.term_months, 12);
        assert_eq!(first.fico, Some(720));
        assert_eq!(first.stage, Some(Stage::Stage1));
        assert_eq!(first.portfolio_id, Some(1));

        assert_eq!(loans[1].stage, Some(Stage::Stage2));
        assert_eq!(loans[1].fico, None);
        assert_eq!(loans[2].stage, None);
        assert!((loans[2].lgd - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let tape = "\
LoanID,LoanAmount,AnnualInterestRate,AnnualPD,LGD,EIR,TermMonths,FICO,CollateralID,Stage,PortfolioID
9,1000,0.05,0.02,0.4,0.05,12,,,7,
";
        let err = load_loans_from_reader(tape.as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "stage"));
    }

    #[test]
    fn test_malformed_row_is_csv_error() {
        let tape = "LoanID,LoanAmount\nabc,1000\n";
        assert!(matches!(
            load_loans_from_reader(tape.as_bytes()),
            Err(EngineError::Csv(_))
        ));
    }
}
