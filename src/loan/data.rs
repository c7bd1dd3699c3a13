//! Loan data structures matching the loan tape and `loans` table

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Longest term the engines accept (100 years)
pub const MAX_TERM_MONTHS: u32 = 1200;

/// IFRS 9 impairment stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Performing: 12-month ECL
    Stage1,
    /// Significant increase in credit risk: lifetime ECL
    Stage2,
    /// Credit-impaired: lifetime ECL
    Stage3,
}

impl Stage {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Stage::Stage1),
            2 => Some(Stage::Stage2),
            3 => Some(Stage::Stage3),
            _ => None,
        }
    }

    pub fn as_number(&self) -> u8 {
        match self {
            Stage::Stage1 => 1,
            Stage::Stage2 => 2,
            Stage::Stage3 => 3,
        }
    }

    pub fn is_lifetime(&self) -> bool {
        !matches!(self, Stage::Stage1)
    }
}

/// A single loan and the risk parameters needed to compute its ECL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Loan identifier (0 for loans not yet stored)
    #[serde(default)]
    pub loan_id: i64,

    /// Original principal
    pub loan_amount: f64,

    /// Annual nominal interest rate used for amortization
    pub annual_interest_rate: f64,

    /// Annual probability of default
    pub annual_pd: f64,

    /// Loss given default as a fraction of exposure
    pub lgd: f64,

    /// Annual effective interest rate used for discounting
    pub eir: f64,

    /// Term in months
    pub term_months: u32,

    #[serde(default)]
    pub fico: Option<u16>,

    #[serde(default)]
    pub collateral_id: Option<i64>,

    #[serde(default)]
    pub stage: Option<Stage>,

    #[serde(default)]
    pub portfolio_id: Option<i64>,
}

impl Loan {
    /// Create an unstored loan with required fields
    pub fn new(
        loan_amount: f64,
        annual_interest_rate: f64,
        annual_pd: f64,
        lgd: f64,
        eir: f64,
        term_months: u32,
    ) -> Self {
        Self {
            loan_id: 0,
            loan_amount,
            annual_interest_rate,
            annual_pd,
            lgd,
            eir,
            term_months,
            fico: None,
            collateral_id: None,
            stage: None,
            portfolio_id: None,
        }
    }

    pub fn with_id(mut self, loan_id: i64) -> Self {
        self.loan_id = loan_id;
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn in_portfolio(mut self, portfolio_id: i64) -> Self {
        self.portfolio_id = Some(portfolio_id);
        self
    }

    /// Reject parameters the closed-form engines cannot evaluate
    ///
    /// PD and LGD outside [0, 1] are accepted; see [`Loan::out_of_range_fields`].
    pub fn validate(&self) -> EngineResult<()> {
        if !self.loan_amount.is_finite() || self.loan_amount <= 0.0 {
            return Err(EngineError::invalid(
                "loan_amount",
                format!("must be positive, got {}", self.loan_amount),
            ));
        }
        if self.term_months == 0 {
            return Err(EngineError::invalid("term_months", "must be at least 1"));
        }
        if self.term_months > MAX_TERM_MONTHS {
            return Err(EngineError::invalid(
                "term_months",
                format!("must be at most {MAX_TERM_MONTHS}, got {}", self.term_months),
            ));
        }
        if !self.annual_interest_rate.is_finite() || self.annual_interest_rate / 12.0 <= -1.0 {
            return Err(EngineError::invalid(
                "annual_interest_rate",
                format!("cannot amortize at {}", self.annual_interest_rate),
            ));
        }
        if !self.eir.is_finite() || self.eir / 12.0 <= -1.0 {
            return Err(EngineError::invalid(
                "eir",
                format!("cannot discount at {}", self.eir),
            ));
        }
        if !self.annual_pd.is_finite() {
            return Err(EngineError::invalid("annual_pd", "must be finite"));
        }
        if !self.lgd.is_finite() {
            return Err(EngineError::invalid("lgd", "must be finite"));
        }
        Ok(())
    }

    /// Names of PD/LGD fields outside [0, 1]
    pub fn out_of_range_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !(0.0..=1.0).contains(&self.annual_pd) {
            fields.push("annual_pd");
        }
        if !(0.0..=1.0).contains(&self.lgd) {
            fields.push("lgd");
        }
        fields
    }
}

/// A named group of loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_loan() -> Loan {
        Loan::new(10_000.0, 0.06, 0.05, 0.45, 0.06, 12)
    }

    #[test]
    fn test_valid_loan_passes() {
        assert!(reference_loan().validate().is_ok());
        assert!(Loan::new(10_000.0, 0.0, 0.05, 0.45, 0.0, 1).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_principal_and_term() {
        let mut loan = reference_loan();
        loan.loan_amount = 0.0;
        let err = loan.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "loan_amount"));

        let mut loan = reference_loan();
        loan.term_months = 0;
        let err = loan.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "term_months"));

        let mut loan = reference_loan();
        loan.annual_interest_rate = f64::NAN;
        assert!(loan.validate().is_err());

        let mut loan = reference_loan();
        loan.eir = -12.0;
        assert!(loan.validate().is_err());
    }

    #[test]
    fn test_rejects_term_above_maximum() {
        for term in [MAX_TERM_MONTHS + 1, i32::MAX as u32 + 2, u32::MAX] {
            let mut loan = reference_loan();
            loan.term_months = term;
            let err = loan.validate().unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "term_months"));
        }

        let mut loan = reference_loan();
        loan.term_months = MAX_TERM_MONTHS;
        assert!(loan.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_pd_and_lgd_are_reported_not_rejected() {
        let mut loan = reference_loan();
        loan.annual_pd = 1.2;
        loan.lgd = -0.1;
        assert!(loan.validate().is_ok());
        assert_eq!(loan.out_of_range_fields(), vec!["annual_pd", "lgd"]);
        assert!(reference_loan().out_of_range_fields().is_empty());
    }

    #[test]
    fn test_stage_numbers() {
        assert_eq!(Stage::from_number(2), Some(Stage::Stage2));
        assert_eq!(Stage::from_number(4), None);
        assert_eq!(Stage::Stage3.as_number(), 3);
        assert!(!Stage::Stage1.is_lifetime());
        assert!(Stage::Stage2.is_lifetime());
    }
}
