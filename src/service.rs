//! Orchestration: load a loan, compute its ECL and persist the result
//!
//! Persistence failures are logged with the loan or portfolio they concern and
//! surfaced to the caller as [`EngineError::Internal`]. Missing records are `Ok(None)`.

use crate::ecl::calculate_ecl;
use crate::error::{EngineError, EngineResult};
use crate::loan::{Loan, Portfolio};
use crate::store::{EclStore, StoredEclResult};
use chrono::Utc;
use serde::Serialize;

/// Outcome of computing and storing ECL for every loan in a portfolio
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioRun {
    pub portfolio: Portfolio,
    pub results: Vec<StoredEclResult>,
    pub failed_loan_ids: Vec<i64>,
}

impl PortfolioRun {
    pub fn total_ecl(&self) -> f64 {
        self.results.iter().map(|r| r.total_ecl).sum()
    }
}

pub struct EclService {
    store: EclStore,
}

impl EclService {
    pub fn new(store: EclStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &EclStore {
        &self.store
    }

    /// Validate and insert a loan, returning its id
    pub fn add_loan(&self, loan: &Loan) -> EngineResult<i64> {
        loan.validate()?;
        self.store.insert_loan(loan).map_err(|e| {
            log::error!("error inserting loan: {e}");
            EngineError::Internal
        })
    }

    /// Compute ECL for a stored loan and persist the summary and monthly rows
    pub fn calculate_and_store_ecl(&mut self, loan_id: i64) -> EngineResult<Option<StoredEclResult>> {
        check_id("loan_id", loan_id)?;

        let loan = match self.store.load_loan(loan_id) {
            Ok(Some(loan)) => loan,
            Ok(None) => return Ok(None),
            Err(e) => {
                log::error!("error loading loan {loan_id}: {e}");
                return Err(EngineError::Internal);
            }
        };

        let out_of_range = loan.out_of_range_fields();
        if !out_of_range.is_empty() {
            log::warn!("loan {loan_id} has values outside [0, 1]: {}", out_of_range.join(", "));
        }

        let result = calculate_ecl(&loan).map_err(|e| {
            log::error!("error calculating ECL for loan {loan_id}: {e}");
            e
        })?;

        match self.store.save_ecl_result(&result, Utc::now()) {
            Ok(stored) => {
                log::info!(
                    "stored ECL {:.2} for loan {} ({} months)",
                    stored.total_ecl,
                    loan_id,
                    stored.monthly_projections.len()
                );
                Ok(Some(stored))
            }
            Err(e) => {
                log::error!("error calculating and storing ECL for loan {loan_id}: {e}");
                Err(EngineError::Internal)
            }
        }
    }

    pub fn get_ecl_result(&self, loan_id: i64) -> EngineResult<Option<StoredEclResult>> {
        check_id("loan_id", loan_id)?;
        self.store.get_ecl_result(loan_id).map_err(|e| {
            log::error!("error fetching ECL result for loan {loan_id}: {e}");
            EngineError::Internal
        })
    }

    pub fn create_portfolio(&self, name: &str, description: Option<&str>) -> EngineResult<Portfolio> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::invalid("name", "portfolio name is required"));
        }
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        match self.store.create_portfolio(name, description) {
            Ok(portfolio) => Ok(portfolio),
            Err(e @ EngineError::DuplicatePortfolio(_)) => Err(e),
            Err(e) => {
                log::error!("error creating portfolio \"{name}\": {e}");
                Err(EngineError::Internal)
            }
        }
    }

    pub fn get_portfolio(&self, id: i64) -> EngineResult<Option<Portfolio>> {
        check_id("portfolio_id", id)?;
        self.store.get_portfolio(id).map_err(|e| {
            log::error!("error fetching portfolio {id}: {e}");
            EngineError::Internal
        })
    }

    pub fn list_portfolios(&self) -> EngineResult<Vec<Portfolio>> {
        self.store.list_portfolios().map_err(|e| {
            log::error!("error fetching all portfolios: {e}");
            EngineError::Internal
        })
    }

    /// Compute and store ECL for every loan in a portfolio
    ///
    /// Each loan is its own transaction; a failing loan is recorded in
    /// `failed_loan_ids` and does not undo the others.
    pub fn calculate_portfolio(&mut self, portfolio_id: i64) -> EngineResult<Option<PortfolioRun>> {
        let Some(portfolio) = self.get_portfolio(portfolio_id)? else {
            return Ok(None);
        };

        let loans = self.store.loans_in_portfolio(portfolio_id).map_err(|e| {
            log::error!("error loading loans for portfolio {portfolio_id}: {e}");
            EngineError::Internal
        })?;

        let mut results = Vec::with_capacity(loans.len());
        let mut failed_loan_ids = Vec::new();
        for loan in &loans {
            match self.calculate_and_store_ecl(loan.loan_id) {
                Ok(Some(stored)) => results.push(stored),
                Ok(None) | Err(_) => failed_loan_ids.push(loan.loan_id),
            }
        }

        log::info!(
            "portfolio {} ({}): {} loans stored, {} failed",
            portfolio.id,
            portfolio.name,
            results.len(),
            failed_loan_ids.len()
        );

        Ok(Some(PortfolioRun {
            portfolio,
            results,
            failed_loan_ids,
        }))
    }
}

fn check_id(field: &str, id: i64) -> EngineResult<()> {
    if id <= 0 {
        return Err(EngineError::invalid(field, format!("invalid id {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecl::total_ecl;
    use approx::assert_abs_diff_eq;

    fn service() -> EclService {
        EclService::new(EclStore::open_in_memory().unwrap())
    }

    fn reference_loan() -> Loan {
        Loan::new(10_000.0, 0.06, 0.05, 0.45, 0.06, 12)
    }

    #[test]
    fn test_calculate_and_store() {
        let mut svc = service();
        let id = svc.add_loan(&reference_loan()).unwrap();

        let stored = svc.calculate_and_store_ecl(id).unwrap().expect("loan exists");
        let expected = total_ecl(10_000.0, 0.06, 0.05, 0.45, 0.06, 12);
        assert_eq!(stored.loan_id, id);
        assert_abs_diff_eq!(stored.total_ecl, expected.total, epsilon = 1e-12);
        assert_eq!(stored.monthly_breakdown(), expected.monthly);

        let fetched = svc.get_ecl_result(id).unwrap().unwrap();
        assert_eq!(fetched.id, stored.id);
        assert_eq!(fetched.monthly_projections.len(), 12);
    }

    #[test]
    fn test_missing_loan_is_none() {
        let mut svc = service();
        assert!(svc.calculate_and_store_ecl(42).unwrap().is_none());
        assert!(svc.get_ecl_result(42).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let mut svc = service();
        assert!(matches!(
            svc.calculate_and_store_ecl(0),
            Err(EngineError::InvalidInput { .. })
        ));
        assert!(matches!(svc.get_ecl_result(-3), Err(EngineError::InvalidInput { .. })));
        assert!(matches!(svc.get_portfolio(0), Err(EngineError::InvalidInput { .. })));
    }

    #[test]
    fn test_add_loan_validates() {
        let svc = service();
        let mut loan = reference_loan();
        loan.term_months = 0;
        assert!(matches!(svc.add_loan(&loan), Err(EngineError::InvalidInput { .. })));
    }

    #[test]
    fn test_write_failure_is_generic_and_rolled_back() {
        let mut svc = service();
        // PD above 1 is accepted but yields NaN marginal PDs, which the store cannot persist
        let mut loan = reference_loan();
        loan.annual_pd = 1.5;
        let id = svc.add_loan(&loan).unwrap();

        let err = svc.calculate_and_store_ecl(id).unwrap_err();
        assert!(matches!(err, EngineError::Internal));
        assert_eq!(err.to_string(), "internal server error");
        assert_eq!(svc.store().count_ecl_results(id).unwrap(), 0);
    }

    #[test]
    fn test_portfolio_validation() {
        let svc = service();
        assert!(matches!(
            svc.create_portfolio("   ", None),
            Err(EngineError::InvalidInput { .. })
        ));

        let p = svc.create_portfolio("  Mortgages ", Some("  ")).unwrap();
        assert_eq!(p.name, "Mortgages");
        assert!(p.description.is_none());

        assert!(matches!(
            svc.create_portfolio("Mortgages", None),
            Err(EngineError::DuplicatePortfolio(_))
        ));
        assert_eq!(svc.list_portfolios().unwrap().len(), 1);
        assert!(svc.get_portfolio(p.id + 1).unwrap().is_none());
    }

    #[test]
    fn test_calculate_portfolio() {
        let mut svc = service();
        let p = svc.create_portfolio("Retail", None).unwrap();

        svc.add_loan(&reference_loan().in_portfolio(p.id)).unwrap();
        svc.add_loan(&Loan::new(5_000.0, 0.19, 0.12, 0.65, 0.2, 36).in_portfolio(p.id))
            .unwrap();
        let mut bad = reference_loan().in_portfolio(p.id);
        bad.annual_pd = 2.0;
        let bad_id = svc.add_loan(&bad).unwrap();

        let run = svc.calculate_portfolio(p.id).unwrap().unwrap();
        assert_eq!(run.results.len(), 2);
        assert_eq!(run.failed_loan_ids, vec![bad_id]);
        assert!(run.total_ecl() > 0.0);

        assert!(svc.calculate_portfolio(p.id + 10).unwrap().is_none());
    }
}
