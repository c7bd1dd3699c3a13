//! SQLite-backed store for loans, portfolios and ECL results

use super::types::{ProjectionRow, StoredEclResult};
use crate::ecl::EclResult;
use crate::error::{EngineError, EngineResult};
use crate::loan::{Loan, Portfolio, Stage};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SCHEMA: &str = include_str!("../../migrations/001_init.sql");

const LOAN_COLUMNS: &str = "id, loan_amount, annual_interest_rate, annual_pd, lgd, eir, term_months, fico, collateral_id, stage, portfolio_id";

pub struct EclStore {
    conn: Connection,
}

impl EclStore {
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        let store = Self::with_connection(conn)?;
        log::info!("ecl store opened at {}", path.as_ref().display());
        Ok(store)
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> EngineResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // ── Loans ──

    /// Insert a loan and return its new id (the loan's own `loan_id` is ignored)
    pub fn insert_loan(&self, loan: &Loan) -> EngineResult<i64> {
        self.conn.execute(
            "INSERT INTO loans (loan_amount, annual_interest_rate, annual_pd, lgd, eir, term_months, fico, collateral_id, stage, portfolio_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                loan.loan_amount,
                loan.annual_interest_rate,
                loan.annual_pd,
                loan.lgd,
                loan.eir,
                loan.term_months,
                loan.fico,
                loan.collateral_id,
                loan.stage.map(|s| s.as_number()),
                loan.portfolio_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn load_loan(&self, loan_id: i64) -> EngineResult<Option<Loan>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?1");
        let loan = self
            .conn
            .query_row(&sql, params![loan_id], loan_from_row)
            .optional()?;
        Ok(loan)
    }

    pub fn loans_in_portfolio(&self, portfolio_id: i64) -> EngineResult<Vec<Loan>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE portfolio_id = ?1 ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![portfolio_id], loan_from_row)?;
        let loans = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(loans)
    }

    // ── ECL results ──

    /// Write the summary row and every monthly row in one transaction
    ///
    /// Any failing insert returns early; the uncommitted transaction is rolled
    /// back when it is dropped, so either all rows land or none do.
    pub fn save_ecl_result(
        &mut self,
        result: &EclResult,
        calculated_at: DateTime<Utc>,
    ) -> EngineResult<StoredEclResult> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO ecl_results (loan_id, total_ecl, calculated_at) VALUES (?1, ?2, ?3)",
            params![result.loan_id, result.total_ecl, calculated_at],
        )?;
        let ecl_result_id = tx.last_insert_rowid();

        let projections: Vec<ProjectionRow> = result
            .projections()
            .into_iter()
            .map(ProjectionRow::from)
            .collect();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO ecl_monthly_projections (ecl_result_id, month, ead, marginal_pd, discount_factor, ecl)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in &projections {
                stmt.execute(params![
                    ecl_result_id,
                    row.month,
                    row.ead,
                    row.marginal_pd,
                    row.discount_factor,
                    row.ecl,
                ])?;
            }
        }

        tx.commit()?;

        Ok(StoredEclResult {
            id: ecl_result_id,
            loan_id: result.loan_id,
            total_ecl: result.total_ecl,
            calculated_at,
            pd_benchmark_version: None,
            notes: None,
            monthly_projections: projections,
        })
    }

    /// Latest stored result for a loan, with projections ordered by month
    pub fn get_ecl_result(&self, loan_id: i64) -> EngineResult<Option<StoredEclResult>> {
        let header = self
            .conn
            .query_row(
                "SELECT id, loan_id, total_ecl, calculated_at, pd_benchmark_version, notes
                 FROM ecl_results WHERE loan_id = ?1 ORDER BY id DESC LIMIT 1",
                params![loan_id],
                |row| {
                    Ok(StoredEclResult {
                        id: row.get(0)?,
                        loan_id: row.get(1)?,
                        total_ecl: row.get(2)?,
                        calculated_at: row.get(3)?,
                        pd_benchmark_version: row.get(4)?,
                        notes: row.get(5)?,
                        monthly_projections: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut result) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT month, ead, marginal_pd, discount_factor, ecl
             FROM ecl_monthly_projections WHERE ecl_result_id = ?1 ORDER BY month ASC",
        )?;
        let rows = stmt.query_map(params![result.id], |row| {
            Ok(ProjectionRow {
                month: row.get(0)?,
                ead: row.get(1)?,
                marginal_pd: row.get(2)?,
                discount_factor: row.get(3)?,
                ecl: row.get(4)?,
            })
        })?;
        result.monthly_projections = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(Some(result))
    }

    pub fn count_ecl_results(&self, loan_id: i64) -> EngineResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM ecl_results WHERE loan_id = ?1",
            params![loan_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Portfolios ──

    pub fn create_portfolio(&self, name: &str, description: Option<&str>) -> EngineResult<Portfolio> {
        let created_at = Utc::now();
        let inserted = self.conn.execute(
            "INSERT INTO portfolios (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![name, description, created_at],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                return Err(EngineError::DuplicatePortfolio(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Portfolio {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at,
        })
    }

    pub fn get_portfolio(&self, id: i64) -> EngineResult<Option<Portfolio>> {
        let portfolio = self
            .conn
            .query_row(
                "SELECT id, name, description, created_at FROM portfolios WHERE id = ?1",
                params![id],
                portfolio_from_row,
            )
            .optional()?;
        Ok(portfolio)
    }

    /// All portfolios, newest first
    pub fn list_portfolios(&self) -> EngineResult<Vec<Portfolio>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, created_at FROM portfolios ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], portfolio_from_row)?;
        let portfolios = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(portfolios)
    }
}

fn loan_from_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
    let stage = match row.get::<_, Option<u8>>(9)? {
        None => None,
        Some(n) => Some(Stage::from_number(n).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                9,
                Type::Integer,
                Box::new(EngineError::invalid("stage", format!("unknown stage {n}"))),
            )
        })?),
    };
    Ok(Loan {
        loan_id: row.get(0)?,
        loan_amount: row.get(1)?,
        annual_interest_rate: row.get(2)?,
        annual_pd: row.get(3)?,
        lgd: row.get(4)?,
        eir: row.get(5)?,
        term_months: row.get(6)?,
        fico: row.get(7)?,
        collateral_id: row.get(8)?,
        stage,
        portfolio_id: row.get(10)?,
    })
}

fn portfolio_from_row(row: &Row<'_>) -> rusqlite::Result<Portfolio> {
    Ok(Portfolio {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}
