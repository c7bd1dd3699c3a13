//! Loan data structures and loan tape loading

mod data;
pub mod loader;

pub use data::{Loan, Portfolio, Stage, MAX_TERM_MONTHS};
pub use loader::{load_loans, load_loans_from_reader};
