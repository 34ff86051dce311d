//! Data models for the lending server

pub mod book;
pub mod ledger;
pub mod user;

// Re-export commonly used types
pub use book::{Book, CreateBook, UpdateBook};
pub use ledger::{BorrowerState, BorrowerStateRecord, Ledger, LoanStatus};
pub use user::{Role, UserClaims};
