//! Book (catalog item) model and request types

use chrono::{DateTime, SubsecRound, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::ledger::Ledger;

/// ISBN-10 or ISBN-13 once spaces and hyphens are stripped
static ISBN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:97[89][0-9]{10}|[0-9]{9}[0-9X])$").expect("valid ISBN pattern"));

/// Strip separators and upper-case the check digit
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub fn is_valid_isbn(isbn: &str) -> bool {
    ISBN_PATTERN.is_match(isbn)
}

/// Current time truncated to microseconds, the precision Postgres keeps
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Catalog item with its inventory counters and lending ledger
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Normalized ISBN, immutable after creation
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    /// Cover image URL
    pub image: Option<String>,
    /// Physical copies owned by the catalog
    pub total_units: u32,
    /// Copies currently on the shelf
    #[serde(rename = "inventory")]
    pub available_units: u32,
    /// One entry per borrower with current or past checkouts
    #[serde(rename = "states", default)]
    #[schema(value_type = Vec<super::ledger::BorrowerStateRecord>)]
    pub ledger: Ledger,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency version; 0 until first stored
    #[serde(default)]
    pub version: u64,
}

impl Book {
    /// New, not yet persisted book with every unit on the shelf
    pub fn new(request: CreateBook, now: DateTime<Utc>) -> Self {
        Self {
            isbn: normalize_isbn(&request.isbn),
            title: request.title,
            author: request.author,
            description: request.description,
            image: request.image,
            total_units: request.total_units,
            available_units: request.total_units,
            ledger: Ledger::new(),
            updated_at: now,
            version: 0,
        }
    }

    /// Units currently checked out across all borrowers
    pub fn checked_out_units(&self) -> u64 {
        self.ledger.outstanding_total()
    }

    /// Verify the inventory accounting invariants
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.available_units > self.total_units {
            return Err(format!(
                "book {}: {} available units exceed {} total",
                self.isbn, self.available_units, self.total_units
            ));
        }

        let accounted = u64::from(self.available_units) + self.checked_out_units();
        if accounted != u64::from(self.total_units) {
            return Err(format!(
                "book {}: {} available + {} checked out != {} total",
                self.isbn,
                self.available_units,
                self.checked_out_units(),
                self.total_units
            ));
        }

        Ok(())
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    /// ISBN-10 or ISBN-13, separators allowed
    pub isbn: String,
    #[validate(length(min = 1, max = 512, message = "Title must be 1-512 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 256, message = "Author must be 1-256 characters"))]
    pub author: String,
    #[validate(length(max = 4096, message = "Description must be at most 4096 characters"))]
    pub description: Option<String>,
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,
    /// Number of copies; `inventory` is accepted for older clients
    #[serde(alias = "inventory")]
    pub total_units: u32,
}

/// Partial update request; omitted fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    /// Target book when the ISBN is not part of the path
    pub isbn: Option<String>,
    #[validate(length(min = 1, max = 512, message = "Title must be 1-512 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 256, message = "Author must be 1-256 characters"))]
    pub author: Option<String>,
    #[validate(length(max = 4096, message = "Description must be at most 4096 characters"))]
    pub description: Option<String>,
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,
    pub total_units: Option<u32>,
}
