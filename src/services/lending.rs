//! Lending engine: checkout, return and metadata transitions on a book snapshot.
//!
//! The engine performs no I/O. Each operation takes the snapshot read from
//! the store and returns the next state of the book; the snapshot itself is
//! never modified, so a failed operation leaves the caller's book untouched.
//! Persisting the result (and retrying on a lost race) is the job of
//! [`CatalogService`](super::catalog::CatalogService).

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::book::{now, Book, UpdateBook},
};

#[derive(Debug, Clone, Default)]
pub struct LendingEngine {
    max_per_borrower: Option<u32>,
}

impl LendingEngine {
    pub fn new(max_per_borrower: Option<u32>) -> Self {
        Self { max_per_borrower }
    }

    pub fn checkout(&self, book: &Book, borrower_id: &str) -> AppResult<Book> {
        self.checkout_at(book, borrower_id, now())
    }

    /// Lend one unit of `book` to `borrower_id`
    pub fn checkout_at(&self, book: &Book, borrower_id: &str, now: DateTime<Utc>) -> AppResult<Book> {
        if book.available_units == 0 {
            return Err(AppError::OutOfInventory {
                isbn: book.isbn.clone(),
            });
        }

        let current = book.ledger.find_or_default(borrower_id);
        if let Some(limit) = self.max_per_borrower {
            if current.outstanding() >= limit {
                return Err(AppError::BorrowLimitReached {
                    isbn: book.isbn.clone(),
                    borrower: borrower_id.to_string(),
                    limit,
                });
            }
        }

        let mut next = book.clone();
        next.ledger.upsert(current.after_checkout(now));
        next.available_units -= 1;
        next.updated_at = now;
        verified(next)
    }

    pub fn return_book(&self, book: &Book, borrower_id: &str) -> AppResult<Book> {
        self.return_book_at(book, borrower_id, now())
    }

    /// Take back one unit of `book` from `borrower_id`
    pub fn return_book_at(&self, book: &Book, borrower_id: &str, now: DateTime<Utc>) -> AppResult<Book> {
        let current = book.ledger.find_or_default(borrower_id);
        let settled = current
            .after_return(now)
            .ok_or_else(|| AppError::NothingToReturn {
                isbn: book.isbn.clone(),
                borrower: borrower_id.to_string(),
            })?;

        let mut next = book.clone();
        next.ledger.upsert(settled);
        next.available_units = book.available_units.checked_add(1).ok_or_else(|| {
            AppError::Internal(format!("book {}: available units overflow", book.isbn))
        })?;
        next.updated_at = now;
        verified(next)
    }

    pub fn update_metadata(&self, book: &Book, patch: &UpdateBook) -> AppResult<Book> {
        self.update_metadata_at(book, patch, now())
    }

    /// Apply a partial metadata update.
    ///
    /// The ledger is carried over as is. Changing `total_units` shifts
    /// `available_units` by the same delta and fails if fewer units would
    /// remain than are currently checked out.
    pub fn update_metadata_at(&self, book: &Book, patch: &UpdateBook, now: DateTime<Utc>) -> AppResult<Book> {
        let mut next = book.clone();

        if let Some(title) = &patch.title {
            next.title = title.clone();
        }
        if let Some(author) = &patch.author {
            next.author = author.clone();
        }
        if let Some(description) = &patch.description {
            next.description = Some(description.clone());
        }
        if let Some(image) = &patch.image {
            next.image = Some(image.clone());
        }

        if let Some(total_units) = patch.total_units {
            let delta = i64::from(total_units) - i64::from(book.total_units);
            let available = i64::from(book.available_units) + delta;
            if available < 0 {
                return Err(AppError::InvalidInventoryChange {
                    isbn: book.isbn.clone(),
                    requested: total_units,
                    checked_out: u32::try_from(book.checked_out_units()).unwrap_or(u32::MAX),
                });
            }
            next.total_units = total_units;
            next.available_units = u32::try_from(available).map_err(|_| {
                AppError::Internal(format!("book {}: available units overflow", book.isbn))
            })?;
        }

        next.updated_at = now;
        verified(next)
    }
}

fn verified(book: Book) -> AppResult<Book> {
    book.check_invariants().map_err(AppError::Internal)?;
    Ok(book)
}
