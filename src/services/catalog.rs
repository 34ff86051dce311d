//! Catalog service: fetch, apply, conditionally persist, retry on lost races

use std::{sync::Arc, time::Duration};

use validator::Validate;

use super::{identity::IdentityService, lending::LendingEngine};
use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::book::{is_valid_isbn, normalize_isbn, now, Book, CreateBook, UpdateBook},
    repository::CatalogStore,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    identity: Arc<dyn IdentityService>,
    engine: LendingEngine,
    max_attempts: u32,
    retry_backoff: Duration,
}

fn not_found(isbn: &str) -> AppError {
    AppError::NotFound(format!("Book {} not found", isbn))
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        identity: Arc<dyn IdentityService>,
        lending: &LendingConfig,
    ) -> Self {
        Self {
            store,
            identity,
            engine: LendingEngine::new(lending.max_per_borrower),
            max_attempts: lending.max_attempts.max(1),
            retry_backoff: Duration::from_millis(lending.retry_backoff_ms),
        }
    }

    /// List every book, ordered by ISBN
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.store.scan().await
    }

    /// Get a book by ISBN
    pub async fn get_book(&self, isbn: &str) -> AppResult<Book> {
        let isbn = normalize_isbn(isbn);
        self.store.get(&isbn).await?.ok_or_else(|| not_found(&isbn))
    }

    /// Books in which `borrower_id` currently holds at least one unit
    pub async fn books_borrowed_by(&self, borrower_id: &str) -> AppResult<Vec<Book>> {
        let books = self.store.scan().await?;
        Ok(books
            .into_iter()
            .filter(|b| b.ledger.outstanding_for(borrower_id) > 0)
            .collect())
    }

    /// Add a book to the catalog (librarians only)
    pub async fn create_book(&self, caller_id: &str, request: CreateBook) -> AppResult<Book> {
        self.require_librarian(caller_id).await?;
        request.validate()?;

        let mut book = Book::new(request, now());
        if !is_valid_isbn(&book.isbn) {
            return Err(AppError::Validation(format!("Invalid ISBN: {}", book.isbn)));
        }

        if !self.store.conditional_put(&book, 0).await? {
            return Err(AppError::AlreadyExists(format!("Book {} already exists", book.isbn)));
        }
        book.version = 1;

        tracing::info!(
            isbn = %book.isbn,
            units = book.total_units,
            caller = %caller_id,
            "Book created"
        );
        Ok(book)
    }

    /// Partially update a book's metadata (librarians only)
    pub async fn update_book(&self, caller_id: &str, isbn: &str, patch: UpdateBook) -> AppResult<Book> {
        self.require_librarian(caller_id).await?;
        patch.validate()?;

        let isbn = normalize_isbn(isbn);
        if let Some(body_isbn) = &patch.isbn {
            if normalize_isbn(body_isbn) != isbn {
                return Err(AppError::Validation("ISBN cannot be changed".to_string()));
            }
        }

        let book = self
            .mutate(&isbn, "update", |book| self.engine.update_metadata(book, &patch))
            .await?;

        tracing::info!(isbn = %book.isbn, caller = %caller_id, "Book updated");
        Ok(book)
    }

    /// Remove a book from the catalog (librarians only).
    ///
    /// Deletion does not wait for outstanding checkouts to come back.
    pub async fn delete_book(&self, caller_id: &str, isbn: &str) -> AppResult<()> {
        self.require_librarian(caller_id).await?;

        let isbn = normalize_isbn(isbn);
        let book = self.store.get(&isbn).await?.ok_or_else(|| not_found(&isbn))?;
        let checked_out = book.checked_out_units();
        if checked_out > 0 {
            let borrowers: Vec<&str> = book.ledger.borrowers_with_outstanding().collect();
            tracing::warn!(
                isbn = %isbn,
                checked_out,
                borrowers = ?borrowers,
                "Deleting book with units still checked out"
            );
        }

        if !self.store.delete(&isbn).await? {
            return Err(not_found(&isbn));
        }

        tracing::info!(isbn = %isbn, caller = %caller_id, "Book deleted");
        Ok(())
    }

    /// Lend one unit to `borrower_id`
    pub async fn checkout(&self, isbn: &str, borrower_id: &str) -> AppResult<Book> {
        let isbn = normalize_isbn(isbn);
        let book = self
            .mutate(&isbn, "checkout", |book| self.engine.checkout(book, borrower_id))
            .await?;

        tracing::info!(
            isbn = %isbn,
            borrower = %borrower_id,
            available = book.available_units,
            "Book checked out"
        );
        Ok(book)
    }

    /// Take back one unit from `borrower_id`
    pub async fn return_book(&self, isbn: &str, borrower_id: &str) -> AppResult<Book> {
        let isbn = normalize_isbn(isbn);
        let book = self
            .mutate(&isbn, "return", |book| self.engine.return_book(book, borrower_id))
            .await?;

        tracing::info!(
            isbn = %isbn,
            borrower = %borrower_id,
            available = book.available_units,
            "Book returned"
        );
        Ok(book)
    }

    /// Check that the catalog store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    async fn require_librarian(&self, caller_id: &str) -> AppResult<()> {
        if self.identity.authorize_librarian(caller_id).await? {
            Ok(())
        } else {
            Err(AppError::Unauthorized(
                "Only librarians can modify the catalog".to_string(),
            ))
        }
    }

    /// Read-modify-write of one book under optimistic concurrency.
    ///
    /// `apply` is re-run against a fresh snapshot whenever the conditional
    /// write loses to a concurrent writer. Domain errors from `apply` are
    /// returned as is; running out of attempts yields `Conflict`.
    async fn mutate<F>(&self, isbn: &str, operation: &str, apply: F) -> AppResult<Book>
    where
        F: Fn(&Book) -> AppResult<Book> + Send + Sync,
    {
        for attempt in 1..=self.max_attempts {
            let current = self.store.get(isbn).await?.ok_or_else(|| not_found(isbn))?;
            let mut next = apply(&current)?;

            if self.store.conditional_put(&next, current.version).await? {
                next.version = current.version + 1;
                return Ok(next);
            }

            tracing::debug!(
                isbn = %isbn,
                operation,
                attempt,
                version = current.version,
                "Lost concurrent write, retrying"
            );
            if attempt < self.max_attempts && !self.retry_backoff.is_zero() {
                tokio::time::sleep(self.retry_backoff * attempt).await;
            }
        }

        tracing::warn!(
            isbn = %isbn,
            operation,
            attempts = self.max_attempts,
            "Giving up after repeated write conflicts"
        );
        Err(AppError::Conflict(format!(
            "Book {} was modified concurrently, {} abandoned after {} attempts",
            isbn, operation, self.max_attempts
        )))
    }
}
