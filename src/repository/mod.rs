//! Repository layer: catalog store backends and the identity directory

pub mod books;
pub mod memory;
pub mod redis_store;
pub mod users;

use async_trait::async_trait;

use crate::{error::AppResult, models::book::Book};

pub use books::PgCatalogStore;
pub use memory::MemoryCatalogStore;
pub use redis_store::RedisCatalogStore;
pub use users::UsersRepository;

/// Key-value store of catalog records keyed by ISBN.
///
/// Every write goes through [`CatalogStore::conditional_put`], a
/// compare-and-swap on the record version. Version 0 stands for "no record",
/// so creating a book is a conditional put expecting version 0.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch a book, `None` if no record exists
    async fn get(&self, isbn: &str) -> AppResult<Option<Book>>;

    /// Store `book` if the stored version equals `expected_version`.
    ///
    /// On success the record is stored with version `expected_version + 1`
    /// and `true` is returned; `false` means another writer got there first.
    async fn conditional_put(&self, book: &Book, expected_version: u64) -> AppResult<bool>;

    /// Every book in the catalog
    async fn scan(&self) -> AppResult<Vec<Book>>;

    /// Remove a book unconditionally; returns whether a record existed
    async fn delete(&self, isbn: &str) -> AppResult<bool>;

    /// Round trip to the backend, for readiness probes
    async fn ping(&self) -> AppResult<()>;
}
