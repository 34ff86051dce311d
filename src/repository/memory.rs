//! In-process catalog store, for development and tests

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CatalogStore;
use crate::{error::AppResult, models::book::Book};

#[derive(Default)]
pub struct MemoryCatalogStore {
    books: RwLock<HashMap<String, Book>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn get(&self, isbn: &str) -> AppResult<Option<Book>> {
        Ok(self.books.read().await.get(isbn).cloned())
    }

    async fn conditional_put(&self, book: &Book, expected_version: u64) -> AppResult<bool> {
        let mut books = self.books.write().await;
        let stored_version = books.get(&book.isbn).map(|b| b.version).unwrap_or(0);
        if stored_version != expected_version {
            return Ok(false);
        }

        let mut stored = book.clone();
        stored.version = expected_version + 1;
        books.insert(stored.isbn.clone(), stored);
        Ok(true)
    }

    async fn scan(&self) -> AppResult<Vec<Book>> {
        let mut books: Vec<Book> = self.books.read().await.values().cloned().collect();
        books.sort_by(|a, b| a.isbn.cmp(&b.isbn));
        Ok(books)
    }

    async fn delete(&self, isbn: &str) -> AppResult<bool> {
        Ok(self.books.write().await.remove(isbn).is_some())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
