//! PostgreSQL catalog store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, Pool, Postgres};

use super::CatalogStore;
use crate::{
    error::{AppError, AppResult},
    models::{book::Book, ledger::Ledger},
};

/// Row of the `books` table
#[derive(Debug, FromRow)]
struct BookRow {
    isbn: String,
    title: String,
    author: String,
    description: Option<String>,
    image: Option<String>,
    total_units: i32,
    available_units: i32,
    states: Json<Ledger>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<BookRow> for Book {
    type Error = AppError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str| {
            AppError::StoreUnavailable(format!("book {} has a negative {}", row.isbn, field))
        };
        let total_units = u32::try_from(row.total_units).map_err(|_| corrupt("total_units"))?;
        let available_units =
            u32::try_from(row.available_units).map_err(|_| corrupt("available_units"))?;
        let version = u64::try_from(row.version).map_err(|_| corrupt("version"))?;

        Ok(Book {
            isbn: row.isbn,
            title: row.title,
            author: row.author,
            description: row.description,
            image: row.image,
            total_units,
            available_units,
            ledger: row.states.0,
            updated_at: row.updated_at,
            version,
        })
    }
}

fn to_db_int(value: u32, field: &str) -> AppResult<i32> {
    i32::try_from(value).map_err(|_| AppError::Validation(format!("{} is out of range", field)))
}

fn to_db_version(value: u64) -> AppResult<i64> {
    i64::try_from(value).map_err(|_| AppError::Internal(format!("version {} overflows", value)))
}

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: Pool<Postgres>,
}

impl PgCatalogStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn get(&self, isbn: &str) -> AppResult<Option<Book>> {
        sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?
            .map(Book::try_from)
            .transpose()
    }

    async fn conditional_put(&self, book: &Book, expected_version: u64) -> AppResult<bool> {
        let total_units = to_db_int(book.total_units, "totalUnits")?;
        let available_units = to_db_int(book.available_units, "inventory")?;
        let next_version = to_db_version(expected_version + 1)?;

        let result = if expected_version == 0 {
            sqlx::query(
                r#"
                INSERT INTO books (
                    isbn, title, author, description, image,
                    total_units, available_units, states, updated_at, version
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (isbn) DO NOTHING
                "#,
            )
            .bind(&book.isbn)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.description)
            .bind(&book.image)
            .bind(total_units)
            .bind(available_units)
            .bind(Json(&book.ledger))
            .bind(book.updated_at)
            .bind(next_version)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE books
                SET title = $2, author = $3, description = $4, image = $5,
                    total_units = $6, available_units = $7, states = $8,
                    updated_at = $9, version = $10
                WHERE isbn = $1 AND version = $11
                "#,
            )
            .bind(&book.isbn)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.description)
            .bind(&book.image)
            .bind(total_units)
            .bind(available_units)
            .bind(Json(&book.ledger))
            .bind(book.updated_at)
            .bind(next_version)
            .bind(to_db_version(expected_version)?)
            .execute(&self.pool)
            .await?
        };

        Ok(result.rows_affected() == 1)
    }

    async fn scan(&self) -> AppResult<Vec<Book>> {
        sqlx::query_as::<_, BookRow>("SELECT * FROM books ORDER BY isbn")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Book::try_from)
            .collect()
    }

    async fn delete(&self, isbn: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = $1")
            .bind(isbn)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
