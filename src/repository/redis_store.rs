//! Redis catalog store.
//!
//! Each book is a hash `book:{isbn}` with a `version` field and the JSON
//! record in `data`; the set `books` indexes every stored ISBN. The
//! compare-and-swap runs as a Lua script so the version check and the write
//! are atomic on the server.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};

use super::CatalogStore;
use crate::{
    error::{AppError, AppResult},
    models::book::Book,
};

const INDEX_KEY: &str = "books";

static CONDITIONAL_PUT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local current = redis.call('HGET', KEYS[1], 'version')
        if current == false then current = '0' end
        if current ~= ARGV[1] then return 0 end
        redis.call('HSET', KEYS[1], 'version', ARGV[2], 'data', ARGV[3])
        redis.call('SADD', KEYS[2], ARGV[4])
        return 1
        "#,
    )
});

fn book_key(isbn: &str) -> String {
    format!("book:{}", isbn)
}

#[derive(Clone)]
pub struct RedisCatalogStore {
    conn: ConnectionManager,
}

impl RedisCatalogStore {
    /// Connect and verify the server answers
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        let store = Self { conn };
        store.ping().await?;
        Ok(store)
    }
}

#[async_trait]
impl CatalogStore for RedisCatalogStore {
    async fn get(&self, isbn: &str) -> AppResult<Option<Book>> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.hget(book_key(isbn), "data").await?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn conditional_put(&self, book: &Book, expected_version: u64) -> AppResult<bool> {
        let mut stored = book.clone();
        stored.version = expected_version + 1;
        let data = serde_json::to_string(&stored)?;

        let mut conn = self.conn.clone();
        let swapped: i32 = CONDITIONAL_PUT
            .key(book_key(&book.isbn))
            .key(INDEX_KEY)
            .arg(expected_version.to_string())
            .arg(stored.version.to_string())
            .arg(data)
            .arg(&book.isbn)
            .invoke_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }

    async fn scan(&self) -> AppResult<Vec<Book>> {
        let mut conn = self.conn.clone();
        let mut isbns: Vec<String> = conn.smembers(INDEX_KEY).await?;
        if isbns.is_empty() {
            return Ok(Vec::new());
        }
        isbns.sort();

        let mut pipe = redis::pipe();
        for isbn in &isbns {
            pipe.hget(book_key(isbn), "data");
        }
        let records: Vec<Option<String>> = pipe.query_async(&mut conn).await?;

        // A record deleted between SMEMBERS and HGET comes back as nil
        records
            .into_iter()
            .flatten()
            .map(|json| serde_json::from_str::<Book>(&json).map_err(AppError::from))
            .collect()
    }

    async fn delete(&self, isbn: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let (removed, _): (i32, i32) = redis::pipe()
            .atomic()
            .del(book_key(isbn))
            .srem(INDEX_KEY, isbn)
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
