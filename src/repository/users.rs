//! Users repository: role lookups against the identity service's table

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::user::Role};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Role of `uid`, `None` for unknown identities
    pub async fn role_of(&self, uid: &str) -> AppResult<Option<Role>> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role.and_then(|r| match r.parse() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!("Ignoring unknown role for user {}: {}", uid, e);
                None
            }
        }))
    }
}
