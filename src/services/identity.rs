//! Identity collaborator: who may act as a librarian

use std::collections::HashSet;

use async_trait::async_trait;

use crate::{error::AppResult, models::user::Role, repository::UsersRepository};

/// Answers whether an authenticated caller holds the librarian capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn authorize_librarian(&self, caller_id: &str) -> AppResult<bool>;
}

/// Looks roles up in the `users` table
#[derive(Clone)]
pub struct DirectoryIdentityService {
    users: UsersRepository,
}

impl DirectoryIdentityService {
    pub fn new(users: UsersRepository) -> Self {
        Self { users }
    }
}

#[async_trait]
impl IdentityService for DirectoryIdentityService {
    async fn authorize_librarian(&self, caller_id: &str) -> AppResult<bool> {
        Ok(self.users.role_of(caller_id).await? == Some(Role::Librarian))
    }
}

/// Fixed set of librarian identifiers from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityService {
    librarians: HashSet<String>,
}

impl StaticIdentityService {
    pub fn new<I, S>(librarians: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            librarians: librarians.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl IdentityService for StaticIdentityService {
    async fn authorize_librarian(&self, caller_id: &str) -> AppResult<bool> {
        Ok(self.librarians.contains(caller_id))
    }
}
