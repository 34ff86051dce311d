//! Lending server
//!
//! REST JSON API over a book catalog whose units are checked out and
//! returned by authenticated borrowers. Every write is a conditional write
//! on the record version, so concurrent workers sharing one store never
//! lose an update.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
