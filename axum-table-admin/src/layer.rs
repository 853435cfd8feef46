//! TableAdminLayer - Main Axum integration layer
//!
//! This module provides the main entry point for mounting the table admin
//! into an Axum application.

use crate::api::create_api_router;
use crate::config::AdminConfig;
use crate::database::DatabaseProvider;
use crate::normalize::Normalizers;
use crate::table::TableAdmin;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[cfg(feature = "sqlite")]
use crate::database::sqlite::SqliteProvider;

#[cfg(feature = "postgres")]
use crate::database::postgres::PostgresProvider;

/// Main layer for integrating the table admin into an Axum application
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use axum_table_admin::{AdminConfig, TableAdminLayer};
/// use sqlx::SqlitePool;
///
/// # async fn example() {
/// let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
/// let admin = TableAdminLayer::sqlite("/admin", pool, AdminConfig::default());
/// let app = Router::new().merge(admin.into_router());
/// # }
/// ```
pub struct TableAdminLayer<DB: DatabaseProvider> {
    base_path: String,
    admin: TableAdmin<DB>,
}

impl<DB: DatabaseProvider> TableAdminLayer<DB> {
    /// Create a new table admin at the given base path
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the admin will be mounted (e.g., "/admin")
    /// * `database` - The database provider implementation
    /// * `config` - Sandbox flag, denylist and paging settings
    pub fn new(base_path: impl Into<String>, database: DB, config: AdminConfig) -> Self {
        Self {
            base_path: base_path.into(),
            admin: TableAdmin::new(database, config),
        }
    }

    /// Register per-table normalization hooks
    pub fn with_normalizers(mut self, normalizers: Normalizers) -> Self {
        self.admin = self.admin.with_normalizers(normalizers);
        self
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// This method consumes the layer and returns a Router that can be merged
    /// into your main application router.
    ///
    /// The returned router includes:
    /// - API endpoints at `{base_path}/tables/*`
    /// - Permissive CORS middleware for development
    pub fn into_router(self) -> Router {
        let api_router = create_api_router(Arc::new(self.admin));

        let base_path = self.base_path.trim_end_matches('/');
        let router = if base_path.is_empty() {
            api_router
        } else {
            Router::new().nest(base_path, api_router)
        };

        router.layer(CorsLayer::permissive())
    }
}

#[cfg(feature = "sqlite")]
impl TableAdminLayer<SqliteProvider> {
    /// Create a new table admin for SQLite
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the admin will be mounted
    /// * `pool` - The SQLite connection pool
    /// * `config` - Admin configuration; its statement timeout is applied to the provider
    pub fn sqlite(base_path: impl Into<String>, pool: sqlx::SqlitePool, config: AdminConfig) -> Self {
        let provider = SqliteProvider::new(pool).with_timeout(config.statement_timeout);
        Self::new(base_path, provider, config)
    }
}

#[cfg(feature = "postgres")]
impl TableAdminLayer<PostgresProvider> {
    /// Create a new table admin for PostgreSQL
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the admin will be mounted
    /// * `pool` - The PostgreSQL connection pool
    /// * `config` - Admin configuration; its statement timeout is applied to the provider
    pub fn postgres(base_path: impl Into<String>, pool: sqlx::PgPool, config: AdminConfig) -> Self {
        let provider = PostgresProvider::new(pool).with_timeout(config.statement_timeout);
        Self::new(base_path, provider, config)
    }
}
