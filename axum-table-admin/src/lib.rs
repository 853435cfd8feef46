//! # axum-table-admin
//!
//! Browse, search, edit and export the rows of arbitrary SQL tables over
//! HTTP, easily integrable as an Axum layer.
//!
//! ## Features
//!
//! - Table discovery with a configurable denylist
//! - One dynamic record type for every table, typed per column
//! - Ransack-style search (`q[name_cont]=...`, `q[s]=id desc`) compiled to
//!   parameterized SQL, with the executed query rendered for display
//! - Create, update, delete and truncate behind a sandbox (read-only) switch
//! - Streaming full-table export
//! - Support for SQLite and PostgreSQL
//!
//! ## Security Warning
//!
//! There is no authentication or authorization built in. Anyone who can reach
//! the router can read and modify every accessible table. Mount it behind
//! your own access control, or run it with `sandbox` enabled.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use axum_table_admin::{AdminConfig, BlankToNull, Normalizers, TableAdminLayer};
//! use sqlx::SqlitePool;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = SqlitePool::connect("sqlite::memory:")
//!         .await
//!         .unwrap();
//!
//!     let normalizers = Normalizers::new()
//!         .register("users", BlankToNull::new(["stripe_account"]));
//!
//!     let app = Router::new()
//!         .route("/", get(|| async { "Hello, World!" }))
//!         .merge(
//!             TableAdminLayer::sqlite("/admin", pool, AdminConfig::default())
//!                 .with_normalizers(normalizers)
//!                 .into_router(),
//!         );
//!
//!     // Serve the application...
//! }
//! ```

// Public modules
pub mod api;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod guard;
pub mod layer;
pub mod model;
pub mod normalize;
pub mod query;
pub mod record;
pub mod schema;
pub mod table;
pub mod value;

// Public exports
pub use catalog::Catalog;
pub use config::AdminConfig;
pub use error::{Error, ErrorCategory, Result};
pub use guard::{Mutation, MutationGuard, Outcome, OutcomeStatus};
pub use layer::TableAdminLayer;
pub use model::{DynamicModel, ResultPage};
pub use normalize::{BlankToNull, Normalizer, Normalizers};
pub use query::{Operator, QueryBuilder, SearchRequest, SortOrder, Statement};
pub use record::{Attributes, PrimaryKey, Record};
pub use schema::{ColumnInfo, ForeignKey, IndexInfo, SemanticType, TableInfo, TableSchema};
pub use table::{RowExport, Table, TableAdmin};
pub use value::Value;

// Re-export database providers
pub use database::DatabaseProvider;

#[cfg(feature = "sqlite")]
pub use database::sqlite::SqliteProvider;

#[cfg(feature = "postgres")]
pub use database::postgres::PostgresProvider;
