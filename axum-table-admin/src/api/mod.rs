//! REST API endpoints
//!
//! Thin handlers over [`TableAdmin`]; every decision is made by the core and
//! these functions only translate to and from HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::database::DatabaseProvider;
use crate::error::Error;
use crate::guard::{Outcome, OutcomeStatus};
use crate::table::TableAdmin;

pub mod export;
pub mod records;
pub mod rows;
pub mod tables;

// Re-export handlers for convenience
pub use export::export_handler;
pub use records::{create_record_handler, delete_record_handler, truncate_handler, update_record_handler};
pub use rows::{edit_record_handler, get_rows_handler, new_record_handler};
pub use tables::{get_table_schema_handler, list_tables_handler};

/// Create the API router with all endpoints
///
/// # Arguments
///
/// * `admin` - Shared admin state
///
/// # Returns
///
/// An Axum Router configured with all API routes
pub fn create_api_router<DB: DatabaseProvider>(admin: Arc<TableAdmin<DB>>) -> Router {
    // Note: Axum 0.8 uses {param} syntax instead of :param
    Router::new()
        .route("/tables", get(list_tables_handler::<DB>))
        .route("/tables/{table}", get(get_table_schema_handler::<DB>))
        .route("/tables/{table}/data", get(get_rows_handler::<DB>))
        .route("/tables/{table}/new", get(new_record_handler::<DB>))
        .route("/tables/{table}/records", post(create_record_handler::<DB>))
        .route(
            "/tables/{table}/records/{pk}",
            get(edit_record_handler::<DB>)
                .put(update_record_handler::<DB>)
                .delete(delete_record_handler::<DB>),
        )
        .route("/tables/{table}/truncate", post(truncate_handler::<DB>))
        .route("/tables/{table}/export", get(export_handler::<DB>))
        .with_state(admin)
}

/// HTTP status for a categorized error
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::UnknownTable(_) | Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Constraint(_) => StatusCode::CONFLICT,
        Error::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Operation(_) => StatusCode::BAD_REQUEST,
        Error::Unknown(_) | Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error body with the mapped status
pub(crate) fn error_response(context: &str, error: Error) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!("{}: {}", context, error);
    } else {
        tracing::warn!("{}: {}", context, error);
    }

    let messages = match &error {
        Error::Validation(messages) => messages.clone(),
        other => vec![other.to_string()],
    };
    (
        status,
        Json(serde_json::json!({
            "error": error.to_string(),
            "category": error.category(),
            "messages": messages,
        })),
    )
        .into_response()
}

/// Body of every mutation response
#[derive(Debug, Serialize)]
pub struct MutationResponse<T: Serialize> {
    pub outcome: OutcomeStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<T>,
}

/// Mutation outcomes are always 200; the body carries success or failure
pub(crate) fn outcome_response<T: Serialize>(outcome: Outcome<T>) -> Response {
    let body = MutationResponse {
        outcome: outcome.status(),
        message: outcome.message().to_string(),
        record: outcome.into_value(),
    };
    (StatusCode::OK, Json(body)).into_response()
}
