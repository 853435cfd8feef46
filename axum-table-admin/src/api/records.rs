//! Mutation endpoints
//!
//! Responses are always `200 OK` with a [`MutationResponse`](crate::api::MutationResponse)
//! body once the table resolves; the `outcome` field says whether the write
//! succeeded, was skipped by sandbox mode or failed (and why).

use axum::{
    extract::{Path, State},
    response::{Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::{error_response, outcome_response};
use crate::database::DatabaseProvider;
use crate::record::Attributes;
use crate::table::TableAdmin;

/// Request body for create and update
#[derive(Debug, Deserialize)]
pub struct RecordBody {
    /// Raw attribute values keyed by column name
    pub record: Attributes,
}

/// Handler for POST /tables/{table}/records
pub async fn create_record_handler<DB: DatabaseProvider>(
    State(admin): State<Arc<TableAdmin<DB>>>,
    Path(table_name): Path<String>,
    Json(body): Json<RecordBody>,
) -> Response {
    match admin.table(&table_name).await {
        Ok(table) => outcome_response(table.create(body.record).await),
        Err(error) => error_response(&format!("Failed to create a record in '{}'", table_name), error),
    }
}

/// Handler for PUT /tables/{table}/records/{pk}
///
/// The record is looked up first; a missing record is a 404, not an outcome.
pub async fn update_record_handler<DB: DatabaseProvider>(
    State(admin): State<Arc<TableAdmin<DB>>>,
    Path((table_name, primary_key)): Path<(String, String)>,
    Json(body): Json<RecordBody>,
) -> Response {
    let result = match admin.table(&table_name).await {
        Ok(table) => table.update(&primary_key, body.record).await,
        Err(error) => Err(error),
    };

    match result {
        Ok(outcome) => outcome_response(outcome),
        Err(error) => error_response(
            &format!("Failed to update '{}' in table '{}'", primary_key, table_name),
            error,
        ),
    }
}

/// Handler for DELETE /tables/{table}/records/{pk}
pub async fn delete_record_handler<DB: DatabaseProvider>(
    State(admin): State<Arc<TableAdmin<DB>>>,
    Path((table_name, primary_key)): Path<(String, String)>,
) -> Response {
    match admin.table(&table_name).await {
        Ok(table) => outcome_response(table.delete(&primary_key).await),
        Err(error) => error_response(
            &format!("Failed to delete '{}' from table '{}'", primary_key, table_name),
            error,
        ),
    }
}

/// Handler for POST /tables/{table}/truncate
pub async fn truncate_handler<DB: DatabaseProvider>(
    State(admin): State<Arc<TableAdmin<DB>>>,
    Path(table_name): Path<String>,
) -> Response {
    match admin.table(&table_name).await {
        Ok(table) => outcome_response(table.truncate().await),
        Err(error) => error_response(&format!("Failed to truncate table '{}'", table_name), error),
    }
}
