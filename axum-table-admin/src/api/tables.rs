//! Table listing and schema endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::api::error_response;
use crate::database::DatabaseProvider;
use crate::schema::TablesResponse;
use crate::table::TableAdmin;

/// Handler for GET /tables
///
/// Returns the accessible tables with row counts; denied tables are left out.
///
/// # Arguments
///
/// * `admin` - Admin state
///
/// # Returns
///
/// JSON response containing list of tables
pub async fn list_tables_handler<DB: DatabaseProvider>(
    State(admin): State<Arc<TableAdmin<DB>>>,
) -> Response {
    match admin.tables().await {
        Ok(tables) => (StatusCode::OK, Json(TablesResponse { tables })).into_response(),
        Err(error) => error_response("Failed to list tables", error),
    }
}

/// Handler for GET /tables/{table}
///
/// Returns the schema information for a specific table including columns,
/// primary keys, foreign keys, and indexes.
///
/// # Arguments
///
/// * `admin` - Admin state
/// * `table_name` - Name of the table to describe
///
/// # Returns
///
/// JSON response containing table schema information
pub async fn get_table_schema_handler<DB: DatabaseProvider>(
    State(admin): State<Arc<TableAdmin<DB>>>,
    Path(table_name): Path<String>,
) -> Response {
    match admin.table(&table_name).await {
        Ok(table) => (StatusCode::OK, Json(table.schema().as_ref())).into_response(),
        Err(error) => error_response(
            &format!("Failed to get schema for table '{}'", table_name),
            error,
        ),
    }
}
