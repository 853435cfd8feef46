//! Read endpoints: searching, the blank form record and single-record lookup

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::api::error_response;
use crate::database::DatabaseProvider;
use crate::query::SearchRequest;
use crate::table::TableAdmin;

/// Handler for GET /tables/{table}/data
///
/// Runs a search and returns one page.
///
/// Query parameters:
/// - q[<field>_<predicate>]: filter, e.g. `q[name_cont]=ann`
/// - q[s]: sorts, e.g. `q[s]=created_at desc,id`
/// - page: 1-based page number
/// - per_page: page size (clamped to the configured maximum)
///
/// Filters or sorts that cannot be applied are reported in `warnings`
/// instead of failing the request.
pub async fn get_rows_handler<DB: DatabaseProvider>(
    State(admin): State<Arc<TableAdmin<DB>>>,
    Path(table_name): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let request = SearchRequest::from_pairs(params);

    let result = match admin.table(&table_name).await {
        Ok(table) => table.data(&request).await,
        Err(error) => Err(error),
    };

    match result {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => error_response(
            &format!("Failed to get rows from table '{}'", table_name),
            error,
        ),
    }
}

/// Handler for GET /tables/{table}/new
///
/// Returns a record with every attribute unset, for building a create form.
pub async fn new_record_handler<DB: DatabaseProvider>(
    State(admin): State<Arc<TableAdmin<DB>>>,
    Path(table_name): Path<String>,
) -> Response {
    match admin.table(&table_name).await {
        Ok(table) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "record": table.new_record(),
                "columns": table.schema().columns,
            })),
        )
            .into_response(),
        Err(error) => error_response(&format!("Failed to load table '{}'", table_name), error),
    }
}

/// Handler for GET /tables/{table}/records/{pk}
///
/// Composite keys are passed as their parts joined by `,`.
pub async fn edit_record_handler<DB: DatabaseProvider>(
    State(admin): State<Arc<TableAdmin<DB>>>,
    Path((table_name, primary_key)): Path<(String, String)>,
) -> Response {
    let result = match admin.table(&table_name).await {
        Ok(table) => table.fetch(&primary_key).await,
        Err(error) => Err(error),
    };

    match result {
        Ok(record) => (StatusCode::OK, Json(serde_json::json!({ "record": record }))).into_response(),
        Err(error) => error_response(
            &format!("Failed to fetch '{}' from table '{}'", primary_key, table_name),
            error,
        ),
    }
}
