//! Full-table export as newline-delimited JSON

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::api::error_response;
use crate::database::DatabaseProvider;
use crate::error::Error;
use crate::table::TableAdmin;
use crate::value::Value;

/// Rows buffered between the database cursor and the response body
const EXPORT_BUFFER: usize = 64;

/// Handler for GET /tables/{table}/export
///
/// The first line holds the column descriptors, every following line one row
/// as a JSON array in column order. Rows are streamed from a cursor; if the
/// client goes away the cursor is closed and its connection returned.
pub async fn export_handler<DB: DatabaseProvider>(
    State(admin): State<Arc<TableAdmin<DB>>>,
    Path(table_name): Path<String>,
) -> Response {
    let table = match admin.table(&table_name).await {
        Ok(table) => table,
        Err(error) => return error_response(&format!("Failed to export table '{}'", table_name), error),
    };

    let export = table.export();
    let header_line = match serde_json::to_string(&serde_json::json!({ "columns": export.columns() })) {
        Ok(line) => line,
        Err(error) => {
            return error_response(
                &format!("Failed to export table '{}'", table_name),
                Error::Unknown(error.to_string()),
            )
        }
    };

    let rows = export.into_channel_stream(EXPORT_BUFFER).map(|row| {
        row.map(|values| {
            let line = serde_json::Value::Array(values.iter().map(Value::to_json).collect());
            format!("{line}\n")
        })
    });
    let body = stream::once(async move { Ok::<_, Error>(format!("{header_line}\n")) }).chain(rows);

    let disposition = format!("attachment; filename=\"{}.ndjson\"", table.name().replace('"', ""));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/x-ndjson".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(body),
    )
        .into_response()
}
