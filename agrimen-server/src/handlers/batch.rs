//! Batch scoring handler
//!
//! Multipart CSV in, CSV with the prediction column out. Scoring runs on the
//! blocking pool; the request task only moves bytes.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use uuid::Uuid;
use validator::Validate;

use agrimen_core::{score_table, Table};

use crate::models::BatchQuery;
use crate::{AppError, AppResult, AppState};

const ROWS_SCORED: HeaderName = HeaderName::from_static("x-rows-scored");
const ROWS_FAILED: HeaderName = HeaderName::from_static("x-rows-failed");
const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Upload field holding the table
const FILE_FIELD: &str = "file";

pub async fn score(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<BatchQuery>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    query.validate()?;
    let bundle = state.context.model(&name)?;
    let policy = query.policy.unwrap_or(state.config.batch_policy);
    let locale = state.context.locale_or_default(query.locale.as_deref()).to_string();

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = upload.ok_or_else(|| AppError::BadRequest(format!("missing multipart field '{}'", FILE_FIELD)))?;

    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, model = %name, %policy, bytes = bytes.len(), "Batch upload received");

    let outcome = tokio::task::spawn_blocking(move || {
        let table = Table::from_csv_bytes(&bytes)?;
        let outcome = score_table(&bundle, table, policy, &locale)?;
        let csv = outcome.table.to_csv_bytes()?;
        Ok::<_, agrimen_core::ServingError>((csv, outcome.rows_scored, outcome.rows_failed))
    })
    .await??;
    let (csv, rows_scored, rows_failed) = outcome;

    tracing::info!(%request_id, rows_scored, rows_failed, "Batch scored");

    let disposition = format!("attachment; filename=\"{}_predictions.csv\"", name);
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
        (
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&disposition).map_err(|e| AppError::InternalError(e.to_string()))?,
        ),
        (ROWS_SCORED, HeaderValue::from(rows_scored)),
        (ROWS_FAILED, HeaderValue::from(rows_failed)),
        (
            REQUEST_ID,
            HeaderValue::from_str(&request_id.to_string()).map_err(|e| AppError::InternalError(e.to_string()))?,
        ),
    ];

    Ok((headers, csv).into_response())
}
