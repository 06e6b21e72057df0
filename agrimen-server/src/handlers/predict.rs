//! Single prediction handlers (JSON body or HTML form post)

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Form, Json,
};
use uuid::Uuid;
use validator::Validate;

use agrimen_core::InputRecord;

use crate::models::{LocaleQuery, PredictRequest, PredictResponse};
use crate::{AppResult, AppState};

fn run(state: &AppState, name: &str, record: &InputRecord, locale: Option<&str>) -> AppResult<PredictResponse> {
    let bundle = state.context.model(name)?;
    let locale = state.context.locale_or_default(locale);

    let prediction = bundle.predict_record(record, locale)?;
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, model = %name, display = %prediction.display, "Prediction served");

    Ok(PredictResponse { request_id, prediction })
}

/// JSON `{fields, locale}`
pub async fn predict_json(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<PredictRequest>,
) -> AppResult<Json<PredictResponse>> {
    req.validate()?;
    let response = run(&state, &name, &req.fields, req.locale.as_deref())?;
    Ok(Json(response))
}

/// URL-encoded form; a `locale` form field wins over the query string
pub async fn predict_form(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LocaleQuery>,
    Form(mut form): Form<HashMap<String, String>>,
) -> AppResult<Json<PredictResponse>> {
    let query = LocaleQuery { locale: form.remove("locale").or(query.locale) };
    query.validate()?;

    let record: InputRecord = form.into_iter().collect();
    let response = run(&state, &name, &record, query.locale.as_deref())?;
    Ok(Json(response))
}
