//! Model introspection handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use agrimen_core::ModelSummary;

use crate::models::{LocaleQuery, ModelDetail};
use crate::{AppResult, AppState};

/// List all served models
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> AppResult<Json<Vec<ModelSummary>>> {
    query.validate()?;
    let locale = state.context.locale_or_default(query.locale.as_deref());

    let summaries: Vec<ModelSummary> = state.context.models().map(|m| m.summary(locale)).collect();
    Ok(Json(summaries))
}

/// Schema, form fields and runtime status of one model
pub async fn get(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> AppResult<Json<ModelDetail>> {
    query.validate()?;
    let locale = state.context.locale_or_default(query.locale.as_deref());
    let bundle = state.context.model(&name)?;

    Ok(Json(ModelDetail {
        summary: bundle.summary(locale),
        layout: bundle.layout_info(),
        fields: bundle.form_fields(locale),
        status: bundle.status(),
    }))
}
