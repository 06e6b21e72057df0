//! Locale catalog handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use agrimen_core::logic::locale::LocaleTable;

use crate::models::{LocaleTableQuery, LocalesResponse};
use crate::{AppError, AppResult, AppState};

pub async fn list(State(state): State<AppState>) -> Json<LocalesResponse> {
    Json(LocalesResponse {
        default_locale: state.context.default_locale().to_string(),
        locales: state.context.locales(),
    })
}

/// UI strings for one locale, across every model or scoped to `?model=`
pub async fn get(
    State(state): State<AppState>,
    Path(locale): Path<String>,
    Query(query): Query<LocaleTableQuery>,
) -> AppResult<Json<LocaleTable>> {
    query.validate()?;

    let table = match &query.model {
        Some(name) => {
            let bundle = state.context.model(name)?;
            let catalog = bundle.catalog();
            catalog.contains(&locale).then(|| catalog.table(&locale).clone())
        }
        None => state.context.locale_table(&locale),
    };

    table
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Locale '{}' not found", locale)))
}
