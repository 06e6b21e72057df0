//! Model and locale introspection payloads

use serde::{Deserialize, Serialize};
use validator::Validate;

use agrimen_core::logic::features::{FormField, LayoutInfo};
use agrimen_core::logic::model::ModelStatus;
use agrimen_core::ModelSummary;

#[derive(Debug, Serialize)]
pub struct ModelDetail {
    #[serde(flatten)]
    pub summary: ModelSummary,
    pub layout: LayoutInfo,
    pub fields: Vec<FormField>,
    pub status: ModelStatus,
}

#[derive(Debug, Serialize)]
pub struct LocalesResponse {
    pub default_locale: String,
    pub locales: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct LocaleTableQuery {
    #[validate(length(min = 1, max = 128))]
    pub model: Option<String>,
}
