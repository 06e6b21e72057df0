//! Prediction payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use agrimen_core::{BatchPolicy, InputRecord, Prediction};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct LocaleQuery {
    #[validate(length(min = 2, max = 16))]
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PredictRequest {
    /// Column name → value (numbers or strings)
    pub fields: InputRecord,
    #[serde(default)]
    #[validate(length(min = 2, max = 16))]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub prediction: Prediction,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct BatchQuery {
    pub policy: Option<BatchPolicy>,
    #[validate(length(min = 2, max = 16))]
    pub locale: Option<String>,
}
