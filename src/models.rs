use serde::Serialize;

use crate::verdict::Verdict;

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tldr: Option<Verdict>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}
