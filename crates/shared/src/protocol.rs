use serde::{Deserialize, Serialize};

use crate::domain::{Action, HistoryEntry};

/// `POST /api/files` success body. `message` carries the remote video URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
}

/// `POST /api/predict` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub video_url: String,
}

/// `POST /api/predict` success body. A missing or null `predictions` field is
/// an empty result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Option<Vec<Action>>,
}

impl PredictResponse {
    pub fn into_actions(self) -> Vec<Action> {
        self.predictions.unwrap_or_default()
    }
}

/// `GET /api/actions` success body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub actions: Vec<HistoryEntry>,
}
