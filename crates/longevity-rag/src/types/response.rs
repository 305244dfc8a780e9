//! Response types for the HTTP surface

use serde::{Deserialize, Serialize};

/// POST /ask response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    /// Generated answer, verbatim from the chat model
    pub answer: String,
}

/// GET / response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: "longevity backend is running".to_string(),
        }
    }
}
