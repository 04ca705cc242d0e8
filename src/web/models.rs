use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

use crate::core::orchestrator::QueryType;

/// Health check response
#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub orchestrator_state: String,
    pub active_components: usize,
    pub version: String,
    pub errors: Vec<String>,
}

/// Component info response
#[derive(Serialize, Deserialize)]
pub struct ComponentInfoResponse {
    pub id: String,
    pub component_type: String,
    pub status: String,
    pub info: serde_json::Value,
}

/// Query request
#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub query_type: QueryType,
}

/// Query string for metric history
#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Raw component task request
#[derive(Deserialize)]
pub struct TaskRequest {
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Generic response
#[derive(Serialize)]
pub struct GenericResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> GenericResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, error_code: &str) -> Self {
        Self {
            success: false,
            error: error.into(),
            error_code: error_code.to_string(),
        }
    }
}
