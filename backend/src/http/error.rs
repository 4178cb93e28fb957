//! Error bodies and status mapping for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

/// JSON body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Stable machine-readable code, e.g. `TARGET_NOT_FOUND`
    pub code: String,
    pub message: String,
    /// Set to `"retryable"` when the same request may succeed later
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(self, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..self
        }
    }
}

impl From<&PlannerError> for ApiError {
    fn from(err: &PlannerError) -> Self {
        let body = ApiError::new(planner_status(err).1, err.to_string());
        if err.is_retryable() {
            body.with_details("retryable")
        } else {
            body
        }
    }
}

/// Failure of a handler.
#[derive(Debug)]
pub enum AppError {
    /// Request fields that fail validation before reaching the planner
    BadRequest(String),
    /// Failures outside the planner, e.g. a panicked worker task
    Internal(String),
    Planner(PlannerError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Planner(e) => planner_status(e).0,
        }
    }
}

fn planner_status(err: &PlannerError) -> (StatusCode, &'static str) {
    match err {
        PlannerError::NameNotResolved(_) => (StatusCode::NOT_FOUND, "NAME_NOT_RESOLVED"),
        PlannerError::Network(_) => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR"),
        PlannerError::ConfigurationNotFound(_) => {
            (StatusCode::NOT_FOUND, "CONFIGURATION_NOT_FOUND")
        }
        PlannerError::TargetNotFound(_) => (StatusCode::NOT_FOUND, "TARGET_NOT_FOUND"),
        PlannerError::UnknownSite(_) => (StatusCode::NOT_FOUND, "UNKNOWN_SITE"),
        PlannerError::DateNotInPlan(_) => (StatusCode::BAD_REQUEST, "DATE_NOT_IN_PLAN"),
        PlannerError::InvalidDate(_) => (StatusCode::BAD_REQUEST, "INVALID_DATE"),
        PlannerError::InvalidWindow(_) => (StatusCode::BAD_REQUEST, "INVALID_WINDOW"),
        PlannerError::InvalidCoordinate(_) => (StatusCode::BAD_REQUEST, "INVALID_COORDINATE"),
        PlannerError::InvalidSite(_) => (StatusCode::BAD_REQUEST, "INVALID_SITE"),
        PlannerError::Configuration(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg.as_str()),
            AppError::Internal(msg) => {
                log::error!("Internal error: {}", msg);
                ApiError::new("INTERNAL_ERROR", msg.as_str())
            }
            AppError::Planner(e) => ApiError::from(e),
        };
        (status, Json(body)).into_response()
    }
}

impl From<PlannerError> for AppError {
    fn from(err: PlannerError) -> Self {
        AppError::Planner(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<PlannerError>() {
            Ok(planner) => AppError::Planner(planner),
            Err(other) => AppError::Internal(other.to_string()),
        }
    }
}
