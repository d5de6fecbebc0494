//! HTTP endpoint modules.
//!
//! Each sub-module owns one endpoint group. The shared error body and the
//! mapping from library errors to status codes live here.

pub mod doc;
pub mod health;
pub mod rules;
pub mod score;
pub mod simulate;


use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use buyerflow_rules::loader::RuleError;
use buyerflow_rules::EngineError;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    /// Failing rule, for evaluation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            rule_id: None,
        }),
    )
}

/// Malformed input is the caller's fault; a failing rule is ours.
pub(crate) fn engine_error(err: EngineError) -> ApiError {
    let (status, rule_id) = match &err {
        EngineError::InvalidInput(_) => (StatusCode::BAD_REQUEST, None),
        EngineError::RuleEvaluation { rule_id, .. } => {
            tracing::error!(rule_id = %rule_id, error = %err, "rule evaluation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Some(rule_id.clone()))
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            rule_id,
        }),
    )
}

pub(crate) fn rule_error(err: RuleError) -> ApiError {
    let status = match &err {
        RuleError::NotFound { .. } => StatusCode::NOT_FOUND,
        RuleError::Parse(_) | RuleError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RuleError::Io(_) | RuleError::Notify(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, err.to_string())
}
