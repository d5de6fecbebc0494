//! Rule document listing, validation, and reload.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use buyerflow_rules::loader::LoadResult;
use buyerflow_rules::schema::RuleDocument;
use buyerflow_rules::validation::{validate_yaml, ValidationResult};

use super::{rule_error, ApiError, ErrorResponse};
use crate::state::AppState;

/// Lightweight summary returned by GET /rules.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Enabled rules, for automation rule sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<String>>,
}

impl From<&RuleDocument> for DocumentSummary {
    fn from(doc: &RuleDocument) -> Self {
        let meta = doc.metadata();
        Self {
            id: meta.id.clone(),
            name: meta.name.clone(),
            kind: doc.kind().to_string(),
            enabled: meta.enabled,
            description: meta.description.clone(),
            tags: meta.tags.clone(),
            rules: doc
                .as_rule_set()
                .map(|set| set.enabled_rules().map(|r| r.id.clone()).collect()),
        }
    }
}

#[utoipa::path(
    get,
    path = "/rules",
    tag = "Rules",
    responses(
        (status = 200, description = "Loaded rule documents", body = Vec<DocumentSummary>)
    )
)]
pub async fn list_rules(State(state): State<Arc<AppState>>) -> Json<Vec<DocumentSummary>> {
    let docs = state.loader.documents();
    Json(docs.iter().map(DocumentSummary::from).collect())
}

#[utoipa::path(
    post,
    path = "/rules/validate",
    tag = "Rules",
    request_body(content = String, content_type = "application/yaml", description = "Rule document in YAML format"),
    responses(
        (status = 200, description = "Document is valid (warnings may be present)", body = Object),
        (status = 400, description = "Document has errors", body = Object)
    )
)]
pub async fn validate_rules(body: String) -> (StatusCode, Json<ValidationResult>) {
    let result = validate_yaml(&body);
    let status = if result.valid {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(result))
}

#[utoipa::path(
    post,
    path = "/rules/reload",
    tag = "Rules",
    responses(
        (status = 200, description = "Per-file load results", body = Vec<Object>),
        (status = 500, description = "Rules directory could not be scanned", body = ErrorResponse)
    )
)]
pub async fn reload_rules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LoadResult>>, ApiError> {
    let results = state.loader.load_all().map_err(rule_error)?;
    info!(
        files = results.len(),
        documents = state.loader.len(),
        "rules reloaded on request"
    );
    Ok(Json(results))
}
