//! Lead scoring for one or many buyers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use buyerflow_core::BuyerEvent;
use buyerflow_rules::scoring::tier_distribution;
use buyerflow_rules::{LeadScore, LeadTier, ScoringConfig};

use super::{api_error, rule_error, ApiError, ErrorResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LeadInput {
    pub name: String,
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<BuyerEvent>,
}

/// Either a single history (`events`) or a batch (`leads`).
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub events: Option<Vec<BuyerEvent>>,
    #[serde(default)]
    pub leads: Option<Vec<LeadInput>>,
    /// ScoringConfig document id; the configured default when omitted.
    #[serde(default)]
    pub scoring_config: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoredLead {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub score: f64,
    #[schema(value_type = String)]
    pub tier: LeadTier,
    pub follow_up: &'static str,
}

impl ScoredLead {
    fn new(name: Option<String>, score: &LeadScore) -> Self {
        Self {
            name,
            score: score.score,
            tier: score.tier,
            follow_up: score.tier.follow_up(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ScoreResponse {
    pub leads: Vec<ScoredLead>,
    /// Lead count per tier, every tier present.
    #[schema(value_type = Object)]
    pub distribution: IndexMap<LeadTier, usize>,
}

#[utoipa::path(
    post,
    path = "/score",
    tag = "Scoring",
    request_body = ScoreRequest,
    responses(
        (status = 200, description = "Scores, tiers, and tier distribution", body = ScoreResponse),
        (status = 400, description = "Neither `events` nor `leads` given", body = ErrorResponse),
        (status = 404, description = "Scoring config not loaded", body = ErrorResponse)
    )
)]
pub async fn score(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let config: ScoringConfig = match req.scoring_config.as_deref() {
        Some(id) => state.loader.scoring_config(id).map_err(rule_error)?,
        None => state.default_scoring(),
    };

    let inputs: Vec<(Option<String>, Vec<BuyerEvent>)> = match (req.events, req.leads) {
        (Some(_), Some(_)) => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "request must carry either `events` or `leads`, not both",
            ))
        }
        (Some(events), None) => vec![(None, events)],
        (None, Some(leads)) => leads.into_iter().map(|l| (Some(l.name), l.events)).collect(),
        (None, None) => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "request must carry `events` or `leads`",
            ))
        }
    };

    let scored: Vec<(Option<String>, LeadScore)> = inputs
        .into_iter()
        .map(|(name, events)| (name, config.score(&events)))
        .collect();

    let distribution = tier_distribution(scored.iter().map(|(_, s)| s));
    let leads = scored
        .iter()
        .map(|(name, s)| ScoredLead::new(name.clone(), s))
        .collect();

    Ok(Json(ScoreResponse { leads, distribution }))
}
