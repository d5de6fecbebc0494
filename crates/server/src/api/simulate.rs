//! Run a buyer's event history through a rule set.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use buyerflow_core::BuyerEvent;
use buyerflow_rules::SimulationResult;

use super::{engine_error, rule_error, ApiError, ErrorResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRequest {
    /// Events in arrival order.
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<BuyerEvent>,
    /// Rule set id; the configured default when omitted.
    #[serde(default)]
    pub rule_set: Option<String>,
}

#[utoipa::path(
    post,
    path = "/simulate",
    tag = "Simulation",
    request_body = SimulateRequest,
    responses(
        (status = 200, description = "Fired automations and KPI totals", body = Object),
        (status = 400, description = "An event is malformed", body = ErrorResponse),
        (status = 404, description = "Rule set not loaded", body = ErrorResponse),
        (status = 500, description = "A rule failed during evaluation", body = ErrorResponse)
    )
)]
pub async fn simulate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulateRequest>,
) -> Result<Json<SimulationResult>, ApiError> {
    let id = req
        .rule_set
        .as_deref()
        .unwrap_or(&state.config.rules.default_rule_set);
    let rule_set = state.loader.rule_set(id).map_err(rule_error)?;

    let result = rule_set.simulate(&req.events).map_err(engine_error)?;
    info!(
        rule_set = %id,
        events = result.kpis.events_processed,
        fired = result.kpis.automations_fired,
        "simulation complete"
    );
    Ok(Json(result))
}
