//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "buyerflow API",
        version = "0.1.0",
        description = "Rule engine turning buyer event histories into automation fires, KPIs, and lead scores.",
    ),
    tags(
        (name = "Health", description = "Server readiness"),
        (name = "Simulation", description = "Evaluate a rule set against a buyer's events"),
        (name = "Scoring", description = "Lead scores and tiers"),
        (name = "Rules", description = "Rule document listing, validation, and reload"),
    ),
    paths(
        crate::api::health::health,
        crate::api::simulate::simulate,
        crate::api::score::score,
        crate::api::rules::list_rules,
        crate::api::rules::validate_rules,
        crate::api::rules::reload_rules,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::health::HealthResponse,
        crate::api::simulate::SimulateRequest,
        crate::api::score::ScoreRequest,
        crate::api::score::LeadInput,
        crate::api::score::ScoredLead,
        crate::api::score::ScoreResponse,
        crate::api::rules::DocumentSummary,
    ))
)]
pub struct ApiDoc;
