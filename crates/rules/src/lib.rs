//! Buyer-event automation rule engine.
//!
//! This crate provides:
//! - Evaluation contexts indexing a buyer's events by type
//! - A declarative condition language (count, property, threshold,
//!   event_where, all/any/not) interpreted against those contexts
//! - The [`Rule`](evaluator::Rule) seam for closure-based rules
//! - KPI aggregation over fired automations and lead scoring with tiers
//! - YAML rule documents with validation and a hot-reloading filesystem loader

pub mod context;
pub mod error;
pub mod evaluator;
pub mod fire;
pub mod kpi;
pub mod loader;
pub mod ruleset;
pub mod schema;
pub mod scoring;
pub mod validation;

pub use context::EvaluationContext;
pub use error::EngineError;
pub use evaluator::{run_flow, DeclarativeRule, Evidence, FnRule, Rule, RuleEvaluator};
pub use fire::{AutomationFire, Deltas};
pub use kpi::{KpiSummary, SimulationResult};
pub use ruleset::{simulate, RuleSet};
pub use scoring::{LeadScore, LeadTier, ScoringConfig};
