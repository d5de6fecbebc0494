//! Rule evaluation over a buyer's event history.
//!
//! Every rule is a `when`/`then` pair behind the [`Rule`] trait:
//! - [`DeclarativeRule`] interprets a YAML [`Condition`](crate::schema::Condition)
//!   tree and renders its reason from a minijinja template.
//! - [`FnRule`] wraps Rust closures for rules the condition language cannot express.
//!
//! [`RuleEvaluator`] runs an ordered rule list exhaustively: every rule is
//! checked, each satisfied rule fires once, and fires come back in rule order.

mod condition;
mod declarative;
mod fn_rule;
mod reason;

use std::sync::Arc;

use buyerflow_core::BuyerEvent;

use crate::context::EvaluationContext;
use crate::error::{EngineError, Result};
use crate::fire::AutomationFire;

pub use condition::{evaluate_condition, Evidence};
pub use declarative::DeclarativeRule;
pub use fn_rule::FnRule;
pub use reason::{render_reason, validate_reason, EventView, ReasonContext};

// ── Rule trait ──────────────────────────────────────────────────────

/// A single automation rule.
///
/// `when` decides whether the rule holds and returns the supporting
/// evidence; `then` turns that evidence into a fire. Errors are plain
/// messages; the evaluator attaches the rule id.
pub trait Rule: Send + Sync + std::fmt::Debug {
    fn id(&self) -> &str;

    fn when<'a>(
        &self,
        ctx: &EvaluationContext<'a>,
    ) -> std::result::Result<Option<Evidence<'a>>, String>;

    fn then(
        &self,
        ctx: &EvaluationContext<'_>,
        evidence: &Evidence<'_>,
    ) -> std::result::Result<AutomationFire, String>;
}

// ── Rule evaluator ──────────────────────────────────────────────────

/// Evaluates ordered rule lists against an evaluation context.
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Evaluate every rule in order and collect the fires.
    ///
    /// The first failing rule aborts evaluation with
    /// [`EngineError::RuleEvaluation`]; no partial result is returned.
    pub fn evaluate(
        ctx: &EvaluationContext<'_>,
        rules: &[Arc<dyn Rule>],
    ) -> Result<Vec<AutomationFire>> {
        let mut fires = Vec::new();

        for rule in rules {
            let evidence = rule
                .when(ctx)
                .map_err(|message| EngineError::rule(rule.id(), message))?;

            let Some(evidence) = evidence else {
                tracing::trace!(rule_id = %rule.id(), "Rule not satisfied");
                continue;
            };

            let fire = rule
                .then(ctx, &evidence)
                .map_err(|message| EngineError::rule(rule.id(), message))?;

            tracing::debug!(
                rule_id = %fire.rule_id,
                evidence = evidence.count(),
                actions = fire.actions.len(),
                "Rule fired"
            );
            fires.push(fire);
        }

        Ok(fires)
    }
}

/// Build a context from raw events and evaluate the rules against it.
pub fn run_flow(events: &[BuyerEvent], rules: &[Arc<dyn Rule>]) -> Result<Vec<AutomationFire>> {
    let ctx = EvaluationContext::build(events)?;
    let fires = RuleEvaluator::evaluate(&ctx, rules)?;
    tracing::debug!(
        events = events.len(),
        rules = rules.len(),
        fires = fires.len(),
        "Flow evaluated"
    );
    Ok(fires)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fire::Deltas;
    use buyerflow_core::EventType;
    use chrono::{TimeZone, Utc};

    fn ev(secs: i64, t: &str) -> BuyerEvent {
        BuyerEvent::new(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(), t)
    }

    fn declarative(yaml: &str) -> Arc<dyn Rule> {
        Arc::new(DeclarativeRule::new(serde_yaml::from_str(yaml).unwrap()))
    }

    fn always(id: &'static str) -> Arc<dyn Rule> {
        Arc::new(FnRule::new(
            id,
            |_| Ok(true),
            move |_| Ok(AutomationFire::new(id, id, vec![], Deltas::default())),
        ))
    }

    #[test]
    fn fires_follow_rule_order_not_event_order() {
        let events = vec![ev(0, "zoom_lot"), ev(1, "cta_click")];
        let rules = vec![
            declarative("id: b_cta\nwhen: { count: { event: cta_click, min: 1 } }"),
            declarative("id: a_zoom\nwhen: { count: { event: zoom_lot, min: 1 } }"),
        ];
        let fires = run_flow(&events, &rules).unwrap();
        let ids: Vec<_> = fires.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["b_cta", "a_zoom"]);
    }

    #[test]
    fn each_rule_fires_at_most_once() {
        let events = vec![ev(0, "zoom_lot"), ev(1, "zoom_lot"), ev(2, "zoom_lot")];
        let rules = vec![declarative("id: z\nwhen: { count: { event: zoom_lot, min: 1 } }")];
        assert_eq!(run_flow(&events, &rules).unwrap().len(), 1);
    }

    #[test]
    fn mixes_declarative_and_closure_rules() {
        let events = vec![ev(0, "zoom_lot")];
        let rules = vec![
            always("first"),
            declarative("id: never\nwhen: { count: { event: schedule_tour, min: 1 } }"),
            always("last"),
        ];
        let fires = run_flow(&events, &rules).unwrap();
        let ids: Vec<_> = fires.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "last"]);
    }

    #[test]
    fn failing_rule_aborts_with_its_id() {
        let failing: Arc<dyn Rule> = Arc::new(FnRule::new(
            "broken",
            |_| Err("lookup failed".to_string()),
            |_| unreachable!(),
        ));
        let rules = vec![always("ok"), failing, always("after")];
        let err = run_flow(&[ev(0, "zoom_lot")], &rules).unwrap_err();
        assert_eq!(err, EngineError::rule("broken", "lookup failed"));
        assert_eq!(err.to_string(), "rule 'broken' failed: lookup failed");
    }

    #[test]
    fn reason_render_failure_is_a_rule_error() {
        let rules = vec![declarative(
            "id: bad_reason\nwhen: { count: { event: zoom_lot, min: 1 } }\nreason: \"{{ count \"",
        )];
        let err = run_flow(&[ev(0, "zoom_lot")], &rules).unwrap_err();
        assert!(matches!(
            err,
            EngineError::RuleEvaluation { ref rule_id, .. } if rule_id == "bad_reason"
        ));
    }

    #[test]
    fn invalid_input_is_reported_before_any_rule_runs() {
        let mut events = vec![ev(0, "zoom_lot")];
        events[0].event_type = None;
        let err = run_flow(&events, &[always("x")]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn no_rules_no_fires() {
        assert!(run_flow(&[ev(0, "zoom_lot")], &[]).unwrap().is_empty());
        let ctx = EvaluationContext::build(&[]).unwrap();
        assert!(RuleEvaluator::evaluate(&ctx, &[always("x")]).unwrap().len() == 1);
        assert_eq!(ctx.count(&EventType::ZoomLot), 0);
    }
}
