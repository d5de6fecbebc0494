//! ScoringConfig validation: weights and tier ordering.

use buyerflow_core::EventType;

use super::fuzzy::fuzzy_match;
use super::ValidationResult;
use crate::scoring::ScoringConfig;

pub(super) fn validate_scoring_config(spec: &ScoringConfig, result: &mut ValidationResult) {
    if spec.weights.is_empty() {
        result.warn("spec.weights", "no weights defined; every lead scores 0");
    }

    let known: Vec<&str> = EventType::KNOWN.iter().map(|t| t.as_str()).collect();
    for (event, weight) in &spec.weights {
        let path = format!("spec.weights.{event}");
        if !weight.is_finite() {
            result.error(path.as_str(), "weight must be a finite number");
        }
        if !EventType::from(event.as_str()).is_known() {
            let message = format!("'{event}' is not a built-in event type");
            match fuzzy_match(event, &known) {
                Some(s) => {
                    result.warn_with_suggestion(path, message, format!("Did you mean '{s}'?"))
                }
                None => result.warn(path, message),
            }
        }
    }

    // Tier thresholds must be non-increasing from AAA down to C.
    let t = &spec.thresholds;
    if !(t.aaa >= t.a && t.a >= t.b && t.b >= t.c) {
        result.error(
            "spec.thresholds",
            format!(
                "thresholds must be descending: AAA({}) >= A({}) >= B({}) >= C({})",
                t.aaa, t.a, t.b, t.c
            ),
        );
    }
}
