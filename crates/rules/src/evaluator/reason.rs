//! Minijinja rendering for rule reason strings.
//!
//! Reasons are arbitrary strings from rule documents (not pre-registered),
//! so a fresh [`minijinja::Environment`] is created per render call.

use buyerflow_core::{BuyerEvent, Properties};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::condition::Evidence;
use crate::schema::RuleDefinition;

/// Context data available to reason templates.
#[derive(Debug, Clone, Serialize)]
pub struct ReasonContext<'a> {
    /// Number of evidence events.
    pub count: usize,
    /// Earliest-arrived evidence event, if any.
    pub first: Option<EventView<'a>>,
    /// Latest-arrived evidence event, if any.
    pub last: Option<EventView<'a>>,
    pub events: Vec<EventView<'a>>,
    pub rule: RuleView<'a>,
}

/// One event as seen by templates: `{{ first.props.message }}`.
#[derive(Debug, Clone, Serialize)]
pub struct EventView<'a> {
    #[serde(rename = "type")]
    pub event_type: &'a str,
    pub timestamp: DateTime<Utc>,
    pub props: &'a Properties,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleView<'a> {
    pub id: &'a str,
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
}

impl<'a> EventView<'a> {
    fn of(event: &'a BuyerEvent) -> Self {
        Self {
            event_type: event.event_type.as_ref().map(|t| t.as_str()).unwrap_or(""),
            timestamp: event.timestamp,
            props: &event.properties,
        }
    }
}

impl<'a> ReasonContext<'a> {
    pub fn new(rule: &'a RuleDefinition, evidence: &Evidence<'a>) -> Self {
        Self {
            count: evidence.count(),
            first: evidence.first().map(EventView::of),
            last: evidence.last().map(EventView::of),
            events: evidence.events.iter().copied().map(EventView::of).collect(),
            rule: RuleView {
                id: &rule.id,
                name: rule.name.as_deref(),
                description: rule.description.as_deref(),
            },
        }
    }
}

fn build_env() -> minijinja::Environment<'static> {
    let mut env = minijinja::Environment::new();
    env.add_filter("round", round_filter);
    env
}

/// Render a reason template.
pub fn render_reason(template: &str, ctx: &ReasonContext<'_>) -> Result<String, String> {
    let env = build_env();
    env.render_str(template, ctx)
        .map_err(|e| format!("reason template: {e}"))
}

/// Check that a reason template parses, without rendering it.
pub fn validate_reason(template: &str) -> Result<(), String> {
    let env = build_env();
    env.template_from_str(template)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// The reason for a fire: the rendered template, else the rule name, else its id.
pub fn reason_for(rule: &RuleDefinition, evidence: &Evidence<'_>) -> Result<String, String> {
    match &rule.reason {
        Some(template) => render_reason(template, &ReasonContext::new(rule, evidence)),
        None => Ok(rule.name.clone().unwrap_or_else(|| rule.id.clone())),
    }
}

/// Round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}
