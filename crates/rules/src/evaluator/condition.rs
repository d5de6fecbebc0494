//! Interpreter for the declarative condition tree.
//!
//! A satisfied condition yields [`Evidence`]: the events that made it true,
//! in arrival order. Logical nodes combine evidence as follows:
//! - `all` merges every child's evidence, each event once, in arrival order
//! - `any` takes the evidence of the first satisfied child
//! - `not` carries no evidence

use std::collections::HashSet;

use buyerflow_core::{BuyerEvent, EventType};
use indexmap::IndexMap;

use crate::context::EvaluationContext;
use crate::schema::{
    group_key, Condition, CountCondition, EventWhereCondition, PropertyTest, TimeWindow,
    WindowAnchor,
};

/// Events supporting a satisfied condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evidence<'a> {
    pub events: Vec<&'a BuyerEvent>,
}

impl<'a> Evidence<'a> {
    pub fn new(events: Vec<&'a BuyerEvent>) -> Self {
        Self { events }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.events.len()
    }

    /// Earliest-arrived matching event.
    pub fn first(&self) -> Option<&'a BuyerEvent> {
        self.events.first().copied()
    }

    pub fn last(&self) -> Option<&'a BuyerEvent> {
        self.events.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Evaluate a condition tree. `Ok(None)` means the condition does not hold.
///
/// Errors are malformed conditions discovered at evaluation time, such as
/// an unparseable window duration.
pub fn evaluate_condition<'a>(
    condition: &Condition,
    ctx: &EvaluationContext<'a>,
) -> Result<Option<Evidence<'a>>, String> {
    match condition {
        Condition::Count { count: c } => evaluate_count(c, ctx),
        Condition::Property { property: c } => {
            let test = PropertyTest::from(c);
            Ok(matching(ctx, &c.event, |e| test.matches(e.prop(&c.key))))
        }
        Condition::Threshold { threshold: c } => {
            let test = PropertyTest::from(c);
            Ok(matching(ctx, &c.event, |e| test.matches(e.prop(&c.key))))
        }
        Condition::EventWhere { event_where: c } => Ok(evaluate_event_where(c, ctx)),
        Condition::All { all: children } => {
            let mut members: HashSet<*const BuyerEvent> = HashSet::new();
            for child in children {
                match evaluate_condition(child, ctx)? {
                    Some(evidence) => {
                        members.extend(evidence.events.iter().map(|e| *e as *const BuyerEvent))
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some(merge_in_arrival_order(ctx, &members)))
        }
        Condition::Any { any: children } => {
            for child in children {
                if let Some(evidence) = evaluate_condition(child, ctx)? {
                    return Ok(Some(evidence));
                }
            }
            Ok(None)
        }
        Condition::Not { not: inner } => Ok(match evaluate_condition(inner, ctx)? {
            Some(_) => None,
            None => Some(Evidence::empty()),
        }),
    }
}

/// Context events whose address is in `members`, in arrival order.
fn merge_in_arrival_order<'a>(
    ctx: &EvaluationContext<'a>,
    members: &HashSet<*const BuyerEvent>,
) -> Evidence<'a> {
    let events = ctx
        .events()
        .iter()
        .filter(|e| members.contains(&(*e as *const BuyerEvent)))
        .collect();
    Evidence::new(events)
}

/// Events of one type passing `pred`; `None` when there are none.
fn matching<'a>(
    ctx: &EvaluationContext<'a>,
    event_type: &EventType,
    pred: impl Fn(&BuyerEvent) -> bool,
) -> Option<Evidence<'a>> {
    let events: Vec<&'a BuyerEvent> = ctx
        .of_type(event_type)
        .iter()
        .copied()
        .filter(|e| pred(*e))
        .collect();
    if events.is_empty() {
        None
    } else {
        Some(Evidence::new(events))
    }
}

fn evaluate_event_where<'a>(
    c: &EventWhereCondition,
    ctx: &EvaluationContext<'a>,
) -> Option<Evidence<'a>> {
    matching(ctx, &c.event, |e| {
        c.tests.iter().all(|(key, test)| test.matches(e.prop(key)))
    })
}

fn evaluate_count<'a>(
    c: &CountCondition,
    ctx: &EvaluationContext<'a>,
) -> Result<Option<Evidence<'a>>, String> {
    let mut candidates: Vec<&'a BuyerEvent> = ctx.of_type(&c.event).to_vec();

    if let Some(window) = &c.within {
        candidates = apply_window(candidates, window)?;
    }

    if let Some(key) = &c.same {
        candidates = largest_group(candidates, key);
    }

    if candidates.len() >= c.min {
        Ok(Some(Evidence::new(candidates)))
    } else {
        Ok(None)
    }
}

/// Keep events within `window` of the anchor event.
///
/// The anchor is the first or last event of the list (arrival order). With a
/// `last` anchor an event qualifies when it happened at most `duration`
/// before the anchor; with `first`, at most `duration` after it. Events on
/// the wrong side of the anchor never qualify.
fn apply_window<'a>(
    events: Vec<&'a BuyerEvent>,
    window: &TimeWindow,
) -> Result<Vec<&'a BuyerEvent>, String> {
    let duration = window
        .parse_duration()
        .ok_or_else(|| format!("invalid window duration '{}'", window.duration))?;
    let duration = chrono::Duration::from_std(duration).map_err(|e| e.to_string())?;

    let anchor = match window.anchor {
        WindowAnchor::First => events.first(),
        WindowAnchor::Last => events.last(),
    };
    let Some(anchor) = anchor.copied() else {
        return Ok(events);
    };

    let zero = chrono::Duration::zero();
    Ok(events
        .into_iter()
        .filter(|e| {
            let delta = match window.anchor {
                WindowAnchor::Last => anchor.timestamp - e.timestamp,
                WindowAnchor::First => e.timestamp - anchor.timestamp,
            };
            delta >= zero && delta <= duration
        })
        .collect())
}

/// The largest group of events sharing a value for `key`.
///
/// Events without the property are excluded. Numeric values group by value
/// (`5` with `5.0`). Ties go to the group whose value appeared first.
fn largest_group<'a>(events: Vec<&'a BuyerEvent>, key: &str) -> Vec<&'a BuyerEvent> {
    let mut groups: IndexMap<String, Vec<&'a BuyerEvent>> = IndexMap::new();
    for event in events {
        if let Some(value) = event.prop(key) {
            groups.entry(group_key(value)).or_default().push(event);
        }
    }

    let mut best: Vec<&'a BuyerEvent> = Vec::new();
    for (_, group) in groups {
        if group.len() > best.len() {
            best = group;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const HOUR: i64 = 3600;

    fn ev(secs: i64, t: &str) -> BuyerEvent {
        BuyerEvent::new(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(), t)
    }

    fn cond(yaml: &str) -> Condition {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn eval<'a>(c: &Condition, ctx: &EvaluationContext<'a>) -> Option<Evidence<'a>> {
        evaluate_condition(c, ctx).unwrap()
    }

    #[test]
    fn count_without_window() {
        let events = vec![ev(0, "zoom_lot"), ev(10, "view_plan"), ev(20, "zoom_lot")];
        let ctx = EvaluationContext::build(&events).unwrap();

        let evidence = eval(&cond("count: { event: zoom_lot, min: 2 }"), &ctx).unwrap();
        assert_eq!(evidence.count(), 2);
        assert!(std::ptr::eq(evidence.first().unwrap(), &events[0]));

        assert!(eval(&cond("count: { event: zoom_lot, min: 3 }"), &ctx).is_none());
    }

    #[test]
    fn window_anchored_on_last_event() {
        // one view 72h before the latest, two inside 48h
        let events = vec![
            ev(0, "view_plan"),
            ev(40 * HOUR, "view_plan"),
            ev(72 * HOUR, "view_plan"),
        ];
        let ctx = EvaluationContext::build(&events).unwrap();

        let c = cond("count: { event: view_plan, min: 2, within: { duration: 48h } }");
        let evidence = eval(&c, &ctx).unwrap();
        assert_eq!(evidence.count(), 2);

        let c = cond("count: { event: view_plan, min: 3, within: { duration: 48h } }");
        assert!(eval(&c, &ctx).is_none());
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let events = vec![ev(0, "view_plan"), ev(48 * HOUR, "view_plan")];
        let ctx = EvaluationContext::build(&events).unwrap();
        let c = cond("count: { event: view_plan, min: 2, within: { duration: 48h } }");
        assert!(eval(&c, &ctx).is_some());
    }

    #[test]
    fn window_anchored_on_first_event() {
        let events = vec![
            ev(0, "view_plan"),
            ev(10 * HOUR, "view_plan"),
            ev(60 * HOUR, "view_plan"),
        ];
        let ctx = EvaluationContext::build(&events).unwrap();
        let c = cond(
            "count: { event: view_plan, min: 2, within: { duration: 48h, anchor: first } }",
        );
        let evidence = eval(&c, &ctx).unwrap();
        assert_eq!(evidence.count(), 2);
        assert!(std::ptr::eq(evidence.last().unwrap(), &events[1]));
    }

    #[test]
    fn events_after_last_anchor_in_time_are_excluded() {
        // arrival order puts the earliest timestamp last
        let events = vec![ev(10 * HOUR, "view_plan"), ev(0, "view_plan")];
        let ctx = EvaluationContext::build(&events).unwrap();
        let c = cond("count: { event: view_plan, min: 2, within: { duration: 48h } }");
        assert!(eval(&c, &ctx).is_none());
    }

    #[test]
    fn invalid_duration_is_an_error() {
        let events = vec![ev(0, "view_plan")];
        let ctx = EvaluationContext::build(&events).unwrap();
        let c = cond("count: { event: view_plan, min: 1, within: { duration: soon } }");
        let err = evaluate_condition(&c, &ctx).unwrap_err();
        assert!(err.contains("soon"));
    }

    #[test]
    fn same_groups_by_property_after_windowing() {
        let events = vec![
            ev(0, "view_plan").with_prop("plan", "aspen"),
            ev(1, "view_plan").with_prop("plan", "birch"),
            ev(2, "view_plan").with_prop("plan", "aspen"),
            ev(3, "view_plan"),
            ev(4, "view_plan").with_prop("plan", "aspen"),
        ];
        let ctx = EvaluationContext::build(&events).unwrap();

        let c = cond("count: { event: view_plan, min: 3, same: plan }");
        let evidence = eval(&c, &ctx).unwrap();
        assert_eq!(evidence.count(), 3);
        assert!(evidence.events.iter().all(|e| e.prop_str("plan") == Some("aspen")));

        let c = cond("count: { event: view_plan, min: 4, same: plan }");
        assert!(eval(&c, &ctx).is_none());
    }

    #[test]
    fn property_equals_and_contains() {
        let events = vec![
            ev(0, "download_brochure").with_prop("document", "floor_plans"),
            ev(1, "download_brochure").with_prop("document", "pricing_sheet"),
            ev(2, "chat_message").with_prop("intent", "Customization_Question"),
        ];
        let ctx = EvaluationContext::build(&events).unwrap();

        let c = cond("property: { event: download_brochure, key: document, equals: pricing_sheet }");
        let evidence = eval(&c, &ctx).unwrap();
        assert!(std::ptr::eq(evidence.first().unwrap(), &events[1]));

        let c = cond("property: { event: chat_message, key: intent, contains: custom }");
        assert!(eval(&c, &ctx).is_some());

        let c = cond("property: { event: chat_message, key: missing, contains: custom }");
        assert!(eval(&c, &ctx).is_none());
    }

    #[test]
    fn threshold_compares_numeric_property() {
        let events = vec![
            ev(0, "return_visit").with_prop("time_on_site", 120),
            ev(1, "return_visit").with_prop("time_on_site", "420"),
        ];
        let ctx = EvaluationContext::build(&events).unwrap();
        let c = cond("threshold: { event: return_visit, key: time_on_site, operator: gt, value: 300 }");
        let evidence = eval(&c, &ctx).unwrap();
        assert_eq!(evidence.count(), 1);
        assert_eq!(evidence.first().unwrap().prop("time_on_site"), Some(&json!("420")));
    }

    #[test]
    fn event_where_requires_one_event_to_pass_every_test() {
        // each property passes on a different event
        let events = vec![
            ev(0, "return_visit")
                .with_prop("time_on_site", 400)
                .with_prop("pages_viewed", 2),
            ev(1, "return_visit")
                .with_prop("time_on_site", 100)
                .with_prop("pages_viewed", 8),
        ];
        let ctx = EvaluationContext::build(&events).unwrap();
        let c = cond(
            "event_where: { event: return_visit, where: { time_on_site: { gt: 300 }, pages_viewed: { gte: 5 } } }",
        );
        assert!(eval(&c, &ctx).is_none());

        let mut more = events.clone();
        more.push(
            ev(2, "return_visit")
                .with_prop("time_on_site", 301)
                .with_prop("pages_viewed", 5),
        );
        let ctx = EvaluationContext::build(&more).unwrap();
        let evidence = eval(&c, &ctx).unwrap();
        assert_eq!(evidence.count(), 1);
        assert!(std::ptr::eq(evidence.first().unwrap(), &more[2]));
    }

    #[test]
    fn all_merges_evidence_in_arrival_order() {
        let events = vec![ev(0, "zoom_lot"), ev(1, "cta_click"), ev(2, "zoom_lot")];
        let ctx = EvaluationContext::build(&events).unwrap();
        let c = cond(
            r#"
all:
  - count: { event: cta_click, min: 1 }
  - count: { event: zoom_lot, min: 2 }
"#,
        );
        let evidence = eval(&c, &ctx).unwrap();
        assert_eq!(evidence.count(), 3);
        assert!(std::ptr::eq(evidence.first().unwrap(), &events[0]));
        assert!(std::ptr::eq(evidence.last().unwrap(), &events[2]));
        assert!(evidence.events[1].is_type(&EventType::CtaClick));
    }

    #[test]
    fn all_counts_shared_events_once() {
        let events = vec![
            ev(0, "view_plan").with_prop("plan", "aspen"),
            ev(1, "view_plan").with_prop("plan", "aspen"),
            ev(2, "view_plan").with_prop("plan", "aspen"),
        ];
        let ctx = EvaluationContext::build(&events).unwrap();
        let c = cond(
            r#"
all:
  - count: { event: view_plan, min: 3 }
  - property: { event: view_plan, key: plan, equals: aspen }
"#,
        );
        let evidence = eval(&c, &ctx).unwrap();
        assert_eq!(evidence.count(), 3);
        for (got, want) in evidence.events.iter().zip(&events) {
            assert!(std::ptr::eq(*got, want));
        }
    }

    #[test]
    fn same_groups_numeric_values_by_value() {
        let events = vec![
            ev(0, "view_plan").with_prop("plan_id", 5),
            ev(1, "view_plan").with_prop("plan_id", 5.0),
            ev(2, "view_plan").with_prop("plan_id", "5"),
        ];
        let ctx = EvaluationContext::build(&events).unwrap();
        let c = cond("count: { event: view_plan, min: 2, same: plan_id }");
        let evidence = eval(&c, &ctx).unwrap();
        assert_eq!(evidence.count(), 2);
        assert!(std::ptr::eq(evidence.last().unwrap(), &events[1]));
    }

    #[test]
    fn any_takes_first_satisfied_child() {
        let events = vec![ev(0, "zoom_lot"), ev(1, "cta_click")];
        let ctx = EvaluationContext::build(&events).unwrap();
        let c = cond(
            r#"
any:
  - count: { event: schedule_tour, min: 1 }
  - count: { event: cta_click, min: 1 }
  - count: { event: zoom_lot, min: 1 }
"#,
        );
        let evidence = eval(&c, &ctx).unwrap();
        assert_eq!(evidence.count(), 1);
        assert!(evidence.first().unwrap().is_type(&EventType::CtaClick));
    }

    #[test]
    fn not_negates_with_empty_evidence() {
        let events = vec![ev(0, "zoom_lot")];
        let ctx = EvaluationContext::build(&events).unwrap();

        let c = cond("not: { count: { event: schedule_tour, min: 1 } }");
        let evidence = eval(&c, &ctx).unwrap();
        assert!(evidence.is_empty());
        assert!(evidence.first().is_none());

        let c = cond("not: { count: { event: zoom_lot, min: 1 } }");
        assert!(eval(&c, &ctx).is_none());
    }

    #[test]
    fn empty_history_satisfies_nothing_positive() {
        let ctx = EvaluationContext::build(&[]).unwrap();
        assert!(eval(&cond("count: { event: zoom_lot, min: 1 }"), &ctx).is_none());
        assert!(eval(&cond("property: { event: chat_message, key: intent, equals: x }"), &ctx).is_none());
    }
}
