//! AutomationRuleSet validation: rule ids, condition trees, reasons, actions.

use std::collections::HashSet;

use buyerflow_core::EventType;

use super::fuzzy::fuzzy_match;
use super::ValidationResult;
use crate::evaluator::validate_reason;
use crate::schema::{AutomationRuleSet, Condition, PropertyTest, RuleDefinition};

pub(super) fn validate_rule_set(set: &AutomationRuleSet, result: &mut ValidationResult) {
    if set.spec.rules.is_empty() {
        result.warn("spec.rules", "rule set has no rules");
    }

    let mut seen = HashSet::new();
    for (idx, rule) in set.spec.rules.iter().enumerate() {
        let path = format!("spec.rules[{idx}]");

        if rule.id.trim().is_empty() {
            result.error(format!("{path}.id"), "rule id must not be empty");
        } else if !seen.insert(rule.id.as_str()) {
            result.error(
                format!("{path}.id"),
                format!("duplicate rule id '{}'", rule.id),
            );
        }

        validate_rule(rule, &path, result);
    }
}

fn validate_rule(rule: &RuleDefinition, path: &str, result: &mut ValidationResult) {
    validate_condition(&rule.when, &format!("{path}.when"), result);

    if let Some(reason) = &rule.reason {
        if let Err(e) = validate_reason(reason) {
            result.error(format!("{path}.reason"), format!("invalid reason template: {e}"));
        }
    }

    for (j, action) in rule.then.iter().enumerate() {
        if action.trim().is_empty() {
            result.error(format!("{path}.then[{j}]"), "action must not be empty");
        }
    }

    for (name, value) in [
        ("signalLock", rule.deltas.signal_lock),
        ("commitment", rule.deltas.commitment),
        ("leadScore", rule.deltas.lead_score),
    ] {
        if value.is_some_and(|v| !v.is_finite()) {
            result.error(format!("{path}.deltas.{name}"), "delta must be a finite number");
        }
    }
}

fn validate_condition(cond: &Condition, path: &str, result: &mut ValidationResult) {
    let here = format!("{path}.{}", cond.label());
    match cond {
        Condition::Count { count: c } => {
            validate_event_type(&c.event, &here, result);
            if c.min == 0 {
                result.warn(format!("{here}.min"), "min of 0 always holds");
            }
            if let Some(window) = &c.within {
                if window.parse_duration().is_none() {
                    result.error(
                        format!("{here}.within.duration"),
                        format!(
                            "invalid duration '{}' (expected e.g. '48h', '2d', '1h30m')",
                            window.duration
                        ),
                    );
                }
            }
            if c.same.as_ref().is_some_and(|k| k.trim().is_empty()) {
                result.error(format!("{here}.same"), "grouping property must not be empty");
            }
        }
        Condition::Property { property: c } => {
            validate_event_type(&c.event, &here, result);
            validate_key(&c.key, &here, result);
            if c.equals.is_none() && c.contains.is_none() {
                result.error(
                    here.as_str(),
                    "property condition needs 'equals' or 'contains'",
                );
            }
        }
        Condition::Threshold { threshold: c } => {
            validate_event_type(&c.event, &here, result);
            validate_key(&c.key, &here, result);
            if !c.value.is_finite() {
                result.error(format!("{here}.value"), "threshold must be a finite number");
            }
        }
        Condition::EventWhere { event_where: c } => {
            validate_event_type(&c.event, &here, result);
            if c.tests.is_empty() {
                result.error(format!("{here}.where"), "'where' needs at least one property test");
            }
            for (key, test) in &c.tests {
                validate_property_test(test, &format!("{here}.where.{key}"), result);
            }
        }
        Condition::All { all: children } | Condition::Any { any: children } => {
            if children.is_empty() {
                result.error(
                    here.as_str(),
                    format!("'{}' needs at least one condition", cond.label()),
                );
            }
            for (i, child) in children.iter().enumerate() {
                validate_condition(child, &format!("{here}[{i}]"), result);
            }
        }
        Condition::Not { not: inner } => validate_condition(inner, &here, result),
    }
}

fn validate_event_type(event: &EventType, path: &str, result: &mut ValidationResult) {
    if event.is_blank() {
        result.error(format!("{path}.event"), "event type must not be empty");
        return;
    }
    if event.is_known() {
        return;
    }

    let known: Vec<&str> = EventType::KNOWN.iter().map(|t| t.as_str()).collect();
    let message = format!("'{}' is not a built-in event type", event);
    match fuzzy_match(event.as_str(), &known) {
        Some(suggestion) => result.warn_with_suggestion(
            format!("{path}.event"),
            message,
            format!("Did you mean '{suggestion}'?"),
        ),
        None => result.warn(format!("{path}.event"), message),
    }
}

fn validate_key(key: &str, path: &str, result: &mut ValidationResult) {
    if key.trim().is_empty() {
        result.error(format!("{path}.key"), "property key must not be empty");
    }
}

fn validate_property_test(test: &PropertyTest, path: &str, result: &mut ValidationResult) {
    if test.is_empty() {
        result.error(
            path,
            "property test needs at least one of equals, contains, gt, gte, lt, lte, eq, neq",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::validate_yaml;

    fn rule_set(rules: &str) -> String {
        format!(
            "apiVersion: v1\nkind: AutomationRuleSet\nmetadata:\n  id: test-set\n  name: Test\nspec:\n  rules:\n{rules}"
        )
    }

    #[test]
    fn valid_nested_tree() {
        let yaml = rule_set(
            r#"    - id: combo
      when:
        all:
          - count: { event: view_plan, min: 3, within: { duration: 48h }, same: plan_id }
          - not: { property: { event: chat_message, key: intent, contains: spam } }
          - event_where: { event: return_visit, where: { pages_viewed: { gte: 5 } } }
      reason: "{{ count }} signals"
      then: [osc_handoff]
"#,
        );
        let result = validate_yaml(&yaml);
        assert!(result.valid, "{}", result.error_summary());
    }

    #[test]
    fn reports_nested_paths() {
        let yaml = rule_set(
            r#"    - id: broken
      when:
        any:
          - count: { event: view_plan, min: 3, within: { duration: soon } }
          - all: []
          - property: { event: chat_message, key: intent }
          - event_where: { event: return_visit, where: { pages_viewed: {} } }
      reason: "{{ count "
      then: [""]
"#,
        );
        let result = validate_yaml(&yaml);
        let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "spec.rules[0].when.any[0].count.within.duration",
                "spec.rules[0].when.any[1].all",
                "spec.rules[0].when.any[2].property",
                "spec.rules[0].when.any[3].event_where.where.pages_viewed",
                "spec.rules[0].reason",
                "spec.rules[0].then[0]",
            ]
        );
    }

    #[test]
    fn duplicate_and_empty_rule_ids() {
        let yaml = rule_set(
            r#"    - id: a
      when: { count: { event: zoom_lot, min: 1 } }
    - id: a
      when: { count: { event: zoom_lot, min: 2 } }
    - id: " "
      when: { count: { event: zoom_lot, min: 2 } }
"#,
        );
        let result = validate_yaml(&yaml);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].message.contains("duplicate rule id 'a'"));
        assert_eq!(result.errors[1].path, "spec.rules[2].id");
    }

    #[test]
    fn unknown_event_type_warns_with_suggestion() {
        let yaml = rule_set(
            r#"    - id: typo
      when: { count: { event: zoom_lots, min: 0 } }
"#,
        );
        let result = validate_yaml(&yaml);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);
        let typo = &result.warnings[0];
        assert_eq!(typo.path, "spec.rules[0].when.count.event");
        assert_eq!(typo.suggestion.as_deref(), Some("Did you mean 'zoom_lot'?"));
        assert_eq!(result.warnings[1].path, "spec.rules[0].when.count.min");
    }

    #[test]
    fn empty_rule_list_is_a_warning() {
        let yaml = "apiVersion: v1\nkind: AutomationRuleSet\nmetadata: { id: empty, name: Empty }\nspec: { rules: [] }\n";
        let result = validate_yaml(yaml);
        assert!(result.valid);
        assert_eq!(result.warnings[0].path, "spec.rules");
    }
}
