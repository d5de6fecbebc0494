//! Declarative condition language for automation rules.
//!
//! A [`Condition`] is a tree of single-key maps: primitives test the event
//! history (`count`, `property`, `threshold`, `event_where`) and the logical
//! nodes (`all`, `any`, `not`) combine them.
//!
//! ```yaml
//! when:
//!   all:
//!     - count: { event: view_plan, min: 3, within: { duration: 48h } }
//!     - property: { event: chat_message, key: intent, contains: timeline }
//! ```

use std::time::Duration;

use buyerflow_core::EventType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A predicate over an evaluation context.
///
/// Each node is a single-key map naming its operator. Struct variants keep
/// the key in the YAML so the tree reads the same in both directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged, deny_unknown_fields)]
pub enum Condition {
    /// At least `min` events of one type, optionally windowed or grouped.
    Count { count: CountCondition },
    /// At least one event whose property equals or contains a value.
    Property { property: PropertyCondition },
    /// At least one event whose numeric property passes a comparison.
    Threshold { threshold: ThresholdCondition },
    /// At least one single event satisfying every property test at once.
    EventWhere { event_where: EventWhereCondition },
    /// Every child holds.
    All { all: Vec<Condition> },
    /// At least one child holds.
    Any { any: Vec<Condition> },
    /// The child does not hold.
    Not { not: Box<Condition> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CountCondition {
    pub event: EventType,
    pub min: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<TimeWindow>,
    /// Count only the largest group of events sharing this property's value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PropertyCondition {
    pub event: EventType,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdCondition {
    pub event: EventType,
    pub key: String,
    pub operator: ThresholdOperator,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EventWhereCondition {
    pub event: EventType,
    #[serde(rename = "where")]
    pub tests: IndexMap<String, PropertyTest>,
}

/// Comparison operators for threshold conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl ThresholdOperator {
    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            ThresholdOperator::Gt => value > threshold,
            ThresholdOperator::Gte => value >= threshold,
            ThresholdOperator::Lt => value < threshold,
            ThresholdOperator::Lte => value <= threshold,
            ThresholdOperator::Eq => (value - threshold).abs() <= f64::EPSILON,
            ThresholdOperator::Neq => (value - threshold).abs() > f64::EPSILON,
        }
    }
}

/// Tests applied to one property value. Every populated field must hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PropertyTest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neq: Option<f64>,
}

impl PropertyTest {
    pub fn is_empty(&self) -> bool {
        *self == PropertyTest::default()
    }

    fn numeric_bounds(&self) -> [(ThresholdOperator, Option<f64>); 6] {
        [
            (ThresholdOperator::Gt, self.gt),
            (ThresholdOperator::Gte, self.gte),
            (ThresholdOperator::Lt, self.lt),
            (ThresholdOperator::Lte, self.lte),
            (ThresholdOperator::Eq, self.eq),
            (ThresholdOperator::Neq, self.neq),
        ]
    }

    pub fn has_numeric_bounds(&self) -> bool {
        self.numeric_bounds().iter().any(|(_, b)| b.is_some())
    }

    /// Check a property value against every populated test.
    /// An absent property never matches.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };

        if let Some(expected) = &self.equals {
            if !values_equal(value, expected) {
                return false;
            }
        }

        if let Some(needle) = &self.contains {
            match value.as_str() {
                Some(hay) if hay.to_lowercase().contains(&needle.to_lowercase()) => {}
                _ => return false,
            }
        }

        if self.has_numeric_bounds() {
            let Some(n) = numeric(value) else {
                return false;
            };
            for (op, bound) in self.numeric_bounds() {
                if let Some(b) = bound {
                    if !op.compare(n, b) {
                        return false;
                    }
                }
            }
        }

        true
    }
}

impl From<&PropertyCondition> for PropertyTest {
    fn from(c: &PropertyCondition) -> Self {
        PropertyTest {
            equals: c.equals.clone(),
            contains: c.contains.clone(),
            ..Default::default()
        }
    }
}

impl From<&ThresholdCondition> for PropertyTest {
    fn from(c: &ThresholdCondition) -> Self {
        let mut test = PropertyTest::default();
        let v = Some(c.value);
        match c.operator {
            ThresholdOperator::Gt => test.gt = v,
            ThresholdOperator::Gte => test.gte = v,
            ThresholdOperator::Lt => test.lt = v,
            ThresholdOperator::Lte => test.lte = v,
            ThresholdOperator::Eq => test.eq = v,
            ThresholdOperator::Neq => test.neq = v,
        }
        test
    }
}

/// Numeric view of a JSON value; numeric strings are accepted.
/// Non-finite results such as `"NaN"` or `"inf"` are not numbers here.
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Grouping key for a property value. Numbers share a key when
/// [`values_equal`] would call them equal, so `5` and `5.0` group together.
pub(crate) fn group_key(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            Some(f) => format!("{f}"),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// JSON equality where `5` and `5.0` compare equal.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() <= f64::EPSILON,
            _ => x == y,
        },
        _ => a == b,
    }
}

// ── Time windows ─────────────────────────────────────────────────────

/// Restricts a count to events near an anchor event of the same type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimeWindow {
    /// Human-readable duration such as `48h`, `2d`, `1h30m`.
    pub duration: String,
    #[serde(default)]
    pub anchor: WindowAnchor,
}

/// Which event of the type the window is measured from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
    /// Window runs forward from the first event.
    First,
    /// Window runs backward from the most recent event.
    #[default]
    Last,
}

impl TimeWindow {
    pub fn parse_duration(&self) -> Option<Duration> {
        parse_duration(&self.duration)
    }
}

/// Parse a human-readable duration string into a [`Duration`].
///
/// Supports components: `Xd` (days), `Xh` (hours), `Xm` (minutes), `Xs` (seconds).
/// Components can be combined: "2h30m", "1d12h", "90s".
/// Returns `None` if the string is empty or unparseable.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total_secs: u64 = 0;
    let mut num_buf = String::new();
    let mut found_unit = false;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
        } else {
            let n: u64 = num_buf.parse().ok()?;
            num_buf.clear();
            let unit: u64 = match ch {
                'd' => 86_400,
                'h' => 3_600,
                'm' => 60,
                's' => 1,
                _ => return None,
            };
            total_secs = total_secs.checked_add(n.checked_mul(unit)?)?;
            found_unit = true;
        }
    }

    // A bare number is seconds; trailing digits after a unit are ambiguous.
    if !num_buf.is_empty() {
        if found_unit {
            return None;
        }
        total_secs = total_secs.checked_add(num_buf.parse::<u64>().ok()?)?;
    }

    if total_secs == 0 {
        return None;
    }

    Some(Duration::from_secs(total_secs))
}

// ── Labels ───────────────────────────────────────────────────────────

impl Condition {
    /// Short operator label used in validation paths.
    pub fn label(&self) -> &'static str {
        match self {
            Condition::Count { .. } => "count",
            Condition::Property { .. } => "property",
            Condition::Threshold { .. } => "threshold",
            Condition::EventWhere { .. } => "event_where",
            Condition::All { .. } => "all",
            Condition::Any { .. } => "any",
            Condition::Not { .. } => "not",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn duration_components() {
        assert_eq!(parse_duration("48h"), Some(Duration::from_secs(48 * 3600)));
        assert_eq!(parse_duration("1d12h"), Some(Duration::from_secs(36 * 3600)));
        assert_eq!(parse_duration("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("30m15"), None);
        assert_eq!(parse_duration("3w"), None);
        assert_eq!(parse_duration("0h"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn duration_overflow_is_rejected() {
        assert_eq!(parse_duration("300000000000000d"), None);
        assert_eq!(parse_duration("18446744073709551615s1s"), None);
        assert_eq!(parse_duration("99999999999999999999"), None);
    }

    #[test]
    fn non_finite_strings_are_not_numeric() {
        assert_eq!(numeric(&json!("NaN")), None);
        assert_eq!(numeric(&json!("inf")), None);
        assert_eq!(numeric(&json!("-infinity")), None);
        assert_eq!(numeric(&json!(" 42.5 ")), Some(42.5));

        let test = PropertyTest {
            neq: Some(0.0),
            ..Default::default()
        };
        assert!(!test.matches(Some(&json!("NaN"))));
    }

    #[test]
    fn group_key_normalises_numbers() {
        assert_eq!(group_key(&json!(5)), group_key(&json!(5.0)));
        assert_ne!(group_key(&json!(5)), group_key(&json!(5.5)));
        assert_ne!(group_key(&json!(5)), group_key(&json!("5")));
    }

    #[test]
    fn contains_is_case_insensitive() {
        let test = PropertyTest {
            contains: Some("TIMELINE".into()),
            ..Default::default()
        };
        assert!(test.matches(Some(&json!("timeline_inquiry"))));
        assert!(!test.matches(Some(&json!("pricing"))));
        assert!(!test.matches(Some(&json!(42))));
        assert!(!test.matches(None));
    }

    #[test]
    fn equals_treats_int_and_float_alike() {
        let test = PropertyTest {
            equals: Some(json!(5)),
            ..Default::default()
        };
        assert!(test.matches(Some(&json!(5.0))));
        assert!(!test.matches(Some(&json!("5"))));
    }

    #[test]
    fn numeric_bounds_all_apply() {
        let test = PropertyTest {
            gt: Some(300.0),
            lte: Some(600.0),
            ..Default::default()
        };
        assert!(test.matches(Some(&json!(400))));
        assert!(test.matches(Some(&json!("450"))));
        assert!(!test.matches(Some(&json!(300))));
        assert!(!test.matches(Some(&json!(601))));
        assert!(!test.matches(Some(&json!("n/a"))));
    }

    #[test]
    fn threshold_converts_to_single_bound() {
        let cond = ThresholdCondition {
            event: EventType::ReturnVisit,
            key: "time_on_site".into(),
            operator: ThresholdOperator::Gte,
            value: 300.0,
        };
        let test = PropertyTest::from(&cond);
        assert_eq!(test.gte, Some(300.0));
        assert!(test.matches(Some(&json!(300))));
        assert!(!test.matches(Some(&json!(299))));
    }

    #[test]
    fn parse_nested_yaml_tree() {
        let yaml = r#"
any:
  - count: { event: zoom_lot, min: 2 }
  - not:
      event_where:
        event: return_visit
        where:
          time_on_site: { gt: 300 }
          pages_viewed: { gte: 5 }
"#;
        let cond: Condition = serde_yaml::from_str(yaml).unwrap();
        let Condition::Any { any: children } = &cond else {
            panic!("expected any");
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(&children[0], Condition::Count { count } if count.min == 2));
        let Condition::Not { not: inner } = &children[1] else {
            panic!("expected not");
        };
        let Condition::EventWhere { event_where } = inner.as_ref() else {
            panic!("expected event_where");
        };
        assert_eq!(event_where.event, EventType::ReturnVisit);
        assert_eq!(event_where.tests["time_on_site"].gt, Some(300.0));
    }

    #[test]
    fn yaml_tree_serializes_back_to_operator_keys() {
        let yaml = r#"
all:
  - count: { event: view_plan, min: 3 }
  - property: { event: view_plan, key: plan, equals: aspen }
"#;
        let cond: Condition = serde_yaml::from_str(yaml).unwrap();
        let value = serde_json::to_value(&cond).unwrap();
        assert_eq!(value["all"][0]["count"]["min"], json!(3));
        assert_eq!(value["all"][1]["property"]["equals"], json!("aspen"));

        let back: Condition = serde_json::from_value(value).unwrap();
        assert_eq!(back, cond);
    }

    #[test]
    fn loads_through_yaml_value() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("not: { count: { event: schedule_tour, min: 1 } }").unwrap();
        let cond: Condition = serde_yaml::from_value(value).unwrap();
        assert_eq!(cond.label(), "not");
    }

    #[test]
    fn two_operators_in_one_node_are_rejected() {
        let yaml = "count: { event: zoom_lot, min: 2 }\nall: []";
        assert!(serde_yaml::from_str::<Condition>(yaml).is_err());
    }

    #[test]
    fn unknown_field_in_primitive_is_rejected() {
        let yaml = "count: { event: zoom_lot, minimum: 2 }";
        assert!(serde_yaml::from_str::<Condition>(yaml).is_err());
    }

    #[test]
    fn window_anchor_defaults_to_last() {
        let w: TimeWindow = serde_yaml::from_str("duration: 48h").unwrap();
        assert_eq!(w.anchor, WindowAnchor::Last);
        assert_eq!(w.parse_duration(), Some(Duration::from_secs(172_800)));
    }
}
