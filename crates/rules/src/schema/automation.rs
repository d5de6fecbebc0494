//! Automation rule set documents: the YAML form of an ordered rule list.

use serde::{Deserialize, Serialize};

use super::metadata::default_true;
use super::{CommonMetadata, Condition};
use crate::fire::Deltas;

/// Top-level automation rule set parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AutomationRuleSet {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: AutomationRuleSetSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AutomationRuleSetSpec {
    /// Rules in evaluation order. Fires are returned in this order.
    pub rules: Vec<RuleDefinition>,
}

/// One declarative rule: `when` the condition holds, emit `then` actions with `deltas`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub when: Condition,
    /// Minijinja template for the fire's reason string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub then: Vec<String>,
    #[serde(default)]
    pub deltas: Deltas,
}

impl AutomationRuleSet {
    /// Rule definitions that take part in evaluation, in order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        let set_enabled = self.metadata.enabled;
        self.spec.rules.iter().filter(move |r| set_enabled && r.enabled)
    }
}
