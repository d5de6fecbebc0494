//! Multi-kind rule document container and accessors.

use super::{AutomationRuleSet, CommonMetadata, RuleKind};
use crate::scoring::ScoringConfigRule;

/// A fully deserialized document of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDocument {
    /// Ordered automation rules evaluated against buyer events.
    AutomationRuleSet(AutomationRuleSet),
    /// Behavior weights and tier thresholds for lead scoring.
    ScoringConfig(ScoringConfigRule),
}

impl RuleDocument {
    /// Get the document's metadata regardless of kind.
    pub fn metadata(&self) -> &CommonMetadata {
        match self {
            RuleDocument::AutomationRuleSet(doc) => &doc.metadata,
            RuleDocument::ScoringConfig(doc) => &doc.metadata,
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            RuleDocument::AutomationRuleSet(_) => RuleKind::AutomationRuleSet,
            RuleDocument::ScoringConfig(_) => RuleKind::ScoringConfig,
        }
    }

    pub fn as_rule_set(&self) -> Option<&AutomationRuleSet> {
        match self {
            RuleDocument::AutomationRuleSet(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_scoring_config(&self) -> Option<&ScoringConfigRule> {
        match self {
            RuleDocument::ScoringConfig(doc) => Some(doc),
            _ => None,
        }
    }

    /// Serialize this document to JSON, delegating to the inner type.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            RuleDocument::AutomationRuleSet(d) => serde_json::to_value(d),
            RuleDocument::ScoringConfig(d) => serde_json::to_value(d),
        }
    }
}
