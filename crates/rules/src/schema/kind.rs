//! Document kind enum for two-pass deserialization dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    AutomationRuleSet,
    ScoringConfig,
}

impl RuleKind {
    pub const ALL: [&'static str; 2] = ["AutomationRuleSet", "ScoringConfig"];
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::AutomationRuleSet => write!(f, "AutomationRuleSet"),
            RuleKind::ScoringConfig => write!(f, "ScoringConfig"),
        }
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "AutomationRuleSet" => Ok(RuleKind::AutomationRuleSet),
            "ScoringConfig" => Ok(RuleKind::ScoringConfig),
            other => Err(format!("unknown rule kind: '{}'", other)),
        }
    }
}
