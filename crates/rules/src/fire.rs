//! Automation fire records produced when a rule's condition holds.

use serde::{Deserialize, Serialize};

/// Score adjustments carried by a fired automation. Absent keys count as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Deltas {
    #[serde(default, alias = "signal_lock", skip_serializing_if = "Option::is_none")]
    pub signal_lock: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment: Option<f64>,
    #[serde(default, alias = "lead_score", skip_serializing_if = "Option::is_none")]
    pub lead_score: Option<f64>,
}

impl Deltas {
    pub fn new(signal_lock: f64, commitment: f64, lead_score: f64) -> Self {
        Self {
            signal_lock: Some(signal_lock),
            commitment: Some(commitment),
            lead_score: Some(lead_score),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.signal_lock.is_none() && self.commitment.is_none() && self.lead_score.is_none()
    }
}

/// The record produced when a rule fires.
///
/// `actions` are opaque identifiers (e.g. `send_email:seq_design_consult.step1`,
/// `osc_handoff`) for a downstream system; the engine never executes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutomationFire {
    pub rule_id: String,
    pub reason: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub deltas: Deltas,
}

impl AutomationFire {
    pub fn new(
        rule_id: impl Into<String>,
        reason: impl Into<String>,
        actions: Vec<String>,
        deltas: Deltas,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            reason: reason.into(),
            actions,
            deltas,
        }
    }
}
