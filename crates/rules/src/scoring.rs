//! ScoringConfig document kind: per-behavior lead scoring weights and
//! AAA/A/B/C tier thresholds.

use buyerflow_core::BuyerEvent;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::CommonMetadata;

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level ScoringConfig document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfigRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: ScoringConfig,
}

/// Behavior weights and tier boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Event type name → points added per occurrence.
    pub weights: IndexMap<String, f64>,
    #[serde(default)]
    pub thresholds: TierThresholds,
}

/// Minimum score for each tier. Boundaries are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TierThresholds {
    #[serde(rename = "AAA")]
    pub aaa: f64,
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "C")]
    pub c: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            aaa: 80.0,
            a: 60.0,
            b: 40.0,
            c: 0.0,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let weights = [
            ("view_plan", 3.0),
            ("zoom_lot", 5.0),
            ("download_brochure", 4.0),
            ("chat_message", 7.0),
            ("cta_click", 8.0),
            ("return_visit", 6.0),
            ("schedule_tour", 10.0),
            ("pricing_inquiry", 9.0),
            ("customization_request", 8.0),
            ("timeline_inquiry", 9.0),
            ("financing_question", 7.0),
            ("repeat_visitor", 5.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            weights,
            thresholds: TierThresholds::default(),
        }
    }
}

/// Lead priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LeadTier {
    #[serde(rename = "AAA")]
    Aaa,
    A,
    B,
    C,
}

impl LeadTier {
    pub const ALL: [LeadTier; 4] = [LeadTier::Aaa, LeadTier::A, LeadTier::B, LeadTier::C];

    /// Highest tier whose threshold the score reaches; anything lower is `C`.
    pub fn classify(score: f64, thresholds: &TierThresholds) -> Self {
        if score >= thresholds.aaa {
            LeadTier::Aaa
        } else if score >= thresholds.a {
            LeadTier::A
        } else if score >= thresholds.b {
            LeadTier::B
        } else {
            LeadTier::C
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadTier::Aaa => "AAA",
            LeadTier::A => "A",
            LeadTier::B => "B",
            LeadTier::C => "C",
        }
    }

    /// Recommended follow-up for the tier.
    pub fn follow_up(&self) -> &'static str {
        match self {
            LeadTier::Aaa => "Immediate OSC handoff",
            LeadTier::A => "Priority nurture sequence",
            LeadTier::B => "Standard drip campaign",
            LeadTier::C => "Long-term nurture",
        }
    }
}

impl std::fmt::Display for LeadTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score and tier for one lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScore {
    pub score: f64,
    pub tier: LeadTier,
}

/// Sum the weight of each event's type. Unweighted or untyped events add nothing.
pub fn score_lead(events: &[BuyerEvent], weights: &IndexMap<String, f64>) -> f64 {
    events
        .iter()
        .filter_map(|e| e.event_type.as_ref())
        .map(|t| weights.get(t.as_str()).copied().unwrap_or(0.0))
        .sum()
}

impl ScoringConfig {
    pub fn score(&self, events: &[BuyerEvent]) -> LeadScore {
        let score = score_lead(events, &self.weights);
        LeadScore {
            score,
            tier: LeadTier::classify(score, &self.thresholds),
        }
    }
}

/// Count leads per tier. Every tier is present, in AAA→C order.
pub fn tier_distribution<'a>(
    scores: impl IntoIterator<Item = &'a LeadScore>,
) -> IndexMap<LeadTier, usize> {
    let mut dist: IndexMap<LeadTier, usize> = LeadTier::ALL.iter().map(|t| (*t, 0)).collect();
    for s in scores {
        *dist.entry(s.tier).or_insert(0) += 1;
    }
    dist
}

impl ScoringConfigRule {
    /// The typed scoring config carried by this document.
    pub fn compile(&self) -> ScoringConfig {
        self.spec.clone()
    }
}
