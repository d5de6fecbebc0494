//! KPI aggregation over a simulation's fires.

use serde::{Deserialize, Serialize};

use crate::fire::AutomationFire;

/// Totals across all fires of one evaluation.
///
/// Absent deltas count as zero. `automations_fired` counts every fire,
/// including fires that carry no deltas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub signal_lock_delta: f64,
    pub commitment_delta: f64,
    pub lead_score_delta: f64,
    pub automations_fired: usize,
    pub events_processed: usize,
}

impl KpiSummary {
    pub fn from_fires(fires: &[AutomationFire], events_processed: usize) -> Self {
        fires.iter().fold(
            KpiSummary {
                events_processed,
                ..Default::default()
            },
            |mut acc, fire| {
                acc.signal_lock_delta += fire.deltas.signal_lock.unwrap_or(0.0);
                acc.commitment_delta += fire.deltas.commitment.unwrap_or(0.0);
                acc.lead_score_delta += fire.deltas.lead_score.unwrap_or(0.0);
                acc.automations_fired += 1;
                acc
            },
        )
    }
}

/// Fires plus their KPI totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub fires: Vec<AutomationFire>,
    pub kpis: KpiSummary,
}

impl SimulationResult {
    pub fn new(fires: Vec<AutomationFire>, events_processed: usize) -> Self {
        let kpis = KpiSummary::from_fires(&fires, events_processed);
        Self { fires, kpis }
    }
}
