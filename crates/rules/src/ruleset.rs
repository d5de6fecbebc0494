//! Ordered, compiled rule sets.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use buyerflow_core::BuyerEvent;

use crate::error::Result;
use crate::evaluator::{run_flow, DeclarativeRule, Rule};
use crate::fire::AutomationFire;
use crate::kpi::SimulationResult;
use crate::schema::AutomationRuleSet;

/// An ordered list of rules ready for evaluation.
#[derive(Clone)]
pub struct RuleSet {
    id: String,
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleSet {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rules: Vec::new(),
        }
    }

    /// Append a rule. Rules are evaluated in insertion order.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn push(&mut self, rule: Arc<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Compile a YAML rule set. Disabled rules are dropped; duplicate ids are
    /// rejected.
    pub fn compile(doc: &AutomationRuleSet) -> std::result::Result<Self, String> {
        let mut seen = HashSet::new();
        let mut set = RuleSet::new(doc.metadata.id.clone());

        for def in &doc.spec.rules {
            if !seen.insert(def.id.as_str()) {
                return Err(format!(
                    "duplicate rule id '{}' in rule set '{}'",
                    def.id, doc.metadata.id
                ));
            }
        }

        for def in doc.enabled_rules() {
            set.push(Arc::new(DeclarativeRule::new(def.clone())));
        }

        tracing::debug!(
            rule_set = %set.id,
            rules = set.rules.len(),
            skipped = doc.spec.rules.len() - set.rules.len(),
            "Compiled rule set"
        );
        Ok(set)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn evaluate(&self, events: &[BuyerEvent]) -> Result<Vec<AutomationFire>> {
        run_flow(events, &self.rules)
    }

    /// Evaluate and aggregate KPIs.
    pub fn simulate(&self, events: &[BuyerEvent]) -> Result<SimulationResult> {
        let fires = self.evaluate(events)?;
        Ok(SimulationResult::new(fires, events.len()))
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.rules.iter().map(|r| r.id()).collect();
        f.debug_struct("RuleSet")
            .field("id", &self.id)
            .field("rules", &ids)
            .finish()
    }
}

/// Evaluate rules and aggregate KPIs in one call.
pub fn simulate(events: &[BuyerEvent], rules: &[Arc<dyn Rule>]) -> Result<SimulationResult> {
    let fires = run_flow(events, rules)?;
    Ok(SimulationResult::new(fires, events.len()))
}
