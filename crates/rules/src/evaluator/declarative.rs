//! Rules compiled from YAML rule definitions.

use super::condition::{evaluate_condition, Evidence};
use super::reason::reason_for;
use super::Rule;
use crate::context::EvaluationContext;
use crate::fire::AutomationFire;
use crate::schema::RuleDefinition;

/// A [`Rule`] backed by a declarative [`RuleDefinition`].
#[derive(Debug, Clone)]
pub struct DeclarativeRule {
    definition: RuleDefinition,
}

impl DeclarativeRule {
    pub fn new(definition: RuleDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &RuleDefinition {
        &self.definition
    }
}

impl From<RuleDefinition> for DeclarativeRule {
    fn from(definition: RuleDefinition) -> Self {
        Self::new(definition)
    }
}

impl Rule for DeclarativeRule {
    fn id(&self) -> &str {
        &self.definition.id
    }

    fn when<'a>(&self, ctx: &EvaluationContext<'a>) -> Result<Option<Evidence<'a>>, String> {
        evaluate_condition(&self.definition.when, ctx)
    }

    fn then(
        &self,
        _ctx: &EvaluationContext<'_>,
        evidence: &Evidence<'_>,
    ) -> Result<AutomationFire, String> {
        let reason = reason_for(&self.definition, evidence)?;
        Ok(AutomationFire::new(
            self.definition.id.clone(),
            reason,
            self.definition.then.clone(),
            self.definition.deltas.clone(),
        ))
    }
}
