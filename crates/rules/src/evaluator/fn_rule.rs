//! Rules written as Rust closures.

use std::fmt;

use super::condition::Evidence;
use super::Rule;
use crate::context::EvaluationContext;
use crate::fire::AutomationFire;

type WhenFn = dyn Fn(&EvaluationContext<'_>) -> Result<bool, String> + Send + Sync;
type ThenFn = dyn Fn(&EvaluationContext<'_>) -> Result<AutomationFire, String> + Send + Sync;

/// A [`Rule`] built from a predicate and a consequence closure.
///
/// Closure rules supply no evidence; the consequence reads whatever it needs
/// from the context directly.
pub struct FnRule {
    id: String,
    when: Box<WhenFn>,
    then: Box<ThenFn>,
}

impl FnRule {
    pub fn new<W, T>(id: impl Into<String>, when: W, then: T) -> Self
    where
        W: Fn(&EvaluationContext<'_>) -> Result<bool, String> + Send + Sync + 'static,
        T: Fn(&EvaluationContext<'_>) -> Result<AutomationFire, String> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            when: Box::new(when),
            then: Box::new(then),
        }
    }
}

impl fmt::Debug for FnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Rule for FnRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn when<'a>(&self, ctx: &EvaluationContext<'a>) -> Result<Option<Evidence<'a>>, String> {
        Ok((self.when)(ctx)?.then(Evidence::empty))
    }

    fn then(
        &self,
        ctx: &EvaluationContext<'_>,
        _evidence: &Evidence<'_>,
    ) -> Result<AutomationFire, String> {
        (self.then)(ctx)
    }
}
