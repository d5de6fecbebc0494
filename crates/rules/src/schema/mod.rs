//! YAML DSL schema types with serde deserialization.
//!
//! Defines the type hierarchy for rule documents:
//! - `RuleEnvelope`: lightweight first-pass header (apiVersion, kind, metadata)
//! - `RuleDocument`: enum dispatching to kind-specific types
//! - `AutomationRuleSet`: ordered declarative rules with conditions, actions, deltas
//! - `Condition`: the tagged condition language interpreted by the evaluator

mod automation;
mod condition;
mod document;
mod envelope;
mod kind;
mod metadata;

pub use automation::*;
pub use condition::*;
pub use document::*;
pub use envelope::*;
pub use kind::*;
pub use metadata::*;
