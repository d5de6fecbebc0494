//! Evaluation context: the validated event history plus a per-type index.

use buyerflow_core::{BuyerEvent, EventType};
use indexmap::IndexMap;

use crate::error::{EngineError, Result};

/// Read-only view over one buyer's events, built once and shared by every rule.
///
/// Events keep their arrival order. The per-type index preserves that order
/// within each type; "first" and "last" always mean arrival order, never
/// timestamp order.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    events: &'a [BuyerEvent],
    by_type: IndexMap<&'a EventType, Vec<&'a BuyerEvent>>,
}

impl<'a> EvaluationContext<'a> {
    /// Validate the events and index them by type.
    ///
    /// Fails with [`EngineError::InvalidInput`] naming the offending index
    /// when an event has no type or a blank one.
    pub fn build(events: &'a [BuyerEvent]) -> Result<Self> {
        let mut by_type: IndexMap<&'a EventType, Vec<&'a BuyerEvent>> = IndexMap::new();

        for (idx, event) in events.iter().enumerate() {
            let event_type = match &event.event_type {
                Some(t) if !t.is_blank() => t,
                Some(_) => {
                    return Err(EngineError::InvalidInput(format!(
                        "event at index {idx} has a blank type"
                    )))
                }
                None => {
                    return Err(EngineError::InvalidInput(format!(
                        "event at index {idx} is missing a type"
                    )))
                }
            };
            by_type.entry(event_type).or_default().push(event);
        }

        tracing::trace!(
            events = events.len(),
            types = by_type.len(),
            "Built evaluation context"
        );

        Ok(Self { events, by_type })
    }

    /// All events in arrival order.
    pub fn events(&self) -> &'a [BuyerEvent] {
        self.events
    }

    /// Events of one type in arrival order. Empty when the type never occurred.
    pub fn of_type(&self, event_type: &EventType) -> &[&'a BuyerEvent] {
        self.by_type
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, event_type: &EventType) -> usize {
        self.of_type(event_type).len()
    }

    /// Distinct event types present, in order of first occurrence.
    pub fn types(&self) -> impl Iterator<Item = &'a EventType> + '_ {
        self.by_type.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
