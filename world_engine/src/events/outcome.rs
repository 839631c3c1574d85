//! Trigger outcomes and the record of past firings.

use game_rules::{EventId, Timestamp, TrapId, WorldSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::event::{ConditionalEvent, Severity};
use crate::traps::TrapSpring;
use crate::world::{AttributeEffect, Consequences};

/// Why an event fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FiringCause {
    /// All of its conditions held.
    Conditions,
    /// Forced by a parent event.
    Cascade { parent: EventId, depth: u32 },
    /// A trap went off.
    Trap { trap_id: TrapId },
}

/// Record of one event firing, handed to the host and to the world state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutcome {
    pub event_id: EventId,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub fired_at: Timestamp,
    pub cause: FiringCause,
    pub preventable: bool,
    pub effects: Vec<AttributeEffect>,
    pub consequences: Consequences,
    pub player_influence: u8,
    /// Damage and effects when the outcome comes from a trap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trap: Option<TrapSpring>,
    /// The snapshot the firing was evaluated against.
    pub snapshot: WorldSnapshot,
}

impl TriggerOutcome {
    pub(crate) fn from_event(
        event: &ConditionalEvent,
        fired_at: Timestamp,
        cause: FiringCause,
        snapshot: &WorldSnapshot,
    ) -> Self {
        Self {
            event_id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            severity: event.severity,
            fired_at,
            cause,
            preventable: event.preventable,
            effects: event.effects.clone(),
            consequences: event.consequences.clone(),
            player_influence: event.player_influence,
            trap: None,
            snapshot: snapshot.clone(),
        }
    }

    /// Whether this outcome was forced by another event.
    pub fn is_cascade(&self) -> bool {
        matches!(self.cause, FiringCause::Cascade { .. })
    }
}

/// When each event has fired, in firing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerHistory {
    firings: BTreeMap<EventId, Vec<Timestamp>>,
}

impl TriggerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event_id: EventId, at: Timestamp) {
        self.firings.entry(event_id).or_default().push(at);
    }

    pub fn has_fired(&self, event_id: &EventId) -> bool {
        self.fire_count(event_id) > 0
    }

    pub fn fire_count(&self, event_id: &EventId) -> usize {
        self.firings.get(event_id).map_or(0, Vec::len)
    }

    pub fn last_fired(&self, event_id: &EventId) -> Option<Timestamp> {
        self.firings.get(event_id).and_then(|times| times.last().copied())
    }

    /// Total number of firings.
    pub fn len(&self) -> usize {
        self.firings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.firings.is_empty()
    }

    /// Forget one firing at `at`. Returns whether such a firing was recorded.
    pub fn remove_firing(&mut self, event_id: &EventId, at: Timestamp) -> bool {
        let Some(times) = self.firings.get_mut(event_id) else {
            return false;
        };
        let Some(pos) = times.iter().rposition(|t| *t == at) else {
            return false;
        };
        times.remove(pos);
        if times.is_empty() {
            self.firings.remove(event_id);
        }
        true
    }

    /// Forget every firing of one event.
    pub fn clear_event(&mut self, event_id: &EventId) {
        self.firings.remove(event_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_counts_firings() {
        let mut history = TriggerHistory::new();
        let id = EventId::from("market");
        assert!(!history.has_fired(&id));

        history.record(id.clone(), Timestamp::at(1, 9));
        history.record(id.clone(), Timestamp::at(2, 9));
        history.record(EventId::from("storm"), Timestamp::at(2, 10));

        assert!(history.has_fired(&id));
        assert_eq!(history.fire_count(&id), 2);
        assert_eq!(history.last_fired(&id), Some(Timestamp::at(2, 9)));
        assert_eq!(history.len(), 3);

        history.clear_event(&id);
        assert!(!history.has_fired(&id));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_remove_single_firing() {
        let mut history = TriggerHistory::new();
        let id = EventId::from("market");
        history.record(id.clone(), Timestamp::at(1, 9));
        history.record(id.clone(), Timestamp::at(2, 9));

        assert!(!history.remove_firing(&id, Timestamp::at(3, 9)));
        assert!(!history.remove_firing(&EventId::from("storm"), Timestamp::at(1, 9)));

        assert!(history.remove_firing(&id, Timestamp::at(2, 9)));
        assert_eq!(history.last_fired(&id), Some(Timestamp::at(1, 9)));

        assert!(history.remove_firing(&id, Timestamp::at(1, 9)));
        assert!(!history.has_fired(&id));
        assert!(history.is_empty());
    }

    #[test]
    fn test_cause_json() {
        let cause = FiringCause::Cascade {
            parent: EventId::from("bridge_collapse"),
            depth: 1,
        };
        let json = serde_json::to_value(&cause).unwrap();
        assert_eq!(json["kind"], "cascade");
        assert_eq!(json["parent"], "bridge_collapse");
    }
}
