//! Event registry and trigger scheduler.
//!
//! The registry owns event definitions and their firing state. A tick
//! evaluates every armed event against a snapshot, fires the qualifiers in
//! ascending severity and force-fires their consequence events.

use game_rules::{DiceRoller, EventId, Timestamp, WorldSnapshot};
use std::collections::{HashMap, HashSet};

use super::event::ConditionalEvent;
use super::outcome::{FiringCause, TriggerHistory, TriggerOutcome};
use crate::conditions::{ConditionEvaluator, ConditionKey};
use crate::error::{ConfigurationError, EngineError, Result};

/// Default bound on forced consequence chains.
pub const DEFAULT_MAX_CASCADE_DEPTH: u32 = 8;

/// Registered conditional events, in registration order.
#[derive(Debug, Clone)]
pub struct EventRegistry {
    events: Vec<ConditionalEvent>,
    index: HashMap<EventId, usize>,
    history: TriggerHistory,
    max_cascade_depth: u32,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CASCADE_DEPTH)
    }
}

impl EventRegistry {
    pub fn new(max_cascade_depth: u32) -> Self {
        Self {
            events: Vec::new(),
            index: HashMap::new(),
            history: TriggerHistory::new(),
            max_cascade_depth,
        }
    }

    /// Rebuild a registry from saved definitions and firing history.
    pub fn from_parts(
        events: Vec<ConditionalEvent>,
        history: TriggerHistory,
        max_cascade_depth: u32,
    ) -> Result<Self> {
        let mut registry = Self::new(max_cascade_depth);
        registry.register_all(events)?;
        registry.history = history;
        Ok(registry)
    }

    /// Register a single event.
    pub fn register(&mut self, event: ConditionalEvent) -> Result<()> {
        self.register_all(vec![event])
    }

    /// Register a batch of events. Either every event is registered or none is.
    ///
    /// Consequences may point at events in the same batch. Duplicate ids,
    /// unknown consequence ids and consequence cycles are configuration errors.
    pub fn register_all(&mut self, events: Vec<ConditionalEvent>) -> Result<()> {
        let mut known: HashSet<&EventId> = self.index.keys().collect();
        for event in &events {
            if !known.insert(&event.id) {
                return Err(ConfigurationError::DuplicateId {
                    kind: "event",
                    id: event.id.to_string(),
                }
                .into());
            }
        }

        for event in &events {
            if let Some(missing) = event
                .consequence_event_ids
                .iter()
                .find(|id| !known.contains(id))
            {
                return Err(ConfigurationError::UnknownConsequence {
                    event: event.id.to_string(),
                    missing: missing.clone(),
                }
                .into());
            }
        }

        let combined: Vec<&ConditionalEvent> = self.events.iter().chain(events.iter()).collect();
        if let Some(cycle) = find_cycle(&combined) {
            return Err(ConfigurationError::ConsequenceCycle(cycle).into());
        }

        for event in events {
            tracing::debug!(event = %event.id, severity = ?event.severity, "registered event");
            self.index.insert(event.id.clone(), self.events.len());
            self.events.push(event);
        }
        Ok(())
    }

    pub fn get(&self, id: &EventId) -> Option<&ConditionalEvent> {
        self.index.get(id).map(|&idx| &self.events[idx])
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.index.contains_key(id)
    }

    pub fn events(&self) -> &[ConditionalEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Every firing so far.
    pub fn history(&self) -> &TriggerHistory {
        &self.history
    }

    /// Ids of events that may fire at `now`, in registration order.
    pub fn armed_events(&self, now: Timestamp) -> Vec<&EventId> {
        self.events
            .iter()
            .filter(|event| event.is_armed(now))
            .map(|event| &event.id)
            .collect()
    }

    /// Re-arm an event, forgetting its past firings.
    pub fn reset(&mut self, id: &EventId) -> Result<()> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| EngineError::validation(format!("unknown event {}", id)))?;
        self.events[idx].last_fired_at = None;
        self.history.clear_event(id);
        tracing::info!(event = %id, "re-armed event");
        Ok(())
    }

    /// Undo firings whose world effects were reverted.
    ///
    /// Each `(event, fired_at)` pair removes one recorded firing, and the
    /// event's arming state falls back to its last remaining firing. Pairs
    /// with no recorded firing, such as trap or external causes, are skipped.
    /// Returns the events that were rewound.
    pub fn rewind(&mut self, firings: &[(EventId, Timestamp)]) -> Vec<EventId> {
        let mut rewound: Vec<EventId> = Vec::new();
        for (id, at) in firings {
            if self.history.remove_firing(id, *at) && !rewound.contains(id) {
                rewound.push(id.clone());
            }
        }
        for id in &rewound {
            if let Some(&idx) = self.index.get(id) {
                self.events[idx].last_fired_at = self.history.last_fired(id);
            }
            tracing::info!(event = %id, last_fired = ?self.history.last_fired(id), "rewound event");
        }
        rewound
    }

    /// Evaluate every armed event against `snapshot` and fire the qualifiers.
    ///
    /// Qualifiers fire in ascending severity, ties in registration order. Each
    /// firing is followed directly by its consequence cascade. No event fires
    /// twice within one tick.
    pub fn tick(
        &mut self,
        snapshot: &WorldSnapshot,
        evaluator: &mut ConditionEvaluator,
        roller: &mut dyn DiceRoller,
    ) -> Vec<TriggerOutcome> {
        let now = snapshot.timestamp();

        let mut qualifiers: Vec<usize> = Vec::new();
        for (idx, event) in self.events.iter().enumerate() {
            if event.conditions.is_empty() || !event.is_armed(now) {
                continue;
            }
            let holds = event.conditions.iter().enumerate().all(|(i, condition)| {
                let key = ConditionKey::new(event.id.clone(), i);
                evaluator.evaluate(&key, condition, snapshot, &mut *roller)
            });
            tracing::debug!(event = %event.id, holds, "evaluated event");
            if holds {
                qualifiers.push(idx);
            }
        }
        qualifiers.sort_by_key(|&idx| self.events[idx].severity);

        let mut visited = HashSet::new();
        let mut outcomes = Vec::new();
        for idx in qualifiers {
            if visited.contains(&self.events[idx].id) {
                continue;
            }
            let outcome = self.fire(idx, FiringCause::Conditions, snapshot, &mut visited);
            let parent = outcome.event_id.clone();
            let consequences = self.events[idx].consequence_event_ids.clone();
            outcomes.push(outcome);
            self.cascade(&parent, &consequences, 1, snapshot, &mut visited, &mut outcomes);
        }
        outcomes
    }

    /// Force-fire `consequence_ids` on behalf of an outcome that did not come
    /// from a registered event firing, such as a sprung trap.
    pub fn cascade_from(
        &mut self,
        parent: &TriggerOutcome,
        consequence_ids: &[EventId],
        snapshot: &WorldSnapshot,
    ) -> Vec<TriggerOutcome> {
        let mut visited = HashSet::from([parent.event_id.clone()]);
        let mut outcomes = Vec::new();
        self.cascade(
            &parent.event_id,
            consequence_ids,
            1,
            snapshot,
            &mut visited,
            &mut outcomes,
        );
        outcomes
    }

    fn cascade(
        &mut self,
        parent: &EventId,
        consequence_ids: &[EventId],
        depth: u32,
        snapshot: &WorldSnapshot,
        visited: &mut HashSet<EventId>,
        outcomes: &mut Vec<TriggerOutcome>,
    ) {
        if consequence_ids.is_empty() {
            return;
        }
        if depth > self.max_cascade_depth {
            tracing::warn!(
                parent = %parent,
                depth,
                max_depth = self.max_cascade_depth,
                "cascade depth limit reached, dropping consequences"
            );
            return;
        }

        let now = snapshot.timestamp();
        for id in consequence_ids {
            let Some(&idx) = self.index.get(id) else {
                tracing::warn!(parent = %parent, event = %id, "unknown consequence event");
                continue;
            };
            if visited.contains(id) {
                tracing::debug!(event = %id, "already fired this tick");
                continue;
            }
            if !self.events[idx].is_armed(now) {
                tracing::debug!(event = %id, "consequence event is not armed");
                continue;
            }

            let cause = FiringCause::Cascade {
                parent: parent.clone(),
                depth,
            };
            let outcome = self.fire(idx, cause, snapshot, visited);
            let next = self.events[idx].consequence_event_ids.clone();
            outcomes.push(outcome);
            self.cascade(id, &next, depth + 1, snapshot, visited, outcomes);
        }
    }

    fn fire(
        &mut self,
        idx: usize,
        cause: FiringCause,
        snapshot: &WorldSnapshot,
        visited: &mut HashSet<EventId>,
    ) -> TriggerOutcome {
        let now = snapshot.timestamp();
        let event = &mut self.events[idx];
        event.last_fired_at = Some(now);
        visited.insert(event.id.clone());
        self.history.record(event.id.clone(), now);

        tracing::info!(
            event = %event.id,
            severity = ?event.severity,
            cause = ?cause,
            at = %now,
            "event fired"
        );
        TriggerOutcome::from_event(event, now, cause, snapshot)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Depth-first search for a consequence cycle. Returns the cycle path with
/// its first event repeated at the end.
fn find_cycle<'a>(events: &[&'a ConditionalEvent]) -> Option<Vec<EventId>> {
    let graph: HashMap<&'a EventId, &'a [EventId]> = events
        .iter()
        .map(|&event| (&event.id, event.consequence_event_ids.as_slice()))
        .collect();
    let mut marks: HashMap<&'a EventId, Mark> = HashMap::new();
    let mut stack: Vec<&'a EventId> = Vec::new();

    for &event in events {
        if !marks.contains_key(&event.id) {
            if let Some(cycle) = visit(&event.id, &graph, &mut marks, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit<'a>(
    node: &'a EventId,
    graph: &HashMap<&'a EventId, &'a [EventId]>,
    marks: &mut HashMap<&'a EventId, Mark>,
    stack: &mut Vec<&'a EventId>,
) -> Option<Vec<EventId>> {
    marks.insert(node, Mark::OnStack);
    stack.push(node);

    let next_ids: &'a [EventId] = graph.get(node).copied().unwrap_or_default();
    for next in next_ids {
        match marks.get(next).copied() {
            Some(Mark::OnStack) => {
                let start = stack.iter().position(|id| *id == next)?;
                let mut cycle: Vec<EventId> = stack[start..].iter().map(|id| (*id).clone()).collect();
                cycle.push(next.clone());
                return Some(cycle);
            }
            Some(Mark::Done) => {}
            None => {
                if let Some(cycle) = visit(next, graph, marks, stack) {
                    return Some(cycle);
                }
            }
        }
    }

    stack.pop();
    marks.insert(node, Mark::Done);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{Cadence, TriggerCondition};
    use crate::events::{FiringPolicy, Severity};
    use game_rules::{FixedRoller, WorldTime};

    fn snapshot(day: u32, hour: u8) -> WorldSnapshot {
        WorldSnapshot::new(WorldTime::new(day, hour), "village")
    }

    fn on_day(id: &str, day: u32, severity: Severity) -> ConditionalEvent {
        ConditionalEvent::new(id, id, severity)
            .with_condition(TriggerCondition::Time { day, hour: None })
    }

    fn tick(registry: &mut EventRegistry, snapshot: &WorldSnapshot) -> Vec<TriggerOutcome> {
        let mut evaluator = ConditionEvaluator::new();
        let mut roller = FixedRoller::always(1);
        registry.tick(snapshot, &mut evaluator, &mut roller)
    }

    fn ids(outcomes: &[TriggerOutcome]) -> Vec<&str> {
        outcomes.iter().map(|o| o.event_id.as_str()).collect()
    }

    #[test]
    fn test_once_event_fires_once() {
        let mut registry = EventRegistry::default();
        registry.register(on_day("eclipse", 2, Severity::Warning)).unwrap();

        assert!(tick(&mut registry, &snapshot(1, 0)).is_empty());
        assert_eq!(ids(&tick(&mut registry, &snapshot(2, 0))), vec!["eclipse"]);
        assert!(tick(&mut registry, &snapshot(2, 1)).is_empty());
        assert!(tick(&mut registry, &snapshot(9, 0)).is_empty());
        assert_eq!(registry.history().fire_count(&EventId::from("eclipse")), 1);
    }

    #[test]
    fn test_rewind_rearms_reverted_firings() {
        let mut registry = EventRegistry::default();
        registry.register(on_day("eclipse", 2, Severity::Warning)).unwrap();
        registry
            .register(on_day("market", 1, Severity::Info).with_policy(FiringPolicy::Daily))
            .unwrap();

        tick(&mut registry, &snapshot(1, 0));
        tick(&mut registry, &snapshot(2, 0));
        let eclipse = EventId::from("eclipse");
        let market = EventId::from("market");
        assert_eq!(registry.history().fire_count(&market), 2);

        let rewound = registry.rewind(&[
            (eclipse.clone(), Timestamp::at(2, 0)),
            (market.clone(), Timestamp::at(2, 0)),
            (EventId::from("trap:pit"), Timestamp::at(2, 0)),
        ]);
        assert_eq!(rewound, vec![eclipse.clone(), market.clone()]);
        assert!(!registry.history().has_fired(&eclipse));
        assert!(registry.get(&eclipse).unwrap().last_fired_at.is_none());
        assert_eq!(registry.get(&market).unwrap().last_fired_at, Some(Timestamp::at(1, 0)));

        assert_eq!(ids(&tick(&mut registry, &snapshot(2, 1))), vec!["market", "eclipse"]);
    }

    #[test]
    fn test_qualifiers_fire_in_ascending_severity() {
        let mut registry = EventRegistry::default();
        registry
            .register_all(vec![
                on_day("dragon", 1, Severity::Critical),
                on_day("rumor", 1, Severity::Info),
                on_day("raid", 1, Severity::Danger),
                on_day("gossip", 1, Severity::Info),
            ])
            .unwrap();

        let outcomes = tick(&mut registry, &snapshot(1, 0));
        assert_eq!(ids(&outcomes), vec!["rumor", "gossip", "raid", "dragon"]);
    }

    #[test]
    fn test_consequences_cascade_without_conditions() {
        let mut registry = EventRegistry::default();
        registry
            .register_all(vec![
                on_day("bridge_collapse", 3, Severity::Danger).with_consequence("trade_halts"),
                ConditionalEvent::new("trade_halts", "Trade halts", Severity::Warning)
                    .with_condition(TriggerCondition::Time { day: 99, hour: None })
                    .with_consequence("riots"),
                ConditionalEvent::new("riots", "Riots", Severity::Critical),
            ])
            .unwrap();

        let outcomes = tick(&mut registry, &snapshot(3, 0));
        assert_eq!(ids(&outcomes), vec!["bridge_collapse", "trade_halts", "riots"]);
        assert_eq!(outcomes[0].cause, FiringCause::Conditions);
        assert_eq!(
            outcomes[2].cause,
            FiringCause::Cascade {
                parent: EventId::from("trade_halts"),
                depth: 2
            }
        );
    }

    #[test]
    fn test_cascade_respects_spent_once_events() {
        let mut registry = EventRegistry::default();
        registry
            .register_all(vec![
                on_day("omen", 1, Severity::Info),
                on_day("plague", 2, Severity::Danger)
                    .with_policy(FiringPolicy::Daily)
                    .with_consequence("omen"),
            ])
            .unwrap();

        assert_eq!(ids(&tick(&mut registry, &snapshot(1, 0))), vec!["omen"]);
        assert_eq!(ids(&tick(&mut registry, &snapshot(2, 0))), vec!["plague"]);
    }

    #[test]
    fn test_no_event_fires_twice_in_one_tick() {
        let mut registry = EventRegistry::default();
        registry
            .register_all(vec![
                on_day("alarm", 1, Severity::Info)
                    .with_policy(FiringPolicy::Random)
                    .with_consequence("guards"),
                on_day("guards", 1, Severity::Warning).with_policy(FiringPolicy::Random),
            ])
            .unwrap();

        let outcomes = tick(&mut registry, &snapshot(1, 0));
        assert_eq!(ids(&outcomes), vec!["alarm", "guards"]);
        assert!(outcomes[1].is_cascade());
    }

    #[test]
    fn test_cascade_depth_limit() {
        let mut registry = EventRegistry::new(2);
        registry
            .register_all(vec![
                on_day("a", 1, Severity::Info).with_consequence("b"),
                ConditionalEvent::new("b", "b", Severity::Info).with_consequence("c"),
                ConditionalEvent::new("c", "c", Severity::Info).with_consequence("d"),
                ConditionalEvent::new("d", "d", Severity::Info),
            ])
            .unwrap();

        let outcomes = tick(&mut registry, &snapshot(1, 0));
        assert_eq!(ids(&outcomes), vec!["a", "b", "c"]);
        assert!(registry.armed_events(Timestamp::at(1, 0)).contains(&&EventId::from("d")));
    }

    #[test]
    fn test_cycle_rejected_at_registration() {
        let mut registry = EventRegistry::default();
        registry.register(on_day("seed", 1, Severity::Info)).unwrap();

        let err = registry
            .register_all(vec![
                ConditionalEvent::new("a", "a", Severity::Info).with_consequence("b"),
                ConditionalEvent::new("b", "b", Severity::Info).with_consequence("c"),
                ConditionalEvent::new("c", "c", Severity::Info).with_consequence("a"),
            ])
            .unwrap_err();

        match err {
            EngineError::Configuration(ConfigurationError::ConsequenceCycle(cycle)) => {
                let cycle: Vec<&str> = cycle.iter().map(EventId::as_str).collect();
                assert_eq!(cycle, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected a cycle error, got {:?}", other),
        }
        // Atomic: nothing from the failed batch was registered.
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(&EventId::from("a")));
    }

    #[test]
    fn test_self_cycle_and_unknown_consequence() {
        let mut registry = EventRegistry::default();
        let err = registry
            .register(ConditionalEvent::new("loop", "loop", Severity::Info).with_consequence("loop"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Configuration(ConfigurationError::ConsequenceCycle(_))
        ));

        let err = registry
            .register(ConditionalEvent::new("x", "x", Severity::Info).with_consequence("ghost"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Configuration(ConfigurationError::UnknownConsequence { .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut registry = EventRegistry::default();
        registry.register(on_day("fair", 1, Severity::Info)).unwrap();

        let err = registry.register(on_day("fair", 2, Severity::Info)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Configuration(ConfigurationError::DuplicateId { kind: "event", .. })
        ));
        assert_eq!(registry.get(&EventId::from("fair")).unwrap().conditions.len(), 1);
    }

    #[test]
    fn test_random_event_rolls_once_per_window() {
        let mut registry = EventRegistry::default();
        registry
            .register(
                ConditionalEvent::new("wolves", "Wolves howl", Severity::Warning)
                    .with_policy(FiringPolicy::Random)
                    .with_condition(TriggerCondition::Random {
                        probability_pct: 50,
                        cadence: Cadence::Daily,
                    }),
            )
            .unwrap();

        let mut evaluator = ConditionEvaluator::new();
        let mut roller = FixedRoller::new([10, 90]);
        let first = registry.tick(&snapshot(1, 0), &mut evaluator, &mut roller);
        let same_day = registry.tick(&snapshot(1, 5), &mut evaluator, &mut roller);
        let next_day = registry.tick(&snapshot(2, 0), &mut evaluator, &mut roller);

        assert_eq!(first.len(), 1);
        assert!(same_day.is_empty());
        assert!(next_day.is_empty());
        assert_eq!(roller.remaining(), 0);
    }

    #[test]
    fn test_reset_rearms() {
        let mut registry = EventRegistry::default();
        registry.register(on_day("duel", 1, Severity::Danger)).unwrap();
        assert_eq!(tick(&mut registry, &snapshot(1, 0)).len(), 1);

        registry.reset(&EventId::from("duel")).unwrap();
        assert!(!registry.history().has_fired(&EventId::from("duel")));
        assert_eq!(tick(&mut registry, &snapshot(1, 1)).len(), 1);
        assert!(registry.reset(&EventId::from("nope")).is_err());
    }
}
