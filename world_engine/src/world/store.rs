//! World state store - an append-only ledger of change sets.
//!
//! The current world state is always `fold(apply, initial, history)`. Point in
//! time reconstruction and reverts replay the ledger; nothing is patched in
//! place.

use game_rules::{EventId, Timestamp, MINUTES_PER_DAY};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::attribute::{AttributePath, GlobalAttribute};
use super::change::{
    AttributeEffect, ChangeSet, ChangeSetId, Consequences, ExternalOutcome, ImpactSeverity,
    StateChange,
};
use super::state::{clamp_value, Trend, TrendDirection, TrendSpeed, WorldState};
use crate::config::TrendConfig;
use crate::error::{EngineError, Result};
use crate::events::TriggerOutcome;

/// Serialized form of the ledger used for save, backup and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryExport {
    pub world_state: WorldState,
    pub state_history: Vec<ChangeSet>,
    /// State the history is replayed from. Older saves omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<WorldState>,
}

/// Owns the world state and its change history.
#[derive(Debug, Clone)]
pub struct WorldStateStore {
    trend_config: TrendConfig,
    initial: WorldState,
    history: Vec<ChangeSet>,
    current: Arc<WorldState>,
}

impl Default for WorldStateStore {
    fn default() -> Self {
        Self::new(TrendConfig::default())
    }
}

impl WorldStateStore {
    /// Create a store starting from a neutral world.
    pub fn new(trend_config: TrendConfig) -> Self {
        Self::with_initial_state(WorldState::new(), trend_config)
    }

    /// Create a store starting from an authored world, clamped into range.
    pub fn with_initial_state(mut initial: WorldState, trend_config: TrendConfig) -> Self {
        initial.clamp_all();
        Self {
            trend_config,
            current: Arc::new(initial.clone()),
            initial,
            history: Vec::new(),
        }
    }

    /// The last applied world state. Cheap to clone and never mutated in place.
    pub fn current(&self) -> Arc<WorldState> {
        Arc::clone(&self.current)
    }

    /// All applied change sets, oldest first.
    pub fn history(&self) -> &[ChangeSet] {
        &self.history
    }

    /// Apply a change set and return the new world state.
    ///
    /// A change set id can only enter the ledger once, and change sets must
    /// not predate the newest entry.
    pub fn apply(&mut self, change_set: ChangeSet) -> Result<Arc<WorldState>> {
        if self.history.iter().any(|cs| cs.id == change_set.id) {
            return Err(EngineError::validation(format!(
                "change set {} has already been applied",
                change_set.id
            )));
        }
        if let Some(last) = self.history.last() {
            if change_set.timestamp < last.timestamp {
                return Err(EngineError::validation(format!(
                    "change set {} at {} predates the ledger head at {}",
                    change_set.id, change_set.timestamp, last.timestamp
                )));
            }
        }

        let mut next = (*self.current).clone();
        fold_change_set(&mut next, &change_set, &self.trend_config);

        tracing::info!(
            change_set = %change_set.id,
            cause = %change_set.cause_event_id,
            changes = change_set.changes.len(),
            severity = ?change_set.severity,
            "applied change set"
        );

        self.history.push(change_set);
        self.current = Arc::new(next);
        Ok(self.current())
    }

    /// Timestamp of the newest change set.
    pub fn head_timestamp(&self) -> Option<Timestamp> {
        self.history.last().map(|cs| cs.timestamp)
    }

    /// Turn a fired event into a change set and apply it.
    pub fn record_outcome(&mut self, outcome: &TriggerOutcome) -> Result<ChangeSet> {
        let change_set = self.build_change_set(
            outcome.event_id.clone(),
            outcome.fired_at,
            &outcome.effects,
            outcome.consequences.clone(),
            outcome.severity.into(),
            outcome.player_influence,
        );
        self.apply(change_set.clone())?;
        Ok(change_set)
    }

    /// Apply an outcome resolved outside the engine, classifying its severity by reach.
    pub fn record_external(
        &mut self,
        outcome: ExternalOutcome,
        at: Timestamp,
    ) -> Result<ChangeSet> {
        let severity = outcome.severity();
        let change_set = self.build_change_set(
            outcome.cause_event_id,
            at,
            &outcome.effects,
            outcome.consequences,
            severity,
            outcome.player_influence,
        );
        self.apply(change_set.clone())?;
        Ok(change_set)
    }

    fn build_change_set(
        &self,
        cause_event_id: EventId,
        timestamp: Timestamp,
        effects: &[AttributeEffect],
        consequences: Consequences,
        severity: ImpactSeverity,
        player_influence: u8,
    ) -> ChangeSet {
        // Effects on the same attribute chain, so compute them on a scratch copy.
        let mut scratch = (*self.current).clone();
        let changes: Vec<StateChange> = effects
            .iter()
            .map(|effect| {
                let change = effect.to_change(scratch.get(&effect.attribute));
                scratch.set(&change.attribute_path, change.new_value);
                change
            })
            .collect();

        ChangeSet {
            id: ChangeSetId::new(),
            timestamp,
            cause_event_id,
            changes,
            consequences,
            severity,
            player_influence: player_influence.min(100),
        }
    }

    /// Reconstruct the world as it was at `timestamp`, including change sets made at that time.
    pub fn at(&self, timestamp: Timestamp) -> WorldState {
        replay(
            &self.initial,
            self.history.iter().take_while(|cs| cs.timestamp <= timestamp),
            &self.trend_config,
        )
    }

    /// Drop every change set after `id` and rebuild the current state.
    pub fn revert_to(&mut self, id: ChangeSetId) -> Result<Arc<WorldState>> {
        let position = self
            .history
            .iter()
            .position(|cs| cs.id == id)
            .ok_or_else(|| EngineError::validation(format!("unknown change set {}", id)))?;

        let dropped = self.history.len() - position - 1;
        self.history.truncate(position + 1);
        self.current = Arc::new(replay(&self.initial, &self.history, &self.trend_config));

        tracing::info!(change_set = %id, dropped, "reverted world state");
        Ok(self.current())
    }

    /// Project every global attribute `days` into the future along its last trend.
    ///
    /// This is a linear heuristic, not a simulation: each attribute moves by
    /// `days * base_rate * speed multiplier` in its trend direction.
    pub fn predict(&self, days: u32) -> WorldState {
        let mut projected = (*self.current).clone();
        for attr in GlobalAttribute::ALL {
            let Some(trend) = self.current.trend(attr) else {
                continue;
            };
            let multiplier = match trend.speed {
                TrendSpeed::Slow => self.trend_config.slow_multiplier,
                TrendSpeed::Moderate => self.trend_config.moderate_multiplier,
                TrendSpeed::Fast => self.trend_config.fast_multiplier,
            };
            let delta = f64::from(days) * self.trend_config.base_rate * multiplier;
            let path = AttributePath::Global(attr);
            let value = projected.get(&path) + trend.direction.sign() * delta;
            projected.set(&path, value);
        }
        projected
    }

    /// Temporary changes whose duration has run out by `now`.
    ///
    /// The store never reverts these; hosts that want "effective" values
    /// subtract the listed deltas themselves.
    pub fn expired_temporary_changes(&self, now: Timestamp) -> Vec<(ChangeSetId, &StateChange)> {
        self.history
            .iter()
            .flat_map(|cs| cs.changes.iter().map(move |change| (cs, change)))
            .filter(|(cs, change)| match change.permanence {
                super::Permanence::Temporary { duration_days } => {
                    let expires = cs.timestamp.0 + u64::from(duration_days) * MINUTES_PER_DAY;
                    expires <= now.0
                }
                _ => false,
            })
            .map(|(cs, change)| (cs.id, change))
            .collect()
    }

    /// The state the ledger is replayed from.
    pub fn initial_state(&self) -> &WorldState {
        &self.initial
    }

    pub fn to_export(&self) -> HistoryExport {
        HistoryExport {
            world_state: (*self.current).clone(),
            state_history: self.history.clone(),
            initial_state: Some(self.initial.clone()),
        }
    }

    /// Serialize the ledger as JSON with `worldState` and `stateHistory` keys.
    pub fn export_history(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_export())?)
    }

    /// Replace the ledger with an exported one.
    ///
    /// On any error the store is left exactly as it was.
    pub fn import_history(&mut self, json: &str) -> Result<()> {
        let value = parse_ledger_payload(json)?;
        let export: HistoryExport = serde_json::from_value(value)?;
        self.restore(export)
    }

    /// Replace the ledger with an already parsed export, after validating it.
    pub fn restore(&mut self, export: HistoryExport) -> Result<()> {
        let mut seen = HashSet::new();
        for pair in export.state_history.windows(2) {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(EngineError::validation(format!(
                    "change set {} is out of order",
                    pair[1].id
                )));
            }
        }
        for cs in &export.state_history {
            if !seen.insert(cs.id) {
                return Err(EngineError::validation(format!(
                    "change set {} appears twice",
                    cs.id
                )));
            }
        }

        let initial = export.initial_state.unwrap_or_default();
        for (key, state) in [("initialState", &initial), ("worldState", &export.world_state)] {
            if let Some((path, value)) = state.out_of_range() {
                return Err(EngineError::validation(format!(
                    "{} has {} = {}, outside 0..=100",
                    key, path, value
                )));
            }
        }

        let replayed = replay(&initial, &export.state_history, &self.trend_config);
        if replayed != export.world_state {
            return Err(EngineError::validation(
                "worldState does not match the replayed stateHistory",
            ));
        }

        tracing::info!(change_sets = export.state_history.len(), "imported history");
        self.initial = initial;
        self.history = export.state_history;
        self.current = Arc::new(replayed);
        Ok(())
    }
}

/// Parse an exported payload, requiring the `worldState` and `stateHistory` keys.
pub(crate) fn parse_ledger_payload(json: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    for key in ["worldState", "stateHistory"] {
        if value.get(key).is_none() {
            return Err(EngineError::validation(format!(
                "import payload is missing `{}`",
                key
            )));
        }
    }
    Ok(value)
}

fn replay<'a>(
    initial: &WorldState,
    history: impl IntoIterator<Item = &'a ChangeSet>,
    trend_config: &TrendConfig,
) -> WorldState {
    history
        .into_iter()
        .fold(initial.clone(), |mut state, change_set| {
            fold_change_set(&mut state, change_set, trend_config);
            state
        })
}

fn fold_change_set(state: &mut WorldState, change_set: &ChangeSet, trend_config: &TrendConfig) {
    for change in &change_set.changes {
        let before = state.get(&change.attribute_path);
        let after = state.set(&change.attribute_path, clamp_value(change.new_value));
        if let Some(attr) = change.attribute_path.as_global() {
            state.record_trend(classify_trend(attr, after - before, trend_config));
        }
    }
}

fn classify_trend(attribute: GlobalAttribute, delta: f64, config: &TrendConfig) -> Trend {
    let direction = if delta > 0.0 {
        TrendDirection::Rising
    } else if delta < 0.0 {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    };
    let magnitude = delta.abs();
    let speed = if magnitude >= config.fast_threshold {
        TrendSpeed::Fast
    } else if magnitude >= config.moderate_threshold {
        TrendSpeed::Moderate
    } else {
        TrendSpeed::Slow
    };
    Trend {
        attribute,
        direction,
        speed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ChangeType, Permanence};
    use game_rules::{LocationId, RegionId};

    fn path(text: &str) -> AttributePath {
        text.parse().unwrap()
    }

    fn change_set(at: Timestamp, changes: Vec<StateChange>) -> ChangeSet {
        ChangeSet {
            id: ChangeSetId::new(),
            timestamp: at,
            cause_event_id: EventId::from("test"),
            changes,
            consequences: Consequences::default(),
            severity: ImpactSeverity::Minor,
            player_influence: 0,
        }
    }

    fn set_change(attribute: &str, old_value: f64, new_value: f64) -> StateChange {
        StateChange {
            attribute_path: path(attribute),
            old_value,
            new_value,
            change_type: ChangeType::Set,
            permanence: Permanence::Permanent,
        }
    }

    #[test]
    fn test_apply_clamps_increase_past_max() {
        let mut store = WorldStateStore::default();
        let cs = change_set(
            Timestamp::at(1, 0),
            vec![StateChange {
                attribute_path: path("global.economy"),
                old_value: 50.0,
                new_value: 115.0,
                change_type: ChangeType::Increase,
                permanence: Permanence::Permanent,
            }],
        );

        let state = store.apply(cs).unwrap();
        assert_eq!(state.global.economy, 100.0);
    }

    #[test]
    fn test_duplicate_change_set_rejected() {
        let mut store = WorldStateStore::default();
        let cs = change_set(Timestamp::at(1, 0), vec![set_change("global.stability", 50.0, 60.0)]);

        store.apply(cs.clone()).unwrap();
        let err = store.apply(cs).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_out_of_order_change_set_rejected() {
        let mut store = WorldStateStore::default();
        store
            .apply(change_set(Timestamp::at(2, 0), vec![]))
            .unwrap();
        assert!(store.apply(change_set(Timestamp::at(1, 0), vec![])).is_err());
    }

    #[test]
    fn test_record_chains_effects_on_same_attribute() {
        let mut store = WorldStateStore::default();
        let outcome = ExternalOutcome {
            cause_event_id: EventId::from("festival"),
            description: String::new(),
            affected_locations: vec![],
            consequences: Consequences::default(),
            effects: vec![
                AttributeEffect::new(path("global.economy"), ChangeType::Increase, 10.0),
                AttributeEffect::new(path("global.economy"), ChangeType::Increase, 5.0),
            ],
            player_influence: 250,
        };

        let cs = store.record_external(outcome, Timestamp::at(1, 12)).unwrap();
        assert_eq!(cs.changes[0].old_value, 50.0);
        assert_eq!(cs.changes[1].old_value, 60.0);
        assert_eq!(cs.changes[1].new_value, 65.0);
        assert_eq!(cs.player_influence, 100);
        assert_eq!(store.current().global.economy, 65.0);
    }

    #[test]
    fn test_at_replays_up_to_and_including_timestamp() {
        let mut store = WorldStateStore::default();
        store
            .apply(change_set(Timestamp::at(1, 0), vec![set_change("global.stability", 50.0, 40.0)]))
            .unwrap();
        store
            .apply(change_set(Timestamp::at(2, 0), vec![set_change("global.stability", 40.0, 30.0)]))
            .unwrap();
        store
            .apply(change_set(Timestamp::at(3, 0), vec![set_change("global.stability", 30.0, 20.0)]))
            .unwrap();

        assert_eq!(store.at(Timestamp::at(0, 0)).global.stability, 50.0);
        assert_eq!(store.at(Timestamp::at(2, 0)).global.stability, 30.0);
        assert_eq!(store.at(Timestamp::at(2, 5)), store.at(Timestamp::at(2, 5)));
        assert_eq!(store.at(Timestamp::at(9, 0)), *store.current());
    }

    #[test]
    fn test_revert_to_truncates_and_replays() {
        let mut store = WorldStateStore::default();
        let first = change_set(Timestamp::at(1, 0), vec![set_change("regions.vale.unrest", 50.0, 70.0)]);
        let first_id = first.id;
        store.apply(first).unwrap();
        store
            .apply(change_set(Timestamp::at(2, 0), vec![set_change("regions.vale.unrest", 70.0, 95.0)]))
            .unwrap();

        let state = store.revert_to(first_id).unwrap();
        assert_eq!(state.regions[&RegionId::from("vale")].unrest, 70.0);
        assert_eq!(store.history().len(), 1);

        let err = store.revert_to(ChangeSetId::new()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_trends_follow_last_global_change() {
        let mut store = WorldStateStore::default();
        store
            .apply(change_set(Timestamp::at(1, 0), vec![set_change("global.magicLevel", 50.0, 30.0)]))
            .unwrap();
        let trend = store.current().trend(GlobalAttribute::MagicLevel).cloned().unwrap();
        assert_eq!(trend.direction, TrendDirection::Falling);
        assert_eq!(trend.speed, TrendSpeed::Fast);

        store
            .apply(change_set(Timestamp::at(2, 0), vec![set_change("global.magicLevel", 30.0, 33.0)]))
            .unwrap();
        let trend = store.current().trend(GlobalAttribute::MagicLevel).cloned().unwrap();
        assert_eq!(trend.direction, TrendDirection::Rising);
        assert_eq!(trend.speed, TrendSpeed::Slow);
    }

    #[test]
    fn test_predict_is_a_linear_approximation() {
        let mut store = WorldStateStore::default();
        // Stability rises moderately (+10), economy falls fast (-20).
        store
            .apply(change_set(
                Timestamp::at(1, 0),
                vec![
                    set_change("global.stability", 50.0, 60.0),
                    set_change("global.economy", 50.0, 30.0),
                ],
            ))
            .unwrap();

        let projected = store.predict(10);
        // 10 days * 0.1 * 1.0 = +1, 10 days * 0.1 * 2.0 = -2.
        assert!((projected.global.stability - 61.0).abs() < 1e-9);
        assert!((projected.global.economy - 28.0).abs() < 1e-9);
        // Attributes without a trend stay put.
        assert_eq!(projected.global.magic_level, 50.0);
        // Projection does not touch the ledger.
        assert_eq!(store.current().global.stability, 60.0);

        let far = store.predict(100_000);
        assert_eq!(far.global.stability, 100.0);
        assert_eq!(far.global.economy, 0.0);
    }

    #[test]
    fn test_expired_temporary_changes() {
        let mut store = WorldStateStore::default();
        let mut temp = set_change("global.stability", 50.0, 40.0);
        temp.permanence = Permanence::Temporary { duration_days: 2 };
        store
            .apply(change_set(Timestamp::at(1, 0), vec![temp, set_change("global.economy", 50.0, 55.0)]))
            .unwrap();

        assert!(store.expired_temporary_changes(Timestamp::at(2, 23)).is_empty());
        let expired = store.expired_temporary_changes(Timestamp::at(3, 0));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].1.attribute_path, path("global.stability"));
        // Still applied: the store never reverts temporary changes itself.
        assert_eq!(store.current().global.stability, 40.0);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut store = WorldStateStore::default();
        store
            .apply(change_set(Timestamp::at(1, 0), vec![set_change("factions.guild.wealth", 50.0, 81.3)]))
            .unwrap();
        let json = store.export_history().unwrap();
        assert!(json.contains("\"worldState\""));
        assert!(json.contains("\"stateHistory\""));

        let mut restored = WorldStateStore::default();
        restored.import_history(&json).unwrap();
        assert_eq!(*restored.current(), *store.current());
        assert_eq!(restored.history(), store.history());
    }

    #[test]
    fn test_import_rejects_missing_keys_and_keeps_state() {
        let mut store = WorldStateStore::default();
        store
            .apply(change_set(Timestamp::at(1, 0), vec![set_change("global.stability", 50.0, 10.0)]))
            .unwrap();
        let before = store.current();

        let err = store.import_history(r#"{"worldState": {}}"#).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = store.import_history("{not json").unwrap_err();
        assert!(err.is_fatal());

        assert_eq!(*store.current(), *before);
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_import_rejects_inconsistent_state() {
        let mut source = WorldStateStore::default();
        source
            .apply(change_set(Timestamp::at(1, 0), vec![set_change("global.stability", 50.0, 10.0)]))
            .unwrap();
        let mut export: HistoryExport = serde_json::from_str(&source.export_history().unwrap()).unwrap();
        export.world_state.global.stability = 99.0;

        let mut store = WorldStateStore::default();
        let err = store
            .import_history(&serde_json::to_string(&export).unwrap())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_import_rejects_values_outside_range() {
        let mut wild = WorldState::new();
        wild.global.stability = 500.0;
        wild.global.economy = -40.0;
        let payload = serde_json::to_string(&HistoryExport {
            world_state: wild.clone(),
            state_history: Vec::new(),
            initial_state: Some(wild.clone()),
        })
        .unwrap();

        let mut store = WorldStateStore::default();
        let err = store.import_history(&payload).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(store.current().global.stability, 50.0);

        let mut regional = WorldState::new();
        regional.set(&path("regions.vale.unrest"), 20.0);
        regional.regions.get_mut(&RegionId::from("vale")).unwrap().unrest = 101.0;
        let payload = format!(
            r#"{{"worldState": {}, "stateHistory": []}}"#,
            serde_json::to_string(&regional).unwrap()
        );
        assert!(matches!(
            store.import_history(&payload),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_authored_initial_state_is_clamped() {
        let mut authored = WorldState::new();
        authored.global.magic_level = 140.0;
        authored.set(&path("locations.docks.danger"), 30.0);
        authored.locations.get_mut(&LocationId::from("docks")).unwrap().danger = -5.0;

        let store = WorldStateStore::with_initial_state(authored, TrendConfig::default());
        assert_eq!(store.current().global.magic_level, 100.0);
        assert_eq!(store.initial_state().global.magic_level, 100.0);
        assert_eq!(store.current().get(&path("locations.docks.danger")), 0.0);
        assert!(store.export_history().is_ok());
    }
}
