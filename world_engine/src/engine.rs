//! The campaign engine - one campaign's registry, world ledger, milestones and traps.
//!
//! The host calls [`CampaignEngine::tick`] once per discrete change of the game
//! (clock, location, inventory, quests). A tick fires events, writes their
//! effects to the world ledger and re-evaluates milestones before returning.

use game_rules::{
    CharacterId, CheckResult, DiceRoller, EventId, LocationId, MilestoneId, RngRoller, Timestamp,
    TrapId, WorldSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::conditions::ConditionEvaluator;
use crate::config::EngineConfig;
use crate::error::{ConfigurationError, EngineError, Result};
use crate::events::{ConditionalEvent, EventRegistry, TriggerHistory, TriggerOutcome};
use crate::milestones::{Milestone, MilestoneTracker};
use crate::traps::{TrapEvent, TrapState};
use crate::world::{
    parse_ledger_payload, ChangeSet, ChangeSetId, ExternalOutcome, HistoryExport, WorldState,
    WorldStateStore,
};

/// Everything one tick produced.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Fired events in firing order, cascades directly after their parent.
    pub outcomes: Vec<TriggerOutcome>,
    /// One change set per outcome, in the same order.
    pub change_sets: Vec<ChangeSet>,
    /// Milestones whose status changed.
    pub milestones: Vec<Milestone>,
    /// Set once a deadline milestone has failed. The host should end the campaign.
    pub campaign_failed: Option<MilestoneId>,
    pub world_state: Arc<WorldState>,
}

impl TickReport {
    pub fn fired(&self, event_id: &EventId) -> bool {
        self.outcomes.iter().any(|o| o.event_id == *event_id)
    }
}

/// Result of a trap interaction.
#[derive(Debug, Clone)]
pub struct TrapReport {
    pub trap_id: TrapId,
    /// The skill check, if the interaction involved one.
    pub check: Option<CheckResult>,
    pub state: TrapState,
    /// The trap's own outcome followed by its cascade, when it went off.
    pub outcomes: Vec<TriggerOutcome>,
    pub change_sets: Vec<ChangeSet>,
    pub milestones: Vec<Milestone>,
}

/// Saved campaign: the world ledger plus every authored definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignExport {
    #[serde(flatten)]
    pub ledger: HistoryExport,
    #[serde(default)]
    pub events: Vec<ConditionalEvent>,
    #[serde(default)]
    pub trigger_history: TriggerHistory,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub traps: Vec<TrapEvent>,
}

/// Single-campaign facade over the trigger engine and world state store.
pub struct CampaignEngine {
    config: EngineConfig,
    registry: EventRegistry,
    evaluator: ConditionEvaluator,
    store: WorldStateStore,
    tracker: MilestoneTracker,
    traps: BTreeMap<TrapId, TrapEvent>,
    roller: Box<dyn DiceRoller + Send>,
}

impl std::fmt::Debug for CampaignEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignEngine")
            .field("config", &self.config)
            .field("events", &self.registry.len())
            .field("change_sets", &self.store.history().len())
            .field("milestones", &self.tracker.milestones().len())
            .field("traps", &self.traps.len())
            .finish()
    }
}

impl Default for CampaignEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CampaignEngine {
    /// Create an engine. Dice come from a ChaCha generator, seeded from the
    /// config when it carries a seed.
    pub fn new(config: EngineConfig) -> Self {
        let roller: Box<dyn DiceRoller + Send> = match config.rng_seed {
            Some(seed) => Box::new(RngRoller::seeded(seed)),
            None => Box::new(RngRoller::from_entropy()),
        };
        Self {
            registry: EventRegistry::new(config.max_cascade_depth),
            evaluator: ConditionEvaluator::new(),
            store: WorldStateStore::new(config.trend.clone()),
            tracker: MilestoneTracker::new(),
            traps: BTreeMap::new(),
            roller,
            config,
        }
    }

    /// Replace the dice roller, e.g. with physical dice results.
    pub fn with_roller(mut self, roller: impl DiceRoller + Send + 'static) -> Self {
        self.roller = Box::new(roller);
        self
    }

    /// Start from an authored world instead of a neutral one.
    pub fn with_initial_state(mut self, state: WorldState) -> Self {
        self.store = WorldStateStore::with_initial_state(state, self.config.trend.clone());
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn register_event(&mut self, event: ConditionalEvent) -> Result<()> {
        self.registry.register(event)
    }

    /// Register a batch of events atomically.
    pub fn register_events(&mut self, events: Vec<ConditionalEvent>) -> Result<()> {
        self.registry.register_all(events)
    }

    /// Re-arm an event so it can fire again.
    pub fn reset_event(&mut self, event_id: &EventId) -> Result<()> {
        self.registry.reset(event_id)?;
        self.evaluator.forget_event(event_id);
        Ok(())
    }

    pub fn add_milestone(&mut self, milestone: Milestone) -> Result<()> {
        self.tracker.add(milestone)
    }

    /// Place a trap. Its consequence events must already be registered.
    pub fn add_trap(&mut self, trap: TrapEvent) -> Result<()> {
        validate_trap(&trap, &self.registry)?;
        if self.traps.contains_key(&trap.id) {
            return Err(ConfigurationError::DuplicateId {
                kind: "trap",
                id: trap.id.to_string(),
            }
            .into());
        }
        self.traps.insert(trap.id.clone(), trap);
        Ok(())
    }

    /// Evaluate every armed event against `snapshot`, apply what fired and
    /// update milestones.
    pub fn tick(&mut self, snapshot: &WorldSnapshot) -> Result<TickReport> {
        self.ensure_not_before_head(snapshot.timestamp())?;

        let outcomes = self
            .registry
            .tick(snapshot, &mut self.evaluator, self.roller.as_mut());
        let change_sets = self.record_all(&outcomes)?;
        let milestones = self.tracker.update(snapshot, self.registry.history());
        let campaign_failed = self.tracker.failed_deadline().map(|m| m.id.clone());

        tracing::debug!(
            at = %snapshot.timestamp(),
            fired = outcomes.len(),
            milestones_changed = milestones.len(),
            "tick complete"
        );

        Ok(TickReport {
            outcomes,
            change_sets,
            milestones,
            campaign_failed,
            world_state: self.store.current(),
        })
    }

    /// Have a character search for a trap.
    pub fn detect_trap(
        &mut self,
        trap_id: &TrapId,
        character_id: &CharacterId,
        snapshot: &WorldSnapshot,
    ) -> Result<TrapReport> {
        let character = snapshot
            .character(character_id)
            .ok_or_else(|| EngineError::UnknownCharacter(character_id.clone()))?;
        let trap = self
            .traps
            .get_mut(trap_id)
            .ok_or_else(|| EngineError::UnknownTrap(trap_id.clone()))?;

        let check = trap.detect(character, self.roller.as_mut())?;
        Ok(TrapReport {
            trap_id: trap_id.clone(),
            check: Some(check),
            state: trap.state,
            outcomes: Vec::new(),
            change_sets: Vec::new(),
            milestones: Vec::new(),
        })
    }

    /// Have a character disarm a detected trap. A failed attempt springs it.
    pub fn disarm_trap(
        &mut self,
        trap_id: &TrapId,
        character_id: &CharacterId,
        snapshot: &WorldSnapshot,
    ) -> Result<TrapReport> {
        self.ensure_not_before_head(snapshot.timestamp())?;
        let character = snapshot
            .character(character_id)
            .ok_or_else(|| EngineError::UnknownCharacter(character_id.clone()))?;
        let trap = self
            .traps
            .get_mut(trap_id)
            .ok_or_else(|| EngineError::UnknownTrap(trap_id.clone()))?;

        let check = trap.disarm(character, self.roller.as_mut())?;
        let sprung = if trap.triggered() {
            let spring = trap.roll_spring(self.roller.as_mut());
            Some((trap.outcome(spring, snapshot), trap.consequence_event_ids.clone()))
        } else {
            None
        };

        let mut report = TrapReport {
            trap_id: trap_id.clone(),
            check: Some(check),
            state: trap.state,
            outcomes: Vec::new(),
            change_sets: Vec::new(),
            milestones: Vec::new(),
        };
        if let Some((outcome, consequences)) = sprung {
            self.resolve_spring(outcome, &consequences, snapshot, &mut report)?;
        }
        Ok(report)
    }

    /// Set a trap off without a check, e.g. when the party walks into it.
    pub fn spring_trap(&mut self, trap_id: &TrapId, snapshot: &WorldSnapshot) -> Result<TrapReport> {
        self.ensure_not_before_head(snapshot.timestamp())?;
        let trap = self
            .traps
            .get_mut(trap_id)
            .ok_or_else(|| EngineError::UnknownTrap(trap_id.clone()))?;

        let spring = trap.spring(self.roller.as_mut())?;
        let outcome = trap.outcome(spring, snapshot);
        let consequences = trap.consequence_event_ids.clone();

        let mut report = TrapReport {
            trap_id: trap_id.clone(),
            check: None,
            state: trap.state,
            outcomes: Vec::new(),
            change_sets: Vec::new(),
            milestones: Vec::new(),
        };
        self.resolve_spring(outcome, &consequences, snapshot, &mut report)?;
        Ok(report)
    }

    fn resolve_spring(
        &mut self,
        outcome: TriggerOutcome,
        consequences: &[EventId],
        snapshot: &WorldSnapshot,
        report: &mut TrapReport,
    ) -> Result<()> {
        let cascaded = self.registry.cascade_from(&outcome, consequences, snapshot);
        let mut outcomes = Vec::with_capacity(cascaded.len() + 1);
        outcomes.push(outcome);
        outcomes.extend(cascaded);

        report.change_sets = self.record_all(&outcomes)?;
        report.outcomes = outcomes;
        report.milestones = self.tracker.update(snapshot, self.registry.history());
        Ok(())
    }

    fn record_all(&mut self, outcomes: &[TriggerOutcome]) -> Result<Vec<ChangeSet>> {
        outcomes
            .iter()
            .map(|outcome| self.store.record_outcome(outcome))
            .collect()
    }

    fn ensure_not_before_head(&self, now: Timestamp) -> Result<()> {
        match self.store.head_timestamp() {
            Some(head) if now < head => Err(EngineError::validation(format!(
                "snapshot at {} predates the last change at {}",
                now, head
            ))),
            _ => Ok(()),
        }
    }

    /// Apply an outcome resolved outside the engine.
    pub fn record_external(&mut self, outcome: ExternalOutcome, at: Timestamp) -> Result<ChangeSet> {
        self.store.record_external(outcome, at)
    }

    /// Approximate world state `days` from now. See [`WorldStateStore::predict`].
    pub fn predict(&self, days: u32) -> WorldState {
        self.store.predict(days)
    }

    /// Roll the world ledger back to just after `change_set`.
    ///
    /// Events whose firings are dropped from the ledger are rewound with it,
    /// so they can fire again and no longer count towards milestones.
    /// Milestones are re-evaluated on the next tick; completed and failed
    /// ones stay terminal. Trap states are not rolled back.
    pub fn revert_to(&mut self, change_set: ChangeSetId) -> Result<Arc<WorldState>> {
        let dropped: Vec<(EventId, Timestamp)> = self
            .store
            .history()
            .iter()
            .skip_while(|cs| cs.id != change_set)
            .skip(1)
            .map(|cs| (cs.cause_event_id.clone(), cs.timestamp))
            .collect();

        let state = self.store.revert_to(change_set)?;
        for event_id in self.registry.rewind(&dropped) {
            self.evaluator.forget_event(&event_id);
        }
        Ok(state)
    }

    pub fn world_state(&self) -> Arc<WorldState> {
        self.store.current()
    }

    /// World state as it was at `timestamp`.
    pub fn world_state_at(&self, timestamp: Timestamp) -> WorldState {
        self.store.at(timestamp)
    }

    pub fn history(&self) -> &[ChangeSet] {
        self.store.history()
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn milestones(&self) -> &[Milestone] {
        self.tracker.milestones()
    }

    pub fn trap(&self, trap_id: &TrapId) -> Option<&TrapEvent> {
        self.traps.get(trap_id)
    }

    /// Traps at a location that have not gone off or been disarmed.
    pub fn active_traps_at<'a>(
        &'a self,
        location: &'a LocationId,
    ) -> impl Iterator<Item = &'a TrapEvent> + 'a {
        self.traps
            .values()
            .filter(move |trap| trap.location == *location && !trap.state.is_terminal())
    }

    /// Serialize the world ledger together with every definition.
    pub fn export_campaign(&self) -> Result<String> {
        let export = CampaignExport {
            ledger: self.store.to_export(),
            events: self.registry.events().to_vec(),
            trigger_history: self.registry.history().clone(),
            milestones: self.tracker.milestones().to_vec(),
            traps: self.traps.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Replace the whole campaign with an exported one. On error nothing changes.
    pub fn import_campaign(&mut self, json: &str) -> Result<()> {
        let value = parse_ledger_payload(json)?;
        let export: CampaignExport = serde_json::from_value(value)?;

        let registry = EventRegistry::from_parts(
            export.events,
            export.trigger_history,
            self.config.max_cascade_depth,
        )?;

        let mut tracker = MilestoneTracker::new();
        for milestone in export.milestones {
            tracker.add(milestone)?;
        }

        let mut traps = BTreeMap::new();
        for trap in export.traps {
            validate_trap(&trap, &registry)?;
            if traps.contains_key(&trap.id) {
                return Err(ConfigurationError::DuplicateId {
                    kind: "trap",
                    id: trap.id.to_string(),
                }
                .into());
            }
            traps.insert(trap.id.clone(), trap);
        }

        let mut store = WorldStateStore::new(self.config.trend.clone());
        store.restore(export.ledger)?;

        self.registry = registry;
        self.tracker = tracker;
        self.traps = traps;
        self.store = store;
        self.evaluator = ConditionEvaluator::new();
        tracing::info!(
            events = self.registry.len(),
            milestones = self.tracker.milestones().len(),
            traps = self.traps.len(),
            "imported campaign"
        );
        Ok(())
    }

    /// Markdown digest of the world, milestones and traps.
    pub fn generate_state_report(&self) -> String {
        let mut report = self.store.generate_state_report();

        if !self.tracker.milestones().is_empty() {
            report.push_str("\n## Milestones\n");
            for milestone in self.tracker.milestones() {
                report.push_str(&format!(
                    "- {} (day {}{}): {:?}\n",
                    milestone.title,
                    milestone.target_day,
                    if milestone.deadline { ", deadline" } else { "" },
                    milestone.status
                ));
            }
        }

        if !self.traps.is_empty() {
            report.push_str("\n## Traps\n");
            for trap in self.traps.values() {
                report.push_str(&format!("- {} at {}: {:?}\n", trap.name, trap.location, trap.state));
            }
        }

        report
    }
}

fn validate_trap(trap: &TrapEvent, registry: &EventRegistry) -> Result<()> {
    if let Some(missing) = trap
        .consequence_event_ids
        .iter()
        .find(|id| !registry.contains(id))
    {
        return Err(ConfigurationError::UnknownConsequence {
            event: format!("trap:{}", trap.id),
            missing: missing.clone(),
        }
        .into());
    }
    Ok(())
}
