//! Trigger conditions and their evaluation against world snapshots.
//!
//! Every condition variant is a pure predicate over a [`WorldSnapshot`] except
//! [`TriggerCondition::Random`], which is rolled at most once per cadence window
//! per condition instance. The evaluator owns that bookkeeping.

use game_rules::{
    CharacterId, DiceRoller, EventId, ItemId, LocationId, QuestId, QuestStatus, StatusEffectType,
    WorldSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Percentage at or below which a character counts as badly hurt.
pub const LOW_HEALTH_PERCENT: f64 = 25.0;
/// Percentage at or above which a character counts as healthy.
pub const HIGH_HEALTH_PERCENT: f64 = 75.0;

/// A single condition of a conditional event.
///
/// Conditions of one event are AND-ed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum TriggerCondition {
    /// The clock has reached `day` (and `hour`, if given).
    Time { day: u32, hour: Option<u8> },

    /// The party is at `place`, together with every listed character.
    Location {
        place: LocationId,
        #[serde(default)]
        required_characters: Vec<CharacterId>,
    },

    /// A character's health band and/or status effect.
    CharacterState {
        character_id: CharacterId,
        health_band: Option<HealthBand>,
        status: Option<StatusEffectType>,
    },

    /// The party holds at least `min_qty` of `item`.
    ItemPossession { item: ItemId, min_qty: u32 },

    /// A quest is in the given status.
    QuestState { quest_id: QuestId, status: QuestStatus },

    /// Succeeds with `probability_pct` percent chance, rolled once per cadence window.
    Random { probability_pct: u8, cadence: Cadence },
}

/// Coarse health bands used by character conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthBand {
    /// At or below 25% of maximum hit points.
    Low,
    /// At or above 75% of maximum hit points.
    High,
}

impl HealthBand {
    /// Whether a health percentage falls inside this band.
    pub fn contains(&self, percent: f64) -> bool {
        match self {
            HealthBand::Low => percent <= LOW_HEALTH_PERCENT,
            HealthBand::High => percent >= HIGH_HEALTH_PERCENT,
        }
    }
}

/// How often a random condition may be rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cadence {
    Hourly,
    Daily,
}

/// Identity of one condition instance: the owning event and its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionKey {
    pub event_id: EventId,
    pub index: usize,
}

impl ConditionKey {
    pub fn new(event_id: EventId, index: usize) -> Self {
        Self { event_id, index }
    }
}

impl TriggerCondition {
    /// Evaluate every variant that does not need randomness.
    ///
    /// Returns `None` for [`TriggerCondition::Random`].
    fn holds_in(&self, snapshot: &WorldSnapshot) -> Option<bool> {
        let holds = match self {
            TriggerCondition::Time { day, hour } => match hour {
                Some(h) if *h > 23 => false,
                Some(h) => (snapshot.time.day, snapshot.time.hour) >= (*day, *h),
                None => snapshot.time.day >= *day,
            },
            TriggerCondition::Location {
                place,
                required_characters,
            } => {
                snapshot.location == *place
                    && required_characters.iter().all(|id| {
                        snapshot
                            .character(id)
                            .is_some_and(|c| c.current_location == *place)
                    })
            }
            TriggerCondition::CharacterState {
                character_id,
                health_band,
                status,
            } => match snapshot.character(character_id) {
                None => false,
                Some(character) => {
                    let band_ok = match health_band {
                        None => true,
                        Some(band) => character
                            .stats
                            .health_percent()
                            .is_some_and(|percent| band.contains(percent)),
                    };
                    let status_ok = status.map_or(true, |s| character.has_status(s));
                    band_ok && status_ok
                }
            },
            TriggerCondition::ItemPossession { item, min_qty } => {
                snapshot.item_count(item) >= *min_qty
            }
            TriggerCondition::QuestState { quest_id, status } => {
                snapshot.quest_status(quest_id) == *status
            }
            TriggerCondition::Random { .. } => return None,
        };
        Some(holds)
    }
}

/// Evaluates trigger conditions against snapshots.
///
/// Random conditions remember the cadence window in which they were last
/// rolled; any further evaluation inside the same window returns `false`.
/// This is the only state the evaluator keeps.
#[derive(Debug, Default)]
pub struct ConditionEvaluator {
    last_rolled_window: HashMap<ConditionKey, u64>,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one condition instance. Total over all variants; never panics.
    pub fn evaluate(
        &mut self,
        key: &ConditionKey,
        condition: &TriggerCondition,
        snapshot: &WorldSnapshot,
        roller: &mut dyn DiceRoller,
    ) -> bool {
        if let Some(holds) = condition.holds_in(snapshot) {
            return holds;
        }

        let TriggerCondition::Random {
            probability_pct,
            cadence,
        } = condition
        else {
            return false;
        };

        let now = snapshot.timestamp();
        let window = match cadence {
            Cadence::Hourly => now.hour_index(),
            Cadence::Daily => now.day_index(),
        };

        if self.last_rolled_window.get(key) == Some(&window) {
            tracing::debug!(
                event = %key.event_id,
                index = key.index,
                window,
                "random condition already rolled this window"
            );
            return false;
        }
        self.last_rolled_window.insert(key.clone(), window);

        let roll = roller.roll_die(100);
        let success = roll <= u32::from((*probability_pct).min(100));
        tracing::debug!(
            event = %key.event_id,
            index = key.index,
            roll,
            probability_pct,
            success,
            "rolled random condition"
        );
        success
    }

    /// Forget every random roll made for an event.
    pub fn forget_event(&mut self, event_id: &EventId) {
        self.last_rolled_window
            .retain(|key, _| key.event_id != *event_id);
    }
}
