//! World snapshots - the immutable view of the game the host hands to the engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::entities::CharacterSnapshot;
use crate::ids::{CharacterId, EnemyId, ItemId, LocationId, QuestId};

pub const MINUTES_PER_HOUR: u64 = 60;
pub const MINUTES_PER_DAY: u64 = 24 * MINUTES_PER_HOUR;

/// Absolute game time in minutes since day 0, 00:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Timestamp at the start of `day`, `hour`.
    pub fn at(day: u32, hour: u8) -> Self {
        Self(u64::from(day) * MINUTES_PER_DAY + u64::from(hour) * MINUTES_PER_HOUR)
    }

    pub fn minutes(&self) -> u64 {
        self.0
    }

    /// Index of the hour this timestamp falls in.
    pub fn hour_index(&self) -> u64 {
        self.0 / MINUTES_PER_HOUR
    }

    /// Index of the day this timestamp falls in.
    pub fn day_index(&self) -> u64 {
        self.0 / MINUTES_PER_DAY
    }

    /// Whole minutes elapsed since `earlier` (zero if `earlier` is in the future).
    pub fn minutes_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = self.0 / MINUTES_PER_DAY;
        let hour = (self.0 % MINUTES_PER_DAY) / MINUTES_PER_HOUR;
        let minute = self.0 % MINUTES_PER_HOUR;
        write!(f, "day {} {:02}:{:02}", day, hour, minute)
    }
}

/// World time tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorldTime {
    pub day: u32,
    pub hour: u8,
    #[serde(default)]
    pub minute: u8,
    #[serde(default)]
    pub season: Season,
}

impl WorldTime {
    /// Create a new world time at the top of the given hour.
    pub fn new(day: u32, hour: u8) -> Self {
        Self {
            day,
            hour,
            minute: 0,
            season: Season::for_day(day),
        }
    }

    /// Absolute timestamp of this moment.
    pub fn timestamp(&self) -> Timestamp {
        Timestamp(
            u64::from(self.day) * MINUTES_PER_DAY
                + u64::from(self.hour) * MINUTES_PER_HOUR
                + u64::from(self.minute),
        )
    }

    /// Return the time `minutes` later.
    pub fn advanced_by(&self, minutes: u32) -> Self {
        let total_minutes = self.minute as u32 + minutes;
        let minute = (total_minutes % 60) as u8;

        let hours_passed = total_minutes / 60;
        let total_hours = self.hour as u32 + hours_passed;
        let hour = (total_hours % 24) as u8;

        let day = self.day + total_hours / 24;

        Self {
            day,
            hour,
            minute,
            season: Season::for_day(day),
        }
    }

    /// Check if it's currently night.
    pub fn is_night(&self) -> bool {
        self.hour < 6 || self.hour >= 20
    }
}

/// Seasons of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Season for a given day; every season lasts 90 days.
    pub fn for_day(day: u32) -> Self {
        match day % 360 {
            0..=89 => Season::Spring,
            90..=179 => Season::Summer,
            180..=269 => Season::Autumn,
            _ => Season::Winter,
        }
    }
}

/// Progress of a quest from the party's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum QuestStatus {
    #[default]
    NotStarted,
    Active,
    Completed,
    Failed,
}

/// Immutable point-in-time view of clock, location, inventory, quests and characters.
///
/// The host produces a fresh snapshot for every tick; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub time: WorldTime,

    /// Where the party currently is.
    pub location: LocationId,

    /// Item -> quantity held by the party.
    #[serde(default)]
    pub inventory: BTreeMap<ItemId, u32>,

    /// Quests the party knows about. Missing quests are `NotStarted`.
    #[serde(default)]
    pub active_quests: BTreeMap<QuestId, QuestStatus>,

    #[serde(default)]
    pub characters: BTreeMap<CharacterId, CharacterSnapshot>,

    /// Enemies the party has defeated so far.
    #[serde(default)]
    pub defeated_enemies: BTreeSet<EnemyId>,
}

impl WorldSnapshot {
    /// Create a snapshot with an empty inventory and no characters.
    pub fn new(time: WorldTime, location: impl Into<LocationId>) -> Self {
        Self {
            time,
            location: location.into(),
            inventory: BTreeMap::new(),
            active_quests: BTreeMap::new(),
            characters: BTreeMap::new(),
            defeated_enemies: BTreeSet::new(),
        }
    }

    /// Add `quantity` of an item to the inventory.
    pub fn with_item(mut self, item: impl Into<ItemId>, quantity: u32) -> Self {
        *self.inventory.entry(item.into()).or_default() += quantity;
        self
    }

    /// Set the status of a quest.
    pub fn with_quest(mut self, quest: impl Into<QuestId>, status: QuestStatus) -> Self {
        self.active_quests.insert(quest.into(), status);
        self
    }

    /// Add or replace a character.
    pub fn with_character(mut self, character: CharacterSnapshot) -> Self {
        self.characters.insert(character.id.clone(), character);
        self
    }

    /// Mark an enemy as defeated.
    pub fn with_defeated_enemy(mut self, enemy: impl Into<EnemyId>) -> Self {
        self.defeated_enemies.insert(enemy.into());
        self
    }

    /// Move the party to another location.
    pub fn at_location(mut self, location: impl Into<LocationId>) -> Self {
        self.location = location.into();
        self
    }

    /// Return the same snapshot at a different time.
    pub fn at_time(mut self, time: WorldTime) -> Self {
        self.time = time;
        self
    }

    pub fn timestamp(&self) -> Timestamp {
        self.time.timestamp()
    }

    pub fn day(&self) -> u32 {
        self.time.day
    }

    /// Quantity of an item held by the party.
    pub fn item_count(&self, item: &ItemId) -> u32 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    /// Status of a quest, `NotStarted` if unknown.
    pub fn quest_status(&self, quest: &QuestId) -> QuestStatus {
        self.active_quests.get(quest).copied().unwrap_or_default()
    }

    /// Get character by ID.
    pub fn character(&self, id: &CharacterId) -> Option<&CharacterSnapshot> {
        self.characters.get(id)
    }

    pub fn is_defeated(&self, enemy: &EnemyId) -> bool {
        self.defeated_enemies.contains(enemy)
    }
}
