//! Character snapshots as seen by the world engine.

use serde::{Deserialize, Serialize};

use super::StatsComponent;
use crate::ids::{CharacterId, LocationId};
use crate::mechanics::StatusEffectType;

/// Point-in-time view of a character, supplied by the host with every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSnapshot {
    pub id: CharacterId,
    pub name: String,
    pub current_location: LocationId,
    #[serde(default)]
    pub stats: StatsComponent,
    #[serde(default)]
    pub status_effects: Vec<StatusEffectType>,
}

impl CharacterSnapshot {
    /// Create a character with default stats standing at `location`.
    pub fn new(
        id: impl Into<CharacterId>,
        name: impl Into<String>,
        location: impl Into<LocationId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            current_location: location.into(),
            stats: StatsComponent::default(),
            status_effects: Vec::new(),
        }
    }

    /// Replace the stat block.
    pub fn with_stats(mut self, stats: StatsComponent) -> Self {
        self.stats = stats;
        self
    }

    /// Add an active status effect.
    pub fn with_status(mut self, effect: StatusEffectType) -> Self {
        if !self.status_effects.contains(&effect) {
            self.status_effects.push(effect);
        }
        self
    }

    /// Check if the character is alive.
    pub fn is_alive(&self) -> bool {
        self.stats.current_hp > 0 && !self.has_status(StatusEffectType::Dead)
    }

    /// Check if the character has a specific status effect.
    pub fn has_status(&self, effect: StatusEffectType) -> bool {
        self.status_effects.contains(&effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_character() {
        let character = CharacterSnapshot::new("hero", "Test Hero", "tavern");
        assert_eq!(character.name, "Test Hero");
        assert_eq!(character.current_location, LocationId::from("tavern"));
        assert!(character.is_alive());
    }

    #[test]
    fn test_character_death() {
        let mut character = CharacterSnapshot::new("doomed", "Doomed", "crypt");
        character.stats.current_hp = 0;
        assert!(!character.is_alive());

        let ghost = CharacterSnapshot::new("ghost", "Ghost", "crypt")
            .with_status(StatusEffectType::Dead);
        assert!(!ghost.is_alive());
    }

    #[test]
    fn test_status_not_duplicated() {
        let character = CharacterSnapshot::new("a", "A", "road")
            .with_status(StatusEffectType::Poisoned)
            .with_status(StatusEffectType::Poisoned);
        assert_eq!(character.status_effects.len(), 1);
        assert!(character.has_status(StatusEffectType::Poisoned));
    }
}
