//! Component definitions for characters.

use serde::{Deserialize, Serialize};

/// Ability scores and hit points for characters and creatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsComponent {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
    pub current_hp: i32,
    pub max_hp: i32,
}

impl Default for StatsComponent {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
            current_hp: 10,
            max_hp: 10,
        }
    }
}

/// Stat types for modifier calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatType {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl StatsComponent {
    /// Raw ability score for a stat.
    pub fn score(&self, stat: StatType) -> i32 {
        match stat {
            StatType::Strength => self.strength,
            StatType::Dexterity => self.dexterity,
            StatType::Constitution => self.constitution,
            StatType::Intelligence => self.intelligence,
            StatType::Wisdom => self.wisdom,
            StatType::Charisma => self.charisma,
        }
    }

    /// Calculate modifier for a given stat (D&D style: floor((stat - 10) / 2)).
    pub fn modifier(&self, stat: StatType) -> i32 {
        self.score(stat).saturating_sub(10).div_euclid(2)
    }

    /// Current hit points as a percentage of maximum.
    ///
    /// Returns `None` when `max_hp` is not positive, since no meaningful
    /// percentage exists for such a stat block.
    pub fn health_percent(&self) -> Option<f64> {
        if self.max_hp <= 0 {
            return None;
        }
        Some(f64::from(self.current_hp) / f64::from(self.max_hp) * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_modifier() {
        let stats = StatsComponent {
            strength: 18,
            dexterity: 14,
            constitution: 12,
            intelligence: 8,
            wisdom: 10,
            charisma: 16,
            ..Default::default()
        };

        assert_eq!(stats.modifier(StatType::Strength), 4);
        assert_eq!(stats.modifier(StatType::Dexterity), 2);
        assert_eq!(stats.modifier(StatType::Constitution), 1);
        assert_eq!(stats.modifier(StatType::Intelligence), -1);
        assert_eq!(stats.modifier(StatType::Wisdom), 0);
        assert_eq!(stats.modifier(StatType::Charisma), 3);
    }

    #[test]
    fn test_odd_low_scores_round_down() {
        let stats = StatsComponent {
            wisdom: 9,
            dexterity: 3,
            ..Default::default()
        };

        assert_eq!(stats.modifier(StatType::Wisdom), -1);
        assert_eq!(stats.modifier(StatType::Dexterity), -4);
    }

    #[test]
    fn test_extreme_scores_do_not_overflow() {
        let stats = StatsComponent {
            wisdom: i32::MIN,
            dexterity: i32::MAX,
            ..Default::default()
        };

        assert_eq!(stats.modifier(StatType::Wisdom), i32::MIN.div_euclid(2));
        assert_eq!(stats.modifier(StatType::Dexterity), (i32::MAX - 10).div_euclid(2));
    }

    #[test]
    fn test_default_stats() {
        let stats = StatsComponent::default();
        assert_eq!(stats.strength, 10);
        assert_eq!(stats.modifier(StatType::Strength), 0);
    }

    #[test]
    fn test_health_percent() {
        let stats = StatsComponent {
            current_hp: 5,
            max_hp: 20,
            ..Default::default()
        };
        assert_eq!(stats.health_percent(), Some(25.0));

        let broken = StatsComponent {
            max_hp: 0,
            ..Default::default()
        };
        assert_eq!(broken.health_percent(), None);
    }
}
