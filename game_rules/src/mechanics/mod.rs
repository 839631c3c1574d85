//! Game mechanics: damage types and status effects.

use serde::{Deserialize, Serialize};

/// All possible damage types in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DamageType {
    // Physical
    Slashing,
    Piercing,
    Bludgeoning,

    // Elemental
    Fire,
    Cold,
    Lightning,
    Acid,

    // Magical
    Radiant,
    Necrotic,
    Force,
    Psychic,

    // Special
    Poison,
    /// Bypasses all resistances.
    True,
}

/// Status effects that can be applied to characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusEffectType {
    // Damage over time
    Bleeding,
    Poisoned,
    Burning,

    // Control
    Stunned,
    Paralyzed,
    Frightened,
    Charmed,
    Restrained,

    // Debuffs
    Weakened,
    Slowed,
    Blinded,
    Deafened,

    // Buffs
    Blessed,
    Hasted,
    Invisible,
    Protected,

    // Special
    Unconscious,
    Dead,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&StatusEffectType::Restrained).unwrap();
        assert_eq!(json, "\"restrained\"");
    }
}
