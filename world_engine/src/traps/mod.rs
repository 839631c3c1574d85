//! Hidden hazards bound to a location.
//!
//! A trap moves `Hidden -> Detected -> Disarmed | Triggered`, or straight from
//! `Hidden` to `Triggered` when the party walks into it. Transitions are
//! one-way. A failed disarm always springs the trap.

use game_rules::{
    CharacterSnapshot, CheckResult, DamageType, DiceFormula, DiceRollResult, DiceRoller, EventId,
    LocationId, SkillCheck, StatType, StatusEffectType, TrapId, WorldSnapshot,
};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::events::{FiringCause, Severity, TriggerOutcome};
use crate::world::{AttributeEffect, Consequences};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrapState {
    #[default]
    Hidden,
    Detected,
    Disarmed,
    Triggered,
}

impl TrapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrapState::Disarmed | TrapState::Triggered)
    }
}

/// Who a sprung trap hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TrapArea {
    /// The character who set it off.
    #[default]
    Single,
    Radius { feet: u32 },
    /// Everyone at the location.
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapDamage {
    pub damage_type: DamageType,
    pub dice: DiceFormula,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapEffect {
    #[serde(default)]
    pub status: Option<StatusEffectType>,
    #[serde(default)]
    pub duration_turns: Option<u32>,
    #[serde(default)]
    pub area: TrapArea,
}

/// What happened when a trap went off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapSpring {
    pub trap_id: TrapId,
    pub location: LocationId,
    pub damage_type: DamageType,
    pub damage: DiceRollResult,
    pub effect: TrapEffect,
}

impl TrapSpring {
    /// Id under which trap outcomes enter the ledger.
    pub fn event_id(&self) -> EventId {
        EventId::new(format!("trap:{}", self.trap_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapEvent {
    pub id: TrapId,
    #[serde(default)]
    pub name: String,
    pub location: LocationId,
    #[serde(rename = "detectionDC")]
    pub detection_dc: i32,
    #[serde(rename = "disarmDC")]
    pub disarm_dc: i32,
    pub damage: TrapDamage,
    #[serde(default)]
    pub effect: TrapEffect,
    #[serde(default)]
    pub state: TrapState,
    /// World mutations applied when the trap springs.
    #[serde(default)]
    pub effects: Vec<AttributeEffect>,
    #[serde(default)]
    pub consequence_event_ids: Vec<EventId>,
}

impl TrapEvent {
    pub fn new(
        id: impl Into<TrapId>,
        location: impl Into<LocationId>,
        detection_dc: i32,
        disarm_dc: i32,
        damage: TrapDamage,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            location: location.into(),
            detection_dc,
            disarm_dc,
            damage,
            effect: TrapEffect::default(),
            state: TrapState::Hidden,
            effects: Vec::new(),
            consequence_event_ids: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_effect(mut self, effect: TrapEffect) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_world_effect(mut self, effect: AttributeEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_consequence(mut self, event_id: impl Into<EventId>) -> Self {
        self.consequence_event_ids.push(event_id.into());
        self
    }

    pub fn hidden(&self) -> bool {
        self.state == TrapState::Hidden
    }

    pub fn detected(&self) -> bool {
        self.state == TrapState::Detected
    }

    pub fn disarmed(&self) -> bool {
        self.state == TrapState::Disarmed
    }

    pub fn triggered(&self) -> bool {
        self.state == TrapState::Triggered
    }

    /// Wisdom check against the detection DC. Success reveals the trap.
    pub fn detect(
        &mut self,
        character: &CharacterSnapshot,
        roller: &mut dyn DiceRoller,
    ) -> Result<CheckResult> {
        self.require(&[TrapState::Hidden], "detect")?;

        let check = SkillCheck::new(character.stats.modifier(StatType::Wisdom), self.detection_dc)
            .resolve(roller);
        if check.success {
            self.transition(TrapState::Detected);
        }
        tracing::info!(
            trap = %self.id,
            character = %character.id,
            check = %check.breakdown(),
            "detect trap"
        );
        Ok(check)
    }

    /// Dexterity check against the disarm DC. Only a detected trap can be
    /// disarmed; failure springs it.
    pub fn disarm(
        &mut self,
        character: &CharacterSnapshot,
        roller: &mut dyn DiceRoller,
    ) -> Result<CheckResult> {
        self.require(&[TrapState::Detected], "disarm")?;

        let check = SkillCheck::new(character.stats.modifier(StatType::Dexterity), self.disarm_dc)
            .resolve(roller);
        tracing::info!(
            trap = %self.id,
            character = %character.id,
            check = %check.breakdown(),
            "disarm trap"
        );
        self.transition(if check.success {
            TrapState::Disarmed
        } else {
            TrapState::Triggered
        });
        Ok(check)
    }

    /// Set the trap off, e.g. because the party walked into it.
    pub fn spring(&mut self, roller: &mut dyn DiceRoller) -> Result<TrapSpring> {
        self.require(&[TrapState::Hidden, TrapState::Detected], "spring")?;
        self.transition(TrapState::Triggered);
        Ok(self.roll_spring(roller))
    }

    /// Roll damage for a trap that has gone off.
    pub fn roll_spring(&self, roller: &mut dyn DiceRoller) -> TrapSpring {
        TrapSpring {
            trap_id: self.id.clone(),
            location: self.location.clone(),
            damage_type: self.damage.damage_type,
            damage: self.damage.dice.roll(roller),
            effect: self.effect,
        }
    }

    /// Turn a spring into an outcome the world state store and registry understand.
    pub fn outcome(&self, spring: TrapSpring, snapshot: &WorldSnapshot) -> TriggerOutcome {
        let description = format!(
            "{} deals {} {:?} damage ({})",
            self.name, spring.damage.total, spring.damage_type, spring.damage.formula
        );
        TriggerOutcome {
            event_id: spring.event_id(),
            title: format!("{} triggered", self.name),
            description,
            severity: Severity::Danger,
            fired_at: snapshot.timestamp(),
            cause: FiringCause::Trap {
                trap_id: self.id.clone(),
            },
            preventable: false,
            effects: self.effects.clone(),
            consequences: Consequences::default(),
            player_influence: 0,
            trap: Some(spring),
            snapshot: snapshot.clone(),
        }
    }

    fn require(&self, allowed: &[TrapState], action: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EngineError::InvalidTrapTransition {
                trap: self.id.clone(),
                state: self.state,
                action,
            })
        }
    }

    fn transition(&mut self, to: TrapState) {
        tracing::info!(trap = %self.id, from = ?self.state, to = ?to, "trap state changed");
        self.state = to;
    }
}
