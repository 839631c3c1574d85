//! State changes and change sets - the only way world state is mutated.

use game_rules::{EventId, LocationId, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attribute::AttributePath;
use super::state::clamp_value;

/// Unique identifier for change sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSetId(pub Uuid);

impl ChangeSetId {
    /// Create a new random change set ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChangeSetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChangeSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    Increase,
    Decrease,
    Set,
}

/// How long a change is meant to last.
///
/// The store records permanence but never reverts temporary changes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Permanence {
    Temporary {
        duration_days: u32,
    },
    #[default]
    Permanent,
    Seasonal,
}

/// An authored mutation carried by a conditional event or external outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeEffect {
    pub attribute: AttributePath,
    pub change_type: ChangeType,
    /// Delta for increase/decrease, target value for set.
    pub amount: f64,
    #[serde(default)]
    pub permanence: Permanence,
}

impl AttributeEffect {
    pub fn new(attribute: AttributePath, change_type: ChangeType, amount: f64) -> Self {
        Self {
            attribute,
            change_type,
            amount,
            permanence: Permanence::Permanent,
        }
    }

    pub fn with_permanence(mut self, permanence: Permanence) -> Self {
        self.permanence = permanence;
        self
    }

    /// Compute the concrete change this effect makes to an attribute currently at `current`.
    pub fn to_change(&self, current: f64) -> StateChange {
        let target = match self.change_type {
            ChangeType::Increase => current + self.amount,
            ChangeType::Decrease => current - self.amount,
            ChangeType::Set => self.amount,
        };
        StateChange {
            attribute_path: self.attribute.clone(),
            old_value: current,
            new_value: clamp_value(target),
            change_type: self.change_type,
            permanence: self.permanence,
        }
    }
}

/// Atomic unit of world mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub attribute_path: AttributePath,
    pub old_value: f64,
    pub new_value: f64,
    pub change_type: ChangeType,
    #[serde(default)]
    pub permanence: Permanence,
}

impl StateChange {
    pub fn delta(&self) -> f64 {
        self.new_value - self.old_value
    }
}

/// Narrative consequences attached to a change set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Consequences {
    pub immediate: Vec<String>,
    pub long_term: Vec<String>,
    pub cascading: Vec<String>,
}

impl Consequences {
    /// Total number of listed consequences.
    pub fn len(&self) -> usize {
        self.immediate.len() + self.long_term.len() + self.cascading.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Impact classification of a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImpactSeverity {
    Minor,
    Moderate,
    Major,
    Critical,
}

/// Classify an externally supplied outcome by its reach. First match wins.
pub fn classify_outcome(affected_locations: usize, consequences: usize) -> ImpactSeverity {
    if affected_locations >= 3 || consequences >= 5 {
        ImpactSeverity::Critical
    } else if affected_locations >= 2 || consequences >= 3 {
        ImpactSeverity::Major
    } else if affected_locations >= 1 || consequences >= 2 {
        ImpactSeverity::Moderate
    } else {
        ImpactSeverity::Minor
    }
}

/// Immutable batch of state changes caused by one trigger outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub id: ChangeSetId,
    pub timestamp: Timestamp,
    pub cause_event_id: EventId,
    pub changes: Vec<StateChange>,
    #[serde(default)]
    pub consequences: Consequences,
    pub severity: ImpactSeverity,
    /// How much the players shaped this outcome, `0..=100`.
    #[serde(default)]
    pub player_influence: u8,
}

/// A resolved outcome produced outside the engine, e.g. by a text generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalOutcome {
    pub cause_event_id: EventId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub affected_locations: Vec<LocationId>,
    #[serde(default)]
    pub consequences: Consequences,
    #[serde(default)]
    pub effects: Vec<AttributeEffect>,
    #[serde(default)]
    pub player_influence: u8,
}

impl ExternalOutcome {
    pub fn severity(&self) -> ImpactSeverity {
        classify_outcome(self.affected_locations.len(), self.consequences.len())
    }
}
