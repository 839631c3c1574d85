//! Campaign milestones and deadline tracking.
//!
//! A milestone completes when its requirements are satisfied and, when it is a
//! deadline milestone, fails once the clock passes its target day first.
//! `Completed` and `Failed` are terminal.

use game_rules::{EnemyId, EventId, ItemId, MilestoneId, QuestId, QuestStatus, WorldSnapshot};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::events::TriggerHistory;

/// One thing a milestone needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Requirement {
    /// Every listed event has fired at least once.
    Events { ids: Vec<EventId> },
    /// Every listed quest is completed.
    Quests { ids: Vec<QuestId> },
    /// The party holds at least `qty` of an item.
    Items { item_id: ItemId, qty: u32 },
    /// An enemy is (or is not) defeated.
    Enemies { enemy_id: EnemyId, defeated: bool },
}

impl Requirement {
    pub fn is_satisfied(&self, snapshot: &WorldSnapshot, history: &TriggerHistory) -> bool {
        match self {
            Requirement::Events { ids } => ids.iter().all(|id| history.has_fired(id)),
            Requirement::Quests { ids } => ids
                .iter()
                .all(|id| snapshot.quest_status(id) == QuestStatus::Completed),
            Requirement::Items { item_id, qty } => snapshot.item_count(item_id) >= *qty,
            Requirement::Enemies { enemy_id, defeated } => {
                snapshot.is_defeated(enemy_id) == *defeated
            }
        }
    }
}

/// How many requirements must hold for completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionMode {
    #[default]
    All,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MilestoneStatus {
    /// Nothing met yet.
    #[default]
    Pending,
    /// Some requirements met, target day not passed.
    OnTrack,
    /// Target day passed without completion. Still evaluated every update.
    Delayed,
    Completed,
    /// Deadline passed without completion. Ends the campaign.
    Failed,
}

impl MilestoneStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MilestoneStatus::Completed | MilestoneStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: MilestoneId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub target_day: u32,
    /// Failing a deadline milestone is campaign-fatal.
    #[serde(default)]
    pub deadline: bool,
    #[serde(default)]
    pub completion_mode: CompletionMode,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub status: MilestoneStatus,
}

impl Milestone {
    pub fn new(id: impl Into<MilestoneId>, title: impl Into<String>, target_day: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            target_day,
            deadline: false,
            completion_mode: CompletionMode::All,
            requirements: Vec::new(),
            status: MilestoneStatus::Pending,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_deadline(mut self) -> Self {
        self.deadline = true;
        self
    }

    pub fn with_mode(mut self, mode: CompletionMode) -> Self {
        self.completion_mode = mode;
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Number of satisfied requirements.
    pub fn requirements_met(&self, snapshot: &WorldSnapshot, history: &TriggerHistory) -> usize {
        self.requirements
            .iter()
            .filter(|r| r.is_satisfied(snapshot, history))
            .count()
    }

    /// Status this milestone should have for `snapshot`. Terminal statuses never change.
    ///
    /// A milestone without requirements is never satisfied.
    pub fn evaluate(&self, snapshot: &WorldSnapshot, history: &TriggerHistory) -> MilestoneStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        let met = self.requirements_met(snapshot, history);
        let satisfied = match self.completion_mode {
            CompletionMode::All => !self.requirements.is_empty() && met == self.requirements.len(),
            CompletionMode::Partial => met > 0,
        };

        if satisfied {
            MilestoneStatus::Completed
        } else if snapshot.day() > self.target_day {
            if self.deadline {
                MilestoneStatus::Failed
            } else {
                MilestoneStatus::Delayed
            }
        } else if met > 0 {
            MilestoneStatus::OnTrack
        } else {
            MilestoneStatus::Pending
        }
    }
}

/// Owns milestones and their status.
#[derive(Debug, Clone, Default)]
pub struct MilestoneTracker {
    milestones: Vec<Milestone>,
}

impl MilestoneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, milestone: Milestone) -> Result<()> {
        if self.get(&milestone.id).is_some() {
            return Err(ConfigurationError::DuplicateId {
                kind: "milestone",
                id: milestone.id.to_string(),
            }
            .into());
        }
        self.milestones.push(milestone);
        Ok(())
    }

    pub fn get(&self, id: &MilestoneId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == *id)
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    /// Re-evaluate every milestone and return the ones whose status changed.
    pub fn update(&mut self, snapshot: &WorldSnapshot, history: &TriggerHistory) -> Vec<Milestone> {
        let mut changed = Vec::new();
        for milestone in &mut self.milestones {
            let status = milestone.evaluate(snapshot, history);
            if status == milestone.status {
                continue;
            }

            tracing::info!(
                milestone = %milestone.id,
                from = ?milestone.status,
                to = ?status,
                day = snapshot.day(),
                "milestone status changed"
            );
            if status == MilestoneStatus::Failed {
                tracing::warn!(milestone = %milestone.id, "deadline milestone failed");
            }
            milestone.status = status;
            changed.push(milestone.clone());
        }
        changed
    }

    /// The first deadline milestone that has failed, if any.
    pub fn failed_deadline(&self) -> Option<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.deadline && m.status == MilestoneStatus::Failed)
    }
}
