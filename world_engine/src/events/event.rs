//! Conditional event definitions and their arming rules.

use game_rules::{EventId, Timestamp, MINUTES_PER_DAY};
use serde::{Deserialize, Serialize};

use crate::conditions::TriggerCondition;
use crate::world::{AttributeEffect, Consequences, ImpactSeverity};

/// How often an event may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FiringPolicy {
    /// Fires at most once per campaign.
    #[default]
    Once,
    /// Re-arms 24 hours after it last fired.
    Daily,
    /// Re-arms 168 hours after it last fired.
    Weekly,
    /// Always armed; its own random conditions decide.
    Random,
}

impl FiringPolicy {
    /// Minutes after a firing before the event is armed again, if it ever is.
    pub fn rearm_after(&self) -> Option<u64> {
        match self {
            FiringPolicy::Once => None,
            FiringPolicy::Daily => Some(MINUTES_PER_DAY),
            FiringPolicy::Weekly => Some(7 * MINUTES_PER_DAY),
            FiringPolicy::Random => Some(0),
        }
    }
}

/// Narrative weight of an event, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
    Critical,
}

impl From<Severity> for ImpactSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => ImpactSeverity::Minor,
            Severity::Warning => ImpactSeverity::Moderate,
            Severity::Danger => ImpactSeverity::Major,
            Severity::Critical => ImpactSeverity::Critical,
        }
    }
}

/// An authored event that fires when all of its conditions hold.
///
/// An event without conditions never qualifies on its own and only fires as
/// a consequence of another event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalEvent {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub conditions: Vec<TriggerCondition>,
    #[serde(default)]
    pub firing_policy: FiringPolicy,
    /// Whether the players still get a chance to stop the event once it fires.
    #[serde(default)]
    pub preventable: bool,
    pub severity: Severity,
    #[serde(default)]
    pub consequence_event_ids: Vec<EventId>,
    #[serde(default)]
    pub last_fired_at: Option<Timestamp>,
    #[serde(default)]
    pub effects: Vec<AttributeEffect>,
    #[serde(default)]
    pub consequences: Consequences,
    #[serde(default)]
    pub player_influence: u8,
}

impl ConditionalEvent {
    pub fn new(id: impl Into<EventId>, title: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            conditions: Vec::new(),
            firing_policy: FiringPolicy::Once,
            preventable: false,
            severity,
            consequence_event_ids: Vec::new(),
            last_fired_at: None,
            effects: Vec::new(),
            consequences: Consequences::default(),
            player_influence: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_condition(mut self, condition: TriggerCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_policy(mut self, policy: FiringPolicy) -> Self {
        self.firing_policy = policy;
        self
    }

    pub fn with_consequence(mut self, event_id: impl Into<EventId>) -> Self {
        self.consequence_event_ids.push(event_id.into());
        self
    }

    pub fn with_effect(mut self, effect: AttributeEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_consequences(mut self, consequences: Consequences) -> Self {
        self.consequences = consequences;
        self
    }

    pub fn with_player_influence(mut self, influence: u8) -> Self {
        self.player_influence = influence.min(100);
        self
    }

    pub fn preventable(mut self) -> Self {
        self.preventable = true;
        self
    }

    /// Whether the event may fire at `now`.
    pub fn is_armed(&self, now: Timestamp) -> bool {
        let Some(last) = self.last_fired_at else {
            return true;
        };
        match self.firing_policy.rearm_after() {
            None => false,
            Some(0) => true,
            Some(window) => now >= last && now.minutes_since(last) >= window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_once_is_terminal() {
        let mut event = ConditionalEvent::new("ambush", "Ambush", Severity::Danger);
        assert!(event.is_armed(Timestamp::at(1, 0)));

        event.last_fired_at = Some(Timestamp::at(1, 0));
        assert!(!event.is_armed(Timestamp::at(1, 0)));
        assert!(!event.is_armed(Timestamp::at(400, 0)));
    }

    #[test]
    fn test_daily_and_weekly_rearm() {
        let mut daily = ConditionalEvent::new("market", "Market day", Severity::Info)
            .with_policy(FiringPolicy::Daily);
        daily.last_fired_at = Some(Timestamp::at(1, 9));
        assert!(!daily.is_armed(Timestamp::at(2, 8)));
        assert!(daily.is_armed(Timestamp::at(2, 9)));

        let mut weekly = daily.clone().with_policy(FiringPolicy::Weekly);
        weekly.last_fired_at = Some(Timestamp::at(1, 9));
        assert!(!weekly.is_armed(Timestamp::at(7, 23)));
        assert!(weekly.is_armed(Timestamp::at(8, 9)));
    }

    #[test]
    fn test_random_policy_is_always_armed() {
        let mut event = ConditionalEvent::new("storm", "Storm", Severity::Warning)
            .with_policy(FiringPolicy::Random);
        event.last_fired_at = Some(Timestamp::at(3, 3));
        assert!(event.is_armed(Timestamp::at(3, 3)));
    }

    #[test]
    fn test_severity_order_and_impact() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Danger < Severity::Critical);
        assert_eq!(ImpactSeverity::from(Severity::Danger), ImpactSeverity::Major);
    }

    #[test]
    fn test_event_json_shape() {
        let event: ConditionalEvent = serde_json::from_str(
            r#"{
                "id": "harvest_festival",
                "title": "Harvest Festival",
                "severity": "info",
                "firingPolicy": "weekly",
                "conditions": [{"type": "time", "day": 3, "hour": 8}],
                "consequenceEventIds": ["merchants_arrive"],
                "effects": [{"attribute": "global.economy", "changeType": "increase", "amount": 5}]
            }"#,
        )
        .unwrap();

        assert_eq!(event.firing_policy, FiringPolicy::Weekly);
        assert_eq!(event.conditions.len(), 1);
        assert_eq!(event.consequence_event_ids, vec![EventId::from("merchants_arrive")]);
        assert!(event.last_fired_at.is_none());
        assert!(!event.preventable);
    }
}
