//! Many campaigns behind one handle, with a single writer per campaign.
//!
//! Every mutation of a campaign goes through that campaign's mutex, so its
//! ledger is totally ordered. After each mutation the current world state is
//! published, and readers take it without touching the engine lock.

use game_rules::{CampaignId, WorldSnapshot};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::config::EngineConfig;
use crate::engine::{CampaignEngine, TickReport};
use crate::error::{ConfigurationError, EngineError, Result};
use crate::world::WorldState;

#[derive(Debug)]
struct CampaignSlot {
    engine: Mutex<CampaignEngine>,
    published: RwLock<Arc<WorldState>>,
}

/// Registry of running campaigns keyed by campaign id.
#[derive(Debug, Default)]
pub struct CampaignHub {
    config: EngineConfig,
    campaigns: RwLock<HashMap<CampaignId, Arc<CampaignSlot>>>,
}

impl CampaignHub {
    /// Create a hub whose new campaigns use `config`.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            campaigns: RwLock::new(HashMap::new()),
        }
    }

    /// Start an empty campaign.
    pub fn create(&self, id: impl Into<CampaignId>) -> Result<()> {
        self.insert(id, CampaignEngine::new(self.config.clone()))
    }

    /// Add an already configured campaign.
    pub fn insert(&self, id: impl Into<CampaignId>, engine: CampaignEngine) -> Result<()> {
        let id = id.into();
        let mut campaigns = self
            .campaigns
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if campaigns.contains_key(&id) {
            return Err(ConfigurationError::DuplicateId {
                kind: "campaign",
                id: id.to_string(),
            }
            .into());
        }

        tracing::info!(campaign = %id, "campaign opened");
        let slot = CampaignSlot {
            published: RwLock::new(engine.world_state()),
            engine: Mutex::new(engine),
        };
        campaigns.insert(id, Arc::new(slot));
        Ok(())
    }

    /// Close a campaign. Returns whether it existed.
    pub fn remove(&self, id: &CampaignId) -> bool {
        let removed = self
            .campaigns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            tracing::info!(campaign = %id, "campaign closed");
        }
        removed
    }

    pub fn contains(&self, id: &CampaignId) -> bool {
        self.campaigns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn campaign_ids(&self) -> Vec<CampaignId> {
        let mut ids: Vec<CampaignId> = self
            .campaigns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Run `f` with exclusive access to one campaign, then publish its world state.
    pub fn with_campaign<R>(
        &self,
        id: &CampaignId,
        f: impl FnOnce(&mut CampaignEngine) -> Result<R>,
    ) -> Result<R> {
        let slot = self.slot(id)?;
        let mut engine = slot.engine.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut engine);
        *slot.published.write().unwrap_or_else(PoisonError::into_inner) = engine.world_state();
        result
    }

    /// Tick one campaign.
    pub fn tick(&self, id: &CampaignId, snapshot: &WorldSnapshot) -> Result<TickReport> {
        self.with_campaign(id, |engine| engine.tick(snapshot))
    }

    /// Last published world state of a campaign. Never waits for a running tick.
    pub fn snapshot_state(&self, id: &CampaignId) -> Option<Arc<WorldState>> {
        let slot = self.slot(id).ok()?;
        let state = slot.published.read().unwrap_or_else(PoisonError::into_inner);
        Some(Arc::clone(&state))
    }

    fn slot(&self, id: &CampaignId) -> Result<Arc<CampaignSlot>> {
        self.campaigns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCampaign(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ConditionalEvent, Severity};
    use crate::world::{AttributeEffect, ChangeType};
    use crate::conditions::TriggerCondition;
    use game_rules::WorldTime;
    use std::thread;

    fn riot() -> ConditionalEvent {
        ConditionalEvent::new("riot", "Riot", Severity::Danger)
            .with_condition(TriggerCondition::Time { day: 1, hour: None })
            .with_effect(AttributeEffect::new(
                "global.stability".parse().unwrap(),
                ChangeType::Decrease,
                10.0,
            ))
    }

    #[test]
    fn test_campaigns_are_isolated() {
        let hub = CampaignHub::new(EngineConfig::default());
        hub.create("north").unwrap();
        hub.create("south").unwrap();
        assert!(hub.create("north").unwrap_err().is_fatal());

        let north = CampaignId::from("north");
        hub.with_campaign(&north, |engine| engine.register_event(riot()))
            .unwrap();
        let snapshot = WorldSnapshot::new(WorldTime::new(1, 0), "square");
        let report = hub.tick(&north, &snapshot).unwrap();
        assert_eq!(report.outcomes.len(), 1);

        assert_eq!(hub.snapshot_state(&north).unwrap().global.stability, 40.0);
        assert_eq!(
            hub.snapshot_state(&CampaignId::from("south")).unwrap().global.stability,
            50.0
        );
        assert_eq!(
            hub.campaign_ids(),
            vec![CampaignId::from("north"), CampaignId::from("south")]
        );
    }

    #[test]
    fn test_unknown_campaign() {
        let hub = CampaignHub::default();
        let ghost = CampaignId::from("ghost");
        assert!(hub.snapshot_state(&ghost).is_none());
        assert!(matches!(
            hub.tick(&ghost, &WorldSnapshot::new(WorldTime::new(1, 0), "x")),
            Err(EngineError::UnknownCampaign(_))
        ));
        assert!(!hub.remove(&ghost));
    }

    #[test]
    fn test_concurrent_writers_are_serialized() {
        let hub = Arc::new(CampaignHub::default());
        hub.create("shared").unwrap();
        let id = CampaignId::from("shared");

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let hub = Arc::clone(&hub);
                let id = id.clone();
                thread::spawn(move || {
                    hub.with_campaign(&id, |engine| {
                        engine.register_event(
                            ConditionalEvent::new(format!("event_{}", n), "e", Severity::Info)
                                .with_condition(TriggerCondition::Time { day: 1, hour: None })
                                .with_effect(AttributeEffect::new(
                                    "global.economy".parse().unwrap(),
                                    ChangeType::Increase,
                                    1.0,
                                )),
                        )
                    })
                    .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let report = hub
            .tick(&id, &WorldSnapshot::new(WorldTime::new(1, 0), "market"))
            .unwrap();
        assert_eq!(report.outcomes.len(), 8);
        assert_eq!(hub.snapshot_state(&id).unwrap().global.economy, 58.0);
    }
}
