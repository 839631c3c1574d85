//! # World Engine
//!
//! Conditional world events and world-state propagation for tabletop campaigns.
//!
//! The host hands the engine a [`game_rules::WorldSnapshot`] whenever the game
//! changes. Registered events whose conditions hold fire, their effects are
//! written to an append-only ledger of change sets, consequence events cascade
//! and milestones are re-evaluated against deadlines. Hidden traps use the
//! same machinery through skill checks.
//!
//! ```no_run
//! use game_rules::{WorldSnapshot, WorldTime};
//! use world_engine::{CampaignEngine, ConditionalEvent, EngineConfig, Severity, TriggerCondition};
//!
//! let mut engine = CampaignEngine::new(EngineConfig::default());
//! engine.register_event(
//!     ConditionalEvent::new("harvest", "Harvest festival", Severity::Info)
//!         .with_condition(TriggerCondition::Time { day: 3, hour: Some(8) }),
//! )?;
//! let report = engine.tick(&WorldSnapshot::new(WorldTime::new(3, 9), "village"))?;
//! assert_eq!(report.outcomes.len(), 1);
//! # Ok::<(), world_engine::EngineError>(())
//! ```

pub mod conditions;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod hub;
pub mod milestones;
pub mod traps;
pub mod world;

pub use conditions::{Cadence, ConditionEvaluator, ConditionKey, HealthBand, TriggerCondition};
pub use config::{EngineConfig, TrendConfig};
pub use engine::{CampaignEngine, CampaignExport, TickReport, TrapReport};
pub use error::{ConfigurationError, EngineError, Result};
pub use events::{
    ConditionalEvent, EventRegistry, FiringCause, FiringPolicy, Severity, TriggerHistory,
    TriggerOutcome,
};
pub use hub::CampaignHub;
pub use milestones::{CompletionMode, Milestone, MilestoneStatus, MilestoneTracker, Requirement};
pub use traps::{TrapArea, TrapDamage, TrapEffect, TrapEvent, TrapSpring, TrapState};
pub use world::{
    AttributeEffect, AttributePath, ChangeSet, ChangeSetId, ChangeType, Consequences,
    ExternalOutcome, ImpactSeverity, Permanence, StateChange, WorldState, WorldStateStore,
};
