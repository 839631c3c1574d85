//! Error types for the world engine.
//!
//! Configuration errors are authoring bugs and are fatal; validation errors
//! reject a single call and leave engine state untouched. A failed deadline
//! is not an error at all: it is a modelled milestone status.

use game_rules::{CampaignId, CharacterId, EventId, TrapId};
use thiserror::Error;

use crate::traps::TrapState;

/// Authoring problems detected when content is registered or imported.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Consequence cycle detected: {}", format_cycle(.0))]
    ConsequenceCycle(Vec<EventId>),

    #[error("Event {event} lists unknown consequence event {missing}")]
    UnknownConsequence { event: String, missing: EventId },

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Unknown attribute path: {0}")]
    UnknownAttribute(String),

    #[error("Malformed JSON: {0}")]
    MalformedJson(String),
}

fn format_cycle(cycle: &[EventId]) -> String {
    cycle
        .iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Unified error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown trap: {0}")]
    UnknownTrap(TrapId),

    #[error("Unknown campaign: {0}")]
    UnknownCampaign(CampaignId),

    #[error("Unknown character: {0}")]
    UnknownCharacter(CharacterId),

    #[error("Trap {trap} cannot {action} while {state:?}")]
    InvalidTrapTransition {
        trap: TrapId,
        state: TrapState,
        action: &'static str,
    },

    #[error("Invalid engine config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error indicates broken authored content rather than a bad call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Configuration(_) | EngineError::Config(_))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(ConfigurationError::MalformedJson(err.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = ConfigurationError::ConsequenceCycle(vec![
            EventId::from("a"),
            EventId::from("b"),
            EventId::from("a"),
        ]);
        assert_eq!(err.to_string(), "Consequence cycle detected: a -> b -> a");
    }

    #[test]
    fn test_fatality() {
        let config: EngineError = ConfigurationError::UnknownAttribute("x.y".into()).into();
        assert!(config.is_fatal());
        assert!(!EngineError::validation("missing key").is_fatal());
    }

    #[test]
    fn test_json_errors_are_configuration_errors() {
        let err: EngineError = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert!(matches!(
            err,
            EngineError::Configuration(ConfigurationError::MalformedJson(_))
        ));
    }
}
