//! Identifiers for authored campaign content.
//!
//! Authored data (events, milestones, traps) is written by hand in JSON and
//! refers to other content by name, so these identifiers wrap strings rather
//! than UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifier of an authored conditional event.
    EventId
);
define_id!(
    /// Identifier of a place the party can be.
    LocationId
);
define_id!(ItemId);
define_id!(QuestId);
define_id!(
    /// Identifier of a player character or NPC.
    CharacterId
);
define_id!(RegionId);
define_id!(FactionId);
define_id!(EnemyId);
define_id!(MilestoneId);
define_id!(TrapId);
define_id!(
    /// Identifier of a whole campaign; used to key per-campaign engines.
    CampaignId
);
