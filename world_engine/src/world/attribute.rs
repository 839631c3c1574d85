//! Attribute paths - typed addresses of numeric world state attributes.
//!
//! Paths are authored as dotted strings such as `global.stability` or
//! `regions.northmarch.unrest` and parsed into [`AttributePath`].

use game_rules::{FactionId, LocationId, RegionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// The five world-wide attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlobalAttribute {
    Stability,
    Economy,
    MagicLevel,
    PoliticalTension,
    NaturalBalance,
}

impl GlobalAttribute {
    pub const ALL: [GlobalAttribute; 5] = [
        GlobalAttribute::Stability,
        GlobalAttribute::Economy,
        GlobalAttribute::MagicLevel,
        GlobalAttribute::PoliticalTension,
        GlobalAttribute::NaturalBalance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalAttribute::Stability => "stability",
            GlobalAttribute::Economy => "economy",
            GlobalAttribute::MagicLevel => "magicLevel",
            GlobalAttribute::PoliticalTension => "politicalTension",
            GlobalAttribute::NaturalBalance => "naturalBalance",
        }
    }
}

impl FromStr for GlobalAttribute {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GlobalAttribute::ALL
            .into_iter()
            .find(|attr| attr.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownAttribute(format!("global.{}", s)))
    }
}

/// Metrics tracked per region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegionAttribute {
    Prosperity,
    Security,
    Unrest,
}

/// Metrics tracked per faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FactionAttribute {
    Power,
    Wealth,
    Reputation,
}

/// Metrics tracked per location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LocationAttribute {
    Prosperity,
    Danger,
    Population,
}

impl RegionAttribute {
    pub const ALL: [RegionAttribute; 3] = [
        RegionAttribute::Prosperity,
        RegionAttribute::Security,
        RegionAttribute::Unrest,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            RegionAttribute::Prosperity => "prosperity",
            RegionAttribute::Security => "security",
            RegionAttribute::Unrest => "unrest",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "prosperity" => Some(RegionAttribute::Prosperity),
            "security" => Some(RegionAttribute::Security),
            "unrest" => Some(RegionAttribute::Unrest),
            _ => None,
        }
    }
}

impl FactionAttribute {
    pub const ALL: [FactionAttribute; 3] = [
        FactionAttribute::Power,
        FactionAttribute::Wealth,
        FactionAttribute::Reputation,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            FactionAttribute::Power => "power",
            FactionAttribute::Wealth => "wealth",
            FactionAttribute::Reputation => "reputation",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "power" => Some(FactionAttribute::Power),
            "wealth" => Some(FactionAttribute::Wealth),
            "reputation" => Some(FactionAttribute::Reputation),
            _ => None,
        }
    }
}

impl LocationAttribute {
    pub const ALL: [LocationAttribute; 3] = [
        LocationAttribute::Prosperity,
        LocationAttribute::Danger,
        LocationAttribute::Population,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            LocationAttribute::Prosperity => "prosperity",
            LocationAttribute::Danger => "danger",
            LocationAttribute::Population => "population",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "prosperity" => Some(LocationAttribute::Prosperity),
            "danger" => Some(LocationAttribute::Danger),
            "population" => Some(LocationAttribute::Population),
            _ => None,
        }
    }
}

/// Address of one numeric attribute in the world state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AttributePath {
    Global(GlobalAttribute),
    Region(RegionId, RegionAttribute),
    Faction(FactionId, FactionAttribute),
    Location(LocationId, LocationAttribute),
}

impl AttributePath {
    /// The global attribute this path addresses, if any.
    pub fn as_global(&self) -> Option<GlobalAttribute> {
        match self {
            AttributePath::Global(attr) => Some(*attr),
            _ => None,
        }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributePath::Global(attr) => write!(f, "global.{}", attr.as_str()),
            AttributePath::Region(id, attr) => write!(f, "regions.{}.{}", id, attr.as_str()),
            AttributePath::Faction(id, attr) => write!(f, "factions.{}.{}", id, attr.as_str()),
            AttributePath::Location(id, attr) => {
                write!(f, "locations.{}.{}", id, attr.as_str())
            }
        }
    }
}

impl FromStr for AttributePath {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigurationError::UnknownAttribute(s.to_string());

        let (scope, rest) = s.split_once('.').ok_or_else(unknown)?;
        if scope == "global" {
            return rest.parse().map(AttributePath::Global).map_err(|_| unknown());
        }

        // The metric is always the last segment; ids may contain dots.
        let (id, metric) = rest.rsplit_once('.').ok_or_else(unknown)?;

        match scope {
            "regions" => RegionAttribute::parse(metric)
                .map(|attr| AttributePath::Region(RegionId::from(id), attr)),
            "factions" => FactionAttribute::parse(metric)
                .map(|attr| AttributePath::Faction(FactionId::from(id), attr)),
            "locations" => LocationAttribute::parse(metric)
                .map(|attr| AttributePath::Location(LocationId::from(id), attr)),
            _ => None,
        }
        .ok_or_else(unknown)
    }
}

impl TryFrom<String> for AttributePath {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributePath> for String {
    fn from(path: AttributePath) -> Self {
        path.to_string()
    }
}
