//! The world state - global, regional, faction and location metrics.

use game_rules::{FactionId, LocationId, RegionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::attribute::{
    AttributePath, FactionAttribute, GlobalAttribute, LocationAttribute, RegionAttribute,
};

pub const MIN_VALUE: f64 = 0.0;
pub const MAX_VALUE: f64 = 100.0;
/// Value every attribute starts from.
pub const NEUTRAL_VALUE: f64 = 50.0;

/// Clamp a value into the attribute range.
pub fn clamp_value(value: f64) -> f64 {
    if value.is_nan() {
        return NEUTRAL_VALUE;
    }
    value.clamp(MIN_VALUE, MAX_VALUE)
}

/// World-wide attributes, each in `0..=100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMetrics {
    pub stability: f64,
    pub economy: f64,
    pub magic_level: f64,
    pub political_tension: f64,
    pub natural_balance: f64,
}

impl Default for GlobalMetrics {
    fn default() -> Self {
        Self {
            stability: NEUTRAL_VALUE,
            economy: NEUTRAL_VALUE,
            magic_level: NEUTRAL_VALUE,
            political_tension: NEUTRAL_VALUE,
            natural_balance: NEUTRAL_VALUE,
        }
    }
}

impl GlobalMetrics {
    pub fn get(&self, attr: GlobalAttribute) -> f64 {
        match attr {
            GlobalAttribute::Stability => self.stability,
            GlobalAttribute::Economy => self.economy,
            GlobalAttribute::MagicLevel => self.magic_level,
            GlobalAttribute::PoliticalTension => self.political_tension,
            GlobalAttribute::NaturalBalance => self.natural_balance,
        }
    }

    fn slot(&mut self, attr: GlobalAttribute) -> &mut f64 {
        match attr {
            GlobalAttribute::Stability => &mut self.stability,
            GlobalAttribute::Economy => &mut self.economy,
            GlobalAttribute::MagicLevel => &mut self.magic_level,
            GlobalAttribute::PoliticalTension => &mut self.political_tension,
            GlobalAttribute::NaturalBalance => &mut self.natural_balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionMetrics {
    pub prosperity: f64,
    pub security: f64,
    pub unrest: f64,
}

impl Default for RegionMetrics {
    fn default() -> Self {
        Self {
            prosperity: NEUTRAL_VALUE,
            security: NEUTRAL_VALUE,
            unrest: NEUTRAL_VALUE,
        }
    }
}

impl RegionMetrics {
    pub fn get(&self, attr: RegionAttribute) -> f64 {
        match attr {
            RegionAttribute::Prosperity => self.prosperity,
            RegionAttribute::Security => self.security,
            RegionAttribute::Unrest => self.unrest,
        }
    }

    fn slot(&mut self, attr: RegionAttribute) -> &mut f64 {
        match attr {
            RegionAttribute::Prosperity => &mut self.prosperity,
            RegionAttribute::Security => &mut self.security,
            RegionAttribute::Unrest => &mut self.unrest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionMetrics {
    pub power: f64,
    pub wealth: f64,
    pub reputation: f64,
}

impl Default for FactionMetrics {
    fn default() -> Self {
        Self {
            power: NEUTRAL_VALUE,
            wealth: NEUTRAL_VALUE,
            reputation: NEUTRAL_VALUE,
        }
    }
}

impl FactionMetrics {
    pub fn get(&self, attr: FactionAttribute) -> f64 {
        match attr {
            FactionAttribute::Power => self.power,
            FactionAttribute::Wealth => self.wealth,
            FactionAttribute::Reputation => self.reputation,
        }
    }

    fn slot(&mut self, attr: FactionAttribute) -> &mut f64 {
        match attr {
            FactionAttribute::Power => &mut self.power,
            FactionAttribute::Wealth => &mut self.wealth,
            FactionAttribute::Reputation => &mut self.reputation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMetrics {
    pub prosperity: f64,
    pub danger: f64,
    pub population: f64,
}

impl Default for LocationMetrics {
    fn default() -> Self {
        Self {
            prosperity: NEUTRAL_VALUE,
            danger: NEUTRAL_VALUE,
            population: NEUTRAL_VALUE,
        }
    }
}

impl LocationMetrics {
    pub fn get(&self, attr: LocationAttribute) -> f64 {
        match attr {
            LocationAttribute::Prosperity => self.prosperity,
            LocationAttribute::Danger => self.danger,
            LocationAttribute::Population => self.population,
        }
    }

    fn slot(&mut self, attr: LocationAttribute) -> &mut f64 {
        match attr {
            LocationAttribute::Prosperity => &mut self.prosperity,
            LocationAttribute::Danger => &mut self.danger,
            LocationAttribute::Population => &mut self.population,
        }
    }
}

/// Direction in which an attribute has been moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

impl TrendDirection {
    pub fn sign(&self) -> f64 {
        match self {
            TrendDirection::Rising => 1.0,
            TrendDirection::Falling => -1.0,
            TrendDirection::Stable => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendSpeed {
    Slow,
    Moderate,
    Fast,
}

/// Last observed movement of a global attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub attribute: GlobalAttribute,
    pub direction: TrendDirection,
    pub speed: TrendSpeed,
}

/// The complete mutable ledger state of the campaign world.
///
/// Only the world state store writes to it, and every write is clamped to
/// `0..=100`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    #[serde(default)]
    pub global: GlobalMetrics,
    #[serde(default)]
    pub regions: BTreeMap<RegionId, RegionMetrics>,
    #[serde(default)]
    pub factions: BTreeMap<FactionId, FactionMetrics>,
    #[serde(default)]
    pub locations: BTreeMap<LocationId, LocationMetrics>,
    #[serde(default)]
    pub trends: Vec<Trend>,
}

impl WorldState {
    /// Create a world where every attribute sits at the neutral value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an attribute. Entities not yet materialized read as neutral.
    pub fn get(&self, path: &AttributePath) -> f64 {
        match path {
            AttributePath::Global(attr) => self.global.get(*attr),
            AttributePath::Region(id, attr) => self
                .regions
                .get(id)
                .map_or(NEUTRAL_VALUE, |metrics| metrics.get(*attr)),
            AttributePath::Faction(id, attr) => self
                .factions
                .get(id)
                .map_or(NEUTRAL_VALUE, |metrics| metrics.get(*attr)),
            AttributePath::Location(id, attr) => self
                .locations
                .get(id)
                .map_or(NEUTRAL_VALUE, |metrics| metrics.get(*attr)),
        }
    }

    /// Write an attribute, clamping into range. Returns the stored value.
    pub(crate) fn set(&mut self, path: &AttributePath, value: f64) -> f64 {
        let value = clamp_value(value);
        let slot = match path {
            AttributePath::Global(attr) => self.global.slot(*attr),
            AttributePath::Region(id, attr) => {
                self.regions.entry(id.clone()).or_default().slot(*attr)
            }
            AttributePath::Faction(id, attr) => {
                self.factions.entry(id.clone()).or_default().slot(*attr)
            }
            AttributePath::Location(id, attr) => {
                self.locations.entry(id.clone()).or_default().slot(*attr)
            }
        };
        *slot = value;
        value
    }

    /// Every stored attribute with its path. Unmaterialized entities are skipped.
    pub fn attributes(&self) -> impl Iterator<Item = (AttributePath, f64)> + '_ {
        let global = GlobalAttribute::ALL
            .into_iter()
            .map(|attr| (AttributePath::Global(attr), self.global.get(attr)));
        let regions = self.regions.iter().flat_map(|(id, metrics)| {
            RegionAttribute::ALL
                .into_iter()
                .map(move |attr| (AttributePath::Region(id.clone(), attr), metrics.get(attr)))
        });
        let factions = self.factions.iter().flat_map(|(id, metrics)| {
            FactionAttribute::ALL
                .into_iter()
                .map(move |attr| (AttributePath::Faction(id.clone(), attr), metrics.get(attr)))
        });
        let locations = self.locations.iter().flat_map(|(id, metrics)| {
            LocationAttribute::ALL
                .into_iter()
                .map(move |attr| (AttributePath::Location(id.clone(), attr), metrics.get(attr)))
        });
        global.chain(regions).chain(factions).chain(locations)
    }

    /// The first attribute outside `0..=100`, if any.
    pub fn out_of_range(&self) -> Option<(AttributePath, f64)> {
        self.attributes()
            .find(|(_, value)| !(MIN_VALUE..=MAX_VALUE).contains(value))
    }

    /// Clamp every stored attribute into range.
    pub fn clamp_all(&mut self) {
        let attributes: Vec<(AttributePath, f64)> = self.attributes().collect();
        for (path, value) in attributes {
            self.set(&path, value);
        }
    }

    /// Last recorded trend for a global attribute.
    pub fn trend(&self, attr: GlobalAttribute) -> Option<&Trend> {
        self.trends.iter().find(|t| t.attribute == attr)
    }

    pub(crate) fn record_trend(&mut self, trend: Trend) {
        match self.trends.iter_mut().find(|t| t.attribute == trend.attribute) {
            Some(existing) => *existing = trend,
            None => self.trends.push(trend),
        }
    }
}
