//! World state - metrics, change sets and the event-sourced store.

mod attribute;
mod change;
mod report;
mod state;
mod store;

pub use attribute::{
    AttributePath, FactionAttribute, GlobalAttribute, LocationAttribute, RegionAttribute,
};
pub use change::{
    classify_outcome, AttributeEffect, ChangeSet, ChangeSetId, ChangeType, Consequences,
    ExternalOutcome, ImpactSeverity, Permanence, StateChange,
};
pub use state::{
    clamp_value, FactionMetrics, GlobalMetrics, LocationMetrics, RegionMetrics, Trend,
    TrendDirection, TrendSpeed, WorldState, MAX_VALUE, MIN_VALUE, NEUTRAL_VALUE,
};
pub(crate) use store::parse_ledger_payload;
pub use store::{HistoryExport, WorldStateStore};
