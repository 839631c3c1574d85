//! Human-readable digest of the world state store.

use super::attribute::GlobalAttribute;
use super::state::{TrendDirection, TrendSpeed};
use super::store::WorldStateStore;

/// Number of change sets listed under "Recent Changes".
const RECENT_CHANGES: usize = 5;

impl WorldStateStore {
    /// Render the current world as a Markdown report for game masters.
    pub fn generate_state_report(&self) -> String {
        let state = self.current();
        let mut report = String::new();

        report.push_str("## Global Metrics\n");
        for attr in GlobalAttribute::ALL {
            let trend = state
                .trend(attr)
                .map(|t| format!(" ({}, {})", direction_label(t.direction), speed_label(t.speed)))
                .unwrap_or_default();
            report.push_str(&format!("- {}: {:.1}{}\n", attr.as_str(), state.global.get(attr), trend));
        }
        report.push('\n');

        if !state.regions.is_empty() {
            report.push_str("## Regions\n");
            for (id, metrics) in &state.regions {
                report.push_str(&format!(
                    "- {}: prosperity {:.1}, security {:.1}, unrest {:.1}\n",
                    id, metrics.prosperity, metrics.security, metrics.unrest
                ));
            }
            report.push('\n');
        }

        if !state.factions.is_empty() {
            report.push_str("## Factions\n");
            for (id, metrics) in &state.factions {
                report.push_str(&format!(
                    "- {}: power {:.1}, wealth {:.1}, reputation {:.1}\n",
                    id, metrics.power, metrics.wealth, metrics.reputation
                ));
            }
            report.push('\n');
        }

        if !state.locations.is_empty() {
            report.push_str("## Locations\n");
            for (id, metrics) in &state.locations {
                report.push_str(&format!(
                    "- {}: prosperity {:.1}, danger {:.1}, population {:.1}\n",
                    id, metrics.prosperity, metrics.danger, metrics.population
                ));
            }
            report.push('\n');
        }

        let history = self.history();
        report.push_str(&format!("## Recent Changes ({} total)\n", history.len()));
        if history.is_empty() {
            report.push_str("- None\n");
        }
        for change_set in history.iter().rev().take(RECENT_CHANGES) {
            report.push_str(&format!(
                "- {} [{:?}] {}: {}\n",
                change_set.timestamp,
                change_set.severity,
                change_set.cause_event_id,
                change_set
                    .changes
                    .iter()
                    .map(|c| format!("{} {:.1} -> {:.1}", c.attribute_path, c.old_value, c.new_value))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        report
    }
}

fn direction_label(direction: TrendDirection) -> &'static str {
    match direction {
        TrendDirection::Rising => "rising",
        TrendDirection::Falling => "falling",
        TrendDirection::Stable => "stable",
    }
}

fn speed_label(speed: TrendSpeed) -> &'static str {
    match speed {
        TrendSpeed::Slow => "slowly",
        TrendSpeed::Moderate => "steadily",
        TrendSpeed::Fast => "fast",
    }
}
