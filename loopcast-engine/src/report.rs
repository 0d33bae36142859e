//! Forecast summary types emitted by the orchestrator.

use serde::Serialize;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// Level deltas kept inline for the common few-stats-touched case.
pub type LevelDeltaSet = SmallVec<[LevelDelta; 4]>;

/// Level movement of one stat or skill across a plan entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelDelta {
    pub name: String,
    /// Level after the entry finished.
    pub level: u32,
    /// Whole levels gained during the entry.
    pub gained: u32,
    /// Raw experience gained during the entry.
    pub exp_gained: f64,
}

/// Per-entry outcome of a forecast run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryReport {
    pub action: String,
    /// Current values of every resource the entry touched.
    pub resources: BTreeMap<String, f64>,
    /// Sticky run validity as of this entry; false once mana has ever gone
    /// negative anywhere earlier in the run.
    pub is_valid: bool,
    /// Lowest spendable mana balance observed while this entry ran.
    /// Upkeep reserves are excluded, so every sample within a repetition
    /// shares one measurement basis.
    pub lowest_mana: f64,
    /// Repetitions that actually executed (start gates stop entries early).
    pub repetitions_done: u32,
    /// Total ticks consumed by this entry.
    pub ticks_spent: u64,
    pub stat_levels: LevelDeltaSet,
    pub skill_levels: LevelDeltaSet,
}

impl EntryReport {
    #[must_use]
    pub fn new(action: impl Into<String>, starting_mana: f64) -> Self {
        Self {
            action: action.into(),
            resources: BTreeMap::new(),
            is_valid: true,
            lowest_mana: starting_mana,
            repetitions_done: 0,
            ticks_spent: 0,
            stat_levels: LevelDeltaSet::new(),
            skill_levels: LevelDeltaSet::new(),
        }
    }
}

/// Aggregate outcome of a whole plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Forecast {
    pub entries: Vec<EntryReport>,
    /// Mana spent across the entire plan.
    pub total_mana: f64,
    /// Elapsed real time in seconds after tick-rate conversion.
    pub total_seconds: f64,
}

impl Forecast {
    /// True when no entry ever drove mana negative.
    #[must_use]
    pub fn is_fully_valid(&self) -> bool {
        self.entries.iter().all(|entry| entry.is_valid)
    }

    /// Report for a named action, first occurrence.
    #[must_use]
    pub fn entry(&self, action: &str) -> Option<&EntryReport> {
        self.entries.iter().find(|entry| entry.action == action)
    }

    /// Serialize the whole forecast to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} entries, {:.0} mana, {:.2}s",
            self.entries.len(),
            self.total_mana,
            self.total_seconds
        )?;
        for entry in &self.entries {
            writeln!(
                f,
                "  {} x{} [{}] mana {:.1}",
                entry.action,
                entry.repetitions_done,
                if entry.is_valid { "ok" } else { "invalid" },
                entry.resources.get("mana").copied().unwrap_or(0.0),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_forecast_is_valid() {
        let forecast = Forecast::default();
        assert!(forecast.is_fully_valid());
        assert!(forecast.entry("anything").is_none());
    }

    #[test]
    fn validity_reflects_any_invalid_entry() {
        let mut forecast = Forecast::default();
        forecast.entries.push(EntryReport::new("train", 250.0));
        let mut bad = EntryReport::new("delve", 10.0);
        bad.is_valid = false;
        forecast.entries.push(bad);
        assert!(!forecast.is_fully_valid());
        assert!(forecast.entry("delve").is_some());
    }

    #[test]
    fn display_lists_entries() {
        let mut forecast = Forecast::default();
        forecast.entries.push(EntryReport::new("train", 250.0));
        let text = forecast.to_string();
        assert!(text.contains("train"));
        assert!(text.contains("ok"));
    }
}
