//! Before/after value tracking used for per-entry level-up reporting.

use serde::Serialize;
use std::collections::BTreeMap;

/// One tracked value together with the change since the previous observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    /// Exactly the last value handed to [`Snapshot::observe`].
    pub value: f64,
    /// `None` until a second observation; thereafter `new - old`.
    pub delta: Option<f64>,
}

/// Tracks a named set of numeric values across two points in time.
///
/// Keys iterate in lexicographic order so repeated runs over identical
/// inputs emit identical reports.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: BTreeMap<String, Observation>,
}

impl Snapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value for `key`. The first observation leaves the delta
    /// unset; every later one replaces both value and delta.
    pub fn observe(&mut self, key: &str, value: f64) {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.delta = Some(value - entry.value);
                entry.value = value;
            }
            None => {
                self.entries.insert(
                    key.to_string(),
                    Observation {
                        value,
                        delta: None,
                    },
                );
            }
        }
    }

    /// Observe every key in `values` in one pass.
    pub fn observe_all(&mut self, values: &BTreeMap<String, f64>) {
        for (key, value) in values {
            self.observe(key, *value);
        }
    }

    /// Give every key of `values` this snapshot has not seen a first,
    /// zero-valued observation. A key created between two observation
    /// points starts from zero, so the following [`Snapshot::observe_all`]
    /// yields a real delta instead of a fresh `None`.
    pub fn seed_missing(&mut self, values: &BTreeMap<String, f64>) {
        for key in values.keys() {
            if !self.entries.contains_key(key) {
                self.observe(key, 0.0);
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Observation> {
        self.entries.get(key).copied()
    }

    #[must_use]
    pub fn delta(&self, key: &str) -> Option<f64> {
        self.entries.get(key).and_then(|entry| entry.delta)
    }

    /// Entries whose latest delta is present and non-zero.
    pub fn changed(&self) -> impl Iterator<Item = (&str, Observation)> {
        self.entries
            .iter()
            .filter(|(_, obs)| obs.delta.is_some_and(|d| d != 0.0))
            .map(|(key, obs)| (key.as_str(), *obs))
    }
}
