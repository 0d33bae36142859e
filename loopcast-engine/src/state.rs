//! Mutable simulation aggregate threaded through a forecast run.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::constants::{RESOURCE_MANA, RESOURCE_TOWN};
use crate::host::HostContext;

/// Per-action advancement counters for a loop-bearing action.
///
/// `completed` only ever advances in whole-segment increments and stays an
/// exact multiple of the action's `segments_per_loop`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Progression {
    /// Segments fully finished across all time.
    pub completed: u64,
    /// Partial progress accumulated inside the current loop.
    pub progress_units: f64,
    /// Fully completed loops across all time.
    pub total_loops: u64,
}

impl Progression {
    /// Seed a progression from the host's historical completed-loop total.
    #[must_use]
    pub const fn from_history(loops: u64, segments_per_loop: u32) -> Self {
        Self {
            completed: loops * segments_per_loop as u64,
            progress_units: 0.0,
            total_loops: loops,
        }
    }
}

/// Resources, stat experience, skill experience, and loop progressions for
/// one forecast run. Created fresh per run; nothing persists across runs.
#[derive(Debug, Clone, Default)]
pub struct SimState {
    /// Named resource balances, grown lazily as new names are referenced.
    pub resources: BTreeMap<String, f64>,
    /// Accumulated experience per stat.
    pub stats: BTreeMap<String, f64>,
    /// Accumulated experience per skill.
    pub skills: BTreeMap<String, f64>,
    /// Loop progression per action name, created on first encounter.
    pub progress: BTreeMap<String, Progression>,
}

impl SimState {
    /// Fresh state seeded from the host snapshot: starting mana and town
    /// index as resources, every known stat at zero experience, skills at
    /// the host's current totals.
    #[must_use]
    pub fn seeded(host: &HostContext) -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(RESOURCE_MANA.to_string(), host.starting_mana());
        resources.insert(RESOURCE_TOWN.to_string(), f64::from(host.current_town()));

        let stats = host
            .stat_names()
            .iter()
            .map(|name| (name.clone(), 0.0))
            .collect();

        Self {
            resources,
            stats,
            skills: host.skill_exp().clone(),
            progress: BTreeMap::new(),
        }
    }

    /// Current balance of a resource, zero when never referenced.
    #[must_use]
    pub fn resource(&self, name: &str) -> f64 {
        self.resources.get(name).copied().unwrap_or(0.0)
    }

    /// Add to a resource, creating it at zero first when absent.
    pub fn add_resource(&mut self, name: &str, amount: f64) {
        *self.resources.entry(name.to_string()).or_insert(0.0) += amount;
    }

    pub fn set_resource(&mut self, name: &str, value: f64) {
        self.resources.insert(name.to_string(), value);
    }

    #[must_use]
    pub fn mana(&self) -> f64 {
        self.resource(RESOURCE_MANA)
    }

    /// Town index the run currently sits in, clamped to u8 range.
    #[must_use]
    pub fn town(&self) -> u8 {
        let town = self.resource(RESOURCE_TOWN);
        if town.is_finite() && town >= 0.0 {
            town.min(f64::from(u8::MAX)) as u8
        } else {
            0
        }
    }

    /// Add experience to a skill, creating it when absent.
    pub fn add_skill_exp(&mut self, skill: &str, exp: f64) {
        *self.skills.entry(skill.to_string()).or_insert(0.0) += exp;
    }

    /// Progression counters for an action, default when never seeded.
    #[must_use]
    pub fn progression(&self, action: &str) -> Progression {
        self.progress.get(action).copied().unwrap_or_default()
    }

    /// Seed an action's progression on first reference only.
    pub fn ensure_progression(&mut self, action: &str, seed: Progression) {
        self.progress.entry(action.to_string()).or_insert(seed);
    }

    pub fn set_progression(&mut self, action: &str, progression: Progression) {
        self.progress.insert(action.to_string(), progression);
    }
}
