//! Simulation orchestrator: runs an ordered action plan against a fresh
//! simulation state and produces per-entry reports plus run totals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::catalog::{ActionKind, ActionRule, Catalog, CatalogError};
use crate::constants::{
    BASE_MANA_PER_SECOND, CHRONOMANCY_DIVISOR, CHRONOMANCY_EXPONENT, RESOURCE_MANA,
    SKILL_CHRONOMANCY,
};
use crate::host::{HostContext, HostError};
use crate::prediction::Prediction;
use crate::progress::advance_loop_tick;
use crate::report::{EntryReport, Forecast, LevelDelta};
use crate::snapshot::Snapshot;
use crate::state::{Progression, SimState};

/// One entry of an action plan: an action name and a repeat count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub action: String,
    pub count: u32,
}

impl PlanEntry {
    #[must_use]
    pub fn new(action: impl Into<String>, count: u32) -> Self {
        Self {
            action: action.into(),
            count,
        }
    }
}

/// Parse a plan from a JSON array of `{ "action": ..., "count": ... }`.
///
/// # Errors
///
/// Returns an error if the JSON cannot be parsed into plan entries.
pub fn plan_from_json(json: &str) -> Result<Vec<PlanEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Fatal initialization errors; everything after construction is non-fatal.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Binds a validated rule catalog and host context; each [`Forecaster::run`]
/// is a pure function of the plan with no cross-run state.
pub struct Forecaster {
    catalog: Catalog,
    host: HostContext,
}

impl Forecaster {
    /// Validate the collaborators and build a forecaster.
    ///
    /// # Errors
    ///
    /// Returns `ForecastError` when the catalog fails validation.
    pub fn new(catalog: Catalog, host: HostContext) -> Result<Self, ForecastError> {
        catalog.validate()?;
        Ok(Self { catalog, host })
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn host(&self) -> &HostContext {
        &self.host
    }

    /// Forecast a full plan.
    #[must_use]
    pub fn run(&self, plan: &[PlanEntry]) -> Forecast {
        self.run_with_cancel(plan, || false)
    }

    /// Forecast a full plan with a cooperative cancellation check evaluated
    /// before every repetition. Cancellation truncates the run; it never
    /// changes the numbers produced up to that point.
    pub fn run_with_cancel(&self, plan: &[PlanEntry], mut cancel: impl FnMut() -> bool) -> Forecast {
        let mut state = SimState::seeded(&self.host);
        let mut stat_snapshot = Snapshot::new();
        let mut skill_snapshot = Snapshot::new();
        stat_snapshot.observe_all(&state.stats);
        skill_snapshot.observe_all(&state.skills);

        let mut forecast = Forecast::default();
        let mut run_valid = true;
        let mut total_time = 0.0;
        let mut cancelled = false;

        for entry in plan {
            let Some(rule) = self.catalog.get(&entry.action) else {
                // Unknown action names are not an error; the entry is skipped.
                continue;
            };
            if rule.is_looping() {
                state.ensure_progression(
                    &rule.name,
                    Progression::from_history(
                        self.host.historical_loops(&rule.name),
                        rule.segments_per_loop(),
                    ),
                );
            }

            let resources_before = state.resources.clone();
            let mut report = EntryReport::new(&rule.name, state.mana());

            for _ in 0..entry.count {
                if cancel() {
                    cancelled = true;
                    break;
                }
                if !rule.can_start.allows(&state) {
                    break;
                }
                let rep =
                    self.run_repetition(rule, &mut state, &mut report, &mut run_valid);
                total_time += rep.real_time;
                forecast.total_mana += rep.mana_spent;
                report.repetitions_done += 1;
            }

            report.is_valid = run_valid;
            report.resources = changed_resources(&resources_before, &state.resources);
            // Stats or skills first created by this entry's effects start
            // from zero; seed them so their gain lands in this report.
            stat_snapshot.seed_missing(&state.stats);
            skill_snapshot.seed_missing(&state.skills);
            stat_snapshot.observe_all(&state.stats);
            skill_snapshot.observe_all(&state.skills);
            report.stat_levels = self.level_deltas(&stat_snapshot, |exp| {
                self.host.level_from_exp(exp)
            });
            report.skill_levels = self.level_deltas(&skill_snapshot, |exp| {
                self.host.skill_level_from_exp(exp)
            });
            forecast.entries.push(report);

            if cancelled {
                break;
            }
        }

        forecast.total_seconds = total_time / BASE_MANA_PER_SECOND;
        forecast
    }

    /// Execute one repetition: fixed tick count, per-tick mana and
    /// experience accounting, loop advancement, and time conversion.
    fn run_repetition(
        &self,
        rule: &ActionRule,
        state: &mut SimState,
        report: &mut EntryReport,
        run_valid: &mut bool,
    ) -> RepetitionOutcome {
        let reserve = rule.upkeep_reserve.as_ref().map_or(0.0, |upkeep| {
            state.resource(&upkeep.resource) * upkeep.mana_per_unit
        });
        // Upkeep is paid continuously elsewhere; keep it out of this
        // repetition's delta measurement.
        if reserve != 0.0 {
            state.add_resource(RESOURCE_MANA, reserve);
        }
        let mana_before = state.mana();

        let mut prediction = Prediction::new();
        let ticks = prediction.compute_ticks(rule, &state.stats, &self.host);
        let mana_per_tick = prediction.mana_per_tick(rule);

        for _ in 0..ticks {
            state.add_resource(RESOURCE_MANA, -1.0);
            report.ticks_spent += 1;
            if state.mana() < 0.0 {
                *run_valid = false;
            }
            report.lowest_mana = report.lowest_mana.min(state.mana() - reserve);
            prediction.accrue_experience(rule, &mut state.stats, &self.host);
            if rule.is_looping() && !advance_loop_tick(rule, state, &self.host, mana_per_tick) {
                break;
            }
        }

        let mana_spent = mana_before - state.mana();
        if reserve != 0.0 {
            state.add_resource(RESOURCE_MANA, -reserve);
        }
        report.lowest_mana = report.lowest_mana.min(state.mana());

        let real_time = self.repetition_time(mana_spent, state);

        match &rule.kind {
            ActionKind::Instant { effect } => {
                if let Some(effect) = effect {
                    effect(state, &self.host);
                }
            }
            ActionKind::Looping(loop_rule) => {
                if let Some(effect) = &loop_rule.effects.end {
                    effect(state, &self.host);
                }
            }
        }

        RepetitionOutcome {
            mana_spent,
            real_time,
        }
    }

    /// Convert one repetition's mana into game-time units: chronomancy
    /// speeds everything, the dilation buff divides further inside its
    /// town band.
    fn repetition_time(&self, mana_spent: f64, state: &SimState) -> f64 {
        let chronomancy = f64::from(self.host.skill_level(SKILL_CHRONOMANCY));
        let speed = (1.0 + chronomancy / CHRONOMANCY_DIVISOR).powf(CHRONOMANCY_EXPONENT);
        let dilation = self.host.dilation_factor(state.town());
        mana_spent / speed / dilation
    }

    fn level_deltas(
        &self,
        snapshot: &Snapshot,
        level_of: impl Fn(f64) -> u32,
    ) -> crate::report::LevelDeltaSet {
        snapshot
            .changed()
            .map(|(name, observation)| {
                let delta = observation.delta.unwrap_or(0.0);
                let level = level_of(observation.value);
                let previous = level_of(observation.value - delta);
                LevelDelta {
                    name: name.to_string(),
                    level,
                    gained: crate::numbers::level_gain(previous, level),
                    exp_gained: delta,
                }
            })
            .collect()
    }
}

struct RepetitionOutcome {
    mana_spent: f64,
    real_time: f64,
}

/// Resources whose value changed across an entry, with current values.
fn changed_resources(
    before: &BTreeMap<String, f64>,
    after: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    after
        .iter()
        .filter(|(name, value)| before.get(*name).copied().unwrap_or(0.0) != **value)
        .map(|(name, value)| (name.clone(), *value))
        .collect()
}

/// Forecast a plan in one call: validates the collaborators, binds them,
/// and runs the plan.
///
/// # Errors
///
/// Returns `ForecastError` when catalog or host validation fails.
pub fn simulate(
    plan: &[PlanEntry],
    catalog: Catalog,
    host: HostContext,
) -> Result<Forecast, ForecastError> {
    Ok(Forecaster::new(catalog, host)?.run(plan))
}
