//! Tick-count and experience model binding one action rule to the
//! simulation's arithmetic.
//!
//! Ticks are computed once at the start of a repetition and held fixed for
//! that repetition even though stats mutate while ticking; stat changes only
//! affect the next repetition's tick count.

use std::collections::BTreeMap;

use crate::catalog::ActionRule;
use crate::constants::TICK_EPSILON;
use crate::host::HostContext;
use crate::numbers::{ceil_f64_to_i64, i64_to_f64};

/// Cached tick computation for the current repetition of one action.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prediction {
    ticks: i64,
}

impl Prediction {
    #[must_use]
    pub const fn new() -> Self {
        Self { ticks: 0 }
    }

    /// Ticks required for one repetition given current stat experience.
    ///
    /// Cost is the sum over stats present in both the rule's weights and the
    /// stat table of `weight / (1 + level/100)`; the result is
    /// `ceil(mana_cost_per_unit * cost - epsilon)` so exact-integer costs do
    /// not round up from floating-point overshoot. Stats absent from either
    /// side contribute nothing.
    pub fn compute_ticks(
        &mut self,
        rule: &ActionRule,
        stats: &BTreeMap<String, f64>,
        host: &HostContext,
    ) -> i64 {
        let mut cost = 0.0;
        for (stat, weight) in &rule.stat_cost {
            if let Some(exp) = stats.get(stat) {
                let level = f64::from(host.level_from_exp(*exp));
                cost += weight / (1.0 + level / 100.0);
            }
        }
        let raw = rule.mana_cost_per_unit() * cost - TICK_EPSILON;
        self.ticks = ceil_f64_to_i64(raw).max(0);
        self.ticks
    }

    /// Last computed tick count; zero before the first computation.
    #[must_use]
    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    /// Mana spread across one tick, used to scale loop progress.
    #[must_use]
    pub fn mana_per_tick(&self, rule: &ActionRule) -> f64 {
        if self.ticks <= 0 {
            return 0.0;
        }
        rule.mana_cost_per_unit() / i64_to_f64(self.ticks)
    }

    /// Apply one tick's experience gain to every stat the rule touches.
    pub fn accrue_experience(
        &self,
        rule: &ActionRule,
        stats: &mut BTreeMap<String, f64>,
        host: &HostContext,
    ) {
        if self.ticks <= 0 {
            return;
        }
        let per_tick = rule.mana_cost_per_unit() / i64_to_f64(self.ticks);
        for (stat, weight) in &rule.stat_cost {
            if let Some(exp) = stats.get_mut(stat) {
                *exp += weight * rule.exp_multiplier * per_tick * host.bonus_multiplier(stat);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StatWeights;

    fn host() -> HostContext {
        HostContext::builder()
            .level_curve(|exp| (exp / 100.0) as u32)
            .skill_level_curve(|exp| (exp / 100.0) as u32)
            .bonus_multiplier(|_| 1.0)
            .build()
            .unwrap()
    }

    fn weights(pairs: &[(&str, f64)]) -> StatWeights {
        pairs
            .iter()
            .map(|(name, weight)| ((*name).to_string(), *weight))
            .collect()
    }

    fn stats(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs
            .iter()
            .map(|(name, exp)| ((*name).to_string(), *exp))
            .collect()
    }

    #[test]
    fn exact_integer_cost_does_not_round_up() {
        let rule = ActionRule::instant("train", weights(&[("strength", 10.0)]), 1.0);
        let mut prediction = Prediction::new();
        let ticks = prediction.compute_ticks(&rule, &stats(&[("strength", 0.0)]), &host());
        assert_eq!(ticks, 10);
    }

    #[test]
    fn absent_stats_contribute_zero_cost() {
        let rule = ActionRule::instant("train", weights(&[("wits", 10.0)]), 1.0);
        let mut prediction = Prediction::new();
        let ticks = prediction.compute_ticks(&rule, &stats(&[("strength", 5000.0)]), &host());
        assert_eq!(ticks, 0);
        assert_eq!(prediction.ticks(), 0);
    }

    #[test]
    fn higher_levels_never_increase_ticks() {
        let rule = ActionRule::instant("train", weights(&[("strength", 40.0)]), 2.0);
        let mut prediction = Prediction::new();
        let mut previous = i64::MAX;
        for exp in [0.0, 100.0, 500.0, 2_500.0, 10_000.0] {
            let ticks = prediction.compute_ticks(&rule, &stats(&[("strength", exp)]), &host());
            assert!(ticks <= previous, "ticks rose as level rose");
            previous = ticks;
        }
    }

    #[test]
    fn accrual_applies_bonus_and_multiplier() {
        let host = HostContext::builder()
            .level_curve(|exp| (exp / 100.0) as u32)
            .skill_level_curve(|exp| (exp / 100.0) as u32)
            .bonus_multiplier(|stat| if stat == "strength" { 2.0 } else { 1.0 })
            .build()
            .unwrap();
        let rule =
            ActionRule::instant("train", weights(&[("strength", 10.0)]), 1.0).with_exp_multiplier(3.0);
        let mut table = stats(&[("strength", 0.0)]);
        let mut prediction = Prediction::new();
        let ticks = prediction.compute_ticks(&rule, &table, &host);
        assert_eq!(ticks, 10);

        prediction.accrue_experience(&rule, &mut table, &host);
        // weight * multiplier * (mana_cost / ticks) * bonus = 10 * 3 * 0.1 * 2
        assert!((table["strength"] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn zero_tick_prediction_accrues_nothing() {
        let rule = ActionRule::instant("train", weights(&[("wits", 10.0)]), 1.0);
        let mut table = stats(&[("strength", 50.0)]);
        let prediction = Prediction::new();
        prediction.accrue_experience(&rule, &mut table, &host());
        assert!((table["strength"] - 50.0).abs() < f64::EPSILON);
        assert!(prediction.mana_per_tick(&rule).abs() < f64::EPSILON);
    }
}
