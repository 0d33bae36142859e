//! Declarative action-rule contracts and the rule catalog.
//!
//! A rule describes one action type's cost, effects, and optional loop
//! behavior. Cost and progress functions are plain closures over an explicit
//! [`LoopCtx`] rather than captures of shared mutable state; the progression
//! engine owns the single mutation point per tick.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::host::HostContext;
use crate::state::{Progression, SimState};

/// Stat name to cost-weight mapping.
pub type StatWeights = BTreeMap<String, f64>;

/// Cost-per-unit-of-stat-weight, re-read whenever a repetition starts.
pub type ManaCostFn = Box<dyn Fn() -> f64>;

/// Start predicate over current simulation state.
pub type RulePredicate = Box<dyn Fn(&SimState) -> bool>;

/// Effect mutating resources and skills.
pub type RuleEffect = Box<dyn Fn(&mut SimState, &HostContext)>;

/// Cost of one segment, by index within the current loop.
pub type SegmentCostFn = Box<dyn Fn(&LoopCtx<'_>, u64) -> f64>;

/// Progress contributed by one tick at a segment offset.
pub type TickProgressFn = Box<dyn Fn(&LoopCtx<'_>, u32) -> f64>;

/// Read-only view handed to loop cost and progress functions.
///
/// `progression` is the value as of the moment the function is called; the
/// engine refreshes it between boundary crossings within a tick.
pub struct LoopCtx<'a> {
    pub progression: Progression,
    pub state: &'a SimState,
    pub host: &'a HostContext,
}

/// Whether an action may start, re-evaluated before every repetition.
pub enum StartGate {
    Always,
    Never,
    When(RulePredicate),
}

impl StartGate {
    #[must_use]
    pub fn allows(&self, state: &SimState) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::When(predicate) => predicate(state),
        }
    }
}

impl fmt::Debug for StartGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Never => write!(f, "Never"),
            Self::When(_) => write!(f, "When(..)"),
        }
    }
}

/// Upper bound on total segment advancement for a loop action.
pub enum SegmentCap {
    /// No cap; the loop can repeat forever.
    Unbounded,
    /// Fixed number of segments, e.g. a one-shot imbuement.
    Fixed(u64),
    /// One segment per known floor of the indexed dungeon.
    DungeonFloors(usize),
}

impl SegmentCap {
    /// Resolve against host data; `None` means unbounded.
    #[must_use]
    pub fn resolve(&self, host: &HostContext) -> Option<u64> {
        match self {
            Self::Unbounded => None,
            Self::Fixed(max) => Some(*max),
            Self::DungeonFloors(index) => Some(host.dungeon(*index).len() as u64),
        }
    }
}

impl fmt::Debug for SegmentCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "Unbounded"),
            Self::Fixed(max) => write!(f, "Fixed({max})"),
            Self::DungeonFloors(index) => write!(f, "DungeonFloors({index})"),
        }
    }
}

/// Effects a loop action can fire at its three boundaries.
#[derive(Default)]
pub struct LoopEffects {
    /// Once per segment crossed.
    pub segment: Option<RuleEffect>,
    /// Once per completed loop.
    pub loop_done: Option<RuleEffect>,
    /// Once per repetition, after its mana accounting.
    pub end: Option<RuleEffect>,
}

/// Loop behavior of a loop-bearing action.
pub struct LoopRule {
    /// Segments making up one full loop. Always at least 1.
    pub segments_per_loop: u32,
    /// Stat names cycled by segment offset.
    pub stat_order: Vec<String>,
    pub cap: SegmentCap,
    pub segment_cost: SegmentCostFn,
    pub tick_progress: TickProgressFn,
    pub effects: LoopEffects,
}

impl LoopRule {
    /// Stat backing a given segment offset, cycling the stat order.
    #[must_use]
    pub fn stat_for_offset(&self, offset: u32) -> Option<&str> {
        if self.stat_order.is_empty() {
            return None;
        }
        let index = offset as usize % self.stat_order.len();
        Some(self.stat_order[index].as_str())
    }
}

/// How an action completes: a one-shot effect or segment-based looping.
pub enum ActionKind {
    /// Driven purely by the per-repetition effect.
    Instant { effect: Option<RuleEffect> },
    Looping(LoopRule),
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instant { .. } => write!(f, "Instant"),
            Self::Looping(rule) => write!(
                f,
                "Looping(segments_per_loop: {}, cap: {:?})",
                rule.segments_per_loop, rule.cap
            ),
        }
    }
}

/// Continuous upkeep excluded from per-repetition mana deltas.
///
/// The reserved amount (`resource balance * mana_per_unit`) is added to mana
/// before a repetition's delta measurement and removed afterwards, so costs
/// paid continuously elsewhere do not show up as per-repetition spending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpkeepReserve {
    pub resource: String,
    pub mana_per_unit: f64,
}

/// Declarative description of one action type.
pub struct ActionRule {
    pub name: String,
    pub stat_cost: StatWeights,
    pub exp_multiplier: f64,
    mana_cost: ManaCostFn,
    pub can_start: StartGate,
    pub upkeep_reserve: Option<UpkeepReserve>,
    pub kind: ActionKind,
}

impl fmt::Debug for ActionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRule")
            .field("name", &self.name)
            .field("stat_cost", &self.stat_cost)
            .field("exp_multiplier", &self.exp_multiplier)
            .field("can_start", &self.can_start)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl ActionRule {
    /// New instant action with a fixed mana cost per unit of stat weight.
    #[must_use]
    pub fn instant(name: impl Into<String>, stat_cost: StatWeights, mana_cost: f64) -> Self {
        Self {
            name: name.into(),
            stat_cost,
            exp_multiplier: 1.0,
            mana_cost: Box::new(move || mana_cost),
            can_start: StartGate::Always,
            upkeep_reserve: None,
            kind: ActionKind::Instant { effect: None },
        }
    }

    /// New loop-bearing action with a fixed mana cost per unit of stat weight.
    #[must_use]
    pub fn looping(
        name: impl Into<String>,
        stat_cost: StatWeights,
        mana_cost: f64,
        rule: LoopRule,
    ) -> Self {
        Self {
            name: name.into(),
            stat_cost,
            exp_multiplier: 1.0,
            mana_cost: Box::new(move || mana_cost),
            can_start: StartGate::Always,
            upkeep_reserve: None,
            kind: ActionKind::Looping(rule),
        }
    }

    #[must_use]
    pub fn with_exp_multiplier(mut self, multiplier: f64) -> Self {
        self.exp_multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_mana_cost_fn(mut self, cost: impl Fn() -> f64 + 'static) -> Self {
        self.mana_cost = Box::new(cost);
        self
    }

    #[must_use]
    pub fn with_start_gate(mut self, gate: StartGate) -> Self {
        self.can_start = gate;
        self
    }

    #[must_use]
    pub fn with_effect(mut self, effect: impl Fn(&mut SimState, &HostContext) + 'static) -> Self {
        if let ActionKind::Instant { effect: slot } = &mut self.kind {
            *slot = Some(Box::new(effect));
        }
        self
    }

    #[must_use]
    pub fn with_upkeep_reserve(mut self, reserve: UpkeepReserve) -> Self {
        self.upkeep_reserve = Some(reserve);
        self
    }

    /// Current mana cost per unit of stat weight.
    #[must_use]
    pub fn mana_cost_per_unit(&self) -> f64 {
        (self.mana_cost)()
    }

    #[must_use]
    pub const fn loop_rule(&self) -> Option<&LoopRule> {
        match &self.kind {
            ActionKind::Looping(rule) => Some(rule),
            ActionKind::Instant { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_looping(&self) -> bool {
        matches!(self.kind, ActionKind::Looping(_))
    }

    /// Segments per loop; 1 for instant actions.
    #[must_use]
    pub const fn segments_per_loop(&self) -> u32 {
        match self.loop_rule() {
            Some(rule) => rule.segments_per_loop,
            None => 1,
        }
    }
}

/// Catalog construction errors, fatal at initialization.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog has no action rules")]
    Empty,
    #[error("action `{action}`: {field} must be positive (got {value})")]
    NonPositive {
        action: String,
        field: &'static str,
        value: f64,
    },
    #[error("action `{action}`: segments_per_loop must be at least 1")]
    ZeroSegments { action: String },
}

/// Keyed collection of action rules with deterministic iteration order.
#[derive(Default)]
pub struct Catalog {
    rules: BTreeMap<String, ActionRule>,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule, replacing any previous rule of the same name.
    pub fn insert(&mut self, rule: ActionRule) {
        self.rules.insert(rule.name.clone(), rule);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionRule> {
        self.rules.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Validate catalog invariants before a forecaster accepts it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the catalog is empty or any rule carries
    /// non-positive weights, multipliers, or costs, or a zero segment count.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.rules.is_empty() {
            return Err(CatalogError::Empty);
        }
        for rule in self.rules.values() {
            if rule.exp_multiplier <= 0.0 {
                return Err(CatalogError::NonPositive {
                    action: rule.name.clone(),
                    field: "exp_multiplier",
                    value: rule.exp_multiplier,
                });
            }
            let cost = rule.mana_cost_per_unit();
            if cost <= 0.0 {
                return Err(CatalogError::NonPositive {
                    action: rule.name.clone(),
                    field: "mana_cost_per_unit",
                    value: cost,
                });
            }
            for (stat, weight) in &rule.stat_cost {
                if *weight <= 0.0 {
                    return Err(CatalogError::NonPositive {
                        action: rule.name.clone(),
                        field: "stat_cost",
                        value: *weight,
                    });
                }
                debug_assert!(!stat.is_empty());
            }
            if let Some(loop_rule) = rule.loop_rule()
                && loop_rule.segments_per_loop == 0
            {
                return Err(CatalogError::ZeroSegments {
                    action: rule.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(pairs: &[(&str, f64)]) -> StatWeights {
        pairs
            .iter()
            .map(|(name, weight)| ((*name).to_string(), *weight))
            .collect()
    }

    fn basic_loop_rule() -> LoopRule {
        LoopRule {
            segments_per_loop: 3,
            stat_order: vec!["strength".into(), "speed".into()],
            cap: SegmentCap::Unbounded,
            segment_cost: Box::new(|_, _| 100.0),
            tick_progress: Box::new(|_, _| 50.0),
            effects: LoopEffects::default(),
        }
    }

    #[test]
    fn start_gates_evaluate_against_state() {
        let state = SimState::default();
        assert!(StartGate::Always.allows(&state));
        assert!(!StartGate::Never.allows(&state));
        let gated = StartGate::When(Box::new(|s: &SimState| s.resource("gold") >= 10.0));
        assert!(!gated.allows(&state));
    }

    #[test]
    fn stat_order_cycles_by_offset() {
        let rule = basic_loop_rule();
        assert_eq!(rule.stat_for_offset(0), Some("strength"));
        assert_eq!(rule.stat_for_offset(1), Some("speed"));
        assert_eq!(rule.stat_for_offset(2), Some("strength"));
    }

    #[test]
    fn validate_rejects_empty_catalog() {
        assert_eq!(Catalog::new().validate(), Err(CatalogError::Empty));
    }

    #[test]
    fn validate_rejects_non_positive_cost() {
        let mut catalog = Catalog::new();
        catalog.insert(ActionRule::instant("idle", weights(&[("speed", 1.0)]), 0.0));
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::NonPositive {
                field: "mana_cost_per_unit",
                ..
            })
        ));
    }

    #[test]
    fn validate_accepts_looping_rules() {
        let mut catalog = Catalog::new();
        catalog.insert(ActionRule::looping(
            "delve",
            weights(&[("strength", 2.0)]),
            1.5,
            basic_loop_rule(),
        ));
        assert_eq!(catalog.validate(), Ok(()));
        assert!(catalog.get("delve").unwrap().is_looping());
        assert_eq!(catalog.get("delve").unwrap().segments_per_loop(), 3);
    }

    #[test]
    fn segment_caps_resolve_against_host() {
        let host = crate::host::HostContext::builder()
            .level_curve(|_| 0)
            .skill_level_curve(|_| 0)
            .bonus_multiplier(|_| 1.0)
            .dungeon(vec![crate::host::DungeonFloor::default(); 6])
            .build()
            .unwrap();
        assert_eq!(SegmentCap::Unbounded.resolve(&host), None);
        assert_eq!(SegmentCap::Fixed(9).resolve(&host), Some(9));
        assert_eq!(SegmentCap::DungeonFloors(0).resolve(&host), Some(6));
        assert_eq!(SegmentCap::DungeonFloors(3).resolve(&host), Some(0));
    }
}
