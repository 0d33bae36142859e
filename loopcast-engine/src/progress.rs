//! Loop progression engine: advances a loop-bearing action by one tick's
//! worth of progress, crossing segment and loop boundaries as needed.
//!
//! The current segment index is re-derived each tick by greedily subtracting
//! segment costs from the accumulated progress. Deriving instead of storing
//! keeps the model consistent when cost functions scale with completed
//! segments between repetitions.

use smallvec::SmallVec;

use crate::catalog::{ActionRule, LoopCtx, LoopRule};
use crate::host::HostContext;
use crate::state::SimState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Crossing {
    Segment,
    Loop,
}

/// Advance one tick of loop progress; returns whether ticking should
/// continue for this repetition.
///
/// Non-loop actions are a no-op that always continues. Loop actions stop
/// when the tick contributed no progress or the segment cap is reached.
pub(crate) fn advance_loop_tick(
    rule: &ActionRule,
    state: &mut SimState,
    host: &HostContext,
    mana_per_tick: f64,
) -> bool {
    let Some(loop_rule) = rule.loop_rule() else {
        return true;
    };

    let mut progression = state.progression(&rule.name);
    let cap = loop_rule.cap.resolve(host);
    let segments = u64::from(loop_rule.segments_per_loop);
    let mut crossings: SmallVec<[Crossing; 4]> = SmallVec::new();
    let continue_ticking;

    {
        let mut ctx = LoopCtx {
            progression,
            state,
            host,
        };

        // Re-derive the segment index from accumulated progress.
        let mut remaining = progression.progress_units;
        let mut segment: u64 = 0;
        loop {
            let cost = (loop_rule.segment_cost)(&ctx, segment);
            if cost <= 0.0 || remaining < cost {
                break;
            }
            remaining -= cost;
            segment += 1;
        }

        let offset = (segment % segments) as u32;
        let delta = (loop_rule.tick_progress)(&ctx, offset) * mana_per_tick;
        remaining += delta;
        progression.progress_units += delta;
        ctx.progression = progression;

        // Walk forward consuming every segment the tick completed.
        if delta > 0.0 {
            loop {
                if cap.is_some_and(|max| segment >= max) {
                    break;
                }
                let cost = (loop_rule.segment_cost)(&ctx, segment);
                if cost <= 0.0 || remaining < cost {
                    break;
                }
                remaining -= cost;
                if segment == segments - 1 {
                    progression.progress_units = 0.0;
                    progression.completed += segments;
                    progression.total_loops += 1;
                    segment = 0;
                    crossings.push(Crossing::Loop);
                } else {
                    segment += 1;
                }
                crossings.push(Crossing::Segment);
                ctx.progression = progression;
            }
        }

        continue_ticking = delta > 0.0 && cap.is_none_or(|max| segment < max);
    }

    state.set_progression(&rule.name, progression);
    fire_crossings(loop_rule, &crossings, state, host);
    continue_ticking
}

fn fire_crossings(
    loop_rule: &LoopRule,
    crossings: &[Crossing],
    state: &mut SimState,
    host: &HostContext,
) {
    for crossing in crossings {
        let effect = match crossing {
            Crossing::Loop => loop_rule.effects.loop_done.as_ref(),
            Crossing::Segment => loop_rule.effects.segment.as_ref(),
        };
        if let Some(effect) = effect {
            effect(state, host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LoopEffects, SegmentCap, StatWeights};
    use crate::state::Progression;
    use std::cell::Cell;
    use std::rc::Rc;

    fn host() -> HostContext {
        HostContext::builder()
            .level_curve(|exp| (exp / 100.0) as u32)
            .skill_level_curve(|exp| (exp / 100.0) as u32)
            .bonus_multiplier(|_| 1.0)
            .build()
            .unwrap()
    }

    fn flat_loop_rule(
        segments_per_loop: u32,
        cost: f64,
        progress: f64,
        cap: SegmentCap,
        effects: LoopEffects,
    ) -> ActionRule {
        ActionRule::looping(
            "delve",
            StatWeights::new(),
            1.0,
            LoopRule {
                segments_per_loop,
                stat_order: vec!["strength".into()],
                cap,
                segment_cost: Box::new(move |_, _| cost),
                tick_progress: Box::new(move |_, _| progress),
                effects,
            },
        )
    }

    #[test]
    fn non_loop_actions_are_a_continuing_no_op() {
        let rule = ActionRule::instant("wait", StatWeights::new(), 1.0);
        let mut state = SimState::default();
        assert!(advance_loop_tick(&rule, &mut state, &host(), 1.0));
        assert_eq!(state.progress.len(), 0);
    }

    #[test]
    fn completing_all_segments_finishes_a_loop() {
        let segment_fires = Rc::new(Cell::new(0u32));
        let loop_fires = Rc::new(Cell::new(0u32));
        let seg = Rc::clone(&segment_fires);
        let lp = Rc::clone(&loop_fires);
        let effects = LoopEffects {
            segment: Some(Box::new(move |_, _| seg.set(seg.get() + 1))),
            loop_done: Some(Box::new(move |_, _| lp.set(lp.get() + 1))),
            end: None,
        };
        // Two segments of cost 100; each tick contributes 50 progress.
        let rule = flat_loop_rule(2, 100.0, 50.0, SegmentCap::Unbounded, effects);
        let host = host();
        let mut state = SimState::default();
        state.ensure_progression("delve", Progression::default());

        for _ in 0..4 {
            assert!(advance_loop_tick(&rule, &mut state, &host, 1.0));
        }
        let progression = state.progression("delve");
        assert_eq!(progression.completed, 2);
        assert_eq!(progression.total_loops, 1);
        assert!(progression.progress_units.abs() < f64::EPSILON);
        assert_eq!(segment_fires.get(), 2);
        assert_eq!(loop_fires.get(), 1);
    }

    #[test]
    fn completed_stays_a_segment_multiple() {
        let rule = flat_loop_rule(3, 10.0, 7.0, SegmentCap::Unbounded, LoopEffects::default());
        let host = host();
        let mut state = SimState::default();
        state.ensure_progression("delve", Progression::default());
        for _ in 0..50 {
            advance_loop_tick(&rule, &mut state, &host, 1.0);
            assert_eq!(state.progression("delve").completed % 3, 0);
        }
        assert!(state.progression("delve").total_loops > 0);
    }

    #[test]
    fn segment_cap_stops_ticking() {
        // Cap at one segment of a two-segment loop: the first crossing is
        // allowed, after which the index sits at the cap and ticking stops.
        let rule = flat_loop_rule(2, 10.0, 10.0, SegmentCap::Fixed(1), LoopEffects::default());
        let host = host();
        let mut state = SimState::default();
        state.ensure_progression("delve", Progression::default());

        assert!(!advance_loop_tick(&rule, &mut state, &host, 1.0));
        let progression = state.progression("delve");
        assert_eq!(progression.completed, 0);
        assert!((progression.progress_units - 10.0).abs() < f64::EPSILON);

        // Further ticks keep reporting stop without advancing past the cap.
        assert!(!advance_loop_tick(&rule, &mut state, &host, 1.0));
        assert_eq!(state.progression("delve").completed, 0);
    }

    #[test]
    fn zero_progress_tick_stops() {
        let rule = flat_loop_rule(2, 10.0, 0.0, SegmentCap::Unbounded, LoopEffects::default());
        let mut state = SimState::default();
        state.ensure_progression("delve", Progression::default());
        assert!(!advance_loop_tick(&rule, &mut state, &host(), 1.0));
    }

    #[test]
    fn cost_growth_with_completed_segments_is_visible_mid_walk() {
        // Cost doubles every completed loop; a single huge tick crosses the
        // first loop and must then see the doubled cost.
        let rule = ActionRule::looping(
            "delve",
            StatWeights::new(),
            1.0,
            LoopRule {
                segments_per_loop: 1,
                stat_order: vec![],
                cap: SegmentCap::Unbounded,
                segment_cost: Box::new(|ctx, _| 10.0 * f64::powi(2.0, ctx.progression.total_loops as i32)),
                tick_progress: Box::new(|_, _| 25.0),
                effects: LoopEffects::default(),
            },
        );
        let host = host();
        let mut state = SimState::default();
        state.ensure_progression("delve", Progression::default());

        assert!(advance_loop_tick(&rule, &mut state, &host, 1.0));
        let progression = state.progression("delve");
        // 25 progress: first loop costs 10, second costs 20 and is unmet.
        assert_eq!(progression.total_loops, 1);
        assert_eq!(progression.completed, 1);
    }
}
