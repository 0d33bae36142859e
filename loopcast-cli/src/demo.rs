//! Built-in demo catalog and host covering every rule shape the engine
//! supports: instant, gated, looping, capped-loop, and upkeep-reserve
//! actions.

use loopcast_engine::numbers::u64_to_f64;
use loopcast_engine::{
    ActionRule, Catalog, DungeonFloor, HostContext, HostError, LoopEffects, LoopRule, PlanEntry,
    SegmentCap, StartGate, StatWeights, TEAM_UPKEEP_PER_MEMBER, UpkeepReserve,
};

/// Triangular experience curve: reaching level `n` takes `100 * n(n+1)/2`
/// total experience.
fn triangular_level(exp: f64) -> u32 {
    if exp <= 0.0 {
        return 0;
    }
    let raw = ((1.0 + 8.0 * exp / 100.0).sqrt() - 1.0) / 2.0;
    raw.floor().max(0.0) as u32
}

fn weights(pairs: &[(&str, f64)]) -> StatWeights {
    pairs
        .iter()
        .map(|(name, weight)| ((*name).to_string(), *weight))
        .collect()
}

pub fn demo_host(starting_mana: Option<f64>, town: u8) -> Result<HostContext, HostError> {
    let mut builder = HostContext::builder()
        .level_curve(triangular_level)
        .skill_level_curve(triangular_level)
        .bonus_multiplier(|_| 1.0)
        .stat_names([
            "strength",
            "dexterity",
            "speed",
            "perception",
            "wits",
            "charisma",
        ])
        .skill_exp("chronomancy", 0.0)
        .current_town(town)
        .dungeon(vec![DungeonFloor::default(); 6]);
    if let Some(mana) = starting_mana {
        builder = builder.starting_mana(mana);
    }
    builder.build()
}

pub fn demo_catalog() -> Catalog {
    let mut catalog = Catalog::new();

    catalog.insert(ActionRule::instant(
        "wander",
        weights(&[("speed", 4.0), ("perception", 4.0)]),
        1.0,
    ));

    catalog.insert(
        ActionRule::instant("smash_pots", weights(&[("strength", 3.0)]), 1.0)
            .with_effect(|state, _| state.add_resource("gold", 10.0)),
    );

    catalog.insert(
        ActionRule::instant("buy_supplies", weights(&[("charisma", 5.0)]), 2.0)
            .with_start_gate(StartGate::When(Box::new(|state| {
                state.resource("gold") >= 30.0
            })))
            .with_effect(|state, _| {
                state.add_resource("gold", -30.0);
                state.add_resource("supplies", 1.0);
            }),
    );

    catalog.insert(
        ActionRule::instant("study_chronomancy", weights(&[("wits", 10.0)]), 2.0)
            .with_exp_multiplier(2.0)
            .with_effect(|state, _| state.add_skill_exp("chronomancy", 50.0)),
    );

    catalog.insert(
        ActionRule::instant("gather_team", weights(&[("charisma", 8.0)]), 3.0)
            .with_upkeep_reserve(UpkeepReserve {
                resource: "team".to_string(),
                mana_per_unit: TEAM_UPKEEP_PER_MEMBER,
            })
            .with_effect(|state, _| state.add_resource("team", 1.0)),
    );

    // Open-ended mine: cost grows with every completed loop.
    catalog.insert(ActionRule::looping(
        "mine_ore",
        weights(&[("strength", 6.0)]),
        1.0,
        LoopRule {
            segments_per_loop: 3,
            stat_order: vec!["strength".into(), "strength".into(), "speed".into()],
            cap: SegmentCap::Unbounded,
            segment_cost: Box::new(|ctx, segment| {
                let scale = 1.0 + 0.15 * u64_to_f64(ctx.progression.total_loops);
                (120.0 + 30.0 * segment as f64) * scale
            }),
            tick_progress: Box::new(|ctx, offset| {
                let stat = ["strength", "strength", "speed"][offset as usize % 3];
                let exp = ctx.state.stats.get(stat).copied().unwrap_or(0.0);
                40.0 + f64::from(ctx.host.level_from_exp(exp))
            }),
            effects: LoopEffects {
                segment: None,
                loop_done: Some(Box::new(|state, _| state.add_resource("ore", 1.0))),
                end: None,
            },
        },
    ));

    // Fixed-floor ruin: capped by the host's known floor records.
    catalog.insert(ActionRule::looping(
        "delve_ruins",
        weights(&[("dexterity", 5.0), ("perception", 5.0)]),
        2.0,
        LoopRule {
            segments_per_loop: 6,
            stat_order: vec!["dexterity".into(), "perception".into()],
            cap: SegmentCap::DungeonFloors(0),
            segment_cost: Box::new(|ctx, segment| {
                let floor = ctx.host.dungeon(0).get(segment as usize);
                let softening = floor.map_or(0.0, |f| f.completed_count * 2.0);
                (200.0 + 80.0 * segment as f64 - softening).max(50.0)
            }),
            tick_progress: Box::new(|_, _| 60.0),
            effects: LoopEffects {
                segment: Some(Box::new(|state, _| state.add_resource("relics", 1.0))),
                loop_done: None,
                end: None,
            },
        },
    ));

    catalog
}

/// Plan used when no plan file is given: earn gold, spend it, then loop.
pub fn demo_plan() -> Vec<PlanEntry> {
    vec![
        PlanEntry::new("wander", 2),
        PlanEntry::new("smash_pots", 6),
        PlanEntry::new("buy_supplies", 2),
        PlanEntry::new("study_chronomancy", 3),
        PlanEntry::new("mine_ore", 10),
        PlanEntry::new("delve_ruins", 4),
    ]
}
