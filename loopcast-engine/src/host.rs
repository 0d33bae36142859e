//! Explicit host context replacing implicit global state retrieval.
//!
//! The engine never probes its environment: every external collaborator the
//! simulation reads (experience curves, bonus multipliers, historical loop
//! totals, dungeon floor data, buff levels) is handed over up front through
//! [`HostContextBuilder`], and construction fails fast when a required
//! collaborator is missing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::constants::{
    BUFF_DILATION, DILATION_BAND_DIVISORS, DILATION_BAND_FLOORS, DILATION_BAND_TOWNS,
    DILATION_BAND_WIDTH, STARTING_MANA,
};

/// Experience to level curve supplied by the host.
pub type LevelCurve = Box<dyn Fn(f64) -> u32>;

/// Per-stat bonus-experience multiplier supplied by the host.
pub type BonusFn = Box<dyn Fn(&str) -> f64>;

/// One floor of a dungeon, as recorded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DungeonFloor {
    /// Times this floor has been completed before the simulation.
    #[serde(default)]
    pub completed_count: f64,
}

/// One town/tier band of the time-dilation buff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DilationBand {
    pub town_min: u8,
    pub town_max: u8,
    /// Buff level the band starts counting from.
    pub floor: f64,
    /// Buff levels beyond the floor that still count.
    pub width: f64,
    pub divisor: f64,
}

impl DilationBand {
    const fn covers(&self, town: u8) -> bool {
        town >= self.town_min && town <= self.town_max
    }
}

/// Ordered, non-overlapping dilation bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DilationTable {
    pub bands: Vec<DilationBand>,
}

impl Default for DilationTable {
    fn default() -> Self {
        let bands = DILATION_BAND_TOWNS
            .iter()
            .zip(DILATION_BAND_FLOORS)
            .zip(DILATION_BAND_DIVISORS)
            .map(|((&(town_min, town_max), floor), divisor)| DilationBand {
                town_min,
                town_max,
                floor,
                width: DILATION_BAND_WIDTH,
                divisor,
            })
            .collect();
        Self { bands }
    }
}

impl DilationTable {
    /// Validate band invariants before use.
    ///
    /// # Errors
    ///
    /// Returns `HostError` when a band has a non-positive divisor, a negative
    /// width, an inverted town range, or overlaps another band.
    pub fn validate(&self) -> Result<(), HostError> {
        for band in &self.bands {
            if band.divisor <= 0.0 {
                return Err(HostError::BandRange {
                    field: "divisor",
                    value: band.divisor,
                });
            }
            if band.width < 0.0 {
                return Err(HostError::BandRange {
                    field: "width",
                    value: band.width,
                });
            }
            if band.town_min > band.town_max {
                return Err(HostError::BandRange {
                    field: "town_range",
                    value: f64::from(band.town_min),
                });
            }
        }
        for (i, a) in self.bands.iter().enumerate() {
            for b in self.bands.iter().skip(i + 1) {
                if a.town_min <= b.town_max && b.town_min <= a.town_max {
                    return Err(HostError::BandOverlap {
                        first: a.town_min,
                        second: b.town_min,
                    });
                }
            }
        }
        Ok(())
    }

    /// Divisor applied to a repetition's time for a given town and buff level.
    ///
    /// Returns 1.0 outside every band or below the matching band's floor.
    #[must_use]
    pub fn time_factor(&self, town: u8, buff_level: u32) -> f64 {
        let level = f64::from(buff_level);
        for band in &self.bands {
            if band.covers(town) && level > band.floor {
                return 1.0 + (level - band.floor).min(band.width) / band.divisor;
            }
        }
        1.0
    }
}

/// Errors raised while assembling a [`HostContext`].
///
/// All of these are fatal at initialization: the engine cannot run without
/// its external collaborators.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("missing experience curve: {0}")]
    MissingCurve(&'static str),
    #[error("missing bonus-experience multiplier function")]
    MissingBonus,
    #[error("dilation band field `{field}` out of range (got {value})")]
    BandRange { field: &'static str, value: f64 },
    #[error("dilation bands overlap (towns {first} and {second})")]
    BandOverlap { first: u8, second: u8 },
}

/// Read-only collaborators supplied by the host environment.
pub struct HostContext {
    level_from_exp: LevelCurve,
    skill_level_from_exp: LevelCurve,
    bonus_multiplier: BonusFn,
    stat_names: Vec<String>,
    skill_exp: BTreeMap<String, f64>,
    buff_levels: BTreeMap<String, u32>,
    historical_loops: BTreeMap<String, u64>,
    dungeons: Vec<Vec<DungeonFloor>>,
    current_town: u8,
    starting_mana: f64,
    dilation: DilationTable,
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("stat_names", &self.stat_names)
            .field("skill_exp", &self.skill_exp)
            .field("buff_levels", &self.buff_levels)
            .field("historical_loops", &self.historical_loops)
            .field("dungeons", &self.dungeons)
            .field("current_town", &self.current_town)
            .field("starting_mana", &self.starting_mana)
            .field("dilation", &self.dilation)
            .finish_non_exhaustive()
    }
}

impl HostContext {
    /// Start assembling a context.
    #[must_use]
    pub fn builder() -> HostContextBuilder {
        HostContextBuilder::default()
    }

    /// Stat level for an accumulated experience total.
    #[must_use]
    pub fn level_from_exp(&self, exp: f64) -> u32 {
        (self.level_from_exp)(exp)
    }

    /// Skill level for an accumulated experience total.
    #[must_use]
    pub fn skill_level_from_exp(&self, exp: f64) -> u32 {
        (self.skill_level_from_exp)(exp)
    }

    /// Current talent/soulstone bonus for a stat. Always at least 1.
    #[must_use]
    pub fn bonus_multiplier(&self, stat: &str) -> f64 {
        (self.bonus_multiplier)(stat).max(1.0)
    }

    /// Host-side level of a skill before any simulated gains.
    #[must_use]
    pub fn skill_level(&self, skill: &str) -> u32 {
        let exp = self.skill_exp.get(skill).copied().unwrap_or(0.0);
        self.skill_level_from_exp(exp)
    }

    #[must_use]
    pub fn stat_names(&self) -> &[String] {
        &self.stat_names
    }

    #[must_use]
    pub fn skill_exp(&self) -> &BTreeMap<String, f64> {
        &self.skill_exp
    }

    #[must_use]
    pub fn buff_level(&self, buff: &str) -> u32 {
        self.buff_levels.get(buff).copied().unwrap_or(0)
    }

    /// Loops of an action already completed before this simulation.
    #[must_use]
    pub fn historical_loops(&self, action: &str) -> u64 {
        self.historical_loops.get(action).copied().unwrap_or(0)
    }

    /// Floor records for a dungeon, empty when unknown.
    #[must_use]
    pub fn dungeon(&self, index: usize) -> &[DungeonFloor] {
        self.dungeons.get(index).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub const fn current_town(&self) -> u8 {
        self.current_town
    }

    #[must_use]
    pub const fn starting_mana(&self) -> f64 {
        self.starting_mana
    }

    /// Divisor for the time-dilation buff at a given town.
    #[must_use]
    pub fn dilation_factor(&self, town: u8) -> f64 {
        self.dilation
            .time_factor(town, self.buff_level(BUFF_DILATION))
    }
}

/// Builder enumerating exactly the collaborators the engine consumes.
#[derive(Default)]
pub struct HostContextBuilder {
    level_from_exp: Option<LevelCurve>,
    skill_level_from_exp: Option<LevelCurve>,
    bonus_multiplier: Option<BonusFn>,
    stat_names: Vec<String>,
    skill_exp: BTreeMap<String, f64>,
    buff_levels: BTreeMap<String, u32>,
    historical_loops: BTreeMap<String, u64>,
    dungeons: Vec<Vec<DungeonFloor>>,
    current_town: u8,
    starting_mana: Option<f64>,
    dilation: Option<DilationTable>,
}

impl HostContextBuilder {
    #[must_use]
    pub fn level_curve(mut self, curve: impl Fn(f64) -> u32 + 'static) -> Self {
        self.level_from_exp = Some(Box::new(curve));
        self
    }

    #[must_use]
    pub fn skill_level_curve(mut self, curve: impl Fn(f64) -> u32 + 'static) -> Self {
        self.skill_level_from_exp = Some(Box::new(curve));
        self
    }

    #[must_use]
    pub fn bonus_multiplier(mut self, bonus: impl Fn(&str) -> f64 + 'static) -> Self {
        self.bonus_multiplier = Some(Box::new(bonus));
        self
    }

    #[must_use]
    pub fn stat_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stat_names = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn skill_exp(mut self, skill: impl Into<String>, exp: f64) -> Self {
        self.skill_exp.insert(skill.into(), exp);
        self
    }

    #[must_use]
    pub fn buff_level(mut self, buff: impl Into<String>, level: u32) -> Self {
        self.buff_levels.insert(buff.into(), level);
        self
    }

    #[must_use]
    pub fn historical_loops(mut self, action: impl Into<String>, loops: u64) -> Self {
        self.historical_loops.insert(action.into(), loops);
        self
    }

    #[must_use]
    pub fn dungeon(mut self, floors: Vec<DungeonFloor>) -> Self {
        self.dungeons.push(floors);
        self
    }

    #[must_use]
    pub const fn current_town(mut self, town: u8) -> Self {
        self.current_town = town;
        self
    }

    #[must_use]
    pub const fn starting_mana(mut self, mana: f64) -> Self {
        self.starting_mana = Some(mana);
        self
    }

    #[must_use]
    pub fn dilation(mut self, table: DilationTable) -> Self {
        self.dilation = Some(table);
        self
    }

    /// Assemble the context, failing fast on missing collaborators.
    ///
    /// # Errors
    ///
    /// Returns `HostError` when an experience curve or the bonus multiplier
    /// is missing, or when the dilation table is inconsistent.
    pub fn build(self) -> Result<HostContext, HostError> {
        let level_from_exp = self
            .level_from_exp
            .ok_or(HostError::MissingCurve("level_from_exp"))?;
        let skill_level_from_exp = self
            .skill_level_from_exp
            .ok_or(HostError::MissingCurve("skill_level_from_exp"))?;
        let bonus_multiplier = self.bonus_multiplier.ok_or(HostError::MissingBonus)?;
        let dilation = self.dilation.unwrap_or_default();
        dilation.validate()?;

        Ok(HostContext {
            level_from_exp,
            skill_level_from_exp,
            bonus_multiplier,
            stat_names: self.stat_names,
            skill_exp: self.skill_exp,
            buff_levels: self.buff_levels,
            historical_loops: self.historical_loops,
            dungeons: self.dungeons,
            current_town: self.current_town,
            starting_mana: self.starting_mana.unwrap_or(STARTING_MANA),
            dilation,
        })
    }
}
