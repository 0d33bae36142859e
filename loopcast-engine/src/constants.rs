//! Centralized balance and tuning constants for the Loopcast engine.
//!
//! These values define the deterministic math for the forecast simulation.
//! Keeping them together ensures that forecast arithmetic can only be
//! adjusted via code changes reviewed in version control.

// Resource keys ------------------------------------------------------------
pub const RESOURCE_MANA: &str = "mana";
pub const RESOURCE_TOWN: &str = "town";

// Skill and buff keys read by the time-conversion step ---------------------
pub const SKILL_CHRONOMANCY: &str = "chronomancy";
pub const BUFF_DILATION: &str = "dilation";

// Starting snapshot --------------------------------------------------------
pub(crate) const STARTING_MANA: f64 = 250.0;

// Tick math ----------------------------------------------------------------
/// Subtracted before the ceiling so exact-integer costs do not round up
/// from floating-point overshoot.
pub(crate) const TICK_EPSILON: f64 = 1e-6;

/// Mana units consumed per real second at base speed.
pub(crate) const BASE_MANA_PER_SECOND: f64 = 50.0;

// Time conversion ----------------------------------------------------------
pub(crate) const CHRONOMANCY_DIVISOR: f64 = 60.0;
pub(crate) const CHRONOMANCY_EXPONENT: f64 = 0.25;

// Upkeep reserves ----------------------------------------------------------
/// Continuous mana cost per recruited team member, paid outside the
/// per-repetition delta measurement.
pub const TEAM_UPKEEP_PER_MEMBER: f64 = 200.0;

// Time-dilation bands ------------------------------------------------------
// Three non-overlapping town bands. Within a band, repetition time is
// divided by `1 + min(buff_level - floor, width) / divisor` once the buff
// level exceeds the band floor.
pub(crate) const DILATION_BAND_TOWNS: [(u8, u8); 3] = [(0, 2), (3, 5), (6, 8)];
pub(crate) const DILATION_BAND_FLOORS: [f64; 3] = [0.0, 20.0, 40.0];
pub(crate) const DILATION_BAND_WIDTH: f64 = 20.0;
pub(crate) const DILATION_BAND_DIVISORS: [f64; 3] = [100.0, 150.0, 200.0];
