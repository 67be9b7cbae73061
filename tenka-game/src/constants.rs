//! Centralized balance tables and tuning constants for the Tenka economy.
//!
//! The year-end settlement must be reproducible from persisted data alone,
//! so every number that feeds a formula lives here or in `EngineConfig`.

use crate::formulas::{ArmamentTier, RatioBand};

// Kokudaka and income -------------------------------------------------------
pub(crate) const INCOME_FACTOR: f64 = 0.4;
pub(crate) const KOKUDAKA_PER_RECRUIT_UNIT: f64 = 10_000.0;
pub(crate) const DEFAULT_TAX_MULTIPLIER: f64 = 200.0;
pub(crate) const TAX_MULTIPLIERS: [(u8, f64); 3] = [(40, 230.0), (60, 200.0), (80, 180.0)];

/// Full-province conquest bonus tiers, highest threshold first.
pub(crate) const INTEGRATION_TIERS: [(i64, i64); 2] = [(300_000, 20_000), (150_000, 10_000)];

// Soldier ratio bands ------------------------------------------------------
/// Bands are contiguous over `[0, 1]`; the final band documents the
/// over-capacity range that clamped input never reaches.
pub(crate) const RATIO_BANDS: [RatioBand; 7] = [
    RatioBand::new(0.0, 0.2, 0.20, 0.03),
    RatioBand::new(0.2, 0.4, 0.10, 0.02),
    RatioBand::new(0.4, 0.6, 0.05, 0.01),
    RatioBand::new(0.6, 0.8, 0.0, 0.005),
    RatioBand::new(0.8, 0.9, -0.05, 0.0),
    RatioBand::new(0.9, 1.0, -0.10, -0.005),
    RatioBand::new(1.0, f64::INFINITY, -0.20, -0.01),
];

// Level tiers --------------------------------------------------------------
pub(crate) const DEFAULT_LEVEL_INDEX: usize = 1;
pub(crate) const ARMAMENT_TIERS: [ArmamentTier; 8] = [
    ArmamentTier::new(0, 0, 9, 0.20),
    ArmamentTier::new(1, 10, 24, 0.10),
    ArmamentTier::new(2, 25, 39, 0.0),
    ArmamentTier::new(3, 40, 54, -0.05),
    ArmamentTier::new(4, 55, 69, -0.10),
    ArmamentTier::new(5, 70, 84, -0.15),
    ArmamentTier::new(6, 85, 99, -0.20),
    ArmamentTier::new(7, 100, 100, -0.25),
];

// Investment ---------------------------------------------------------------
pub(crate) const POINTS_MIN: i32 = 0;
pub(crate) const POINTS_MAX: i32 = 100;
pub(crate) const ATTRIBUTE_PIVOT: f64 = 70.0;
pub(crate) const SUCCESS_RATE_BASE: f64 = 0.5;
pub(crate) const SUCCESS_RATE_MIN: f64 = 0.05;
pub(crate) const SUCCESS_RATE_MAX: f64 = 0.95;
pub(crate) const MODIFIER_STEP: f64 = 0.01;
/// Rolls strictly below this value are critical successes.
pub(crate) const CRITICAL_ROLL_BELOW: u8 = 5;
pub(crate) const ROLL_MIN: u8 = 1;
pub(crate) const ROLL_MAX: u8 = 100;

// Legions ------------------------------------------------------------------
pub(crate) const LEGION_NAME_MAX_CHARS: usize = 8;
pub(crate) const MAX_PRODUCT_SLOTS: usize = 3;

// Persistence --------------------------------------------------------------
pub(crate) const OPERATION_LOG_CAP: usize = 100;
pub(crate) const DEFAULT_ROLLBACK_HORIZON: usize = 10;
pub(crate) const DEFAULT_BATCH_WRITE_ATTEMPTS: u32 = 2;
pub(crate) const DEFAULT_SESSION_TTL_SECS: i64 = 3_600;
pub(crate) const DEFAULT_INVESTMENT_SEED: u64 = 0x1560_0519;
