//! Investment subsystem: a samurai spends treasury to raise one of the
//! faction's long-term development tracks, with a d100 roll deciding how well
//! it goes.
use hmac::{Hmac, Mac};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::VecDeque;

use crate::config::InvestmentTables;
use crate::constants::{
    ATTRIBUTE_PIVOT, CRITICAL_ROLL_BELOW, MODIFIER_STEP, ROLL_MAX, ROLL_MIN, SUCCESS_RATE_BASE,
    SUCCESS_RATE_MAX, SUCCESS_RATE_MIN,
};
use crate::error::{ConflictError, EntityKind, GameError, ValidationError};
use crate::formulas::armament_tier;
use crate::ids::{FactionId, SamuraiId};
use crate::model::{Faction, InvestmentCategory, Samurai, World};
use crate::numbers::{floor_f64_to_i64, i64_to_f64, round_f64_to_i32};

const AGRICULTURE_LEVELS: [&str; 8] = [
    "Fallow",
    "Tilled",
    "Irrigated",
    "Terraced",
    "Fertile",
    "Abundant",
    "Bountiful",
    "Granary of the Realm",
];
const COMMERCE_LEVELS: [&str; 8] = [
    "Barter",
    "Village Market",
    "Market Town",
    "Free Market",
    "Merchant Guilds",
    "Trade Hub",
    "Great Emporium",
    "Golden Capital",
];
const NAVY_LEVELS: [&str; 8] = [
    "Fishing Boats",
    "Coastal Skiffs",
    "Patrol Boats",
    "Sekibune Squadron",
    "Atakebune Flotilla",
    "Regional Fleet",
    "Great Fleet",
    "Sea Sovereign",
];
const ARMAMENT_LEVELS: [&str; 8] = [
    "Peasant Levy",
    "Spear Ashigaru",
    "Drilled Ashigaru",
    "Arquebus Corps",
    "Volley Fire",
    "Cavalry Shock",
    "Combined Arms",
    "Invincible Host",
];

/// Level index and display name for a track value.
#[must_use]
pub fn level_for(category: InvestmentCategory, points: i32) -> (u8, &'static str) {
    let level = armament_tier(points).level;
    let names = match category {
        InvestmentCategory::Agriculture => &AGRICULTURE_LEVELS,
        InvestmentCategory::Commerce => &COMMERCE_LEVELS,
        InvestmentCategory::Navy => &NAVY_LEVELS,
        InvestmentCategory::Armament => &ARMAMENT_LEVELS,
    };
    (level, names[usize::from(level).min(names.len() - 1)])
}

/// `clamp(0.5 + (attribute - 70) / 100, 0.05, 0.95)`.
#[must_use]
pub fn success_rate(attribute: u32) -> f64 {
    (SUCCESS_RATE_BASE + (f64::from(attribute) - ATTRIBUTE_PIVOT) / 100.0)
        .clamp(SUCCESS_RATE_MIN, SUCCESS_RATE_MAX)
}

/// `1 + (attribute - 70) * 0.01`.
#[must_use]
pub fn modifier_coefficient(attribute: u32) -> f64 {
    1.0 + (f64::from(attribute) - ATTRIBUTE_PIVOT) * MODIFIER_STEP
}

/// Highest roll that still succeeds: `floor(success_rate * 100)`.
#[must_use]
pub fn success_threshold(success_rate: f64) -> u8 {
    // Rates are whole percentages; the nudge absorbs binary representation error.
    let threshold = floor_f64_to_i64(success_rate * 100.0 + 1e-9);
    u8::try_from(threshold.clamp(0, i64::from(ROLL_MAX))).unwrap_or(ROLL_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentOutcome {
    CriticalSuccess,
    Success,
    Failure,
}

impl InvestmentOutcome {
    pub const ALL: [Self; 3] = [Self::CriticalSuccess, Self::Success, Self::Failure];
}

/// Map a d100 roll onto an outcome. Criticals ignore the success rate.
#[must_use]
pub fn resolve_roll(roll: u8, success_rate: f64) -> InvestmentOutcome {
    if roll < CRITICAL_ROLL_BELOW {
        InvestmentOutcome::CriticalSuccess
    } else if roll <= success_threshold(success_rate) {
        InvestmentOutcome::Success
    } else {
        InvestmentOutcome::Failure
    }
}

/// Source of d100 rolls; swapped out in tests for scripted outcomes.
pub trait RollSource {
    /// A uniformly distributed integer in `[1, 100]`.
    fn roll_d100(&mut self) -> u8;
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).map_or(user_seed, |mut mac| {
        mac.update(domain_tag);
        let digest = mac.finalize().into_bytes();
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(seed_bytes)
    })
}

/// Seeded ChaCha stream dedicated to investment rolls.
#[derive(Debug, Clone)]
pub struct InvestmentDice {
    rng: ChaCha20Rng,
    draws: u64,
}

impl InvestmentDice {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, b"investment")),
            draws: 0,
        }
    }

    /// Number of rolls drawn so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl RollSource for InvestmentDice {
    fn roll_d100(&mut self) -> u8 {
        self.draws = self.draws.saturating_add(1);
        self.rng.gen_range(ROLL_MIN..=ROLL_MAX)
    }
}

/// Replays a fixed list of rolls, then repeats the fallback.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRolls {
    rolls: VecDeque<u8>,
    fallback: u8,
}

impl ScriptedRolls {
    #[must_use]
    pub fn new(rolls: impl IntoIterator<Item = u8>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            fallback: ROLL_MAX,
        }
    }

    #[must_use]
    pub const fn with_fallback(mut self, roll: u8) -> Self {
        self.fallback = roll;
        self
    }
}

impl RollSource for ScriptedRolls {
    fn roll_d100(&mut self) -> u8 {
        self.rolls
            .pop_front()
            .unwrap_or(self.fallback)
            .clamp(ROLL_MIN, ROLL_MAX)
    }
}

/// Validated investment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentRequest {
    faction_id: FactionId,
    samurai_id: SamuraiId,
    category: InvestmentCategory,
    commerce_amount: Option<i64>,
}

impl InvestmentRequest {
    /// Parse the category and check the optional commerce amount.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown category, a non-positive
    /// amount, or an amount on a non-commerce category.
    pub fn new(
        faction_id: FactionId,
        samurai_id: SamuraiId,
        category: &str,
        commerce_amount: Option<i64>,
    ) -> Result<Self, ValidationError> {
        let category: InvestmentCategory = category.parse()?;
        Self::for_category(faction_id, samurai_id, category, commerce_amount)
    }

    /// # Errors
    ///
    /// Same amount rules as [`InvestmentRequest::new`].
    pub fn for_category(
        faction_id: FactionId,
        samurai_id: SamuraiId,
        category: InvestmentCategory,
        commerce_amount: Option<i64>,
    ) -> Result<Self, ValidationError> {
        match (category, commerce_amount) {
            (InvestmentCategory::Commerce, Some(amount)) if amount <= 0 => {
                return Err(ValidationError::InvalidCommerceAmount(amount));
            }
            (InvestmentCategory::Commerce, _) | (_, None) => {}
            (_, Some(_)) => return Err(ValidationError::AmountNotAllowed),
        }
        Ok(Self {
            faction_id,
            samurai_id,
            category,
            commerce_amount,
        })
    }

    #[must_use]
    pub const fn faction_id(&self) -> &FactionId {
        &self.faction_id
    }

    #[must_use]
    pub const fn samurai_id(&self) -> &SamuraiId {
        &self.samurai_id
    }

    #[must_use]
    pub const fn category(&self) -> InvestmentCategory {
        self.category
    }

    #[must_use]
    pub const fn commerce_amount(&self) -> Option<i64> {
        self.commerce_amount
    }
}

/// Projected effect of one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedGain {
    pub outcome: InvestmentOutcome,
    pub points_gained: i32,
    pub resulting_points: i32,
    pub resulting_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentPreview {
    pub category: InvestmentCategory,
    pub samurai_id: SamuraiId,
    pub attribute: u32,
    pub success_rate: f64,
    pub modifier_coefficient: f64,
    pub success_threshold: u8,
    pub cost: i64,
    pub current_points: i32,
    pub current_level: String,
    pub projections: Vec<ProjectedGain>,
}

impl InvestmentPreview {
    fn projection(&self, outcome: InvestmentOutcome) -> Option<&ProjectedGain> {
        self.projections.iter().find(|p| p.outcome == outcome)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentResult {
    pub faction_id: FactionId,
    pub samurai_id: SamuraiId,
    pub category: InvestmentCategory,
    pub roll: u8,
    pub outcome: InvestmentOutcome,
    pub success_rate: f64,
    pub modifier_coefficient: f64,
    pub cost_paid: i64,
    pub points_before: i32,
    pub points_gained: i32,
    pub points_after: i32,
    pub level: String,
    pub treasury_after: i64,
}

fn check_actor(faction: &Faction, samurai: &Samurai) -> Result<(), GameError> {
    if samurai.faction_id != faction.id || !faction.samurai_ids.contains(&samurai.id) {
        return Err(ConflictError::WrongFaction {
            entity: EntityKind::Samurai,
            id: samurai.id.to_string(),
            faction: faction.id.to_string(),
        }
        .into());
    }
    if !samurai.is_idle || samurai.current_legion_id.is_some() {
        return Err(ConflictError::SamuraiAssigned {
            samurai: samurai.id.to_string(),
        }
        .into());
    }
    if !samurai.action_available {
        return Err(ConflictError::SamuraiExhausted {
            samurai: samurai.id.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Rates, cost and projected gains without drawing a roll or mutating state.
///
/// # Errors
///
/// Returns a conflict error when the samurai may not act for the faction.
pub fn preview_investment(
    faction: &Faction,
    samurai: &Samurai,
    request: &InvestmentRequest,
    tables: &InvestmentTables,
) -> Result<InvestmentPreview, GameError> {
    check_actor(faction, samurai)?;

    let category = request.category;
    let table = tables.get(category);
    let attribute = samurai.attribute_for(category);
    let rate = success_rate(attribute);
    let coefficient = modifier_coefficient(attribute);
    let (cost, scale) = match request.commerce_amount {
        Some(amount) if table.cost > 0 => (amount, i64_to_f64(amount) / i64_to_f64(table.cost)),
        Some(amount) => (amount, 1.0),
        None => (table.cost, 1.0),
    };
    let current_points = faction.points.get(category);

    let projections = InvestmentOutcome::ALL
        .into_iter()
        .map(|outcome| {
            let base = match outcome {
                InvestmentOutcome::CriticalSuccess => table.critical_points,
                InvestmentOutcome::Success => table.success_points,
                InvestmentOutcome::Failure => table.failure_points,
            };
            let raw = round_f64_to_i32(f64::from(base) * coefficient * scale);
            let mut track = faction.points;
            track.set(category, current_points.saturating_add(raw));
            let resulting_points = track.get(category);
            ProjectedGain {
                outcome,
                points_gained: resulting_points - current_points,
                resulting_points,
                resulting_level: level_for(category, resulting_points).1.to_string(),
            }
        })
        .collect();

    Ok(InvestmentPreview {
        category,
        samurai_id: samurai.id.clone(),
        attribute,
        success_rate: rate,
        modifier_coefficient: coefficient,
        success_threshold: success_threshold(rate),
        cost,
        current_points,
        current_level: level_for(category, current_points).1.to_string(),
        projections,
    })
}

/// Charge the cost, roll, and apply the gained points.
///
/// Nothing is mutated when an error is returned.
///
/// # Errors
///
/// Returns a conflict error when the actor is ineligible or the treasury
/// cannot cover the cost.
pub fn execute_investment(
    faction: &mut Faction,
    samurai: &mut Samurai,
    request: &InvestmentRequest,
    tables: &InvestmentTables,
    dice: &mut dyn RollSource,
) -> Result<InvestmentResult, GameError> {
    let preview = preview_investment(faction, samurai, request, tables)?;
    if faction.treasury < preview.cost {
        return Err(ConflictError::InsufficientTreasury {
            needed: preview.cost,
            available: faction.treasury,
        }
        .into());
    }

    let roll = dice.roll_d100();
    let outcome = resolve_roll(roll, preview.success_rate);
    let projection = preview.projection(outcome).cloned().ok_or_else(|| {
        GameError::Consistency(format!("no projection for outcome {outcome:?}"))
    })?;

    faction.treasury -= preview.cost;
    faction
        .points
        .set(preview.category, projection.resulting_points);
    samurai.action_available = false;

    Ok(InvestmentResult {
        faction_id: faction.id.clone(),
        samurai_id: samurai.id.clone(),
        category: preview.category,
        roll,
        outcome,
        success_rate: preview.success_rate,
        modifier_coefficient: preview.modifier_coefficient,
        cost_paid: preview.cost,
        points_before: preview.current_points,
        points_gained: projection.points_gained,
        points_after: projection.resulting_points,
        level: projection.resulting_level,
        treasury_after: faction.treasury,
    })
}

/// Preview against a loaded world.
///
/// # Errors
///
/// Returns `NotFound` for unknown ids, otherwise as [`preview_investment`].
pub fn preview_in_world(
    world: &World,
    request: &InvestmentRequest,
    tables: &InvestmentTables,
) -> Result<InvestmentPreview, GameError> {
    let faction = world.faction(&request.faction_id)?;
    let samurai = world.samurai_by_id(&request.samurai_id)?;
    preview_investment(faction, samurai, request, tables)
}

/// Execute against a loaded world.
///
/// # Errors
///
/// Returns `NotFound` for unknown ids, otherwise as [`execute_investment`].
pub fn execute_in_world(
    world: &mut World,
    request: &InvestmentRequest,
    tables: &InvestmentTables,
    dice: &mut dyn RollSource,
) -> Result<InvestmentResult, GameError> {
    let faction_index = world.faction_index(&request.faction_id)?;
    let samurai_index = world.samurai_index(&request.samurai_id)?;
    execute_investment(
        &mut world.factions[faction_index],
        &mut world.samurai[samurai_index],
        request,
        tables,
        dice,
    )
}
