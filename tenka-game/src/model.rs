//! Persisted documents: factions, territories, legions, samurai and the
//! global game state, plus the in-memory `World` that bundles them.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::{POINTS_MAX, POINTS_MIN};
use crate::error::{EntityKind, GameError, ValidationError, count_from_i64};
use crate::ids::{FactionId, LegionId, SamuraiId, TerritoryId};

/// Rifles, horses and cannons held by a faction or a legion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub rifles: u32,
    #[serde(default)]
    pub horses: u32,
    #[serde(default)]
    pub cannons: u32,
}

impl Equipment {
    #[must_use]
    pub const fn new(rifles: u32, horses: u32, cannons: u32) -> Self {
        Self {
            rifles,
            horses,
            cannons,
        }
    }

    /// Build from wire-level counts.
    ///
    /// # Errors
    ///
    /// Returns a validation error when any count is negative or too large.
    pub fn from_counts(rifles: i64, horses: i64, cannons: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            rifles: count_from_i64("rifles", rifles)?,
            horses: count_from_i64("horses", horses)?,
            cannons: count_from_i64("cannons", cannons)?,
        })
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rifles == 0 && self.horses == 0 && self.cannons == 0
    }

    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self {
            rifles: self.rifles.saturating_add(other.rifles),
            horses: self.horses.saturating_add(other.horses),
            cannons: self.cannons.saturating_add(other.cannons),
        }
    }

    /// Subtract `other`, returning `None` when any line would go negative.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        Some(Self {
            rifles: self.rifles.checked_sub(other.rifles)?,
            horses: self.horses.checked_sub(other.horses)?,
            cannons: self.cannons.checked_sub(other.cannons)?,
        })
    }

    /// Per-line pairs used for availability messages.
    #[must_use]
    pub const fn lines(&self) -> [(&'static str, u32); 3] {
        [
            ("rifles", self.rifles),
            ("horses", self.horses),
            ("cannons", self.cannons),
        ]
    }
}

/// Long-term development tracks a faction invests into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentCategory {
    Agriculture,
    Commerce,
    Navy,
    Armament,
}

impl InvestmentCategory {
    pub const ALL: [Self; 4] = [
        Self::Agriculture,
        Self::Commerce,
        Self::Navy,
        Self::Armament,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Agriculture => "agriculture",
            Self::Commerce => "commerce",
            Self::Navy => "navy",
            Self::Armament => "armament",
        }
    }

    /// Civil categories draw on the samurai's civil value, the rest on martial.
    #[must_use]
    pub const fn is_civil(self) -> bool {
        matches!(self, Self::Agriculture | Self::Commerce)
    }
}

impl fmt::Display for InvestmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for InvestmentCategory {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.key() == normalized)
            .ok_or_else(|| ValidationError::UnknownCategory(value.to_string()))
    }
}

/// Investment point tracks, each kept within `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvestmentPoints {
    #[serde(default)]
    pub agriculture: i32,
    #[serde(default)]
    pub commerce: i32,
    #[serde(default)]
    pub navy: i32,
    #[serde(default)]
    pub armament: i32,
}

impl InvestmentPoints {
    #[must_use]
    pub const fn get(&self, category: InvestmentCategory) -> i32 {
        match category {
            InvestmentCategory::Agriculture => self.agriculture,
            InvestmentCategory::Commerce => self.commerce,
            InvestmentCategory::Navy => self.navy,
            InvestmentCategory::Armament => self.armament,
        }
    }

    /// Store a value, clamping it into the legal track range.
    pub fn set(&mut self, category: InvestmentCategory, value: i32) {
        let clamped = value.clamp(POINTS_MIN, POINTS_MAX);
        match category {
            InvestmentCategory::Agriculture => self.agriculture = clamped,
            InvestmentCategory::Commerce => self.commerce = clamped,
            InvestmentCategory::Navy => self.navy = clamped,
            InvestmentCategory::Armament => self.armament = clamped,
        }
    }
}

/// Effect carried by a time-limited buff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuffKind {
    /// Raises settlement income by a percentage.
    IncomeBonus { percent: i32 },
    /// Lowers settlement maintenance by a percentage.
    MaintenanceRelief { percent: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Buff {
    pub name: String,
    #[serde(flatten)]
    pub kind: BuffKind,
    /// Settlements remaining before the buff expires.
    pub remaining_years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Alliance,
    #[default]
    Neutral,
    Truce,
    Hostile,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub faction_id: FactionId,
    #[serde(default)]
    pub stance: Stance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    /// Tax rate in percent; one of 40, 60 or 80.
    pub tax_rate: u8,
    pub treasury: i64,
    #[serde(default)]
    pub idle_soldiers: u32,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub points: InvestmentPoints,
    /// Flat kokudaka from non-territory sources.
    #[serde(default)]
    pub industry_kokudaka: i64,
    #[serde(default)]
    pub territory_ids: Vec<TerritoryId>,
    #[serde(default)]
    pub legion_ids: Vec<LegionId>,
    #[serde(default)]
    pub samurai_ids: Vec<SamuraiId>,
    #[serde(default)]
    pub buffs: Vec<Buff>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    #[serde(default)]
    pub owner: Option<FactionId>,
    pub province: String,
    pub district: String,
    pub base_kokudaka: i64,
    #[serde(default)]
    pub products: SmallVec<[String; 3]>,
    #[serde(default)]
    pub garrison_legion_id: Option<LegionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legion {
    pub id: LegionId,
    pub name: String,
    pub faction_id: FactionId,
    /// Unset only after the commander was reassigned elsewhere.
    #[serde(default)]
    pub commander_id: Option<SamuraiId>,
    pub soldiers: u32,
    #[serde(default)]
    pub equipment: Equipment,
    pub location: TerritoryId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Samurai {
    pub id: SamuraiId,
    pub name: String,
    pub faction_id: FactionId,
    pub civil: u32,
    pub martial: u32,
    #[serde(default = "default_true")]
    pub is_idle: bool,
    #[serde(default)]
    pub current_legion_id: Option<LegionId>,
    /// Cleared when the samurai acts; restored by the year-end settlement.
    #[serde(default = "default_true")]
    pub action_available: bool,
}

const fn default_true() -> bool {
    true
}

impl Samurai {
    pub fn assign(&mut self, legion: LegionId) {
        self.current_legion_id = Some(legion);
        self.is_idle = false;
    }

    pub fn release(&mut self) {
        self.current_legion_id = None;
        self.is_idle = true;
    }

    #[must_use]
    pub const fn attribute_for(&self, category: InvestmentCategory) -> u32 {
        if category.is_civil() {
            self.civil
        } else {
            self.martial
        }
    }
}

/// Process-wide singleton document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub year: u32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub login_codes: BTreeMap<FactionId, String>,
    /// Serial used to mint legion identifiers.
    #[serde(default = "default_serial")]
    pub next_legion_serial: u64,
}

const fn default_serial() -> u64 {
    1
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            year: 1,
            locked: false,
            login_codes: BTreeMap::new(),
            next_legion_serial: default_serial(),
        }
    }
}

impl GameState {
    pub fn mint_legion_id(&mut self) -> LegionId {
        let id = LegionId(format!("legion-{}", self.next_legion_serial));
        self.next_legion_serial += 1;
        id
    }
}

/// Every mutable collection, loaded together and written back together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub game: GameState,
    pub factions: Vec<Faction>,
    pub territories: Vec<Territory>,
    pub samurai: Vec<Samurai>,
    pub legions: Vec<Legion>,
}

macro_rules! lookup {
    ($find:ident, $find_mut:ident, $index:ident, $field:ident, $ty:ty, $id:ty, $kind:expr) => {
        /// Resolve a document by id.
        ///
        /// # Errors
        ///
        /// Returns `GameError::NotFound` when the id is unknown.
        pub fn $find(&self, id: &$id) -> Result<&$ty, GameError> {
            self.$field
                .iter()
                .find(|item| &item.id == id)
                .ok_or_else(|| GameError::not_found($kind, id))
        }

        /// Resolve a document by id for mutation.
        ///
        /// # Errors
        ///
        /// Returns `GameError::NotFound` when the id is unknown.
        pub fn $find_mut(&mut self, id: &$id) -> Result<&mut $ty, GameError> {
            self.$field
                .iter_mut()
                .find(|item| &item.id == id)
                .ok_or_else(|| GameError::not_found($kind, id))
        }

        /// Position of a document in its collection.
        ///
        /// # Errors
        ///
        /// Returns `GameError::NotFound` when the id is unknown.
        pub fn $index(&self, id: &$id) -> Result<usize, GameError> {
            self.$field
                .iter()
                .position(|item| &item.id == id)
                .ok_or_else(|| GameError::not_found($kind, id))
        }
    };
}

impl World {
    lookup!(
        faction,
        faction_mut,
        faction_index,
        factions,
        Faction,
        FactionId,
        EntityKind::Faction
    );
    lookup!(
        territory,
        territory_mut,
        territory_index,
        territories,
        Territory,
        TerritoryId,
        EntityKind::Territory
    );
    lookup!(
        legion,
        legion_mut,
        legion_index,
        legions,
        Legion,
        LegionId,
        EntityKind::Legion
    );
    lookup!(
        samurai_by_id,
        samurai_mut,
        samurai_index,
        samurai,
        Samurai,
        SamuraiId,
        EntityKind::Samurai
    );

    /// Territories referenced by the faction, in roster order.
    #[must_use]
    pub fn owned_territories(&self, faction: &Faction) -> Vec<&Territory> {
        faction
            .territory_ids
            .iter()
            .filter_map(|id| self.territories.iter().find(|t| &t.id == id))
            .collect()
    }

    #[must_use]
    pub fn faction_legions(&self, faction: &Faction) -> Vec<&Legion> {
        faction
            .legion_ids
            .iter()
            .filter_map(|id| self.legions.iter().find(|l| &l.id == id))
            .collect()
    }

    #[must_use]
    pub fn faction_samurai(&self, faction: &Faction) -> Vec<&Samurai> {
        faction
            .samurai_ids
            .iter()
            .filter_map(|id| self.samurai.iter().find(|s| &s.id == id))
            .collect()
    }

    /// Legion currently commanded by the samurai, if any.
    #[must_use]
    pub fn legion_commanded_by(&self, samurai: &SamuraiId) -> Option<&Legion> {
        self.legions
            .iter()
            .find(|legion| legion.commander_id.as_ref() == Some(samurai))
    }
}
