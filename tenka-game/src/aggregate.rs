//! Faction aggregation: one consistent view of a faction's derived economy.
use serde::{Deserialize, Serialize};

use crate::config::MaintenanceRates;
use crate::formulas::{
    KokudakaBreakdown, MaintenanceCost, MaintenanceInputs, armament_tier, income,
    integration_bonus, maintenance_cost, max_recruitable_soldiers, ratio_band,
    soldier_maintenance_ratio, special_product_kokudaka, special_product_soldier_bonus,
    territory_kokudaka,
};
use crate::ids::{FactionId, LegionId, SamuraiId, TerritoryId};
use crate::investment::level_for;
use crate::model::{
    BuffKind, Equipment, Faction, InvestmentCategory, Legion, Samurai, Territory, World,
};
use crate::numbers::round_f64_to_i64;
use crate::products::ProductCatalog;

/// Borrowed inputs for one faction's aggregation.
#[derive(Debug, Clone, Copy)]
pub struct FactionView<'a> {
    pub faction: &'a Faction,
    pub owned_territories: &'a [&'a Territory],
    pub all_territories: &'a [Territory],
    pub legions: &'a [&'a Legion],
    pub samurai: &'a [&'a Samurai],
}

/// Level reached on one investment track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLevel {
    pub category: InvestmentCategory,
    pub points: i32,
    pub level: u8,
    pub name: String,
}

/// Derived economy for one faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionData {
    pub faction_id: FactionId,
    pub kokudaka: KokudakaBreakdown,
    pub special_product_soldier_bonus: i64,
    pub idle_soldiers: u64,
    pub legion_soldiers: u64,
    pub total_soldiers: u64,
    pub max_recruitable: i64,
    pub maintenance_ratio: f64,
    pub bonus_coefficient: f64,
    pub growth_rate: f64,
    pub surface_kokudaka: f64,
    /// Income before buffs.
    pub base_income: f64,
    pub income: f64,
    pub total_equipment: Equipment,
    pub armament_level: u8,
    pub maintenance: MaintenanceCost,
    /// Maintenance after buffs; the amount settlement deducts.
    pub maintenance_total: f64,
    pub levels: Vec<CategoryLevel>,
}

impl FactionData {
    /// Treasury the faction would hold after the next settlement.
    #[must_use]
    pub fn projected_treasury(&self, treasury: i64) -> i64 {
        treasury
            .saturating_add(round_f64_to_i64(self.income))
            .saturating_sub(round_f64_to_i64(self.maintenance_total))
            .max(0)
    }
}

fn buff_percent(faction: &Faction, pick: impl Fn(BuffKind) -> Option<i32>) -> f64 {
    let percent: i32 = faction
        .buffs
        .iter()
        .filter(|buff| buff.remaining_years > 0)
        .filter_map(|buff| pick(buff.kind))
        .sum();
    f64::from(percent) / 100.0
}

/// Compose the formula library into one derived snapshot.
///
/// Pure: identical inputs always produce identical output.
#[must_use]
pub fn compute_faction_data(
    view: &FactionView<'_>,
    catalog: &ProductCatalog,
    rates: &MaintenanceRates,
) -> FactionData {
    let faction = view.faction;
    let owned = view.owned_territories;

    let territory = territory_kokudaka(owned.iter().copied());
    let special_products = special_product_kokudaka(owned.iter().copied(), catalog);
    let soldier_bonus = special_product_soldier_bonus(owned.iter().copied(), catalog);
    let integration = integration_bonus(owned, view.all_territories);

    let idle_soldiers = u64::from(faction.idle_soldiers);
    let legion_soldiers: u64 = view.legions.iter().map(|l| u64::from(l.soldiers)).sum();
    let total_soldiers = idle_soldiers + legion_soldiers;
    let max_recruitable = max_recruitable_soldiers(territory, faction.tax_rate, soldier_bonus);

    let maintenance_ratio = soldier_maintenance_ratio(total_soldiers, max_recruitable);
    let band = ratio_band(maintenance_ratio);

    let kokudaka = KokudakaBreakdown {
        territory,
        special_products,
        integration,
        industry: faction.industry_kokudaka,
        bonus_coefficient: band.bonus_coefficient,
    };
    let surface_kokudaka = kokudaka.surface();
    let base_income = income(surface_kokudaka, faction.tax_rate);
    let income_bonus = buff_percent(faction, |kind| match kind {
        BuffKind::IncomeBonus { percent } => Some(percent),
        BuffKind::MaintenanceRelief { .. } => None,
    });

    let total_equipment = view
        .legions
        .iter()
        .fold(faction.equipment, |acc, legion| acc.saturating_add(legion.equipment));
    let tier = armament_tier(faction.points.armament);
    let inputs = MaintenanceInputs {
        total_soldiers,
        legion_soldiers,
        equipment: total_equipment,
        samurai: u64::try_from(view.samurai.len()).unwrap_or(u64::MAX),
    };
    let maintenance = maintenance_cost(&inputs, rates, tier.maintenance_modifier);
    let relief = buff_percent(faction, |kind| match kind {
        BuffKind::MaintenanceRelief { percent } => Some(percent),
        BuffKind::IncomeBonus { .. } => None,
    });

    let levels = InvestmentCategory::ALL
        .into_iter()
        .map(|category| {
            let points = faction.points.get(category);
            let (level, name) = level_for(category, points);
            CategoryLevel {
                category,
                points,
                level,
                name: name.to_string(),
            }
        })
        .collect();

    FactionData {
        faction_id: faction.id.clone(),
        kokudaka,
        special_product_soldier_bonus: soldier_bonus,
        idle_soldiers,
        legion_soldiers,
        total_soldiers,
        max_recruitable,
        maintenance_ratio,
        bonus_coefficient: band.bonus_coefficient,
        growth_rate: band.growth_rate,
        surface_kokudaka,
        base_income,
        income: (base_income * (1.0 + income_bonus)).max(0.0),
        total_equipment,
        armament_level: tier.level,
        maintenance,
        maintenance_total: (maintenance.total * (1.0 - relief)).max(0.0),
        levels,
    }
}

/// Aggregate a faction straight from a loaded world.
#[must_use]
pub fn compute_for_world(
    world: &World,
    faction: &Faction,
    catalog: &ProductCatalog,
    rates: &MaintenanceRates,
) -> FactionData {
    let owned = world.owned_territories(faction);
    let legions = world.faction_legions(faction);
    let samurai = world.faction_samurai(faction);
    let view = FactionView {
        faction,
        owned_territories: &owned,
        all_territories: &world.territories,
        legions: &legions,
        samurai: &samurai,
    };
    compute_faction_data(&view, catalog, rates)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegionSummary {
    pub id: LegionId,
    pub name: String,
    pub commander_id: Option<SamuraiId>,
    pub location: TerritoryId,
    pub soldiers: u32,
    pub equipment: Equipment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamuraiSummary {
    pub id: SamuraiId,
    pub name: String,
    pub civil: u32,
    pub martial: u32,
    pub is_idle: bool,
    pub action_available: bool,
}

/// Read model combining persisted and derived faction data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionDashboard {
    pub year: u32,
    pub locked: bool,
    pub faction_id: FactionId,
    pub name: String,
    pub tax_rate: u8,
    pub treasury: i64,
    pub projected_treasury: i64,
    pub data: FactionData,
    pub legions: Vec<LegionSummary>,
    pub samurai: Vec<SamuraiSummary>,
    pub territory_count: usize,
}

/// Dashboard for a faction, or `None` when the id is unknown.
#[must_use]
pub fn faction_dashboard(
    world: &World,
    faction_id: &FactionId,
    catalog: &ProductCatalog,
    rates: &MaintenanceRates,
) -> Option<FactionDashboard> {
    let faction = world.faction(faction_id).ok()?;
    let data = compute_for_world(world, faction, catalog, rates);
    let legions = world
        .faction_legions(faction)
        .into_iter()
        .map(|legion| LegionSummary {
            id: legion.id.clone(),
            name: legion.name.clone(),
            commander_id: legion.commander_id.clone(),
            location: legion.location.clone(),
            soldiers: legion.soldiers,
            equipment: legion.equipment,
        })
        .collect();
    let samurai = world
        .faction_samurai(faction)
        .into_iter()
        .map(|s| SamuraiSummary {
            id: s.id.clone(),
            name: s.name.clone(),
            civil: s.civil,
            martial: s.martial,
            is_idle: s.is_idle,
            action_available: s.action_available,
        })
        .collect();

    Some(FactionDashboard {
        year: world.game.year,
        locked: world.game.locked,
        faction_id: faction.id.clone(),
        name: faction.name.clone(),
        tax_rate: faction.tax_rate,
        treasury: faction.treasury,
        projected_treasury: data.projected_treasury(faction.treasury),
        territory_count: faction.territory_ids.len(),
        data,
        legions,
        samurai,
    })
}
