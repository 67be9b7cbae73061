//! Pure economy formulas: kokudaka, soldier capacity, bonus bands,
//! armament tiers and maintenance. No I/O and no randomness.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::config::MaintenanceRates;
use crate::constants::{
    ARMAMENT_TIERS, DEFAULT_LEVEL_INDEX, DEFAULT_TAX_MULTIPLIER, INCOME_FACTOR,
    INTEGRATION_TIERS, KOKUDAKA_PER_RECRUIT_UNIT, RATIO_BANDS, TAX_MULTIPLIERS,
};
use crate::model::{Equipment, Territory};
use crate::numbers::{clamp_unit, floor_f64_to_i64, i64_to_f64};
use crate::products::ProductCatalog;

/// One row of the soldier-ratio lookup table. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioBand {
    pub min: f64,
    pub max: f64,
    pub bonus_coefficient: f64,
    pub growth_rate: f64,
}

impl RatioBand {
    #[must_use]
    pub const fn new(min: f64, max: f64, bonus_coefficient: f64, growth_rate: f64) -> Self {
        Self {
            min,
            max,
            bonus_coefficient,
            growth_rate,
        }
    }

    #[must_use]
    pub fn contains(&self, ratio: f64) -> bool {
        self.min <= ratio && ratio <= self.max
    }
}

/// One armament level with its maintenance modifier. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArmamentTier {
    pub level: u8,
    pub min_points: i32,
    pub max_points: i32,
    pub maintenance_modifier: f64,
}

impl ArmamentTier {
    #[must_use]
    pub const fn new(level: u8, min_points: i32, max_points: i32, modifier: f64) -> Self {
        Self {
            level,
            min_points,
            max_points,
            maintenance_modifier: modifier,
        }
    }

    #[must_use]
    pub const fn contains(&self, points: i32) -> bool {
        self.min_points <= points && points <= self.max_points
    }
}

/// Sum of base kokudaka over the given territories.
pub fn territory_kokudaka<'a>(territories: impl IntoIterator<Item = &'a Territory>) -> i64 {
    territories.into_iter().map(|t| t.base_kokudaka).sum()
}

/// Kokudaka granted by special products across every slot.
pub fn special_product_kokudaka<'a>(
    territories: impl IntoIterator<Item = &'a Territory>,
    catalog: &ProductCatalog,
) -> i64 {
    territories
        .into_iter()
        .flat_map(|t| t.products.iter())
        .map(|name| catalog.kokudaka_bonus(name))
        .sum()
}

/// Recruitable-soldier bonus granted by special products across every slot.
pub fn special_product_soldier_bonus<'a>(
    territories: impl IntoIterator<Item = &'a Territory>,
    catalog: &ProductCatalog,
) -> i64 {
    territories
        .into_iter()
        .flat_map(|t| t.products.iter())
        .map(|name| catalog.soldier_bonus(name))
        .sum()
}

/// Bonus tier for a fully owned province of the given total kokudaka.
#[must_use]
pub fn integration_tier(province_kokudaka: i64) -> i64 {
    INTEGRATION_TIERS
        .iter()
        .find(|(threshold, _)| province_kokudaka >= *threshold)
        .map_or(0, |(_, bonus)| *bonus)
}

/// Full-province conquest bonus.
///
/// A province qualifies when every territory of that province in `all` is
/// present in `owned`, matched by province and district.
#[must_use]
pub fn integration_bonus(owned: &[&Territory], all: &[Territory]) -> i64 {
    let owned_keys: HashSet<(&str, &str)> = owned
        .iter()
        .map(|t| (t.province.as_str(), t.district.as_str()))
        .collect();
    let provinces: BTreeSet<&str> = owned.iter().map(|t| t.province.as_str()).collect();

    provinces
        .into_iter()
        .map(|province| {
            let members: Vec<&Territory> =
                all.iter().filter(|t| t.province == province).collect();
            let fully_owned = !members.is_empty()
                && members
                    .iter()
                    .all(|t| owned_keys.contains(&(t.province.as_str(), t.district.as_str())));
            if fully_owned {
                integration_tier(territory_kokudaka(members))
            } else {
                0
            }
        })
        .sum()
}

/// Share of soldier capacity in use.
#[must_use]
pub fn soldier_maintenance_ratio(total_soldiers: u64, max_recruitable: i64) -> f64 {
    if max_recruitable <= 0 {
        return if total_soldiers > 0 { 1.0 } else { 0.0 };
    }
    u64_to_f64(total_soldiers) / i64_to_f64(max_recruitable)
}

fn u64_to_f64(value: u64) -> f64 {
    i64_to_f64(i64::try_from(value).unwrap_or(i64::MAX))
}

/// Band matching the clamped ratio; first match wins.
#[must_use]
pub fn ratio_band(ratio: f64) -> &'static RatioBand {
    let clamped = clamp_unit(ratio);
    RATIO_BANDS
        .iter()
        .find(|band| band.contains(clamped))
        .unwrap_or(&RATIO_BANDS[0])
}

#[must_use]
pub fn bonus_coefficient(ratio: f64) -> f64 {
    ratio_band(ratio).bonus_coefficient
}

#[must_use]
pub fn growth_rate(ratio: f64) -> f64 {
    ratio_band(ratio).growth_rate
}

/// Recruitment multiplier for an exact tax rate; unlisted rates use 200.
#[must_use]
pub fn tax_multiplier(tax_rate: u8) -> f64 {
    TAX_MULTIPLIERS
        .iter()
        .find(|(rate, _)| *rate == tax_rate)
        .map_or(DEFAULT_TAX_MULTIPLIER, |(_, multiplier)| *multiplier)
}

#[must_use]
pub fn max_recruitable_soldiers(
    territory_kokudaka: i64,
    tax_rate: u8,
    product_soldier_bonus: i64,
) -> i64 {
    let base = i64_to_f64(territory_kokudaka) / KOKUDAKA_PER_RECRUIT_UNIT * tax_multiplier(tax_rate);
    floor_f64_to_i64(base) + product_soldier_bonus
}

/// Components that make up a faction's surface kokudaka.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KokudakaBreakdown {
    pub territory: i64,
    pub special_products: i64,
    pub integration: i64,
    pub industry: i64,
    pub bonus_coefficient: f64,
}

impl KokudakaBreakdown {
    /// `territory * (1 + coefficient) + products + integration + industry`.
    #[must_use]
    pub fn surface(&self) -> f64 {
        i64_to_f64(self.territory) * (1.0 + self.bonus_coefficient)
            + i64_to_f64(self.special_products)
            + i64_to_f64(self.integration)
            + i64_to_f64(self.industry)
    }
}

#[must_use]
pub fn surface_kokudaka(breakdown: &KokudakaBreakdown) -> f64 {
    breakdown.surface()
}

/// Yearly income from surface kokudaka at a tax rate given in percent.
#[must_use]
pub fn income(surface_kokudaka: f64, tax_rate: u8) -> f64 {
    surface_kokudaka * (f64::from(tax_rate) / 100.0) * INCOME_FACTOR
}

/// Armament tier for a point value; tier 1 when no range matches.
#[must_use]
pub fn armament_tier(points: i32) -> &'static ArmamentTier {
    ARMAMENT_TIERS
        .iter()
        .find(|tier| tier.contains(points))
        .unwrap_or(&ARMAMENT_TIERS[DEFAULT_LEVEL_INDEX])
}

/// Counts that drive upkeep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceInputs {
    pub total_soldiers: u64,
    pub legion_soldiers: u64,
    pub equipment: Equipment,
    pub samurai: u64,
}

/// Upkeep breakdown for one settlement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceCost {
    pub soldiers: i64,
    pub horses: i64,
    pub rifles: i64,
    pub cannons: i64,
    pub legion_surcharge: i64,
    pub military_subtotal: i64,
    pub armament_modifier: f64,
    pub scaled_military: f64,
    pub salaries: i64,
    pub total: f64,
}

/// Military upkeep scaled by the armament modifier, plus unscaled salaries.
#[must_use]
pub fn maintenance_cost(
    inputs: &MaintenanceInputs,
    rates: &MaintenanceRates,
    armament_modifier: f64,
) -> MaintenanceCost {
    let count = |value: u64| i64::try_from(value).unwrap_or(i64::MAX);
    let soldiers = rates.soldier.saturating_mul(count(inputs.total_soldiers));
    let horses = rates.horse.saturating_mul(i64::from(inputs.equipment.horses));
    let rifles = rates.rifle.saturating_mul(i64::from(inputs.equipment.rifles));
    let cannons = rates.cannon.saturating_mul(i64::from(inputs.equipment.cannons));
    let legion_surcharge = rates
        .legion_soldier_surcharge
        .saturating_mul(count(inputs.legion_soldiers));
    let military_subtotal = soldiers
        .saturating_add(horses)
        .saturating_add(rifles)
        .saturating_add(cannons)
        .saturating_add(legion_surcharge);
    let scaled_military = i64_to_f64(military_subtotal) * (1.0 + armament_modifier);
    let salaries = rates.samurai_salary.saturating_mul(count(inputs.samurai));

    MaintenanceCost {
        soldiers,
        horses,
        rifles,
        cannons,
        legion_surcharge,
        military_subtotal,
        armament_modifier,
        scaled_military,
        salaries,
        total: scaled_military + i64_to_f64(salaries),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TerritoryId;
    use crate::products::SpecialProduct;
    use smallvec::smallvec;

    fn territory(id: &str, province: &str, district: &str, kokudaka: i64) -> Territory {
        Territory {
            id: TerritoryId::new(id),
            name: id.to_string(),
            owner: None,
            province: province.to_string(),
            district: district.to_string(),
            base_kokudaka: kokudaka,
            products: smallvec![],
            garrison_legion_id: None,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn every_ratio_in_unit_interval_matches_one_contiguous_band() {
        for window in RATIO_BANDS.windows(2) {
            assert!(close(window[0].max, window[1].min), "gap between bands");
        }
        assert!(close(RATIO_BANDS[0].min, 0.0));
        for step in 0..=10_000 {
            let ratio = f64::from(step) / 10_000.0;
            let matches = RATIO_BANDS.iter().filter(|b| b.contains(ratio)).count();
            assert!(matches >= 1, "ratio {ratio} unmatched");
            let band = ratio_band(ratio);
            assert!(band.contains(ratio));
        }
    }

    #[test]
    fn boundary_ratio_selects_first_band() {
        assert!(close(bonus_coefficient(0.2), 0.20));
        assert!(close(growth_rate(0.2), 0.03));
        assert!(close(bonus_coefficient(0.21), 0.10));
    }

    #[test]
    fn ratio_is_clamped_before_lookup() {
        assert_eq!(ratio_band(4.0), ratio_band(1.0));
        assert_eq!(ratio_band(-1.0), ratio_band(0.0));
        assert_eq!(ratio_band(f64::NAN), ratio_band(0.0));
    }

    #[test]
    fn maintenance_ratio_edge_cases() {
        assert!(close(soldier_maintenance_ratio(0, 0), 0.0));
        assert!(close(soldier_maintenance_ratio(5, 0), 1.0));
        assert!(close(soldier_maintenance_ratio(5, -3), 1.0));
        assert!(close(soldier_maintenance_ratio(500, 2_000), 0.25));
    }

    #[test]
    fn tax_multiplier_uses_exact_rates() {
        assert!(close(tax_multiplier(40), 230.0));
        assert!(close(tax_multiplier(60), 200.0));
        assert!(close(tax_multiplier(80), 180.0));
        assert!(close(tax_multiplier(55), 200.0));
    }

    #[test]
    fn recruitable_soldiers_floor_then_add_bonus() {
        assert_eq!(max_recruitable_soldiers(100_000, 60, 0), 2_000);
        assert_eq!(max_recruitable_soldiers(105_555, 40, 50), 2_427 + 50);
    }

    #[test]
    fn recruitable_soldiers_non_decreasing_in_kokudaka() {
        for rate in [40, 60, 80, 70] {
            let mut previous = i64::MIN;
            for kokudaka in (0..500_000).step_by(777) {
                let cap = max_recruitable_soldiers(kokudaka, rate, 10);
                assert!(cap >= previous);
                previous = cap;
            }
        }
    }

    #[test]
    fn integration_bonus_tiers() {
        let big = [
            territory("a", "mino", "gifu", 200_000),
            territory("b", "mino", "ogaki", 100_000),
        ];
        let owned: Vec<&Territory> = big.iter().collect();
        assert_eq!(integration_bonus(&owned, &big), 20_000);

        let mid = [
            territory("a", "owari", "nagoya", 100_000),
            territory("b", "owari", "kiyosu", 50_000),
        ];
        let owned: Vec<&Territory> = mid.iter().collect();
        assert_eq!(integration_bonus(&owned, &mid), 10_000);

        let small = [
            territory("a", "owari", "nagoya", 100_000),
            territory("b", "owari", "kiyosu", 49_999),
        ];
        let owned: Vec<&Territory> = small.iter().collect();
        assert_eq!(integration_bonus(&owned, &small), 0);
    }

    #[test]
    fn integration_bonus_requires_every_district() {
        let all = [
            territory("a", "kai", "kofu", 300_000),
            territory("b", "kai", "gunnai", 200_000),
            territory("c", "kai", "minobu", 1),
        ];
        let owned: Vec<&Territory> = all.iter().take(2).collect();
        assert_eq!(integration_bonus(&owned, &all), 0);
    }

    #[test]
    fn integration_bonus_ignores_provinces_missing_from_world() {
        let orphan = territory("x", "ezo", "hakodate", 400_000);
        assert_eq!(integration_bonus(&[&orphan], &[]), 0);
    }

    #[test]
    fn special_products_sum_known_names_only() {
        let catalog = ProductCatalog::new([
            SpecialProduct {
                name: "silk".into(),
                kokudaka_bonus: 8_000,
                soldier_bonus: 0,
            },
            SpecialProduct {
                name: "iron".into(),
                kokudaka_bonus: 3_000,
                soldier_bonus: 150,
            },
        ]);
        let mut t1 = territory("a", "p", "d1", 10);
        t1.products = smallvec!["silk".to_string(), "iron".to_string(), "mystery".to_string()];
        let mut t2 = territory("b", "p", "d2", 10);
        t2.products = smallvec!["iron".to_string()];
        let owned = [t1, t2];
        assert_eq!(special_product_kokudaka(&owned, &catalog), 14_000);
        assert_eq!(special_product_soldier_bonus(&owned, &catalog), 300);
        assert_eq!(territory_kokudaka(&owned), 20);
    }

    #[test]
    fn surface_and_income_follow_formula() {
        let breakdown = KokudakaBreakdown {
            territory: 100_000,
            special_products: 5_000,
            integration: 10_000,
            industry: 2_000,
            bonus_coefficient: 0.10,
        };
        assert!(close(surface_kokudaka(&breakdown), 127_000.0));
        assert!(close(income(127_000.0, 60), 30_480.0));
    }

    #[test]
    fn armament_tiers_cover_point_range() {
        for points in 0..=100 {
            let matches = ARMAMENT_TIERS.iter().filter(|t| t.contains(points)).count();
            assert_eq!(matches, 1, "points {points}");
        }
        assert_eq!(armament_tier(0).level, 0);
        assert_eq!(armament_tier(39).level, 2);
        assert_eq!(armament_tier(100).level, 7);
        assert_eq!(armament_tier(-5).level, 1);
    }

    #[test]
    fn salaries_are_not_scaled_by_armament() {
        let rates = MaintenanceRates {
            soldier: 1,
            horse: 10,
            rifle: 5,
            cannon: 100,
            legion_soldier_surcharge: 2,
            samurai_salary: 1_000,
        };
        let inputs = MaintenanceInputs {
            total_soldiers: 100,
            legion_soldiers: 50,
            equipment: Equipment::new(10, 5, 1),
            samurai: 2,
        };
        let cost = maintenance_cost(&inputs, &rates, 0.5);
        assert_eq!(cost.military_subtotal, 100 + 50 + 50 + 100 + 100);
        assert!(close(cost.scaled_military, 600.0));
        assert_eq!(cost.salaries, 2_000);
        assert!(close(cost.total, 2_600.0));
    }
}
