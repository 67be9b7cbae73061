//! Year-end settlement.
//!
//! Every figure is computed from the pre-settlement world before anything is
//! written, so the order in which factions are processed cannot influence
//! the result.
use serde::{Deserialize, Serialize};

use crate::aggregate::compute_for_world;
use crate::config::MaintenanceRates;
use crate::ids::{FactionId, OperationId, SnapshotId, TerritoryId};
use crate::model::World;
use crate::numbers::{i64_to_f64, round_f64_to_i64};
use crate::products::ProductCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryGrowth {
    pub territory_id: TerritoryId,
    pub base_before: i64,
    pub base_after: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionSettlement {
    pub faction_id: FactionId,
    pub income: i64,
    pub maintenance: i64,
    pub treasury_before: i64,
    pub treasury_after: i64,
    pub growth_rate: f64,
    pub territories: Vec<TerritoryGrowth>,
    /// Samurai whose action was restored.
    pub samurai_reset: usize,
    pub expired_buffs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub operation_id: OperationId,
    pub snapshot_id: SnapshotId,
    pub settled_year: u32,
    pub new_year: u32,
    pub factions: Vec<FactionSettlement>,
    pub pruned_snapshots: Vec<SnapshotId>,
}

impl SettlementReport {
    #[must_use]
    pub fn faction(&self, id: &FactionId) -> Option<&FactionSettlement> {
        self.factions.iter().find(|entry| &entry.faction_id == id)
    }
}

/// `max(0, round(base * (1 + growth_rate)))`.
#[must_use]
pub fn grow_kokudaka(base: i64, growth_rate: f64) -> i64 {
    round_f64_to_i64(i64_to_f64(base) * (1.0 + growth_rate)).max(0)
}

/// Settle every faction. The returned world keeps the original year.
#[must_use]
pub fn settle(
    world: &World,
    catalog: &ProductCatalog,
    rates: &MaintenanceRates,
) -> (World, Vec<FactionSettlement>) {
    let figures: Vec<_> = world
        .factions
        .iter()
        .map(|faction| compute_for_world(world, faction, catalog, rates))
        .collect();

    let mut settled = world.clone();
    let mut entries = Vec::with_capacity(figures.len());

    for (index, data) in figures.iter().enumerate() {
        let pre = &world.factions[index];
        let income = round_f64_to_i64(data.income);
        let maintenance = round_f64_to_i64(data.maintenance_total);
        let treasury_after = data.projected_treasury(pre.treasury);

        let territories: Vec<TerritoryGrowth> = world
            .owned_territories(pre)
            .into_iter()
            .map(|territory| TerritoryGrowth {
                territory_id: territory.id.clone(),
                base_before: territory.base_kokudaka,
                base_after: grow_kokudaka(territory.base_kokudaka, data.growth_rate),
            })
            .collect();
        for growth in &territories {
            if let Some(territory) = settled
                .territories
                .iter_mut()
                .find(|territory| territory.id == growth.territory_id)
            {
                territory.base_kokudaka = growth.base_after;
            }
        }

        let mut samurai_reset = 0;
        for samurai in settled
            .samurai
            .iter_mut()
            .filter(|samurai| pre.samurai_ids.contains(&samurai.id))
        {
            if !samurai.action_available {
                samurai.action_available = true;
                samurai_reset += 1;
            }
        }

        let faction = &mut settled.factions[index];
        faction.treasury = treasury_after;
        let mut expired_buffs = Vec::new();
        faction.buffs.retain_mut(|buff| {
            buff.remaining_years = buff.remaining_years.saturating_sub(1);
            if buff.remaining_years == 0 {
                expired_buffs.push(buff.name.clone());
                false
            } else {
                true
            }
        });

        log::debug!(
            "settled {}: income {income}, maintenance {maintenance}, treasury {} -> {treasury_after}",
            pre.id,
            pre.treasury
        );
        entries.push(FactionSettlement {
            faction_id: pre.id.clone(),
            income,
            maintenance,
            treasury_before: pre.treasury,
            treasury_after,
            growth_rate: data.growth_rate,
            territories,
            samurai_reset,
            expired_buffs,
        });
    }

    (settled, entries)
}
