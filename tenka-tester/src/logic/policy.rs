use std::fmt;

use clap::ValueEnum;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tenka_game::{
    Equipment, Faction, FactionData, InvestmentCategory, LegionId, SamuraiId, TerritoryId, World,
};

const LEGION_NAMES: [&str; 8] = [
    "先鋒隊", "本隊", "遊撃隊", "後詰", "鉄砲隊", "騎馬隊", "旗本隊", "殿軍",
];

/// One player command issued on behalf of a faction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAction {
    Invest {
        samurai: SamuraiId,
        category: InvestmentCategory,
    },
    Purchase(Equipment),
    RaiseLegion {
        commander: SamuraiId,
        name: String,
        location: TerritoryId,
        soldiers: i64,
        equipment: Equipment,
    },
    Reinforce {
        legion: LegionId,
        soldiers: i64,
    },
    Disband(LegionId),
    ChangeTax(i64),
}

impl TurnAction {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Invest { .. } => "invest",
            Self::Purchase(_) => "purchase",
            Self::RaiseLegion { .. } => "raise-legion",
            Self::Reinforce { .. } => "reinforce",
            Self::Disband(_) => "disband",
            Self::ChangeTax(_) => "change-tax",
        }
    }
}

/// Policy interface for automated factions.
pub trait FactionPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Commands for one faction this year, applied in order.
    fn plan_turn(&mut self, world: &World, faction: &Faction, data: &FactionData)
    -> Vec<TurnAction>;
}

/// Built-in strategies for automated campaigns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum CampaignStrategy {
    /// Develops land and trade; keeps a small army.
    Steward,
    /// Buys arms and raises legions up to the soldier cap.
    Warlord,
    Balanced,
    /// Seeded random choices, including ones the engine must refuse.
    Random,
}

impl CampaignStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Steward => "Steward",
            Self::Warlord => "Warlord",
            Self::Balanced => "Balanced",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn FactionPolicy + Send> {
        match self {
            Self::Steward => Box::new(StewardPolicy),
            Self::Warlord => Box::new(WarlordPolicy),
            Self::Balanced => Box::new(BalancedPolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for CampaignStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct StewardPolicy;
struct WarlordPolicy;
struct BalancedPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

fn ready_samurai<'w>(world: &'w World, faction: &Faction) -> Vec<&'w tenka_game::Samurai> {
    world
        .faction_samurai(faction)
        .into_iter()
        .filter(|samurai| samurai.is_idle && samurai.action_available)
        .collect()
}

fn open_territories<'w>(world: &'w World, faction: &Faction) -> Vec<&'w tenka_game::Territory> {
    world
        .owned_territories(faction)
        .into_iter()
        .filter(|territory| territory.garrison_legion_id.is_none())
        .collect()
}

fn legion_name(world: &World) -> String {
    let serial = usize::try_from(world.game.next_legion_serial).unwrap_or(0);
    LEGION_NAMES[serial % LEGION_NAMES.len()].to_string()
}

/// Soldiers that can still be raised without leaving the ratio's lower bands.
fn headroom(data: &FactionData, target_ratio: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let target = (data.max_recruitable as f64 * target_ratio) as i64;
    target - i64::try_from(data.total_soldiers).unwrap_or(i64::MAX)
}

fn weakest_category(faction: &Faction, categories: &[InvestmentCategory]) -> InvestmentCategory {
    categories
        .iter()
        .copied()
        .min_by_key(|category| faction.points.get(*category))
        .unwrap_or(InvestmentCategory::Agriculture)
}

impl FactionPolicy for StewardPolicy {
    fn name(&self) -> &'static str {
        "Steward"
    }

    fn plan_turn(
        &mut self,
        world: &World,
        faction: &Faction,
        _data: &FactionData,
    ) -> Vec<TurnAction> {
        let mut actions = Vec::new();
        if faction.tax_rate != 60 {
            actions.push(TurnAction::ChangeTax(60));
        }
        let civil = [InvestmentCategory::Agriculture, InvestmentCategory::Commerce];
        for samurai in ready_samurai(world, faction) {
            actions.push(TurnAction::Invest {
                samurai: samurai.id.clone(),
                category: weakest_category(faction, &civil),
            });
        }
        actions
    }
}

impl FactionPolicy for WarlordPolicy {
    fn name(&self) -> &'static str {
        "Warlord"
    }

    fn plan_turn(&mut self, world: &World, faction: &Faction, data: &FactionData) -> Vec<TurnAction> {
        let mut actions = Vec::new();
        if faction.tax_rate != 80 {
            actions.push(TurnAction::ChangeTax(80));
        }
        if faction.treasury > 30_000 {
            actions.push(TurnAction::Purchase(Equipment::new(20, 10, 0)));
        }

        let mut ready = ready_samurai(world, faction).into_iter();
        let room = headroom(data, 0.8);
        if let (Some(commander), Some(location)) =
            (ready.next(), open_territories(world, faction).first())
            && faction.idle_soldiers >= 600
        {
            actions.push(TurnAction::RaiseLegion {
                commander: commander.id.clone(),
                name: legion_name(world),
                location: location.id.clone(),
                soldiers: 500,
                equipment: Equipment::new(
                    faction.equipment.rifles.min(30),
                    faction.equipment.horses.min(20),
                    0,
                ),
            });
        } else if room > 0 {
            for legion in world.faction_legions(faction) {
                actions.push(TurnAction::Reinforce {
                    legion: legion.id.clone(),
                    soldiers: i64::from(legion.soldiers) + room.min(300),
                });
            }
        }

        for samurai in ready {
            actions.push(TurnAction::Invest {
                samurai: samurai.id.clone(),
                category: InvestmentCategory::Armament,
            });
        }
        actions
    }
}

impl FactionPolicy for BalancedPolicy {
    fn name(&self) -> &'static str {
        "Balanced"
    }

    fn plan_turn(&mut self, world: &World, faction: &Faction, data: &FactionData) -> Vec<TurnAction> {
        let mut actions = Vec::new();
        for legion in world.faction_legions(faction) {
            if legion.commander_id.is_none() {
                actions.push(TurnAction::Disband(legion.id.clone()));
            }
        }
        if data.maintenance_ratio > 0.9 && faction.tax_rate < 80 {
            actions.push(TurnAction::ChangeTax(i64::from(faction.tax_rate) + 20));
        }

        let mut ready = ready_samurai(world, faction);
        if faction.idle_soldiers > 1_500
            && let Some(location) = open_territories(world, faction).first()
            && let Some(commander) = ready.pop()
        {
            actions.push(TurnAction::RaiseLegion {
                commander: commander.id.clone(),
                name: legion_name(world),
                location: location.id.clone(),
                soldiers: 1_000,
                equipment: Equipment::new(faction.equipment.rifles / 4, faction.equipment.horses / 4, 0),
            });
        }
        for samurai in ready {
            actions.push(TurnAction::Invest {
                samurai: samurai.id.clone(),
                category: weakest_category(faction, &InvestmentCategory::ALL),
            });
        }
        actions
    }
}

impl FactionPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn plan_turn(&mut self, world: &World, faction: &Faction, _data: &FactionData) -> Vec<TurnAction> {
        let samurai: Vec<SamuraiId> = world
            .faction_samurai(faction)
            .into_iter()
            .map(|samurai| samurai.id.clone())
            .collect();
        let territories: Vec<TerritoryId> = world
            .territories
            .iter()
            .map(|territory| territory.id.clone())
            .collect();
        let legions: Vec<LegionId> = world.legions.iter().map(|legion| legion.id.clone()).collect();

        let count = self.rng.gen_range(1..=4);
        let mut actions = Vec::with_capacity(count);
        for _ in 0..count {
            let action = match self.rng.gen_range(0..6) {
                0 => samurai.choose(&mut self.rng).map(|id| TurnAction::Invest {
                    samurai: id.clone(),
                    category: InvestmentCategory::ALL[self.rng.gen_range(0..4)],
                }),
                1 => Some(TurnAction::Purchase(Equipment::new(
                    self.rng.gen_range(0..40),
                    self.rng.gen_range(0..20),
                    self.rng.gen_range(0..2),
                ))),
                2 => match (samurai.choose(&mut self.rng), territories.choose(&mut self.rng)) {
                    (Some(commander), Some(location)) => Some(TurnAction::RaiseLegion {
                        commander: commander.clone(),
                        name: LEGION_NAMES[self.rng.gen_range(0..LEGION_NAMES.len())].to_string(),
                        location: location.clone(),
                        soldiers: self.rng.gen_range(-100..2_000),
                        equipment: Equipment::new(self.rng.gen_range(0..50), self.rng.gen_range(0..50), 0),
                    }),
                    _ => None,
                },
                3 => legions.choose(&mut self.rng).map(|legion| TurnAction::Reinforce {
                    legion: legion.clone(),
                    soldiers: self.rng.gen_range(0..2_500),
                }),
                4 => legions.choose(&mut self.rng).cloned().map(TurnAction::Disband),
                _ => Some(TurnAction::ChangeTax([40, 50, 60, 80][self.rng.gen_range(0..4)])),
            };
            actions.extend(action);
        }
        actions
    }
}
