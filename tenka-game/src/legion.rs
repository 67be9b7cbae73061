//! Legion constraint manager.
//!
//! A samurai commands at most one legion and a territory hosts at most one
//! garrison. Every operation checks all of its preconditions against the
//! loaded world before touching it, so a rejected request leaves the world
//! exactly as it was.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::constants::LEGION_NAME_MAX_CHARS;
use crate::error::{ConflictError, EntityKind, GameError, ValidationError, count_from_i64};
use crate::ids::{FactionId, LegionId, SamuraiId, TerritoryId};
use crate::model::{Equipment, Legion, World};

fn legion_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[\p{Han}\p{Hiragana}\p{Katakana}ー々]+$").ok())
        .as_ref()
}

/// Legion names are 1-8 kanji or kana.
#[must_use]
pub fn is_valid_legion_name(name: &str) -> bool {
    let length = name.chars().count();
    (1..=LEGION_NAME_MAX_CHARS).contains(&length)
        && legion_name_pattern().is_some_and(|pattern| pattern.is_match(name))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLegionRequest {
    faction_id: FactionId,
    commander_id: SamuraiId,
    name: String,
    soldiers: u32,
    equipment: Equipment,
    location: TerritoryId,
    force_reassign: bool,
}

impl CreateLegionRequest {
    /// # Errors
    ///
    /// Rejects a malformed name or a negative soldier count.
    pub fn new(
        faction_id: FactionId,
        commander_id: SamuraiId,
        name: &str,
        soldiers: i64,
        equipment: Equipment,
        location: TerritoryId,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if !is_valid_legion_name(name) {
            return Err(ValidationError::InvalidLegionName(name.to_string()));
        }
        Ok(Self {
            faction_id,
            commander_id,
            name: name.to_string(),
            soldiers: count_from_i64("soldiers", soldiers)?,
            equipment,
            location,
            force_reassign: false,
        })
    }

    /// Take the commander away from a legion they already lead.
    #[must_use]
    pub const fn force_reassign(mut self, force: bool) -> Self {
        self.force_reassign = force;
        self
    }

    #[must_use]
    pub const fn faction_id(&self) -> &FactionId {
        &self.faction_id
    }

    #[must_use]
    pub const fn commander_id(&self) -> &SamuraiId {
        &self.commander_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegionCreated {
    pub legion: Legion,
    /// Legion left without a commander by a forced reassignment.
    pub displaced_from: Option<LegionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegionDisbanded {
    pub legion_id: LegionId,
    pub returned_soldiers: u32,
    pub returned_equipment: Equipment,
    pub released_commander: Option<SamuraiId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SoldierUpdate {
    Adjusted {
        legion_id: LegionId,
        previous: u32,
        soldiers: u32,
        idle_soldiers: u32,
    },
    /// A zero count is never stored; the caller should disband instead.
    ShouldDisband { legion_id: LegionId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentUpdate {
    pub legion_id: LegionId,
    pub previous: Equipment,
    pub equipment: Equipment,
    pub faction_stock: Equipment,
}

fn wrong_faction(entity: EntityKind, id: impl ToString, faction: &FactionId) -> GameError {
    ConflictError::WrongFaction {
        entity,
        id: id.to_string(),
        faction: faction.to_string(),
    }
    .into()
}

fn insufficient_soldiers(needed: u32, available: u32) -> GameError {
    ConflictError::InsufficientStock {
        item: "soldiers",
        needed: u64::from(needed),
        available: u64::from(available),
    }
    .into()
}

/// Remove `wanted` from `stock`, naming the first short line on failure.
fn draw_equipment(stock: Equipment, wanted: Equipment) -> Result<Equipment, GameError> {
    stock.checked_sub(wanted).ok_or_else(|| {
        let (item, needed, available) = wanted
            .lines()
            .into_iter()
            .zip(stock.lines())
            .find(|((_, want), (_, have))| want > have)
            .map_or(("equipment", 0, 0), |((item, want), (_, have))| {
                (item, want, have)
            });
        ConflictError::InsufficientStock {
            item,
            needed: u64::from(needed),
            available: u64::from(available),
        }
        .into()
    })
}

fn owned_legion<'w>(
    world: &'w World,
    faction_id: &FactionId,
    legion_id: &LegionId,
) -> Result<&'w Legion, GameError> {
    world.faction(faction_id)?;
    let legion = world.legion(legion_id)?;
    if &legion.faction_id != faction_id {
        return Err(wrong_faction(EntityKind::Legion, legion_id, faction_id));
    }
    Ok(legion)
}

/// Raise a legion from the faction's idle soldiers and equipment stock.
///
/// # Errors
///
/// `NotFound` for unknown ids; `Conflict` when the commander is already
/// assigned (without `force_reassign`), the territory is foreign or
/// garrisoned, or the stock cannot cover the request.
pub fn create_legion(
    world: &mut World,
    request: &CreateLegionRequest,
) -> Result<LegionCreated, GameError> {
    let faction = world.faction(&request.faction_id)?;
    let commander = world.samurai_by_id(&request.commander_id)?;
    if commander.faction_id != faction.id {
        return Err(wrong_faction(
            EntityKind::Samurai,
            &commander.id,
            &faction.id,
        ));
    }

    let prior = world
        .legion_commanded_by(&commander.id)
        .map(|legion| legion.id.clone())
        .or_else(|| commander.current_legion_id.clone());
    if let Some(prior) = &prior {
        if !request.force_reassign {
            return Err(ConflictError::CommanderAssigned {
                samurai: commander.id.to_string(),
                legion: prior.to_string(),
            }
            .into());
        }
    }

    let territory = world.territory(&request.location)?;
    if territory.owner.as_ref() != Some(&faction.id) {
        return Err(wrong_faction(
            EntityKind::Territory,
            &territory.id,
            &faction.id,
        ));
    }
    if let Some(garrison) = &territory.garrison_legion_id {
        return Err(ConflictError::TerritoryGarrisoned {
            territory: territory.id.to_string(),
            legion: garrison.to_string(),
        }
        .into());
    }

    if request.soldiers > faction.idle_soldiers {
        return Err(insufficient_soldiers(
            request.soldiers,
            faction.idle_soldiers,
        ));
    }
    let remaining_stock = draw_equipment(faction.equipment, request.equipment)?;

    // Every check passed; mutate.
    let faction_index = world.faction_index(&request.faction_id)?;
    let samurai_index = world.samurai_index(&request.commander_id)?;
    let territory_index = world.territory_index(&request.location)?;
    let displaced_from = match prior {
        Some(prior) => world
            .legions
            .iter_mut()
            .find(|legion| legion.id == prior)
            .map(|legion| {
                legion.commander_id = None;
                legion.id.clone()
            }),
        None => None,
    };

    let legion_id = world.game.mint_legion_id();
    let legion = Legion {
        id: legion_id.clone(),
        name: request.name.clone(),
        faction_id: request.faction_id.clone(),
        commander_id: Some(request.commander_id.clone()),
        soldiers: request.soldiers,
        equipment: request.equipment,
        location: request.location.clone(),
    };

    let faction = &mut world.factions[faction_index];
    faction.idle_soldiers -= request.soldiers;
    faction.equipment = remaining_stock;
    faction.legion_ids.push(legion_id.clone());
    world.samurai[samurai_index].assign(legion_id.clone());
    world.territories[territory_index].garrison_legion_id = Some(legion_id);
    world.legions.push(legion.clone());

    log::debug!(
        "legion {} raised by {} at {} ({} soldiers)",
        legion.id,
        legion.faction_id,
        legion.location,
        legion.soldiers
    );
    Ok(LegionCreated {
        legion,
        displaced_from,
    })
}

/// Dissolve a legion, returning its soldiers and equipment to the faction.
///
/// # Errors
///
/// `NotFound` for unknown ids; `Conflict` when the legion is foreign.
pub fn disband_legion(
    world: &mut World,
    faction_id: &FactionId,
    legion_id: &LegionId,
) -> Result<LegionDisbanded, GameError> {
    let legion = owned_legion(world, faction_id, legion_id)?.clone();
    let legion_index = world.legion_index(legion_id)?;
    let faction_index = world.faction_index(faction_id)?;

    let faction = &mut world.factions[faction_index];
    faction.idle_soldiers = faction.idle_soldiers.saturating_add(legion.soldiers);
    faction.equipment = faction.equipment.saturating_add(legion.equipment);
    faction.legion_ids.retain(|id| id != legion_id);

    let mut released_commander = None;
    for samurai in &mut world.samurai {
        if samurai.current_legion_id.as_ref() == Some(legion_id) {
            samurai.release();
            released_commander = Some(samurai.id.clone());
        }
    }
    for territory in &mut world.territories {
        if territory.garrison_legion_id.as_ref() == Some(legion_id) {
            territory.garrison_legion_id = None;
        }
    }
    world.legions.remove(legion_index);

    Ok(LegionDisbanded {
        legion_id: legion.id,
        returned_soldiers: legion.soldiers,
        returned_equipment: legion.equipment,
        released_commander,
    })
}

/// Set a legion's soldier count, moving the difference to or from the
/// faction's idle pool.
///
/// # Errors
///
/// `Validation` for a negative count; `Conflict` when the idle pool cannot
/// cover an increase.
pub fn update_legion_soldiers(
    world: &mut World,
    faction_id: &FactionId,
    legion_id: &LegionId,
    soldiers: i64,
) -> Result<SoldierUpdate, GameError> {
    let target = count_from_i64("soldiers", soldiers)?;
    let legion = owned_legion(world, faction_id, legion_id)?;
    if target == 0 {
        return Ok(SoldierUpdate::ShouldDisband {
            legion_id: legion_id.clone(),
        });
    }

    let previous = legion.soldiers;
    let idle = world.faction(faction_id)?.idle_soldiers;
    let idle_after = if target > previous {
        let needed = target - previous;
        if needed > idle {
            return Err(insufficient_soldiers(needed, idle));
        }
        idle - needed
    } else {
        idle.saturating_add(previous - target)
    };

    world.faction_mut(faction_id)?.idle_soldiers = idle_after;
    world.legion_mut(legion_id)?.soldiers = target;
    Ok(SoldierUpdate::Adjusted {
        legion_id: legion_id.clone(),
        previous,
        soldiers: target,
        idle_soldiers: idle_after,
    })
}

/// Set a legion's equipment, moving the difference to or from the faction
/// stock line by line.
///
/// # Errors
///
/// `Conflict` when the stock cannot cover an increase on any line.
pub fn update_legion_equipment(
    world: &mut World,
    faction_id: &FactionId,
    legion_id: &LegionId,
    equipment: Equipment,
) -> Result<EquipmentUpdate, GameError> {
    let previous = owned_legion(world, faction_id, legion_id)?.equipment;
    let pool = world.faction(faction_id)?.equipment.saturating_add(previous);
    let faction_stock = draw_equipment(pool, equipment)?;

    world.faction_mut(faction_id)?.equipment = faction_stock;
    world.legion_mut(legion_id)?.equipment = equipment;
    Ok(EquipmentUpdate {
        legion_id: legion_id.clone(),
        previous,
        equipment,
        faction_stock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Faction, Samurai, Territory};
    use smallvec::smallvec;

    fn world() -> World {
        let faction = |id: &str| Faction {
            id: FactionId::new(id),
            name: id.to_string(),
            tax_rate: 60,
            treasury: 10_000,
            idle_soldiers: 1_000,
            equipment: Equipment::new(100, 40, 2),
            points: Default::default(),
            industry_kokudaka: 0,
            territory_ids: Vec::new(),
            legion_ids: Vec::new(),
            samurai_ids: Vec::new(),
            buffs: Vec::new(),
            relations: Vec::new(),
        };
        let territory = |id: &str, owner: &str| Territory {
            id: TerritoryId::new(id),
            name: id.to_string(),
            owner: Some(FactionId::new(owner)),
            province: "owari".into(),
            district: id.to_string(),
            base_kokudaka: 50_000,
            products: smallvec![],
            garrison_legion_id: None,
        };
        let samurai = |id: &str, faction: &str| Samurai {
            id: SamuraiId::new(id),
            name: id.to_string(),
            faction_id: FactionId::new(faction),
            civil: 60,
            martial: 80,
            is_idle: true,
            current_legion_id: None,
            action_available: true,
        };
        let mut world = World {
            factions: vec![faction("oda"), faction("takeda")],
            territories: vec![
                territory("kiyosu", "oda"),
                territory("nagoya", "oda"),
                territory("kofu", "takeda"),
            ],
            samurai: vec![samurai("katsuie", "oda"), samurai("shingen", "takeda")],
            ..World::default()
        };
        world.factions[0].territory_ids =
            vec![TerritoryId::new("kiyosu"), TerritoryId::new("nagoya")];
        world.factions[0].samurai_ids = vec![SamuraiId::new("katsuie")];
        world.factions[1].territory_ids = vec![TerritoryId::new("kofu")];
        world.factions[1].samurai_ids = vec![SamuraiId::new("shingen")];
        world
    }

    fn request(location: &str, soldiers: i64) -> CreateLegionRequest {
        CreateLegionRequest::new(
            FactionId::new("oda"),
            SamuraiId::new("katsuie"),
            "柴田隊",
            soldiers,
            Equipment::new(10, 5, 0),
            TerritoryId::new(location),
        )
        .unwrap()
    }

    #[test]
    fn legion_names_accept_kanji_and_kana_only() {
        assert!(is_valid_legion_name("柴田隊"));
        assert!(is_valid_legion_name("ひかり"));
        assert!(is_valid_legion_name("アーサー"));
        assert!(is_valid_legion_name("赤備え々"));
        assert!(!is_valid_legion_name(""));
        assert!(!is_valid_legion_name("Shibata"));
        assert!(!is_valid_legion_name("一二三四五六七八九"));
        assert!(matches!(
            CreateLegionRequest::new(
                FactionId::new("oda"),
                SamuraiId::new("katsuie"),
                "隊1",
                1,
                Equipment::default(),
                TerritoryId::new("kiyosu"),
            ),
            Err(ValidationError::InvalidLegionName(_))
        ));
    }

    #[test]
    fn create_moves_stock_and_links_everything() {
        let mut world = world();
        let created = create_legion(&mut world, &request("kiyosu", 400)).unwrap();
        let id = created.legion.id.clone();
        assert_eq!(id.as_str(), "legion-1");
        assert_eq!(created.displaced_from, None);

        let oda = world.faction(&FactionId::new("oda")).unwrap();
        assert_eq!(oda.idle_soldiers, 600);
        assert_eq!(oda.equipment, Equipment::new(90, 35, 2));
        assert_eq!(oda.legion_ids, vec![id.clone()]);
        let katsuie = world.samurai_by_id(&SamuraiId::new("katsuie")).unwrap();
        assert_eq!(katsuie.current_legion_id.as_ref(), Some(&id));
        assert!(!katsuie.is_idle);
        let kiyosu = world.territory(&TerritoryId::new("kiyosu")).unwrap();
        assert_eq!(kiyosu.garrison_legion_id.as_ref(), Some(&id));
    }

    #[test]
    fn commander_conflict_unless_forced() {
        let mut world = world();
        let first = create_legion(&mut world, &request("kiyosu", 100)).unwrap();
        let before = world.clone();
        let err = create_legion(&mut world, &request("nagoya", 100)).unwrap_err();
        assert!(matches!(
            err,
            GameError::Conflict(ConflictError::CommanderAssigned { .. })
        ));
        assert_eq!(world, before);

        let second =
            create_legion(&mut world, &request("nagoya", 100).force_reassign(true)).unwrap();
        assert_eq!(second.displaced_from.as_ref(), Some(&first.legion.id));
        let old = world.legion(&first.legion.id).unwrap();
        assert_eq!(old.commander_id, None);
        let katsuie = world.samurai_by_id(&SamuraiId::new("katsuie")).unwrap();
        assert_eq!(katsuie.current_legion_id.as_ref(), Some(&second.legion.id));
    }

    #[test]
    fn garrisoned_foreign_or_understocked_requests_are_rejected() {
        let mut world = world();
        create_legion(&mut world, &request("kiyosu", 100)).unwrap();
        world.samurai[0].release();
        let before = world.clone();

        assert!(matches!(
            create_legion(&mut world, &request("kiyosu", 100)),
            Err(GameError::Conflict(ConflictError::TerritoryGarrisoned { .. }))
        ));
        assert!(matches!(
            create_legion(&mut world, &request("kofu", 100)),
            Err(GameError::Conflict(ConflictError::WrongFaction {
                entity: EntityKind::Territory,
                ..
            }))
        ));
        assert!(matches!(
            create_legion(&mut world, &request("nagoya", 5_000)),
            Err(GameError::Conflict(ConflictError::InsufficientStock {
                item: "soldiers",
                ..
            }))
        ));
        let cannons = CreateLegionRequest::new(
            FactionId::new("oda"),
            SamuraiId::new("katsuie"),
            "砲兵隊",
            10,
            Equipment::new(0, 0, 3),
            TerritoryId::new("nagoya"),
        )
        .unwrap();
        assert!(matches!(
            create_legion(&mut world, &cannons),
            Err(GameError::Conflict(ConflictError::InsufficientStock {
                item: "cannons",
                needed: 3,
                available: 2
            }))
        ));
        assert_eq!(world, before);
    }

    #[test]
    fn disband_returns_everything() {
        let mut world = world();
        let pristine = world.clone();
        let created = create_legion(&mut world, &request("kiyosu", 400)).unwrap();
        let disbanded =
            disband_legion(&mut world, &FactionId::new("oda"), &created.legion.id).unwrap();
        assert_eq!(disbanded.returned_soldiers, 400);
        assert_eq!(
            disbanded.released_commander,
            Some(SamuraiId::new("katsuie"))
        );
        // Only the legion serial moved.
        world.game.next_legion_serial = pristine.game.next_legion_serial;
        assert_eq!(world, pristine);
    }

    #[test]
    fn disbanding_a_foreign_legion_is_a_conflict() {
        let mut world = world();
        let created = create_legion(&mut world, &request("kiyosu", 400)).unwrap();
        assert!(matches!(
            disband_legion(&mut world, &FactionId::new("takeda"), &created.legion.id),
            Err(GameError::Conflict(ConflictError::WrongFaction {
                entity: EntityKind::Legion,
                ..
            }))
        ));
    }

    #[test]
    fn soldier_updates_move_the_delta() {
        let mut world = world();
        let id = create_legion(&mut world, &request("kiyosu", 400))
            .unwrap()
            .legion
            .id;
        let oda = FactionId::new("oda");
        assert_eq!(
            update_legion_soldiers(&mut world, &oda, &id, 900).unwrap(),
            SoldierUpdate::Adjusted {
                legion_id: id.clone(),
                previous: 400,
                soldiers: 900,
                idle_soldiers: 100,
            }
        );
        assert!(update_legion_soldiers(&mut world, &oda, &id, 1_001).is_err());
        update_legion_soldiers(&mut world, &oda, &id, 300).unwrap();
        assert_eq!(world.faction(&oda).unwrap().idle_soldiers, 700);
        assert_eq!(
            update_legion_soldiers(&mut world, &oda, &id, 0).unwrap(),
            SoldierUpdate::ShouldDisband {
                legion_id: id.clone()
            }
        );
        assert_eq!(world.legions[0].soldiers, 300);
        assert!(matches!(
            update_legion_soldiers(&mut world, &oda, &id, -1),
            Err(GameError::Validation(ValidationError::NegativeCount { .. }))
        ));
    }

    #[test]
    fn equipment_updates_move_the_delta_per_line() {
        let mut world = world();
        let id = create_legion(&mut world, &request("kiyosu", 400))
            .unwrap()
            .legion
            .id;
        let oda = FactionId::new("oda");
        let update =
            update_legion_equipment(&mut world, &oda, &id, Equipment::new(0, 40, 2)).unwrap();
        assert_eq!(update.previous, Equipment::new(10, 5, 0));
        assert_eq!(update.faction_stock, Equipment::new(100, 0, 0));
        assert!(matches!(
            update_legion_equipment(&mut world, &oda, &id, Equipment::new(0, 46, 0)),
            Err(GameError::Conflict(ConflictError::InsufficientStock {
                item: "horses",
                ..
            }))
        ));
        assert_eq!(world.legions[0].equipment, Equipment::new(0, 40, 2));
    }
}
