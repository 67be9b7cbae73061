//! Cross-document invariant checks.
//!
//! Used before installing a world and by the tester after every step. An
//! empty result means every invariant holds.
use std::collections::HashMap;

use crate::constants::{MAX_PRODUCT_SLOTS, POINTS_MAX, POINTS_MIN, TAX_MULTIPLIERS};
use crate::ids::SamuraiId;
use crate::model::{InvestmentCategory, World};

/// Human-readable descriptions of every broken invariant.
#[must_use]
pub fn audit(world: &World) -> Vec<String> {
    let mut findings = Vec::new();

    for faction in &world.factions {
        if faction.treasury < 0 {
            findings.push(format!(
                "faction {} has negative treasury {}",
                faction.id, faction.treasury
            ));
        }
        if !TAX_MULTIPLIERS
            .iter()
            .any(|(rate, _)| *rate == faction.tax_rate)
        {
            findings.push(format!(
                "faction {} has illegal tax rate {}",
                faction.id, faction.tax_rate
            ));
        }
        for category in InvestmentCategory::ALL {
            let points = faction.points.get(category);
            if !(POINTS_MIN..=POINTS_MAX).contains(&points) {
                findings.push(format!(
                    "faction {} {category} points {points} out of range",
                    faction.id
                ));
            }
        }
        for territory_id in &faction.territory_ids {
            match world.territory(territory_id) {
                Ok(territory) if territory.owner.as_ref() == Some(&faction.id) => {}
                Ok(_) => findings.push(format!(
                    "faction {} lists territory {territory_id} it does not own",
                    faction.id
                )),
                Err(_) => findings.push(format!(
                    "faction {} lists unknown territory {territory_id}",
                    faction.id
                )),
            }
        }
        for legion_id in &faction.legion_ids {
            if world.legion(legion_id).is_err() {
                findings.push(format!(
                    "faction {} lists unknown legion {legion_id}",
                    faction.id
                ));
            }
        }
    }

    for territory in &world.territories {
        if territory.products.len() > MAX_PRODUCT_SLOTS {
            findings.push(format!(
                "territory {} has {} products",
                territory.id,
                territory.products.len()
            ));
        }
        if let Some(owner) = &territory.owner {
            match world.faction(owner) {
                Ok(faction) if faction.territory_ids.contains(&territory.id) => {}
                _ => findings.push(format!(
                    "territory {} is not listed by its owner {owner}",
                    territory.id
                )),
            }
        }
        if let Some(legion_id) = &territory.garrison_legion_id {
            match world.legion(legion_id) {
                Ok(legion) if legion.location == territory.id => {}
                _ => findings.push(format!(
                    "territory {} garrison {legion_id} is not stationed there",
                    territory.id
                )),
            }
        }
    }

    let mut commands: HashMap<&SamuraiId, usize> = HashMap::new();
    for legion in &world.legions {
        match world.faction(&legion.faction_id) {
            Ok(faction) if faction.legion_ids.contains(&legion.id) => {}
            _ => findings.push(format!(
                "legion {} is not listed by faction {}",
                legion.id, legion.faction_id
            )),
        }
        match world.territory(&legion.location) {
            Ok(territory)
                if territory.owner.as_ref() == Some(&legion.faction_id)
                    && territory.garrison_legion_id.as_ref() == Some(&legion.id) => {}
            _ => findings.push(format!(
                "legion {} does not garrison an owned territory {}",
                legion.id, legion.location
            )),
        }
        if let Some(commander) = &legion.commander_id {
            *commands.entry(commander).or_default() += 1;
            match world.samurai_by_id(commander) {
                Ok(samurai) if samurai.current_legion_id.as_ref() == Some(&legion.id) => {}
                _ => findings.push(format!(
                    "legion {} commander {commander} is not assigned to it",
                    legion.id
                )),
            }
        }
    }
    for (commander, count) in commands {
        if count > 1 {
            findings.push(format!("samurai {commander} commands {count} legions"));
        }
    }

    for samurai in &world.samurai {
        if samurai.is_idle != samurai.current_legion_id.is_none() {
            findings.push(format!(
                "samurai {} idle flag disagrees with assignment",
                samurai.id
            ));
        }
        if world.faction(&samurai.faction_id).is_err() {
            findings.push(format!(
                "samurai {} belongs to unknown faction {}",
                samurai.id, samurai.faction_id
            ));
        }
    }

    findings
}
