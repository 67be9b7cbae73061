//! Treasury-side player actions: buying equipment and changing the tax rate.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EquipmentPrices;
use crate::error::{ConflictError, GameError, ValidationError};
use crate::ids::FactionId;
use crate::model::{Equipment, Faction};
use crate::runtime::TaxChangeLedger;

/// The three legal tax rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub enum TaxRate {
    Light,
    Standard,
    Heavy,
}

impl TaxRate {
    #[must_use]
    pub const fn percent(self) -> u8 {
        match self {
            Self::Light => 40,
            Self::Standard => 60,
            Self::Heavy => 80,
        }
    }
}

impl TryFrom<i64> for TaxRate {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            40 => Ok(Self::Light),
            60 => Ok(Self::Standard),
            80 => Ok(Self::Heavy),
            other => Err(ValidationError::InvalidTaxRate(other)),
        }
    }
}

impl From<TaxRate> for u8 {
    fn from(rate: TaxRate) -> Self {
        rate.percent()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub faction_id: FactionId,
    pub order: Equipment,
    pub cost: i64,
    pub treasury_after: i64,
    pub stock_after: Equipment,
}

/// Buy equipment into the faction's stock.
///
/// # Errors
///
/// Returns `InsufficientTreasury` without mutating when the order is too
/// expensive.
pub fn purchase_equipment(
    faction: &mut Faction,
    order: Equipment,
    prices: &EquipmentPrices,
) -> Result<PurchaseReceipt, GameError> {
    let cost = prices.quote(order);
    if cost > faction.treasury {
        return Err(ConflictError::InsufficientTreasury {
            needed: cost,
            available: faction.treasury,
        }
        .into());
    }
    faction.treasury -= cost;
    faction.equipment = faction.equipment.saturating_add(order);
    Ok(PurchaseReceipt {
        faction_id: faction.id.clone(),
        order,
        cost,
        treasury_after: faction.treasury,
        stock_after: faction.equipment,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxChange {
    pub faction_id: FactionId,
    pub previous: u8,
    pub current: u8,
    pub year: u32,
}

/// Apply a new tax rate. The caller records the change in the ledger once
/// it has been persisted.
///
/// # Errors
///
/// Returns `TaxRateAlreadyChanged` when the faction already changed its rate
/// this year.
pub fn change_tax_rate(
    faction: &mut Faction,
    rate: TaxRate,
    ledger: &TaxChangeLedger,
) -> Result<TaxChange, GameError> {
    if ledger.has_changed(&faction.id) {
        return Err(ConflictError::TaxRateAlreadyChanged {
            faction: faction.id.to_string(),
            year: ledger.year(),
        }
        .into());
    }
    let previous = faction.tax_rate;
    faction.tax_rate = rate.percent();
    Ok(TaxChange {
        faction_id: faction.id.clone(),
        previous,
        current: faction.tax_rate,
        year: ledger.year(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faction(treasury: i64) -> Faction {
        Faction {
            id: FactionId::new("uesugi"),
            name: "Uesugi".into(),
            tax_rate: 60,
            treasury,
            idle_soldiers: 0,
            equipment: Equipment::new(5, 5, 0),
            points: Default::default(),
            industry_kokudaka: 0,
            territory_ids: Vec::new(),
            legion_ids: Vec::new(),
            samurai_ids: Vec::new(),
            buffs: Vec::new(),
            relations: Vec::new(),
        }
    }

    #[test]
    fn tax_rates_parse_only_legal_values() {
        assert_eq!(TaxRate::try_from(80), Ok(TaxRate::Heavy));
        assert_eq!(
            TaxRate::try_from(50),
            Err(ValidationError::InvalidTaxRate(50))
        );
        let parsed: TaxRate = serde_json::from_str("40").unwrap();
        assert_eq!(parsed, TaxRate::Light);
        assert!(serde_json::from_str::<TaxRate>("45").is_err());
        assert_eq!(serde_json::to_string(&TaxRate::Standard).unwrap(), "60");
    }

    #[test]
    fn purchase_charges_and_stocks() {
        let mut f = faction(10_000);
        let receipt =
            purchase_equipment(&mut f, Equipment::new(10, 2, 1), &EquipmentPrices::default())
                .unwrap();
        assert_eq!(receipt.cost, 3_000 + 1_000 + 4_000);
        assert_eq!(f.treasury, 2_000);
        assert_eq!(f.equipment, Equipment::new(15, 7, 1));
    }

    #[test]
    fn purchase_never_overdraws() {
        let mut f = faction(3_999);
        let before = f.clone();
        let err = purchase_equipment(&mut f, Equipment::new(0, 0, 1), &EquipmentPrices::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::Conflict(ConflictError::InsufficientTreasury {
                needed: 4_000,
                available: 3_999
            })
        ));
        assert_eq!(f, before);
    }

    #[test]
    fn tax_change_is_refused_once_recorded() {
        let mut f = faction(0);
        let mut ledger = TaxChangeLedger::new(3);
        let change = change_tax_rate(&mut f, TaxRate::Heavy, &ledger).unwrap();
        assert_eq!((change.previous, change.current), (60, 80));
        ledger.record(&f.id);
        assert!(matches!(
            change_tax_rate(&mut f, TaxRate::Light, &ledger),
            Err(GameError::Conflict(ConflictError::TaxRateAlreadyChanged {
                year: 3,
                ..
            }))
        ));
        assert_eq!(f.tax_rate, 80);
    }
}
