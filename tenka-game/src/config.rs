//! Engine configuration: persistence limits, prices, maintenance and
//! investment tables.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_BATCH_WRITE_ATTEMPTS, DEFAULT_INVESTMENT_SEED, DEFAULT_ROLLBACK_HORIZON,
    DEFAULT_SESSION_TTL_SECS, OPERATION_LOG_CAP,
};
use crate::model::{Equipment, InvestmentCategory};

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: i64,
        value: i64,
    },
    #[error("{category} points must satisfy critical >= success >= failure")]
    PointOrdering { category: InvestmentCategory },
    #[error("configuration JSON is invalid: {0}")]
    Parse(String),
}

/// Per-unit yearly upkeep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRates {
    #[serde(default = "MaintenanceRates::default_soldier")]
    pub soldier: i64,
    #[serde(default = "MaintenanceRates::default_horse")]
    pub horse: i64,
    #[serde(default = "MaintenanceRates::default_rifle")]
    pub rifle: i64,
    #[serde(default = "MaintenanceRates::default_cannon")]
    pub cannon: i64,
    /// Extra upkeep for each soldier deployed in a legion.
    #[serde(default = "MaintenanceRates::default_legion_surcharge")]
    pub legion_soldier_surcharge: i64,
    /// Fixed stipend per samurai; not scaled by armament level.
    #[serde(default = "MaintenanceRates::default_samurai_salary")]
    pub samurai_salary: i64,
}

impl MaintenanceRates {
    const fn default_soldier() -> i64 {
        8
    }

    const fn default_horse() -> i64 {
        20
    }

    const fn default_rifle() -> i64 {
        12
    }

    const fn default_cannon() -> i64 {
        100
    }

    const fn default_legion_surcharge() -> i64 {
        4
    }

    const fn default_samurai_salary() -> i64 {
        2_000
    }
}

impl Default for MaintenanceRates {
    fn default() -> Self {
        Self {
            soldier: Self::default_soldier(),
            horse: Self::default_horse(),
            rifle: Self::default_rifle(),
            cannon: Self::default_cannon(),
            legion_soldier_surcharge: Self::default_legion_surcharge(),
            samurai_salary: Self::default_samurai_salary(),
        }
    }
}

/// Purchase price per unit of equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentPrices {
    #[serde(default = "EquipmentPrices::default_rifle")]
    pub rifle: i64,
    #[serde(default = "EquipmentPrices::default_horse")]
    pub horse: i64,
    #[serde(default = "EquipmentPrices::default_cannon")]
    pub cannon: i64,
}

impl EquipmentPrices {
    const fn default_rifle() -> i64 {
        300
    }

    const fn default_horse() -> i64 {
        500
    }

    const fn default_cannon() -> i64 {
        4_000
    }

    /// Total price of an order.
    #[must_use]
    pub fn quote(&self, order: Equipment) -> i64 {
        self.rifle * i64::from(order.rifles)
            + self.horse * i64::from(order.horses)
            + self.cannon * i64::from(order.cannons)
    }
}

impl Default for EquipmentPrices {
    fn default() -> Self {
        Self {
            rifle: Self::default_rifle(),
            horse: Self::default_horse(),
            cannon: Self::default_cannon(),
        }
    }
}

/// Cost and base point gains for one investment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTable {
    pub cost: i64,
    pub critical_points: i32,
    pub success_points: i32,
    pub failure_points: i32,
}

impl CategoryTable {
    #[must_use]
    pub const fn new(cost: i64, critical: i32, success: i32, failure: i32) -> Self {
        Self {
            cost,
            critical_points: critical,
            success_points: success,
            failure_points: failure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentTables {
    #[serde(default = "InvestmentTables::default_agriculture")]
    pub agriculture: CategoryTable,
    #[serde(default = "InvestmentTables::default_commerce")]
    pub commerce: CategoryTable,
    #[serde(default = "InvestmentTables::default_navy")]
    pub navy: CategoryTable,
    #[serde(default = "InvestmentTables::default_armament")]
    pub armament: CategoryTable,
}

impl InvestmentTables {
    const fn default_agriculture() -> CategoryTable {
        CategoryTable::new(5_000, 10, 5, 0)
    }

    const fn default_commerce() -> CategoryTable {
        CategoryTable::new(5_000, 10, 5, 0)
    }

    const fn default_navy() -> CategoryTable {
        CategoryTable::new(8_000, 8, 4, -1)
    }

    const fn default_armament() -> CategoryTable {
        CategoryTable::new(10_000, 8, 4, -1)
    }

    #[must_use]
    pub const fn get(&self, category: InvestmentCategory) -> &CategoryTable {
        match category {
            InvestmentCategory::Agriculture => &self.agriculture,
            InvestmentCategory::Commerce => &self.commerce,
            InvestmentCategory::Navy => &self.navy,
            InvestmentCategory::Armament => &self.armament,
        }
    }
}

impl Default for InvestmentTables {
    fn default() -> Self {
        Self {
            agriculture: Self::default_agriculture(),
            commerce: Self::default_commerce(),
            navy: Self::default_navy(),
            armament: Self::default_armament(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of snapshots kept for rollback.
    #[serde(default = "EngineConfig::default_rollback_horizon")]
    pub rollback_horizon: usize,
    #[serde(default = "EngineConfig::default_operation_log_cap")]
    pub operation_log_cap: usize,
    /// Attempts made for a multi-collection write before giving up.
    #[serde(default = "EngineConfig::default_batch_write_attempts")]
    pub batch_write_attempts: u32,
    #[serde(default = "EngineConfig::default_session_ttl_secs")]
    pub session_ttl_secs: i64,
    #[serde(default = "EngineConfig::default_investment_seed")]
    pub investment_seed: u64,
    #[serde(default)]
    pub prices: EquipmentPrices,
    #[serde(default)]
    pub maintenance: MaintenanceRates,
    #[serde(default)]
    pub investment: InvestmentTables,
}

impl EngineConfig {
    const fn default_rollback_horizon() -> usize {
        DEFAULT_ROLLBACK_HORIZON
    }

    const fn default_operation_log_cap() -> usize {
        OPERATION_LOG_CAP
    }

    const fn default_batch_write_attempts() -> u32 {
        DEFAULT_BATCH_WRITE_ATTEMPTS
    }

    const fn default_session_ttl_secs() -> i64 {
        DEFAULT_SESSION_TTL_SECS
    }

    const fn default_investment_seed() -> u64 {
        DEFAULT_INVESTMENT_SEED
    }

    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates an invariant.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Builder-style seed override, used for reproducible runs.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.investment_seed = seed;
        self
    }

    /// Check the invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let minimums: [(&'static str, i64, i64); 4] = [
            (
                "rollback_horizon",
                1,
                i64::try_from(self.rollback_horizon).unwrap_or(i64::MAX),
            ),
            (
                "operation_log_cap",
                1,
                i64::try_from(self.operation_log_cap).unwrap_or(i64::MAX),
            ),
            (
                "batch_write_attempts",
                1,
                i64::from(self.batch_write_attempts),
            ),
            ("session_ttl_secs", 1, self.session_ttl_secs),
        ];
        for (field, min, value) in minimums {
            if value < min {
                return Err(ConfigError::MinViolation { field, min, value });
            }
        }

        let rates = &self.maintenance;
        let prices = &self.prices;
        let non_negative: [(&'static str, i64); 9] = [
            ("maintenance.soldier", rates.soldier),
            ("maintenance.horse", rates.horse),
            ("maintenance.rifle", rates.rifle),
            ("maintenance.cannon", rates.cannon),
            (
                "maintenance.legion_soldier_surcharge",
                rates.legion_soldier_surcharge,
            ),
            ("maintenance.samurai_salary", rates.samurai_salary),
            ("prices.rifle", prices.rifle),
            ("prices.horse", prices.horse),
            ("prices.cannon", prices.cannon),
        ];
        for (field, value) in non_negative {
            if value < 0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 0,
                    value,
                });
            }
        }

        for category in InvestmentCategory::ALL {
            let table = self.investment.get(category);
            if table.cost < 0 {
                return Err(ConfigError::MinViolation {
                    field: "investment.cost",
                    min: 0,
                    value: table.cost,
                });
            }
            if table.critical_points < table.success_points
                || table.success_points < table.failure_points
            {
                return Err(ConfigError::PointOrdering { category });
            }
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rollback_horizon: Self::default_rollback_horizon(),
            operation_log_cap: Self::default_operation_log_cap(),
            batch_write_attempts: Self::default_batch_write_attempts(),
            session_ttl_secs: Self::default_session_ttl_secs(),
            investment_seed: Self::default_investment_seed(),
            prices: EquipmentPrices::default(),
            maintenance: MaintenanceRates::default(),
            investment: InvestmentTables::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg = EngineConfig::from_json("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default_config());
        assert_eq!(cfg.operation_log_cap, 100);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg = EngineConfig::from_json(
            r#"{ "rollback_horizon": 3, "maintenance": { "soldier": 5 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.rollback_horizon, 3);
        assert_eq!(cfg.maintenance.soldier, 5);
        assert_eq!(cfg.maintenance.horse, 20);
    }

    #[test]
    fn validation_rejects_zero_horizon_and_bad_ordering() {
        assert_eq!(
            EngineConfig::from_json(r#"{ "rollback_horizon": 0 }"#),
            Err(ConfigError::MinViolation {
                field: "rollback_horizon",
                min: 1,
                value: 0
            })
        );
        let mut cfg = EngineConfig::default();
        cfg.investment.navy = CategoryTable::new(100, 2, 4, 0);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::PointOrdering {
                category: InvestmentCategory::Navy
            })
        );
    }

    #[test]
    fn quote_sums_every_line() {
        let prices = EquipmentPrices::default();
        assert_eq!(prices.quote(Equipment::new(2, 1, 1)), 600 + 500 + 4_000);
    }
}
