//! Tenka Game Engine
//!
//! Economy and year-settlement core for a turn-based Sengoku strategy game.
//! Factions turn territories, soldiers and equipment into income, invest in
//! long-term development, raise legions, and advance year by year through a
//! settlement that can always be rolled back.
//!
//! The crate is storage-agnostic: persistence goes through the
//! [`DocumentStore`] trait, and [`MemoryStore`] is provided for tests and
//! tools.

pub mod aggregate;
pub mod audit;
pub mod config;
pub mod constants;
pub mod economy;
pub mod engine;
pub mod error;
pub mod formulas;
pub mod ids;
pub mod investment;
pub mod legion;
pub mod model;
pub mod numbers;
pub mod oplog;
pub mod products;
pub mod runtime;
pub mod scenario;
pub mod settlement;
pub mod snapshot;
pub mod store;

// Re-export commonly used types
pub use aggregate::{
    CategoryLevel, FactionDashboard, FactionData, FactionView, compute_faction_data,
    compute_for_world, faction_dashboard,
};
pub use audit::audit;
pub use config::{
    CategoryTable, ConfigError, EngineConfig, EquipmentPrices, InvestmentTables, MaintenanceRates,
};
pub use economy::{PurchaseReceipt, TaxChange, TaxRate};
pub use engine::{Realm, RollbackReport};
pub use error::{ConflictError, EntityKind, ErrorKind, GameError, ValidationError};
pub use formulas::{KokudakaBreakdown, MaintenanceCost};
pub use ids::{FactionId, LegionId, OperationId, SamuraiId, SnapshotId, TerritoryId};
pub use investment::{
    InvestmentDice, InvestmentOutcome, InvestmentPreview, InvestmentRequest, InvestmentResult,
    RollSource, ScriptedRolls,
};
pub use legion::{
    CreateLegionRequest, EquipmentUpdate, LegionCreated, LegionDisbanded, SoldierUpdate,
};
pub use model::{
    Buff, BuffKind, Equipment, Faction, GameState, InvestmentCategory, InvestmentPoints, Legion,
    Relation, Samurai, Stance, Territory, World,
};
pub use oplog::{OperationKind, OperationRecord};
pub use products::{ProductCatalog, SpecialProduct};
pub use scenario::Scenario;
pub use settlement::{FactionSettlement, SettlementReport, TerritoryGrowth};
pub use snapshot::{Snapshot, SnapshotSummary};
pub use store::{Collection, DocumentStore, MemoryStore, MemoryStoreError, WriteBatch};
