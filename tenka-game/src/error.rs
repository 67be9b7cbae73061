//! Error taxonomy shared by every engine operation.
use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;
use crate::ids::SnapshotId;

/// Broad classification used by callers to map errors onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input rejected before any state is read.
    Validation,
    /// A precondition over current state does not hold.
    Conflict,
    /// An identifier does not resolve.
    NotFound,
    /// Player mutations are blocked by the administrator lock.
    Locked,
    /// Storage or consistency failure; operator attention required.
    Fatal,
}

/// Entity families that can be looked up by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Faction,
    Territory,
    Legion,
    Samurai,
    Operation,
    Snapshot,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Faction => "faction",
            Self::Territory => "territory",
            Self::Legion => "legion",
            Self::Samurai => "samurai",
            Self::Operation => "operation",
            Self::Snapshot => "snapshot",
        };
        f.write_str(label)
    }
}

/// Input rejected at construction time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown investment category `{0}`")]
    UnknownCategory(String),
    #[error("{field} must not be negative (got {value})")]
    NegativeCount { field: &'static str, value: i64 },
    #[error("{field} is too large (got {value})")]
    CountOverflow { field: &'static str, value: i64 },
    #[error("tax rate {0}% is not one of 40, 60 or 80")]
    InvalidTaxRate(i64),
    #[error("legion name `{0}` must be 1-8 Japanese characters")]
    InvalidLegionName(String),
    #[error("commerce amount must be positive (got {0})")]
    InvalidCommerceAmount(i64),
    #[error("an amount can only be supplied for commerce investments")]
    AmountNotAllowed,
    #[error("territory `{territory}` lists {count} special products (max 3)")]
    TooManyProducts { territory: String, count: usize },
}

/// Request refused because current state forbids it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("samurai `{samurai}` already commands legion `{legion}`")]
    CommanderAssigned { samurai: String, legion: String },
    #[error("samurai `{samurai}` commands a legion and cannot invest")]
    SamuraiAssigned { samurai: String },
    #[error("samurai `{samurai}` has already acted this year")]
    SamuraiExhausted { samurai: String },
    #[error("{entity} `{id}` does not belong to faction `{faction}`")]
    WrongFaction {
        entity: EntityKind,
        id: String,
        faction: String,
    },
    #[error("territory `{territory}` is already garrisoned by `{legion}`")]
    TerritoryGarrisoned { territory: String, legion: String },
    #[error("treasury holds {available}, {needed} required")]
    InsufficientTreasury { needed: i64, available: i64 },
    #[error("not enough {item}: {needed} required, {available} available")]
    InsufficientStock {
        item: &'static str,
        needed: u64,
        available: u64,
    },
    #[error("faction `{faction}` already changed its tax rate in year {year}")]
    TaxRateAlreadyChanged { faction: String, year: u32 },
    #[error("no factions exist")]
    NoFactions,
}

/// Public error for all engine operations.
#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error("{kind} `{id}` not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("the game is locked")]
    Locked,
    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("settlement batch write failed; restore from snapshot `{snapshot_id}`")]
    SettlementAborted {
        snapshot_id: SnapshotId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("inconsistent state: {0}")]
    Consistency(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GameError {
    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Locked => ErrorKind::Locked,
            Self::Storage(_)
            | Self::SettlementAborted { .. }
            | Self::Consistency(_)
            | Self::Config(_) => ErrorKind::Fatal,
        }
    }
}

/// Convert a wire-level count into an inventory count.
///
/// # Errors
///
/// Returns a validation error for negative or oversized values.
pub fn count_from_i64(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeCount { field, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::CountOverflow { field, value })
}
