//! Append-only operation log, capped to the most recent entries.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{OperationId, SnapshotId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    AdvanceYear,
    Rollback,
    Lock,
    Unlock,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AdvanceYear => "advance_year",
            Self::Rollback => "rollback",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: OperationId,
    pub kind: OperationKind,
    pub at: DateTime<Utc>,
    pub summary: String,
    /// Snapshot captured immediately before the operation ran.
    #[serde(default)]
    pub snapshot_id: Option<SnapshotId>,
}

/// Operation records, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationLog {
    records: Vec<OperationRecord>,
    cap: usize,
}

impl OperationLog {
    #[must_use]
    pub fn from_records(mut records: Vec<OperationRecord>, cap: usize) -> Self {
        records.sort_by_key(|record| record.id);
        let mut log = Self {
            records,
            cap: cap.max(1),
        };
        log.evict();
        log
    }

    /// Highest id recorded so far.
    #[must_use]
    pub fn last_id(&self) -> Option<OperationId> {
        self.records.last().map(|record| record.id)
    }

    /// Append, evicting the oldest entries beyond the cap. Returns how many
    /// were evicted.
    pub fn append(&mut self, record: OperationRecord) -> usize {
        self.records.push(record);
        self.evict()
    }

    fn evict(&mut self) -> usize {
        let excess = self.records.len().saturating_sub(self.cap);
        self.records.drain(..excess);
        excess
    }

    #[must_use]
    pub fn newest_first(&self) -> Vec<OperationRecord> {
        self.records.iter().rev().cloned().collect()
    }

    #[must_use]
    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
