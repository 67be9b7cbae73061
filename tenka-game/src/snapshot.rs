//! Full-world snapshots used for rollback.
//!
//! Each snapshot carries a SHA-256 digest of its canonical JSON so a restore
//! can refuse a document that was altered after capture.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::error::{EntityKind, GameError};
use crate::ids::{OperationId, SnapshotId};
use crate::model::World;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub operation_id: OperationId,
    pub taken_at: DateTime<Utc>,
    pub world: World,
    pub digest: String,
}

/// Listing entry without the world payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub operation_id: OperationId,
    pub taken_at: DateTime<Utc>,
    pub year: u32,
    pub faction_count: usize,
    pub digest: String,
}

/// Hex SHA-256 of the world's JSON encoding.
///
/// # Errors
///
/// Returns a serialization error if the world cannot be encoded.
pub fn world_digest(world: &World) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(world)?;
    let hash = Sha256::digest(&bytes);
    Ok(hash.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    }))
}

impl Snapshot {
    /// Copy the world as the pre-image of `operation`.
    ///
    /// # Errors
    ///
    /// `Consistency` if the world cannot be encoded.
    pub fn capture(
        operation: OperationId,
        taken_at: DateTime<Utc>,
        world: &World,
    ) -> Result<Self, GameError> {
        let digest = world_digest(world)
            .map_err(|err| GameError::Consistency(format!("world is not encodable: {err}")))?;
        Ok(Self {
            id: SnapshotId::for_operation(operation),
            operation_id: operation,
            taken_at,
            world: world.clone(),
            digest,
        })
    }

    /// Recompute the digest and compare.
    ///
    /// # Errors
    ///
    /// `Consistency` on mismatch.
    pub fn verify(&self) -> Result<(), GameError> {
        let actual = world_digest(&self.world)
            .map_err(|err| GameError::Consistency(format!("snapshot not encodable: {err}")))?;
        if actual == self.digest {
            Ok(())
        } else {
            Err(GameError::Consistency(format!(
                "snapshot {} digest mismatch (stored {}, computed {actual})",
                self.id, self.digest
            )))
        }
    }

    #[must_use]
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id.clone(),
            operation_id: self.operation_id,
            taken_at: self.taken_at,
            year: self.world.game.year,
            faction_count: self.world.factions.len(),
            digest: self.digest.clone(),
        }
    }
}

/// Retained snapshots, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotShelf {
    snapshots: Vec<Snapshot>,
}

impl SnapshotShelf {
    #[must_use]
    pub fn new(mut snapshots: Vec<Snapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.operation_id);
        Self { snapshots }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    #[must_use]
    pub fn last_operation(&self) -> Option<OperationId> {
        self.snapshots.last().map(|snapshot| snapshot.operation_id)
    }

    /// Snapshot taken before `operation`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no retained snapshot belongs to the operation.
    pub fn for_operation(&self, operation: OperationId) -> Result<&Snapshot, GameError> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.operation_id == operation)
            .ok_or_else(|| GameError::not_found(EntityKind::Snapshot, operation))
    }

    #[must_use]
    pub fn newest_first(&self) -> Vec<SnapshotSummary> {
        self.snapshots.iter().rev().map(Snapshot::summary).collect()
    }

    /// Keep the newest `keep` snapshots, returning the ids dropped.
    pub fn retain_newest(&mut self, keep: usize) -> Vec<SnapshotId> {
        let excess = self.snapshots.len().saturating_sub(keep);
        self.snapshots
            .drain(..excess)
            .map(|snapshot| snapshot.id)
            .collect()
    }

    #[must_use]
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(year: u32) -> World {
        let mut world = World::default();
        world.game.year = year;
        world
    }

    #[test]
    fn digest_detects_tampering() {
        let snapshot = Snapshot::capture(OperationId(1), Utc::now(), &world(4)).unwrap();
        assert_eq!(snapshot.digest.len(), 64);
        assert!(snapshot.verify().is_ok());
        let mut tampered = snapshot;
        tampered.world.game.year = 5;
        assert!(matches!(tampered.verify(), Err(GameError::Consistency(_))));
    }

    #[test]
    fn shelf_lists_newest_first_and_prunes_oldest() {
        let mut shelf = SnapshotShelf::default();
        for op in 1..=4 {
            shelf.push(Snapshot::capture(OperationId(op), Utc::now(), &world(op as u32)).unwrap());
        }
        let listed: Vec<u32> = shelf.newest_first().iter().map(|s| s.year).collect();
        assert_eq!(listed, vec![4, 3, 2, 1]);
        let dropped = shelf.retain_newest(2);
        assert_eq!(
            dropped,
            vec![
                SnapshotId::for_operation(OperationId(1)),
                SnapshotId::for_operation(OperationId(2))
            ]
        );
        assert!(shelf.for_operation(OperationId(3)).is_ok());
        assert!(matches!(
            shelf.for_operation(OperationId(1)),
            Err(GameError::NotFound {
                kind: EntityKind::Snapshot,
                ..
            })
        ));
    }
}
