//! Document store abstraction and the collections the engine persists.
//!
//! The backing service is an opaque key-value document store. The engine
//! only ever reads a whole collection or replaces a set of whole collections
//! in one batch.
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

use crate::error::GameError;
use crate::model::{Faction, GameState, Legion, Samurai, Territory, World};
use crate::oplog::OperationRecord;
use crate::products::SpecialProduct;
use crate::snapshot::Snapshot;

/// A document type stored under a fixed collection name.
pub trait Collection: Serialize + DeserializeOwned + Clone {
    const NAME: &'static str;
}

macro_rules! collection {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(impl Collection for $ty {
            const NAME: &'static str = $name;
        })*
    };
}

collection! {
    Faction => "factions",
    Territory => "territories",
    Samurai => "samurai",
    Legion => "legions",
    GameState => "game_state",
    SpecialProduct => "special_products",
    OperationRecord => "operation_log",
    Snapshot => "snapshots",
}

/// Whole-collection replacements applied together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    collections: BTreeMap<&'static str, Vec<Value>>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a full replacement of `T`'s collection.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a document cannot be encoded.
    pub fn put<T: Collection>(&mut self, documents: &[T]) -> Result<&mut Self, serde_json::Error> {
        let encoded = documents
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.collections.insert(T::NAME, encoded);
        Ok(self)
    }

    #[must_use]
    pub fn collection_names(&self) -> Vec<&'static str> {
        self.collections.keys().copied().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &[Value])> {
        self.collections
            .iter()
            .map(|(name, docs)| (*name, docs.as_slice()))
    }
}

/// Storage backend contract. Implementations must apply a batch as a whole
/// or not at all.
pub trait DocumentStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read every document of a collection; an unknown collection is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn read_collection(&self, name: &'static str) -> Result<Vec<Value>, Self::Error>;

    /// Replace each collection named in the batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be applied.
    fn commit(&self, batch: &WriteBatch) -> Result<(), Self::Error>;
}

/// Decode a whole collection.
///
/// # Errors
///
/// `Storage` when the backend fails, `Consistency` when a document does not
/// decode.
pub fn load_all<T: Collection, S: DocumentStore>(store: &S) -> Result<Vec<T>, GameError> {
    store
        .read_collection(T::NAME)
        .map_err(GameError::storage)?
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).map_err(|err| {
                GameError::Consistency(format!("malformed {} document: {err}", T::NAME))
            })
        })
        .collect()
}

/// Replace a single collection.
///
/// # Errors
///
/// `Storage` when the backend rejects the write.
pub fn replace_all<T: Collection, S: DocumentStore>(
    store: &S,
    documents: &[T],
) -> Result<(), GameError> {
    let mut batch = WriteBatch::new();
    batch.put(documents).map_err(GameError::storage)?;
    store.commit(&batch).map_err(GameError::storage)
}

/// Load every game collection into one `World`.
///
/// # Errors
///
/// As [`load_all`].
pub fn load_world<S: DocumentStore>(store: &S) -> Result<World, GameError> {
    let game = load_all::<GameState, _>(store)?
        .into_iter()
        .next()
        .unwrap_or_default();
    Ok(World {
        game,
        factions: load_all(store)?,
        territories: load_all(store)?,
        samurai: load_all(store)?,
        legions: load_all(store)?,
    })
}

/// Stage every collection of a world.
///
/// # Errors
///
/// Returns a serialization error if a document cannot be encoded.
pub fn world_batch(world: &World) -> Result<WriteBatch, serde_json::Error> {
    let mut batch = WriteBatch::new();
    batch
        .put(std::slice::from_ref(&world.game))?
        .put(&world.factions)?
        .put(&world.territories)?
        .put(&world.samurai)?
        .put(&world.legions)?;
    Ok(batch)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("memory store lock poisoned")]
    Poisoned,
    #[error("injected write failure for {0:?}")]
    InjectedFailure(Vec<&'static str>),
}

/// In-process store used by tests and the tester CLI.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<&'static str, Vec<Value>>>,
    commits_before_failure: AtomicU32,
    failing_commits: AtomicU32,
    commits: AtomicU32,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail without writing anything.
    pub fn fail_next_commits(&self, count: u32) {
        self.fail_commits_after(0, count);
    }

    /// Let `successes` commits through, then fail the following `failures`.
    pub fn fail_commits_after(&self, successes: u32, failures: u32) {
        self.commits_before_failure.store(successes, Ordering::SeqCst);
        self.failing_commits.store(failures, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> bool {
        let pending = self.failing_commits.load(Ordering::SeqCst);
        if pending == 0 {
            return false;
        }
        let grace = self.commits_before_failure.load(Ordering::SeqCst);
        if grace > 0 {
            self.commits_before_failure.store(grace - 1, Ordering::SeqCst);
            return false;
        }
        self.failing_commits.store(pending - 1, Ordering::SeqCst);
        true
    }

    /// Successful commits so far.
    #[must_use]
    pub fn commit_count(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Raw documents of a collection, for inspection.
    #[must_use]
    pub fn raw(&self, name: &str) -> Vec<Value> {
        self.collections
            .read()
            .ok()
            .and_then(|collections| collections.get(name).cloned())
            .unwrap_or_default()
    }
}

impl DocumentStore for MemoryStore {
    type Error = MemoryStoreError;

    fn read_collection(&self, name: &'static str) -> Result<Vec<Value>, Self::Error> {
        let collections = self
            .collections
            .read()
            .map_err(|_| MemoryStoreError::Poisoned)?;
        Ok(collections.get(name).cloned().unwrap_or_default())
    }

    fn commit(&self, batch: &WriteBatch) -> Result<(), Self::Error> {
        if self.take_injected_failure() {
            return Err(MemoryStoreError::InjectedFailure(batch.collection_names()));
        }
        let mut collections = self
            .collections
            .write()
            .map_err(|_| MemoryStoreError::Poisoned)?;
        for (name, documents) in batch.entries() {
            collections.insert(name, documents.to_vec());
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::FactionId;

    fn faction(id: &str) -> Faction {
        Faction {
            id: FactionId::new(id),
            name: id.to_string(),
            tax_rate: 40,
            treasury: 1,
            idle_soldiers: 0,
            equipment: Default::default(),
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
    fn replace_then_load_returns_documents_in_order() {
        let store = MemoryStore::new();
        replace_all(&store, &[faction("a"), faction("b")]).unwrap();
        let loaded: Vec<Faction> = load_all(&store).unwrap();
        assert_eq!(loaded, vec![faction("a"), faction("b")]);
        assert!(load_all::<Legion, _>(&store).unwrap().is_empty());
    }

    #[test]
    fn failed_commit_writes_nothing() {
        let store = MemoryStore::new();
        let world = World {
            factions: vec![faction("a")],
            ..World::default()
        };
        store.fail_next_commits(1);
        let batch = world_batch(&world).unwrap();
        assert!(matches!(
            store.commit(&batch),
            Err(MemoryStoreError::InjectedFailure(_))
        ));
        assert!(store.raw("factions").is_empty());
        store.commit(&batch).unwrap();
        assert_eq!(load_world(&store).unwrap(), world);
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn malformed_documents_surface_as_consistency_errors() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(&[faction("a")]).unwrap();
        store.commit(&batch).unwrap();
        store
            .collections
            .write()
            .unwrap()
            .insert("legions", vec![serde_json::json!({ "id": 3 })]);
        assert!(matches!(
            load_all::<Legion, _>(&store),
            Err(GameError::Consistency(_))
        ));
    }
}
