//! The `Realm` orchestrator.
//!
//! Every mutation runs under one global write lock for the whole
//! load-validate-mutate-persist cycle. Reads load the store directly and
//! never take the lock.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::aggregate::{FactionDashboard, FactionData, compute_for_world, faction_dashboard};
use crate::audit::audit;
use crate::config::EngineConfig;
use crate::economy::{self, PurchaseReceipt, TaxChange, TaxRate};
use crate::error::{ConflictError, GameError};
use crate::ids::{FactionId, LegionId, OperationId, SnapshotId};
use crate::investment::{
    InvestmentPreview, InvestmentRequest, InvestmentResult, RollSource, execute_in_world,
    preview_in_world,
};
use crate::legion::{
    self, CreateLegionRequest, EquipmentUpdate, LegionCreated, LegionDisbanded, SoldierUpdate,
};
use crate::model::{Equipment, World};
use crate::oplog::{OperationKind, OperationLog, OperationRecord};
use crate::products::{ProductCatalog, SpecialProduct};
use crate::runtime::{RuntimeState, Session};
use crate::settlement::{SettlementReport, settle};
use crate::snapshot::{Snapshot, SnapshotShelf, SnapshotSummary};
use crate::store::{DocumentStore, WriteBatch, load_all, load_world, world_batch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport {
    pub operation_id: OperationId,
    pub restored_from: SnapshotId,
    pub restored_year: u32,
    /// Pre-rollback state, so the rollback itself can be undone.
    pub safety_snapshot: SnapshotId,
    pub pruned_snapshots: Vec<SnapshotId>,
}

fn next_operation_id(history: &OperationLog, shelf: &SnapshotShelf) -> OperationId {
    history
        .last_id()
        .max(shelf.last_operation())
        .unwrap_or_default()
        .next()
}

/// Everything a year advance changes after its pre-image is on disk.
fn settlement_batch(
    settled: &World,
    history: &OperationLog,
    shelf: &SnapshotShelf,
) -> Result<WriteBatch, serde_json::Error> {
    let mut batch = WriteBatch::new();
    batch
        .put(&settled.factions)?
        .put(&settled.territories)?
        .put(&settled.samurai)?
        .put(std::slice::from_ref(&settled.game))?
        .put(history.records())?
        .put(shelf.snapshots())?;
    Ok(batch)
}

/// Game engine bound to a document store.
pub struct Realm<S: DocumentStore> {
    store: S,
    config: EngineConfig,
    catalog: ProductCatalog,
    runtime: Mutex<RuntimeState>,
}

impl<S: DocumentStore> Realm<S> {
    /// Open an engine over `store`. The special-product table is read from
    /// the store, falling back to the bundled table when none is stored.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration or an unreadable store.
    pub fn new(store: S, config: EngineConfig) -> Result<Self, GameError> {
        config.validate()?;
        let stored: Vec<SpecialProduct> = load_all(&store)?;
        let catalog = if stored.is_empty() {
            ProductCatalog::new(ProductCatalog::bundled_products())
        } else {
            ProductCatalog::new(stored)
        };
        let runtime = RuntimeState::from_config(&config);
        Ok(Self {
            store,
            config,
            catalog,
            runtime: Mutex::new(runtime),
        })
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    fn runtime(&self) -> MutexGuard<'_, RuntimeState> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit_with_retry(&self, batch: &WriteBatch) -> Result<(), S::Error> {
        let attempts = self.config.batch_write_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.commit(batch) {
                Ok(()) => return Ok(()),
                Err(err) if attempt < attempts => {
                    log::warn!(
                        "write of {:?} failed (attempt {attempt}/{attempts}): {err}",
                        batch.collection_names()
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn persist(&self, batch: &WriteBatch) -> Result<(), GameError> {
        self.commit_with_retry(batch).map_err(GameError::storage)
    }

    fn load_history(&self) -> Result<OperationLog, GameError> {
        Ok(OperationLog::from_records(
            load_all(&self.store)?,
            self.config.operation_log_cap,
        ))
    }

    fn load_shelf(&self) -> Result<SnapshotShelf, GameError> {
        Ok(SnapshotShelf::new(load_all(&self.store)?))
    }

    /// Run a player mutation under the lock and persist the world when it
    /// succeeds. `on_commit` runs only after the write landed.
    fn player_action<T>(
        &self,
        action: impl FnOnce(&mut World, &mut RuntimeState) -> Result<T, GameError>,
        on_commit: impl FnOnce(&T, &mut RuntimeState),
    ) -> Result<T, GameError> {
        let mut runtime = self.runtime();
        let mut world = load_world(&self.store)?;
        if world.game.locked {
            return Err(GameError::Locked);
        }
        runtime.tax_changes.align_year(world.game.year);
        let outcome = action(&mut world, &mut runtime)?;
        self.persist(&world_batch(&world).map_err(GameError::storage)?)?;
        on_commit(&outcome, &mut runtime);
        Ok(outcome)
    }

    /// Replace every game collection with `world` after auditing it.
    ///
    /// # Errors
    ///
    /// `Consistency` when the world breaks an invariant.
    pub fn install_world(&self, world: &World) -> Result<(), GameError> {
        let findings = audit(world);
        if !findings.is_empty() {
            return Err(GameError::Consistency(findings.join("; ")));
        }
        let mut runtime = self.runtime();
        self.persist(&world_batch(world).map_err(GameError::storage)?)?;
        runtime.tax_changes.reset(world.game.year);
        log::info!(
            "installed world: year {}, {} factions, {} territories",
            world.game.year,
            world.factions.len(),
            world.territories.len()
        );
        Ok(())
    }

    /// Current state of every game collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn world(&self) -> Result<World, GameError> {
        load_world(&self.store)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown faction.
    pub fn compute_faction_data(&self, faction_id: &FactionId) -> Result<FactionData, GameError> {
        let world = self.world()?;
        let faction = world.faction(faction_id)?;
        Ok(compute_for_world(
            &world,
            faction,
            &self.catalog,
            &self.config.maintenance,
        ))
    }

    /// Dashboard view; `None` for an unknown faction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn faction_dashboard(
        &self,
        faction_id: &FactionId,
    ) -> Result<Option<FactionDashboard>, GameError> {
        let world = self.world()?;
        Ok(faction_dashboard(
            &world,
            faction_id,
            &self.catalog,
            &self.config.maintenance,
        ))
    }

    /// # Errors
    ///
    /// As [`preview_in_world`].
    pub fn investment_preview(
        &self,
        request: &InvestmentRequest,
    ) -> Result<InvestmentPreview, GameError> {
        preview_in_world(&self.world()?, request, &self.config.investment)
    }

    /// Execute with the engine's seeded dice.
    ///
    /// # Errors
    ///
    /// `Locked` while the game is locked, otherwise as [`execute_in_world`].
    pub fn execute_investment(
        &self,
        request: &InvestmentRequest,
    ) -> Result<InvestmentResult, GameError> {
        let result = self.player_action(
            |world, runtime| {
                execute_in_world(world, request, &self.config.investment, &mut runtime.dice)
            },
            |_, _| {},
        )?;
        log_investment(&result);
        Ok(result)
    }

    /// Execute with a caller-supplied roll source.
    ///
    /// # Errors
    ///
    /// As [`Realm::execute_investment`].
    pub fn execute_investment_with(
        &self,
        request: &InvestmentRequest,
        dice: &mut dyn RollSource,
    ) -> Result<InvestmentResult, GameError> {
        let result = self.player_action(
            |world, _| execute_in_world(world, request, &self.config.investment, dice),
            |_, _| {},
        )?;
        log_investment(&result);
        Ok(result)
    }

    /// # Errors
    ///
    /// `Locked` while the game is locked, otherwise as
    /// [`legion::create_legion`].
    pub fn create_legion(&self, request: &CreateLegionRequest) -> Result<LegionCreated, GameError> {
        let created = self.player_action(
            |world, _| legion::create_legion(world, request),
            |_, _| {},
        )?;
        log::info!(
            "legion {} created for {}",
            created.legion.id,
            created.legion.faction_id
        );
        Ok(created)
    }

    /// # Errors
    ///
    /// `Locked` while the game is locked, otherwise as
    /// [`legion::disband_legion`].
    pub fn disband_legion(
        &self,
        faction_id: &FactionId,
        legion_id: &LegionId,
    ) -> Result<LegionDisbanded, GameError> {
        let disbanded = self.player_action(
            |world, _| legion::disband_legion(world, faction_id, legion_id),
            |_, _| {},
        )?;
        log::info!("legion {legion_id} disbanded by {faction_id}");
        Ok(disbanded)
    }

    /// # Errors
    ///
    /// `Locked` while the game is locked, otherwise as
    /// [`legion::update_legion_soldiers`].
    pub fn update_legion_soldiers(
        &self,
        faction_id: &FactionId,
        legion_id: &LegionId,
        soldiers: i64,
    ) -> Result<SoldierUpdate, GameError> {
        self.player_action(
            |world, _| legion::update_legion_soldiers(world, faction_id, legion_id, soldiers),
            |_, _| {},
        )
    }

    /// # Errors
    ///
    /// `Locked` while the game is locked, otherwise as
    /// [`legion::update_legion_equipment`].
    pub fn update_legion_equipment(
        &self,
        faction_id: &FactionId,
        legion_id: &LegionId,
        equipment: Equipment,
    ) -> Result<EquipmentUpdate, GameError> {
        self.player_action(
            |world, _| legion::update_legion_equipment(world, faction_id, legion_id, equipment),
            |_, _| {},
        )
    }

    /// # Errors
    ///
    /// `Locked` while the game is locked, `NotFound` for an unknown faction,
    /// `Conflict` when the treasury cannot cover the order.
    pub fn purchase_equipment(
        &self,
        faction_id: &FactionId,
        order: Equipment,
    ) -> Result<PurchaseReceipt, GameError> {
        self.player_action(
            |world, _| {
                economy::purchase_equipment(
                    world.faction_mut(faction_id)?,
                    order,
                    &self.config.prices,
                )
            },
            |_, _| {},
        )
    }

    /// # Errors
    ///
    /// `Validation` for a rate other than 40, 60 or 80; `Conflict` when the
    /// faction already changed its rate this year.
    pub fn change_tax_rate(
        &self,
        faction_id: &FactionId,
        rate: i64,
    ) -> Result<TaxChange, GameError> {
        let rate = TaxRate::try_from(rate)?;
        self.player_action(
            |world, runtime| {
                economy::change_tax_rate(world.faction_mut(faction_id)?, rate, &runtime.tax_changes)
            },
            |change, runtime| runtime.tax_changes.record(&change.faction_id),
        )
    }

    /// Settle every faction and move to the next year.
    ///
    /// # Errors
    ///
    /// `Conflict` when no factions exist. `SettlementAborted` carries the
    /// pre-advance snapshot when the settlement write fails; nothing but
    /// that snapshot is persisted in that case.
    pub fn advance_year(&self) -> Result<SettlementReport, GameError> {
        let mut runtime = self.runtime();
        let world = load_world(&self.store)?;
        if world.factions.is_empty() {
            return Err(ConflictError::NoFactions.into());
        }
        let next_year = world
            .game
            .year
            .checked_add(1)
            .ok_or_else(|| GameError::Consistency("year counter overflow".into()))?;

        let mut history = self.load_history()?;
        let mut shelf = self.load_shelf()?;
        let operation_id = next_operation_id(&history, &shelf);
        let now = Utc::now();
        let snapshot = Snapshot::capture(operation_id, now, &world)?;
        let snapshot_id = snapshot.id.clone();
        shelf.push(snapshot);
        let mut batch = WriteBatch::new();
        batch.put(shelf.snapshots()).map_err(GameError::storage)?;
        self.persist(&batch)?;

        let (mut settled, factions) = settle(&world, &self.catalog, &self.config.maintenance);
        settled.game.year = next_year;
        history.append(OperationRecord {
            id: operation_id,
            kind: OperationKind::AdvanceYear,
            at: now,
            summary: format!("advanced year {} -> {next_year}", world.game.year),
            snapshot_id: Some(snapshot_id.clone()),
        });
        let pruned_snapshots = shelf.retain_newest(self.config.rollback_horizon);
        let batch = settlement_batch(&settled, &history, &shelf).map_err(GameError::storage)?;
        self.commit_with_retry(&batch)
            .map_err(|err| GameError::SettlementAborted {
                snapshot_id: snapshot_id.clone(),
                source: Box::new(err),
            })?;
        runtime.tax_changes.reset(next_year);

        if !pruned_snapshots.is_empty() {
            log::debug!("pruned snapshots {pruned_snapshots:?}");
        }
        log::info!(
            "year {} settled as {operation_id}; {} factions, snapshot {snapshot_id}",
            world.game.year,
            factions.len()
        );
        Ok(SettlementReport {
            operation_id,
            snapshot_id,
            settled_year: world.game.year,
            new_year: next_year,
            factions,
            pruned_snapshots,
        })
    }

    fn set_locked(&self, locked: bool) -> Result<OperationRecord, GameError> {
        let _runtime = self.runtime();
        let mut game = load_world(&self.store)?.game;
        game.locked = locked;
        let mut history = self.load_history()?;
        let shelf = self.load_shelf()?;
        let (kind, summary) = if locked {
            (OperationKind::Lock, format!("locked in year {}", game.year))
        } else {
            (OperationKind::Unlock, format!("unlocked in year {}", game.year))
        };
        let record = OperationRecord {
            id: next_operation_id(&history, &shelf),
            kind,
            at: Utc::now(),
            summary,
            snapshot_id: None,
        };
        history.append(record.clone());
        let mut batch = WriteBatch::new();
        batch
            .put(std::slice::from_ref(&game))
            .and_then(|batch| batch.put(history.records()))
            .map_err(GameError::storage)?;
        self.persist(&batch)?;
        log::info!("{}", record.summary);
        Ok(record)
    }

    /// Block player mutations. Administrator operations keep working.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn lock_game(&self) -> Result<OperationRecord, GameError> {
        self.set_locked(true)
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn unlock_game(&self) -> Result<OperationRecord, GameError> {
        self.set_locked(false)
    }

    /// Restore every collection from the snapshot taken before `operation`.
    ///
    /// The current state is snapshotted first, so the rollback can itself be
    /// rolled back. The operation log is not rewound.
    ///
    /// # Errors
    ///
    /// `NotFound` when no snapshot is retained for the operation,
    /// `Consistency` when its digest does not verify.
    pub fn rollback_to_operation(
        &self,
        operation: OperationId,
    ) -> Result<RollbackReport, GameError> {
        let mut runtime = self.runtime();
        let current = load_world(&self.store)?;
        let mut history = self.load_history()?;
        let mut shelf = self.load_shelf()?;
        let target = shelf.for_operation(operation)?.clone();
        target.verify()?;

        let operation_id = next_operation_id(&history, &shelf);
        let now = Utc::now();
        let safety = Snapshot::capture(operation_id, now, &current)?;
        let safety_snapshot = safety.id.clone();
        shelf.push(safety);
        history.append(OperationRecord {
            id: operation_id,
            kind: OperationKind::Rollback,
            at: now,
            summary: format!(
                "restored {} (year {})",
                target.id, target.world.game.year
            ),
            snapshot_id: Some(safety_snapshot.clone()),
        });
        let pruned_snapshots = shelf.retain_newest(self.config.rollback_horizon);

        let mut batch = world_batch(&target.world).map_err(GameError::storage)?;
        batch
            .put(history.records())
            .and_then(|batch| batch.put(shelf.snapshots()))
            .map_err(GameError::storage)?;
        self.persist(&batch)?;
        runtime.tax_changes.reset(target.world.game.year);

        log::info!(
            "rolled back to {} (year {}) as {operation_id}",
            target.id,
            target.world.game.year
        );
        Ok(RollbackReport {
            operation_id,
            restored_from: target.id,
            restored_year: target.world.game.year,
            safety_snapshot,
            pruned_snapshots,
        })
    }

    /// Retained snapshots, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>, GameError> {
        Ok(self.load_shelf()?.newest_first())
    }

    /// Operation history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn operations(&self) -> Result<Vec<OperationRecord>, GameError> {
        Ok(self.load_history()?.newest_first())
    }

    /// Compare a login code against the one stored for the faction.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown faction.
    pub fn verify_login_code(&self, faction_id: &FactionId, code: &str) -> Result<bool, GameError> {
        let world = self.world()?;
        world.faction(faction_id)?;
        Ok(world
            .game
            .login_codes
            .get(faction_id)
            .is_some_and(|stored| stored == code))
    }

    /// Bind a caller-issued token to a faction.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown faction.
    pub fn open_session(&self, token: &str, faction_id: &FactionId) -> Result<Session, GameError> {
        self.world()?.faction(faction_id)?;
        Ok(self
            .runtime()
            .sessions
            .open(token, faction_id.clone(), Utc::now()))
    }

    pub fn resolve_session(&self, token: &str) -> Option<FactionId> {
        self.runtime().sessions.resolve(token, Utc::now())
    }

    pub fn close_session(&self, token: &str) -> bool {
        self.runtime().sessions.close(token)
    }
}

fn log_investment(result: &InvestmentResult) {
    log::info!(
        "{} invested in {} via {}: roll {} -> {:?}, {:+} points",
        result.faction_id,
        result.category,
        result.samurai_id,
        result.roll,
        result.outcome,
        result.points_gained
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::investment::ScriptedRolls;
    use crate::scenario::Scenario;
    use crate::store::MemoryStore;

    fn realm() -> Realm<MemoryStore> {
        let store = MemoryStore::new();
        let scenario = Scenario::bundled().unwrap();
        scenario.seed_store(&store).unwrap();
        Realm::new(store, EngineConfig::default_config()).unwrap()
    }

    #[test]
    fn lock_blocks_players_but_not_administrators() {
        let realm = realm();
        realm.lock_game().unwrap();
        let err = realm
            .purchase_equipment(&FactionId::new("oda"), Equipment::new(1, 0, 0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Locked);
        assert!(realm.advance_year().is_ok());
        realm.unlock_game().unwrap();
        assert!(
            realm
                .purchase_equipment(&FactionId::new("oda"), Equipment::new(1, 0, 0))
                .is_ok()
        );
        let kinds: Vec<OperationKind> = realm.operations().unwrap().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::Unlock,
                OperationKind::AdvanceYear,
                OperationKind::Lock
            ]
        );
    }

    #[test]
    fn tax_rate_changes_once_per_year() {
        let realm = realm();
        let oda = FactionId::new("oda");
        assert!(matches!(
            realm.change_tax_rate(&oda, 55),
            Err(GameError::Validation(_))
        ));
        realm.change_tax_rate(&oda, 80).unwrap();
        assert!(matches!(
            realm.change_tax_rate(&oda, 40),
            Err(GameError::Conflict(ConflictError::TaxRateAlreadyChanged { .. }))
        ));
        realm.advance_year().unwrap();
        let change = realm.change_tax_rate(&oda, 40).unwrap();
        assert_eq!((change.previous, change.current), (80, 40));
    }

    #[test]
    fn failed_settlement_reports_snapshot_and_keeps_year() {
        let realm = realm();
        let before = realm.world().unwrap();
        // The snapshot write lands, then every settlement attempt fails.
        realm.store().fail_commits_after(1, 2);
        let err = realm.advance_year().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        let GameError::SettlementAborted { snapshot_id, .. } = &err else {
            panic!("expected SettlementAborted, got {err:?}");
        };
        assert_eq!(realm.world().unwrap(), before);
        let listed = realm.list_snapshots().unwrap();
        assert_eq!(&listed[0].id, snapshot_id);
        assert_eq!(listed[0].year, 1);
        assert!(realm.operations().unwrap().is_empty());
    }

    #[test]
    fn failed_settlement_then_retry_settles_the_year_once() {
        let reference = realm();
        reference.advance_year().unwrap();
        let expected = reference.world().unwrap();

        let realm = realm();
        realm.store().fail_commits_after(1, 2);
        assert!(realm.advance_year().is_err());
        let report = realm.advance_year().unwrap();
        assert_eq!((report.settled_year, report.new_year), (1, 2));
        assert_eq!(realm.world().unwrap(), expected);
        assert_eq!(realm.operations().unwrap().len(), 1);
    }

    #[test]
    fn advance_is_all_or_nothing_at_every_write() {
        for successes in 0..=3 {
            let realm = realm();
            let before = realm.world().unwrap();
            realm.store().fail_commits_after(successes, 10);
            match realm.advance_year() {
                Ok(report) => {
                    assert_eq!(report.new_year, 2, "successes={successes}");
                    assert_eq!(realm.world().unwrap().game.year, 2);
                    assert_eq!(realm.operations().unwrap().len(), 1);
                }
                Err(_) => {
                    assert_eq!(realm.world().unwrap(), before, "successes={successes}");
                    assert!(realm.operations().unwrap().is_empty());
                }
            }
        }
    }

    #[test]
    fn advance_writes_pre_image_then_one_settlement_batch() {
        let realm = realm();
        let commits = realm.store().commit_count();
        realm.advance_year().unwrap();
        assert_eq!(realm.store().commit_count(), commits + 2);
        let records = realm.store().raw("operation_log");
        assert_eq!(records.len(), 1);
        assert_eq!(realm.store().raw("game_state")[0]["year"], 2);
    }

    #[test]
    fn settlement_write_is_retried() {
        let realm = realm();
        realm.store().fail_commits_after(1, 1);
        let report = realm.advance_year().unwrap();
        assert_eq!(report.new_year, 2);
        assert_eq!(realm.world().unwrap().game.year, 2);
    }

    #[test]
    fn sessions_require_known_factions() {
        let realm = realm();
        assert!(matches!(
            realm.open_session("t", &FactionId::new("hojo")),
            Err(GameError::NotFound { .. })
        ));
        realm.open_session("t", &FactionId::new("oda")).unwrap();
        assert_eq!(realm.resolve_session("t"), Some(FactionId::new("oda")));
        assert!(realm.close_session("t"));
        assert_eq!(realm.resolve_session("t"), None);
    }

    #[test]
    fn login_codes_verify_against_game_state() {
        let realm = realm();
        let oda = FactionId::new("oda");
        let code = realm.world().unwrap().game.login_codes[&oda].clone();
        assert!(realm.verify_login_code(&oda, &code).unwrap());
        assert!(!realm.verify_login_code(&oda, "wrong").unwrap());
    }

    #[test]
    fn scripted_investment_persists() {
        let realm = realm();
        let request = InvestmentRequest::new(
            FactionId::new("oda"),
            crate::ids::SamuraiId::new("hideyoshi"),
            "commerce",
            None,
        )
        .unwrap();
        let mut dice = ScriptedRolls::new([1]);
        let result = realm.execute_investment_with(&request, &mut dice).unwrap();
        let world = realm.world().unwrap();
        let oda = world.faction(&FactionId::new("oda")).unwrap();
        assert_eq!(oda.points.commerce, result.points_after);
        assert_eq!(oda.treasury, result.treasury_after);
        assert!(matches!(
            realm.execute_investment_with(&request, &mut dice),
            Err(GameError::Conflict(ConflictError::SamuraiExhausted { .. }))
        ));
    }
}
