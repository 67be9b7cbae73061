use tenka_game::{
    ConflictError, EngineConfig, ErrorKind, FactionId, GameError, MemoryStore, OperationKind,
    Realm, Scenario, World,
};

fn realm_with(config: EngineConfig) -> Realm<MemoryStore> {
    let store = MemoryStore::new();
    Scenario::bundled().unwrap().seed_store(&store).unwrap();
    Realm::new(store, config).unwrap()
}

fn realm() -> Realm<MemoryStore> {
    realm_with(EngineConfig::default_config())
}

#[test]
fn two_advances_then_rollback_restores_the_first_pre_image() {
    let realm = realm();
    let pristine = realm.world().unwrap();

    let first = realm.advance_year().unwrap();
    let second = realm.advance_year().unwrap();
    assert_eq!((first.settled_year, first.new_year), (1, 2));
    assert_eq!((second.settled_year, second.new_year), (2, 3));
    assert!(second.operation_id > first.operation_id);
    assert_ne!(first.snapshot_id, second.snapshot_id);
    assert_eq!(realm.world().unwrap().game.year, 3);

    let rollback = realm.rollback_to_operation(first.operation_id).unwrap();
    assert_eq!(rollback.restored_from, first.snapshot_id);
    assert_eq!(rollback.restored_year, 1);
    assert_eq!(realm.world().unwrap(), pristine);

    let kinds: Vec<OperationKind> = realm
        .operations()
        .unwrap()
        .iter()
        .map(|record| record.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::Rollback,
            OperationKind::AdvanceYear,
            OperationKind::AdvanceYear
        ]
    );
}

#[test]
fn a_rollback_can_itself_be_undone() {
    let realm = realm();
    realm.advance_year().unwrap();
    let advanced: World = realm.world().unwrap();
    let first = realm.operations().unwrap()[0].id;

    let rollback = realm.rollback_to_operation(first).unwrap();
    assert_eq!(realm.world().unwrap().game.year, 1);
    realm.rollback_to_operation(rollback.operation_id).unwrap();
    assert_eq!(realm.world().unwrap(), advanced);
}

#[test]
fn treasuries_never_go_negative() {
    let realm = realm();
    for _ in 0..12 {
        let report = realm.advance_year().unwrap();
        for entry in &report.factions {
            assert!(entry.treasury_after >= 0);
        }
        for faction in realm.world().unwrap().factions {
            assert!(faction.treasury >= 0, "{} overdrawn", faction.id);
        }
    }
}

#[test]
fn settlement_report_matches_persisted_state() {
    let realm = realm();
    let before = realm.world().unwrap();
    let report = realm.advance_year().unwrap();
    let after = realm.world().unwrap();

    for entry in &report.factions {
        let pre = before.faction(&entry.faction_id).unwrap();
        let post = after.faction(&entry.faction_id).unwrap();
        assert_eq!(entry.treasury_before, pre.treasury);
        assert_eq!(entry.treasury_after, post.treasury);
        assert_eq!(
            entry.treasury_after,
            (pre.treasury + entry.income - entry.maintenance).max(0)
        );
        for growth in &entry.territories {
            let territory = after.territory(&growth.territory_id).unwrap();
            assert_eq!(territory.base_kokudaka, growth.base_after);
        }
    }
    // Unowned land does not grow.
    let ogaki = tenka_game::TerritoryId::new("ogaki");
    assert_eq!(
        before.territory(&ogaki).unwrap().base_kokudaka,
        after.territory(&ogaki).unwrap().base_kokudaka
    );
    // Buffs tick down: Rakuichi-rakuza had two years left.
    let oda = after.faction(&FactionId::new("oda")).unwrap();
    assert_eq!(oda.buffs[0].remaining_years, 1);
}

#[test]
fn snapshots_are_pruned_to_the_rollback_horizon() {
    let config = EngineConfig::from_json(r#"{ "rollback_horizon": 2 }"#).unwrap();
    let realm = realm_with(config);
    let first = realm.advance_year().unwrap();
    realm.advance_year().unwrap();
    let third = realm.advance_year().unwrap();
    assert_eq!(third.pruned_snapshots, vec![first.snapshot_id]);

    let listed = realm.list_snapshots().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, third.snapshot_id);
    assert_eq!(listed[0].year, 3);

    let err = realm.rollback_to_operation(first.operation_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn operation_log_is_capped() {
    let config = EngineConfig::from_json(r#"{ "operation_log_cap": 3 }"#).unwrap();
    let realm = realm_with(config);
    for _ in 0..5 {
        realm.advance_year().unwrap();
    }
    let operations = realm.operations().unwrap();
    assert_eq!(operations.len(), 3);
    assert_eq!(operations[0].summary, "advanced year 5 -> 6");
}

#[test]
fn advancing_an_empty_realm_is_a_conflict() {
    let realm = Realm::new(MemoryStore::new(), EngineConfig::default_config()).unwrap();
    assert!(matches!(
        realm.advance_year(),
        Err(GameError::Conflict(ConflictError::NoFactions))
    ));
    assert!(realm.list_snapshots().unwrap().is_empty());
}

#[test]
fn samurai_actions_are_restored_each_year() {
    let realm = realm();
    let request = tenka_game::InvestmentRequest::new(
        FactionId::new("takeda"),
        tenka_game::SamuraiId::new("kansuke"),
        "agriculture",
        None,
    )
    .unwrap();
    realm.execute_investment(&request).unwrap();
    assert!(realm.execute_investment(&request).is_err());

    let report = realm.advance_year().unwrap();
    let takeda = report.faction(&FactionId::new("takeda")).unwrap();
    assert_eq!(takeda.samurai_reset, 1);
    assert!(realm.execute_investment(&request).is_ok());
}

#[test]
fn interrupted_advance_does_not_pay_income_twice() {
    let clean = realm();
    clean.advance_year().unwrap();
    let treasuries = |world: &World| -> Vec<i64> {
        world.factions.iter().map(|faction| faction.treasury).collect()
    };
    let expected = treasuries(&clean.world().unwrap());

    let realm = realm();
    let before = realm.world().unwrap();
    // Pre-image lands, then both settlement attempts fail.
    realm.store().fail_commits_after(1, 2);
    let err = realm.advance_year().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert_eq!(realm.world().unwrap(), before);

    let report = realm.advance_year().unwrap();
    assert_eq!(report.settled_year, 1);
    let oda = FactionId::new("oda");
    let settled = report
        .factions
        .iter()
        .find(|entry| entry.faction_id == oda)
        .unwrap();
    assert_eq!(settled.treasury_before, before.faction(&oda).unwrap().treasury);
    assert_eq!(treasuries(&realm.world().unwrap()), expected);
}
