use tenka_game::{
    ConflictError, CreateLegionRequest, EngineConfig, Equipment, ErrorKind, FactionId, GameError,
    LegionId, MemoryStore, Realm, SamuraiId, Scenario, SoldierUpdate, TerritoryId, audit,
};

fn realm() -> Realm<MemoryStore> {
    let store = MemoryStore::new();
    Scenario::bundled().unwrap().seed_store(&store).unwrap();
    Realm::new(store, EngineConfig::default_config()).unwrap()
}

fn oda() -> FactionId {
    FactionId::new("oda")
}

fn request(commander: &str, location: &str) -> CreateLegionRequest {
    CreateLegionRequest::new(
        oda(),
        SamuraiId::new(commander),
        "羽柴隊",
        800,
        Equipment::new(60, 20, 1),
        TerritoryId::new(location),
    )
    .unwrap()
}

#[test]
fn legion_lifecycle_keeps_the_world_consistent() {
    let realm = realm();
    let created = realm.create_legion(&request("hideyoshi", "nagoya")).unwrap();
    assert_eq!(created.legion.id, LegionId::new("legion-4"));
    assert!(audit(&realm.world().unwrap()).is_empty());

    let update = realm
        .update_legion_soldiers(&oda(), &created.legion.id, 1_200)
        .unwrap();
    assert!(matches!(
        update,
        SoldierUpdate::Adjusted {
            idle_soldiers: 1_300,
            ..
        }
    ));
    realm
        .update_legion_equipment(&oda(), &created.legion.id, Equipment::new(0, 0, 0))
        .unwrap();
    assert!(audit(&realm.world().unwrap()).is_empty());

    let disbanded = realm.disband_legion(&oda(), &created.legion.id).unwrap();
    assert_eq!(disbanded.returned_soldiers, 1_200);
    let world = realm.world().unwrap();
    assert!(audit(&world).is_empty());
    let faction = world.faction(&oda()).unwrap();
    assert_eq!(faction.idle_soldiers, 2_500);
    assert_eq!(faction.equipment, Equipment::new(300, 100, 4));
}

#[test]
fn forced_reassignment_leaves_the_old_legion_without_commander() {
    let realm = realm();
    let err = realm.create_legion(&request("katsuie", "nagoya")).unwrap_err();
    assert!(matches!(
        err,
        GameError::Conflict(ConflictError::CommanderAssigned { .. })
    ));

    let created = realm
        .create_legion(&request("katsuie", "nagoya").force_reassign(true))
        .unwrap();
    assert_eq!(created.displaced_from, Some(LegionId::new("legion-1")));
    let world = realm.world().unwrap();
    assert_eq!(
        world.legion(&LegionId::new("legion-1")).unwrap().commander_id,
        None
    );
    assert!(audit(&world).is_empty());
}

#[test]
fn rejected_requests_do_not_touch_the_store() {
    let realm = realm();
    let before = realm.world().unwrap();
    let commits = realm.store().commit_count();

    assert!(realm.create_legion(&request("hideyoshi", "kiyosu")).is_err());
    assert!(realm.create_legion(&request("hideyoshi", "kofu")).is_err());
    assert!(realm.create_legion(&request("kansuke", "nagoya")).is_err());
    assert_eq!(
        realm
            .disband_legion(&oda(), &LegionId::new("legion-2"))
            .unwrap_err()
            .kind(),
        ErrorKind::Conflict
    );
    assert_eq!(
        realm
            .disband_legion(&oda(), &LegionId::new("legion-99"))
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );

    assert_eq!(realm.world().unwrap(), before);
    assert_eq!(realm.store().commit_count(), commits);
}

#[test]
fn zero_soldiers_signals_disband_instead_of_storing_zero() {
    let realm = realm();
    let legion = LegionId::new("legion-1");
    assert_eq!(
        realm.update_legion_soldiers(&oda(), &legion, 0).unwrap(),
        SoldierUpdate::ShouldDisband {
            legion_id: legion.clone()
        }
    );
    assert_eq!(realm.world().unwrap().legion(&legion).unwrap().soldiers, 1_500);
}

#[test]
fn locked_game_rejects_legion_changes() {
    let realm = realm();
    realm.lock_game().unwrap();
    let err = realm.create_legion(&request("hideyoshi", "nagoya")).unwrap_err();
    assert!(matches!(err, GameError::Locked));
}
