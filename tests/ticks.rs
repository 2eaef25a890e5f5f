//! Sweep integration tests
//!
//! Sweeps are called directly with explicit timestamps. Each one must be
//! idempotent inside its interval, and a session reading the shared world
//! while a sweep runs must never see a half-applied change.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tidebound::core::{EngineConfig, SessionId, WorldId};
use tidebound::persistence::GameStore;
use tidebound::session::{Engine, GameCommand};
use tidebound::tick::{evolution_sweep, harvest_sweep, tide_sweep, upkeep_sweep};
use tidebound::world::{SharedWorld, Village, Villager, VillagerRole};

const VILLAGE: &str = "Ola's Village";

fn engine_with_player(save: &str) -> (Engine, SessionId, SharedWorld) {
    let config = EngineConfig {
        rng_seed: Some(77),
        ..EngineConfig::default()
    };
    let engine = Engine::in_memory(config).unwrap();
    let id = engine.create_local_session(save).unwrap();
    engine.process_command(id, GameCommand::init());
    engine.process_command(id, GameCommand::select("n"));
    engine.process_command(id, GameCommand::input("Ola"));
    let world = engine.world(&WorldId::Local(save.into())).unwrap();
    assert!(world.read().villages.contains_key(VILLAGE));
    (engine, id, world)
}

fn add_harvester(world: &SharedWorld, efficiency: i32) {
    let mut snapshot = world.write();
    let village = snapshot.villages.get_mut(VILLAGE).unwrap();
    village.villagers.push(Villager {
        name: "Pell".into(),
        role: VillagerRole::Harvester,
        level: 1,
        efficiency,
        harvest_type: Some("wood".into()),
    });
    village.stockpile.clear();
    village.last_harvest_time = 0;
}

#[test]
fn test_harvest_sweep_is_idempotent_within_interval() {
    let (engine, _id, world) = engine_with_player("harvest");
    add_harvester(&world, 4);

    let first = harvest_sweep(&engine, 600);
    assert_eq!(first.touched, 1);
    assert_eq!(first.failures, 0);
    assert_eq!(world.read().villages[VILLAGE].resource("wood"), 4);

    let second = harvest_sweep(&engine, 610);
    assert_eq!(second.touched, 0);
    assert_eq!(world.read().villages[VILLAGE].resource("wood"), 4);

    let saved = engine.store().load_all_villages(world.id()).unwrap();
    assert_eq!(saved[VILLAGE].resource("wood"), 4);
}

#[test]
fn test_tide_sweep_runs_once_per_interval() {
    let (engine, _id, world) = engine_with_player("tide");
    world.write().villages.get_mut(VILLAGE).unwrap().last_tide_time = 0;

    let first = tide_sweep(&engine, 10_000);
    assert_eq!(first.touched, 1);
    assert_eq!(world.read().villages[VILLAGE].last_tide_time, 10_000);

    let second = tide_sweep(&engine, 10_001);
    assert_eq!(second.touched, 0);
}

#[test]
fn test_upkeep_and_evolution_respect_their_gates() {
    let (engine, _id, world) = engine_with_player("upkeep");
    let now = tidebound::core::now_unix() + 10 * engine.config().upkeep_interval_secs as i64;
    {
        let mut snapshot = world.write();
        for location in snapshot.locations.values_mut() {
            location.last_evolution_time = 0;
        }
    }

    let upkeep = upkeep_sweep(&engine, now);
    assert!(upkeep.touched >= 1);
    assert_eq!(world.read().villages[VILLAGE].last_upkeep_time, now);

    let bouts = evolution_sweep(&engine, now);
    assert!(bouts.touched >= 1);
    let again = evolution_sweep(&engine, now);
    assert_eq!(again.touched, 0);
}

#[test]
fn test_readers_never_see_a_partial_harvest() {
    let (engine, _id, world) = engine_with_player("torn");
    add_harvester(&world, 3);
    let interval = engine.config().harvest_min_interval_secs;
    let done = Arc::new(AtomicBool::new(false));

    thread::scope(|scope| {
        let reader_world = world.clone();
        let reader_done = Arc::clone(&done);
        scope.spawn(move || {
            while !reader_done.load(Ordering::SeqCst) {
                let snapshot = reader_world.read();
                let village = &snapshot.villages[VILLAGE];
                let rounds = village.last_harvest_time / interval;
                assert_eq!(village.resource("wood") as i64, rounds * 3);
            }
        });

        for round in 1..=50 {
            let report = harvest_sweep(&engine, round * interval);
            assert_eq!(report.touched, 1);
        }
        done.store(true, Ordering::SeqCst);
    });

    assert_eq!(world.read().villages[VILLAGE].resource("wood"), 150);
}

#[test]
fn test_readers_never_see_a_partial_tide() {
    let (engine, _id, world) = engine_with_player("tide_read");
    let interval = {
        let mut snapshot = world.write();
        let village = snapshot.villages.get_mut(VILLAGE).unwrap();
        village.last_tide_time = 0;
        for kind in ["wood", "stone", "ore"] {
            village.add_resource(kind, 5_000);
        }
        village.tide_interval
    };
    let done = Arc::new(AtomicBool::new(false));

    thread::scope(|scope| {
        let reader_world = world.clone();
        let reader_done = Arc::clone(&done);
        scope.spawn(move || {
            // Every tide stamps a new time, so one stamp means one village state
            let mut seen: BTreeMap<i64, Village> = BTreeMap::new();
            while !reader_done.load(Ordering::SeqCst) {
                let village = reader_world.read().villages[VILLAGE].clone();
                let first = seen.entry(village.last_tide_time).or_insert_with(|| village.clone());
                assert_eq!(*first, village);
            }
        });

        for round in 1..=30 {
            let report = tide_sweep(&engine, round * interval);
            assert_eq!(report.touched, 1);
            assert_eq!(report.failures, 0);
        }
        done.store(true, Ordering::SeqCst);
    });

    assert_eq!(world.read().villages[VILLAGE].last_tide_time, 30 * interval);
}

#[test]
fn test_sweeps_and_sessions_interleave() {
    let (engine, id, world) = engine_with_player("busy");
    add_harvester(&world, 2);
    let engine = Arc::new(engine);

    thread::scope(|scope| {
        let sweeper = Arc::clone(&engine);
        scope.spawn(move || {
            for round in 1..=20 {
                harvest_sweep(&sweeper, round * 60);
                evolution_sweep(&sweeper, round * 10_000);
            }
        });
        let player = Arc::clone(&engine);
        scope.spawn(move || {
            for _ in 0..20 {
                player.process_command(id, GameCommand::select("7"));
                player.process_command(id, GameCommand::select("0"));
                player.process_command(id, GameCommand::select("8"));
            }
        });
    });

    let snapshot = world.read();
    assert_eq!(snapshot.villages[VILLAGE].resource("wood"), 40);
    assert!(snapshot.locations.values().all(|l| l.is_base() || !l.monsters.is_empty()));
}
