//! Broadcast integration tests
//!
//! Subscriptions are registered through the engine; pushes come from the
//! join announcement and from the sweeps.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tidebound::broadcast::Delivery;
use tidebound::core::{EngineConfig, SessionId, WorldId};
use tidebound::session::{Engine, GameCommand, GameResponse, ResponseKind};
use tidebound::tick::{harvest_sweep, tide_sweep};
use tidebound::world::{Villager, VillagerRole};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(150);

fn channel() -> (Delivery, mpsc::Receiver<GameResponse>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let deliver: Delivery = Arc::new(move |response: GameResponse| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(response);
        }
    });
    (deliver, rx)
}

fn engine() -> Engine {
    let config = EngineConfig {
        rng_seed: Some(3),
        ..EngineConfig::default()
    };
    Engine::in_memory(config).unwrap()
}

fn join(engine: &Engine, save: &str, name: &str) -> SessionId {
    let id = engine.create_local_session(save).unwrap();
    engine.process_command(id, GameCommand::init());
    engine.process_command(id, GameCommand::select("n"));
    let response = engine.process_command(id, GameCommand::input(name));
    assert_eq!(response.screen(), "main_menu");
    id
}

/// Next push with the given screen, skipping unrelated ones
fn expect_screen(rx: &mpsc::Receiver<GameResponse>, screen: &str) -> GameResponse {
    loop {
        let response = rx.recv_timeout(WAIT).unwrap();
        if response.screen() == screen {
            return response;
        }
    }
}

#[test]
fn test_join_is_announced_to_everyone_else() {
    let engine = engine();
    let watcher = join(&engine, "north", "Quill");
    let (deliver, rx) = channel();
    engine.subscribe(watcher, deliver).unwrap();

    let newcomer = engine.create_local_session("south").unwrap();
    let (deliver_new, rx_new) = channel();
    engine.subscribe(newcomer, deliver_new).unwrap();
    engine.process_command(newcomer, GameCommand::init());
    engine.process_command(newcomer, GameCommand::select("n"));
    engine.process_command(newcomer, GameCommand::input("Rook"));

    let push = expect_screen(&rx, "player_joined");
    assert_eq!(push.kind, ResponseKind::Broadcast);
    assert!(push.messages[0].text.contains("Rook has entered the game"));
    assert!(rx_new.recv_timeout(QUIET).is_err());
}

#[test]
fn test_harvest_push_reaches_only_that_world() {
    let engine = engine();
    let north = join(&engine, "north", "Sable");
    let south = join(&engine, "south", "Tarn");
    let (deliver_n, rx_n) = channel();
    let (deliver_s, rx_s) = channel();
    engine.subscribe(north, deliver_n).unwrap();
    engine.subscribe(south, deliver_s).unwrap();

    let world = engine.world(&WorldId::Local("north".into())).unwrap();
    {
        let mut snapshot = world.write();
        let village = snapshot.villages.get_mut("Sable's Village").unwrap();
        village.villagers.push(Villager {
            name: "Umber".into(),
            role: VillagerRole::Harvester,
            level: 1,
            efficiency: 5,
            harvest_type: Some("stone".into()),
        });
        village.last_harvest_time = 0;
    }
    assert_eq!(harvest_sweep(&engine, 1_000).touched, 1);

    let push = expect_screen(&rx_n, "harvest_tick");
    let view = push.state.village.expect("village view attached");
    assert_eq!(view.name, "Sable's Village");
    assert!(push.messages[0].text.contains("5 stone"));

    while let Ok(other) = rx_s.recv_timeout(QUIET) {
        assert_ne!(other.screen(), "harvest_tick");
    }
}

#[test]
fn test_tide_result_is_pushed() {
    let engine = engine();
    let id = join(&engine, "tides", "Vale");
    let (deliver, rx) = channel();
    engine.subscribe(id, deliver).unwrap();

    let world = engine.world(&WorldId::Local("tides".into())).unwrap();
    world.write().villages.get_mut("Vale's Village").unwrap().last_tide_time = 0;
    assert_eq!(tide_sweep(&engine, 50_000).touched, 1);

    let push = expect_screen(&rx, "tide_resolved");
    assert!(!push.messages.is_empty());
    assert!(push.state.village.is_some());
}

#[test]
fn test_removed_session_gets_nothing() {
    let engine = engine();
    let id = join(&engine, "gone", "Wren");
    let (deliver, rx) = channel();
    engine.subscribe(id, deliver).unwrap();
    engine.remove_session(&id).unwrap();
    assert!(!engine.hub().is_subscribed(&id));

    join(&engine, "gone", "Xan");
    assert!(rx.recv_timeout(QUIET).is_err());
}
