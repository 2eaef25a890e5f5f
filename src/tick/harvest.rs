//! Harvest sweep: harvesters deliver into their village stockpile

use tracing::{debug, info, info_span};

use crate::broadcast::Audience;
use crate::core::types::{GameMessage, MessageCategory, UnixSeconds};
use crate::session::engine::Engine;
use crate::session::protocol::GameResponse;
use crate::tick::{for_each_world, save_villages, SweepReport};

/// Collect from every village whose harvest interval has elapsed
pub fn harvest_sweep(engine: &Engine, now: UnixSeconds) -> SweepReport {
    let span = info_span!("harvest_sweep");
    let _guard = span.enter();
    let min_interval = engine.config().harvest_min_interval_secs;

    let report = for_each_world(engine, "harvest", |world, report| {
        let harvested: Vec<_> = {
            let mut snapshot = world.write();
            snapshot
                .villages
                .values_mut()
                .filter_map(|village| {
                    let collected = village.harvest(now, min_interval)?;
                    Some((village.clone(), collected))
                })
                .collect()
        };
        if harvested.is_empty() {
            return Ok(());
        }

        report.touched += harvested.len();
        let villages: Vec<_> = harvested.iter().map(|(v, _)| v.clone()).collect();
        save_villages(engine, world.id(), &villages, report);

        for (village, collected) in harvested {
            let summary = collected
                .iter()
                .map(|(kind, amount)| format!("{} {}", amount, kind))
                .collect::<Vec<_>>()
                .join(", ");
            debug!(village = %village.name, %summary, "harvested");
            let message = GameMessage::new(
                format!("{} harvested {}.", village.name, summary),
                MessageCategory::Loot,
            );
            engine.hub().publish(
                Audience::World(world.id().clone()),
                GameResponse::broadcast("harvest_tick", vec![message]).village(&village),
            );
        }
        Ok(())
    });

    info!(
        worlds = report.worlds,
        villages = report.touched,
        failures = report.failures,
        "harvest sweep finished"
    );
    report
}
