//! Upkeep sweep: guard recovery, spent traps and village upgrades, plus
//! turnover of the town inn

use rand::{Rng, RngCore};
use tracing::{debug, info, info_span, warn};

use crate::combat::guards::process_guard_recovery;
use crate::content::ContentGenerator;
use crate::core::types::UnixSeconds;
use crate::session::engine::Engine;
use crate::tick::{for_each_world, save_villages, SweepReport};
use crate::world::town::Town;
use crate::world::village::Village;

/// Level range of NPC guests who drift into the inn
const NPC_GUEST_LEVELS: std::ops::RangeInclusive<i32> = 1..=10;

/// One upkeep pass over a village
pub fn upkeep_village(village: &mut Village, now: UnixSeconds) {
    let recovered = process_guard_recovery(&mut village.active_guards);
    let removed = village.remove_spent_traps();
    let unlocked = village.upgrade();
    village.last_upkeep_time = now;
    debug!(
        village = %village.name,
        recovered = recovered.len(),
        traps_removed = removed.len(),
        unlocked = unlocked.len(),
        "village upkeep"
    );
}

/// Expel stale inn guests and top up NPC guests; returns (expelled, arrived)
pub fn upkeep_town<R: RngCore>(
    rng: &mut R,
    content: &dyn ContentGenerator,
    town: &mut Town,
    now: UnixSeconds,
    max_age: i64,
    min_npc_guests: usize,
) -> (usize, usize) {
    let expelled = town.expel_stale_guests(now, max_age);
    let mut arrived = 0;
    // Generated names can repeat; give up after a bounded number of draws.
    for _ in 0..min_npc_guests * 4 {
        if town.npc_guest_count() >= min_npc_guests {
            break;
        }
        let level = rng.gen_range(NPC_GUEST_LEVELS);
        let guest = content.inn_guest(rng, level, now);
        if town.find_guest(guest.name()).is_some() {
            continue;
        }
        town.inn_guests.push(guest);
        arrived += 1;
    }
    (expelled, arrived)
}

pub fn upkeep_sweep(engine: &Engine, now: UnixSeconds) -> SweepReport {
    let span = info_span!("upkeep_sweep");
    let _guard = span.enter();
    let interval = engine.config().upkeep_interval_secs as i64;

    let mut report = for_each_world(engine, "upkeep", |world, report| {
        let mut changed: Vec<Village> = Vec::new();
        {
            let mut snapshot = world.write();
            for village in snapshot.villages.values_mut() {
                if now - village.last_upkeep_time < interval {
                    continue;
                }
                upkeep_village(village, now);
                changed.push(village.clone());
            }
        }
        report.touched += changed.len();
        save_villages(engine, world.id(), &changed, report);
        Ok(())
    });

    let mut rng = engine.next_rng();
    let (town, expelled, arrived) = {
        let mut town = engine.town();
        let (expelled, arrived) = upkeep_town(
            &mut rng,
            engine.content(),
            &mut town,
            now,
            engine.config().inn_guest_max_age_secs,
            engine.config().inn_min_npc_guests,
        );
        (town.clone(), expelled, arrived)
    };
    if expelled + arrived > 0 {
        report.touched += expelled + arrived;
        if let Err(err) = engine.store().save_town(&town) {
            warn!(%err, "failed to save the town");
            report.failures += 1;
        }
    }

    info!(
        worlds = report.worlds,
        touched = report.touched,
        expelled,
        arrived,
        failures = report.failures,
        "upkeep sweep finished"
    );
    report
}
