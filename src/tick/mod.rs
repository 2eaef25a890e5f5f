//! Background world sweeps
//!
//! Every sweep is an ordinary function over `&Engine` that can be called
//! directly (tests, admin tools) or on a timer by `scheduler`. Each one is
//! gated on stored timestamps, so running it twice inside one interval does
//! nothing the second time.
//!
//! A sweep mutates the same `SharedWorld` that live sessions read, under the
//! world's write lock, then saves and publishes after the lock is released.
//! One failing world or village is logged and skipped.

pub mod evolution;
pub mod harvest;
pub mod scheduler;
pub mod tide;
pub mod upkeep;

use serde::Serialize;
use tracing::warn;

use crate::core::error::Result;
use crate::core::types::WorldId;
use crate::session::engine::Engine;
use crate::world::snapshot::SharedWorld;
use crate::world::village::Village;

pub use evolution::evolution_sweep;
pub use harvest::harvest_sweep;
pub use scheduler::{start_scheduler, SchedulerHandle};
pub use tide::tide_sweep;
pub use upkeep::upkeep_sweep;

/// What one sweep pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Worlds visited
    pub worlds: usize,
    /// Entities changed (villages, locations or town guests)
    pub touched: usize,
    pub failures: usize,
}

/// Visit every known world, logging and counting failures instead of stopping
pub(crate) fn for_each_world(
    engine: &Engine,
    sweep: &'static str,
    mut visit: impl FnMut(&SharedWorld, &mut SweepReport) -> Result<()>,
) -> SweepReport {
    let mut report = SweepReport::default();
    let ids = match engine.world_ids() {
        Ok(ids) => ids,
        Err(err) => {
            warn!(%err, sweep, "could not list worlds");
            report.failures += 1;
            return report;
        }
    };
    for id in ids {
        report.worlds += 1;
        let result = engine.world(&id).and_then(|world| visit(&world, &mut report));
        if let Err(err) = result {
            warn!(world = %id, %err, sweep, "world skipped");
            report.failures += 1;
        }
    }
    report
}

/// Save villages one by one; a failure is counted and the rest still saved
pub(crate) fn save_villages(engine: &Engine, world: &WorldId, villages: &[Village], report: &mut SweepReport) {
    for village in villages {
        if let Err(err) = engine.store().save_village(world, village) {
            warn!(%world, village = %village.name, %err, "failed to save village");
            report.failures += 1;
        }
    }
}
