//! Timer loops that drive the sweeps on the tokio runtime
//!
//! Each sweep gets its own task. The sweep body is synchronous and takes
//! std locks, so it runs on the blocking pool; a panicking sweep is logged
//! and the loop carries on with the next period.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::types::{now_unix, UnixSeconds};
use crate::session::engine::Engine;
use crate::tick::{evolution_sweep, harvest_sweep, tide_sweep, upkeep_sweep, SweepReport};

type Sweep = fn(&Engine, UnixSeconds) -> SweepReport;

/// Running sweep loops; dropping the handle leaves them running
pub struct SchedulerHandle {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl SchedulerHandle {
    pub fn sweeps(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|(name, _)| *name).collect()
    }

    /// Stop every loop; a sweep already running finishes on the blocking pool
    pub fn shutdown(self) {
        for (name, task) in self.tasks {
            task.abort();
            debug!(sweep = name, "sweep loop stopped");
        }
    }
}

/// Spawn one loop per sweep. Must be called from inside a tokio runtime.
pub fn start_scheduler(engine: Arc<Engine>) -> SchedulerHandle {
    let config = engine.config();
    let plan: [(&'static str, u64, Sweep); 4] = [
        ("harvest", config.harvest_check_secs, harvest_sweep),
        ("tide", config.tide_check_secs, tide_sweep),
        ("upkeep", config.upkeep_interval_secs, upkeep_sweep),
        ("evolution", config.evolution_interval_secs, evolution_sweep),
    ];
    info!(
        harvest_secs = config.harvest_check_secs,
        tide_secs = config.tide_check_secs,
        upkeep_secs = config.upkeep_interval_secs,
        evolution_secs = config.evolution_interval_secs,
        "starting sweep scheduler"
    );

    let tasks = plan
        .into_iter()
        .map(|(name, secs, sweep)| {
            let period = Duration::from_secs(secs.max(1));
            (name, spawn_loop(engine.clone(), name, period, sweep))
        })
        .collect();
    SchedulerHandle { tasks }
}

fn spawn_loop(engine: Arc<Engine>, name: &'static str, period: Duration, sweep: Sweep) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            let engine = engine.clone();
            match tokio::task::spawn_blocking(move || sweep(&engine, now_unix())).await {
                Ok(report) => debug!(
                    sweep = name,
                    worlds = report.worlds,
                    touched = report.touched,
                    failures = report.failures,
                    "sweep pass"
                ),
                Err(err) => warn!(sweep = name, err = %err, "sweep task failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;

    #[tokio::test]
    async fn test_one_loop_per_sweep() {
        let engine = Arc::new(Engine::in_memory(EngineConfig::default()).unwrap());
        let handle = start_scheduler(engine);
        assert_eq!(handle.sweeps(), vec!["harvest", "tide", "upkeep", "evolution"]);
        handle.shutdown();
    }
}
