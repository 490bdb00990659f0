//! Background thread feeding resilience readings into a controller.

use std::io;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use super::{AdaptiveWeightController, ResilienceSignal};

/// Runs `controller` on a named thread until `feed` disconnects, then
/// hands the controller back through the join handle.
///
/// Readings are processed one at a time in arrival order; weight swaps
/// happen on this thread while validation threads keep their snapshots.
pub fn spawn_observer(
    mut controller: AdaptiveWeightController,
    feed: Receiver<ResilienceSignal>,
) -> io::Result<JoinHandle<AdaptiveWeightController>> {
    thread::Builder::new()
        .name("roster-defense-observer".to_string())
        .spawn(move || {
            let mut readings = 0u64;
            for signal in feed {
                readings += 1;
                let t = controller.observe(signal);
                if !t.changed {
                    debug!(reading = %signal.defense_level, trigger = ?t.trigger, "no level change");
                }
            }
            info!(readings, level = %controller.current_level(), "resilience feed closed");
            controller
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::WeightCell;
    use crate::models::DefenseLevel;
    use std::sync::mpsc;
    use std::sync::Arc;

    #[test]
    fn test_observer_applies_confirmed_level() {
        let cell = Arc::new(WeightCell::new());
        let controller = AdaptiveWeightController::standard(Arc::clone(&cell)).unwrap();
        let (tx, rx) = mpsc::channel();
        let handle = spawn_observer(controller, rx).unwrap();

        for (i, level) in [DefenseLevel::Orange, DefenseLevel::Orange].into_iter().enumerate() {
            tx.send(ResilienceSignal::new(level, i as i64)).unwrap();
        }
        drop(tx);

        let controller = handle.join().unwrap();
        assert_eq!(controller.current_level(), DefenseLevel::Orange);
        assert_eq!(cell.load().level(), DefenseLevel::Orange);
    }
}
