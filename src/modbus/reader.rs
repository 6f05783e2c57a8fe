//! Periodic inverter polling

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use super::Transport;
use crate::growatt::{GrowattInverter, InverterSnapshot};

/// Run one update and hand the snapshot to `on_snapshot`.
/// Returns false when the update failed.
pub async fn poll_once<T, F>(inverter: &mut GrowattInverter<T>, on_snapshot: &mut F) -> bool
where
    T: Transport,
    F: FnMut(&InverterSnapshot),
{
    match inverter.update().await {
        Ok(snapshot) => {
            on_snapshot(snapshot);
            true
        }
        Err(e) => {
            warn!("Failed to poll inverter on {}: {}", inverter.port(), e);
            false
        }
    }
}

/// Poll the inverter forever, one update at a time.
pub async fn start_polling<T, F>(
    inverter: &mut GrowattInverter<T>,
    poll_interval: Duration,
    mut on_snapshot: F,
) where
    T: Transport,
    F: FnMut(&InverterSnapshot),
{
    info!(
        "Starting polling for inverter on {} every {}ms",
        inverter.port(),
        poll_interval.as_millis()
    );

    let mut ticker = interval(poll_interval);
    // A slow or failing poll must not trigger a burst of catch-up polls.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut failures: u64 = 0;
    loop {
        ticker.tick().await;

        if poll_once(inverter, &mut on_snapshot).await {
            if failures > 0 {
                info!("Inverter reachable again after {} failed polls", failures);
            }
            failures = 0;
        } else {
            failures += 1;
        }
    }
}
