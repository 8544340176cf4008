//! Periodic channel/subscriber aging.
//!
//! One task drives the hub's tick: it ages empty channels toward the free
//! list, keeps busy channels alive and noops subscribers that exceeded
//! their polling budget. The cadence is `polling.check_interval_secs`.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

use crate::handlers::AppState;
use crate::metrics;

/// Spawn the sweeper task.
pub fn spawn(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.check_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let stats = {
                let mut hub = state.hub.lock();
                hub.sweep();
                hub.stats()
            };
            trace!(
                channels = stats.channels,
                subscribers = stats.subscribers,
                "sweep"
            );
            metrics::set_channels(stats.channels);
            metrics::set_subscribers(stats.subscribers);
            metrics::set_presence_subscribers(stats.presence_subscribers);
        }
    })
}
