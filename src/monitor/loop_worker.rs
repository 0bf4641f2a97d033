use std::sync::Arc;

use log::{debug, error, info};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::events::{EventBus, MonitorEvent};
use crate::session::{self, SessionHandle};

use super::batcher::Batcher;
use super::classifier::classify;
use super::sampler::Sampler;

/// The recurring sampling cycle: capture, classify, batch, publish, and flush
/// once enough samples are pending. Runs until the token is cancelled; no
/// error inside a tick ever stops the loop.
pub(super) async fn monitor_loop(
    mut sampler: Sampler,
    batcher: Arc<Batcher>,
    events: EventBus,
    session: SessionHandle,
    interval: Duration,
    batch_threshold: usize,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_tick(&mut sampler, &batcher, &events, &session, batch_threshold).await;
            }
            _ = cancel_token.cancelled() => {
                info!("monitor loop shutting down");
                break;
            }
        }
    }
}

async fn run_tick(
    sampler: &mut Sampler,
    batcher: &Batcher,
    events: &EventBus,
    session: &SessionHandle,
    batch_threshold: usize,
) {
    let mut sample = sampler.capture();
    sample.productivity = classify(&sample.active_window);

    batcher.append(sample.clone());
    debug!(
        "captured {} ({:?}), {} pending",
        sample.active_window,
        sample.productivity,
        batcher.pending_len()
    );
    events.emit(MonitorEvent::ActivityUpdate(sample));

    if batcher.pending_len() >= batch_threshold {
        // Deliveries need the authenticated user; without one the batch just
        // keeps accumulating until the next login.
        let Some(user_id) = session::current_user_id(session) else {
            return;
        };
        if let Err(err) = batcher.flush(user_id).await {
            error!("activity flush failed: {err}");
        }
    }
}
