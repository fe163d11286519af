use std::{sync::Arc, time::Duration};

use mileage_tracker_lib::{
    position_fix::PositionFix,
    trip::{SessionSnapshot, TripSummary},
};
use tokio::{
    sync::{oneshot, watch, Mutex},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    accumulator::FixOutcome,
    clock::{Clock, SystemClock},
    config::Configuration,
    location::{LocationProvider, LocationSubscription, PermissionStatus},
    session::TripSession,
    TrackerError,
};

/// Drives a `TripSession` from a location source.
///
/// Owns the location subscription while a trip is tracked. Fixes are applied
/// by a single worker task in arrival order, and snapshots for display are
/// published after every fix and on every display tick.
pub struct MileageTracker<P: LocationProvider> {
    provider: P,
    clock: Arc<dyn Clock>,
    session: Arc<Mutex<TripSession>>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    source_open: Arc<watch::Sender<bool>>,
    display_tick: Duration,
    worker: Option<Worker>,
}

struct Worker {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl<P: LocationProvider> MileageTracker<P> {
    pub fn new(provider: P, config: &Configuration) -> Self {
        Self {
            provider,
            clock: Arc::new(SystemClock),
            session: Arc::new(Mutex::new(TripSession::new(config.noise_floor_miles))),
            snapshots: Arc::new(watch::channel(SessionSnapshot::default()).0),
            source_open: Arc::new(watch::channel(false).0),
            display_tick: config.display_tick(),
            worker: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn is_tracking(&self) -> bool {
        self.worker.is_some()
    }

    /// Receives a new snapshot after every fix and every display tick.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot(self.clock.now())
    }

    /// Starts a trip. Returns `Ok(false)` without side effects if one is already running.
    pub async fn start(&mut self) -> Result<bool, TrackerError> {
        if self.worker.is_some() {
            tracing::debug!("Already tracking, start ignored");
            return Ok(false);
        }

        let mut permission = self.provider.permission_status().await;
        if permission != PermissionStatus::Granted {
            permission = self.provider.request_permission().await;
        }
        if permission != PermissionStatus::Granted {
            tracing::warn!("Location permission not granted ({:?}), not tracking", permission);
            return Err(TrackerError::PermissionDenied);
        }

        let subscription = self.provider.watch_position().await.map_err(|e| {
            tracing::error!("Failed to start location watch: {e}");
            e
        })?;

        let now = self.clock.now();
        {
            let mut session = self.session.lock().await;
            session.start(now);
            self.snapshots.send_replace(session.snapshot(now));
        }
        self.source_open.send_replace(true);

        let fix_loop = FixLoop {
            session: self.session.clone(),
            snapshots: self.snapshots.clone(),
            source_open: self.source_open.clone(),
            clock: self.clock.clone(),
            display_tick: self.display_tick,
        };
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(fix_loop.run(subscription, stop_rx));
        self.worker = Some(Worker { stop, handle });

        tracing::info!("Started tracking at {}", now);
        Ok(true)
    }

    /// Ends the trip. Fixes already delivered are still counted, then the
    /// location watch is cancelled before this returns, so nothing delivered
    /// afterwards is. `None` if no trip was running.
    pub async fn stop(&mut self) -> Option<TripSummary> {
        let worker = self.worker.take()?;

        let _ = worker.stop.send(());
        if let Err(e) = worker.handle.await {
            tracing::error!("Tracking worker ended abnormally: {e}");
        }

        let now = self.clock.now();
        let mut session = self.session.lock().await;
        let summary = session.stop(now);
        self.snapshots.send_replace(session.snapshot(now));

        if let Some(summary) = &summary {
            tracing::info!(
                "Stopped tracking: {:.2} miles in {:.0} seconds",
                summary.distance_miles,
                summary.duration_seconds
            );
        }
        summary
    }

    /// Resolves once the location source has no more fixes to deliver, or immediately when idle.
    pub async fn source_closed(&self) {
        let mut open = self.source_open.subscribe();
        let _ = open.wait_for(|open| !*open).await;
    }
}

impl<P: LocationProvider> Drop for MileageTracker<P> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            // Aborting drops the subscription, which unsubscribes from the source
            let _ = worker.stop.send(());
            worker.handle.abort();
            tracing::warn!("Tracker dropped while tracking, trip discarded");
        }
    }
}

struct FixLoop {
    session: Arc<Mutex<TripSession>>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    source_open: Arc<watch::Sender<bool>>,
    clock: Arc<dyn Clock>,
    display_tick: Duration,
}

impl FixLoop {
    async fn run(self, mut subscription: LocationSubscription, mut stop: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.display_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut source_open = true;

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => {
                    for fix in subscription.drain() {
                        self.apply(fix).await;
                    }
                    break;
                }
                fix = subscription.next_fix(), if source_open => match fix {
                    Some(fix) => self.apply(fix).await,
                    None => {
                        tracing::info!("Location source ended");
                        source_open = false;
                        self.source_open.send_replace(false);
                    }
                },
                _ = ticker.tick() => self.publish().await,
            }
        }

        subscription.cancel();
        self.source_open.send_replace(false);
    }

    async fn apply(&self, fix: PositionFix) {
        let mut session = self.session.lock().await;

        match session.apply_fix(fix) {
            Ok(FixOutcome::Accumulated(delta)) => tracing::debug!("Moved {:.4} miles", delta),
            Ok(FixOutcome::OutOfOrder) => tracing::warn!("Skipped out of order fix from {}", fix.timestamp),
            Ok(outcome) => tracing::trace!(?outcome, "Fix not counted"),
            Err(e) => tracing::warn!("Skipped fix: {e}"),
        }

        self.snapshots.send_replace(session.snapshot(self.clock.now()));
    }

    async fn publish(&self) {
        let snapshot = self.session.lock().await.snapshot(self.clock.now());
        self.snapshots.send_replace(snapshot);
    }
}
