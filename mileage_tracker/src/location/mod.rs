use mileage_tracker_lib::position_fix::PositionFix;
use tokio::sync::mpsc;

use crate::TrackerError;

mod channel;
mod gpx_replay;

pub use channel::ChannelLocationProvider;
pub use gpx_replay::{parse_gpx, read_gpx, GpxReplayProvider, GpxTrack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// A platform location service.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync + 'static {
    async fn permission_status(&self) -> PermissionStatus;

    /// Prompts for permission if it has not been decided yet.
    async fn request_permission(&self) -> PermissionStatus;

    /// Starts a position watch. Fixes are delivered in capture order.
    async fn watch_position(&self) -> Result<LocationSubscription, TrackerError>;
}

/// An active position watch. Dropping it unsubscribes from the source.
pub struct LocationSubscription {
    fixes: mpsc::UnboundedReceiver<PositionFix>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl LocationSubscription {
    pub fn new(fixes: mpsc::UnboundedReceiver<PositionFix>, on_cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            fixes,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Waits for the next fix. `None` once the source has ended or the watch was cancelled.
    pub async fn next_fix(&mut self) -> Option<PositionFix> {
        if self.on_cancel.is_none() {
            return None;
        }
        self.fixes.recv().await
    }

    /// Stops the source from delivering any more fixes and returns the ones
    /// already delivered but not yet read, in arrival order.
    pub fn drain(&mut self) -> Vec<PositionFix> {
        self.fixes.close();
        let mut pending = Vec::new();
        while let Ok(fix) = self.fixes.try_recv() {
            pending.push(fix);
        }
        pending
    }

    pub fn is_cancelled(&self) -> bool {
        self.on_cancel.is_none()
    }

    pub fn cancel(&mut self) {
        if let Some(on_cancel) = self.on_cancel.take() {
            self.fixes.close();
            on_cancel();
            tracing::debug!("Location watch cancelled");
        }
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
