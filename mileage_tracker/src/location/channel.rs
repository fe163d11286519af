use std::sync::{Arc, Mutex, MutexGuard};

use mileage_tracker_lib::position_fix::PositionFix;
use tokio::sync::mpsc;

use super::{LocationProvider, LocationSubscription, PermissionStatus};
use crate::TrackerError;

struct ChannelState {
    permission: PermissionStatus,
    /// What a permission prompt resolves to.
    prompt_answer: PermissionStatus,
    active: Option<(u64, mpsc::UnboundedSender<PositionFix>)>,
    next_watch_id: u64,
    watches_started: usize,
    watches_cancelled: usize,
}

/// Location source fed by hand. A platform layer (or a test) pushes fixes in,
/// and whichever watch is active receives them.
#[derive(Clone)]
pub struct ChannelLocationProvider {
    state: Arc<Mutex<ChannelState>>,
}

impl ChannelLocationProvider {
    pub fn new(permission: PermissionStatus, prompt_answer: PermissionStatus) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                permission,
                prompt_answer,
                active: None,
                next_watch_id: 0,
                watches_started: 0,
                watches_cancelled: 0,
            })),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    pub fn denied() -> Self {
        Self::new(PermissionStatus::Denied, PermissionStatus::Denied)
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_permission(&self, permission: PermissionStatus) {
        let mut state = self.lock();
        state.permission = permission;
        state.prompt_answer = permission;
    }

    /// Delivers a fix to the active watch. Returns false if nobody is watching.
    pub fn push(&self, fix: PositionFix) -> bool {
        let state = self.lock();
        match &state.active {
            Some((_, sender)) => sender.send(fix).is_ok(),
            None => false,
        }
    }

    /// Ends the active watch's stream without cancelling it, as a source running out of data would.
    pub fn close(&self) {
        self.lock().active.take();
    }

    pub fn is_watching(&self) -> bool {
        self.lock().active.is_some()
    }

    pub fn watches_started(&self) -> usize {
        self.lock().watches_started
    }

    pub fn watches_cancelled(&self) -> usize {
        self.lock().watches_cancelled
    }
}

#[async_trait::async_trait]
impl LocationProvider for ChannelLocationProvider {
    async fn permission_status(&self) -> PermissionStatus {
        self.lock().permission
    }

    async fn request_permission(&self) -> PermissionStatus {
        let mut state = self.lock();
        if state.permission == PermissionStatus::Undetermined {
            state.permission = state.prompt_answer;
        }
        state.permission
    }

    async fn watch_position(&self) -> Result<LocationSubscription, TrackerError> {
        let mut state = self.lock();
        if state.permission != PermissionStatus::Granted {
            return Err(TrackerError::PermissionDenied);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let watch_id = state.next_watch_id;
        state.next_watch_id += 1;
        state.watches_started += 1;
        // A platform only supports one watch per client, the newest wins
        state.active = Some((watch_id, sender));
        drop(state);

        let shared = self.state.clone();
        Ok(LocationSubscription::new(receiver, move || {
            let mut state = shared.lock().unwrap_or_else(|e| e.into_inner());
            state.watches_cancelled += 1;
            if state.active.as_ref().map(|(id, _)| *id) == Some(watch_id) {
                state.active = None;
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_returns_pending_fixes_and_refuses_new_ones() {
        let provider = ChannelLocationProvider::granted();
        let mut subscription = provider.watch_position().await.unwrap();

        assert!(provider.push(PositionFix::now(1., 1.)));
        assert!(provider.push(PositionFix::now(2., 2.)));

        let pending = subscription.drain();
        assert_eq!(pending.iter().map(|fix| fix.latitude()).collect::<Vec<_>>(), vec![1., 2.]);
        assert!(!provider.push(PositionFix::now(3., 3.)));
        assert!(subscription.drain().is_empty());
    }

    #[tokio::test]
    async fn cancelled_watch_stops_receiving() {
        let provider = ChannelLocationProvider::granted();
        let mut subscription = provider.watch_position().await.unwrap();

        assert!(provider.push(PositionFix::now(1., 1.)));
        assert_eq!(subscription.next_fix().await.unwrap().latitude(), 1.);

        subscription.cancel();
        assert!(!provider.is_watching());
        assert!(!provider.push(PositionFix::now(2., 2.)));
        assert!(subscription.next_fix().await.is_none());
        assert_eq!(provider.watches_cancelled(), 1);
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let provider = ChannelLocationProvider::granted();
        {
            let _subscription = provider.watch_position().await.unwrap();
            assert!(provider.is_watching());
        }
        assert!(!provider.is_watching());
        assert_eq!(provider.watches_started(), 1);
        assert_eq!(provider.watches_cancelled(), 1);
    }

    #[tokio::test]
    async fn undetermined_permission_is_prompted() {
        let provider = ChannelLocationProvider::new(PermissionStatus::Undetermined, PermissionStatus::Granted);
        assert_eq!(provider.permission_status().await, PermissionStatus::Undetermined);
        assert_eq!(provider.request_permission().await, PermissionStatus::Granted);
        assert!(provider.watch_position().await.is_ok());
    }

    #[tokio::test]
    async fn watch_requires_permission() {
        let provider = ChannelLocationProvider::denied();
        assert_eq!(provider.watch_position().await.err(), Some(TrackerError::PermissionDenied));
        assert_eq!(provider.watches_started(), 0);
    }
}
