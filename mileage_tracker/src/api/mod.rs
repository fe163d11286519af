use mileage_tracker_lib::mileage_record::{MileageAck, MileageRecord, NewMileageRecord};

use crate::TrackerError;

mod client;
pub mod endpoints;

pub use client::ApiClient;

/// The backend's mileage operations.
#[async_trait::async_trait]
pub trait MileageApi: Send + Sync {
    async fn list_entries(&self) -> Result<Vec<MileageRecord>, TrackerError>;

    async fn add_entry(&self, record: &NewMileageRecord) -> Result<MileageAck, TrackerError>;

    async fn update_purpose(&self, id: &str, purpose: &str) -> Result<(), TrackerError>;

    async fn delete_entry(&self, id: &str) -> Result<(), TrackerError>;

    /// Miles logged in the current week.
    async fn weekly_mileage(&self) -> Result<f64, TrackerError>;
}
