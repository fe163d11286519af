use mileage_tracker_lib::{
    mileage_record::{MileageAck, NewMileageRecord},
    trip::TripSummary,
};

use crate::{api::MileageApi, TrackerError};

/// A completed trip on its way to the backend.
///
/// A failed submit keeps the computed record, so the caller can retry with
/// the same values. Once the backend has acknowledged the record, further
/// submits return the stored acknowledgement instead of creating a duplicate.
#[derive(Debug, Clone)]
pub struct TripSubmission {
    summary: TripSummary,
    record: NewMileageRecord,
    attempts: u32,
    ack: Option<MileageAck>,
}

impl TripSubmission {
    pub fn new(summary: TripSummary, purpose: impl Into<String>) -> Self {
        Self {
            record: NewMileageRecord::from_summary(&summary, purpose.into()),
            summary,
            attempts: 0,
            ack: None,
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.record = self.record.with_notes(notes);
        self
    }

    pub fn with_job_id(mut self, job_id: Option<String>) -> Self {
        self.record = self.record.with_job_id(job_id);
        self
    }

    pub fn summary(&self) -> &TripSummary {
        &self.summary
    }

    pub fn record(&self) -> &NewMileageRecord {
        &self.record
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_submitted(&self) -> bool {
        self.ack.is_some()
    }

    pub async fn submit(&mut self, api: &dyn MileageApi) -> Result<MileageAck, TrackerError> {
        if let Some(ack) = &self.ack {
            return Ok(ack.clone());
        }

        self.attempts += 1;
        match api.add_entry(&self.record).await {
            Ok(ack) => {
                tracing::info!("Mileage saved ({} miles, id {:?})", self.record.distance, ack.id);
                self.ack = Some(ack.clone());
                Ok(ack)
            }
            Err(e) => {
                tracing::warn!("Failed to save mileage on attempt {}: {e}", self.attempts);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::DateTime;
    use mileage_tracker_lib::mileage_record::MileageRecord;

    use super::*;

    /// Fails the first `failures` creates, then accepts.
    struct FlakyApi {
        failures: Mutex<u32>,
        created: Mutex<Vec<NewMileageRecord>>,
    }

    impl FlakyApi {
        fn new(failures: u32) -> Self {
            Self {
                failures: Mutex::new(failures),
                created: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl MileageApi for FlakyApi {
        async fn list_entries(&self) -> Result<Vec<MileageRecord>, TrackerError> {
            Ok(Vec::new())
        }

        async fn add_entry(&self, record: &NewMileageRecord) -> Result<MileageAck, TrackerError> {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(TrackerError::Submission("Service unavailable".into()));
            }
            let mut created = self.created.lock().unwrap();
            created.push(record.clone());
            Ok(MileageAck {
                id: Some(created.len().to_string()),
                message: None,
            })
        }

        async fn update_purpose(&self, _id: &str, _purpose: &str) -> Result<(), TrackerError> {
            Ok(())
        }

        async fn delete_entry(&self, _id: &str) -> Result<(), TrackerError> {
            Ok(())
        }

        async fn weekly_mileage(&self) -> Result<f64, TrackerError> {
            Ok(0.)
        }
    }

    fn summary() -> TripSummary {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let stop = DateTime::from_timestamp(1_700_000_120, 0).unwrap();
        TripSummary::new(start, stop, 0.6911)
    }

    #[tokio::test]
    async fn failed_submit_keeps_values_for_retry() {
        let api = FlakyApi::new(1);
        let mut submission = TripSubmission::new(summary(), "Tracked Trip").with_job_id(Some("J-9".into()));

        let err = submission.submit(&api).await.unwrap_err();
        assert!(matches!(err, TrackerError::Submission(_)));
        assert!(!submission.is_submitted());
        assert_eq!(submission.record().distance, 0.69);

        let ack = submission.submit(&api).await.unwrap();
        assert_eq!(ack.id.as_deref(), Some("1"));
        assert_eq!(submission.attempts(), 2);

        let created = api.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].time, 120.);
        assert_eq!(created[0].job_id.as_deref(), Some("J-9"));
    }

    #[tokio::test]
    async fn acknowledged_trip_is_not_sent_twice() {
        let api = FlakyApi::new(0);
        let mut submission = TripSubmission::new(summary(), "Tracked Trip");

        submission.submit(&api).await.unwrap();
        submission.submit(&api).await.unwrap();

        assert_eq!(submission.attempts(), 1);
        assert_eq!(api.created.lock().unwrap().len(), 1);
    }
}
