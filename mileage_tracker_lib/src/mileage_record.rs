use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{geo_util::round_miles, trip::TripSummary};

/// A mileage entry as stored by the backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MileageRecord {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(alias = "miles", default)]
    pub distance: f64,
    #[serde(rename = "time", default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(alias = "title", default)]
    pub purpose: Option<String>,
    #[serde(default, deserialize_with = "optional_id_from_any")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of the create-mileage-record request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewMileageRecord {
    pub distance: f64,
    pub date: NaiveDate,
    pub time: f64,
    pub purpose: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl NewMileageRecord {
    pub fn new(distance_miles: f64, duration_seconds: f64, date: NaiveDate, purpose: String) -> Self {
        Self {
            distance: round_miles(distance_miles),
            date,
            time: duration_seconds,
            purpose,
            notes: None,
            job_id: None,
        }
    }

    /// Dated by the day the trip was stopped.
    pub fn from_summary(summary: &TripSummary, purpose: String) -> Self {
        Self::new(summary.distance_miles, summary.duration_seconds, summary.stopped_at.date_naive(), purpose)
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_job_id(mut self, job_id: Option<String>) -> Self {
        self.job_id = job_id;
        self
    }

    /// Checks that distance and time are finite and not negative.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.distance.is_finite() && self.distance >= 0.) {
            return Err("Distance must be a non-negative number");
        }
        if !(self.time.is_finite() && self.time >= 0.) {
            return Err("Time must be a non-negative number of seconds");
        }
        Ok(())
    }
}

/// Acknowledgement returned by the backend after a successful create.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MileageAck {
    #[serde(default, deserialize_with = "optional_id_from_any")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnyId {
    Number(i64),
    Text(String),
}

impl From<AnyId> for String {
    fn from(id: AnyId) -> Self {
        match id {
            AnyId::Number(n) => n.to_string(),
            AnyId::Text(s) => s,
        }
    }
}

// The backend hands out both integer and string ids
fn id_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    AnyId::deserialize(deserializer).map(String::from)
}

fn optional_id_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<AnyId>::deserialize(deserializer).map(|id| id.map(String::from))
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    #[test]
    fn payload_matches_submission_contract() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let stop = DateTime::from_timestamp(1_700_000_120, 0).unwrap();
        let summary = TripSummary::new(start, stop, 0.691150);

        let record = NewMileageRecord::from_summary(&summary, "Tracked Trip".into());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["distance"], 0.69);
        assert_eq!(json["time"], 120.0);
        assert_eq!(json["date"], "2023-11-14");
        assert_eq!(json["purpose"], "Tracked Trip");
        assert!(json.get("notes").is_none());
        assert!(json.get("job_id").is_none());
    }

    #[test]
    fn optional_fields_are_sent_when_present() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let record = NewMileageRecord::new(12.347, 900., date, "Closing".into())
            .with_notes(Some("Loan signing".into()))
            .with_job_id(Some("42".into()));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["distance"], 12.35);
        assert_eq!(json["notes"], "Loan signing");
        assert_eq!(json["job_id"], "42");
    }

    #[test]
    fn rejects_negative_or_non_finite_values() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let record = |miles: f64, seconds: f64| NewMileageRecord::new(miles, seconds, date, "Closing".into());

        assert!(record(4.2, 600.).validate().is_ok());
        assert!(record(0., 0.).validate().is_ok());
        assert!(record(4.2, -1.).validate().is_err());
        assert!(record(4.2, f64::NAN).validate().is_err());
        assert!(record(-4.2, 600.).validate().is_err());
        assert!(record(f64::INFINITY, 600.).validate().is_err());
    }

    #[test]
    fn record_accepts_backend_field_names() {
        let record: MileageRecord = serde_json::from_str(
            r#"{"id": 7, "miles": 3.5, "purpose": "Tracked Trip", "date": "2025-01-02", "time": 61.2, "job_id": 5}"#,
        )
        .unwrap();

        assert_eq!(record.id, "7");
        assert_eq!(record.distance, 3.5);
        assert_eq!(record.duration_seconds, Some(61.2));
        assert_eq!(record.purpose.as_deref(), Some("Tracked Trip"));
        assert_eq!(record.job_id.as_deref(), Some("5"));
        assert_eq!(record.notes, None);

        let record: MileageRecord = serde_json::from_str(r#"{"id": "8", "job_id": null}"#).unwrap();
        assert_eq!(record.job_id, None);
    }

    #[test]
    fn ack_id_may_be_missing() {
        let ack: MileageAck = serde_json::from_str(r#"{"message": "ok"}"#).unwrap();
        assert_eq!(ack.id, None);

        let ack: MileageAck = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(ack.id.as_deref(), Some("abc"));
    }
}
