use std::io::Write;

use mileage_tracker::{
    config::Configuration,
    location::GpxReplayProvider,
    submission::TripSubmission,
    MileageTracker, TrackerError,
};
use tempdir::TempDir;

const COMMUTE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <metadata><name>Office to title company</name></metadata>
  <trk><trkseg>
    <trkpt lat="0.0" lon="0.0"><time>2025-05-22T08:00:00Z</time></trkpt>
    <trkpt lat="0.0" lon="0.0"><time>2025-05-22T08:02:00Z</time></trkpt>
    <trkpt lat="0.0" lon="0.005"><time>2025-05-22T08:05:00Z</time></trkpt>
    <trkpt lat="0.0" lon="0.01"><time>2025-05-22T08:10:00Z</time></trkpt>
  </trkseg></trk>
</gpx>"#;

#[tokio::test]
async fn replayed_file_becomes_a_mileage_record() {
    let dir = TempDir::new("mileage_replay").unwrap();
    let path = dir.path().join("commute.gpx");
    std::fs::File::create(&path).unwrap().write_all(COMMUTE.as_bytes()).unwrap();

    let provider = GpxReplayProvider::from_file(&path).unwrap();
    assert_eq!(provider.title(), "Office to title company");
    let clock = provider.clock();

    let mut tracker = MileageTracker::new(provider, &Configuration::default()).with_clock(clock);
    assert_eq!(tracker.start().await, Ok(true));
    tracker.source_closed().await;

    let snapshot = tracker.snapshot().await;
    assert_eq!(snapshot.fix_count, 4);
    assert_eq!(snapshot.elapsed_seconds, 600);

    let summary = tracker.stop().await.unwrap();
    assert_eq!(summary.duration_seconds, 600.);
    assert!((summary.distance_miles - 0.6911).abs() < 0.001);

    let submission = TripSubmission::new(summary, "Closing");
    assert_eq!(submission.record().distance, 0.69);
    assert_eq!(submission.record().time, 600.);
    assert_eq!(submission.record().date.to_string(), "2025-05-22");
}

#[test]
fn missing_file_is_a_location_error() {
    let dir = TempDir::new("mileage_replay").unwrap();
    let result = GpxReplayProvider::from_file(&dir.path().join("nope.gpx"));
    assert!(matches!(result, Err(TrackerError::Location(_))));
}
