use std::{io::Read, path::Path, str::FromStr, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use mileage_tracker_lib::position_fix::PositionFix;
use tokio::sync::mpsc;

use super::{LocationProvider, LocationSubscription, PermissionStatus};
use crate::{clock::ManualClock, TrackerError};

pub struct GpxTrack {
    pub title: String,
    pub fixes: Vec<PositionFix>,
}

pub fn read_gpx(path: &Path) -> Result<GpxTrack, TrackerError> {
    let file = std::fs::File::open(path)
        .map_err(|_| TrackerError::Location(format!("Failed to open gpx file: {:?}", path)))?;
    parse_gpx(std::io::BufReader::new(file))
}

pub fn parse_gpx<R: Read>(reader: R) -> Result<GpxTrack, TrackerError> {
    let gpx = gpx::read(reader).map_err(|e| TrackerError::Location(format!("Failed to parse gpx: {e}")))?;

    let mut title = "Unnamed".to_string();
    let mut meta_time = None;
    if let Some(meta) = gpx.metadata {
        if let Some(name) = meta.name {
            title = name;
        }

        meta_time = meta.time.and_then(parse_time);
    }

    let mut time = None;
    let mut points = Vec::new();
    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                // Untimed points inherit the time of the point before them
                if let Some(point_time) = point.time.and_then(parse_time) {
                    time = Some(point_time);
                }
                points.push((point.point(), time));
            }
        }
    }

    // Points before the first timed one take its time, so the track stays in order
    let first_time = points
        .iter()
        .find_map(|(_, time)| *time)
        .or(meta_time)
        .unwrap_or_else(Utc::now);

    let fixes = points
        .into_iter()
        .map(|(position, time)| PositionFix::new(position.y(), position.x(), time.unwrap_or(first_time)))
        .collect();

    Ok(GpxTrack { title, fixes })
}

fn parse_time(time: gpx::Time) -> Option<DateTime<Utc>> {
    DateTime::from_str(&time.format().ok()?).ok()
}

/// Replays a recorded track as if it were a live location source.
/// The replay clock follows the timestamps of the emitted fixes, so a trip
/// tracked against it lasts as long as the recording did.
#[derive(Clone)]
pub struct GpxReplayProvider {
    title: String,
    fixes: Arc<Vec<PositionFix>>,
    interval: Duration,
    clock: ManualClock,
}

impl GpxReplayProvider {
    pub fn new(track: GpxTrack) -> Self {
        let start = track.fixes.first().map(|fix| fix.timestamp).unwrap_or_else(Utc::now);
        Self {
            title: track.title,
            fixes: Arc::new(track.fixes),
            interval: Duration::ZERO,
            clock: ManualClock::new(start),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, TrackerError> {
        read_gpx(path).map(Self::new)
    }

    /// Waits `interval` of real time between fixes instead of emitting them back to back.
    pub fn paced(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn fixes(&self) -> &[PositionFix] {
        &self.fixes
    }
}

#[async_trait::async_trait]
impl LocationProvider for GpxReplayProvider {
    async fn permission_status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn watch_position(&self) -> Result<LocationSubscription, TrackerError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let fixes = self.fixes.clone();
        let interval = self.interval;
        let clock = self.clock.clone();

        tracing::info!("Replaying {} fixes from '{}'", fixes.len(), self.title);

        let replay = tokio::spawn(async move {
            for fix in fixes.iter() {
                if interval.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(interval).await;
                }
                clock.set(fix.timestamp);
                if sender.send(*fix).is_err() {
                    break;
                }
            }
        });

        Ok(LocationSubscription::new(receiver, move || replay.abort()))
    }
}
