//! Download progress tracking.
//!
//! [`ProgressTracker`] accumulates transferred bytes and derives a smoothed
//! transfer speed and ETA. It is shared behind an `Arc`: one writer (the
//! streaming copy) advances it while any number of readers (UI refresh,
//! logging) call [`ProgressTracker::snapshot`] concurrently. State lives
//! behind a `parking_lot::RwLock`, so readers never block each other.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

use crate::format::{format_bytes, format_speed};

/// Weight of the newest sample in the speed moving average.
pub const SPEED_SMOOTHING: f64 = 0.3;

/// Minimum wall-clock time between speed samples.
pub const SPEED_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Percent value reported when the total size is unknown.
pub const PERCENT_UNKNOWN: f64 = -1.0;

/// Callback receiving progress snapshots during a download.
///
/// Invoked synchronously on the streaming path; a slow callback slows the
/// transfer down.
pub type ProgressCallback = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

/// Point-in-time view of a download's progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Total bytes expected (0 if unknown).
    pub total: u64,
    /// Bytes downloaded so far.
    pub downloaded: u64,
    /// Percent complete in `[0, 100]`, or [`PERCENT_UNKNOWN`].
    pub percent: f64,
    /// Smoothed transfer speed in bytes per second.
    pub speed_bytes_per_sec: f64,
    /// Speed for display, e.g. `5.20 MB/s`.
    pub speed_formatted: String,
    /// Downloaded size for display.
    pub downloaded_formatted: String,
    /// Total size for display, or `unknown`.
    pub total_formatted: String,
    /// Estimated time remaining (zero when unknown or complete).
    pub eta: Duration,
    /// Time since tracking started.
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Whether the total size is known.
    pub fn total_known(&self) -> bool {
        self.total > 0
    }
}

#[derive(Debug)]
struct TrackerState {
    total: u64,
    downloaded: u64,
    started_at: Instant,
    last_sample_at: Instant,
    last_sample_downloaded: u64,
    speed: f64,
}

impl TrackerState {
    fn new(total: u64) -> Self {
        let now = Instant::now();
        Self {
            total,
            downloaded: 0,
            started_at: now,
            last_sample_at: now,
            last_sample_downloaded: 0,
            speed: 0.0,
        }
    }

    fn sample_speed(&mut self) {
        self.sample_speed_at(Instant::now());
    }

    /// Fold a new speed sample into the moving average if enough time passed.
    fn sample_speed_at(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_sample_at);
        if elapsed < SPEED_SAMPLE_INTERVAL {
            return;
        }

        let bytes = self.downloaded.saturating_sub(self.last_sample_downloaded);
        let instant = bytes as f64 / elapsed.as_secs_f64();

        self.speed = if self.speed == 0.0 {
            instant
        } else {
            SPEED_SMOOTHING * instant + (1.0 - SPEED_SMOOTHING) * self.speed
        };
        self.last_sample_at = now;
        self.last_sample_downloaded = self.downloaded;
    }
}

/// Thread-safe accumulator of download progress.
#[derive(Debug)]
pub struct ProgressTracker {
    state: RwLock<TrackerState>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ProgressTracker {
    /// Create a tracker for a download of `total` bytes (0 if unknown).
    pub fn new(total: u64) -> Self {
        Self {
            state: RwLock::new(TrackerState::new(total)),
        }
    }

    /// Record `n` more downloaded bytes.
    pub fn update(&self, n: u64) {
        if n == 0 {
            return;
        }
        let mut state = self.state.write();
        state.downloaded = state.downloaded.saturating_add(n);
        state.sample_speed();
    }

    /// Set the absolute downloaded count, e.g. the offset of a resumed file.
    ///
    /// The counter never moves backwards; use [`reset`](Self::reset) to start
    /// over.
    pub fn set_downloaded(&self, downloaded: u64) {
        let mut state = self.state.write();
        if downloaded > state.downloaded {
            state.downloaded = downloaded;
            // Bytes that were already on disk are not transfer speed.
            state.last_sample_downloaded = state.last_sample_downloaded.max(downloaded);
        }
        state.sample_speed();
    }

    /// Update the total size (0 if unknown).
    pub fn set_total(&self, total: u64) {
        self.state.write().total = total;
    }

    /// Bytes downloaded so far.
    pub fn downloaded(&self) -> u64 {
        self.state.read().downloaded
    }

    /// Total bytes expected (0 if unknown).
    pub fn total(&self) -> u64 {
        self.state.read().total
    }

    /// True once `downloaded >= total`; always false when total is unknown.
    pub fn is_complete(&self) -> bool {
        let state = self.state.read();
        state.total > 0 && state.downloaded >= state.total
    }

    /// Reinitialise every counter and timer for a new download.
    pub fn reset(&self, total: u64) {
        *self.state.write() = TrackerState::new(total);
    }

    /// Current progress, speed and ETA.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.read();

        let mut snapshot = ProgressSnapshot {
            total: state.total,
            downloaded: state.downloaded,
            percent: PERCENT_UNKNOWN,
            speed_bytes_per_sec: state.speed,
            speed_formatted: format_speed(state.speed),
            downloaded_formatted: format_bytes(state.downloaded),
            total_formatted: "unknown".to_string(),
            eta: Duration::ZERO,
            elapsed: state.started_at.elapsed(),
        };

        if state.total > 0 {
            snapshot.percent =
                (state.downloaded as f64 / state.total as f64 * 100.0).clamp(0.0, 100.0);
            snapshot.total_formatted = format_bytes(state.total);

            if state.speed > 0.0 && state.downloaded < state.total {
                let remaining = (state.total - state.downloaded) as f64;
                snapshot.eta =
                    Duration::try_from_secs_f64(remaining / state.speed).unwrap_or(Duration::MAX);
            }
        }

        snapshot
    }
}
