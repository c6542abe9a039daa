//! Progress plumbing for the streaming copy.

use std::sync::Arc;

use crate::progress::{ProgressCallback, ProgressTracker};

/// Bytes between two progress callbacks (100 KiB).
pub const CALLBACK_INTERVAL_BYTES: u64 = 102_400;

/// Feeds every chunk into a tracker and throttles the caller's callback.
pub(crate) struct ProgressSink {
    tracker: Arc<ProgressTracker>,
    callback: Option<ProgressCallback>,
    since_callback: u64,
}

impl ProgressSink {
    pub fn new(tracker: Arc<ProgressTracker>, callback: Option<ProgressCallback>) -> Self {
        Self {
            tracker,
            callback,
            since_callback: 0,
        }
    }

    /// Account for `n` freshly written bytes.
    pub fn record(&mut self, n: u64) {
        self.tracker.update(n);
        self.since_callback += n;
        if self.since_callback >= CALLBACK_INTERVAL_BYTES {
            self.notify();
        }
    }

    /// Deliver the final snapshot at end of stream.
    pub fn finish(&mut self) {
        self.notify();
    }

    fn notify(&mut self) {
        self.since_callback = 0;
        if let Some(callback) = &self.callback {
            callback(&self.tracker.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording_sink(total: u64) -> (ProgressSink, Arc<Mutex<Vec<u64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |s| sink_seen.lock().push(s.downloaded));
        let sink = ProgressSink::new(Arc::new(ProgressTracker::new(total)), Some(callback));
        (sink, seen)
    }

    #[test]
    fn test_callback_is_throttled() {
        let (mut sink, seen) = recording_sink(1_000_000);
        for _ in 0..100 {
            sink.record(1024);
        }
        // 100 KiB reached exactly once
        assert_eq!(*seen.lock(), vec![102_400]);
    }

    #[test]
    fn test_finish_always_notifies() {
        let (mut sink, seen) = recording_sink(10);
        sink.record(10);
        assert!(seen.lock().is_empty());

        sink.finish();
        assert_eq!(*seen.lock(), vec![10]);
    }

    #[test]
    fn test_large_chunk_triggers_single_callback() {
        let (mut sink, seen) = recording_sink(0);
        sink.record(5 * CALLBACK_INTERVAL_BYTES);
        sink.record(1);
        assert_eq!(*seen.lock(), vec![5 * CALLBACK_INTERVAL_BYTES]);
    }

    #[test]
    fn test_sink_without_callback_still_tracks() {
        let tracker = Arc::new(ProgressTracker::new(100));
        let mut sink = ProgressSink::new(Arc::clone(&tracker), None);
        sink.record(60);
        sink.record(40);
        sink.finish();
        assert!(tracker.is_complete());
    }
}
