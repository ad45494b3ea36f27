use std::time::{Duration, Instant};

/// Rate-extrapolated progress for one session. Estimates are advisory only.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_bytes: u64,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            started: Instant::now(),
        }
    }

    /// Estimated seconds remaining after `uploaded_bytes` have been processed.
    pub fn record(&self, uploaded_bytes: u64) -> Option<u64> {
        estimate_remaining(self.total_bytes, uploaded_bytes, self.started.elapsed())
    }
}

/// `None` until a rate can be observed.
pub fn estimate_remaining(total_bytes: u64, uploaded_bytes: u64, elapsed: Duration) -> Option<u64> {
    if uploaded_bytes >= total_bytes {
        return Some(0);
    }
    if uploaded_bytes == 0 || elapsed.is_zero() {
        return None;
    }

    let rate = uploaded_bytes as f64 / elapsed.as_secs_f64();
    let remaining = (total_bytes - uploaded_bytes) as f64 / rate;
    Some(remaining.ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_remaining() {
        assert_eq!(estimate_remaining(100, 0, Duration::from_secs(1)), None);
        assert_eq!(estimate_remaining(100, 50, Duration::ZERO), None);
        assert_eq!(estimate_remaining(100, 50, Duration::from_secs(10)), Some(10));
        assert_eq!(estimate_remaining(100, 25, Duration::from_secs(1)), Some(3));
        assert_eq!(estimate_remaining(100, 100, Duration::from_secs(1)), Some(0));
        assert_eq!(estimate_remaining(100, 150, Duration::from_secs(1)), Some(0));
    }

    #[test]
    fn test_tracker_completes_at_zero() {
        let tracker = ProgressTracker::new(10);
        assert_eq!(tracker.record(10), Some(0));
    }
}
