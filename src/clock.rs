//! Session clock and warm-up gating
//!
//! The first accepted timestamp fixes the session start. Timestamps must be finite and
//! non-decreasing for the lifetime of the session.

use crate::error::ScreenError;
use tracing::debug;

/// Timing context handed to every detector for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Caller-supplied timestamp in seconds
    pub timestamp: f64,
    /// Seconds since the first frame of the session
    pub elapsed: f64,
}

impl FrameContext {
    pub fn new(timestamp: f64, elapsed: f64) -> Self {
        Self { timestamp, elapsed }
    }

    /// Whether this frame falls inside a warm-up of the given length
    pub fn in_warmup(&self, warmup_sec: f64) -> bool {
        self.elapsed < warmup_sec
    }
}

/// Session start and last-seen timestamps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionClock {
    session_start_time: Option<f64>,
    last_timestamp: Option<f64>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a timestamp without recording it
    pub fn check(&self, timestamp: f64) -> Result<(), ScreenError> {
        if !timestamp.is_finite() {
            return Err(ScreenError::InvalidTimestamp(timestamp));
        }
        if let Some(previous) = self.last_timestamp {
            if timestamp < previous {
                return Err(ScreenError::NonMonotonicTimestamp {
                    previous,
                    current: timestamp,
                });
            }
        }
        Ok(())
    }

    /// Record a frame timestamp, starting the session on the first call
    pub fn observe(&mut self, timestamp: f64) -> Result<FrameContext, ScreenError> {
        self.check(timestamp)?;

        let start = *self.session_start_time.get_or_insert_with(|| {
            debug!(start = timestamp, "session clock started");
            timestamp
        });
        self.last_timestamp = Some(timestamp);

        Ok(FrameContext::new(timestamp, timestamp - start))
    }

    pub fn session_start_time(&self) -> Option<f64> {
        self.session_start_time
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    /// Span between the first and the last observed frame
    pub fn observed_duration(&self) -> f64 {
        match (self.session_start_time, self.last_timestamp) {
            (Some(start), Some(last)) => last - start,
            _ => 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.session_start_time = None;
        self.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_timestamp_starts_session() {
        let mut clock = SessionClock::new();
        assert!(clock.session_start_time().is_none());

        let ctx = clock.observe(100.0).unwrap();
        assert_eq!(ctx.elapsed, 0.0);
        assert_eq!(clock.session_start_time(), Some(100.0));

        let ctx = clock.observe(102.5).unwrap();
        assert!((ctx.elapsed - 2.5).abs() < 1e-9);
        assert_eq!(clock.session_start_time(), Some(100.0));
        assert!((clock.observed_duration() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_backwards_and_non_finite() {
        let mut clock = SessionClock::new();
        clock.observe(5.0).unwrap();

        assert!(matches!(
            clock.observe(4.0),
            Err(ScreenError::NonMonotonicTimestamp { .. })
        ));
        assert!(matches!(
            clock.observe(f64::NAN),
            Err(ScreenError::InvalidTimestamp(_))
        ));
        // Equal timestamps are allowed
        assert!(clock.observe(5.0).is_ok());
        assert_eq!(clock.last_timestamp(), Some(5.0));
    }

    #[test]
    fn test_warmup_gate() {
        let ctx = FrameContext::new(11.0, 1.0);
        assert!(ctx.in_warmup(2.0));
        assert!(!ctx.in_warmup(1.0));
    }

    #[test]
    fn test_reset_clears_start() {
        let mut clock = SessionClock::new();
        clock.observe(3.0).unwrap();
        clock.reset();
        assert!(clock.session_start_time().is_none());
        assert_eq!(clock.observed_duration(), 0.0);
        assert_eq!(clock.observe(1.0).unwrap().elapsed, 0.0);
    }
}
