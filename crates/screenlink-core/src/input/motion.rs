//! Pointer motion filter.
//!
//! Browsers fire `pointermove` far faster than any OS cursor needs to be
//! moved.  Two checks thin the stream per endpoint:
//!
//! 1. **Rate**: a binary pointer frame arriving less than `min_interval`
//!    after the last admitted frame is dropped on arrival, before it can
//!    replace a pending move.  Structured `mousemove` messages are not rate
//!    limited.
//! 2. **Distance**: an absolute move whose displacement from the last
//!    accepted position is below `min_distance_px` on *both* axes is
//!    dropped when it is processed.
//!
//! State only advances on an accepted move, so a slow drift of sub-threshold
//! steps still lands once it adds up.

use std::time::{Duration, Instant};

/// Result of offering a frame or a move to the [`MotionFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionVerdict {
    Accept,
    /// Inside the rate window of the previous admitted binary frame.
    TooSoon,
    /// Below the distance threshold on both axes.
    TooSmall,
}

/// Rate and distance filter for one endpoint's pointer stream.
#[derive(Debug, Clone)]
pub struct MotionFilter {
    min_interval: Duration,
    min_distance_px: f64,
    last_frame_at: Option<Instant>,
    last_position: Option<(f64, f64)>,
}

impl MotionFilter {
    pub fn new(min_interval: Duration, min_distance_px: f64) -> Self {
        Self {
            min_interval,
            min_distance_px,
            last_frame_at: None,
            last_position: None,
        }
    }

    /// Rate check for a binary frame arriving at `now`.
    ///
    /// The window is measured from the last *admitted* frame, so a steady
    /// stream faster than `min_interval` still lets one frame through per
    /// window.
    pub fn admit_frame(&mut self, now: Instant) -> MotionVerdict {
        if let Some(last) = self.last_frame_at {
            if now.saturating_duration_since(last) < self.min_interval {
                return MotionVerdict::TooSoon;
            }
        }
        self.last_frame_at = Some(now);
        MotionVerdict::Accept
    }

    /// Distance check for an absolute move to `pos_px` (device pixels).
    pub fn admit(&mut self, pos_px: (f64, f64)) -> MotionVerdict {
        if let Some((lx, ly)) = self.last_position {
            let dx = (pos_px.0 - lx).abs();
            let dy = (pos_px.1 - ly).abs();
            if dx < self.min_distance_px && dy < self.min_distance_px {
                return MotionVerdict::TooSmall;
            }
        }
        self.last_position = Some(pos_px);
        MotionVerdict::Accept
    }

    /// Records a position reached without [`admit`](Self::admit), such as
    /// a relative move or a press that repositioned the pointer.
    pub fn mark_accepted(&mut self, pos_px: (f64, f64)) {
        self.last_position = Some(pos_px);
    }
}

impl Default for MotionFilter {
    /// 5 ms between binary frames, 2 px minimum displacement.
    fn default() -> Self {
        Self::new(Duration::from_millis(5), 2.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
