//! Time-warping axis (L2): the piecewise-linear-rate map from wall-clock
//! time to show ("warped") time.
//!
//! A piecewise mapping from one time domain (wall-clock milliseconds) to
//! another (warped seconds) via a list of segments walked in order; each
//! segment carries a linearly varying rate rather than a piecewise-constant
//! one.

use crate::error::{Result, ShowError};

/// One wall-clock segment: a duration and the playback rate at its start
/// and end (ramping linearly between them if they differ).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSegment {
    /// Wall-clock duration, milliseconds. `u32::MAX` means infinite.
    pub duration_ms: u32,
    /// Playback rate at the start of the segment.
    pub initial_rate: f32,
    /// Playback rate at the end of the segment.
    pub final_rate: f32,
}

impl TimeSegment {
    /// A finite segment at a constant rate.
    #[must_use]
    pub const fn constant(duration_ms: u32, rate: f32) -> Self {
        Self {
            duration_ms,
            initial_rate: rate,
            final_rate: rate,
        }
    }

    /// An infinite segment (the show's tail) at a constant rate.
    #[must_use]
    pub const fn constant_forever(rate: f32) -> Self {
        Self::constant(u32::MAX, rate)
    }

    const fn is_infinite(self) -> bool {
        self.duration_ms == u32::MAX
    }
}

/// The wall-clock-to-warped-time map: an origin plus an ordered list of
/// [`TimeSegment`]s.
#[derive(Debug, Clone, Default)]
pub struct TimeAxis {
    origin_ms: u32,
    segments: Vec<TimeSegment>,
}

impl TimeAxis {
    /// An empty axis (pure passthrough: `map(t) == t`, rate 1).
    #[must_use]
    pub const fn new(origin_ms: u32) -> Self {
        Self {
            origin_ms,
            segments: Vec::new(),
        }
    }

    /// Appends a segment, rejecting `NaN` or negative rates (time cannot
    /// flow backwards).
    pub fn push_segment(&mut self, segment: TimeSegment) -> Result<()> {
        if !(segment.initial_rate >= 0.0) || !(segment.final_rate >= 0.0) {
            return Err(ShowError::InvalidArgument(
                "time axis rates must be non-negative and not NaN",
            ));
        }
        self.segments.push(segment);
        Ok(())
    }

    /// The origin in wall-clock milliseconds.
    #[must_use]
    pub const fn origin_ms(&self) -> u32 {
        self.origin_ms
    }

    /// Maps `wall_ms` to warped seconds.
    #[must_use]
    pub fn map(&self, wall_ms: u32) -> f32 {
        self.map_ex(wall_ms).0
    }

    /// Maps `wall_ms` to warped seconds and the instantaneous rate there.
    #[must_use]
    pub fn map_ex(&self, wall_ms: u32) -> (f32, f32) {
        let elapsed = i64::from(wall_ms) - i64::from(self.origin_ms);
        if elapsed < 0 {
            return (elapsed as f32 / 1000.0, 1.0);
        }
        if self.segments.is_empty() {
            return (elapsed as f32 / 1000.0, 1.0);
        }

        let mut remaining = elapsed as u64;
        let mut accumulated = 0.0f64;
        let mut last_rate = 1.0f32;

        for seg in &self.segments {
            let (r0, r1) = (f64::from(seg.initial_rate), f64::from(seg.final_rate));
            last_rate = seg.final_rate;
            if seg.is_infinite() {
                let remaining_sec = remaining as f64 / 1000.0;
                return ((accumulated + remaining_sec * r0) as f32, seg.initial_rate);
            }
            let seg_dur = u64::from(seg.duration_ms);
            if remaining < seg_dur {
                if seg_dur == 0 {
                    return (accumulated as f32, ((r0 + r1) / 2.0) as f32);
                }
                let u = remaining as f64 / seg_dur as f64;
                let d = seg_dur as f64 / 1000.0;
                let (warped_in, rate) = if (r0 - r1).abs() < 1e-9 {
                    (u * d * r0, r0)
                } else {
                    ((r0 + (r1 - r0) * u / 2.0) * u * d, r0 + (r1 - r0) * u)
                };
                return ((accumulated + warped_in) as f32, rate as f32);
            }
            let d = seg_dur as f64 / 1000.0;
            accumulated += (r0 + r1) / 2.0 * d;
            remaining -= seg_dur;
        }

        let remaining_sec = remaining as f64 / 1000.0;
        (
            (accumulated + remaining_sec * f64::from(last_rate)) as f32,
            last_rate,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_before_origin_and_empty_axis() {
        let axis = TimeAxis::new(0);
        assert_eq!(axis.map(500), 0.5);
        let axis2 = TimeAxis::new(1000);
        assert!(axis2.map(500) < 0.0);
    }

    #[test]
    fn constant_rate_doubles_warped_time() {
        let mut axis = TimeAxis::new(0);
        axis.push_segment(TimeSegment::constant(60_000, 2.0)).unwrap();
        let (warped, rate) = axis.map_ex(2500);
        assert!((warped - 5.0).abs() < 1e-3);
        assert!((rate - 2.0).abs() < 1e-3);
    }

    #[test]
    fn ramping_rate_mid_segment_matches_linear_average() {
        // forward_left_back scenario: realtime for 25s, then a 5s ramp from
        // rate 1.0 down to 0.0. At wall 27.5s (u = 0.5 into the ramp), the
        // instantaneous rate should be 0.5.
        let mut axis = TimeAxis::new(0);
        axis.push_segment(TimeSegment::constant(25_000, 1.0)).unwrap();
        axis.push_segment(TimeSegment {
            duration_ms: 5_000,
            initial_rate: 1.0,
            final_rate: 0.0,
        })
        .unwrap();
        let (_, rate) = axis.map_ex(27_500);
        assert!((rate - 0.5).abs() < 1e-3);
    }

    #[test]
    fn map_is_monotone_non_decreasing() {
        let mut axis = TimeAxis::new(0);
        axis.push_segment(TimeSegment {
            duration_ms: 10_000,
            initial_rate: 0.5,
            final_rate: 2.0,
        })
        .unwrap();
        axis.push_segment(TimeSegment::constant_forever(1.0)).unwrap();
        let mut prev = axis.map(0);
        for ms in (100..30_000).step_by(100) {
            let cur = axis.map(ms);
            assert!(cur >= prev - 1e-4, "map not monotone at {ms}");
            prev = cur;
        }
    }

    #[test]
    fn infinite_segment_extrapolates_at_constant_rate() {
        let mut axis = TimeAxis::new(0);
        axis.push_segment(TimeSegment::constant(1_000, 1.0)).unwrap();
        axis.push_segment(TimeSegment::constant_forever(3.0)).unwrap();
        let (warped, rate) = axis.map_ex(2_000);
        assert!((rate - 3.0).abs() < 1e-3);
        assert!((warped - (1.0 + 3.0)).abs() < 1e-3);
    }

    #[test]
    fn negative_rate_is_rejected() {
        let mut axis = TimeAxis::new(0);
        assert!(matches!(
            axis.push_segment(TimeSegment::constant(1000, -1.0)),
            Err(ShowError::InvalidArgument(_))
        ));
    }

    #[test]
    fn extrapolates_past_last_finite_segment_without_terminator() {
        let mut axis = TimeAxis::new(0);
        axis.push_segment(TimeSegment::constant(1_000, 2.0)).unwrap();
        let (warped, rate) = axis.map_ex(2_000);
        assert!((rate - 2.0).abs() < 1e-3);
        assert!((warped - 4.0).abs() < 1e-3);
    }
}
