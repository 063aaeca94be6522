//! Sliding time windows over timestamp-sorted detections
//!
//! Windows are `[start + k*step, start + k*step + duration)` and are produced
//! while the window end stays within the requested range. Empty windows are
//! still yielded so window indices reflect time, not content.

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult};
use crate::logic::detection::Detection;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlidingWindow {
    duration: Duration,
    step: Duration,
}

impl SlidingWindow {
    pub fn new(duration_secs: f64, step_secs: f64) -> CoreResult<Self> {
        let duration = secs_to_duration(duration_secs);
        let step = secs_to_duration(step_secs);
        if duration <= Duration::zero() || step <= Duration::zero() {
            return Err(CoreError::Config(format!(
                "window duration and step must be positive (got {}s / {}s)",
                duration_secs, step_secs
            )));
        }
        Ok(Self { duration, step })
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.num_milliseconds() as f64 / 1000.0
    }

    pub fn step_secs(&self) -> f64 {
        self.step.num_milliseconds() as f64 / 1000.0
    }

    /// Iterate windows over `detections`, which must be sorted by timestamp
    pub fn windows<'a>(
        &self,
        detections: &'a [Detection],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Windows<'a> {
        Windows {
            detections,
            duration: self.duration,
            step: self.step,
            current: start,
            end,
            index: 0,
        }
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

/// One window and the detections inside it
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub detections: &'a [Detection],
}

impl<'a> Window<'a> {
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    /// Detections grouped by frame (same timestamp), in time order
    pub fn frames(&self) -> Vec<&'a [Detection]> {
        group_by_frame(self.detections)
    }

    /// Number of distinct timestamps
    pub fn frame_count(&self) -> usize {
        self.frames().len()
    }
}

pub struct Windows<'a> {
    detections: &'a [Detection],
    duration: Duration,
    step: Duration,
    current: DateTime<Utc>,
    end: DateTime<Utc>,
    index: usize,
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let window_end = self.current + self.duration;
        if window_end > self.end {
            return None;
        }

        let lo = self.detections.partition_point(|d| d.timestamp < self.current);
        let hi = self.detections.partition_point(|d| d.timestamp < window_end);
        let window = Window {
            index: self.index,
            start: self.current,
            end: window_end,
            detections: &self.detections[lo..hi.max(lo)],
        };

        self.current = self.current + self.step;
        self.index += 1;
        Some(window)
    }
}

/// Split sorted detections into runs sharing one timestamp
pub fn group_by_frame(detections: &[Detection]) -> Vec<&[Detection]> {
    let mut frames = Vec::new();
    let mut begin = 0;
    for i in 1..=detections.len() {
        if i == detections.len() || detections[i].timestamp != detections[begin].timestamp {
            if i > begin {
                frames.push(&detections[begin..i]);
            }
            begin = i;
        }
    }
    frames
}
