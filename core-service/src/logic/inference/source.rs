//! Frame sources
//!
//! Detector output arrives frame by frame. `JsonlFrameSource` replays a
//! recorded stream (one JSON object per line).

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::logic::detection::{Detection, RawDetection};

/// Detector output for one video frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame_index: u64,
    pub timestamp: DateTime<Utc>,
    pub detections: Vec<RawDetection>,
}

/// Sequential producer of frames
pub trait FrameSource {
    /// Native stream rate, if known
    fn fps(&self) -> Option<f64>;

    /// Next frame, `None` at end of stream
    fn next_frame(&mut self) -> CoreResult<Option<FrameDetections>>;
}

/// Destination for accepted detections
pub trait DetectionSink {
    fn save_batch(&mut self, detections: &[Detection]) -> CoreResult<usize>;
}

// ============================================================================
// JSONL REPLAY
// ============================================================================

/// On-disk frame line. Without a timestamp the frame time is derived
/// from the stream start and the frame index.
#[derive(Debug, Deserialize)]
struct FrameLine {
    frame_index: u64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    detections: Vec<RawDetection>,
}

pub struct JsonlFrameSource {
    lines: Lines<BufReader<File>>,
    fps: Option<f64>,
    start: DateTime<Utc>,
    line_no: usize,
}

impl JsonlFrameSource {
    pub fn open(path: &Path, fps: Option<f64>, start: DateTime<Utc>) -> CoreResult<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            fps,
            start,
            line_no: 0,
        })
    }

    fn derive_timestamp(&self, frame_index: u64) -> DateTime<Utc> {
        let fps = self.fps.filter(|f| *f > 0.0).unwrap_or(crate::constants::FALLBACK_SOURCE_FPS);
        let offset_ms = (frame_index as f64 * 1000.0 / fps).round() as i64;
        self.start + Duration::milliseconds(offset_ms)
    }
}

impl FrameSource for JsonlFrameSource {
    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> CoreResult<Option<FrameDetections>> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            let line = line?;
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let parsed: FrameLine = serde_json::from_str(&line).map_err(|e| {
                CoreError::InvalidInput(format!("frame line {}: {}", self.line_no, e))
            })?;
            let timestamp = parsed
                .timestamp
                .unwrap_or_else(|| self.derive_timestamp(parsed.frame_index));

            return Ok(Some(FrameDetections {
                frame_index: parsed.frame_index,
                timestamp,
                detections: parsed.detections,
            }));
        }
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// Frames held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameSource {
    fps: Option<f64>,
    frames: VecDeque<FrameDetections>,
}

impl MemoryFrameSource {
    pub fn new(fps: Option<f64>, frames: Vec<FrameDetections>) -> Self {
        Self {
            fps,
            frames: frames.into(),
        }
    }
}

impl FrameSource for MemoryFrameSource {
    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> CoreResult<Option<FrameDetections>> {
        Ok(self.frames.pop_front())
    }
}
