//! Inference Runner
//!
//! Sample frames, filter boxes by confidence, track, persist in batches.

use serde::{Deserialize, Serialize};

use super::source::{DetectionSink, FrameSource};
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_TARGET_FPS, FALLBACK_SOURCE_FPS};
use crate::error::CoreResult;
use crate::logic::detection::{normalize_class_name, BBox, ConfidenceResolver, Detection};
use crate::logic::tracking::CentroidTracker;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub frames_read: u64,
    pub frames_processed: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub saved: u64,
    pub batches_flushed: u64,
}

/// Keep one frame in `step` so that roughly `target_fps` frames remain
pub fn frame_step(source_fps: Option<f64>, target_fps: f64) -> u64 {
    let fps = source_fps.filter(|f| *f > 0.0).unwrap_or(FALLBACK_SOURCE_FPS);
    if target_fps <= 0.0 {
        return 1;
    }
    ((fps / target_fps).floor() as u64).max(1)
}

pub struct InferenceRunner {
    camera_id: i64,
    target_fps: f64,
    batch_size: usize,
    resolver: ConfidenceResolver,
    tracker: CentroidTracker,
}

impl InferenceRunner {
    pub fn new(camera_id: i64, resolver: ConfidenceResolver) -> Self {
        Self {
            camera_id,
            target_fps: DEFAULT_TARGET_FPS,
            batch_size: DEFAULT_BATCH_SIZE,
            resolver,
            tracker: CentroidTracker::default(),
        }
    }

    pub fn with_target_fps(mut self, target_fps: f64) -> Self {
        self.target_fps = target_fps;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_tracker(mut self, tracker: CentroidTracker) -> Self {
        self.tracker = tracker;
        self
    }

    fn flush<K: DetectionSink>(sink: &mut K, buffer: &mut Vec<Detection>, stats: &mut RunStats) -> CoreResult<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        let saved = sink.save_batch(buffer)?;
        stats.saved += saved as u64;
        stats.batches_flushed += 1;
        buffer.clear();
        Ok(())
    }

    /// Consume the whole source
    pub fn run<S: FrameSource, K: DetectionSink>(&mut self, source: &mut S, sink: &mut K) -> CoreResult<RunStats> {
        let step = frame_step(source.fps(), self.target_fps);
        log::info!(
            "Inference started (camera={}, fps={:?}, frame_step={}, batch={})",
            self.camera_id,
            source.fps(),
            step,
            self.batch_size
        );

        let mut stats = RunStats::default();
        let mut buffer: Vec<Detection> = Vec::with_capacity(self.batch_size);

        while let Some(frame) = source.next_frame()? {
            stats.frames_read += 1;
            if frame.frame_index % step != 0 {
                continue;
            }
            stats.frames_processed += 1;

            for raw in frame.detections {
                let class_name = normalize_class_name(&raw.class_name);
                let threshold = self.resolver.threshold(&class_name);

                // compared at detector precision: 0.45f32 widened is below 0.45f64
                if raw.confidence < threshold as f32 {
                    log::debug!(
                        "Rejected {} ({:.2} < {:.2}) at frame {}",
                        class_name,
                        raw.confidence,
                        threshold,
                        frame.frame_index
                    );
                    stats.rejected += 1;
                    continue;
                }

                let track_id = self.tracker.track(raw.bbox, &class_name, frame.frame_index);
                log::debug!(
                    "Accepted {} #{} ({:.2}) at frame {}",
                    class_name,
                    track_id,
                    raw.confidence,
                    frame.frame_index
                );
                stats.accepted += 1;

                buffer.push(Detection {
                    camera_id: self.camera_id,
                    timestamp: frame.timestamp,
                    object_class: class_name,
                    confidence: raw.confidence,
                    bbox: BBox::from_xyxy(raw.bbox),
                    track_id,
                });
            }

            if buffer.len() >= self.batch_size {
                Self::flush(sink, &mut buffer, &mut stats)?;
            }
        }

        Self::flush(sink, &mut buffer, &mut stats)?;

        log::info!(
            "Inference finished: {} frames read, {} processed, {} accepted, {} rejected, {} batches",
            stats.frames_read,
            stats.frames_processed,
            stats.accepted,
            stats.rejected,
            stats.batches_flushed
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::detection::{ConfidenceConfig, RawDetection};
    use crate::logic::inference::{FrameDetections, MemoryFrameSource};
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashMap;

    #[derive(Default)]
    struct VecSink {
        batches: Vec<Vec<Detection>>,
    }

    impl DetectionSink for VecSink {
        fn save_batch(&mut self, detections: &[Detection]) -> CoreResult<usize> {
            self.batches.push(detections.to_vec());
            Ok(detections.len())
        }
    }

    fn raw(class: &str, conf: f32, x: f64) -> RawDetection {
        RawDetection {
            class_name: class.to_string(),
            confidence: conf,
            bbox: [x, 0.0, x + 20.0, 40.0],
        }
    }

    fn frames(count: u64, per_frame: Vec<RawDetection>) -> Vec<FrameDetections> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| FrameDetections {
                frame_index: i,
                timestamp: start + Duration::milliseconds(i as i64 * 40),
                detections: per_frame.clone(),
            })
            .collect()
    }

    #[test]
    fn test_frame_step() {
        assert_eq!(frame_step(Some(25.0), 5.0), 5);
        assert_eq!(frame_step(None, 5.0), 5);
        assert_eq!(frame_step(Some(0.0), 5.0), 5);
        assert_eq!(frame_step(Some(3.0), 5.0), 1);
        assert_eq!(frame_step(Some(29.97), 5.0), 5);
    }

    #[test]
    fn test_sampling_filtering_and_flush() {
        let mut source = MemoryFrameSource::new(
            Some(25.0),
            frames(10, vec![raw("Person", 0.9, 0.0), raw("Person", 0.3, 500.0)]),
        );
        let mut sink = VecSink::default();
        let mut runner = InferenceRunner::new(4, ConfidenceResolver::default()).with_batch_size(20);

        let stats = runner.run(&mut source, &mut sink).unwrap();

        // frames 0 and 5 are processed
        assert_eq!(stats.frames_read, 10);
        assert_eq!(stats.frames_processed, 2);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected, 2);
        // nothing reached the batch size: one final flush
        assert_eq!(sink.batches.len(), 1);

        let saved = &sink.batches[0];
        assert_eq!(saved[0].object_class, "person");
        assert_eq!(saved[0].camera_id, 4);
        assert_eq!(saved[0].bbox, BBox::new(0.0, 0.0, 20.0, 40.0));
        // same object across sampled frames keeps its id
        assert_eq!(saved[0].track_id, saved[1].track_id);
    }

    #[test]
    fn test_flushes_when_batch_is_full() {
        let mut source = MemoryFrameSource::new(
            Some(5.0),
            frames(5, vec![raw("person", 0.9, 0.0), raw("vehicle", 0.9, 300.0)]),
        );
        let mut sink = VecSink::default();
        let mut runner = InferenceRunner::new(1, ConfidenceResolver::default()).with_batch_size(3);

        let stats = runner.run(&mut source, &mut sink).unwrap();

        // buffer checked after each frame: 4, 4, then the final 2
        let sizes: Vec<usize> = sink.batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(stats.saved, 10);
    }

    #[test]
    fn test_frame_boxes_share_timestamp() {
        let mut source = MemoryFrameSource::new(
            Some(5.0),
            frames(1, vec![raw("person", 0.9, 0.0), raw("hardhat", 0.9, 5.0)]),
        );
        let mut sink = VecSink::default();
        let defaults = ConfidenceConfig {
            default: HashMap::from([("hardhat".to_string(), 0.95)]),
        };
        let resolver = ConfidenceResolver::new(None, None, defaults);
        let mut runner = InferenceRunner::new(1, resolver);

        let stats = runner.run(&mut source, &mut sink).unwrap();
        assert_eq!(stats.rejected, 1);

        let mut source = MemoryFrameSource::new(
            Some(5.0),
            frames(1, vec![raw("person", 0.9, 0.0), raw("vehicle", 0.9, 300.0)]),
        );
        let mut sink = VecSink::default();
        InferenceRunner::new(1, ConfidenceResolver::default())
            .run(&mut source, &mut sink)
            .unwrap();
        let batch = &sink.batches[0];
        assert_eq!(batch[0].timestamp, batch[1].timestamp);
    }

    #[test]
    fn test_confidence_equal_to_threshold_is_kept() {
        let mut source = MemoryFrameSource::new(
            Some(5.0),
            frames(1, vec![raw("vehicle", 0.45, 0.0), raw("machinery", 0.44, 300.0)]),
        );
        let mut sink = VecSink::default();
        let defaults = ConfidenceConfig {
            default: HashMap::from([("vehicle".to_string(), 0.45), ("machinery".to_string(), 0.45)]),
        };
        let mut runner = InferenceRunner::new(1, ConfidenceResolver::new(None, None, defaults));

        let stats = runner.run(&mut source, &mut sink).unwrap();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(sink.batches[0][0].object_class, "vehicle");
    }
}
