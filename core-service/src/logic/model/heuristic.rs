//! Heuristic activity classifier
//!
//! Used when no model is configured, when the model is switched off, or
//! when ONNX inference fails.

use super::activity::{Activity, ActivityClassifier, ActivityPrediction, InferenceError, ACTIVITY_COUNT};
use crate::logic::features::FeatureVector;

/// Machines present in at least this share of frames
pub const MACHINE_PRESENCE_MIN: f32 = 0.3;
/// Persons next to a machine in at least this share of frames
pub const CO_PRESENCE_MIN: f32 = 0.2;
/// Mean person speed (px/s) above which people are moving around
pub const CIRCULATION_SPEED: f32 = 30.0;

const CONFIDENCE: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    machine_presence_min: f32,
    co_presence_min: f32,
    circulation_speed: f32,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self {
            machine_presence_min: MACHINE_PRESENCE_MIN,
            co_presence_min: CO_PRESENCE_MIN,
            circulation_speed: CIRCULATION_SPEED,
        }
    }
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_circulation_speed(mut self, speed: f32) -> Self {
        self.circulation_speed = speed;
        self
    }

    pub fn activity_for(&self, features: &FeatureVector) -> Activity {
        let value = |name: &str| features.get_by_name(name).unwrap_or(0.0);

        let persons = value("avg_num_persons");
        let machine_presence = value("machine_presence_ratio");
        let co_presence = value("co_presence_person_machine");
        let speed = value("avg_person_speed");

        if persons <= 0.0 {
            return Activity::Idle;
        }
        if machine_presence >= self.machine_presence_min && co_presence >= self.co_presence_min {
            return Activity::MachineOperation;
        }
        if speed > self.circulation_speed {
            return Activity::Circulation;
        }
        Activity::ManualWork
    }

    /// Never fails
    pub fn predict(&self, features: &FeatureVector) -> ActivityPrediction {
        let start = std::time::Instant::now();
        let activity = self.activity_for(features);

        let rest = (1.0 - CONFIDENCE) / (ACTIVITY_COUNT - 1) as f32;
        let probabilities = Activity::ALL
            .iter()
            .map(|a| if *a == activity { CONFIDENCE } else { rest })
            .collect();

        ActivityPrediction {
            activity_id: activity.id(),
            confidence: CONFIDENCE,
            probabilities,
            inference_time_us: start.elapsed().as_micros() as u64,
            method: "heuristic".to_string(),
        }
    }
}

impl ActivityClassifier for HeuristicClassifier {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn classify(&self, features: &FeatureVector) -> Result<ActivityPrediction, InferenceError> {
        Ok(self.predict(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[(&str, f32)]) -> FeatureVector {
        let mut v = FeatureVector::new();
        for (name, value) in values {
            assert!(v.set_by_name(name, *value));
        }
        v
    }

    #[test]
    fn test_empty_scene_is_idle() {
        let c = HeuristicClassifier::new();
        assert_eq!(c.activity_for(&FeatureVector::new()), Activity::Idle);
        // machines alone still idle
        let v = vector(&[("machine_presence_ratio", 1.0)]);
        assert_eq!(c.activity_for(&v), Activity::Idle);
    }

    #[test]
    fn test_machine_operation() {
        let v = vector(&[
            ("avg_num_persons", 1.0),
            ("machine_presence_ratio", 0.8),
            ("co_presence_person_machine", 0.8),
            ("avg_person_speed", 80.0),
        ]);
        assert_eq!(HeuristicClassifier::new().activity_for(&v), Activity::MachineOperation);
    }

    #[test]
    fn test_circulation_vs_manual_work() {
        let c = HeuristicClassifier::new();
        let walking = vector(&[("avg_num_persons", 2.0), ("avg_person_speed", 45.0)]);
        assert_eq!(c.activity_for(&walking), Activity::Circulation);

        let working = vector(&[("avg_num_persons", 2.0), ("avg_person_speed", 3.0)]);
        assert_eq!(c.activity_for(&working), Activity::ManualWork);
    }

    #[test]
    fn test_prediction_shape() {
        let p = HeuristicClassifier::new().predict(&vector(&[("avg_num_persons", 1.0)]));
        assert_eq!(p.activity_id, 2);
        assert_eq!(p.method, "heuristic");
        assert_eq!(p.probabilities.len(), ACTIVITY_COUNT);
        assert!((p.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }
}
