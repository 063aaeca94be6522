//! Machine / vehicle features

use std::collections::BTreeSet;

use super::row::{FeatureRow, WindowExtractor};
use super::statistics::{mean, ratio};
use super::sliding_window::Window;
use crate::logic::detection::classes;

pub struct MachineVehicleFeatures {
    window_duration: f64,
}

impl MachineVehicleFeatures {
    pub fn new(window_duration: f64) -> Self {
        Self { window_duration }
    }

    fn write_empty(row: &mut FeatureRow) {
        row.set_all(&[
            ("num_machines_avg", 0.0),
            ("machine_presence_ratio", 0.0),
            ("unique_machine_tracks", 0.0),
            ("machine_type_ratio", 0.0),
            ("co_presence_person_machine", 0.0),
            ("machine_dominance_ratio", 0.0),
            ("machine_only_duration", 0.0),
        ]);
    }
}

impl WindowExtractor for MachineVehicleFeatures {
    fn name(&self) -> &'static str {
        "machine"
    }

    fn extract(&mut self, window: &Window<'_>, row: &mut FeatureRow) {
        let frames = window.frames();
        if frames.is_empty() {
            Self::write_empty(row);
            return;
        }

        let mut machines_per_frame = Vec::with_capacity(frames.len());
        let mut presence = 0usize;
        let mut co_presence = 0usize;
        let mut dominance = 0usize;
        let mut machine_only = 0usize;

        for frame in &frames {
            let persons: BTreeSet<u32> = frame.iter().filter(|d| d.is_person()).map(|d| d.track_id).collect();
            let machines: BTreeSet<u32> = frame.iter().filter(|d| d.is_machine()).map(|d| d.track_id).collect();
            let (p, m) = (persons.len(), machines.len());

            machines_per_frame.push(m as f64);
            if m > 0 {
                presence += 1;
                if p > 0 {
                    co_presence += 1;
                } else {
                    machine_only += 1;
                }
            }
            if m > p {
                dominance += 1;
            }
        }

        let vehicles: BTreeSet<u32> = window
            .detections
            .iter()
            .filter(|d| d.object_class == classes::VEHICLE)
            .map(|d| d.track_id)
            .collect();
        let machinery: BTreeSet<u32> = window
            .detections
            .iter()
            .filter(|d| d.object_class == classes::MACHINERY)
            .map(|d| d.track_id)
            .collect();
        let unique_tracks = vehicles.union(&machinery).count();

        let n = frames.len() as f64;
        row.set_all(&[
            ("num_machines_avg", mean(&machines_per_frame)),
            ("machine_presence_ratio", presence as f64 / n),
            ("unique_machine_tracks", unique_tracks as f64),
            (
                "machine_type_ratio",
                ratio(vehicles.len() as f64, (vehicles.len() + machinery.len()) as f64),
            ),
            ("co_presence_person_machine", co_presence as f64 / n),
            ("machine_dominance_ratio", dominance as f64 / n),
            ("machine_only_duration", machine_only as f64 / n * self.window_duration),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::tests::{det, window_over};

    #[test]
    fn test_machine_counts() {
        let dets = vec![
            // frame 0: person + excavator
            det(0, "person", 1, 0.0, 0.0),
            det(0, "machinery", 2, 400.0, 0.0),
            // frame 1: truck + excavator, nobody around
            det(1000, "vehicle", 3, 800.0, 0.0),
            det(1000, "machinery", 2, 410.0, 0.0),
            // frame 2: one person
            det(2000, "person", 1, 5.0, 0.0),
            det(3000, "person", 1, 10.0, 0.0),
        ];
        let window = window_over(&dets);
        let mut row = FeatureRow::for_window(1, &window);
        MachineVehicleFeatures::new(10.0).extract(&window, &mut row);

        assert_eq!(row.value("num_machines_avg"), 0.75);
        assert_eq!(row.value("machine_presence_ratio"), 0.5);
        assert_eq!(row.value("unique_machine_tracks"), 2.0);
        assert_eq!(row.value("machine_type_ratio"), 0.5);
        assert_eq!(row.value("co_presence_person_machine"), 0.25);
        assert_eq!(row.value("machine_dominance_ratio"), 0.25);
        assert_eq!(row.value("machine_only_duration"), 2.5);
    }

    #[test]
    fn test_persons_only() {
        let dets = vec![det(0, "person", 1, 0.0, 0.0)];
        let window = window_over(&dets);
        let mut row = FeatureRow::for_window(1, &window);
        MachineVehicleFeatures::new(10.0).extract(&window, &mut row);
        assert_eq!(row.value("machine_presence_ratio"), 0.0);
        assert_eq!(row.value("machine_type_ratio"), 0.0);
    }
}
