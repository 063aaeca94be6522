//! EPI (personal protective equipment) features
//!
//! A PPE box is attached to a person when its center lies inside the
//! person box of the same frame. Violations are explicit only: a person
//! with no helmet box at all is "unknown", not "no helmet".

use std::collections::BTreeMap;

use super::row::{FeatureRow, WindowExtractor};
use super::sliding_window::Window;
use super::statistics::ratio;
use crate::logic::detection::classes;

/// Consecutive violating windows before a violation is persistent
pub const PERSISTENT_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpiItem {
    Helmet,
    Vest,
    Mask,
}

/// Detector class -> (item, worn)
pub fn epi_mapping(class_name: &str) -> Option<(EpiItem, bool)> {
    match class_name {
        classes::HARDHAT => Some((EpiItem::Helmet, true)),
        classes::NO_HARDHAT => Some((EpiItem::Helmet, false)),
        classes::SAFETY_VEST => Some((EpiItem::Vest, true)),
        classes::NO_SAFETY_VEST => Some((EpiItem::Vest, false)),
        classes::MASK => Some((EpiItem::Mask, true)),
        classes::NO_MASK => Some((EpiItem::Mask, false)),
        _ => None,
    }
}

/// Observed state of one person; `None` = not observed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpiState {
    pub helmet: Option<bool>,
    pub vest: Option<bool>,
    pub mask: Option<bool>,
}

impl EpiState {
    fn set(&mut self, item: EpiItem, worn: bool) {
        match item {
            EpiItem::Helmet => self.helmet = Some(worn),
            EpiItem::Vest => self.vest = Some(worn),
            EpiItem::Mask => self.mask = Some(worn),
        }
    }
}

pub struct EpiFeatures {
    window_duration: f64,
    persistent_threshold: u32,
    consecutive_violations: u32,
}

impl EpiFeatures {
    pub fn new(window_duration: f64) -> Self {
        Self {
            window_duration,
            persistent_threshold: PERSISTENT_THRESHOLD,
            consecutive_violations: 0,
        }
    }

    pub fn with_persistent_threshold(mut self, threshold: u32) -> Self {
        self.persistent_threshold = threshold;
        self
    }

    pub fn consecutive_violations(&self) -> u32 {
        self.consecutive_violations
    }

    /// State per person track. Each person observation starts from an empty
    /// state, so the last observation of a track in the window wins.
    pub fn associate(window: &Window<'_>) -> BTreeMap<u32, EpiState> {
        let mut result = BTreeMap::new();

        for frame in window.frames() {
            let epis: Vec<_> = frame
                .iter()
                .filter_map(|d| epi_mapping(&d.object_class).map(|m| (d, m)))
                .collect();

            for person in frame.iter().filter(|d| d.is_person()) {
                let mut state = EpiState::default();
                for (epi, (item, worn)) in &epis {
                    let (cx, cy) = epi.bbox.center();
                    if person.bbox.contains(cx, cy) {
                        state.set(*item, *worn);
                    }
                }
                result.insert(person.track_id, state);
            }
        }

        result
    }

    fn write_empty(row: &mut FeatureRow) {
        row.set_all(&[
            ("helmet_compliance_ratio", 0.0),
            ("vest_compliance_ratio", 0.0),
            ("mask_compliance_ratio", 0.0),
            ("avg_epi_compliance", 0.0),
            ("num_no_helmet_events", 0.0),
            ("num_no_vest_events", 0.0),
            ("num_no_mask_events", 0.0),
            ("epi_violation_duration", 0.0),
            ("persistent_epi_violation", 0.0),
        ]);
    }
}

fn compliance(states: &[Option<bool>]) -> (f64, usize) {
    let observed: Vec<bool> = states.iter().flatten().copied().collect();
    let worn = observed.iter().filter(|w| **w).count();
    let violations = observed.len() - worn;
    (ratio(worn as f64, observed.len() as f64), violations)
}

impl WindowExtractor for EpiFeatures {
    fn name(&self) -> &'static str {
        "epi"
    }

    fn extract(&mut self, window: &Window<'_>, row: &mut FeatureRow) {
        if window.is_empty() || !window.detections.iter().any(|d| d.is_person()) {
            Self::write_empty(row);
            return;
        }

        let states = Self::associate(window);
        let helmets: Vec<_> = states.values().map(|s| s.helmet).collect();
        let vests: Vec<_> = states.values().map(|s| s.vest).collect();
        let masks: Vec<_> = states.values().map(|s| s.mask).collect();

        let (helmet_ratio, no_helmet) = compliance(&helmets);
        let (vest_ratio, no_vest) = compliance(&vests);
        let (mask_ratio, no_mask) = compliance(&masks);

        if no_helmet + no_vest + no_mask > 0 {
            self.consecutive_violations += 1;
        } else {
            self.consecutive_violations = 0;
        }
        let persistent = self.consecutive_violations >= self.persistent_threshold;

        row.set_all(&[
            ("helmet_compliance_ratio", helmet_ratio),
            ("vest_compliance_ratio", vest_ratio),
            ("mask_compliance_ratio", mask_ratio),
            ("avg_epi_compliance", (helmet_ratio + vest_ratio + mask_ratio) / 3.0),
            ("num_no_helmet_events", no_helmet as f64),
            ("num_no_vest_events", no_vest as f64),
            ("num_no_mask_events", no_mask as f64),
            (
                "epi_violation_duration",
                self.consecutive_violations as f64 * self.window_duration,
            ),
            ("persistent_epi_violation", if persistent { 1.0 } else { 0.0 }),
        ]);
    }
}
