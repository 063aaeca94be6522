//! Detection Repository
//!
//! SQLite persistence for sites, cameras, detections, zones and risk events.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::retry::{with_retry, RetryPolicy};
use super::schema::SCHEMA_SQL;
use crate::error::{CoreError, CoreResult};
use crate::logic::detection::{BBox, Detection};
use crate::logic::features::{Homography, Zone};
use crate::logic::inference::DetectionSink;
use crate::logic::risk::{RiskEvent, RiskLevel};

// ============================================================================
// RECORDS
// ============================================================================

/// Camera registration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraRecord {
    pub id: i64,
    pub site_id: i64,
    pub name: String,
    /// Raw JSON object of class -> threshold
    pub confidence_config: Option<String>,
    pub homography: Option<Homography>,
}

fn from_millis(ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(0, ms))
}

fn row_to_detection(row: &Row) -> rusqlite::Result<Detection> {
    Ok(Detection {
        camera_id: row.get("camera_id")?,
        timestamp: from_millis(row.get("timestamp_ms")?)?,
        object_class: row.get("object_class")?,
        confidence: row.get::<_, f64>("confidence")? as f32,
        bbox: BBox::new(
            row.get("bbox_x")?,
            row.get("bbox_y")?,
            row.get("bbox_w")?,
            row.get("bbox_h")?,
        ),
        track_id: row.get("track_id")?,
    })
}

fn insert_batch(conn: &mut Connection, detections: &[Detection]) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO detections
                (camera_id, timestamp_ms, object_class, confidence,
                 bbox_x, bbox_y, bbox_w, bbox_h, track_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for d in detections {
            stmt.execute(params![
                d.camera_id,
                d.timestamp.timestamp_millis(),
                d.object_class,
                d.confidence as f64,
                d.bbox.x,
                d.bbox.y,
                d.bbox.w,
                d.bbox.h,
                d.track_id,
            ])?;
        }
    }
    tx.commit()?;
    Ok(detections.len())
}

// ============================================================================
// REPOSITORY
// ============================================================================

pub struct DetectionRepository {
    conn: Connection,
    retry: RetryPolicy,
}

impl DetectionRepository {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(path: &Path) -> CoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let repo = Self {
            conn,
            retry: RetryPolicy::default(),
        };
        repo.init_schema()?;
        log::info!("Database opened at {:?}", path);
        Ok(repo)
    }

    pub fn open_in_memory() -> CoreResult<Self> {
        let repo = Self {
            conn: Connection::open_in_memory()?,
            retry: RetryPolicy::default(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn init_schema(&self) -> CoreResult<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sites & cameras
    // ------------------------------------------------------------------

    /// An empty `name` keeps the stored one
    pub fn upsert_site(&self, id: i64, name: &str, confidence_config: Option<&str>) -> CoreResult<()> {
        self.conn.execute(
            "INSERT INTO sites (id, name, confidence_config) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                name = COALESCE(NULLIF(excluded.name, ''), sites.name),
                confidence_config = COALESCE(excluded.confidence_config, sites.confidence_config)",
            params![id, name, confidence_config],
        )?;
        Ok(())
    }

    pub fn upsert_camera(&self, camera: &CameraRecord) -> CoreResult<()> {
        let homography = camera
            .homography
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO cameras (id, site_id, name, confidence_config, homography)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                site_id = excluded.site_id,
                name = COALESCE(NULLIF(excluded.name, ''), cameras.name),
                confidence_config = COALESCE(excluded.confidence_config, cameras.confidence_config),
                homography = COALESCE(excluded.homography, cameras.homography)",
            params![
                camera.id,
                camera.site_id,
                camera.name,
                camera.confidence_config,
                homography
            ],
        )?;
        Ok(())
    }

    /// Site owning a camera, if the camera is registered
    pub fn camera_site_id(&self, camera_id: i64) -> CoreResult<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT site_id FROM cameras WHERE id = ?1",
                params![camera_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn site_name(&self, site_id: i64) -> CoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT name FROM sites WHERE id = ?1", params![site_id], |row| row.get(0))
            .optional()?)
    }

    pub fn camera_confidence_config(&self, camera_id: i64) -> CoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT confidence_config FROM cameras WHERE id = ?1",
                params![camera_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten())
    }

    pub fn site_confidence_config(&self, site_id: i64) -> CoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT confidence_config FROM sites WHERE id = ?1",
                params![site_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten())
    }

    pub fn set_camera_confidence_config(&self, camera_id: i64, config: Option<&str>) -> CoreResult<()> {
        let updated = self.conn.execute(
            "UPDATE cameras SET confidence_config = ?2 WHERE id = ?1",
            params![camera_id, config],
        )?;
        if updated == 0 {
            return Err(CoreError::NotFound(format!("camera {}", camera_id)));
        }
        Ok(())
    }

    pub fn set_site_confidence_config(&self, site_id: i64, config: Option<&str>) -> CoreResult<()> {
        let updated = self.conn.execute(
            "UPDATE sites SET confidence_config = ?2 WHERE id = ?1",
            params![site_id, config],
        )?;
        if updated == 0 {
            return Err(CoreError::NotFound(format!("site {}", site_id)));
        }
        Ok(())
    }

    /// Image -> ground matrix. An unparsable value is treated as absent.
    pub fn camera_homography(&self, camera_id: i64) -> CoreResult<Option<Homography>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT homography FROM cameras WHERE id = ?1",
                params![camera_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();

        Ok(raw.and_then(|text| match serde_json::from_str::<Homography>(&text) {
            Ok(h) => Some(h),
            Err(e) => {
                log::warn!("Camera {} has an invalid homography: {}", camera_id, e);
                None
            }
        }))
    }

    // ------------------------------------------------------------------
    // Detections
    // ------------------------------------------------------------------

    /// Insert all rows in one transaction, retrying while the DB is busy
    pub fn save_detections_batch(&mut self, detections: &[Detection]) -> CoreResult<usize> {
        if detections.is_empty() {
            return Ok(0);
        }
        let policy = self.retry;
        let conn = &mut self.conn;
        let saved = with_retry(&policy, "save_detections_batch", || {
            insert_batch(&mut *conn, detections)
        })?;
        log::debug!("Saved {} detections", saved);
        Ok(saved)
    }

    pub fn try_get_detections_for_frame(
        &self,
        camera_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<Detection>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT camera_id, timestamp_ms, object_class, confidence,
                    bbox_x, bbox_y, bbox_w, bbox_h, track_id
             FROM detections
             WHERE camera_id = ?1 AND timestamp_ms >= ?2 AND timestamp_ms < ?3
             ORDER BY timestamp_ms ASC, id ASC",
        )?;
        let rows = stmt.query_map(
            params![camera_id, start.timestamp_millis(), end.timestamp_millis()],
            row_to_detection,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Detections with `start <= ts < end`, oldest first.
    /// Read errors are logged and produce an empty list.
    pub fn get_detections_for_frame(
        &self,
        camera_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Detection> {
        match self.try_get_detections_for_frame(camera_id, start, end) {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Failed to read detections for camera {}: {}", camera_id, e);
                Vec::new()
            }
        }
    }

    /// Same as [`get_detections_for_frame`](Self::get_detections_for_frame) for several cameras
    pub fn get_detections(
        &self,
        camera_ids: &[i64],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Detection> {
        let mut all: Vec<Detection> = camera_ids
            .iter()
            .flat_map(|&id| self.get_detections_for_frame(id, start, end))
            .collect();
        // stable: per-camera order survives for equal timestamps
        all.sort_by_key(|d| d.timestamp);
        all
    }

    /// Time span covered by a camera's detections
    pub fn detection_time_range(&self, camera_id: i64) -> CoreResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let (min, max): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(timestamp_ms), MAX(timestamp_ms) FROM detections WHERE camera_id = ?1",
            params![camera_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        match (min, max) {
            (Some(min), Some(max)) => Ok(Some((from_millis(min)?, from_millis(max)?))),
            _ => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Zones
    // ------------------------------------------------------------------

    pub fn insert_zone(&self, camera_id: i64, zone: &Zone) -> CoreResult<i64> {
        if zone.polygon.len() < 3 {
            return Err(CoreError::InvalidInput(format!(
                "zone '{}' needs at least 3 vertices",
                zone.zone_type
            )));
        }
        let polygon = serde_json::to_string(&zone.polygon)?;
        self.conn.execute(
            "INSERT INTO zones (camera_id, zone_type, risk_level, polygon) VALUES (?1, ?2, ?3, ?4)",
            params![camera_id, zone.zone_type, zone.risk_level.as_str(), polygon],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Zones of a camera. Rows with an unreadable polygon or level are skipped.
    pub fn zones_for_camera(&self, camera_id: i64) -> CoreResult<Vec<Zone>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, zone_type, risk_level, polygon FROM zones WHERE camera_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![camera_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut zones = Vec::new();
        for row in rows {
            let (id, zone_type, level, polygon) = row?;
            let Some(risk_level) = RiskLevel::parse(&level) else {
                log::warn!("Zone {} has unknown risk level '{}'", id, level);
                continue;
            };
            match serde_json::from_str(&polygon) {
                Ok(polygon) => zones.push(Zone {
                    id,
                    zone_type,
                    risk_level,
                    polygon,
                }),
                Err(e) => log::warn!("Zone {} has an invalid polygon: {}", id, e),
            }
        }
        Ok(zones)
    }

    // ------------------------------------------------------------------
    // Risk events
    // ------------------------------------------------------------------

    /// Insert the event, or replace the one already stored for the same window.
    /// Returns the row id either way.
    pub fn save_risk_event(&self, event: &RiskEvent) -> CoreResult<i64> {
        let id = self.conn.query_row(
            "INSERT INTO risk_events
                (camera_id, window_start_ms, window_end_ms, activity_id,
                 risk_score, risk_level, violated_rules, missing_epi)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(camera_id, window_start_ms, window_end_ms) DO UPDATE SET
                activity_id = excluded.activity_id,
                risk_score = excluded.risk_score,
                risk_level = excluded.risk_level,
                violated_rules = excluded.violated_rules,
                missing_epi = excluded.missing_epi
             RETURNING id",
            params![
                event.camera_id,
                event.window_start.timestamp_millis(),
                event.window_end.timestamp_millis(),
                event.activity_id,
                event.risk_score,
                event.risk_level.as_str(),
                serde_json::to_string(&event.violated_rules)?,
                serde_json::to_string(&event.missing_epi)?,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Risk events whose window starts in `[start, end)`
    pub fn list_risk_events(
        &self,
        camera_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<RiskEvent>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT camera_id, window_start_ms, window_end_ms, activity_id,
                    risk_score, risk_level, violated_rules, missing_epi
             FROM risk_events
             WHERE camera_id = ?1 AND window_start_ms >= ?2 AND window_start_ms < ?3
             ORDER BY window_start_ms ASC",
        )?;
        let rows = stmt.query_map(
            params![camera_id, start.timestamp_millis(), end.timestamp_millis()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            },
        )?;

        let mut events = Vec::new();
        for row in rows {
            let (camera_id, start_ms, end_ms, activity_id, risk_score, level, rules, epi) = row?;
            events.push(RiskEvent {
                camera_id,
                window_start: from_millis(start_ms)?,
                window_end: from_millis(end_ms)?,
                activity_id,
                risk_score,
                risk_level: RiskLevel::parse(&level).unwrap_or_default(),
                violated_rules: serde_json::from_str(&rules)?,
                missing_epi: serde_json::from_str(&epi)?,
            });
        }
        Ok(events)
    }
}

impl DetectionSink for DetectionRepository {
    fn save_batch(&mut self, detections: &[Detection]) -> CoreResult<usize> {
        self.save_detections_batch(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn det(camera_id: i64, secs: i64, class: &str, track_id: u32) -> Detection {
        Detection {
            camera_id,
            timestamp: ts(secs),
            object_class: class.to_string(),
            confidence: 0.75,
            bbox: BBox::new(10.0, 20.0, 30.0, 40.0),
            track_id,
        }
    }

    #[test]
    fn test_batch_roundtrip_and_range_bounds() {
        let mut repo = DetectionRepository::open_in_memory().unwrap();
        let saved = repo
            .save_detections_batch(&[det(1, 2, "person", 1), det(1, 0, "person", 1), det(1, 5, "vehicle", 2)])
            .unwrap();
        assert_eq!(saved, 3);

        // start inclusive, end exclusive, ascending order
        let rows = repo.get_detections_for_frame(1, ts(0), ts(5));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, ts(0));
        assert_eq!(rows[1].timestamp, ts(2));
        assert_eq!(rows[0].bbox, BBox::new(10.0, 20.0, 30.0, 40.0));
        assert!((rows[0].confidence - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut repo = DetectionRepository::open_in_memory().unwrap();
        assert_eq!(repo.save_detections_batch(&[]).unwrap(), 0);
        assert!(repo.detection_time_range(1).unwrap().is_none());
    }

    #[test]
    fn test_get_detections_merges_cameras() {
        let mut repo = DetectionRepository::open_in_memory().unwrap();
        repo.save_detections_batch(&[det(1, 3, "person", 1), det(2, 1, "person", 1), det(3, 2, "person", 1)])
            .unwrap();
        let rows = repo.get_detections(&[1, 2], ts(0), ts(10));
        let cams: Vec<i64> = rows.iter().map(|d| d.camera_id).collect();
        assert_eq!(cams, vec![2, 1]);
    }

    #[test]
    fn test_confidence_config_lookup() {
        let repo = DetectionRepository::open_in_memory().unwrap();
        repo.upsert_site(1, "North yard", Some(r#"{"person": 0.5}"#)).unwrap();
        repo.upsert_camera(&CameraRecord {
            id: 7,
            site_id: 1,
            name: "Gate".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(repo.camera_site_id(7).unwrap(), Some(1));
        assert_eq!(repo.camera_confidence_config(7).unwrap(), None);
        assert_eq!(
            repo.site_confidence_config(1).unwrap().as_deref(),
            Some(r#"{"person": 0.5}"#)
        );
        assert_eq!(repo.camera_confidence_config(99).unwrap(), None);

        repo.set_camera_confidence_config(7, Some(r#"{"person": 0.8}"#)).unwrap();
        assert!(repo.camera_confidence_config(7).unwrap().is_some());
        assert!(repo.set_camera_confidence_config(99, None).is_err());
    }

    #[test]
    fn test_homography_roundtrip() {
        let repo = DetectionRepository::open_in_memory().unwrap();
        repo.upsert_site(1, "Site", None).unwrap();
        let h = [[1.0, 0.0, 5.0], [0.0, 1.0, -2.0], [0.0, 0.0, 1.0]];
        repo.upsert_camera(&CameraRecord {
            id: 3,
            site_id: 1,
            name: "Crane".to_string(),
            confidence_config: None,
            homography: Some(h),
        })
        .unwrap();
        assert_eq!(repo.camera_homography(3).unwrap(), Some(h));
        assert_eq!(repo.camera_homography(4).unwrap(), None);
    }

    #[test]
    fn test_zones_roundtrip() {
        let repo = DetectionRepository::open_in_memory().unwrap();
        let zone = Zone {
            id: 0,
            zone_type: "excavation".to_string(),
            risk_level: RiskLevel::High,
            polygon: vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)],
        };
        let id = repo.insert_zone(5, &zone).unwrap();
        let zones = repo.zones_for_camera(5).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].id, id);
        assert_eq!(zones[0].risk_level, RiskLevel::High);
        assert_eq!(zones[0].polygon, zone.polygon);

        let degenerate = Zone {
            polygon: vec![(0.0, 0.0), (1.0, 1.0)],
            ..zone
        };
        assert!(repo.insert_zone(5, &degenerate).is_err());
    }

    #[test]
    fn test_risk_events_roundtrip() {
        let repo = DetectionRepository::open_in_memory().unwrap();
        let event = RiskEvent {
            camera_id: 2,
            window_start: ts(0),
            window_end: ts(10),
            activity_id: 3,
            risk_score: 65.0,
            risk_level: RiskLevel::High,
            violated_rules: vec!["R1".to_string()],
            missing_epi: vec!["helmet".to_string()],
        };
        repo.save_risk_event(&event).unwrap();
        let events = repo.list_risk_events(2, ts(0), ts(60)).unwrap();
        assert_eq!(events, vec![event]);
        assert!(repo.list_risk_events(2, ts(1), ts(60)).unwrap().is_empty());
    }

    #[test]
    fn test_read_error_gives_empty_list() {
        let mut repo = DetectionRepository::open_in_memory().unwrap();
        repo.save_detections_batch(&[det(1, 0, "person", 1)]).unwrap();
        repo.conn.execute_batch("DROP TABLE detections").unwrap();

        assert!(repo.try_get_detections_for_frame(1, ts(0), ts(10)).is_err());
        assert_eq!(repo.get_detections_for_frame(1, ts(0), ts(10)), Vec::new());
        assert!(repo.get_detections(&[1, 2], ts(0), ts(10)).is_empty());
    }

    #[test]
    fn test_empty_name_keeps_stored_name() {
        let repo = DetectionRepository::open_in_memory().unwrap();
        repo.upsert_site(1, "North yard", None).unwrap();
        repo.upsert_camera(&CameraRecord { id: 7, site_id: 1, name: "Gate".into(), ..Default::default() })
            .unwrap();

        repo.upsert_site(1, "", None).unwrap();
        repo.upsert_camera(&CameraRecord { id: 7, site_id: 1, ..Default::default() }).unwrap();

        let camera: String = repo.conn.query_row("SELECT name FROM cameras WHERE id = 7", [], |r| r.get(0)).unwrap();
        assert_eq!(repo.site_name(1).unwrap().as_deref(), Some("North yard"));
        assert_eq!(camera, "Gate");

        repo.upsert_site(1, "South yard", None).unwrap();
        assert_eq!(repo.site_name(1).unwrap().as_deref(), Some("South yard"));
        assert_eq!(repo.site_name(2).unwrap(), None);
    }

    #[test]
    fn test_risk_event_for_same_window_is_replaced() {
        let repo = DetectionRepository::open_in_memory().unwrap();
        let mut event = RiskEvent {
            camera_id: 2,
            window_start: ts(0),
            window_end: ts(10),
            activity_id: 2,
            risk_score: 40.0,
            risk_level: RiskLevel::Medium,
            violated_rules: vec!["R1".to_string()],
            missing_epi: vec![],
        };
        let first = repo.save_risk_event(&event).unwrap();

        event.risk_score = 70.0;
        event.risk_level = RiskLevel::High;
        let second = repo.save_risk_event(&event).unwrap();
        assert_eq!(first, second);

        let events = repo.list_risk_events(2, ts(0), ts(60)).unwrap();
        assert_eq!(events, vec![event]);
    }
}
