//! Database schema
//!
//! Timestamps are UTC epoch milliseconds so range queries and ordering stay exact.

pub const SCHEMA_SQL: &str = r#"
-- Sites
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    confidence_config TEXT
);

-- Cameras (per-camera thresholds override the site ones)
CREATE TABLE IF NOT EXISTS cameras (
    id INTEGER PRIMARY KEY,
    site_id INTEGER NOT NULL REFERENCES sites(id),
    name TEXT NOT NULL,
    confidence_config TEXT,
    homography TEXT
);

-- Accepted, tracked detections
CREATE TABLE IF NOT EXISTS detections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    camera_id INTEGER NOT NULL,
    timestamp_ms INTEGER NOT NULL,
    object_class TEXT NOT NULL,
    confidence REAL NOT NULL,
    bbox_x REAL NOT NULL,
    bbox_y REAL NOT NULL,
    bbox_w REAL NOT NULL,
    bbox_h REAL NOT NULL,
    track_id INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_detections_camera_ts
    ON detections(camera_id, timestamp_ms);

-- Risk zones, polygons in ground-plane coordinates
CREATE TABLE IF NOT EXISTS zones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    camera_id INTEGER NOT NULL REFERENCES cameras(id),
    zone_type TEXT NOT NULL,
    risk_level TEXT NOT NULL,
    polygon TEXT NOT NULL
);

-- Windows that violated at least one HSE rule
CREATE TABLE IF NOT EXISTS risk_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    camera_id INTEGER NOT NULL,
    window_start_ms INTEGER NOT NULL,
    window_end_ms INTEGER NOT NULL,
    activity_id INTEGER NOT NULL,
    risk_score REAL NOT NULL,
    risk_level TEXT NOT NULL,
    violated_rules TEXT NOT NULL,
    missing_epi TEXT NOT NULL
);

-- one event per window: re-assessing a range updates it in place
CREATE UNIQUE INDEX IF NOT EXISTS idx_risk_events_window
    ON risk_events(camera_id, window_start_ms, window_end_ms);
"#;
