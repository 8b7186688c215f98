//! Bounded telemetry session and its persisted document
//!
//! The session is the document consumers poll: metadata plus the most recent
//! readings. Every persist rewrites the whole file through a temp file and a
//! rename, so a concurrent reader sees either the old or the new document.

use crate::error::{Result, TwinError};
use crate::models::{Classification, Reading, TripPhase};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Default number of readings kept in the window
pub const DEFAULT_WINDOW_SIZE: usize = 50;

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

/// Where a loaded session came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// The persisted document
    Document,
    /// The built-in sample, substituted because the document was unavailable
    Sample,
}

/// Append log of the latest readings plus session metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySession {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub readings: VecDeque<Reading>,
    pub last_updated: DateTime<Utc>,
    /// All-time count, including readings already evicted from the window
    pub total_readings: u64,
    pub current_phase: TripPhase,
    #[serde(skip, default = "default_window_size")]
    window_size: usize,
}

impl TelemetrySession {
    pub fn new(name: impl Into<String>, window_size: usize) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            start_time: now,
            readings: VecDeque::with_capacity(window_size),
            last_updated: now,
            total_readings: 0,
            current_phase: TripPhase::Highway,
            window_size: window_size.max(1),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Push a reading, evicting the oldest entries past the window
    pub fn append(&mut self, reading: Reading) {
        self.current_phase = reading.trip_phase;
        self.readings.push_back(reading);
        while self.readings.len() > self.window_size {
            self.readings.pop_front();
        }
        self.total_readings += 1;
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// Stamp `last_updated` and atomically replace the document at `path`
    pub fn persist(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| TwinError::Persist {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_vec_pretty(self)?;

        // Write atomically using temp file
        let temp_path = path.with_extension("json.tmp");
        let persist_err = |source| TwinError::Persist {
            path: temp_path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(persist_err)?;
        file.write_all(&json).map_err(persist_err)?;
        file.sync_all().map_err(persist_err)?;
        drop(file);

        std::fs::rename(&temp_path, path).map_err(|source| TwinError::Persist {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), readings = self.readings.len(), "Session persisted");
        Ok(())
    }

    /// Read a persisted document back
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| TwinError::DataUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut session: Self =
            serde_json::from_slice(&data).map_err(|e| TwinError::DataUnavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        session.window_size = session.window_size.max(session.readings.len());
        Ok(session)
    }

    /// Read a persisted document, substituting the sample session when it is unavailable
    pub fn load_or_sample(path: &Path) -> (Self, SessionSource) {
        match Self::load(path) {
            Ok(session) => (session, SessionSource::Document),
            Err(e) => {
                warn!(error = %e, "Telemetry document unavailable, using sample session");
                (Self::sample(), SessionSource::Sample)
            }
        }
    }

    /// Fixed three-reading session shown when no live data exists
    pub fn sample() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let rows = [
            (1, 3.8, 2.1, 28.0, 80.0, 78.0, 1200.0, TripPhase::Highway),
            (2, 3.76, 2.3, 29.0, 78.0, 77.8, 1195.0, TripPhase::Highway),
            (3, 3.72, 1.8, 30.0, 76.0, 77.5, 1190.0, TripPhase::City),
        ];

        let readings: VecDeque<Reading> = rows
            .into_iter()
            .map(
                |(n, voltage, current, temperature, soc, soh, rul, trip_phase)| Reading {
                    reading_number: n,
                    timestamp: start + ChronoDuration::seconds(2 * n as i64),
                    voltage,
                    current,
                    temperature,
                    cycle_count: 450,
                    soc,
                    soh,
                    rul,
                    trip_phase,
                    classification: Classification::from_soh(soh),
                },
            )
            .collect();

        Self {
            name: "Sample Live Trip".to_string(),
            start_time: start,
            last_updated: start + ChronoDuration::seconds(6),
            total_readings: readings.len() as u64,
            current_phase: TripPhase::City,
            readings,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reading(n: u64) -> Reading {
        Reading {
            reading_number: n,
            timestamp: Utc::now(),
            voltage: 3.7,
            current: 2.0,
            temperature: 25.0,
            cycle_count: 450,
            soc: 80.0,
            soh: 78.0,
            rul: 1170.0,
            trip_phase: if n % 2 == 0 { TripPhase::City } else { TripPhase::Highway },
            classification: Classification::from_soh(78.0),
        }
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut session = TelemetrySession::new("test", 50);
        for n in 1..=120 {
            session.append(reading(n));
        }
        assert_eq!(session.readings.len(), 50);
        assert_eq!(session.total_readings, 120);
        assert_eq!(session.readings.front().unwrap().reading_number, 71);
        assert_eq!(session.latest().unwrap().reading_number, 120);
        assert_eq!(session.current_phase, TripPhase::City);
    }

    #[test]
    fn test_persist_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live_trip_data.json");

        let mut session = TelemetrySession::new("Live Highway Trip", 50);
        for n in 1..=60 {
            session.append(reading(n));
        }
        session.persist(&path).unwrap();

        let loaded = TelemetrySession::load(&path).unwrap();
        assert_eq!(loaded, session);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_persist_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("trip.json");

        let mut session = TelemetrySession::new("trip", 5);
        session.append(reading(1));
        session.persist(&path).unwrap();
        session.append(reading(2));
        session.persist(&path).unwrap();

        let loaded = TelemetrySession::load(&path).unwrap();
        assert_eq!(loaded.readings.len(), 2);
        assert_eq!(loaded.total_readings, 2);
    }

    #[test]
    fn test_document_field_names() {
        let mut session = TelemetrySession::new("trip", 50);
        session.append(reading(1));
        let value = serde_json::to_value(&session).unwrap();
        for key in ["name", "start_time", "readings", "last_updated", "total_readings", "current_phase"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert!(value.get("window_size").is_none());
        assert_eq!(value["readings"][0]["trip_phase"], "highway");
    }

    #[test]
    fn test_missing_document_is_data_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = TelemetrySession::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, TwinError::DataUnavailable { .. }));
    }

    #[test]
    fn test_readable_document_is_not_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trip.json");
        let mut session = TelemetrySession::new("Live Highway Trip", 50);
        session.append(reading(1));
        session.persist(&path).unwrap();

        let (loaded, source) = TelemetrySession::load_or_sample(&path);
        assert_eq!(source, SessionSource::Document);
        assert_eq!(loaded, session);
    }

    #[test]
    fn test_corrupt_document_falls_back_to_sample() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trip.json");
        std::fs::write(&path, b"{\"name\": \"trunc").unwrap();

        let (session, source) = TelemetrySession::load_or_sample(&path);
        assert_eq!(source, SessionSource::Sample);
        assert_eq!(session, TelemetrySession::sample());
        assert_eq!(session.readings.len(), 3);
        assert_eq!(session.current_phase, TripPhase::City);
    }
}
