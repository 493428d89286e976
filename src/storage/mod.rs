//! Snapshot persistence.
//!
//! One pretty-printed JSON file per (sport, date) at
//! `{data_dir}/{sport}/{YYYY-MM-DD}.json`. Snapshots are always written
//! whole: the JSON goes to a temp file in the same directory which is
//! then renamed over the target.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::{EngineError, EngineResult, Snapshot, Sport};

/// Key-value store of snapshots keyed by (sport, date).
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Whether a snapshot is stored for the key; checked before a cache read.
    async fn exists(&self, sport: Sport, date: NaiveDate) -> EngineResult<bool>;

    /// Persist a snapshot under its own (sport, date), replacing any
    /// previous one.
    async fn save(&self, snapshot: &Snapshot) -> EngineResult<()>;

    /// Load a snapshot; `CacheMiss` when none is stored.
    async fn load(&self, sport: Sport, date: NaiveDate) -> EngineResult<Snapshot>;

    /// Stored dates for a sport, ascending.
    async fn list_dates(&self, sport: Sport) -> EngineResult<Vec<NaiveDate>>;
}

/// Record key, as used in logs: `football/2025-07-15`.
pub fn record_key(sport: Sport, date: NaiveDate) -> String {
    format!("{}/{}", sport, date.format("%Y-%m-%d"))
}

pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sport_dir(&self, sport: Sport) -> PathBuf {
        self.root.join(sport.as_str())
    }

    fn snapshot_path(&self, sport: Sport, date: NaiveDate) -> PathBuf {
        self.sport_dir(sport)
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }
}

fn storage_err(action: &str, path: &Path, e: impl std::fmt::Display) -> EngineError {
    EngineError::Storage(format!("Failed to {action} {}: {e}", path.display()))
}

#[async_trait]
impl SnapshotStorage for FileStorage {
    async fn exists(&self, sport: Sport, date: NaiveDate) -> EngineResult<bool> {
        let path = self.snapshot_path(sport, date);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| storage_err("stat", &path, e))
    }

    async fn save(&self, snapshot: &Snapshot) -> EngineResult<()> {
        let dir = self.sport_dir(snapshot.sport);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_err("create", &dir, e))?;

        let path = self.snapshot_path(snapshot.sport, snapshot.date);
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| storage_err("serialise snapshot for", &path, e))?;

        let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(storage_err("write", &tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(storage_err("rename into", &path, e));
        }

        debug!(
            key = %record_key(snapshot.sport, snapshot.date),
            fixtures = snapshot.len(),
            "Snapshot saved"
        );
        Ok(())
    }

    async fn load(&self, sport: Sport, date: NaiveDate) -> EngineResult<Snapshot> {
        let path = self.snapshot_path(sport, date);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(EngineError::CacheMiss { sport, date });
            }
            Err(e) => return Err(storage_err("read", &path, e)),
        };

        let snapshot: Snapshot =
            serde_json::from_str(&json).map_err(|e| storage_err("parse", &path, e))?;

        debug!(
            key = %record_key(sport, date),
            fixtures = snapshot.len(),
            fetched_at = %snapshot.fetched_at,
            "Snapshot loaded from disk"
        );
        Ok(snapshot)
    }

    async fn list_dates(&self, sport: Sport) -> EngineResult<Vec<NaiveDate>> {
        let dir = self.sport_dir(sport);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(%sport, dir = %dir.display(), "No snapshot directory yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(storage_err("list", &dir, e)),
        };

        let mut dates = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_err("list", &dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                Ok(date) => dates.push(date),
                Err(_) => warn!(path = %path.display(), "Ignoring non-date file in snapshot dir"),
            }
        }

        dates.sort();
        Ok(dates)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
