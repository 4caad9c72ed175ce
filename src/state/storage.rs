//! Studio persistence
//!
//! The CLI keeps the whole studio (models, sessions, wardrobe and the active
//! model) in one JSON file. The library itself never touches the disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::session::{DigitalModel, SessionManager, SessionState};
use crate::catalog::WardrobeItem;
use crate::error::{AtelierError, Result};

/// Current schema version for studio files.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// Everything written to a studio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioSnapshot {
    pub schema_version: String,
    pub saved_at: DateTime<Utc>,
    pub models: Vec<DigitalModel>,
    /// Model id -> session, working copy included
    pub sessions: BTreeMap<String, SessionState>,
    pub active_model_id: Option<String>,
    #[serde(default)]
    pub wardrobe: Vec<WardrobeItem>,
}

impl StudioSnapshot {
    pub fn capture(sessions: &SessionManager, wardrobe: &[WardrobeItem]) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            saved_at: Utc::now(),
            models: sessions.models().to_vec(),
            sessions: sessions.committed_sessions(),
            active_model_id: sessions.active_model_id().map(str::to_string),
            wardrobe: wardrobe.to_vec(),
        }
    }

    /// Rebuild the session manager, checking out the active model again.
    pub fn into_sessions(self, default_pose: &str) -> Result<(SessionManager, Vec<WardrobeItem>)> {
        let manager = SessionManager::restore(
            self.models,
            self.sessions,
            self.active_model_id.as_deref(),
            default_pose,
        )
        .map_err(|e| AtelierError::InvalidSnapshot {
            reason: e.to_string(),
        })?;
        Ok((manager, self.wardrobe))
    }
}

/// Just enough of a studio file to check its version.
#[derive(Deserialize)]
struct SnapshotHeader {
    #[serde(default)]
    schema_version: Option<String>,
}

/// A studio file on disk.
#[derive(Debug, Clone)]
pub struct StudioStore {
    path: PathBuf,
}

impl StudioStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and validate the studio file.
    pub fn load(&self) -> Result<StudioSnapshot> {
        let content = fs::read_to_string(&self.path).map_err(|e| AtelierError::FileReadError {
            path: self.path.clone(),
            source: e,
        })?;

        let header: SnapshotHeader = serde_json::from_str(&content)?;
        let version = header.schema_version.ok_or_else(|| AtelierError::InvalidSnapshot {
            reason: "missing schema_version".to_string(),
        })?;
        if version != CURRENT_SCHEMA_VERSION {
            return Err(AtelierError::InvalidSnapshot {
                reason: format!(
                    "unsupported schema version {} (expected {})",
                    version, CURRENT_SCHEMA_VERSION
                ),
            });
        }

        // Parsed straight from the text so pose maps keep their key order.
        // Histories validate their base layer while deserializing.
        let snapshot: StudioSnapshot =
            serde_json::from_str(&content).map_err(|e| AtelierError::InvalidSnapshot {
                reason: e.to_string(),
            })?;
        debug!(path = %self.path.display(), models = snapshot.models.len(), "studio loaded");
        Ok(snapshot)
    }

    /// Load the file, or `None` when it does not exist yet.
    pub fn load_if_exists(&self) -> Result<Option<StudioSnapshot>> {
        if self.exists() {
            self.load().map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn save(&self, snapshot: &StudioSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AtelierError::FileWriteError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, content).map_err(|e| AtelierError::FileWriteError {
            path: self.path.clone(),
            source: e,
        })?;
        debug!(path = %self.path.display(), "studio saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::WardrobeItem;
    use crate::layers::NEUTRAL_POSE;
    use crate::media::ImageRef;
    use tempfile::TempDir;

    fn studio_with_model() -> SessionManager {
        let mut manager = SessionManager::new(NEUTRAL_POSE);
        manager.finalize_model("Ana", ImageRef::new("photo.png"), ImageRef::new("B"));
        manager
            .active_state_mut()
            .unwrap()
            .outfit_history
            .append_layer(
                vec![WardrobeItem::new("g1", "Top", "https://img/g1.png")],
                NEUTRAL_POSE,
                ImageRef::new("I1"),
            );
        manager
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = StudioStore::new(dir.path().join("nested").join("studio.json"));
        let manager = studio_with_model();

        let snapshot = StudioSnapshot::capture(&manager, &[]);
        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, snapshot);

        let (restored, wardrobe) = loaded.into_sessions(NEUTRAL_POSE).unwrap();
        assert!(wardrobe.is_empty());
        assert_eq!(
            restored.active_state().unwrap(),
            manager.active_state().unwrap()
        );
    }

    #[test]
    fn test_load_keeps_pose_order() {
        let dir = TempDir::new().unwrap();
        let store = StudioStore::new(dir.path().join("studio.json"));
        let mut manager = studio_with_model();
        let state = manager.active_state_mut().unwrap();
        state
            .outfit_history
            .patch_last_layer("side", ImageRef::new("I2"))
            .unwrap();
        state
            .outfit_history
            .patch_last_layer("front", ImageRef::new("I3"))
            .unwrap();
        let expected: Vec<String> = state
            .outfit_history
            .last_layer()
            .pose_images
            .poses()
            .map(str::to_string)
            .collect();

        store.save(&StudioSnapshot::capture(&manager, &[])).unwrap();
        let (restored, _) = store.load().unwrap().into_sessions(NEUTRAL_POSE).unwrap();

        let tail = restored.active_state().unwrap().outfit_history.last_layer();
        let poses: Vec<String> = tail.pose_images.poses().map(str::to_string).collect();
        assert_eq!(poses, expected);
        assert_eq!(tail.pose_images.first_named_pose(), Some(NEUTRAL_POSE));
    }

    #[test]
    fn test_rejects_missing_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("studio.json");
        fs::write(&path, r#"{"models":[]}"#).unwrap();

        let err = StudioStore::new(&path).load().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SNAPSHOT");
    }

    #[test]
    fn test_rejects_unknown_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("studio.json");
        fs::write(&path, r#"{"schema_version":"9.0.0"}"#).unwrap();

        let err = StudioStore::new(&path).load().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SNAPSHOT");
    }

    #[test]
    fn test_rejects_broken_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("studio.json");
        let manager = studio_with_model();
        let mut value = serde_json::to_value(StudioSnapshot::capture(&manager, &[])).unwrap();
        let id = manager.active_model_id().unwrap().to_string();
        value["sessions"][&id]["outfit_history"] = serde_json::json!([]);
        fs::write(&path, value.to_string()).unwrap();

        let err = StudioStore::new(&path).load().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SNAPSHOT");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = StudioStore::new(dir.path().join("none.json"));
        assert!(store.load_if_exists().unwrap().is_none());
        assert_eq!(store.load().unwrap_err().error_code(), "FILE_READ_ERROR");
    }
}
