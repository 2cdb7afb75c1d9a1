use crate::model::AppId;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const INDICATOR_POSITIONS_FILE_NAME: &str = "indicator_positions.json";

/// Badge center as fractions of the monitored window's visible frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredIndicatorPosition {
    pub x_percent: f64,
    pub y_percent: f64,
}

impl StoredIndicatorPosition {
    pub fn new(x_percent: f64, y_percent: f64) -> Self {
        let mut position = Self {
            x_percent,
            y_percent,
        };
        position.sanitize();
        position
    }

    fn sanitize(&mut self) {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 };
        self.x_percent = clamp(self.x_percent);
        self.y_percent = clamp(self.y_percent);
    }
}

/// Per-app badge positions persisted as pretty JSON.
#[derive(Debug, Clone, Default)]
pub struct IndicatorStore {
    path: Option<PathBuf>,
    positions: BTreeMap<AppId, StoredIndicatorPosition>,
}

pub fn store_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(INDICATOR_POSITIONS_FILE_NAME))
}

impl IndicatorStore {
    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let exe_path = std::env::current_exe().context("resolve current executable")?;
        Self::load_from_path(&store_path_from_exe_path(&exe_path)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut store = Self {
            path: Some(path.to_path_buf()),
            positions: BTreeMap::new(),
        };
        if !path.exists() {
            return Ok(store);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read indicator positions file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(store);
        }

        store.positions = serde_json::from_str(&content).with_context(|| {
            format!("deserialize indicator positions file {}", path.display())
        })?;
        for position in store.positions.values_mut() {
            position.sanitize();
        }
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("create indicator positions parent folder {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(&self.positions)
            .context("serialize indicator positions")?;
        std::fs::write(path, json)
            .with_context(|| format!("write indicator positions file {}", path.display()))
    }

    pub fn get(&self, app: &AppId) -> Option<StoredIndicatorPosition> {
        self.positions.get(app).copied()
    }

    pub fn set(&mut self, app: AppId, position: StoredIndicatorPosition) {
        self.positions.insert(app, position);
    }

    pub fn remove(&mut self, app: &AppId) -> Option<StoredIndicatorPosition> {
        self.positions.remove(app)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        store_path_from_exe_path, IndicatorStore, StoredIndicatorPosition,
        INDICATOR_POSITIONS_FILE_NAME,
    };
    use crate::model::AppId;
    use std::path::Path;

    #[test]
    fn store_lives_next_to_executable() {
        let path = store_path_from_exe_path(Path::new("/opt/overlay/bin/overlay")).expect("path");
        assert_eq!(
            path,
            Path::new("/opt/overlay/bin").join(INDICATOR_POSITIONS_FILE_NAME)
        );
    }

    #[test]
    fn positions_persist_per_app() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join(INDICATOR_POSITIONS_FILE_NAME);

        let mut store = IndicatorStore::load_from_path(&path).expect("missing file is empty");
        assert!(store.is_empty());
        store.set(AppId::new("Slack.exe"), StoredIndicatorPosition::new(0.25, 1.0));
        store.save().expect("save");

        let loaded = IndicatorStore::load_from_path(&path).expect("reload");
        assert_eq!(
            loaded.get(&AppId::new("slack.exe")),
            Some(StoredIndicatorPosition::new(0.25, 1.0))
        );
        assert_eq!(loaded.get(&AppId::new("notepad.exe")), None);
    }

    #[test]
    fn out_of_range_values_are_clamped_on_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(INDICATOR_POSITIONS_FILE_NAME);
        std::fs::write(
            &path,
            r#"{"code.exe": {"x_percent": 1.7, "y_percent": -0.2}}"#,
        )
        .expect("write");

        let loaded = IndicatorStore::load_from_path(&path).expect("load");
        assert_eq!(
            loaded.get(&AppId::new("code.exe")),
            Some(StoredIndicatorPosition {
                x_percent: 1.0,
                y_percent: 0.0
            })
        );
    }

    #[test]
    fn empty_file_loads_as_empty_store() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(INDICATOR_POSITIONS_FILE_NAME);
        std::fs::write(&path, "  \n").expect("write");
        assert!(IndicatorStore::load_from_path(&path).expect("load").is_empty());
    }
}
