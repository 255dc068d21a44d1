// Remembered paths between runs, stored as JSON in the user config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ViewerResult;

const APP_DIR: &str = "hitbox-viewer";
const FILE_NAME: &str = "config.json";

fn home_dir_string() -> String {
    dirs::home_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerPrefs {
    pub last_video_path: String,
    pub last_scene_path: String,
    pub last_video_directory: String,
    pub last_scene_directory: String,
}

impl Default for ViewerPrefs {
    fn default() -> Self {
        Self {
            last_video_path: String::new(),
            last_scene_path: String::new(),
            last_video_directory: home_dir_string(),
            last_scene_directory: home_dir_string(),
        }
    }
}

impl ViewerPrefs {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(FILE_NAME))
    }

    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Missing or broken files give the defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable preferences");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Errors are logged; preferences are never worth failing over.
    pub fn save(&self) {
        let Some(path) = Self::default_path() else {
            return;
        };
        if let Err(e) = self.save_to(&path) {
            tracing::warn!(path = %path.display(), error = %e, "could not save preferences");
        }
    }

    pub fn save_to(&self, path: &Path) -> ViewerResult<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn last_video(&self) -> Option<PathBuf> {
        non_empty(&self.last_video_path)
    }

    pub fn last_scenes(&self) -> Option<PathBuf> {
        non_empty(&self.last_scene_path)
    }

    pub fn set_last_video_path(&mut self, path: &Path) {
        self.last_video_path = path.to_string_lossy().into_owned();
        if let Some(dir) = parent_string(path) {
            self.last_video_directory = dir;
        }
    }

    pub fn set_last_scene_path(&mut self, path: &Path) {
        self.last_scene_path = path.to_string_lossy().into_owned();
        if let Some(dir) = parent_string(path) {
            self.last_scene_directory = dir;
        }
    }
}

fn non_empty(s: &str) -> Option<PathBuf> {
    if s.is_empty() {
        None
    } else {
        Some(PathBuf::from(s))
    }
}

fn parent_string(path: &Path) -> Option<String> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = ViewerPrefs::load_from(&dir.path().join("config.json"));
        assert_eq!(prefs, ViewerPrefs::default());
        assert_eq!(prefs.last_video(), None);
        assert_eq!(prefs.last_video_directory, home_dir_string());
    }

    #[test]
    fn setting_a_path_records_its_directory() {
        let mut prefs = ViewerPrefs::default();
        prefs.set_last_video_path(Path::new("/media/clips/run.mp4"));
        prefs.set_last_scene_path(Path::new("/data/zb.json"));
        assert_eq!(prefs.last_video_directory, "/media/clips");
        assert_eq!(prefs.last_scene_directory, "/data");
        assert_eq!(prefs.last_scenes(), Some(PathBuf::from("/data/zb.json")));
    }

    #[test]
    fn bare_file_name_keeps_previous_directory() {
        let mut prefs = ViewerPrefs::default();
        let before = prefs.last_video_directory.clone();
        prefs.set_last_video_path(Path::new("run.mp4"));
        assert_eq!(prefs.last_video_directory, before);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut prefs = ViewerPrefs::default();
        prefs.set_last_video_path(Path::new("/v/a.mp4"));
        prefs.save_to(&path).unwrap();
        assert_eq!(ViewerPrefs::load_from(&path), prefs);
    }

    #[test]
    fn partial_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"last_scene_path": "/x/s.json"}"#).unwrap();
        let prefs = ViewerPrefs::load_from(&path);
        assert_eq!(prefs.last_scene_path, "/x/s.json");
        assert_eq!(prefs.last_video_path, "");

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(ViewerPrefs::load_from(&path), ViewerPrefs::default());
    }
}
