// Scene metadata: per-scene hitboxes and named frame ranges, read from JSON.
// A file that can't be read or parsed is replaced by one built-in scene so the
// viewer always has something to show.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ViewerError, ViewerResult};
use crate::hitbox::{DEFAULT_POINTS, Hitbox};

/// Inclusive frame window behind one frame button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRange {
    pub from: i64,
    pub to: i64,
}

impl FrameRange {
    pub fn len(&self) -> i64 {
        self.to - self.from + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    /// "#1: 10821-13405 (2585)"
    pub fn label(&self, index: usize) -> String {
        format!("#{}: {}-{} ({})", index + 1, self.from, self.to, self.len())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scene {
    pub id: i64,
    pub offset: String,
    pub hitboxes: Vec<Hitbox>,
    pub frames: Vec<FrameRange>,
}

impl Scene {
    pub fn label(&self) -> String {
        format!("Scene #{} - {}", self.id, self.offset)
    }
}

/* ------------------------------ file schema ------------------------------- */

// `offset` shows up both as "0x1A2B" and as a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum OffsetField {
    Text(String),
    Number(i64),
}

impl Default for OffsetField {
    fn default() -> Self {
        OffsetField::Text(String::new())
    }
}

impl OffsetField {
    fn into_label(self) -> String {
        match self {
            OffsetField::Text(s) => s,
            OffsetField::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RectRecord {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

fn default_points() -> i64 {
    DEFAULT_POINTS
}

#[derive(Deserialize)]
struct HitboxRecord {
    #[serde(default)]
    rect: RectRecord,
    #[serde(default = "default_points")]
    points: i64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FrameRecord {
    from: i64,
    to: i64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SceneRecord {
    id: i64,
    offset: OffsetField,
    hitboxes: Vec<HitboxRecord>,
    frames: Vec<FrameRecord>,
}

impl From<SceneRecord> for Scene {
    fn from(rec: SceneRecord) -> Self {
        Scene {
            id: rec.id,
            offset: rec.offset.into_label(),
            hitboxes: rec
                .hitboxes
                .into_iter()
                .map(|h| Hitbox {
                    x0: h.rect.x0,
                    y0: h.rect.y0,
                    x1: h.rect.x1,
                    y1: h.rect.y1,
                    points: h.points,
                })
                .collect(),
            frames: rec
                .frames
                .into_iter()
                .map(|f| FrameRange { from: f.from, to: f.to })
                .collect(),
        }
    }
}

/* -------------------------------- loading --------------------------------- */

pub fn parse_scenes(json: &str) -> ViewerResult<Vec<Scene>> {
    let records: Vec<SceneRecord> = serde_json::from_str(json)?;
    Ok(records.into_iter().map(Scene::from).collect())
}

/// Strict variant: errors are returned, not replaced.
pub fn try_load_scenes(path: &Path) -> ViewerResult<Vec<Scene>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| ViewerError::SceneFile(format!("{}: {e}", path.display())))?;
    parse_scenes(&json)
        .map_err(|e| ViewerError::SceneFile(format!("{}: {e}", path.display())))
}

/// Never fails; a bad file logs a warning and yields `fallback_scenes()`.
pub fn load_scenes(path: &Path) -> Vec<Scene> {
    match try_load_scenes(path) {
        Ok(scenes) => {
            tracing::info!(path = %path.display(), count = scenes.len(), "scenes loaded");
            scenes
        }
        Err(e) => {
            tracing::warn!(error = %e, "using built-in fallback scene");
            fallback_scenes()
        }
    }
}

pub fn fallback_scenes() -> Vec<Scene> {
    vec![Scene {
        id: 0,
        offset: "0x0000".to_string(),
        hitboxes: vec![Hitbox::new(54, 34, 122, 73), Hitbox::new(176, 35, 243, 78)],
        frames: vec![
            FrameRange { from: 10821, to: 13405 },
            FrameRange { from: 10363, to: 10427 },
        ],
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_record() {
        let json = r#"[
            {"id": 3, "offset": "0x1A2B",
             "hitboxes": [{"rect": {"x0": 1, "y0": 2, "x1": 30, "y1": 40}, "points": 1000}],
             "frames": [{"from": 100, "to": 199}]}
        ]"#;
        let scenes = parse_scenes(json).unwrap();
        assert_eq!(scenes.len(), 1);
        let s = &scenes[0];
        assert_eq!(s.label(), "Scene #3 - 0x1A2B");
        assert_eq!(
            s.hitboxes[0],
            Hitbox {
                x0: 1,
                y0: 2,
                x1: 30,
                y1: 40,
                points: 1000
            }
        );
        assert_eq!(s.frames[0].label(0), "#1: 100-199 (100)");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let json = r#"[{"hitboxes": [{"rect": {"x1": 5}}, {}], "frames": [{"to": 9}]}]"#;
        let s = &parse_scenes(json).unwrap()[0];
        assert_eq!(s.id, 0);
        assert_eq!(s.offset, "");
        assert_eq!(s.hitboxes[0], Hitbox::new(0, 0, 5, 0));
        assert_eq!(s.hitboxes[1].points, DEFAULT_POINTS);
        assert_eq!(s.frames[0], FrameRange { from: 0, to: 9 });
    }

    #[test]
    fn numeric_offset_is_accepted() {
        let s = &parse_scenes(r#"[{"id": 1, "offset": 4096}]"#).unwrap()[0];
        assert_eq!(s.label(), "Scene #1 - 4096");
    }

    #[test]
    fn malformed_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[{{\"id\": 1, \"hitboxes\": [").unwrap();
        let scenes = load_scenes(file.path());
        assert_eq!(scenes, fallback_scenes());
        assert_eq!(scenes[0].hitboxes.len(), 2);
        assert_eq!(scenes[0].frames.len(), 2);
        assert_eq!(scenes[0].label(), "Scene #0 - 0x0000");
    }

    #[test]
    fn missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let scenes = load_scenes(&dir.path().join("nope.json"));
        assert_eq!(scenes, fallback_scenes());
        assert!(matches!(
            try_load_scenes(&dir.path().join("nope.json")),
            Err(ViewerError::SceneFile(_))
        ));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 7}}, {{"id": 8}}]"#).unwrap();
        let ids: Vec<_> = load_scenes(file.path()).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![7, 8]);
    }

    #[test]
    fn fallback_ranges() {
        let f = &fallback_scenes()[0].frames;
        assert_eq!(f[0].label(0), "#1: 10821-13405 (2585)");
        assert_eq!(f[1].label(1), "#2: 10363-10427 (65)");
    }
}
