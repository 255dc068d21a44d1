// One error type for the whole viewer.
// Every variant states *where* things went wrong; callers decide whether to
// degrade (closed engine, fallback scene) or report.
use std::path::PathBuf;

pub type ViewerResult<T> = Result<T, ViewerError>;

#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    #[error("window init error: {0}")]
    WindowInit(String),

    #[error("window update error: {0}")]
    WindowUpdate(String),

    #[error("could not open video '{}': {reason}", .path.display())]
    VideoOpen { path: PathBuf, reason: String },

    #[error("frame read error: {0}")]
    Decode(String),

    #[error("scene file error: {0}")]
    SceneFile(String),

    #[error("loop start {start} must be less than or equal to end {end}")]
    InvalidLoop { start: i64, end: i64 },

    #[error("frame {frame} out of range: the video has {total} frames (0-{})", .total.saturating_sub(1))]
    FrameOutOfRange { frame: i64, total: u64 },

    #[error("invalid input: {0}")]
    Input(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl ViewerError {
    pub fn video_open(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::VideoOpen {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
