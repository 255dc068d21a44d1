// Frame-accurate video viewer with hitbox overlays.
//
// Data flow per displayed frame:
//   VideoSource::read_frame -> PlaybackEngine -> Compositor (via CoordinateScaler)
//   -> window::compose_screen -> minifb

pub mod compositor;
pub mod config;
pub mod draw;
pub mod engine;
pub mod error;
pub mod hitbox;
pub mod logging;
pub mod scaler;
pub mod scene;
pub mod session;
pub mod types;
pub mod video;
pub mod window;

pub use engine::{PlaybackEngine, PlaybackState};
pub use error::{ViewerError, ViewerResult};
pub use session::ViewerSession;
