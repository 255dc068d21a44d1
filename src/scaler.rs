// Fixed linear mapping between the virtual hitbox space and display pixels.
// Visual: a hitbox authored at (54,34) in 320x256 lands at (122,76) on a 720x576 frame.

use crate::error::{ViewerError, ViewerResult};

/// Size of the coordinate space the scene files were authored against.
pub const VIRTUAL_WIDTH: u32 = 320;
pub const VIRTUAL_HEIGHT: u32 = 256;
/// Size of the composited frame.
pub const DISPLAY_WIDTH: u32 = 720;
pub const DISPLAY_HEIGHT: u32 = 576;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaleConfig {
    pub virtual_width: u32,
    pub virtual_height: u32,
    pub display_width: u32,
    pub display_height: u32,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            virtual_width: VIRTUAL_WIDTH,
            virtual_height: VIRTUAL_HEIGHT,
            display_width: DISPLAY_WIDTH,
            display_height: DISPLAY_HEIGHT,
        }
    }
}

/// Projected rectangle in display pixels; `(x1, y1)` is `origin + size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateScaler {
    scale_x: f64,
    scale_y: f64,
    display_width: u32,
    display_height: u32,
}

impl CoordinateScaler {
    /// Factors are fixed here; decoded frame size never feeds back into them.
    pub fn new(cfg: ScaleConfig) -> ViewerResult<Self> {
        if cfg.virtual_width == 0
            || cfg.virtual_height == 0
            || cfg.display_width == 0
            || cfg.display_height == 0
        {
            return Err(ViewerError::config(format!(
                "scale dimensions must be positive (virtual {}x{}, display {}x{})",
                cfg.virtual_width, cfg.virtual_height, cfg.display_width, cfg.display_height
            )));
        }
        Ok(Self::from_config(cfg))
    }

    fn from_config(cfg: ScaleConfig) -> Self {
        Self {
            scale_x: f64::from(cfg.display_width) / f64::from(cfg.virtual_width),
            scale_y: f64::from(cfg.display_height) / f64::from(cfg.virtual_height),
            display_width: cfg.display_width,
            display_height: cfg.display_height,
        }
    }

    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }

    pub fn forward_x(&self, vx: i32) -> i32 {
        scale_to_display(f64::from(vx), self.scale_x)
    }

    pub fn forward_y(&self, vy: i32) -> i32 {
        scale_to_display(f64::from(vy), self.scale_y)
    }

    pub fn inverse_x(&self, dx: i32) -> i32 {
        (f64::from(dx) / self.scale_x).floor() as i32
    }

    pub fn inverse_y(&self, dy: i32) -> i32 {
        (f64::from(dy) / self.scale_y).floor() as i32
    }

    pub fn forward(&self, vx: i32, vy: i32) -> (i32, i32) {
        (self.forward_x(vx), self.forward_y(vy))
    }

    pub fn inverse(&self, dx: i32, dy: i32) -> (i32, i32) {
        (self.inverse_x(dx), self.inverse_y(dy))
    }

    /// Origin and extent are scaled separately, so the far corner is
    /// `forward(x0) + forward(x1 - x0)` rather than `forward(x1)`.
    /// Results saturate at the `i32` range.
    pub fn project_rect(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> DisplayRect {
        let (dx0, dy0) = self.forward(x0, y0);
        let w = scale_to_display(f64::from(x1) - f64::from(x0), self.scale_x);
        let h = scale_to_display(f64::from(y1) - f64::from(y0), self.scale_y);
        DisplayRect {
            x0: dx0,
            y0: dy0,
            x1: dx0.saturating_add(w),
            y1: dy0.saturating_add(h),
        }
    }
}

impl Default for CoordinateScaler {
    fn default() -> Self {
        Self::from_config(ScaleConfig::default())
    }
}

// Ties go to even so 121.5 -> 122 and 76.5 -> 76. The cast saturates.
fn scale_to_display(v: f64, scale: f64) -> i32 {
    (v * scale).round_ties_even() as i32
}
