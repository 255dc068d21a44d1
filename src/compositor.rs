// Turns a decoded frame into what the user sees.
// Visual: hitbox outlines in palette colors, then (if the pointer is over the
// frame) yellow guide lines and an "X: .., Y: .." readout in virtual coordinates.

use crate::draw::{draw_rect_outline, draw_text_5x7, fill_rect, measure_text_5x7};
use crate::hitbox::{OverlayBox, palette_color};
use crate::scaler::CoordinateScaler;
use crate::types::{FrameBuffer, PointerSample};

pub const HITBOX_STROKE: i32 = 3;
pub const GUIDE_COLOR: u32 = 0x00_FF_FF_00;
pub const LABEL_COLOR: u32 = 0x00_FF_FF_00;
pub const PLATE_COLOR: u32 = 0x00_00_00_00;
pub const LABEL_SCALE: i32 = 2;
/// Distance between the pointer and the label.
pub const LABEL_GAP: i32 = 10;
/// Extra plate around the measured text.
pub const PLATE_MARGIN: i32 = 3;

/// Where the readout goes; all values are top-left origins in display pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelPlacement {
    pub text_x: i32,
    pub text_y: i32,
    pub width: i32,
    pub height: i32,
}

impl LabelPlacement {
    /// Inclusive plate bounds (x0, y0, x1, y1).
    pub fn plate(&self) -> (i32, i32, i32, i32) {
        (
            self.text_x - PLATE_MARGIN,
            self.text_y - PLATE_MARGIN,
            self.text_x + self.width + PLATE_MARGIN - 1,
            self.text_y + self.height + PLATE_MARGIN - 1,
        )
    }
}

/// Up and to the right of the pointer; flips left at the right edge and
/// below the pointer at the top edge.
pub fn place_label(
    pointer: PointerSample,
    text_w: i32,
    text_h: i32,
    frame_w: i32,
) -> LabelPlacement {
    let mut text_x = pointer.x + LABEL_GAP;
    let mut text_y = pointer.y - LABEL_GAP - text_h;
    if text_x + text_w > frame_w {
        text_x = pointer.x - text_w - LABEL_GAP;
    }
    if text_y < 0 {
        text_y = pointer.y + LABEL_GAP;
    }
    LabelPlacement {
        text_x,
        text_y,
        width: text_w,
        height: text_h,
    }
}

pub fn coordinate_label(vx: i32, vy: i32) -> String {
    format!("X: {vx}, Y: {vy}")
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Compositor {
    scaler: CoordinateScaler,
}

impl Compositor {
    pub fn new(scaler: CoordinateScaler) -> Self {
        Self { scaler }
    }

    pub fn scaler(&self) -> &CoordinateScaler {
        &self.scaler
    }

    /// Pure: the raw frame is copied, never touched.
    pub fn compose(
        &self,
        raw: &FrameBuffer,
        overlay: &[OverlayBox],
        pointer: Option<PointerSample>,
    ) -> FrameBuffer {
        let mut out = raw.clone();
        self.draw_hitboxes(&mut out, overlay);
        if let Some(p) = pointer {
            self.draw_pointer_readout(&mut out, p);
        }
        out
    }

    fn draw_hitboxes(&self, fb: &mut FrameBuffer, overlay: &[OverlayBox]) {
        // later boxes paint over earlier ones
        for item in overlay {
            let r = self
                .scaler
                .project_rect(item.rect.x0, item.rect.y0, item.rect.x1, item.rect.y1);
            draw_rect_outline(
                fb,
                r.x0,
                r.y0,
                r.x1,
                r.y1,
                HITBOX_STROKE,
                palette_color(item.color_index),
            );
        }
    }

    fn draw_pointer_readout(&self, fb: &mut FrameBuffer, p: PointerSample) {
        if !fb.contains(p.x, p.y) {
            return;
        }
        let w = fb.width as i32;
        let h = fb.height as i32;
        fill_rect(fb, 0, p.y, w - 1, p.y, GUIDE_COLOR);
        fill_rect(fb, p.x, 0, p.x, h - 1, GUIDE_COLOR);

        let (vx, vy) = self.scaler.inverse(p.x, p.y);
        let text = coordinate_label(vx, vy);
        let (tw, th) = measure_text_5x7(&text, LABEL_SCALE);
        let place = place_label(p, tw, th, w);
        let (px0, py0, px1, py1) = place.plate();
        fill_rect(fb, px0, py0, px1, py1, PLATE_COLOR);
        draw_text_5x7(fb, place.text_x, place.text_y, &text, LABEL_COLOR, LABEL_SCALE);
    }
}
