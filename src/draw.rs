// Software drawing on a FrameBuffer.
// Visual effects provided here:
// 1) Rectangle outlines (hitboxes) and filled plates (label backgrounds).
// 2) Straight lines (pointer guides).
// 3) A tiny 5x7 bitmap font, integer-scaled, for labels and the status strip.

use crate::types::FrameBuffer;

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
/// Visual: the exact pixel at (x,y) changes color.
#[inline]
pub fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
/// Visual: a straight 1-pixel line appears on top of the video.
pub fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0, x1, y1) = (x0, y0, x1, y1);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Fill the inclusive rectangle [x0..=x1] x [y0..=y1], clipped to the frame.
pub fn fill_rect(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    if fb.width == 0 || fb.height == 0 {
        return;
    }
    let (x0, x1) = (x0.min(x1), x0.max(x1));
    let (y0, y1) = (y0.min(y1), y0.max(y1));
    let max_x = fb.width as i32 - 1;
    let max_y = fb.height as i32 - 1;
    if x1 < 0 || y1 < 0 || x0 > max_x || y0 > max_y {
        return;
    }
    let (cx0, cx1) = (x0.max(0) as usize, x1.min(max_x) as usize);
    let (cy0, cy1) = (y0.max(0) as usize, y1.min(max_y) as usize);
    for y in cy0..=cy1 {
        let row = y * fb.width;
        fb.pixels[row + cx0..=row + cx1].fill(color);
    }
}

/// Unfilled rectangle with a stroke centered on each edge.
/// Visual: a hitbox frame `stroke` pixels thick.
pub fn draw_rect_outline(
    fb: &mut FrameBuffer,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    stroke: i32,
    color: u32,
) {
    if stroke <= 0 {
        return;
    }
    let (x0, x1) = (x0.min(x1), x0.max(x1));
    let (y0, y1) = (y0.min(y1), y0.max(y1));
    let lo = -(stroke - 1) / 2;
    let hi = lo + stroke - 1;
    let (l0, t0) = (x0.saturating_add(lo), y0.saturating_add(lo));
    let (l1, t1) = (x0.saturating_add(hi), y0.saturating_add(hi));
    let (r0, b0) = (x1.saturating_add(lo), y1.saturating_add(lo));
    let (r1, b1) = (x1.saturating_add(hi), y1.saturating_add(hi));
    fill_rect(fb, l0, t0, r1, t1, color); // top
    fill_rect(fb, l0, b0, r1, b1, color); // bottom
    fill_rect(fb, l0, t0, l1, b1, color); // left
    fill_rect(fb, r0, t0, r1, b1, color); // right
}

/* ---------- 5x7 bitmap font ---------- */

pub const GLYPH_W: i32 = 5;
pub const GLYPH_H: i32 = 7;
const GLYPH_ADVANCE: i32 = GLYPH_W + 1;

/// Return a 5x7 glyph bitmap; lowercase letters share the uppercase shapes.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    // Helper macro to define a glyph quickly
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        // Digits 0..9
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        // Letters
        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        // Punctuation
        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00100,0b00100,0b01000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '#' => g!(0b01010,0b01010,0b11111,0b01010,0b11111,0b01010,0b01010),
        '/' => g!(0b00001,0b00010,0b00010,0b00100,0b01000,0b01000,0b10000),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),
        '>' => g!(0b01000,0b00100,0b00010,0b00001,0b00010,0b00100,0b01000),
        '=' => g!(0b00000,0b00000,0b11111,0b00000,0b11111,0b00000,0b00000),

        _ => None,
    }
}

fn stamp_glyph(fb: &mut FrameBuffer, x: i32, y: i32, rows: &[u8; 7], scale: i32, color: u32) {
    for (ry, rowbits) in rows.iter().enumerate() {
        for rx in 0..GLYPH_W {
            if (rowbits & (1 << (4 - rx))) != 0 {
                let px = x + rx * scale;
                let py = y + ry as i32 * scale;
                fill_rect(fb, px, py, px + scale - 1, py + scale - 1, color);
            }
        }
    }
}

/// Draw a single 5x7 character at (x,y), each font pixel `scale` screen pixels wide.
/// Visual: a glyph with a 1-font-pixel black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32, scale: i32) {
    if let Some(rows) = glyph5x7(ch) {
        stamp_glyph(fb, x + scale, y + scale, &rows, scale, 0x00000000);
        stamp_glyph(fb, x, y, &rows, scale, color);
    }
}

/// Draw a text string using 5x7 glyphs, top-left at (x,y).
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32, scale: i32) {
    let scale = scale.max(1);
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color, scale);
        x += GLYPH_ADVANCE * scale;
    }
}

/// Pixel bounds of `text` as drawn by `draw_text_5x7` (shadow excluded).
pub fn measure_text_5x7(text: &str, scale: i32) -> (i32, i32) {
    let scale = scale.max(1);
    let n = text.chars().count() as i32;
    if n == 0 {
        return (0, 0);
    }
    (n * GLYPH_ADVANCE * scale - scale, GLYPH_H * scale)
}
