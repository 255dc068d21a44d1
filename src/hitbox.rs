// Loaded hitboxes, their visibility and the global offset.
// Visual: whatever `overlay()` returns is exactly what gets outlined on the frame.

/// Default score carried by a hitbox when the scene file omits it.
pub const DEFAULT_POINTS: i64 = 500;

/// Fixed outline palette (0x00RRGGBB). A hitbox keeps its color no matter
/// which other boxes are visible.
pub const HITBOX_PALETTE: [u32; 15] = [
    0x00_FF_00_00, // red
    0x00_00_FF_00, // green
    0x00_00_64_FF, // blue
    0x00_FF_FF_00, // yellow
    0x00_FF_00_FF, // magenta
    0x00_00_FF_FF, // cyan
    0x00_FF_80_00, // orange
    0x00_80_00_FF, // purple
    0x00_FF_C0_CB, // pink
    0x00_00_FF_80, // mint
    0x00_FF_40_40, // light red
    0x00_40_FF_40, // light green
    0x00_40_40_FF, // light blue
    0x00_FF_D7_00, // gold
    0x00_FF_63_47, // tomato
];

pub fn palette_color(color_index: usize) -> u32 {
    HITBOX_PALETTE[color_index % HITBOX_PALETTE.len()]
}

/// Rectangle in virtual coordinates, as authored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hitbox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    pub points: i64,
}

impl Hitbox {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            points: DEFAULT_POINTS,
        }
    }

    pub fn width(&self) -> i32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> i32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Corners saturate at the `i32` range.
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            x0: self.x0.saturating_add(dx),
            y0: self.y0.saturating_add(dy),
            x1: self.x1.saturating_add(dx),
            y1: self.y1.saturating_add(dy),
            points: self.points,
        }
    }

    /// One-line panel label, 1-based, with decimal and hex corners.
    pub fn describe(&self, index: usize) -> String {
        format!(
            "Hitbox {} ({}, {}) -> ({}, {}) | 0x{:02X},{:02X} -> 0x{:02X},{:02X} | {}x{} px, {} pts",
            index + 1,
            self.x0,
            self.y0,
            self.x1,
            self.y1,
            self.x0,
            self.y0,
            self.x1,
            self.y1,
            self.width(),
            self.height(),
            self.points
        )
    }
}

/// One visible box handed to the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayBox {
    pub rect: Hitbox,
    pub color_index: usize,
}

#[derive(Clone, Debug, Default)]
pub struct HitboxSet {
    original: Vec<Hitbox>,
    visible: Vec<bool>,
    offset: (i32, i32),
    overlay: Vec<OverlayBox>,
}

impl HitboxSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything; offset back to (0,0), nothing visible.
    pub fn load(&mut self, hitboxes: &[Hitbox]) {
        self.original = hitboxes.to_vec();
        self.visible = vec![false; hitboxes.len()];
        self.offset = (0, 0);
        self.rebuild();
    }

    /// Always relative to the loaded coordinates, never to the last offset.
    pub fn set_offset(&mut self, dx: i32, dy: i32) {
        self.offset = (dx, dy);
        self.rebuild();
    }

    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }

    /// Returns false when `index` is out of range.
    pub fn set_visible(&mut self, index: usize, visible: bool) -> bool {
        let Some(slot) = self.visible.get_mut(index) else {
            return false;
        };
        *slot = visible;
        self.rebuild();
        true
    }

    pub fn toggle(&mut self, index: usize) -> bool {
        let Some(&now) = self.visible.get(index) else {
            return false;
        };
        self.set_visible(index, !now)
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.get(index).copied().unwrap_or(false)
    }

    pub fn select_all(&mut self) {
        self.visible.iter_mut().for_each(|v| *v = true);
        self.rebuild();
    }

    pub fn deselect_all(&mut self) {
        self.visible.iter_mut().for_each(|v| *v = false);
        self.rebuild();
    }

    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Offset-applied rectangle for `index`, visible or not.
    pub fn displayed(&self, index: usize) -> Option<Hitbox> {
        self.original
            .get(index)
            .map(|hb| hb.translated(self.offset.0, self.offset.1))
    }

    /// Visible boxes in load order.
    pub fn overlay(&self) -> &[OverlayBox] {
        &self.overlay
    }

    fn rebuild(&mut self) {
        let (dx, dy) = self.offset;
        self.overlay = self
            .original
            .iter()
            .zip(&self.visible)
            .enumerate()
            .filter(|(_, (_, visible))| **visible)
            .map(|(i, (hb, _))| OverlayBox {
                rect: hb.translated(dx, dy),
                color_index: i,
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Hitbox> {
        vec![
            Hitbox::new(54, 34, 122, 73),
            Hitbox::new(176, 35, 243, 78),
            Hitbox::new(10, 10, 20, 20),
        ]
    }

    #[test]
    fn load_starts_hidden_with_zero_offset() {
        let mut set = HitboxSet::new();
        set.set_offset(4, 4);
        set.load(&sample());
        assert_eq!(set.len(), 3);
        assert_eq!(set.offset(), (0, 0));
        assert!(set.overlay().is_empty());
    }

    #[test]
    fn color_index_is_stable_under_visibility() {
        let mut set = HitboxSet::new();
        set.load(&sample());
        set.set_visible(2, true);
        assert_eq!(set.overlay()[0].color_index, 2);
        set.set_visible(0, true);
        let idx: Vec<_> = set.overlay().iter().map(|o| o.color_index).collect();
        assert_eq!(idx, vec![0, 2]);
    }

    #[test]
    fn offset_never_compounds() {
        let mut set = HitboxSet::new();
        set.load(&sample());
        set.select_all();
        for (dx, dy) in [(5, -3), (5, -3), (-100, 100), (17, 2)] {
            set.set_offset(dx, dy);
            let first = set.overlay()[0].rect;
            assert_eq!(first, sample()[0].translated(dx, dy));
        }
        set.set_offset(0, 0);
        let rects: Vec<_> = set.overlay().iter().map(|o| o.rect).collect();
        assert_eq!(rects, sample());
    }

    #[test]
    fn huge_offsets_saturate() {
        let hb = Hitbox::new(1_000_000_000, 0, 2_000_000_000, 10);
        let moved = hb.translated(i32::MAX, -5);
        assert_eq!((moved.x0, moved.x1), (i32::MAX, i32::MAX));
        assert_eq!((moved.y0, moved.y1), (-5, 5));
        assert_eq!(Hitbox::new(i32::MIN, 0, i32::MAX, 0).width(), i32::MAX);
    }

    #[test]
    fn select_and_deselect_all() {
        let mut set = HitboxSet::new();
        set.load(&sample());
        set.select_all();
        assert_eq!(set.overlay().len(), 3);
        assert!(set.toggle(1));
        assert_eq!(set.overlay().len(), 2);
        assert!(!set.is_visible(1));
        set.deselect_all();
        assert!(set.overlay().is_empty());
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut set = HitboxSet::new();
        set.load(&sample());
        assert!(!set.set_visible(9, true));
        assert!(!set.toggle(9));
        assert!(set.overlay().is_empty());
        assert_eq!(set.displayed(9), None);
    }

    #[test]
    fn palette_wraps() {
        assert_eq!(palette_color(0), palette_color(15));
        assert_ne!(palette_color(0), palette_color(1));
    }

    #[test]
    fn describe_shows_hex_corners() {
        let d = Hitbox::new(54, 34, 122, 73).describe(0);
        assert!(d.starts_with("Hitbox 1 (54, 34) -> (122, 73)"));
        assert!(d.contains("0x36,22 -> 0x7A,49"));
        assert!(d.contains("68x39 px, 500 pts"));
    }
}
