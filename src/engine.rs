// Playback/seek state machine: owns the open video, the cursor, the optional
// loop window, the overlay set and the last composited frame.
// Visual: every successful read replaces what the window shows on its next present.

use std::path::Path;
use std::time::{Duration, Instant};

use image::ImageFormat;

use crate::compositor::Compositor;
use crate::error::{ViewerError, ViewerResult};
use crate::hitbox::{Hitbox, HitboxSet};
use crate::types::{FrameBuffer, PointerSample};
use crate::video::{FfmpegSource, VideoInfo, VideoSource};

/// Playback period, roughly 25 fps.
pub const TICK_INTERVAL: Duration = Duration::from_millis(40);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Closed,
    Paused,
    Playing,
    Looping,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Closed => "CLOSED",
            PlaybackState::Paused => "PAUSED",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Looping => "LOOPING",
        }
    }
}

/// Inclusive frame window; `start <= end` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopRange {
    pub start: u64,
    pub end: u64,
}

/// Tells the engine how many playback periods elapsed since it last asked.
pub trait Scheduler {
    fn due_ticks(&mut self) -> u32;
}

/// Wall-clock scheduler. Falls behind by at most `MAX_CATCH_UP` periods;
/// anything older is dropped instead of replayed in a burst.
pub struct IntervalScheduler {
    interval: Duration,
    next_due: Option<Instant>,
}

impl IntervalScheduler {
    const MAX_CATCH_UP: u32 = 3;

    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
        }
    }
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

impl Scheduler for IntervalScheduler {
    fn due_ticks(&mut self) -> u32 {
        let now = Instant::now();
        let Some(mut next) = self.next_due else {
            self.next_due = Some(now + self.interval);
            return 0;
        };
        let mut due = 0;
        while next <= now && due < Self::MAX_CATCH_UP {
            next += self.interval;
            due += 1;
        }
        if next <= now {
            next = now + self.interval;
        }
        self.next_due = Some(next);
        due
    }
}

pub struct PlaybackEngine {
    source: Option<Box<dyn VideoSource>>,
    running: bool,
    loop_range: Option<LoopRange>,
    hitboxes: HitboxSet,
    pointer: Option<PointerSample>,
    compositor: Compositor,
    raw: Option<FrameBuffer>,
    composited: Option<FrameBuffer>,
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(Compositor::default())
    }
}

impl PlaybackEngine {
    pub fn new(compositor: Compositor) -> Self {
        Self {
            source: None,
            running: false,
            loop_range: None,
            hitboxes: HitboxSet::new(),
            pointer: None,
            compositor,
            raw: None,
            composited: None,
        }
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /* ------------------------------ lifecycle ------------------------------ */

    /// Open through ffmpeg at the compositor's display size.
    pub fn open(&mut self, path: &Path) -> bool {
        let size = self.compositor.scaler().display_size();
        self.open_with(path, |p| {
            FfmpegSource::open(p, size).map(|s| Box::new(s) as Box<dyn VideoSource>)
        })
    }

    /// Open through any decoding facility. Failure leaves the engine closed.
    pub fn open_with<F>(&mut self, path: &Path, opener: F) -> bool
    where
        F: FnOnce(&Path) -> ViewerResult<Box<dyn VideoSource>>,
    {
        self.close();
        match opener(path) {
            Ok(source) => {
                let total = source.info().total_frames;
                self.source = Some(source);
                tracing::info!(path = %path.display(), total, "playback ready");
                if total > 0 {
                    self.settle_at(0);
                }
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "video open failed");
                false
            }
        }
    }

    /// Drop the stream and everything decoded from it. Overlay state survives.
    pub fn close(&mut self) {
        self.source = None;
        self.running = false;
        self.loop_range = None;
        self.raw = None;
        self.composited = None;
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> PlaybackState {
        if self.source.is_none() {
            PlaybackState::Closed
        } else if !self.running {
            PlaybackState::Paused
        } else if self.loop_range.is_some() {
            PlaybackState::Looping
        } else {
            PlaybackState::Playing
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.source.as_ref().map_or(0, |s| s.info().total_frames)
    }

    pub fn current_frame_number(&self) -> u64 {
        self.source.as_ref().map_or(0, |s| s.position())
    }

    pub fn video_info(&self) -> Option<VideoInfo> {
        self.source.as_ref().map(|s| s.info().clone())
    }

    pub fn loop_range(&self) -> Option<LoopRange> {
        self.loop_range
    }

    /* ------------------------------- playback ------------------------------ */

    pub fn play(&mut self) {
        if self.source.is_some() {
            self.running = true;
        }
    }

    /// Keeps the loop window; a later `play` loops again.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// With an unknown frame count only the lower bound applies.
    pub fn seek_relative(&mut self, delta: i64) {
        let current = self.current_frame_number() as i64;
        let Some(target) = self.clamp_frame(current.saturating_add(delta)) else {
            return;
        };
        tracing::debug!(from = current, delta, target, "seek");
        self.settle_at(target);
    }

    pub fn goto_absolute(&mut self, frame: i64) {
        let Some(target) = self.clamp_frame(frame) else {
            return;
        };
        tracing::debug!(requested = frame, target, "goto");
        self.settle_at(target);
    }

    /// `end` is pulled up to `start` when given in reverse. Playback resumes
    /// even if the first frame fails to read; the next tick then pauses.
    pub fn play_loop(&mut self, start: i64, end: i64) {
        let Some(start) = self.clamp_frame(start) else {
            return;
        };
        let end = self.clamp_frame(end).unwrap_or(start).max(start);
        let range = LoopRange { start, end };
        tracing::debug!(start = range.start, end = range.end, "loop");
        self.loop_range = Some(range);
        if let Some(src) = self.source.as_mut() {
            src.set_position(range.start);
        }
        self.read_and_show();
        self.running = true;
    }

    pub fn stop_loop(&mut self) {
        self.loop_range = None;
        self.play();
    }

    /// One playback period.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        let Some(src) = self.source.as_mut() else {
            return;
        };
        if let Some(range) = self.loop_range {
            if src.position() > range.end {
                src.set_position(range.start);
            }
        }
        self.read_and_show();
    }

    pub fn pump(&mut self, scheduler: &mut impl Scheduler) {
        for _ in 0..scheduler.due_ticks() {
            self.tick();
        }
    }

    /* ------------------------------- overlay ------------------------------- */

    pub fn hitboxes(&self) -> &HitboxSet {
        &self.hitboxes
    }

    pub fn load_hitboxes(&mut self, hitboxes: &[Hitbox]) {
        self.hitboxes.load(hitboxes);
        self.recomposite();
    }

    pub fn set_offset(&mut self, dx: i32, dy: i32) {
        self.hitboxes.set_offset(dx, dy);
        self.recomposite();
    }

    pub fn offset(&self) -> (i32, i32) {
        self.hitboxes.offset()
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> bool {
        let changed = self.hitboxes.set_visible(index, visible);
        if changed {
            self.recomposite();
        }
        changed
    }

    pub fn toggle_visible(&mut self, index: usize) -> bool {
        let changed = self.hitboxes.toggle(index);
        if changed {
            self.recomposite();
        }
        changed
    }

    pub fn select_all(&mut self) {
        self.hitboxes.select_all();
        self.recomposite();
    }

    pub fn deselect_all(&mut self) {
        self.hitboxes.deselect_all();
        self.recomposite();
    }

    pub fn set_pointer(&mut self, pointer: Option<PointerSample>) {
        if self.pointer != pointer {
            self.pointer = pointer;
            self.recomposite();
        }
    }

    /* ------------------------------- output -------------------------------- */

    /// Last composited image; `None` until a frame has been decoded.
    pub fn display(&self) -> Option<&FrameBuffer> {
        self.composited.as_ref()
    }

    pub fn raw_frame(&self) -> Option<&FrameBuffer> {
        self.raw.as_ref()
    }

    pub fn save_snapshot(&self, path: &Path) -> ViewerResult<()> {
        let frame = self
            .composited
            .as_ref()
            .ok_or_else(|| ViewerError::decode("no frame decoded yet"))?;
        frame
            .to_rgb_image()
            .save_with_format(path, ImageFormat::Png)?;
        tracing::info!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    /* ------------------------------- internal ------------------------------ */

    /// `None` when closed. A zero frame count means the container did not say.
    fn clamp_frame(&self, frame: i64) -> Option<u64> {
        if !self.is_open() {
            return None;
        }
        let frame = frame.max(0) as u64;
        match self.total_frames() {
            0 => Some(frame),
            total => Some(frame.min(total - 1)),
        }
    }

    /// Read the frame at `target`, show it, then put the cursor back on it.
    fn settle_at(&mut self, target: u64) {
        let Some(src) = self.source.as_mut() else {
            return;
        };
        src.set_position(target);
        let read = src.read_frame();
        src.set_position(target);
        match read {
            Ok(frame) => self.show(frame),
            Err(e) => tracing::warn!(frame = target, error = %e, "seek read failed"),
        }
    }

    /// Read at the cursor; a failure pauses and keeps the previous frame up.
    fn read_and_show(&mut self) {
        let Some(src) = self.source.as_mut() else {
            return;
        };
        let at = src.position();
        match src.read_frame() {
            Ok(frame) => self.show(frame),
            Err(e) => {
                tracing::warn!(frame = at, error = %e, "frame read failed; pausing");
                self.running = false;
            }
        }
    }

    fn show(&mut self, frame: FrameBuffer) {
        self.raw = Some(frame);
        self.recomposite();
    }

    fn recomposite(&mut self) {
        if let Some(raw) = &self.raw {
            self.composited = Some(
                self.compositor
                    .compose(raw, self.hitboxes.overlay(), self.pointer),
            );
        }
    }
}
