// What the UI talks to: scene selection, frame buttons and their history,
// manual loops and jumps. All playback state stays in the engine.

use crate::engine::PlaybackEngine;
use crate::error::{ViewerError, ViewerResult};
use crate::scene::{FrameRange, Scene};

#[derive(Debug)]
pub struct ViewerSession {
    scenes: Vec<Scene>,
    current: Option<usize>,
    active_button: Option<usize>,
    history: Vec<usize>,
}

impl ViewerSession {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self {
            scenes,
            current: None,
            active_button: None,
            history: Vec::new(),
        }
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.current.and_then(|i| self.scenes.get(i))
    }

    /// Button currently highlighted, 0-based.
    pub fn active_button(&self) -> Option<usize> {
        self.active_button
    }

    /// 1-based button numbers in click order.
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// Forget the click history. The highlighted button stays.
    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    pub fn history_label(&self) -> String {
        if self.history.is_empty() {
            return "-".to_string();
        }
        self.history
            .iter()
            .map(|n| format!("#{n}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Load the scene's hitboxes, clear history and start its first range.
    pub fn select_scene(&mut self, index: usize, engine: &mut PlaybackEngine) -> bool {
        let Some(scene) = self.scenes.get(index) else {
            return false;
        };
        tracing::info!(
            scene = %scene.label(),
            hitboxes = scene.hitboxes.len(),
            ranges = scene.frames.len(),
            "scene selected"
        );
        engine.load_hitboxes(&scene.hitboxes);
        let first = scene.frames.first().copied();
        self.current = Some(index);
        self.history.clear();
        self.active_button = None;
        if let Some(range) = first {
            self.active_button = Some(0);
            engine.play_loop(range.from, range.to);
        }
        true
    }

    pub fn next_scene(&mut self, engine: &mut PlaybackEngine) -> bool {
        let next = match self.current {
            Some(i) if i + 1 < self.scenes.len() => i + 1,
            Some(_) => return false,
            None if !self.scenes.is_empty() => 0,
            None => return false,
        };
        self.select_scene(next, engine)
    }

    pub fn prev_scene(&mut self, engine: &mut PlaybackEngine) -> bool {
        match self.current {
            Some(i) if i > 0 => self.select_scene(i - 1, engine),
            _ => false,
        }
    }

    pub fn frame_ranges(&self) -> &[FrameRange] {
        self.current_scene()
            .map(|s| s.frames.as_slice())
            .unwrap_or(&[])
    }

    /// Loop the `index`th range of the current scene and remember the click.
    pub fn activate_frame_button(&mut self, index: usize, engine: &mut PlaybackEngine) -> bool {
        let Some(range) = self.frame_ranges().get(index).copied() else {
            return false;
        };
        self.history.push(index + 1);
        self.active_button = Some(index);
        tracing::debug!(button = index + 1, from = range.from, to = range.to, "frame button");
        engine.play_loop(range.from, range.to);
        true
    }

    pub fn play_manual_loop(
        &mut self,
        start: i64,
        end: i64,
        engine: &mut PlaybackEngine,
    ) -> ViewerResult<()> {
        if start > end {
            return Err(ViewerError::InvalidLoop { start, end });
        }
        self.active_button = None;
        engine.play_loop(start, end);
        Ok(())
    }

    /// Pauses first so the jump lands on a still frame. An open video with no
    /// frame count has no upper bound to check.
    pub fn goto_frame(&mut self, frame: i64, engine: &mut PlaybackEngine) -> ViewerResult<()> {
        let total = engine.total_frames();
        let bounded = total > 0 || !engine.is_open();
        if frame < 0 || (bounded && frame as u64 >= total) {
            return Err(ViewerError::FrameOutOfRange { frame, total });
        }
        engine.pause();
        self.active_button = None;
        engine.goto_absolute(frame);
        Ok(())
    }

    pub fn toggle_play_pause(&mut self, engine: &mut PlaybackEngine) {
        if engine.is_open() && !engine.is_running() {
            engine.play();
        } else {
            engine.pause();
        }
    }

    pub fn stop_loop(&mut self, engine: &mut PlaybackEngine) {
        self.active_button = None;
        engine.stop_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LoopRange, PlaybackState};
    use crate::hitbox::Hitbox;
    use crate::video::PatternSource;
    use std::path::Path;

    fn scenes() -> Vec<Scene> {
        vec![
            Scene {
                id: 1,
                offset: "0x0010".into(),
                hitboxes: vec![Hitbox::new(0, 0, 10, 10), Hitbox::new(5, 5, 20, 20)],
                frames: vec![
                    FrameRange { from: 10, to: 20 },
                    FrameRange { from: 40, to: 45 },
                    FrameRange { from: 70, to: 71 },
                ],
            },
            Scene {
                id: 2,
                offset: "0x0020".into(),
                hitboxes: vec![Hitbox::new(1, 1, 2, 2)],
                frames: vec![],
            },
        ]
    }

    fn engine() -> PlaybackEngine {
        let mut engine = PlaybackEngine::default();
        engine.open_with(Path::new("pattern"), |_| {
            Ok(Box::new(PatternSource::new(100, 16, 8)))
        });
        engine
    }

    #[test]
    fn selecting_a_scene_starts_its_first_range_silently() {
        let mut engine = engine();
        let mut session = ViewerSession::new(scenes());
        assert!(session.select_scene(0, &mut engine));
        assert_eq!(engine.loop_range(), Some(LoopRange { start: 10, end: 20 }));
        assert_eq!(engine.state(), PlaybackState::Looping);
        assert_eq!(session.active_button(), Some(0));
        assert_eq!(session.history_label(), "-");
        assert_eq!(engine.hitboxes().len(), 2);
    }

    #[test]
    fn frame_buttons_record_history() {
        let mut engine = engine();
        let mut session = ViewerSession::new(scenes());
        session.select_scene(0, &mut engine);
        session.activate_frame_button(0, &mut engine);
        session.activate_frame_button(2, &mut engine);
        assert_eq!(session.history_label(), "#1, #3");
        assert_eq!(engine.loop_range(), Some(LoopRange { start: 70, end: 71 }));
        assert!(!session.activate_frame_button(9, &mut engine));
        assert_eq!(session.history(), &[1, 3]);
    }

    #[test]
    fn history_can_be_cleared_without_touching_playback() {
        let mut engine = engine();
        let mut session = ViewerSession::new(scenes());
        session.select_scene(0, &mut engine);
        session.activate_frame_button(1, &mut engine);
        session.activate_frame_button(2, &mut engine);
        session.reset_history();
        assert_eq!(session.history_label(), "-");
        assert_eq!(session.active_button(), Some(2));
        assert_eq!(engine.loop_range(), Some(LoopRange { start: 70, end: 71 }));
        session.activate_frame_button(0, &mut engine);
        assert_eq!(session.history(), &[1]);
    }

    #[test]
    fn scene_change_resets_history_and_overlay() {
        let mut engine = engine();
        let mut session = ViewerSession::new(scenes());
        session.select_scene(0, &mut engine);
        session.activate_frame_button(1, &mut engine);
        engine.select_all();
        engine.set_offset(3, 3);
        assert!(session.next_scene(&mut engine));
        assert_eq!(session.history_label(), "-");
        assert_eq!(session.active_button(), None);
        assert_eq!(engine.hitboxes().len(), 1);
        assert_eq!(engine.offset(), (0, 0));
        assert!(engine.hitboxes().overlay().is_empty());
    }

    #[test]
    fn scene_navigation_clamps() {
        let mut engine = engine();
        let mut session = ViewerSession::new(scenes());
        assert!(!session.prev_scene(&mut engine));
        assert!(session.next_scene(&mut engine));
        assert_eq!(session.current_index(), Some(0));
        assert!(session.next_scene(&mut engine));
        assert!(!session.next_scene(&mut engine));
        assert_eq!(session.current_index(), Some(1));
        assert!(session.prev_scene(&mut engine));
        assert_eq!(session.current_index(), Some(0));
        assert!(!session.select_scene(5, &mut engine));
    }

    #[test]
    fn manual_loop_rejects_reversed_bounds() {
        let mut engine = engine();
        let mut session = ViewerSession::new(scenes());
        session.select_scene(0, &mut engine);
        let err = session.play_manual_loop(50, 40, &mut engine).unwrap_err();
        assert!(matches!(err, ViewerError::InvalidLoop { start: 50, end: 40 }));
        assert_eq!(session.active_button(), Some(0));
        session.play_manual_loop(30, 35, &mut engine).unwrap();
        assert_eq!(session.active_button(), None);
        assert_eq!(engine.loop_range(), Some(LoopRange { start: 30, end: 35 }));
    }

    #[test]
    fn goto_validates_and_pauses() {
        let mut engine = engine();
        let mut session = ViewerSession::new(scenes());
        session.select_scene(0, &mut engine);
        let err = session.goto_frame(100, &mut engine).unwrap_err();
        assert_eq!(
            err.to_string(),
            "frame 100 out of range: the video has 100 frames (0-99)"
        );
        assert!(session.goto_frame(-1, &mut engine).is_err());
        assert_eq!(engine.state(), PlaybackState::Looping);

        session.goto_frame(55, &mut engine).unwrap();
        assert_eq!(engine.state(), PlaybackState::Paused);
        assert_eq!(engine.current_frame_number(), 55);
        assert_eq!(session.active_button(), None);
    }

    #[test]
    fn goto_on_closed_engine_is_out_of_range() {
        let mut engine = PlaybackEngine::default();
        let mut session = ViewerSession::new(scenes());
        assert!(matches!(
            session.goto_frame(0, &mut engine),
            Err(ViewerError::FrameOutOfRange { frame: 0, total: 0 })
        ));
    }

    #[test]
    fn goto_without_frame_count_only_checks_negative() {
        let mut engine = PlaybackEngine::default();
        engine.open_with(Path::new("pattern"), |_| {
            Ok(Box::new(PatternSource::new(500, 16, 8).without_frame_count()))
        });
        let mut session = ViewerSession::new(scenes());
        session.goto_frame(300, &mut engine).unwrap();
        assert_eq!(engine.current_frame_number(), 300);
        assert!(session.goto_frame(-1, &mut engine).is_err());
    }

    #[test]
    fn toggle_and_stop_loop() {
        let mut engine = engine();
        let mut session = ViewerSession::new(scenes());
        session.toggle_play_pause(&mut engine);
        assert_eq!(engine.state(), PlaybackState::Playing);
        session.toggle_play_pause(&mut engine);
        assert_eq!(engine.state(), PlaybackState::Paused);

        session.select_scene(0, &mut engine);
        session.stop_loop(&mut engine);
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(session.active_button(), None);
    }
}
